// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Staging area tests across threads

use plant_vision::storage::{secure_filename, StagingArea};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_parallel_staging_same_name() {
    let dir = TempDir::new().unwrap();
    let area = Arc::new(StagingArea::new(dir.path()).unwrap());

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let area = area.clone();
            std::thread::spawn(move || {
                let staged = area.stage("leaf.jpg", &[i; 64]).unwrap();
                let content = std::fs::read(staged.path()).unwrap();
                staged.remove();
                content
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![i as u8; 64]);
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_staged_path_stays_inside_dir() {
    let dir = TempDir::new().unwrap();
    let area = StagingArea::new(dir.path()).unwrap();

    for name in ["../../escape.jpg", "/etc/passwd", "..\\win.png", "..", ""] {
        let staged = area.stage(name, b"x").unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()), "{}", name);
        assert!(!secure_filename(name).contains(".."), "{}", name);
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
