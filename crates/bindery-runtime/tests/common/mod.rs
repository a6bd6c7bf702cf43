//! Shared test utilities for the runtime integration tests
//!
//! Every test runs against the headless backend, so nothing here needs a
//! display or the native libraries.

#![allow(dead_code)]

use bindery_runtime::{Context, HeadlessApi};
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

/// A headless backend plus a context over it.
///
/// The backend is returned separately so tests can inject failures and count
/// live native objects.
pub fn headless() -> (Rc<HeadlessApi>, Context) {
    let api = Rc::new(HeadlessApi::new());
    let ctx = Context::new(api.clone());
    (api, ctx)
}

/// Write a minimal BMP file and return its path; keep the `TempDir` alive
pub fn bmp_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"BM\0\0\0\0\0\0\0\0").expect("write bmp fixture");
    path
}

/// Write a placeholder font file; the headless backend only checks it exists
pub fn font_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"\0\x01\0\0").expect("write font fixture");
    path
}
