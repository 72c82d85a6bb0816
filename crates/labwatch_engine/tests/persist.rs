use std::fs;

use labwatch_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("patient").join("P1");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn replace_overwrites_existing_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.replace("last_hash.txt", b"aaaa").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "aaaa");

    let second = writer.replace("last_hash.txt", b"bbbb").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "bbbb");
}

#[test]
fn create_new_never_clobbers() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let path = writer.create_new("20240101_000000_UTC.html", b"first").unwrap();
    let err = writer
        .create_new("20240101_000000_UTC.html", b"second")
        .unwrap_err();
    assert!(matches!(err, PersistError::AlreadyExists(ref p) if *p == path));
    assert_eq!(fs::read_to_string(&path).unwrap(), "first");

    // No stray temp files remain.
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.replace("last_hash.txt", b"data");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("last_hash.txt").exists());
}
