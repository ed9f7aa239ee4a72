//! Integration tests driving real temporary directories through the
//! archive/extract round trip.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use archive_module::{collect_entries, extract_archive, safe_join, write_archive, ArchiveError};

#[test]
fn end_to_end_tree_is_byte_identical_after_extraction() {
    let src = tempfile::tempdir().unwrap();
    let root = src.path().join("rootdir");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), b"Hello World!\n").unwrap();
    fs::write(root.join("sub/b.bin"), [0u8, 1, 2, 3, 4, 5]).unwrap();

    let entries = collect_entries(&[root.clone()]).unwrap();
    assert!(entries.iter().any(|e| e.arc_path == "rootdir"));
    assert!(entries.iter().any(|e| e.arc_path == "rootdir/a.txt"));
    assert!(entries.iter().any(|e| e.arc_path == "rootdir/sub"));
    assert!(entries.iter().any(|e| e.arc_path == "rootdir/sub/b.bin"));

    let mut archive_bytes = Vec::new();
    let totals = write_archive(&mut archive_bytes, &entries, None).unwrap();
    assert!(totals.total_uncompressed > 0);

    let dest = tempfile::tempdir().unwrap();
    let mut cursor = Cursor::new(archive_bytes);
    extract_archive(&mut cursor, dest.path(), None).unwrap();

    assert_eq!(
        fs::read(dest.path().join("rootdir/a.txt")).unwrap(),
        b"Hello World!\n"
    );
    assert_eq!(
        fs::read(dest.path().join("rootdir/sub/b.bin")).unwrap(),
        vec![0u8, 1, 2, 3, 4, 5]
    );
    assert!(dest.path().join("rootdir/sub").is_dir());
}

#[test]
fn crafted_archive_with_traversal_path_is_rejected() {
    let dest = tempfile::tempdir().unwrap();

    let mut archive_bytes = Vec::new();
    archive_bytes.extend_from_slice(b"ARH1");
    archive_bytes.push(2); // version
    archive_bytes.extend_from_slice(&1u32.to_le_bytes()); // entry count

    let evil_path = b"../../etc/passwd";
    archive_bytes.extend_from_slice(&(evil_path.len() as u32).to_le_bytes());
    archive_bytes.extend_from_slice(evil_path);
    archive_bytes.push(0); // type: file
    archive_bytes.extend_from_slice(&0o644u32.to_le_bytes());
    archive_bytes.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
    archive_bytes.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
    let blob = vec![0x01, 0x00, 0x00, 0x00, 0x00]; // compressed empty blob
    archive_bytes.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    archive_bytes.extend_from_slice(&blob);

    let mut cursor = Cursor::new(archive_bytes);
    let result = extract_archive(&mut cursor, dest.path(), None);
    assert!(matches!(result, Err(ArchiveError::UnsafePath(_))));
}

#[test]
fn safe_join_rejects_escaping_path_directly() {
    let dest = tempfile::tempdir().unwrap();
    assert!(safe_join(dest.path(), "../outside.txt").is_err());
    assert!(safe_join(dest.path(), "nested/ok.txt").is_ok());
}

#[test]
fn collect_entries_on_missing_target_is_not_found() {
    let missing: PathBuf = PathBuf::from("/no/such/path/for/this/test");
    let result = collect_entries(&[missing]);
    assert!(matches!(result, Err(ArchiveError::NotFound(_))));
}
