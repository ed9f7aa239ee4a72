//! The archive container: a directory tree plus per-file compressed
//! blobs, framed with a fixed little-endian header and per-entry
//! records.
//!
//! Container layout: `"ARH1"` magic, a version byte (`1` or `2` on
//! read, always `2` on write), a `u32` entry count, then one record per
//! entry (path, type, optional POSIX metadata, and for files a
//! length-prefixed compressed blob). See [`write_archive`] and
//! [`extract_archive`].

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

pub use shared_files::error::ArchiveError;

pub const MAGIC: &[u8; 4] = b"ARH1";
pub const CURRENT_VERSION: u8 = 2;
const MIN_SUPPORTED_VERSION: u8 = 1;

const UNKNOWN_ID: u32 = 0xFFFFFFFF;
const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Whether an archive entry is a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    fn to_u8(self) -> u8 {
        match self {
            EntryKind::File => 0,
            EntryKind::Dir => 1,
        }
    }

    fn from_u8(byte: u8) -> EntryKind {
        if byte == 1 {
            EntryKind::Dir
        } else {
            EntryKind::File
        }
    }
}

/// One entry discovered on disk, ready to be written into an archive.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Forward-slash-separated path stored in the archive.
    pub arc_path: String,
    /// Where to read this entry's bytes from (files only; ignored for dirs).
    pub fs_path: PathBuf,
    pub kind: EntryKind,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// Running byte totals for an archive/extract operation, handed back to
/// the caller for summary reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveTotals {
    pub total_uncompressed: u64,
    pub total_compressed: u64,
}

/// One progress tick, reported during [`write_archive`] or
/// [`extract_archive`]. Carries enough raw numbers for a caller to
/// render per-file and overall progress however it likes; rendering
/// itself is not this crate's concern.
pub struct ProgressEvent<'a> {
    pub arc_path: &'a str,
    pub file_done: usize,
    pub file_total: usize,
    pub overall_done: u64,
    pub overall_total: u64,
}

/// Reads the POSIX mode (permission bits only), uid, and gid of `path`
/// without following symlinks. On non-Unix targets these are always the
/// "unknown" defaults, since there is nothing meaningful to read.
#[cfg(unix)]
fn symlink_owner_mode(path: &Path) -> io::Result<(u32, u32, u32)> {
    use std::os::unix::fs::MetadataExt;
    let meta = fs::symlink_metadata(path)?;
    Ok((meta.mode() & 0o7777, meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
fn symlink_owner_mode(path: &Path) -> io::Result<(u32, u32, u32)> {
    let meta = fs::symlink_metadata(path)?;
    let default_mode = if meta.is_dir() {
        DEFAULT_DIR_MODE
    } else {
        DEFAULT_FILE_MODE
    };
    Ok((default_mode, UNKNOWN_ID, UNKNOWN_ID))
}

/// Walks `targets` (files and/or directories) and produces the ordered
/// entry list an archive is built from: directories before their
/// children, children in lexicographic order within each directory.
///
/// # Errors
///
/// Returns [`ArchiveError::NotFound`] if a target does not exist.
pub fn collect_entries(targets: &[PathBuf]) -> Result<Vec<SourceEntry>, ArchiveError> {
    let mut entries = Vec::new();

    for target in targets {
        if !target.exists() {
            return Err(ArchiveError::NotFound(target.clone()));
        }
        let abs = fs::canonicalize(target)?;
        let base = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| abs.to_string_lossy().into_owned());

        let (mode, uid, gid) = symlink_owner_mode(&abs)?;
        let kind = if abs.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        entries.push(SourceEntry {
            arc_path: base.clone(),
            fs_path: abs.clone(),
            kind,
            mode,
            uid,
            gid,
        });

        if kind == EntryKind::Dir {
            walk_dir(&abs, &base, &mut entries)?;
        }
    }

    Ok(entries)
}

fn walk_dir(fs_root: &Path, arc_root: &str, out: &mut Vec<SourceEntry>) -> Result<(), ArchiveError> {
    let mut dir_names = Vec::new();
    let mut file_names = Vec::new();

    for child in fs::read_dir(fs_root)? {
        let child = child?;
        let meta = fs::symlink_metadata(child.path())?;
        if meta.is_dir() {
            dir_names.push(child.file_name());
        } else {
            file_names.push(child.file_name());
        }
    }
    dir_names.sort();
    file_names.sort();

    for name in &dir_names {
        let fs_path = fs_root.join(name);
        let arc_path = format!("{}/{}", arc_root, name.to_string_lossy());
        let (mode, uid, gid) = symlink_owner_mode(&fs_path)?;
        out.push(SourceEntry {
            arc_path,
            fs_path,
            kind: EntryKind::Dir,
            mode,
            uid,
            gid,
        });
    }
    for name in &file_names {
        let fs_path = fs_root.join(name);
        let arc_path = format!("{}/{}", arc_root, name.to_string_lossy());
        let (mode, uid, gid) = symlink_owner_mode(&fs_path)?;
        out.push(SourceEntry {
            arc_path,
            fs_path,
            kind: EntryKind::File,
            mode,
            uid,
            gid,
        });
    }
    for name in &dir_names {
        let fs_path = fs_root.join(name);
        let arc_path = format!("{}/{}", arc_root, name.to_string_lossy());
        walk_dir(&fs_path, &arc_path, out)?;
    }

    Ok(())
}

/// Writes `entries` to `writer` as a version-2 archive container.
///
/// `on_progress`, if given, is called as each file's bytes are
/// compressed; directories generate no progress events.
///
/// # Errors
///
/// Propagates any I/O failure reading source files or writing the
/// container.
pub fn write_archive<W: Write>(
    writer: &mut W,
    entries: &[SourceEntry],
    mut on_progress: Option<&mut dyn FnMut(ProgressEvent)>,
) -> Result<ArchiveTotals, ArchiveError> {
    let overall_total: u64 = entries
        .iter()
        .filter(|e| e.kind == EntryKind::File)
        .map(|e| fs::metadata(&e.fs_path).map(|m| m.len()).unwrap_or(0))
        .sum();

    writer.write_all(MAGIC)?;
    writer.write_all(&[CURRENT_VERSION])?;
    writer.write_all(&(entries.len() as u32).to_le_bytes())?;

    let mut totals = ArchiveTotals::default();
    let mut overall_done: u64 = 0;

    for entry in entries {
        let path_bytes = entry.arc_path.as_bytes();
        writer.write_all(&(path_bytes.len() as u32).to_le_bytes())?;
        writer.write_all(path_bytes)?;
        writer.write_all(&[entry.kind.to_u8()])?;
        writer.write_all(&entry.mode.to_le_bytes())?;
        writer.write_all(&entry.uid.to_le_bytes())?;
        writer.write_all(&entry.gid.to_le_bytes())?;

        if entry.kind == EntryKind::File {
            let data = fs::read(&entry.fs_path)?;
            totals.total_uncompressed += data.len() as u64;

            let blob = if let Some(cb) = on_progress.as_deref_mut() {
                let arc_path = entry.arc_path.as_str();
                let base = overall_done;
                let mut forward = |done: usize, total: usize| {
                    cb(ProgressEvent {
                        arc_path,
                        file_done: done,
                        file_total: total,
                        overall_done: base + done as u64,
                        overall_total,
                    });
                };
                codec_core::compress(&data, Some(&mut forward))
            } else {
                codec_core::compress(&data, None)
            };

            overall_done += data.len() as u64;
            totals.total_compressed += blob.len() as u64;

            writer.write_all(&(blob.len() as u32).to_le_bytes())?;
            writer.write_all(&blob)?;
        }
    }

    Ok(totals)
}

/// Convenience wrapper creating `output_path` and writing the archive
/// built from `targets` into it.
pub fn create_archive(targets: &[PathBuf], output_path: &Path) -> Result<ArchiveTotals, ArchiveError> {
    create_archive_with_progress(targets, output_path, None)
}

pub fn create_archive_with_progress(
    targets: &[PathBuf],
    output_path: &Path,
    on_progress: Option<&mut dyn FnMut(ProgressEvent)>,
) -> Result<ArchiveTotals, ArchiveError> {
    let entries = collect_entries(targets)?;
    let mut out = File::create(output_path)?;
    write_archive(&mut out, &entries, on_progress)
}

fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Joins an archive-stored path onto `dest`, rejecting any result that
/// escapes `dest`.
///
/// `dest` itself is resolved with `canonicalize` (it always exists by the
/// time this is called, `extract_archive` creates it up front); the
/// archive-supplied part is then walked component-by-component and
/// normalized entirely in memory, the way `os.path.abspath` does it in
/// the original implementation, rather than handed to
/// `Path::canonicalize`. Canonicalizing a path with a not-yet-created
/// component fails and falls back to the un-normalized candidate, which
/// still contains literal `..` components that `starts_with` cannot see
/// through -- resolving them ourselves closes that hole regardless of
/// whether the intermediate directories exist on disk yet.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafePath`] if the normalized path would lie
/// outside `dest`, or if `arc_path` contains an absolute component.
pub fn safe_join(dest: &Path, arc_path: &str) -> Result<PathBuf, ArchiveError> {
    let dest_abs = dest
        .canonicalize()
        .unwrap_or_else(|_| dest.to_path_buf());

    let normalized = arc_path.replace('/', std::path::MAIN_SEPARATOR_STR);
    let mut resolved = dest_abs.clone();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath(arc_path.to_string()));
            }
        }
    }

    if resolved == dest_abs || resolved.starts_with(&dest_abs) {
        Ok(resolved)
    } else {
        Err(ArchiveError::UnsafePath(arc_path.to_string()))
    }
}

/// Applies mode and, where available, ownership to an already-written
/// entry. Permission and ownership failures are reported and otherwise
/// ignored, they never abort extraction of the remaining entries.
fn apply_metadata(path: &Path, mode: u32, uid: u32, gid: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
            eprintln!("[!] failed to chmod {}: {}", path.display(), e);
        }
        if uid != UNKNOWN_ID || gid != UNKNOWN_ID {
            chown_path(path, uid, gid);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode, uid, gid);
    }
}

#[cfg(unix)]
fn chown_path(path: &Path, uid: u32, gid: u32) {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let raw_uid = if uid == UNKNOWN_ID { u32::MAX } else { uid };
    let raw_gid = if gid == UNKNOWN_ID { u32::MAX } else { gid };
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return;
    };
    let result = unsafe { libc::chown(c_path.as_ptr(), raw_uid, raw_gid) };
    if result != 0 {
        eprintln!(
            "[!] failed to chown {}: {}",
            path.display(),
            io::Error::last_os_error()
        );
    }
}

/// Pre-scans a version-2-or-later archive to sum the original (pre-compression)
/// size of every file entry, then rewinds `reader` to where it started.
fn scan_total_uncompressed<R: Read + Seek>(reader: &mut R) -> Result<u64, ArchiveError> {
    let start = reader.stream_position()?;

    reader.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ArchiveError::BadMagic);
    }
    let mut version_byte = [0u8; 1];
    reader.read_exact(&mut version_byte)?;
    let version = version_byte[0];
    if version < MIN_SUPPORTED_VERSION || version > CURRENT_VERSION {
        return Err(ArchiveError::BadVersion(version));
    }
    let count = read_u32_le(reader)?;

    let mut total = 0u64;
    for _ in 0..count {
        let path_len = read_u32_le(reader)? as i64;
        reader.seek(SeekFrom::Current(path_len))?;
        let mut kind_byte = [0u8; 1];
        reader.read_exact(&mut kind_byte)?;
        if version >= 2 {
            reader.seek(SeekFrom::Current(12))?;
        }
        if EntryKind::from_u8(kind_byte[0]) == EntryKind::Dir {
            continue;
        }
        let compressed_size = read_u32_le(reader)? as i64;
        let mut header = [0u8; 5];
        let to_read = compressed_size.min(5) as usize;
        reader.read_exact(&mut header[..to_read])?;
        if to_read == 5 {
            total += u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as u64;
        }
        let remaining = compressed_size - to_read as i64;
        if remaining > 0 {
            reader.seek(SeekFrom::Current(remaining))?;
        }
    }

    reader.seek(SeekFrom::Start(start))?;
    Ok(total)
}

/// Extracts an archive from `reader` into `dest_dir`, creating it if
/// necessary.
///
/// `on_progress`, if given, is called as each file's bytes are
/// decompressed, with an overall total pre-scanned from the archive.
///
/// Per-entry filesystem failures (permission errors on `chmod`, write
/// failures) are reported via `stderr` and that entry is skipped;
/// container-level errors (bad magic, bad version, unsafe path) abort
/// the whole extraction.
pub fn extract_archive<R: Read + Seek>(
    reader: &mut R,
    dest_dir: &Path,
    mut on_progress: Option<&mut dyn FnMut(ProgressEvent)>,
) -> Result<ArchiveTotals, ArchiveError> {
    fs::create_dir_all(dest_dir)?;

    let overall_total = scan_total_uncompressed(reader)?;

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ArchiveError::BadMagic);
    }
    let mut version_byte = [0u8; 1];
    reader.read_exact(&mut version_byte)?;
    let version = version_byte[0];
    if version < MIN_SUPPORTED_VERSION || version > CURRENT_VERSION {
        return Err(ArchiveError::BadVersion(version));
    }
    let count = read_u32_le(reader)?;

    let mut totals = ArchiveTotals::default();
    let mut overall_done: u64 = 0;

    for _ in 0..count {
        let path_len = read_u32_le(reader)? as usize;
        let mut path_bytes = vec![0u8; path_len];
        reader.read_exact(&mut path_bytes)?;
        let arc_path = String::from_utf8_lossy(&path_bytes).into_owned();

        let mut kind_byte = [0u8; 1];
        reader.read_exact(&mut kind_byte)?;
        let kind = EntryKind::from_u8(kind_byte[0]);

        let (mode, uid, gid) = if version >= 2 {
            (read_u32_le(reader)?, read_u32_le(reader)?, read_u32_le(reader)?)
        } else {
            let default_mode = if kind == EntryKind::Dir {
                DEFAULT_DIR_MODE
            } else {
                DEFAULT_FILE_MODE
            };
            (default_mode, UNKNOWN_ID, UNKNOWN_ID)
        };

        let full_path = safe_join(dest_dir, &arc_path)?;

        match kind {
            EntryKind::Dir => {
                if let Err(e) = fs::create_dir_all(&full_path) {
                    eprintln!("[!] failed to create directory {}: {}", arc_path, e);
                    continue;
                }
                apply_metadata(&full_path, mode, uid, gid);
            }
            EntryKind::File => {
                let compressed_size = read_u32_le(reader)? as usize;
                let mut blob = vec![0u8; compressed_size];
                reader.read_exact(&mut blob)?;

                let file_total = if blob.len() >= 5 {
                    u32::from_le_bytes([blob[1], blob[2], blob[3], blob[4]]) as usize
                } else {
                    0
                };

                let data = if let Some(cb) = on_progress.as_deref_mut() {
                    let base = overall_done;
                    let mut forward = |done: usize, total: usize| {
                        cb(ProgressEvent {
                            arc_path: arc_path.as_str(),
                            file_done: done,
                            file_total: total,
                            overall_done: base + done as u64,
                            overall_total,
                        });
                    };
                    codec_core::decompress(&blob, Some(&mut forward))?
                } else {
                    codec_core::decompress(&blob, None)?
                };

                overall_done += file_total as u64;
                totals.total_compressed += blob.len() as u64;
                totals.total_uncompressed += data.len() as u64;

                if let Some(parent) = full_path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        eprintln!("[!] failed to create directory for {}: {}", arc_path, e);
                        continue;
                    }
                }
                match fs::write(&full_path, &data) {
                    Ok(()) => apply_metadata(&full_path, mode, uid, gid),
                    Err(e) => {
                        eprintln!("[!] failed to write {}: {}", arc_path, e);
                        continue;
                    }
                }
            }
        }
    }

    Ok(totals)
}

/// Convenience wrapper opening `archive_path` and extracting it into
/// `dest_dir`.
pub fn extract_archive_file(archive_path: &Path, dest_dir: &Path) -> Result<ArchiveTotals, ArchiveError> {
    let mut file = File::open(archive_path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ArchiveError::NotFound(archive_path.to_path_buf())
        } else {
            ArchiveError::Io(e)
        }
    })?;
    extract_archive(&mut file, dest_dir, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn safe_join_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let result = safe_join(tmp.path(), "../../etc/passwd");
        assert!(matches!(result, Err(ArchiveError::UnsafePath(_))));
    }

    #[test]
    fn safe_join_accepts_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        let result = safe_join(tmp.path(), "sub/b.bin");
        assert!(result.is_ok());
    }

    #[test]
    fn safe_join_rejects_traversal_through_nonexistent_component() {
        // "ghost" is never created, so `dest/ghost` can't be canonicalized;
        // the traversal must be caught lexically, not by asking the
        // filesystem to resolve it.
        let tmp = tempfile::tempdir().unwrap();
        let result = safe_join(tmp.path(), "ghost/../../../../etc/passwd");
        assert!(matches!(result, Err(ArchiveError::UnsafePath(_))));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let result = extract_archive(&mut cursor, Path::new("/tmp"), None);
        assert!(matches!(result, Err(ArchiveError::BadMagic)));
    }

    #[test]
    fn roundtrip_tree_of_files_and_dirs() {
        let src = tempfile::tempdir().unwrap();
        let root = src.path().join("rootdir");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), b"Hello World!\n").unwrap();
        fs::write(root.join("sub/b.bin"), [0u8, 1, 2, 3, 4, 5]).unwrap();

        let entries = collect_entries(&[root.clone()]).unwrap();
        let mut buf = Vec::new();
        write_archive(&mut buf, &entries, None).unwrap();

        let dest = tempfile::tempdir().unwrap();
        let mut cursor = Cursor::new(buf);
        extract_archive(&mut cursor, dest.path(), None).unwrap();

        assert_eq!(
            fs::read(dest.path().join("rootdir/a.txt")).unwrap(),
            b"Hello World!\n"
        );
        assert_eq!(
            fs::read(dest.path().join("rootdir/sub/b.bin")).unwrap(),
            vec![0u8, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn collect_entries_missing_target_errors() {
        let missing = PathBuf::from("/definitely/does/not/exist/anywhere");
        let result = collect_entries(&[missing.clone()]);
        assert!(matches!(result, Err(ArchiveError::NotFound(p)) if p == missing));
    }
}
