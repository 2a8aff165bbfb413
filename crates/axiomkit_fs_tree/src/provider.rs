//! Filesystem capability provider consumed by the walker and the algorithms.
//!
//! Everything that touches the disk goes through [`FsProvider`]; the engine
//! only sequences calls. [`LocalFs`] is the `std::fs` backed implementation.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;

use crate::spec::{
    EnumEntryKind, EnumFsErrorKind, SpecCopyBytesOptions, SpecEntryAttrs, SpecEntryIdentity,
    SpecFsError,
};

/// Primitive filesystem operations the tree algorithms are built from.
///
/// Implementations must be shareable across threads so that independent
/// walks can run concurrently against one provider.
pub trait FsProvider: Send + Sync {
    /// Capture attributes of `path`, resolving a final symlink when `if_follow_links`.
    fn stat(&self, path: &Path, if_follow_links: bool) -> Result<SpecEntryAttrs, SpecFsError>;

    /// Names of the immediate children of a directory, in no particular order.
    fn list_entries(&self, path: &Path) -> Result<Vec<OsString>, SpecFsError>;

    /// Target of a symbolic link.
    fn read_link(&self, path: &Path) -> Result<PathBuf, SpecFsError>;

    /// Create a single directory; the parent must exist.
    fn create_directory(&self, path: &Path) -> Result<(), SpecFsError>;

    /// Copy file bytes (and optionally attributes). Returns the byte count.
    fn copy_bytes(
        &self,
        path_src: &Path,
        path_dst: &Path,
        spec_options: SpecCopyBytesOptions,
    ) -> Result<u64, SpecFsError>;

    /// Create a symbolic link at `path_link` pointing to `target`.
    fn create_symlink(&self, target: &Path, path_link: &Path, if_dir: bool)
    -> Result<(), SpecFsError>;

    /// Remove a file, a symlink, or an empty directory.
    fn delete_entry(&self, path: &Path) -> Result<(), SpecFsError>;

    /// Atomically rename `path_src` to `path_dst`.
    fn rename_entry(
        &self,
        path_src: &Path,
        path_dst: &Path,
        if_replace_existing: bool,
    ) -> Result<(), SpecFsError>;

    /// Overwrite the last-modified time of `path`.
    fn set_last_modified_time(&self, path: &Path, time: SystemTime) -> Result<(), SpecFsError>;

    /// Open a file for buffered reading.
    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, SpecFsError>;

    /// `true` when both snapshots describe the same underlying object.
    fn is_same_identity(&self, attrs_a: &SpecEntryAttrs, attrs_b: &SpecEntryAttrs) -> bool {
        match (&attrs_a.identity, &attrs_b.identity) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// `true` when both paths live on the same store, so a rename can relocate between them.
    fn is_same_store(&self, path_a: &Path, path_b: &Path) -> Result<bool, SpecFsError> {
        let attrs_a = self.stat(path_a, true)?;
        let attrs_b = self.stat(path_b, true)?;
        let dev_a = attrs_a.identity.as_ref().and_then(SpecEntryIdentity::device);
        let dev_b = attrs_b.identity.as_ref().and_then(SpecEntryIdentity::device);
        Ok(matches!((dev_a, dev_b), (Some(a), Some(b)) if a == b))
    }
}

/// Local disk provider backed by `std::fs`, `filetime` and (on Linux) `xattr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn map_io(path: &Path) -> impl FnOnce(io::Error) -> SpecFsError + '_ {
    move |e| SpecFsError::from_io(path, &e)
}

fn derive_entry_attrs(path: &Path, meta: &fs::Metadata) -> SpecEntryAttrs {
    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        EnumEntryKind::Directory
    } else if file_type.is_file() {
        EnumEntryKind::File
    } else if file_type.is_symlink() {
        EnumEntryKind::Symlink
    } else {
        EnumEntryKind::Other
    };

    #[cfg(unix)]
    let identity = {
        use std::os::unix::fs::MetadataExt;
        let _ = path;
        Some(SpecEntryIdentity::DevIno(meta.dev(), meta.ino()))
    };
    #[cfg(not(unix))]
    let identity = fs::canonicalize(path).ok().map(SpecEntryIdentity::Canonical);

    SpecEntryAttrs {
        kind,
        size: meta.len(),
        time_modified: meta.modified().ok(),
        time_created: meta.created().ok(),
        identity,
    }
}

impl FsProvider for LocalFs {
    fn stat(&self, path: &Path, if_follow_links: bool) -> Result<SpecEntryAttrs, SpecFsError> {
        let meta = if if_follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(map_io(path))?;
        Ok(derive_entry_attrs(path, &meta))
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<OsString>, SpecFsError> {
        let iter_entries = fs::read_dir(path).map_err(map_io(path))?;
        let mut l_names = Vec::new();
        for entry_res in iter_entries {
            let entry = entry_res.map_err(map_io(path))?;
            l_names.push(entry.file_name());
        }
        Ok(l_names)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, SpecFsError> {
        fs::read_link(path).map_err(map_io(path))
    }

    fn create_directory(&self, path: &Path) -> Result<(), SpecFsError> {
        fs::create_dir(path).map_err(map_io(path))
    }

    fn copy_bytes(
        &self,
        path_src: &Path,
        path_dst: &Path,
        spec_options: SpecCopyBytesOptions,
    ) -> Result<u64, SpecFsError> {
        match fs::symlink_metadata(path_dst) {
            Ok(meta_dst) => {
                if !spec_options.if_replace_existing {
                    return Err(SpecFsError::new(
                        EnumFsErrorKind::AlreadyExists,
                        path_dst,
                        "Destination exists",
                    ));
                }
                if meta_dst.is_dir() {
                    return Err(SpecFsError::new(
                        EnumFsErrorKind::AlreadyExists,
                        path_dst,
                        "Destination is a directory",
                    ));
                }
                // Never write through an existing link.
                if meta_dst.file_type().is_symlink() {
                    fs::remove_file(path_dst).map_err(map_io(path_dst))?;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(SpecFsError::from_io(path_dst, &e)),
        }

        let n_bytes = fs::copy(path_src, path_dst).map_err(map_io(path_src))?;
        if spec_options.if_preserve_attributes {
            apply_file_metadata(path_src, path_dst).map_err(map_io(path_dst))?;
        }
        Ok(n_bytes)
    }

    fn create_symlink(
        &self,
        target: &Path,
        path_link: &Path,
        if_dir: bool,
    ) -> Result<(), SpecFsError> {
        #[cfg(unix)]
        {
            let _ = if_dir;
            std::os::unix::fs::symlink(target, path_link).map_err(map_io(path_link))
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::{symlink_dir, symlink_file};
            let res = if if_dir {
                symlink_dir(target, path_link)
            } else {
                symlink_file(target, path_link)
            };
            res.map_err(map_io(path_link))
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (target, if_dir);
            Err(SpecFsError::new(
                EnumFsErrorKind::Other,
                path_link,
                "Symbolic links are unsupported on this platform",
            ))
        }
    }

    fn delete_entry(&self, path: &Path) -> Result<(), SpecFsError> {
        let meta = fs::symlink_metadata(path).map_err(map_io(path))?;
        if meta.is_dir() {
            fs::remove_dir(path).map_err(map_io(path))
        } else {
            fs::remove_file(path).map_err(map_io(path))
        }
    }

    fn rename_entry(
        &self,
        path_src: &Path,
        path_dst: &Path,
        if_replace_existing: bool,
    ) -> Result<(), SpecFsError> {
        if !if_replace_existing && fs::symlink_metadata(path_dst).is_ok() {
            return Err(SpecFsError::new(
                EnumFsErrorKind::AlreadyExists,
                path_dst,
                "Destination exists",
            ));
        }
        fs::rename(path_src, path_dst).map_err(map_io(path_src))
    }

    fn set_last_modified_time(&self, path: &Path, time: SystemTime) -> Result<(), SpecFsError> {
        filetime::set_file_mtime(path, FileTime::from_system_time(time)).map_err(map_io(path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, SpecFsError> {
        let file = fs::File::open(path).map_err(|e| {
            SpecFsError::new(EnumFsErrorKind::Unreadable, path, e.to_string())
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn apply_file_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::set_file_times;

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                "Extended attribute {:?} not copied to {}: {e}",
                name,
                path_file_dst.display()
            );
        }
    }
}
