//! Shared fixtures for unit tests.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::provider::{FsProvider, LocalFs};
use crate::spec::{EnumFsErrorKind, SpecCopyBytesOptions, SpecEntryAttrs, SpecFsError};

pub(crate) fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, txt).expect("write text");
}

/// [`LocalFs`] wrapper that fails chosen operations on chosen paths with
/// `PermissionDenied`, independent of the privileges tests run with.
#[derive(Debug, Default)]
pub(crate) struct FaultFs {
    inner: LocalFs,
    set_fail_stat: HashSet<PathBuf>,
    set_fail_list: HashSet<PathBuf>,
    set_fail_mkdir: HashSet<PathBuf>,
    set_fail_copy: HashSet<PathBuf>,
    set_fail_delete: HashSet<PathBuf>,
    set_fail_rename: HashSet<PathBuf>,
    set_fail_open: HashSet<PathBuf>,
}

impl FaultFs {
    pub(crate) fn fail_stat(mut self, path: PathBuf) -> Self {
        self.set_fail_stat.insert(path);
        self
    }

    pub(crate) fn fail_list(mut self, path: PathBuf) -> Self {
        self.set_fail_list.insert(path);
        self
    }

    pub(crate) fn fail_mkdir(mut self, path: PathBuf) -> Self {
        self.set_fail_mkdir.insert(path);
        self
    }

    pub(crate) fn fail_copy(mut self, path: PathBuf) -> Self {
        self.set_fail_copy.insert(path);
        self
    }

    pub(crate) fn fail_delete(mut self, path: PathBuf) -> Self {
        self.set_fail_delete.insert(path);
        self
    }

    pub(crate) fn fail_rename(mut self, path: PathBuf) -> Self {
        self.set_fail_rename.insert(path);
        self
    }

    pub(crate) fn fail_open(mut self, path: PathBuf) -> Self {
        self.set_fail_open.insert(path);
        self
    }

    fn check(
        set_paths: &HashSet<PathBuf>,
        path: &Path,
        kind: EnumFsErrorKind,
    ) -> Result<(), SpecFsError> {
        if set_paths.contains(path) {
            return Err(SpecFsError::new(kind, path, "injected failure"));
        }
        Ok(())
    }
}

impl FsProvider for FaultFs {
    fn stat(&self, path: &Path, if_follow_links: bool) -> Result<SpecEntryAttrs, SpecFsError> {
        Self::check(&self.set_fail_stat, path, EnumFsErrorKind::PermissionDenied)?;
        self.inner.stat(path, if_follow_links)
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<OsString>, SpecFsError> {
        Self::check(&self.set_fail_list, path, EnumFsErrorKind::PermissionDenied)?;
        self.inner.list_entries(path)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, SpecFsError> {
        self.inner.read_link(path)
    }

    fn create_directory(&self, path: &Path) -> Result<(), SpecFsError> {
        Self::check(&self.set_fail_mkdir, path, EnumFsErrorKind::PermissionDenied)?;
        self.inner.create_directory(path)
    }

    fn copy_bytes(
        &self,
        path_src: &Path,
        path_dst: &Path,
        spec_options: SpecCopyBytesOptions,
    ) -> Result<u64, SpecFsError> {
        Self::check(&self.set_fail_copy, path_src, EnumFsErrorKind::PermissionDenied)?;
        self.inner.copy_bytes(path_src, path_dst, spec_options)
    }

    fn create_symlink(
        &self,
        target: &Path,
        path_link: &Path,
        if_dir: bool,
    ) -> Result<(), SpecFsError> {
        self.inner.create_symlink(target, path_link, if_dir)
    }

    fn delete_entry(&self, path: &Path) -> Result<(), SpecFsError> {
        Self::check(&self.set_fail_delete, path, EnumFsErrorKind::PermissionDenied)?;
        self.inner.delete_entry(path)
    }

    fn rename_entry(
        &self,
        path_src: &Path,
        path_dst: &Path,
        if_replace_existing: bool,
    ) -> Result<(), SpecFsError> {
        Self::check(&self.set_fail_rename, path_src, EnumFsErrorKind::PermissionDenied)?;
        self.inner.rename_entry(path_src, path_dst, if_replace_existing)
    }

    fn set_last_modified_time(&self, path: &Path, time: SystemTime) -> Result<(), SpecFsError> {
        self.inner.set_last_modified_time(path, time)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, SpecFsError> {
        Self::check(&self.set_fail_open, path, EnumFsErrorKind::Unreadable)?;
        self.inner.open_read(path)
    }
}
