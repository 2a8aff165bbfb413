use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::provider::FsProvider;
use crate::spec::{EnumFsErrorKind, EnumPatternMode, SpecEntryAttrs, SpecFsError, TreeOpError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

/// Name matcher compiled once before a walk.
#[derive(Debug, Clone)]
pub(crate) enum TypeNameMatcher {
    Literal(String),
    Glob(GlobMatcher),
    Regex(Regex),
}

impl TypeNameMatcher {
    pub(crate) fn compile(
        pattern: &str,
        rule_pattern: EnumPatternMode,
    ) -> Result<Self, TreeOpError> {
        match rule_pattern {
            EnumPatternMode::Literal => Ok(Self::Literal(pattern.to_string())),
            EnumPatternMode::Glob => {
                let matcher = Glob::new(pattern)
                    .map_err(|e| {
                        TreeOpError::InvalidPattern(format!("Invalid glob pattern: {e}"))
                    })?
                    .compile_matcher();
                Ok(Self::Glob(matcher))
            }
            EnumPatternMode::Regex => {
                let regex = Regex::new(pattern).map_err(|e| {
                    TreeOpError::InvalidPattern(format!("Invalid regex pattern: {e}"))
                })?;
                Ok(Self::Regex(regex))
            }
        }
    }

    pub(crate) fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Literal(v) => name.contains(v.as_str()),
            Self::Glob(v) => v.is_match(name),
            Self::Regex(v) => v.is_match(name),
        }
    }
}

/// Split a comma-separated term list, trimming blanks.
pub fn parse_search_terms(raw_terms: &str) -> Vec<String> {
    raw_terms
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lower-case extension of the final path component, if any.
pub(crate) fn derive_extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .map(|v| v.to_string_lossy().to_ascii_lowercase())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    // Destination may not exist yet: resolve the deepest existing ancestor.
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && !parent.as_os_str().is_empty()
    {
        return _normalize_path(parent).join(name);
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Map a visited entry onto the destination tree.
pub(crate) fn derive_destination_path(path_dir_dst: &Path, path_relative: &Path) -> PathBuf {
    if path_relative.as_os_str().is_empty() {
        return path_dir_dst.to_path_buf();
    }
    path_dir_dst.join(path_relative)
}

/// Deepest existing ancestor of `path` (or `path` itself).
///
/// The empty parent of a bare relative name stands for the current directory.
pub(crate) fn derive_existing_ancestor<P>(provider: &P, path: &Path) -> Option<PathBuf>
where
    P: FsProvider + ?Sized,
{
    let mut path_cursor = Some(path);
    while let Some(path_current) = path_cursor {
        let path_stat = if path_current.as_os_str().is_empty() {
            Path::new(".")
        } else {
            path_current
        };
        if provider.stat(path_stat, true).is_ok() {
            return Some(path_stat.to_path_buf());
        }
        path_cursor = path_current.parent();
    }
    None
}

/// Create every missing ancestor of `path` (not `path` itself), outermost first.
pub(crate) fn create_missing_ancestors<P>(provider: &P, path: &Path) -> Result<(), SpecFsError>
where
    P: FsProvider + ?Sized,
{
    let Some(path_parent) = path.parent() else {
        return Ok(());
    };
    let mut l_missing = Vec::new();
    let mut path_cursor = Some(path_parent);
    while let Some(path_current) = path_cursor {
        if path_current.as_os_str().is_empty() || provider.stat(path_current, true).is_ok() {
            break;
        }
        l_missing.push(path_current);
        path_cursor = path_current.parent();
    }
    for path_dir in l_missing.into_iter().rev() {
        provider.create_directory(path_dir)?;
    }
    Ok(())
}

/// Validate that a traversal root exists (without following a final link).
pub(crate) fn validate_root_exists<P>(
    provider: &P,
    path_root: &Path,
) -> Result<SpecEntryAttrs, TreeOpError>
where
    P: FsProvider + ?Sized,
{
    provider
        .stat(path_root, false)
        .map_err(|_| TreeOpError::RootNotFound(path_root.to_path_buf()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DestinationWrites

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumDirPrepared {
    Created,
    Reused,
}

/// Make sure `path_dst` is a directory, reusing an existing one.
pub(crate) fn prepare_destination_directory<P>(
    provider: &P,
    path_dst: &Path,
    if_root: bool,
) -> Result<EnumDirPrepared, SpecFsError>
where
    P: FsProvider + ?Sized,
{
    if if_root {
        create_missing_ancestors(provider, path_dst)?;
    }
    match provider.stat(path_dst, false) {
        Ok(attrs) if attrs.is_dir() => Ok(EnumDirPrepared::Reused),
        Ok(_) => Err(SpecFsError::new(
            EnumFsErrorKind::AlreadyExists,
            path_dst,
            "Destination exists and is not a directory",
        )),
        Err(e) if e.kind == EnumFsErrorKind::NotFound => {
            provider.create_directory(path_dst)?;
            Ok(EnumDirPrepared::Created)
        }
        Err(e) => Err(e),
    }
}

/// Recreate the symlink at `path_src` as `path_dst`, with the same target.
pub(crate) fn recreate_symlink<P>(
    provider: &P,
    path_src: &Path,
    path_dst: &Path,
    if_replace_existing: bool,
) -> Result<(), SpecFsError>
where
    P: FsProvider + ?Sized,
{
    let target = provider.read_link(path_src)?;
    if let Ok(attrs_dst) = provider.stat(path_dst, false) {
        if !if_replace_existing || attrs_dst.is_dir() {
            return Err(SpecFsError::new(
                EnumFsErrorKind::AlreadyExists,
                path_dst,
                "Destination exists",
            ));
        }
        provider.delete_entry(path_dst)?;
    }
    let if_dir = provider.stat(path_src, true).is_ok_and(|v| v.is_dir());
    provider.create_symlink(&target, path_dst, if_dir)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workers

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
