//! Tree operation enums, options, entry models and error types.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Directive returned by every visitor callback to steer the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumVisitControl {
    /// Keep going: descend into a directory, or move to the next entry.
    Continue,
    /// Do not list or descend into this directory (post-visit still runs).
    SkipSubtree,
    /// Finish this entry, then skip the remaining siblings in its parent.
    SkipSiblings,
    /// Abort the whole walk immediately.
    Terminate,
}

/// Kind of a filesystem entry as seen by the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumEntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link that was not followed (or is broken).
    Symlink,
    /// FIFO, socket, device node, ...
    Other,
}

/// Failure classification shared by every per-entry error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFsErrorKind {
    /// Entry does not exist.
    NotFound,
    /// Insufficient permissions.
    PermissionDenied,
    /// A followed symlink leads back to a directory still being visited.
    CycleDetected,
    /// Destination exists and replacing was not requested.
    AlreadyExists,
    /// Directory still has children.
    NotEmpty,
    /// File could not be opened or read for content scanning.
    Unreadable,
    /// Walk was cut short by a `Terminate` directive.
    Aborted,
    /// Any other I/O failure.
    Other,
}

impl EnumFsErrorKind {
    /// Stable snake-case name, used by reports and bridges.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::CycleDetected => "cycle_detected",
            Self::AlreadyExists => "already_exists",
            Self::NotEmpty => "not_empty",
            Self::Unreadable => "unreadable",
            Self::Aborted => "aborted",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EnumFsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<io::ErrorKind> for EnumFsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty,
            _ => Self::Other,
        }
    }
}

/// Pattern matching mode for glob searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// How `move_tree` relocates individual files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMoveStrategy {
    /// Rename when source and destination share a store, copy+delete otherwise.
    Auto,
    /// Always use the atomic rename primitive.
    Rename,
    /// Always copy bytes, then delete the source.
    CopyDelete,
}

/// Tree operation a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumTreeOp {
    /// `copy_tree`.
    Copy,
    /// `move_tree`.
    Move,
    /// `delete_tree`.
    Delete,
    /// Any `search_by_*`.
    #[default]
    Search,
    /// `list_tree`.
    List,
}

impl EnumTreeOp {
    /// Summary-line prefix, e.g. `[COPY]`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Copy => "[COPY]",
            Self::Move => "[MOVE]",
            Self::Delete => "[DELETE]",
            Self::Search => "[SEARCH]",
            Self::List => "[LIST]",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryModels

/// Filesystem-level identity used to tell whether two paths are one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpecEntryIdentity {
    /// Device + inode pair (Unix).
    DevIno(u64, u64),
    /// Canonicalized path (platforms without inode numbers).
    Canonical(PathBuf),
}

impl SpecEntryIdentity {
    /// Device id, when the platform exposes one.
    pub fn device(&self) -> Option<u64> {
        match self {
            Self::DevIno(dev, _) => Some(*dev),
            Self::Canonical(_) => None,
        }
    }
}

/// Attribute snapshot captured right before a visitor callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntryAttrs {
    /// Entry kind after link resolution (if links are followed).
    pub kind: EnumEntryKind,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub time_modified: Option<SystemTime>,
    /// Creation time, where the platform records it.
    pub time_created: Option<SystemTime>,
    /// Identity for cycle detection and same-store checks.
    pub identity: Option<SpecEntryIdentity>,
}

impl SpecEntryAttrs {
    /// `true` for directories.
    pub fn is_dir(&self) -> bool {
        self.kind == EnumEntryKind::Directory
    }
}

/// Handle to the entry currently being visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecVisitEntry {
    /// Full path as reached by the walk.
    pub path: PathBuf,
    /// Path relative to the walk root (empty for the root itself).
    pub path_relative: PathBuf,
    /// Depth below the root; the root is `0`.
    pub depth: usize,
    /// The entry itself is a symlink (even when followed).
    pub if_is_symlink: bool,
}

impl SpecVisitEntry {
    /// Final path component, lossily converted.
    pub fn name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
    }

    /// `true` for the walk root.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Engine-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecWalkOptions {
    /// Descend into symbolic links that point to directories.
    pub if_follow_links: bool,
    /// Maximum depth to list; `None` is unbounded, `Some(0)` visits the root only.
    pub depth_max: Option<usize>,
}

/// Per-file copy flags handed to [`crate::provider::FsProvider::copy_bytes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecCopyBytesOptions {
    /// Overwrite an existing destination file.
    pub if_replace_existing: bool,
    /// Carry timestamps/permissions (and xattrs on Linux) to the destination.
    pub if_preserve_attributes: bool,
}

/// Input options for `copy_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyOptions {
    /// Overwrite existing destination files and directory metadata.
    pub if_replace_existing: bool,
    /// Copy last-modified time (and other attributes) to each file.
    pub if_preserve_attributes: bool,
    /// Follow directory symlinks instead of recreating them.
    pub if_follow_links: bool,
    /// Optional depth cap.
    pub depth_max: Option<usize>,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            if_replace_existing: false,
            if_preserve_attributes: true,
            if_follow_links: false,
            depth_max: None,
        }
    }
}

/// Input options for `move_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMoveOptions {
    /// Overwrite existing destination files.
    pub if_replace_existing: bool,
    /// Follow directory symlinks instead of moving the link itself.
    pub if_follow_links: bool,
    /// File relocation primitive.
    pub rule_move: EnumMoveStrategy,
}

impl Default for SpecMoveOptions {
    fn default() -> Self {
        Self {
            if_replace_existing: false,
            if_follow_links: false,
            rule_move: EnumMoveStrategy::Auto,
        }
    }
}

/// Input options for `delete_tree`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDeleteOptions {
    /// Descend into directory symlinks (their targets' contents get deleted).
    pub if_follow_links: bool,
    /// Do not mutate filesystem; record what would be deleted.
    pub if_dry_run: bool,
}

/// Input options for `search_by_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSearchNameOptions {
    /// Follow directory symlinks.
    pub if_follow_links: bool,
    /// Terminate the walk on the first match.
    pub if_stop_on_first: bool,
    /// Also test directory names.
    pub if_match_dirs: bool,
    /// Optional depth cap.
    pub depth_max: Option<usize>,
}

/// Input options for `search_by_glob`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSearchGlobOptions {
    /// Inclusive size ceiling in bytes.
    pub size_max: Option<u64>,
    /// Follow directory symlinks.
    pub if_follow_links: bool,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Optional depth cap.
    pub depth_max: Option<usize>,
}

impl Default for SpecSearchGlobOptions {
    fn default() -> Self {
        Self {
            size_max: None,
            if_follow_links: false,
            rule_pattern: EnumPatternMode::Glob,
            depth_max: None,
        }
    }
}

/// Extensions scanned by `search_by_content` when none are given.
pub const TUP_TEXT_EXTENSIONS_DEFAULT: [&str; 6] = ["txt", "xml", "html", "htm", "xhtml", "rtf"];

/// Input options for `search_by_content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSearchContentOptions {
    /// Lower-case extensions (without dot) whose files are scanned.
    pub extensions: BTreeSet<String>,
    /// Follow directory symlinks.
    pub if_follow_links: bool,
    /// Optional depth cap.
    pub depth_max: Option<usize>,
}

impl Default for SpecSearchContentOptions {
    fn default() -> Self {
        Self {
            extensions: TUP_TEXT_EXTENSIONS_DEFAULT
                .iter()
                .map(|v| v.to_string())
                .collect(),
            if_follow_links: false,
            depth_max: None,
        }
    }
}

/// Input options for `list_tree`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecListOptions {
    /// Follow directory symlinks.
    pub if_follow_links: bool,
    /// Also list non-directory entries.
    pub if_include_files: bool,
    /// Optional depth cap.
    pub depth_max: Option<usize>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// One per-entry failure, as surfaced to visitors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {} ({message})", .path.display())]
pub struct SpecFsError {
    /// Failure class.
    pub kind: EnumFsErrorKind,
    /// Path the failure belongs to.
    pub path: PathBuf,
    /// Underlying error text.
    pub message: String,
}

impl SpecFsError {
    /// Build an error of an explicit kind.
    pub fn new(
        kind: EnumFsErrorKind,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify an `io::Error` raised for `path`.
    pub fn from_io(path: &Path, error: &io::Error) -> Self {
        Self::new(EnumFsErrorKind::from(error.kind()), path, error.to_string())
    }

    /// Cycle detected while following `path`.
    pub fn cycle(path: &Path) -> Self {
        Self::new(
            EnumFsErrorKind::CycleDetected,
            path,
            "symbolic link loop back to an ancestor directory",
        )
    }
}

/// One failure item recorded in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTreeError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// Failure class.
    pub kind: EnumFsErrorKind,
    /// User-facing error text.
    pub exception: String,
}

impl From<SpecFsError> for SpecTreeError {
    fn from(error: SpecFsError) -> Self {
        Self {
            path: error.path,
            kind: error.kind,
            exception: error.message,
        }
    }
}

/// One search/dry-run hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTreeMatch {
    /// Full path as reached by the walk.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub path_relative: PathBuf,
    /// Size attribute captured during the visit.
    pub size: u64,
}

/// "Top-level call failed" errors (input validation / setup stage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeOpError {
    /// Traversal root does not exist or cannot be inspected.
    #[error("Root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        .path_src.display(),
        .path_dst.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        path_src: PathBuf,
        /// Normalized destination directory.
        path_dst: PathBuf,
    },
    /// Invalid glob/regex pattern.
    #[error("{0}")]
    InvalidPattern(String),
    /// Content search received no usable term.
    #[error("{0}")]
    InvalidSearchTerms(String),
    /// A visitor propagated an error out of the root directory.
    #[error("Walk aborted: {0}")]
    Walk(#[from] SpecFsError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
