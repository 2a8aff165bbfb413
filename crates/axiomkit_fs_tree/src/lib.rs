//! `axiomkit_fs_tree` v1:
//! Visitor-driven filesystem tree engine.
//!
//! Layout:
//! - `walk`     : depth-first traversal and the visitor contract
//! - `provider` : filesystem capability trait and the local implementation
//! - `copy`     : recursive copy
//! - `relocate` : recursive move (rename or copy-then-delete)
//! - `delete`   : recursive delete
//! - `search`   : name/glob/content search
//! - `list`     : directory listing in post-order
//! - `batch`    : independent jobs on a worker pool
//! - `spec`     : enums/options/errors
//! - `report`   : run-time report model
//!
//! Every operation is partial-success: per-entry failures are collected in
//! [`ReportTree`] and the walk goes on. `Err` is reserved for setup failures.

pub mod batch;
pub mod copy;
pub mod delete;
pub mod list;
pub mod provider;
pub mod relocate;
pub mod report;
pub mod search;
pub mod spec;
mod util;
pub mod walk;

#[cfg(test)]
mod test_support;

pub use batch::{EnumTreeJob, run_tree_jobs};
pub use copy::{copy_tree, copy_tree_with};
pub use delete::{delete_tree, delete_tree_with};
pub use list::{list_tree, list_tree_with};
pub use provider::{FsProvider, LocalFs};
pub use relocate::{move_tree, move_tree_with};
pub use report::{ReportTree, ReportTreeBuilder};
pub use search::{
    search_by_content, search_by_content_with, search_by_glob, search_by_glob_with,
    search_by_name, search_by_name_with,
};
pub use spec::{
    EnumEntryKind, EnumFsErrorKind, EnumMoveStrategy, EnumPatternMode, EnumTreeOp,
    EnumVisitControl, SpecCopyBytesOptions, SpecCopyOptions, SpecDeleteOptions, SpecEntryAttrs,
    SpecEntryIdentity, SpecFsError, SpecListOptions, SpecMoveOptions, SpecSearchContentOptions,
    SpecSearchGlobOptions, SpecSearchNameOptions, SpecTreeError, SpecTreeMatch, SpecVisitEntry,
    SpecWalkOptions, TUP_TEXT_EXTENSIONS_DEFAULT, TreeOpError,
};
pub use util::parse_search_terms;
pub use walk::{SpecWalkSummary, TreeVisitor, walk_tree};
