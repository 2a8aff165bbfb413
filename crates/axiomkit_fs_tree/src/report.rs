//! Tree operation report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::spec::{EnumFsErrorKind, EnumTreeOp, SpecFsError, SpecTreeError, SpecTreeMatch};

/// Aggregate counters and diagnostics for one tree operation.
///
/// Runs are partial-success: a report is returned even when some entries
/// failed, with every failure listed in [`ReportTree::errors`].
#[derive(Debug, Default, Clone)]
pub struct ReportTree {
    /// Operation that produced this report.
    pub kind_op: EnumTreeOp,
    /// Entries handed to a visitor callback.
    pub cnt_visited: u64,
    /// Entries successfully copied/moved/deleted/scanned.
    pub cnt_processed: u64,
    /// Search hits (or dry-run candidates).
    pub cnt_matched: u64,
    /// Entries skipped by policy.
    pub cnt_skipped: u64,
    /// Matched entries, in visit order.
    pub matches: Vec<SpecTreeMatch>,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecTreeError>,
    /// The walk was terminated before completion.
    pub if_aborted: bool,
}

impl ReportTree {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Errors of one kind.
    pub fn errors_of(&self, kind: EnumFsErrorKind) -> impl Iterator<Item = &SpecTreeError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Relative paths of all matches.
    pub fn matched_paths(&self) -> Vec<PathBuf> {
        self.matches
            .iter()
            .map(|m| m.path_relative.clone())
            .collect()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_visited".to_string(), self.cnt_visited);
        dict_counts.insert("cnt_processed".to_string(), self.cnt_processed);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        let mut txt = format!(
            "{prefix} visited={} processed={} matched={} skipped={} errors={} warnings={}",
            dict_counts["cnt_visited"],
            dict_counts["cnt_processed"],
            dict_counts["cnt_matched"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        );
        if self.if_aborted {
            txt.push_str(" aborted");
        }
        txt
    }
}

impl fmt::Display for ReportTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(self.kind_op.prefix()))
    }
}

/// Mutable accumulator owned by an algorithm visitor.
#[derive(Debug, Default, Clone)]
pub struct ReportTreeBuilder {
    /// See [`ReportTree::kind_op`].
    pub kind_op: EnumTreeOp,
    /// See [`ReportTree::cnt_processed`].
    pub cnt_processed: u64,
    /// See [`ReportTree::cnt_matched`].
    pub cnt_matched: u64,
    /// See [`ReportTree::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportTree::matches`].
    pub matches: Vec<SpecTreeMatch>,
    /// See [`ReportTree::warnings`].
    pub warnings: Vec<String>,
    /// See [`ReportTree::errors`].
    pub errors: Vec<SpecTreeError>,
    /// See [`ReportTree::if_aborted`].
    pub if_aborted: bool,
}

impl ReportTreeBuilder {
    /// Empty builder for one operation.
    pub fn new(kind_op: EnumTreeOp) -> Self {
        Self {
            kind_op,
            ..Self::default()
        }
    }

    /// Increment processed count by one.
    pub fn add_processed(&mut self) {
        self.cnt_processed += 1;
    }

    /// Increment skipped count by one.
    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Record one match.
    pub fn add_match(&mut self, spec_match: SpecTreeMatch) {
        self.cnt_matched += 1;
        self.matches.push(spec_match);
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, error: SpecFsError) {
        warn!("{error}");
        self.errors.push(SpecTreeError::from(error));
    }

    /// Mark the run as terminated early at `path`.
    pub fn mark_aborted(&mut self, path: PathBuf) {
        self.if_aborted = true;
        self.add_error(SpecFsError::new(
            EnumFsErrorKind::Aborted,
            path,
            "walk terminated before completion",
        ));
    }

    /// Finalize builder into immutable report.
    pub fn build(self, cnt_visited: u64) -> ReportTree {
        ReportTree {
            kind_op: self.kind_op,
            cnt_visited,
            cnt_processed: self.cnt_processed,
            cnt_matched: self.cnt_matched,
            cnt_skipped: self.cnt_skipped,
            matches: self.matches,
            warnings: self.warnings,
            errors: self.errors,
            if_aborted: self.if_aborted,
        }
    }
}
