//! Recursive delete.

use std::path::Path;

use tracing::debug;

use crate::provider::{FsProvider, LocalFs};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumTreeOp, EnumVisitControl, SpecDeleteOptions, SpecEntryAttrs, SpecFsError, SpecTreeMatch,
    SpecVisitEntry, SpecWalkOptions, TreeOpError,
};
use crate::util::validate_root_exists;
use crate::walk::{TreeVisitor, walk_tree};

struct DeleteVisitor<'a, P: ?Sized> {
    provider: &'a P,
    spec_del_options: SpecDeleteOptions,
    builder_report: ReportTreeBuilder,
}

/// Delete the tree rooted at `path_root` on the local disk, root included.
///
/// Files go first, then each directory once its children are gone. A failed
/// removal is recorded and leaves every ancestor non-empty, which is recorded
/// too. With `if_dry_run`, nothing is touched and the candidates are returned
/// in [`ReportTree::matches`].
pub fn delete_tree<P>(
    path_root: P,
    spec_del_options: SpecDeleteOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
{
    delete_tree_with(&LocalFs, path_root, spec_del_options)
}

/// [`delete_tree`] against an injected provider.
pub fn delete_tree_with<F, P>(
    provider: &F,
    path_root: P,
    spec_del_options: SpecDeleteOptions,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    P: AsRef<Path>,
{
    let path_root = path_root.as_ref().to_path_buf();
    validate_root_exists(provider, &path_root)?;
    debug!(
        "Deleting {} (dry_run={})",
        path_root.display(),
        spec_del_options.if_dry_run
    );

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_del_options.if_follow_links,
        depth_max: None,
    };
    let mut visitor = DeleteVisitor {
        provider,
        spec_del_options,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Delete),
    };
    let summary = walk_tree(&path_root, &spec_walk_options, provider, &mut visitor)?;
    if summary.if_terminated {
        visitor.builder_report.mark_aborted(path_root);
    }
    Ok(visitor.builder_report.build(summary.cnt_visited))
}

impl<P> DeleteVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn delete_entry(&mut self, entry: &SpecVisitEntry, size: u64) {
        if self.spec_del_options.if_dry_run {
            self.builder_report.add_skipped();
            self.builder_report.add_match(SpecTreeMatch {
                path: entry.path.clone(),
                path_relative: entry.path_relative.clone(),
                size,
            });
            return;
        }
        // A followed link is unlinked; its target stays.
        match self.provider.delete_entry(&entry.path) {
            Ok(()) => self.builder_report.add_processed(),
            Err(e) => self.builder_report.add_error(e),
        }
    }
}

impl<P> TreeVisitor for DeleteVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        self.delete_entry(entry, attrs.size);
        Ok(EnumVisitControl::Continue)
    }

    fn visit_file_failed(
        &mut self,
        _entry: &SpecVisitEntry,
        error: SpecFsError,
    ) -> Result<EnumVisitControl, SpecFsError> {
        self.builder_report.add_error(error);
        Ok(EnumVisitControl::Continue)
    }

    fn post_visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        error: Option<SpecFsError>,
    ) -> Result<EnumVisitControl, SpecFsError> {
        if let Some(e) = error {
            self.builder_report.add_error(e);
        }
        self.delete_entry(entry, 0);
        Ok(EnumVisitControl::Continue)
    }
}
