//! Recursive copy built on the tree walker.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::provider::{FsProvider, LocalFs};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumEntryKind, EnumTreeOp, EnumVisitControl, SpecCopyBytesOptions, SpecCopyOptions,
    SpecEntryAttrs, SpecFsError, SpecVisitEntry, SpecWalkOptions, TreeOpError,
};
use crate::util::{
    EnumDirPrepared, create_missing_ancestors, derive_destination_path, is_overlap,
    prepare_destination_directory, recreate_symlink, validate_root_exists,
};
use crate::walk::{TreeVisitor, walk_tree};

struct CopyVisitor<'a, P: ?Sized> {
    provider: &'a P,
    path_dir_dst: PathBuf,
    spec_cp_options: SpecCopyOptions,
    builder_report: ReportTreeBuilder,
    /// Depth and source mtime of each pre-visited directory still open.
    l_frames_time: Vec<(usize, Option<SystemTime>)>,
}

/// Copy the tree rooted at `dir_source` to `dir_destination` on the local disk.
///
/// The destination root is created (with any missing ancestors) if needed and
/// reused when it already exists as a directory. Returns [`ReportTree`] when
/// the walk completes, with per-entry failures stored in the report.
/// Returns [`TreeOpError`] only for setup failures: a missing source root or
/// overlapping source and destination.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_tree_with(&LocalFs, dir_source, dir_destination, spec_cp_options)
}

/// [`copy_tree`] against an injected provider.
pub fn copy_tree_with<F, P, Q>(
    provider: &F,
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    validate_root_exists(provider, &path_dir_src)?;
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(TreeOpError::SourceDestinationOverlap {
            path_src: path_dir_src,
            path_dst: path_dir_dst,
        });
    }
    debug!(
        "Copying {} -> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_cp_options.if_follow_links,
        depth_max: spec_cp_options.depth_max,
    };
    let mut visitor = CopyVisitor {
        provider,
        path_dir_dst,
        spec_cp_options,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Copy),
        l_frames_time: Vec::new(),
    };
    let summary = walk_tree(&path_dir_src, &spec_walk_options, provider, &mut visitor)?;
    if summary.if_terminated {
        visitor.builder_report.mark_aborted(path_dir_src);
    }
    Ok(visitor.builder_report.build(summary.cnt_visited))
}

impl<P> CopyVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn copy_entry(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
        path_dst: &Path,
    ) -> Result<bool, SpecFsError> {
        if entry.is_root() {
            create_missing_ancestors(self.provider, path_dst)?;
        }
        match attrs.kind {
            EnumEntryKind::Symlink => {
                recreate_symlink(
                    self.provider,
                    &entry.path,
                    path_dst,
                    self.spec_cp_options.if_replace_existing,
                )?;
                Ok(true)
            }
            EnumEntryKind::Other => Ok(false),
            EnumEntryKind::File | EnumEntryKind::Directory => {
                let spec_bytes_options = SpecCopyBytesOptions {
                    if_replace_existing: self.spec_cp_options.if_replace_existing,
                    if_preserve_attributes: self.spec_cp_options.if_preserve_attributes,
                };
                self.provider
                    .copy_bytes(&entry.path, path_dst, spec_bytes_options)?;
                Ok(true)
            }
        }
    }
}

impl<P> TreeVisitor for CopyVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn pre_visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let path_dst = derive_destination_path(&self.path_dir_dst, &entry.path_relative);
        match prepare_destination_directory(self.provider, &path_dst, entry.is_root()) {
            Ok(enum_prepared) => {
                debug!("Directory {:?}: {}", enum_prepared, path_dst.display());
                let if_stamp = self.spec_cp_options.if_preserve_attributes
                    && (enum_prepared == EnumDirPrepared::Created
                        || self.spec_cp_options.if_replace_existing);
                self.l_frames_time
                    .push((entry.depth, if_stamp.then_some(attrs.time_modified).flatten()));
                self.builder_report.add_processed();
                Ok(EnumVisitControl::Continue)
            }
            Err(e) => {
                self.builder_report.add_error(e);
                self.l_frames_time.push((entry.depth, None));
                Ok(EnumVisitControl::SkipSubtree)
            }
        }
    }

    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let path_dst = derive_destination_path(&self.path_dir_dst, &entry.path_relative);
        match self.copy_entry(entry, attrs, &path_dst) {
            Ok(true) => self.builder_report.add_processed(),
            Ok(false) => {
                self.builder_report.add_skipped();
                self.builder_report
                    .add_warning(format!("Special file skipped: {}", entry.path.display()));
            }
            Err(e) => self.builder_report.add_error(e),
        }
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
        // An unlisted directory reaches post-visit without a frame of its own.
        if self.l_frames_time.last().map(|(n_depth, _)| *n_depth) != Some(entry.depth) {
            return Ok(EnumVisitControl::Continue);
        }
        if let Some((_, Some(time_modified))) = self.l_frames_time.pop() {
            let path_dst = derive_destination_path(&self.path_dir_dst, &entry.path_relative);
            if let Err(e) = self
                .provider
                .set_last_modified_time(&path_dst, time_modified)
            {
                self.builder_report.add_error(e);
            }
        }
        Ok(EnumVisitControl::Continue)
    }
}
