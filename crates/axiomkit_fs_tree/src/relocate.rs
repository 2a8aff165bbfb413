//! Recursive move: per-file rename or copy-then-delete, then directory cleanup.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::provider::{FsProvider, LocalFs};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumEntryKind, EnumMoveStrategy, EnumTreeOp, EnumVisitControl, SpecCopyBytesOptions,
    SpecEntryAttrs, SpecFsError, SpecMoveOptions, SpecVisitEntry, SpecWalkOptions, TreeOpError,
};
use crate::util::{
    create_missing_ancestors, derive_destination_path, derive_existing_ancestor, is_overlap,
    prepare_destination_directory, recreate_symlink, validate_root_exists,
};
use crate::walk::{TreeVisitor, walk_tree};

/// Frame for one open source directory.
#[derive(Debug, Clone, Copy)]
struct SpecDirFrame {
    depth: usize,
    time_modified: Option<SystemTime>,
    /// The destination shell exists; children were moved into it.
    if_prepared: bool,
}

struct MoveVisitor<'a, P: ?Sized> {
    provider: &'a P,
    path_dir_dst: PathBuf,
    spec_mv_options: SpecMoveOptions,
    if_rename: bool,
    builder_report: ReportTreeBuilder,
    l_frames_dir: Vec<SpecDirFrame>,
}

/// Move the tree rooted at `dir_source` to `dir_destination` on the local disk.
///
/// Files are relocated one by one; each source directory is removed once its
/// children are gone. An entry that cannot be moved stays in place, so its
/// parent directories are reported as `NotEmpty` too.
pub fn move_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_mv_options: SpecMoveOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    move_tree_with(&LocalFs, dir_source, dir_destination, spec_mv_options)
}

/// [`move_tree`] against an injected provider.
pub fn move_tree_with<F, P, Q>(
    provider: &F,
    dir_source: P,
    dir_destination: Q,
    spec_mv_options: SpecMoveOptions,
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

    let if_rename = match spec_mv_options.rule_move {
        EnumMoveStrategy::Rename => true,
        EnumMoveStrategy::CopyDelete => false,
        EnumMoveStrategy::Auto => derive_existing_ancestor(provider, &path_dir_dst)
            .map(|path_anchor| {
                provider
                    .is_same_store(&path_dir_src, &path_anchor)
                    .unwrap_or(false)
            })
            .unwrap_or(false),
    };
    debug!(
        "Moving {} -> {} (rename={if_rename})",
        path_dir_src.display(),
        path_dir_dst.display()
    );

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_mv_options.if_follow_links,
        depth_max: None,
    };
    let mut visitor = MoveVisitor {
        provider,
        path_dir_dst,
        spec_mv_options,
        if_rename,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Move),
        l_frames_dir: Vec::new(),
    };
    let summary = walk_tree(&path_dir_src, &spec_walk_options, provider, &mut visitor)?;
    if summary.if_terminated {
        visitor.builder_report.mark_aborted(path_dir_src);
    }
    Ok(visitor.builder_report.build(summary.cnt_visited))
}

impl<P> MoveVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn move_entry(
        &self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
        path_dst: &Path,
    ) -> Result<bool, SpecFsError> {
        if entry.is_root() {
            create_missing_ancestors(self.provider, path_dst)?;
        }
        let if_replace_existing = self.spec_mv_options.if_replace_existing;
        if attrs.kind == EnumEntryKind::Other {
            return Ok(false);
        }
        if self.if_rename {
            self.provider
                .rename_entry(&entry.path, path_dst, if_replace_existing)?;
            return Ok(true);
        }

        if attrs.kind == EnumEntryKind::Symlink {
            recreate_symlink(self.provider, &entry.path, path_dst, if_replace_existing)?;
        } else {
            let spec_bytes_options = SpecCopyBytesOptions {
                if_replace_existing,
                if_preserve_attributes: true,
            };
            self.provider
                .copy_bytes(&entry.path, path_dst, spec_bytes_options)?;
        }
        self.provider.delete_entry(&entry.path)?;
        Ok(true)
    }
}

impl<P> TreeVisitor for MoveVisitor<'_, P>
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
            Ok(_) => {
                self.l_frames_dir.push(SpecDirFrame {
                    depth: entry.depth,
                    time_modified: attrs.time_modified,
                    if_prepared: true,
                });
                Ok(EnumVisitControl::Continue)
            }
            Err(e) => {
                self.builder_report.add_error(e);
                self.l_frames_dir.push(SpecDirFrame {
                    depth: entry.depth,
                    time_modified: None,
                    if_prepared: false,
                });
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
        match self.move_entry(entry, attrs, &path_dst) {
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
        // An unlisted directory was never pre-visited and stays in place.
        if self.l_frames_dir.last().map(|f| f.depth) != Some(entry.depth) {
            return Ok(EnumVisitControl::Continue);
        }
        let Some(spec_frame) = self.l_frames_dir.pop() else {
            return Ok(EnumVisitControl::Continue);
        };
        if !spec_frame.if_prepared {
            return Ok(EnumVisitControl::Continue);
        }

        match self.provider.delete_entry(&entry.path) {
            Ok(()) => self.builder_report.add_processed(),
            Err(e) => self.builder_report.add_error(e),
        }
        if let Some(time_modified) = spec_frame.time_modified {
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

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use filetime::FileTime;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{move_tree, move_tree_with};
    use crate::spec::{EnumFsErrorKind, EnumMoveStrategy, SpecMoveOptions, TreeOpError};
    use crate::test_support::{FaultFs, write_text};

    fn build_sample_tree(root: &std::path::Path) {
        write_text(&root.join("a.txt"), "alpha");
        write_text(&root.join("sub/b.txt"), "beta");
        write_text(&root.join("sub/deep/c.txt"), "gamma");
    }

    #[rstest]
    #[case(EnumMoveStrategy::Auto)]
    #[case(EnumMoveStrategy::Rename)]
    #[case(EnumMoveStrategy::CopyDelete)]
    fn move_tree_empties_source_and_fills_destination(#[case] rule_move: EnumMoveStrategy) {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        build_sample_tree(&src);
        let dst = tmp.path().join("dst");

        let spec_mv_options = SpecMoveOptions {
            rule_move,
            ..SpecMoveOptions::default()
        };
        let report = move_tree(&src, &dst, spec_mv_options).expect("move");

        assert_eq!(report.error_count(), 0, "{:?}", report.errors);
        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).expect("read"), "alpha");
        assert_eq!(
            std::fs::read_to_string(dst.join("sub/deep/c.txt")).expect("read"),
            "gamma"
        );
        // three files plus three source directories removed
        assert_eq!(report.cnt_processed, 6);
    }

    #[test]
    fn move_tree_keeps_directory_mtime_per_frame() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        build_sample_tree(&src);
        let time_sub = FileTime::from_system_time(UNIX_EPOCH + Duration::from_secs(1_500_000_000));
        let time_deep = FileTime::from_system_time(UNIX_EPOCH + Duration::from_secs(1_400_000_000));
        filetime::set_file_mtime(src.join("sub/deep"), time_deep).expect("mtime deep");
        filetime::set_file_mtime(src.join("sub"), time_sub).expect("mtime sub");
        let dst = tmp.path().join("dst");

        let spec_mv_options = SpecMoveOptions {
            rule_move: EnumMoveStrategy::CopyDelete,
            ..SpecMoveOptions::default()
        };
        move_tree(&src, &dst, spec_mv_options).expect("move");

        let mtime_of = |p: &std::path::Path| {
            FileTime::from_last_modification_time(&std::fs::metadata(p).expect("metadata"))
        };
        assert_eq!(mtime_of(&dst.join("sub")), time_sub);
        assert_eq!(mtime_of(&dst.join("sub/deep")), time_deep);
    }

    #[test]
    fn move_tree_failure_leaves_entry_and_reports_not_empty_ancestors() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        build_sample_tree(&src);
        let dst = tmp.path().join("dst");

        let provider = FaultFs::default().fail_rename(src.join("sub/b.txt"));
        let spec_mv_options = SpecMoveOptions {
            rule_move: EnumMoveStrategy::Rename,
            ..SpecMoveOptions::default()
        };
        let report = move_tree_with(&provider, &src, &dst, spec_mv_options).expect("move");

        assert!(src.join("sub/b.txt").exists());
        assert!(!src.join("sub/deep").exists());
        assert!(dst.join("sub/deep/c.txt").exists());
        assert_eq!(report.errors_of(EnumFsErrorKind::PermissionDenied).count(), 1);
        let l_not_empty: Vec<_> = report
            .errors_of(EnumFsErrorKind::NotEmpty)
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(l_not_empty, vec![src.join("sub"), src.clone()]);
    }

    #[test]
    fn move_tree_leaves_unlisted_directory_in_place() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        build_sample_tree(&src);
        let dst = tmp.path().join("dst");

        let provider = FaultFs::default().fail_list(src.join("sub"));
        let report =
            move_tree_with(&provider, &src, &dst, SpecMoveOptions::default()).expect("move");

        assert!(dst.join("a.txt").exists());
        assert!(!dst.join("sub").exists());
        assert!(src.join("sub/b.txt").exists());
        let l_denied: Vec<_> = report
            .errors_of(EnumFsErrorKind::PermissionDenied)
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(l_denied, vec![src.join("sub")]);
        let l_not_empty: Vec<_> = report
            .errors_of(EnumFsErrorKind::NotEmpty)
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(l_not_empty, vec![src.clone()]);
    }

    #[test]
    fn move_tree_reports_existing_destination_file() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "new");
        let dst = tmp.path().join("dst");
        write_text(&dst.join("a.txt"), "old");

        let report = move_tree(&src, &dst, SpecMoveOptions::default()).expect("move");
        assert_eq!(report.errors_of(EnumFsErrorKind::AlreadyExists).count(), 1);
        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).expect("read"), "old");
        assert!(src.join("a.txt").exists());

        let spec_mv_options = SpecMoveOptions {
            if_replace_existing: true,
            ..SpecMoveOptions::default()
        };
        let report = move_tree(&src, &dst, spec_mv_options).expect("move");
        assert_eq!(report.error_count(), 0);
        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).expect("read"), "new");
        assert!(!src.exists());
    }

    #[test]
    fn move_tree_rejects_overlap() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "a");

        let err =
            move_tree(&src, src.join("sub"), SpecMoveOptions::default()).expect_err("overlap");
        assert!(matches!(err, TreeOpError::SourceDestinationOverlap { .. }));
        assert!(src.join("a.txt").exists());
    }
}
