//! Tree listing: every directory once its subtree is done, optionally files too.

use std::path::Path;

use crate::provider::{FsProvider, LocalFs};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::search::{record_match, run_search};
use crate::spec::{
    EnumTreeOp, EnumVisitControl, SpecEntryAttrs, SpecFsError, SpecListOptions, SpecVisitEntry,
    SpecWalkOptions, TreeOpError,
};
use crate::util::validate_root_exists;
use crate::walk::TreeVisitor;

struct ListVisitor {
    if_include_files: bool,
    builder_report: ReportTreeBuilder,
}

impl AsMut<ReportTreeBuilder> for ListVisitor {
    fn as_mut(&mut self) -> &mut ReportTreeBuilder {
        &mut self.builder_report
    }
}

impl TreeVisitor for ListVisitor {
    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        if self.if_include_files {
            record_match(&mut self.builder_report, entry, attrs.size);
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
        record_match(&mut self.builder_report, entry, 0);
        Ok(EnumVisitControl::Continue)
    }
}

/// List the tree rooted at `path_root` on the local disk.
///
/// Directories (root included) are reported in [`ReportTree::matches`] once
/// their subtree has been walked, so children come before their parent.
/// With `if_include_files`, other entries are reported as they are visited.
/// Unreadable entries are recorded as errors and the walk goes on.
pub fn list_tree<P>(path_root: P, spec_options: SpecListOptions) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
{
    list_tree_with(&LocalFs, path_root, spec_options)
}

/// [`list_tree`] against an injected provider.
pub fn list_tree_with<F, P>(
    provider: &F,
    path_root: P,
    spec_options: SpecListOptions,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    P: AsRef<Path>,
{
    let path_root = path_root.as_ref();
    validate_root_exists(provider, path_root)?;

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_options.if_follow_links,
        depth_max: spec_options.depth_max,
    };
    let mut visitor = ListVisitor {
        if_include_files: spec_options.if_include_files,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::List),
    };
    run_search(provider, path_root, &spec_walk_options, &mut visitor, false)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{list_tree, list_tree_with};
    use crate::spec::{EnumFsErrorKind, EnumTreeOp, SpecListOptions, TreeOpError};
    use crate::test_support::{FaultFs, write_text};

    #[test]
    fn list_tree_reports_directories_after_their_children() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a.txt"), "a");
        write_text(&root.join("sub/deep/c.txt"), "c");
        write_text(&root.join("sub/b.txt"), "b");

        let report = list_tree(&root, SpecListOptions::default()).expect("list");

        assert_eq!(report.kind_op, EnumTreeOp::List);
        assert_eq!(report.error_count(), 0);
        assert_eq!(
            report.matched_paths(),
            vec![
                PathBuf::from("sub/deep"),
                PathBuf::from("sub"),
                PathBuf::new()
            ]
        );
        assert_eq!(report.cnt_visited, 6);
    }

    #[test]
    fn list_tree_includes_files_in_visit_order() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a.txt"), "alpha");
        write_text(&root.join("sub/b.txt"), "b");

        let spec_options = SpecListOptions {
            if_include_files: true,
            ..SpecListOptions::default()
        };
        let report = list_tree(&root, spec_options).expect("list");

        assert_eq!(
            report.matched_paths(),
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("sub/b.txt"),
                PathBuf::from("sub"),
                PathBuf::new()
            ]
        );
        assert_eq!(report.matches[0].size, 5);
    }

    #[test]
    fn list_tree_respects_depth_and_records_unreadable_directories() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("sub/deep/c.txt"), "c");
        write_text(&root.join("other/d.txt"), "d");

        let spec_options = SpecListOptions {
            depth_max: Some(1),
            ..SpecListOptions::default()
        };
        let report = list_tree(&root, spec_options).expect("list");
        assert_eq!(
            report.matched_paths(),
            vec![PathBuf::from("other"), PathBuf::from("sub"), PathBuf::new()]
        );

        let provider = FaultFs::default().fail_list(root.join("sub"));
        let report = list_tree_with(&provider, &root, SpecListOptions::default()).expect("list");
        assert_eq!(report.errors_of(EnumFsErrorKind::PermissionDenied).count(), 1);
        assert_eq!(report.errors[0].path, root.join("sub"));
        assert!(!report.if_aborted);
        assert!(report.matched_paths().contains(&PathBuf::from("other")));
    }

    #[test]
    fn list_tree_rejects_missing_root() {
        let tmp = TempDir::new().expect("tempdir");
        let err = list_tree(tmp.path().join("missing"), SpecListOptions::default())
            .expect_err("missing root");
        assert!(matches!(err, TreeOpError::RootNotFound(_)));
    }
}
