//! Name, pattern and content search over a tree.
//!
//! All three searches are read-only and tolerate unreadable entries: the
//! failure is recorded and earlier matches are kept.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, trace};

use crate::provider::{FsProvider, LocalFs};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumEntryKind, EnumFsErrorKind, EnumTreeOp, EnumVisitControl, SpecEntryAttrs, SpecFsError,
    SpecSearchContentOptions, SpecSearchGlobOptions, SpecSearchNameOptions, SpecTreeMatch,
    SpecVisitEntry, SpecWalkOptions, TreeOpError,
};
use crate::util::{TypeNameMatcher, derive_extension_lower, validate_root_exists};
use crate::walk::{TreeVisitor, walk_tree};

pub(crate) fn record_match(
    builder_report: &mut ReportTreeBuilder,
    entry: &SpecVisitEntry,
    size: u64,
) {
    debug!("Match: {}", entry.path.display());
    builder_report.add_match(SpecTreeMatch {
        path: entry.path.clone(),
        path_relative: entry.path_relative.clone(),
        size,
    });
}

pub(crate) fn run_search<F, V>(
    provider: &F,
    path_root: &Path,
    spec_walk_options: &SpecWalkOptions,
    visitor: &mut V,
    if_terminate_expected: bool,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    V: TreeVisitor + AsMut<ReportTreeBuilder>,
{
    let summary = walk_tree(path_root, spec_walk_options, provider, visitor)?;
    let builder_report = visitor.as_mut();
    if summary.if_terminated && !if_terminate_expected {
        builder_report.mark_aborted(path_root.to_path_buf());
    }
    Ok(std::mem::take(builder_report).build(summary.cnt_visited))
}

////////////////////////////////////////////////////////////////////////////////
// #region SearchByName

struct NameVisitor {
    name: String,
    spec_options: SpecSearchNameOptions,
    builder_report: ReportTreeBuilder,
}

impl NameVisitor {
    fn check(&mut self, entry: &SpecVisitEntry, size: u64) -> EnumVisitControl {
        if entry.name().as_deref() != Some(self.name.as_str()) {
            return EnumVisitControl::Continue;
        }
        record_match(&mut self.builder_report, entry, size);
        if self.spec_options.if_stop_on_first {
            return EnumVisitControl::Terminate;
        }
        EnumVisitControl::Continue
    }
}

impl AsMut<ReportTreeBuilder> for NameVisitor {
    fn as_mut(&mut self) -> &mut ReportTreeBuilder {
        &mut self.builder_report
    }
}

impl TreeVisitor for NameVisitor {
    fn pre_visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        _attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        if !self.spec_options.if_match_dirs || entry.is_root() {
            return Ok(EnumVisitControl::Continue);
        }
        Ok(self.check(entry, 0))
    }

    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        Ok(self.check(entry, attrs.size))
    }

    fn visit_file_failed(
        &mut self,
        _entry: &SpecVisitEntry,
        error: SpecFsError,
    ) -> Result<EnumVisitControl, SpecFsError> {
        self.builder_report.add_error(error);
        Ok(EnumVisitControl::Continue)
    }
}

/// Find entries whose final path component equals `name`.
///
/// With `if_stop_on_first`, the walk ends at the first match; that is a
/// normal completion, not an abort.
pub fn search_by_name<P>(
    path_root: P,
    name: &str,
    spec_options: SpecSearchNameOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
{
    search_by_name_with(&LocalFs, path_root, name, spec_options)
}

/// [`search_by_name`] against an injected provider.
pub fn search_by_name_with<F, P>(
    provider: &F,
    path_root: P,
    name: &str,
    spec_options: SpecSearchNameOptions,
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
    let if_stop_on_first = spec_options.if_stop_on_first;
    let mut visitor = NameVisitor {
        name: name.to_string(),
        spec_options,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Search),
    };
    run_search(
        provider,
        path_root,
        &spec_walk_options,
        &mut visitor,
        if_stop_on_first,
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SearchByGlob

struct GlobVisitor {
    matcher: TypeNameMatcher,
    size_max: Option<u64>,
    builder_report: ReportTreeBuilder,
}

impl AsMut<ReportTreeBuilder> for GlobVisitor {
    fn as_mut(&mut self) -> &mut ReportTreeBuilder {
        &mut self.builder_report
    }
}

impl TreeVisitor for GlobVisitor {
    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let Some(name) = entry.name() else {
            return Ok(EnumVisitControl::Continue);
        };
        if !self.matcher.is_match(&name) {
            return Ok(EnumVisitControl::Continue);
        }
        if self.size_max.is_some_and(|n_max| attrs.size > n_max) {
            trace!("Too large: {} ({} bytes)", entry.path.display(), attrs.size);
            self.builder_report.add_skipped();
            return Ok(EnumVisitControl::Continue);
        }
        record_match(&mut self.builder_report, entry, attrs.size);
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
}

/// Find non-directory entries whose name matches `pattern` and whose size is
/// at most `size_max` (when set).
///
/// The pattern is compiled once, as a glob by default. An invalid pattern
/// fails with [`TreeOpError::InvalidPattern`] before any entry is visited.
pub fn search_by_glob<P>(
    path_root: P,
    pattern: &str,
    spec_options: SpecSearchGlobOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
{
    search_by_glob_with(&LocalFs, path_root, pattern, spec_options)
}

/// [`search_by_glob`] against an injected provider.
pub fn search_by_glob_with<F, P>(
    provider: &F,
    path_root: P,
    pattern: &str,
    spec_options: SpecSearchGlobOptions,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    P: AsRef<Path>,
{
    let path_root = path_root.as_ref();
    validate_root_exists(provider, path_root)?;
    let matcher = TypeNameMatcher::compile(pattern, spec_options.rule_pattern)?;

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_options.if_follow_links,
        depth_max: spec_options.depth_max,
    };
    let mut visitor = GlobVisitor {
        matcher,
        size_max: spec_options.size_max,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Search),
    };
    run_search(provider, path_root, &spec_walk_options, &mut visitor, false)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SearchByContent

struct ContentVisitor<'a, P: ?Sized> {
    provider: &'a P,
    l_terms_lower: Vec<String>,
    set_extensions: BTreeSet<String>,
    builder_report: ReportTreeBuilder,
}

impl<P: ?Sized> AsMut<ReportTreeBuilder> for ContentVisitor<'_, P> {
    fn as_mut(&mut self) -> &mut ReportTreeBuilder {
        &mut self.builder_report
    }
}

impl<P> ContentVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    /// `true` when any line contains any term; stops at the first hit.
    fn scan(&self, path: &Path) -> Result<bool, SpecFsError> {
        let mut reader = self.provider.open_read(path)?;
        let mut buf_line = Vec::new();
        loop {
            buf_line.clear();
            let n_read = reader
                .read_until(b'\n', &mut buf_line)
                .map_err(|e| SpecFsError::new(EnumFsErrorKind::Unreadable, path, e.to_string()))?;
            if n_read == 0 {
                return Ok(false);
            }
            let line_lower = String::from_utf8_lossy(&buf_line).to_lowercase();
            if self
                .l_terms_lower
                .iter()
                .any(|term| line_lower.contains(term.as_str()))
            {
                return Ok(true);
            }
        }
    }
}

impl<P> TreeVisitor for ContentVisitor<'_, P>
where
    P: FsProvider + ?Sized,
{
    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        if attrs.kind != EnumEntryKind::File {
            return Ok(EnumVisitControl::Continue);
        }
        let if_text = derive_extension_lower(&entry.path)
            .is_some_and(|ext| self.set_extensions.contains(&ext));
        if !if_text {
            return Ok(EnumVisitControl::Continue);
        }

        match self.scan(&entry.path) {
            Ok(b_hit) => {
                self.builder_report.add_processed();
                if b_hit {
                    record_match(&mut self.builder_report, entry, attrs.size);
                }
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
}

/// Find text files containing any of `terms` (case-insensitive substrings).
///
/// Only files whose extension is in `extensions` are opened. Blank terms are
/// dropped; if none remain the call fails with
/// [`TreeOpError::InvalidSearchTerms`].
pub fn search_by_content<P, S>(
    path_root: P,
    terms: &[S],
    spec_options: SpecSearchContentOptions,
) -> Result<ReportTree, TreeOpError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    search_by_content_with(&LocalFs, path_root, terms, spec_options)
}

/// [`search_by_content`] against an injected provider.
pub fn search_by_content_with<F, P, S>(
    provider: &F,
    path_root: P,
    terms: &[S],
    spec_options: SpecSearchContentOptions,
) -> Result<ReportTree, TreeOpError>
where
    F: FsProvider + ?Sized,
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path_root = path_root.as_ref();
    validate_root_exists(provider, path_root)?;

    let l_terms_lower: Vec<String> = terms
        .iter()
        .map(|v| v.as_ref().trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    if l_terms_lower.is_empty() {
        return Err(TreeOpError::InvalidSearchTerms(
            "At least one non-blank search term is required.".to_string(),
        ));
    }
    let set_extensions = spec_options
        .extensions
        .iter()
        .map(|v| v.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let spec_walk_options = SpecWalkOptions {
        if_follow_links: spec_options.if_follow_links,
        depth_max: spec_options.depth_max,
    };
    let mut visitor = ContentVisitor {
        provider,
        l_terms_lower,
        set_extensions,
        builder_report: ReportTreeBuilder::new(EnumTreeOp::Search),
    };
    run_search(provider, path_root, &spec_walk_options, &mut visitor, false)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::{search_by_content, search_by_content_with, search_by_glob, search_by_name};
    use crate::spec::{
        EnumFsErrorKind, EnumPatternMode, SpecSearchContentOptions, SpecSearchGlobOptions,
        SpecSearchNameOptions, TreeOpError,
    };
    use crate::test_support::{FaultFs, write_text};

    #[test]
    fn search_by_name_finds_deep_file_once() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a/b/c/x.txt"), "x");
        write_text(&root.join("a/y.txt"), "y");

        let report =
            search_by_name(&root, "x.txt", SpecSearchNameOptions::default()).expect("search");
        assert_eq!(report.cnt_matched, 1);
        assert_eq!(report.matched_paths(), vec![PathBuf::from("a/b/c/x.txt")]);
        assert_eq!(report.matches[0].path, root.join("a/b/c/x.txt"));
        assert!(!report.if_aborted);

        let report =
            search_by_name(&root, "absent.txt", SpecSearchNameOptions::default()).expect("search");
        assert_eq!(report.cnt_matched, 0);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn search_by_name_stop_on_first_is_not_an_abort() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a/dup.txt"), "1");
        write_text(&root.join("b/dup.txt"), "2");

        let spec_options = SpecSearchNameOptions {
            if_stop_on_first: true,
            ..SpecSearchNameOptions::default()
        };
        let report = search_by_name(&root, "dup.txt", spec_options).expect("search");

        assert_eq!(report.matched_paths(), vec![PathBuf::from("a/dup.txt")]);
        assert!(!report.if_aborted);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn search_by_name_matches_directories_on_request() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("target/inner.txt"), "i");

        let report =
            search_by_name(&root, "target", SpecSearchNameOptions::default()).expect("search");
        assert_eq!(report.cnt_matched, 0);

        let spec_options = SpecSearchNameOptions {
            if_match_dirs: true,
            ..SpecSearchNameOptions::default()
        };
        let report = search_by_name(&root, "target", spec_options).expect("search");
        assert_eq!(report.matched_paths(), vec![PathBuf::from("target")]);
    }

    #[test]
    fn search_by_name_respects_depth_max() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a/b/c/x.txt"), "x");

        let spec_options = SpecSearchNameOptions {
            depth_max: Some(2),
            ..SpecSearchNameOptions::default()
        };
        let report = search_by_name(&root, "x.txt", spec_options).expect("search");
        assert_eq!(report.cnt_matched, 0);
    }

    #[test]
    fn search_by_glob_applies_size_ceiling() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("small.txt"), &"s".repeat(500));
        write_text(&root.join("sub/large.txt"), &"l".repeat(2048));
        write_text(&root.join("other.md"), "m");

        let spec_options = SpecSearchGlobOptions {
            size_max: Some(1024),
            ..SpecSearchGlobOptions::default()
        };
        let report = search_by_glob(&root, "*.txt", spec_options).expect("search");

        assert_eq!(report.matched_paths(), vec![PathBuf::from("small.txt")]);
        assert_eq!(report.matches[0].size, 500);
        assert_eq!(report.cnt_skipped, 1);
    }

    #[rstest]
    #[case("*.txt", EnumPatternMode::Glob, 2)]
    #[case(r"^note_\d\.txt$", EnumPatternMode::Regex, 1)]
    #[case("note", EnumPatternMode::Literal, 2)]
    fn search_by_glob_pattern_modes(
        #[case] pattern: &str,
        #[case] rule_pattern: EnumPatternMode,
        #[case] n_expected: u64,
    ) {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("note_1.txt"), "1");
        write_text(&root.join("note_ab.txt"), "2");
        write_text(&root.join("readme.md"), "3");

        let spec_options = SpecSearchGlobOptions {
            rule_pattern,
            ..SpecSearchGlobOptions::default()
        };
        let report = search_by_glob(&root, pattern, spec_options).expect("search");
        assert_eq!(report.cnt_matched, n_expected);
    }

    #[test]
    fn search_by_glob_invalid_pattern_is_setup_error() {
        let tmp = TempDir::new().expect("tempdir");
        write_text(&tmp.path().join("a.txt"), "a");

        let err = search_by_glob(tmp.path(), "[", SpecSearchGlobOptions::default())
            .expect_err("invalid");
        assert!(matches!(err, TreeOpError::InvalidPattern(_)));
    }

    #[test]
    fn search_by_content_matches_terms_case_insensitively() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("bio.txt"), "line one\nRafael NADAL won\n");
        write_text(&root.join("page.HTML"), "<p>tennis</p>");
        write_text(&root.join("other.txt"), "nothing here");
        write_text(&root.join("code.rs"), "tennis");

        let report = search_by_content(
            &root,
            &["rafael nadal", " tennis "],
            SpecSearchContentOptions::default(),
        )
        .expect("search");

        let set_hits: BTreeSet<PathBuf> = report.matched_paths().into_iter().collect();
        assert_eq!(
            set_hits,
            BTreeSet::from([PathBuf::from("bio.txt"), PathBuf::from("page.HTML")])
        );
        assert_eq!(report.cnt_processed, 3);
    }

    #[test]
    fn search_by_content_honors_custom_extensions() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("code.rs"), "fn tennis() {}");
        write_text(&root.join("notes.txt"), "tennis");

        let spec_options = SpecSearchContentOptions {
            extensions: BTreeSet::from([".RS".to_string()]),
            ..SpecSearchContentOptions::default()
        };
        let report = search_by_content(&root, &["tennis"], spec_options).expect("search");
        assert_eq!(report.matched_paths(), vec![PathBuf::from("code.rs")]);
    }

    #[test]
    fn search_by_content_records_unreadable_and_continues() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a.txt"), "needle");
        write_text(&root.join("b.txt"), "needle");

        let provider = FaultFs::default().fail_open(root.join("a.txt"));
        let report = search_by_content_with(
            &provider,
            &root,
            &["needle"],
            SpecSearchContentOptions::default(),
        )
        .expect("search");

        assert_eq!(report.errors_of(EnumFsErrorKind::Unreadable).count(), 1);
        assert_eq!(report.matched_paths(), vec![PathBuf::from("b.txt")]);
    }

    #[test]
    fn search_by_content_rejects_blank_terms() {
        let tmp = TempDir::new().expect("tempdir");
        let err = search_by_content(tmp.path(), &["", "  "], SpecSearchContentOptions::default())
            .expect_err("blank");
        assert!(matches!(err, TreeOpError::InvalidSearchTerms(_)));
    }

    #[test]
    fn searches_keep_matches_when_a_listing_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("root");
        write_text(&root.join("a/x.txt"), "x");
        write_text(&root.join("b/x.txt"), "x");

        let provider = FaultFs::default().fail_list(root.join("b"));
        let report = super::search_by_name_with(
            &provider,
            &root,
            "x.txt",
            SpecSearchNameOptions::default(),
        )
        .expect("search");

        assert_eq!(report.matched_paths(), vec![PathBuf::from("a/x.txt")]);
        assert_eq!(report.error_count(), 1);
    }
}
