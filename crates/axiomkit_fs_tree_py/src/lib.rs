use std::collections::{BTreeMap, BTreeSet};

use axiomkit_fs_tree::{
    EnumMoveStrategy, EnumPatternMode, ReportTree, SpecCopyOptions, SpecDeleteOptions,
    SpecListOptions, SpecMoveOptions, SpecSearchContentOptions, SpecSearchGlobOptions,
    SpecSearchNameOptions, SpecTreeError, TreeOpError, copy_tree, delete_tree, list_tree,
    move_tree, search_by_content, search_by_glob, search_by_name,
};
use pyo3::exceptions::{PyFileNotFoundError, PyValueError};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "axiomkit.fs.tree.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "SpecTreeError")]
#[derive(Debug, Clone)]
struct PySpecTreeError {
    #[pyo3(get)]
    path: String,
    #[pyo3(get)]
    kind: String,
    #[pyo3(get)]
    exception: String,
}

impl From<SpecTreeError> for PySpecTreeError {
    fn from(spec_error: SpecTreeError) -> Self {
        Self {
            path: spec_error.path.to_string_lossy().to_string(),
            kind: spec_error.kind.as_str().to_string(),
            exception: spec_error.exception,
        }
    }
}

#[pymethods]
impl PySpecTreeError {
    fn __repr__(&self) -> String {
        format!("SpecTreeError({}: {} ({}))", self.kind, self.path, self.exception)
    }
}

#[pyclass(name = "ReportTree")]
#[derive(Debug, Clone)]
struct PyReportTree {
    inner: ReportTree,
    #[pyo3(get)]
    kind_op: String,
    #[pyo3(get)]
    cnt_visited: u64,
    #[pyo3(get)]
    cnt_processed: u64,
    #[pyo3(get)]
    cnt_matched: u64,
    #[pyo3(get)]
    cnt_skipped: u64,
    #[pyo3(get)]
    matches: Vec<String>,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecTreeError>,
    #[pyo3(get)]
    if_aborted: bool,
}

impl From<ReportTree> for PyReportTree {
    fn from(report_tree: ReportTree) -> Self {
        Self {
            kind_op: report_tree.kind_op.prefix().trim_matches(['[', ']']).to_lowercase(),
            cnt_visited: report_tree.cnt_visited,
            cnt_processed: report_tree.cnt_processed,
            cnt_matched: report_tree.cnt_matched,
            cnt_skipped: report_tree.cnt_skipped,
            matches: report_tree
                .matches
                .iter()
                .map(|m| m.path.to_string_lossy().to_string())
                .collect(),
            warnings: report_tree.warnings.clone(),
            errors: report_tree
                .errors
                .iter()
                .cloned()
                .map(PySpecTreeError::from)
                .collect(),
            if_aborted: report_tree.if_aborted,
            inner: report_tree,
        }
    }
}

#[pymethods]
impl PyReportTree {
    #[getter]
    fn error_count(&self) -> usize {
        self.inner.error_count()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.inner.warning_count()
    }

    #[getter]
    fn matches_relative(&self) -> Vec<String> {
        self.inner
            .matched_paths()
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = None))]
    fn format(&self, prefix: Option<&str>) -> String {
        self.inner
            .format(prefix.unwrap_or_else(|| self.inner.kind_op.prefix()))
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

fn parse_rule_pattern(value: &str) -> PyResult<EnumPatternMode> {
    match value {
        "glob" => Ok(EnumPatternMode::Glob),
        "regex" => Ok(EnumPatternMode::Regex),
        "literal" => Ok(EnumPatternMode::Literal),
        _ => Err(PyValueError::new_err(format!(
            "Invalid pattern strategy: `{value}`. Expected one of: ['glob', 'regex', 'literal']"
        ))),
    }
}

fn parse_rule_move(value: &str) -> PyResult<EnumMoveStrategy> {
    match value {
        "auto" => Ok(EnumMoveStrategy::Auto),
        "rename" => Ok(EnumMoveStrategy::Rename),
        "copy_delete" => Ok(EnumMoveStrategy::CopyDelete),
        _ => Err(PyValueError::new_err(format!(
            "Invalid move strategy: `{value}`. Expected one of: ['auto', 'rename', 'copy_delete']"
        ))),
    }
}

fn map_tree_op_error(exception: TreeOpError) -> PyErr {
    match exception {
        TreeOpError::RootNotFound(_) => PyFileNotFoundError::new_err(exception.to_string()),
        TreeOpError::SourceDestinationOverlap { .. }
        | TreeOpError::InvalidPattern(_)
        | TreeOpError::InvalidSearchTerms(_)
        | TreeOpError::Walk(_) => PyValueError::new_err(exception.to_string()),
    }
}

fn into_py_report(res_report: Result<ReportTree, TreeOpError>) -> PyResult<PyReportTree> {
    res_report
        .map(PyReportTree::from)
        .map_err(map_tree_op_error)
}

#[pyfunction(name = "copy_tree")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    if_replace_existing = false,
    if_preserve_attributes = true,
    if_follow_links = false,
    depth_max = None
))]
fn copy_tree_py(
    py: Python<'_>,
    dir_source: String,
    dir_destination: String,
    if_replace_existing: bool,
    if_preserve_attributes: bool,
    if_follow_links: bool,
    depth_max: Option<usize>,
) -> PyResult<PyReportTree> {
    let spec_cp_options = SpecCopyOptions {
        if_replace_existing,
        if_preserve_attributes,
        if_follow_links,
        depth_max,
    };
    into_py_report(py.allow_threads(|| copy_tree(dir_source, dir_destination, spec_cp_options)))
}

#[pyfunction(name = "move_tree")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    if_replace_existing = false,
    if_follow_links = false,
    rule_move = "auto"
))]
fn move_tree_py(
    py: Python<'_>,
    dir_source: String,
    dir_destination: String,
    if_replace_existing: bool,
    if_follow_links: bool,
    rule_move: &str,
) -> PyResult<PyReportTree> {
    let spec_mv_options = SpecMoveOptions {
        if_replace_existing,
        if_follow_links,
        rule_move: parse_rule_move(rule_move)?,
    };
    into_py_report(py.allow_threads(|| move_tree(dir_source, dir_destination, spec_mv_options)))
}

#[pyfunction(name = "delete_tree")]
#[pyo3(signature = (dir_root, if_follow_links = false, if_dry_run = false))]
fn delete_tree_py(
    py: Python<'_>,
    dir_root: String,
    if_follow_links: bool,
    if_dry_run: bool,
) -> PyResult<PyReportTree> {
    let spec_del_options = SpecDeleteOptions {
        if_follow_links,
        if_dry_run,
    };
    into_py_report(py.allow_threads(|| delete_tree(dir_root, spec_del_options)))
}

#[pyfunction(name = "search_by_name")]
#[pyo3(signature = (
    dir_root,
    name,
    if_follow_links = false,
    if_stop_on_first = false,
    if_match_dirs = false,
    depth_max = None
))]
fn search_by_name_py(
    py: Python<'_>,
    dir_root: String,
    name: String,
    if_follow_links: bool,
    if_stop_on_first: bool,
    if_match_dirs: bool,
    depth_max: Option<usize>,
) -> PyResult<PyReportTree> {
    let spec_options = SpecSearchNameOptions {
        if_follow_links,
        if_stop_on_first,
        if_match_dirs,
        depth_max,
    };
    into_py_report(py.allow_threads(|| search_by_name(dir_root, &name, spec_options)))
}

#[pyfunction(name = "search_by_glob")]
#[pyo3(signature = (
    dir_root,
    pattern,
    size_max = None,
    if_follow_links = false,
    rule_pattern = "glob",
    depth_max = None
))]
fn search_by_glob_py(
    py: Python<'_>,
    dir_root: String,
    pattern: String,
    size_max: Option<u64>,
    if_follow_links: bool,
    rule_pattern: &str,
    depth_max: Option<usize>,
) -> PyResult<PyReportTree> {
    let spec_options = SpecSearchGlobOptions {
        size_max,
        if_follow_links,
        rule_pattern: parse_rule_pattern(rule_pattern)?,
        depth_max,
    };
    into_py_report(py.allow_threads(|| search_by_glob(dir_root, &pattern, spec_options)))
}

#[pyfunction(name = "search_by_content")]
#[pyo3(signature = (
    dir_root,
    terms,
    extensions = None,
    if_follow_links = false,
    depth_max = None
))]
fn search_by_content_py(
    py: Python<'_>,
    dir_root: String,
    terms: Vec<String>,
    extensions: Option<Vec<String>>,
    if_follow_links: bool,
    depth_max: Option<usize>,
) -> PyResult<PyReportTree> {
    let mut spec_options = SpecSearchContentOptions {
        if_follow_links,
        depth_max,
        ..SpecSearchContentOptions::default()
    };
    if let Some(l_extensions) = extensions {
        spec_options.extensions = l_extensions.into_iter().collect::<BTreeSet<_>>();
    }
    into_py_report(py.allow_threads(|| search_by_content(dir_root, &terms, spec_options)))
}

#[pyfunction(name = "list_tree")]
#[pyo3(signature = (
    dir_root,
    if_follow_links = false,
    if_include_files = false,
    depth_max = None
))]
fn list_tree_py(
    py: Python<'_>,
    dir_root: String,
    if_follow_links: bool,
    if_include_files: bool,
    depth_max: Option<usize>,
) -> PyResult<PyReportTree> {
    let spec_options = SpecListOptions {
        if_follow_links,
        if_include_files,
        depth_max,
    };
    into_py_report(py.allow_threads(|| list_tree(dir_root, spec_options)))
}

#[pymodule]
fn _axiomkit_fs_tree_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpecTreeError>()?;
    module.add_class::<PyReportTree>()?;
    module.add_function(wrap_pyfunction!(copy_tree_py, module)?)?;
    module.add_function(wrap_pyfunction!(move_tree_py, module)?)?;
    module.add_function(wrap_pyfunction!(delete_tree_py, module)?)?;
    module.add_function(wrap_pyfunction!(search_by_name_py, module)?)?;
    module.add_function(wrap_pyfunction!(search_by_glob_py, module)?)?;
    module.add_function(wrap_pyfunction!(search_by_content_py, module)?)?;
    module.add_function(wrap_pyfunction!(list_tree_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
