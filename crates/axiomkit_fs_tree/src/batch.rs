//! Independent tree jobs on a worker pool.

use std::path::PathBuf;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::copy::copy_tree;
use crate::delete::delete_tree;
use crate::list::list_tree;
use crate::relocate::move_tree;
use crate::report::ReportTree;
use crate::search::{search_by_content, search_by_glob, search_by_name};
use crate::spec::{
    SpecCopyOptions, SpecDeleteOptions, SpecListOptions, SpecMoveOptions,
    SpecSearchContentOptions, SpecSearchGlobOptions, SpecSearchNameOptions, TreeOpError,
};
use crate::util::calculate_worker_limit;

/// One self-contained tree operation.
#[derive(Debug, Clone)]
pub enum EnumTreeJob {
    Copy {
        path_src: PathBuf,
        path_dst: PathBuf,
        spec_options: SpecCopyOptions,
    },
    Move {
        path_src: PathBuf,
        path_dst: PathBuf,
        spec_options: SpecMoveOptions,
    },
    Delete {
        path_root: PathBuf,
        spec_options: SpecDeleteOptions,
    },
    SearchByName {
        path_root: PathBuf,
        name: String,
        spec_options: SpecSearchNameOptions,
    },
    SearchByGlob {
        path_root: PathBuf,
        pattern: String,
        spec_options: SpecSearchGlobOptions,
    },
    SearchByContent {
        path_root: PathBuf,
        terms: Vec<String>,
        spec_options: SpecSearchContentOptions,
    },
    List {
        path_root: PathBuf,
        spec_options: SpecListOptions,
    },
}

impl EnumTreeJob {
    /// Run this job on the calling thread.
    pub fn run(self) -> Result<ReportTree, TreeOpError> {
        match self {
            Self::Copy {
                path_src,
                path_dst,
                spec_options,
            } => copy_tree(path_src, path_dst, spec_options),
            Self::Move {
                path_src,
                path_dst,
                spec_options,
            } => move_tree(path_src, path_dst, spec_options),
            Self::Delete {
                path_root,
                spec_options,
            } => delete_tree(path_root, spec_options),
            Self::SearchByName {
                path_root,
                name,
                spec_options,
            } => search_by_name(path_root, &name, spec_options),
            Self::SearchByGlob {
                path_root,
                pattern,
                spec_options,
            } => search_by_glob(path_root, &pattern, spec_options),
            Self::SearchByContent {
                path_root,
                terms,
                spec_options,
            } => search_by_content(path_root, &terms, spec_options),
            Self::List {
                path_root,
                spec_options,
            } => list_tree(path_root, spec_options),
        }
    }
}

/// Run `jobs` concurrently, one walk per worker, returning results in job order.
///
/// Jobs must not touch overlapping trees. If the pool cannot be built the
/// jobs run serially.
pub fn run_tree_jobs(
    jobs: Vec<EnumTreeJob>,
    num_workers_max: Option<usize>,
) -> Vec<Result<ReportTree, TreeOpError>> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let n_workers_max = calculate_worker_limit(num_workers_max);
    debug!("Running {} tree jobs on {n_workers_max} workers", jobs.len());

    if n_workers_max <= 1 {
        return jobs.into_iter().map(EnumTreeJob::run).collect();
    }

    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(n_workers_max)
        .build();
    let Ok(thread_pool) = thread_pool else {
        warn!("Failed to initialize thread pool (workers={n_workers_max}); running serially.");
        return jobs.into_iter().map(EnumTreeJob::run).collect();
    };

    thread_pool.install(|| jobs.into_par_iter().map(EnumTreeJob::run).collect())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{EnumTreeJob, run_tree_jobs};
    use crate::spec::{
        EnumTreeOp, SpecCopyOptions, SpecDeleteOptions, SpecListOptions, SpecSearchGlobOptions,
        SpecSearchNameOptions, TreeOpError,
    };
    use crate::test_support::write_text;

    #[test]
    fn run_tree_jobs_keeps_job_order() {
        let tmp = TempDir::new().expect("tempdir");
        let root_a = tmp.path().join("a");
        let root_b = tmp.path().join("b");
        let root_c = tmp.path().join("c");
        write_text(&root_a.join("x.txt"), "x");
        write_text(&root_b.join("y.txt"), "y");
        write_text(&root_c.join("gone.txt"), "g");

        let jobs = vec![
            EnumTreeJob::Copy {
                path_src: root_a.clone(),
                path_dst: tmp.path().join("a_copy"),
                spec_options: SpecCopyOptions::default(),
            },
            EnumTreeJob::SearchByName {
                path_root: root_b.clone(),
                name: "y.txt".to_string(),
                spec_options: SpecSearchNameOptions::default(),
            },
            EnumTreeJob::Delete {
                path_root: root_c.clone(),
                spec_options: SpecDeleteOptions::default(),
            },
            EnumTreeJob::SearchByGlob {
                path_root: tmp.path().join("missing"),
                pattern: "*".to_string(),
                spec_options: SpecSearchGlobOptions::default(),
            },
        ];

        let l_results = run_tree_jobs(jobs, Some(4));

        assert_eq!(l_results.len(), 4);
        let report_copy = l_results[0].as_ref().expect("copy");
        assert_eq!(report_copy.kind_op, EnumTreeOp::Copy);
        assert!(tmp.path().join("a_copy/x.txt").exists());

        let report_search = l_results[1].as_ref().expect("search");
        assert_eq!(report_search.matched_paths(), vec![PathBuf::from("y.txt")]);

        let report_delete = l_results[2].as_ref().expect("delete");
        assert_eq!(report_delete.kind_op, EnumTreeOp::Delete);
        assert!(!root_c.exists());

        assert!(matches!(l_results[3], Err(TreeOpError::RootNotFound(_))));
    }

    #[test]
    fn run_tree_jobs_serial_and_empty() {
        assert!(run_tree_jobs(Vec::new(), None).is_empty());

        let tmp = TempDir::new().expect("tempdir");
        write_text(&tmp.path().join("n.txt"), "n");
        let jobs = vec![
            EnumTreeJob::SearchByName {
                path_root: tmp.path().to_path_buf(),
                name: "n.txt".to_string(),
                spec_options: SpecSearchNameOptions::default(),
            },
            EnumTreeJob::List {
                path_root: tmp.path().to_path_buf(),
                spec_options: SpecListOptions::default(),
            },
        ];
        let l_results = run_tree_jobs(jobs, Some(1));
        assert_eq!(l_results[0].as_ref().expect("search").cnt_matched, 1);
        let report_list = l_results[1].as_ref().expect("list");
        assert_eq!(report_list.kind_op, EnumTreeOp::List);
        assert_eq!(report_list.matched_paths(), vec![PathBuf::new()]);
    }
}
