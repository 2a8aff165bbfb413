use std::process::ExitCode;

use anyhow::Context as _;
use axiomkit_fs_tree::{
    ReportTree, copy_tree, delete_tree, list_tree, move_tree, parse_search_terms,
    search_by_content, search_by_glob, search_by_name,
};
use clap::Parser as _;
use tracing::debug;

use crate::cli::{Cli, Command};

mod cli;
mod log_level;

const N_EXIT_REPORT_ERRORS: u8 = 1;
const N_EXIT_SETUP_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    match run(cli_args.command) {
        Ok(report) => print_report(&report),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(N_EXIT_SETUP_ERROR)
        }
    }
}

fn setup_tracing(cli_args: &Cli) {
    if let Some(level) = cli_args.log_level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .without_time()
            .compact()
            .init();
    }
}

fn run(command: Command) -> anyhow::Result<ReportTree> {
    match command {
        Command::Copy {
            source,
            destination,
            replace,
            no_preserve,
            follow_links,
            depth_max,
        } => {
            let spec_cp_options = cli::copy_options(replace, no_preserve, follow_links, depth_max);
            copy_tree(&source, &destination, spec_cp_options).with_context(|| {
                format!(
                    "cannot copy {} to {}",
                    source.display(),
                    destination.display()
                )
            })
        }
        Command::Move {
            source,
            destination,
            replace,
            follow_links,
            strategy,
        } => {
            let spec_mv_options = cli::move_options(replace, follow_links, strategy);
            move_tree(&source, &destination, spec_mv_options).with_context(|| {
                format!(
                    "cannot move {} to {}",
                    source.display(),
                    destination.display()
                )
            })
        }
        Command::Delete {
            root,
            follow_links,
            dry_run,
        } => delete_tree(&root, cli::delete_options(follow_links, dry_run))
            .with_context(|| format!("cannot delete {}", root.display())),
        Command::FindName {
            root,
            name,
            first,
            dirs,
            follow_links,
            depth_max,
        } => search_by_name(
            &root,
            &name,
            cli::name_options(first, dirs, follow_links, depth_max),
        )
        .with_context(|| format!("cannot search {}", root.display())),
        Command::FindGlob {
            root,
            pattern,
            size_max,
            mode,
            follow_links,
            depth_max,
        } => search_by_glob(
            &root,
            &pattern,
            cli::glob_options(size_max, mode, follow_links, depth_max),
        )
        .with_context(|| format!("cannot search {}", root.display())),
        Command::FindContent {
            root,
            terms,
            extensions,
            follow_links,
            depth_max,
        } => search_by_content(
            &root,
            &parse_search_terms(&terms),
            cli::content_options(extensions.as_deref(), follow_links, depth_max),
        )
        .with_context(|| format!("cannot search {}", root.display())),
        Command::List {
            root,
            files,
            follow_links,
            depth_max,
        } => list_tree(&root, cli::list_options(files, follow_links, depth_max))
            .with_context(|| format!("cannot list {}", root.display())),
    }
}

fn print_report(report: &ReportTree) -> ExitCode {
    for spec_match in &report.matches {
        println!("{}", spec_match.path.display());
    }
    for spec_error in &report.errors {
        eprintln!(
            "{}: {} ({})",
            spec_error.kind,
            spec_error.path.display(),
            spec_error.exception
        );
    }
    println!("{report}");

    if report.error_count() > 0 {
        ExitCode::from(N_EXIT_REPORT_ERRORS)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::run;
    use crate::cli::Command;
    use axiomkit_fs_tree::TreeOpError;

    #[test]
    fn run_find_content_splits_terms() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("a.txt"), "hello world").expect("write");
        std::fs::write(tmp.path().join("b.txt"), "goodbye").expect("write");

        let report = run(Command::FindContent {
            root: tmp.path().to_path_buf(),
            terms: "WORLD, nothing".to_string(),
            extensions: None,
            follow_links: false,
            depth_max: None,
        })
        .expect("run");
        assert_eq!(report.cnt_matched, 1);
    }

    #[test]
    fn run_reports_setup_errors() {
        let tmp = TempDir::new().expect("tempdir");
        let err = run(Command::Delete {
            root: tmp.path().join("missing"),
            follow_links: false,
            dry_run: true,
        })
        .expect_err("missing root");
        assert!(matches!(
            err.downcast_ref::<TreeOpError>(),
            Some(TreeOpError::RootNotFound(_))
        ));
        assert!(format!("{err:#}").starts_with("cannot delete "));
    }

    #[test]
    fn run_list_reports_directories() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("sub/deep")).expect("mkdir");
        std::fs::write(tmp.path().join("sub/a.txt"), "a").expect("write");

        let report = run(Command::List {
            root: tmp.path().to_path_buf(),
            files: false,
            follow_links: false,
            depth_max: None,
        })
        .expect("run");
        assert_eq!(report.cnt_matched, 3);
        assert_eq!(report.matches[0].path, tmp.path().join("sub/deep"));
    }
}
