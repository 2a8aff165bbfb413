use std::path::PathBuf;

use axiomkit_fs_tree::{
    EnumMoveStrategy, EnumPatternMode, SpecCopyOptions, SpecDeleteOptions, SpecListOptions,
    SpecMoveOptions, SpecSearchContentOptions, SpecSearchGlobOptions, SpecSearchNameOptions,
};
use clap::{Parser, Subcommand, ValueEnum};

use crate::log_level::LogLevel;

/// Copy, move, delete, search and list directory trees.
#[derive(Parser, Debug, Clone)]
#[clap(name = "axtree", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Copy a tree into a destination directory.
    Copy {
        source: PathBuf,
        destination: PathBuf,
        #[clap(long)]
        replace: bool,
        /// Do not carry timestamps and permissions over.
        #[clap(long)]
        no_preserve: bool,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        depth_max: Option<usize>,
    },
    /// Move a tree into a destination directory.
    Move {
        source: PathBuf,
        destination: PathBuf,
        #[clap(long)]
        replace: bool,
        #[clap(long)]
        follow_links: bool,
        #[clap(long, default_value = "auto", value_enum)]
        strategy: MoveStrategyArg,
    },
    /// Delete a tree, root included.
    Delete {
        root: PathBuf,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        dry_run: bool,
    },
    /// Find entries by exact name.
    FindName {
        root: PathBuf,
        name: String,
        #[clap(long)]
        first: bool,
        #[clap(long)]
        dirs: bool,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        depth_max: Option<usize>,
    },
    /// Find files by name pattern and size ceiling.
    FindGlob {
        root: PathBuf,
        pattern: String,
        #[clap(long)]
        size_max: Option<u64>,
        #[clap(long, default_value = "glob", value_enum)]
        mode: PatternModeArg,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        depth_max: Option<usize>,
    },
    /// Find text files containing any of the comma-separated terms.
    FindContent {
        root: PathBuf,
        terms: String,
        /// Comma-separated extensions to scan instead of the default text set.
        #[clap(long)]
        extensions: Option<String>,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        depth_max: Option<usize>,
    },
    /// List directories after their contents, root last.
    List {
        root: PathBuf,
        /// Include files and links in the listing.
        #[clap(long)]
        files: bool,
        #[clap(long)]
        follow_links: bool,
        #[clap(long)]
        depth_max: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MoveStrategyArg {
    Auto,
    Rename,
    CopyDelete,
}

impl From<MoveStrategyArg> for EnumMoveStrategy {
    fn from(value: MoveStrategyArg) -> Self {
        match value {
            MoveStrategyArg::Auto => EnumMoveStrategy::Auto,
            MoveStrategyArg::Rename => EnumMoveStrategy::Rename,
            MoveStrategyArg::CopyDelete => EnumMoveStrategy::CopyDelete,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PatternModeArg {
    Glob,
    Regex,
    Literal,
}

impl From<PatternModeArg> for EnumPatternMode {
    fn from(value: PatternModeArg) -> Self {
        match value {
            PatternModeArg::Glob => EnumPatternMode::Glob,
            PatternModeArg::Regex => EnumPatternMode::Regex,
            PatternModeArg::Literal => EnumPatternMode::Literal,
        }
    }
}

pub fn copy_options(
    replace: bool,
    no_preserve: bool,
    follow_links: bool,
    depth_max: Option<usize>,
) -> SpecCopyOptions {
    SpecCopyOptions {
        if_replace_existing: replace,
        if_preserve_attributes: !no_preserve,
        if_follow_links: follow_links,
        depth_max,
    }
}

pub fn move_options(
    replace: bool,
    follow_links: bool,
    strategy: MoveStrategyArg,
) -> SpecMoveOptions {
    SpecMoveOptions {
        if_replace_existing: replace,
        if_follow_links: follow_links,
        rule_move: strategy.into(),
    }
}

pub fn delete_options(follow_links: bool, dry_run: bool) -> SpecDeleteOptions {
    SpecDeleteOptions {
        if_follow_links: follow_links,
        if_dry_run: dry_run,
    }
}

pub fn name_options(
    first: bool,
    dirs: bool,
    follow_links: bool,
    depth_max: Option<usize>,
) -> SpecSearchNameOptions {
    SpecSearchNameOptions {
        if_follow_links: follow_links,
        if_stop_on_first: first,
        if_match_dirs: dirs,
        depth_max,
    }
}

pub fn glob_options(
    size_max: Option<u64>,
    mode: PatternModeArg,
    follow_links: bool,
    depth_max: Option<usize>,
) -> SpecSearchGlobOptions {
    SpecSearchGlobOptions {
        size_max,
        if_follow_links: follow_links,
        rule_pattern: mode.into(),
        depth_max,
    }
}

pub fn content_options(
    extensions: Option<&str>,
    follow_links: bool,
    depth_max: Option<usize>,
) -> SpecSearchContentOptions {
    let mut spec_options = SpecSearchContentOptions {
        if_follow_links: follow_links,
        depth_max,
        ..SpecSearchContentOptions::default()
    };
    if let Some(raw_extensions) = extensions {
        spec_options.extensions = axiomkit_fs_tree::parse_search_terms(raw_extensions)
            .into_iter()
            .collect();
    }
    spec_options
}

pub fn list_options(files: bool, follow_links: bool, depth_max: Option<usize>) -> SpecListOptions {
    SpecListOptions {
        if_follow_links: follow_links,
        if_include_files: files,
        depth_max,
    }
}
