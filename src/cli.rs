use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DiffLayout {
    SideBySide,
    LineByLine,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Matching {
    /// Pair changed lines by similarity.
    Lines,
    /// Pair changed lines by position.
    None,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Scheme {
    Dark,
    Light,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the page-load enhancements: diffs, run output, theme and optional filter.
    Render(RenderArgs),
    /// Show or hide filterable items for a query.
    Filter(FilterArgs),
    /// Apply the stored color scheme, or switch it with `--set`.
    Theme(ThemeArgs),
    /// Poll a run's status endpoint and reload the page once the run finishes.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, ClapArgs)]
pub struct PageArgs {
    /// HTML page to read.
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the resulting HTML. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// JSON file overriding the CSS markers and ids the page uses.
    #[arg(long)]
    pub markers: Option<PathBuf>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct DiffArgs {
    /// Diff layout.
    #[arg(long, value_enum, default_value = "side-by-side")]
    pub output_format: DiffLayout,

    /// How changed lines are paired in side-by-side rows.
    #[arg(long, value_enum, default_value = "lines")]
    pub matching: Matching,

    /// Draw a file list above each diff.
    #[arg(long)]
    pub draw_file_list: bool,

    /// Omit the file-summary header.
    #[arg(long)]
    pub hide_files: bool,

    /// Context lines around changes. Whole files are shown when omitted.
    #[arg(long)]
    pub context: Option<usize>,

    /// Disable word-level highlighting inside changed lines.
    #[arg(long)]
    pub no_word_highlight: bool,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct RenderArgs {
    #[command(flatten)]
    pub page: PageArgs,

    #[command(flatten)]
    pub diff: DiffArgs,

    /// Settings file holding the color scheme preference.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Filter query to apply after rendering.
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct FilterArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Query to match; the filter input's current value is used when omitted.
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ThemeArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Settings file holding the color scheme preference.
    #[arg(long)]
    pub settings: PathBuf,

    /// Flip the dark mode switch to this scheme and persist it.
    #[arg(long, value_enum)]
    pub set: Option<Scheme>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct WatchArgs {
    /// Run page to watch; its status element supplies the status URL and it is re-fetched on reload.
    #[arg(long)]
    pub page_url: Option<Url>,

    /// Status endpoint to poll, overriding the one advertised by the page.
    #[arg(long)]
    pub status_url: Option<Url>,

    /// Where to write the reloaded page. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// JSON file overriding the CSS markers and ids the page uses.
    #[arg(long)]
    pub markers: Option<PathBuf>,

    /// Settings file applied to the reloaded page's theme.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 1500)]
    pub interval_ms: u64,

    /// Stop after this many polls even if the run is still going.
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// HTTP User-Agent.
    #[arg(long, default_value = "playbook-page-enhance/0.1")]
    pub user_agent: String,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}
