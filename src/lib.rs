mod cli;

pub mod ansi;
pub mod config;
pub mod diff;
pub mod fetcher;
pub mod filter;
pub mod html;
pub mod output;
pub mod page;
pub mod poller;
pub mod progress;
pub mod render;
pub mod settings;
pub mod theme;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use config::PageMarkers;
use diff::{DiffContext, DiffRenderConfig, LineMatching, OutputFormat};
use fetcher::Fetcher;
use page::HtmlPage;
use poller::{PollOutcome, Reload, RunStatus, StatusPoller};
use settings::{FileSettings, MemorySettings, SettingsStore};
use theme::ThemeToggle;

pub use cli::{Args as CliArgs, Command, PageArgs, ProgressMode};
pub use cli::{DiffArgs, DiffLayout, Matching, RenderArgs};
pub use cli::{FilterArgs, Scheme, ThemeArgs, WatchArgs};

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    match args.command {
        Command::Render(args) => render(args),
        Command::Filter(args) => filter(args),
        Command::Theme(args) => theme(args),
        Command::Watch(args) => watch(args).await,
    }
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let markers = PageMarkers::load(args.page.markers.as_deref())?;
    let page = read_page(&args.page.input)?;
    let config = diff_config(&args.diff);

    let mut settings = open_settings(args.settings.as_deref());
    enhance_page(&page, &markers, &config, settings.as_mut());

    if let Some(query) = &args.query {
        let summary = filter::apply_filter(&page, &markers.filter, query)?;
        tracing::info!(
            shown = summary.shown,
            hidden = summary.hidden,
            "filter applied"
        );
    }

    write_page(&page, args.page.out.as_deref())
}

/// Everything the dashboard does when a page finishes loading.
fn enhance_page(
    page: &HtmlPage,
    markers: &PageMarkers,
    config: &DiffRenderConfig,
    settings: &mut dyn SettingsStore,
) {
    render::render_diffs(page, &markers.diff, config);
    output::enhance_run_output(page, &markers.output);
    ThemeToggle::new(settings, &markers.theme).init(page);
}

fn filter(args: FilterArgs) -> anyhow::Result<()> {
    let markers = PageMarkers::load(args.page.markers.as_deref())?;
    let page = read_page(&args.page.input)?;

    let query = match args.query {
        Some(q) => q,
        None => filter::current_query(&page, &markers.filter).unwrap_or_else(|| {
            tracing::warn!(id = %markers.filter.input_id, "no filter input and no --query; showing everything");
            String::new()
        }),
    };
    let summary = filter::apply_filter(&page, &markers.filter, &query)?;
    tracing::info!(
        query = %query,
        shown = summary.shown,
        hidden = summary.hidden,
        skipped = summary.skipped,
        "filter applied"
    );

    write_page(&page, args.page.out.as_deref())
}

fn theme(args: ThemeArgs) -> anyhow::Result<()> {
    let markers = PageMarkers::load(args.page.markers.as_deref())?;
    let page = read_page(&args.page.input)?;
    let mut settings = FileSettings::load(&args.settings);

    let mut toggle = ThemeToggle::new(&mut settings, &markers.theme);
    let current = toggle.init(&page);
    if let Some(scheme) = args.set {
        let checked = matches!(scheme, Scheme::Dark);
        let next = toggle.on_change(&page, checked)?;
        tracing::info!(from = current.as_str(), to = next.as_str(), "theme switched");
    }

    write_page(&page, args.page.out.as_deref())
}

async fn watch(args: WatchArgs) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let markers = PageMarkers::load(args.markers.as_deref())?;
    let fetcher = Fetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs))?;

    let status_url = match (&args.status_url, &args.page_url) {
        (Some(url), _) => url.clone(),
        (None, Some(page_url)) => {
            let html = fetcher
                .get_text(page_url)
                .await
                .with_context(|| format!("download page {}", page_url))?;
            let page = HtmlPage::parse(&html);
            poller::status_url_from_page(&page, &markers.status, Some(page_url))?
        }
        (None, None) => anyhow::bail!("pass --page-url or --status-url"),
    };

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::WatchProgress::new(progress_enabled, &status_url);

    let poller = StatusPoller::new(
        fetcher.clone(),
        status_url,
        Duration::from_millis(args.interval_ms),
        Some(progress.clone()),
    );
    let mut reloader = PageReloader {
        fetcher,
        page_url: args.page_url.clone(),
        out: args.out.clone(),
        markers,
        settings: args.settings.clone(),
    };

    match poller.run(&mut reloader, args.max_ticks).await? {
        PollOutcome::Reloaded { ticks, status } => {
            progress.finish(&format!("run {}", status.label()));
            tracing::info!(ticks, status = %status.label(), "watch finished");
        }
        PollOutcome::TickLimit { ticks } => {
            progress.finish("gave up");
            tracing::warn!(ticks, "run still in progress after the poll limit");
        }
    }
    Ok(())
}

/// Re-fetches the run page and runs the page-load enhancements on it.
struct PageReloader {
    fetcher: Fetcher,
    page_url: Option<Url>,
    out: Option<PathBuf>,
    markers: PageMarkers,
    settings: Option<PathBuf>,
}

impl Reload for PageReloader {
    async fn reload(&mut self, status: &RunStatus) -> anyhow::Result<()> {
        let Some(page_url) = &self.page_url else {
            tracing::info!(status = %status.label(), "no page url to reload");
            return Ok(());
        };
        let html = self
            .fetcher
            .get_text(page_url)
            .await
            .with_context(|| format!("download page {}", page_url))?;

        let page = HtmlPage::parse(&html);
        let mut settings = open_settings(self.settings.as_deref());
        enhance_page(
            &page,
            &self.markers,
            &DiffRenderConfig::default(),
            settings.as_mut(),
        );
        write_page(&page, self.out.as_deref())
    }
}

fn diff_config(args: &DiffArgs) -> DiffRenderConfig {
    DiffRenderConfig {
        output_format: match args.output_format {
            DiffLayout::SideBySide => OutputFormat::SideBySide,
            DiffLayout::LineByLine => OutputFormat::LineByLine,
        },
        matching: match args.matching {
            Matching::Lines => LineMatching::Lines,
            Matching::None => LineMatching::None,
        },
        draw_file_list: args.draw_file_list,
        show_files: !args.hide_files,
        context: args.context.map_or(DiffContext::Full, DiffContext::Lines),
        highlight_words: !args.no_word_highlight,
    }
}

/// Without a settings file the page starts from an empty, in-memory store.
fn open_settings(path: Option<&Path>) -> Box<dyn SettingsStore> {
    match path {
        Some(path) => Box::new(FileSettings::load(path)),
        None => Box::new(MemorySettings::default()),
    }
}

fn read_page(path: &Path) -> anyhow::Result<HtmlPage> {
    let html =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(HtmlPage::parse(&html))
}

fn write_page(page: &HtmlPage, out: Option<&Path>) -> anyhow::Result<()> {
    use std::io::Write as _;

    let html = page.to_html()?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
            }
            std::fs::write(path, html).with_context(|| format!("write {}", path.display()))
        }
        None => std::io::stdout()
            .write_all(html.as_bytes())
            .context("write page to stdout"),
    }
}
