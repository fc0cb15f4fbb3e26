use anyhow::Context as _;
use regex::{Regex, RegexBuilder};

use crate::config::FilterMarkers;
use crate::page::Page;

/// Compiled program budget per query character; never below the regex default.
const SIZE_LIMIT_PER_CHAR: usize = 256;
const MIN_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A query matched as a literal, case-insensitive substring.
#[derive(Debug, Clone)]
pub struct FilterPattern {
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    /// Queries too large to compile fall back to comparing lowercased text.
    Lowercase(String),
}

impl FilterPattern {
    pub fn new(query: &str) -> anyhow::Result<Self> {
        let size_limit = MIN_SIZE_LIMIT.max(query.chars().count() * SIZE_LIMIT_PER_CHAR);
        let compiled = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .size_limit(size_limit)
            .build();

        let matcher = match compiled {
            Ok(re) => Matcher::Regex(re),
            Err(regex::Error::CompiledTooBig(limit)) => {
                tracing::warn!(
                    chars = query.chars().count(),
                    limit,
                    "filter query too large to compile; matching lowercased text"
                );
                Matcher::Lowercase(query.to_lowercase())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("compile filter pattern for {query:?}"));
            }
        };
        Ok(Self { matcher })
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(text),
            Matcher::Lowercase(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub shown: usize,
    pub hidden: usize,
    pub skipped: usize,
}

/// The query currently typed into the filter input, if the page has one.
pub fn current_query<P: Page>(page: &P, markers: &FilterMarkers) -> Option<String> {
    let input = page.element_by_id(&markers.input_id)?;
    Some(page.attr(&input, "value").unwrap_or_default())
}

/// Mirrors `query` into the filter input, then shows or hides every item.
pub fn apply_filter<P: Page>(
    page: &P,
    markers: &FilterMarkers,
    query: &str,
) -> anyhow::Result<FilterSummary> {
    let pattern = FilterPattern::new(query)?;

    if let Some(input) = page.element_by_id(&markers.input_id) {
        page.set_attr(&input, "value", Some(query));
    }

    let mut summary = FilterSummary::default();
    let hidden = [markers.hidden_class.as_str()];
    for item in filter_items(page, markers) {
        let fields = page.select_within(&item, &markers.field);
        if fields.is_empty() {
            tracing::warn!(selector = %markers.field, "filter item has no field; leaving as is");
            summary.skipped += 1;
            continue;
        }
        let text: String = fields.iter().map(|f| page.text(f)).collect();

        if pattern.matches(&text) {
            page.remove_classes(&item, &hidden);
            summary.shown += 1;
        } else {
            page.add_classes(&item, &hidden);
            summary.hidden += 1;
        }
    }

    tracing::debug!(
        query,
        shown = summary.shown,
        hidden = summary.hidden,
        skipped = summary.skipped,
        "filter applied"
    );
    Ok(summary)
}

/// Items under any container, each once even when containers nest.
fn filter_items<P: Page>(page: &P, markers: &FilterMarkers) -> Vec<P::Element> {
    let mut items: Vec<P::Element> = Vec::new();
    for scope in page.select_all(&markers.container) {
        for item in page.select_within(&scope, &markers.element) {
            if !items.contains(&item) {
                items.push(item);
            }
        }
    }
    items
}
