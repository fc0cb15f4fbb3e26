use anyhow::Context as _;

use crate::config::DiffMarkers;
use crate::diff::{DiffPair, DiffRenderConfig, FileDiff, create_two_files_patch};
use crate::html;
use crate::page::Page;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub rendered: usize,
    pub skipped: usize,
}

/// Replaces every diff container on the page with its rendered diff.
pub fn render_diffs<P: Page>(
    page: &P,
    markers: &DiffMarkers,
    config: &DiffRenderConfig,
) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for (index, container) in page.select_all(&markers.container).into_iter().enumerate() {
        let pair = extract_pair(page, &container, markers, index);
        match render_container(page, &container, &pair, index, config) {
            Ok(()) => {
                tracing::debug!(index, header = %pair.before_header, "rendered diff");
                summary.rendered += 1;
            }
            Err(e) => {
                tracing::warn!(index, error = %format!("{e:#}"), "skipping diff container");
                summary.skipped += 1;
            }
        }
    }
    if summary.rendered + summary.skipped > 0 {
        tracing::info!(
            rendered = summary.rendered,
            skipped = summary.skipped,
            "diff containers processed"
        );
    }
    summary
}

pub fn extract_pair<P: Page>(
    page: &P,
    container: &P::Element,
    markers: &DiffMarkers,
    index: usize,
) -> DiffPair {
    let read = |selector: &str| -> String {
        let nodes = page.select_within(container, selector);
        if nodes.is_empty() {
            tracing::warn!(index, selector, "diff container is missing a part; using empty text");
        }
        nodes.iter().map(|n| page.text(n)).collect()
    };

    DiffPair {
        before_header: read(&markers.before_header),
        before_content: read(&markers.before_content),
        after_header: read(&markers.after_header),
        after_content: read(&markers.after_content),
    }
}

fn render_container<P: Page>(
    page: &P,
    container: &P::Element,
    pair: &DiffPair,
    index: usize,
    config: &DiffRenderConfig,
) -> anyhow::Result<()> {
    let unified = create_two_files_patch(pair, config.context);
    let file = FileDiff::parse(&unified)?;
    let markup = html::render_file_diff(&file, index, config);
    page.set_inner_html(container, &markup.into_string())
        .context("replace diff container content")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;

    const PAGE: &str = r#"<html><body>
<div class="diff" id="first">
  <pre class="diff-before-header">before</pre>
  <pre class="diff-before-content">foo
bar</pre>
  <pre class="diff-after-header">after</pre>
  <pre class="diff-after-content">foo
baz</pre>
</div>
<div class="diff" id="second">
  <pre class="diff-after-content">only after</pre>
</div>
</body></html>"#;

    fn cell_texts(page: &HtmlPage, scope: &str, selector: &str) -> Vec<String> {
        let scope = page.element_by_id(scope).unwrap();
        page.select_within(&scope, selector)
            .iter()
            .map(|n| page.text(n))
            .collect()
    }

    #[test]
    fn renders_each_container_in_place() {
        let page = HtmlPage::parse(PAGE);
        let summary = render_diffs(&page, &DiffMarkers::default(), &DiffRenderConfig::default());
        assert_eq!(summary, DiffSummary { rendered: 2, skipped: 0 });

        let html = page.to_html().unwrap();
        assert!(!html.contains("diff-before-content"));
        assert!(html.contains("before → after"));

        let deleted = cell_texts(&page, "first", "td.d2h-del .d2h-code-line-ctn");
        let inserted = cell_texts(&page, "first", "td.d2h-ins .d2h-code-line-ctn");
        let context = cell_texts(&page, "first", "td.d2h-cntx .d2h-code-line-ctn");
        assert_eq!(deleted, ["bar"]);
        assert_eq!(inserted, ["baz"]);
        assert_eq!(context, ["foo", "foo"]);
    }

    #[test]
    fn missing_parts_read_as_empty() {
        let page = HtmlPage::parse(PAGE);
        let second = page.element_by_id("second").unwrap();
        let pair = extract_pair(&page, &second, &DiffMarkers::default(), 1);
        assert_eq!(
            pair,
            DiffPair {
                after_content: "only after".to_string(),
                ..DiffPair::default()
            }
        );
    }
}
