use crate::ansi;
use crate::config::OutputMarkers;
use crate::page::Page;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutputSummary {
    pub collapsed: usize,
    pub colorized: usize,
}

/// Collapses empty card bodies and colorizes ANSI command output.
pub fn enhance_run_output<P: Page>(page: &P, markers: &OutputMarkers) -> OutputSummary {
    let mut summary = OutputSummary::default();

    for body in page.select_all(&markers.card_body) {
        if page.text(&body).trim().is_empty() {
            page.add_classes(&body, &[markers.collapsed_class.as_str()]);
            summary.collapsed += 1;
        }
    }

    for el in page.select_all(&markers.ansi_output) {
        let text = page.text(&el);
        match page.set_inner_html(&el, &ansi::to_html(&text).into_string()) {
            Ok(()) => summary.colorized += 1,
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "skipping ansi output block"),
        }
    }

    tracing::debug!(
        collapsed = summary.collapsed,
        colorized = summary.colorized,
        "run output enhanced"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;

    #[test]
    fn collapses_blank_cards_and_colors_output() {
        let page = HtmlPage::parse(
            "<div class=\"card\" id=\"empty\"><div class=\"card-body\">  \n </div></div>\
             <div class=\"card\" id=\"full\"><div class=\"card-body\">\
             <pre class=\"ansi-output\">\x1b[31mfailed\x1b[0m &lt;x&gt;</pre></div></div>",
        );
        let summary = enhance_run_output(&page, &OutputMarkers::default());
        assert_eq!(summary, OutputSummary { collapsed: 1, colorized: 1 });

        let empty = page.element_by_id("empty").unwrap();
        let full = page.element_by_id("full").unwrap();
        assert!(page.has_class(&page.select_within(&empty, ".card-body")[0], "card-body-collapse"));
        assert!(!page.has_class(&page.select_within(&full, ".card-body")[0], "card-body-collapse"));

        let html = page.to_html().unwrap();
        assert!(html.contains(r#"<span style="color:rgb(187,0,0)">failed</span> &lt;x&gt;"#));
    }
}
