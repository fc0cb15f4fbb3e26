use maud::{Markup, html};

use crate::diff::{
    DiffBlock, DiffLine, DiffRenderConfig, FileDiff, LineKind, OutputFormat, Segment, SideCell,
    side_by_side_rows,
};

/// Renders one file diff in the diff2html markup the dashboard stylesheet targets.
pub fn render_file_diff(file: &FileDiff, index: usize, config: &DiffRenderConfig) -> Markup {
    let file_id = format!("d2h-file-{index}");
    html! {
        div class="d2h-wrapper" {
            @if config.draw_file_list {
                (file_list(file, &file_id))
            }
            div id=(file_id) class="d2h-file-wrapper" {
                @if config.show_files {
                    (file_header(file))
                }
                @match config.output_format {
                    OutputFormat::SideBySide => { (side_by_side(file, config)) }
                    OutputFormat::LineByLine => { (line_by_line(file)) }
                }
            }
        }
    }
}

fn file_list(file: &FileDiff, file_id: &str) -> Markup {
    html! {
        div class="d2h-file-list-wrapper" {
            div class="d2h-file-list-header" {
                span class="d2h-file-list-title" { "Files changed (1)" }
            }
            ol class="d2h-file-list" {
                li class="d2h-file-list-line" {
                    span class="d2h-file-name-wrapper" {
                        a class="d2h-file-name" href=(format!("#{file_id}")) { (file.display_name()) }
                        (line_stats(file))
                    }
                }
            }
        }
    }
}

fn file_header(file: &FileDiff) -> Markup {
    let tag = if file.is_unchanged() { "d2h-unchanged" } else { "d2h-changed" };
    html! {
        div class="d2h-file-header" {
            span class="d2h-file-name-wrapper" {
                span class="d2h-file-name" { (file.display_name()) }
                span class=(format!("d2h-tag {tag}")) {
                    @if file.is_unchanged() { "UNCHANGED" } @else { "CHANGED" }
                }
            }
            (line_stats(file))
        }
    }
}

fn line_stats(file: &FileDiff) -> Markup {
    html! {
        span class="d2h-file-stats" {
            span class="d2h-lines-added" { "+" (file.added) }
            span class="d2h-lines-deleted" { "-" (file.deleted) }
        }
    }
}

fn kind_class(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Context => "d2h-cntx",
        LineKind::Deleted => "d2h-del",
        LineKind::Inserted => "d2h-ins",
    }
}

fn side_by_side(file: &FileDiff, config: &DiffRenderConfig) -> Markup {
    let rows: Vec<_> = file
        .blocks
        .iter()
        .map(|b| (b, side_by_side_rows(b, config.matching, config.highlight_words)))
        .collect();

    html! {
        div class="d2h-files-diff" {
            div class="d2h-file-side-diff" {
                div class="d2h-code-wrapper" {
                    table class="d2h-diff-table" {
                        tbody class="d2h-diff-tbody" {
                            @if file.blocks.is_empty() {
                                (no_changes_row())
                            }
                            @for (block, block_rows) in &rows {
                                (side_info_row(Some(*block)))
                                @for row in block_rows {
                                    (side_cell(row.left.as_ref()))
                                }
                            }
                        }
                    }
                }
            }
            div class="d2h-file-side-diff" {
                div class="d2h-code-wrapper" {
                    table class="d2h-diff-table" {
                        tbody class="d2h-diff-tbody" {
                            @for (_, block_rows) in &rows {
                                (side_info_row(None))
                                @for row in block_rows {
                                    (side_cell(row.right.as_ref()))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn no_changes_row() -> Markup {
    html! {
        tr {
            td class="d2h-info" colspan="2" {
                div class="d2h-code-side-line" { "File without changes" }
            }
        }
    }
}

fn side_info_row(block: Option<&DiffBlock>) -> Markup {
    html! {
        tr {
            td class="d2h-code-side-linenumber d2h-info" {}
            td class="d2h-info" {
                div class="d2h-code-side-line" {
                    @if let Some(block) = block { (block.header) }
                }
            }
        }
    }
}

fn side_cell(cell: Option<&SideCell>) -> Markup {
    match cell {
        Some(cell) => {
            let kind = kind_class(cell.kind);
            html! {
                tr {
                    td class=(format!("d2h-code-side-linenumber {kind}")) { (cell.number) }
                    td class=(kind) {
                        div class="d2h-code-side-line" {
                            span class="d2h-code-line-prefix" { (cell.kind.prefix()) }
                            span class="d2h-code-line-ctn" { (segments(cell.kind, &cell.segments)) }
                        }
                    }
                }
            }
        }
        None => html! {
            tr {
                td class="d2h-code-side-linenumber d2h-code-side-emptyplaceholder d2h-cntx d2h-emptyplaceholder" {}
                td class="d2h-cntx d2h-emptyplaceholder" {
                    div class="d2h-code-side-line d2h-code-side-emptyplaceholder" {}
                }
            }
        },
    }
}

fn segments(kind: LineKind, segments: &[Segment]) -> Markup {
    html! {
        @for s in segments {
            @if !s.changed {
                (s.text)
            } @else if kind == LineKind::Deleted {
                del { (s.text) }
            } @else {
                ins { (s.text) }
            }
        }
    }
}

fn line_by_line(file: &FileDiff) -> Markup {
    html! {
        div class="d2h-file-diff" {
            div class="d2h-code-wrapper" {
                table class="d2h-diff-table" {
                    tbody class="d2h-diff-tbody" {
                        @if file.blocks.is_empty() {
                            (no_changes_row())
                        }
                        @for block in &file.blocks {
                            tr {
                                td class="d2h-code-linenumber d2h-info" {}
                                td class="d2h-info" {
                                    div class="d2h-code-line" { (block.header) }
                                }
                            }
                            @for line in &block.lines {
                                (line_row(line))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn line_row(line: &DiffLine) -> Markup {
    let kind = kind_class(line.kind);
    html! {
        tr {
            td class=(format!("d2h-code-linenumber {kind}")) {
                div class="line-num1" { @if let Some(n) = line.old_number { (n) } }
                div class="line-num2" { @if let Some(n) = line.new_number { (n) } }
            }
            td class=(kind) {
                div class="d2h-code-line" {
                    span class="d2h-code-line-prefix" { (line.kind.prefix()) }
                    span class="d2h-code-line-ctn" { (line.content) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffContext, DiffPair, create_two_files_patch};

    fn render(before: &str, after: &str, config: &DiffRenderConfig) -> String {
        let pair = DiffPair {
            before_header: "roles/web/tasks.yml".to_string(),
            before_content: before.to_string(),
            after_header: "roles/web/tasks.yml".to_string(),
            after_content: after.to_string(),
        };
        let file = FileDiff::parse(&create_two_files_patch(&pair, DiffContext::Full)).unwrap();
        render_file_diff(&file, 0, config).into_string()
    }

    #[test]
    fn side_by_side_shows_header_and_stats() {
        let html = render("foo\nbar\n", "foo\nbaz\n", &DiffRenderConfig::default());
        assert!(html.contains(r#"<span class="d2h-file-name">roles/web/tasks.yml</span>"#));
        assert!(html.contains(r#"<span class="d2h-lines-added">+1</span>"#));
        assert!(html.contains(r#"<span class="d2h-lines-deleted">-1</span>"#));
        assert_eq!(html.matches(r#"class="d2h-file-side-diff""#).count(), 2);
        assert!(html.contains("<del>bar</del>"));
        assert!(html.contains("<ins>baz</ins>"));
        assert!(!html.contains("d2h-file-list-wrapper"));
    }

    #[test]
    fn content_is_escaped() {
        let html = render("<b>\n", "<i>\n", &DiffRenderConfig::default());
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn optional_sections_follow_config() {
        let config = DiffRenderConfig {
            output_format: OutputFormat::LineByLine,
            draw_file_list: true,
            show_files: false,
            ..DiffRenderConfig::default()
        };
        let html = render("a\n", "b\n", &config);
        assert!(html.contains("d2h-file-list-wrapper"));
        assert!(!html.contains("d2h-file-header"));
        assert!(html.contains(r#"class="d2h-file-diff""#));
        assert!(html.contains(r#"<div class="line-num1">1</div>"#));
    }

    #[test]
    fn empty_files_render_without_changes() {
        let html = render("", "", &DiffRenderConfig::default());
        assert!(html.contains("File without changes"));
        assert!(html.contains("UNCHANGED"));
    }
}
