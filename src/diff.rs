use std::borrow::Cow;

use anyhow::anyhow;
use similar::{ChangeTag, TextDiff};

/// Minimum character similarity for a deleted and an inserted line to share a row.
const MATCH_THRESHOLD: f32 = 0.5;
/// Inserted lines inspected per deleted line when looking for a match.
const MATCH_LOOKAHEAD: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPair {
    pub before_header: String,
    pub before_content: String,
    pub after_header: String,
    pub after_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffContext {
    /// Every line of both files ends up in the patch.
    Full,
    Lines(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    SideBySide,
    LineByLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatching {
    /// Pair changed lines by similarity.
    Lines,
    /// Pair changed lines by position.
    None,
}

#[derive(Debug, Clone)]
pub struct DiffRenderConfig {
    pub output_format: OutputFormat,
    pub matching: LineMatching,
    pub draw_file_list: bool,
    pub show_files: bool,
    pub context: DiffContext,
    pub highlight_words: bool,
}

impl Default for DiffRenderConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::SideBySide,
            matching: LineMatching::Lines,
            draw_file_list: false,
            show_files: true,
            context: DiffContext::Full,
            highlight_words: true,
        }
    }
}

/// Builds a two-file unified diff labelled with the pair's headers.
pub fn create_two_files_patch(pair: &DiffPair, context: DiffContext) -> String {
    let before = split_lone_carriage_returns(&pair.before_content);
    let after = split_lone_carriage_returns(&pair.after_content);
    let (before, after) = (before.as_ref(), after.as_ref());

    let mut out = String::with_capacity(before.len() + after.len() + 64);
    out.push_str(&format!("--- {}\n", quote_label(&pair.before_header)));
    out.push_str(&format!("+++ {}\n", quote_label(&pair.after_header)));

    if before == after {
        if context == DiffContext::Full {
            push_context_hunk(&mut out, before);
        }
        return out;
    }

    let radius = match context {
        DiffContext::Full => line_count(before).max(line_count(after)) + 1,
        DiffContext::Lines(n) => n,
    };
    let diff = TextDiff::from_lines(before, after);
    let mut unified = diff.unified_diff();
    unified.context_radius(radius);
    for hunk in unified.iter_hunks() {
        out.push_str(&hunk.to_string());
    }
    out
}

/// A bare `\r` ends a line for the differ but not for the patch parser, so
/// it becomes `\n`. `\r\n` is left alone.
fn split_lone_carriage_returns(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' && chars.peek() != Some(&'\n') {
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

fn push_context_hunk(out: &mut String, text: &str) {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    if lines.is_empty() {
        return;
    }
    let n = lines.len();
    out.push_str(&format!("@@ -1,{n} +1,{n} @@\n"));
    for line in lines {
        out.push(' ');
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}

/// C-style quoting for labels a patch header cannot carry verbatim.
fn quote_label(label: &str) -> String {
    if !label.contains(['"', '\\', '\t', '\r', '\n', '\0']) {
        return label.to_string();
    }
    let mut out = String::with_capacity(label.len() + 2);
    out.push('"');
    for c in label.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Deleted,
    Inserted,
}

impl LineKind {
    pub fn prefix(self) -> &'static str {
        match self {
            LineKind::Context => " ",
            LineKind::Deleted => "-",
            LineKind::Inserted => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub old_number: Option<usize>,
    pub new_number: Option<usize>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DiffBlock {
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone)]
pub struct FileDiff {
    pub old_name: String,
    pub new_name: String,
    pub blocks: Vec<DiffBlock>,
    pub added: usize,
    pub deleted: usize,
}

impl FileDiff {
    pub fn parse(unified: &str) -> anyhow::Result<Self> {
        let patch =
            diffy::Patch::from_str(unified).map_err(|e| anyhow!("parse unified diff: {e}"))?;

        let mut added = 0usize;
        let mut deleted = 0usize;
        let mut blocks = Vec::with_capacity(patch.hunks().len());
        for hunk in patch.hunks() {
            let old = hunk.old_range();
            let new = hunk.new_range();
            let mut old_no = old.start();
            let mut new_no = new.start();

            let mut lines = Vec::with_capacity(hunk.lines().len());
            for line in hunk.lines() {
                let parsed = match line {
                    diffy::Line::Context(text) => {
                        let l = DiffLine {
                            kind: LineKind::Context,
                            old_number: Some(old_no),
                            new_number: Some(new_no),
                            content: line_text(text),
                        };
                        old_no += 1;
                        new_no += 1;
                        l
                    }
                    diffy::Line::Delete(text) => {
                        deleted += 1;
                        let l = DiffLine {
                            kind: LineKind::Deleted,
                            old_number: Some(old_no),
                            new_number: None,
                            content: line_text(text),
                        };
                        old_no += 1;
                        l
                    }
                    diffy::Line::Insert(text) => {
                        added += 1;
                        let l = DiffLine {
                            kind: LineKind::Inserted,
                            old_number: None,
                            new_number: Some(new_no),
                            content: line_text(text),
                        };
                        new_no += 1;
                        l
                    }
                };
                lines.push(parsed);
            }

            blocks.push(DiffBlock {
                header: format!(
                    "@@ -{} +{} @@",
                    format_range(old.start(), old.len()),
                    format_range(new.start(), new.len())
                ),
                lines,
            });
        }

        Ok(Self {
            old_name: patch.original().unwrap_or_default().to_string(),
            new_name: patch.modified().unwrap_or_default().to_string(),
            blocks,
            added,
            deleted,
        })
    }

    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.deleted == 0
    }

    pub fn display_name(&self) -> String {
        if self.old_name == self.new_name {
            self.old_name.clone()
        } else {
            format!("{} → {}", self.old_name, self.new_name)
        }
    }
}

fn format_range(start: usize, len: usize) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{start},{len}")
    }
}

fn line_text(raw: &str) -> String {
    let s = raw.strip_suffix('\n').unwrap_or(raw);
    s.strip_suffix('\r').unwrap_or(s).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideCell {
    pub kind: LineKind,
    pub number: usize,
    pub segments: Vec<Segment>,
}

impl SideCell {
    fn plain(kind: LineKind, number: Option<usize>, content: &str) -> Self {
        Self {
            kind,
            number: number.unwrap_or_default(),
            segments: vec![Segment {
                text: content.to_string(),
                changed: false,
            }],
        }
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One aligned row; `None` is an empty placeholder on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideRow {
    pub left: Option<SideCell>,
    pub right: Option<SideCell>,
}

pub fn side_by_side_rows(
    block: &DiffBlock,
    matching: LineMatching,
    highlight_words: bool,
) -> Vec<SideRow> {
    let mut rows = Vec::with_capacity(block.lines.len());
    let mut deleted: Vec<&DiffLine> = Vec::new();
    let mut inserted: Vec<&DiffLine> = Vec::new();

    for line in &block.lines {
        match line.kind {
            LineKind::Context => {
                flush_changes(&mut rows, &mut deleted, &mut inserted, matching, highlight_words);
                rows.push(SideRow {
                    left: Some(SideCell::plain(LineKind::Context, line.old_number, &line.content)),
                    right: Some(SideCell::plain(LineKind::Context, line.new_number, &line.content)),
                });
            }
            LineKind::Deleted => {
                if !inserted.is_empty() {
                    flush_changes(&mut rows, &mut deleted, &mut inserted, matching, highlight_words);
                }
                deleted.push(line);
            }
            LineKind::Inserted => inserted.push(line),
        }
    }
    flush_changes(&mut rows, &mut deleted, &mut inserted, matching, highlight_words);
    rows
}

fn flush_changes(
    rows: &mut Vec<SideRow>,
    deleted: &mut Vec<&DiffLine>,
    inserted: &mut Vec<&DiffLine>,
    matching: LineMatching,
    highlight_words: bool,
) {
    if deleted.is_empty() && inserted.is_empty() {
        return;
    }

    for (d, i) in pair_changes(deleted, inserted, matching) {
        let row = match (d.map(|d| deleted[d]), i.map(|i| inserted[i])) {
            (Some(del), Some(ins)) if highlight_words => {
                let (left, right) = word_segments(&del.content, &ins.content);
                SideRow {
                    left: Some(SideCell {
                        kind: LineKind::Deleted,
                        number: del.old_number.unwrap_or_default(),
                        segments: left,
                    }),
                    right: Some(SideCell {
                        kind: LineKind::Inserted,
                        number: ins.new_number.unwrap_or_default(),
                        segments: right,
                    }),
                }
            }
            (del, ins) => SideRow {
                left: del.map(|l| SideCell::plain(LineKind::Deleted, l.old_number, &l.content)),
                right: ins.map(|l| SideCell::plain(LineKind::Inserted, l.new_number, &l.content)),
            },
        };
        rows.push(row);
    }

    deleted.clear();
    inserted.clear();
}

/// Index pairs into `deleted` and `inserted`, in display order.
fn pair_changes(
    deleted: &[&DiffLine],
    inserted: &[&DiffLine],
    matching: LineMatching,
) -> Vec<(Option<usize>, Option<usize>)> {
    match matching {
        LineMatching::None => {
            let n = deleted.len().max(inserted.len());
            (0..n)
                .map(|i| {
                    (
                        (i < deleted.len()).then_some(i),
                        (i < inserted.len()).then_some(i),
                    )
                })
                .collect()
        }
        LineMatching::Lines => {
            let mut pairs = Vec::with_capacity(deleted.len() + inserted.len());
            let mut next = 0usize;
            for (d, del) in deleted.iter().enumerate() {
                let found = (next..inserted.len())
                    .take(MATCH_LOOKAHEAD)
                    .find(|&k| similarity(&del.content, &inserted[k].content) >= MATCH_THRESHOLD);
                match found {
                    Some(k) => {
                        pairs.extend((next..k).map(|j| (None, Some(j))));
                        pairs.push((Some(d), Some(k)));
                        next = k + 1;
                    }
                    None => pairs.push((Some(d), None)),
                }
            }
            pairs.extend((next..inserted.len()).map(|j| (None, Some(j))));
            pairs
        }
    }
}

fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

fn word_segments(old: &str, new: &str) -> (Vec<Segment>, Vec<Segment>) {
    let diff = TextDiff::from_words(old, new);
    let mut left = Vec::new();
    let mut right = Vec::new();
    for change in diff.iter_all_changes() {
        let value = change.value();
        match change.tag() {
            ChangeTag::Equal => {
                push_segment(&mut left, value, false);
                push_segment(&mut right, value, false);
            }
            ChangeTag::Delete => push_segment(&mut left, value, true),
            ChangeTag::Insert => push_segment(&mut right, value, true),
        }
    }
    (left, right)
}

fn push_segment(segments: &mut Vec<Segment>, text: &str, changed: bool) {
    if let Some(last) = segments.last_mut() {
        if last.changed == changed {
            last.text.push_str(text);
            return;
        }
    }
    segments.push(Segment {
        text: text.to_string(),
        changed,
    });
}
