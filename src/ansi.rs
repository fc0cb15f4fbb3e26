use std::sync::OnceLock;

use maud::{Markup, html};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

const STANDARD: [Rgb; 8] = [
    Rgb(0, 0, 0),
    Rgb(187, 0, 0),
    Rgb(0, 187, 0),
    Rgb(187, 187, 0),
    Rgb(0, 0, 187),
    Rgb(187, 0, 187),
    Rgb(0, 187, 187),
    Rgb(255, 255, 255),
];

const BRIGHT: [Rgb; 8] = [
    Rgb(85, 85, 85),
    Rgb(255, 85, 85),
    Rgb(0, 255, 0),
    Rgb(255, 255, 85),
    Rgb(85, 85, 255),
    Rgb(255, 85, 255),
    Rgb(85, 255, 255),
    Rgb(255, 255, 255),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Style {
    fg: Option<Rgb>,
    bg: Option<Rgb>,
    bold: bool,
    faint: bool,
    italic: bool,
    underline: bool,
}

impl Style {
    fn css(&self) -> String {
        let mut parts = Vec::new();
        if self.bold {
            parts.push("font-weight:bold".to_string());
        }
        if self.faint {
            parts.push("opacity:0.7".to_string());
        }
        if self.italic {
            parts.push("font-style:italic".to_string());
        }
        if self.underline {
            parts.push("text-decoration:underline".to_string());
        }
        if let Some(Rgb(r, g, b)) = self.fg {
            parts.push(format!("color:rgb({r},{g},{b})"));
        }
        if let Some(Rgb(r, g, b)) = self.bg {
            parts.push(format!("background-color:rgb({r},{g},{b})"));
        }
        parts.join(";")
    }

    fn apply(&mut self, params: &str) {
        let codes: Vec<u16> = if params.is_empty() {
            vec![0]
        } else {
            params.split(';').map(|p| p.parse().unwrap_or(0)).collect()
        };

        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => *self = Style::default(),
                1 => self.bold = true,
                2 => self.faint = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => {
                    self.bold = false;
                    self.faint = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                c @ 30..=37 => self.fg = Some(STANDARD[usize::from(c - 30)]),
                39 => self.fg = None,
                c @ 40..=47 => self.bg = Some(STANDARD[usize::from(c - 40)]),
                49 => self.bg = None,
                c @ 90..=97 => self.fg = Some(BRIGHT[usize::from(c - 90)]),
                c @ 100..=107 => self.bg = Some(BRIGHT[usize::from(c - 100)]),
                c @ (38 | 48) => {
                    let (color, used) = extended_color(&codes[i + 1..]);
                    if c == 38 {
                        self.fg = color;
                    } else {
                        self.bg = color;
                    }
                    i += used;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parses the tail of a `38;…`/`48;…` sequence; returns the color and the codes consumed.
fn extended_color(rest: &[u16]) -> (Option<Rgb>, usize) {
    let channel = |v: u16| u8::try_from(v).unwrap_or(u8::MAX);
    match rest {
        [5, n, ..] => (Some(palette_256(channel(*n))), 2),
        [2, r, g, b, ..] => (Some(Rgb(channel(*r), channel(*g), channel(*b))), 4),
        [] => (None, 0),
        _ => (None, rest.len()),
    }
}

fn palette_256(n: u8) -> Rgb {
    match n {
        0..=7 => STANDARD[usize::from(n)],
        8..=15 => BRIGHT[usize::from(n - 8)],
        16..=231 => {
            let n = n - 16;
            let level = |v: u8| if v == 0 { 0 } else { v * 40 + 55 };
            Rgb(level(n / 36), level((n / 6) % 6), level(n % 6))
        }
        _ => {
            let v = (n - 232) * 10 + 8;
            Rgb(v, v, v)
        }
    }
}

fn csi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[(?P<params>[0-9;?]*)(?P<cmd>[@-~])").expect("csi regex")
    })
}

/// Converts ANSI-colored terminal output into escaped HTML with styled spans.
pub fn to_html(text: &str) -> Markup {
    let mut runs: Vec<(Style, &str)> = Vec::new();
    let mut style = Style::default();
    let mut last = 0usize;

    for caps in csi_re().captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > last {
            runs.push((style, &text[last..m.start()]));
        }
        if &caps["cmd"] == "m" {
            style.apply(&caps["params"]);
        }
        last = m.end();
    }
    if last < text.len() {
        runs.push((style, &text[last..]));
    }

    html! {
        @for (style, chunk) in &runs {
            @if *style == Style::default() {
                (chunk)
            } @else {
                span style=(style.css()) { (chunk) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_escaped_only() {
        assert_eq!(to_html("ok: [host] => <done> & more").into_string(),
            "ok: [host] =&gt; &lt;done&gt; &amp; more");
    }

    #[test]
    fn colors_become_spans() {
        let html = to_html("\x1b[0;32mok: [web1]\x1b[0m\n\x1b[1;31mfatal\x1b[0m").into_string();
        assert_eq!(
            html,
            "<span style=\"color:rgb(0,187,0)\">ok: [web1]</span>\n\
             <span style=\"font-weight:bold;color:rgb(187,0,0)\">fatal</span>"
        );
    }

    #[test]
    fn extended_colors_and_other_sequences() {
        let html = to_html("\x1b[38;5;196mred\x1b[39m\x1b[2Kplain\x1b[48;2;1;2;3mbg").into_string();
        assert_eq!(
            html,
            "<span style=\"color:rgb(255,0,0)\">red</span>plain\
             <span style=\"background-color:rgb(1,2,3)\">bg</span>"
        );
    }
}
