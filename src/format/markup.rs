//! Text-to-markup helpers used by the formatters.
//!
//! [`TextRenderer`] is the seam for the two rich transformations a ticket
//! message needs: markdown to HTML and issue-reference linking. The default
//! [`MarkupRenderer`] uses `pulldown-cmark` and the `[[bugtraq]]` patterns
//! from configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use pulldown_cmark::{Options, Parser, html};
use regex::{Captures, Regex};
use tracing::warn;

use crate::config::BugtraqSettings;

/// Placeholder in bugtraq link templates.
const BUGID_PLACEHOLDER: &str = "%BUGID%";

/// Suffix appended to truncated text.
const ELLIPSIS: &str = "...";

/// Renders user-authored text for a room message.
pub trait TextRenderer: Send + Sync {
    /// Markdown to HTML, with issue references in `repository` linked.
    ///
    /// Paragraph tags are replaced with line breaks; the chat surface does
    /// not render block elements.
    fn markdown(&self, text: &str, repository: &str) -> String;

    /// Replaces issue references in `text` with links.
    fn link_references(&self, text: &str, repository: &str) -> String;
}

/// One compiled issue-reference pattern.
#[derive(Debug, Clone)]
struct BugtraqPattern {
    regex: Regex,
    url: String,
    repositories: Vec<String>,
}

impl BugtraqPattern {
    fn applies_to(&self, repository: &str) -> bool {
        self.repositories.is_empty() || self.repositories.iter().any(|r| r == repository)
    }

    fn link(&self, caps: &Captures<'_>) -> String {
        let whole = &caps[0];
        let id = caps.get(1).map_or(whole, |m| m.as_str());
        let href = self.url.replace(BUGID_PLACEHOLDER, id);
        format!("<a href=\"{}\">{}</a>", href, whole)
    }
}

fn compile(bugtraq: &[BugtraqSettings]) -> Vec<BugtraqPattern> {
    bugtraq
        .iter()
        .filter_map(|b| match Regex::new(&b.pattern) {
            Ok(regex) => Some(BugtraqPattern {
                regex,
                url: b.url.clone(),
                repositories: b.repositories.clone(),
            }),
            Err(e) => {
                warn!(name = %b.name, error = %e, "Ignoring invalid bugtraq pattern");
                None
            }
        })
        .collect()
}

/// Default [`TextRenderer`].
///
/// The pattern set can be swapped while the renderer is shared.
#[derive(Debug, Default)]
pub struct MarkupRenderer {
    patterns: ArcSwap<Vec<BugtraqPattern>>,
}

impl MarkupRenderer {
    /// A renderer that links nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the configured patterns. Invalid patterns are logged and skipped.
    pub fn from_settings(bugtraq: &[BugtraqSettings]) -> Self {
        MarkupRenderer {
            patterns: ArcSwap::from_pointee(compile(bugtraq)),
        }
    }

    /// Replaces the patterns used by subsequent renders.
    pub fn reload(&self, bugtraq: &[BugtraqSettings]) {
        self.patterns.store(Arc::new(compile(bugtraq)));
    }
}

impl TextRenderer for MarkupRenderer {
    fn markdown(&self, text: &str, repository: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let linked = self.link_references(text, repository);
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut out = String::with_capacity(linked.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(&linked, options));
        strip_paragraphs(&out)
    }

    /// Matches every applicable pattern against the original text. Where
    /// matches overlap, the one starting first wins, then the earlier pattern.
    fn link_references(&self, text: &str, repository: &str) -> String {
        let patterns = self.patterns.load();
        let mut found: Vec<(usize, usize, String)> = Vec::new();
        for pattern in patterns.iter().filter(|p| p.applies_to(repository)) {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0).filter(|m| !m.is_empty()) else {
                    continue;
                };
                found.push((whole.start(), whole.end(), pattern.link(&caps)));
            }
        }
        if found.is_empty() {
            return text.to_string();
        }
        found.sort_by_key(|(start, _, _)| *start);

        let mut out = String::with_capacity(text.len() * 2);
        let mut pos = 0;
        for (start, end, link) in found {
            if start < pos {
                continue;
            }
            out.push_str(&text[pos..start]);
            out.push_str(&link);
            pos = end;
        }
        out.push_str(&text[pos..]);
        out
    }
}

/// Drops `<p>` and turns `</p>` into a double line break.
pub fn strip_paragraphs(html: &str) -> String {
    html.replace("<p>", "")
        .replace("</p>\n", "<br/><br/>")
        .replace("</p>", "<br/><br/>")
        .trim_end()
        .to_string()
}

/// Escapes text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes plain text and turns its line breaks into `<br/>`.
pub fn plain_to_html(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br/>")
}

/// Shortens `text` to at most `max` characters, ending in `...` when cut.
///
/// Below the ellipsis length the text is cut without one.
pub fn trim_string(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= ELLIPSIS.len() {
        return text.chars().take(max).collect();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
