use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::types::FormatExtractor;
use super::ExtractionError;

/// Elements whose content is never document text. Each element is closed
/// by its own end tag (no backreferences in `regex`).
static INVISIBLE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    let elements = ["script", "style", "head", "noscript", "template"]
        .iter()
        .map(|name| format!(r"<{name}\b[^>]*>.*?</{name}\s*>"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?is){elements}|<!--.*?-->")).unwrap()
});

/// Tags that end a visual line.
static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|table|section|article|blockquote|pre)\s*>").unwrap()
});

/// Table cells keep a separator so figures do not run together.
static CELL_ENDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(td|th)\s*>").unwrap());

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

/// HTML pages (e.g. saved filings).
pub struct HtmlExtractor;

impl FormatExtractor for HtmlExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let html = String::from_utf8_lossy(bytes);
        if html.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(html_to_text(&html))
    }
}

/// Strip markup and keep the readable text, one block per line.
pub fn html_to_text(html: &str) -> String {
    let without_hidden = INVISIBLE_BLOCKS.replace_all(html, " ");
    let with_cells = CELL_ENDS.replace_all(&without_hidden, "\t");
    let with_breaks = LINE_BREAKS.replace_all(&with_cells, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| collapse_spaces(line.trim()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `&#8364;` and `&#x20AC;` → `€`. Invalid code points are dropped.
pub(super) fn decode_numeric_entities(text: &str) -> Cow<'_, str> {
    NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    })
}

fn decode_entities(text: &str) -> String {
    decode_numeric_entities(text)
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&euro;", "€")
        .replace("&pound;", "£")
        .replace("&yen;", "¥")
        .replace("&amp;", "&")
}

/// Runs of spaces collapse to one; tabs (cell separators) survive.
fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev_space = false;
    for ch in line.chars() {
        if ch == ' ' || ch == '\u{a0}' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_paragraphs() {
        let html = "<html><body><h1>Annual Report</h1><p>Revenue <b>rose</b> 12%.</p><p>Costs fell.</p></body></html>";
        assert_eq!(html_to_text(html), "Annual Report\nRevenue rose 12%.\nCosts fell.");
    }

    #[test]
    fn drops_scripts_styles_and_comments() {
        let html = "<head><title>x</title><style>p{color:red}</style></head><script>var a = 1;</script><!-- hidden --><p>Visible</p>";
        assert_eq!(html_to_text(html), "Visible");
    }

    #[test]
    fn hidden_block_ends_at_its_own_closing_tag() {
        let html = "<head><style>p{}</style><title>Leak</title></head><p>Body</p>";
        assert_eq!(html_to_text(html), "Body");

        let html = "<script>if (a</style>b) {}</script><p>Shown</p>";
        assert_eq!(html_to_text(html), "Shown");
    }

    #[test]
    fn table_cells_are_tab_separated() {
        let html = "<table><tr><th>Year</th><th>Revenue</th></tr><tr><td>2023</td><td>100</td></tr></table>";
        let text = html_to_text(html);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["Year\tRevenue", "2023\t100"]);
    }

    #[test]
    fn decodes_entities() {
        let html = "<p>R&amp;D &lt;5% &#8364;10 &#x24;3&nbsp;&nbsp;bn</p>";
        assert_eq!(html_to_text(html), "R&D <5% €10 $3 bn");
    }

    #[test]
    fn empty_input_gives_empty_text() {
        assert_eq!(HtmlExtractor.extract(b"   ").unwrap(), "");
    }
}
