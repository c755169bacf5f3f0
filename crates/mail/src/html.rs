//! HTML mail body flattening.
//!
//! Downstream reply mails usually arrive as HTML; correlation matching and
//! request parsing both operate on plain text.

use std::sync::OnceLock;

use regex::Regex;

static SCRIPT_STYLE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Strip `<script>`/`<style>` blocks and all tags, then unescape the
/// entities that show up in mail bodies.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let script_style = SCRIPT_STYLE_RE
        .get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").ok());
    let tags = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").ok());

    let mut text = html.to_string();
    if let Some(re) = script_style {
        text = re.replace_all(&text, "").into_owned();
    }
    if let Some(re) = tags {
        text = re.replace_all(&text, " ").into_owned();
    }
    unescape_entities(&text)
}

fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        // Must come last so freed ampersands are not re-interpreted.
        .replace("&amp;", "&")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        let text = html_to_text("<html><body><p>send gfs:45N</p></body></html>");
        assert!(text.contains("send gfs:45N"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_strips_script_and_style_content() {
        let html = "<style>p { color: red }</style><script>alert(1)</script><p>payload</p>";
        let text = html_to_text(html);
        assert!(text.contains("payload"));
        assert!(!text.contains("color"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn test_unescapes_entities() {
        assert_eq!(
            html_to_text("a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39;"),
            "a & b <c> \"d\" 'e'"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text("no markup here"), "no markup here");
    }
}
