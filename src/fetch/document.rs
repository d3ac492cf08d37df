//! Splits an upstream HTML document into composable parts.
//!
//! Only the document skeleton is recognised: the inner markup of `<head>`,
//! the attributes of `<body>` and the inner markup of `<body>`, which becomes
//! the default (unnamed) body fragment. Stylesheet `<link>` tags and
//! external `<script src>` tags are lifted out of head and body markup and
//! attached to the fragment as assets. Everything else is kept verbatim so
//! `§[ ]§` placeholders survive.

use std::sync::LazyLock;

use regex::Regex;

use crate::composition::content::MemoryContent;
use crate::composition::fragment::{Attribute, LinkTag, ScriptTag, StringFragment};
use crate::composition::head::skip_trailing_break;

static ASSET_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<link\b(?P<link>[^>]*?)/?>|<script\b(?P<script>[^>]*)>\s*</script\s*>")
        .expect("valid asset tag pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute pattern")
});

/// Markup with its asset tags removed, and the removed tags in order.
#[derive(Debug, Default)]
struct Lifted {
    markup: String,
    links: Vec<LinkTag>,
    scripts: Vec<ScriptTag>,
}

impl Lifted {
    fn into_fragment(self) -> StringFragment {
        StringFragment::new(self.markup.trim())
            .with_link_tags(self.links)
            .with_script_tags(self.scripts)
    }

    fn is_empty(&self) -> bool {
        self.markup.trim().is_empty() && self.links.is_empty() && self.scripts.is_empty()
    }
}

/// Build a content named `name` from an HTML document.
pub fn split_document(name: &str, markup: &str) -> MemoryContent {
    // ASCII lowercasing keeps byte offsets stable
    let lower = markup.to_ascii_lowercase();
    let mut content = MemoryContent::new(name);
    let mut body_from = 0;

    if let Some((_, head_open_end)) = find_open_tag(&lower, "head", 0) {
        if let Some(head_close) = lower[head_open_end..].find("</head>").map(|i| i + head_open_end) {
            let head = lift_assets(&markup[head_open_end..head_close]);
            if !head.is_empty() {
                content = content.with_head(head.into_fragment().into_ref());
            }
            body_from = head_close + "</head>".len();
        }
    }

    let body = match find_open_tag(&lower, "body", body_from) {
        Some((body_start, body_open_end)) => {
            // attributes sit between "<body" and the closing ">"
            let attrs = markup[body_start + "<body".len()..body_open_end - 1].trim();
            if !attrs.is_empty() {
                content = content.with_body_attributes(StringFragment::new(attrs).into_ref());
            }
            let body_close = lower[body_open_end..]
                .rfind("</body>")
                .map(|i| i + body_open_end)
                .unwrap_or(markup.len());
            &markup[body_open_end..body_close]
        }
        None if body_from > 0 => strip_html_close(&markup[body_from..], &lower[body_from..]),
        None => markup,
    };

    content.with_body("", lift_assets(body).into_fragment().into_ref())
}

/// Remove stylesheet links and external scripts from `markup`.
///
/// Other links (icons, preloads) and inline scripts stay in place.
fn lift_assets(markup: &str) -> Lifted {
    let mut lifted = Lifted::default();
    let mut copied_to = 0;

    for caps in ASSET_TAG.captures_iter(markup) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        if let Some(attrs) = caps.name("link") {
            let attrs = parse_attributes(attrs.as_str());
            if !is_stylesheet(&attrs) {
                continue;
            }
            lifted.links.push(attrs);
        } else if let Some(attrs) = caps.name("script") {
            let attrs = parse_attributes(attrs.as_str());
            if !attrs.iter().any(|a| a.key == "src") {
                continue;
            }
            lifted.scripts.push(ScriptTag {
                attrs,
                text: String::new(),
            });
        }
        lifted.markup.push_str(&markup[copied_to..tag.start()]);
        copied_to = skip_trailing_break(markup, tag.end());
    }

    lifted.markup.push_str(&markup[copied_to..]);
    lifted
}

/// Attributes in source order; names are lowercased, bare names get "".
fn parse_attributes(attrs: &str) -> Vec<Attribute> {
    ATTRIBUTE
        .captures_iter(attrs)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            Attribute::new(caps[1].to_ascii_lowercase(), value)
        })
        .collect()
}

fn is_stylesheet(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|a| {
        a.key == "rel"
            && a.value
                .split_ascii_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("stylesheet"))
    })
}

/// Find `<tag` followed by whitespace, `/` or `>` at or after `from`.
/// Returns the tag start and the index just past its closing `>`.
fn find_open_tag(lower: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("<{}", tag);
    let mut search = from;
    while let Some(pos) = lower[search..].find(&needle).map(|i| i + search) {
        let after = pos + needle.len();
        match lower.as_bytes().get(after) {
            Some(b'>') | Some(b'/') => return Some((pos, after + lower[after..].find('>')? + 1)),
            Some(c) if c.is_ascii_whitespace() => {
                return Some((pos, after + lower[after..].find('>')? + 1))
            }
            _ => search = after,
        }
    }
    None
}

fn strip_html_close<'a>(markup: &'a str, lower: &str) -> &'a str {
    match lower.rfind("</html>") {
        Some(i) => &markup[..i],
        None => markup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::content::Content;

    fn markup(f: Option<&crate::composition::FragmentRef>) -> Option<String> {
        f.and_then(|f| f.markup().map(str::to_string))
    }

    #[test]
    fn test_full_document() {
        let c = split_document(
            "page",
            "<!DOCTYPE html>\n<html>\n<HEAD>\n  <title>Shop</title>\n</HEAD>\n<body class=\"shop\" data-x='1'>\n  <header>§[> nav]§</header>\n</body>\n</html>\n",
        );
        assert_eq!(c.name(), "page");
        assert_eq!(markup(c.head()), Some("<title>Shop</title>".into()));
        assert_eq!(
            markup(c.body_attributes()),
            Some("class=\"shop\" data-x='1'".into())
        );
        assert_eq!(
            markup(c.body().get("")),
            Some("<header>§[> nav]§</header>".into())
        );
        assert!(c.tail().is_none());
    }

    #[test]
    fn test_fragment_without_skeleton() {
        let c = split_document("nav", "<nav><a href=\"/\">home</a></nav>\n");
        assert!(c.head().is_none());
        assert!(c.body_attributes().is_none());
        assert_eq!(
            markup(c.body().get("")),
            Some("<nav><a href=\"/\">home</a></nav>".into())
        );
    }

    #[test]
    fn test_header_element_is_not_head() {
        let c = split_document("x", "<header>top</header>");
        assert!(c.head().is_none());
        assert_eq!(markup(c.body().get("")), Some("<header>top</header>".into()));
    }

    #[test]
    fn test_assets_are_lifted() {
        let c = split_document(
            "page",
            "<html><head>\n<title>t</title>\n<link rel=\"stylesheet\" href=\"/a.css\">\n<link rel=\"icon\" href=\"/i.png\">\n</head>\n<body>\n<SCRIPT src='/a.js' async></SCRIPT>\n<p>x</p>\n<link REL=\"Stylesheet\" href=/b.css />\n<script>inline()</script>\n</body></html>",
        );

        let head = c.head().unwrap();
        assert_eq!(
            head.markup(),
            Some("<title>t</title>\n<link rel=\"icon\" href=\"/i.png\">")
        );
        assert_eq!(
            head.link_tags(),
            &[vec![Attribute::new("rel", "stylesheet"), Attribute::new("href", "/a.css")]]
        );

        let body = c.body().get("").unwrap();
        assert_eq!(body.markup(), Some("<p>x</p>\n<script>inline()</script>"));
        assert_eq!(
            body.link_tags(),
            &[vec![Attribute::new("rel", "Stylesheet"), Attribute::new("href", "/b.css")]]
        );
        assert_eq!(
            body.script_tags(),
            &[ScriptTag {
                attrs: vec![Attribute::new("src", "/a.js"), Attribute::new("async", "")],
                text: String::new(),
            }]
        );
    }

    #[test]
    fn test_head_of_only_assets_is_kept() {
        let c = split_document("x", "<head><link rel=\"stylesheet\" href=\"/a.css\"></head><body>b</body>");
        let head = c.head().unwrap();
        assert_eq!(head.markup(), Some(""));
        assert_eq!(head.link_tags().len(), 1);
    }

    #[test]
    fn test_head_without_body_tag() {
        let c = split_document("x", "<html><head><meta charset=\"utf-8\"></head><p>hi</p></html>");
        assert_eq!(markup(c.head()), Some("<meta charset=\"utf-8\">".into()));
        assert_eq!(markup(c.body().get("")), Some("<p>hi</p>".into()));
    }
}
