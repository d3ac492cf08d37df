//! Head merging for prioritised compositions.
//!
//! When several contents contribute head markup, duplicate `<title>` and
//! `<meta>` declarations are dropped. Heads are walked from the last merged
//! to the first and the first declaration seen for a property wins, so the
//! most recently merged content decides.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::composition::fragment::{Fragment, FragmentRef, StringFragment};

/// Property key → declaring tag, as seen so far.
pub type HeadProperties = HashMap<String, String>;

static HEAD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>.*?</title\s*>|<meta\b[^>]*>").expect("valid head tag pattern")
});

static META_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:^|\s)(name|property|http-equiv|itemprop|charset)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#,
    )
    .expect("valid meta attribute pattern")
});

/// Drop duplicate title/meta declarations across `heads`, in place.
///
/// Only template fragments are rewritten; other fragments pass untouched.
pub fn dedupe_heads(heads: &mut [FragmentRef]) {
    let mut seen = HeadProperties::new();

    for head in heads.iter_mut().rev() {
        let Some(markup) = head.markup() else {
            continue;
        };
        let filtered = filter_head_markup(markup, &mut seen);
        if filtered != markup {
            let replacement = StringFragment::with_content(&**head, filtered);
            *head = Arc::new(replacement);
        }
    }
}

/// Remove every title/meta tag of `markup` whose property is already in
/// `seen`, recording the remaining ones.
pub fn filter_head_markup(markup: &str, seen: &mut HeadProperties) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut copied_to = 0;

    for tag in HEAD_TAG.find_iter(markup) {
        let Some(key) = property_key(tag.as_str()) else {
            continue;
        };
        if seen.contains_key(&key) {
            out.push_str(&markup[copied_to..tag.start()]);
            copied_to = skip_trailing_break(markup, tag.end());
        } else {
            seen.insert(key, tag.as_str().to_string());
        }
    }

    out.push_str(&markup[copied_to..]);
    out
}

fn property_key(tag: &str) -> Option<String> {
    if tag.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("<title")) {
        return Some("title".to_string());
    }

    let caps = META_KEY.captures(tag)?;
    let attr = caps[1].to_ascii_lowercase();
    if attr == "charset" {
        return Some("meta:charset".to_string());
    }
    let value = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    Some(format!("meta:{}={}", attr, value))
}

/// Index after the spaces and single line break following `pos`.
pub(crate) fn skip_trailing_break(markup: &str, pos: usize) -> usize {
    let bytes = markup.as_bytes();
    let mut i = pos;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if bytes[i..].starts_with(b"\r\n") {
        i + 2
    } else if bytes[i..].starts_with(b"\n") {
        i + 1
    } else {
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::fragment::stylesheet_link;

    #[test]
    fn test_first_declaration_wins() {
        let mut seen = HeadProperties::new();
        let first = filter_head_markup("<title>latest</title>\n<meta name=\"description\" content=\"new\">\n", &mut seen);
        assert_eq!(first, "<title>latest</title>\n<meta name=\"description\" content=\"new\">\n");

        let second = filter_head_markup(
            "<TITLE>older</TITLE>\n  <meta name='Description' content=\"old\">\n<meta name=\"robots\" content=\"index\">\n",
            &mut seen,
        );
        assert_eq!(second, "  <meta name=\"robots\" content=\"index\">\n");
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_charset_and_unkeyed_meta() {
        let mut seen = HeadProperties::new();
        filter_head_markup("<meta charset=\"utf-8\">", &mut seen);
        let out = filter_head_markup("<meta charset=\"latin1\"><meta content=\"x\">", &mut seen);
        assert_eq!(out, "<meta content=\"x\">");
    }

    #[test]
    fn test_attribute_suffix_is_not_a_key() {
        let mut seen = HeadProperties::new();
        filter_head_markup("<meta name=\"x\" content=\"1\">", &mut seen);
        let out = filter_head_markup("<meta data-name=\"x\" content=\"2\">", &mut seen);
        assert_eq!(out, "<meta data-name=\"x\" content=\"2\">");
    }

    #[test]
    fn test_multibyte_character_after_meta() {
        let mut seen = HeadProperties::new();
        filter_head_markup("<meta name=\"x\" content=\"1\">", &mut seen);
        let out = filter_head_markup("<meta\u{a0}name=\"x\"><title>t</title>", &mut seen);
        assert_eq!(out, "<title>t</title>");
        assert!(seen.contains_key("title"));
    }

    #[test]
    fn test_dedupe_heads_keeps_latest_and_assets() {
        let older = StringFragment::new("<title>older</title>\n<link-ish/>")
            .with_link_tags(vec![stylesheet_link("/older.css")])
            .into_ref();
        let latest = StringFragment::new("<title>latest</title>").into_ref();
        let mut heads = vec![older, latest.clone()];

        dedupe_heads(&mut heads);

        assert!(Arc::ptr_eq(&heads[1], &latest));
        assert_eq!(heads[0].markup(), Some("<link-ish/>"));
        assert_eq!(heads[0].link_tags(), &[stylesheet_link("/older.css")]);
    }

    #[test]
    fn test_untouched_heads_are_not_replaced() {
        let head = StringFragment::new("<page-head/>").into_ref();
        let mut heads = vec![head.clone()];
        dedupe_heads(&mut heads);
        assert!(Arc::ptr_eq(&heads[0], &head));
    }
}
