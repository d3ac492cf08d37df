//! The composition engine: merges contents and renders the final document.
//!
//! # Document Layout
//! ```text
//! <!DOCTYPE html><html><head>
//!     head fragments (merge order)
//!     collected <link> tags (deduplicated)
//! </head>
//! <body + body attribute fragments>
//!     start fragment ("layout" if present, else the default fragment)
//!     collected <script> tags
//!     tail fragments (merge order)
//! </body></html>
//! ```
//!
//! # Design Decisions
//! - One engine per request, consumed by `get_html`
//! - Assets are collected while rendering, so unreferenced fragments never
//!   contribute stylesheets or scripts
//! - The priority value is only a trigger for head deduplication; it never
//!   reorders fragments

use std::collections::HashMap;
use std::sync::Arc;

use crate::composition::content::Content;
use crate::composition::dedup::{default_strategy, DeduplicationStrategy};
use crate::composition::fragment::{
    join_attrs, Fragment, FragmentRef, FragmentResolver, LinkTag, MetaData, ScriptTag,
};
use crate::composition::head::dedupe_heads;
use crate::composition::CompositionError;

/// Reserved name of the body start fragment.
pub const LAYOUT_FRAGMENT_NAME: &str = "layout";

/// Separator between origin and local fragment names.
pub const FRAGMENT_SEPARATOR: char = '#';

const DEFAULT_BUFFER_SIZE: usize = 100 * 1024;

const DOCUMENT_START: &str = "<!DOCTYPE html>\n<html>\n  <head>\n    ";
const HEAD_END: &str = "\n  </head>";
const BODY_START: &str = "\n  <body";
const BODY_START_END: &str = ">\n    ";
const DOCUMENT_END: &str = "\n  </body>\n</html>\n";

/// Aggregates the contents of one request into a single HTML document.
#[derive(Debug)]
pub struct ContentMerge {
    meta: MetaData,
    head: Vec<FragmentRef>,
    body_attrs: Vec<FragmentRef>,
    /// Every body fragment twice: `#local` and the fully-qualified name.
    body: HashMap<String, FragmentRef>,
    tail: Vec<FragmentRef>,
    prioritised: bool,
    hashes: Vec<String>,
    dedup: Arc<dyn DeduplicationStrategy>,
}

impl ContentMerge {
    /// Engine using the default (identity) stylesheet strategy.
    pub fn new(meta: MetaData) -> Self {
        Self::with_strategy(meta, default_strategy())
    }

    pub fn with_strategy(meta: MetaData, dedup: Arc<dyn DeduplicationStrategy>) -> Self {
        Self {
            meta,
            head: Vec::new(),
            body_attrs: Vec::new(),
            body: HashMap::new(),
            tail: Vec::new(),
            prioritised: false,
            hashes: Vec::new(),
            dedup,
        }
    }

    pub fn set_deduplication_strategy(&mut self, dedup: Arc<dyn DeduplicationStrategy>) {
        self.dedup = dedup;
    }

    /// Merge a content. A positive `priority` enables head deduplication.
    pub fn add_content(&mut self, content: &dyn Content, priority: u32) {
        if let Some(f) = content.head() {
            self.head.push(f.clone());
        }
        if let Some(f) = content.body_attributes() {
            self.body_attrs.push(f.clone());
        }
        self.add_body(content);
        if let Some(f) = content.tail() {
            self.tail.push(f.clone());
        }
        if priority > 0 {
            self.prioritised = true;
        }
        if let Some(hash) = content.content_hash() {
            self.hashes.push(hash.to_string());
        }
    }

    fn add_body(&mut self, content: &dyn Content) {
        for (local_name, f) in content.body() {
            self.body
                .insert(format!("{}{}", FRAGMENT_SEPARATOR, local_name), f.clone());

            let mut fqn = content.name().to_string();
            if !local_name.is_empty() {
                fqn.push(FRAGMENT_SEPARATOR);
                fqn.push_str(local_name);
            }
            self.body.insert(fqn, f.clone());
        }
    }

    /// Hashes of every merged content that reported one.
    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    /// Look up a body fragment by full, normalised, or local name.
    pub fn body_fragment(&self, name: &str) -> Option<&FragmentRef> {
        resolve_name(&self.body, name)
    }

    /// Render the composed document.
    pub fn get_html(mut self) -> Result<Vec<u8>, CompositionError> {
        if self.prioritised {
            dedupe_heads(&mut self.head);
        }

        let mut ctx = RenderContext::new(&self.body, &self.meta);

        // the head stays open until the collected link tags are known
        let mut header = Vec::with_capacity(DEFAULT_BUFFER_SIZE);
        header.extend_from_slice(DOCUMENT_START.as_bytes());
        for f in &self.head {
            ctx.render(f, &mut header)?;
        }

        let mut body = Vec::with_capacity(DEFAULT_BUFFER_SIZE);
        body.extend_from_slice(BODY_START.as_bytes());
        for f in &self.body_attrs {
            body.push(b' ');
            f.render(&mut body, &self.meta, &mut ctx)?;
        }
        body.extend_from_slice(BODY_START_END.as_bytes());

        let start = if self.body_fragment(LAYOUT_FRAGMENT_NAME).is_some() {
            LAYOUT_FRAGMENT_NAME
        } else {
            ""
        };
        ctx.render_fragment(start, &mut body)?;

        let mut tail_inline = Vec::with_capacity(DEFAULT_BUFFER_SIZE);
        for f in &self.tail {
            ctx.render(f, &mut tail_inline)?;
        }
        tail_inline.extend_from_slice(DOCUMENT_END.as_bytes());

        let (link_tags, script_tags) = ctx.into_assets();

        for attrs in self.dedup.deduplicate(link_tags) {
            header.extend_from_slice(format!("\n    <link {}>", join_attrs(&attrs)).as_bytes());
        }
        header.extend_from_slice(HEAD_END.as_bytes());

        let mut tail_scripts = Vec::new();
        for script in &script_tags {
            tail_scripts.extend_from_slice(
                format!("\n      <script {}>{}</script>", join_attrs(&script.attrs), script.text)
                    .as_bytes(),
            );
        }

        let mut html = header;
        html.reserve(body.len() + tail_scripts.len() + tail_inline.len());
        html.extend_from_slice(&body);
        html.extend_from_slice(&tail_scripts);
        html.extend_from_slice(&tail_inline);
        Ok(html)
    }
}

/// State threaded through one recursive render.
///
/// Resolves nested fragment names and records the assets of every fragment
/// it renders, in rendering order.
struct RenderContext<'a> {
    body: &'a HashMap<String, FragmentRef>,
    meta: &'a MetaData,
    link_tags: Vec<LinkTag>,
    script_tags: Vec<ScriptTag>,
}

impl<'a> RenderContext<'a> {
    fn new(body: &'a HashMap<String, FragmentRef>, meta: &'a MetaData) -> Self {
        Self {
            body,
            meta,
            link_tags: Vec::new(),
            script_tags: Vec::new(),
        }
    }

    fn resolve(&self, name: &str) -> Result<FragmentRef, CompositionError> {
        resolve_name(self.body, name)
            .cloned()
            .ok_or_else(|| missing_fragment(self.body, name))
    }

    fn record_assets(&mut self, f: &dyn Fragment) {
        self.link_tags.extend_from_slice(f.link_tags());
        self.script_tags.extend_from_slice(f.script_tags());
    }

    /// Record the assets of `f`, then render it with this context as resolver.
    fn render(&mut self, f: &FragmentRef, out: &mut Vec<u8>) -> Result<(), CompositionError> {
        self.record_assets(f.as_ref());
        let meta = self.meta;
        f.render(out, meta, self)
    }

    fn into_assets(self) -> (Vec<LinkTag>, Vec<ScriptTag>) {
        (self.link_tags, self.script_tags)
    }
}

impl FragmentResolver for RenderContext<'_> {
    fn render_fragment(&mut self, name: &str, out: &mut Vec<u8>) -> Result<(), CompositionError> {
        let f = self.resolve(name)?;
        self.render(&f, out)
    }
}

fn resolve_name<'m>(body: &'m HashMap<String, FragmentRef>, name: &str) -> Option<&'m FragmentRef> {
    if let Some(f) = body.get(name) {
        return Some(f);
    }

    // normalise: "main#" -> "main"
    if let Some(stripped) = name.strip_suffix(FRAGMENT_SEPARATOR) {
        if let Some(f) = body.get(stripped) {
            return Some(f);
        }
    }

    // bare names fall back to the local name
    if !name.contains(FRAGMENT_SEPARATOR) {
        return body.get(&format!("{}{}", FRAGMENT_SEPARATOR, name));
    }

    None
}

fn missing_fragment(body: &HashMap<String, FragmentRef>, name: &str) -> CompositionError {
    let mut known: Vec<String> = body.keys().cloned().collect();
    known.sort();
    CompositionError::MissingFragment {
        name: name.to_string(),
        known,
    }
}
