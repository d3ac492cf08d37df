//! Fragments: the renderable units that make up a composed page.
//!
//! # Responsibilities
//! - Define the `Fragment` capability (render + attached assets)
//! - Provide the template-backed `StringFragment`
//! - Model `<link>` and `<script>` assets discovered at parse time
//!
//! # Design Decisions
//! - Assets are attached when the fragment is built, never while rendering
//! - Fragments are immutable and shared as `Arc<dyn Fragment>`
//! - Nested includes go through a `FragmentResolver` handed in by the caller

use std::fmt;
use std::sync::Arc;

use crate::composition::template::execute_template;
use crate::composition::CompositionError;

/// Flat data handed to every render call (request metadata).
pub type MetaData = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a fragment.
pub type FragmentRef = Arc<dyn Fragment>;

/// A single `key="value"` pair of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Attribute list of a `<link>` tag.
pub type LinkTag = Vec<Attribute>;

/// A `<script>` tag: its attributes and inline text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptTag {
    pub attrs: Vec<Attribute>,
    pub text: String,
}

impl ScriptTag {
    /// External script pointing at `src`.
    pub fn external(src: impl Into<String>) -> Self {
        Self {
            attrs: vec![Attribute::new("src", src)],
            text: String::new(),
        }
    }
}

/// Join attributes as `key="value"` separated by single spaces.
pub fn join_attrs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .map(|a| format!("{}=\"{}\"", a.key, a.value.replace('"', "&quot;")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Callback used by fragments to render nested fragments by name.
pub trait FragmentResolver {
    /// Resolve `name` and render the fragment it points to into `out`.
    fn render_fragment(&mut self, name: &str, out: &mut Vec<u8>) -> Result<(), CompositionError>;
}

/// A renderable unit of markup with optional stylesheet/script assets.
pub trait Fragment: Send + Sync + fmt::Debug {
    /// Render this fragment into `out`.
    fn render(
        &self,
        out: &mut Vec<u8>,
        data: &MetaData,
        resolver: &mut dyn FragmentResolver,
    ) -> Result<(), CompositionError>;

    /// `<link>` tags this fragment needs in the document head.
    fn link_tags(&self) -> &[LinkTag];

    /// `<script>` tags this fragment needs at the end of the body.
    fn script_tags(&self) -> &[ScriptTag];

    /// Raw template markup, if the fragment is template based.
    fn markup(&self) -> Option<&str> {
        None
    }
}

/// Template-backed fragment.
///
/// The markup may contain `§[ var ]§` variable references and
/// `§[> name ]§` nested fragment references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringFragment {
    content: String,
    link_tags: Vec<LinkTag>,
    script_tags: Vec<ScriptTag>,
}

impl StringFragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link_tags: Vec::new(),
            script_tags: Vec::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn add_link_tags(&mut self, tags: impl IntoIterator<Item = LinkTag>) {
        self.link_tags.extend(tags);
    }

    pub fn add_script_tags(&mut self, tags: impl IntoIterator<Item = ScriptTag>) {
        self.script_tags.extend(tags);
    }

    /// Builder form of [`add_link_tags`](Self::add_link_tags).
    pub fn with_link_tags(mut self, tags: impl IntoIterator<Item = LinkTag>) -> Self {
        self.add_link_tags(tags);
        self
    }

    /// Builder form of [`add_script_tags`](Self::add_script_tags).
    pub fn with_script_tags(mut self, tags: impl IntoIterator<Item = ScriptTag>) -> Self {
        self.add_script_tags(tags);
        self
    }

    /// Fragment with `content` as markup and the assets of `source`.
    pub fn with_content(source: &dyn Fragment, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link_tags: source.link_tags().to_vec(),
            script_tags: source.script_tags().to_vec(),
        }
    }

    pub fn into_ref(self) -> FragmentRef {
        Arc::new(self)
    }
}

impl Fragment for StringFragment {
    fn render(
        &self,
        out: &mut Vec<u8>,
        data: &MetaData,
        resolver: &mut dyn FragmentResolver,
    ) -> Result<(), CompositionError> {
        execute_template(out, &self.content, data, resolver)
    }

    fn link_tags(&self) -> &[LinkTag] {
        &self.link_tags
    }

    fn script_tags(&self) -> &[ScriptTag] {
        &self.script_tags
    }

    fn markup(&self) -> Option<&str> {
        Some(&self.content)
    }
}

/// Build the attribute list of a regular stylesheet link.
pub fn stylesheet_link(href: impl Into<String>) -> LinkTag {
    vec![
        Attribute::new("rel", "stylesheet"),
        Attribute::new("type", "text/css"),
        Attribute::new("href", href),
    ]
}
