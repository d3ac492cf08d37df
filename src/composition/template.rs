//! Placeholder execution for template fragments.
//!
//! Two placeholder forms are recognised, both wrapped in `§[` and `]§`:
//! - `§[ name ]§` substitutes a value from the render data
//! - `§[> name ]§` renders the nested fragment `name` in place
//!
//! Text outside placeholders is copied verbatim. Nested includes recurse
//! through the resolver; include cycles are not detected.

use serde_json::Value;

use crate::composition::fragment::{FragmentResolver, MetaData};
use crate::composition::CompositionError;

const OPEN: &str = "§[";
const CLOSE: &str = "]§";
const INCLUDE_MARKER: char = '>';

/// Expand `markup` into `out`.
pub fn execute_template(
    out: &mut Vec<u8>,
    markup: &str,
    data: &MetaData,
    resolver: &mut dyn FragmentResolver,
) -> Result<(), CompositionError> {
    let mut rest = markup;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.extend_from_slice(rest[..start].as_bytes());

        let inner = &rest[start + OPEN.len()..];
        let end = inner
            .find(CLOSE)
            .ok_or(CompositionError::UnterminatedPlaceholder {
                offset: offset + start,
            })?;

        let expr = inner[..end].trim();
        match expr.strip_prefix(INCLUDE_MARKER) {
            Some(name) => resolver.render_fragment(name.trim(), out)?,
            None => out.extend_from_slice(lookup(data, expr).as_bytes()),
        }

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.extend_from_slice(rest.as_bytes());
    Ok(())
}

/// Look up a dotted path in the render data. Missing values render empty.
fn lookup(data: &MetaData, path: &str) -> String {
    let mut segments = path.split('.');
    let value = segments
        .next()
        .and_then(|first| data.get(first))
        .and_then(|root| segments.try_fold(root, |v, seg| v.get(seg)));

    value.map(value_to_string).unwrap_or_default()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // query parameters carry every value; the first one is used
        Value::Array(items) => items.first().map(value_to_string).unwrap_or_default(),
        Value::Null | Value::Object(_) => String::new(),
    }
}
