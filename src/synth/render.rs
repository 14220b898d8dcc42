use super::resolve::{Resolution, ResolvedIdentifiers};
use crate::error::SynthError;
use crate::template::{MappingTemplate, Placeholder, Segment, malformed, placeholder};
use serde_json::{Map, Value, json};

/// Substitutes placeholders using a completed [`ResolvedIdentifiers`] table.
///
/// Only constructible from that table, so rendering cannot start before
/// every identifier has been collected and checked.
pub(super) struct Renderer<'a> {
    identifiers: &'a ResolvedIdentifiers,
}

impl<'a> Renderer<'a> {
    pub(super) fn new(identifiers: &'a ResolvedIdentifiers) -> Self {
        Self { identifiers }
    }

    /// Renders every string in a property tree.
    pub(super) fn render_value(&self, owner: &str, value: &Value) -> Result<Value, SynthError> {
        match value {
            Value::String(text) => self.render_string(owner, text),
            Value::Array(values) => values
                .iter()
                .map(|nested| self.render_value(owner, nested))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut rendered = Map::with_capacity(map.len());
                for (key, nested) in map {
                    rendered.insert(key.clone(), self.render_value(owner, nested)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }

    /// A string with no deferred placeholder stays a string. A lone deferred
    /// placeholder becomes its intrinsic; anything else is joined.
    pub(super) fn render_string(&self, owner: &str, text: &str) -> Result<Value, SynthError> {
        let segments = placeholder::parse_segments(text).map_err(|e| malformed(owner, e))?;

        let mut parts: Vec<Value> = Vec::new();
        let mut pending = String::new();
        for segment in &segments {
            match segment {
                Segment::Text(text) => pending.push_str(text),
                Segment::Placeholder(placeholder) => match self.lookup(owner, placeholder)? {
                    Resolution::Literal(value) => pending.push_str(value),
                    Resolution::Deferred(intrinsic) => {
                        if !pending.is_empty() {
                            parts.push(Value::String(std::mem::take(&mut pending)));
                        }
                        parts.push(intrinsic.clone());
                    }
                },
            }
        }

        if parts.is_empty() {
            return Ok(Value::String(pending));
        }
        if !pending.is_empty() {
            parts.push(Value::String(pending));
        }
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(json!({ "Fn::Join": ["", parts] }))
    }

    /// Mapping templates are opaque to the engine, so every placeholder in
    /// them must resolve to a literal.
    pub(super) fn render_template(
        &self,
        owner: &str,
        template: &MappingTemplate,
    ) -> Result<String, SynthError> {
        template.render(owner, |placeholder| match self.lookup(owner, placeholder)? {
            Resolution::Literal(value) => Ok(value.clone()),
            Resolution::Deferred(_) => Err(SynthError::MalformedTemplate {
                owner: owner.to_string(),
                placeholder: placeholder.raw.clone(),
                message: format!(
                    "'{}' of '{}' is only known after provisioning",
                    placeholder.attribute, placeholder.logical_id
                ),
            }),
        })
    }

    fn lookup(&self, owner: &str, placeholder: &Placeholder) -> Result<&'a Resolution, SynthError> {
        self.identifiers
            .get(placeholder)
            .ok_or_else(|| SynthError::UnresolvedReference {
                missing_id: placeholder.logical_id.clone(),
                referenced_by: owner.to_string(),
            })
    }
}
