use crate::error::SynthError;
use crate::stack::{Attribute, Stack};
use crate::template::{Placeholder, malformed, placeholder};
use ahash::AHashMap;
use serde_json::{Value, json};

/// What a placeholder turns into in the rendered template.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Known during synthesis and written out as plain text.
    Literal(String),
    /// Only known to the provisioning engine; written out as an intrinsic.
    Deferred(Value),
}

/// Every identifier the stack's placeholders may resolve to.
///
/// Collecting this table is the first synthesis phase. It fails on the first
/// placeholder that names an undeclared resource or an attribute the
/// resource does not expose, so rendering never sees a dangling reference.
#[derive(Debug, Default)]
pub struct ResolvedIdentifiers {
    table: AHashMap<(String, Attribute), Resolution>,
}

impl ResolvedIdentifiers {
    pub fn collect(stack: &Stack) -> Result<Self, SynthError> {
        let mut table = AHashMap::new();
        for declaration in stack.declarations() {
            let id = &declaration.logical_id;
            table.insert(
                (id.clone(), Attribute::Ref),
                Resolution::Deferred(json!({ "Ref": id })),
            );
            for attribute in declaration.kind.deferred_attributes() {
                table.insert(
                    (id.clone(), *attribute),
                    Resolution::Deferred(json!({ "Fn::GetAtt": [id, attribute.as_str()] })),
                );
            }
            // literals win over the engine-side defaults
            for (attribute, value) in declaration.literal_attributes() {
                table.insert((id.clone(), *attribute), Resolution::Literal(value.clone()));
            }
        }
        let identifiers = Self { table };

        for declaration in stack.declarations() {
            let mut placeholders = Vec::new();
            placeholder::collect_from_value(&declaration.properties, &mut placeholders)
                .map_err(|e| malformed(&declaration.path, e))?;
            for (_, template) in &declaration.templates {
                placeholders.extend(template.placeholders().map_err(|e| malformed(&declaration.path, e))?);
            }
            for placeholder in &placeholders {
                identifiers.check(stack, placeholder, &declaration.path)?;
            }
        }
        for output in stack.outputs() {
            let owner = format!("Outputs/{}", output.id);
            let placeholders =
                placeholder::extract_placeholders(&output.value).map_err(|e| malformed(&owner, e))?;
            for placeholder in &placeholders {
                identifiers.check(stack, placeholder, &owner)?;
            }
        }

        log::debug!("Resolved {} identifier(s)", identifiers.table.len());
        Ok(identifiers)
    }

    fn check(&self, stack: &Stack, placeholder: &Placeholder, owner: &str) -> Result<(), SynthError> {
        if stack.lookup(&placeholder.logical_id).is_none() {
            return Err(SynthError::UnresolvedReference {
                missing_id: placeholder.logical_id.clone(),
                referenced_by: owner.to_string(),
            });
        }
        if self.get(placeholder).is_none() {
            return Err(SynthError::MalformedTemplate {
                owner: owner.to_string(),
                placeholder: placeholder.raw.clone(),
                message: format!(
                    "'{}' does not expose the attribute '{}'",
                    placeholder.logical_id, placeholder.attribute
                ),
            });
        }
        Ok(())
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<&Resolution> {
        self.table
            .get(&(placeholder.logical_id.clone(), placeholder.attribute))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
