//! Resource-level comparison of two synthesized templates.

use crate::assembly::Assembly;
use crate::error::ArtifactError;
use itertools::{EitherOrBoth, Itertools};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    Added {
        logical_id: String,
        resource_type: String,
    },
    Removed {
        logical_id: String,
        resource_type: String,
    },
    Modified {
        logical_id: String,
        resource_type: String,
        /// Top-level property names whose values differ, sorted, then
        /// `DependsOn` if the dependencies changed.
        changed_properties: Vec<String>,
    },
    /// Same logical id, different resource type: the engine must recreate it.
    Replaced {
        logical_id: String,
        old_type: String,
        new_type: String,
    },
}

impl ResourceChange {
    pub fn logical_id(&self) -> &str {
        match self {
            ResourceChange::Added { logical_id, .. }
            | ResourceChange::Removed { logical_id, .. }
            | ResourceChange::Modified { logical_id, .. }
            | ResourceChange::Replaced { logical_id, .. } => logical_id,
        }
    }
}

impl fmt::Display for ResourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceChange::Added {
                logical_id,
                resource_type,
            } => write!(f, "[+] {} {}", resource_type, logical_id),
            ResourceChange::Removed {
                logical_id,
                resource_type,
            } => write!(f, "[-] {} {}", resource_type, logical_id),
            ResourceChange::Modified {
                logical_id,
                resource_type,
                changed_properties,
            } => write!(
                f,
                "[~] {} {} ({})",
                resource_type,
                logical_id,
                changed_properties.join(", ")
            ),
            ResourceChange::Replaced {
                logical_id,
                old_type,
                new_type,
            } => write!(f, "[!] {} {} -> {}", logical_id, old_type, new_type),
        }
    }
}

/// Changes between two templates, ordered by logical id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changes: Vec<ResourceChange>,
    /// Output ids that were added, removed or changed.
    pub changed_outputs: Vec<String>,
}

impl ChangeSet {
    pub fn between(previous: &Assembly, current: &Assembly) -> Result<Self, ArtifactError> {
        Ok(Self::between_templates(
            &previous.template_value()?,
            &current.template_value()?,
        ))
    }

    pub fn between_templates(previous: &Value, current: &Value) -> Self {
        let old_resources = section(previous, "Resources");
        let new_resources = section(current, "Resources");

        let changes = old_resources
            .iter()
            .merge_join_by(new_resources.iter(), |(a, _), (b, _)| a.cmp(b))
            .filter_map(|entry| match entry {
                EitherOrBoth::Left((id, old)) => Some(ResourceChange::Removed {
                    logical_id: id.to_string(),
                    resource_type: resource_type(old),
                }),
                EitherOrBoth::Right((id, new)) => Some(ResourceChange::Added {
                    logical_id: id.to_string(),
                    resource_type: resource_type(new),
                }),
                EitherOrBoth::Both((id, old), (_, new)) => compare_resource(id, old, new),
            })
            .collect();

        let old_outputs = section(previous, "Outputs");
        let new_outputs = section(current, "Outputs");
        let changed_outputs = old_outputs
            .iter()
            .merge_join_by(new_outputs.iter(), |(a, _), (b, _)| a.cmp(b))
            .filter_map(|entry| match entry {
                EitherOrBoth::Both((id, old), (_, new)) => (old != new).then(|| id.to_string()),
                EitherOrBoth::Left((id, _)) | EitherOrBoth::Right((id, _)) => Some(id.to_string()),
            })
            .collect();

        Self {
            changes,
            changed_outputs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.changed_outputs.is_empty()
    }

    pub fn get(&self, logical_id: &str) -> Option<&ResourceChange> {
        self.changes.iter().find(|c| c.logical_id() == logical_id)
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "There were no differences");
        }
        for change in &self.changes {
            writeln!(f, "{}", change)?;
        }
        for output in &self.changed_outputs {
            writeln!(f, "[~] Output {}", output)?;
        }
        Ok(())
    }
}

fn section<'a>(template: &'a Value, name: &str) -> BTreeMap<&'a str, &'a Value> {
    template
        .get(name)
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

fn resource_type(resource: &Value) -> String {
    resource
        .get("Type")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string()
}

fn compare_resource(logical_id: &str, old: &Value, new: &Value) -> Option<ResourceChange> {
    let old_type = resource_type(old);
    let new_type = resource_type(new);
    if old_type != new_type {
        return Some(ResourceChange::Replaced {
            logical_id: logical_id.to_string(),
            old_type,
            new_type,
        });
    }

    let old_properties = properties(old);
    let new_properties = properties(new);

    let mut changed_properties: Vec<String> = old_properties
        .iter()
        .merge_join_by(new_properties.iter(), |(a, _), (b, _)| a.cmp(b))
        .filter_map(|entry| match entry {
            EitherOrBoth::Both((name, a), (_, b)) => (a != b).then(|| name.to_string()),
            EitherOrBoth::Left((name, _)) | EitherOrBoth::Right((name, _)) => Some(name.to_string()),
        })
        .collect();
    if old.get("DependsOn") != new.get("DependsOn") {
        changed_properties.push("DependsOn".to_string());
    }

    (!changed_properties.is_empty()).then(|| ResourceChange::Modified {
        logical_id: logical_id.to_string(),
        resource_type: new_type,
        changed_properties,
    })
}

fn properties(resource: &Value) -> BTreeMap<&str, &Value> {
    resource
        .get("Properties")
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}
