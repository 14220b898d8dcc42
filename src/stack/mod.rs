//! The construct scope that every resource is declared into.
//!
//! A [`Stack`] is passed explicitly to each construct. Constructs validate
//! their inputs, resolve the handles they depend on against the stack, and
//! append one or more [`Declaration`]s. Nothing is rendered here: rendering
//! happens later, in [`crate::synth`], once every identifier is known.

use crate::error::SynthError;
use crate::template::MappingTemplate;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod environment;
pub mod identity;
mod permissions;
mod reference;

pub use environment::{Environment, Partition};
pub use permissions::PermissionLedger;
pub use reference::{Attribute, ResourceKind, ResourceRef};

const MAX_STACK_NAME_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationLevel {
    Info,
    Warning,
}

/// A note attached to a construct path during the build, carried into the assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub level: AnnotationLevel,
    pub message: String,
}

/// One resource as declared by a construct, before any placeholder is resolved.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub path: String,
    pub logical_id: String,
    pub kind: ResourceKind,
    /// Property tree; strings may hold `${ref:<logicalId>.<Attribute>}` placeholders.
    pub properties: Value,
    /// Properties rendered from mapping templates, which must resolve to plain text.
    pub templates: Vec<(String, MappingTemplate)>,
    /// Properties copied into the template as-is. Never scanned for placeholders.
    pub opaque_properties: Vec<(String, Value)>,
    /// Dependencies that are not visible through placeholders.
    pub depends_on: Vec<String>,
    literal_attributes: Vec<(Attribute, String)>,
}

impl Declaration {
    pub(crate) fn new(path: String, kind: ResourceKind, properties: Value) -> Self {
        Self {
            logical_id: identity::logical_id(&path),
            path,
            kind,
            properties,
            templates: Vec::new(),
            opaque_properties: Vec::new(),
            depends_on: Vec::new(),
            literal_attributes: Vec::new(),
        }
    }

    /// Records an attribute whose value is already known during the build.
    pub(crate) fn with_literal(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.literal_attributes.push((attribute, value.into()));
        self
    }

    pub(crate) fn with_template(mut self, property: &str, template: MappingTemplate) -> Self {
        self.templates.push((property.to_string(), template));
        self
    }

    pub(crate) fn with_opaque(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.opaque_properties.push((property.to_string(), value.into()));
        self
    }

    pub(crate) fn with_dependency(mut self, dependency: &ResourceRef) -> Self {
        self.depends_on.push(dependency.logical_id().to_string());
        self
    }

    pub fn literal(&self, attribute: Attribute) -> Option<&str> {
        self.literal_attributes
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|(_, value)| value.as_str())
    }

    pub fn literal_attributes(&self) -> &[(Attribute, String)] {
        &self.literal_attributes
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.logical_id.clone(), self.kind)
    }
}

/// A value exported from the stack once it is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    pub id: String,
    pub description: String,
    /// May hold placeholders, resolved like any other property.
    pub value: String,
}

/// The deployment scope. Owns every declaration; constructs only hold handles.
#[derive(Debug)]
pub struct Stack {
    name: String,
    description: Option<String>,
    environment: Environment,
    declarations: Vec<Declaration>,
    index: AHashMap<String, usize>,
    construct_ids: AHashSet<String>,
    permissions: PermissionLedger,
    annotations: Vec<Annotation>,
    outputs: Vec<StackOutput>,
    poisoned: Option<String>,
}

impl Stack {
    pub fn new(name: &str, environment: Environment) -> Result<Self, SynthError> {
        validate_stack_name(name)?;
        Ok(Self {
            name: name.to_string(),
            description: None,
            environment,
            declarations: Vec::new(),
            index: AHashMap::new(),
            construct_ids: AHashSet::new(),
            permissions: PermissionLedger::default(),
            annotations: Vec::new(),
            outputs: Vec::new(),
            poisoned: None,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Declarations in the order they were made.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn permissions(&self) -> &PermissionLedger {
        &self.permissions
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn outputs(&self) -> &[StackOutput] {
        &self.outputs
    }

    /// The first construction error seen by this stack, if any.
    pub fn poisoned(&self) -> Option<&str> {
        self.poisoned.as_deref()
    }

    pub fn lookup(&self, logical_id: &str) -> Option<&Declaration> {
        self.index
            .get(logical_id)
            .and_then(|idx| self.declarations.get(*idx))
    }

    /// Checks that `reference` names a declared resource of the expected kind.
    pub fn resolve(
        &self,
        reference: &ResourceRef,
        referenced_by: &str,
    ) -> Result<&Declaration, SynthError> {
        let declaration =
            self.lookup(reference.logical_id())
                .ok_or_else(|| SynthError::UnresolvedReference {
                    missing_id: reference.logical_id().to_string(),
                    referenced_by: referenced_by.to_string(),
                })?;
        if declaration.kind != reference.kind() {
            return Err(SynthError::ReferenceKindMismatch {
                logical_id: reference.logical_id().to_string(),
                referenced_by: referenced_by.to_string(),
                expected: reference.kind().to_string(),
                found: declaration.kind.to_string(),
            });
        }
        Ok(declaration)
    }

    /// Deterministic physical name for a resource at `path`.
    pub fn physical_name(&self, path: &str, max_len: usize) -> String {
        identity::physical_name(&self.name, path, max_len)
    }

    pub fn add_output(&mut self, id: &str, description: &str, value: String) -> Result<(), SynthError> {
        identity::validate_construct_id(id)?;
        if self.outputs.iter().any(|output| output.id == id) {
            return Err(SynthError::DuplicateConstructId {
                id: id.to_string(),
                scope: format!("{}/Outputs", self.name),
            });
        }
        self.outputs.push(StackOutput {
            id: id.to_string(),
            description: description.to_string(),
            value,
        });
        Ok(())
    }

    pub(crate) fn claim_construct_id(&mut self, id: &str) -> Result<(), SynthError> {
        identity::validate_construct_id(id)?;
        if !self.construct_ids.insert(id.to_string()) {
            return Err(SynthError::DuplicateConstructId {
                id: id.to_string(),
                scope: self.name.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn declare(&mut self, declaration: Declaration) -> Result<ResourceRef, SynthError> {
        if self.index.contains_key(&declaration.logical_id) {
            return Err(SynthError::DuplicateConstructId {
                id: declaration.path.clone(),
                scope: self.name.clone(),
            });
        }
        log::debug!(
            "Declared {} '{}' as {}",
            declaration.kind,
            declaration.path,
            declaration.logical_id
        );
        let reference = declaration.reference();
        self.index
            .insert(declaration.logical_id.clone(), self.declarations.len());
        self.declarations.push(declaration);
        Ok(reference)
    }

    pub(crate) fn grant(&mut self, identity: &ResourceRef, actions: &[String], targets: &[String]) {
        self.permissions
            .grant(identity.logical_id(), actions, targets);
    }

    pub(crate) fn annotate(&mut self, path: &str, level: AnnotationLevel, message: String) {
        match level {
            AnnotationLevel::Warning => log::warn!("[{}] {}", path, message),
            AnnotationLevel::Info => log::info!("[{}] {}", path, message),
        }
        self.annotations.push(Annotation {
            path: path.to_string(),
            level,
            message,
        });
    }

    /// Passes `result` through, remembering the first failure so the stack
    /// can never be synthesized from a half-built graph.
    pub(crate) fn record<T>(&mut self, result: Result<T, SynthError>) -> Result<T, SynthError> {
        if let Err(e) = &result {
            if self.poisoned.is_none() {
                self.poisoned = Some(e.to_string());
            }
        }
        result
    }
}

fn validate_stack_name(name: &str) -> Result<(), SynthError> {
    let invalid = |message: &str| SynthError::InvalidName {
        kind: "Stack".to_string(),
        name: name.to_string(),
        message: message.to_string(),
    };
    if name.is_empty() || name.len() > MAX_STACK_NAME_LEN {
        return Err(invalid("must be between 1 and 128 characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(invalid("must start with a letter"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("may only contain letters, digits and '-'"));
    }
    Ok(())
}
