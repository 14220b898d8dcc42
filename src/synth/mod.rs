//! Turns a fully declared [`Stack`] into a deployable [`Assembly`].
//!
//! Synthesis runs in two phases. [`ResolvedIdentifiers::collect`] first
//! builds the table of every identifier a placeholder may stand for and
//! checks every placeholder against it. Only then is a renderer created
//! from that table to interpolate properties and mapping templates, so a
//! template is never rendered while any identifier is still unknown.

use crate::assembly::Assembly;
use crate::error::SynthError;
use crate::plan::ProvisioningPlan;
use crate::stack::{AnnotationLevel, Stack};
use crate::template::placeholder;
use ahash::AHashMap;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

mod render;
mod resolve;

use render::Renderer;
pub use resolve::{Resolution, ResolvedIdentifiers};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

pub struct SynthesizerBuilder<'a> {
    stack: &'a Stack,
    strict_bindings: bool,
}

impl<'a> SynthesizerBuilder<'a> {
    pub fn new(stack: &'a Stack) -> Self {
        Self {
            stack,
            strict_bindings: false,
        }
    }

    /// Fails synthesis when a resolver's integration identity lacks the
    /// permission its request template invokes, instead of only warning.
    pub fn strict_bindings(mut self, strict: bool) -> Self {
        self.strict_bindings = strict;
        self
    }

    pub fn build(self) -> Synthesizer<'a> {
        Synthesizer {
            stack: self.stack,
            strict_bindings: self.strict_bindings,
        }
    }
}

pub struct Synthesizer<'a> {
    stack: &'a Stack,
    strict_bindings: bool,
}

impl<'a> Synthesizer<'a> {
    pub fn builder(stack: &'a Stack) -> SynthesizerBuilder<'a> {
        SynthesizerBuilder::new(stack)
    }

    pub fn synth(&self) -> Result<Assembly, SynthError> {
        let stack = self.stack;
        if let Some(cause) = stack.poisoned() {
            return Err(SynthError::StackPoisoned {
                stack: stack.name().to_string(),
                cause: cause.to_string(),
            });
        }
        if self.strict_bindings {
            if let Some(annotation) = stack
                .annotations()
                .iter()
                .find(|a| a.level == AnnotationLevel::Warning)
            {
                return Err(SynthError::InertBinding {
                    resolver: annotation.path.clone(),
                    message: annotation.message.clone(),
                });
            }
        }
        log::info!(
            "Synthesizing stack '{}' ({} resource(s))",
            stack.name(),
            stack.declarations().len()
        );

        let identifiers = ResolvedIdentifiers::collect(stack)?;
        let dependencies = collect_dependencies(stack)?;
        let plan = ProvisioningPlan::order(stack.declarations(), &dependencies)?;

        let renderer = Renderer::new(&identifiers);
        let template = self.emit_template(&renderer, &dependencies)?;
        let text = format!("{:#}", template);
        let fingerprint = fingerprint(&text);

        log::info!(
            "Synthesized '{}': {} resource(s), {} output(s), fingerprint {}",
            stack.name(),
            plan.len(),
            stack.outputs().len(),
            &fingerprint[..12]
        );

        Ok(Assembly {
            stack_name: stack.name().to_string(),
            template: text,
            plan,
            annotations: stack.annotations().to_vec(),
            fingerprint,
        })
    }

    fn emit_template(
        &self,
        renderer: &Renderer<'_>,
        dependencies: &AHashMap<String, BTreeSet<String>>,
    ) -> Result<Value, SynthError> {
        let stack = self.stack;

        let mut declarations: Vec<_> = stack.declarations().iter().collect();
        declarations.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));

        let mut resources = Map::new();
        for declaration in declarations {
            let mut properties = renderer.render_value(&declaration.path, &declaration.properties)?;
            for (property, template) in &declaration.templates {
                let rendered = renderer.render_template(&declaration.path, template)?;
                log::debug!("Rendered {} of '{}':\n{}", property, declaration.path, rendered);
                properties[property.as_str()] = Value::String(rendered);
            }
            for (property, value) in &declaration.opaque_properties {
                properties[property.as_str()] = value.clone();
            }

            let mut resource = Map::new();
            resource.insert("Type".to_string(), json!(declaration.kind.type_name()));
            resource.insert("Properties".to_string(), properties);
            if let Some(needs) = dependencies.get(&declaration.logical_id) {
                if !needs.is_empty() {
                    resource.insert("DependsOn".to_string(), json!(needs));
                }
            }
            resource.insert(
                "Metadata".to_string(),
                json!({ "stacksynth:path": format!("{}/{}", stack.name(), declaration.path) }),
            );
            resources.insert(declaration.logical_id.clone(), Value::Object(resource));
        }

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = stack.description() {
            template.insert("Description".to_string(), json!(description));
        }
        template.insert("Resources".to_string(), Value::Object(resources));

        if !stack.outputs().is_empty() {
            let mut outputs = Map::new();
            for output in stack.outputs() {
                let owner = format!("Outputs/{}", output.id);
                outputs.insert(
                    output.id.clone(),
                    json!({
                        "Description": output.description,
                        "Value": renderer.render_string(&owner, &output.value)?,
                    }),
                );
            }
            template.insert("Outputs".to_string(), Value::Object(outputs));
        }

        Ok(Value::Object(template))
    }
}

/// Logical ids each resource needs before it can be created: everything its
/// properties or templates point at, plus its explicit dependencies.
fn collect_dependencies(stack: &Stack) -> Result<AHashMap<String, BTreeSet<String>>, SynthError> {
    let mut dependencies = AHashMap::new();
    for declaration in stack.declarations() {
        let mut placeholders = Vec::new();
        placeholder::collect_from_value(&declaration.properties, &mut placeholders)
            .map_err(|e| crate::template::malformed(&declaration.path, e))?;
        for (_, template) in &declaration.templates {
            placeholders.extend(
                template
                    .placeholders()
                    .map_err(|e| crate::template::malformed(&declaration.path, e))?,
            );
        }

        let mut needs: BTreeSet<String> = placeholders
            .into_iter()
            .map(|p| p.logical_id)
            .filter(|id| *id != declaration.logical_id)
            .collect();
        needs.extend(declaration.depends_on.iter().cloned());
        dependencies.insert(declaration.logical_id.clone(), needs);
    }
    Ok(dependencies)
}

/// Lowercase hex SHA-256 of the rendered template.
pub fn fingerprint(template: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template.as_bytes());
    format!("{:x}", hasher.finalize())
}
