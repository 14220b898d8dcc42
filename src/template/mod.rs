//! Resolver mapping templates.
//!
//! A [`MappingTemplate`] is opaque text for the API platform's template
//! language, plus any number of resource placeholders. Placeholders are
//! replaced with literal identifiers during synthesis; a template never
//! reaches the output with a placeholder left in it.

use crate::error::SynthError;
use crate::stack::{Attribute, ResourceRef};
use serde_json::json;

pub mod placeholder;

pub use placeholder::{Placeholder, PlaceholderSyntaxError, Segment};

/// Resolver template format version understood by the API platform.
pub const RESOLVER_TEMPLATE_VERSION: &str = "2018-05-29";

/// Response template that serializes the integration result unchanged.
pub const PASSTHROUGH_RESPONSE: &str = "$util.toJson($ctx.result)";

pub const START_EXECUTION_TARGET: &str = "AWSStepFunctions.StartExecution";
pub const START_EXECUTION_ACTION: &str = "states:StartExecution";
const JSON_1_0_CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// The permission a template needs its integration identity to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub action: String,
    pub target: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTemplate {
    text: String,
    invocation: Option<Invocation>,
}

impl MappingTemplate {
    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            invocation: None,
        }
    }

    pub fn passthrough() -> Self {
        Self::from_string(PASSTHROUGH_RESPONSE)
    }

    /// Request template that starts one execution of `state_machine`.
    ///
    /// The body is the fixed-shape HTTP request the API platform sends to the
    /// workflow service; the state machine ARN is filled in during synthesis.
    pub fn start_execution(state_machine: &ResourceRef) -> Self {
        let request = json!({
            "version": RESOLVER_TEMPLATE_VERSION,
            "method": "POST",
            "resourcePath": "/",
            "params": {
                "headers": {
                    "content-type": JSON_1_0_CONTENT_TYPE,
                    "x-amz-target": START_EXECUTION_TARGET,
                },
                "body": {
                    "stateMachineArn": state_machine.placeholder(Attribute::Arn),
                }
            }
        });
        Self::from_string(format!("{:#}", request))
            .invoking(START_EXECUTION_ACTION, state_machine)
    }

    /// Declares that rendering this template makes the integration perform `action` on `target`.
    pub fn invoking(mut self, action: &str, target: &ResourceRef) -> Self {
        self.invocation = Some(Invocation {
            action: action.to_string(),
            target: target.clone(),
        });
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn invocation(&self) -> Option<&Invocation> {
        self.invocation.as_ref()
    }

    pub fn placeholders(&self) -> Result<Vec<Placeholder>, PlaceholderSyntaxError> {
        placeholder::extract_placeholders(&self.text)
    }

    /// Replaces every placeholder with the text `resolve` returns for it.
    pub fn render<F>(&self, owner: &str, mut resolve: F) -> Result<String, SynthError>
    where
        F: FnMut(&Placeholder) -> Result<String, SynthError>,
    {
        let segments = placeholder::parse_segments(&self.text)
            .map_err(|e| malformed(owner, e))?;
        let mut rendered = String::with_capacity(self.text.len());
        for segment in &segments {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Placeholder(placeholder) => rendered.push_str(&resolve(placeholder)?),
            }
        }
        Ok(rendered)
    }
}

pub(crate) fn malformed(owner: &str, error: PlaceholderSyntaxError) -> SynthError {
    SynthError::MalformedTemplate {
        owner: owner.to_string(),
        placeholder: error.placeholder,
        message: error.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ResourceKind;

    #[test]
    fn start_execution_has_the_fixed_request_shape() {
        let target = ResourceRef::from_logical_id(ResourceKind::StateMachine, "statemachine12345678");
        let template = MappingTemplate::start_execution(&target);

        let parsed: serde_json::Value = serde_json::from_str(template.text()).unwrap();
        assert_eq!(parsed["version"], "2018-05-29");
        assert_eq!(parsed["method"], "POST");
        assert_eq!(parsed["resourcePath"], "/");
        assert_eq!(parsed["params"]["headers"]["content-type"], "application/x-amz-json-1.0");
        assert_eq!(parsed["params"]["headers"]["x-amz-target"], "AWSStepFunctions.StartExecution");
        assert_eq!(
            parsed["params"]["body"]["stateMachineArn"],
            "${ref:statemachine12345678.Arn}"
        );

        let keys: Vec<_> = parsed.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["version", "method", "resourcePath", "params"]);

        let invocation = template.invocation().unwrap();
        assert_eq!(invocation.action, "states:StartExecution");
        assert_eq!(invocation.target, target);
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let template = MappingTemplate::from_string("${ref:a.Arn} and ${ref:b.Name}");
        let rendered = template
            .render("owner", |p| Ok(format!("<{}>", p.logical_id)))
            .unwrap();
        assert_eq!(rendered, "<a> and <b>");
    }

    #[test]
    fn render_reports_malformed_placeholders() {
        let template = MappingTemplate::from_string("${ref:a.Arn");
        let err = template.render("Api/Resolver", |_| Ok(String::new())).unwrap_err();
        assert!(matches!(err, SynthError::MalformedTemplate { ref owner, .. } if owner == "Api/Resolver"));
    }

    #[test]
    fn passthrough_is_verbatim() {
        let template = MappingTemplate::passthrough();
        assert_eq!(template.text(), "$util.toJson($ctx.result)");
        assert!(template.placeholders().unwrap().is_empty());
        assert!(template.invocation().is_none());
    }
}
