//! The Workflow Definition: a sequence of timed waits executed by the
//! managed workflow service, bounded by an overall execution timeout.

use crate::error::SynthError;
use crate::resources::iam::{GrantProps, PermissionGrant, Role, RoleProps, ServicePrincipal};
use crate::stack::{Attribute, Declaration, ResourceKind, ResourceRef, Stack};
use crate::template::START_EXECUTION_ACTION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

const MAX_STATE_NAME_LEN: usize = 80;
const MAX_STATE_MACHINE_NAME_LEN: usize = 80;
/// Express workflows cannot run longer than five minutes.
const EXPRESS_MAX_DURATION_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMachineType {
    #[default]
    Standard,
    Express,
}

impl StateMachineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMachineType::Standard => "STANDARD",
            StateMachineType::Express => "EXPRESS",
        }
    }
}

/// One state that pauses the execution for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStep {
    pub name: String,
    pub duration: Duration,
}

impl WaitStep {
    pub fn new(name: &str, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            duration,
        }
    }

    pub fn seconds(name: &str, seconds: u64) -> Self {
        Self::new(name, Duration::from_secs(seconds))
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowProps {
    /// Executed in order; the last step ends the execution.
    pub steps: Vec<WaitStep>,
    pub timeout: Duration,
    pub machine_type: StateMachineType,
    pub comment: Option<String>,
}

impl WorkflowProps {
    pub fn single_wait(wait: Duration, timeout: Duration) -> Self {
        Self {
            steps: vec![WaitStep::new("task", wait)],
            timeout,
            machine_type: StateMachineType::Standard,
            comment: None,
        }
    }
}

/// A declared state machine together with the role it executes under.
#[derive(Debug, Clone)]
pub struct StateMachine {
    path: String,
    reference: ResourceRef,
    role: Role,
    name: String,
    arn: String,
    timeout_secs: u64,
    total_wait_secs: u64,
}

impl StateMachine {
    pub fn new(stack: &mut Stack, id: &str, props: WorkflowProps) -> Result<Self, SynthError> {
        let result = Self::declare(stack, id, props);
        stack.record(result)
    }

    fn declare(stack: &mut Stack, id: &str, props: WorkflowProps) -> Result<Self, SynthError> {
        stack.claim_construct_id(id)?;
        let definition = WorkflowGraph::validate(id, &props)?;

        let principal = ServicePrincipal::for_service(stack, "states");
        let role = Role::declare_at(stack, &format!("{}/Role", id), RoleProps::assumed_by(principal))?;

        let path = format!("{}/Resource", id);
        let name = stack.physical_name(&path, MAX_STATE_MACHINE_NAME_LEN);
        let env = stack.environment();
        let arn = env.arn("states", env.region(), &format!("stateMachine:{}", name));

        let properties = json!({
            "StateMachineName": name,
            "StateMachineType": props.machine_type.as_str(),
            "RoleArn": role.reference().placeholder(Attribute::Arn),
        });
        // step names and the comment are user text, not placeholders
        let declaration = Declaration::new(path.clone(), ResourceKind::StateMachine, properties)
            .with_opaque("DefinitionString", definition.to_definition_string())
            .with_literal(Attribute::Arn, arn.clone())
            .with_literal(Attribute::Name, name.clone())
            .with_literal(Attribute::Ref, arn.clone());
        let reference = stack.declare(declaration)?;

        log::info!(
            "Declared workflow '{}' ({} step(s), {}s of waits, {}s timeout)",
            id,
            props.steps.len(),
            definition.total_wait_secs,
            definition.timeout_secs
        );

        Ok(Self {
            path,
            reference,
            role,
            name,
            arn,
            timeout_secs: definition.timeout_secs,
            total_wait_secs: definition.total_wait_secs,
        })
    }

    /// Lets `identity` start executions of this workflow.
    pub fn grant_start_execution(
        &self,
        stack: &mut Stack,
        id: &str,
        identity: &Role,
    ) -> Result<PermissionGrant, SynthError> {
        PermissionGrant::new(
            stack,
            id,
            GrantProps {
                identity: identity.reference().clone(),
                actions: vec![START_EXECUTION_ACTION.to_string()],
                target: self.reference.clone(),
            },
        )
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved identifier dependents embed.
    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn total_wait(&self) -> Duration {
        Duration::from_secs(self.total_wait_secs)
    }
}

/// A validated step sequence, ready to be rendered as a state machine definition.
#[derive(Debug, Clone)]
struct WorkflowGraph {
    steps: Vec<(String, u64)>,
    timeout_secs: u64,
    total_wait_secs: u64,
    comment: Option<String>,
}

impl WorkflowGraph {
    fn validate(workflow: &str, props: &WorkflowProps) -> Result<Self, SynthError> {
        let invalid = |message: String| SynthError::InvalidWorkflow {
            workflow: workflow.to_string(),
            message,
        };

        if props.steps.is_empty() {
            return Err(invalid("a workflow needs at least one step".to_string()));
        }

        let mut steps: Vec<(String, u64)> = Vec::with_capacity(props.steps.len());
        for step in &props.steps {
            if step.name.is_empty() || step.name.chars().count() > MAX_STATE_NAME_LEN {
                return Err(invalid(format!(
                    "step name '{}' must be between 1 and {} characters",
                    step.name, MAX_STATE_NAME_LEN
                )));
            }
            if step.name.chars().any(char::is_control) {
                return Err(invalid(format!(
                    "step name '{}' contains control characters",
                    step.name.escape_default()
                )));
            }
            if steps.iter().any(|(name, _)| *name == step.name) {
                return Err(invalid(format!("step name '{}' is used twice", step.name)));
            }
            let seconds = whole_seconds(step.duration).ok_or_else(|| {
                invalid(format!(
                    "wait '{}' must be a positive whole number of seconds",
                    step.name
                ))
            })?;
            steps.push((step.name.clone(), seconds));
        }

        let timeout_secs = whole_seconds(props.timeout).ok_or_else(|| {
            invalid("timeout must be a positive whole number of seconds".to_string())
        })?;
        let total_wait_secs = steps
            .iter()
            .try_fold(0u64, |total, (_, seconds)| total.checked_add(*seconds))
            .ok_or_else(|| invalid("total wait time overflows".to_string()))?;

        if timeout_secs < total_wait_secs {
            return Err(SynthError::TimeoutTooShort {
                workflow: workflow.to_string(),
                timeout_secs,
                total_wait_secs,
            });
        }
        if props.machine_type == StateMachineType::Express && timeout_secs > EXPRESS_MAX_DURATION_SECS {
            return Err(invalid(format!(
                "express workflows cannot time out later than {}s (got {}s)",
                EXPRESS_MAX_DURATION_SECS, timeout_secs
            )));
        }

        Ok(Self {
            steps,
            timeout_secs,
            total_wait_secs,
            comment: props.comment.clone(),
        })
    }

    /// Compact state machine definition JSON, e.g.
    /// `{"StartAt":"task","States":{"task":{"Type":"Wait","Seconds":30,"End":true}},"TimeoutSeconds":40}`.
    fn to_definition_string(&self) -> String {
        let mut states = Map::new();
        for (idx, (name, seconds)) in self.steps.iter().enumerate() {
            let mut state = Map::new();
            state.insert("Type".to_string(), json!("Wait"));
            state.insert("Seconds".to_string(), json!(seconds));
            match self.steps.get(idx + 1) {
                Some((next, _)) => state.insert("Next".to_string(), json!(next)),
                None => state.insert("End".to_string(), json!(true)),
            };
            states.insert(name.clone(), Value::Object(state));
        }

        let mut definition = Map::new();
        if let Some(comment) = &self.comment {
            definition.insert("Comment".to_string(), json!(comment));
        }
        // validate() rejects empty step lists
        definition.insert("StartAt".to_string(), json!(self.steps[0].0));
        definition.insert("States".to_string(), Value::Object(states));
        definition.insert("TimeoutSeconds".to_string(), json!(self.timeout_secs));
        Value::Object(definition).to_string()
    }
}

fn whole_seconds(duration: Duration) -> Option<u64> {
    (duration.subsec_nanos() == 0 && duration.as_secs() > 0).then(|| duration.as_secs())
}
