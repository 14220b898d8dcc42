//! The workflow trigger deployment: a timed workflow that can be started
//! through one query field of a GraphQL API.

use crate::assembly::Assembly;
use crate::config::Config;
use crate::error::SynthError;
use crate::resources::{
    ApiProps, GraphqlApi, HttpIntegration, LogConfig, Resolver, ResolverProps, Role, RoleProps,
    SchemaSource, ServicePrincipal, StateMachine, WorkflowProps,
};
use crate::stack::{Attribute, Environment, Stack};
use crate::synth::Synthesizer;
use crate::template::MappingTemplate;
use std::time::Duration;

pub const WORKFLOW_ID: &str = "state_machine";
pub const INVOKER_ROLE_ID: &str = "role";
pub const GRANT_ID: &str = "AuthPolicy";
pub const API_ID: &str = "Api";
pub const RESOLVER_ID: &str = "Resolver";

/// Declares the whole deployment into a fresh stack.
///
/// Order matters: each construct resolves the handles it depends on, so
/// the workflow comes first, then its grant, then the API and its binding.
pub fn build_trigger_stack(config: &Config) -> Result<Stack, SynthError> {
    let env = Environment::new(&config.stack.account, &config.stack.region)?;
    let mut stack = Stack::new(&config.stack.name, env)?;
    if let Some(description) = &config.stack.description {
        stack = stack.with_description(description);
    }

    let workflow = StateMachine::new(
        &mut stack,
        WORKFLOW_ID,
        WorkflowProps {
            machine_type: config.workflow.machine_type,
            ..WorkflowProps::single_wait(
                Duration::from_secs(config.workflow.wait_seconds),
                Duration::from_secs(config.workflow.timeout_seconds),
            )
        },
    )?;

    let principal = ServicePrincipal::for_service(&stack, "appsync");
    let invoker = Role::new(&mut stack, INVOKER_ROLE_ID, RoleProps::assumed_by(principal))?;
    workflow.grant_start_execution(&mut stack, GRANT_ID, &invoker)?;

    let api = GraphqlApi::new(
        &mut stack,
        API_ID,
        ApiProps {
            name: config.api_name(),
            schema: SchemaSource::file(&config.api.schema_path),
            authorization: config.api.authorization,
            log_config: Some(LogConfig {
                field_log_level: config.api.field_log_level,
                exclude_verbose_content: false,
            }),
        },
    )?;

    let integration = HttpIntegration::for_workflow_service(
        &mut stack,
        &api,
        &config.binding.data_source_name,
        &invoker,
    )?;

    Resolver::new(
        &mut stack,
        RESOLVER_ID,
        ResolverProps {
            api: &api,
            integration: &integration,
            type_name: config.binding.type_name.clone(),
            field_name: config.binding.field_name.clone(),
            request: MappingTemplate::start_execution(workflow.reference()),
            response: MappingTemplate::passthrough(),
        },
    )?;

    stack.add_output("GraphQLUrl", "GraphQL endpoint of the trigger API", api.graphql_url())?;
    stack.add_output(
        "StateMachineArn",
        "ARN of the triggered workflow",
        workflow.reference().placeholder(Attribute::Arn),
    )?;

    Ok(stack)
}

/// Builds and synthesizes the deployment in one step.
pub fn synthesize(config: &Config, strict_bindings: bool) -> Result<Assembly, SynthError> {
    let stack = build_trigger_stack(config)?;
    Synthesizer::builder(&stack)
        .strict_bindings(strict_bindings)
        .build()
        .synth()
}
