//! Common test utilities for building stacks and configs.
use stacksynth::prelude::*;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

#[allow(dead_code)]
pub const ACCOUNT: &str = "123456789012";
#[allow(dead_code)]
pub const REGION: &str = "ap-northeast-1";

/// The schema of the reference deployment.
#[allow(dead_code)]
pub const SCHEMA: &str = "schema {\n  query: Query\n}\n\ntype Query {\n  run: AWSJSON\n}\n";

#[allow(dead_code)]
pub fn test_env() -> Environment {
    Environment::new(ACCOUNT, REGION).expect("test environment is valid")
}

#[allow(dead_code)]
pub fn empty_stack() -> Stack {
    Stack::new("TestStack", test_env()).expect("stack name is valid")
}

/// Writes `SCHEMA` to a temporary file that lives as long as the handle.
#[allow(dead_code)]
pub fn schema_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create schema file");
    file.write_all(SCHEMA.as_bytes())
        .expect("Failed to write schema file");
    file
}

/// The default configuration, pointed at an explicit schema file.
#[allow(dead_code)]
pub fn reference_config(schema_path: &Path) -> Config {
    let mut config = Config::default();
    config.api.schema_path = schema_path.to_path_buf();
    config
}

#[allow(dead_code)]
pub fn declare_workflow(
    stack: &mut Stack,
    wait_secs: u64,
    timeout_secs: u64,
) -> std::result::Result<StateMachine, SynthError> {
    StateMachine::new(
        stack,
        "state_machine",
        WorkflowProps::single_wait(
            Duration::from_secs(wait_secs),
            Duration::from_secs(timeout_secs),
        ),
    )
}

#[allow(dead_code)]
pub fn declare_invoker(stack: &mut Stack) -> Role {
    let principal = ServicePrincipal::for_service(stack, "appsync");
    Role::new(stack, "role", RoleProps::assumed_by(principal)).expect("Failed to declare role")
}

#[allow(dead_code)]
pub fn declare_api(stack: &mut Stack) -> GraphqlApi {
    GraphqlApi::new(
        stack,
        "Api",
        ApiProps {
            name: "TestStackApi".to_string(),
            schema: SchemaSource::Inline(SCHEMA.to_string()),
            authorization: AuthorizationType::Iam,
            log_config: Some(LogConfig::default()),
        },
    )
    .expect("Failed to declare API")
}

/// Binds `Query.run` to StartExecution of `workflow` through `invoker`.
#[allow(dead_code)]
pub fn bind_run(
    stack: &mut Stack,
    api: &GraphqlApi,
    invoker: &Role,
    workflow: &StateMachine,
) -> std::result::Result<Resolver, SynthError> {
    let integration = HttpIntegration::for_workflow_service(stack, api, "HttpDataSource", invoker)?;
    Resolver::new(
        stack,
        "Resolver",
        ResolverProps {
            api,
            integration: &integration,
            type_name: "Query".to_string(),
            field_name: "run".to_string(),
            request: MappingTemplate::start_execution(workflow.reference()),
            response: MappingTemplate::passthrough(),
        },
    )
}

/// The logical id of the resource declared at `path`.
#[allow(dead_code)]
pub fn logical_id_at(assembly: &Assembly, path: &str) -> String {
    assembly
        .plan
        .steps
        .iter()
        .find(|step| step.path == path)
        .map(|step| step.logical_id.clone())
        .unwrap_or_else(|| panic!("no resource at '{}'", path))
}
