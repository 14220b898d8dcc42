//! # stacksynth - Deterministic Deployment Stack Synthesis
//!
//! **stacksynth** declares a small serverless deployment in Rust and synthesizes it into a
//! provisioning template. The deployment it was built for is a timed workflow that can be
//! started on demand through a single field of a GraphQL API, but the building blocks are
//! general: workflows, identities and grants, an API with its schema, and bindings from API
//! fields to HTTP integrations.
//!
//! ## Core Workflow
//!
//! Resources are declared into a [`stack::Stack`] in dependency order. Every construct
//! validates its inputs when it is created and hands back a typed handle that later
//! constructs use to refer to it. The pipeline is:
//!
//! 1.  **Declare**: Create a `Stack` for an `Environment`, then declare a `StateMachine`,
//!     grant an identity permission to start it, declare a `GraphqlApi`, and bind a query
//!     field to the workflow service with an `HttpIntegration` and a `Resolver`.
//! 2.  **Synthesize**: Use `Synthesizer::builder` to configure a synthesizer for the stack.
//!     It resolves every identifier first, then renders properties and mapping templates.
//! 3.  **Ship**: The resulting `Assembly` holds the template, the provisioning order, any
//!     warnings, and a fingerprint. Write it to disk, or diff it against a previous one.
//!
//! Synthesis is deterministic: the same declarations always produce byte-identical output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stacksynth::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let env = Environment::new("123456789012", "ap-northeast-1")?;
//!     let mut stack = Stack::new("WorkflowTriggerStack", env)?;
//!
//!     // 1. A workflow that waits 30 seconds and times out after 40.
//!     let workflow = StateMachine::new(
//!         &mut stack,
//!         "state_machine",
//!         WorkflowProps::single_wait(Duration::from_secs(30), Duration::from_secs(40)),
//!     )?;
//!
//!     // 2. The identity the API uses to call the workflow service, and its grant.
//!     let principal = ServicePrincipal::for_service(&stack, "appsync");
//!     let role = Role::new(&mut stack, "role", RoleProps::assumed_by(principal))?;
//!     workflow.grant_start_execution(&mut stack, "AuthPolicy", &role)?;
//!
//!     // 3. The API and the binding of `Query.run` to StartExecution.
//!     let api = GraphqlApi::new(&mut stack, "Api", ApiProps {
//!         name: "WorkflowTriggerStackApi".to_string(),
//!         schema: SchemaSource::file("graphql/schema.graphql"),
//!         authorization: AuthorizationType::Iam,
//!         log_config: Some(LogConfig::default()),
//!     })?;
//!     let integration = HttpIntegration::for_workflow_service(&mut stack, &api, "HttpDataSource", &role)?;
//!     Resolver::new(&mut stack, "Resolver", ResolverProps {
//!         api: &api,
//!         integration: &integration,
//!         type_name: "Query".to_string(),
//!         field_name: "run".to_string(),
//!         request: MappingTemplate::start_execution(workflow.reference()),
//!         response: MappingTemplate::passthrough(),
//!     })?;
//!
//!     // 4. Synthesize and write the template.
//!     let assembly = Synthesizer::builder(&stack).build().synth()?;
//!     assembly.write_to_dir("stack.out")?;
//!     println!("{}", assembly.plan);
//!
//!     Ok(())
//! }
//! ```
//!
//! The same deployment, driven by a TOML file, is available as [`app::build_trigger_stack`].

pub mod app;
pub mod assembly;
pub mod config;
pub mod diff;
pub mod error;
pub mod plan;
pub mod prelude;
pub mod resources;
pub mod stack;
pub mod synth;
pub mod template;
