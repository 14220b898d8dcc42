//! Prelude module for convenient imports
//!
//! This module re-exports the types needed to declare and synthesize a stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use stacksynth::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = Config::resolve(None)?;
//! let stack = build_trigger_stack(&config)?;
//! let assembly = Synthesizer::builder(&stack).strict_bindings(true).build().synth()?;
//!
//! for warning in assembly.warnings() {
//!     println!("warning: {}", warning.message);
//! }
//! # Ok(())
//! # }
//! ```

// Declaring
pub use crate::resources::{
    ApiProps, AuthorizationType, FieldLogLevel, GrantProps, GraphqlApi, HttpIntegration,
    HttpIntegrationProps, LogConfig, PermissionGrant, Resolver, ResolverProps, Role, RoleProps,
    SchemaSource, ServicePrincipal, StateMachine, StateMachineType, WaitStep, WorkflowProps,
};
pub use crate::stack::{Attribute, Environment, ResourceKind, ResourceRef, Stack};
pub use crate::template::MappingTemplate;

// Synthesizing
pub use crate::app::build_trigger_stack;
pub use crate::assembly::Assembly;
pub use crate::config::Config;
pub use crate::diff::ChangeSet;
pub use crate::plan::ProvisioningPlan;
pub use crate::synth::Synthesizer;

// Error types
pub use crate::error::{ArtifactError, ConfigError, SynthError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
