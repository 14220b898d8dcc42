use thiserror::Error;

/// Errors that can occur while declaring constructs or synthesizing a stack.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("Construct id '{id}' is invalid: {message}")]
    InvalidConstructId { id: String, message: String },

    #[error("A construct with id '{id}' already exists in scope '{scope}'")]
    DuplicateConstructId { id: String, scope: String },

    #[error(
        "Resource '{missing_id}' is not declared in this stack, but is referenced by '{referenced_by}'"
    )]
    UnresolvedReference {
        missing_id: String,
        referenced_by: String,
    },

    #[error("Resource '{logical_id}' is a {found}, but '{referenced_by}' expects a {expected}")]
    ReferenceKindMismatch {
        logical_id: String,
        referenced_by: String,
        expected: String,
        found: String,
    },

    #[error(
        "Workflow '{workflow}' has a timeout of {timeout_secs}s, shorter than its {total_wait_secs}s of scheduled waits"
    )]
    TimeoutTooShort {
        workflow: String,
        timeout_secs: u64,
        total_wait_secs: u64,
    },

    #[error("Workflow '{workflow}' is invalid: {message}")]
    InvalidWorkflow { workflow: String, message: String },

    #[error("Permission grant '{grant}' is invalid: {message}")]
    InvalidPermission { grant: String, message: String },

    #[error("{kind} name '{name}' is invalid: {message}")]
    InvalidName {
        kind: String,
        name: String,
        message: String,
    },

    #[error("Template for '{owner}' is malformed at '{placeholder}': {message}")]
    MalformedTemplate {
        owner: String,
        placeholder: String,
        message: String,
    },

    #[error("Schema for API '{api}' could not be loaded from '{path}': {message}")]
    SchemaUnavailable {
        api: String,
        path: String,
        message: String,
    },

    #[error("Resolver '{resolver}' is inert: {message}")]
    InertBinding { resolver: String, message: String },

    #[error("Resources form a dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Stack '{stack}' cannot be synthesized after a failed construction: {cause}")]
    StackPoisoned { stack: String, cause: String },

    #[error("Deployment environment is invalid: {0}")]
    InvalidEnvironment(String),
}

/// Errors that can occur while saving or loading a synthesized assembly.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding failed: {0}")]
    Encode(String),

    #[error("Binary decoding failed: {0}")]
    Decode(String),
}

/// Errors that can occur while loading the deployment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config value '{field}' is invalid: {message}")]
    InvalidValue { field: String, message: String },
}
