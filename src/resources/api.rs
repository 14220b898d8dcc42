//! The API Descriptor: a schema-typed query surface with a default authorization mode.

use crate::error::SynthError;
use crate::resources::iam::{Role, RoleProps, ServicePrincipal};
use crate::stack::{Attribute, Declaration, ResourceKind, ResourceRef, Stack};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

const MAX_API_NAME_LEN: usize = 65;
const LOGS_MANAGED_POLICY: &str = "service-role/AWSAppSyncPushToCloudWatchLogs";

/// Where the schema document comes from. Its contents are never parsed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    File(PathBuf),
    Inline(String),
}

impl SchemaSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SchemaSource::File(path.into())
    }

    fn load(&self, api: &str) -> Result<String, SynthError> {
        match self {
            SchemaSource::Inline(definition) => Ok(definition.clone()),
            SchemaSource::File(path) => {
                fs::read_to_string(path).map_err(|e| SynthError::SchemaUnavailable {
                    api: api.to_string(),
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationType {
    /// Requests must be signed by an IAM identity.
    #[default]
    Iam,
    /// Requests carry an API key; a default key is declared with the API.
    ApiKey,
}

impl AuthorizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationType::Iam => "AWS_IAM",
            AuthorizationType::ApiKey => "API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLogLevel {
    None,
    Error,
    #[default]
    All,
}

impl FieldLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldLogLevel::None => "NONE",
            FieldLogLevel::Error => "ERROR",
            FieldLogLevel::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub field_log_level: FieldLogLevel,
    pub exclude_verbose_content: bool,
}

#[derive(Debug, Clone)]
pub struct ApiProps {
    pub name: String,
    pub schema: SchemaSource,
    pub authorization: AuthorizationType,
    /// `None` disables request logging and the logging role.
    pub log_config: Option<LogConfig>,
}

/// A declared GraphQL API with its schema and, when logging is on, its logging role.
#[derive(Debug, Clone)]
pub struct GraphqlApi {
    path: String,
    reference: ResourceRef,
    schema: ResourceRef,
    api_key: Option<ResourceRef>,
    logs_role: Option<Role>,
    name: String,
    authorization: AuthorizationType,
}

impl GraphqlApi {
    pub fn new(stack: &mut Stack, id: &str, props: ApiProps) -> Result<Self, SynthError> {
        let result = Self::declare(stack, id, props);
        stack.record(result)
    }

    fn declare(stack: &mut Stack, id: &str, props: ApiProps) -> Result<Self, SynthError> {
        stack.claim_construct_id(id)?;
        validate_api_name(&props.name)?;
        let definition = props.schema.load(&props.name)?;

        let logs_role = match props.log_config {
            Some(_) => {
                let principal = ServicePrincipal::for_service(stack, "appsync");
                let role_props = RoleProps {
                    managed_policies: vec![LOGS_MANAGED_POLICY.to_string()],
                    ..RoleProps::assumed_by(principal)
                };
                Some(Role::declare_at(stack, &format!("{}/ApiLogsRole", id), role_props)?)
            }
            None => None,
        };

        let mut properties = json!({
            "Name": props.name,
            "AuthenticationType": props.authorization.as_str(),
        });
        if let (Some(log_config), Some(role)) = (props.log_config, &logs_role) {
            properties["LogConfig"] = json!({
                "CloudWatchLogsRoleArn": role.reference().placeholder(Attribute::Arn),
                "FieldLogLevel": log_config.field_log_level.as_str(),
                "ExcludeVerboseContent": log_config.exclude_verbose_content,
            });
        }

        let path = format!("{}/Resource", id);
        let reference = stack.declare(Declaration::new(
            path.clone(),
            ResourceKind::GraphqlApi,
            properties,
        ))?;

        let schema = stack.declare(
            Declaration::new(
                format!("{}/Schema", id),
                ResourceKind::GraphqlSchema,
                json!({ "ApiId": reference.placeholder(Attribute::ApiId) }),
            )
            .with_opaque("Definition", definition),
        )?;

        let api_key = match props.authorization {
            AuthorizationType::ApiKey => Some(stack.declare(Declaration::new(
                format!("{}/DefaultApiKey", id),
                ResourceKind::ApiKey,
                json!({ "ApiId": reference.placeholder(Attribute::ApiId) }),
            ))?),
            AuthorizationType::Iam => None,
        };

        log::info!(
            "Declared API '{}' ({} auth, logging {})",
            props.name,
            props.authorization.as_str(),
            props
                .log_config
                .map(|c| c.field_log_level.as_str())
                .unwrap_or("off")
        );

        Ok(Self {
            path,
            reference,
            schema,
            api_key,
            logs_role,
            name: props.name,
            authorization: props.authorization,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &ResourceRef {
        &self.schema
    }

    pub fn api_key(&self) -> Option<&ResourceRef> {
        self.api_key.as_ref()
    }

    pub fn logs_role(&self) -> Option<&Role> {
        self.logs_role.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authorization(&self) -> AuthorizationType {
        self.authorization
    }

    /// Placeholder for the API id, only known once the API exists.
    pub fn api_id(&self) -> String {
        self.reference.placeholder(Attribute::ApiId)
    }

    /// Placeholder for the public GraphQL endpoint URL.
    pub fn graphql_url(&self) -> String {
        self.reference.placeholder(Attribute::GraphQlUrl)
    }
}

fn validate_api_name(name: &str) -> Result<(), SynthError> {
    let invalid = |message: &str| SynthError::InvalidName {
        kind: "API".to_string(),
        name: name.to_string(),
        message: message.to_string(),
    };
    if name.is_empty() || name.chars().count() > MAX_API_NAME_LEN {
        return Err(invalid("must be between 1 and 65 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ')
    {
        return Err(invalid("may only contain letters, digits, '_', '-' and spaces"));
    }
    Ok(())
}
