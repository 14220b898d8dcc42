//! Identities and the permission grants attached to them.

use crate::error::SynthError;
use crate::stack::{Attribute, Declaration, ResourceKind, ResourceRef, Stack};
use serde_json::{Value, json};

const POLICY_DOCUMENT_VERSION: &str = "2012-10-17";
const MAX_ROLE_NAME_LEN: usize = 64;

/// A service that may assume a role, e.g. `appsync.amazonaws.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    pub fn new(principal: &str) -> Self {
        Self(principal.to_string())
    }

    pub fn for_service(stack: &Stack, service: &str) -> Self {
        Self(stack.environment().service_principal(service))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An `Allow` statement. Statements granting access are never negated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    pub fn to_json(&self) -> Value {
        json!({
            "Effect": "Allow",
            "Action": single_or_list(&self.actions),
            "Resource": single_or_list(&self.resources),
        })
    }
}

fn single_or_list(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()),
    }
}

#[derive(Debug, Clone)]
pub struct RoleProps {
    pub assumed_by: ServicePrincipal,
    pub description: Option<String>,
    /// AWS managed policy names, e.g. `service-role/AWSAppSyncPushToCloudWatchLogs`.
    pub managed_policies: Vec<String>,
}

impl RoleProps {
    pub fn assumed_by(principal: ServicePrincipal) -> Self {
        Self {
            assumed_by: principal,
            description: None,
            managed_policies: Vec::new(),
        }
    }
}

/// A named role. Its ARN is known during the build.
#[derive(Debug, Clone)]
pub struct Role {
    path: String,
    reference: ResourceRef,
    name: String,
    arn: String,
}

impl Role {
    pub fn new(stack: &mut Stack, id: &str, props: RoleProps) -> Result<Self, SynthError> {
        let result = stack
            .claim_construct_id(id)
            .and_then(|_| Self::declare_at(stack, &format!("{}/Resource", id), props));
        stack.record(result)
    }

    /// Declares a role owned by another construct at the given construct path.
    pub(crate) fn declare_at(stack: &mut Stack, path: &str, props: RoleProps) -> Result<Self, SynthError> {
        let name = stack.physical_name(path, MAX_ROLE_NAME_LEN);
        let arn = stack
            .environment()
            .arn("iam", "", &format!("role/{}", name));
        let partition = stack.environment().partition();

        let mut properties = json!({
            "RoleName": name,
            "AssumeRolePolicyDocument": {
                "Version": POLICY_DOCUMENT_VERSION,
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": props.assumed_by.as_str() },
                    "Action": "sts:AssumeRole",
                }]
            },
        });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        if !props.managed_policies.is_empty() {
            properties["ManagedPolicyArns"] = props
                .managed_policies
                .iter()
                .map(|policy| format!("arn:{}:iam::aws:policy/{}", partition, policy))
                .collect();
        }

        let declaration = Declaration::new(path.to_string(), ResourceKind::Role, properties)
            .with_literal(Attribute::Arn, arn.clone())
            .with_literal(Attribute::Name, name.clone())
            .with_literal(Attribute::Ref, name.clone());
        let reference = stack.declare(declaration)?;
        Ok(Self {
            path: path.to_string(),
            reference,
            name,
            arn,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }
}

#[derive(Debug, Clone)]
pub struct GrantProps {
    /// The role receiving the permissions.
    pub identity: ResourceRef,
    pub actions: Vec<String>,
    /// The resource the actions may be performed on.
    pub target: ResourceRef,
}

/// An authorization edge from an identity to actions on one resource,
/// emitted as an inline policy attached to the identity.
///
/// The grant only records the relationship; both the identity and the
/// target stay owned by the constructs that declared them.
#[derive(Debug, Clone)]
pub struct PermissionGrant {
    path: String,
    reference: ResourceRef,
    identity: ResourceRef,
    target: ResourceRef,
    actions: Vec<String>,
}

impl PermissionGrant {
    pub fn new(stack: &mut Stack, id: &str, props: GrantProps) -> Result<Self, SynthError> {
        let result = Self::declare(stack, id, props);
        stack.record(result)
    }

    fn declare(stack: &mut Stack, id: &str, props: GrantProps) -> Result<Self, SynthError> {
        stack.claim_construct_id(id)?;
        let path = format!("{}/Resource", id);
        let actions = normalize_actions(id, &props.actions)?;

        stack.resolve(&props.identity, &path)?;
        if props.identity.kind() != ResourceKind::Role {
            return Err(SynthError::InvalidPermission {
                grant: id.to_string(),
                message: format!("identity '{}' is not a role", props.identity),
            });
        }
        let target = stack.resolve(&props.target, &path)?;
        if target.literal(Attribute::Arn).is_none()
            && !target.kind.deferred_attributes().contains(&Attribute::Arn)
        {
            return Err(SynthError::InvalidPermission {
                grant: id.to_string(),
                message: format!("target '{}' has no ARN to grant access to", props.target),
            });
        }

        let statement = PolicyStatement {
            actions: actions.clone(),
            resources: vec![props.target.placeholder(Attribute::Arn)],
        };
        let properties = json!({
            "PolicyName": crate::stack::identity::logical_id(&path),
            "PolicyDocument": {
                "Version": POLICY_DOCUMENT_VERSION,
                "Statement": [statement.to_json()],
            },
            "Roles": [props.identity.placeholder(Attribute::Ref)],
        });
        let reference = stack.declare(Declaration::new(
            path.clone(),
            ResourceKind::Policy,
            properties,
        ))?;

        stack.grant(
            &props.identity,
            &actions,
            &[props.target.logical_id().to_string()],
        );
        log::info!(
            "Granted [{}] on '{}' to '{}'",
            actions.join(", "),
            props.target.logical_id(),
            props.identity.logical_id()
        );

        Ok(Self {
            path,
            reference,
            identity: props.identity,
            target: props.target,
            actions,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn identity(&self) -> &ResourceRef {
        &self.identity
    }

    pub fn target(&self) -> &ResourceRef {
        &self.target
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }
}

/// Checks `service:Action` syntax and drops duplicates, keeping first-seen order.
fn normalize_actions(grant: &str, actions: &[String]) -> Result<Vec<String>, SynthError> {
    let invalid = |message: String| SynthError::InvalidPermission {
        grant: grant.to_string(),
        message,
    };
    if actions.is_empty() {
        return Err(invalid("at least one action is required".to_string()));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(actions.len());
    for action in actions {
        let well_formed = match action.split_once(':') {
            Some((service, name)) => {
                !service.is_empty()
                    && service
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                    && !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '*')
            }
            None => false,
        };
        if !well_formed {
            return Err(invalid(format!(
                "action '{}' is not of the form 'service:Action'",
                action
            )));
        }
        if !normalized.contains(action) {
            normalized.push(action.clone());
        }
    }
    Ok(normalized)
}
