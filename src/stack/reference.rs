use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of resource a stack can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Role,
    Policy,
    StateMachine,
    GraphqlApi,
    GraphqlSchema,
    ApiKey,
    DataSource,
    Resolver,
}

impl ResourceKind {
    /// The provisioning engine's type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Role => "AWS::IAM::Role",
            ResourceKind::Policy => "AWS::IAM::Policy",
            ResourceKind::StateMachine => "AWS::StepFunctions::StateMachine",
            ResourceKind::GraphqlApi => "AWS::AppSync::GraphQLApi",
            ResourceKind::GraphqlSchema => "AWS::AppSync::GraphQLSchema",
            ResourceKind::ApiKey => "AWS::AppSync::ApiKey",
            ResourceKind::DataSource => "AWS::AppSync::DataSource",
            ResourceKind::Resolver => "AWS::AppSync::Resolver",
        }
    }

    /// Attributes that only exist once the engine has created the resource.
    pub(crate) fn deferred_attributes(&self) -> &'static [Attribute] {
        match self {
            ResourceKind::GraphqlApi => &[Attribute::ApiId, Attribute::GraphQlUrl, Attribute::Arn],
            ResourceKind::DataSource => &[Attribute::Arn],
            ResourceKind::ApiKey => &[Attribute::ApiKey, Attribute::Arn],
            ResourceKind::Resolver => &[Attribute::Arn],
            _ => &[],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A named attribute of a resource that other resources may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    /// The engine's primary reference (`Ref`).
    Ref,
    Arn,
    Name,
    ApiId,
    GraphQlUrl,
    ApiKey,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Ref => "Ref",
            Attribute::Arn => "Arn",
            Attribute::Name => "Name",
            Attribute::ApiId => "ApiId",
            Attribute::GraphQlUrl => "GraphQLUrl",
            Attribute::ApiKey => "ApiKey",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Ref" => Some(Attribute::Ref),
            "Arn" => Some(Attribute::Arn),
            "Name" => Some(Attribute::Name),
            "ApiId" => Some(Attribute::ApiId),
            "GraphQLUrl" => Some(Attribute::GraphQlUrl),
            "ApiKey" => Some(Attribute::ApiKey),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable handle to a declared resource.
///
/// Handles are produced by the constructs that declare resources. A handle
/// can also be rebuilt from a logical id, in which case the owning stack
/// checks at use that the resource really exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    logical_id: String,
    kind: ResourceKind,
}

impl ResourceRef {
    pub(crate) fn new(logical_id: String, kind: ResourceKind) -> Self {
        Self { logical_id, kind }
    }

    pub fn from_logical_id(kind: ResourceKind, logical_id: &str) -> Self {
        Self::new(logical_id.to_string(), kind)
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// A placeholder for one of this resource's attributes, resolved during synthesis.
    pub fn placeholder(&self, attribute: Attribute) -> String {
        format!("${{ref:{}.{}}}", self.logical_id, attribute)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.logical_id, self.kind)
    }
}
