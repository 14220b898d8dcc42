//! The Endpoint Binding: an HTTP integration signed for the workflow service,
//! and the resolver that maps one query field onto it.

use crate::error::SynthError;
use crate::resources::api::GraphqlApi;
use crate::resources::iam::Role;
use crate::stack::{AnnotationLevel, Attribute, Declaration, ResourceKind, ResourceRef, Stack};
use crate::template::{MappingTemplate, malformed};
use serde_json::json;

pub const WORKFLOW_SERVICE: &str = "states";

#[derive(Debug, Clone)]
pub struct HttpIntegrationProps {
    /// Data source name, unique within the API.
    pub name: String,
    pub endpoint: String,
    pub signing_region: String,
    pub signing_service: String,
    /// The identity the API platform assumes when calling the endpoint.
    pub service_role: ResourceRef,
}

/// An HTTP data source whose requests are IAM-signed.
#[derive(Debug, Clone)]
pub struct HttpIntegration {
    path: String,
    reference: ResourceRef,
    name: String,
    endpoint: String,
    service_role: ResourceRef,
}

impl HttpIntegration {
    pub fn new(
        stack: &mut Stack,
        api: &GraphqlApi,
        id: &str,
        props: HttpIntegrationProps,
    ) -> Result<Self, SynthError> {
        let result = Self::declare(stack, api, id, props);
        stack.record(result)
    }

    /// An integration pointed at the regional workflow control endpoint,
    /// signed for the workflow service in the stack's region.
    pub fn for_workflow_service(
        stack: &mut Stack,
        api: &GraphqlApi,
        id: &str,
        service_role: &Role,
    ) -> Result<Self, SynthError> {
        let env = stack.environment();
        let props = HttpIntegrationProps {
            name: id.to_string(),
            endpoint: env.service_endpoint(WORKFLOW_SERVICE),
            signing_region: env.region().to_string(),
            signing_service: WORKFLOW_SERVICE.to_string(),
            service_role: service_role.reference().clone(),
        };
        Self::new(stack, api, id, props)
    }

    fn declare(
        stack: &mut Stack,
        api: &GraphqlApi,
        id: &str,
        props: HttpIntegrationProps,
    ) -> Result<Self, SynthError> {
        stack.claim_construct_id(id)?;
        let path = format!("{}/Resource", id);
        validate_graphql_name("Data source", &props.name)?;
        if !props.endpoint.starts_with("https://") {
            return Err(SynthError::InvalidName {
                kind: "Endpoint".to_string(),
                name: props.endpoint.clone(),
                message: "HTTP integrations must use https".to_string(),
            });
        }
        stack.resolve(api.reference(), &path)?;
        stack.resolve(&props.service_role, &path)?;

        let properties = json!({
            "ApiId": api.api_id(),
            "Name": props.name,
            "Type": "HTTP",
            "HttpConfig": {
                "Endpoint": props.endpoint,
                "AuthorizationConfig": {
                    "AuthorizationType": "AWS_IAM",
                    "AwsIamConfig": {
                        "SigningRegion": props.signing_region,
                        "SigningServiceName": props.signing_service,
                    }
                }
            },
            "ServiceRoleArn": props.service_role.placeholder(Attribute::Arn),
        });
        let declaration = Declaration::new(path.clone(), ResourceKind::DataSource, properties)
            .with_literal(Attribute::Name, props.name.clone());
        let reference = stack.declare(declaration)?;

        Ok(Self {
            path,
            reference,
            name: props.name,
            endpoint: props.endpoint,
            service_role: props.service_role,
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

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn service_role(&self) -> &ResourceRef {
        &self.service_role
    }
}

#[derive(Debug, Clone)]
pub struct ResolverProps<'a> {
    pub api: &'a GraphqlApi,
    pub integration: &'a HttpIntegration,
    pub type_name: String,
    pub field_name: String,
    pub request: MappingTemplate,
    pub response: MappingTemplate,
}

/// Registers one API field against an integration.
#[derive(Debug, Clone)]
pub struct Resolver {
    path: String,
    reference: ResourceRef,
    type_name: String,
    field_name: String,
    authorized: bool,
}

impl Resolver {
    pub fn new(stack: &mut Stack, id: &str, props: ResolverProps<'_>) -> Result<Self, SynthError> {
        let result = Self::declare(stack, id, props);
        stack.record(result)
    }

    fn declare(stack: &mut Stack, id: &str, props: ResolverProps<'_>) -> Result<Self, SynthError> {
        stack.claim_construct_id(id)?;
        let path = format!("{}/Resource", id);
        validate_graphql_name("Type", &props.type_name)?;
        validate_graphql_name("Field", &props.field_name)?;
        stack.resolve(props.api.reference(), &path)?;
        stack.resolve(props.integration.reference(), &path)?;

        // Every placeholder must name a resource that already exists and
        // exposes the attribute as a literal.
        for template in [&props.request, &props.response] {
            let placeholders = template.placeholders().map_err(|e| malformed(&path, e))?;
            for placeholder in placeholders {
                let target = stack.lookup(&placeholder.logical_id).ok_or_else(|| {
                    SynthError::UnresolvedReference {
                        missing_id: placeholder.logical_id.clone(),
                        referenced_by: path.clone(),
                    }
                })?;
                if target.literal(placeholder.attribute).is_none() {
                    return Err(SynthError::MalformedTemplate {
                        owner: path.clone(),
                        placeholder: placeholder.raw.clone(),
                        message: format!(
                            "'{}' of '{}' is only known after provisioning",
                            placeholder.attribute, placeholder.logical_id
                        ),
                    });
                }
            }
        }

        let authorized = match props.request.invocation() {
            Some(invocation) => {
                stack.resolve(&invocation.target, &path)?;
                let identity = props.integration.service_role().logical_id();
                let allowed = stack.permissions().allows(
                    identity,
                    &invocation.action,
                    invocation.target.logical_id(),
                );
                if !allowed {
                    stack.annotate(
                        &path,
                        AnnotationLevel::Warning,
                        format!(
                            "integration identity '{}' is not granted '{}' on '{}'; requests to {}.{} will be rejected",
                            identity,
                            invocation.action,
                            invocation.target.logical_id(),
                            props.type_name,
                            props.field_name
                        ),
                    );
                }
                allowed
            }
            None => true,
        };

        let properties = json!({
            "ApiId": props.api.api_id(),
            "TypeName": props.type_name,
            "FieldName": props.field_name,
            "DataSourceName": props.integration.reference().placeholder(Attribute::Name),
            "Kind": "UNIT",
        });
        let declaration = Declaration::new(path.clone(), ResourceKind::Resolver, properties)
            .with_template("RequestMappingTemplate", props.request)
            .with_template("ResponseMappingTemplate", props.response)
            .with_dependency(props.api.schema());
        let reference = stack.declare(declaration)?;

        log::info!(
            "Bound {}.{} to integration '{}'",
            props.type_name,
            props.field_name,
            props.integration.name()
        );

        Ok(Self {
            path,
            reference,
            type_name: props.type_name,
            field_name: props.field_name,
            authorized,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// False when the integration identity lacks the permission the request
    /// template invokes; the binding is then inert at runtime.
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }
}

/// GraphQL names: `[_A-Za-z][_0-9A-Za-z]*`.
fn validate_graphql_name(kind: &str, name: &str) -> Result<(), SynthError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first == '_' || first.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SynthError::InvalidName {
            kind: kind.to_string(),
            name: name.to_string(),
            message: "must match [_A-Za-z][_0-9A-Za-z]*".to_string(),
        })
    }
}
