//! Synthesis tests: resolution, ordering and the build-time checks.
mod common;
use common::*;
use serde_json::{Value, json};
use stacksynth::prelude::*;
use std::time::Duration;

#[cfg(test)]
mod synth_tests {
    use super::*;

    #[test]
    fn test_thirty_second_wait_under_forty_second_timeout() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).expect("30s wait fits a 40s timeout");

        let assembly = Synthesizer::builder(&stack)
            .build()
            .synth()
            .expect("Failed to synthesize");
        let resource = assembly
            .resource(workflow.reference().logical_id())
            .unwrap()
            .expect("state machine is in the template");

        assert_eq!(resource["Type"], "AWS::StepFunctions::StateMachine");
        assert_eq!(
            resource["Properties"]["DefinitionString"],
            r#"{"StartAt":"task","States":{"task":{"Type":"Wait","Seconds":30,"End":true}},"TimeoutSeconds":40}"#
        );
        assert_eq!(resource["Properties"]["StateMachineName"], workflow.name());
        assert_eq!(resource["Properties"]["RoleArn"], workflow.role().arn());
        assert_eq!(workflow.timeout().as_secs(), 40);
        assert_eq!(workflow.total_wait().as_secs(), 30);
    }

    #[test]
    fn test_wait_longer_than_timeout_is_rejected() {
        let mut stack = empty_stack();
        let err = declare_workflow(&mut stack, 50, 40).unwrap_err();
        assert_eq!(
            err,
            SynthError::TimeoutTooShort {
                workflow: "state_machine".to_string(),
                timeout_secs: 40,
                total_wait_secs: 50,
            }
        );

        // The failure poisons the stack, so nothing can be synthesized from it.
        let synth_err = Synthesizer::builder(&stack).build().synth().unwrap_err();
        assert!(matches!(synth_err, SynthError::StackPoisoned { .. }));
    }

    #[test]
    fn test_wait_equal_to_timeout_is_accepted() {
        let mut stack = empty_stack();
        assert!(declare_workflow(&mut stack, 40, 40).is_ok());
    }

    #[test]
    fn test_grant_targets_the_resolved_workflow_arn() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let invoker = declare_invoker(&mut stack);
        let grant = workflow
            .grant_start_execution(&mut stack, "AuthPolicy", &invoker)
            .expect("Failed to grant");

        let expected_arn = format!(
            "arn:aws:states:{}:{}:stateMachine:{}",
            REGION,
            ACCOUNT,
            workflow.name()
        );
        assert_eq!(workflow.arn(), expected_arn);

        let assembly = Synthesizer::builder(&stack).build().synth().unwrap();
        let policy = assembly
            .resource(grant.reference().logical_id())
            .unwrap()
            .expect("policy is in the template");

        assert_eq!(policy["Type"], "AWS::IAM::Policy");
        let statement = &policy["Properties"]["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Action"], "states:StartExecution");
        assert_eq!(statement["Resource"], Value::String(expected_arn));
        assert_eq!(policy["Properties"]["Roles"], json!([invoker.name()]));

        assert!(stack.permissions().allows(
            invoker.reference().logical_id(),
            "states:StartExecution",
            workflow.reference().logical_id()
        ));
    }

    #[test]
    fn test_grant_before_the_workflow_exists_fails() {
        let mut stack = empty_stack();
        let invoker = declare_invoker(&mut stack);
        let not_yet_declared = ResourceRef::from_logical_id(ResourceKind::StateMachine, "statemachine0000ABCD");

        let err = PermissionGrant::new(
            &mut stack,
            "AuthPolicy",
            GrantProps {
                identity: invoker.reference().clone(),
                actions: vec!["states:StartExecution".to_string()],
                target: not_yet_declared,
            },
        )
        .unwrap_err();

        match err {
            SynthError::UnresolvedReference {
                missing_id,
                referenced_by,
            } => {
                assert_eq!(missing_id, "statemachine0000ABCD");
                assert_eq!(referenced_by, "AuthPolicy/Resource");
            }
            other => panic!("expected an unresolved reference, got {:?}", other),
        }
        assert!(stack.poisoned().is_some());
    }

    #[test]
    fn test_request_template_embeds_the_literal_arn() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let invoker = declare_invoker(&mut stack);
        workflow
            .grant_start_execution(&mut stack, "AuthPolicy", &invoker)
            .unwrap();
        let api = declare_api(&mut stack);
        let resolver = bind_run(&mut stack, &api, &invoker, &workflow).expect("Failed to bind");
        assert!(resolver.is_authorized());

        let assembly = Synthesizer::builder(&stack)
            .strict_bindings(true)
            .build()
            .synth()
            .expect("an authorized binding passes strict synthesis");
        assert!(!assembly.template.contains("${ref:"));

        let resource = assembly
            .resource(resolver.reference().logical_id())
            .unwrap()
            .unwrap();
        let request = resource["Properties"]["RequestMappingTemplate"]
            .as_str()
            .expect("request template is a string");
        let request: Value = serde_json::from_str(request).expect("request template is JSON");
        assert_eq!(request["version"], "2018-05-29");
        assert_eq!(request["method"], "POST");
        assert_eq!(request["resourcePath"], "/");
        assert_eq!(
            request["params"]["headers"]["x-amz-target"],
            "AWSStepFunctions.StartExecution"
        );
        assert_eq!(request["params"]["body"]["stateMachineArn"], workflow.arn());
        assert_eq!(
            resource["Properties"]["ResponseMappingTemplate"],
            "$util.toJson($ctx.result)"
        );
        assert_eq!(resource["Properties"]["DataSourceName"], "HttpDataSource");
        assert_eq!(
            resource["Properties"]["ApiId"],
            json!({ "Fn::GetAtt": [api.reference().logical_id(), "ApiId"] })
        );
    }

    #[test]
    fn test_binding_without_grant_is_flagged() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let invoker = declare_invoker(&mut stack);
        let api = declare_api(&mut stack);
        let resolver = bind_run(&mut stack, &api, &invoker, &workflow)
            .expect("a missing grant is not a construction error");
        assert!(!resolver.is_authorized());

        let assembly = Synthesizer::builder(&stack).build().synth().unwrap();
        let warnings: Vec<_> = assembly.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, "Resolver/Resource");
        assert!(warnings[0].message.contains("states:StartExecution"));

        let strict = Synthesizer::builder(&stack)
            .strict_bindings(true)
            .build()
            .synth()
            .unwrap_err();
        assert!(matches!(strict, SynthError::InertBinding { .. }));
    }

    #[test]
    fn test_deferred_attribute_in_mapping_template_is_malformed() {
        let mut stack = empty_stack();
        let api = declare_api(&mut stack);
        let invoker = declare_invoker(&mut stack);
        let integration =
            HttpIntegration::for_workflow_service(&mut stack, &api, "HttpDataSource", &invoker).unwrap();

        let err = Resolver::new(
            &mut stack,
            "Resolver",
            ResolverProps {
                api: &api,
                integration: &integration,
                type_name: "Query".to_string(),
                field_name: "run".to_string(),
                request: MappingTemplate::from_string(format!("{{\"api\": \"{}\"}}", api.api_id())),
                response: MappingTemplate::passthrough(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_outputs_resolve_to_literals_or_intrinsics() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let api = declare_api(&mut stack);
        stack
            .add_output("GraphQLUrl", "endpoint", api.graphql_url())
            .unwrap();
        stack
            .add_output(
                "StateMachineArn",
                "workflow",
                workflow.reference().placeholder(Attribute::Arn),
            )
            .unwrap();
        stack
            .add_output(
                "Console",
                "mixed",
                format!("url={}", api.graphql_url()),
            )
            .unwrap();

        let template = Synthesizer::builder(&stack)
            .build()
            .synth()
            .unwrap()
            .template_value()
            .unwrap();
        let outputs = &template["Outputs"];
        assert_eq!(
            outputs["GraphQLUrl"]["Value"],
            json!({ "Fn::GetAtt": [api.reference().logical_id(), "GraphQLUrl"] })
        );
        assert_eq!(outputs["StateMachineArn"]["Value"], workflow.arn());
        assert_eq!(
            outputs["Console"]["Value"],
            json!({ "Fn::Join": ["", ["url=", { "Fn::GetAtt": [api.reference().logical_id(), "GraphQLUrl"] }]] })
        );
    }

    #[test]
    fn test_output_referencing_an_unknown_resource_fails() {
        let mut stack = empty_stack();
        declare_workflow(&mut stack, 30, 40).unwrap();
        stack
            .add_output("Ghost", "missing", "${ref:ghost12345678.Arn}".to_string())
            .unwrap();
        let err = Synthesizer::builder(&stack).build().synth().unwrap_err();
        assert!(matches!(
            err,
            SynthError::UnresolvedReference { ref missing_id, .. } if missing_id == "ghost12345678"
        ));
    }

    #[test]
    fn test_duplicate_construct_ids_are_rejected() {
        let mut stack = empty_stack();
        declare_workflow(&mut stack, 30, 40).unwrap();
        let err = declare_workflow(&mut stack, 30, 40).unwrap_err();
        assert!(matches!(err, SynthError::DuplicateConstructId { .. }));
    }

    #[test]
    fn test_plan_orders_dependencies_first() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let invoker = declare_invoker(&mut stack);
        let grant = workflow
            .grant_start_execution(&mut stack, "AuthPolicy", &invoker)
            .unwrap();
        let api = declare_api(&mut stack);
        let resolver = bind_run(&mut stack, &api, &invoker, &workflow).unwrap();

        let assembly = Synthesizer::builder(&stack).build().synth().unwrap();
        let plan = &assembly.plan;
        let at = |id: &str| plan.position(id).expect("resource is planned");

        assert_eq!(plan.len(), stack.declarations().len());
        assert!(at(workflow.role().reference().logical_id()) < at(workflow.reference().logical_id()));
        assert!(at(workflow.reference().logical_id()) < at(grant.reference().logical_id()));
        assert!(at(invoker.reference().logical_id()) < at(grant.reference().logical_id()));
        assert!(at(api.schema().logical_id()) < at(resolver.reference().logical_id()));
        assert!(at(api.reference().logical_id()) < at(resolver.reference().logical_id()));
    }

    #[test]
    fn test_schema_text_is_copied_verbatim() {
        let mut stack = empty_stack();
        let workflow = declare_workflow(&mut stack, 30, 40).unwrap();
        let arn_placeholder = workflow.reference().placeholder(Attribute::Arn);
        let definition = format!(
            "# template form: ${{ref:see docs\n# literal {}\ntype Query {{ run: AWSJSON }}\n",
            arn_placeholder
        );
        let api = GraphqlApi::new(
            &mut stack,
            "Api",
            ApiProps {
                name: "TestStackApi".to_string(),
                schema: SchemaSource::Inline(definition.clone()),
                authorization: AuthorizationType::Iam,
                log_config: None,
            },
        )
        .unwrap();

        let assembly = Synthesizer::builder(&stack)
            .build()
            .synth()
            .expect("schema text is never interpolated");
        let schema = assembly
            .resource(api.schema().logical_id())
            .unwrap()
            .unwrap();
        assert_eq!(schema["Properties"]["Definition"], Value::String(definition));
        assert_eq!(
            schema["Properties"]["ApiId"],
            json!({ "Fn::GetAtt": [api.reference().logical_id(), "ApiId"] })
        );
        // the schema does not make the API wait for the workflow
        let at = assembly.plan.position(api.schema().logical_id()).unwrap();
        assert_eq!(
            assembly.plan.steps[at].depends_on,
            vec![api.reference().logical_id().to_string()]
        );
    }

    #[test]
    fn test_workflow_comment_is_copied_verbatim() {
        let mut stack = empty_stack();
        let props = WorkflowProps {
            comment: Some("see ${ref:docs".to_string()),
            ..WorkflowProps::single_wait(Duration::from_secs(30), Duration::from_secs(40))
        };
        let workflow = StateMachine::new(&mut stack, "state_machine", props).unwrap();

        let assembly = Synthesizer::builder(&stack).build().synth().unwrap();
        let resource = assembly
            .resource(workflow.reference().logical_id())
            .unwrap()
            .unwrap();
        let definition: Value =
            serde_json::from_str(resource["Properties"]["DefinitionString"].as_str().unwrap()).unwrap();
        assert_eq!(definition["Comment"], "see ${ref:docs");
    }

    #[test]
    fn test_api_without_logging_has_no_logs_role() {
        let mut stack = empty_stack();
        let api = GraphqlApi::new(
            &mut stack,
            "Api",
            ApiProps {
                name: "TestStackApi".to_string(),
                schema: SchemaSource::Inline(SCHEMA.to_string()),
                authorization: AuthorizationType::Iam,
                log_config: None,
            },
        )
        .unwrap();
        assert!(api.logs_role().is_none());
        assert!(api.api_key().is_none());

        let assembly = Synthesizer::builder(&stack).build().synth().unwrap();
        assert_eq!(assembly.plan.len(), 2);
        assert!(assembly.plan.steps.iter().all(|step| step.path != "Api/ApiLogsRole"));
        let resource = assembly
            .resource(api.reference().logical_id())
            .unwrap()
            .unwrap();
        assert!(resource["Properties"].get("LogConfig").is_none());
    }

    #[test]
    fn test_plain_http_endpoint_is_rejected() {
        let mut stack = empty_stack();
        let api = declare_api(&mut stack);
        let invoker = declare_invoker(&mut stack);

        let err = HttpIntegration::new(
            &mut stack,
            &api,
            "HttpDataSource",
            HttpIntegrationProps {
                name: "HttpDataSource".to_string(),
                endpoint: "http://states.ap-northeast-1.amazonaws.com/".to_string(),
                signing_region: REGION.to_string(),
                signing_service: "states".to_string(),
                service_role: invoker.reference().clone(),
            },
        )
        .unwrap_err();

        match err {
            SynthError::InvalidName { kind, name, .. } => {
                assert_eq!(kind, "Endpoint");
                assert_eq!(name, "http://states.ap-northeast-1.amazonaws.com/");
            }
            other => panic!("expected an invalid endpoint, got {:?}", other),
        }
        assert!(stack.poisoned().is_some());
    }
}
