//! Loading deployment configuration from disk.
use stacksynth::prelude::*;
use std::fs;

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_relative_schema_path_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("stacksynth.toml");
        fs::write(
            &config_path,
            r#"
[stack]
name = "Triggers"
region = "us-east-1"

[workflow]
wait_seconds = 5
timeout_seconds = 10
type = "express"

[api]
schema_path = "schema/api.graphql"
authorization = "iam"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(config.stack.name, "Triggers");
        assert_eq!(config.stack.region, "us-east-1");
        assert_eq!(config.workflow.machine_type, StateMachineType::Express);
        assert_eq!(config.api.authorization, AuthorizationType::Iam);
        assert_eq!(config.api.schema_path, dir.path().join("schema/api.graphql"));
        assert_eq!(config.api_name(), "TriggersApi");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::resolve(Some(missing.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[workflow\nwait_seconds = 3").unwrap();
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_zero_timeout_is_an_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        fs::write(&path, "[workflow]\ntimeout_seconds = 0\n").unwrap();
        match Config::load(&path).unwrap_err() {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "workflow.timeout_seconds"),
            other => panic!("expected an invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let config = Config::load(format!("{}/stacksynth.toml", manifest_dir)).unwrap();
        let mut expected = Config::default();
        expected.api.schema_path = std::path::Path::new(manifest_dir).join("graphql/schema.graphql");
        assert_eq!(config, expected);
        assert!(config.api.schema_path.exists());
    }
}
