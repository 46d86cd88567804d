use std::collections::HashMap;
use std::time::Duration;

use assert_matches::assert_matches;

use mett_dataportal::config::{
    ClientConfig, ConfigLayer, ConfigLoader, ConfigOverrides, DEFAULT_BASE_URL,
};
use mett_dataportal::error::{ErrorKind, PortalError};

fn env(pairs: &[(&str, &str)]) -> ConfigLayer {
    let vars = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    ConfigLayer::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[test]
fn defaults_without_any_layer() {
    let config = ConfigLoader::resolve_layers(None, ConfigLayer::default(), ConfigOverrides::default());
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert!(config.verify_ssl);
    assert_eq!(config.bearer_token(), None);
    assert!(config.user_agent.starts_with("mett-dataportal-rs/"));
}

#[test]
fn file_then_env_then_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"base_url": "https://file.example.org/", "api_key": "file-key", "timeout": 10, "verify_ssl": false}"#,
    )
    .unwrap();

    let file = ConfigLoader::read_file(&path).unwrap();
    let env = env(&[("METT_BASE_URL", "https://env.example.org"), ("METT_TIMEOUT", "20")]);
    let overrides = ConfigOverrides {
        timeout: Some(45),
        ..ConfigOverrides::default()
    };

    let config = ConfigLoader::resolve_layers(Some(file), env, overrides);
    assert_eq!(config.base_url, "https://env.example.org");
    assert_eq!(config.api_key.as_deref(), Some("file-key"));
    assert_eq!(config.timeout_secs, 45);
    assert!(!config.verify_ssl);
}

#[test]
fn trailing_slashes_and_empty_credentials() {
    let file = ConfigLayer {
        base_url: Some("https://api.example.org///".to_string()),
        api_key: Some("  ".to_string()),
        ..ConfigLayer::default()
    };
    let config = ConfigLoader::resolve_layers(Some(file), ConfigLayer::default(), ConfigOverrides::default());
    assert_eq!(config.base_url, "https://api.example.org");
    assert_eq!(config.api_key, None);
}

#[test]
fn jwt_wins_over_api_key_across_layers() {
    let file = ConfigLayer {
        api_key: Some("file-key".to_string()),
        ..ConfigLayer::default()
    };
    let env = env(&[("METT_JWT", "env-jwt")]);
    let config = ConfigLoader::resolve_layers(Some(file), env, ConfigOverrides::default());
    assert_eq!(config.bearer_token(), Some("env-jwt"));
}

#[test]
fn jwt_alias_in_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"jwt": "file-jwt"}"#).unwrap();
    let layer = ConfigLoader::read_file(&path).unwrap();
    assert_eq!(layer.jwt_token.as_deref(), Some("file-jwt"));
}

#[test]
fn invalid_env_values_are_config_errors() {
    let err = ConfigLayer::from_lookup(|key| (key == "METT_TIMEOUT").then(|| "soon".to_string()))
        .unwrap_err();
    assert_matches!(err, PortalError::InvalidConfigValue { ref key, .. } if key == "METT_TIMEOUT");
    assert_eq!(err.kind(), ErrorKind::Config);

    let err =
        ConfigLayer::from_lookup(|key| (key == "METT_VERIFY_SSL").then(|| "maybe".to_string()))
            .unwrap_err();
    assert_matches!(err, PortalError::InvalidConfigValue { .. });
}

#[test]
fn missing_and_malformed_files() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(Some(&missing), ConfigOverrides::default()),
        Err(PortalError::ConfigRead(_))
    );

    let broken = temp.path().join("broken.json");
    std::fs::write(&broken, "base_url = 'toml?'").unwrap();
    assert_matches!(
        ConfigLoader::read_file(&broken),
        Err(PortalError::ConfigParse(_))
    );
}
