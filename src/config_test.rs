use std::env;
use std::io::Write;
use std::time::Duration;

use serial_test::serial;
use tempfile::NamedTempFile;

use crate::config::{
    Config, ConfigError, REST_URL_VAR, SYNC_URL_VAR, TOKEN_VAR, resolve_token, validate_token,
};
use crate::todoist::rest::DEFAULT_REST_URL;
use crate::todoist::sync::DEFAULT_SYNC_URL;

const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";

fn clear_env() {
    unsafe {
        env::remove_var(TOKEN_VAR);
        env::remove_var(REST_URL_VAR);
        env::remove_var(SYNC_URL_VAR);
    }
}

#[test]
#[serial]
fn test_from_env_reads_token_and_defaults() {
    clear_env();
    unsafe {
        env::set_var(TOKEN_VAR, TOKEN);
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.api_token, TOKEN);
    assert_eq!(config.rest_url, DEFAULT_REST_URL);
    assert_eq!(config.sync_url, DEFAULT_SYNC_URL);
    assert_eq!(config.tool_deadline, Duration::from_secs(30));
    assert_eq!(config.rate_capacity, 450);

    clear_env();
}

#[test]
#[serial]
fn test_missing_token_points_at_integrations_page() {
    clear_env();

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::MissingToken));
    assert!(
        err.to_string()
            .contains("https://todoist.com/prefs/integrations")
    );
}

#[test]
#[serial]
fn test_url_overrides_from_env() {
    clear_env();
    unsafe {
        env::set_var(TOKEN_VAR, TOKEN);
        env::set_var(REST_URL_VAR, "http://localhost:9000/rest");
        env::set_var(SYNC_URL_VAR, "http://localhost:9000/sync");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.rest_url, "http://localhost:9000/rest");
    assert_eq!(config.sync_url, "http://localhost:9000/sync");

    clear_env();
}

#[test]
#[serial]
fn test_builder_overrides_env() {
    clear_env();
    unsafe {
        env::set_var(TOKEN_VAR, TOKEN);
        env::set_var(REST_URL_VAR, "http://env/rest");
    }

    let config = Config::from_env()
        .unwrap()
        .with_rest_url("http://cli/rest")
        .with_sync_url("http://cli/sync");
    assert_eq!(config.rest_url, "http://cli/rest", "CLI flag should override env var");
    assert_eq!(config.sync_url, "http://cli/sync");

    clear_env();
}

#[test]
#[serial]
fn test_token_loaded_from_file() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "  {TOKEN}  ").unwrap();
    unsafe {
        env::set_var(TOKEN_VAR, format!("file://{}", file.path().display()));
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.api_token, TOKEN);

    clear_env();
}

#[test]
fn test_empty_token_file_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    let err = resolve_token(&format!("file://{}", file.path().display())).unwrap_err();
    assert!(matches!(err, ConfigError::TokenFileEmpty { .. }));
}

#[test]
fn test_missing_token_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");
    let err = resolve_token(&format!("file://{}", path.display())).unwrap_err();
    assert!(matches!(err, ConfigError::TokenFileUnreadable { .. }));
    assert!(err.to_string().contains("absent"));
}

#[test]
fn test_plain_token_is_not_a_path() {
    assert_eq!(resolve_token(TOKEN).unwrap(), TOKEN);
}

#[test]
fn test_token_length_bounds() {
    assert!(matches!(
        validate_token(&"a".repeat(19)),
        Err(ConfigError::TokenTooShort(19))
    ));
    assert!(validate_token(&"a".repeat(20)).is_ok());
    assert!(validate_token(&"a".repeat(200)).is_ok());
    assert!(matches!(
        validate_token(&"a".repeat(201)),
        Err(ConfigError::TokenTooLong(201))
    ));
}

#[test]
fn test_token_character_rules() {
    assert!(matches!(
        validate_token("0123456789 abcdef0123456789"),
        Err(ConfigError::TokenWhitespace)
    ));
    assert!(matches!(
        validate_token("0123456789\tabcdef0123456789"),
        Err(ConfigError::TokenWhitespace)
    ));
    assert!(matches!(
        validate_token("0123456789\u{1}abcdef0123456789"),
        Err(ConfigError::TokenControlCharacters)
    ));
    assert!(matches!(
        validate_token("0123456789\u{7f}abcdef0123456789"),
        Err(ConfigError::TokenControlCharacters)
    ));
}

#[test]
fn test_debug_redacts_token() {
    let debug = format!("{:?}", Config::new(TOKEN));
    assert!(!debug.contains(TOKEN));
    assert!(debug.contains("<redacted>"));
}
