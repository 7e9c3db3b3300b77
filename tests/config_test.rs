use std::collections::HashMap;
use std::time::Duration;

use secrecy::ExposeSecret;
use waitlist::config::Config;

fn load(vars: &[(&str, &str)]) -> waitlist::error::Result<Config> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|name| vars.get(name).cloned())
}

#[test]
fn config_defaults_without_any_variables() {
    let config = load(&[]).unwrap();

    assert!(config.db_path.is_none());
    assert_eq!(config.mobile_prefix, "+971");
    assert!(config.notify_on_seat);
    assert_eq!(config.message_timeout, Duration::from_secs(10));
    assert!(config.twilio.is_none());
    assert!(config.supabase.is_none());
    assert!(config.operator.is_none());
    assert_eq!(config.log_level, "info");
}

#[test]
fn config_reads_full_environment() {
    let config = load(&[
        ("WAITLIST_DB_PATH", "/var/lib/waitlist.db"),
        ("WAITLIST_MOBILE_PREFIX", "+44"),
        ("WAITLIST_NOTIFY_ON_SEAT", "off"),
        ("MESSAGE_TIMEOUT_SECS", "3"),
        ("TWILIO_ACCOUNT_SID", "AC123"),
        ("TWILIO_AUTH_TOKEN", "token"),
        ("TWILIO_PHONE_NUMBER", "+15005550006"),
        ("WAITLIST_OPERATOR_EMAIL", "host@example.com"),
        ("WAITLIST_OPERATOR_PASSWORD", "pw"),
        ("LOG_LEVEL", "debug"),
    ])
    .unwrap();

    assert_eq!(
        config.db_path.as_deref(),
        Some(std::path::Path::new("/var/lib/waitlist.db"))
    );
    assert_eq!(config.mobile_prefix, "+44");
    assert!(!config.notify_on_seat);
    assert_eq!(config.message_timeout, Duration::from_secs(3));

    let twilio = config.twilio.unwrap();
    assert_eq!(twilio.account_sid, "AC123");
    assert_eq!(twilio.auth_token.expose_secret(), "token");

    let operator = config.operator.unwrap();
    assert_eq!(operator.email, "host@example.com");
    assert_eq!(config.log_level, "debug");
}

#[test]
fn config_rejects_partial_twilio_settings() {
    let err = load(&[("TWILIO_ACCOUNT_SID", "AC123")]).unwrap_err();
    assert!(err.to_string().contains("TWILIO_AUTH_TOKEN"));
}

#[test]
fn config_rejects_partial_supabase_settings() {
    assert!(load(&[("SUPABASE_URL", "https://x.supabase.co")]).is_err());
}

#[test]
fn config_treats_blank_values_as_unset() {
    let config = load(&[("TWILIO_ACCOUNT_SID", "  "), ("WAITLIST_DB_PATH", "")]).unwrap();
    assert!(config.twilio.is_none());
    assert!(config.db_path.is_none());
}

#[test]
fn config_rejects_malformed_numbers_and_flags() {
    assert!(load(&[("MESSAGE_TIMEOUT_SECS", "soon")]).is_err());
    assert!(load(&[("WAITLIST_NOTIFY_ON_SEAT", "maybe")]).is_err());
}

#[test]
fn config_rejects_zero_message_timeout() {
    let err = load(&[("MESSAGE_TIMEOUT_SECS", "0")]).unwrap_err();
    assert!(err.to_string().contains("at least 1"));
}

#[test]
fn config_does_not_print_secrets() {
    let config = load(&[
        ("WAITLIST_OPERATOR_EMAIL", "host@example.com"),
        ("WAITLIST_OPERATOR_PASSWORD", "s3cret-value"),
    ])
    .unwrap();
    assert!(!format!("{config:?}").contains("s3cret-value"));
}
