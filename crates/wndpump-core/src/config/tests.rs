use super::*;

#[test]
fn default_config_has_expected_values() {
    let mut config = Config::default();
    config.validate();

    assert_eq!(config.window.class_name, "WndPumpWindow");
    assert_eq!(config.window.width, 300);
    assert_eq!(config.window.height, 200);
    assert_eq!(config.window.registration, RegistrationPolicy::Reuse);
    assert!(!config.logging.enabled);
}

#[test]
fn template_parses_to_defaults() {
    let config = parse(&template::generate_config()).expect("template should parse");

    assert_eq!(config.window, WindowConfig::default());
    assert_eq!(config.logging, crate::log::LogConfig::default());
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let config = parse("[window]\ntitle = \"demo\"\n").expect("parse");

    assert_eq!(config.window.title, "demo");
    assert_eq!(config.window.class_name, "WndPumpWindow");
    assert_eq!(config.logging.max_file_mb, 10);
}

#[test]
fn strict_registration_policy_parses() {
    let config = parse("[window]\nregistration = \"strict\"\n").expect("parse");

    assert_eq!(config.window.registration, RegistrationPolicy::Strict);
}

#[test]
fn validate_clamps_dimensions_and_restores_class_name() {
    let mut config = Config {
        window: WindowConfig {
            class_name: "   ".into(),
            width: -5,
            height: 1_000_000,
            ..Default::default()
        },
        ..Default::default()
    };
    config.validate();

    assert_eq!(config.window.class_name, "WndPumpWindow");
    assert_eq!(config.window.width, 0);
    assert_eq!(config.window.height, 16_384);
}

#[test]
fn invalid_toml_is_a_config_error() {
    let result = parse("[window\n");

    assert!(matches!(result, Err(crate::PumpError::Config(_))));
}

#[test]
fn oversized_log_threshold_is_clamped() {
    let config = parse("[logging]\nmax_file_mb = 9223372036854775807\nbackups = 400\n")
        .expect("parse");

    assert_eq!(config.logging.max_file_mb, crate::log::MAX_FILE_MB);
    assert_eq!(config.logging.max_bytes(), 1024 * 1024 * 1024);
    assert_eq!(config.logging.backups, crate::log::MAX_BACKUPS);
}

#[test]
fn unknown_log_level_is_a_config_error() {
    let result = parse("[logging]\nlevel = \"verbose\"\n");

    assert!(matches!(result, Err(crate::PumpError::Config(_))));
}
