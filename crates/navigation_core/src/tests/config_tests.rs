use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let owned: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| owned.get(name).cloned()
}

#[test]
fn defaults_tick_every_seven_seconds() {
    let settings = Settings::default();
    assert_eq!(settings.tick_interval(), Duration::from_millis(7_000));
    assert!(settings.narration_enabled);
    assert_eq!(settings.narration_language, "en-US");
}

#[test]
fn normalizes_bare_host_to_http_url() {
    assert_eq!(
        normalize_oracle_url("localhost:3400/"),
        "http://localhost:3400"
    );
    assert_eq!(
        normalize_oracle_url("https://oracle.example.com//"),
        "https://oracle.example.com"
    );
    assert_eq!(normalize_oracle_url("   "), DEFAULT_ORACLE_URL);
}

#[test]
fn endpoint_joins_base_and_route_path() {
    let settings = Settings {
        oracle_url: "http://127.0.0.1:9000/".into(),
        oracle_route_path: "/api/optimize".into(),
        ..Settings::default()
    };
    assert_eq!(
        settings.oracle_endpoint().expect("endpoint").as_str(),
        "http://127.0.0.1:9000/api/optimize"
    );
}

#[test]
fn file_overrides_accept_strings_and_numbers() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
oracle_url = "oracle.local:8080"
tick_interval_ms = 2500
narration_enabled = false
speech_command = "espeak-ng"
"#,
    );

    assert_eq!(settings.oracle_url, "http://oracle.local:8080");
    assert_eq!(settings.tick_interval_ms, 2_500);
    assert!(!settings.narration_enabled);
    assert_eq!(settings.speech_command, "espeak-ng");
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "this is = = not toml");
    assert_eq!(settings, Settings::default());
}

#[test]
fn invalid_values_keep_previous_setting() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[
            ("NAV_TICK_INTERVAL_MS", "0"),
            ("NAV_ORACLE_TIMEOUT_MS", "soon"),
            ("NAV_NARRATION_ENABLED", "maybe"),
        ]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_nav_prefix() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[
            ("NAV_TICK_INTERVAL_MS", "1000"),
            ("APP__TICK_INTERVAL_MS", "2000"),
            ("NAV_NARRATION_LANGUAGE", "de-DE"),
        ]),
    );
    assert_eq!(settings.tick_interval_ms, 2_000);
    assert_eq!(settings.narration_language, "de-DE");
}

#[test]
fn loads_settings_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("navigator_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("navigator.toml");
    fs::write(&path, "oracle_route_path = \"/flows/optimize\"\n").expect("write");

    let settings = load_settings_from(&path);
    assert_eq!(settings.oracle_route_path, "/flows/optimize");

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let settings = load_settings_from(Path::new("/definitely/not/here/navigator.toml"));
    assert_eq!(settings.oracle_route_path, "/optimize-route");
}
