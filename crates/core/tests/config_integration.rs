//! weblog.toml 통합 설정 테스트
//!
//! - weblog.toml.example 파싱 테스트
//! - 부분 설정 / 작업 섹션 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use weblog_core::config::WeblogConfig;
use weblog_core::error::{ConfigError, WeblogError};

const EXAMPLE: &str = include_str!("../../../weblog.toml.example");

// =============================================================================
// weblog.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_passes_validation() {
    let config = WeblogConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let from_file = WeblogConfig::parse(EXAMPLE).expect("should parse");
    let from_code = WeblogConfig::default();

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);
    assert_eq!(from_file.general.msg_limit, from_code.general.msg_limit);
    assert_eq!(
        from_file.general.msg_reset_every_secs,
        from_code.general.msg_reset_every_secs
    );

    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.listen_addr, from_code.metrics.listen_addr);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);
    assert_eq!(from_file.metrics.endpoint, from_code.metrics.endpoint);
}

#[test]
fn example_config_has_expected_jobs() {
    let config = WeblogConfig::parse(EXAMPLE).expect("should parse");
    let names: Vec<&str> = config.jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, ["nginx", "apache", "edge"]);

    let nginx = &config.jobs[0];
    assert_eq!(nginx.parser.log_type, "csv");
    assert_eq!(nginx.url_patterns.len(), 3);
    assert_eq!(nginx.url_patterns[0].matcher, "~ ^/api/");
    assert!(nginx.histogram.windows(2).all(|w| w[0] < w[1]));

    let apache = &config.jobs[1];
    assert_eq!(apache.parser.log_type, "auto");
    assert!(apache.group_resp_codes);

    let edge = &config.jobs[2];
    assert_eq!(
        edge.parser.json_config.mapping.get("http.status").map(String::as_str),
        Some("resp_status")
    );
    assert_eq!(edge.custom_fields[0].name, "user_agent");
    assert_eq!(edge.custom_fields[0].patterns.len(), 2);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = WeblogConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    // 나머지 섹션은 기본값
    assert!(config.metrics.enabled);
    assert!(config.jobs.is_empty());
}

#[test]
fn partial_job_uses_job_defaults() {
    let toml = r#"
[[jobs]]
name = "nginx"
path = "/var/log/nginx/access.log"
"#;
    let config = WeblogConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    let job = &config.jobs[0];
    assert_eq!(job.update_every_secs, 1);
    assert_eq!(job.parser.log_type, "auto");
    assert_eq!(job.parser.csv_config.delimiter, " ");
    assert_eq!(job.parser.ltsv_config.field_delimiter, "\t");
    assert!(job.histogram.is_empty());
    assert!(job.time_scale.is_none());
    assert!(!job.group_resp_codes);
}

#[test]
fn job_without_name_fails_validation() {
    let toml = r#"
[[jobs]]
path = "/var/log/nginx/access.log"
"#;
    let config = WeblogConfig::parse(toml).expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("jobs[0].name"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("WEBLOG_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe {
        std::env::set_var("WEBLOG_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = WeblogConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("WEBLOG_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("WEBLOG_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("WEBLOG_METRICS_ENABLED").ok();
    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe {
        std::env::set_var("WEBLOG_METRICS_ENABLED", "false");
    }

    let mut config = WeblogConfig::parse(EXAMPLE).expect("should parse");
    config.apply_env_overrides();
    let enabled = config.metrics.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("WEBLOG_METRICS_ENABLED", val),
            None => std::env::remove_var("WEBLOG_METRICS_ENABLED"),
        }
    }

    assert!(!enabled);
}

#[test]
#[serial_test::serial]
fn env_override_does_not_touch_jobs() {
    let mut config = WeblogConfig::parse(EXAMPLE).expect("should parse");
    let before = config.jobs.clone();
    config.apply_env_overrides();
    assert_eq!(config.jobs.len(), before.len());
    assert_eq!(config.jobs[0].path, before[0].path);
}

// =============================================================================
// 빈 파일 / 잘못된 형식
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = WeblogConfig::parse("").expect("empty string should parse");
    config.validate().expect("should validate");
    assert_eq!(config.general.log_level, "info");
    assert!(config.jobs.is_empty());
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = WeblogConfig::parse("[invalid toml");
    assert!(matches!(
        result.unwrap_err(),
        WeblogError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[[jobs]]
name = "nginx"
path = "/var/log/nginx/access.log"
update_every_secs = "one"
"#;
    assert!(matches!(
        WeblogConfig::parse(toml).unwrap_err(),
        WeblogError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn load_missing_file_is_file_not_found() {
    let err = WeblogConfig::load("/nonexistent/weblog.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WeblogError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("weblog.toml");
    std::fs::write(&path, EXAMPLE).expect("write config");

    let config = WeblogConfig::from_file(&path).await.expect("should load");
    assert_eq!(config.jobs.len(), 3);
}
