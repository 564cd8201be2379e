//! 통합 테스트 -- 라인 소스부터 스냅샷까지의 전체 흐름 검증

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use weblog_core::config::{CustomFieldConfig, PatternConfig};
use weblog_core::logger::Logger;
use weblog_core::pipeline::{HealthStatus, Pipeline};
use weblog_log_pipeline::{
    JobSnapshot, LineSource, LogPipelineBuilder, PipelineConfig, PipelineConfigBuilder, Snapshot,
    WebLog,
};

const COMBINED: &str = r#"$remote_addr - - [$time_local] "$request" $status $body_bytes_sent"#;

fn source(text: &str) -> LineSource {
    Box::new(Cursor::new(text.as_bytes().to_vec()))
}

/// 한 번의 수집 주기로 전체 입력을 처리하고 스냅샷을 반환합니다.
fn collect_once(config: &PipelineConfig, text: &str) -> Snapshot {
    let mut weblog = WebLog::new(config, source(text), Arc::new(Logger::new("test"))).unwrap();
    let tick = weblog
        .collect(
            Instant::now() + Duration::from_secs(30),
            &CancellationToken::new(),
        )
        .unwrap()
        .unwrap();
    assert!(tick.exhausted);
    tick.snapshot
}

fn combined() -> PipelineConfig {
    PipelineConfigBuilder::new().csv_format(COMBINED).build().unwrap()
}

#[test]
fn combined_format_single_get() {
    let snap = collect_once(
        &combined(),
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET /api HTTP/1.1\" 200 1234\n",
    );

    assert_eq!(snap["requests"], 1);
    assert_eq!(snap["resp_2xx"], 1);
    assert_eq!(snap["resp_code_200"], 1);
    assert_eq!(snap["req_success"], 1);
    assert_eq!(snap["bytes_sent"], 1234);
    assert_eq!(snap["req_method_GET"], 1);
    assert_eq!(snap["req_version_1.1"], 1);
    assert_eq!(snap["req_ipv4"], 1);
    assert_eq!(snap["uniq_ipv4"], 1);
    assert_eq!(snap["req_unmatched"], 0);
}

#[test]
fn missing_status_is_unmatched() {
    let snap = collect_once(
        &combined(),
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET /api HTTP/1.1\" - 1234\n",
    );
    assert_eq!(snap["req_unmatched"], 1);
    assert_eq!(snap["requests"], 0);
}

#[test]
fn dash_client_addr_is_unmatched() {
    let snap = collect_once(
        &combined(),
        "- - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 200 1\n",
    );
    assert_eq!(snap["req_unmatched"], 1);
    assert_eq!(snap["requests"], 0);
}

#[test]
fn dash_protocol_in_request_is_unmatched() {
    let snap = collect_once(
        &combined(),
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET / -\" 200 1\n",
    );
    assert_eq!(snap["req_unmatched"], 1);
    assert_eq!(snap["requests"], 0);
}

#[test]
fn dash_size_counts_as_zero_bytes() {
    let snap = collect_once(
        &combined(),
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 404 -\n",
    );
    assert_eq!(snap["resp_4xx"], 1);
    assert_eq!(snap["req_bad"], 1);
    assert_eq!(snap["bytes_sent"], 0);
}

#[test]
fn upstream_time_list_uses_first_entry() {
    let config = PipelineConfigBuilder::new()
        .csv_format(format!("{COMBINED} \"$upstream_response_time\""))
        .time_scale(1.0)
        .build()
        .unwrap();
    let snap = collect_once(
        &config,
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 200 1 \"0.034, 0.055\"\n",
    );
    assert_eq!(snap["upstream_resp_time_count"], 1);
    assert_eq!(snap["upstream_resp_time_min"], 34);
    assert_eq!(snap["upstream_resp_time_max"], 34);
}

#[test]
fn url_pattern_hit_updates_pattern_stats() {
    let config = PipelineConfigBuilder::new()
        .csv_format(COMBINED)
        .url_pattern("api", "~ ^/api/")
        .url_pattern("static", "* *.css")
        .build()
        .unwrap();
    let snap = collect_once(
        &config,
        "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET /api/v1/x HTTP/1.1\" 201 77\n",
    );
    assert_eq!(snap["req_url_ptn_api"], 1);
    assert_eq!(snap["req_url_ptn_static"], 0);
    assert_eq!(snap["url_ptn_api_resp_code_201"], 1);
    assert_eq!(snap["url_ptn_api_bytes_sent"], 77);
    assert!(!snap.contains_key("url_ptn_static_resp_code_201"));
}

#[test]
fn status_classes_for_client_and_server_errors() {
    let text = concat!(
        "10.0.0.1 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 401 1\n",
        "10.0.0.1 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 499 1\n",
        "10.0.0.2 - - [10/Oct/2000:13:55:36 -0700] \"POST / HTTP/2.0\" 503 1\n",
        "10.0.0.2 - - [10/Oct/2000:13:55:36 -0700] \"HEAD / HTTP/1.0\" 304 0\n",
    );
    let snap = collect_once(&combined(), text);
    assert_eq!(snap["requests"], 4);
    assert_eq!(snap["req_bad"], 2);
    assert_eq!(snap["req_error"], 1);
    assert_eq!(snap["req_redirect"], 1);
    assert_eq!(snap["resp_4xx"], 2);
    assert_eq!(snap["req_method_POST"], 1);
    assert_eq!(snap["req_version_2.0"], 1);
    assert_eq!(snap["uniq_ipv4"], 2);
}

#[test]
fn custom_field_patterns_from_regex_parser() {
    let config = PipelineConfigBuilder::new()
        .regex_pattern(r#"^(?P<remote_addr>\S+) (?P<status>\d+) "(?P<ua>[^"]*)"$"#)
        .custom_field(CustomFieldConfig {
            name: "ua".to_owned(),
            patterns: vec![
                PatternConfig {
                    name: "curl".to_owned(),
                    matcher: "= ^curl/".to_owned(),
                },
                PatternConfig {
                    name: "bot".to_owned(),
                    matcher: "* *bot*".to_owned(),
                },
            ],
        })
        .build()
        .unwrap();
    let text = concat!(
        "10.0.0.1 200 \"curl/8.0\"\n",
        "10.0.0.2 200 \"Googlebot/2.1\"\n",
        "10.0.0.3 200 \"Mozilla/5.0\"\n",
    );
    let snap = collect_once(&config, text);
    assert_eq!(snap["requests"], 3);
    assert_eq!(snap["custom_field_ua_curl"], 1);
    assert_eq!(snap["custom_field_ua_bot"], 1);
}

#[test]
fn auto_detects_json_lines() {
    let config = PipelineConfig::default();
    let text = concat!(
        r#"{"remote_addr":"::1","status":"200","request_method":"GET","body_bytes_sent":"10"}"#,
        "\n",
        r#"{"remote_addr":"::1","status":"500","request_method":"GET","body_bytes_sent":"5"}"#,
        "\n",
    );
    let snap = collect_once(&config, text);
    assert_eq!(snap["requests"], 2);
    assert_eq!(snap["req_ipv6"], 2);
    assert_eq!(snap["uniq_ipv6"], 1);
    assert_eq!(snap["bytes_sent"], 15);
    assert_eq!(snap["req_error"], 1);
}

async fn next_snapshot(rx: &mut mpsc::Receiver<JobSnapshot>) -> JobSnapshot {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("snapshot timed out")
        .expect("channel closed")
}

#[tokio::test]
async fn pipeline_reads_log_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for status in [200, 200, 404] {
        writeln!(
            file,
            "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET /index.html HTTP/1.1\" {status} 100"
        )
        .unwrap();
    }
    file.flush().unwrap();

    let config = PipelineConfigBuilder::new()
        .name("nginx")
        .path(file.path().display().to_string())
        .csv_format(COMBINED)
        .build()
        .unwrap();
    let (mut pipeline, rx) = LogPipelineBuilder::new().config(config).build().unwrap();
    let mut rx = rx.unwrap();

    pipeline.start().await.unwrap();
    let msg = next_snapshot(&mut rx).await;
    assert_eq!(msg.job, "nginx");
    assert_eq!(msg.snapshot["requests"], 3);
    assert_eq!(msg.snapshot["resp_code_200"], 2);
    assert_eq!(msg.snapshot["resp_code_404"], 1);
    assert_eq!(msg.snapshot["bytes_sent"], 300);

    pipeline.stop().await.unwrap();
    assert_eq!(
        pipeline.health_check().await,
        HealthStatus::Unhealthy("stopped".to_owned())
    );
}

#[tokio::test]
async fn pipelines_share_snapshot_channel() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut pipelines = Vec::new();
    for name in ["a", "b"] {
        let config = PipelineConfigBuilder::new()
            .name(name)
            .csv_format(COMBINED)
            .build()
            .unwrap();
        let (pipeline, none) = LogPipelineBuilder::new()
            .config(config)
            .source(source(
                "1.2.3.4 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 200 1\n",
            ))
            .snapshot_sender(tx.clone())
            .build()
            .unwrap();
        assert!(none.is_none());
        pipelines.push(pipeline);
    }

    for pipeline in &mut pipelines {
        pipeline.start().await.unwrap();
    }

    let mut jobs = vec![next_snapshot(&mut rx).await.job, next_snapshot(&mut rx).await.job];
    jobs.sort();
    assert_eq!(jobs, ["a", "b"]);

    for pipeline in &mut pipelines {
        pipeline.stop().await.unwrap();
    }
}

#[tokio::test]
async fn restart_reopens_configured_path() {
    let config = PipelineConfigBuilder::new()
        .path("/nonexistent/weblog/access.log")
        .csv_format(COMBINED)
        .build()
        .unwrap();
    let (mut pipeline, rx) = LogPipelineBuilder::new()
        .config(config)
        .source(source(""))
        .build()
        .unwrap();
    let mut rx = rx.unwrap();

    pipeline.start().await.unwrap();
    let msg = next_snapshot(&mut rx).await;
    assert_eq!(msg.snapshot["requests"], 0);
    pipeline.stop().await.unwrap();

    // 주입된 소스는 이미 소비되었으므로 재시작은 설정 경로를 엽니다.
    assert!(pipeline.start().await.is_err());
    assert_eq!(pipeline.state_name(), "stopped");
}
