#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use weblog_core::config::CsvConfig;
use weblog_log_pipeline::parser::{CsvParser, CsvParserConfig, LogParser};
use weblog_log_pipeline::LogLine;

const COMBINED: &str = r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#;

fuzz_target!(|data: &[u8]| {
    let cfg = CsvConfig {
        format: COMBINED.to_owned(),
        ..CsvConfig::default()
    };
    let Ok(parser_cfg) = CsvParserConfig::weblog(&cfg) else {
        return;
    };
    let Ok(mut parser) = CsvParser::new(parser_cfg, Box::new(Cursor::new(Vec::new()))) else {
        return;
    };

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let mut line = LogLine::new(1.0);
    if parser.parse(data, &mut line).is_ok() {
        let _ = line.verify();
    }
});
