#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use weblog_core::config::JsonConfig;
use weblog_log_pipeline::parser::{JsonParser, LogParser};
use weblog_log_pipeline::LogLine;

fuzz_target!(|data: &[u8]| {
    let mut parser = JsonParser::new(
        &JsonConfig::default(),
        &[],
        Box::new(Cursor::new(Vec::new())),
    );

    let mut line = LogLine::new(1.0);
    if parser.parse(data, &mut line).is_ok() {
        let _ = line.verify();
    }
});
