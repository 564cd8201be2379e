#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weblog_log_pipeline::Matcher;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 매처 표현식 (`~ re`, `* glob`, `= str`, `&&`, `||`, `!`)
    expr: String,
    /// 매칭 대상
    subject: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    if input.expr.len() > 256 {
        return;
    }
    if let Ok(m) = Matcher::parse(&input.expr) {
        let _ = m.matches(&input.subject);
    }
});
