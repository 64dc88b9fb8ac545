#![no_main]

use libfuzzer_sys::fuzz_target;
use mugs_scan::Scanner;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(report) = Scanner::default().scan_source(source) {
        assert!(report.findings.len() <= report.total_sites);
    }
});
