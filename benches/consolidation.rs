//! Benchmarks for the exact consolidation path.
//!
//! Measures parsing a synthetic session log, deduplicating it against an
//! existing fix repository and regenerating the document.

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_possible_truncation)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use errfix::parser::{parse_fix_repo, parse_session_log};
use errfix::rendering::generate_fix_repo_markdown;
use errfix::services::deduplication::dedupe_exact;
use errfix::services::merger::merge_fixes;
use std::fmt::Write;
use std::hint::black_box;
use std::time::Duration;

const ERROR_TYPES: &[&str] = &[
    "FileNotFoundError",
    "KeyError",
    "TypeError",
    "ModuleNotFoundError",
    "ConnectionError",
];

/// Builds a log of `blocks` error blocks over `blocks / 4` distinct errors.
fn synthetic_log(blocks: usize) -> String {
    let distinct = (blocks / 4).max(1);
    let mut log = String::from("# Errors and Fixes Log\n\n");
    for i in 0..blocks {
        let id = i % distinct;
        let error_type = ERROR_TYPES[id % ERROR_TYPES.len()];
        let _ = write!(
            log,
            "### Error: {error_type}: failure {id}\n\
             **Timestamp:** 2025-01-{day:02}T10:30:00Z\n\
             **File:** `src/module_{id}.py`\n\
             **Success Count:** {count}\n\n\
             **Fix Applied:**\n```python\nresult = handle_{id}(value)  # variant {variant}\n```\n\n\
             **Explanation:** Handle case {id}.\n\n\
             **Result:** ✅ Fixed\n\n",
            day = i % 28 + 1,
            count = i % 5 + 1,
            variant = i % 2,
        );
    }
    log
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_session_log");
    for blocks in [50, 500] {
        let log = synthetic_log(blocks);
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &log, |b, log| {
            b.iter(|| parse_session_log(black_box(log)));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("consolidate_exact");
    group.measurement_time(Duration::from_secs(5));
    for blocks in [50, 500] {
        let log = synthetic_log(blocks);
        let existing =
            parse_fix_repo(&generate_fix_repo_markdown(&parse_session_log(&synthetic_log(blocks / 2))));
        group.throughput(Throughput::Elements(blocks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &log, |b, log| {
            b.iter(|| {
                let new = parse_session_log(black_box(log));
                let merged = dedupe_exact(&new, &existing);
                generate_fix_repo_markdown(&merged)
            });
        });
    }
    group.finish();
}

fn bench_merge_fixes(c: &mut Criterion) {
    let entries = parse_session_log(&synthetic_log(200));
    c.bench_function("merge_fixes/200", |b| {
        b.iter(|| merge_fixes(black_box(&entries), 0.9));
    });
}

criterion_group!(benches, bench_parse, bench_pipeline, bench_merge_fixes);
criterion_main!(benches);
