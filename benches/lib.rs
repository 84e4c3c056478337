//! # HaiGui 性能基准测试
//!
//! 使用 Criterion.rs 进行性能基准测试。
//!
//! ## 基准测试分组
//! - `lexer`: 词法分析吞吐
//! - `interp`: 解释器执行
//! - `codegen`: 编译路径执行
//!
//! ## 使用方法
//! ```bash
//! cargo bench          # 运行所有
//! cargo bench lexer    # 只运行词法分析
//! ```

use criterion::{criterion_group, criterion_main, Criterion};
use haigui::frontend::tokenize;
use haigui::util::config::{EngineConfig, ExecMode};
use haigui::vm::Session;

fn bench_tokenize(c: &mut Criterion) {
    let source = "repeat 100 [forward 10+2*3 right 90 print |a b c| ; note\n]".repeat(20);
    c.bench_function("lexer/tokenize", |b| {
        b.iter(|| tokenize(std::hint::black_box(&source), 0))
    });
}

fn run_in_mode(mode: ExecMode, source: &str) {
    let mut config = EngineConfig::default();
    config.exec.mode = mode;
    let (mut session, _handles) = Session::sandbox(config);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    rt.block_on(session.execute(source));
}

const FIB: &str = "to fib :n\nif :n < 2 [output :n]\noutput (fib :n - 1) + fib :n - 2\nend\nignore fib 15";

fn bench_interp(c: &mut Criterion) {
    c.bench_function("interp/fib15", |b| {
        b.iter(|| run_in_mode(ExecMode::Interpret, std::hint::black_box(FIB)))
    });
}

fn bench_codegen(c: &mut Criterion) {
    c.bench_function("codegen/fib15", |b| {
        b.iter(|| run_in_mode(ExecMode::Compile, std::hint::black_box(FIB)))
    });
}

criterion_group!(benches, bench_tokenize, bench_interp, bench_codegen);
criterion_main!(benches);
