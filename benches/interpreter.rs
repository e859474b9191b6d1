//! Interpreter benchmarks for YAIL.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;

const LOOP_SUM: &str = "sum = 0
for i = 0; i < 10000; i = i + 1 { sum = sum + i }
@println(sum)";

const FIB_RECURSIVE: &str = "fib = (n) { fib = .fib
    if n < 2 { return n }
    return fib(n - 1) + fib(n - 2) }
@println(fib(15))";

const SIEVE: &str = "MAX = 100
for i = 2; i < MAX; i = i + 1 { isPrime[i] = true }
numPrimes = 0
for i = 2; i < MAX; i = i + 1 {
    if isPrime[i] {
        primes[numPrimes] = i
        numPrimes = numPrimes + 1
        for j = i * 2; j < MAX; j = j + i { isPrime[j] = false }
    }
}
for i = 0; i < numPrimes; i = i + 1 { @println(primes[i]) }";

/// Run a program with empty input, discarding its output.
fn run_program(source: &str) {
    let mut output = Vec::new();
    yail::interpret_with_seed(source, Cursor::new(&b""[..]), &mut output, 0)
        .expect("program failed");
}

fn parse_benchmarks(c: &mut Criterion) {
    c.bench_function("parse_sieve", |b| {
        b.iter(|| yail::parse(black_box(SIEVE)).expect("parse failed"))
    });
}

fn execute_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    group.bench_function("loop_sum_10000", |b| {
        b.iter(|| run_program(black_box(LOOP_SUM)))
    });
    group.bench_function("fib_recursive_15", |b| {
        b.iter(|| run_program(black_box(FIB_RECURSIVE)))
    });
    group.bench_function("sieve_100", |b| b.iter(|| run_program(black_box(SIEVE))));

    group.finish();
}

criterion_group!(benches, parse_benchmarks, execute_benchmarks);
criterion_main!(benches);
