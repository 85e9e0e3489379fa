use criterion::{criterion_group, criterion_main, Criterion};
use renzmc::{parse, Interpreter};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

fn benchmark(c: &mut Criterion) {
    let src = include_str!("fib.rmc");
    let program = parse(src).unwrap();
    let sink = Rc::new(RefCell::new(io::sink()));

    c.bench_function("fib 20", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new(sink.clone());
            interpreter.interpret(&program).unwrap();
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
