use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lcl_engine::{Interpreter, Value};

fn fibonacci_benchmark(c: &mut Criterion) {
    let source = include_str!("fibonacci.lcl");
    let mut interp = Interpreter::new();
    interp.register_core();
    interp.eval_str(source).unwrap();

    let fib = interp.get("fib").unwrap();
    let args = vec![Value::Int(20)];

    c.bench_function("fib 20", |b| {
        b.iter(|| interp.call(black_box(&fib), black_box(&args)).unwrap())
    });
}

criterion_group!(benches, fibonacci_benchmark);
criterion_main!(benches);
