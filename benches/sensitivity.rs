use criterion::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use odesens::prelude::*;
use odesens::symbolic::codegen;

fn chain_model(n: usize) -> ModelDescriptor<SymMatrix> {
    let engine = SxEngine::new();
    let repr = Representation::Sx;
    let x = engine.sym(repr, "x", n, 1).unwrap();
    let u = engine.sym(repr, "u", 1, 1).unwrap();
    let k = engine.sym(repr, "k", 1, 1).unwrap();
    let exprs: Vec<String> = (0..n)
        .map(|i| {
            if i == 0 {
                "u - k * sin(x_0)".to_string()
            } else {
                format!("k * (x_{} - x_{}) * exp(-x_{} * x_{})", i - 1, i, i, i)
            }
        })
        .collect();
    let f = engine.parse_column(repr, &exprs[..], &[&x, &u, &k]).unwrap();
    ModelDescriptor::new("chain", x, u, k, f)
}

fn pendulum() -> ModelDescriptor<SymMatrix> {
    let engine = SxEngine::new();
    let repr = Representation::Sx;
    let x = engine.sym(repr, "x", 2, 1).unwrap();
    let u = engine.sym(repr, "u", 1, 1).unwrap();
    let f = engine
        .parse_column(repr, &["x_1", "-9.81 * sin(x_0) + u"], &[&x, &u])
        .unwrap();
    ModelDescriptor::new("pendulum", x, u, ParameterInput::none(), f)
}

fn build_benchmark(c: &mut Criterion) {
    let engine = SxEngine::new();
    let small = pendulum();
    let chain = chain_model(12);

    c.bench_function("build_pendulum", |b| {
        b.iter(|| build_sensitivities(&engine, black_box(&small)).unwrap())
    });
    c.bench_function("build_chain_12", |b| {
        b.iter(|| build_sensitivities(&engine, black_box(&chain)).unwrap())
    });
}

fn codegen_benchmark(c: &mut Criterion) {
    let engine = SxEngine::new();
    let fns = build_sensitivities(&engine, &chain_model(12)).unwrap();
    let options = CodegenOptions::default();

    c.bench_function("codegen_chain_12_hess", |b| {
        b.iter(|| codegen::generate(black_box(&fns.ode_hess), &options).unwrap())
    });
}

fn evaluation_benchmark(c: &mut Criterion) {
    let engine = SxEngine::new();
    let fns = build_sensitivities(&engine, &chain_model(12)).unwrap();
    let args = vec![
        DMatrix::from_element(12, 1, 0.1),
        DMatrix::identity(12, 12),
        DMatrix::zeros(12, 1),
        DMatrix::from_element(12, 1, 1.0),
        DMatrix::from_element(1, 1, 0.5),
        DMatrix::from_element(1, 1, 2.0),
    ];

    c.bench_function("call_chain_12_hess", |b| {
        b.iter(|| fns.ode_hess.call(black_box(&args)).unwrap())
    });
}

criterion_group!(
    benches,
    build_benchmark,
    codegen_benchmark,
    evaluation_benchmark
);
criterion_main!(benches);
