//! Inference and kernel benchmarks.
//!
//! Measures single-flower latency of the full service path (scale, ensemble)
//! and of each ensemble member, plus raw kernel evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use irisvm::service::LoadedModel;
use irisvm::{
    EnsembleMember, Kernel, KernelKind, ProbabilisticClassifier, Trainer, TrainerConfig,
};

fn trained_model() -> LoadedModel {
    let fitted = Trainer::new(TrainerConfig::default())
        .fit()
        .expect("Training should succeed");
    LoadedModel::new(fitted.scaler, fitted.model).expect("Valid iris model")
}

fn bench_predict(c: &mut Criterion) {
    let model = trained_model();
    let flowers = [
        ("setosa", [5.1, 3.5, 1.4, 0.2]),
        ("versicolor", [7.0, 3.2, 4.7, 1.4]),
        ("virginica", [6.5, 3.0, 5.8, 2.2]),
    ];

    let mut group = c.benchmark_group("predict/ensemble");
    for (name, features) in &flowers {
        group.bench_with_input(BenchmarkId::from_parameter(name), features, |b, x| {
            b.iter(|| black_box(model.predict(black_box(x)).unwrap()));
        });
    }
    group.finish();

    let scaled = model.scaler().transform(&flowers[1].1).unwrap();
    let mut group = c.benchmark_group("predict/member");
    for member in model.model().members() {
        let id = match member {
            EnsembleMember::Svm(_) => "svm",
            EnsembleMember::GradientBoosting(_) => "gradient_boosting",
        };
        group.bench_function(id, |b| {
            b.iter(|| black_box(member.predict_proba(black_box(&scaled))));
        });
    }
    group.finish();
}

fn bench_kernels(c: &mut Criterion) {
    let x = [0.3, -1.2, 0.8, 1.1];
    let y = [-0.5, 0.4, 1.3, -0.2];
    let kernels = [
        ("linear", KernelKind::Linear),
        ("rbf", KernelKind::Rbf { gamma: 0.25 }),
        (
            "poly",
            KernelKind::Poly {
                gamma: 0.25,
                coef0: 0.0,
                degree: 3,
            },
        ),
    ];

    let mut group = c.benchmark_group("kernel");
    for (name, kernel) in &kernels {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(kernel.compute(black_box(&x), black_box(&y))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_predict, bench_kernels);
criterion_main!(benches);
