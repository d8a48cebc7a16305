use criterion::{criterion_group, criterion_main, Criterion};
use fairaudit::{AuditOptions, FeatureMatrix, LogisticRegressionOptions};

fn dataset(rows: usize) -> (FeatureMatrix, Vec<f64>) {
    let mut feature1 = Vec::new();
    let mut feature2 = Vec::new();
    let mut feature3 = Vec::new();
    let mut target = Vec::new();

    for _ in 0..rows {
        let f1: f64 = rand::random();
        let f2: f64 = rand::random();
        let f3: f64 = rand::random();
        let t = if f1 + (f2 - 0.5) * (f3 - 0.5) > 0.5 { 1.0 } else { 0.0 };

        feature1.push(f1);
        feature2.push(f2);
        feature3.push(f3);
        target.push(t);
    }

    let names = vec!["f1".to_owned(), "f2".to_owned(), "f3".to_owned()];
    let features = FeatureMatrix::new(names, vec![feature1, feature2, feature3]).unwrap();
    (features, target)
}

fn fit(c: &mut Criterion) {
    let (features, target) = dataset(1000);
    c.bench_function("fit, features=3, n=1000", |b| {
        b.iter(|| {
            LogisticRegressionOptions::new()
                .c(0.01)
                .fit(&features, &target)
                .unwrap()
        })
    });
}

fn audit(c: &mut Criterion) {
    let (features, target) = dataset(1000);
    let model = LogisticRegressionOptions::new()
        .c(0.01)
        .fit(&features, &target)
        .unwrap();

    c.bench_function("audit, features=3, n=1000, runs=10", |b| {
        b.iter(|| AuditOptions::new().seed(0).audit(&model, &features).unwrap())
    });
    c.bench_function("parallel audit, features=3, n=1000, runs=10", |b| {
        b.iter(|| {
            AuditOptions::new()
                .seed(0)
                .parallel(true)
                .audit(&model, &features)
                .unwrap()
        })
    });
}

criterion_group!(benches, fit, audit);
criterion_main!(benches);
