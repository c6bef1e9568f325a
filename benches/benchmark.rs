use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use avl_set::AvlTreeSet;

const N: usize = 100_000;

pub fn benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("set_insert", |b| {
        let mut set = AvlTreeSet::new();
        b.iter(|| {
            for value in &values {
                set.insert(*value);
            }
        })
    });

    let mut set = AvlTreeSet::new();
    for value in &values {
        set.insert(*value);
    }

    c.bench_function("set_contains", |b| {
        b.iter(|| {
            for value in &values {
                black_box(set.contains(value));
            }
        })
    });

    c.bench_function("set_iter", |b| {
        b.iter(|| {
            for value in &set {
                black_box(value);
            }
        })
    });

    c.bench_function("set_lower_bound", |b| {
        b.iter(|| {
            for value in &values {
                black_box(set.lower_bound(value).get());
            }
        })
    });

    c.bench_function("set_remove", |b| {
        let mut set = set.clone();
        b.iter(|| {
            for value in &values {
                set.remove(value);
            }
        })
    });
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
