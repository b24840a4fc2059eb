use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use datarepo::construct::{DataRepo, KeyOptions};
use datarepo::datatype::ValueKind;

const ENTRIES: usize = 10_000;

fn populated() -> DataRepo {
    let repo = DataRepo::new();
    let options = KeyOptions::new();
    for i in 0..ENTRIES {
        repo.create_and_write(format!("Test.Key.{}", i), ValueKind::String, format!("Value {}", i), &options)
            .unwrap();
    }
    repo
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("create and write 10k", |b| b.iter(|| black_box(populated())));

    let repo = populated();
    let keys: Vec<String> = (0..ENTRIES).map(|i| format!("Test.Key.{}", i)).collect();
    c.bench_function("write 10k", |b| {
        b.iter(|| {
            for key in &keys {
                repo.write(key, "Updated", None).unwrap();
            }
        })
    });
    c.bench_function("read 10k", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(repo.read(key, None).unwrap());
            }
        })
    });
    c.bench_function("wildcard over 10k", |b| {
        b.iter(|| black_box(repo.find_keys_with_wildcards("Test.*.99*").unwrap()))
    });
    c.bench_function("delete 10k", |b| {
        b.iter_batched(
            populated,
            |repo| {
                for key in &keys {
                    repo.delete_key(key, None).unwrap();
                }
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
