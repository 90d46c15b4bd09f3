use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use quadstore::key::Key;
use quadstore::kv::{Env, StoreConfig};
use quadstore::quad::{Pattern, QuadIndex};
use quadstore::term::Dictionary;
use quadstore::Term;

fn seeded_env(num_triples: u64) -> (tempfile::TempDir, Env) {
    let dir = tempfile::tempdir().unwrap();
    let env = Env::open(dir.path(), &StoreConfig::default()).unwrap();
    let idx = QuadIndex::new();
    let mut txn = env.txn(true).unwrap();
    for i in 0..num_triples {
        let s = i % 1000;
        let p = i % 20;
        let o = i;
        idx.add(&env, &mut txn, s, p, o, None).unwrap();
    }
    txn.commit().unwrap();
    (dir, env)
}

fn term_interning(c: &mut Criterion) {
    c.bench_function("intern a fresh term", |b| {
        let dir = tempfile::tempdir().unwrap();
        let env = Env::open(dir.path(), &StoreConfig::default()).unwrap();
        let dict = Dictionary::new(&env);
        let mut counter: u64 = 0;

        b.iter_batched(
            || {
                counter += 1;
                Term::iri(format!("http://bench.example/{counter}"))
            },
            |term| {
                let mut txn = env.txn(true).unwrap();
                let key = dict.to_key(&mut txn, black_box(&term)).unwrap();
                txn.commit().unwrap();
                key
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("re-intern an existing term", |b| {
        let dir = tempfile::tempdir().unwrap();
        let env = Env::open(dir.path(), &StoreConfig::default()).unwrap();
        let dict = Dictionary::new(&env);
        let term = Term::iri("http://bench.example/stable");
        {
            let mut txn = env.txn(true).unwrap();
            dict.to_key(&mut txn, &term).unwrap();
            txn.commit().unwrap();
        }
        let txn = env.txn(false).unwrap();
        b.iter(|| dict.to_key_or_miss(&txn, black_box(&term)).unwrap())
    });
}

fn quad_lookups(c: &mut Criterion) {
    let (_dir, env) = seeded_env(10_000);
    let idx = QuadIndex::new();
    let txn = env.txn(false).unwrap();

    c.bench_function("lookup one-bound (subject)", |b| {
        b.iter(|| idx.lookup(&env, &txn, Pattern::new(Some(black_box(42)), None, None), None).unwrap())
    });

    c.bench_function("lookup two-bound (subject, predicate)", |b| {
        b.iter(|| {
            idx.lookup(&env, &txn, Pattern::new(Some(black_box(42)), Some(black_box(7)), None), None).unwrap()
        })
    });

    c.bench_function("lookup three-bound (exact triple)", |b| {
        let target: Key = 42;
        b.iter(|| {
            idx.lookup(
                &env,
                &txn,
                Pattern::new(Some(target), Some(target % 20), Some(target)),
                None,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, term_interning, quad_lookups);
criterion_main!(benches);
