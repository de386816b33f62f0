use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pbt::contest::{ContestConfig, ContestEngine, ContestRequest, MemoryLedger};
use pbt::core::codec::encode_alpha;
use pbt::core::signature::{sign_alpha, sign_beta, verify_alpha, verify_beta, Keypair};

pub fn criterion_benchmark(c: &mut Criterion) {
    let owner = Keypair::from_seed("Owner");
    let a = Keypair::from_seed("Alice");
    let b = Keypair::from_seed("Bob");
    let (from, to) = (a.account_id(), b.account_id());

    let alpha = sign_alpha(&a, &to, 10, 0, 100);
    let beta = sign_beta(&b, &alpha);

    let mut group = c.benchmark_group("Signatures");

    group.bench_function("encode_alpha", |bench| {
        bench.iter(|| encode_alpha(black_box(&from), black_box(&to), 10, 0, 100))
    });

    group.bench_function("verify_alpha", |bench| {
        bench.iter(|| verify_alpha(&from, &to, 10, 0, 100, black_box(&from), black_box(&alpha)))
    });

    group.bench_function("verify_beta", |bench| {
        bench.iter(|| verify_beta(black_box(&alpha), black_box(&to), black_box(&beta)))
    });

    group.finish();

    let alpha_signature = sign_alpha(&a, &to, 1, 0, 100);
    let request = ContestRequest {
        from,
        to,
        value: 1,
        t0: 0,
        t1: 100,
        beta_signature: sign_beta(&b, &alpha_signature),
        alpha_signature,
    };

    c.bench_function("contest+unlock", |bench| {
        let mut engine = ContestEngine::new(
            ContestConfig::default(),
            MemoryLedger::new(owner.account_id()),
            (),
        );
        let _ = engine.mint(&from, u64::MAX / 2, &owner.account_id());
        bench.iter(|| {
            let _ = engine.contest(&to, black_box(&request), 50);
            let _ = engine.unlock(&from, &from);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
