use criterion::{criterion_group, criterion_main, Criterion};

use animation_flow::{all, chain, delay, Pool};

fn flat_delays(c: &mut Criterion) {
    c.bench_function("tick_100_delays", |b| {
        b.iter(|| {
            let mut pool = Pool::new();
            for _ in 0..100 {
                pool.spawn(delay(16));
            }
            while !pool.tick().unwrap().is_idle() {}
        })
    });
}

fn nested_combinators(c: &mut Criterion) {
    c.bench_function("tick_nested_chains", |b| {
        b.iter(|| {
            let mut pool = Pool::new();
            for _ in 0..10 {
                pool.spawn(chain(vec![
                    delay(4).into(),
                    all(vec![delay(2).into(), delay(2).into()]).into(),
                    delay(4).into(),
                ]));
            }
            while !pool.tick().unwrap().is_idle() {}
        })
    });
}

criterion_group!(benches, flat_delays, nested_combinators);
criterion_main!(benches);
