// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netscope::{ManualClock, Registry, RingBuffer};

fn registry_insert_benchmark(c: &mut Criterion) {
    c.bench_function("registry_add_entry", |b| {
        let clock = ManualClock::new(0);
        let registry: Registry<String, u64> =
            Registry::new("bench", Duration::from_secs(300), Arc::new(clock.clone()));
        let mut n = 0u64;

        b.iter(|| {
            n += 1;
            clock.advance(Duration::from_millis(10));
            black_box(registry.add_entry(format!("req_{}", n), (), n));
        })
    });

    c.bench_function("registry_sweep_on_insert", |b| {
        b.iter(|| {
            let clock = ManualClock::new(0);
            let registry: Registry<String, u64> =
                Registry::new("bench", Duration::from_secs(1), Arc::new(clock.clone()));
            for n in 0..1000u64 {
                registry.add_entry(format!("req_{}", n), (), n);
            }
            clock.advance(Duration::from_secs(2));
            registry.add_entry("req_last".to_string(), (), 0);
            black_box(registry.len())
        })
    });
}

fn ring_buffer_benchmark(c: &mut Criterion) {
    c.bench_function("ring_buffer_push", |b| {
        let mut log = RingBuffer::new(1000);
        let mut n = 0u64;

        b.iter(|| {
            n += 1;
            black_box(log.push(n));
        })
    });
}

criterion_group!(benches, registry_insert_benchmark, ring_buffer_benchmark);
criterion_main!(benches);
