use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferrite_bytecode::{build_image, PoolEntry, Program, UnitDef};

fn method_unit(seed: u16) -> UnitDef {
    UnitDef {
        nlocals: 4,
        nregs: 8,
        instructions: vec![0x2E; 64],
        pool: vec![
            PoolEntry::Int32(seed as i32),
            PoolEntry::String(format!("method_{seed}")),
            PoolEntry::Float(seed as f64 * 0.5),
        ],
        symbols: vec![format!("call_{seed}"), "each".to_string()],
        ..UnitDef::default()
    }
}

fn bench_flat_program(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_program");

    for width in [1u16, 16, 64] {
        let root = UnitDef {
            children: (0..width).map(method_unit).collect(),
            ..UnitDef::default()
        };
        let image = build_image(&root);

        group.throughput(Throughput::Bytes(image.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("children", width),
            &image,
            |b, image| {
                b.iter(|| Program::load(black_box(image)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_nested_program(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_program");

    for depth in [4u16, 32, 128] {
        let mut unit = method_unit(depth);
        for seed in 0..depth {
            unit = UnitDef {
                children: vec![unit],
                ..method_unit(seed)
            };
        }
        let image = build_image(&unit);

        group.throughput(Throughput::Bytes(image.len() as u64));
        group.bench_with_input(BenchmarkId::new("depth", depth), &image, |b, image| {
            b.iter(|| Program::load(black_box(image)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flat_program, bench_nested_program);
criterion_main!(benches);
