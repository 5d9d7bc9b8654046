use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use order_wire_bench::{CodecKind, Operation, Order, build, run};
use std::time::Duration;

fn bench_operation(c: &mut Criterion, fixture: &Order, operation: Operation) {
    let mut group = c.benchmark_group(format!("order_{operation}"));
    group.throughput(Throughput::Elements(1));

    for kind in CodecKind::ALL {
        let codec = kind.build(kind.default_options());

        group.bench_function(codec.name(), |b| {
            b.iter_custom(|iters| match run(codec.as_ref(), fixture, operation, iters) {
                Ok(result) => result.total_elapsed,
                Err(e) => panic!("{kind} {operation} aborted: {e}"),
            })
        });

        match codec.encode(fixture) {
            Ok(encoded) => println!("{} - {} bytes per order", codec.name(), encoded.len()),
            Err(e) => println!("{} - cannot encode fixture: {e}", codec.name()),
        }
    }

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    println!("\n=== ORDER MARSHAL ===");
    bench_operation(c, &build(), Operation::Encode);
}

fn benchmark_decode(c: &mut Criterion) {
    println!("\n=== ORDER UNMARSHAL ===");
    bench_operation(c, &build(), Operation::Decode);
}

criterion_group!(
    name = order_benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        benchmark_encode,
        benchmark_decode
);

criterion_main!(order_benches);
