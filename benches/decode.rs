use criterion::{criterion_group, criterion_main, Criterion};
use dualshock::controller::{decode, ControllerHandle, ControllerSettings};
use std::io::Read;

const SAMPLE: [u8; 64] = [
    1, 134, 127, 128, 126, 8, 4, 88, 255, 0, 141, 219, 9, 188, 255, 4, 0, 167, 255, 250, 6, 212,
    31, 51, 254, 0, 0, 0, 0, 0, 27, 0, 0, 1, 252, 129, 115, 70, 27, 130, 62, 97, 32, 0, 128, 0, 0,
    0, 128, 0, 0, 0, 0, 128, 0, 0, 0, 128, 0, 0, 0, 0, 128, 0,
];

struct FixedSource;

impl Read for FixedSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = SAMPLE.len().min(buf.len());
        buf[..n].copy_from_slice(&SAMPLE[..n]);
        Ok(n)
    }
}

fn benchmark_decode(c: &mut Criterion) {
    c.bench_function("decode 64-byte report", |b| {
        b.iter(|| std::hint::black_box(decode(std::hint::black_box(&SAMPLE)).ok()));
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("failed to build runtime: {e}"),
    };

    c.bench_function("listen 100 states", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let settings = ControllerSettings {
                    queue_capacity: 16,
                    ..ControllerSettings::default()
                };
                let Ok(mut controller) = ControllerHandle::start(FixedSource, Some(settings))
                else {
                    return;
                };
                let stopper = controller.stopper();
                let mut count = 0;
                controller
                    .listen(|state| {
                        std::hint::black_box(state);
                        count += 1;
                        if count == 100 {
                            stopper.stop();
                        }
                    })
                    .await;
                controller.stop().await;
            })
        });
    });
}

criterion_group!(benches, benchmark_decode, benchmark_pipeline);
criterion_main!(benches);
