//! # DocAuth Exchange Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Correlation register + complete | < 5µs per exchange |
//! | Frame encode, 4 MiB of images | < 50ms |
//! | Outcome grouping, 200 outcomes | < 50µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docauth_client::adapters::framing::write_frame;
use docauth_client::PendingExchangeStore;
use docauth_types::{
    group_outcomes, CheckKind, Confidence, EngineFrame, ImageSlot, RequestId, TestGroup,
    TestOutcome, TestStatus, VerificationResult, VerificationStatus,
};

// ============================================================================
// Correlation table
// ============================================================================

fn bench_pending_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending-exchange-store");

    for size in [1usize, 64, 1024] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("register_complete", size), &size, |b, &size| {
            let store = PendingExchangeStore::new();
            b.iter(|| {
                let ids: Vec<RequestId> = (0..size).map(|_| RequestId::new()).collect();
                let receivers: Vec<_> = ids.iter().map(|id| store.register(*id)).collect();
                for id in &ids {
                    store.complete(VerificationResult::new(*id, VerificationStatus::Passed));
                }
                black_box(receivers)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Framing
// ============================================================================

fn bench_frame_encode(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut result = VerificationResult::new(RequestId::new(), VerificationStatus::Passed);
    for slot in [ImageSlot::ColorFront, ImageSlot::ColorBack, ImageSlot::UvFront, ImageSlot::IrFront] {
        result.processed_images.insert(slot, vec![0xAB; 1024 * 1024]);
    }
    let frame = EngineFrame::Completed { result };

    let mut group = c.benchmark_group("framing");
    group.throughput(Throughput::Bytes(4 * 1024 * 1024));
    group.bench_function("encode_completed_4mib", |b| {
        b.iter(|| {
            let mut buf: Vec<u8> = Vec::new();
            rt.block_on(write_frame(&mut buf, &frame)).expect("encode");
            black_box(buf.len())
        })
    });
    group.finish();
}

// ============================================================================
// Grouping
// ============================================================================

fn bench_grouping(c: &mut Criterion) {
    let groups = [
        TestGroup::AntiSpoofing,
        TestGroup::Document,
        TestGroup::Rfid,
        TestGroup::Barcode,
        TestGroup::Biometric,
    ];
    let outcomes: Vec<TestOutcome> = (0..200)
        .map(|i| TestOutcome {
            name: format!("check_{i}"),
            group: groups[i % groups.len()],
            status: TestStatus::Passed,
            confidence: Confidence::FULL,
            kind: CheckKind::Visual,
            cross_matches: None,
        })
        .collect();

    c.bench_function("group_outcomes_200", |b| {
        b.iter(|| black_box(group_outcomes(black_box(&outcomes)).len()))
    });
}

criterion_group!(benches, bench_pending_store, bench_frame_encode, bench_grouping);
criterion_main!(benches);
