//! # Resolver Codec Benchmarks
//!
//! Hot paths run once per order leg:
//!
//! | Codec | Operation |
//! |-------|-----------|
//! | timelocks | pack / unpack / deadline |
//! | htlc_script | build / parse claimable script |
//! | escrow_address | CREATE2 escrow prediction |

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primitive_types::{H160, H256, U256};
use resolver_core::algorithms::{
    build_claimable_script, compute_escrow_address, deadline, pack, parse_claimable_script,
    set_deployed_at, unpack, HtlcParams, Stage,
};
use resolver_core::domain::{Immutables, SecureSecret};
use resolver_tests::fixtures::{maker_key, resolver_key, schedule, START_TIME};

fn bench_timelocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("timelocks");
    let schedule = schedule();
    let packed = set_deployed_at(pack(&schedule), START_TIME).unwrap_or_default();

    group.bench_function("pack", |b| b.iter(|| black_box(pack(black_box(&schedule)))));
    group.bench_function("unpack", |b| b.iter(|| black_box(unpack(black_box(packed)))));
    group.bench_function("deadline", |b| {
        b.iter(|| black_box(deadline(black_box(packed), Stage::SrcCancellation)))
    });
    group.finish();
}

fn bench_htlc_script(c: &mut Criterion) {
    let mut group = c.benchmark_group("htlc_script");
    let secret = SecureSecret::new([0x42; 32]);
    let params = HtlcParams {
        order_hash: H256::repeat_byte(0x01),
        hash_lock: secret.hash_lock().sha256,
        claim_lock_time: START_TIME as u32 + 10,
        refund_lock_time: START_TIME as u32 + 121,
        claimer: resolver_key(),
        refunder: maker_key(),
    };

    group.bench_function("build", |b| {
        b.iter(|| black_box(build_claimable_script(black_box(&params)).is_ok()))
    });
    if let Ok(script) = build_claimable_script(&params) {
        group.bench_function("parse", |b| {
            b.iter(|| black_box(parse_claimable_script(black_box(&script)).is_ok()))
        });
    }
    group.finish();
}

fn bench_escrow_address(c: &mut Criterion) {
    let immutables = Immutables {
        order_hash: H256::repeat_byte(0x01),
        hash_lock: H256::repeat_byte(0x02),
        maker: H160::repeat_byte(0xaa),
        taker: H160::repeat_byte(0x11),
        token: H160::zero(),
        amount: U256::from(10_000u64),
        safety_deposit: U256::from(1_000u64),
        timelocks: pack(&schedule()),
    };
    let factory = H160::repeat_byte(0x22);
    let code_hash = H256::repeat_byte(0x33);

    c.bench_function("escrow_address/create2", |b| {
        b.iter(|| black_box(compute_escrow_address(factory, black_box(&immutables), code_hash)))
    });
}

criterion_group!(benches, bench_timelocks, bench_htlc_script, bench_escrow_address);
criterion_main!(benches);
