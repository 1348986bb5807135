//! # Rumor-Chain Ledger Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | PoW search, difficulty 2 | < 10ms |
//! | Block validation, 100 transfers | < 1ms |
//! | State replay, 100 blocks | < 50ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rc_02_ledger::{pow, LedgerState};
use shared_types::{Block, FileClaim, Identity, ShareTx, Transaction, TxPayload, ZERO_HASH};
use std::time::Duration;

fn file(i: usize) -> Transaction {
    Transaction::new(TxPayload::File(FileClaim {
        name: format!("file-{}", i),
        size: i as u64,
        metafile_hash: vec![i as u8; 32],
    }))
}

fn identity(name: &str) -> Transaction {
    Transaction::new(TxPayload::Identity(Identity {
        name: name.into(),
        public_key: vec![0; 32],
    }))
}

fn share(share: ShareTx) -> Transaction {
    let signer = share.expected_signer().to_string();
    Transaction::new(TxPayload::Share(share)).with_signature(signer, vec![0; 64])
}

// ============================================================================
// PROOF OF WORK
// ============================================================================

fn bench_pow_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-02-pow");
    group.measurement_time(Duration::from_secs(10));

    let txs: Vec<Transaction> = (0..10).map(file).collect();
    for difficulty in [1u32, 2] {
        group.bench_with_input(
            BenchmarkId::new("search", difficulty),
            &difficulty,
            |b, &difficulty| {
                b.iter(|| black_box(pow::search(ZERO_HASH, txs.clone(), difficulty, || false)))
            },
        );
    }

    let block = Block::new(ZERO_HASH, [7u8; 32], txs);
    group.bench_function("block_hash", |b| b.iter(|| black_box(block.hash())));
    group.finish();
}

// ============================================================================
// VALIDATION
// ============================================================================

fn funded_state() -> LedgerState {
    let genesis = Block::new(ZERO_HASH, [0u8; 32], vec![identity("A"), identity("B")]);
    let mint = Block::new(
        genesis.hash(),
        [0u8; 32],
        vec![share(ShareTx::mint("X", 1_000_000, "A"))],
    );
    LedgerState::replay([&genesis, &mint])
}

fn bench_block_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-02-validation");
    let state = funded_state();

    for size in [10usize, 100, 500] {
        let transfers: Vec<Transaction> = (0..size)
            .map(|i| share(ShareTx::transfer("X", (i + 1) as u64, "A", "B")))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("transfers", size), &transfers, |b, txs| {
            b.iter(|| black_box(state.validate_block(txs).is_ok()))
        });
    }
    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-02-replay");

    let mut blocks = Vec::new();
    let mut prev = ZERO_HASH;
    for i in 0..100 {
        let block = Block::new(prev, [0u8; 32], vec![file(i)]);
        prev = block.hash();
        blocks.push(block);
    }

    group.bench_function("replay_100_blocks", |b| {
        b.iter(|| black_box(LedgerState::replay(blocks.iter())))
    });
    group.finish();
}

criterion_group!(benches, bench_pow_search, bench_block_validation, bench_replay);
criterion_main!(benches);
