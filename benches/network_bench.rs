//! Benchmarks for lexical network construction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexnet::{Hmm, HmmId, HmmInventory, LexNetwork, NetworkConfig, WordId};

/// Deterministic pseudo-random sequence for synthetic pronunciations.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn monophone_inventory(phones: usize) -> (HmmInventory, Vec<HmmId>) {
    let mut inventory = HmmInventory::new();
    let mut ids = Vec::with_capacity(phones);
    for i in 0..phones {
        let base = (i as i32 + 1) * 10;
        let hmm = Hmm::linear(
            format!("p{}", i),
            &[base, base + 1, base + 2],
            -0.35,
            -1.2,
        )
        .unwrap();
        ids.push(inventory.insert(hmm).unwrap());
    }
    (inventory, ids)
}

fn synthetic_lexicon(words: usize, phones: usize) -> Vec<Vec<usize>> {
    let mut rng = Lcg(0x5eed);
    (0..words)
        .map(|_| {
            let len = 2 + rng.next(6);
            (0..len).map(|_| rng.next(phones)).collect()
        })
        .collect()
}

fn bench_word_insertion(c: &mut Criterion) {
    let lexicon = synthetic_lexicon(1000, 30);
    c.bench_function("insert_1000_words", |b| {
        b.iter(|| {
            let (inventory, ids) = monophone_inventory(30);
            let mut net = LexNetwork::new(NetworkConfig::default(), inventory).unwrap();
            for (w, pron) in lexicon.iter().enumerate() {
                let chain: Vec<HmmId> = pron.iter().map(|&p| ids[p]).collect();
                net.add_word(&chain, WordId::new(w as u32)).unwrap();
            }
            black_box(net.num_nodes())
        })
    });
}

fn bench_finish(c: &mut Criterion) {
    let lexicon = synthetic_lexicon(500, 30);
    c.bench_function("finish_500_words", |b| {
        b.iter(|| {
            let (inventory, ids) = monophone_inventory(30);
            let mut net = LexNetwork::new(NetworkConfig::default(), inventory).unwrap();
            for (w, pron) in lexicon.iter().enumerate() {
                let chain: Vec<HmmId> = pron.iter().map(|&p| ids[p]).collect();
                net.add_word(&chain, WordId::new(w as u32)).unwrap();
            }
            net.finish().unwrap();
            black_box(net.analyze().total_arcs)
        })
    });
}

criterion_group!(benches, bench_word_insertion, bench_finish);
criterion_main!(benches);
