use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128Plus;
use repax::{Encoding, Extractor, Grammar, GrammarIndex};

/// Fibonacci-word grammar: W_1 -> "ab", W_k -> W_{k-1} W_{k-2}; roughly
/// 120k characters of heavily repetitive text at depth 25.
fn fibonacci_grammar(encoding: Encoding) -> Grammar {
    let mut rules = vec![vec![b'a' as u32, b'b' as u32]];
    rules.push(vec![256, b'a' as u32]);
    for k in 2..24u32 {
        rules.push(vec![255 + k, 254 + k]);
    }
    let start = vec![255 + 24];
    Grammar::from_parts(rules, start, encoding).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for encoding in [
        Encoding::Plain,
        Encoding::BpIndex,
        Encoding::BpOpt,
        Encoding::BpMono,
    ] {
        let grammar = fibonacci_grammar(encoding);
        let index = GrammarIndex::new(&grammar);
        let mut extractor = Extractor::new(&index);
        let mut rng = Xoroshiro128Plus::seed_from_u64(0x5eed);
        let mut buf = Vec::with_capacity(1000);
        let last_begin = grammar.text_len() - 1000;
        group.bench_function(format!("1000-byte queries, {encoding}"), |b| {
            b.iter(|| {
                let begin = rng.gen_range(0..=last_begin);
                buf.clear();
                extractor
                    .extract_into(black_box(&mut buf), begin, begin + 999)
                    .unwrap();
            })
        });
    }
    group.finish();
}
criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
