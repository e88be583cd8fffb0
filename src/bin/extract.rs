//! Loads a grammar-compressed text and benchmarks random access queries.
//!
//! Grammar statistics and timings go to stderr; the decoded substrings go
//! to stdout.

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128Plus;
use repax::{Encoding, Extractor, Grammar, GrammarIndex, GrammarKind};

/// Random access queries over a grammar-compressed text.
#[derive(Parser)]
#[command(version, max_term_width = 80)]
struct Args {
    /// Grammar type: mrrepair, navarro or bigrepair.
    grammar_type: String,
    /// Grammar file name without extension(s).
    file_stem: PathBuf,
    /// Rule storage encoding: array, bpleft, bpright or bpmono.
    encoding: String,
    /// Length of every extracted substring.
    query_size: usize,
    /// Number of random queries to run.
    #[arg(default_value_t = 10_000)]
    num_queries: u64,
    /// Seed for the query positions; drawn from entropy when absent.
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    env_logger::init();

    let kind = GrammarKind::from_str(&args.grammar_type)
        .ok()
        .with_context(|| format!("invalid grammar type {:?}", args.grammar_type))?;
    let encoding = Encoding::from_str(&args.encoding)
        .ok()
        .with_context(|| format!("invalid encoding {:?}", args.encoding))?;
    ensure!(args.query_size > 0, "query size must be positive");
    ensure!(args.num_queries > 0, "number of queries must be positive");

    let grammar = Grammar::from_files(kind, &args.file_stem, encoding)
        .with_context(|| format!("failed to load {kind} grammar {:?}", args.file_stem))?;

    eprintln!("text length: {}", grammar.text_len());
    eprintln!("num rules: {}", grammar.num_rules());
    eprintln!("start size: {}", grammar.start_size());
    eprintln!("rules size: {}", grammar.rules_size());
    eprintln!("total size: {}", grammar.total_size());
    eprintln!("depth: {}", grammar.depth());
    let grammar_mem = grammar.mem_size();
    eprintln!("grammar mem size: {grammar_mem}");

    let index = GrammarIndex::new(&grammar);
    let index_mem = index.mem_size();
    eprintln!("index mem size: {index_mem}");
    eprintln!("total mem size: {}", grammar_mem + index_mem);

    ensure!(
        args.query_size <= grammar.text_len(),
        "query size {} exceeds the text length {}",
        args.query_size,
        grammar.text_len()
    );

    let mut rng = match args.seed {
        Some(seed) => Xoroshiro128Plus::seed_from_u64(seed),
        None => Xoroshiro128Plus::from_entropy(),
    };

    let mut extractor = Extractor::new(&index);
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut buf = Vec::with_capacity(args.query_size);
    let mut elapsed = Duration::ZERO;
    for _ in 0..args.num_queries {
        let begin = rng.gen_range(0..=grammar.text_len() - args.query_size);
        let end = begin + args.query_size - 1;
        buf.clear();
        let clock = Instant::now();
        extractor.extract_into(&mut buf, begin, end)?;
        elapsed += clock.elapsed();
        out.write_all(&buf)?;
    }
    out.flush()?;

    eprintln!(
        "average query time: {}µs",
        elapsed.as_micros() / args.num_queries as u128
    );
    Ok(())
}
