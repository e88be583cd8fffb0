/*!
# repax

This crate provides random access into the text represented by a
grammar-compressed string. The input is a context-free grammar produced by a
RePair-family compressor (MR-RePair, Navarro's RePair or Big-RePair) that
derives a single text `T` of length `n`. After loading, the grammar is
reindexed so that rules are ordered by expansion length, its rules are stored
in one of four [jagged array](jagged::JaggedArray) encodings, and a succinct
[index](index::GrammarIndex) over the start rule supports
`extract(i, j) -> T[i..=j]` queries in time proportional to
`(j - i + 1) * depth` while using space close to the grammar size.

Here is a quick example of how this crate works:

```rust
use repax::{Encoding, Extractor, Grammar, GrammarIndex};

// R1 -> "ab", R2 -> R1 R1, start -> R2 'c' R2
let rules = vec![vec![b'a' as u32, b'b' as u32], vec![256, 256]];
let start = vec![257, b'c' as u32, 257];
let grammar = Grammar::from_parts(rules, start, Encoding::BpIndex).unwrap();
assert_eq!(grammar.text_len(), 9);

let index = GrammarIndex::new(&grammar);
let mut extractor = Extractor::new(&index);
assert_eq!(extractor.extract(0, 8).unwrap(), b"ababcabab");
assert_eq!(extractor.extract(3, 5).unwrap(), b"bca");
```

# Overview

The primary types in this crate are [`Grammar`], [`GrammarIndex`] and
[`Extractor`]:

- [`Grammar::from_files`] parses a compressor's native output
  ([`GrammarKind`] selects the format) into the canonical representation:
  terminals keep the codes `0..=255`, non-terminals are reindexed so that a
  smaller id never has a longer expansion, and the start rule keeps the
  largest id. [`Grammar::from_parts`] builds the same representation from
  rules already in memory. The [`Encoding`] argument selects how the rule
  table is stored physically; all encodings answer the same queries.
- [`GrammarIndex::new`] builds two sparse position sets over the grammar:
  the text positions at which a start-rule symbol begins, and the rule ids
  at which a new expansion length first appears. Together they map any text
  position to the start-rule symbol containing it and any rule id to its
  expansion length.
- [`Extractor`] walks the derivation tree from the entry point the index
  provides and emits the requested bytes. It owns two small stacks reused
  across queries; the grammar and the index are read-only after build and
  can be shared by any number of extractors.

The grammar and index live in process memory only; nothing is persisted.
Terminals are 8-bit bytes, so extraction returns raw bytes rather than
`str`.

The `extract` binary loads a grammar, prints its statistics and benchmarks
random queries; see its `--help` for the arguments.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod bitpack;
pub mod cfg;
pub mod extract;
pub mod formats;
pub mod index;
pub mod jagged;
mod sparse;
pub use cfg::Grammar;
pub use cfg::LoadGrammarError;
pub use cfg::ALPHABET_SIZE;
pub use extract::ExtractError;
pub use extract::Extractor;
pub use formats::GrammarKind;
pub use index::GrammarIndex;
pub use jagged::Encoding;
pub use jagged::JaggedArray;
pub use jagged::DUMMY_CODE;
