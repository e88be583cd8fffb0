//! The canonical grammar representation and its post-processing.
//!
//! A grammar arrives from one of the [format adapters](crate::formats) (or
//! from [`Grammar::from_parts`]) as raw rule rows. Post-processing computes
//! every rule's expansion length and depth, derives the text length,
//! reindexes the non-terminals by ascending expansion length and rewrites
//! the rows into the chosen [`JaggedArray`] encoding. After that the
//! grammar is immutable.

use ahash::AHashMap;
use fixedbitset_stack::FixedBitSet;

use crate::jagged::{Encoding, JaggedArray, DUMMY_CODE};

/// Number of terminal codes; terminals are the bytes `0..=255`.
pub const ALPHABET_SIZE: u32 = 256;

#[derive(Debug, thiserror::Error)]
/// The error type for errors in grammar loading.
pub enum LoadGrammarError {
    #[error("IO error: {0}")]
    /// Error due to I/O on a grammar file.
    Io(#[from] std::io::Error),
    #[error("malformed grammar file: {0}")]
    /// Error due to a file that does not follow its declared format.
    Malformed(String),
    #[error("alphabet size {0} is outside 1..=256")]
    /// Error due to a `.R` file declaring an impossible alphabet size.
    InvalidAlphabetSize(i64),
    #[error("the number of rules {0} exceeds the maximum {1}")]
    /// Error due to more rules than the code space can address.
    TooManyRules(usize, usize),
    #[error("rule {0} has {1} symbols, expected at least 2")]
    /// Error due to a non-terminal with a degenerate right-hand side.
    DegenerateRule(u32, usize),
    #[error("rule {0} references undefined code {1}")]
    /// Error due to a right-hand side naming a rule that does not exist.
    DanglingCode(u32, u32),
    #[error("rule {0} participates in a cycle")]
    /// Error due to a cyclic rule graph, which cannot derive a finite text.
    CyclicRule(u32),
    #[error("declared text length {declared} does not match the derived length {derived}")]
    /// Error due to an MR-RePair header disagreeing with its own grammar.
    TextLengthMismatch {
        /// The text length the file header declares.
        declared: usize,
        /// The text length the grammar actually derives.
        derived: usize,
    },
    #[error("the grammar derives an empty text")]
    /// Error due to an empty start rule.
    EmptyText,
}

/// A grammar in Chomsky-like form deriving a single text.
///
/// Terminals occupy the codes `0..=255` and expand to themselves. Rule ids
/// start at [`ALPHABET_SIZE`]; after post-processing a smaller rule id
/// never has a longer expansion, and the start rule, whose expansion is
/// the whole text, keeps the largest id. The grammar owns its rule storage
/// and is immutable once built.
#[derive(Debug)]
pub struct Grammar {
    rules: JaggedArray,
    text_len: usize,
    num_rules: usize,
    rules_size: usize,
    start_rule: u32,
    start_size: usize,
    depth: usize,
}

impl Grammar {
    /// Builds a grammar from raw rule rows.
    ///
    /// `rules[k]` is the right-hand side of rule `ALPHABET_SIZE + k` and
    /// `start` is the start rule's symbol sequence; codes below
    /// [`ALPHABET_SIZE`] are terminal bytes, larger codes name rules. The
    /// non-terminals are reindexed by ascending expansion length (ties
    /// keep their relative order), so the ids valid against the returned
    /// grammar generally differ from the input positions.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadGrammarError`] if a right-hand side has fewer than
    /// two symbols, references a code that names no rule, or participates
    /// in a cycle, or if the start rule is empty.
    pub fn from_parts(
        rules: Vec<Vec<u32>>,
        start: Vec<u32>,
        encoding: Encoding,
    ) -> Result<Self, LoadGrammarError> {
        let num_rules = rules.len();
        let max_rules = (u32::MAX - ALPHABET_SIZE - 1) as usize;
        if num_rules > max_rules {
            return Err(LoadGrammarError::TooManyRules(num_rules, max_rules));
        }
        if start.is_empty() {
            return Err(LoadGrammarError::EmptyText);
        }
        let start_rule = ALPHABET_SIZE as usize + num_rules;
        for (k, rhs) in rules.iter().enumerate() {
            if rhs.len() < 2 {
                return Err(LoadGrammarError::DegenerateRule(
                    (ALPHABET_SIZE as usize + k) as u32,
                    rhs.len(),
                ));
            }
        }

        let mut sizes = vec![0usize; start_rule + 1];
        let mut depths = vec![0usize; start_rule + 1];
        compute_sizes_and_depths(&rules, &start, start_rule, &mut sizes, &mut depths)?;
        let text_len = sizes[start_rule];
        let depth = depths[start_rule];
        let start_size = start.len();
        let rules_size = rules.iter().map(|rhs| rhs.len()).sum();

        let store = reorder_rules(&rules, &start, start_rule, &sizes, encoding);

        Ok(Self {
            rules: store,
            text_len,
            num_rules,
            rules_size,
            start_rule: start_rule as u32,
            start_size,
            depth,
        })
    }

    /// Reads the `i`-th code of `rule`'s right-hand side; one past the
    /// last code yields [`DUMMY_CODE`].
    #[inline]
    pub fn get(&self, rule: u32, i: usize) -> u32 {
        self.rules.get(rule as usize, i)
    }

    #[inline]
    /// Length of the text the grammar derives.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    #[inline]
    /// Number of non-terminal rules, the start rule excluded.
    pub fn num_rules(&self) -> usize {
        self.num_rules
    }

    #[inline]
    /// Total number of symbols on the non-start right-hand sides.
    pub fn rules_size(&self) -> usize {
        self.rules_size
    }

    #[inline]
    /// The start rule's id, `ALPHABET_SIZE + num_rules`.
    pub fn start_rule(&self) -> u32 {
        self.start_rule
    }

    #[inline]
    /// Number of symbols in the start rule.
    pub fn start_size(&self) -> usize {
        self.start_size
    }

    #[inline]
    /// `start_size` plus `rules_size`.
    pub fn total_size(&self) -> usize {
        self.start_size + self.rules_size
    }

    #[inline]
    /// Height of the derivation tree; terminals count 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    /// The physical encoding of the rule store.
    pub fn encoding(&self) -> Encoding {
        self.rules.encoding()
    }

    /// Heap footprint of the rule store in bytes.
    pub fn mem_size(&self) -> usize {
        self.rules.mem_size()
    }

    /// Expansion length of every rule below the start rule, terminals
    /// included.
    ///
    /// Relies on the canonical order: every code on a right-hand side is
    /// strictly smaller than the rule it appears in, so one forward sweep
    /// resolves all lengths.
    pub(crate) fn expansion_sizes(&self) -> Vec<usize> {
        let start_rule = self.start_rule as usize;
        let mut sizes = vec![0usize; start_rule];
        for terminal in 0..ALPHABET_SIZE as usize {
            sizes[terminal] = 1;
        }
        for rule in ALPHABET_SIZE as usize..start_rule {
            let mut size = 0;
            let mut i = 0;
            loop {
                let code = self.get(rule as u32, i);
                if code == DUMMY_CODE {
                    break;
                }
                debug_assert!((code as usize) < rule);
                size += sizes[code as usize];
                i += 1;
            }
            sizes[rule] = size;
        }
        sizes
    }
}

/// Memoised depth and expansion length for every rule, walked with an
/// explicit stack since grammar depth can reach thousands of levels.
/// Detects cycles and dangling codes; rules unreachable from the start
/// rule are still resolved so the reorder can place them.
fn compute_sizes_and_depths(
    rules: &[Vec<u32>],
    start: &[u32],
    start_rule: usize,
    sizes: &mut [usize],
    depths: &mut [usize],
) -> Result<(), LoadGrammarError> {
    for terminal in 0..ALPHABET_SIZE as usize {
        sizes[terminal] = 1;
        depths[terminal] = 1;
    }
    let row = |id: usize| -> &[u32] {
        if id == start_rule {
            start
        } else {
            &rules[id - ALPHABET_SIZE as usize]
        }
    };

    let mut on_path = FixedBitSet::with_capacity(start_rule + 1);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut unreachable = 0usize;
    for root in std::iter::once(start_rule).chain(ALPHABET_SIZE as usize..start_rule) {
        if sizes[root] != 0 {
            continue;
        }
        if root != start_rule {
            unreachable += 1;
        }
        on_path.set(root, true);
        stack.push((root, 0));
        while let Some(frame) = stack.last_mut() {
            let (rule, child) = *frame;
            let rhs = row(rule);
            if child == rhs.len() {
                let mut size = 0usize;
                let mut depth = 0usize;
                for &code in rhs {
                    size += sizes[code as usize];
                    depth = depth.max(depths[code as usize]);
                }
                sizes[rule] = size;
                depths[rule] = depth + 1;
                on_path.set(rule, false);
                stack.pop();
                continue;
            }
            frame.1 = child + 1;
            let code = rhs[child] as usize;
            if code == start_rule {
                return Err(LoadGrammarError::CyclicRule(rule as u32));
            }
            if code > start_rule {
                return Err(LoadGrammarError::DanglingCode(rule as u32, code as u32));
            }
            if sizes[code] == 0 {
                if on_path.contains(code) {
                    return Err(LoadGrammarError::CyclicRule(code as u32));
                }
                on_path.set(code, true);
                stack.push((code, 0));
            }
        }
    }
    if unreachable > 0 {
        log::warn!(
            "{unreachable} of {} rules are unreachable from the start rule",
            rules.len()
        );
    }
    Ok(())
}

/// Reindexes the non-terminals by ascending expansion length, ties keeping
/// their relative order, and rewrites every right-hand side into a fresh
/// rule store. Slots are written in ascending order, which the bit-packed
/// encodings rely on; the start rule lands in the last slot.
fn reorder_rules(
    rules: &[Vec<u32>],
    start: &[u32],
    start_rule: usize,
    sizes: &[usize],
    encoding: Encoding,
) -> JaggedArray {
    let mut histogram: AHashMap<usize, usize> = AHashMap::default();
    for id in ALPHABET_SIZE as usize..start_rule {
        *histogram.entry(sizes[id]).or_insert(0) += 1;
    }
    let mut distinct: Vec<usize> = histogram.keys().copied().collect();
    distinct.sort_unstable();

    // first slot of each expansion-length group
    let mut next_slot: AHashMap<usize, usize> = AHashMap::with_capacity(distinct.len());
    let mut offset = ALPHABET_SIZE as usize;
    for &size in &distinct {
        next_slot.insert(size, offset);
        offset += histogram[&size];
    }

    let mut new_id = vec![0u32; start_rule + 1];
    for terminal in 0..ALPHABET_SIZE as usize {
        new_id[terminal] = terminal as u32;
    }
    for id in ALPHABET_SIZE as usize..start_rule {
        let slot = next_slot.get_mut(&sizes[id]).expect("histogram covers id");
        new_id[id] = *slot as u32;
        *slot += 1;
    }
    new_id[start_rule] = start_rule as u32;

    let mut old_of_new = vec![0usize; start_rule + 1];
    for id in ALPHABET_SIZE as usize..=start_rule {
        old_of_new[new_id[id] as usize] = id;
    }

    let mut store = JaggedArray::new(encoding, start_rule + 1);
    let mut buf: Vec<u32> = Vec::new();
    for slot in ALPHABET_SIZE as usize..=start_rule {
        let old = old_of_new[slot];
        let rhs = if old == start_rule {
            start
        } else {
            &rules[old - ALPHABET_SIZE as usize]
        };
        buf.clear();
        buf.extend(rhs.iter().map(|&code| new_id[code as usize]));
        store.set(slot, &buf);
    }
    store
}
