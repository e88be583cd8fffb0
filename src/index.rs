//! Succinct index over the start rule for position-to-symbol queries.
//!
//! The index stores two sparse position sets built from the canonically
//! ordered grammar. The first marks the text position at which each
//! start-rule symbol begins, so a predecessor query maps any text position
//! to the symbol covering it. The second marks the rule ids at which a new
//! expansion length first appears; because rules are ordered by expansion
//! length, a rank over it plus a compact array of the distinct lengths
//! recovers any rule's expansion length.

use crate::cfg::Grammar;
use crate::sparse::SparseSet;

/// Rank/select index mapping text positions to start-rule symbols, plus a
/// compact map from rule ids to expansion lengths.
///
/// Built once from a post-processed [`Grammar`]; queries borrow the
/// grammar and never allocate.
pub struct GrammarIndex<'g> {
    grammar: &'g Grammar,
    /// Text positions at which a start-rule symbol begins.
    start_positions: SparseSet,
    /// Rule ids whose expansion length exceeds every smaller id's.
    expansion_marks: SparseSet,
    /// The distinct expansion lengths, ascending; entry 0 is the
    /// terminals' length 1.
    expansion_lens: Box<[usize]>,
}

impl<'g> GrammarIndex<'g> {
    /// Builds the index over `grammar`.
    pub fn new(grammar: &'g Grammar) -> Self {
        let sizes = grammar.expansion_sizes();
        let start_rule = grammar.start_rule();

        let mut positions = Vec::with_capacity(grammar.start_size());
        let mut pos = 0usize;
        for i in 0..grammar.start_size() {
            let code = grammar.get(start_rule, i);
            positions.push(pos);
            pos += sizes[code as usize];
        }
        debug_assert_eq!(pos, grammar.text_len());
        let start_positions = SparseSet::new(&positions, grammar.text_len());

        let mut marks = Vec::new();
        let mut lens = vec![1usize];
        let mut previous = 1usize;
        for (id, &size) in sizes.iter().enumerate() {
            if size > previous {
                marks.push(id);
                lens.push(size);
                previous = size;
            }
        }
        let expansion_marks = SparseSet::new(&marks, start_rule as usize);

        Self {
            grammar,
            start_positions,
            expansion_marks,
            expansion_lens: lens.into_boxed_slice(),
        }
    }

    #[inline]
    /// The grammar this index was built over.
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// The start-rule symbol covering text position `pos`: its index in
    /// the start rule and the text position at which its expansion begins.
    #[inline]
    pub fn locate(&self, pos: usize) -> (usize, usize) {
        self.start_positions
            .predecessor(pos)
            .expect("position 0 is always a symbol boundary")
    }

    /// Expansion length of `rule`, valid for any id below the start rule.
    #[inline]
    pub fn expansion_size(&self, rule: u32) -> usize {
        self.expansion_lens[self.expansion_marks.rank(rule as usize + 1)]
    }

    /// Heap footprint of the position sets and the length map in bytes.
    pub fn mem_size(&self) -> usize {
        self.start_positions.mem_size()
            + self.expansion_marks.mem_size()
            + self.expansion_lens.len() * std::mem::size_of::<usize>()
    }
}
