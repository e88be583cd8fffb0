//! Decoding of text ranges by walking the derivation tree.
//!
//! A query first asks the [`GrammarIndex`] for the start-rule symbol
//! covering its begin position, then descends into that symbol's
//! derivation, skipping whole subtrees by their expansion length, until it
//! stands on the exact starting terminal. From there it expands symbols
//! left to right, emitting bytes until the requested length is reached.
//! The descent phase emits nothing and the stacks never grow beyond the
//! grammar depth.

use crate::cfg::ALPHABET_SIZE;
use crate::index::GrammarIndex;
use crate::jagged::DUMMY_CODE;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
/// The error type for rejected extraction queries.
pub enum ExtractError {
    #[error("range {begin}..={end} is outside the text of length {len}")]
    /// The query does not denote a non-empty range inside the text.
    OutOfRange {
        /// The requested first position.
        begin: usize,
        /// The requested last position.
        end: usize,
        /// The length of the text the grammar derives.
        len: usize,
    },
}

/// Extracts text ranges from an indexed grammar.
///
/// The extractor owns two scratch stacks preallocated to the grammar
/// depth, so extraction allocates nothing. Concurrent readers should each
/// hold their own extractor over a shared index.
pub struct Extractor<'g> {
    index: &'g GrammarIndex<'g>,
    rule_stack: Vec<u32>,
    pos_stack: Vec<usize>,
}

impl<'g> Extractor<'g> {
    /// Creates an extractor over `index`.
    pub fn new(index: &'g GrammarIndex<'g>) -> Self {
        let depth = index.grammar().depth();
        Self {
            index,
            rule_stack: Vec::with_capacity(depth + 1),
            pos_stack: Vec::with_capacity(depth + 1),
        }
    }

    /// Returns `text[begin..=end]`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::OutOfRange`] if `begin > end` or
    /// `end >= text_len`.
    pub fn extract(&mut self, begin: usize, end: usize) -> Result<Vec<u8>, ExtractError> {
        let mut out = Vec::with_capacity(end.saturating_sub(begin) + 1);
        self.extract_into(&mut out, begin, end)?;
        Ok(out)
    }

    /// Appends `text[begin..=end]` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::OutOfRange`] if `begin > end` or
    /// `end >= text_len`; nothing has been appended in that case.
    pub fn extract_into(
        &mut self,
        out: &mut Vec<u8>,
        begin: usize,
        end: usize,
    ) -> Result<(), ExtractError> {
        let grammar = self.index.grammar();
        let len = grammar.text_len();
        if begin > end || end >= len {
            return Err(ExtractError::OutOfRange { begin, end, len });
        }
        self.rule_stack.clear();
        self.pos_stack.clear();

        // the start-rule symbol covering `begin`
        let (symbol, position) = self.index.locate(begin);
        let mut rule = grammar.start_rule();
        let mut i = symbol;
        let mut ignore = begin - position;

        // descend to the terminal at offset `ignore` without emitting
        while ignore > 0 {
            let code = grammar.get(rule, i);
            if code < ALPHABET_SIZE {
                i += 1;
                ignore -= 1;
            } else {
                let size = self.index.expansion_size(code);
                if size > ignore {
                    self.rule_stack.push(rule);
                    self.pos_stack.push(i + 1);
                    rule = code;
                    i = 0;
                } else {
                    ignore -= size;
                    i += 1;
                }
            }
        }

        // emit end - begin + 1 bytes
        let length = end - begin + 1;
        let mut emitted = 0;
        while emitted < length {
            let code = grammar.get(rule, i);
            if code == DUMMY_CODE {
                rule = self.rule_stack.pop().expect("unbalanced rule stack");
                i = self.pos_stack.pop().expect("unbalanced position stack");
            } else if code < ALPHABET_SIZE {
                out.push(code as u8);
                i += 1;
                emitted += 1;
            } else {
                self.rule_stack.push(rule);
                self.pos_stack.push(i + 1);
                rule = code;
                i = 0;
            }
        }
        Ok(())
    }
}
