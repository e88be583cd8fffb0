use repax::{
    bitpack, Encoding, ExtractError, Extractor, Grammar, GrammarIndex, JaggedArray, ALPHABET_SIZE,
    DUMMY_CODE,
};

const ENCODINGS: [Encoding; 4] = [
    Encoding::Plain,
    Encoding::BpIndex,
    Encoding::BpOpt,
    Encoding::BpMono,
];

fn t(byte: u8) -> u32 {
    byte as u32
}

/// Expands a grammar by naive substitution, independently of the decoder.
/// Rules are given in their pre-reorder positions.
fn reference_text(rules: &[Vec<u32>], start: &[u32]) -> Vec<u8> {
    fn expand(code: u32, rules: &[Vec<u32>], out: &mut Vec<u8>) {
        if code < ALPHABET_SIZE {
            out.push(code as u8);
        } else {
            for &child in &rules[(code - ALPHABET_SIZE) as usize] {
                expand(child, rules, out);
            }
        }
    }
    let mut out = Vec::new();
    for &code in start {
        expand(code, rules, &mut out);
    }
    out
}

/// R1 -> "ab", R2 -> R1 R1, start -> R2 'c' R2; derives "ababcabab".
fn depth_three_parts() -> (Vec<Vec<u32>>, Vec<u32>) {
    let rules = vec![vec![t(b'a'), t(b'b')], vec![256, 256]];
    let start = vec![257, t(b'c'), 257];
    (rules, start)
}

#[test]
fn single_terminal_grammar() {
    let grammar = Grammar::from_parts(vec![], vec![t(b'a')], Encoding::Plain).unwrap();
    assert_eq!(grammar.text_len(), 1);
    assert_eq!(grammar.num_rules(), 0);
    assert_eq!(grammar.start_rule(), ALPHABET_SIZE);
    assert_eq!(grammar.depth(), 2);

    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(0, 0).unwrap(), b"a");
}

#[test]
fn flat_start_rule() {
    let rules = vec![vec![t(b'a'), t(b'b')]];
    let start = vec![256, 256, 256];
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    assert_eq!(grammar.text_len(), 6);

    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(0, 5).unwrap(), b"ababab");
    assert_eq!(extractor.extract(2, 3).unwrap(), b"ab");
    assert_eq!(extractor.extract(1, 4).unwrap(), b"baba");
}

#[test]
fn depth_three_grammar() {
    let (rules, start) = depth_three_parts();
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    assert_eq!(grammar.text_len(), 9);
    assert_eq!(grammar.depth(), 4);

    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(3, 5).unwrap(), b"bca");
    assert_eq!(extractor.extract(0, 8).unwrap(), b"ababcabab");
}

#[test]
fn reorder_is_shortest_expansion_first() {
    // given longest first: R1 -> R2 R2, R2 -> "xy"
    let rules = vec![vec![257, 257], vec![t(b'x'), t(b'y')]];
    let start = vec![256];
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();

    // after the reorder the two-byte rule owns the smaller id
    assert_eq!(grammar.get(256, 0), t(b'x'));
    assert_eq!(grammar.get(256, 1), t(b'y'));
    assert_eq!(grammar.get(257, 0), 256);
    assert_eq!(grammar.get(257, 2), DUMMY_CODE);

    let index = GrammarIndex::new(&grammar);
    assert_eq!(index.expansion_size(256), 2);
    assert_eq!(index.expansion_size(257), 4);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(0, 3).unwrap(), b"xyxy");
}

#[test]
fn reorder_keeps_ties_in_input_order() {
    let rules = vec![
        vec![t(b'a'), t(b'b')],
        vec![t(b'c'), t(b'd')],
        vec![256, 257],
    ];
    let start = vec![258];
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    assert_eq!(grammar.get(256, 0), t(b'a'));
    assert_eq!(grammar.get(257, 0), t(b'c'));
    assert_eq!(grammar.get(258, 1), 257);
}

#[test]
fn boundary_descent_spans_adjacent_symbols() {
    // two thousand-byte expansions side by side in the start rule
    let mut left = vec![t(b'a'); 1000];
    left[999] = t(b'b');
    let mut right = vec![t(b'd'); 1000];
    right[0] = t(b'c');
    let grammar =
        Grammar::from_parts(vec![left, right], vec![256, 257], Encoding::Plain).unwrap();
    assert_eq!(grammar.text_len(), 2000);

    let index = GrammarIndex::new(&grammar);
    assert_eq!(index.expansion_size(256), 1000);
    assert_eq!(index.expansion_size(257), 1000);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(999, 1000).unwrap(), b"bc");
    assert_eq!(extractor.extract(0, 0).unwrap(), b"a");
    assert_eq!(extractor.extract(1999, 1999).unwrap(), b"d");
}

#[test]
fn single_positions_on_and_off_symbol_boundaries() {
    let (rules, start) = depth_three_parts();
    let expected = reference_text(&rules, &start);
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    for i in 0..grammar.text_len() {
        assert_eq!(extractor.extract(i, i).unwrap(), &expected[i..=i], "at {i}");
    }
    // position 4 starts the second start-rule symbol, position 5 does not
    assert_eq!(index.locate(4), (1, 4));
    assert_eq!(index.locate(5), (2, 5));
}

#[test]
fn out_of_range_queries_are_rejected() {
    let (rules, start) = depth_three_parts();
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    assert_eq!(
        extractor.extract(5, 4),
        Err(ExtractError::OutOfRange {
            begin: 5,
            end: 4,
            len: 9
        })
    );
    assert_eq!(
        extractor.extract(0, 9),
        Err(ExtractError::OutOfRange {
            begin: 0,
            end: 9,
            len: 9
        })
    );
    assert!(extractor.extract(9, 9).is_err());
}

#[test]
fn extraction_is_total_and_consistent_with_the_reference() {
    let (rules, start) = depth_three_parts();
    let expected = reference_text(&rules, &start);
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    let n = grammar.text_len();
    assert_eq!(extractor.extract(0, n - 1).unwrap(), expected);
    for begin in 0..n {
        for end in begin..n {
            let got = extractor.extract(begin, end).unwrap();
            assert_eq!(got.len(), end - begin + 1);
            assert_eq!(got, &expected[begin..=end], "range {begin}..={end}");
        }
    }
}

#[test]
fn all_encodings_decode_identically() {
    let (rules, start) = depth_three_parts();
    let expected = reference_text(&rules, &start);
    for encoding in ENCODINGS {
        let grammar = Grammar::from_parts(rules.clone(), start.clone(), encoding).unwrap();
        assert_eq!(grammar.encoding(), encoding);
        let index = GrammarIndex::new(&grammar);
        let mut extractor = Extractor::new(&index);
        assert_eq!(extractor.extract(0, 8).unwrap(), expected, "{encoding}");
        assert_eq!(extractor.extract(3, 5).unwrap(), b"bca", "{encoding}");
    }
}

#[test]
fn bit_packed_encodings_are_smaller_on_wide_grammars() {
    // a few hundred pair rules so the plain layout pays for its u32s
    let mut rules = vec![vec![t(b'a'), t(b'b')]];
    for k in 1..300u32 {
        rules.push(vec![255 + k, t(b'a')]);
    }
    let start = vec![255 + 300, 256];
    let expected = reference_text(&rules, &start);
    let mut sizes = Vec::new();
    for encoding in ENCODINGS {
        let grammar = Grammar::from_parts(rules.clone(), start.clone(), encoding).unwrap();
        let index = GrammarIndex::new(&grammar);
        let mut extractor = Extractor::new(&index);
        let n = grammar.text_len();
        assert_eq!(extractor.extract(0, n - 1).unwrap(), expected, "{encoding}");
        sizes.push(grammar.mem_size());
    }
    assert!(sizes[1] < sizes[0], "bpleft {} vs array {}", sizes[1], sizes[0]);
    assert!(sizes[2] < sizes[0], "bpright {} vs array {}", sizes[2], sizes[0]);
    assert!(sizes[3] < sizes[0], "bpmono {} vs array {}", sizes[3], sizes[0]);
}

#[test]
fn deep_grammars_do_not_overflow_the_native_stack() {
    // R_k -> 'a' R_{k-1}, fifteen hundred levels deep
    let mut rules = vec![vec![t(b'a'), t(b'b')]];
    for k in 1..1500u32 {
        rules.push(vec![t(b'a'), 255 + k]);
    }
    let start = vec![255 + 1500];
    let grammar = Grammar::from_parts(rules, start, Encoding::BpMono).unwrap();
    assert_eq!(grammar.text_len(), 1501);
    assert_eq!(grammar.depth(), 1502);

    let index = GrammarIndex::new(&grammar);
    let mut extractor = Extractor::new(&index);
    assert_eq!(extractor.extract(0, 2).unwrap(), b"aaa");
    assert_eq!(extractor.extract(1499, 1500).unwrap(), b"ab");
    assert_eq!(extractor.extract(750, 752).unwrap(), b"aaa");
}

#[test]
fn index_matches_recomputed_expansion_lengths() {
    let (rules, start) = depth_three_parts();
    let grammar = Grammar::from_parts(rules, start, Encoding::BpIndex).unwrap();
    let index = GrammarIndex::new(&grammar);

    for terminal in [0u32, b'a' as u32, 255] {
        assert_eq!(index.expansion_size(terminal), 1);
    }
    let mut previous = 1;
    for rule in ALPHABET_SIZE..grammar.start_rule() {
        let mut sum = 0;
        let mut i = 0;
        loop {
            let code = grammar.get(rule, i);
            if code == DUMMY_CODE {
                break;
            }
            sum += index.expansion_size(code);
            i += 1;
        }
        assert_eq!(index.expansion_size(rule), sum, "rule {rule}");
        assert!(sum >= previous, "expansion lengths must not decrease");
        previous = sum;
    }

    // the start rule's symbols tile the whole text
    let mut pos = 0;
    for i in 0..grammar.start_size() {
        assert_eq!(index.locate(pos), (i, pos));
        pos += index.expansion_size(grammar.get(grammar.start_rule(), i));
    }
    assert_eq!(pos, grammar.text_len());
}

#[test]
fn rebuilding_the_index_is_idempotent() {
    let (rules, start) = depth_three_parts();
    let grammar = Grammar::from_parts(rules, start, Encoding::Plain).unwrap();
    let first = GrammarIndex::new(&grammar);
    let second = GrammarIndex::new(&grammar);
    for pos in 0..grammar.text_len() {
        assert_eq!(first.locate(pos), second.locate(pos));
    }
    for rule in 0..grammar.start_rule() {
        assert_eq!(first.expansion_size(rule), second.expansion_size(rule));
    }
    assert_eq!(first.mem_size(), second.mem_size());
}

#[test]
fn degenerate_grammars_are_rejected() {
    use repax::LoadGrammarError;

    let err = Grammar::from_parts(vec![], vec![], Encoding::Plain).unwrap_err();
    assert!(matches!(err, LoadGrammarError::EmptyText));

    let err = Grammar::from_parts(vec![vec![t(b'a')]], vec![256], Encoding::Plain).unwrap_err();
    assert!(matches!(err, LoadGrammarError::DegenerateRule(256, 1)));

    // 999 names no rule in a grammar whose ids stop at 257
    let err =
        Grammar::from_parts(vec![vec![999, t(b'a')]], vec![256], Encoding::Plain).unwrap_err();
    assert!(matches!(err, LoadGrammarError::DanglingCode(256, 999)));

    // R1 -> R2 'a', R2 -> R1 'b'
    let err = Grammar::from_parts(
        vec![vec![257, t(b'a')], vec![256, t(b'b')]],
        vec![256],
        Encoding::Plain,
    )
    .unwrap_err();
    assert!(matches!(err, LoadGrammarError::CyclicRule(_)));

    let err =
        Grammar::from_parts(vec![vec![256, t(b'a')]], vec![256], Encoding::Plain).unwrap_err();
    assert!(matches!(err, LoadGrammarError::CyclicRule(256)));
}

#[test]
fn jagged_array_slots_can_be_cleared() {
    for encoding in ENCODINGS {
        let mut array = JaggedArray::new(encoding, 300);
        for slot in 256..300 {
            let codes = [slot as u32 - 1, t(b'z'), 7];
            array.set(slot, &codes);
        }
        assert_eq!(array.get(299, 0), 298);
        assert_eq!(array.get(299, 1), t(b'z'));
        assert_eq!(array.get(299, 3), DUMMY_CODE);

        let before = array.mem_size();
        array.clear(299);
        assert_eq!(array.get(299, 0), DUMMY_CODE, "{encoding}");
        assert!(array.mem_size() < before, "{encoding}");
    }
}

#[test]
fn packing_roundtrips_across_byte_boundaries() {
    let values = [0u64, 1, 5, 127, 128, 255, 256, 300, 511, 0, 42];
    for width in [9, 10, 13, 16, 21, 32, 47, 64] {
        let mut packed = vec![0u8; bitpack::packed_len(width, values.len())];
        bitpack::pack(&mut packed, width, &values);
        for (i, &value) in values.iter().enumerate() {
            assert_eq!(bitpack::unpack(&packed, width, i), value, "width {width}");
        }
    }
    // narrow widths truncate to the field size
    let mut packed = vec![0u8; bitpack::packed_len(3, 4)];
    bitpack::pack(&mut packed, 3, &[5u64, 7, 1, 6]);
    assert_eq!(packed.len(), 2);
    for (i, value) in [5u64, 7, 1, 6].into_iter().enumerate() {
        assert_eq!(bitpack::unpack(&packed, 3, i), value);
    }
    // bit 0 is the most significant bit of the first byte
    let mut one = vec![0u8; 1];
    bitpack::pack(&mut one, 3, &[0b101u64]);
    assert_eq!(one[0], 0b1010_0000);
}
