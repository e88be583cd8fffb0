//! Jagged array storage for grammar rules.
//!
//! A jagged array is an indexed collection of variable-length code
//! sequences. Four physical encodings share one operation set: a plain
//! `u32` layout and three bit-packed layouts that differ only in how the
//! field width of a slot is chosen. The loader and the decoder are written
//! against the common operations and never inspect the encoding.
//!
//! The bit-packed encodings store codes shifted up by one so that a zero
//! field terminates the row; the terminator is never returned, it maps to
//! [`DUMMY_CODE`] on read. They also require slots to be filled in
//! ascending order. The canonical rule order guarantees this and
//! additionally that every code stored in slot `r` is smaller than `r`,
//! which is what lets [`Encoding::BpIndex`] derive its widths from the
//! slot id alone.

use crate::bitpack::{bit_width, pack, packed_len, unpack};
use crate::sparse::SparseSet;

/// Out-of-band marker returned by [`JaggedArray::get`] one past the last
/// code of a slot. It is never a legal code.
pub const DUMMY_CODE: u32 = u32::MAX;

/// Physical encoding of the rule store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Encoding {
    /// One machine integer per code; the fastest to read.
    #[strum(serialize = "array")]
    Plain,
    /// Bit-packed, the width of slot `r` derived from `r` itself.
    #[strum(serialize = "bpleft")]
    BpIndex,
    /// Bit-packed with the tightest width per slot; the widths live in a
    /// side table that is itself bit-packed.
    #[strum(serialize = "bpright")]
    BpOpt,
    /// Bit-packed with monotone non-decreasing widths; the side table
    /// shrinks to the distinct widths plus a sparse rank structure.
    #[strum(serialize = "bpmono")]
    BpMono,
}

/// An indexed collection of variable-length code sequences.
///
/// Reading one past the end of a slot yields [`DUMMY_CODE`]; reading any
/// further is a programmer error and may panic.
#[derive(Debug)]
pub enum JaggedArray {
    /// Plain `u32` rows.
    Plain(PlainArray),
    /// Widths derived from slot ids.
    BpIndex(BpIndexArray),
    /// Tightest width per slot.
    BpOpt(BpOptArray),
    /// Monotone widths.
    BpMono(BpMonoArray),
}

impl JaggedArray {
    /// Creates an empty array with `slots` slots.
    pub fn new(encoding: Encoding, slots: usize) -> Self {
        match encoding {
            Encoding::Plain => Self::Plain(PlainArray::new(slots)),
            Encoding::BpIndex => Self::BpIndex(BpIndexArray::new(slots)),
            Encoding::BpOpt => Self::BpOpt(BpOptArray::new(slots)),
            Encoding::BpMono => Self::BpMono(BpMonoArray::new(slots)),
        }
    }

    /// The encoding this array was created with.
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Plain(_) => Encoding::Plain,
            Self::BpIndex(_) => Encoding::BpIndex,
            Self::BpOpt(_) => Encoding::BpOpt,
            Self::BpMono(_) => Encoding::BpMono,
        }
    }

    /// Stores `values` at `slot`, replacing any previous contents.
    ///
    /// The bit-packed encodings expect ascending slot order; the side
    /// tables of [`Encoding::BpOpt`] and [`Encoding::BpMono`] are
    /// finalised when the last slot is set.
    pub fn set(&mut self, slot: usize, values: &[u32]) {
        match self {
            Self::Plain(a) => a.set(slot, values),
            Self::BpIndex(a) => a.set(slot, values),
            Self::BpOpt(a) => a.set(slot, values),
            Self::BpMono(a) => a.set(slot, values),
        }
    }

    /// Releases the storage of `slot`.
    pub fn clear(&mut self, slot: usize) {
        match self {
            Self::Plain(a) => a.clear(slot),
            Self::BpIndex(a) => a.rows.clear(slot),
            Self::BpOpt(a) => a.rows.clear(slot),
            Self::BpMono(a) => a.rows.clear(slot),
        }
    }

    /// Reads the `i`-th code of `slot`; `i` equal to the slot length
    /// yields [`DUMMY_CODE`].
    #[inline]
    pub fn get(&self, slot: usize, i: usize) -> u32 {
        match self {
            Self::Plain(a) => a.get(slot, i),
            Self::BpIndex(a) => a.rows.get(slot, BpIndexArray::width(slot), i),
            Self::BpOpt(a) => a.rows.get(slot, a.width(slot), i),
            Self::BpMono(a) => a.rows.get(slot, a.width(slot), i),
        }
    }

    /// Live heap footprint of the stored codes and side tables in bytes.
    pub fn mem_size(&self) -> usize {
        match self {
            Self::Plain(a) => a.mem_size(),
            Self::BpIndex(a) => a.rows.mem_size(),
            Self::BpOpt(a) => a.mem_size(),
            Self::BpMono(a) => a.mem_size(),
        }
    }
}

/// The baseline encoding: one boxed `u32` slice per slot.
#[derive(Debug)]
pub struct PlainArray {
    rows: Vec<Box<[u32]>>,
}

impl PlainArray {
    fn new(slots: usize) -> Self {
        Self {
            rows: vec![Box::default(); slots],
        }
    }

    fn set(&mut self, slot: usize, values: &[u32]) {
        self.rows[slot] = values.into();
    }

    fn clear(&mut self, slot: usize) {
        self.rows[slot] = Box::default();
    }

    #[inline]
    fn get(&self, slot: usize, i: usize) -> u32 {
        let row = &self.rows[slot];
        if i == row.len() {
            DUMMY_CODE
        } else {
            row[i]
        }
    }

    fn mem_size(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.len() * std::mem::size_of::<u32>())
            .sum()
    }
}

/// Packed rows shared by the bit-packed encodings. Codes are stored
/// shifted up by one so that a zero field, which also covers the padding
/// bits of the last byte, terminates the row.
#[derive(Debug)]
struct PackedRows {
    rows: Vec<Box<[u8]>>,
}

impl PackedRows {
    fn new(slots: usize) -> Self {
        Self {
            rows: vec![Box::default(); slots],
        }
    }

    fn set(&mut self, slot: usize, width: usize, values: &[u32]) {
        debug_assert!(values.iter().all(|&v| v < DUMMY_CODE));
        let shifted: Vec<u64> = values.iter().map(|&v| v as u64 + 1).collect();
        // one extra zero field terminates the row
        let mut buf = vec![0u8; packed_len(width, values.len() + 1)];
        pack(&mut buf, width, &shifted);
        self.rows[slot] = buf.into_boxed_slice();
    }

    fn clear(&mut self, slot: usize) {
        self.rows[slot] = Box::default();
    }

    #[inline]
    fn get(&self, slot: usize, width: usize, i: usize) -> u32 {
        let row = &self.rows[slot];
        if row.is_empty() {
            return DUMMY_CODE;
        }
        match unpack(row, width, i) {
            0 => DUMMY_CODE,
            code => (code - 1) as u32,
        }
    }

    fn mem_size(&self) -> usize {
        self.rows.iter().map(|row| row.len()).sum()
    }
}

/// Widths follow from the slot id: every code in slot `r` is smaller than
/// `r`, so `bit_width(r)` bits always fit the shifted codes and no table
/// is needed.
#[derive(Debug)]
pub struct BpIndexArray {
    rows: PackedRows,
}

impl BpIndexArray {
    fn new(slots: usize) -> Self {
        Self {
            rows: PackedRows::new(slots),
        }
    }

    #[inline]
    fn width(slot: usize) -> usize {
        bit_width(slot as u64)
    }

    fn set(&mut self, slot: usize, values: &[u32]) {
        debug_assert!(values.iter().all(|&v| (v as usize) < slot));
        self.rows.set(slot, Self::width(slot), values);
    }
}

/// Each slot packed with the smallest width covering its values; the
/// widths live in a dense table that is bit-packed once the last slot is
/// set.
#[derive(Debug)]
pub struct BpOptArray {
    rows: PackedRows,
    widths: WidthTable,
}

#[derive(Debug)]
enum WidthTable {
    /// One byte per slot while the array is being filled.
    Dense(Vec<u8>),
    /// All slot widths packed with the maximum width.
    Packed { bytes: Box<[u8]>, width: usize },
}

/// Smallest width that fits every value of the slot once shifted.
fn fitting_width(values: &[u32]) -> usize {
    values
        .iter()
        .map(|&v| bit_width(v as u64 + 1))
        .max()
        .unwrap_or(1)
}

impl BpOptArray {
    fn new(slots: usize) -> Self {
        Self {
            rows: PackedRows::new(slots),
            widths: WidthTable::Dense(vec![0; slots]),
        }
    }

    fn set(&mut self, slot: usize, values: &[u32]) {
        let width = fitting_width(values);
        let WidthTable::Dense(widths) = &mut self.widths else {
            panic!("slot {slot} set after the width table was finalised");
        };
        widths[slot] = width as u8;
        self.rows.set(slot, width, values);
        if slot == widths.len() - 1 {
            self.index_widths();
        }
    }

    fn index_widths(&mut self) {
        let WidthTable::Dense(widths) = &self.widths else {
            return;
        };
        let max = widths.iter().copied().max().unwrap_or(1).max(1) as usize;
        let mut bytes = vec![0u8; packed_len(max, widths.len())];
        pack(&mut bytes, max, widths);
        self.widths = WidthTable::Packed {
            bytes: bytes.into_boxed_slice(),
            width: max,
        };
    }

    #[inline]
    fn width(&self, slot: usize) -> usize {
        match &self.widths {
            WidthTable::Dense(widths) => widths[slot] as usize,
            WidthTable::Packed { bytes, width } => unpack(bytes, *width, slot) as usize,
        }
    }

    fn mem_size(&self) -> usize {
        let table = match &self.widths {
            WidthTable::Dense(widths) => widths.len(),
            WidthTable::Packed { bytes, .. } => bytes.len(),
        };
        self.rows.mem_size() + table
    }
}

/// Each slot packed with the larger of its own tightest width and the
/// preceding slot's width, so widths never decrease. Once the last slot is
/// set the table shrinks to the distinct widths plus the slots at which
/// the width first increases.
#[derive(Debug)]
pub struct BpMonoArray {
    rows: PackedRows,
    widths: MonoWidths,
}

#[derive(Debug)]
enum MonoWidths {
    /// One byte per slot while the array is being filled.
    Dense(Vec<u8>),
    /// Distinct widths in slot order; entry 0 covers the slots before the
    /// first increase.
    Indexed {
        distinct: Box<[u8]>,
        marks: SparseSet,
    },
}

impl BpMonoArray {
    fn new(slots: usize) -> Self {
        Self {
            rows: PackedRows::new(slots),
            widths: MonoWidths::Dense(vec![0; slots]),
        }
    }

    fn set(&mut self, slot: usize, values: &[u32]) {
        let MonoWidths::Dense(widths) = &mut self.widths else {
            panic!("slot {slot} set after the width table was finalised");
        };
        let mut width = fitting_width(values);
        if slot > 0 {
            width = width.max(widths[slot - 1] as usize);
        }
        widths[slot] = width as u8;
        self.rows.set(slot, width, values);
        if slot == widths.len() - 1 {
            self.index_widths();
        }
    }

    fn index_widths(&mut self) {
        let MonoWidths::Dense(widths) = &self.widths else {
            return;
        };
        let mut distinct = vec![widths[0]];
        let mut positions = Vec::new();
        for (slot, &width) in widths.iter().enumerate().skip(1) {
            if width != widths[slot - 1] {
                distinct.push(width);
                positions.push(slot);
            }
        }
        let marks = SparseSet::new(&positions, widths.len());
        self.widths = MonoWidths::Indexed {
            distinct: distinct.into_boxed_slice(),
            marks,
        };
    }

    #[inline]
    fn width(&self, slot: usize) -> usize {
        match &self.widths {
            MonoWidths::Dense(widths) => widths[slot] as usize,
            MonoWidths::Indexed { distinct, marks } => distinct[marks.rank(slot + 1)] as usize,
        }
    }

    fn mem_size(&self) -> usize {
        let table = match &self.widths {
            MonoWidths::Dense(widths) => widths.len(),
            MonoWidths::Indexed { distinct, marks } => distinct.len() + marks.mem_size(),
        };
        self.rows.mem_size() + table
    }
}
