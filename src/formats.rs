//! File-format adapters for the RePair-family compressor outputs.
//!
//! All three adapters produce the same shape, raw rule rows plus the start
//! rule's symbol sequence, and hand it to [`Grammar::from_parts`] for
//! post-processing. The layouts are reproduced byte for byte from the
//! compressors: ASCII decimal for MR-RePair, host-endian 32-bit integers
//! for Navarro and Big-RePair.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};

use byteorder::{NativeEndian, ReadBytesExt};

use crate::cfg::{Grammar, LoadGrammarError, ALPHABET_SIZE};
use crate::jagged::Encoding;

/// The compressor family that produced a grammar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum GrammarKind {
    /// MR-RePair ASCII output (`<stem>.out`).
    #[strum(serialize = "mrrepair")]
    MrRepair,
    /// Navarro RePair binary output (`<stem>.C`, `<stem>.R`).
    #[strum(serialize = "navarro")]
    Navarro,
    /// Big-RePair binary output (`<stem>.C`, `<stem>.R`).
    #[strum(serialize = "bigrepair")]
    BigRepair,
}

/// The on-disk terminator for MR-RePair right-hand sides.
const MR_REPAIR_DUMMY: u64 = 0;

/// `<stem>.<ext>` without touching any extension `stem` already carries.
fn with_suffix(stem: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// One decimal integer per line.
struct AsciiCodes {
    lines: Lines<BufReader<File>>,
}

impl AsciiCodes {
    fn new(file: File) -> Self {
        Self {
            lines: BufReader::new(file).lines(),
        }
    }

    fn next(&mut self) -> Result<u64, LoadGrammarError> {
        let line = self
            .lines
            .next()
            .ok_or_else(|| LoadGrammarError::Malformed("unexpected end of file".into()))??;
        line.trim()
            .parse()
            .map_err(|_| LoadGrammarError::Malformed(format!("expected an integer, got {line:?}")))
    }

    fn next_code(&mut self) -> Result<u32, LoadGrammarError> {
        let code = self.next()?;
        u32::try_from(code)
            .map_err(|_| LoadGrammarError::Malformed(format!("code {code} does not fit 32 bits")))
    }
}

impl Grammar {
    /// Loads a grammar of the given kind from `stem`, appending the
    /// format's file extension(s).
    ///
    /// # Errors
    ///
    /// Returns a [`LoadGrammarError`] if a file cannot be read or does
    /// not describe a valid grammar.
    pub fn from_files(
        kind: GrammarKind,
        stem: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<Self, LoadGrammarError> {
        let stem = stem.as_ref();
        match kind {
            GrammarKind::MrRepair => Self::from_mr_repair_file(with_suffix(stem, "out"), encoding),
            GrammarKind::Navarro => Self::from_navarro_files(
                with_suffix(stem, "C"),
                with_suffix(stem, "R"),
                encoding,
            ),
            GrammarKind::BigRepair => Self::from_big_repair_files(
                with_suffix(stem, "C"),
                with_suffix(stem, "R"),
                encoding,
            ),
        }
    }

    /// Loads an MR-RePair grammar from its ASCII `.out` file.
    ///
    /// The first three lines declare the text length, the number of rules
    /// and the start rule's length. Rule right-hand sides follow, one code
    /// per line, each terminated by a `0` line; the start rule's codes
    /// close the file. The declared text length is verified against the
    /// length the grammar actually derives.
    pub fn from_mr_repair_file(
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<Self, LoadGrammarError> {
        let mut codes = AsciiCodes::new(File::open(path)?);
        let text_len = codes.next()? as usize;
        let num_rules = codes.next()? as usize;
        let start_size = codes.next()? as usize;

        let mut rules = Vec::with_capacity(num_rules);
        for _ in 0..num_rules {
            let mut rhs = Vec::new();
            loop {
                let code = codes.next()?;
                if code == MR_REPAIR_DUMMY {
                    break;
                }
                rhs.push(u32::try_from(code).map_err(|_| {
                    LoadGrammarError::Malformed(format!("code {code} does not fit 32 bits"))
                })?);
            }
            rules.push(rhs);
        }
        let mut start = Vec::with_capacity(start_size);
        for _ in 0..start_size {
            start.push(codes.next_code()?);
        }

        let grammar = Self::from_parts(rules, start, encoding)?;
        if grammar.text_len() != text_len {
            return Err(LoadGrammarError::TextLengthMismatch {
                declared: text_len,
                derived: grammar.text_len(),
            });
        }
        Ok(grammar)
    }

    /// Loads a Navarro RePair grammar from its `.C` and `.R` files.
    ///
    /// `.R` starts with the alphabet size `A` as a 32-bit integer and `A`
    /// bytes mapping the compressed terminals to original byte values,
    /// followed by binary rule pairs of 32-bit integers; `.C` is the start
    /// rule as 32-bit integers. Codes below `A` are terminals through the
    /// map, larger codes are rules re-based to [`ALPHABET_SIZE`].
    pub fn from_navarro_files(
        c_path: impl AsRef<Path>,
        r_path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<Self, LoadGrammarError> {
        let r_path = r_path.as_ref();
        let r_len = std::fs::metadata(r_path)?.len() as usize;
        let mut r_file = BufReader::new(File::open(r_path)?);

        let alphabet = r_file.read_i32::<NativeEndian>()?;
        if !(1..=ALPHABET_SIZE as i32).contains(&alphabet) {
            return Err(LoadGrammarError::InvalidAlphabetSize(alphabet as i64));
        }
        let alphabet = alphabet as usize;
        let mut map = [0u8; ALPHABET_SIZE as usize];
        r_file.read_exact(&mut map[..alphabet])?;

        let remap = |code: i32| -> Result<u32, LoadGrammarError> {
            if code < 0 {
                return Err(LoadGrammarError::Malformed(format!("negative code {code}")));
            }
            let code = code as usize;
            Ok(if code < alphabet {
                map[code] as u32
            } else {
                (code - alphabet) as u32 + ALPHABET_SIZE
            })
        };

        let body = r_len
            .checked_sub(4 + alphabet)
            .filter(|body| body % 8 == 0)
            .ok_or_else(|| {
                LoadGrammarError::Malformed(format!(
                    ".R size {r_len} does not hold whole rule pairs"
                ))
            })?;
        let num_rules = body / 8;
        let mut rules = Vec::with_capacity(num_rules);
        for _ in 0..num_rules {
            let left = remap(r_file.read_i32::<NativeEndian>()?)?;
            let right = remap(r_file.read_i32::<NativeEndian>()?)?;
            rules.push(vec![left, right]);
        }

        let c_path = c_path.as_ref();
        let c_len = std::fs::metadata(c_path)?.len() as usize;
        if c_len % 4 != 0 {
            return Err(LoadGrammarError::Malformed(format!(
                ".C size {c_len} does not hold whole 32-bit codes"
            )));
        }
        let start_size = c_len / 4;
        let mut c_file = BufReader::new(File::open(c_path)?);
        let mut start = Vec::with_capacity(start_size);
        for _ in 0..start_size {
            start.push(remap(c_file.read_i32::<NativeEndian>()?)?);
        }

        Self::from_parts(rules, start, encoding)
    }

    /// Loads a Big-RePair grammar from its `.C` and `.R` files.
    ///
    /// The layout matches Navarro's except that the alphabet is fixed at
    /// 256 with no byte map, codes are unsigned and rule codes arrive
    /// already offset by 256, so they are used verbatim.
    pub fn from_big_repair_files(
        c_path: impl AsRef<Path>,
        r_path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<Self, LoadGrammarError> {
        let r_path = r_path.as_ref();
        let r_len = std::fs::metadata(r_path)?.len() as usize;
        let mut r_file = BufReader::new(File::open(r_path)?);

        let alphabet = r_file.read_i32::<NativeEndian>()?;
        if alphabet != ALPHABET_SIZE as i32 {
            return Err(LoadGrammarError::InvalidAlphabetSize(alphabet as i64));
        }

        let body = r_len
            .checked_sub(4)
            .filter(|body| body % 8 == 0)
            .ok_or_else(|| {
                LoadGrammarError::Malformed(format!(
                    ".R size {r_len} does not hold whole rule pairs"
                ))
            })?;
        let num_rules = body / 8;
        let mut rules = Vec::with_capacity(num_rules);
        for _ in 0..num_rules {
            let left = r_file.read_u32::<NativeEndian>()?;
            let right = r_file.read_u32::<NativeEndian>()?;
            rules.push(vec![left, right]);
        }

        let c_path = c_path.as_ref();
        let c_len = std::fs::metadata(c_path)?.len() as usize;
        if c_len % 4 != 0 {
            return Err(LoadGrammarError::Malformed(format!(
                ".C size {c_len} does not hold whole 32-bit codes"
            )));
        }
        let start_size = c_len / 4;
        let mut c_file = BufReader::new(File::open(c_path)?);
        let mut start = Vec::with_capacity(start_size);
        for _ in 0..start_size {
            start.push(c_file.read_u32::<NativeEndian>()?);
        }

        Self::from_parts(rules, start, encoding)
    }
}
