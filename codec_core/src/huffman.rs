//! Canonical Huffman coding over the merged literal/length-code alphabet.
//!
//! The alphabet has 512 possible symbols: the 256 literal byte values and
//! 256 length codes (`256 + (length - 3)` for match lengths 3..=258). Code
//! lengths are derived from a standard frequency-weighted binary merge
//! tree; the actual bit patterns are then reassigned canonically so the
//! decoder only ever needs the lengths, never the tree, to reconstruct
//! them (see [`Self::load_metadata`]).

use std::collections::BinaryHeap;
use std::collections::HashMap;

use shared_files::error::CoreError;

use crate::bitio::{BitReader, BitWriter};

/// Total symbol count: 256 literals + 256 length codes.
pub const NUM_SYMBOLS: usize = 512;

/// Upper bound on a canonical code's bit length; the decoder probes
/// lengths `1..=MAX_CODE_LEN`.
const MAX_CODE_LEN: u8 = 25;

/// A node in the transient frequency-merge tree.
///
/// Indices into an arena rather than boxed pointers, so the tree can be
/// discarded in one `Vec` drop once code lengths are extracted (see
/// spec's design note on avoiding pointer-chasing for this short-lived
/// structure).
struct Node {
    freq: u32,
    left: Option<usize>,
    right: Option<usize>,
    symbol: Option<u16>,
}

/// A canonical Huffman code book: per-symbol code lengths and the
/// resulting `(code, length)` pairs, plus the sorted list of symbols that
/// actually have an assigned code.
pub struct CanonicalHuffman {
    code_lengths: Box<[u8; NUM_SYMBOLS]>,
    codes: Box<[(u32, u8); NUM_SYMBOLS]>,
    symbols: Vec<u16>,
}

impl CanonicalHuffman {
    /// A code book with no assigned symbols.
    pub fn empty() -> Self {
        CanonicalHuffman {
            code_lengths: Box::new([0; NUM_SYMBOLS]),
            codes: Box::new([(0, 0); NUM_SYMBOLS]),
            symbols: Vec::new(),
        }
    }

    /// Builds a code book from symbol frequencies.
    ///
    /// An all-zero frequency table yields an empty code book. A table with
    /// exactly one nonzero entry assigns that symbol length 1 directly,
    /// bypassing the merge tree. Otherwise a standard frequency-weighted
    /// binary merge (min-heap, repeatedly merging the two lowest-weight
    /// subtrees) produces code lengths by leaf depth.
    pub fn build_from_frequencies(frequencies: &[u32; NUM_SYMBOLS]) -> Self {
        let observed: Vec<(u16, u32)> = frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &freq)| freq > 0)
            .map(|(sym, &freq)| (sym as u16, freq))
            .collect();

        if observed.is_empty() {
            return Self::empty();
        }

        if observed.len() == 1 {
            let mut lengths = Box::new([0u8; NUM_SYMBOLS]);
            lengths[observed[0].0 as usize] = 1;
            return Self::from_lengths(lengths, vec![observed[0].0]);
        }

        let mut arena: Vec<Node> = Vec::with_capacity(observed.len() * 2 - 1);
        // Reverse + an insertion-order tiebreaker gives a deterministic
        // min-heap: ties don't affect correctness (the decoder only ever
        // sees the lengths this produces, never the tree itself), but a
        // stable rule makes repeated builds of the same input reproducible.
        let mut heap: BinaryHeap<std::cmp::Reverse<(u32, usize, usize)>> = BinaryHeap::new();
        let mut order = 0usize;

        for (sym, freq) in observed.iter() {
            let idx = arena.len();
            arena.push(Node {
                freq: *freq,
                left: None,
                right: None,
                symbol: Some(*sym),
            });
            heap.push(std::cmp::Reverse((*freq, order, idx)));
            order += 1;
        }

        while heap.len() > 1 {
            let std::cmp::Reverse((f1, _, i1)) = heap.pop().unwrap();
            let std::cmp::Reverse((f2, _, i2)) = heap.pop().unwrap();
            let idx = arena.len();
            arena.push(Node {
                freq: f1 + f2,
                left: Some(i1),
                right: Some(i2),
                symbol: None,
            });
            heap.push(std::cmp::Reverse((f1 + f2, order, idx)));
            order += 1;
        }

        let std::cmp::Reverse((_, _, root)) = heap.pop().unwrap();

        let mut lengths = Box::new([0u8; NUM_SYMBOLS]);
        let mut stack = vec![(root, 0u32)];
        while let Some((idx, depth)) = stack.pop() {
            let node = &arena[idx];
            match node.symbol {
                Some(sym) => lengths[sym as usize] = depth.max(1) as u8,
                None => {
                    if let Some(l) = node.left {
                        stack.push((l, depth + 1));
                    }
                    if let Some(r) = node.right {
                        stack.push((r, depth + 1));
                    }
                }
            }
        }

        let symbols: Vec<u16> = observed.iter().map(|&(sym, _)| sym).collect();
        Self::from_lengths(lengths, symbols)
    }

    fn from_lengths(code_lengths: Box<[u8; NUM_SYMBOLS]>, mut symbols: Vec<u16>) -> Self {
        symbols.sort_unstable();
        let codes = canonical_codes(&code_lengths, &symbols);
        CanonicalHuffman {
            code_lengths,
            codes,
            symbols,
        }
    }

    /// Returns the `(code, length)` pair assigned to `symbol`.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` was never observed while building this code
    /// book. A well-formed caller never hits this: every symbol handed to
    /// the encoder during compression was itself counted into the
    /// frequency table the code book was built from.
    pub fn encode_symbol(&self, symbol: u16) -> (u32, u8) {
        let len = self.code_lengths[symbol as usize];
        assert!(len > 0, "symbol {} has no assigned Huffman code", symbol);
        self.codes[symbol as usize]
    }

    /// Serializes the code-length table: 16-bit symbol count, then for
    /// each symbol (ascending) 9 bits of symbol value and 5 bits of
    /// length.
    pub fn save_metadata(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_bits(self.symbols.len() as u32, 16);
        for &symbol in &self.symbols {
            writer.write_bits(symbol as u32, 9);
            writer.write_bits(self.code_lengths[symbol as usize] as u32, 5);
        }
        writer.finish()
    }

    /// Reconstructs a code book from metadata written by
    /// [`Self::save_metadata`], returning the number of bytes consumed
    /// (for callers that interleave bit and byte streams).
    pub fn load_metadata(data: &[u8]) -> Result<(Self, usize), CoreError> {
        let mut reader = BitReader::new(data);
        let count = reader.read_bits(16)?;
        let mut lengths = Box::new([0u8; NUM_SYMBOLS]);
        let mut symbols = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let symbol = reader.read_bits(9)? as u16;
            let length = reader.read_bits(5)? as u8;
            lengths[symbol as usize] = length;
            symbols.push(symbol);
        }
        let book = Self::from_lengths(lengths, symbols);
        Ok((book, reader.position()))
    }

    /// Builds a `(code, length) -> symbol` lookup table for decoding.
    pub fn build_decode_table(&self) -> HashMap<(u32, u8), u16> {
        let mut table = HashMap::with_capacity(self.symbols.len());
        for &symbol in &self.symbols {
            table.insert(self.codes[symbol as usize], symbol);
        }
        table
    }

    /// Decodes the next symbol from `reader` using `table`, probing code
    /// lengths `1..=25`.
    pub fn decode_symbol(
        reader: &mut BitReader,
        table: &HashMap<(u32, u8), u16>,
    ) -> Result<u16, CoreError> {
        let mut code: u32 = 0;
        for length in 1..=MAX_CODE_LEN {
            let bit = reader.read_bits(1)?;
            code = (code << 1) | bit;
            if let Some(&symbol) = table.get(&(code, length)) {
                return Ok(symbol);
            }
        }
        Err(CoreError::InvalidCode)
    }
}

/// Assigns canonical codes given code lengths and the set of symbols that
/// have one: sort ascending by `(length, symbol)`, then walk assigning
/// codes that increment within a length and left-shift on a length
/// change.
fn canonical_codes(
    lengths: &[u8; NUM_SYMBOLS],
    symbols: &[u16],
) -> Box<[(u32, u8); NUM_SYMBOLS]> {
    let mut codes = Box::new([(0u32, 0u8); NUM_SYMBOLS]);
    let mut sorted: Vec<u16> = symbols.to_vec();
    sorted.sort_by(|&a, &b| lengths[a as usize].cmp(&lengths[b as usize]).then(a.cmp(&b)));

    let mut code: u32 = 0;
    let mut prev_len: u8 = 0;
    for symbol in sorted {
        let length = lengths[symbol as usize];
        code <<= (length - prev_len) as u32;
        codes[symbol as usize] = (code, length);
        code += 1;
        prev_len = length;
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freqs(pairs: &[(u16, u32)]) -> [u32; NUM_SYMBOLS] {
        let mut f = [0u32; NUM_SYMBOLS];
        for &(sym, freq) in pairs {
            f[sym as usize] = freq;
        }
        f
    }

    #[test]
    fn empty_frequencies_yield_empty_book() {
        let book = CanonicalHuffman::build_from_frequencies(&[0u32; NUM_SYMBOLS]);
        assert!(book.symbols.is_empty());
    }

    #[test]
    fn single_symbol_gets_length_one() {
        let book = CanonicalHuffman::build_from_frequencies(&freqs(&[(65, 10)]));
        assert_eq!(book.code_lengths[65], 1);
        let (_, len) = book.encode_symbol(65);
        assert_eq!(len, 1);
    }

    #[test]
    fn metadata_roundtrip_preserves_lengths_and_codes() {
        let freq = freqs(&[(b'A' as u16, 5), (b'B' as u16, 7), (b'C' as u16, 2), (256, 3)]);
        let book = CanonicalHuffman::build_from_frequencies(&freq);
        let meta = book.save_metadata();
        let (loaded, consumed) = CanonicalHuffman::load_metadata(&meta).unwrap();
        assert_eq!(consumed, meta.len());
        for &sym in &book.symbols {
            assert_eq!(book.encode_symbol(sym), loaded.encode_symbol(sym));
            assert!(book.encode_symbol(sym).1 > 0);
        }
    }

    #[test]
    fn codes_of_equal_length_are_contiguous_and_prefix_free() {
        let freq = freqs(&[(1, 1), (2, 1), (3, 2), (4, 4), (5, 8), (6, 16)]);
        let book = CanonicalHuffman::build_from_frequencies(&freq);
        let table = book.build_decode_table();
        // no code is a strict bit-prefix of another: decoding every known
        // code from its own bits lands exactly on that symbol.
        for (&(code, length), &symbol) in &table {
            let mut acc = 0u32;
            let mut found = None;
            for l in 1..=length {
                let bit = (code >> (length - l)) & 1;
                acc = (acc << 1) | bit;
                if let Some(&s) = table.get(&(acc, l)) {
                    found = Some((s, l));
                    break;
                }
            }
            assert_eq!(found, Some((symbol, length)));
        }
    }

    #[test]
    fn load_metadata_truncated_raises() {
        let mut w = BitWriter::new();
        w.write_bits(1, 16);
        let meta = w.finish();
        assert!(matches!(
            CanonicalHuffman::load_metadata(&meta),
            Err(CoreError::Truncated)
        ));
    }
}
