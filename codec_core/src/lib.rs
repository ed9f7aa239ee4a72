//! Deflate-style compression core: bit-level I/O, LZ77 match-finding,
//! and canonical Huffman coding, sequenced into a per-blob codec.

pub mod bitio;
pub mod codec;
pub mod huffman;
pub mod lz77;

pub use codec::{compress, decompress, BLOB_VERSION};
