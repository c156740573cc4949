//! Source-text compression codecs
//!
//! The cart's source text is packed into the fixed code region by one of
//! two independent, format-incompatible lossless schemes:
//!
//! - **legacy** - a byte-token LZ scheme over a fixed 59-symbol alphabet
//!   ([`legacy`])
//! - **pxa** - a bit-packed move-to-front + back-reference scheme
//!   ([`pxa`])
//!
//! Both share the same 8-byte header shape (4 magic bytes + two 16-bit
//! big-endian fields) and both map a source of up to [`MAX_SOURCE_SIZE`]
//! bytes to a buffer intended to fit the code region. A region whose
//! first four bytes match neither magic is raw text, read up to the first
//! NUL or the region's end.
//!
//! [`compress_best`] runs both encoders and keeps the smaller output.

pub mod legacy;
pub mod pxa;

use crate::rom::CODE_SIZE;

/// Compression header size: 4 magic bytes + two 16-bit fields
pub const HEADER_SIZE: usize = 8;

/// Legacy codec magic
pub const LEGACY_MAGIC: [u8; 4] = *b":c:\0";

/// Modern (pxa) codec magic
pub const PXA_MAGIC: [u8; 4] = *b"\0pxa";

/// Longest source the code region can hold alongside the header and the
/// trailing marker byte
pub const MAX_SOURCE_SIZE: usize = CODE_SIZE - HEADER_SIZE;

/// Storage format of a code region, detected from its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    /// Legacy byte-token compression (`:c:\0`)
    Legacy,
    /// Modern bit-packed compression (`\0pxa`)
    Pxa,
    /// Uncompressed NUL-terminated text
    Raw,
}

/// Detect the storage format of a code region.
pub fn detect(region: &[u8]) -> CodeFormat {
    if region.len() >= 4 {
        if region[0..4] == LEGACY_MAGIC {
            return CodeFormat::Legacy;
        }
        if region[0..4] == PXA_MAGIC {
            return CodeFormat::Pxa;
        }
    }
    CodeFormat::Raw
}

/// Decode a code region in any of the three storage formats into the
/// logical source-text byte string.
pub fn decode_region(region: &[u8]) -> Vec<u8> {
    match detect(region) {
        CodeFormat::Legacy => legacy::decompress(region),
        CodeFormat::Pxa => pxa::decompress(region),
        CodeFormat::Raw => {
            let end = region
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(region.len());
            region[..end].to_vec()
        }
    }
}

/// Compress `src` with both codecs and return the smaller output. When
/// the two outputs are the same length the pxa result wins.
pub fn compress_best(src: &[u8]) -> Vec<u8> {
    let old = legacy::compress(src);
    let new = pxa::compress(src);
    if new.len() <= old.len() { new } else { old }
}

/// Store source text into a code-region buffer: raw when it fits,
/// otherwise compressed with the better codec. A compressed form that
/// still exceeds the region is truncated with a diagnostic rather than
/// failing; the caller keeps the canonical source string.
pub fn encode_region(region: &mut [u8], src: &[u8]) {
    region.fill(0);
    // Raw storage keeps at least one NUL so the raw decoder can find the
    // end of the text.
    if src.len() < region.len() {
        region[..src.len()].copy_from_slice(src);
        return;
    }
    let packed = compress_best(src);
    if packed.len() > region.len() {
        log::warn!(
            "compressed code ({} bytes) exceeds the code region ({} bytes); truncating",
            packed.len(),
            region.len()
        );
        region.copy_from_slice(&packed[..region.len()]);
    } else {
        region[..packed.len()].copy_from_slice(&packed);
    }
}
