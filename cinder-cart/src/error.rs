//! Cartridge codec error types

use thiserror::Error;

/// Errors surfaced by the cartridge codec.
///
/// Only unrecoverable conditions are errors. Malformed-but-bounded input
/// (oversized sections, corrupt back-references, oversized compressed
/// output) is logged and handled with a defined fallback instead, so that
/// damaged carts still load as far as possible.
#[derive(Debug, Error)]
pub enum CartError {
    /// Input is neither a text cart nor a cart image
    #[error("not a recognized cartridge: {0}")]
    FormatNotRecognized(String),

    /// Direct ROM access outside the 32 KiB image
    #[error("ROM offset {offset:#06x} out of range (image is {size:#06x} bytes)", size = crate::rom::ROM_SIZE)]
    OutOfRange {
        /// The offending absolute offset
        offset: usize,
    },

    /// Pixel buffer too small to carry a cartridge payload
    #[error("image too small for cartridge payload: {pixels} pixels (need {needed})")]
    ImageTooSmall {
        /// Pixels available in the buffer
        pixels: usize,
        /// Pixels required for ROM bytes + version byte
        needed: usize,
    },

    /// Filesystem error while reading or writing a cart
    #[error("cart I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// PNG decode/encode error from the image primitive
    #[error("cart image error: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CartError::OutOfRange { offset: 0x8000 }.to_string(),
            "ROM offset 0x8000 out of range (image is 0x8000 bytes)"
        );
        assert_eq!(
            CartError::ImageTooSmall {
                pixels: 100,
                needed: 32769
            }
            .to_string(),
            "image too small for cartridge payload: 100 pixels (need 32769)"
        );
    }
}
