//! Steganographic cart image codec (.p8.png)
//!
//! A cart image is ordinary artwork with the ROM hidden in the two low
//! bits of every channel. Reading pixels in row order, each RGBA pixel
//! carries one payload byte:
//!
//! ```text
//! byte = (a & 3) << 6 | (r & 3) << 4 | (g & 3) << 2 | (b & 3)
//! ```
//!
//! The first 32768 payload bytes are the ROM image; the byte after it is
//! the cart format version. The label thumbnail is different: it is drawn
//! into a fixed 128x128 window of the artwork as visible palette colours,
//! and recovered by nearest-palette matching rather than bit extraction.
//!
//! This module works on raw RGBA8 buffers only; PNG file encoding and
//! decoding is the `image` crate's job (see the cart orchestration).

use crate::error::CartError;
use crate::rom::{LABEL_DIM, Label, ROM_SIZE, RomImage};

/// Cart format version byte embedded after the ROM payload
pub const CART_VERSION: u8 = 8;

/// Pixels needed for the ROM payload plus the version byte
pub const MIN_PIXELS: usize = ROM_SIZE + 1;

/// Label window position inside the artwork
pub const LABEL_X: usize = 16;
/// Label window position inside the artwork
pub const LABEL_Y: usize = 24;

/// Default cart artwork size
pub const TEMPLATE_WIDTH: usize = 160;
/// Default cart artwork size
pub const TEMPLATE_HEIGHT: usize = 205;

/// The console's fixed 16-colour palette, used only for label
/// quantization.
pub const PALETTE: [[u8; 3]; 16] = [
    [0x00, 0x00, 0x00],
    [0x1d, 0x2b, 0x53],
    [0x7e, 0x25, 0x53],
    [0x00, 0x87, 0x51],
    [0xab, 0x52, 0x36],
    [0x5f, 0x57, 0x4f],
    [0xc2, 0xc3, 0xc7],
    [0xff, 0xf1, 0xe8],
    [0xff, 0x00, 0x4d],
    [0xff, 0xa3, 0x00],
    [0xff, 0xec, 0x27],
    [0x00, 0xe4, 0x36],
    [0x29, 0xad, 0xff],
    [0x83, 0x76, 0x9c],
    [0xff, 0x77, 0xa8],
    [0xff, 0xcc, 0xaa],
];

/// Palette index with the smallest squared RGB distance to `rgb`.
pub fn nearest_palette(rgb: [u8; 3]) -> u8 {
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (index, colour) in PALETTE.iter().enumerate() {
        let dist: u32 = colour
            .iter()
            .zip(rgb.iter())
            .map(|(&c, &p)| {
                let d = i32::from(c) - i32::from(p);
                (d * d) as u32
            })
            .sum();
        if dist < best_dist {
            best_dist = dist;
            best = index as u8;
        }
    }
    best
}

/// Extract the payload byte hidden in one RGBA pixel.
#[inline]
fn payload_byte(pixel: &[u8]) -> u8 {
    ((pixel[3] & 3) << 6) | ((pixel[0] & 3) << 4) | ((pixel[1] & 3) << 2) | (pixel[2] & 3)
}

/// Embed a payload byte into one RGBA pixel, preserving the visible top
/// six bits of each channel.
#[inline]
fn embed_byte(pixel: &mut [u8], byte: u8) {
    pixel[0] = (pixel[0] & !3) | ((byte >> 4) & 3);
    pixel[1] = (pixel[1] & !3) | ((byte >> 2) & 3);
    pixel[2] = (pixel[2] & !3) | (byte & 3);
    pixel[3] = (pixel[3] & !3) | (byte >> 6);
}

/// Whether a buffer of the given size covers the label window.
fn covers_label(width: usize, height: usize) -> bool {
    width >= LABEL_X + LABEL_DIM && height >= LABEL_Y + LABEL_DIM
}

/// Decode a cart from an RGBA8 pixel buffer.
///
/// Returns the ROM image, the label (all-zero when the artwork is too
/// small to hold one), and the format version byte. A buffer with fewer
/// than [`MIN_PIXELS`] pixels is rejected.
pub fn decode(width: usize, height: usize, pixels: &[u8]) -> Result<(RomImage, Label, u8), CartError> {
    let count = width * height;
    if count < MIN_PIXELS || pixels.len() < count * 4 {
        return Err(CartError::ImageTooSmall {
            pixels: count.min(pixels.len() / 4),
            needed: MIN_PIXELS,
        });
    }

    let mut rom = RomImage::new();
    for (index, pixel) in pixels.chunks_exact(4).take(ROM_SIZE).enumerate() {
        // poke cannot fail inside ROM_SIZE, but stay on the checked path
        rom.poke(index, payload_byte(pixel))?;
    }
    let version = payload_byte(&pixels[ROM_SIZE * 4..ROM_SIZE * 4 + 4]);

    let mut label = Label::new();
    if covers_label(width, height) {
        for y in 0..LABEL_DIM {
            for x in 0..LABEL_DIM {
                let at = ((LABEL_Y + y) * width + LABEL_X + x) * 4;
                let rgb = [pixels[at], pixels[at + 1], pixels[at + 2]];
                label.set_pixel(x, y, nearest_palette(rgb));
            }
        }
    }

    Ok((rom, label, version))
}

/// Encode a cart into a copy of the template artwork.
///
/// Every channel keeps its visible top six bits and takes two payload
/// bits; the label window is overwritten with full palette colours. The
/// template must be large enough for the payload.
pub fn encode(
    rom: &RomImage,
    label: &Label,
    version: u8,
    width: usize,
    height: usize,
    template: &[u8],
) -> Result<Vec<u8>, CartError> {
    let count = width * height;
    if count < MIN_PIXELS || template.len() < count * 4 {
        return Err(CartError::ImageTooSmall {
            pixels: count.min(template.len() / 4),
            needed: MIN_PIXELS,
        });
    }

    let mut pixels = template.to_vec();

    if covers_label(width, height) {
        for y in 0..LABEL_DIM {
            for x in 0..LABEL_DIM {
                let at = ((LABEL_Y + y) * width + LABEL_X + x) * 4;
                let [r, g, b] = PALETTE[label.pixel(x, y) as usize];
                pixels[at] = r;
                pixels[at + 1] = g;
                pixels[at + 2] = b;
                pixels[at + 3] = 0xff;
            }
        }
    }

    for (index, pixel) in pixels.chunks_exact_mut(4).take(ROM_SIZE).enumerate() {
        embed_byte(pixel, rom.peek(index)?);
    }
    embed_byte(&mut pixels[ROM_SIZE * 4..ROM_SIZE * 4 + 4], version);

    Ok(pixels)
}

/// A plain procedural cart frame for carts that have no artwork of their
/// own: a dark field with a border and a blank label window.
pub fn default_template() -> (usize, usize, Vec<u8>) {
    let mut pixels = vec![0u8; TEMPLATE_WIDTH * TEMPLATE_HEIGHT * 4];
    for y in 0..TEMPLATE_HEIGHT {
        for x in 0..TEMPLATE_WIDTH {
            let border = x < 4 || y < 4 || x >= TEMPLATE_WIDTH - 4 || y >= TEMPLATE_HEIGHT - 4;
            let [r, g, b] = if border { PALETTE[5] } else { PALETTE[1] };
            let at = (y * TEMPLATE_WIDTH + x) * 4;
            pixels[at] = r;
            pixels[at + 1] = g;
            pixels[at + 2] = b;
            pixels[at + 3] = 0xff;
        }
    }
    (TEMPLATE_WIDTH, TEMPLATE_HEIGHT, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_byte_layout() {
        // a=2, r=3, g=1, b=0 -> 10 11 01 00
        assert_eq!(payload_byte(&[3, 1, 0, 2]), 0b10_11_01_00);
    }

    #[test]
    fn test_embed_preserves_visible_bits() {
        let mut pixel = [0xe7, 0x59, 0xbc, 0xff];
        embed_byte(&mut pixel, 0b10_11_01_00);
        assert_eq!(pixel[0] & !3, 0xe4);
        assert_eq!(payload_byte(&pixel), 0b10_11_01_00);
    }

    #[test]
    fn test_rejects_small_buffer() {
        let pixels = vec![0u8; 128 * 128 * 4];
        assert!(matches!(
            decode(128, 128, &pixels),
            Err(CartError::ImageTooSmall { .. })
        ));
    }

    #[test]
    fn test_all_zero_rom_has_zero_low_bits() {
        let rom = RomImage::new();
        let (w, h, template) = default_template();
        let pixels = encode(&rom, &Label::new(), 0, w, h, &template).unwrap();

        for pixel in pixels.chunks_exact(4).take(MIN_PIXELS) {
            for channel in pixel {
                assert_eq!(channel & 3, 0);
            }
        }

        let (decoded, _, version) = decode(w, h, &pixels).unwrap();
        assert!(decoded.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(version, 0);
    }

    #[test]
    fn test_rom_roundtrip() {
        let mut rom = RomImage::new();
        for i in 0..ROM_SIZE {
            rom.poke(i, (i % 253) as u8).unwrap();
        }
        let (w, h, template) = default_template();
        let pixels = encode(&rom, &Label::new(), CART_VERSION, w, h, &template).unwrap();
        let (decoded, _, version) = decode(w, h, &pixels).unwrap();

        assert_eq!(decoded.as_bytes(), rom.as_bytes());
        assert_eq!(version, CART_VERSION);
    }

    #[test]
    fn test_label_roundtrip() {
        let mut label = Label::new();
        for y in 0..LABEL_DIM {
            for x in 0..LABEL_DIM {
                label.set_pixel(x, y, ((x / 8 + y / 8) % 16) as u8);
            }
        }
        let (w, h, template) = default_template();
        let pixels = encode(&RomImage::new(), &label, 0, w, h, &template).unwrap();
        let (_, decoded, _) = decode(w, h, &pixels).unwrap();

        // Palette colours written verbatim quantize back to themselves
        assert_eq!(decoded.as_bytes(), label.as_bytes());
    }

    #[test]
    fn test_nearest_palette_exact_colours() {
        for (index, colour) in PALETTE.iter().enumerate() {
            assert_eq!(nearest_palette(*colour), index as u8);
        }
    }

    #[test]
    fn test_nearest_palette_off_colours() {
        assert_eq!(nearest_palette([2, 1, 3]), 0);
        assert_eq!(nearest_palette([0xf0, 0xf0, 0xe0]), 7);
    }

    #[test]
    fn test_small_image_skips_label() {
        // 182 x 181 = 32942 pixels: enough payload, no room for the
        // label window's full height... use a wide short buffer instead.
        let w = 1024;
        let h = 33; // 33792 pixels, label window needs 152 rows
        let template = vec![0xffu8; w * h * 4];
        let pixels = encode(&RomImage::new(), &Label::new(), 0, w, h, &template).unwrap();
        let (_, label, _) = decode(w, h, &pixels).unwrap();
        assert!(label.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_version_byte_sits_after_rom() {
        let (w, h, template) = default_template();
        let pixels = encode(&RomImage::new(), &Label::new(), 3, w, h, &template).unwrap();
        assert_eq!(payload_byte(&pixels[ROM_SIZE * 4..ROM_SIZE * 4 + 4]), 3);
    }
}
