//! Cart orchestration
//!
//! A [`Cart`] ties the pieces together: the ROM image, the label
//! thumbnail, and the decoded source text. Loading tries the text form
//! first and falls through to the image form; saving serializes to any
//! of the three on-disk forms.

use std::fs;
use std::path::Path;

use crate::code;
use crate::error::CartError;
use crate::png;
use crate::rom::{CODE_OFFSET, CODE_SIZE, Label, RomImage};
use crate::text;

/// A loaded cartridge.
///
/// `source` is the cached decode of the ROM's code region; it is
/// refreshed on every load and whenever [`set_source`](Self::set_source)
/// rewrites the region, and is never stale in between because the ROM is
/// read-only to everything else.
pub struct Cart {
    rom: RomImage,
    label: Label,
    source: String,
}

impl Cart {
    /// An empty cart: all-zero ROM and label, no source.
    pub fn new() -> Self {
        Self {
            rom: RomImage::new(),
            label: Label::new(),
            source: String::new(),
        }
    }

    /// Load a cart from a `.p8` text file or a `.p8.png` image.
    ///
    /// The text codec is tried first; it fails fast when the header line
    /// is absent, and the bytes are then handed to the image primitive.
    /// If neither form parses the result is
    /// [`CartError::FormatNotRecognized`].
    pub fn load(path: &Path) -> Result<Self, CartError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, &path.display().to_string())
    }

    /// Load a cart from in-memory file bytes. `origin` names the input
    /// in diagnostics.
    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self, CartError> {
        if let Ok(textual) = std::str::from_utf8(bytes) {
            match text::parse(textual) {
                Ok(parsed) => {
                    return Ok(Self {
                        rom: parsed.rom,
                        label: parsed.label,
                        source: parsed.source,
                    });
                }
                // Header absent: not the text form, try the image form.
                Err(CartError::FormatNotRecognized(_)) => {}
                Err(other) => return Err(other),
            }
        }

        let Ok(decoded) = image::load_from_memory(bytes) else {
            return Err(CartError::FormatNotRecognized(origin.to_string()));
        };
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let (rom, label, version) =
            match png::decode(width as usize, height as usize, rgba.as_raw()) {
                Ok(parts) => parts,
                Err(CartError::ImageTooSmall { .. }) => {
                    return Err(CartError::FormatNotRecognized(origin.to_string()));
                }
                Err(other) => return Err(other),
            };
        log::debug!("loaded cart image {origin} (format version {version})");

        let source_bytes = code::decode_region(rom.code());
        let source = String::from_utf8_lossy(&source_bytes).into_owned();
        Ok(Self { rom, label, source })
    }

    /// The ROM image.
    pub fn rom(&self) -> &RomImage {
        &self.rom
    }

    /// The label thumbnail.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// The decoded source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the source text, rewriting the ROM's code region and the
    /// cache together.
    pub fn set_source(&mut self, source: String) {
        code::encode_region(self.rom.code_mut(), source.as_bytes());
        self.source = source;
    }

    /// Raw binary export: the ROM verbatim up to the code region, the
    /// best compression of the source (header included), then the format
    /// version byte.
    ///
    /// A compressed body that exceeds the code region is still produced;
    /// whether an oversized cart is usable is the consumer's call.
    pub fn to_bin(&self) -> Vec<u8> {
        let packed = code::compress_best(self.source.as_bytes());
        if packed.len() > CODE_SIZE {
            log::warn!(
                "compressed code ({} bytes) exceeds the code region ({CODE_SIZE} bytes)",
                packed.len()
            );
        }
        let mut out = Vec::with_capacity(CODE_OFFSET + packed.len() + 1);
        out.extend_from_slice(&self.rom.as_bytes()[..CODE_OFFSET]);
        out.extend_from_slice(&packed);
        out.push(png::CART_VERSION);
        out
    }

    /// Serialize to `.p8` text.
    pub fn to_p8(&self) -> String {
        text::serialize(&self.rom, &self.label, &self.source)
    }

    /// Encode into the built-in cart artwork, returning `(width, height,
    /// RGBA8 pixels)`.
    pub fn to_png(&self) -> Result<(usize, usize, Vec<u8>), CartError> {
        let (width, height, template) = png::default_template();
        let pixels = png::encode(
            &self.rom,
            &self.label,
            png::CART_VERSION,
            width,
            height,
            &template,
        )?;
        Ok((width, height, pixels))
    }

    /// Encode into caller-provided artwork instead of the built-in frame.
    pub fn to_png_with_template(
        &self,
        width: usize,
        height: usize,
        template: &[u8],
    ) -> Result<Vec<u8>, CartError> {
        png::encode(
            &self.rom,
            &self.label,
            png::CART_VERSION,
            width,
            height,
            template,
        )
    }

    /// Write the cart as `.p8` text.
    pub fn save_as_p8(&self, path: &Path) -> Result<(), CartError> {
        fs::write(path, self.to_p8())?;
        Ok(())
    }

    /// Write the cart as a `.p8.png` image.
    pub fn save_as_png(&self, path: &Path) -> Result<(), CartError> {
        let (width, height, pixels) = self.to_png()?;
        image::save_buffer(
            path,
            &pixels,
            width as u32,
            height as u32,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Write the cart as a raw `.bin` ROM export.
    pub fn save_as_bin(&self, path: &Path) -> Result<(), CartError> {
        fs::write(path, self.to_bin())?;
        Ok(())
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cart() -> Cart {
        let text = format!(
            "{}\nversion {}\n__lua__\nfunction _draw()\n cls(1)\nend\n__gfx__\n12345678\n__gff__\n80\n",
            text::HEADER_LINE,
            text::TEXT_VERSION,
        );
        Cart::from_bytes(text.as_bytes(), "sample").unwrap()
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            Cart::from_bytes(b"\x01\x02\x03not a cart", "garbage"),
            Err(CartError::FormatNotRecognized(_))
        ));
    }

    #[test]
    fn test_text_form_wins_first() {
        let cart = sample_cart();
        assert_eq!(cart.source(), "function _draw()\n cls(1)\nend");
        assert_eq!(cart.rom().gfx()[0], 0x21);
        assert_eq!(cart.rom().flags()[0], 0x80);
    }

    #[test]
    fn test_bin_layout() {
        let cart = sample_cart();
        let bin = cart.to_bin();
        assert_eq!(&bin[..CODE_OFFSET], &cart.rom().as_bytes()[..CODE_OFFSET]);
        let packed = code::compress_best(cart.source().as_bytes());
        assert_eq!(&bin[CODE_OFFSET..CODE_OFFSET + packed.len()], &packed[..]);
        assert_eq!(*bin.last().unwrap(), png::CART_VERSION);
    }

    #[test]
    fn test_bin_is_idempotent() {
        let cart = sample_cart();
        assert_eq!(cart.to_bin(), cart.to_bin());
    }

    #[test]
    fn test_set_source_refreshes_code_region() {
        let mut cart = sample_cart();
        cart.set_source("print(9)".into());
        assert_eq!(cart.source(), "print(9)");
        assert_eq!(code::decode_region(cart.rom().code()), b"print(9)");
    }

    #[test]
    fn test_pixel_roundtrip() {
        let cart = sample_cart();
        let (width, height, pixels) = cart.to_png().unwrap();
        let (rom, _, version) = png::decode(width, height, &pixels).unwrap();
        assert_eq!(rom.as_bytes(), cart.rom().as_bytes());
        assert_eq!(version, png::CART_VERSION);
    }

    #[test]
    fn test_p8_roundtrip_preserves_everything() {
        let cart = sample_cart();
        let reloaded = Cart::from_bytes(cart.to_p8().as_bytes(), "roundtrip").unwrap();
        assert_eq!(reloaded.source(), cart.source());
        assert_eq!(reloaded.rom().as_bytes(), cart.rom().as_bytes());
        assert_eq!(reloaded.label().as_bytes(), cart.label().as_bytes());
    }
}
