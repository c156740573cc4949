//! Fixed 32 KiB cartridge ROM image
//!
//! This module is the single source of truth for the cartridge memory
//! layout. Every non-code asset lives at a fixed offset inside one flat
//! 32768-byte buffer:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  RomImage (0x8000 bytes)                 │
//! ├──────────────────────────────────────────────────────────┤
//! │ 0x0000  gfx bitmap      0x2000  128x128 4-bit pixels     │
//! │ 0x1000  map2 overlay    0x1000  (aliases gfx 2nd half)   │
//! │ 0x2000  map             0x1000  128x32 tile indices      │
//! │ 0x3000  sprite flags    0x0100  1 byte per sprite        │
//! │ 0x3100  song table      0x0100  64 entries x 4 bytes     │
//! │ 0x3200  sfx table       0x1100  64 entries x 68 bytes    │
//! │ 0x4300  code region     0x3d00  compressed or raw source │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! `map2` and the second half of `gfx` are two views of the same bytes.
//! The aliasing is expressed as two accessor ranges over one owned buffer,
//! never as overlapping storage; the OR-merge policy for text carts that
//! populate both views lives in the text codec, not here.

use crate::error::CartError;

/// Total ROM image size in bytes
pub const ROM_SIZE: usize = 0x8000;

/// Graphics bitmap offset (128x128 4-bit pixels, 2 per byte)
pub const GFX_OFFSET: usize = 0x0000;
/// Graphics bitmap size
pub const GFX_SIZE: usize = 0x2000;

/// Tile map overlay offset (logically appended after `map`)
pub const MAP2_OFFSET: usize = 0x1000;
/// Tile map overlay size
pub const MAP2_SIZE: usize = 0x1000;

/// Tile map offset (byte-per-tile indices into gfx)
pub const MAP_OFFSET: usize = 0x2000;
/// Tile map size
pub const MAP_SIZE: usize = 0x1000;

/// Sprite flags offset (1 bitfield byte per sprite)
pub const FLAGS_OFFSET: usize = 0x3000;
/// Sprite flags size
pub const FLAGS_SIZE: usize = 0x0100;

/// Song table offset (64 patterns)
pub const SONG_OFFSET: usize = 0x3100;
/// Song table size
pub const SONG_SIZE: usize = 0x0100;
/// Bytes per song pattern (4 channel refs with packed flag bits)
pub const SONG_ENTRY_SIZE: usize = 4;
/// Number of song patterns
pub const SONG_COUNT: usize = 64;

/// Sfx table offset (64 entries)
pub const SFX_OFFSET: usize = 0x3200;
/// Sfx table size
pub const SFX_SIZE: usize = 0x1100;
/// Bytes per sfx entry (32 notes x 2 bytes + 4 meta bytes)
pub const SFX_ENTRY_SIZE: usize = 68;
/// Number of sfx entries
pub const SFX_COUNT: usize = 64;
/// Notes per sfx entry
pub const SFX_NOTES: usize = 32;

/// Code region offset
pub const CODE_OFFSET: usize = 0x4300;
/// Code region size
pub const CODE_SIZE: usize = 0x3d00;

/// Label thumbnail size (128x128 4-bit pixels, separate from the ROM)
pub const LABEL_SIZE: usize = 0x2000;
/// Label thumbnail width/height in pixels
pub const LABEL_DIM: usize = 128;

// The layout is load-bearing: every region must tile the image exactly.
const _: () = assert!(GFX_OFFSET + GFX_SIZE == MAP_OFFSET);
const _: () = assert!(MAP2_OFFSET + MAP2_SIZE == GFX_OFFSET + GFX_SIZE);
const _: () = assert!(MAP_OFFSET + MAP_SIZE == FLAGS_OFFSET);
const _: () = assert!(FLAGS_OFFSET + FLAGS_SIZE == SONG_OFFSET);
const _: () = assert!(SONG_OFFSET + SONG_SIZE == SFX_OFFSET);
const _: () = assert!(SFX_OFFSET + SFX_SIZE == CODE_OFFSET);
const _: () = assert!(CODE_OFFSET + CODE_SIZE == ROM_SIZE);
const _: () = assert!(SONG_COUNT * SONG_ENTRY_SIZE == SONG_SIZE);
const _: () = assert!(SFX_COUNT * SFX_ENTRY_SIZE == SFX_SIZE);
const _: () = assert!(SFX_NOTES * 2 + 4 == SFX_ENTRY_SIZE);
const _: () = assert!(LABEL_DIM * LABEL_DIM / 2 == LABEL_SIZE);

/// The cartridge ROM image: one flat owned buffer with typed accessors
/// into the fixed regions above.
///
/// A `RomImage` is fully overwritten (zeroed, then populated) on every
/// successful cart load and is read-only to every other component until
/// the next load.
#[derive(Clone)]
pub struct RomImage {
    data: Box<[u8; ROM_SIZE]>,
}

impl RomImage {
    /// Create an all-zero ROM image.
    pub fn new() -> Self {
        Self {
            data: vec![0u8; ROM_SIZE].into_boxed_slice().try_into().unwrap(),
        }
    }

    /// Build a ROM image from exactly [`ROM_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartError> {
        if bytes.len() != ROM_SIZE {
            return Err(CartError::OutOfRange {
                offset: bytes.len(),
            });
        }
        let mut rom = Self::new();
        rom.data.copy_from_slice(bytes);
        Ok(rom)
    }

    /// Reset every byte to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// The whole image as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// Bounds-checked read of a single byte at an absolute offset.
    pub fn peek(&self, offset: usize) -> Result<u8, CartError> {
        self.data
            .get(offset)
            .copied()
            .ok_or(CartError::OutOfRange { offset })
    }

    /// Bounds-checked write of a single byte at an absolute offset.
    pub fn poke(&mut self, offset: usize, value: u8) -> Result<(), CartError> {
        match self.data.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CartError::OutOfRange { offset }),
        }
    }

    /// Graphics bitmap region.
    pub fn gfx(&self) -> &[u8] {
        &self.data[GFX_OFFSET..GFX_OFFSET + GFX_SIZE]
    }

    /// Graphics bitmap region, mutable.
    pub fn gfx_mut(&mut self) -> &mut [u8] {
        &mut self.data[GFX_OFFSET..GFX_OFFSET + GFX_SIZE]
    }

    /// Tile map overlay region. These are the same bytes as the second
    /// half of [`gfx`](Self::gfx).
    pub fn map2(&self) -> &[u8] {
        &self.data[MAP2_OFFSET..MAP2_OFFSET + MAP2_SIZE]
    }

    /// Tile map overlay region, mutable.
    pub fn map2_mut(&mut self) -> &mut [u8] {
        &mut self.data[MAP2_OFFSET..MAP2_OFFSET + MAP2_SIZE]
    }

    /// Tile map region.
    pub fn map(&self) -> &[u8] {
        &self.data[MAP_OFFSET..MAP_OFFSET + MAP_SIZE]
    }

    /// Tile map region, mutable.
    pub fn map_mut(&mut self) -> &mut [u8] {
        &mut self.data[MAP_OFFSET..MAP_OFFSET + MAP_SIZE]
    }

    /// Sprite flags region.
    pub fn flags(&self) -> &[u8] {
        &self.data[FLAGS_OFFSET..FLAGS_OFFSET + FLAGS_SIZE]
    }

    /// Sprite flags region, mutable.
    pub fn flags_mut(&mut self) -> &mut [u8] {
        &mut self.data[FLAGS_OFFSET..FLAGS_OFFSET + FLAGS_SIZE]
    }

    /// Song table region.
    pub fn song(&self) -> &[u8] {
        &self.data[SONG_OFFSET..SONG_OFFSET + SONG_SIZE]
    }

    /// Song table region, mutable.
    pub fn song_mut(&mut self) -> &mut [u8] {
        &mut self.data[SONG_OFFSET..SONG_OFFSET + SONG_SIZE]
    }

    /// Sfx table region.
    pub fn sfx(&self) -> &[u8] {
        &self.data[SFX_OFFSET..SFX_OFFSET + SFX_SIZE]
    }

    /// Sfx table region, mutable.
    pub fn sfx_mut(&mut self) -> &mut [u8] {
        &mut self.data[SFX_OFFSET..SFX_OFFSET + SFX_SIZE]
    }

    /// One 68-byte sfx entry (`index` < [`SFX_COUNT`]).
    pub fn sfx_entry(&self, index: usize) -> &[u8] {
        let start = SFX_OFFSET + index * SFX_ENTRY_SIZE;
        &self.data[start..start + SFX_ENTRY_SIZE]
    }

    /// One 68-byte sfx entry, mutable.
    pub fn sfx_entry_mut(&mut self, index: usize) -> &mut [u8] {
        let start = SFX_OFFSET + index * SFX_ENTRY_SIZE;
        &mut self.data[start..start + SFX_ENTRY_SIZE]
    }

    /// One 4-byte song pattern (`index` < [`SONG_COUNT`]).
    pub fn song_entry(&self, index: usize) -> &[u8] {
        let start = SONG_OFFSET + index * SONG_ENTRY_SIZE;
        &self.data[start..start + SONG_ENTRY_SIZE]
    }

    /// One 4-byte song pattern, mutable.
    pub fn song_entry_mut(&mut self, index: usize) -> &mut [u8] {
        let start = SONG_OFFSET + index * SONG_ENTRY_SIZE;
        &mut self.data[start..start + SONG_ENTRY_SIZE]
    }

    /// Code region (compressed or raw source text).
    pub fn code(&self) -> &[u8] {
        &self.data[CODE_OFFSET..CODE_OFFSET + CODE_SIZE]
    }

    /// Code region, mutable.
    pub fn code_mut(&mut self) -> &mut [u8] {
        &mut self.data[CODE_OFFSET..CODE_OFFSET + CODE_SIZE]
    }
}

impl Default for RomImage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RomImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied = self.data.iter().filter(|&&b| b != 0).count();
        f.debug_struct("RomImage")
            .field("size", &ROM_SIZE)
            .field("nonzero_bytes", &occupied)
            .finish()
    }
}

/// Label thumbnail: a 128x128 4-bit bitmap (2 pixels per byte, low nibble
/// = left pixel), used only as the cart image's visual preview. It is not
/// part of the ROM image.
#[derive(Clone)]
pub struct Label {
    data: Box<[u8; LABEL_SIZE]>,
}

impl Label {
    /// Create an all-zero label.
    pub fn new() -> Self {
        Self {
            data: vec![0u8; LABEL_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap(),
        }
    }

    /// Reset every byte to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// The packed bitmap bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// The packed bitmap bytes, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// 4-bit colour of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let byte = self.data[(y * LABEL_DIM + x) / 2];
        if x % 2 == 0 { byte & 0x0f } else { byte >> 4 }
    }

    /// Set the 4-bit colour of the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: usize, y: usize, colour: u8) {
        let slot = &mut self.data[(y * LABEL_DIM + x) / 2];
        if x % 2 == 0 {
            *slot = (*slot & 0xf0) | (colour & 0x0f);
        } else {
            *slot = (*slot & 0x0f) | (colour << 4);
        }
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rom_is_zeroed() {
        let rom = RomImage::new();
        assert_eq!(rom.as_bytes().len(), ROM_SIZE);
        assert!(rom.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_peek_poke_roundtrip() {
        let mut rom = RomImage::new();
        rom.poke(0x3100, 0xab).unwrap();
        assert_eq!(rom.peek(0x3100).unwrap(), 0xab);
    }

    #[test]
    fn test_peek_out_of_range() {
        let rom = RomImage::new();
        assert!(matches!(
            rom.peek(ROM_SIZE),
            Err(CartError::OutOfRange { offset }) if offset == ROM_SIZE
        ));
    }

    #[test]
    fn test_poke_out_of_range() {
        let mut rom = RomImage::new();
        assert!(rom.poke(ROM_SIZE + 5, 1).is_err());
        // Nothing adjacent was written
        assert_eq!(rom.peek(ROM_SIZE - 1).unwrap(), 0);
    }

    #[test]
    fn test_map2_aliases_gfx_second_half() {
        let mut rom = RomImage::new();
        rom.map2_mut()[0] = 0x42;
        assert_eq!(rom.gfx()[GFX_SIZE / 2], 0x42);

        rom.gfx_mut()[GFX_SIZE / 2 + 7] = 0x99;
        assert_eq!(rom.map2()[7], 0x99);
    }

    #[test]
    fn test_region_sizes() {
        let rom = RomImage::new();
        assert_eq!(rom.gfx().len(), GFX_SIZE);
        assert_eq!(rom.map().len(), MAP_SIZE);
        assert_eq!(rom.map2().len(), MAP2_SIZE);
        assert_eq!(rom.flags().len(), FLAGS_SIZE);
        assert_eq!(rom.song().len(), SONG_SIZE);
        assert_eq!(rom.sfx().len(), SFX_SIZE);
        assert_eq!(rom.code().len(), CODE_SIZE);
    }

    #[test]
    fn test_sfx_entry_offsets() {
        let mut rom = RomImage::new();
        rom.sfx_entry_mut(63)[67] = 0x55;
        assert_eq!(rom.peek(SFX_OFFSET + SFX_SIZE - 1).unwrap(), 0x55);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_size() {
        assert!(RomImage::from_bytes(&[0u8; 100]).is_err());
        assert!(RomImage::from_bytes(&vec![0u8; ROM_SIZE]).is_ok());
    }

    #[test]
    fn test_label_pixel_packing() {
        let mut label = Label::new();
        label.set_pixel(0, 0, 7);
        label.set_pixel(1, 0, 12);
        // Low nibble is the left pixel
        assert_eq!(label.as_bytes()[0], 0xc7);
        assert_eq!(label.pixel(0, 0), 7);
        assert_eq!(label.pixel(1, 0), 12);
    }
}
