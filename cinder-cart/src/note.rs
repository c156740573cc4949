//! Sfx note bit fields
//!
//! A note is stored in the ROM as a little-endian `u16` packing four
//! fields with documented widths and positions:
//!
//! | Field      | Bits  | Range |
//! |------------|-------|-------|
//! | pitch      | 0-5   | 0-63  |
//! | instrument | 6-8   | 0-7   |
//! | volume     | 9-11  | 0-7   |
//! | effect     | 12-15 | 0-15  |
//!
//! The top effect bit doubles as the custom-instrument flag; in the text
//! form it travels inside the instrument nibble rather than the effect
//! nibble. The text form spends five hex digits per note (`pp i v e`),
//! i.e. 2.5 bytes, so two adjacent notes share five encoded bytes: the
//! 20-bit value of an even-indexed note is byte-aligned while an
//! odd-indexed note starts at a half-byte boundary. The two readers for
//! those alignments live here next to the field extractors so every shift
//! in the cartridge's note handling is in one tested place.

/// Pitch field (bits 0-5).
#[inline]
pub fn pitch(note: u16) -> u8 {
    (note & 0x3f) as u8
}

/// Instrument field (bits 6-8).
#[inline]
pub fn instrument(note: u16) -> u8 {
    ((note >> 6) & 0x07) as u8
}

/// Volume field (bits 9-11).
#[inline]
pub fn volume(note: u16) -> u8 {
    ((note >> 9) & 0x07) as u8
}

/// Effect field (bits 12-15). Bit 3 is the custom-instrument flag.
#[inline]
pub fn effect(note: u16) -> u8 {
    (note >> 12) as u8
}

/// Pack the four fields back into a note word. Out-of-range inputs are
/// masked to their field width.
#[inline]
pub fn pack(pitch: u8, instrument: u8, volume: u8, effect: u8) -> u16 {
    (pitch as u16 & 0x3f)
        | ((instrument as u16 & 0x07) << 6)
        | ((volume as u16 & 0x07) << 9)
        | ((effect as u16 & 0x0f) << 12)
}

/// Reassemble the 20-bit text-form value of an even-indexed note from the
/// three bytes it starts in. Even notes are byte-aligned: nibbles
/// `b0.hi b0.lo b1.hi b1.lo b2.hi`.
#[inline]
pub fn text_bits_even(b0: u8, b1: u8, b2: u8) -> u32 {
    ((b0 as u32) << 12) | ((b1 as u32) << 4) | ((b2 as u32) >> 4)
}

/// Reassemble the 20-bit text-form value of an odd-indexed note. Odd
/// notes start on a half-byte boundary: nibbles `b0.lo b1.hi b1.lo b2.hi
/// b2.lo`.
#[inline]
pub fn text_bits_odd(b0: u8, b1: u8, b2: u8) -> u32 {
    (((b0 & 0x0f) as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}

/// Decode a 20-bit text-form value (`pp i v e` hex digits) into a note
/// word. The custom-instrument flag is bit 3 of the instrument nibble and
/// lands in bit 3 of the effect field.
#[inline]
pub fn from_text_bits(v: u32) -> u16 {
    let pitch = ((v >> 12) & 0x3f) as u8;
    let instrument = ((v >> 8) & 0x07) as u8;
    let custom = ((v >> 8) & 0x08) as u8;
    let volume = ((v >> 4) & 0x07) as u8;
    let effect = (v & 0x07) as u8 | custom;
    pack(pitch, instrument, volume, effect)
}

/// Encode a note word into its 20-bit text-form value.
#[inline]
pub fn to_text_bits(note: u16) -> u32 {
    let eff = effect(note);
    let inst_nibble = instrument(note) | (eff & 0x08);
    ((pitch(note) as u32) << 12)
        | ((inst_nibble as u32) << 8)
        | ((volume(note) as u32) << 4)
        | ((eff & 0x07) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extraction() {
        // pitch=24, instrument=3, volume=5, effect=2
        let note = 24 | (3 << 6) | (5 << 9) | (2 << 12);
        assert_eq!(pitch(note), 24);
        assert_eq!(instrument(note), 3);
        assert_eq!(volume(note), 5);
        assert_eq!(effect(note), 2);
    }

    #[test]
    fn test_field_extremes() {
        for (p, i, v, e) in [(0, 0, 0, 0), (63, 7, 7, 15), (1, 7, 0, 8), (63, 0, 7, 1)] {
            let note = pack(p, i, v, e);
            assert_eq!(pitch(note), p, "pitch of {note:#06x}");
            assert_eq!(instrument(note), i, "instrument of {note:#06x}");
            assert_eq!(volume(note), v, "volume of {note:#06x}");
            assert_eq!(effect(note), e, "effect of {note:#06x}");
        }
    }

    #[test]
    fn test_pack_masks_out_of_range() {
        let note = pack(0xff, 0xff, 0xff, 0xff);
        assert_eq!(pitch(note), 63);
        assert_eq!(instrument(note), 7);
        assert_eq!(volume(note), 7);
        assert_eq!(effect(note), 15);
    }

    #[test]
    fn test_even_alignment() {
        // Nibbles 1 8 3 b 4 from bytes 18 3b 4f; the trailing low nibble
        // belongs to the next note
        assert_eq!(text_bits_even(0x18, 0x3b, 0x4f), 0x183b4);
    }

    #[test]
    fn test_odd_alignment() {
        // The high nibble of the first byte belongs to the previous note
        assert_eq!(text_bits_odd(0xf1, 0x83, 0xb4), 0x183b4);
    }

    #[test]
    fn test_text_bits_roundtrip_all_pitches() {
        for p in 0..64u8 {
            let note = pack(p, 3, 5, 2);
            assert_eq!(from_text_bits(to_text_bits(note)), note, "pitch {p}");
        }
    }

    #[test]
    fn test_text_bits_custom_instrument_flag() {
        // Effect bit 3 travels in the instrument nibble of the text form
        let note = pack(12, 5, 7, 0b1010);
        let v = to_text_bits(note);
        assert_eq!((v >> 8) & 0x0f, 5 | 8, "instrument nibble carries the flag");
        assert_eq!(v & 0x0f, 0b010, "effect nibble keeps the low bits");
        assert_eq!(from_text_bits(v), note);
    }

    #[test]
    fn test_text_bits_roundtrip_exhaustive_fields() {
        for i in 0..8u8 {
            for v in 0..8u8 {
                for e in 0..16u8 {
                    let note = pack(33, i, v, e);
                    assert_eq!(from_text_bits(to_text_bits(note)), note);
                }
            }
        }
    }
}
