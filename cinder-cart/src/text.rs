//! Text cartridge format (.p8)
//!
//! A line-oriented format: a header line, a version line, then sections
//! opened by marker lines (`__lua__`, `__gfx__`, ...) running to the next
//! marker or end of input. The lua section holds the source text
//! verbatim; every other section is a stream of hex-digit pairs that maps
//! to one fixed ROM region.
//!
//! Serialization omits trailing all-zero content: each section is written
//! only up through its last nonzero line, and a section that is entirely
//! zero is omitted altogether, marker included.

use crate::code;
use crate::error::CartError;
use crate::note;
use crate::rom::{
    FLAGS_SIZE, GFX_SIZE, LABEL_SIZE, Label, MAP_SIZE, RomImage, SFX_COUNT, SFX_ENTRY_SIZE,
    SFX_NOTES, SONG_COUNT, SONG_ENTRY_SIZE,
};

/// Product-identifying phrase that must appear on the first line
pub const HEADER_PHRASE: &str = "pico-8 cartridge";

/// Full header line written by the serializer
pub const HEADER_LINE: &str = "pico-8 cartridge // http://www.pico-8.com";

/// Text format version written by the serializer
pub const TEXT_VERSION: u32 = 42;

/// Bytes per encoded sfx entry in the text form: 4 meta bytes plus
/// 32 notes at 2.5 bytes each (168 hex digits per line)
const SFX_BLOCK_SIZE: usize = 84;

/// Bytes per encoded song pattern in the text form: a flag byte plus the
/// 4 channel bytes
const SONG_BLOCK_SIZE: usize = 5;

/// One cart section, identified by its marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Lua,
    Gfx,
    Gff,
    Map,
    Sfx,
    Music,
    Label,
}

impl Section {
    fn from_marker(line: &str) -> Option<Self> {
        match line {
            "__lua__" => Some(Self::Lua),
            "__gfx__" => Some(Self::Gfx),
            "__gff__" => Some(Self::Gff),
            "__map__" => Some(Self::Map),
            "__sfx__" => Some(Self::Sfx),
            "__music__" => Some(Self::Music),
            "__label__" => Some(Self::Label),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Self::Lua => "__lua__",
            Self::Gfx => "__gfx__",
            Self::Gff => "__gff__",
            Self::Map => "__map__",
            Self::Sfx => "__sfx__",
            Self::Music => "__music__",
            Self::Label => "__label__",
        }
    }
}

/// Everything a text cart decodes to.
pub struct ParsedCart {
    /// The populated ROM image (code region included)
    pub rom: RomImage,
    /// Label thumbnail, all-zero when the cart has no `__label__` section
    pub label: Label,
    /// The logical source text
    pub source: String,
}

/// Parse a `.p8` text cart.
///
/// Fails fast with [`CartError::FormatNotRecognized`] when the header
/// phrase is absent, so callers can fall through to the image form.
/// Oversized sections are truncated with a warning, never fatal.
pub fn parse(text: &str) -> Result<ParsedCart, CartError> {
    let mut lines = text.lines();
    match lines.next() {
        Some(header) if header.contains(HEADER_PHRASE) => {}
        _ => {
            return Err(CartError::FormatNotRecognized(
                "missing text cart header line".into(),
            ));
        }
    }

    let mut rom = RomImage::new();
    let mut label = Label::new();
    let mut source = String::new();

    let mut section: Option<Section> = None;
    let mut body: Vec<&str> = Vec::new();
    for line in lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(next) = Section::from_marker(line) {
            if let Some(current) = section {
                apply_section(current, &body, &mut rom, &mut label, &mut source);
            }
            section = Some(next);
            body.clear();
        } else if section.is_some() {
            body.push(line);
        }
        // Preamble lines (the version line) carry nothing the ROM needs.
    }
    if let Some(current) = section {
        apply_section(current, &body, &mut rom, &mut label, &mut source);
    }

    code::encode_region(rom.code_mut(), source.as_bytes());
    Ok(ParsedCart { rom, label, source })
}

fn apply_section(
    section: Section,
    body: &[&str],
    rom: &mut RomImage,
    label: &mut Label,
    source: &mut String,
) {
    match section {
        Section::Lua => *source = body.join("\n"),
        Section::Gfx => {
            let bytes = section_bytes(body, true);
            copy_capped(rom.gfx_mut(), &bytes, section.marker());
        }
        Section::Gff => {
            let bytes = section_bytes(body, false);
            copy_capped(rom.flags_mut(), &bytes, section.marker());
        }
        Section::Map => apply_map(rom, &section_bytes(body, false)),
        Section::Sfx => apply_sfx(rom, &section_bytes(body, false)),
        Section::Music => apply_music(rom, &section_bytes(body, false)),
        Section::Label => {
            let bytes = section_bytes(body, true);
            copy_capped(label.as_bytes_mut(), &bytes, section.marker());
        }
    }
}

/// Copy into a fixed region, truncating (with a warning) when the section
/// carries more bytes than the region holds.
fn copy_capped(dest: &mut [u8], bytes: &[u8], marker: &str) {
    if bytes.len() > dest.len() {
        log::warn!(
            "{marker} section holds {} bytes, destination holds {}; truncating",
            bytes.len(),
            dest.len()
        );
    }
    let take = bytes.len().min(dest.len());
    dest[..take].copy_from_slice(&bytes[..take]);
}

/// The map section may carry up to 64 rows even though the map region
/// only holds 32: historic carts populate the shared gfx/map2 bytes
/// through both their `__gfx__` and `__map__` views. Overflow rows are
/// OR-merged into the alias region so that neither view clobbers the
/// other.
fn apply_map(rom: &mut RomImage, bytes: &[u8]) {
    let direct = bytes.len().min(MAP_SIZE);
    rom.map_mut()[..direct].copy_from_slice(&bytes[..direct]);

    if bytes.len() > MAP_SIZE {
        let overflow = &bytes[MAP_SIZE..];
        if overflow.len() > rom.map2().len() {
            log::warn!(
                "__map__ section overflows even the shared region by {} bytes; truncating",
                overflow.len() - rom.map2().len()
            );
        }
        let take = overflow.len().min(rom.map2().len());
        for (slot, &byte) in rom.map2_mut()[..take].iter_mut().zip(overflow) {
            *slot |= byte;
        }
    }
}

/// Decode sfx entries from consecutive 84-byte blocks: 4 meta bytes, then
/// 32 notes at five hex digits each. The ROM entry stores the 64 note
/// bytes first and the meta bytes at the end.
fn apply_sfx(rom: &mut RomImage, bytes: &[u8]) {
    let mut blocks = bytes.chunks(SFX_BLOCK_SIZE);
    for index in 0..SFX_COUNT {
        let Some(block) = blocks.next() else { break };
        if block.len() < SFX_BLOCK_SIZE {
            break; // ignore a trailing partial block
        }
        let entry = rom.sfx_entry_mut(index);
        entry[SFX_NOTES * 2..SFX_ENTRY_SIZE].copy_from_slice(&block[0..4]);
        for j in 0..SFX_NOTES {
            let base = 4 + 5 * (j / 2);
            let bits = if j % 2 == 0 {
                note::text_bits_even(block[base], block[base + 1], block[base + 2])
            } else {
                note::text_bits_odd(block[base + 2], block[base + 3], block[base + 4])
            };
            let word = note::from_text_bits(bits);
            entry[j * 2] = (word & 0xff) as u8;
            entry[j * 2 + 1] = (word >> 8) as u8;
        }
    }
    if blocks.next().is_some() {
        log::warn!("__sfx__ section holds more than {SFX_COUNT} entries; truncating");
    }
}

/// Decode song patterns from consecutive 5-byte blocks. The flag byte's
/// low four bits are spread one bit each into the high bit of the four
/// destination channel bytes.
fn apply_music(rom: &mut RomImage, bytes: &[u8]) {
    let mut blocks = bytes.chunks(SONG_BLOCK_SIZE);
    for index in 0..SONG_COUNT {
        let Some(block) = blocks.next() else { break };
        if block.len() < SONG_BLOCK_SIZE {
            break;
        }
        let entry = rom.song_entry_mut(index);
        for channel in 0..SONG_ENTRY_SIZE {
            entry[channel] =
                (block[1 + channel] & 0x7f) | (((block[0] >> channel) & 1) << 7);
        }
    }
    if blocks.next().is_some() {
        log::warn!("__music__ section holds more than {SONG_COUNT} entries; truncating");
    }
}

/// Decode a section body into bytes: hex digits pair up, anything else
/// (whitespace, separators) is skipped. `swap` reverses the nibble order
/// of each pair, which the gfx and label sections use so that the text
/// reads pixels left to right.
fn section_bytes(body: &[&str], swap: bool) -> Vec<u8> {
    let mut nibbles = body
        .iter()
        .flat_map(|line| line.bytes())
        .filter_map(hex_value);
    let mut out = Vec::new();
    while let (Some(a), Some(b)) = (nibbles.next(), nibbles.next()) {
        out.push(if swap { (b << 4) | a } else { (a << 4) | b });
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn push_hex(out: &mut String, byte: u8) {
    out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
    out.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
}

fn push_hex_swapped(out: &mut String, byte: u8) {
    out.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
    out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
}

fn push_nibble(out: &mut String, nibble: u32) {
    out.push(HEX_DIGITS[(nibble & 0x0f) as usize] as char);
}

/// Serialize a cart to `.p8` text. The exact inverse of [`parse`], with
/// trailing all-zero lines suppressed per section.
pub fn serialize(rom: &RomImage, label: &Label, source: &str) -> String {
    let mut out = String::with_capacity(0x8000);
    out.push_str(HEADER_LINE);
    out.push('\n');
    out.push_str(&format!("version {TEXT_VERSION}\n"));

    if !source.is_empty() {
        out.push_str("__lua__\n");
        out.push_str(source);
        out.push('\n');
    }

    write_byte_section(&mut out, Section::Gfx, rom.gfx(), GFX_SIZE / 128, true);
    write_byte_section(&mut out, Section::Gff, rom.flags(), FLAGS_SIZE / 2, false);
    write_byte_section(&mut out, Section::Map, rom.map(), MAP_SIZE / 32, false);
    write_sfx_section(&mut out, rom);
    write_music_section(&mut out, rom);
    write_byte_section(&mut out, Section::Label, label.as_bytes(), LABEL_SIZE / 128, true);

    out
}

/// Write a plain byte-dump section as fixed-width hex lines, up through
/// the last line that holds a nonzero byte. All-zero sections are
/// omitted, marker included.
fn write_byte_section(
    out: &mut String,
    section: Section,
    bytes: &[u8],
    bytes_per_line: usize,
    swap: bool,
) {
    let Some(last) = bytes.iter().rposition(|&b| b != 0) else {
        return;
    };
    let lines = last / bytes_per_line + 1;

    out.push_str(section.marker());
    out.push('\n');
    for row in bytes.chunks(bytes_per_line).take(lines) {
        for &byte in row {
            if swap {
                push_hex_swapped(out, byte);
            } else {
                push_hex(out, byte);
            }
        }
        out.push('\n');
    }
}

fn write_sfx_section(out: &mut String, rom: &RomImage) {
    let Some(last) = (0..SFX_COUNT).rposition(|i| rom.sfx_entry(i).iter().any(|&b| b != 0))
    else {
        return;
    };

    out.push_str(Section::Sfx.marker());
    out.push('\n');
    for index in 0..=last {
        let entry = rom.sfx_entry(index);
        for &meta in &entry[SFX_NOTES * 2..SFX_ENTRY_SIZE] {
            push_hex(out, meta);
        }
        for j in 0..SFX_NOTES {
            let word = u16::from(entry[j * 2]) | (u16::from(entry[j * 2 + 1]) << 8);
            let bits = note::to_text_bits(word);
            for shift in [16, 12, 8, 4, 0] {
                push_nibble(out, bits >> shift);
            }
        }
        out.push('\n');
    }
}

fn write_music_section(out: &mut String, rom: &RomImage) {
    let Some(last) = (0..SONG_COUNT).rposition(|i| rom.song_entry(i).iter().any(|&b| b != 0))
    else {
        return;
    };

    out.push_str(Section::Music.marker());
    out.push('\n');
    for index in 0..=last {
        let entry = rom.song_entry(index);
        let mut flags = 0u8;
        for (channel, &byte) in entry.iter().enumerate() {
            flags |= (byte >> 7) << channel;
        }
        push_hex(out, flags);
        out.push(' ');
        for &byte in entry {
            push_hex(out, byte & 0x7f);
        }
        out.push('\n');
    }
}
