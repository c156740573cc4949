//! `cinder info` - cart inspection

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use cinder_cart::{Cart, code, rom};

#[derive(Args)]
pub struct InfoArgs {
    /// Cart file (.p8 or .p8.png)
    pub cart: PathBuf,

    /// Emit machine-readable JSON instead of the human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SectionInfo {
    name: &'static str,
    size: usize,
    used: usize,
}

#[derive(Serialize)]
struct CartInfo {
    path: String,
    sections: Vec<SectionInfo>,
    source_bytes: usize,
    source_lines: usize,
    legacy_bytes: usize,
    pxa_bytes: usize,
    chosen: &'static str,
    code_capacity: usize,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let cart = Cart::load(&args.cart)
        .with_context(|| format!("loading {}", args.cart.display()))?;
    let info = gather(&cart, &args.cart.display().to_string());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_summary(&info);
    }
    Ok(())
}

fn occupancy(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b != 0).count()
}

fn gather(cart: &Cart, path: &str) -> CartInfo {
    let rom = cart.rom();
    let legacy_bytes = code::legacy::compress(cart.source().as_bytes()).len();
    let pxa_bytes = code::pxa::compress(cart.source().as_bytes()).len();

    CartInfo {
        path: path.to_string(),
        sections: vec![
            SectionInfo {
                name: "gfx",
                size: rom.gfx().len(),
                used: occupancy(rom.gfx()),
            },
            SectionInfo {
                name: "map",
                size: rom.map().len(),
                used: occupancy(rom.map()),
            },
            SectionInfo {
                name: "flags",
                size: rom.flags().len(),
                used: occupancy(rom.flags()),
            },
            SectionInfo {
                name: "song",
                size: rom.song().len(),
                used: occupancy(rom.song()),
            },
            SectionInfo {
                name: "sfx",
                size: rom.sfx().len(),
                used: occupancy(rom.sfx()),
            },
        ],
        source_bytes: cart.source().len(),
        source_lines: cart.source().lines().count(),
        legacy_bytes,
        pxa_bytes,
        chosen: if pxa_bytes <= legacy_bytes {
            "pxa"
        } else {
            "legacy"
        },
        code_capacity: rom::CODE_SIZE,
    }
}

fn print_summary(info: &CartInfo) {
    println!("{}", info.path);
    println!("  sections:");
    for section in &info.sections {
        println!(
            "    {:<5} {:>5} / {:>5} bytes used",
            section.name, section.used, section.size
        );
    }
    println!(
        "  code: {} bytes over {} lines",
        info.source_bytes, info.source_lines
    );
    println!(
        "  compressed: legacy {} bytes, pxa {} bytes -> keeping {}",
        info.legacy_bytes, info.pxa_bytes, info.chosen
    );
    let best = info.legacy_bytes.min(info.pxa_bytes);
    if best > info.code_capacity {
        println!(
            "  warning: compressed code exceeds the {}-byte code region by {} bytes",
            info.code_capacity,
            best - info.code_capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_counts_sections() {
        let text = "pico-8 cartridge // http://www.pico-8.com\nversion 42\n\
                    __lua__\nprint(1)\nprint(2)\n__gfx__\n1200\n__gff__\n8000\n";
        let cart = Cart::from_bytes(text.as_bytes(), "mini").unwrap();
        let info = gather(&cart, "mini.p8");

        assert_eq!(info.source_lines, 2);
        assert_eq!(info.source_bytes, "print(1)\nprint(2)".len());
        let gfx = info.sections.iter().find(|s| s.name == "gfx").unwrap();
        assert_eq!(gfx.used, 1, "only 0x21 is nonzero");
        let flags = info.sections.iter().find(|s| s.name == "flags").unwrap();
        assert_eq!(flags.used, 1);
        assert!(info.legacy_bytes > 0 && info.pxa_bytes > 0);
        assert_eq!(info.code_capacity, rom::CODE_SIZE);
    }
}
