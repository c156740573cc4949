//! `cinder convert` - transcode carts between on-disk forms

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use cinder_cart::Cart;

#[derive(Args)]
pub struct ConvertArgs {
    /// Input cart (.p8 or .p8.png)
    pub input: PathBuf,

    /// Output file; the form is picked by its extension
    /// (.p8, .p8.png or .bin)
    pub output: PathBuf,
}

pub fn execute(args: ConvertArgs) -> Result<()> {
    let cart = Cart::load(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let name = args
        .output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let written = if name.ends_with(".png") {
        cart.save_as_png(&args.output)
    } else if name.ends_with(".p8") {
        cart.save_as_p8(&args.output)
    } else if name.ends_with(".bin") {
        cart.save_as_bin(&args.output)
    } else {
        bail!(
            "unsupported output form: {} (expected .p8, .p8.png or .bin)",
            args.output.display()
        );
    };
    written.with_context(|| format!("writing {}", args.output.display()))?;

    println!("wrote {}", args.output.display());
    Ok(())
}
