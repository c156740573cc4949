//! Cinder cartridge codec
//!
//! Carts for the Cinder fantasy console travel in three interchangeable
//! on-disk forms, and this crate is the transcoder between them:
//!
//! - `.p8` - a human-readable, section-based text file ([`text`])
//! - `.p8.png` - artwork with the ROM hidden in the two low bits of
//!   every pixel channel ([`png`])
//! - `.bin` - a raw ROM export
//!
//! The fixed 32 KiB ROM layout lives in [`rom`]; the two code
//! compression schemes and the size-based chooser live in [`code`];
//! [`cart::Cart`] orchestrates loading and saving.
//!
//! All operations are synchronous, whole-buffer transforms. Nothing here
//! validates or runs the cart's source text; the decoded source and the
//! populated ROM image are handed to the language and runtime layers
//! as-is.

pub mod cart;
pub mod code;
pub mod error;
pub mod note;
pub mod png;
pub mod rom;
pub mod text;

pub use cart::Cart;
pub use error::CartError;
pub use rom::{Label, RomImage};
