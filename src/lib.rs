//! A library to query and change the mode of the active display.
//!
//! This library wraps the native display configuration API behind the [`ModeCatalog`] trait
//! and implements mode string parsing and exact mode matching on top of it.

mod display;
pub mod memory;
pub mod platform;
mod types;

pub use display::*;
pub use types::*;
