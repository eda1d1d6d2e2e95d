//! Transport adapters

pub mod console;
#[cfg(feature = "whatsapp")]
pub mod whatsapp;
