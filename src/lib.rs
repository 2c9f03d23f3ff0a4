//! Mascon Translator
//!
//! Turns the button combinations reported by a multi-notch train controller
//! lever ("mascon") into synthetic keyboard and mouse input, so games that only
//! understand a keyboard can be driven by the real hardware.

pub mod auxiliary;
pub mod clock;
pub mod combo;
pub mod config;
pub mod device;
pub mod engine;
pub mod keys;
pub mod learn;
pub mod output;
pub mod profile;
pub mod settings;
pub mod sink;
pub mod stabilizer;
