#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for autoinstall.
//!
//! Pure helpers with no logging/tracing dependencies. Logging is left to
//! whatever embeds the core crate.

pub mod fs;
pub mod path;
