//! Shared helpers.

pub mod fs;
pub mod hash;
pub mod lazy;
pub mod mime;
pub mod path;
