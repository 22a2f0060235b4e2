//! Small platform helpers.

pub mod browser;
