//! Command-line front ends

pub mod check;
pub mod play;
