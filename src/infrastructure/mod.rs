//! Infrastructure layer - External dependencies and adapters
//!
//! This layer contains implementations that deal with external concerns
//! like file systems and serialization.

pub mod descriptors;
pub mod repositories;

pub use descriptors::*;
pub use repositories::*;
