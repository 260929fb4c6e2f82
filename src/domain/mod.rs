//! Domain layer - Pages, commands and the entities scripts act on
//!
//! This layer holds the data model of the event runtime, independent of
//! scheduling, storage or transport concerns.

pub mod commands;
pub mod conditions;
pub mod descriptors;
pub mod entities;
pub mod errors;
pub mod player;
pub mod repositories;
pub mod value_objects;

pub use commands::*;
pub use conditions::*;
pub use descriptors::*;
pub use entities::*;
pub use errors::*;
pub use player::*;
pub use repositories::*;
pub use value_objects::*;
