//! # eventweave
//!
//! A runtime for graph-shaped event scripts. Compiled pages are executed
//! one command at a time against live game entities, across many
//! independently suspendable event instances.
//!
//! ## Quick Start
//!
//! ```rust
//! use eventweave::application::api::{EventResponse, RecordingSink};
//! use eventweave::application::scheduler::EventScheduler;
//! use eventweave::config::EngineConfig;
//! use eventweave::domain::{Command, EventId, PageBuilder, Player, UserId};
//! use eventweave::infrastructure::InMemoryDescriptors;
//! use eventweave::runtime::world::World;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let page = PageBuilder::new("greeting")
//!     .root(vec![Command::ShowText {
//!         text: "Hello, \\pn!".to_string(),
//!         face: String::new(),
//!     }])
//!     .build()?;
//!
//! let sink = Arc::new(RecordingSink::new());
//! let world = World::new(
//!     EngineConfig::default(),
//!     Arc::new(InMemoryDescriptors::new()),
//!     sink.clone(),
//! );
//! let mut scheduler = EventScheduler::new(world);
//! let player = scheduler
//!     .world_mut()
//!     .add_player(Player::new("Ayumi", UserId::new(), 35, 35));
//!
//! let instance = scheduler
//!     .start_event(player, EventId::new(), Arc::new(page))?
//!     .expect("not running yet");
//! scheduler.tick();
//! assert_eq!(sink.len(), 1);
//!
//! scheduler.respond(player, instance, &EventResponse::Continue)?;
//! scheduler.tick();
//! assert_eq!(scheduler.instance_count(), 0);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod runtime;

// Stable public contracts - the main API for library users
pub use application::api::{ApiError, EventResponse, Notification, NotificationSink, Recipients, Signal};
pub use application::scheduler::{EventScheduler, TickReport};
pub use config::EngineConfig;
pub use runtime::world::World;
pub use runtime::{InterpreterError, StepOutcome, respond, step, tick};
