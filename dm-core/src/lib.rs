//! Single-player interactive-fiction engine with a turn-based game loop.
//!
//! This crate provides:
//! - A session state store owning all mutable per-session data
//! - An intent resolution pipeline over an external NLU classifier
//! - A turn-based combat sub-machine with planned monster turns
//! - A two-phase (`can_*` / `execute_*`) action layer
//! - A trigger dispatcher for room and monster content
//! - Snapshot persistence for resumable sessions
//!
//! # Quick Start
//!
//! ```ignore
//! use dm_core::{AdventureDef, Session, SessionConfig};
//! use dm_core::nlu::RasaClassifier;
//! use dm_core::planning::InstinctPlanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_seed(42);
//!     let classifier = RasaClassifier::from_env()?;
//!     let mut session =
//!         Session::new(config, &AdventureDef::sample(), classifier, InstinctPlanner)?;
//!
//!     println!("{}", session.start());
//!     let reply = session.input("attack the giant rat").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod adventure;
pub mod catalog;
pub mod combat;
pub mod dice;
pub mod entity;
pub mod nlg;
pub mod nlu;
pub mod planning;
pub mod session;
pub mod state;
pub mod testing;
pub mod triggers;
pub mod world;

// Primary public API
pub use adventure::{AdventureDef, AdventureError};
pub use dice::{DiceSpec, DieType, RollOutcome};
pub use entity::{Entity, EntityId, EntityRegistry};
pub use nlu::{Classifier, Intent};
pub use planning::{InstinctPlanner, Planner};
pub use session::{Reply, Session, SessionConfig, SessionError, Snapshot};
pub use state::{CombatStatus, SessionState};
pub use testing::{MockClassifier, ScriptedPlanner, TestHarness};
