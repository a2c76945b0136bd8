// Library exports for the A* Battlesnake
// This allows the replay tool and integration tests to use the core planning logic

pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod heuristic;
pub mod node;
pub mod planner;
pub mod policy;
pub mod replay;
pub mod snapshot;
pub mod threat;
pub mod types;

pub use policy::{decide_move, Decision, DecisionError, DecisionSource, FallbackReason};
pub use snapshot::{Agent, BoardSnapshot, ObstacleSet};
