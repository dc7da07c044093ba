//! CodeArena - Live Coding Contest Engine
//!
//! This library provides the core functionality for CodeArena, the server that
//! runs timed multi-participant programming contests: it judges submitted code
//! against test suites and maintains a consistent, live-updating leaderboard
//! under concurrent submissions across several simultaneous contests.
//!
//! # Architecture
//!
//! The engine follows an actor-per-contest design:
//! - **Gateway**: WebSocket termination and protocol marshalling (thin layer)
//! - **Rooms**: one serialized command queue per live contest, sole owner of its state
//! - **Scoring / Leaderboard**: pure functions applied by the room
//! - **Judge**: async client to the external code-execution sandbox
//! - **Store**: narrow persistence seam (load contest, flush final results)

pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod judge;
pub mod leaderboard;
pub mod models;
pub mod protocol;
pub mod room;
pub mod scoring;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
