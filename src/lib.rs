//! Company Research Assistant
//!
//! A demo conversational backend that:
//! - Keeps per-session chat state in memory
//! - Simulates research across weighted, possibly contradictory sources
//! - Flags fields whose sources disagree too closely to call
//! - Composes account plans with a pluggable text generator
//!
//! REQUEST FLOW:
//! SESSION → CLASSIFY → RESOLVE → COMPOSE/REPLY → RECORD

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod models;
pub mod planner;
pub mod research;
pub mod state;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::PersonaDetector;
pub use research::{resolve, ResolutionEngine};
