//! Simulated multi-source company research
//!
//! Sources and the baseline are leaf data; the resolver merges them.

pub mod resolver;
pub mod sources;

pub use resolver::{resolve, FieldVoteTable, ResolutionEngine, CONFLICT_MARGIN};
pub use sources::{
    create_default_registry, default_baseline, BaselineStore, Source, SourceRegistry,
};
