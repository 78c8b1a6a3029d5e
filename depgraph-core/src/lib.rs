//! depgraph core library: harvest a remote component-dependency graph into
//! a local store, keep it consistent, and answer dependency queries.
//!
//! The main entry point is [`pipeline::SyncPipeline`], which runs
//! discover → inventory → stats → edges against a [`store::GraphStore`].
//! [`repair::ConsistencyRepairer`] and [`resolve::DependencyResolver`] run
//! independently of it.

pub mod catalog;
pub mod config;
pub mod error;
pub mod harvest;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod repair;
pub mod resolve;
pub mod source;
pub mod stats;
pub mod store;
pub mod types;
