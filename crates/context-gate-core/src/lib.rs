//! # Context Gate Core
//!
//! Runtime-agnostic logic for Context Gate: fragment models, the sliding
//! window chunker, the vector index abstraction, relevance re-ranking,
//! fallback-aware context selection, prompt building, and the answer
//! pipeline that wires them together.
//!
//! This crate contains no tokio, sqlx, HTTP clients or filesystem I/O.
//! Embedding, scoring, generation and persistent storage are reached only
//! through the capability traits defined here; concrete backends live in
//! the `context-gate` application crate.
//!
//! ## Query flow
//!
//! ```text
//! question ──▶ Embedder ──▶ VectorIndex::query (top_k)
//!                                │
//!                                ▼
//!                      ReRanker (cap → score → gate → sort → truncate)
//!                                │
//!                                ▼
//!                      select_context (policy) ──▶ (fragments, confidence)
//!                                │
//!                  empty? ──▶ refusal, confidence none
//!                                │
//!                                ▼
//!                      Generator::generate ──▶ answer
//! ```

pub mod chunk;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod rerank;
pub mod select;
pub mod store;

pub use error::{ConfigError, IndexError};
pub use models::{
    Confidence, ContextFragment, Fragment, FragmentMetadata, Policy, RankedFragment,
    RetrievedFragment, Section, SourceMetadata,
};
pub use pipeline::{Answer, Pipeline, REFUSAL};
