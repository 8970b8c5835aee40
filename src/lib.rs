//! # Context Gate
//!
//! Retrieval-augmented answering that refuses to guess. Documents are
//! chunked into overlapping character windows, embedded and stored in
//! SQLite. At question time the nearest fragments are re-scored by a
//! cross-encoder, gated by a minimum relevance, and only then handed to a
//! language model. When nothing passes the gate, the configured policy
//! decides between refusing (`fail_closed`) and falling back to the raw
//! vector matches (`fail_open`, `hybrid`).
//!
//! The pipeline components themselves live in `context-gate-core`; this
//! crate supplies configuration, the persistent index, model providers,
//! ingestion, the `cgate` CLI and the HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Documents  │──▶│ Chunk+Embed  │──▶│  SQLite  │
//! │ PDF/MD/TXT  │   │  (ingest)    │   │ vectors  │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                   ┌───────────────────────┤
//!                   ▼                       ▼
//!            ┌────────────┐          ┌────────────┐
//!            │ Re-rank +  │─────────▶│ Generator  │
//!            │  policy    │          │ (LLM)      │
//!            └────────────┘          └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`sqlite_index`] | Persistent [`VectorIndex`](context_gate_core::store::VectorIndex) |
//! | [`embedding`] | Embedding providers |
//! | [`scoring`] | Relevance scorer providers |
//! | [`generation`] | Language-model providers |
//! | [`ingest`] | File scanning, extraction and indexing |
//! | [`answer`] | Pipeline assembly, `ask` and `retrieve` |
//! | [`server`] | HTTP chat server |

pub mod answer;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod scoring;
pub mod server;
pub mod sqlite_index;
pub mod stats;
