//! # SharkID Matcher (`matcher`)
//!
//! Ranks catalogued individuals for a query embedding.
//!
//! Scoring is plain cosine similarity (dot product of unit vectors). The
//! classifier looks at `max_results * oversample_factor` nearest records,
//! keeps the best score per individual, applies the threshold and returns at
//! most `max_results` candidates sorted by score. When an orientation is
//! given, only records photographed from that side are considered, unless
//! none exist.
//!
//! ```
//! use std::sync::Arc;
//! use detect::Orientation;
//! use index::{EmbeddingRecord, EmbeddingStore, StoreConfig};
//! use matcher::{MatchConfig, Matcher};
//!
//! let store = Arc::new(EmbeddingStore::open(&StoreConfig::default(), 2).unwrap());
//! store.upsert(EmbeddingRecord::new("shark-7", "Hook", vec![0.6, 0.8])).unwrap();
//!
//! let matcher = Matcher::new(store, MatchConfig::default()).unwrap();
//! let hits = matcher.find_candidates(&[0.6, 0.8], Orientation::Unspecified).unwrap();
//! assert_eq!(hits[0].individual_id, "shark-7");
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to
//! record per-query latency and hit counts.

pub mod engine;
pub mod metrics;
pub mod types;

pub use crate::engine::{rank_records, Matcher};
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::types::{Candidate, MatchConfig, MatchError};
