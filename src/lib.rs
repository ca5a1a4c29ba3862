//! Graphprep: dataset preparation for graph-learning examples
//!
//! This crate prepares the small datasets used in graph-learning tutorials:
//!
//! 1. **Fetch** -- Download the DRKG knowledge-graph archive (gzipped tar) into a
//!    local data directory and extract it, with bounded retries and backoff
//! 2. **Triple Indexing** -- Scan a TSV of (subject, predicate, object) triples,
//!    assign each (type, raw-id) entity a dense per-type integer id in first-seen
//!    order, then group edges by their (src-type, predicate, dst-type) key
//! 3. **Citation Re-indexing** -- Rewrite the small academic-citation relation
//!    tables to dense integer ids with deterministic sorted-order assignment
//! 4. **Social Graph Loading** -- Load the labeled karate-club graph from CSV
//!    into edge vectors with integer club labels and a one-hot encoding
//!
//! # Design
//!
//! Everything runs single-threaded and to completion; all mappings are built
//! once, held in memory, and never mutated afterwards. Data-shape errors
//! (malformed identifiers, unknown entities, unmapped references) are fatal --
//! there is no partial-output mode, since downstream correctness depends on
//! complete, consistent mappings. The two id-assignment policies differ on
//! purpose: triple indexing uses first-seen order (driven by the input
//! sequence), citation re-indexing uses sorted order (reproducible across runs).
//!
//! # Key Modules
//!
//! - [`triples`] -- Compound-identifier parsing and TSV triple loading
//! - [`entity`] -- Per-type dense id assignment (the entity dictionary)
//! - [`edges`] -- Edge grouping by (src-type, predicate, dst-type)
//! - [`reindex`] -- Citation-table re-indexing with sorted id maps
//! - [`fetch`] -- Archive download and extraction with bounded retry
//! - [`karate`] -- Labeled social-graph CSV loading
//! - [`models`] -- Core data types (Triple, EntityRef, EdgeType, LabeledGraph)
//! - [`error`] -- Error taxonomy for data-shape and download failures
//! - [`config`] -- Constants (delimiter, URLs, retry bounds, buffer sizes)

pub mod config;
pub mod edges;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod karate;
pub mod models;
pub mod reindex;
pub mod triples;
