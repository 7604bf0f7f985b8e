//! Centrality metrics for the comorbidity network.
//!
//! # Overview
//!
//! Every metric runs on the full graph and returns a [`Ranking`]: node values
//! sorted descending, ties kept in node insertion order.
//!
//! - **Degree metrics** (`basic`): degree, in/out degree and their
//!   centralities, plus signed in/out strength.
//! - **PageRank** (`pagerank`): weighted, with uniform redistribution of
//!   dangling rank.
//! - **Betweenness** (`betweenness`): weighted shortest paths, normalized.
//!
//! # Usage
//!
//! ```rust,ignore
//! use comorbnet_network::metrics::{basic::degree_metrics, betweenness::betweenness_centrality};
//! use comorbnet_network::metrics::pagerank::{PageRankConfig, pagerank};
//!
//! let degrees = degree_metrics(&g);
//! let pr = pagerank(&g, &PageRankConfig::default());
//! let bc = betweenness_centrality(&g);
//! let hubs = pr.scores.top_percent(10.0)?;
//! ```

pub mod basic;
pub mod betweenness;
pub mod pagerank;
pub mod ranking;

pub use ranking::{RankedNode, Ranking};
