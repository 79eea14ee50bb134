//! # afphylo
//!
//! `afphylo` computes alignment-free dissimilarities between biological sequences
//! from their k-mer (word) count profiles, using the D2 family of statistics.
//!
//! All pairwise scores are assembled into a symmetric distance matrix, optionally
//! on a worker pool, ready for an external tree-building tool such as neighbor-joining.

pub mod config;
pub mod distance;
pub mod error;
pub mod kmer;
pub mod matrix;
pub mod sequence;
pub mod startup;
pub mod statistics;

pub use config::{EngineConfig, StatisticKind};
pub use distance::MatrixBuilder;
pub use error::{Error, Result};
pub use matrix::DistanceMatrix;
pub use sequence::{Sequence, SequenceCollection};
pub use statistics::{Measure, Statistic};
