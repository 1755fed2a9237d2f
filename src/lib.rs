//! Calibrated three-way sentiment analysis for local candle classifiers.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). A binary
//! positive/negative classifier is turned into a Positive/Negative/Neutral
//! answer with a confidence score that accounts for contrastive sentences and
//! hedging or emphatic wording.

#![deny(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod models;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod error;

pub use pipelines::sentiment;
