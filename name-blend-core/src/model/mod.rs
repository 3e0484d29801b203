//! Local character-level n-gram synthesis.
//!
//! - Fixed-order transition tables (`NGramModel`)
//! - All orders learned from one corpus, with an on-disk cache (`CorpusModel`)
//! - Weighted interleaving of several corpus models (`Blender`)
//! - Internal transition counts (`State`)

/// Weighted multi-corpus name synthesis with length bounds.
pub mod blend;

/// Every n-gram order of one corpus; parallel training and `postcard` cache.
pub mod corpus_model;

/// Fixed-order (`n >= 2`) transition table.
pub mod ngram_model;

/// Transition counts of one prefix. Not exposed publicly.
mod state;
