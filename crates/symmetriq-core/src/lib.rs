//! # Symmetriq Core
//!
//! Runtime-free logic for Symmetriq: the retrieval-augmented answering
//! pipeline's building blocks and the body-proportion calculator.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Concrete embedding and generation services
//! are supplied by the application through the [`embedding::Embedder`]
//! and [`compose::Generator`] traits.

pub mod calculator;
pub mod chunk;
pub mod compose;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod retrieve;
