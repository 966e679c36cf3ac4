//! # Symmetriq
//!
//! Ideal body-proportion targets plus a retrieval-augmented fitness coach.
//!
//! The coach answers free-text questions from a small trusted corpus: the
//! corpus is chunked, embedded, and indexed once, then each question
//! retrieves the closest segments and hands them to a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐
//! │  Corpus  │──▶│ Chunk+Embed  │──▶│ FlatIndex │ (LRU, per corpus)
//! └──────────┘   └──────────────┘   └─────┬─────┘
//!                                         │ top-k
//!                 ┌──────────┐      ┌─────▼─────┐
//!   question ────▶│  Embed   │─────▶│ Retrieve  │──▶ Compose ──▶ Answer
//!                 └──────────┘      └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Corpus loading and content keys |
//! | [`embedding`] | Embedding providers (Hugging Face, OpenAI, Ollama, local) |
//! | [`generation`] | Generation providers (Hugging Face, OpenAI, Ollama) |
//! | [`pipeline`] | Cached index building and `ask` |
//! | [`coach`] | `ask` / `chat` commands |
//! | [`calc`] | Proportion calculator command |
//!
//! Pure pipeline building blocks live in the `symmetriq-core` crate.

pub mod calc;
pub mod coach;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod generation;
mod http;
pub mod pipeline;

