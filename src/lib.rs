#![deny(missing_docs)]

//! Core library for the PDF research assistant.

/// Agent roles: retriever, summarizer, and answerer.
pub mod agents;
/// HTTP routing and REST handlers.
pub mod api;
/// Request orchestration across extraction, indexing, and agents.
pub mod assistant;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction, metadata heuristics, and chunking.
pub mod extraction;
/// Embedding and indexing client over the search store.
pub mod indexing;
/// Prompt-completion clients.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Request counters.
pub mod metrics;
/// Qdrant vector store integration.
pub mod qdrant;
