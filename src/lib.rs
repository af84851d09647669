//! # Smart Librarian
//!
//! A retrieval-augmented librarian for a fixed catalog of book summaries.
//!
//! Smart Librarian resolves free-text requests to catalog entries
//! through three tiers (exact title match, fuzzy title match, and
//! semantic search over embedded summaries) and always answers with
//! the verbatim stored summary, optionally letting an LLM assistant
//! pick among semantic candidates via tool calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────────┐
//! │ Catalog   │──▶│  Retriever    │──▶│  RetrievalResult │
//! │ (JSON)    │   │ exact→fuzzy→  │   │ Exact/Fuzzy/     │
//! └──────────┘   │   semantic    │   │ Semantic/Empty   │
//!                └──────┬────────┘   └────────┬─────────┘
//!                       │                     │
//!              ┌────────▼───────┐    ┌────────▼────────┐
//!              │ EmbeddingIndex │    │  Summary Tool    │
//!              │ (persisted)    │    │ (verbatim text)  │
//!              └────────────────┘    └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! libr titles                    # list the catalog
//! libr ask "Dune"                # exact match, verbatim summary
//! libr ask "Dyun"                # fuzzy match
//! libr index build               # embed summaries (needs a provider)
//! libr ask "a book about spice"  # semantic search
//! libr chat                      # interactive loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`catalog`] | Dataset loading and lookup |
//! | [`matcher`] | Exact and fuzzy title matching |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`index`] | Embedding index and persistence |
//! | [`retriever`] | Three-tier resolution policy |
//! | [`tools`] | Summary tool and tool registry |
//! | [`assistant`] | Optional OpenAI tool-calling layer |
//! | [`ask`] | Query router (`ask`, `chat`) |
//! | [`index_cmd`] | `index build` / `index status` |

pub mod ask;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod index;
pub mod index_cmd;
pub mod matcher;
pub mod retriever;
pub mod summary;
pub mod titles;
pub mod tools;
