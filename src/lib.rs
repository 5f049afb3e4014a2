//! # Refpack
//!
//! A token-budgeted knowledge-base context assembler for AI functions.
//!
//! Refpack maintains a local SQLite knowledge base of reference
//! documents in three scope tiers (system, global, entity) and
//! assembles prompt context from it: documents are selected by tier and
//! priority, packed into a per-function token budget with proportional
//! truncation, and emitted as one labeled text blob ready for prompt
//! injection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Loader  │──▶│    SQLite     │──▶│  Assembler  │
//! │  files   │   │ docs+settings │   │ tiers+budget│
//! └──────────┘   └───────────────┘   └──────┬──────┘
//!                                           │
//!                                           ▼
//!                                    ┌─────────────┐
//!                                    │   Prompt    │
//!                                    │  formatter  │
//!                                    └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! refpack init                              # create database
//! refpack load ./docs --scope global        # load reference material
//! refpack settings set qa --tokens 50000    # cap a function's budget
//! refpack assemble qa                       # emit the context blob
//! refpack prompt qa --input "What changed?" # full prompt around it
//! ```
//!
//! The assembler is also usable as a library: construct a
//! [`assemble::ContextAssembler`] over any [`store::DocumentStore`] /
//! [`store::SettingsStore`] pair. Its `assemble` method never fails;
//! store problems are logged and degrade to an empty context.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Document/settings store traits, SQLite and in-memory backends |
//! | [`budget`] | Token-budget selection policy |
//! | [`assemble`] | Context assembly |
//! | [`prompt`] | Final prompt layout |
//! | [`loader`] | File and directory loading |
//! | [`admin`] | Document and settings administration |
//! | [`stats`] | Knowledge-base statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod admin;
pub mod assemble;
pub mod budget;
pub mod config;
pub mod db;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod stats;
pub mod store;
