//! # Briefing
//!
//! Client-side orchestration for a document summarization and
//! retrieval-augmented generation (RAG) service.
//!
//! The backend does the heavy lifting (extraction, chunking, embedding,
//! retrieval, generation). This crate owns the contract a client has to
//! uphold when talking to it: which input source is sent, how requests
//! are built and validated, how responses and failures are normalized,
//! how the system prompt persists across runs, and how purges keep the
//! collection listing consistent.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  ┌───────────────┐  ┌─────────────────┐
//! │ Summarize     │  │ Generate      │  │ Admin           │
//! │ session       │  │ session       │  │ controller      │
//! └──────┬────────┘  └──┬─────────┬──┘  └────────┬────────┘
//!        │ reconcile    │         │ prefs        │
//!        ▼              ▼         ▼              ▼
//!   ┌─────────────────────────┐ ┌────────────┐
//!   │ Backend (HTTP transport)│ │ Preference │
//!   └─────────────────────────┘ │ store      │
//!                               └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! brief summarize --url https://example.com/article
//! brief summarize --file paper.pdf --detail 70
//! brief prompt set "You are a precise research assistant."
//! brief generate "What did the paper conclude?"
//! brief collections list
//! brief collections purge "paper.pdf" --list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Transport failure type |
//! | [`transport`] | `Backend` trait and HTTP implementation |
//! | [`prefs`] | Durable preference store |
//! | [`models`] | Wire and domain types |
//! | [`reconcile`] | Input source reconciliation |
//! | [`session`] | Request lifecycle and sequencing |
//! | [`summarize`] | Summarization session controller |
//! | [`generate`] | Generation session controller |
//! | [`admin`] | Collection administration |
//! | [`display`] | Terminal rendering |
//! | [`logging`] | `tracing` subscriber setup |

pub mod admin;
pub mod config;
pub mod display;
pub mod error;
pub mod generate;
pub mod logging;
pub mod models;
pub mod prefs;
pub mod reconcile;
pub mod session;
pub mod summarize;
pub mod transport;
