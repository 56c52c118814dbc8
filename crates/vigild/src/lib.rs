//! Vigil engine - presence change tracking and session accounting.
//!
//! This crate turns an unbounded, possibly-duplicated stream of
//! presence-change events into durable session records and debounced
//! notifications:
//! - `tracker` - the tracker actor owning all subject state (registry
//!   + transition state machine)
//! - `debounce` - per-subject duplicate-burst suppression
//! - `dispatch` - best-effort notification routing
//! - `store` - durable-store adapter (document per subject)
//! - `config` - engine configuration
//! - `wire` - the JSONL ingest/control line protocol
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       vigild engine                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  presence events ──▶ ┌──────────────┐   ┌────────────────┐   │
//! │  (TrackerHandle)     │ DebounceGate │──▶│  TrackerActor  │   │
//! │                      └──────────────┘   │ (state owner)  │   │
//! │                                         └───────┬────────┘   │
//! │                         spawned, fire-and-forget│            │
//! │                      ┌──────────────────────────┤            │
//! │                      ▼                          ▼            │
//! │             ┌────────────────┐        ┌──────────────────┐   │
//! │             │   Dispatcher   │        │   StoreWriter    │   │
//! │             │ (notify sink)  │        │ (ordered queue)  │   │
//! │             └────────────────┘        └────────┬─────────┘   │
//! │                                                ▼             │
//! │                                      ┌──────────────────┐    │
//! │                                      │   SubjectStore   │    │
//! │                                      │ (passive mirror) │    │
//! │                                      └──────────────────┘    │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All state mutation happens synchronously inside the single actor
//! task before any asynchronous I/O is issued, so a second event for
//! the same subject always observes the already-updated snapshot.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod store;
pub mod tracker;
pub mod wire;
