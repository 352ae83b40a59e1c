//! Docent Core - Exhibit navigation types
//!
//! Shared vocabulary for the exhibit navigation and state synchronization
//! protocol: one docent tablet drives many physical displays (exhibits)
//! over a pub/sub broker, and each display recovers its last-known state
//! from the broker's retained messages after a restart.
//!
//! # Protocol Overview
//!
//! ```text
//! Docent tablet                          Exhibit (basecamp, summit, ...)
//! ┌─────────────┐  cmd/dev/all/*        ┌──────────────┐
//! │             │ ────────────────────► │  router      │
//! │  issues     │  cmd/dev/{ex}/goto-beat│     │        │
//! │  commands   │ ────────────────────► │  synchronizer│
//! │             │                       │     │        │
//! │  observes   │  state/{ex} (retained)│     ▼        │
//! │  state      │ ◄──────────────────── │  reportState │
//! └─────────────┘                       └──────────────┘
//! ```
//!
//! This crate is I/O free. Transport, actors and audio live in the
//! `docent-transport`, `docent-sync` and `docent-audio` crates.

pub mod beat;
pub mod command;
pub mod exhibit;
pub mod navigator;
pub mod state;
pub mod topic;

// Re-export commonly used types
pub use beat::{BeatError, decode_beat_id, encode_beat_id, first_beat_id};
pub use command::{Command, CommandError, Envelope};
pub use exhibit::{ExhibitError, ExhibitKind, ExhibitProfile};
pub use navigator::{NavigationError, Navigator};
pub use state::{ExhibitNavigationState, ReportedState, StateError, StatePatch, merge};
pub use topic::{CommandKind, Topic};
