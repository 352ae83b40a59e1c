//! Docent Audio - Exhibit volume control
//!
//! Exhibits play narration and music through a [`GainGraph`]. The docent
//! controls volume through the reported state: whatever `volume-level` and
//! `volume-muted` say on `state/{exhibit}` is mirrored onto the graph's
//! master stage by a [`VolumeBridge`].
//!
//! # Architecture
//!
//! ```text
//! state/{exhibit} ──► VolumeBridge ──► GainGraph (master)
//!                                          │
//!                        ┌─────────────────┼─────────────────┐
//!                        ▼                 ▼                 ▼
//!                   narration            music            effects
//! ```

pub mod bridge;
pub mod graph;

pub use bridge::VolumeBridge;
pub use graph::{Channel, GainGraph};
