//! Topic scheme
//!
//! Exact topic strings are part of the wire contract:
//!
//! | Topic | Direction |
//! |---|---|
//! | `cmd/dev/all/load-tour` | in, broadcast |
//! | `cmd/dev/all/go-idle` | in, broadcast |
//! | `cmd/dev/all/end-tour` | in, broadcast |
//! | `cmd/dev/{exhibit}/goto-beat` | in, targeted |
//! | `state/{exhibit}` | out, retained |

use crate::exhibit::ExhibitKind;
use std::fmt;

/// Scope segment shared by every exhibit
pub const BROADCAST_SCOPE: &str = "all";

/// Command name carried in the last topic segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    LoadTour,
    GoIdle,
    EndTour,
    GotoBeat,
}

impl CommandKind {
    /// Topic segment for this command
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadTour => "load-tour",
            Self::GoIdle => "go-idle",
            Self::EndTour => "end-tour",
            Self::GotoBeat => "goto-beat",
        }
    }

    /// Whether this command travels on the `all` broadcast scope
    pub fn is_broadcast(&self) -> bool {
        !matches!(self, Self::GotoBeat)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pub/sub channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `cmd/dev/all/{command}`
    Broadcast(CommandKind),
    /// `cmd/dev/{exhibit}/{command}`
    Targeted(ExhibitKind, CommandKind),
    /// `state/{exhibit}`
    State(ExhibitKind),
}

impl Topic {
    /// Topic on which `exhibit` receives `command`
    pub fn command(exhibit: ExhibitKind, command: CommandKind) -> Self {
        if command.is_broadcast() {
            Self::Broadcast(command)
        } else {
            Self::Targeted(exhibit, command)
        }
    }

    /// Every command topic an exhibit listens on
    pub fn command_topics(exhibit: ExhibitKind) -> [Topic; 4] {
        [
            CommandKind::LoadTour,
            CommandKind::GoIdle,
            CommandKind::EndTour,
            CommandKind::GotoBeat,
        ]
        .map(|command| Self::command(exhibit, command))
    }

    /// Command carried by this topic, if any
    pub fn command_kind(&self) -> Option<CommandKind> {
        match self {
            Self::Broadcast(command) | Self::Targeted(_, command) => Some(*command),
            Self::State(_) => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast(command) => write!(f, "cmd/dev/{}/{}", BROADCAST_SCOPE, command),
            Self::Targeted(exhibit, command) => write!(f, "cmd/dev/{}/{}", exhibit, command),
            Self::State(exhibit) => write!(f, "state/{}", exhibit),
        }
    }
}
