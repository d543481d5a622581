//! Game state machine

use bevy::prelude::*;

/// Main game states
///
/// The interaction layer runs in every state; only the tracking relay needs
/// the server.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Connecting,
    Playing,
    Offline,
}
