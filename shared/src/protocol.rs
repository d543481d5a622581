//! Lightyear network protocol definition
//!
//! The server only relays tracking: each client streams its head and hand pose,
//! the server stores it on that client's replicated `Player` entity and every
//! other client reads it back as `TrackedPose`.

use bevy::prelude::*;
use lightyear::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::components::{Player, Pose, TrackedPose};

// --- Messages ---

/// Client -> Server: this tick's tracked head and primary hand.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct TrackingUpdate {
    pub head: Pose,
    /// `None` when no controller is tracked.
    pub hand: Option<Pose>,
}

impl TrackingUpdate {
    pub fn into_tracked_pose(self) -> Option<TrackedPose> {
        if !self.head.is_finite() {
            return None;
        }
        Some(TrackedPose {
            head: self.head,
            hand: self.hand.filter(Pose::is_finite),
        })
    }
}

// --- Channels ---
// In Lightyear 0.25, Channel trait is auto-implemented for all Send + Sync + 'static types

/// Reliable channel for important messages
pub struct ReliableChannel;

/// Unreliable channel for frequent input (lowest latency)
pub struct InputChannel;

// --- Protocol Plugin ---

pub struct ProtocolPlugin;

impl Plugin for ProtocolPlugin {
    fn build(&self, app: &mut App) {
        // === PLAYER COMPONENTS ===

        app.register_component::<Player>()
            .add_prediction();

        app.register_component::<TrackedPose>();

        // === MESSAGES ===

        // Client -> Server
        app.register_message::<TrackingUpdate>()
            .add_direction(NetworkDirection::ClientToServer);

        // === CHANNELS ===

        app.add_channel::<ReliableChannel>(ChannelSettings {
            mode: ChannelMode::OrderedReliable(ReliableSettings::default()),
            ..default()
        })
        .add_direction(NetworkDirection::Bidirectional);

        app.add_channel::<InputChannel>(ChannelSettings {
            mode: ChannelMode::UnorderedUnreliable,
            ..default()
        })
        // High-frequency tracking: client -> server only
        .add_direction(NetworkDirection::ClientToServer);
    }
}

// --- Network Configuration ---

pub const SERVER_PORT: u16 = 5000;
pub const SERVER_ADDR: &str = "127.0.0.1";
pub const PROTOCOL_ID: u64 = 0x4752_4950_5348_4431;

/// Address the server binds to.
pub fn get_server_bind_addr() -> &'static str {
    "0.0.0.0"
}

/// Shared private key for local development (use proper key management in production!)
pub const PRIVATE_KEY: [u8; 32] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
    0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x20,
];

/// Fixed timestep for physics/game logic (60 Hz)
pub const FIXED_TIMESTEP_HZ: f64 = 60.0;

/// Tick duration for lightyear plugins
pub fn tick_duration() -> Duration {
    Duration::from_secs_f64(1.0 / FIXED_TIMESTEP_HZ)
}
