//! Shared ECS components used by both server and client

use bevy::prelude::*;
use lightyear::prelude::PeerId;
use serde::{Deserialize, Serialize};

// =============================================================================
// PLAYERS
// =============================================================================

/// Marker component for player entities
#[derive(Component, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Player {
    pub client_id: PeerId,
}

impl Player {
    pub fn id(&self) -> PlayerId {
        PlayerId::from_peer(self.client_id)
    }
}

/// Marker for the entity driven by this machine's headset and controllers
#[derive(Component)]
pub struct LocalPlayer;

/// Stable numeric identity of a participant, derived from the Lightyear peer id.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PlayerId(pub u64);

impl PlayerId {
    pub fn from_peer(peer_id: PeerId) -> Self {
        Self(peer_id_to_u64(peer_id))
    }
}

/// Helper to convert PeerId to u64
pub fn peer_id_to_u64(peer_id: PeerId) -> u64 {
    match peer_id {
        PeerId::Netcode(id) => id,
        PeerId::Steam(id) => id,
        PeerId::Local(id) => id,
        _ => 0, // Server or other types
    }
}

// =============================================================================
// TRACKING
// =============================================================================

/// A world-space position + orientation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn to_transform(self) -> Transform {
        Transform::from_translation(self.translation).with_rotation(self.rotation)
    }

    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            translation: transform.translation,
            rotation: transform.rotation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

/// Server-relayed head and primary-hand pose of a player.
///
/// `hand` is `None` while the peer has no tracked controller (desktop fallback,
/// controller asleep); consumers then fall back to the head.
#[derive(Component, Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TrackedPose {
    pub head: Pose,
    pub hand: Option<Pose>,
}

// =============================================================================
// INTERACTABLES
// =============================================================================

/// Large compound objects that can only be held through an override grab.
#[derive(Component, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompoundVehicle {
    Cart,
    /// Cannon mounted on a cart; grabbing it drags the cannon itself.
    CartCannon,
}

impl CompoundVehicle {
    pub fn display_name(&self) -> &'static str {
        match self {
            CompoundVehicle::Cart => "Cart",
            CompoundVehicle::CartCannon => "Cart Cannon",
        }
    }
}

/// Objects a hand can pick up with a regular grab.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Grabbable;

/// Held objects that go into the inventory when released.
#[derive(Component, Clone, Debug)]
pub struct Equippable {
    pub item_name: String,
}
