//! Which transform acts as a player's physical hand this tick.
//!
//! Ray casts, rotation pivots and beam anchors all start from the transform
//! returned here. Resolution never fails: each player kind has an ordered list
//! of sources and the first one available wins, ending in the world origin.

use bevy::prelude::*;

use crate::components::PlayerId;
use crate::grab::GrabState;

/// Networking collaborator: replicated primary-hand poses of remote peers.
pub trait PeerHands {
    fn resolve_peer_hand(&self, player: PlayerId) -> Option<Transform>;
}

/// Read-only view of a participant for one tick.
#[derive(Clone, Copy, Debug)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub is_local: bool,
    /// Generic main-hand anchor.
    pub hand: Option<Transform>,
    /// Head / camera transform.
    pub head: Option<Transform>,
}

/// Where a resolved hand transform came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandSource {
    /// Replicated primary hand of a remote peer.
    PeerHand,
    /// Remote peer's head.
    PeerHead,
    /// Tip of the local controller rig.
    HandTip,
    /// The player's generic main-hand anchor.
    MainHandAnchor,
    /// Local head / camera.
    Head,
    /// The scene's primary camera.
    PrimaryCamera,
    /// World origin. Always available.
    Origin,
}

const REMOTE_ORDER: &[HandSource] = &[
    HandSource::PeerHand,
    HandSource::PeerHead,
    HandSource::PrimaryCamera,
    HandSource::Origin,
];

const LOCAL_GRABBING_ORDER: &[HandSource] = &[
    HandSource::HandTip,
    HandSource::MainHandAnchor,
    HandSource::Head,
    HandSource::PrimaryCamera,
    HandSource::Origin,
];

const LOCAL_IDLE_ORDER: &[HandSource] = &[
    HandSource::Head,
    HandSource::PrimaryCamera,
    HandSource::Origin,
];

/// A hand transform plus the source that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedHand {
    pub transform: Transform,
    pub source: HandSource,
}

/// Resolves the hand origin for any player.
pub struct HandReferenceResolver<'a> {
    peers: &'a dyn PeerHands,
    /// Local controller rig tip, if a rig is present.
    hand_tip: Option<Transform>,
    primary_camera: Option<Transform>,
}

impl<'a> HandReferenceResolver<'a> {
    pub fn new(
        peers: &'a dyn PeerHands,
        hand_tip: Option<Transform>,
        primary_camera: Option<Transform>,
    ) -> Self {
        Self {
            peers,
            hand_tip,
            primary_camera,
        }
    }

    /// Ordered sources consulted for this player and grab state.
    pub fn strategy(player: &PlayerHandle, grab: &GrabState) -> &'static [HandSource] {
        if !player.is_local {
            REMOTE_ORDER
        } else if grab.grabbed || grab.override_active {
            LOCAL_GRABBING_ORDER
        } else {
            LOCAL_IDLE_ORDER
        }
    }

    pub fn resolve(&self, player: &PlayerHandle, grab: &GrabState) -> ResolvedHand {
        for &source in Self::strategy(player, grab) {
            if let Some(transform) = self.lookup(source, player) {
                return ResolvedHand { transform, source };
            }
        }
        ResolvedHand {
            transform: Transform::IDENTITY,
            source: HandSource::Origin,
        }
    }

    fn lookup(&self, source: HandSource, player: &PlayerHandle) -> Option<Transform> {
        let found = match source {
            HandSource::PeerHand => self.peers.resolve_peer_hand(player.id),
            HandSource::PeerHead | HandSource::Head => player.head,
            HandSource::HandTip => self.hand_tip,
            HandSource::MainHandAnchor => player.hand,
            HandSource::PrimaryCamera => self.primary_camera,
            HandSource::Origin => Some(Transform::IDENTITY),
        };
        // NaN poses from a stale tracker are as good as missing.
        found.filter(|t| t.translation.is_finite() && t.rotation.is_finite())
    }
}

/// No peers resolvable (offline, or the networking layer is not up yet).
pub struct NoPeers;

impl PeerHands for NoPeers {
    fn resolve_peer_hand(&self, _player: PlayerId) -> Option<Transform> {
        None
    }
}
