//! Tracking relay: publish the local head and hand, read back everyone else's.

use bevy::prelude::*;
use grip_shared::protocol::{InputChannel, TrackingUpdate};
use grip_shared::{
    GrabState, HandReferenceResolver, HandSource, LocalPlayer, PeerHands, Player, PlayerHandle,
    PlayerId, Pose, TrackedPose,
};
use lightyear::prelude::*;
use std::collections::HashMap;

use crate::rig::RigPose;

/// Primary-hand transforms of remote peers, refreshed every tick
#[derive(Resource, Default, Debug)]
pub struct PeerHandCache {
    hands: HashMap<PlayerId, Transform>,
}

impl PeerHands for PeerHandCache {
    fn resolve_peer_hand(&self, player: PlayerId) -> Option<Transform> {
        self.hands.get(&player).copied()
    }
}

pub fn update_peer_hand_cache(
    mut cache: ResMut<PeerHandCache>,
    client_query: Query<&LocalId, (With<crate::GameClient>, With<Connected>)>,
    players: Query<(&Player, &TrackedPose)>,
) {
    let own = client_query.iter().next().map(|local| local.0);
    cache.hands.clear();
    for (player, pose) in players.iter() {
        if Some(player.client_id) == own {
            continue;
        }
        if let Some(hand) = pose.hand.filter(Pose::is_finite) {
            cache.hands.insert(player.id(), hand.to_transform());
        }
    }
}

/// Send the local rig pose to the server at the fixed tick rate
pub fn send_tracking_to_server(
    mut client_query: Query<
        &mut MessageSender<TrackingUpdate>,
        (With<crate::GameClient>, With<Connected>),
    >,
    players: Query<&RigPose, With<LocalPlayer>>,
    time: Res<Time>,
    mut last_warn_time: Local<f32>,
) {
    let Ok(mut sender) = client_query.single_mut() else {
        let now = time.elapsed_secs();
        if now - *last_warn_time > 1.0 {
            warn!("send_tracking_to_server: missing GameClient+Connected+MessageSender<TrackingUpdate>; not sending tracking");
            *last_warn_time = now;
        }
        return;
    };
    let Ok(pose) = players.single() else {
        return;
    };
    let Some(head) = pose.head else {
        return;
    };

    let update = TrackingUpdate {
        head: Pose::from_transform(&head),
        hand: pose.hand.map(|hand| Pose::from_transform(&hand)),
    };
    let _ = sender.send::<InputChannel>(update);
}

/// Draw where each remote player's hand resolves to
pub fn draw_remote_hands(
    peers: Res<PeerHandCache>,
    client_query: Query<&LocalId, (With<crate::GameClient>, With<Connected>)>,
    players: Query<(&Player, &TrackedPose), Without<LocalPlayer>>,
    mut gizmos: Gizmos,
) {
    let own = client_query.iter().next().map(|local| local.0);
    let resolver = HandReferenceResolver::new(&*peers, None, None);
    let idle = GrabState::default();

    for (player, pose) in players.iter() {
        if Some(player.client_id) == own || !pose.head.is_finite() {
            continue;
        }
        let head = pose.head.to_transform();
        let handle = PlayerHandle {
            id: player.id(),
            is_local: false,
            hand: None,
            head: Some(head),
        };
        let resolved = resolver.resolve(&handle, &idle);
        let color = match resolved.source {
            HandSource::PeerHand => Color::srgb(0.3, 1.0, 0.4),
            _ => Color::srgb(0.6, 0.6, 0.6),
        };
        let hand = resolved.transform;
        gizmos.sphere(Isometry3d::from_translation(hand.translation), 0.05, color);
        gizmos.line(hand.translation, hand.translation + hand.forward() * 0.5, color);
    }
}
