//! Server-side relay systems
//!
//! Updated for Lightyear 0.25

use bevy::prelude::*;
use grip_shared::protocol::TrackingUpdate;
use grip_shared::{Player, TrackedPose};
use lightyear::prelude::server::*;
use lightyear::prelude::*;
use std::collections::HashMap;

/// Replicated player entity of each connected peer.
#[derive(Resource, Default)]
pub struct PlayerEntities {
    pub by_peer: HashMap<PeerId, Entity>,
}

/// Handle new client connections: enable replication and spawn the peer's player
/// In Lightyear 0.25, we query for newly added ClientOf + Connected entities
pub fn handle_connections(
    mut commands: Commands,
    mut players: ResMut<PlayerEntities>,
    // Query for client links that just got Connected
    new_clients: Query<(Entity, &RemoteId), (Added<Connected>, With<ClientOf>)>,
) {
    for (client_entity, remote_id) in new_clients.iter() {
        let peer_id = remote_id.0;

        // Lightyear 0.25 needs these on the connection entity, otherwise nothing flows.
        commands.entity(client_entity).insert((
            // Replication out: server -> this client
            ReplicationSender::new(
                grip_shared::protocol::tick_duration(),
                SendUpdatesMode::SinceLastAck,
                false,
            ),
            // Client -> Server
            MessageReceiver::<TrackingUpdate>::default(),
        ));

        if players.by_peer.contains_key(&peer_id) {
            continue;
        }

        let player_entity = commands
            .spawn((
                Player { client_id: peer_id },
                TrackedPose::default(),
                Replicate::new(ReplicationMode::SingleServer(NetworkTarget::All)),
                ControlledBy {
                    owner: client_entity,
                    lifetime: Lifetime::default(),
                },
            ))
            .id();
        players.by_peer.insert(peer_id, player_entity);

        info!("Client connected: {:?} -> player {:?}", peer_id, player_entity);
    }
}

/// Despawn the player of a disconnected client
pub fn handle_disconnections(
    trigger: On<Add, Disconnected>,
    mut commands: Commands,
    mut players: ResMut<PlayerEntities>,
    client_entities: Query<&RemoteId>,
) {
    let client_entity = trigger.entity;

    let Ok(remote_id) = client_entities.get(client_entity) else {
        warn!("Disconnect trigger for entity {:?} but no RemoteId found", client_entity);
        return;
    };
    let peer_id = remote_id.0;

    if let Some(player_entity) = players.by_peer.remove(&peer_id) {
        commands.entity(player_entity).try_despawn();
    }
    info!("Client {:?} disconnected: {:?}", client_entity, peer_id);
}

/// Keep the newest usable update; a bad pose never overwrites a good one.
pub fn latest_tracked_pose(updates: impl IntoIterator<Item = TrackingUpdate>) -> Option<TrackedPose> {
    updates
        .into_iter()
        .filter_map(TrackingUpdate::into_tracked_pose)
        .last()
}

/// Store each client's latest tracking on its replicated player
pub fn receive_tracking(
    players: Res<PlayerEntities>,
    mut client_links: Query<(&RemoteId, &mut MessageReceiver<TrackingUpdate>), With<ClientOf>>,
    mut poses: Query<&mut TrackedPose, With<Player>>,
    time: Res<Time>,
    mut last_debug_time: Local<f32>,
) {
    let now = time.elapsed_secs();
    for (remote_id, mut receiver) in client_links.iter_mut() {
        let Some(pose) = latest_tracked_pose(receiver.receive()) else {
            continue;
        };
        let Some(mut tracked) = players
            .by_peer
            .get(&remote_id.0)
            .and_then(|entity| poses.get_mut(*entity).ok())
        else {
            continue;
        };
        *tracked = pose;

        if (now - *last_debug_time) > 5.0 {
            debug!("Relaying tracking from {:?}", remote_id.0);
            *last_debug_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_shared::Pose;

    fn head_at(y: f32) -> Pose {
        Pose {
            translation: Vec3::new(0.0, y, 0.0),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn test_latest_tracked_pose_skips_bad_updates() {
        let updates = vec![
            TrackingUpdate { head: head_at(1.5), hand: None },
            TrackingUpdate { head: head_at(1.6), hand: Some(head_at(1.2)) },
            TrackingUpdate { head: head_at(f32::NAN), hand: None },
        ];

        let pose = latest_tracked_pose(updates).unwrap();
        assert_eq!(pose.head, head_at(1.6));
        assert_eq!(pose.hand, Some(head_at(1.2)));
    }

    #[test]
    fn test_latest_tracked_pose_empty() {
        assert!(latest_tracked_pose(Vec::new()).is_none());
    }
}
