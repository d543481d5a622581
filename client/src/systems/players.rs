//! Remote player avatars
//!
//! Replicated `Player` entities get a floating head; their transform follows the
//! relayed `TrackedPose`. Our own echo from the server is left invisible.

use bevy::prelude::*;
use grip_shared::{Player, TrackedPose};
use lightyear::prelude::*;

/// A remote player that already has visuals attached
#[derive(Component)]
pub struct RemoteAvatar;

#[derive(Resource, Clone)]
pub struct AvatarAssets {
    pub head_mesh: Handle<Mesh>,
    pub head_material: Handle<StandardMaterial>,
}

pub fn setup_avatar_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(AvatarAssets {
        head_mesh: meshes.add(Sphere::new(0.15)),
        head_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.4, 0.5, 0.9),
            perceptual_roughness: 0.6,
            ..default()
        }),
    });
}

/// Attach visuals to remote players. Runs every frame so late `LocalId`s converge.
pub fn attach_remote_avatars(
    mut commands: Commands,
    assets: Option<Res<AvatarAssets>>,
    client_query: Query<&LocalId, (With<crate::GameClient>, With<Connected>)>,
    players: Query<(Entity, &Player), Without<RemoteAvatar>>,
) {
    let Some(assets) = assets else {
        return;
    };
    let Some(own) = client_query.iter().next().map(|local| local.0) else {
        return;
    };

    for (entity, player) in players.iter() {
        if player.client_id == own {
            continue;
        }
        commands.entity(entity).insert((
            RemoteAvatar,
            Mesh3d(assets.head_mesh.clone()),
            MeshMaterial3d(assets.head_material.clone()),
            Transform::default(),
            Visibility::default(),
        ));
        info!("Remote player {:?} joined", player.id());
    }
}

pub fn sync_remote_avatars(mut avatars: Query<(&TrackedPose, &mut Transform), With<RemoteAvatar>>) {
    for (pose, mut transform) in avatars.iter_mut() {
        if pose.head.is_finite() {
            *transform = pose.head.to_transform();
        }
    }
}
