//! First-person head camera
//!
//! The camera takes the arbiter's look rotation as is: head tracking, turning
//! and scripted aim are already blended there.

use bevy::prelude::*;
use grip_shared::player::HEAD_HEIGHT;
use grip_shared::{AimArbiter, LocalPlayer};

use crate::rig::HeadCamera;

/// Update camera to follow the local player's look
pub fn follow_arbiter(
    player_query: Query<(&Transform, &AimArbiter), (With<LocalPlayer>, Without<HeadCamera>)>,
    mut camera_query: Query<&mut Transform, (With<HeadCamera>, Without<LocalPlayer>)>,
) {
    let Some((player_transform, arbiter)) = player_query.iter().next() else {
        return;
    };

    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    camera_transform.translation =
        player_transform.translation + Vec3::Y * HEAD_HEIGHT + arbiter.local_offset();
    camera_transform.rotation = arbiter.rotation();
}
