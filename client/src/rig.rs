//! Local player rig: head camera, main-hand anchor and controller hand tip.
//!
//! Without a headset the mouse stands in for head tracking and the hand rests
//! at a fixed offset in front of the head. The hand tip can be toggled off
//! (F2) to exercise the hand fallbacks.

use bevy::prelude::*;
use grip_shared::math::yaw_only;
use grip_shared::player::{HAND_REST_OFFSET, HAND_TIP_LENGTH, RIG_WALK_SPEED, SPAWN_POSITION};
use grip_shared::{AimArbiter, GrabCapable, GrabState, InteractionSettings, LocalPlayer};

use crate::input::InputState;
use crate::interaction::{BeamAnchors, GrabIntent, HandOrigin};

// =============================================================================
// COMPONENTS & RESOURCES
// =============================================================================

/// The camera driven by the local head
#[derive(Component)]
pub struct HeadCamera;

/// Generic main-hand anchor, always present on the local rig
#[derive(Component)]
pub struct MainHandAnchor;

/// Controller tip; missing while the controller is asleep
#[derive(Component)]
pub struct HandTip;

/// Head rotation reported by the tracker, in tracking space
#[derive(Component, Default)]
pub struct RigTracking {
    pub head_rotation: Quat,
}

/// World-space head and hand of the local rig, refreshed every frame
#[derive(Component, Default)]
pub struct RigPose {
    pub head: Option<Transform>,
    pub hand: Option<Transform>,
}

/// Where recenter puts the player back
#[derive(Component, Clone, Copy)]
pub struct SpawnPose {
    pub translation: Vec3,
    pub yaw_degrees: f32,
}

#[derive(Resource, Clone)]
pub struct RigAssets {
    pub tip_mesh: Handle<Mesh>,
    pub tip_material: Handle<StandardMaterial>,
}

// =============================================================================
// SPAWNING
// =============================================================================

pub fn spawn_local_rig(
    mut commands: Commands,
    settings: Res<InteractionSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let spawn = Vec3::from(SPAWN_POSITION);

    commands.spawn((
        Name::new("Local Player"),
        LocalPlayer,
        Transform::from_translation(spawn),
        GrabState::default(),
        GrabCapable::Full,
        AimArbiter::new(settings.aim),
        RigTracking::default(),
        RigPose::default(),
        HandOrigin::default(),
        GrabIntent::default(),
        BeamAnchors::default(),
        SpawnPose {
            translation: spawn,
            yaw_degrees: 0.0,
        },
    ));

    commands.spawn((
        Name::new("Head Camera"),
        HeadCamera,
        Camera3d::default(),
        Transform::from_translation(spawn),
    ));

    let hand_mesh = meshes.add(Cuboid::new(0.08, 0.05, 0.16));
    let hand_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.85, 0.7, 0.55),
        perceptual_roughness: 0.8,
        ..default()
    });
    commands.spawn((
        Name::new("Main Hand"),
        MainHandAnchor,
        Mesh3d(hand_mesh),
        MeshMaterial3d(hand_material),
        Transform::from_translation(spawn),
    ));

    let assets = RigAssets {
        tip_mesh: meshes.add(Sphere::new(0.025)),
        tip_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.2, 0.8, 1.0),
            emissive: LinearRgba::rgb(0.2, 0.8, 1.0),
            ..default()
        }),
    };
    spawn_hand_tip(&mut commands, &assets, spawn);
    commands.insert_resource(assets);

    info!("Spawned local rig at {:?}", spawn);
}

fn spawn_hand_tip(commands: &mut Commands, assets: &RigAssets, at: Vec3) {
    commands.spawn((
        Name::new("Hand Tip"),
        HandTip,
        Mesh3d(assets.tip_mesh.clone()),
        MeshMaterial3d(assets.tip_material.clone()),
        Transform::from_translation(at),
    ));
}

// =============================================================================
// TRACKING
// =============================================================================

/// Feed the head tracker into the rig
pub fn track_head(
    input_state: Res<InputState>,
    mut players: Query<&mut RigTracking, With<LocalPlayer>>,
) {
    for mut tracking in players.iter_mut() {
        tracking.head_rotation = input_state.head_rotation();
    }
}

/// Walk along the current look yaw
pub fn walk_rig(
    input_state: Res<InputState>,
    time: Res<Time>,
    mut players: Query<(&mut Transform, &AimArbiter), With<LocalPlayer>>,
) {
    if input_state.walk == Vec2::ZERO {
        return;
    }
    for (mut transform, arbiter) in players.iter_mut() {
        let heading = yaw_only(arbiter.rotation());
        let step = heading * Vec3::new(input_state.walk.x, 0.0, -input_state.walk.y);
        transform.translation += step * RIG_WALK_SPEED * time.delta_secs();
    }
}

/// Put the hand in front of the head and record the world-space rig pose
pub fn pose_rig(
    camera: Query<&Transform, (With<HeadCamera>, Without<MainHandAnchor>, Without<HandTip>)>,
    mut anchors: Query<&mut Transform, (With<MainHandAnchor>, Without<HeadCamera>, Without<HandTip>)>,
    mut tips: Query<&mut Transform, (With<HandTip>, Without<HeadCamera>, Without<MainHandAnchor>)>,
    mut players: Query<&mut RigPose, With<LocalPlayer>>,
) {
    let head = camera.single().ok().copied();
    let mut hand = None;

    if let (Some(head), Ok(mut anchor)) = (head, anchors.single_mut()) {
        anchor.translation = head.translation + head.rotation * Vec3::from(HAND_REST_OFFSET);
        anchor.rotation = head.rotation;
        hand = Some(*anchor);

        for mut tip in tips.iter_mut() {
            tip.translation = anchor.translation + anchor.forward() * HAND_TIP_LENGTH;
            tip.rotation = anchor.rotation;
        }
    }

    for mut pose in players.iter_mut() {
        pose.head = head;
        pose.hand = hand;
    }
}

/// F2: put the controller to sleep / wake it up
pub fn toggle_hand_tip(
    mut commands: Commands,
    input_state: Res<InputState>,
    assets: Option<Res<RigAssets>>,
    tips: Query<Entity, With<HandTip>>,
    anchors: Query<&Transform, With<MainHandAnchor>>,
) {
    if !input_state.toggle_rig {
        return;
    }
    if tips.is_empty() {
        let Some(assets) = assets else {
            return;
        };
        let at = anchors.single().map(|t| t.translation).unwrap_or_default();
        spawn_hand_tip(&mut commands, &assets, at);
        info!("Controller awake");
    } else {
        for tip in tips.iter() {
            commands.entity(tip).despawn();
        }
        info!("Controller asleep, hand falls back to the main-hand anchor");
    }
}
