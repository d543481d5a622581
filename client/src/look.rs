//! Look control: arbiter ticks, turn input, recenter and scripted aim zones.

use bevy::prelude::*;
use grip_shared::aim::AimAccepted;
use grip_shared::player::HEAD_HEIGHT;
use grip_shared::settings::TurnMode;
use grip_shared::{AimArbiter, AimRequest, HeadSample, InteractionSettings, LocalPlayer, SoftAimRequest};
use std::collections::HashSet;

use crate::input::ActionMap;
use crate::rig::{RigTracking, SpawnPose};

/// How long a soft zone keeps pulling after the player was last seen inside.
const SOFT_ZONE_HOLD_SECS: f32 = 0.25;

/// What an aim zone does to players standing in it.
#[derive(Clone, Copy, Debug)]
pub enum AimPull {
    /// Fired once on entry.
    Hard {
        duration: f32,
        speed: f32,
        priority: i32,
        low_impact: bool,
    },
    /// Re-affirmed every frame while inside.
    Soft {
        strength: f32,
        strength_no_aim: f32,
        priority: i32,
        low_impact: bool,
    },
}

/// Cylinder around the entity that draws the player's look to `focus`.
#[derive(Component, Clone, Copy, Debug)]
pub struct AimZone {
    pub radius: f32,
    pub focus: Vec3,
    pub pull: AimPull,
}

pub fn emit_zone_aim_requests(
    zones: Query<(Entity, &AimZone, &GlobalTransform)>,
    mut players: Query<(Entity, &Transform, &mut AimArbiter)>,
    mut inside: Local<HashSet<(Entity, Entity)>>,
) {
    for (zone_entity, zone, zone_transform) in zones.iter() {
        let center = zone_transform.translation();
        for (player, transform, mut arbiter) in players.iter_mut() {
            let key = (zone_entity, player);
            let offset = transform.translation - center;
            if Vec2::new(offset.x, offset.z).length() > zone.radius {
                inside.remove(&key);
                continue;
            }
            let entered = inside.insert(key);

            let result = match zone.pull {
                AimPull::Hard {
                    duration,
                    speed,
                    priority,
                    low_impact,
                } => {
                    if !entered {
                        continue;
                    }
                    arbiter.request_hard_aim(AimRequest {
                        position: zone.focus,
                        duration,
                        speed,
                        source: zone_entity,
                        priority,
                        low_impact,
                    })
                }
                AimPull::Soft {
                    strength,
                    strength_no_aim,
                    priority,
                    low_impact,
                } => arbiter.request_soft_aim(SoftAimRequest {
                    position: zone.focus,
                    duration: SOFT_ZONE_HOLD_SECS,
                    source: zone_entity,
                    priority,
                    low_impact,
                    strength,
                    strength_no_aim,
                }),
            };

            match result {
                Ok(AimAccepted::New) => info!("Aim zone {:?} pulls the look of {:?}", zone_entity, player),
                Ok(AimAccepted::Reaffirmed) => {}
                Err(reason) if entered => {
                    debug!("Aim zone {:?} rejected for {:?}: {:?}", zone_entity, player, reason)
                }
                Err(_) => {}
            }
        }
    }
}

pub fn tick_aim_arbiters(
    time: Res<Time>,
    mut players: Query<(&Transform, &RigTracking, &mut AimArbiter)>,
) {
    let dt = time.delta_secs();
    for (transform, tracking, mut arbiter) in players.iter_mut() {
        let world_position = transform.translation + Vec3::Y * HEAD_HEIGHT + arbiter.local_offset();
        arbiter.tick(
            HeadSample {
                local_rotation: tracking.head_rotation,
                world_position,
            },
            dt,
        );
    }
}

/// Snap or smooth turn from the turn action
pub fn apply_turn_input(
    settings: Res<InteractionSettings>,
    actions: Res<ActionMap>,
    time: Res<Time>,
    mut players: Query<&mut AimArbiter, With<LocalPlayer>>,
    mut stick_held: Local<bool>,
) {
    let Some(turn) = actions.read(&settings.actions.turn) else {
        return;
    };
    let turn_settings = &settings.turn;
    let x = turn.axis().x;
    let past_deadzone = x.abs() >= turn_settings.deadzone;

    // Positive stick x turns right, which is a negative yaw.
    let delta = match turn_settings.mode {
        TurnMode::Snap if past_deadzone && !*stick_held => -x.signum() * turn_settings.snap_degrees,
        TurnMode::Smooth if past_deadzone => -x * turn_settings.smooth_speed * time.delta_secs(),
        _ => 0.0,
    };
    *stick_held = past_deadzone;

    if delta == 0.0 {
        return;
    }
    for mut arbiter in players.iter_mut() {
        arbiter.apply_yaw_delta(delta);
    }
}

/// Put the player back at the spawn pose, gliding the camera there
pub fn recenter(
    settings: Res<InteractionSettings>,
    actions: Res<ActionMap>,
    mut players: Query<(&mut Transform, &SpawnPose, &mut AimArbiter), With<LocalPlayer>>,
    mut held: Local<bool>,
) {
    let pressed = actions.pressed(&settings.actions.recenter).unwrap_or(false);
    if pressed && !*held {
        for (mut transform, spawn, mut arbiter) in players.iter_mut() {
            let from = transform.translation;
            transform.translation = spawn.translation;
            arbiter.displace(from - spawn.translation);
            arbiter.force_set_orientation(Vec3::new(spawn.yaw_degrees, 0.0, 0.0));
            info!("Recentered at {:?}", spawn.translation);
        }
    }
    *held = pressed;
}
