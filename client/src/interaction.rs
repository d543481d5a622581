//! Per-tick grab pipeline for the local player.
//!
//! Runs in `FixedUpdate`, chained in this order:
//! 1. [`begin_grab_tick`]: grace latch, override hold, timer countdown
//! 2. [`update_peer_hand_cache`](crate::tracking::update_peer_hand_cache)
//! 3. [`resolve_local_hands`]: pick the hand origin for this tick
//! 4. [`run_cart_probe`]: may promote an override grab on a cart
//! 5. [`handle_grab_input`]: regular grabs, release requests, equip on release
//! 6. [`end_grab_tick`]: override lapse and guarded release
//! 7. [`drive_held_objects`]: beam anchors and pulling the held body

use avian3d::prelude::*;
use bevy::prelude::*;
use grip_shared::hand::ResolvedHand;
use grip_shared::probe::{GrabStartHook, ProbeAgent, TriggerInteraction};
use grip_shared::smoothing::PlaneAnchors;
use grip_shared::{
    AnchorSmoothing, CartGrabProbe, CompoundVehicle, Equippable, GrabCapable, GrabState, Grabbable,
    HandReferenceResolver, HandSource, InteractionSettings, LocalPlayer, PlayerHandle, PlayerId,
};
use lightyear::prelude::*;

use crate::input::ActionMap;
use crate::inventory::{EquipFromWorld, PlayerInventory};
use crate::rig::{HandTip, RigPose};
use crate::scene::{find_in_ancestors, query_filter, AvianScene};
use crate::tracking::PeerHandCache;

// =============================================================================
// COMPONENTS
// =============================================================================

/// Hand origin resolved this tick
#[derive(Component, Clone, Copy, Debug)]
pub struct HandOrigin(pub ResolvedHand);

impl Default for HandOrigin {
    fn default() -> Self {
        Self(ResolvedHand {
            transform: Transform::IDENTITY,
            source: HandSource::Origin,
        })
    }
}

/// Grab bookkeeping that lives between the steps of one tick
#[derive(Component, Default, Debug)]
pub struct GrabIntent {
    pub release_requested: bool,
    /// Item handed to the inventory this tick; stowed once the release lands.
    pub equipped: Option<Entity>,
    /// Object the hold distance was measured for
    pub held_for: Option<Entity>,
    pub hold_distance: f32,
}

/// Smoothed beam anchors of a grabber
#[derive(Component, Default, Debug)]
pub struct BeamAnchors {
    pub anchors: PlaneAnchors,
    pub active: bool,
}

/// Set on an object when a grab-start hook fires for it
#[derive(Component, Clone, Copy, Debug)]
pub struct HeldBy(pub Entity);

/// Grab-start hook: remember who started holding what, applied after the probe.
#[derive(Default)]
struct GrabStarts(Vec<(Entity, Entity)>);

impl GrabStartHook for GrabStarts {
    fn on_grab_start(&mut self, agent: Entity, target: Entity) {
        self.0.push((agent, target));
    }
}

// =============================================================================
// SYSTEMS
// =============================================================================

pub fn begin_grab_tick(time: Res<Time>, mut agents: Query<&mut GrabState>) {
    let dt = time.delta_secs();
    for mut grab in agents.iter_mut() {
        grab.begin_tick(dt);
    }
}

pub fn resolve_local_hands(
    peers: Res<PeerHandCache>,
    client_query: Query<&LocalId, (With<crate::GameClient>, With<Connected>)>,
    tips: Query<&Transform, With<HandTip>>,
    cameras: Query<&GlobalTransform, With<Camera3d>>,
    mut players: Query<(Entity, &RigPose, &GrabState, &mut HandOrigin), With<LocalPlayer>>,
) {
    let hand_tip = tips.iter().next().copied();
    let primary_camera = cameras.iter().next().map(|g| g.compute_transform());
    let resolver = HandReferenceResolver::new(&*peers, hand_tip, primary_camera);

    let id = client_query
        .iter()
        .next()
        .map(|local| PlayerId::from_peer(local.0))
        .unwrap_or_default();

    for (entity, pose, grab, mut origin) in players.iter_mut() {
        let handle = PlayerHandle {
            id,
            is_local: true,
            hand: pose.hand,
            head: pose.head,
        };
        let resolved = resolver.resolve(&handle, grab);
        if resolved.source != origin.0.source {
            debug!("Hand origin of {:?}: {:?} -> {:?}", entity, origin.0.source, resolved.source);
        }
        origin.0 = resolved;
    }
}

pub fn run_cart_probe(
    mut commands: Commands,
    settings: Res<InteractionSettings>,
    actions: Res<ActionMap>,
    spatial: SpatialQuery,
    parents: Query<&'static ChildOf>,
    vehicles: Query<&'static CompoundVehicle>,
    mut agents: Query<(Entity, &GrabCapable, &HandOrigin, &mut GrabState), With<LocalPlayer>>,
) {
    let scene = AvianScene {
        spatial: &spatial,
        parents: &parents,
        vehicles: &vehicles,
    };
    let probe = CartGrabProbe::new(settings.probe);
    let mut starts = GrabStarts::default();

    for (entity, capability, origin, mut grab) in agents.iter_mut() {
        let agent = ProbeAgent {
            entity,
            is_local: true,
            grab_pressed: actions.pressed(&settings.actions.grab),
            capability: *capability,
        };
        probe.run(&agent, &origin.0.transform, &mut grab, &scene, &mut starts);
    }

    for (agent, target) in starts.0 {
        info!("{:?} grabbed compound vehicle {:?}", agent, target);
        commands.entity(target).try_insert(HeldBy(agent));
    }
}

pub fn handle_grab_input(
    settings: Res<InteractionSettings>,
    actions: Res<ActionMap>,
    spatial: SpatialQuery,
    parents: Query<&ChildOf>,
    grabbables: Query<(), With<Grabbable>>,
    equippables: Query<&'static Equippable>,
    mut inventory: ResMut<PlayerInventory>,
    mut agents: Query<(Entity, &HandOrigin, &mut GrabState, &mut GrabIntent), With<LocalPlayer>>,
    mut was_pressed: Local<bool>,
) {
    let pressed = actions.pressed(&settings.actions.grab);
    let just_pressed = pressed == Some(true) && !*was_pressed;
    // Unreadable input never releases.
    let released = pressed == Some(false);
    *was_pressed = pressed.unwrap_or(*was_pressed);

    let filter = query_filter(settings.probe.triggers);

    for (entity, origin, mut grab, mut intent) in agents.iter_mut() {
        intent.release_requested = released && grab.grabbed;

        if just_pressed && !grab.grabbed {
            let hand = origin.0.transform;
            let target = spatial
                .cast_ray(hand.translation, hand.forward(), settings.probe.range, true, &filter)
                .and_then(|hit| {
                    find_in_ancestors(hit.entity, &parents, |e| grabbables.contains(e).then_some(e))
                });
            if let Some(object) = target {
                grab.begin_grab(object);
                info!("{:?} picked up {:?}", entity, object);
            }
        }

        // Equip before the release lands so the held object is still known.
        if intent.release_requested && grab.holds_regular_item() && !grab.in_grace() {
            let mut equip = EquipFromWorld {
                inventory: &mut inventory,
                items: &equippables,
            };
            intent.equipped = grab.on_release_requested(|e| equippables.contains(e), &mut equip);
        }
    }
}

pub fn end_grab_tick(
    mut commands: Commands,
    mut smoothing: ResMut<AnchorSmoothing>,
    mut agents: Query<(Entity, &mut GrabState, &mut GrabIntent)>,
) {
    for (entity, mut grab, mut intent) in agents.iter_mut() {
        if let Some(released) = grab.end_tick(intent.release_requested) {
            smoothing.settle(entity);
            intent.held_for = None;
            if intent.equipped == Some(released) {
                commands.entity(released).try_despawn();
                info!("{:?} stowed {:?} in the inventory", entity, released);
            } else {
                commands.entity(released).try_remove::<HeldBy>();
                info!("{:?} released {:?}", entity, released);
            }
        }
        intent.release_requested = false;
        intent.equipped = None;
    }
}

pub fn drive_held_objects(
    time: Res<Time>,
    settings: Res<InteractionSettings>,
    mut smoothing: ResMut<AnchorSmoothing>,
    parents: Query<&ChildOf>,
    bodies: Query<(), With<RigidBody>>,
    vehicles: Query<(), With<CompoundVehicle>>,
    objects: Query<&GlobalTransform>,
    mut velocities: Query<&mut LinearVelocity>,
    mut agents: Query<(Entity, &GrabState, &HandOrigin, &mut GrabIntent, &mut BeamAnchors)>,
) {
    let dt = time.delta_secs();
    let tuning = &settings.smoothing;

    for (grabber, grab, origin, mut intent, mut beam) in agents.iter_mut() {
        let Some(held) = grab.held.filter(|_| grab.grabbed) else {
            beam.active = false;
            continue;
        };
        let Ok(object) = objects.get(held) else {
            continue;
        };
        let hand = origin.0.transform;
        let object_pos = object.translation();

        if intent.held_for != Some(held) {
            intent.held_for = Some(held);
            intent.hold_distance = hand
                .translation
                .distance(object_pos)
                .max(tuning.near_anchor_distance);
            beam.anchors = PlaneAnchors {
                near: hand.translation,
                far: object_pos,
            };
        }

        let forward = hand.forward();
        let target = PlaneAnchors {
            near: hand.translation + forward * tuning.near_anchor_distance,
            far: hand.translation + forward * intent.hold_distance,
        };
        beam.anchors = smoothing.step(grabber, beam.anchors, target, tuning.anchor_smooth_time, dt);
        beam.active = true;

        let Some(body) = find_in_ancestors(held, &parents, |e| bodies.contains(e).then_some(e))
        else {
            continue;
        };
        if let Ok(mut velocity) = velocities.get_mut(body) {
            let mut pull = (beam.anchors.far - object_pos) * tuning.pull_gain;
            // Carts are dragged along the ground, not lifted.
            if vehicles.contains(held) || vehicles.contains(body) {
                pull.y = velocity.0.y;
            }
            velocity.0 = pull;
        }
    }
}

// =============================================================================
// GIZMOS
// =============================================================================

pub fn draw_grab_beams(
    settings: Res<InteractionSettings>,
    mut gizmos: Gizmos,
    agents: Query<(&HandOrigin, &BeamAnchors, &GrabState), With<LocalPlayer>>,
) {
    for (origin, beam, grab) in agents.iter() {
        let hand = origin.0.transform;
        if beam.active {
            let color = if grab.override_active {
                Color::srgb(1.0, 0.6, 0.1)
            } else {
                Color::srgb(0.2, 0.8, 1.0)
            };
            gizmos.line(hand.translation, beam.anchors.near, color);
            gizmos.line(beam.anchors.near, beam.anchors.far, color);
            gizmos.sphere(Isometry3d::from_translation(beam.anchors.far), 0.06, color);
        } else {
            let end = hand.translation + hand.forward() * settings.probe.range;
            gizmos.line(hand.translation, end, Color::srgba(1.0, 1.0, 1.0, 0.15));
        }
    }
}

pub fn draw_held_markers(mut gizmos: Gizmos, held: Query<&GlobalTransform, With<HeldBy>>) {
    for transform in held.iter() {
        gizmos.sphere(
            Isometry3d::from_translation(transform.translation() + Vec3::Y * 0.9),
            0.1,
            Color::srgb(1.0, 0.6, 0.1),
        );
    }
}

/// Probe settings ignore sensors unless configured otherwise.
pub fn log_probe_settings(settings: Res<InteractionSettings>) {
    let triggers = match settings.probe.triggers {
        TriggerInteraction::Ignore => "ignoring",
        TriggerInteraction::Collide => "hitting",
    };
    info!(
        "Cart probe: range {:.1}, forgiveness radius {:.2}, {} trigger volumes",
        settings.probe.range, settings.probe.forgiveness_radius, triggers
    );
}
