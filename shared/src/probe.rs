//! Forward probe that turns a grab aimed at a cart into an override grab.
//!
//! Carts and cart-mounted cannons are too big for a regular grab, so each tick
//! a local agent holding the grab input casts forward from its hand. A ray
//! goes first; if it misses, a thin sphere is swept along the same line so a
//! slightly-off aim still connects. Whatever is hit is walked up its hierarchy
//! looking for a [`CompoundVehicle`].

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::CompoundVehicle;
use crate::grab::{GrabCapable, GrabState};

/// Whether casts report trigger volumes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TriggerInteraction {
    #[default]
    Ignore,
    Collide,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ProbeSettings {
    /// Max cast distance from the hand.
    pub range: f32,
    /// Radius of the sphere retry.
    pub forgiveness_radius: f32,
    pub triggers: TriggerInteraction,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            range: 6.0,
            forgiveness_radius: 0.15,
            triggers: TriggerInteraction::Ignore,
        }
    }
}

/// A cast hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    /// Entity owning the hit collider.
    pub entity: Entity,
    pub point: Vec3,
    pub distance: f32,
}

/// Physics scene seen by the probe.
pub trait SceneQuery {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        triggers: TriggerInteraction,
    ) -> Option<ProbeHit>;

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Dir3,
        max_distance: f32,
        triggers: TriggerInteraction,
    ) -> Option<ProbeHit>;

    /// Walk from `entity` up through its parents to the first compound vehicle.
    fn find_compound_vehicle(&self, entity: Entity) -> Option<(Entity, CompoundVehicle)>;
}

/// Called when an override grab starts on `target`.
pub trait GrabStartHook {
    fn on_grab_start(&mut self, agent: Entity, target: Entity);
}

/// The agent running the probe this tick.
#[derive(Clone, Copy, Debug)]
pub struct ProbeAgent {
    pub entity: Entity,
    pub is_local: bool,
    /// `None` when the grab input could not be read.
    pub grab_pressed: Option<bool>,
    pub capability: GrabCapable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeSkip {
    NotLocal,
    GrabReleased,
    HoldingItem,
    NoOverrideSupport,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbeOutcome {
    Skipped(ProbeSkip),
    Miss,
    /// Something was hit but it is not part of a cart.
    NotCompound(Entity),
    /// Hit another cart while `held` is still override-held.
    HoldingOther { held: Entity, hit: Entity },
    Promoted {
        target: Entity,
        kind: CompoundVehicle,
        /// Connected through the sphere retry.
        forgiven: bool,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CartGrabProbe {
    pub settings: ProbeSettings,
}

impl CartGrabProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    fn eligibility(agent: &ProbeAgent, grab: &GrabState) -> Result<(), ProbeSkip> {
        if !agent.is_local {
            return Err(ProbeSkip::NotLocal);
        }
        // Unreadable input counts as pressed.
        if !agent.grab_pressed.unwrap_or(true) {
            return Err(ProbeSkip::GrabReleased);
        }
        if grab.holds_regular_item() {
            return Err(ProbeSkip::HoldingItem);
        }
        if !agent.capability.supports_override() {
            return Err(ProbeSkip::NoOverrideSupport);
        }
        Ok(())
    }

    /// Probe forward from `hand` and promote the grab on a cart hit.
    pub fn run(
        &self,
        agent: &ProbeAgent,
        hand: &Transform,
        grab: &mut GrabState,
        scene: &dyn SceneQuery,
        hook: &mut dyn GrabStartHook,
    ) -> ProbeOutcome {
        if let Err(skip) = Self::eligibility(agent, grab) {
            return ProbeOutcome::Skipped(skip);
        }
        if !hand.translation.is_finite() || !hand.rotation.is_finite() {
            return ProbeOutcome::Miss;
        }

        let settings = &self.settings;
        let origin = hand.translation;
        let direction = hand.forward();

        let (hit, forgiven) =
            match scene.cast_ray(origin, direction, settings.range, settings.triggers) {
                Some(hit) => (hit, false),
                None => match scene.cast_sphere(
                    origin,
                    settings.forgiveness_radius,
                    direction,
                    settings.range,
                    settings.triggers,
                ) {
                    Some(hit) => (hit, true),
                    None => return ProbeOutcome::Miss,
                },
            };

        let Some((target, kind)) = scene.find_compound_vehicle(hit.entity) else {
            return ProbeOutcome::NotCompound(hit.entity);
        };

        if let Some(held) = grab.other_override_target(target) {
            return ProbeOutcome::HoldingOther { held, hit: target };
        }
        let fresh = grab.override_target != Some(target);
        if !grab.promote_override(agent.capability, target) {
            return ProbeOutcome::Skipped(ProbeSkip::NoOverrideSupport);
        }
        if agent.capability.has_grab_start_hook() && fresh {
            hook.on_grab_start(agent.entity, target);
        }
        if fresh {
            debug!(
                "Override grab on {} {:?} ({})",
                kind.display_name(),
                target,
                if forgiven { "sphere" } else { "ray" }
            );
        }

        ProbeOutcome::Promoted {
            target,
            kind,
            forgiven,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::world::World;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestScene {
        ray: Option<ProbeHit>,
        sphere: Option<ProbeHit>,
        vehicles: HashMap<Entity, (Entity, CompoundVehicle)>,
        ray_casts: Cell<u32>,
        sphere_casts: Cell<u32>,
    }

    impl SceneQuery for TestScene {
        fn cast_ray(&self, _: Vec3, _: Dir3, max: f32, _: TriggerInteraction) -> Option<ProbeHit> {
            self.ray_casts.set(self.ray_casts.get() + 1);
            self.ray.filter(|h| h.distance <= max)
        }

        fn cast_sphere(
            &self,
            _: Vec3,
            radius: f32,
            _: Dir3,
            max: f32,
            _: TriggerInteraction,
        ) -> Option<ProbeHit> {
            assert!((radius - 0.15).abs() < 1e-6);
            self.sphere_casts.set(self.sphere_casts.get() + 1);
            self.sphere.filter(|h| h.distance <= max)
        }

        fn find_compound_vehicle(&self, entity: Entity) -> Option<(Entity, CompoundVehicle)> {
            self.vehicles.get(&entity).copied()
        }
    }

    #[derive(Default)]
    struct RecordingHook(Vec<(Entity, Entity)>);

    impl GrabStartHook for RecordingHook {
        fn on_grab_start(&mut self, agent: Entity, target: Entity) {
            self.0.push((agent, target));
        }
    }

    struct Fixture {
        agent: Entity,
        cart: Entity,
        other_cart: Entity,
        wheel: Entity,
        crate_box: Entity,
    }

    fn fixture() -> Fixture {
        let mut world = World::new();
        Fixture {
            agent: world.spawn_empty().id(),
            cart: world.spawn_empty().id(),
            other_cart: world.spawn_empty().id(),
            wheel: world.spawn_empty().id(),
            crate_box: world.spawn_empty().id(),
        }
    }

    fn hit(entity: Entity, distance: f32) -> ProbeHit {
        ProbeHit {
            entity,
            point: Vec3::new(0.0, 1.0, -distance),
            distance,
        }
    }

    fn agent(entity: Entity, capability: GrabCapable) -> ProbeAgent {
        ProbeAgent {
            entity,
            is_local: true,
            grab_pressed: Some(true),
            capability,
        }
    }

    fn hand() -> Transform {
        Transform::from_xyz(0.0, 1.0, 0.0)
    }

    #[test]
    fn test_sphere_retry_promotes_cart() {
        let f = fixture();
        let mut scene = TestScene {
            sphere: Some(hit(f.wheel, 3.0)),
            ..default()
        };
        scene.vehicles.insert(f.wheel, (f.cart, CompoundVehicle::Cart));

        let mut grab = GrabState::default();
        let mut hook = RecordingHook::default();
        let outcome = CartGrabProbe::default().run(
            &agent(f.agent, GrabCapable::Full),
            &hand(),
            &mut grab,
            &scene,
            &mut hook,
        );

        assert_eq!(
            outcome,
            ProbeOutcome::Promoted {
                target: f.cart,
                kind: CompoundVehicle::Cart,
                forgiven: true,
            }
        );
        assert_eq!(scene.ray_casts.get(), 1);
        assert_eq!(scene.sphere_casts.get(), 1);
        assert!(grab.override_active);
        assert_eq!(grab.override_target, Some(f.cart));
        assert!(grab.grabbed);
        assert!((grab.force_timer - 0.1).abs() < 1e-6);
        assert_eq!(hook.0, vec![(f.agent, f.cart)]);
    }

    #[test]
    fn test_other_cart_does_not_steal_override() {
        let f = fixture();
        let mut scene = TestScene {
            ray: Some(hit(f.wheel, 2.0)),
            ..default()
        };
        scene.vehicles.insert(f.wheel, (f.cart, CompoundVehicle::Cart));

        let probe = CartGrabProbe::default();
        let full = agent(f.agent, GrabCapable::Full);
        let mut grab = GrabState::default();
        let mut hook = RecordingHook::default();
        grab.begin_tick(0.016);
        probe.run(&full, &hand(), &mut grab, &scene, &mut hook);
        grab.end_tick(false);

        // The hand swings onto a second cart.
        scene.vehicles.insert(f.wheel, (f.other_cart, CompoundVehicle::Cart));
        grab.begin_tick(0.016);
        let before = grab.clone();
        let outcome = probe.run(&full, &hand(), &mut grab, &scene, &mut hook);

        assert_eq!(
            outcome,
            ProbeOutcome::HoldingOther {
                held: f.cart,
                hit: f.other_cart,
            }
        );
        assert_eq!(grab, before);
        assert_eq!(hook.0, vec![(f.agent, f.cart)]);
    }

    #[test]
    fn test_non_cart_hit_leaves_state() {
        let f = fixture();
        let scene = TestScene {
            ray: Some(hit(f.crate_box, 2.0)),
            ..default()
        };
        let mut grab = GrabState::default();
        let before = grab.clone();
        let outcome = CartGrabProbe::default().run(
            &agent(f.agent, GrabCapable::Full),
            &hand(),
            &mut grab,
            &scene,
            &mut RecordingHook::default(),
        );
        assert_eq!(outcome, ProbeOutcome::NotCompound(f.crate_box));
        assert_eq!(scene.sphere_casts.get(), 0);
        assert_eq!(grab, before);
    }

    #[test]
    fn test_out_of_range_is_miss() {
        let f = fixture();
        let mut scene = TestScene {
            ray: Some(hit(f.wheel, 6.5)),
            ..default()
        };
        scene.vehicles.insert(f.wheel, (f.cart, CompoundVehicle::Cart));
        let mut grab = GrabState::default();
        let outcome = CartGrabProbe::default().run(
            &agent(f.agent, GrabCapable::Full),
            &hand(),
            &mut grab,
            &scene,
            &mut RecordingHook::default(),
        );
        assert_eq!(outcome, ProbeOutcome::Miss);
        assert!(!grab.override_active);
    }

    #[test]
    fn test_ineligible_agents_skip() {
        let f = fixture();
        let scene = TestScene::default();
        let probe = CartGrabProbe::default();
        let mut hook = RecordingHook::default();

        let mut grab = GrabState::default();
        let legacy = agent(f.agent, GrabCapable::Legacy);
        assert_eq!(
            probe.run(&legacy, &hand(), &mut grab, &scene, &mut hook),
            ProbeOutcome::Skipped(ProbeSkip::NoOverrideSupport)
        );

        let released = ProbeAgent {
            grab_pressed: Some(false),
            ..agent(f.agent, GrabCapable::Full)
        };
        assert_eq!(
            probe.run(&released, &hand(), &mut grab, &scene, &mut hook),
            ProbeOutcome::Skipped(ProbeSkip::GrabReleased)
        );

        let remote = ProbeAgent {
            is_local: false,
            ..agent(f.agent, GrabCapable::Full)
        };
        assert_eq!(
            probe.run(&remote, &hand(), &mut grab, &scene, &mut hook),
            ProbeOutcome::Skipped(ProbeSkip::NotLocal)
        );

        grab.begin_grab(f.crate_box);
        assert_eq!(
            probe.run(&agent(f.agent, GrabCapable::Full), &hand(), &mut grab, &scene, &mut hook),
            ProbeOutcome::Skipped(ProbeSkip::HoldingItem)
        );
        assert_eq!(scene.ray_casts.get(), 0);
    }

    #[test]
    fn test_unreadable_input_fails_open() {
        let f = fixture();
        let mut scene = TestScene {
            ray: Some(hit(f.wheel, 1.0)),
            ..default()
        };
        scene
            .vehicles
            .insert(f.wheel, (f.cart, CompoundVehicle::CartCannon));
        let unknown = ProbeAgent {
            grab_pressed: None,
            ..agent(f.agent, GrabCapable::Override)
        };
        let mut grab = GrabState::default();
        let mut hook = RecordingHook::default();
        let outcome = CartGrabProbe::default().run(&unknown, &hand(), &mut grab, &scene, &mut hook);
        assert!(matches!(outcome, ProbeOutcome::Promoted { forgiven: false, .. }));
        // Override-only agents have no grab-start hook.
        assert!(hook.0.is_empty());
    }

    #[test]
    fn test_redetection_refreshes_grace_without_rehooking() {
        let f = fixture();
        let mut scene = TestScene {
            ray: Some(hit(f.wheel, 1.0)),
            ..default()
        };
        scene.vehicles.insert(f.wheel, (f.cart, CompoundVehicle::Cart));
        let probe = CartGrabProbe::default();
        let mut grab = GrabState::default();
        let mut hook = RecordingHook::default();
        let me = agent(f.agent, GrabCapable::Full);

        for _ in 0..5 {
            grab.begin_tick(0.05);
            probe.run(&me, &hand(), &mut grab, &scene, &mut hook);
            assert_eq!(grab.end_tick(false), None);
            assert!((grab.force_timer - 0.1).abs() < 1e-6);
        }
        assert_eq!(hook.0.len(), 1);
    }
}
