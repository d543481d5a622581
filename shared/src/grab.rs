//! Per-agent grab state: regular grabs, override grabs and the release grace window.
//!
//! Every tick an agent runs [`GrabState::begin_tick`], then whatever may grab
//! or re-assert an override (the cart probe, regular grab input), then
//! [`GrabState::end_tick`]. The grace window latched at `begin_tick` keeps an
//! override grab alive for [`OVERRIDE_GRACE_SECS`] after its last assertion so
//! a single missed probe does not drop a cart mid-drag.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// How long an override grab survives without being re-asserted.
pub const OVERRIDE_GRACE_SECS: f32 = 0.1;

/// Grab features exposed by an agent, resolved once when the agent spawns.
///
/// Older agents predate override grabs entirely; some support override grabs
/// but have no grab-start hook for the held target.
#[derive(Component, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GrabCapable {
    /// Regular grabs only.
    Legacy,
    /// Override grabs without a grab-start hook.
    Override,
    /// Override grabs and a grab-start hook.
    #[default]
    Full,
}

impl GrabCapable {
    pub fn supports_override(self) -> bool {
        !matches!(self, GrabCapable::Legacy)
    }

    pub fn has_grab_start_hook(self) -> bool {
        matches!(self, GrabCapable::Full)
    }
}

/// Grab state of one grabbing agent.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct GrabState {
    /// Holding something, through a regular or an override grab.
    pub grabbed: bool,
    /// Last-known grabbed object.
    pub held: Option<Entity>,
    pub override_active: bool,
    pub override_target: Option<Entity>,
    /// Seconds left in the grace window; counts down to zero.
    pub force_timer: f32,
    /// `force_timer > 0` when the current tick began.
    pub(crate) grace_latched: bool,
    /// An override grab was (re-)asserted during the current tick.
    pub(crate) override_asserted: bool,
}

/// Inventory collaborator.
pub trait Inventory {
    fn try_equip(&mut self, object: Entity) -> bool;
}

impl GrabState {
    /// Holding an object through a regular (non-override) grab.
    pub fn holds_regular_item(&self) -> bool {
        self.grabbed && !self.override_active
    }

    /// Whether the grace window was open when this tick began.
    pub fn in_grace(&self) -> bool {
        self.grace_latched
    }

    pub fn tick_timer(&mut self, dt: f32) {
        self.force_timer = (self.force_timer - dt).max(0.0);
    }

    /// Keep the override alive while the grace timer runs.
    pub fn hold_override_while_timer_active(&mut self) {
        if self.force_timer > 0.0 && self.grabbed {
            self.override_active = true;
        }
    }

    /// Reset the grace window. Called every time an override grab is asserted.
    pub fn on_override_grab_triggered(&mut self) {
        self.force_timer = OVERRIDE_GRACE_SECS;
        self.override_asserted = true;
    }

    /// Start-of-tick bookkeeping: latch the grace window, hold the override, count down.
    pub fn begin_tick(&mut self, dt: f32) {
        self.grace_latched = self.force_timer > 0.0;
        self.override_asserted = false;
        self.hold_override_while_timer_active();
        self.tick_timer(dt);
    }

    /// Start a regular grab on `object`.
    pub fn begin_grab(&mut self, object: Entity) {
        self.grabbed = true;
        self.held = Some(object);
    }

    /// Target of a live override grab other than `target`, if any.
    pub fn other_override_target(&self, target: Entity) -> Option<Entity> {
        self.override_target
            .filter(|held| self.override_active && *held != target)
    }

    /// Force a grab onto a compound target.
    ///
    /// Returns `false` (and changes nothing) for agents without override support,
    /// or while a different override target is still held: that one has to lapse
    /// or be released first so its release is reported.
    pub fn promote_override(&mut self, capability: GrabCapable, target: Entity) -> bool {
        if !capability.supports_override() || self.other_override_target(target).is_some() {
            return false;
        }
        self.override_active = true;
        self.override_target = Some(target);
        self.grabbed = true;
        self.held = Some(target);
        self.on_override_grab_triggered();
        true
    }

    /// Ask the inventory to equip the held object before it is released.
    ///
    /// Reads the last-known held object, so it must run before the release
    /// takes effect. Returns the equipped object.
    pub fn on_release_requested<F, I>(&self, is_equippable: F, inventory: &mut I) -> Option<Entity>
    where
        F: Fn(Entity) -> bool,
        I: Inventory + ?Sized,
    {
        if !self.grabbed {
            return None;
        }
        let object = self.held?;
        if !is_equippable(object) {
            return None;
        }
        inventory.try_equip(object).then_some(object)
    }

    /// End-of-tick release handling.
    ///
    /// - An override that was neither re-asserted this tick nor inside the grace
    ///   window lapses and releases its target.
    /// - A requested release is refused while the grace window is latched.
    ///
    /// Returns the released object, if any.
    pub fn end_tick(&mut self, release_requested: bool) -> Option<Entity> {
        if self.override_active && !self.override_asserted && !self.grace_latched {
            let target = self.override_target.take();
            self.override_active = false;
            if self.grabbed && self.held == target {
                return self.release();
            }
        }

        if release_requested && self.grabbed && !self.grace_latched {
            self.override_active = false;
            self.override_target = None;
            return self.release();
        }
        None
    }

    fn release(&mut self) -> Option<Entity> {
        self.grabbed = false;
        self.held.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::world::World;

    struct TestInventory {
        equipped: Vec<Entity>,
        accept: bool,
    }

    impl Inventory for TestInventory {
        fn try_equip(&mut self, object: Entity) -> bool {
            if self.accept {
                self.equipped.push(object);
            }
            self.accept
        }
    }

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_timer_never_negative() {
        let mut state = GrabState {
            force_timer: 0.03,
            ..default()
        };
        state.tick_timer(0.05);
        assert_eq!(state.force_timer, 0.0);
        state.tick_timer(0.05);
        assert_eq!(state.force_timer, 0.0);
    }

    #[test]
    fn test_grace_blocks_release() {
        let cart = entities(1)[0];
        let mut state = GrabState::default();
        state.begin_tick(0.016);
        assert!(state.promote_override(GrabCapable::Full, cart));
        state.end_tick(false);

        // Grace open at tick start: release request is refused.
        state.begin_tick(0.016);
        assert!(state.in_grace());
        assert_eq!(state.end_tick(true), None);
        assert!(state.grabbed);
        assert!(state.override_active);
    }

    #[test]
    fn test_grace_holds_across_tick_rates() {
        let cart = entities(1)[0];
        for step in 1..20 {
            let dt = step as f32 * 0.01;
            let mut state = GrabState::default();
            state.begin_tick(dt);
            state.promote_override(GrabCapable::Override, cart);
            state.end_tick(false);

            for _ in 0..20 {
                let timer_at_start = state.force_timer;
                let grabbed_at_start = state.grabbed;
                state.begin_tick(dt);
                state.end_tick(true);
                if timer_at_start > 0.0 && grabbed_at_start {
                    assert!(state.grabbed, "released inside grace window (dt={dt})");
                }
            }
            assert!(!state.grabbed);
        }
    }

    #[test]
    fn test_legacy_agent_ignores_override() {
        let cart = entities(1)[0];
        let mut state = GrabState::default();
        assert!(!state.promote_override(GrabCapable::Legacy, cart));
        assert_eq!(state, GrabState::default());
    }

    #[test]
    fn test_override_switch_waits_for_release() {
        let ids = entities(2);
        let (cart_a, cart_b) = (ids[0], ids[1]);
        let mut state = GrabState::default();

        state.begin_tick(0.05);
        assert!(state.promote_override(GrabCapable::Full, cart_a));
        assert_eq!(state.end_tick(false), None);

        // Pointing at another cart while A is held does not steal the grab.
        state.begin_tick(0.05);
        assert!(!state.promote_override(GrabCapable::Full, cart_b));
        assert_eq!(state.held, Some(cart_a));
        assert_eq!(state.override_target, Some(cart_a));
        assert_eq!(state.end_tick(false), None);

        // A lapses and is reported; then B can be taken.
        let mut released = Vec::new();
        for _ in 0..4 {
            state.begin_tick(0.05);
            state.promote_override(GrabCapable::Full, cart_b);
            released.extend(state.end_tick(false));
        }
        assert_eq!(released, vec![cart_a]);
        assert_eq!(state.held, Some(cart_b));
        assert_eq!(state.override_target, Some(cart_b));
        assert!(state.override_active);
    }

    #[test]
    fn test_reasserted_override_does_not_lapse() {
        let cart = entities(1)[0];
        let mut state = GrabState::default();
        for _ in 0..10 {
            state.begin_tick(0.05);
            state.promote_override(GrabCapable::Full, cart);
            assert_eq!(state.end_tick(false), None);
        }
        assert!(state.override_active);
        assert_eq!(state.override_target, Some(cart));
        assert!((state.force_timer - OVERRIDE_GRACE_SECS).abs() < 1e-6);
    }

    #[test]
    fn test_override_grace_end_to_end() {
        let cart = entities(1)[0];
        let mut state = GrabState::default();

        // Tick 0: probe detects the cart.
        state.begin_tick(0.05);
        state.promote_override(GrabCapable::Full, cart);
        state.end_tick(false);
        assert!(state.override_active);
        assert!((state.force_timer - 0.1).abs() < 1e-6);

        // Tick 1: no re-detection, grace holds the override.
        state.begin_tick(0.05);
        assert_eq!(state.end_tick(false), None);
        assert!((state.force_timer - 0.05).abs() < 1e-6);
        assert!(state.override_active);

        // Tick 2: timer runs out during this tick, still latched.
        state.begin_tick(0.05);
        assert_eq!(state.end_tick(false), None);
        assert_eq!(state.force_timer, 0.0);
        assert!(state.override_active);

        // Tick 3: grace over, override lapses and the cart is let go.
        state.begin_tick(0.05);
        assert_eq!(state.force_timer, 0.0);
        assert_eq!(state.end_tick(false), Some(cart));
        assert!(!state.override_active);
        assert!(!state.grabbed);
        assert_eq!(state.override_target, None);
    }

    #[test]
    fn test_regular_release_equips() {
        let ids = entities(2);
        let (item, other) = (ids[0], ids[1]);
        let mut state = GrabState::default();
        state.begin_grab(item);

        let mut inventory = TestInventory {
            equipped: Vec::new(),
            accept: true,
        };
        let equipped = state.on_release_requested(|e| e == item, &mut inventory);
        assert_eq!(equipped, Some(item));
        assert_eq!(inventory.equipped, vec![item]);

        // Release happens after the equip and still sees the held object.
        state.begin_tick(0.016);
        assert_eq!(state.end_tick(true), Some(item));

        state.begin_grab(other);
        let equipped = state.on_release_requested(|e| e == item, &mut inventory);
        assert_eq!(equipped, None);
        assert_eq!(inventory.equipped.len(), 1);
    }

    #[test]
    fn test_release_without_grab_is_noop() {
        let mut state = GrabState::default();
        let mut inventory = TestInventory {
            equipped: Vec::new(),
            accept: true,
        };
        assert_eq!(state.on_release_requested(|_| true, &mut inventory), None);
        state.begin_tick(0.016);
        assert_eq!(state.end_tick(true), None);
    }
}
