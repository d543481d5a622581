//! Per-grabber smoothing of the two beam plane anchors.
//!
//! A grab beam is drawn through two "virtual plane" anchors: one just in front
//! of the hand and one at the held object. Both follow their targets through a
//! critically damped spring whose velocities live here, one slot per grabber.
//! Slots are created on first use and never removed; the number of grabbers is
//! bounded by the number of concurrent players.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::math::smooth_damp;

/// Stable arena index of a grabber's smoothing slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrabberSlot(pub u32);

/// Spring velocities for one grabber's two anchors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothingState {
    pub near_velocity: Vec3,
    pub far_velocity: Vec3,
}

/// The two beam anchors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaneAnchors {
    pub near: Vec3,
    pub far: Vec3,
}

/// Smoothing slots keyed by grabber.
#[derive(Resource, Default, Debug)]
pub struct AnchorSmoothing {
    slots: Vec<SmoothingState>,
    by_grabber: HashMap<Entity, GrabberSlot>,
}

impl AnchorSmoothing {
    /// Slot of `grabber`, allocated on first access.
    pub fn slot_of(&mut self, grabber: Entity) -> GrabberSlot {
        if let Some(slot) = self.by_grabber.get(&grabber) {
            return *slot;
        }
        let slot = GrabberSlot(self.slots.len() as u32);
        self.slots.push(SmoothingState::default());
        self.by_grabber.insert(grabber, slot);
        slot
    }

    pub fn state(&self, slot: GrabberSlot) -> Option<&SmoothingState> {
        self.slots.get(slot.0 as usize)
    }

    pub fn state_mut(&mut self, grabber: Entity) -> &mut SmoothingState {
        let slot = self.slot_of(grabber);
        &mut self.slots[slot.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Advance both anchors of `grabber` one step toward `target`.
    pub fn step(
        &mut self,
        grabber: Entity,
        current: PlaneAnchors,
        target: PlaneAnchors,
        smooth_time: f32,
        dt: f32,
    ) -> PlaneAnchors {
        let state = self.state_mut(grabber);
        PlaneAnchors {
            near: smooth_damp(
                current.near,
                target.near,
                &mut state.near_velocity,
                smooth_time,
                f32::INFINITY,
                dt,
            ),
            far: smooth_damp(
                current.far,
                target.far,
                &mut state.far_velocity,
                smooth_time,
                f32::INFINITY,
                dt,
            ),
        }
    }

    /// Zero a grabber's velocities (after a release) without freeing its slot.
    pub fn settle(&mut self, grabber: Entity) {
        if let Some(slot) = self.by_grabber.get(&grabber) {
            self.slots[slot.0 as usize] = SmoothingState::default();
        }
    }
}
