//! Physics scene queries for the interaction layer, backed by avian3d.

use avian3d::prelude::*;
use bevy::prelude::*;
use grip_shared::probe::{ProbeHit, SceneQuery, TriggerInteraction};
use grip_shared::CompoundVehicle;

/// Deepest hierarchy walked when looking for a capability.
const MAX_HIERARCHY_DEPTH: usize = 16;

#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Sensor volumes (aim zones). Skipped by casts that ignore triggers.
    Trigger,
    Player,
}

/// Spatial query filter for a trigger policy.
pub fn query_filter(triggers: TriggerInteraction) -> SpatialQueryFilter {
    match triggers {
        TriggerInteraction::Collide => SpatialQueryFilter::default(),
        TriggerInteraction::Ignore => SpatialQueryFilter::from_mask(LayerMask(
            LayerMask::ALL.0 & !GameLayer::Trigger.to_bits(),
        )),
    }
}

/// Walk `entity` and its ancestors until `found` returns something.
pub fn find_in_ancestors<T>(
    entity: Entity,
    parents: &Query<&ChildOf>,
    mut found: impl FnMut(Entity) -> Option<T>,
) -> Option<T> {
    let mut current = entity;
    for _ in 0..MAX_HIERARCHY_DEPTH {
        if let Some(value) = found(current) {
            return Some(value);
        }
        current = parents.get(current).ok()?.parent();
    }
    None
}

/// [`SceneQuery`] over avian's spatial query pipeline and Bevy's hierarchy.
pub struct AvianScene<'a, 'w, 's> {
    pub spatial: &'a SpatialQuery<'w, 's>,
    pub parents: &'a Query<'w, 's, &'static ChildOf>,
    pub vehicles: &'a Query<'w, 's, &'static CompoundVehicle>,
}

impl SceneQuery for AvianScene<'_, '_, '_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        triggers: TriggerInteraction,
    ) -> Option<ProbeHit> {
        let hit = self
            .spatial
            .cast_ray(origin, direction, max_distance, true, &query_filter(triggers))?;
        Some(ProbeHit {
            entity: hit.entity,
            point: origin + *direction * hit.distance,
            distance: hit.distance,
        })
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Dir3,
        max_distance: f32,
        triggers: TriggerInteraction,
    ) -> Option<ProbeHit> {
        let hit = self.spatial.cast_shape(
            &Collider::sphere(radius),
            origin,
            Quat::IDENTITY,
            direction,
            &ShapeCastConfig::from_max_distance(max_distance),
            &query_filter(triggers),
        )?;
        Some(ProbeHit {
            entity: hit.entity,
            point: hit.point1,
            distance: hit.distance,
        })
    }

    fn find_compound_vehicle(&self, entity: Entity) -> Option<(Entity, CompoundVehicle)> {
        find_in_ancestors(entity, self.parents, |e| {
            self.vehicles.get(e).ok().map(|kind| (e, *kind))
        })
    }
}
