//! Per-player look arbitration between the headset and scripted aim requests.
//!
//! Three things pull on where a player looks:
//! - the headset (always authoritative for the final look, composed last),
//! - a hard aim request: a strong, time-bounded pull toward a point,
//! - a soft aim request: a weaker continuous influence.
//!
//! The arbiter keeps a *body* orientation (`yaw_offset` turn times a scripted
//! `aim` bias). Aim requests bend the body; the output rotation follows
//! `body * head` every tick. Because requests are solved as a delta against the
//! current look and then applied to the body, turning the head never fights
//! the aim target.
//!
//! Hard aim phases: `Idle -> Active (timer > 0) -> Decaying (weight > 0) -> Idle`.
//! Soft aim runs on its own timer whenever no hard aim is active.

use bevy::math::curve::{Curve, EaseFunction};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::{
    exp_blend, look_rotation, rotation_from_euler_degrees, slerp_unclamped, smooth_damp,
    wrap_degrees, yaw_degrees, yaw_only, yaw_rotation,
};

// =============================================================================
// TUNING
// =============================================================================

/// Rates and thresholds of the arbiter.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct AimTuning {
    /// How fast the output rotation follows `body * head` (per second).
    pub head_follow_rate: f32,
    /// How fast an unpulled body drops pitch and roll (per second).
    pub idle_relax_rate: f32,
    /// How fast the soft aim strength approaches its target (per second).
    pub soft_strength_rate: f32,
    /// Head rotation per tick (degrees) that counts as the player aiming.
    pub aiming_threshold_deg: f32,
    /// How long the "player is aiming" flag stays up after head movement.
    pub aiming_window: f32,
    /// Smooth time of the local position offset returning to zero.
    pub offset_smooth_time: f32,
}

impl Default for AimTuning {
    fn default() -> Self {
        Self {
            head_follow_rate: 30.0,
            idle_relax_rate: 5.0,
            soft_strength_rate: 10.0,
            aiming_threshold_deg: 1.0,
            aiming_window: 0.1,
            offset_smooth_time: 0.15,
        }
    }
}

/// Easing applied to the hard aim weight. Expected monotonic with `0 -> 0`, `1 -> 1`.
pub trait AimCurve: Send + Sync {
    fn sample(&self, t: f32) -> f32;
}

impl AimCurve for EaseFunction {
    fn sample(&self, t: f32) -> f32 {
        Curve::sample_clamped(self, t)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A hard look-at request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimRequest {
    /// World-space point to look at.
    pub position: Vec3,
    /// Seconds the request stays active.
    pub duration: f32,
    /// Weight units per second while ramping.
    pub speed: f32,
    /// Object the request is about. Same source re-affirms.
    pub source: Entity,
    /// Lower is more important.
    pub priority: i32,
    /// Yaw only.
    pub low_impact: bool,
}

/// A soft look-at influence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftAimRequest {
    pub position: Vec3,
    pub duration: f32,
    pub source: Entity,
    pub priority: i32,
    pub low_impact: bool,
    /// Blend rate while the player is actively looking around.
    pub strength: f32,
    /// Blend rate while the player holds still.
    pub strength_no_aim: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AimAccepted {
    New,
    /// Same source as the active request; timer and target refreshed.
    Reaffirmed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AimRejection {
    /// Numerically worse priority than the active request.
    LowerPriority,
    /// A different target is still being blended in or out.
    BlendInFlight,
    /// A different soft target is active.
    SoftTargetBusy,
    /// Non-finite position or non-positive duration.
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardAimPhase {
    Idle,
    Active,
    Decaying,
}

#[derive(Clone, Copy, Debug)]
struct ActiveHardAim {
    request: AimRequest,
    timer: f32,
}

#[derive(Clone, Copy, Debug)]
struct ActiveSoftAim {
    request: SoftAimRequest,
    timer: f32,
}

/// Head input for one tick.
#[derive(Clone, Copy, Debug)]
pub struct HeadSample {
    /// Headset rotation in tracking space.
    pub local_rotation: Quat,
    /// Camera position in world space.
    pub world_position: Vec3,
}

// =============================================================================
// ARBITER
// =============================================================================

#[derive(Component)]
pub struct AimArbiter {
    tuning: AimTuning,
    curve: Box<dyn AimCurve>,
    /// Accumulated turn, degrees in `[-180, 180)`.
    yaw_offset: f32,
    /// Scripted bias applied after the turn yaw.
    aim: Quat,
    /// Output look rotation.
    rotation: Quat,
    local_offset: Vec3,
    offset_velocity: Vec3,
    last_head: Option<Quat>,
    aiming_timer: f32,
    hard: Option<ActiveHardAim>,
    hard_weight: f32,
    soft: Option<ActiveSoftAim>,
    soft_strength: f32,
}

impl Default for AimArbiter {
    fn default() -> Self {
        Self::new(AimTuning::default())
    }
}

impl AimArbiter {
    pub fn new(tuning: AimTuning) -> Self {
        Self::with_curve(tuning, Box::new(EaseFunction::CubicInOut))
    }

    pub fn with_curve(tuning: AimTuning, curve: Box<dyn AimCurve>) -> Self {
        Self {
            tuning,
            curve,
            yaw_offset: 0.0,
            aim: Quat::IDENTITY,
            rotation: Quat::IDENTITY,
            local_offset: Vec3::ZERO,
            offset_velocity: Vec3::ZERO,
            last_head: None,
            aiming_timer: 0.0,
            hard: None,
            hard_weight: 0.0,
            soft: None,
            soft_strength: 0.0,
        }
    }

    /// Output look rotation, consumed by camera follow.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local position offset, decaying toward zero.
    pub fn local_offset(&self) -> Vec3 {
        self.local_offset
    }

    pub fn yaw_offset(&self) -> f32 {
        self.yaw_offset
    }

    pub fn hard_weight(&self) -> f32 {
        self.hard_weight
    }

    pub fn soft_strength(&self) -> f32 {
        self.soft_strength
    }

    pub fn is_player_aiming(&self) -> bool {
        self.aiming_timer > 0.0
    }

    pub fn hard_phase(&self) -> HardAimPhase {
        match &self.hard {
            None => HardAimPhase::Idle,
            Some(hard) if hard.timer > 0.0 => HardAimPhase::Active,
            Some(_) => HardAimPhase::Decaying,
        }
    }

    pub fn soft_active(&self) -> bool {
        self.soft.is_some_and(|soft| soft.timer > 0.0)
    }

    fn body(&self) -> Quat {
        yaw_rotation(self.yaw_offset) * self.aim
    }

    fn set_body(&mut self, body: Quat) {
        self.aim = (yaw_rotation(self.yaw_offset).inverse() * body).normalize();
    }

    // -------------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------------

    /// Turn by `degrees` about world up. Takes effect this frame.
    pub fn apply_yaw_delta(&mut self, degrees: f32) {
        if !degrees.is_finite() {
            return;
        }
        // Reduce first: adding a raw multi-turn delta would round the offset away.
        let delta = wrap_degrees(degrees);
        self.yaw_offset = wrap_degrees(self.yaw_offset + delta);
        self.rotation = (yaw_rotation(delta) * self.rotation).normalize();
    }

    /// Snap the look to `euler_degrees`, read as `x` = yaw about +Y,
    /// `y` = pitch about +X (positive looks up), `z` = roll about the view
    /// axis. Yaw is applied outermost, then pitch, then roll.
    ///
    /// Yaw offset and aim bias are solved against the last head sample so the
    /// next head movement continues smoothly from here. Clears pending aims.
    pub fn force_set_orientation(&mut self, euler_degrees: Vec3) {
        let desired = rotation_from_euler_degrees(euler_degrees);
        let head = self.last_head.unwrap_or(Quat::IDENTITY);
        let body = desired * head.inverse();
        self.yaw_offset = wrap_degrees(yaw_degrees(body));
        self.set_body(body);
        self.rotation = desired;
        self.hard = None;
        self.hard_weight = 0.0;
        self.soft = None;
        self.soft_strength = 0.0;
    }

    /// Push the local position offset; it glides back to zero.
    pub fn displace(&mut self, offset: Vec3) {
        if offset.is_finite() {
            self.local_offset += offset;
        }
    }

    pub fn request_hard_aim(&mut self, request: AimRequest) -> Result<AimAccepted, AimRejection> {
        if !request.position.is_finite() || !(request.duration > 0.0) {
            return Err(AimRejection::Invalid);
        }

        if let Some(active) = &mut self.hard {
            if active.request.source == request.source {
                active.request = request;
                active.timer = request.duration;
                return Ok(AimAccepted::Reaffirmed);
            }
            if self.hard_weight != 0.0 {
                return Err(AimRejection::BlendInFlight);
            }
            if active.timer > 0.0 && request.priority > active.request.priority {
                return Err(AimRejection::LowerPriority);
            }
        }

        self.hard = Some(ActiveHardAim {
            request,
            timer: request.duration,
        });
        self.hard_weight = 0.0;
        Ok(AimAccepted::New)
    }

    pub fn request_soft_aim(&mut self, request: SoftAimRequest) -> Result<AimAccepted, AimRejection> {
        if !request.position.is_finite() || !(request.duration > 0.0) {
            return Err(AimRejection::Invalid);
        }

        if let Some(active) = &mut self.soft {
            if active.request.source == request.source {
                active.request = request;
                active.timer = request.duration;
                return Ok(AimAccepted::Reaffirmed);
            }
            if active.timer > 0.0 {
                return Err(AimRejection::SoftTargetBusy);
            }
        }

        self.soft = Some(ActiveSoftAim {
            request,
            timer: request.duration,
        });
        Ok(AimAccepted::New)
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    pub fn tick(&mut self, head: HeadSample, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        let tuning = self.tuning;

        // Is the player looking around?
        self.aiming_timer = (self.aiming_timer - dt).max(0.0);
        if let Some(last) = self.last_head {
            if last.angle_between(head.local_rotation).to_degrees() > tuning.aiming_threshold_deg {
                self.aiming_timer = tuning.aiming_window;
            }
        }
        self.last_head = Some(head.local_rotation);

        // Hard aim.
        let hard_active = self.advance_hard(dt);
        if let Some(hard) = self.hard {
            if let Some(target) =
                self.solve_target(hard.request.position, hard.request.low_impact, head.world_position)
            {
                let t = self.curve.sample(self.hard_weight);
                self.set_body(slerp_unclamped(self.body(), target, t));
            }
        }

        // Soft aim.
        let soft_live = self.advance_soft(dt) && !hard_active;
        let strength_target = match self.soft {
            Some(soft) if soft_live => {
                if self.is_player_aiming() {
                    soft.request.strength
                } else {
                    soft.request.strength_no_aim
                }
            }
            _ => 0.0,
        };
        self.soft_strength +=
            (strength_target - self.soft_strength) * exp_blend(tuning.soft_strength_rate, dt);
        if let (Some(soft), true) = (self.soft, soft_live) {
            if let Some(target) =
                self.solve_target(soft.request.position, soft.request.low_impact, head.world_position)
            {
                let t = exp_blend(self.soft_strength.max(0.0), dt);
                self.set_body(self.body().slerp(target, t));
            }
        }

        // Nothing pulling: drift back to a level look.
        if self.hard.is_none() && !soft_live {
            let body = self.body();
            self.set_body(body.slerp(yaw_only(body), exp_blend(tuning.idle_relax_rate, dt)));
        }

        // Headset stays authoritative for the final look.
        let desired = self.body() * head.local_rotation;
        self.rotation = self
            .rotation
            .slerp(desired, exp_blend(tuning.head_follow_rate, dt))
            .normalize();
        self.local_offset = smooth_damp(
            self.local_offset,
            Vec3::ZERO,
            &mut self.offset_velocity,
            tuning.offset_smooth_time,
            f32::INFINITY,
            dt,
        );
    }

    /// Advance the hard aim timer and weight. Returns whether it is still active.
    fn advance_hard(&mut self, dt: f32) -> bool {
        let Some(hard) = &mut self.hard else {
            return false;
        };
        let speed = hard.request.speed.max(0.0);
        if hard.timer > 0.0 {
            hard.timer = (hard.timer - dt).max(0.0);
            self.hard_weight = (self.hard_weight + speed * dt).clamp(0.0, 1.0);
            true
        } else {
            self.hard_weight = (self.hard_weight - speed * dt).clamp(0.0, 1.0);
            if self.hard_weight <= 0.0 || speed <= 0.0 {
                self.hard = None;
                self.hard_weight = 0.0;
            }
            false
        }
    }

    /// Advance the soft aim timer. Returns whether it is still live.
    fn advance_soft(&mut self, dt: f32) -> bool {
        let Some(soft) = &mut self.soft else {
            return false;
        };
        soft.timer = (soft.timer - dt).max(0.0);
        soft.timer > 0.0
    }

    /// Body orientation that would make the current look face `position`.
    fn solve_target(&self, position: Vec3, low_impact: bool, camera: Vec3) -> Option<Quat> {
        let look = look_rotation(camera, position)?;
        let delta = look * self.rotation.inverse();
        let target = (delta * self.body()).normalize();
        Some(if low_impact { yaw_only(target) } else { target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::delta_degrees;
    use bevy::ecs::world::World;

    const DT: f32 = 1.0 / 60.0;

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    fn still_head() -> HeadSample {
        HeadSample {
            local_rotation: Quat::IDENTITY,
            world_position: Vec3::new(0.0, 1.6, 0.0),
        }
    }

    fn hard(source: Entity, priority: i32) -> AimRequest {
        AimRequest {
            position: Vec3::new(10.0, 1.6, 0.0),
            duration: 1.0,
            speed: 2.0,
            source,
            priority,
            low_impact: false,
        }
    }

    fn soft(source: Entity, strength: f32) -> SoftAimRequest {
        SoftAimRequest {
            position: Vec3::new(-10.0, 1.6, 0.0),
            duration: 100.0,
            source,
            priority: 0,
            low_impact: false,
            strength,
            strength_no_aim: strength,
        }
    }

    fn forward(arbiter: &AimArbiter) -> Vec3 {
        arbiter.rotation() * Vec3::NEG_Z
    }

    #[test]
    fn test_yaw_delta_round_trip() {
        let mut arbiter = AimArbiter::default();
        arbiter.apply_yaw_delta(30.25);
        for d in [
            0.0,
            12.5,
            45.0,
            179.0,
            180.0,
            270.0,
            -720.5,
            1e-3,
            1e7,
            123_456_789.0,
            -98_765_432.0,
        ] {
            let before = arbiter.yaw_offset();
            arbiter.apply_yaw_delta(d);
            arbiter.apply_yaw_delta(-d);
            assert!(
                delta_degrees(before, arbiter.yaw_offset()).abs() < 1e-3,
                "d={d}: {before} -> {}",
                arbiter.yaw_offset()
            );
            assert!((-180.0..180.0).contains(&arbiter.yaw_offset()));
        }
    }

    #[test]
    fn test_yaw_delta_applies_immediately() {
        let mut arbiter = AimArbiter::default();
        arbiter.apply_yaw_delta(90.0);
        let f = forward(&arbiter);
        assert!((f - Vec3::NEG_X).length() < 1e-4);
    }

    #[test]
    fn test_hard_admission_priority_and_reaffirm() {
        let ids = entities(2);
        let (o, other) = (ids[0], ids[1]);
        let mut arbiter = AimArbiter::default();
        assert_eq!(arbiter.request_hard_aim(hard(o, 1)), Ok(AimAccepted::New));

        // Worse priority, different object: rejected, state unchanged.
        assert_eq!(
            arbiter.request_hard_aim(hard(other, 5)),
            Err(AimRejection::LowerPriority)
        );
        assert_eq!(arbiter.hard.map(|h| h.request.source), Some(o));

        // Same object, any priority: re-affirmed.
        let mut again = hard(o, 99);
        again.position = Vec3::new(0.0, 1.6, -10.0);
        assert_eq!(arbiter.request_hard_aim(again), Ok(AimAccepted::Reaffirmed));
        assert_eq!(arbiter.hard.map(|h| h.request.position), Some(again.position));
    }

    #[test]
    fn test_hard_rejects_other_target_mid_blend() {
        let ids = entities(2);
        let mut arbiter = AimArbiter::default();
        arbiter.request_hard_aim(hard(ids[0], 5)).unwrap();
        arbiter.tick(still_head(), DT);
        assert!(arbiter.hard_weight() > 0.0);

        // Better priority does not matter while blending.
        assert_eq!(
            arbiter.request_hard_aim(hard(ids[1], -10)),
            Err(AimRejection::BlendInFlight)
        );

        // Before any blend, better priority replaces.
        let mut fresh = AimArbiter::default();
        fresh.request_hard_aim(hard(ids[0], 5)).unwrap();
        assert_eq!(fresh.request_hard_aim(hard(ids[1], 1)), Ok(AimAccepted::New));
    }

    #[test]
    fn test_hard_aim_turns_look_toward_target() {
        let ids = entities(1);
        let mut arbiter = AimArbiter::default();
        let mut request = hard(ids[0], 0);
        request.duration = 5.0;
        arbiter.request_hard_aim(request).unwrap();
        for _ in 0..180 {
            arbiter.tick(still_head(), DT);
        }
        assert_eq!(arbiter.hard_phase(), HardAimPhase::Active);
        assert!(forward(&arbiter).dot(Vec3::X) > 0.99, "{:?}", forward(&arbiter));
    }

    #[test]
    fn test_hard_aim_phases() {
        let ids = entities(1);
        let mut arbiter = AimArbiter::default();
        let mut request = hard(ids[0], 0);
        request.duration = 0.5;
        request.speed = 4.0;
        arbiter.request_hard_aim(request).unwrap();
        assert_eq!(arbiter.hard_phase(), HardAimPhase::Active);

        for _ in 0..60 {
            arbiter.tick(still_head(), DT);
        }
        assert!((arbiter.hard_weight() - 1.0).abs() < 1e-6);
        assert_eq!(arbiter.hard_phase(), HardAimPhase::Decaying);

        let mut last = arbiter.hard_weight();
        for _ in 0..60 {
            arbiter.tick(still_head(), DT);
            assert!(arbiter.hard_weight() <= last);
            last = arbiter.hard_weight();
        }
        assert_eq!(arbiter.hard_phase(), HardAimPhase::Idle);
        assert_eq!(arbiter.hard_weight(), 0.0);
    }

    #[test]
    fn test_low_impact_keeps_level() {
        let ids = entities(1);
        let mut arbiter = AimArbiter::default();
        let request = AimRequest {
            position: Vec3::new(10.0, 12.0, 0.0),
            duration: 5.0,
            speed: 2.0,
            source: ids[0],
            priority: 0,
            low_impact: true,
        };
        arbiter.request_hard_aim(request).unwrap();
        for _ in 0..180 {
            arbiter.tick(still_head(), DT);
        }
        let f = forward(&arbiter);
        assert!(f.y.abs() < 1e-3, "{f:?}");
        assert!(f.x > 0.99, "{f:?}");
    }

    #[test]
    fn test_soft_admission_is_sticky() {
        let ids = entities(2);
        let mut arbiter = AimArbiter::default();
        assert_eq!(arbiter.request_soft_aim(soft(ids[0], 2.0)), Ok(AimAccepted::New));

        let mut better = soft(ids[1], 2.0);
        better.priority = -100;
        assert_eq!(
            arbiter.request_soft_aim(better),
            Err(AimRejection::SoftTargetBusy)
        );
        assert_eq!(
            arbiter.request_soft_aim(soft(ids[0], 4.0)),
            Ok(AimAccepted::Reaffirmed)
        );

        // Once expired, a different soft target gets in.
        let mut short = soft(ids[0], 2.0);
        short.duration = 0.05;
        let mut arbiter = AimArbiter::default();
        arbiter.request_soft_aim(short).unwrap();
        for _ in 0..10 {
            arbiter.tick(still_head(), DT);
        }
        assert!(!arbiter.soft_active());
        assert_eq!(arbiter.request_soft_aim(soft(ids[1], 2.0)), Ok(AimAccepted::New));
    }

    #[test]
    fn test_soft_strength_converges_monotonically() {
        let ids = entities(1);
        let target = 3.0;
        let mut arbiter = AimArbiter::default();
        arbiter.request_soft_aim(soft(ids[0], target)).unwrap();

        let mut last = arbiter.soft_strength();
        assert_eq!(last, 0.0);
        for _ in 0..600 {
            arbiter.tick(still_head(), DT);
            let s = arbiter.soft_strength();
            assert!(s >= last, "strength went down: {last} -> {s}");
            assert!(s <= target + 1e-5, "overshoot: {s}");
            last = s;
        }
        assert!((target - last).abs() < 1e-3);
    }

    #[test]
    fn test_soft_strength_picks_rate_from_head_motion() {
        let ids = entities(1);
        let mut arbiter = AimArbiter::default();
        let mut request = soft(ids[0], 6.0);
        request.strength_no_aim = 1.0;
        arbiter.request_soft_aim(request).unwrap();

        for _ in 0..300 {
            arbiter.tick(still_head(), DT);
        }
        assert!(!arbiter.is_player_aiming());
        assert!((arbiter.soft_strength() - 1.0).abs() < 1e-2);

        let mut yaw = 0.0_f32;
        for _ in 0..300 {
            yaw += 2.0;
            let head = HeadSample {
                local_rotation: yaw_rotation(yaw),
                ..still_head()
            };
            arbiter.tick(head, DT);
        }
        assert!(arbiter.is_player_aiming());
        assert!((arbiter.soft_strength() - 6.0).abs() < 1e-2);
    }

    #[test]
    fn test_hard_aim_suppresses_soft() {
        let ids = entities(2);
        let mut arbiter = AimArbiter::default();
        arbiter.request_soft_aim(soft(ids[0], 5.0)).unwrap();
        let mut request = hard(ids[1], 0);
        request.duration = 10.0;
        arbiter.request_hard_aim(request).unwrap();
        for _ in 0..120 {
            arbiter.tick(still_head(), DT);
        }
        assert!(arbiter.soft_strength() < 1e-6);
        // Hard target is +X; soft would have pulled toward -X.
        assert!(forward(&arbiter).x > 0.9);
    }

    #[test]
    fn test_soft_timer_runs_under_hard_aim() {
        let ids = entities(2);

        // Outlives the hard aim: resumes afterwards with its remaining time.
        let mut arbiter = AimArbiter::default();
        let mut request = soft(ids[0], 5.0);
        request.duration = 3.0;
        arbiter.request_soft_aim(request).unwrap();
        arbiter.request_hard_aim(hard(ids[1], 0)).unwrap();
        for _ in 0..50 {
            arbiter.tick(still_head(), DT);
        }
        assert!(arbiter.soft_strength() < 1e-6);
        for _ in 0..70 {
            arbiter.tick(still_head(), DT);
        }
        assert!(arbiter.soft_active());
        assert!(arbiter.soft_strength() > 1.0);
        for _ in 0..70 {
            arbiter.tick(still_head(), DT);
        }
        assert!(!arbiter.soft_active());

        // Shorter than the hard aim: expires without ever pulling.
        let mut arbiter = AimArbiter::default();
        let mut request = soft(ids[0], 5.0);
        request.duration = 0.5;
        arbiter.request_soft_aim(request).unwrap();
        arbiter.request_hard_aim(hard(ids[1], 0)).unwrap();
        for _ in 0..60 {
            arbiter.tick(still_head(), DT);
        }
        assert!(!arbiter.soft_active());
        for _ in 0..60 {
            arbiter.tick(still_head(), DT);
        }
        assert!(arbiter.soft_strength() < 1e-6);
    }

    #[test]
    fn test_idle_relaxes_pitch() {
        let mut arbiter = AimArbiter::default();
        arbiter.tick(still_head(), DT);
        arbiter.force_set_orientation(Vec3::new(40.0, -30.0, 0.0));
        let f = forward(&arbiter);
        assert!(f.y < -0.4);

        for _ in 0..300 {
            arbiter.tick(still_head(), DT);
        }
        let f = forward(&arbiter);
        assert!(f.y.abs() < 1e-2, "{f:?}");
        assert!((yaw_degrees(arbiter.rotation()) - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_force_set_orientation_does_not_jump() {
        let head = HeadSample {
            local_rotation: yaw_rotation(-25.0),
            ..still_head()
        };
        let mut arbiter = AimArbiter::default();
        arbiter.tick(head, DT);
        arbiter.force_set_orientation(Vec3::new(90.0, 0.0, 0.0));
        let snapped = arbiter.rotation();
        assert!((yaw_degrees(snapped) - 90.0).abs() < 1e-3);
        assert!((arbiter.yaw_offset() - 115.0).abs() < 1e-3);

        arbiter.tick(head, DT);
        assert!(arbiter.rotation().angle_between(snapped) < 1e-3);
    }

    #[test]
    fn test_force_set_orientation_component_order() {
        let mut arbiter = AimArbiter::default();
        arbiter.tick(still_head(), DT);

        arbiter.force_set_orientation(Vec3::new(90.0, 0.0, 0.0));
        assert!(forward(&arbiter).distance(Vec3::NEG_X) < 1e-4);

        arbiter.force_set_orientation(Vec3::new(0.0, 30.0, 0.0));
        let f = forward(&arbiter);
        assert!((f.y - 0.5).abs() < 1e-4, "{f:?}");
        assert!(f.x.abs() < 1e-4);

        // Pitch stays in the yawed frame.
        arbiter.force_set_orientation(Vec3::new(90.0, 30.0, 0.0));
        let f = forward(&arbiter);
        assert!((f.y - 0.5).abs() < 1e-4, "{f:?}");
        assert!(f.x < -0.8 && f.z.abs() < 1e-4);
    }

    #[test]
    fn test_displace_glides_back() {
        let mut arbiter = AimArbiter::default();
        arbiter.displace(Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(arbiter.local_offset(), Vec3::new(0.0, 0.0, 2.0));
        for _ in 0..240 {
            arbiter.tick(still_head(), DT);
        }
        assert!(arbiter.local_offset().length() < 1e-3);
    }

    #[test]
    fn test_invalid_requests_rejected() {
        let ids = entities(1);
        let mut arbiter = AimArbiter::default();
        let mut request = hard(ids[0], 0);
        request.duration = 0.0;
        assert_eq!(arbiter.request_hard_aim(request), Err(AimRejection::Invalid));
        request.duration = 1.0;
        request.position = Vec3::NAN;
        assert_eq!(arbiter.request_hard_aim(request), Err(AimRejection::Invalid));
        assert_eq!(arbiter.hard_phase(), HardAimPhase::Idle);
    }
}
