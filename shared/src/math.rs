//! Rotation and smoothing helpers shared by the aim arbiter and grab anchoring.
//!
//! Conventions match the rest of the workspace: +Y up, -Z forward, yaw is a
//! rotation about +Y, Euler order YXZ (yaw, pitch, roll).

use bevy::prelude::*;

/// Wrap an angle in degrees into `[-180, 180)`.
///
/// The remainder is taken before any offset is added, so huge inputs keep
/// every bit of their fractional turn and `wrap(-d) == -wrap(d)` off the seam.
#[inline]
pub fn wrap_degrees(degrees: f32) -> f32 {
    let turn = degrees.rem_euclid(360.0);
    if turn >= 180.0 {
        turn - 360.0
    } else {
        turn
    }
}

/// Signed shortest difference `b - a` in degrees.
#[inline]
pub fn delta_degrees(a: f32, b: f32) -> f32 {
    wrap_degrees(b - a)
}

/// Yaw rotation from an angle in degrees.
#[inline]
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_y(degrees.to_radians())
}

/// Yaw (degrees) of a rotation, ignoring pitch and roll.
#[inline]
pub fn yaw_degrees(rotation: Quat) -> f32 {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    yaw.to_degrees()
}

/// Strip pitch and roll, keeping only the yaw component.
#[inline]
pub fn yaw_only(rotation: Quat) -> Quat {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_rotation_y(yaw)
}

/// Rotation from Euler degrees: `x` yaw about +Y, `y` pitch about +X, `z` roll.
pub fn rotation_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.x.to_radians(),
        euler.y.to_radians(),
        euler.z.to_radians(),
    )
}

/// Spherical interpolation that does not clamp `t`.
///
/// `t > 1` overshoots past `to` along the same great arc; `t < 0` moves away
/// from it. Always takes the short way around.
pub fn slerp_unclamped(from: Quat, to: Quat, t: f32) -> Quat {
    let mut delta = from.inverse() * to;
    if delta.w < 0.0 {
        delta = -delta;
    }
    let (axis, angle) = delta.to_axis_angle();
    if angle.abs() < 1e-6 || !axis.is_finite() {
        return from;
    }
    (from * Quat::from_axis_angle(axis, angle * t)).normalize()
}

/// Look rotation from `eye` toward `target`, level with the world up axis.
///
/// Returns `None` when the two points coincide.
pub fn look_rotation(eye: Vec3, target: Vec3) -> Option<Quat> {
    let dir = target - eye;
    if dir.length_squared() < 1e-8 {
        return None;
    }
    // looking_at with a parallel up vector degenerates; fall back to Z as up.
    let up = if dir.normalize().dot(Vec3::Y).abs() > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Some(Transform::from_translation(eye).looking_at(target, up).rotation)
}

/// Frame-rate independent blend factor for an exponential approach at `rate` per second.
#[inline]
pub fn exp_blend(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Critically damped spring toward `target`.
///
/// `velocity` is carried between calls by the caller. Never overshoots the
/// target within a single step.
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> Vec3 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let mut change = current - target;
    let original_to = target;

    let max_change = max_speed * smooth_time;
    change = change.clamp_length_max(max_change);
    let target = current - change;

    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Prevent overshooting
    if (original_to - current).dot(output - original_to) > 0.0 {
        output = original_to;
        *velocity = (output - original_to) / dt;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert!((wrap_degrees(190.0) - -170.0).abs() < 1e-4);
        assert!((wrap_degrees(-190.0) - 170.0).abs() < 1e-4);
        assert!((wrap_degrees(45.0) - 45.0).abs() < 1e-4);
        assert!((wrap_degrees(720.0)).abs() < 1e-4);
        assert_eq!(wrap_degrees(180.0), -180.0);
    }

    #[test]
    fn test_wrap_degrees_large_angles_stay_symmetric() {
        for d in [1e7_f32, 123_456_789.0, -98_765_432.0, 3.0e9] {
            let w = wrap_degrees(d);
            assert!((-180.0..180.0).contains(&w), "d={d}: {w}");
            assert!((wrap_degrees(-d) + w).abs() < 1e-3 || w == -180.0, "d={d}");
        }
        assert_eq!(wrap_degrees(1e7), -80.0);
    }

    #[test]
    fn test_yaw_only_strips_pitch() {
        let q = Quat::from_euler(EulerRot::YXZ, 0.8, 0.4, 0.2);
        let flat = yaw_only(q);
        let forward = flat * Vec3::NEG_Z;
        assert!(forward.y.abs() < 1e-5);
        assert!((yaw_degrees(flat) - 0.8_f32.to_degrees()).abs() < 1e-3);
    }

    #[test]
    fn test_slerp_unclamped_overshoots() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(0.5);
        let half = slerp_unclamped(a, b, 0.5);
        assert!(half.angle_between(Quat::from_rotation_y(0.25)) < 1e-4);
        let over = slerp_unclamped(a, b, 2.0);
        assert!(over.angle_between(Quat::from_rotation_y(1.0)) < 1e-4);
    }

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let mut velocity = Vec3::ZERO;
        let mut pos = Vec3::new(1.0, 0.0, 0.0);
        for _ in 0..300 {
            pos = smooth_damp(pos, Vec3::ZERO, &mut velocity, 0.1, f32::INFINITY, 1.0 / 60.0);
            assert!(pos.x >= -1e-6);
        }
        assert!(pos.length() < 1e-3);
    }
}
