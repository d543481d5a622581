//! Player rig constants

/// Standing eye height above the rig origin
pub const HEAD_HEIGHT: f32 = 1.6;

/// Where the main hand rests relative to the head (head-local, meters)
pub const HAND_REST_OFFSET: [f32; 3] = [0.25, -0.35, -0.45];

/// Hand tip distance in front of the hand anchor, along its forward axis
pub const HAND_TIP_LENGTH: f32 = 0.12;

/// Mouse sensitivity for look
pub const MOUSE_SENSITIVITY: f32 = 0.003;

/// Pitch limit for the desktop head stand-in (radians)
pub const MAX_HEAD_PITCH: f32 = 1.4;

/// Spawn position for new players
pub const SPAWN_POSITION: [f32; 3] = [0.0, 0.0, 4.0];

/// Walk speed of the desktop rig (units per second)
pub const RIG_WALK_SPEED: f32 = 3.0;
