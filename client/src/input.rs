//! Player input handling
//!
//! Raw devices are folded into two things: the desktop stand-in for the
//! headset (`InputState`: mouse look and walking) and a named action map that
//! the interaction layer reads by name.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use grip_shared::player::{MAX_HEAD_PITCH, MOUSE_SENSITIVITY};
use grip_shared::InteractionSettings;
use std::collections::HashMap;

/// Value of one named action this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionValue {
    Scalar(f32),
    Axis2d(Vec2),
}

impl ActionValue {
    pub fn is_pressed(&self) -> bool {
        match self {
            ActionValue::Scalar(v) => *v > 0.5,
            ActionValue::Axis2d(v) => v.length() > 0.5,
        }
    }

    pub fn axis(&self) -> Vec2 {
        match self {
            ActionValue::Scalar(v) => Vec2::new(*v, 0.0),
            ActionValue::Axis2d(v) => *v,
        }
    }
}

/// Named actions, rebuilt from the bound devices every frame.
///
/// Reading a name nobody registered returns `None`; callers decide what an
/// unavailable action means.
#[derive(Resource, Default, Debug)]
pub struct ActionMap {
    values: HashMap<String, ActionValue>,
}

impl ActionMap {
    pub fn set(&mut self, name: &str, value: ActionValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn read(&self, name: &str) -> Option<ActionValue> {
        self.values.get(name).copied()
    }

    pub fn pressed(&self, name: &str) -> Option<bool> {
        self.read(name).map(|v| v.is_pressed())
    }
}

/// Desktop stand-in for headset tracking and locomotion
#[derive(Resource, Default)]
pub struct InputState {
    /// Head yaw in tracking space (radians)
    pub head_yaw: f32,
    /// Head pitch in tracking space (radians)
    pub head_pitch: f32,
    /// WASD, x = right, y = forward
    pub walk: Vec2,
    /// F2 toggles the controller rig off, as if the controller went to sleep
    pub toggle_rig: bool,
}

impl InputState {
    pub fn head_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.head_yaw, self.head_pitch, 0.0)
    }
}

/// Handle keyboard input for walking and rig toggles
pub fn handle_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut input_state: ResMut<InputState>,
) {
    let mut walk = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        walk.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        walk.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        walk.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        walk.x -= 1.0;
    }
    input_state.walk = walk.normalize_or_zero();
    input_state.toggle_rig = keyboard.just_pressed(KeyCode::F2);
}

/// Mouse motion drives the head like an HMD would
pub fn handle_mouse_input(
    mut mouse_motion: MessageReader<MouseMotion>,
    mut input_state: ResMut<InputState>,
) {
    let mut delta = Vec2::ZERO;
    for motion in mouse_motion.read() {
        delta += motion.delta;
    }

    if delta != Vec2::ZERO {
        input_state.head_yaw -= delta.x * MOUSE_SENSITIVITY;
        input_state.head_pitch = (input_state.head_pitch - delta.y * MOUSE_SENSITIVITY)
            .clamp(-MAX_HEAD_PITCH, MAX_HEAD_PITCH);
    }
}

/// Rebuild the action map from the desktop bindings
pub fn update_action_map(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    settings: Res<InteractionSettings>,
    mut actions: ResMut<ActionMap>,
) {
    let names = &settings.actions;

    let grab = mouse_button.pressed(MouseButton::Left) || keyboard.pressed(KeyCode::KeyF);
    actions.set(&names.grab, ActionValue::Scalar(if grab { 1.0 } else { 0.0 }));

    // Positive x turns right, like a thumbstick.
    let mut turn = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyE) {
        turn.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        turn.x -= 1.0;
    }
    actions.set(&names.turn, ActionValue::Axis2d(turn));

    let recenter = keyboard.pressed(KeyCode::KeyR);
    actions.set(&names.recenter, ActionValue::Scalar(if recenter { 1.0 } else { 0.0 }));
}
