//! GripVR Client - local rig, hand-authoritative grabbing and aim arbitration
//!
//! Updated for Lightyear 0.25 / Bevy 0.17

mod camera;
mod input;
mod interaction;
mod inventory;
mod look;
mod rig;
mod scene;
mod states;
mod systems;
mod tracking;

use avian3d::prelude::*;
use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;
use grip_shared::protocol::tick_duration;
use grip_shared::{AnchorSmoothing, InteractionSettings, ProtocolPlugin, SERVER_ADDR, SERVER_PORT};
use lightyear::prelude::client::ClientPlugins;
use states::GameState;
use std::path::Path;

/// Marker component for our client entity
#[derive(Component)]
pub struct GameClient;

/// Get the asset path - for bundled macOS apps, use path relative to executable
fn get_asset_path() -> String {
    // Try to find assets relative to executable (for .app bundles)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                info!("Using bundled assets at: {:?}", bundled_assets);
                return bundled_assets.to_string_lossy().to_string();
            }
        }
    }
    // Fall back to default "assets" folder (for development)
    "assets".to_string()
}

fn main() {
    let asset_path = get_asset_path();
    let settings_path = Path::new(&asset_path).join("interaction.ron");

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "GripVR".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path,
                ..default()
            }),
    );

    // Physics for props and carts; also backs the probe's ray and sphere casts
    app.add_plugins(PhysicsPlugins::default());

    // Game state machine
    app.init_state::<GameState>();

    // Lightyear client plugins (tick_duration = 60Hz)
    app.add_plugins(ClientPlugins {
        tick_duration: tick_duration(),
    });
    app.add_plugins(ProtocolPlugin);

    // Interaction tunables, read once
    app.insert_resource(InteractionSettings::load_or_default(&settings_path));

    app.init_resource::<input::ActionMap>();
    app.init_resource::<input::InputState>();
    app.init_resource::<tracking::PeerHandCache>();
    app.init_resource::<AnchorSmoothing>();
    app.init_resource::<inventory::PlayerInventory>();

    app.add_systems(
        Startup,
        (
            rig::spawn_local_rig,
            systems::spawn_world,
            inventory::spawn_hud,
            systems::setup_avatar_assets,
            interaction::log_probe_settings,
        ),
    );

    // Connection systems
    app.add_systems(OnEnter(GameState::Connecting), systems::start_connection);
    app.add_systems(
        Update,
        systems::check_connection.run_if(in_state(GameState::Connecting)),
    );
    app.add_systems(OnEnter(GameState::Offline), systems::enter_offline);
    app.add_systems(
        Update,
        systems::retry_connection.run_if(in_state(GameState::Offline)),
    );

    // Local play never waits on the server: the rig and look pipeline run in every state.
    // ORDER MATTERS: input -> look sources -> arbiter -> camera -> rig pose.
    app.add_systems(
        Update,
        (
            (
                input::handle_keyboard_input,
                input::handle_mouse_input,
                input::update_action_map,
            ),
            (
                rig::track_head,
                look::apply_turn_input,
                look::recenter,
                look::emit_zone_aim_requests,
            )
                .chain(),
            look::tick_aim_arbiters,
            camera::follow_arbiter,
            rig::pose_rig,
        )
            .chain(),
    );

    app.add_systems(
        Update,
        (
            rig::walk_rig,
            rig::toggle_hand_tip,
            interaction::draw_grab_beams,
            interaction::draw_held_markers,
            inventory::update_hud,
            systems::grab_cursor,
        ),
    );

    // Replicated peers can show up while still connecting
    app.add_systems(
        Update,
        (
            systems::attach_remote_avatars,
            systems::sync_remote_avatars,
            tracking::draw_remote_hands,
        )
            .chain()
            .run_if(in_state(GameState::Connecting).or(in_state(GameState::Playing))),
    );

    // One grab tick; see `interaction` for the step contract
    app.add_systems(
        FixedUpdate,
        (
            interaction::begin_grab_tick,
            tracking::update_peer_hand_cache,
            interaction::resolve_local_hands,
            interaction::run_cart_probe,
            interaction::handle_grab_input,
            interaction::end_grab_tick,
            interaction::drive_held_objects,
        )
            .chain(),
    );

    // Send tracking to server at fixed tick rate (60 Hz)
    app.add_systems(
        FixedUpdate,
        tracking::send_tracking_to_server.run_if(in_state(GameState::Playing)),
    );

    info!("Starting client, server at {}:{}", SERVER_ADDR, SERVER_PORT);
    app.run();
}
