//! Connection systems
//!
//! Networking, connection handling and cursor management.

use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions, PrimaryWindow};
use grip_shared::protocol::{TrackingUpdate, PRIVATE_KEY};
use grip_shared::{Player, PROTOCOL_ID, SERVER_ADDR, SERVER_PORT};
use lightyear::prelude::client::*;
use lightyear::prelude::*;
use std::net::SocketAddr;

use crate::states::GameState;

// =============================================================================
// CONNECTION
// =============================================================================

/// Start connection to server
/// In Lightyear 0.25, we spawn a Client entity with the appropriate networking components
/// and then trigger the Connect event to initiate the connection
pub fn start_connection(
    mut commands: Commands,
    existing_clients: Query<Entity, With<crate::GameClient>>,
) {
    info!("Initiating connection to server at {}:{}...", SERVER_ADDR, SERVER_PORT);

    // Only ever one GameClient entity; `single()` lookups depend on it.
    for e in existing_clients.iter() {
        commands.entity(e).despawn();
    }

    let server_addr: SocketAddr = match format!("{}:{}", SERVER_ADDR, SERVER_PORT).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid server address: {}", e);
            return;
        }
    };
    let local_addr = SocketAddr::from(([0, 0, 0, 0], 0));

    let client_id = rand::random::<u64>();

    // Build authentication (netcode connect token)
    let auth = Authentication::Manual {
        server_addr,
        protocol_id: PROTOCOL_ID,
        private_key: PRIVATE_KEY,
        client_id,
    };

    let netcode = match NetcodeClient::new(auth, NetcodeConfig::default()) {
        Ok(netcode) => netcode,
        Err(e) => {
            error!("Failed to create netcode client: {:?}", e);
            return;
        }
    };

    // Spawn client entity with UDP + Netcode
    let client_entity = commands
        .spawn((
            crate::GameClient,
            Client::default(),
            UdpIo::default(),
            LocalAddr(local_addr),
            PeerAddr(server_addr),
            netcode,
            // Receive replicated `Player` / `TrackedPose` of every peer.
            ReplicationReceiver::default(),
            // Client -> Server
            MessageSender::<TrackingUpdate>::default(),
        ))
        .id();

    commands.trigger(Connect {
        entity: client_entity,
    });

    info!("Client entity spawned, client_id: {}", client_id);
}

/// Check connection status
/// In Lightyear 0.25, we query for Connected/Disconnected components on the client entity
pub fn check_connection(
    mut next_state: ResMut<NextState<GameState>>,
    new_connections: Query<Entity, (With<crate::GameClient>, Added<Connected>)>,
    new_disconnections: Query<Entity, (With<crate::GameClient>, Added<Disconnected>)>,
) {
    for _entity in new_connections.iter() {
        info!("Connected to server!");
        next_state.set(GameState::Playing);
    }

    for _entity in new_disconnections.iter() {
        warn!("Connection failed or disconnected, continuing offline");
        next_state.set(GameState::Offline);
    }
}

/// F5 while offline: try the server again
pub fn retry_connection(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::F5) {
        next_state.set(GameState::Connecting);
    }
}

/// Going offline: drop everything the server replicated to us
pub fn enter_offline(mut commands: Commands, players: Query<Entity, With<Player>>) {
    for entity in players.iter() {
        commands.entity(entity).despawn();
    }
    info!("Offline: local interaction only (F5 to reconnect)");
}

// =============================================================================
// CURSOR
// =============================================================================

/// Grab cursor for mouse look
pub fn grab_cursor(
    windows: Query<Entity, With<PrimaryWindow>>,
    mut cursor_opts: Query<&mut CursorOptions>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    let Ok(window_entity) = windows.single() else {
        return;
    };
    let Ok(mut cursor) = cursor_opts.get_mut(window_entity) else {
        return;
    };

    if mouse_button.just_pressed(MouseButton::Left) {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}
