//! GripVR Server - Headless Bevy app that relays head and hand tracking
//!
//! Interaction is hand-authoritative on each client; the server only stores
//! every peer's tracked pose on a replicated `Player` and fans it out.
//!
//! Updated for Lightyear 0.25 / Bevy 0.17

mod systems;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use grip_shared::protocol::{get_server_bind_addr, tick_duration, PRIVATE_KEY};
use grip_shared::{ProtocolPlugin, PROTOCOL_ID, SERVER_PORT};
use lightyear::prelude::server::*;
use lightyear::prelude::*;
use std::net::SocketAddr;

use systems::PlayerEntities;

/// Marker for our server entity
#[derive(Component)]
struct GameServer;

/// Spawn the server entity with all required networking components
fn spawn_server(mut commands: Commands) {
    let bind_addr = get_server_bind_addr();
    let server_addr: SocketAddr = match format!("{}:{}", bind_addr, SERVER_PORT).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid server bind address: {}", e);
            return;
        }
    };

    info!("Spawning server entity, binding to {:?}", server_addr);

    // Spawn server entity with UDP + Netcode
    commands.spawn((
        GameServer,
        Server::default(),
        ServerUdpIo::default(),
        LocalAddr(server_addr),
        NetcodeServer::new(NetcodeConfig {
            protocol_id: PROTOCOL_ID,
            private_key: PRIVATE_KEY,
            ..default()
        }),
    ));
}

/// Start the server after it's spawned
fn start_server(
    mut commands: Commands,
    server_query: Query<Entity, (With<GameServer>, Without<Started>, Without<Starting>)>,
) {
    for server_entity in server_query.iter() {
        info!("Starting server...");
        // In Bevy 0.17 + Lightyear 0.25, trigger an EntityEvent
        commands.trigger(Start { entity: server_entity });
    }
}

/// Check if server is started (run condition)
fn server_is_started(server_query: Query<(), (With<GameServer>, With<Started>)>) -> bool {
    !server_query.is_empty()
}

fn main() {
    let mut app = App::new();

    // Headless plugins (no rendering)
    // Run the main loop at the fixed tick rate: `MessageReceiver` buffers are cleared every
    // frame, so a free-running loop would drop tracking before `FixedUpdate` reads it.
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick_duration())));
    app.add_plugins(bevy::log::LogPlugin::default());

    app.init_resource::<PlayerEntities>();

    // Lightyear server plugins (tick_duration = 60Hz)
    app.add_plugins(ServerPlugins {
        tick_duration: tick_duration(),
    });

    // Protocol plugin (component/message registration)
    app.add_plugins(ProtocolPlugin);

    app.add_systems(Startup, spawn_server);
    app.add_systems(Update, start_server);
    app.add_observer(systems::handle_disconnections);

    app.add_systems(
        FixedUpdate,
        (systems::handle_connections, systems::receive_tracking)
            .chain()
            .run_if(server_is_started),
    );

    info!("Starting server on port {}", SERVER_PORT);
    app.run();
}
