//! World systems
//!
//! Spawns the demo yard: ground, carts with a mounted cannon, loose crates, a
//! lantern that can be stowed, and two aim zones.

use avian3d::prelude::*;
use bevy::prelude::*;
use grip_shared::{CompoundVehicle, Equippable, Grabbable};

use crate::look::{AimPull, AimZone};
use crate::scene::GameLayer;

// =============================================================================
// COMPONENTS
// =============================================================================

/// Root entity for all client-side world visuals
#[derive(Component)]
pub struct ClientWorldRoot;

struct Palette {
    wood: Handle<StandardMaterial>,
    iron: Handle<StandardMaterial>,
    crate_wood: Handle<StandardMaterial>,
    lantern: Handle<StandardMaterial>,
    marker: Handle<StandardMaterial>,
}

// =============================================================================
// SPAWNING
// =============================================================================

/// Spawn the demo world
pub fn spawn_world(
    mut commands: Commands,
    world_roots: Query<Entity, With<ClientWorldRoot>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !world_roots.is_empty() {
        return;
    }

    let root = commands
        .spawn((
            ClientWorldRoot,
            Transform::default(),
            Visibility::default(),
        ))
        .id();

    let sun = commands
        .spawn((
            DirectionalLight {
                shadows_enabled: true,
                color: Color::srgb(1.0, 0.97, 0.9),
                ..default()
            },
            Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.4, 0.0)),
        ))
        .id();
    commands.entity(root).add_child(sun);

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.9, 1.0),
        brightness: 250.0,
        affects_lightmapped_meshes: true,
    });
    commands.insert_resource(ClearColor(Color::srgb(0.55, 0.7, 0.85)));

    // --- Ground ---
    let ground_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.45, 0.5, 0.4),
        perceptual_roughness: 0.95,
        ..default()
    });
    let ground = commands
        .spawn((
            Name::new("Ground"),
            Mesh3d(meshes.add(Cuboid::new(60.0, 0.2, 60.0))),
            MeshMaterial3d(ground_material),
            Transform::from_xyz(0.0, -0.1, 0.0),
            RigidBody::Static,
            Collider::cuboid(60.0, 0.2, 60.0),
        ))
        .id();
    commands.entity(root).add_child(ground);

    let palette = Palette {
        wood: materials.add(Color::srgb(0.55, 0.36, 0.2)),
        iron: materials.add(StandardMaterial {
            base_color: Color::srgb(0.25, 0.25, 0.28),
            metallic: 0.8,
            perceptual_roughness: 0.4,
            ..default()
        }),
        crate_wood: materials.add(Color::srgb(0.7, 0.55, 0.3)),
        lantern: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.85, 0.4),
            emissive: LinearRgba::rgb(2.0, 1.5, 0.5),
            ..default()
        }),
        marker: materials.add(StandardMaterial {
            base_color: Color::srgba(0.9, 0.9, 0.2, 0.25),
            alpha_mode: AlphaMode::Blend,
            ..default()
        }),
    };

    // --- Carts ---
    for (i, position) in [Vec3::new(-2.5, 0.6, -3.0), Vec3::new(3.0, 0.6, -6.0)]
        .into_iter()
        .enumerate()
    {
        let cart = spawn_cart(&mut commands, &mut meshes, &palette, position, i == 0);
        commands.entity(root).add_child(cart);
    }

    // --- Loose crates ---
    let crate_mesh = meshes.add(Cuboid::new(0.4, 0.4, 0.4));
    for position in [
        Vec3::new(0.0, 0.2, -2.0),
        Vec3::new(0.6, 0.2, -2.2),
        Vec3::new(0.3, 0.6, -2.1),
    ] {
        let crate_box = commands
            .spawn((
                Name::new("Crate"),
                Grabbable,
                Mesh3d(crate_mesh.clone()),
                MeshMaterial3d(palette.crate_wood.clone()),
                Transform::from_translation(position),
                RigidBody::Dynamic,
                Collider::cuboid(0.4, 0.4, 0.4),
            ))
            .id();
        commands.entity(root).add_child(crate_box);
    }

    // --- Lantern (goes into the inventory on release) ---
    let lantern = commands
        .spawn((
            Name::new("Lantern"),
            Grabbable,
            Equippable {
                item_name: "Lantern".to_string(),
            },
            Mesh3d(meshes.add(Cylinder::new(0.08, 0.25))),
            MeshMaterial3d(palette.lantern.clone()),
            Transform::from_xyz(-1.0, 0.15, -1.5),
            RigidBody::Dynamic,
            Collider::cylinder(0.08, 0.25),
        ))
        .id();
    commands.entity(root).add_child(lantern);

    // --- Aim zones ---
    let statue = Vec3::new(-8.0, 2.0, -12.0);
    let statue_entity = commands
        .spawn((
            Name::new("Statue"),
            Mesh3d(meshes.add(Capsule3d::new(0.5, 2.0))),
            MeshMaterial3d(palette.iron.clone()),
            Transform::from_translation(statue),
            RigidBody::Static,
            Collider::capsule(0.5, 2.0),
        ))
        .id();
    commands.entity(root).add_child(statue_entity);

    let bell = Vec3::new(8.0, 4.0, -10.0);
    let bell_entity = commands
        .spawn((
            Name::new("Bell"),
            Mesh3d(meshes.add(Sphere::new(0.6))),
            MeshMaterial3d(palette.lantern.clone()),
            Transform::from_translation(bell),
        ))
        .id();
    commands.entity(root).add_child(bell_entity);

    let zones = [
        (
            "Statue Zone",
            Vec3::new(-6.0, 0.0, -6.0),
            AimZone {
                radius: 2.5,
                focus: statue,
                pull: AimPull::Soft {
                    strength: 1.5,
                    strength_no_aim: 4.0,
                    priority: 10,
                    low_impact: true,
                },
            },
        ),
        (
            "Bell Zone",
            Vec3::new(6.0, 0.0, -5.0),
            AimZone {
                radius: 2.0,
                focus: bell,
                pull: AimPull::Hard {
                    duration: 1.5,
                    speed: 2.0,
                    priority: 0,
                    low_impact: false,
                },
            },
        ),
    ];
    for (name, position, zone) in zones {
        let height = 2.5;
        let zone_entity = commands
            .spawn((
                Name::new(name),
                zone,
                Mesh3d(meshes.add(Cylinder::new(zone.radius, 0.02))),
                MeshMaterial3d(palette.marker.clone()),
                Transform::from_translation(position + Vec3::Y * 0.01),
                RigidBody::Static,
                Sensor,
                Collider::cylinder(zone.radius, height),
                CollisionLayers::new(GameLayer::Trigger, [GameLayer::Player]),
            ))
            .id();
        commands.entity(root).add_child(zone_entity);
    }

    info!("Spawned demo world");
}

/// Cart body with wheels; the first cart also carries a cannon.
fn spawn_cart(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    palette: &Palette,
    position: Vec3,
    with_cannon: bool,
) -> Entity {
    let body_size = Vec3::new(1.2, 0.4, 2.0);
    let wheel_radius = 0.3;
    let wheel_mesh = meshes.add(Cylinder::new(wheel_radius, 0.1));
    let body_mesh = meshes.add(Cuboid::from_size(body_size));
    let barrel_mesh = meshes.add(Cylinder::new(0.15, 1.4));

    commands
        .spawn((
            Name::new(if with_cannon { "Cannon Cart" } else { "Cart" }),
            CompoundVehicle::Cart,
            Mesh3d(body_mesh),
            MeshMaterial3d(palette.wood.clone()),
            Transform::from_translation(position),
            RigidBody::Dynamic,
            Collider::cuboid(body_size.x, body_size.y, body_size.z),
            LinearDamping(1.5),
            AngularDamping(3.0),
        ))
        .with_children(|cart| {
            for (x, z) in [(-0.65, -0.7), (0.65, -0.7), (-0.65, 0.7), (0.65, 0.7)] {
                cart.spawn((
                    Name::new("Wheel"),
                    Mesh3d(wheel_mesh.clone()),
                    MeshMaterial3d(palette.iron.clone()),
                    Transform::from_xyz(x, -0.2, z)
                        .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
                    Collider::cylinder(wheel_radius, 0.1),
                ));
            }
            if with_cannon {
                cart.spawn((
                    Name::new("Cart Cannon"),
                    CompoundVehicle::CartCannon,
                    Mesh3d(barrel_mesh),
                    MeshMaterial3d(palette.iron.clone()),
                    Transform::from_xyz(0.0, 0.45, 0.2)
                        .with_rotation(Quat::from_rotation_x(-1.2)),
                    Collider::cylinder(0.15, 1.4),
                ));
            }
        })
        .id()
}
