//! Local inventory and the interaction HUD.

use bevy::prelude::*;
use grip_shared::aim::HardAimPhase;
use grip_shared::{AimArbiter, Equippable, GrabState, Inventory, LocalPlayer};

use crate::interaction::HandOrigin;

/// Slots in the local inventory
pub const INVENTORY_CAPACITY: usize = 4;

/// Items stowed by releasing an equippable object
#[derive(Resource, Default, Debug)]
pub struct PlayerInventory {
    pub items: Vec<String>,
}

impl PlayerInventory {
    pub fn is_full(&self) -> bool {
        self.items.len() >= INVENTORY_CAPACITY
    }
}

/// [`Inventory`] over the world's [`Equippable`] components.
pub struct EquipFromWorld<'a, 'w, 's> {
    pub inventory: &'a mut PlayerInventory,
    pub items: &'a Query<'w, 's, &'static Equippable>,
}

impl Inventory for EquipFromWorld<'_, '_, '_> {
    fn try_equip(&mut self, object: Entity) -> bool {
        let Ok(item) = self.items.get(object) else {
            return false;
        };
        if self.inventory.is_full() {
            warn!("Inventory full, {} stays in the world", item.item_name);
            return false;
        }
        self.inventory.items.push(item.item_name.clone());
        info!("Equipped {}", item.item_name);
        true
    }
}

// =============================================================================
// HUD
// =============================================================================

#[derive(Component)]
pub struct InteractionHud;

pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        InteractionHud,
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgba(1.0, 1.0, 1.0, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
    ));
}

pub fn update_hud(
    inventory: Res<PlayerInventory>,
    players: Query<(&HandOrigin, &GrabState, &AimArbiter), With<LocalPlayer>>,
    mut hud: Query<&mut Text, With<InteractionHud>>,
) {
    let Ok(mut text) = hud.single_mut() else {
        return;
    };
    let Ok((origin, grab, arbiter)) = players.single() else {
        return;
    };

    let grab_line = if grab.override_active {
        format!("override grab (grace {:.2}s)", grab.force_timer)
    } else if grab.grabbed {
        "holding".to_string()
    } else {
        "empty".to_string()
    };
    let aim_line = match arbiter.hard_phase() {
        HardAimPhase::Idle if arbiter.soft_active() => {
            format!("soft {:.2}", arbiter.soft_strength())
        }
        HardAimPhase::Idle => "free".to_string(),
        HardAimPhase::Active => format!("hard {:.2}", arbiter.hard_weight()),
        HardAimPhase::Decaying => format!("hard decaying {:.2}", arbiter.hard_weight()),
    };
    let items = if inventory.items.is_empty() {
        "-".to_string()
    } else {
        inventory.items.join(", ")
    };

    **text = format!(
        "hand: {:?}\ngrab: {}\nlook: {} (yaw {:.0})\ninventory: {}",
        origin.0.source,
        grab_line,
        aim_line,
        arbiter.yaw_offset(),
        items
    );
}
