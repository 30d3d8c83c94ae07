//! Read-only projection returned to the command layer after every command.

use serde::{Deserialize, Serialize};

use crate::{Battle, BuildableKind, CellCoord, EntityId, EntityType};

/// Immutable representation of a single board entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    /// Unique identifier of the entity.
    pub id: EntityId,
    /// Type of the entity.
    #[serde(rename = "type")]
    pub kind: EntityType,
    /// Cell the entity occupies.
    pub position: CellCoord,
    /// Whether the entity accepts `interact` commands.
    pub interactable: bool,
}

/// Immutable representation of a single inventory item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    /// Unique identifier of the item.
    pub id: EntityId,
    /// Type of the item.
    #[serde(rename = "type")]
    pub kind: EntityType,
}

/// Snapshot of everything the command layer may observe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonView {
    /// Tick counter of the world.
    pub tick: u64,
    /// Board entities ordered by identifier.
    pub entities: Vec<EntityView>,
    /// Live player's inventory in pickup order.
    pub inventory: Vec<ItemView>,
    /// Every battle fought in this timeline, oldest first.
    pub battles: Vec<Battle>,
    /// Remaining win conditions; empty once the dungeon is complete.
    pub goals: String,
    /// Items the player could craft right now.
    pub buildables: Vec<BuildableKind>,
}

impl DungeonView {
    /// Returns the first entity of the provided type, if present.
    #[must_use]
    pub fn first_of(&self, kind: EntityType) -> Option<&EntityView> {
        self.entities.iter().find(|entity| entity.kind == kind)
    }

    /// Iterator over every entity of the provided type.
    pub fn all_of(&self, kind: EntityType) -> impl Iterator<Item = &EntityView> {
        self.entities
            .iter()
            .filter(move |entity| entity.kind == kind)
    }

    /// Counts inventory items of the provided type.
    #[must_use]
    pub fn inventory_count(&self, kind: EntityType) -> usize {
        self.inventory
            .iter()
            .filter(|item| item.kind == kind)
            .count()
    }
}
