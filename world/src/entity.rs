//! Entity storage shared between the live world and its snapshots.
//!
//! Entities are held behind [`Arc`] so cloning the board for a snapshot only
//! copies pointers; the first mutation of a shared entity copies it.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use delve_core::{
    ActorRole, CellCoord, EffectKind, EnemyKind, EntityId, EntityType, ItemKind, ItemSummary,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Single occupant of a dungeon cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Entity {
    pub(crate) id: EntityId,
    pub(crate) cell: CellCoord,
    pub(crate) body: Body,
}

/// Type-specific state of an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) enum Body {
    Player(PlayerState),
    Enemy(EnemyState),
    Item(Item),
    Wall,
    Exit,
    Boulder,
    Switch { active: bool },
    Door { key: Option<u32>, open: bool },
    Portal { colour: String },
    Spawner,
    Swamp { movement_factor: u32 },
    TimeTravelPortal,
    PlacedBomb,
}

impl Entity {
    pub(crate) fn new(id: EntityId, cell: CellCoord, body: Body) -> Self {
        Self { id, cell, body }
    }

    pub(crate) fn entity_type(&self) -> EntityType {
        match &self.body {
            Body::Player(player) => match player.role {
                ActorRole::Live => EntityType::Player,
                ActorRole::Historical => EntityType::OlderPlayer,
            },
            Body::Enemy(enemy) => enemy.kind.entity_type(),
            Body::Item(item) => item.kind.entity_type(),
            Body::Wall => EntityType::Wall,
            Body::Exit => EntityType::Exit,
            Body::Boulder => EntityType::Boulder,
            Body::Switch { .. } => EntityType::Switch,
            Body::Door { .. } => EntityType::Door,
            Body::Portal { .. } => EntityType::Portal,
            Body::Spawner => EntityType::ZombieToastSpawner,
            Body::Swamp { .. } => EntityType::SwampTile,
            Body::TimeTravelPortal => EntityType::TimeTravellingPortal,
            Body::PlacedBomb => EntityType::PlacedBomb,
        }
    }

    /// Hostile recruitable enemies and spawners accept `interact`.
    pub(crate) fn is_interactable(&self) -> bool {
        match &self.body {
            Body::Enemy(enemy) => enemy.kind.is_recruitable() && enemy.is_hostile(),
            Body::Spawner => true,
            _ => false,
        }
    }

    /// Cells a pushed boulder cannot enter.
    pub(crate) fn blocks_boulder(&self) -> bool {
        matches!(
            self.body,
            Body::Wall
                | Body::Boulder
                | Body::Door { open: false, .. }
                | Body::Spawner
                | Body::Portal { .. }
                | Body::PlacedBomb
        )
    }

    /// Cells walking enemies cannot enter or path through.
    pub(crate) fn blocks_ground(&self) -> bool {
        self.blocks_boulder()
    }

    pub(crate) fn player(&self) -> Option<&PlayerState> {
        match &self.body {
            Body::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.body {
            Body::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn enemy(&self) -> Option<&EnemyState> {
        match &self.body {
            Body::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }

    pub(crate) fn enemy_mut(&mut self) -> Option<&mut EnemyState> {
        match &mut self.body {
            Body::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }
}

/// Collectable item, either lying on the floor or held in an inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Item {
    pub(crate) id: EntityId,
    pub(crate) kind: ItemKind,
    pub(crate) key: Option<u32>,
    pub(crate) durability: Option<u32>,
}

impl Item {
    pub(crate) fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            kind: self.kind,
        }
    }
}

/// Effect granted by a potion, with the potion that granted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TimedEffect {
    pub(crate) kind: EffectKind,
    pub(crate) remaining: u32,
    pub(crate) source: ItemSummary,
}

/// State shared by the live player and its historical replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlayerState {
    pub(crate) role: ActorRole,
    pub(crate) health: f64,
    pub(crate) attack: f64,
    pub(crate) inventory: Vec<Item>,
    pub(crate) active_effect: Option<TimedEffect>,
    pub(crate) queued_effects: VecDeque<TimedEffect>,
    pub(crate) previous_cell: CellCoord,
    pub(crate) treasure_collected: u32,
    pub(crate) enemies_defeated: u32,
}

impl PlayerState {
    pub(crate) fn new(health: f64, attack: f64, cell: CellCoord) -> Self {
        Self {
            role: ActorRole::Live,
            health,
            attack,
            inventory: Vec::new(),
            active_effect: None,
            queued_effects: VecDeque::new(),
            previous_cell: cell,
            treasure_collected: 0,
            enemies_defeated: 0,
        }
    }

    pub(crate) fn count(&self, kind: ItemKind) -> usize {
        self.inventory
            .iter()
            .filter(|item| item.kind == kind)
            .count()
    }

    pub(crate) fn holds(&self, kind: ItemKind) -> bool {
        self.inventory.iter().any(|item| item.kind == kind)
    }

    pub(crate) fn item(&self, id: EntityId) -> Option<&Item> {
        self.inventory.iter().find(|item| item.id == id)
    }

    /// Identifiers of the first `count` items of a kind, oldest first.
    pub(crate) fn oldest(&self, kind: ItemKind, count: usize) -> Vec<EntityId> {
        self.inventory
            .iter()
            .filter(|item| item.kind == kind)
            .take(count)
            .map(|item| item.id)
            .collect()
    }

    pub(crate) fn take(&mut self, id: EntityId) -> Option<Item> {
        let index = self.inventory.iter().position(|item| item.id == id)?;
        Some(self.inventory.remove(index))
    }

    /// Accepts an item unless a carry limit forbids it.
    pub(crate) fn store(&mut self, item: Item) -> bool {
        if let Some(limit) = item.kind.carry_limit() {
            if self.count(item.kind) >= limit {
                return false;
            }
        }
        if item.kind.is_treasure() {
            self.treasure_collected = self.treasure_collected.saturating_add(1);
        }
        self.inventory.push(item);
        true
    }

    pub(crate) fn effect(&self) -> Option<EffectKind> {
        self.active_effect.map(|effect| effect.kind)
    }
}

/// Loyalty of a recruitable enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Allegiance {
    Hostile,
    Bribed,
    MindControlled { remaining: u32 },
}

/// Circling state of a spider around the cell it appeared on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SpiderRing {
    pub(crate) origin: CellCoord,
    pub(crate) position: Option<usize>,
    pub(crate) clockwise: bool,
}

impl SpiderRing {
    pub(crate) fn around(origin: CellCoord) -> Self {
        Self {
            origin,
            position: None,
            clockwise: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct EnemyState {
    pub(crate) kind: EnemyKind,
    pub(crate) health: f64,
    pub(crate) attack: f64,
    pub(crate) stuck_ticks: u32,
    pub(crate) allegiance: Allegiance,
    pub(crate) ring: Option<SpiderRing>,
}

impl EnemyState {
    pub(crate) fn new(kind: EnemyKind, health: f64, attack: f64) -> Self {
        Self {
            kind,
            health,
            attack,
            stuck_ticks: 0,
            allegiance: Allegiance::Hostile,
            ring: None,
        }
    }

    pub(crate) fn is_hostile(&self) -> bool {
        self.allegiance == Allegiance::Hostile
    }
}

/// All entities of a world, ordered by identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Board {
    entities: BTreeMap<EntityId, Arc<Entity>>,
}

impl Board {
    pub(crate) fn insert(&mut self, entity: Entity) {
        let _ = self.entities.insert(entity.id, Arc::new(entity));
    }

    pub(crate) fn insert_shared(&mut self, entity: Arc<Entity>) {
        let _ = self.entities.insert(entity.id, entity);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).map(Arc::as_ref)
    }

    pub(crate) fn shared(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(&id).cloned()
    }

    /// Mutable access, copying the entity first if a snapshot shares it.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).map(Arc::make_mut)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().map(Arc::as_ref)
    }

    pub(crate) fn at(&self, cell: CellCoord) -> impl Iterator<Item = &Entity> {
        self.iter().filter(move |entity| entity.cell == cell)
    }

    pub(crate) fn ids_at(&self, cell: CellCoord) -> Vec<EntityId> {
        self.at(cell).map(|entity| entity.id).collect()
    }

    pub(crate) fn ids_where(&self, mut predicate: impl FnMut(&Entity) -> bool) -> Vec<EntityId> {
        self.iter()
            .filter(|entity| predicate(entity))
            .map(|entity| entity.id)
            .collect()
    }

    pub(crate) fn any_at(&self, cell: CellCoord, predicate: impl Fn(&Entity) -> bool) -> bool {
        self.at(cell).any(predicate)
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entities.values())
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entities = Vec::<Arc<Entity>>::deserialize(deserializer)?;
        Ok(Self {
            entities: entities
                .into_iter()
                .map(|entity| (entity.id, entity))
                .collect(),
        })
    }
}
