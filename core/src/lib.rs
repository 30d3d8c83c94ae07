#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Delve dungeon engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing player intent, the world executes those commands via its
//! `apply` entry point, and then reports [`Event`] values describing what
//! happened during the tick. Systems consume immutable inputs and respond with
//! plain values; they never hold references into the world.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod battle;
mod config;
mod layout;
mod view;

pub use battle::{Battle, ItemSummary, Round};
pub use config::Config;
pub use layout::{DungeonLayout, EntitySpec, GoalSpec};
pub use view::{DungeonView, EntityView, ItemView};

/// Commands that express every permissible player-driven mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Advances the world one tick after moving the player one cell.
    Move {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Advances the world one tick after consuming or placing an item.
    UseItem {
        /// Inventory identifier of the item to use.
        item: EntityId,
    },
    /// Crafts a buildable from inventory materials.
    Build {
        /// Kind of item to craft.
        buildable: BuildableKind,
    },
    /// Interacts with a board entity such as a mercenary or spawner.
    Interact {
        /// Identifier of the targeted board entity.
        entity: EntityId,
    },
    /// Restores the world to an earlier tick and spawns the historical actor.
    Rewind {
        /// Number of ticks to travel back. Must lie within `1..=elapsed`.
        ticks: i64,
    },
}

/// Events reported by the world after processing a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the simulation advanced to a new tick.
    TickAdvanced {
        /// Tick counter after the advance.
        tick: u64,
    },
    /// Confirms that an actor moved between two cells.
    ActorMoved {
        /// Identifier of the actor that moved.
        entity: EntityId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Reports that an actor's move was rejected by an obstacle.
    MoveBlocked {
        /// Identifier of the actor whose move failed.
        entity: EntityId,
        /// Direction of the failed move.
        direction: Direction,
    },
    /// Confirms that a boulder was pushed onto a new cell.
    BoulderPushed {
        /// Identifier of the boulder.
        boulder: EntityId,
        /// Cell the boulder occupies after the push.
        to: CellCoord,
    },
    /// Announces that a floor switch changed state.
    SwitchToggled {
        /// Identifier of the switch.
        switch: EntityId,
        /// Whether the switch is now pressed.
        active: bool,
    },
    /// Announces that a door was unlocked.
    DoorOpened {
        /// Identifier of the door.
        door: EntityId,
    },
    /// Confirms that an item moved from the floor into an inventory.
    ItemCollected {
        /// Identifier of the collecting actor.
        collector: EntityId,
        /// Identifier of the collected item.
        item: EntityId,
        /// Kind of the collected item.
        kind: ItemKind,
    },
    /// Confirms that an item was crafted.
    ItemBuilt {
        /// Identifier assigned to the new item.
        item: EntityId,
        /// Kind of item that was crafted.
        kind: BuildableKind,
    },
    /// Confirms that an inventory item was used.
    ItemUsed {
        /// Identifier of the used item.
        item: EntityId,
        /// Kind of the used item.
        kind: ItemKind,
    },
    /// Reports that a battle concluded and was appended to the log.
    BattleResolved {
        /// Identifier of the enemy involved.
        enemy: EntityId,
        /// Number of rounds the battle lasted.
        rounds: usize,
    },
    /// Reports that an enemy fled from an invincible player.
    EnemyFled {
        /// Identifier of the fleeing enemy.
        enemy: EntityId,
    },
    /// Reports that an enemy was removed after losing a battle.
    EnemyDefeated {
        /// Identifier of the defeated enemy.
        enemy: EntityId,
    },
    /// Reports that the live player was removed after losing a battle.
    PlayerDefeated {
        /// Identifier of the player.
        player: EntityId,
    },
    /// Confirms that an enemy became an ally of the player.
    EnemyAllied {
        /// Identifier of the recruited enemy.
        enemy: EntityId,
    },
    /// Reports that a bribe was paid but refused.
    BribeFailed {
        /// Identifier of the enemy that refused.
        enemy: EntityId,
    },
    /// Reports that an ally's mind control expired.
    AllianceExpired {
        /// Identifier of the enemy that turned hostile again.
        enemy: EntityId,
    },
    /// Confirms that a new entity was spawned into the dungeon.
    EntitySpawned {
        /// Identifier assigned to the new entity.
        entity: EntityId,
        /// Kind of entity spawned.
        kind: EntityType,
        /// Cell the entity occupies.
        cell: CellCoord,
    },
    /// Confirms that a board entity was destroyed by the player.
    EntityDestroyed {
        /// Identifier of the destroyed entity.
        entity: EntityId,
    },
    /// Reports that a placed bomb exploded.
    BombDetonated {
        /// Identifier of the bomb.
        bomb: EntityId,
        /// Identifiers of every entity removed by the blast.
        destroyed: Vec<EntityId>,
    },
    /// Reports that a timed effect became active.
    EffectStarted {
        /// Kind of effect.
        effect: EffectKind,
    },
    /// Reports that a timed effect ran out.
    EffectExpired {
        /// Kind of effect.
        effect: EffectKind,
    },
    /// Reports that the world was restored to an earlier tick.
    TimeRewound {
        /// Tick counter before the rewind.
        from: u64,
        /// Tick counter after the rewind.
        to: u64,
    },
    /// Reports that the historical actor was removed from the world.
    HistoricalActorRetired {
        /// Identifier of the historical actor.
        entity: EntityId,
    },
}

/// Errors surfaced synchronously by command entry points.
///
/// Both kinds are raised before any mutation takes place.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DungeonError {
    /// The command referenced something that does not exist.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The command is well-formed but its preconditions are not met.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

impl DungeonError {
    /// Builds an [`DungeonError::InvalidArgument`] from any displayable message.
    #[must_use]
    pub fn invalid_argument(message: impl fmt::Display) -> Self {
        Self::InvalidArgument(message.to_string())
    }

    /// Builds an [`DungeonError::InvalidAction`] from any displayable message.
    #[must_use]
    pub fn invalid_action(message: impl fmt::Display) -> Self {
        Self::InvalidAction(message.to_string())
    }
}

/// Cardinal movement directions available to actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Movement toward decreasing `y`.
    #[serde(alias = "up")]
    North,
    /// Movement toward increasing `x`.
    #[serde(alias = "right")]
    East,
    /// Movement toward increasing `y`.
    #[serde(alias = "down")]
    South,
    /// Movement toward decreasing `x`.
    #[serde(alias = "left")]
    West,
}

impl Direction {
    /// Every direction in the canonical up, right, down, left order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset applied to a cell when stepping in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

impl FromStr for Direction {
    type Err = DungeonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" | "north" => Ok(Self::North),
            "right" | "east" => Ok(Self::East),
            "down" | "south" => Ok(Self::South),
            "left" | "west" => Ok(Self::West),
            other => Err(DungeonError::invalid_argument(format!(
                "unknown direction '{other}'"
            ))),
        }
    }
}

/// Location of a single dungeon cell.
///
/// Coordinates are signed because dungeon layouts are free to place entities
/// at negative positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal position of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical position of the cell; larger values lie further south.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Cell adjacent to this one in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (square radius) distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Reports whether the two cells share an edge.
    #[must_use]
    pub fn is_cardinally_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Direction of a single cardinal step from `self` to `other`, if any.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.step(*direction) == other)
    }
}

/// Unique identifier assigned to every entity and inventory item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = DungeonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| DungeonError::invalid_argument(format!("'{value}' is not an entity id")))
    }
}

/// Every entity type that can appear in a layout or a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// The live player.
    Player,
    /// The historical replay of the player created by a rewind.
    OlderPlayer,
    /// Impassable wall.
    Wall,
    /// Exit tile for the exit goal.
    Exit,
    /// Pushable boulder.
    Boulder,
    /// Floor switch pressed by boulders.
    Switch,
    /// Locked door opened by a matching key.
    Door,
    /// Teleporter paired by colour.
    Portal,
    /// Spawner that periodically creates zombie toasts.
    ZombieToastSpawner,
    /// Terrain that slows enemies.
    SwampTile,
    /// Tile that rewinds time when the player steps on it.
    TimeTravellingPortal,
    /// Bomb placed on the floor, waiting for a switch.
    PlacedBomb,
    /// Circling spider.
    Spider,
    /// Wandering zombie toast.
    ZombieToast,
    /// Bribable pursuing mercenary.
    Mercenary,
    /// Bribable pursuing assassin.
    Assassin,
    /// Regenerating hydra.
    Hydra,
    /// Treasure counting toward the treasure goal.
    Treasure,
    /// Special treasure that also unlocks doors.
    SunStone,
    /// Door key.
    Key,
    /// Potion granting invincibility.
    InvincibilityPotion,
    /// Potion granting invisibility.
    InvisibilityPotion,
    /// Crafting material.
    Wood,
    /// Crafting material.
    Arrow,
    /// Collectable bomb.
    Bomb,
    /// Melee weapon.
    Sword,
    /// Ranged weapon.
    Bow,
    /// Defensive gear.
    Shield,
    /// Mind-control gear.
    Sceptre,
    /// Permanent attack and defence gear.
    MidnightArmour,
}

impl EntityType {
    /// Canonical snake-case name used in layouts and projections.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::OlderPlayer => "older_player",
            Self::Wall => "wall",
            Self::Exit => "exit",
            Self::Boulder => "boulder",
            Self::Switch => "switch",
            Self::Door => "door",
            Self::Portal => "portal",
            Self::ZombieToastSpawner => "zombie_toast_spawner",
            Self::SwampTile => "swamp_tile",
            Self::TimeTravellingPortal => "time_travelling_portal",
            Self::PlacedBomb => "placed_bomb",
            Self::Spider => "spider",
            Self::ZombieToast => "zombie_toast",
            Self::Mercenary => "mercenary",
            Self::Assassin => "assassin",
            Self::Hydra => "hydra",
            Self::Treasure => "treasure",
            Self::SunStone => "sun_stone",
            Self::Key => "key",
            Self::InvincibilityPotion => "invincibility_potion",
            Self::InvisibilityPotion => "invisibility_potion",
            Self::Wood => "wood",
            Self::Arrow => "arrow",
            Self::Bomb => "bomb",
            Self::Sword => "sword",
            Self::Bow => "bow",
            Self::Shield => "shield",
            Self::Sceptre => "sceptre",
            Self::MidnightArmour => "midnight_armour",
        }
    }

    /// Enemy variant represented by this type, if any.
    #[must_use]
    pub const fn enemy_kind(self) -> Option<EnemyKind> {
        match self {
            Self::Spider => Some(EnemyKind::Spider),
            Self::ZombieToast => Some(EnemyKind::ZombieToast),
            Self::Mercenary => Some(EnemyKind::Mercenary),
            Self::Assassin => Some(EnemyKind::Assassin),
            Self::Hydra => Some(EnemyKind::Hydra),
            _ => None,
        }
    }

    /// Item kind represented by this type, if it can sit in an inventory.
    #[must_use]
    pub const fn item_kind(self) -> Option<ItemKind> {
        match self {
            Self::Treasure => Some(ItemKind::Treasure),
            Self::SunStone => Some(ItemKind::SunStone),
            Self::Key => Some(ItemKind::Key),
            Self::InvincibilityPotion => Some(ItemKind::InvincibilityPotion),
            Self::InvisibilityPotion => Some(ItemKind::InvisibilityPotion),
            Self::Wood => Some(ItemKind::Wood),
            Self::Arrow => Some(ItemKind::Arrow),
            Self::Bomb => Some(ItemKind::Bomb),
            Self::Sword => Some(ItemKind::Sword),
            Self::Bow => Some(ItemKind::Bow),
            Self::Shield => Some(ItemKind::Shield),
            Self::Sceptre => Some(ItemKind::Sceptre),
            Self::MidnightArmour => Some(ItemKind::MidnightArmour),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hostile actor variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Circles its spawn cell and ignores most obstacles.
    Spider,
    /// Wanders randomly.
    ZombieToast,
    /// Pursues the player and can be bribed.
    Mercenary,
    /// Mercenary variant that sees through invisibility nearby.
    Assassin,
    /// Wanders and may regenerate during battle.
    Hydra,
}

impl EnemyKind {
    /// Entity type used when projecting this enemy.
    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::Spider => EntityType::Spider,
            Self::ZombieToast => EntityType::ZombieToast,
            Self::Mercenary => EntityType::Mercenary,
            Self::Assassin => EntityType::Assassin,
            Self::Hydra => EntityType::Hydra,
        }
    }

    /// Reports whether the player may bribe or mind-control this enemy.
    #[must_use]
    pub const fn is_recruitable(self) -> bool {
        matches!(self, Self::Mercenary | Self::Assassin)
    }
}

/// Items that can be held in an inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Treasure counting toward the treasure goal and spent on bribes.
    Treasure,
    /// Special treasure; opens any door and substitutes in recipes.
    SunStone,
    /// Key bound to a door identifier.
    Key,
    /// Grants the invincible effect when used.
    InvincibilityPotion,
    /// Grants the invisible effect when used.
    InvisibilityPotion,
    /// Crafting material.
    Wood,
    /// Crafting material.
    Arrow,
    /// Placed on the floor when used.
    Bomb,
    /// Adds melee attack in battle.
    Sword,
    /// Multiplies attack in battle.
    Bow,
    /// Adds defence in battle.
    Shield,
    /// Mind-controls recruitable enemies.
    Sceptre,
    /// Permanent attack and defence bonus.
    MidnightArmour,
}

impl ItemKind {
    /// Entity type used when projecting this item.
    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::Treasure => EntityType::Treasure,
            Self::SunStone => EntityType::SunStone,
            Self::Key => EntityType::Key,
            Self::InvincibilityPotion => EntityType::InvincibilityPotion,
            Self::InvisibilityPotion => EntityType::InvisibilityPotion,
            Self::Wood => EntityType::Wood,
            Self::Arrow => EntityType::Arrow,
            Self::Bomb => EntityType::Bomb,
            Self::Sword => EntityType::Sword,
            Self::Bow => EntityType::Bow,
            Self::Shield => EntityType::Shield,
            Self::Sceptre => EntityType::Sceptre,
            Self::MidnightArmour => EntityType::MidnightArmour,
        }
    }

    /// Maximum number of items of this kind an inventory may hold.
    #[must_use]
    pub const fn carry_limit(self) -> Option<usize> {
        match self {
            Self::Key => Some(1),
            _ => None,
        }
    }

    /// Reports whether the item counts toward the treasure goal.
    #[must_use]
    pub const fn is_treasure(self) -> bool {
        matches!(self, Self::Treasure | Self::SunStone)
    }
}

/// Items that can be crafted from inventory materials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildableKind {
    /// One wood and three arrows.
    Bow,
    /// Two wood and one treasure or key.
    Shield,
    /// Wood or arrows, a treasure or key, and a sun stone.
    Sceptre,
    /// A sword and a sun stone, unavailable while zombies are present.
    MidnightArmour,
}

impl BuildableKind {
    /// Every buildable in canonical order.
    pub const ALL: [BuildableKind; 4] = [
        BuildableKind::Bow,
        BuildableKind::Shield,
        BuildableKind::Sceptre,
        BuildableKind::MidnightArmour,
    ];

    /// Inventory item produced by the recipe.
    #[must_use]
    pub const fn item_kind(self) -> ItemKind {
        match self {
            Self::Bow => ItemKind::Bow,
            Self::Shield => ItemKind::Shield,
            Self::Sceptre => ItemKind::Sceptre,
            Self::MidnightArmour => ItemKind::MidnightArmour,
        }
    }
}

impl FromStr for BuildableKind {
    type Err = DungeonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "bow" => Ok(Self::Bow),
            "shield" => Ok(Self::Shield),
            "sceptre" => Ok(Self::Sceptre),
            "midnight_armour" => Ok(Self::MidnightArmour),
            other => Err(DungeonError::invalid_argument(format!(
                "'{other}' is not a buildable type"
            ))),
        }
    }
}

/// Timed effects granted by potions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Enemies flee or die instantly on contact.
    Invincible,
    /// Enemies ignore the player.
    Invisible,
}

/// Distinguishes the live player from its historical replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    /// The player controlled by incoming commands.
    Live,
    /// A replay of the player's past inputs created by a rewind.
    Historical,
}
