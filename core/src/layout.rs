//! Declarative dungeon descriptions consumed when a world is created.

use serde::{Deserialize, Serialize};

use crate::{CellCoord, EntityType};

/// Complete description of a dungeon before simulation starts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DungeonLayout {
    /// Entities placed on the board, in creation order.
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    /// Win condition; a dungeon without one counts as finished.
    #[serde(rename = "goal-condition", default)]
    pub goal_condition: Option<GoalSpec>,
}

/// Placement of a single entity within a layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Type of entity to create.
    #[serde(rename = "type")]
    pub kind: EntityType,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Door or key identifier pairing keys with doors.
    #[serde(default)]
    pub key: Option<u32>,
    /// Portal colour pairing portals.
    #[serde(default)]
    pub colour: Option<String>,
    /// Ticks an enemy is held after entering a swamp tile.
    #[serde(default)]
    pub movement_factor: Option<u32>,
}

impl EntitySpec {
    /// Creates a placement without any type-specific attributes.
    #[must_use]
    pub fn new(kind: EntityType, cell: CellCoord) -> Self {
        Self {
            kind,
            x: cell.x(),
            y: cell.y(),
            key: None,
            colour: None,
            movement_factor: None,
        }
    }

    /// Attaches a key identifier, used by doors and keys.
    #[must_use]
    pub fn with_key(mut self, key: u32) -> Self {
        self.key = Some(key);
        self
    }

    /// Attaches a colour, used by portals.
    #[must_use]
    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    /// Attaches a movement factor, used by swamp tiles.
    #[must_use]
    pub fn with_movement_factor(mut self, movement_factor: u32) -> Self {
        self.movement_factor = Some(movement_factor);
        self
    }

    /// Cell the entity is placed on.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Declarative win condition tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "goal")]
pub enum GoalSpec {
    /// Satisfied when every subgoal is satisfied.
    #[serde(rename = "AND")]
    And {
        /// Child conditions.
        subgoals: Vec<GoalSpec>,
    },
    /// Satisfied when any subgoal is satisfied.
    #[serde(rename = "OR")]
    Or {
        /// Child conditions.
        subgoals: Vec<GoalSpec>,
    },
    /// Player stands on an exit.
    #[serde(rename = "exit")]
    Exit,
    /// Enough treasure collected.
    #[serde(rename = "treasure")]
    Treasure,
    /// Every switch pressed.
    #[serde(rename = "boulders")]
    Boulders,
    /// Enough enemies defeated.
    #[serde(rename = "enemies")]
    Enemies,
}
