//! Immutable battle records appended to the world's battle log.

use serde::{Deserialize, Serialize};

use crate::{EnemyKind, EntityId, ItemKind};

/// Item that contributed to a battle round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Inventory identifier of the item.
    pub id: EntityId,
    /// Kind of the item.
    pub kind: ItemKind,
}

/// Health changes applied during a single round of battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Signed change applied to the player's health; never positive.
    pub player_health_delta: f64,
    /// Signed change applied to the enemy's health; positive when it regenerated.
    pub enemy_health_delta: f64,
    /// Equipment and consumables active during the round.
    pub items_used: Vec<ItemSummary>,
}

/// Completed battle between the player and one enemy.
///
/// A battle is only ever constructed once it is terminal, so its rounds are
/// frozen for the rest of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    player: EntityId,
    enemy: EntityId,
    enemy_kind: EnemyKind,
    initial_player_health: f64,
    initial_enemy_health: f64,
    rounds: Vec<Round>,
}

impl Battle {
    /// Assembles a finished battle record.
    #[must_use]
    pub fn new(
        player: EntityId,
        enemy: EntityId,
        enemy_kind: EnemyKind,
        initial_player_health: f64,
        initial_enemy_health: f64,
        rounds: Vec<Round>,
    ) -> Self {
        Self {
            player,
            enemy,
            enemy_kind,
            initial_player_health,
            initial_enemy_health,
            rounds,
        }
    }

    /// Identifier of the player that fought.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        self.player
    }

    /// Identifier of the enemy that fought.
    #[must_use]
    pub const fn enemy(&self) -> EntityId {
        self.enemy
    }

    /// Variant of the enemy that fought.
    #[must_use]
    pub const fn enemy_kind(&self) -> EnemyKind {
        self.enemy_kind
    }

    /// Player health when the battle began.
    #[must_use]
    pub const fn initial_player_health(&self) -> f64 {
        self.initial_player_health
    }

    /// Enemy health when the battle began.
    #[must_use]
    pub const fn initial_enemy_health(&self) -> f64 {
        self.initial_enemy_health
    }

    /// Rounds in the order they were fought.
    #[must_use]
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Player health after the final round.
    #[must_use]
    pub fn final_player_health(&self) -> f64 {
        self.rounds
            .iter()
            .fold(self.initial_player_health, |health, round| {
                health + round.player_health_delta
            })
    }

    /// Enemy health after the final round.
    #[must_use]
    pub fn final_enemy_health(&self) -> f64 {
        self.rounds
            .iter()
            .fold(self.initial_enemy_health, |health, round| {
                health + round.enemy_health_delta
            })
    }
}
