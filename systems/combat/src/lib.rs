#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure battle resolution between the player and a single enemy.
//!
//! The world hands this system an [`Engagement`] describing both combatants,
//! the player's active gear and allies, and receives a [`Resolution`] it then
//! applies. Strategy selection is pull-based: [`strategy_for`] is queried at
//! the moment of collision from the player's current effect, so nothing has
//! to be notified when effects change.

use delve_core::{Battle, Config, EffectKind, EnemyKind, EntityId, ItemKind, ItemSummary, Round};
use rand::Rng;

/// Upper bound on the rounds of a single battle.
///
/// Fights whose sides cannot damage each other stop here as a stalemate.
pub const MAX_ROUNDS: usize = 10_000;

const ENEMY_DAMAGE_DIVISOR: f64 = 5.0;
const PLAYER_DAMAGE_DIVISOR: f64 = 10.0;

/// How an enemy behaves toward the player at the moment of contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Regular round-based battle.
    Fight,
    /// One-round battle in which the enemy dies and the player is unharmed.
    InvincibleFight,
    /// The enemy runs away; no battle is recorded.
    InvincibleRun,
    /// The enemy ignores the player; no battle is recorded.
    InvisibleAvoid,
}

/// Selects the strategy an enemy uses against the player's current effect.
///
/// `sees_invisible` marks enemies that can still track an invisible player,
/// such as an assassin within its recon radius.
#[must_use]
pub fn strategy_for(enemy: EnemyKind, effect: Option<EffectKind>, sees_invisible: bool) -> Strategy {
    match effect {
        None => Strategy::Fight,
        Some(EffectKind::Invisible) if sees_invisible => Strategy::Fight,
        Some(EffectKind::Invisible) => Strategy::InvisibleAvoid,
        Some(EffectKind::Invincible) => match enemy {
            EnemyKind::Spider => Strategy::InvincibleFight,
            EnemyKind::ZombieToast
            | EnemyKind::Mercenary
            | EnemyKind::Assassin
            | EnemyKind::Hydra => Strategy::InvincibleRun,
        },
    }
}

/// Bonuses granted by gear and allies, taken from configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombatTuning {
    /// Attack added by a sword.
    pub sword_attack: f64,
    /// Factor applied to total attack by a bow.
    pub bow_multiplier: f64,
    /// Defence added by a shield.
    pub shield_defence: f64,
    /// Attack added by midnight armour.
    pub armour_attack: f64,
    /// Defence added by midnight armour.
    pub armour_defence: f64,
    /// Attack added per ally.
    pub ally_attack: f64,
    /// Defence added per ally.
    pub ally_defence: f64,
}

impl CombatTuning {
    /// Extracts combat bonuses from the world configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            sword_attack: config.sword_attack,
            bow_multiplier: config.bow_attack_multiplier,
            shield_defence: config.shield_defence,
            armour_attack: config.midnight_armour_attack,
            armour_defence: config.midnight_armour_defence,
            ally_attack: config.ally_attack,
            ally_defence: config.ally_defence,
        }
    }
}

/// Health and attack of one side of a battle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combatant {
    /// Identifier of the combatant.
    pub id: EntityId,
    /// Current health.
    pub health: f64,
    /// Base attack.
    pub attack: f64,
}

/// A piece of equipment the player brings into battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gear {
    /// The inventory item.
    pub item: ItemSummary,
    /// Remaining rounds of use; `None` for permanent gear.
    pub durability: Option<u32>,
}

/// Chance for an enemy to heal instead of taking damage in a round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Regeneration {
    /// Probability in `0.0..=1.0` of healing in a given round.
    pub probability: f64,
    /// Health restored when the enemy heals.
    pub amount: f64,
}

impl Regeneration {
    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.probability.is_nan() || self.probability <= 0.0 {
            false
        } else if self.probability >= 1.0 {
            true
        } else {
            rng.gen_bool(self.probability)
        }
    }
}

/// Everything needed to resolve a collision between player and enemy.
#[derive(Clone, Debug, PartialEq)]
pub struct Engagement {
    /// The player side.
    pub player: Combatant,
    /// The enemy side.
    pub enemy: Combatant,
    /// Variant of the enemy.
    pub enemy_kind: EnemyKind,
    /// Equipment active at the start of the battle.
    pub gear: Vec<Gear>,
    /// Number of allies backing the player.
    pub allies: u32,
    /// Regeneration ability of the enemy, if any.
    pub regeneration: Option<Regeneration>,
    /// Consumable responsible for the active effect, if any.
    pub consumable: Option<ItemSummary>,
}

/// Terminal state of a resolved engagement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The enemy's health reached zero.
    EnemyDefeated,
    /// The player's health reached zero.
    PlayerDefeated,
    /// Neither side could damage the other within [`MAX_ROUNDS`].
    Stalemate,
    /// The enemy ran from an invincible player.
    Fled,
    /// The enemy ignored an invisible player.
    Avoided,
}

/// Result of resolving an engagement, ready to be applied to the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// How the engagement ended.
    pub outcome: Outcome,
    /// Battle record, absent when no battle took place.
    pub battle: Option<Battle>,
    /// Player health after the engagement.
    pub player_health: f64,
    /// Enemy health after the engagement.
    pub enemy_health: f64,
    /// Gear still usable, with updated durability.
    pub gear: Vec<Gear>,
    /// Gear whose durability ran out during the battle.
    pub worn_out: Vec<ItemSummary>,
}

/// Resolves an engagement with the provided strategy.
pub fn resolve<R: Rng + ?Sized>(
    engagement: Engagement,
    strategy: Strategy,
    tuning: &CombatTuning,
    rng: &mut R,
) -> Resolution {
    match strategy {
        Strategy::Fight => fight(engagement, tuning, rng),
        Strategy::InvincibleFight => instant_kill(engagement),
        Strategy::InvincibleRun => unresolved(engagement, Outcome::Fled),
        Strategy::InvisibleAvoid => unresolved(engagement, Outcome::Avoided),
    }
}

fn fight<R: Rng + ?Sized>(engagement: Engagement, tuning: &CombatTuning, rng: &mut R) -> Resolution {
    let Engagement {
        player,
        enemy,
        enemy_kind,
        mut gear,
        allies,
        regeneration,
        consumable: _,
    } = engagement;

    let mut player_health = player.health;
    let mut enemy_health = enemy.health;
    let mut rounds = Vec::new();
    let mut worn_out = Vec::new();

    let outcome = loop {
        if rounds.len() >= MAX_ROUNDS {
            break Outcome::Stalemate;
        }

        let bonuses = Bonuses::collect(&gear, allies, tuning);
        let regenerated = regeneration
            .as_ref()
            .filter(|regeneration| regeneration.roll(rng))
            .map(|regeneration| regeneration.amount);

        let enemy_health_delta = match regenerated {
            Some(amount) => amount,
            None => {
                -(bonuses.multiplier
                    * (player.attack + bonuses.melee + bonuses.ally_attack + bonuses.special_attack)
                    / ENEMY_DAMAGE_DIVISOR)
            }
        };
        let player_damage = (enemy.attack
            - bonuses.shield
            - bonuses.ally_defence
            - bonuses.special_defence)
            / PLAYER_DAMAGE_DIVISOR;
        let player_health_delta = -player_damage.max(0.0);

        player_health += player_health_delta;
        enemy_health += enemy_health_delta;
        rounds.push(Round {
            player_health_delta,
            enemy_health_delta,
            items_used: gear.iter().map(|piece| piece.item).collect(),
        });

        wear(&mut gear, &mut worn_out);

        if player_health <= 0.0 {
            break Outcome::PlayerDefeated;
        }
        if enemy_health <= 0.0 {
            break Outcome::EnemyDefeated;
        }
    };

    let battle = Battle::new(
        player.id,
        enemy.id,
        enemy_kind,
        player.health,
        enemy.health,
        rounds,
    );

    Resolution {
        outcome,
        battle: Some(battle),
        player_health,
        enemy_health,
        gear,
        worn_out,
    }
}

fn instant_kill(engagement: Engagement) -> Resolution {
    let round = Round {
        player_health_delta: 0.0,
        enemy_health_delta: -engagement.enemy.health,
        items_used: engagement.consumable.into_iter().collect(),
    };
    let battle = Battle::new(
        engagement.player.id,
        engagement.enemy.id,
        engagement.enemy_kind,
        engagement.player.health,
        engagement.enemy.health,
        vec![round],
    );

    Resolution {
        outcome: Outcome::EnemyDefeated,
        battle: Some(battle),
        player_health: engagement.player.health,
        enemy_health: 0.0,
        gear: engagement.gear,
        worn_out: Vec::new(),
    }
}

fn unresolved(engagement: Engagement, outcome: Outcome) -> Resolution {
    Resolution {
        outcome,
        battle: None,
        player_health: engagement.player.health,
        enemy_health: engagement.enemy.health,
        gear: engagement.gear,
        worn_out: Vec::new(),
    }
}

/// Removes one point of durability from every non-permanent piece of gear.
fn wear(gear: &mut Vec<Gear>, worn_out: &mut Vec<ItemSummary>) {
    gear.retain_mut(|piece| match piece.durability.as_mut() {
        None => true,
        Some(remaining) => {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                worn_out.push(piece.item);
                false
            } else {
                true
            }
        }
    });
}

#[derive(Clone, Copy, Debug)]
struct Bonuses {
    melee: f64,
    multiplier: f64,
    shield: f64,
    special_attack: f64,
    special_defence: f64,
    ally_attack: f64,
    ally_defence: f64,
}

impl Bonuses {
    fn collect(gear: &[Gear], allies: u32, tuning: &CombatTuning) -> Self {
        let mut bonuses = Self {
            melee: 0.0,
            multiplier: 1.0,
            shield: 0.0,
            special_attack: 0.0,
            special_defence: 0.0,
            ally_attack: tuning.ally_attack * f64::from(allies),
            ally_defence: tuning.ally_defence * f64::from(allies),
        };

        for piece in gear {
            match piece.item.kind {
                ItemKind::Sword => bonuses.melee += tuning.sword_attack,
                ItemKind::Bow => bonuses.multiplier = tuning.bow_multiplier,
                ItemKind::Shield => bonuses.shield += tuning.shield_defence,
                ItemKind::MidnightArmour => {
                    bonuses.special_attack += tuning.armour_attack;
                    bonuses.special_defence += tuning.armour_defence;
                }
                _ => {}
            }
        }

        bonuses
    }
}
