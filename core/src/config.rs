//! Numeric tuning read once when a world is created.

use serde::{Deserialize, Serialize};

/// Numeric parameters that tune combat, spawning, items and goals.
///
/// Every field falls back to its default when absent from the source
/// document, so partial configuration files are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Starting health of the player.
    pub player_health: f64,
    /// Base attack of the player.
    pub player_attack: f64,
    /// Attack bonus contributed by each ally.
    pub ally_attack: f64,
    /// Defence bonus contributed by each ally.
    pub ally_defence: f64,
    /// Treasure required to bribe a mercenary.
    pub bribe_amount: u32,
    /// Square radius within which a bribe may be offered.
    pub bribe_radius: u32,
    /// Square radius destroyed by a detonating bomb.
    pub bomb_radius: u32,
    /// Rounds a bow lasts.
    pub bow_durability: u32,
    /// Factor applied to the player's attack while a bow is held.
    pub bow_attack_multiplier: f64,
    /// Rounds a shield lasts.
    pub shield_durability: u32,
    /// Defence contributed by a shield.
    pub shield_defence: f64,
    /// Attack contributed by a sword.
    pub sword_attack: f64,
    /// Rounds a sword lasts.
    pub sword_durability: u32,
    /// Ticks an invincibility potion lasts.
    pub invincibility_potion_duration: u32,
    /// Ticks an invisibility potion lasts.
    pub invisibility_potion_duration: u32,
    /// Treasure needed to satisfy the treasure goal.
    pub treasure_goal: u32,
    /// Kills needed to satisfy the enemies goal.
    pub enemy_goal: u32,
    /// Attack of a spider.
    pub spider_attack: f64,
    /// Health of a spider.
    pub spider_health: f64,
    /// Ticks between spider spawns; zero disables spawning.
    pub spider_spawn_interval: u64,
    /// Attack of a zombie toast.
    pub zombie_attack: f64,
    /// Health of a zombie toast.
    pub zombie_health: f64,
    /// Ticks between zombie spawns per spawner; zero disables spawning.
    pub zombie_spawn_interval: u64,
    /// Attack of a mercenary.
    pub mercenary_attack: f64,
    /// Health of a mercenary.
    pub mercenary_health: f64,
    /// Attack of an assassin.
    pub assassin_attack: f64,
    /// Health of an assassin.
    pub assassin_health: f64,
    /// Treasure required to bribe an assassin.
    pub assassin_bribe_amount: u32,
    /// Probability in `0.0..=1.0` that an assassin refuses a paid bribe.
    pub assassin_bribe_fail_rate: f64,
    /// Square radius within which an assassin sees an invisible player.
    pub assassin_recon_radius: u32,
    /// Attack of a hydra.
    pub hydra_attack: f64,
    /// Health of a hydra.
    pub hydra_health: f64,
    /// Probability in `0.0..=1.0` that a hydra regenerates in a round.
    pub hydra_health_increase_rate: f64,
    /// Health a hydra regains when it regenerates.
    pub hydra_health_increase_amount: f64,
    /// Ticks a sceptre keeps an enemy allied.
    pub mind_control_duration: u32,
    /// Attack contributed by midnight armour.
    pub midnight_armour_attack: f64,
    /// Defence contributed by midnight armour.
    pub midnight_armour_defence: f64,
    /// Ticks rewound by a time travelling portal.
    pub time_travel_portal_ticks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_health: 100.0,
            player_attack: 10.0,
            ally_attack: 3.0,
            ally_defence: 3.0,
            bribe_amount: 1,
            bribe_radius: 2,
            bomb_radius: 1,
            bow_durability: 3,
            bow_attack_multiplier: 2.0,
            shield_durability: 3,
            shield_defence: 2.0,
            sword_attack: 2.0,
            sword_durability: 3,
            invincibility_potion_duration: 5,
            invisibility_potion_duration: 5,
            treasure_goal: 1,
            enemy_goal: 1,
            spider_attack: 5.0,
            spider_health: 10.0,
            spider_spawn_interval: 0,
            zombie_attack: 6.0,
            zombie_health: 10.0,
            zombie_spawn_interval: 0,
            mercenary_attack: 10.0,
            mercenary_health: 10.0,
            assassin_attack: 15.0,
            assassin_health: 20.0,
            assassin_bribe_amount: 2,
            assassin_bribe_fail_rate: 0.3,
            assassin_recon_radius: 3,
            hydra_attack: 10.0,
            hydra_health: 20.0,
            hydra_health_increase_rate: 0.5,
            hydra_health_increase_amount: 5.0,
            mind_control_duration: 5,
            midnight_armour_attack: 5.0,
            midnight_armour_defence: 5.0,
            time_travel_portal_ticks: 30,
        }
    }
}
