//! Glue between collisions on the board and the combat resolver.

use std::sync::Arc;

use delve_core::{CellCoord, EnemyKind, EntityId, Event, ItemKind};
use delve_system_combat::{
    resolve, strategy_for, Combatant, CombatTuning, Engagement, Gear, Outcome, Regeneration,
    Resolution,
};
use tracing::{debug, info, warn};

use crate::{entity::Entity, World};

/// Fights every hostile enemy sharing the cell, in identifier order.
pub(crate) fn engage_all_at(world: &mut World, cell: CellCoord, out_events: &mut Vec<Event>) {
    let enemies = world.board.ids_where(|entity| {
        entity.cell == cell && entity.enemy().is_some_and(|enemy| enemy.is_hostile())
    });
    for enemy in enemies {
        if world.live_player().is_none() {
            break;
        }
        engage(world, enemy, out_events);
    }
}

/// Resolves a collision between the live player and one hostile enemy.
pub(crate) fn engage(world: &mut World, enemy_id: EntityId, out_events: &mut Vec<Event>) {
    let Some(engagement) = engagement(world, enemy_id) else {
        return;
    };
    let Some(player) = world.live_player().and_then(Entity::player) else {
        return;
    };

    let sees_invisible = engagement.enemy_kind == EnemyKind::Assassin
        && world.board.get(enemy_id).is_some_and(|enemy| {
            world.live_player().is_some_and(|live| {
                enemy.cell.chebyshev_distance(live.cell) <= world.config.assassin_recon_radius
            })
        });
    let strategy = strategy_for(engagement.enemy_kind, player.effect(), sees_invisible);
    let tuning = CombatTuning::from_config(&world.config);
    let resolution = resolve(engagement, strategy, &tuning, &mut world.rng);

    settle(world, enemy_id, resolution, out_events);
}

fn engagement(world: &World, enemy_id: EntityId) -> Option<Engagement> {
    let player_entity = world.live_player()?;
    let player = player_entity.player()?;
    let enemy = world.board.get(enemy_id)?.enemy()?;
    if !enemy.is_hostile() {
        return None;
    }

    let gear = player
        .inventory
        .iter()
        .filter(|item| {
            matches!(
                item.kind,
                ItemKind::Sword | ItemKind::Bow | ItemKind::Shield | ItemKind::MidnightArmour
            )
        })
        .map(|item| Gear {
            item: item.summary(),
            durability: item.durability,
        })
        .collect();
    let allies = world
        .board
        .iter()
        .filter(|entity| entity.enemy().is_some_and(|enemy| !enemy.is_hostile()))
        .count();
    let regeneration = (enemy.kind == EnemyKind::Hydra).then(|| Regeneration {
        probability: world.config.hydra_health_increase_rate,
        amount: world.config.hydra_health_increase_amount,
    });

    Some(Engagement {
        player: Combatant {
            id: player_entity.id,
            health: player.health,
            attack: player.attack,
        },
        enemy: Combatant {
            id: enemy_id,
            health: enemy.health,
            attack: enemy.attack,
        },
        enemy_kind: enemy.kind,
        gear,
        allies: u32::try_from(allies).unwrap_or(u32::MAX),
        regeneration,
        consumable: player.active_effect.map(|effect| effect.source),
    })
}

fn settle(world: &mut World, enemy_id: EntityId, resolution: Resolution, out_events: &mut Vec<Event>) {
    let player_id = world.player;

    if let Some(player) = world.live_player_state_mut() {
        player.health = resolution.player_health;
        for worn in &resolution.worn_out {
            let _ = player.take(worn.id);
        }
        for piece in &resolution.gear {
            if let Some(item) = player
                .inventory
                .iter_mut()
                .find(|item| item.id == piece.item.id)
            {
                item.durability = piece.durability;
            }
        }
    }
    if let Some(enemy) = world.board.get_mut(enemy_id).and_then(Entity::enemy_mut) {
        enemy.health = resolution.enemy_health;
    }

    if let Some(battle) = resolution.battle {
        debug!(
            enemy = %enemy_id,
            rounds = battle.rounds().len(),
            player_health = resolution.player_health,
            enemy_health = resolution.enemy_health,
            "battle resolved"
        );
        out_events.push(Event::BattleResolved {
            enemy: enemy_id,
            rounds: battle.rounds().len(),
        });
        world.battles.push(Arc::new(battle));
    }

    match resolution.outcome {
        Outcome::EnemyDefeated => {
            let _ = world.board.remove(enemy_id);
            if let Some(player) = world.live_player_state_mut() {
                player.enemies_defeated = player.enemies_defeated.saturating_add(1);
            }
            info!(enemy = %enemy_id, "enemy defeated");
            out_events.push(Event::EnemyDefeated { enemy: enemy_id });
        }
        Outcome::PlayerDefeated => {
            let _ = world.board.remove(player_id);
            info!(player = %player_id, enemy = %enemy_id, "player defeated");
            out_events.push(Event::PlayerDefeated { player: player_id });
        }
        Outcome::Fled => out_events.push(Event::EnemyFled { enemy: enemy_id }),
        Outcome::Avoided => {}
        Outcome::Stalemate => {
            warn!(enemy = %enemy_id, "battle ended without a victor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        apply, query,
        tests::{spec, step, world_with, world_with_config},
    };
    use delve_core::{Command, Config, Direction, EntityType};

    fn config() -> Config {
        Config {
            zombie_health: 10.0,
            zombie_attack: 10.0,
            ..Config::default()
        }
    }

    #[test]
    fn walking_into_an_enemy_fights_it() {
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Wall, 2, 0),
                spec(EntityType::Wall, 1, -1),
                spec(EntityType::Wall, 1, 1),
                spec(EntityType::ZombieToast, 1, 0),
            ],
            config(),
        );

        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::EnemyDefeated {
            enemy: EntityId::new(5),
        }));
        let view = query::view(&world);
        assert_eq!(view.battles.len(), 1);
        assert_eq!(view.battles[0].rounds().len(), 5);
        assert_eq!(query::player_health(&world), Some(95.0));
        assert!(view.first_of(EntityType::ZombieToast).is_none());
    }

    #[test]
    fn weapons_wear_out_and_leave_the_inventory() {
        let config = Config {
            sword_durability: 1,
            ..config()
        };
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Sword, 1, 0),
                spec(EntityType::Wall, 3, 0),
                spec(EntityType::Wall, 2, -1),
                spec(EntityType::Wall, 2, 1),
                spec(EntityType::ZombieToast, 2, 0),
            ],
            config,
        );

        let _ = step(&mut world, Direction::East);
        let _ = step(&mut world, Direction::East);

        let view = query::view(&world);
        assert_eq!(view.inventory_count(EntityType::Sword), 0);
        let rounds = view.battles[0].rounds();
        assert_eq!(rounds[0].items_used.len(), 1);
        assert!(rounds[1].items_used.is_empty());
    }

    #[test]
    fn allies_do_not_fight_and_lend_their_strength() {
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Treasure, 1, 0),
                spec(EntityType::Mercenary, 3, 0),
            ],
            config(),
        );
        let _ = step(&mut world, Direction::East);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Interact {
                entity: EntityId::new(3),
            },
            &mut events,
        )
        .expect("bribe accepted");
        assert!(events.contains(&Event::EnemyAllied {
            enemy: EntityId::new(3),
        }));

        for _ in 0..3 {
            let _ = step(&mut world, Direction::South);
        }
        assert!(query::view(&world).battles.is_empty());
    }

    #[test]
    fn losing_a_battle_removes_the_player() {
        let config = Config {
            player_health: 1.0,
            player_attack: 0.1,
            zombie_health: 100.0,
            zombie_attack: 50.0,
            ..Config::default()
        };
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Wall, 2, 0),
                spec(EntityType::Wall, 1, -1),
                spec(EntityType::Wall, 1, 1),
                spec(EntityType::ZombieToast, 1, 0),
            ],
            config,
        );

        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::PlayerDefeated {
            player: EntityId::new(1),
        }));
        assert_eq!(query::player_position(&world), None);
        let mut more = Vec::new();
        assert!(apply(
            &mut world,
            Command::Move {
                direction: Direction::East
            },
            &mut more
        )
        .is_err());
    }

    #[test]
    fn invincible_players_kill_spiders_outright() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::InvincibilityPotion, 0, 1),
            spec(EntityType::Spider, -1, 3),
        ]);

        // The spider circles through (-1, 2) and (0, 2) meanwhile.
        let _ = step(&mut world, Direction::South);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::UseItem {
                item: EntityId::new(2),
            },
            &mut events,
        )
        .expect("potion usable");
        let events = step(&mut world, Direction::South);

        assert!(events.contains(&Event::EnemyDefeated {
            enemy: EntityId::new(3),
        }));
        let view = query::view(&world);
        let battle = view.battles.last().expect("battle recorded");
        assert_eq!(battle.rounds().len(), 1);
        assert_eq!(battle.rounds()[0].player_health_delta, 0.0);
        assert_eq!(
            battle.rounds()[0].items_used[0].kind,
            ItemKind::InvincibilityPotion
        );
    }

    fn cornered_hydra(regeneration_rate: f64) -> World {
        let config = Config {
            hydra_health: 20.0,
            hydra_attack: 10.0,
            hydra_health_increase_rate: regeneration_rate,
            hydra_health_increase_amount: 5.0,
            ..Config::default()
        };
        world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Wall, 2, 0),
                spec(EntityType::Wall, 1, -1),
                spec(EntityType::Wall, 1, 1),
                spec(EntityType::Hydra, 1, 0),
            ],
            config,
        )
    }

    #[test]
    fn hydras_that_always_regenerate_outlast_the_player() {
        let mut world = cornered_hydra(1.0);

        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::PlayerDefeated {
            player: EntityId::new(1),
        }));
        let view = query::view(&world);
        let rounds = view.battles[0].rounds();
        assert_eq!(rounds.len(), 100);
        assert!(rounds.iter().all(|round| round.enemy_health_delta == 5.0));
        assert!(view.first_of(EntityType::Hydra).is_some());
    }

    #[test]
    fn hydras_that_never_regenerate_fall_like_any_enemy() {
        let mut world = cornered_hydra(0.0);

        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::EnemyDefeated {
            enemy: EntityId::new(5),
        }));
        let view = query::view(&world);
        assert_eq!(view.battles[0].rounds().len(), 10);
        assert!(view.battles[0]
            .rounds()
            .iter()
            .all(|round| round.enemy_health_delta < 0.0));
    }

    #[test]
    fn every_held_sword_adds_damage_and_wears() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Sword, -1, 0),
            spec(EntityType::Sword, -2, 0),
            spec(EntityType::Wall, -3, 0),
            spec(EntityType::Mercenary, 3, 0),
        ]);

        // The mercenary walks into the player on the fifth tick.
        for _ in 0..5 {
            let _ = step(&mut world, Direction::West);
        }

        let view = query::view(&world);
        assert_eq!(view.battles.len(), 1);
        let rounds = view.battles[0].rounds();
        assert_eq!(rounds.len(), 4);
        assert_eq!(rounds[0].items_used.len(), 2);
        assert!(rounds[0]
            .items_used
            .iter()
            .all(|item| item.kind == ItemKind::Sword));
        assert!((rounds[0].enemy_health_delta + 2.8).abs() < 1e-9);
        assert!(rounds[3].items_used.is_empty());
        assert_eq!(view.inventory_count(EntityType::Sword), 0);
    }
}
