//! Bribes, mind control and spawner destruction.

use delve_core::{DungeonError, EnemyKind, EntityId, Event, ItemKind};
use rand::Rng;
use tracing::info;

use crate::{
    entity::{Allegiance, Body, Entity},
    World,
};

/// Interacts with a board entity on behalf of the live player.
///
/// Does not advance the tick.
pub(crate) fn interact(
    world: &mut World,
    target: EntityId,
    out_events: &mut Vec<Event>,
) -> Result<(), DungeonError> {
    let _ = world.require_live_player()?;
    let entity = world
        .board
        .get(target)
        .ok_or_else(|| DungeonError::invalid_argument(format!("no entity with id {target}")))?;

    let recruitable = entity
        .enemy()
        .is_some_and(|enemy| enemy.kind.is_recruitable());
    let spawner = matches!(entity.body, Body::Spawner);
    let kind = entity.entity_type();

    if recruitable {
        recruit(world, target, out_events)
    } else if spawner {
        destroy_spawner(world, target, out_events)
    } else {
        Err(DungeonError::invalid_argument(format!(
            "'{kind}' {target} cannot be interacted with"
        )))
    }
}

fn recruit(
    world: &mut World,
    target: EntityId,
    out_events: &mut Vec<Event>,
) -> Result<(), DungeonError> {
    let (player_cell, player) = world
        .live_player()
        .and_then(|entity| Some((entity.cell, entity.player()?)))
        .ok_or_else(|| DungeonError::invalid_action("the player has been defeated"))?;
    let (enemy_cell, enemy) = world
        .board
        .get(target)
        .and_then(|entity| Some((entity.cell, entity.enemy()?)))
        .ok_or_else(|| DungeonError::invalid_argument(format!("no enemy with id {target}")))?;
    if !enemy.is_hostile() {
        return Err(DungeonError::invalid_action(format!(
            "enemy {target} is already an ally"
        )));
    }
    let kind = enemy.kind;

    if player.holds(ItemKind::Sceptre) {
        let remaining = world.config.mind_control_duration;
        ally(world, target, Allegiance::MindControlled { remaining }, out_events);
        return Ok(());
    }

    if enemy_cell.chebyshev_distance(player_cell) > world.config.bribe_radius {
        return Err(DungeonError::invalid_action(format!(
            "enemy {target} is out of bribing range"
        )));
    }
    let price = match kind {
        EnemyKind::Assassin => world.config.assassin_bribe_amount,
        _ => world.config.bribe_amount,
    };
    let price = usize::try_from(price).unwrap_or(usize::MAX);
    let payment = player.oldest(ItemKind::Treasure, price);
    if payment.len() < price {
        return Err(DungeonError::invalid_action(format!(
            "bribing enemy {target} takes {price} treasure"
        )));
    }

    if let Some(player) = world.live_player_state_mut() {
        for coin in payment {
            let _ = player.take(coin);
        }
    }

    let fail_rate = world.config.assassin_bribe_fail_rate;
    let refused = kind == EnemyKind::Assassin
        && fail_rate > 0.0
        && (fail_rate >= 1.0 || world.rng.gen_bool(fail_rate));
    if refused {
        info!(enemy = %target, "bribe refused");
        out_events.push(Event::BribeFailed { enemy: target });
        return Ok(());
    }

    ally(world, target, Allegiance::Bribed, out_events);
    Ok(())
}

fn ally(world: &mut World, target: EntityId, allegiance: Allegiance, out_events: &mut Vec<Event>) {
    if let Some(enemy) = world.board.get_mut(target).and_then(Entity::enemy_mut) {
        enemy.allegiance = allegiance;
        info!(enemy = %target, ?allegiance, "enemy allied");
        out_events.push(Event::EnemyAllied { enemy: target });
    }
}

fn destroy_spawner(
    world: &mut World,
    spawner: EntityId,
    out_events: &mut Vec<Event>,
) -> Result<(), DungeonError> {
    let player = world.require_live_player()?;
    let armed = player
        .player()
        .is_some_and(|state| state.holds(ItemKind::Sword) || state.holds(ItemKind::Bow));
    let adjacent = world
        .board
        .get(spawner)
        .is_some_and(|entity| entity.cell.is_cardinally_adjacent(player.cell));

    if !adjacent {
        return Err(DungeonError::invalid_action(format!(
            "spawner {spawner} is not next to the player"
        )));
    }
    if !armed {
        return Err(DungeonError::invalid_action(
            "destroying a spawner needs a sword or a bow",
        ));
    }

    let _ = world.board.remove(spawner);
    info!(spawner = %spawner, "spawner destroyed");
    out_events.push(Event::EntityDestroyed { entity: spawner });
    Ok(())
}

/// Counts mind control down, turning enemies hostile again when it lapses.
pub(crate) fn count_down_mind_control(world: &mut World, out_events: &mut Vec<Event>) {
    let controlled = world.board.ids_where(|entity| {
        entity
            .enemy()
            .is_some_and(|enemy| matches!(enemy.allegiance, Allegiance::MindControlled { .. }))
    });

    for id in controlled {
        let Some(enemy) = world.board.get_mut(id).and_then(Entity::enemy_mut) else {
            continue;
        };
        let Allegiance::MindControlled { remaining } = enemy.allegiance else {
            continue;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            enemy.allegiance = Allegiance::MindControlled { remaining };
            continue;
        }
        enemy.allegiance = Allegiance::Hostile;
        info!(enemy = %id, "mind control expired");
        out_events.push(Event::AllianceExpired { enemy: id });
    }
}
