//! Movement and collision resolution for the player and its historical replay.
//!
//! A move is planned against an immutable board first and only applied once
//! every obstacle rule has passed, so a blocked move changes nothing.

use delve_core::{CellCoord, Direction, EntityId, Event, ItemKind};
use tracing::debug;

use crate::{
    battles,
    entity::{Body, Board, Entity, Item, PlayerState},
    inventory, World,
};

/// Outcome of a player-like actor's action for the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Landing {
    /// An obstacle rejected the move.
    Blocked,
    /// The actor did not try to move.
    Stayed,
    /// The actor entered a new cell.
    Moved,
    /// The actor entered a time travelling portal.
    TimeTravel,
}

#[derive(Clone, Copy, Debug)]
struct MovePlan {
    destination: CellCoord,
    door: Option<EntityId>,
    key: Option<EntityId>,
    boulder: Option<(EntityId, CellCoord)>,
}

/// Moves the live player and fights every hostile enemy on the landing cell.
pub(crate) fn move_live_player(
    world: &mut World,
    direction: Direction,
    out_events: &mut Vec<Event>,
) -> Landing {
    let player = world.player;
    let landing = step_player(world, player, direction, out_events);
    if landing == Landing::Moved {
        if let Some(cell) = world.board.get(player).map(|entity| entity.cell) {
            battles::engage_all_at(world, cell, out_events);
        }
    }
    landing
}

/// Moves the historical actor; it never fights.
pub(crate) fn move_historical(
    world: &mut World,
    actor: EntityId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) -> Landing {
    step_player(world, actor, direction, out_events)
}

fn step_player(
    world: &mut World,
    actor: EntityId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) -> Landing {
    let Some(entity) = world.board.get(actor) else {
        return Landing::Blocked;
    };
    let Some(state) = entity.player() else {
        return Landing::Blocked;
    };
    let from = entity.cell;
    let planned = plan(&world.board, state, from, direction);

    if let Some(player) = world.board.get_mut(actor).and_then(Entity::player_mut) {
        player.previous_cell = from;
    }

    let Some(plan) = planned else {
        debug!(entity = %actor, ?direction, "move blocked");
        out_events.push(Event::MoveBlocked {
            entity: actor,
            direction,
        });
        return Landing::Blocked;
    };

    if let Some(key) = plan.key {
        if let Some(player) = world.board.get_mut(actor).and_then(Entity::player_mut) {
            let _ = player.take(key);
        }
    }
    if let Some(door) = plan.door {
        if let Some(Body::Door { open, .. }) = world.board.get_mut(door).map(|entity| &mut entity.body)
        {
            *open = true;
            out_events.push(Event::DoorOpened { door });
        }
    }
    if let Some((boulder, to)) = plan.boulder {
        push_boulder(world, boulder, to, out_events);
    }

    if let Some(entity) = world.board.get_mut(actor) {
        entity.cell = plan.destination;
    }
    debug!(entity = %actor, ?from, to = ?plan.destination, "actor moved");
    out_events.push(Event::ActorMoved {
        entity: actor,
        from,
        to: plan.destination,
    });

    collect_items(world, actor, plan.destination, out_events);

    if world
        .board
        .any_at(plan.destination, |entity| matches!(entity.body, Body::TimeTravelPortal))
    {
        return Landing::TimeTravel;
    }
    Landing::Moved
}

fn plan(board: &Board, player: &PlayerState, from: CellCoord, direction: Direction) -> Option<MovePlan> {
    let destination = through_portals(board, from.step(direction), direction)?;
    let mut plan = MovePlan {
        destination,
        door: None,
        key: None,
        boulder: None,
    };

    for occupant in board.at(destination) {
        match &occupant.body {
            Body::Wall | Body::Spawner | Body::PlacedBomb => return None,
            Body::Door { key, open: false } => {
                let matching = key.and_then(|key| {
                    player
                        .inventory
                        .iter()
                        .find(|item| item.kind == ItemKind::Key && item.key == Some(key))
                });
                match matching {
                    Some(item) => plan.key = Some(item.id),
                    None if player.holds(ItemKind::SunStone) => {}
                    None => return None,
                }
                plan.door = Some(occupant.id);
            }
            Body::Boulder => {
                let beyond = destination.step(direction);
                if board.any_at(beyond, Entity::blocks_boulder) {
                    return None;
                }
                plan.boulder = Some((occupant.id, beyond));
            }
            _ => {}
        }
    }

    Some(plan)
}

/// Follows portal pairs until the cell reached is not a portal.
///
/// Returns `None` for unpaired portals and for cycles of portals.
fn through_portals(board: &Board, mut cell: CellCoord, direction: Direction) -> Option<CellCoord> {
    let portals = board
        .iter()
        .filter(|entity| matches!(entity.body, Body::Portal { .. }))
        .count();

    for _ in 0..=portals {
        let entry = board.at(cell).find_map(|entity| match &entity.body {
            Body::Portal { colour } => Some((entity.id, colour)),
            _ => None,
        });
        let Some((entry, colour)) = entry else {
            return Some(cell);
        };
        let partner = board.iter().find(|other| {
            other.id != entry && matches!(&other.body, Body::Portal { colour: paired } if paired == colour)
        })?;
        cell = partner.cell.step(direction);
    }

    None
}

fn push_boulder(world: &mut World, boulder: EntityId, to: CellCoord, out_events: &mut Vec<Event>) {
    let Some(entity) = world.board.get_mut(boulder) else {
        return;
    };
    let from = entity.cell;
    entity.cell = to;
    out_events.push(Event::BoulderPushed { boulder, to });

    for cell in [from, to] {
        let switches = world
            .board
            .ids_where(|entity| entity.cell == cell && matches!(entity.body, Body::Switch { .. }));
        for switch in switches {
            let Some(active) = sync_switch(world, switch) else {
                continue;
            };
            out_events.push(Event::SwitchToggled { switch, active });
            if active {
                inventory::detonate_adjacent(world, cell, out_events);
            }
        }
    }
}

/// Presses or releases a switch depending on whether a boulder rests on it.
///
/// Returns the new state when it changed.
pub(crate) fn sync_switch(world: &mut World, switch: EntityId) -> Option<bool> {
    let cell = world.board.get(switch)?.cell;
    let pressed = world
        .board
        .any_at(cell, |entity| matches!(entity.body, Body::Boulder));

    match &mut world.board.get_mut(switch)?.body {
        Body::Switch { active } if *active != pressed => {
            *active = pressed;
            Some(pressed)
        }
        _ => None,
    }
}

fn collect_items(world: &mut World, actor: EntityId, cell: CellCoord, out_events: &mut Vec<Event>) {
    let items: Vec<Item> = world
        .board
        .at(cell)
        .filter_map(|entity| match entity.body {
            Body::Item(item) => Some(item),
            _ => None,
        })
        .collect();

    for item in items {
        let stored = world
            .board
            .get_mut(actor)
            .and_then(Entity::player_mut)
            .is_some_and(|player| player.store(item));
        if !stored {
            continue;
        }
        let _ = world.board.remove(item.id);
        debug!(collector = %actor, item = %item.id, kind = ?item.kind, "item collected");
        out_events.push(Event::ItemCollected {
            collector: actor,
            item: item.id,
            kind: item.kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query,
        tests::{spec, step, world_with},
    };
    use delve_core::{EntityType, EntitySpec};

    fn switch_active(world: &World, id: u64) -> bool {
        matches!(
            world.board.get(EntityId::new(id)).map(|entity| &entity.body),
            Some(Body::Switch { active: true })
        )
    }

    fn cell_of(world: &World, id: u64) -> Option<CellCoord> {
        world.board.get(EntityId::new(id)).map(|entity| entity.cell)
    }

    #[test]
    fn boulders_toggle_only_the_switch_they_touch() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Boulder, 1, 0),
            spec(EntityType::Switch, 2, 0),
            spec(EntityType::Switch, 5, 5),
        ]);

        let events = step(&mut world, Direction::East);
        assert!(switch_active(&world, 3));
        assert!(!switch_active(&world, 4));
        assert!(events.contains(&Event::SwitchToggled {
            switch: EntityId::new(3),
            active: true,
        }));

        let events = step(&mut world, Direction::East);
        assert!(!switch_active(&world, 3));
        assert!(!switch_active(&world, 4));
        assert!(events.contains(&Event::SwitchToggled {
            switch: EntityId::new(3),
            active: false,
        }));
        assert_eq!(cell_of(&world, 2), Some(CellCoord::new(3, 0)));
    }

    #[test]
    fn boulders_cannot_be_pushed_into_walls() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Boulder, 1, 0),
            spec(EntityType::Wall, 2, 0),
        ]);

        let events = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(0, 0)));
        assert_eq!(cell_of(&world, 2), Some(CellCoord::new(1, 0)));
        assert!(events.contains(&Event::MoveBlocked {
            entity: EntityId::new(1),
            direction: Direction::East,
        }));
    }

    #[test]
    fn matching_key_opens_a_door_and_is_consumed() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Key, 1, 0).with_key(7),
            spec(EntityType::Door, 2, 0).with_key(7),
        ]);

        let _ = step(&mut world, Direction::East);
        assert_eq!(query::view(&world).inventory_count(EntityType::Key), 1);

        let events = step(&mut world, Direction::East);
        assert_eq!(query::player_position(&world), Some(CellCoord::new(2, 0)));
        assert!(events.contains(&Event::DoorOpened {
            door: EntityId::new(3),
        }));
        assert_eq!(query::view(&world).inventory_count(EntityType::Key), 0);
    }

    #[test]
    fn wrong_key_leaves_the_door_shut() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Key, 1, 0).with_key(1),
            spec(EntityType::Door, 2, 0).with_key(2),
        ]);

        let _ = step(&mut world, Direction::East);
        let _ = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(1, 0)));
        assert_eq!(query::view(&world).inventory_count(EntityType::Key), 1);
    }

    #[test]
    fn sun_stone_opens_doors_without_being_spent() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::SunStone, 1, 0),
            spec(EntityType::Door, 2, 0).with_key(9),
        ]);

        let _ = step(&mut world, Direction::East);
        let _ = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(2, 0)));
        assert_eq!(query::view(&world).inventory_count(EntityType::SunStone), 1);
    }

    #[test]
    fn second_key_stays_on_the_floor() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Key, 1, 0).with_key(1),
            spec(EntityType::Key, 2, 0).with_key(2),
        ]);

        let _ = step(&mut world, Direction::East);
        let _ = step(&mut world, Direction::East);

        let view = query::view(&world);
        assert_eq!(view.inventory_count(EntityType::Key), 1);
        assert_eq!(view.all_of(EntityType::Key).count(), 1);
    }

    #[test]
    fn portals_teleport_beside_their_partner() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            EntitySpec::new(EntityType::Portal, CellCoord::new(1, 0)).with_colour("BLUE"),
            EntitySpec::new(EntityType::Portal, CellCoord::new(8, 3)).with_colour("BLUE"),
        ]);

        let _ = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(9, 3)));
    }

    #[test]
    fn blocked_portal_exit_aborts_the_move() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            EntitySpec::new(EntityType::Portal, CellCoord::new(1, 0)).with_colour("RED"),
            EntitySpec::new(EntityType::Portal, CellCoord::new(8, 3)).with_colour("RED"),
            spec(EntityType::Wall, 9, 3),
        ]);

        let _ = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn unpaired_portal_blocks() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            EntitySpec::new(EntityType::Portal, CellCoord::new(1, 0)).with_colour("GREEN"),
        ]);

        let _ = step(&mut world, Direction::East);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn pickups_update_buildables() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wood, 1, 0),
            spec(EntityType::Arrow, 2, 0),
            spec(EntityType::Arrow, 3, 0),
            spec(EntityType::Arrow, 4, 0),
        ]);

        for _ in 0..3 {
            let _ = step(&mut world, Direction::East);
        }
        assert!(query::view(&world).buildables.is_empty());

        let _ = step(&mut world, Direction::East);
        assert_eq!(
            query::view(&world).buildables,
            vec![delve_core::BuildableKind::Bow]
        );
    }
}
