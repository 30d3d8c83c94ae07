//! Item use, crafting recipes and bomb detonation.

use delve_core::{
    BuildableKind, CellCoord, Direction, DungeonError, EffectKind, EntityId, EntityType, Event,
    ItemKind, ItemSummary,
};
use tracing::{debug, info};

use crate::{
    entity::{Body, Entity, PlayerState, TimedEffect},
    World,
};

/// Validated use of an inventory item, applied during the next tick.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Usage {
    Potion {
        item: ItemSummary,
        effect: EffectKind,
        duration: u32,
    },
    Bomb {
        item: EntityId,
    },
}

impl Usage {
    fn item(self) -> EntityId {
        match self {
            Self::Potion { item, .. } => item.id,
            Self::Bomb { item } => item,
        }
    }
}

/// Checks that the live player holds a usable item with the given id.
pub(crate) fn prepare_use(world: &World, id: EntityId) -> Result<Usage, DungeonError> {
    let _ = world.require_live_player()?;
    let item = world
        .live_player_state()
        .and_then(|player| player.item(id))
        .ok_or_else(|| DungeonError::invalid_argument(format!("item {id} is not in the inventory")))?;

    let potion = |effect, duration| Usage::Potion {
        item: item.summary(),
        effect,
        duration,
    };
    match item.kind {
        ItemKind::InvincibilityPotion => Ok(potion(
            EffectKind::Invincible,
            world.config.invincibility_potion_duration,
        )),
        ItemKind::InvisibilityPotion => Ok(potion(
            EffectKind::Invisible,
            world.config.invisibility_potion_duration,
        )),
        ItemKind::Bomb => Ok(Usage::Bomb { item: item.id }),
        other => Err(DungeonError::invalid_argument(format!(
            "'{}' cannot be used",
            other.entity_type()
        ))),
    }
}

/// Consumes the item: potions start or queue an effect, bombs are placed.
pub(crate) fn apply_use(world: &mut World, usage: Usage, out_events: &mut Vec<Event>) {
    let Some(cell) = world.live_player().map(|player| player.cell) else {
        return;
    };
    let Some(player) = world.live_player_state_mut() else {
        return;
    };
    player.previous_cell = cell;
    let Some(item) = player.take(usage.item()) else {
        return;
    };
    out_events.push(Event::ItemUsed {
        item: item.id,
        kind: item.kind,
    });

    match usage {
        Usage::Potion {
            item: source,
            effect,
            duration,
        } => {
            let timed = TimedEffect {
                kind: effect,
                remaining: duration,
                source,
            };
            if player.active_effect.is_none() {
                player.active_effect = Some(timed);
                out_events.push(Event::EffectStarted { effect });
            } else {
                player.queued_effects.push_back(timed);
            }
            debug!(item = %item.id, ?effect, duration, "potion used");
        }
        Usage::Bomb { item: bomb } => {
            world.board.insert(Entity::new(bomb, cell, Body::PlacedBomb));
            out_events.push(Event::EntitySpawned {
                entity: bomb,
                kind: EntityType::PlacedBomb,
                cell,
            });
            let primed = Direction::ALL.into_iter().any(|direction| {
                world.board.any_at(cell.step(direction), |entity| {
                    matches!(entity.body, Body::Switch { active: true })
                })
            });
            if primed {
                detonate(world, bomb, out_events);
            }
        }
    }
}

/// Runs the active effect down by one tick, promoting the next queued one.
pub(crate) fn count_down_effects(world: &mut World, out_events: &mut Vec<Event>) {
    let Some(player) = world.live_player_state_mut() else {
        return;
    };
    let Some(active) = player.active_effect.as_mut() else {
        return;
    };
    active.remaining = active.remaining.saturating_sub(1);
    if active.remaining > 0 {
        return;
    }

    let expired = active.kind;
    player.active_effect = player.queued_effects.pop_front();
    out_events.push(Event::EffectExpired { effect: expired });
    if let Some(next) = player.active_effect {
        out_events.push(Event::EffectStarted { effect: next.kind });
    }
}

/// Buildables whose recipe the inventory currently satisfies.
pub(crate) fn available(player: &PlayerState, zombies_present: bool) -> Vec<BuildableKind> {
    BuildableKind::ALL
        .into_iter()
        .filter(|kind| !(zombies_present && *kind == BuildableKind::MidnightArmour))
        .filter(|kind| ingredients(player, *kind).is_some())
        .collect()
}

/// Items consumed by a recipe, or `None` when materials are missing.
///
/// Sun stones standing in for a treasure or key are kept.
fn ingredients(player: &PlayerState, kind: BuildableKind) -> Option<Vec<EntityId>> {
    let mut consumed = Vec::new();
    let payment = |player: &PlayerState, spare_stones: usize| {
        if player.holds(ItemKind::Treasure) {
            Some(player.oldest(ItemKind::Treasure, 1))
        } else if player.holds(ItemKind::Key) {
            Some(player.oldest(ItemKind::Key, 1))
        } else if player.count(ItemKind::SunStone) > spare_stones {
            Some(Vec::new())
        } else {
            None
        }
    };

    match kind {
        BuildableKind::Bow => {
            if player.count(ItemKind::Wood) < 1 || player.count(ItemKind::Arrow) < 3 {
                return None;
            }
            consumed.extend(player.oldest(ItemKind::Wood, 1));
            consumed.extend(player.oldest(ItemKind::Arrow, 3));
        }
        BuildableKind::Shield => {
            if player.count(ItemKind::Wood) < 2 {
                return None;
            }
            consumed.extend(player.oldest(ItemKind::Wood, 2));
            consumed.extend(payment(player, 0)?);
        }
        BuildableKind::Sceptre => {
            if !player.holds(ItemKind::SunStone) {
                return None;
            }
            if player.holds(ItemKind::Wood) {
                consumed.extend(player.oldest(ItemKind::Wood, 1));
            } else if player.count(ItemKind::Arrow) >= 2 {
                consumed.extend(player.oldest(ItemKind::Arrow, 2));
            } else {
                return None;
            }
            consumed.extend(payment(player, 1)?);
            consumed.extend(player.oldest(ItemKind::SunStone, 1));
        }
        BuildableKind::MidnightArmour => {
            if !player.holds(ItemKind::Sword) || !player.holds(ItemKind::SunStone) {
                return None;
            }
            consumed.extend(player.oldest(ItemKind::Sword, 1));
            consumed.extend(player.oldest(ItemKind::SunStone, 1));
        }
    }
    Some(consumed)
}

/// Crafts a buildable from the live player's inventory.
pub(crate) fn build(
    world: &mut World,
    kind: BuildableKind,
    out_events: &mut Vec<Event>,
) -> Result<(), DungeonError> {
    let _ = world.require_live_player()?;
    if kind == BuildableKind::MidnightArmour && world.zombies_present() {
        return Err(DungeonError::invalid_action(
            "midnight armour cannot be built while zombie toasts are present",
        ));
    }
    let consumed = world
        .live_player_state()
        .and_then(|player| ingredients(player, kind))
        .ok_or_else(|| {
            DungeonError::invalid_action(format!("not enough materials to build {kind:?}"))
        })?;

    let id = world.allocate_id();
    let item = world.new_item(id, kind.item_kind(), None);
    if let Some(player) = world.live_player_state_mut() {
        for ingredient in consumed {
            let _ = player.take(ingredient);
        }
        let _ = player.store(item);
    }
    debug!(item = %id, ?kind, "item built");
    out_events.push(Event::ItemBuilt { item: id, kind });
    Ok(())
}

/// Detonates every placed bomb cardinally adjacent to a pressed switch.
pub(crate) fn detonate_adjacent(world: &mut World, switch: CellCoord, out_events: &mut Vec<Event>) {
    let bombs: Vec<EntityId> = Direction::ALL
        .into_iter()
        .flat_map(|direction| world.board.ids_at(switch.step(direction)))
        .filter(|id| {
            world
                .board
                .get(*id)
                .is_some_and(|entity| matches!(entity.body, Body::PlacedBomb))
        })
        .collect();
    for bomb in bombs {
        detonate(world, bomb, out_events);
    }
}

/// Removes every non-player entity within the blast square, the bomb included.
fn detonate(world: &mut World, bomb: EntityId, out_events: &mut Vec<Event>) {
    let Some(centre) = world.board.get(bomb).map(|entity| entity.cell) else {
        return;
    };
    let radius = world.config.bomb_radius;
    let destroyed = world.board.ids_where(|entity| {
        entity.player().is_none() && entity.cell.chebyshev_distance(centre) <= radius
    });
    for id in &destroyed {
        let _ = world.board.remove(*id);
    }

    info!(bomb = %bomb, cell = ?centre, destroyed = destroyed.len(), "bomb detonated");
    out_events.push(Event::BombDetonated { bomb, destroyed });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        apply, query,
        tests::{spec, step, world_with},
    };
    use delve_core::Command;

    fn use_item(world: &mut World, id: u64) -> Result<Vec<Event>, DungeonError> {
        let mut events = Vec::new();
        apply(
            world,
            Command::UseItem {
                item: EntityId::new(id),
            },
            &mut events,
        )?;
        Ok(events)
    }

    fn build_item(world: &mut World, kind: BuildableKind) -> Result<Vec<Event>, DungeonError> {
        let mut events = Vec::new();
        apply(world, Command::Build { buildable: kind }, &mut events)?;
        Ok(events)
    }

    fn walk_east(world: &mut World, steps: usize) {
        for _ in 0..steps {
            let _ = step(world, Direction::East);
        }
    }

    #[test]
    fn building_a_bow_consumes_materials() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wood, 1, 0),
            spec(EntityType::Arrow, 2, 0),
            spec(EntityType::Arrow, 3, 0),
            spec(EntityType::Arrow, 4, 0),
        ]);
        walk_east(&mut world, 4);

        let events = build_item(&mut world, BuildableKind::Bow).expect("bow buildable");

        assert_eq!(
            events,
            vec![Event::ItemBuilt {
                item: EntityId::new(6),
                kind: BuildableKind::Bow,
            }]
        );
        let view = query::view(&world);
        assert_eq!(view.inventory.len(), 1);
        assert_eq!(view.inventory_count(EntityType::Bow), 1);
        assert!(view.buildables.is_empty());
        assert_eq!(query::tick(&world), 4);
    }

    #[test]
    fn missing_materials_are_an_invalid_action() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wood, 1, 0),
        ]);
        walk_east(&mut world, 1);

        assert!(matches!(
            build_item(&mut world, BuildableKind::Shield),
            Err(DungeonError::InvalidAction(_))
        ));
        assert_eq!(query::view(&world).inventory_count(EntityType::Wood), 1);
    }

    #[test]
    fn sun_stone_substitutes_for_treasure_and_is_kept() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wood, 1, 0),
            spec(EntityType::Wood, 2, 0),
            spec(EntityType::SunStone, 3, 0),
        ]);
        walk_east(&mut world, 3);
        assert_eq!(query::view(&world).buildables, vec![BuildableKind::Shield]);

        let _ = build_item(&mut world, BuildableKind::Shield).expect("shield buildable");

        let view = query::view(&world);
        assert_eq!(view.inventory_count(EntityType::Shield), 1);
        assert_eq!(view.inventory_count(EntityType::SunStone), 1);
        assert_eq!(view.inventory_count(EntityType::Wood), 0);
    }

    #[test]
    fn sceptre_needs_a_sun_stone_and_a_payment() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Arrow, 1, 0),
            spec(EntityType::Arrow, 2, 0),
            spec(EntityType::Treasure, 3, 0),
            spec(EntityType::SunStone, 4, 0),
        ]);
        walk_east(&mut world, 4);

        let _ = build_item(&mut world, BuildableKind::Sceptre).expect("sceptre buildable");

        let view = query::view(&world);
        assert_eq!(view.inventory.len(), 1);
        assert_eq!(view.inventory_count(EntityType::Sceptre), 1);
    }

    #[test]
    fn midnight_armour_is_refused_near_zombies() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Sword, 1, 0),
            spec(EntityType::SunStone, 2, 0),
            spec(EntityType::Wall, 9, 8),
            spec(EntityType::Wall, 10, 7),
            spec(EntityType::Wall, 11, 8),
            spec(EntityType::Wall, 10, 9),
            spec(EntityType::ZombieToast, 10, 8),
        ]);
        walk_east(&mut world, 2);

        assert!(!query::view(&world)
            .buildables
            .contains(&BuildableKind::MidnightArmour));
        assert!(matches!(
            build_item(&mut world, BuildableKind::MidnightArmour),
            Err(DungeonError::InvalidAction(_))
        ));
    }

    #[test]
    fn potions_queue_behind_the_active_effect() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::InvisibilityPotion, 1, 0),
            spec(EntityType::InvincibilityPotion, 2, 0),
        ]);
        walk_east(&mut world, 2);

        let first = use_item(&mut world, 2).expect("potion usable");
        assert!(first.contains(&Event::EffectStarted {
            effect: EffectKind::Invisible,
        }));
        let second = use_item(&mut world, 3).expect("potion usable");
        assert!(!second.iter().any(|event| matches!(event, Event::EffectStarted { .. })));

        let mut handover = Vec::new();
        for _ in 0..3 {
            handover.extend(step(&mut world, Direction::West));
        }
        assert!(handover.contains(&Event::EffectExpired {
            effect: EffectKind::Invisible,
        }));
        assert!(handover.contains(&Event::EffectStarted {
            effect: EffectKind::Invincible,
        }));
    }

    #[test]
    fn only_potions_and_bombs_can_be_used() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wood, 1, 0),
        ]);
        walk_east(&mut world, 1);

        assert!(matches!(
            use_item(&mut world, 2),
            Err(DungeonError::InvalidArgument(_))
        ));
        assert_eq!(query::tick(&world), 1);
    }

    #[test]
    fn pressing_a_switch_detonates_an_adjacent_bomb() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Bomb, 1, 0),
            spec(EntityType::Boulder, 2, 1),
            spec(EntityType::Switch, 1, 1),
            spec(EntityType::Wall, 5, 5),
        ]);
        walk_east(&mut world, 1);
        let placed = use_item(&mut world, 2).expect("bomb usable");
        assert!(placed.contains(&Event::EntitySpawned {
            entity: EntityId::new(2),
            kind: EntityType::PlacedBomb,
            cell: CellCoord::new(1, 0),
        }));

        // Walk round and push the boulder west onto the switch below the bomb.
        walk_east(&mut world, 2);
        let _ = step(&mut world, Direction::South);
        let events = step(&mut world, Direction::West);

        let blast = events.iter().find_map(|event| match event {
            Event::BombDetonated { bomb, destroyed } => Some((*bomb, destroyed.clone())),
            _ => None,
        });
        let (bomb, destroyed) = blast.expect("bomb detonated");
        assert_eq!(bomb, EntityId::new(2));
        assert_eq!(
            destroyed,
            vec![EntityId::new(2), EntityId::new(3), EntityId::new(4)]
        );
        assert_eq!(query::player_position(&world), Some(CellCoord::new(2, 1)));
    }
}
