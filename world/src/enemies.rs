//! Enemy movement policies and spawning.
//!
//! Each enemy variant maps onto a [`Behaviour`] that decides passability and
//! the next cell as a pure function of the board. Strategy-driven overrides
//! (wandering from an invisible player, fleeing an invincible one) and ally
//! following are layered on top by [`move_enemies`].

use std::collections::HashMap;

use delve_core::{CellCoord, Config, Direction, EffectKind, EnemyKind, EntityId, Event};
use delve_system_combat::{strategy_for, Strategy};
use delve_system_pathfinding::{next_step, BASE_COST};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::{
    battles,
    entity::{Body, Board, EnemyState, Entity, SpiderRing},
    World,
};

/// Cells around a spider's origin, clockwise from directly above.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// What an enemy knows about the live player.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlayerSight {
    pub(crate) cell: CellCoord,
    pub(crate) previous_cell: CellCoord,
    pub(crate) effect: Option<EffectKind>,
}

/// Read-only inputs to a movement decision.
pub(crate) struct Surroundings<'a> {
    pub(crate) board: &'a Board,
    pub(crate) player: Option<PlayerSight>,
}

/// Movement decision for a single enemy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Plan {
    pub(crate) destination: Option<CellCoord>,
    pub(crate) ring: Option<SpiderRing>,
}

impl Plan {
    fn hold() -> Self {
        Self::default()
    }

    fn to(cell: CellCoord) -> Self {
        Self {
            destination: Some(cell),
            ring: None,
        }
    }
}

/// Capabilities every enemy variant provides.
pub(crate) trait Behaviour {
    /// Reports whether the enemy may stand on the cell.
    fn is_passable(&self, board: &Board, cell: CellCoord) -> bool;

    /// Chooses where the enemy goes this tick.
    fn plan(
        &self,
        enemy: &Entity,
        state: &EnemyState,
        surroundings: &Surroundings<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Plan;
}

/// Spiders circle the cell they appeared on.
struct Circling;

/// Zombies and hydras step to a random open neighbour.
struct Wandering;

/// Mercenaries and assassins chase the player along the cheapest path.
struct Pursuing;

fn behaviour(kind: EnemyKind) -> &'static dyn Behaviour {
    match kind {
        EnemyKind::Spider => &Circling,
        EnemyKind::ZombieToast | EnemyKind::Hydra => &Wandering,
        EnemyKind::Mercenary | EnemyKind::Assassin => &Pursuing,
    }
}

impl Behaviour for Circling {
    fn is_passable(&self, board: &Board, cell: CellCoord) -> bool {
        !board.any_at(cell, |entity| matches!(entity.body, Body::Boulder))
    }

    fn plan(
        &self,
        enemy: &Entity,
        state: &EnemyState,
        surroundings: &Surroundings<'_>,
        _rng: &mut ChaCha8Rng,
    ) -> Plan {
        let ring = state.ring.unwrap_or_else(|| SpiderRing::around(enemy.cell));
        let open = |index: usize| {
            let cell = ring_cell(ring.origin, index);
            self.is_passable(surroundings.board, cell).then_some(cell)
        };

        let Some(position) = ring.position else {
            return match open(0) {
                Some(cell) => Plan {
                    destination: Some(cell),
                    ring: Some(SpiderRing {
                        position: Some(0),
                        ..ring
                    }),
                },
                None => Plan {
                    destination: None,
                    ring: Some(ring),
                },
            };
        };

        let forward = ring_index(position, ring.clockwise);
        if let Some(cell) = open(forward) {
            return Plan {
                destination: Some(cell),
                ring: Some(SpiderRing {
                    position: Some(forward),
                    ..ring
                }),
            };
        }

        let reversed = SpiderRing {
            clockwise: !ring.clockwise,
            ..ring
        };
        let backward = ring_index(position, reversed.clockwise);
        match open(backward) {
            Some(cell) => Plan {
                destination: Some(cell),
                ring: Some(SpiderRing {
                    position: Some(backward),
                    ..reversed
                }),
            },
            None => Plan {
                destination: None,
                ring: Some(reversed),
            },
        }
    }
}

impl Behaviour for Wandering {
    fn is_passable(&self, board: &Board, cell: CellCoord) -> bool {
        !board.any_at(cell, Entity::blocks_ground)
    }

    fn plan(
        &self,
        enemy: &Entity,
        _state: &EnemyState,
        surroundings: &Surroundings<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Plan {
        let options: Vec<CellCoord> = Direction::ALL
            .into_iter()
            .map(|direction| enemy.cell.step(direction))
            .filter(|cell| self.is_passable(surroundings.board, *cell))
            .collect();
        if options.is_empty() {
            return Plan::hold();
        }
        Plan::to(options[rng.gen_range(0..options.len())])
    }
}

impl Behaviour for Pursuing {
    fn is_passable(&self, board: &Board, cell: CellCoord) -> bool {
        !board.any_at(cell, Entity::blocks_ground)
    }

    fn plan(
        &self,
        enemy: &Entity,
        _state: &EnemyState,
        surroundings: &Surroundings<'_>,
        _rng: &mut ChaCha8Rng,
    ) -> Plan {
        let Some(player) = surroundings.player else {
            return Plan::hold();
        };
        next_step(enemy.cell, player.cell, costs_toward(surroundings.board, player.cell))
            .map_or_else(Plan::hold, Plan::to)
    }
}

fn ring_cell(origin: CellCoord, index: usize) -> CellCoord {
    let (dx, dy) = RING[index % RING.len()];
    CellCoord::new(origin.x().saturating_add(dx), origin.y().saturating_add(dy))
}

fn ring_index(position: usize, clockwise: bool) -> usize {
    if clockwise {
        (position + 1) % RING.len()
    } else {
        (position + RING.len() - 1) % RING.len()
    }
}

/// Entry costs for walking enemies; blocked cells map to `None`.
fn ground_costs(board: &Board) -> impl FnMut(CellCoord) -> Option<u32> {
    let mut terrain: HashMap<CellCoord, Option<u32>> = HashMap::new();
    for entity in board.iter() {
        if entity.blocks_ground() {
            let _ = terrain.insert(entity.cell, None);
        } else if let Body::Swamp { movement_factor } = entity.body {
            let _ = terrain
                .entry(entity.cell)
                .or_insert(Some(movement_factor.max(BASE_COST)));
        }
    }
    move |cell| terrain.get(&cell).copied().unwrap_or(Some(BASE_COST))
}

/// Ground costs with `target` always enterable, so a player standing on a
/// placed bomb can still be reached.
fn costs_toward(board: &Board, target: CellCoord) -> impl FnMut(CellCoord) -> Option<u32> {
    let mut costs = ground_costs(board);
    move |cell| costs(cell).or((cell == target).then_some(BASE_COST))
}

/// Allies trail the player, stepping into the cell it just left.
fn follow(enemy: &Entity, behaviour: &dyn Behaviour, surroundings: &Surroundings<'_>) -> Plan {
    let Some(player) = surroundings.player else {
        return Plan::hold();
    };
    let passable = |cell| behaviour.is_passable(surroundings.board, cell);

    if player.previous_cell != player.cell
        && enemy.cell.is_cardinally_adjacent(player.previous_cell)
        && passable(player.previous_cell)
    {
        return Plan::to(player.previous_cell);
    }
    if enemy.cell == player.cell || enemy.cell.is_cardinally_adjacent(player.cell) {
        return Plan::hold();
    }

    match next_step(enemy.cell, player.cell, costs_toward(surroundings.board, player.cell)) {
        Some(cell) if cell != player.cell => Plan::to(cell),
        _ => Plan::hold(),
    }
}

/// Steps to the open neighbour furthest from the player, if any is further.
///
/// Candidates are ranked by Manhattan then Chebyshev distance; remaining
/// ties keep the earliest of up, right, down, left.
fn flee(enemy: &Entity, behaviour: &dyn Behaviour, surroundings: &Surroundings<'_>) -> Plan {
    let Some(player) = surroundings.player else {
        return Plan::hold();
    };

    let current = enemy.cell.manhattan_distance(player.cell);
    let mut best: Option<((u32, u32), CellCoord)> = None;
    for direction in Direction::ALL {
        let cell = enemy.cell.step(direction);
        let distance = cell.manhattan_distance(player.cell);
        if distance <= current || !behaviour.is_passable(surroundings.board, cell) {
            continue;
        }
        let score = (distance, cell.chebyshev_distance(player.cell));
        if best.map_or(true, |(leader, _)| score > leader) {
            best = Some((score, cell));
        }
    }

    best.map_or_else(Plan::hold, |(_, cell)| Plan::to(cell))
}

fn decide(
    enemy: &Entity,
    state: &EnemyState,
    surroundings: &Surroundings<'_>,
    config: &Config,
    rng: &mut ChaCha8Rng,
) -> Plan {
    let behaviour = behaviour(state.kind);

    if !state.is_hostile() {
        return follow(enemy, behaviour, surroundings);
    }
    if state.kind == EnemyKind::Spider {
        return behaviour.plan(enemy, state, surroundings, rng);
    }

    let Some(player) = surroundings.player else {
        return behaviour.plan(enemy, state, surroundings, rng);
    };
    let sees_invisible = state.kind == EnemyKind::Assassin
        && enemy.cell.chebyshev_distance(player.cell) <= config.assassin_recon_radius;

    match strategy_for(state.kind, player.effect, sees_invisible) {
        Strategy::InvisibleAvoid => Wandering.plan(enemy, state, surroundings, rng),
        Strategy::InvincibleRun => flee(enemy, behaviour, surroundings),
        Strategy::Fight | Strategy::InvincibleFight => {
            behaviour.plan(enemy, state, surroundings, rng)
        }
    }
}

fn player_sight(world: &World) -> Option<PlayerSight> {
    let player = world.live_player()?;
    let state = player.player()?;
    Some(PlayerSight {
        cell: player.cell,
        previous_cell: state.previous_cell,
        effect: state.effect(),
    })
}

/// Moves every enemy once, in identifier order.
pub(crate) fn move_enemies(world: &mut World, out_events: &mut Vec<Event>) {
    let enemies = world.board.ids_where(|entity| entity.enemy().is_some());

    for id in enemies {
        let sight = player_sight(world);
        let Some(enemy) = world.board.get(id) else {
            continue;
        };
        let Some(state) = enemy.enemy() else {
            continue;
        };

        let ally = !state.is_hostile();
        let beside_player =
            |cell: CellCoord| sight.is_some_and(|player| cell.is_cardinally_adjacent(player.cell));
        let escorting = ally && beside_player(enemy.cell);

        if state.stuck_ticks > 0 && !escorting {
            if let Some(state) = world.board.get_mut(id).and_then(Entity::enemy_mut) {
                state.stuck_ticks -= 1;
            }
            continue;
        }

        let surroundings = Surroundings {
            board: &world.board,
            player: sight,
        };
        let plan = decide(enemy, state, &surroundings, &world.config, &mut world.rng);
        let from = enemy.cell;

        let slowdown = plan.destination.and_then(|cell| {
            world.board.at(cell).find_map(|entity| match entity.body {
                Body::Swamp { movement_factor } => Some(movement_factor),
                _ => None,
            })
        });

        let Some(entity) = world.board.get_mut(id) else {
            continue;
        };
        if let Some(state) = entity.enemy_mut() {
            if escorting {
                state.stuck_ticks = 0;
            }
            if plan.ring.is_some() {
                state.ring = plan.ring;
            }
        }
        let Some(to) = plan.destination else {
            continue;
        };
        entity.cell = to;
        if let Some(state) = entity.enemy_mut() {
            if let Some(factor) = slowdown {
                if !(ally && beside_player(to)) {
                    state.stuck_ticks = factor;
                }
            }
        }

        debug!(enemy = %id, ?from, ?to, "enemy moved");
        out_events.push(Event::ActorMoved {
            entity: id,
            from,
            to,
        });

        if !ally && sight.is_some_and(|player| player.cell == to) {
            battles::engage(world, id, out_events);
        }
    }
}

/// Builds the body of a freshly placed enemy from configured stats.
pub(crate) fn body(config: &Config, kind: EnemyKind, cell: CellCoord) -> Body {
    let (health, attack) = match kind {
        EnemyKind::Spider => (config.spider_health, config.spider_attack),
        EnemyKind::ZombieToast => (config.zombie_health, config.zombie_attack),
        EnemyKind::Mercenary => (config.mercenary_health, config.mercenary_attack),
        EnemyKind::Assassin => (config.assassin_health, config.assassin_attack),
        EnemyKind::Hydra => (config.hydra_health, config.hydra_attack),
    };
    let mut state = EnemyState::new(kind, health, attack);
    if kind == EnemyKind::Spider {
        state.ring = Some(SpiderRing::around(cell));
    }
    Body::Enemy(state)
}

/// Places a new enemy, fighting the live player at once if it stands there.
fn create(
    world: &mut World,
    kind: EnemyKind,
    cell: CellCoord,
    out_events: &mut Vec<Event>,
) -> EntityId {
    let id = world.allocate_id();
    world
        .board
        .insert(Entity::new(id, cell, body(&world.config, kind, cell)));
    info!(entity = %id, ?kind, ?cell, "enemy spawned");
    out_events.push(Event::EntitySpawned {
        entity: id,
        kind: kind.entity_type(),
        cell,
    });
    if world.live_player().is_some_and(|player| player.cell == cell) {
        battles::engage(world, id, out_events);
    }
    id
}

/// Runs spawners whose interval divides the current tick.
pub(crate) fn spawn(world: &mut World, out_events: &mut Vec<Event>) {
    let tick = world.tick;
    let zombie_interval = world.config.zombie_spawn_interval;
    if zombie_interval > 0 && tick % zombie_interval == 0 {
        let spawners = world
            .board
            .ids_where(|entity| matches!(entity.body, Body::Spawner));
        for spawner in spawners {
            let Some(origin) = world.board.get(spawner).map(|entity| entity.cell) else {
                continue;
            };
            let open = Direction::ALL
                .into_iter()
                .map(|direction| origin.step(direction))
                .find(|cell| Wandering.is_passable(&world.board, *cell));
            if let Some(cell) = open {
                let _ = create(world, EnemyKind::ZombieToast, cell, out_events);
            }
        }
    }

    let spider_interval = world.config.spider_spawn_interval;
    if spider_interval > 0 && tick % spider_interval == 0 {
        let candidates: Vec<CellCoord> = world
            .bounds
            .cells()
            .filter(|cell| Circling.is_passable(&world.board, *cell))
            .collect();
        if !candidates.is_empty() {
            let cell = candidates[world.rng.gen_range(0..candidates.len())];
            let _ = create(world, EnemyKind::Spider, cell, out_events);
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
    use delve_core::{Command, EntitySpec, EntityType};

    fn position(world: &World, id: u64) -> Option<CellCoord> {
        world.board.get(EntityId::new(id)).map(|entity| entity.cell)
    }

    fn use_item(world: &mut World, id: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::UseItem {
                item: EntityId::new(id),
            },
            &mut events,
        )
        .expect("item usable");
        events
    }

    /// Walls boxing in the corridor `(1, 0)..=(3, 0)`, closed at the east end.
    fn corridor() -> Vec<EntitySpec> {
        let mut walls: Vec<EntitySpec> = (1..=3)
            .flat_map(|x| [spec(EntityType::Wall, x, -1), spec(EntityType::Wall, x, 1)])
            .collect();
        walls.push(spec(EntityType::Wall, 4, 0));
        walls
    }

    /// An enemy stuck in a swamp at the corridor's mouth while the player
    /// drinks an invisibility potion and walks into it.
    fn walk_into_stuck_enemy(kind: EntityType) -> (World, Vec<Event>) {
        let config = Config {
            invisibility_potion_duration: 10,
            ..Config::default()
        };
        let mut entities = vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::InvisibilityPotion, -1, 0),
            spec(kind, 3, 0),
            EntitySpec::new(EntityType::SwampTile, CellCoord::new(2, 0)).with_movement_factor(10),
        ];
        entities.extend(corridor());
        let mut world = world_with_config(entities, config);

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 3), Some(CellCoord::new(2, 0)));
        let _ = use_item(&mut world, 2);
        let _ = step(&mut world, Direction::East);
        let _ = step(&mut world, Direction::East);
        let events = step(&mut world, Direction::East);
        (world, events)
    }

    #[test]
    fn spiders_step_up_then_circle_clockwise() {
        let mut world = world_with(vec![
            spec(EntityType::Player, -10, -10),
            spec(EntityType::Spider, 5, 5),
        ]);
        let expected = [(5, 4), (6, 4), (6, 5), (6, 6), (5, 6), (4, 6), (4, 5), (4, 4), (5, 4)];

        for (x, y) in expected {
            let _ = step(&mut world, Direction::West);
            assert_eq!(position(&world, 2), Some(CellCoord::new(x, y)));
        }
    }

    #[test]
    fn boulders_reverse_a_spider() {
        let mut world = world_with(vec![
            spec(EntityType::Player, -10, -10),
            spec(EntityType::Spider, 5, 5),
            spec(EntityType::Boulder, 6, 5),
        ]);

        let _ = step(&mut world, Direction::West);
        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 2), Some(CellCoord::new(6, 4)));

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 2), Some(CellCoord::new(5, 4)));
        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 2), Some(CellCoord::new(4, 4)));
    }

    #[test]
    fn spiders_ignore_walls() {
        let mut world = world_with(vec![
            spec(EntityType::Player, -10, -10),
            spec(EntityType::Spider, 5, 5),
            spec(EntityType::Wall, 5, 4),
        ]);

        let _ = step(&mut world, Direction::West);

        assert_eq!(position(&world, 2), Some(CellCoord::new(5, 4)));
    }

    #[test]
    fn mercenaries_close_in_on_the_player() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wall, -1, 0),
            spec(EntityType::Mercenary, 6, 0),
        ]);

        let _ = step(&mut world, Direction::West);

        assert_eq!(position(&world, 3), Some(CellCoord::new(5, 0)));
    }

    #[test]
    fn mercenaries_route_around_walls() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wall, -1, 0),
            spec(EntityType::Wall, 2, -1),
            spec(EntityType::Wall, 2, 0),
            spec(EntityType::Mercenary, 3, 0),
        ]);

        let _ = step(&mut world, Direction::West);

        // Blocked west; the detour south starts with (3, 1).
        assert_eq!(position(&world, 5), Some(CellCoord::new(3, 1)));
    }

    #[test]
    fn swamps_hold_enemies_for_their_movement_factor() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Wall, -1, 0),
            EntitySpec::new(EntityType::SwampTile, CellCoord::new(5, 0)).with_movement_factor(2),
            spec(EntityType::Wall, 5, -1),
            spec(EntityType::Wall, 5, 1),
            spec(EntityType::Wall, 6, -1),
            spec(EntityType::Wall, 6, 1),
            spec(EntityType::Mercenary, 6, 0),
        ]);
        let mercenary = 8;

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, mercenary), Some(CellCoord::new(5, 0)));
        let _ = step(&mut world, Direction::West);
        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, mercenary), Some(CellCoord::new(5, 0)));
        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, mercenary), Some(CellCoord::new(4, 0)));
    }

    #[test]
    fn zombie_spawners_use_the_first_open_neighbour() {
        let config = Config {
            zombie_spawn_interval: 2,
            ..Config::default()
        };
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, -10, -10),
                spec(EntityType::ZombieToastSpawner, 3, 3),
                spec(EntityType::Wall, 3, 2),
            ],
            config,
        );

        let first = step(&mut world, Direction::West);
        assert!(!first
            .iter()
            .any(|event| matches!(event, Event::EntitySpawned { .. })));

        let second = step(&mut world, Direction::West);
        assert!(second.contains(&Event::EntitySpawned {
            entity: EntityId::new(4),
            kind: EntityType::ZombieToast,
            cell: CellCoord::new(4, 3),
        }));
        assert!(query::view(&world).buildables.is_empty());
    }

    #[test]
    fn spiders_spawn_inside_the_layout_bounds() {
        let config = Config {
            spider_spawn_interval: 1,
            ..Config::default()
        };
        let mut world = world_with_config(
            vec![spec(EntityType::Player, 0, 0), spec(EntityType::Wall, 4, 4)],
            config,
        );

        let events = step(&mut world, Direction::East);
        let spawned = events.iter().find_map(|event| match event {
            Event::EntitySpawned { kind, cell, .. } if *kind == EntityType::Spider => Some(*cell),
            _ => None,
        });

        let cell = spawned.expect("spider spawned");
        assert!((0..=4).contains(&cell.x()));
        assert!((0..=4).contains(&cell.y()));
    }

    #[test]
    fn flee_moves_away_from_the_player() {
        let mut board = Board::default();
        let zombie = Entity::new(
            EntityId::new(2),
            CellCoord::new(3, 0),
            body(&Config::default(), EnemyKind::ZombieToast, CellCoord::new(3, 0)),
        );
        board.insert(zombie.clone());
        let surroundings = Surroundings {
            board: &board,
            player: Some(PlayerSight {
                cell: CellCoord::new(2, 0),
                previous_cell: CellCoord::new(1, 0),
                effect: Some(EffectKind::Invincible),
            }),
        };

        let plan = flee(&zombie, &Wandering, &surroundings);

        assert_eq!(plan.destination, Some(CellCoord::new(4, 0)));
    }

    #[test]
    fn ring_indices_wrap_in_both_directions() {
        assert_eq!(ring_index(7, true), 0);
        assert_eq!(ring_index(0, false), 7);
        assert_eq!(ring_cell(CellCoord::new(0, 0), 7), CellCoord::new(-1, -1));
    }

    #[test]
    fn spiders_spawning_on_the_player_fight_it() {
        let config = Config {
            spider_spawn_interval: 1,
            ..Config::default()
        };
        let mut world = world_with_config(
            vec![
                spec(EntityType::Player, 0, 0),
                spec(EntityType::Boulder, 1, 0),
                spec(EntityType::Boulder, 2, 0),
            ],
            config,
        );

        // Both boulders jam, so the player's own cell is the only free one.
        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::EntitySpawned {
            entity: EntityId::new(4),
            kind: EntityType::Spider,
            cell: CellCoord::new(0, 0),
        }));
        assert!(events.contains(&Event::EnemyDefeated {
            enemy: EntityId::new(4),
        }));
        assert_eq!(query::view(&world).battles.len(), 1);
    }

    #[test]
    fn enemies_flee_an_invincible_player() {
        let config = Config {
            invincibility_potion_duration: 10,
            ..Config::default()
        };
        let mut entities = vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::InvincibilityPotion, -1, 0),
            spec(EntityType::Mercenary, 3, 0),
        ];
        entities.extend(corridor());
        let mut world = world_with_config(entities, config);

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 3), Some(CellCoord::new(2, 0)));
        let _ = use_item(&mut world, 2);
        assert_eq!(position(&world, 3), Some(CellCoord::new(3, 0)));

        for _ in 0..3 {
            let _ = step(&mut world, Direction::East);
            assert_eq!(position(&world, 3), Some(CellCoord::new(3, 0)));
        }
        let events = step(&mut world, Direction::East);

        assert!(events.contains(&Event::EnemyFled {
            enemy: EntityId::new(3),
        }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BattleResolved { .. })));
        assert!(query::view(&world).battles.is_empty());
        assert!(position(&world, 3).is_some());
    }

    #[test]
    fn mercenaries_ignore_an_invisible_player() {
        let (world, events) = walk_into_stuck_enemy(EntityType::Mercenary);

        assert_eq!(query::player_position(&world), Some(CellCoord::new(2, 0)));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BattleResolved { .. })));
        assert!(query::view(&world).battles.is_empty());
        assert!(position(&world, 3).is_some());
    }

    #[test]
    fn assassins_in_recon_range_fight_an_invisible_player() {
        let (world, events) = walk_into_stuck_enemy(EntityType::Assassin);

        assert!(events.iter().any(|event| matches!(
            event,
            Event::BattleResolved { enemy, .. } if *enemy == EntityId::new(3)
        )));
        assert_eq!(query::view(&world).battles.len(), 1);
    }

    #[test]
    fn assassins_lose_track_of_distant_invisible_players() {
        let mut entities = vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::InvisibilityPotion, -1, 0),
            spec(EntityType::Assassin, 10, 0),
        ];
        // A sealed pocket: pursuit finds no path, wandering has one exit.
        for (x, y) in [(9, 0), (10, -1), (10, 1), (11, -1), (11, 1), (12, 0)] {
            entities.push(spec(EntityType::Wall, x, y));
        }
        let mut world = world_with(entities);

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 3), Some(CellCoord::new(10, 0)));

        let _ = use_item(&mut world, 2);
        assert_eq!(position(&world, 3), Some(CellCoord::new(11, 0)));
    }

    #[test]
    fn pursuers_reach_a_player_standing_on_a_placed_bomb() {
        let mut world = world_with(vec![
            spec(EntityType::Player, 0, 0),
            spec(EntityType::Bomb, -1, 0),
            spec(EntityType::Mercenary, 5, 0),
        ]);

        let _ = step(&mut world, Direction::West);
        assert_eq!(position(&world, 3), Some(CellCoord::new(4, 0)));
        let _ = use_item(&mut world, 2);

        assert!(query::view(&world).first_of(EntityType::PlacedBomb).is_some());
        assert_eq!(position(&world, 3), Some(CellCoord::new(3, 0)));
    }
}
