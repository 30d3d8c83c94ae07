#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Delve dungeons.
//!
//! The world is advanced exclusively through [`apply`]. Move and item-use
//! commands run one tick of the pipeline: historical replay, player action,
//! enemy movement, spawning, timer countdown and finally a snapshot. Crafting,
//! interactions and rewinds resolve immediately without advancing time.
//! Read-only access goes through the [`query`] module.

use std::sync::Arc;

use delve_core::{
    ActorRole, Battle, BuildableKind, CellCoord, Command, Config, Direction, DungeonError,
    DungeonLayout, EntityId, EntitySpec, EntityType, Event, ItemKind,
};
use delve_system_goals::{GoalFacts, GoalNode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod battles;
mod enemies;
mod entity;
mod interaction;
mod inventory;
mod movement;
pub mod persistence;
mod rewind;

use entity::{Body, Board, Entity, Item, PlayerState};
use inventory::Usage;
use movement::Landing;
use rewind::{Replay, Timeline};

/// Represents the authoritative state of a single dungeon session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    config: Config,
    goal: Option<GoalNode>,
    tick: u64,
    next_id: u64,
    player: EntityId,
    board: Board,
    battles: Vec<Arc<Battle>>,
    buildables: Vec<BuildableKind>,
    bounds: Bounds,
    rng: ChaCha8Rng,
    timeline: Timeline,
    replay: Option<Replay>,
}

impl World {
    /// Creates a world from a layout, reading tuning values once.
    ///
    /// The layout must place exactly one player. `seed` fixes every random
    /// decision the world makes, so equal inputs replay identically.
    pub fn new(layout: &DungeonLayout, config: Config, seed: u64) -> Result<Self, DungeonError> {
        let players = layout
            .entities
            .iter()
            .filter(|spec| spec.kind == EntityType::Player)
            .count();
        if players != 1 {
            return Err(DungeonError::invalid_argument(format!(
                "a dungeon needs exactly one player, found {players}"
            )));
        }

        let mut world = Self {
            goal: layout.goal_condition.as_ref().map(GoalNode::from_spec),
            config,
            tick: 0,
            next_id: 1,
            player: EntityId::new(0),
            board: Board::default(),
            battles: Vec::new(),
            buildables: Vec::new(),
            bounds: Bounds::enclosing(layout.entities.iter().map(EntitySpec::cell)),
            rng: ChaCha8Rng::seed_from_u64(seed),
            timeline: Timeline::default(),
            replay: None,
        };

        for spec in &layout.entities {
            world.place(spec)?;
        }
        let switches = world
            .board
            .ids_where(|entity| matches!(entity.body, Body::Switch { .. }));
        for switch in switches {
            let _ = movement::sync_switch(&mut world, switch);
        }
        world.refresh_buildables();
        rewind::snapshot(&mut world);

        info!(
            entities = layout.entities.len(),
            seed, "dungeon created"
        );
        Ok(world)
    }

    fn place(&mut self, spec: &EntitySpec) -> Result<(), DungeonError> {
        let id = self.allocate_id();
        let cell = spec.cell();
        let body = match spec.kind {
            EntityType::Player => {
                self.player = id;
                Body::Player(PlayerState::new(
                    self.config.player_health,
                    self.config.player_attack,
                    cell,
                ))
            }
            EntityType::OlderPlayer => {
                return Err(DungeonError::invalid_argument(
                    "older_player cannot be placed in a layout",
                ))
            }
            EntityType::Wall => Body::Wall,
            EntityType::Exit => Body::Exit,
            EntityType::Boulder => Body::Boulder,
            EntityType::Switch => Body::Switch { active: false },
            EntityType::Door => Body::Door {
                key: spec.key,
                open: false,
            },
            EntityType::Portal => Body::Portal {
                colour: spec.colour.clone().unwrap_or_default(),
            },
            EntityType::ZombieToastSpawner => Body::Spawner,
            EntityType::SwampTile => Body::Swamp {
                movement_factor: spec.movement_factor.unwrap_or(1),
            },
            EntityType::TimeTravellingPortal => Body::TimeTravelPortal,
            EntityType::PlacedBomb => Body::PlacedBomb,
            other => match (other.enemy_kind(), other.item_kind()) {
                (Some(kind), _) => enemies::body(&self.config, kind, cell),
                (None, Some(kind)) => Body::Item(self.new_item(id, kind, spec.key)),
                (None, None) => {
                    return Err(DungeonError::invalid_argument(format!(
                        "'{other}' cannot be placed in a layout"
                    )))
                }
            },
        };
        self.board.insert(Entity::new(id, cell, body));
        Ok(())
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn new_item(&self, id: EntityId, kind: ItemKind, key: Option<u32>) -> Item {
        let durability = match kind {
            ItemKind::Sword => Some(self.config.sword_durability),
            ItemKind::Bow => Some(self.config.bow_durability),
            ItemKind::Shield => Some(self.config.shield_durability),
            _ => None,
        };
        Item {
            id,
            kind,
            key,
            durability,
        }
    }

    /// Live player entity, absent once the player has been defeated.
    fn live_player(&self) -> Option<&Entity> {
        self.board
            .get(self.player)
            .filter(|entity| entity.player().map(|state| state.role) == Some(ActorRole::Live))
    }

    fn live_player_state(&self) -> Option<&PlayerState> {
        self.live_player().and_then(Entity::player)
    }

    fn live_player_state_mut(&mut self) -> Option<&mut PlayerState> {
        self.board.get_mut(self.player).and_then(Entity::player_mut)
    }

    fn require_live_player(&self) -> Result<&Entity, DungeonError> {
        self.live_player()
            .ok_or_else(|| DungeonError::invalid_action("the player has been defeated"))
    }

    fn zombies_present(&self) -> bool {
        self.board.iter().any(|entity| {
            entity
                .enemy()
                .is_some_and(|enemy| enemy.kind == delve_core::EnemyKind::ZombieToast)
        })
    }

    fn refresh_buildables(&mut self) {
        let zombies = self.zombies_present();
        self.buildables = self
            .live_player_state()
            .map(|player| inventory::available(player, zombies))
            .unwrap_or_default();
    }

    fn goal_facts(&self) -> GoalFacts {
        let player = self.live_player();
        let state = player.and_then(Entity::player);
        let switches = self.board.iter().filter_map(|entity| match entity.body {
            Body::Switch { active } => Some(active),
            _ => None,
        });
        let (switches_total, switches_active) =
            switches.fold((0, 0), |(total, active), on| (total + 1, active + usize::from(on)));

        GoalFacts {
            player_on_exit: player.is_some_and(|player| {
                self.board
                    .any_at(player.cell, |entity| matches!(entity.body, Body::Exit))
            }),
            treasure_collected: state.map_or(0, |state| state.treasure_collected),
            treasure_goal: self.config.treasure_goal,
            switches_total,
            switches_active,
            enemies_defeated: state.map_or(0, |state| state.enemies_defeated),
            enemy_goal: self.config.enemy_goal,
        }
    }

    fn advance(&mut self, action: Action, out_events: &mut Vec<Event>) {
        self.tick = self.tick.saturating_add(1);
        out_events.push(Event::TickAdvanced { tick: self.tick });
        let input = match action {
            Action::Move(direction) => Some(direction),
            Action::Use(_) => None,
        };
        self.timeline.record_input(self.tick, input);
        debug!(tick = self.tick, ?input, "tick started");

        rewind::replay_historical(self, out_events);

        let landing = match action {
            Action::Move(direction) => movement::move_live_player(self, direction, out_events),
            Action::Use(usage) => {
                inventory::apply_use(self, usage, out_events);
                Landing::Stayed
            }
        };

        if landing == Landing::TimeTravel {
            let ticks = self.config.time_travel_portal_ticks.min(self.tick);
            if ticks > 0 {
                let target = self.tick - ticks;
                rewind::restore(self, target, out_events);
                return;
            }
        }

        enemies::move_enemies(self, out_events);
        enemies::spawn(self, out_events);
        inventory::count_down_effects(self, out_events);
        interaction::count_down_mind_control(self, out_events);
        self.refresh_buildables();
        rewind::snapshot(self);
    }
}

/// Player action performed during a tick.
#[derive(Clone, Copy, Debug)]
enum Action {
    Move(Direction),
    Use(Usage),
}

/// Rectangle enclosing every cell placed by the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Bounds {
    min: CellCoord,
    max: CellCoord,
}

impl Bounds {
    fn enclosing(cells: impl IntoIterator<Item = CellCoord>) -> Self {
        let mut cells = cells.into_iter();
        let first = cells.next().unwrap_or(CellCoord::new(0, 0));
        cells.fold(
            Self {
                min: first,
                max: first,
            },
            |bounds, cell| Self {
                min: CellCoord::new(bounds.min.x().min(cell.x()), bounds.min.y().min(cell.y())),
                max: CellCoord::new(bounds.max.x().max(cell.x()), bounds.max.y().max(cell.y())),
            },
        )
    }

    fn cells(self) -> impl Iterator<Item = CellCoord> {
        (self.min.y()..=self.max.y())
            .flat_map(move |y| (self.min.x()..=self.max.x()).map(move |x| CellCoord::new(x, y)))
    }
}

/// Applies the provided command to the world.
///
/// Every precondition is checked before anything changes: a rejected command
/// leaves the world untouched, with no tick counted and no input recorded.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), DungeonError> {
    match command {
        Command::Move { direction } => {
            let _ = world.require_live_player()?;
            world.advance(Action::Move(direction), out_events);
        }
        Command::UseItem { item } => {
            let usage = inventory::prepare_use(world, item)?;
            world.advance(Action::Use(usage), out_events);
        }
        Command::Build { buildable } => inventory::build(world, buildable, out_events)?,
        Command::Interact { entity } => interaction::interact(world, entity, out_events)?,
        Command::Rewind { ticks } => {
            let target = rewind::validate(world, ticks)?;
            rewind::restore(world, target, out_events);
        }
    }
    world.refresh_buildables();
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use delve_core::{
        CellCoord, Config, DungeonView, EntityId, EntityView, ItemView,
    };

    use super::World;

    /// Builds the projection returned to the command layer.
    ///
    /// The remaining-goal text is recomputed from scratch on every call.
    #[must_use]
    pub fn view(world: &World) -> DungeonView {
        let entities = world
            .board
            .iter()
            .map(|entity| EntityView {
                id: entity.id,
                kind: entity.entity_type(),
                position: entity.cell,
                interactable: entity.is_interactable(),
            })
            .collect();
        let inventory = world
            .live_player()
            .and_then(|player| inventory_of(world, player.id))
            .unwrap_or_default();

        DungeonView {
            tick: world.tick,
            entities,
            inventory,
            battles: world.battles.iter().map(|battle| (**battle).clone()).collect(),
            goals: goals(world),
            buildables: world.buildables.clone(),
        }
    }

    /// Number of ticks elapsed in the current timeline.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Remaining win conditions; empty once the dungeon is complete.
    #[must_use]
    pub fn goals(world: &World) -> String {
        world
            .goal
            .as_ref()
            .map(|goal| goal.describe(&world.goal_facts()))
            .unwrap_or_default()
    }

    /// Reports whether the win condition currently holds.
    #[must_use]
    pub fn is_finished(world: &World) -> bool {
        world
            .goal
            .as_ref()
            .map_or(true, |goal| goal.is_finished(&world.goal_facts()))
    }

    /// Identifier of the live player, which survives rewinds.
    #[must_use]
    pub fn player_id(world: &World) -> EntityId {
        world.player
    }

    /// Cell of the live player, absent once defeated.
    #[must_use]
    pub fn player_position(world: &World) -> Option<CellCoord> {
        world.live_player().map(|player| player.cell)
    }

    /// Health of the live player, absent once defeated.
    #[must_use]
    pub fn player_health(world: &World) -> Option<f64> {
        world.live_player_state().map(|player| player.health)
    }

    /// Identifier and cell of the historical actor, if one is replaying.
    #[must_use]
    pub fn historical_actor(world: &World) -> Option<(EntityId, CellCoord)> {
        let replay = world.replay.as_ref()?;
        world
            .board
            .get(replay.actor)
            .map(|actor| (actor.id, actor.cell))
    }

    /// Inventory of the live player or the historical actor, in pickup order.
    #[must_use]
    pub fn inventory_of(world: &World, actor: EntityId) -> Option<Vec<ItemView>> {
        let player = world.board.get(actor)?.player()?;
        Some(
            player
                .inventory
                .iter()
                .map(|item| ItemView {
                    id: item.id,
                    kind: item.kind.entity_type(),
                })
                .collect(),
        )
    }

    /// Tuning values the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }
}
