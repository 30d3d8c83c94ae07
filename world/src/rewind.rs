//! Per-tick snapshots, restoration and the historical actor's replay.
//!
//! Snapshots hold clones of the board, whose entities sit behind [`Arc`], so
//! consecutive snapshots share every entity that did not change in between.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use delve_core::{
    ActorRole, Battle, BuildableKind, Direction, DungeonError, EntityId, EntityType, Event,
};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    entity::{Body, Board, Entity},
    movement::{self, Landing},
    World,
};

/// World state captured at the end of a tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    tick: u64,
    board: Board,
    battles: Vec<Arc<Battle>>,
    buildables: Vec<BuildableKind>,
    rng: ChaCha8Rng,
}

/// Snapshots and player inputs of the current timeline, ordered by tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Timeline {
    snapshots: Vec<Arc<Snapshot>>,
    inputs: BTreeMap<u64, Option<Direction>>,
}

impl Timeline {
    /// Logs the live player's input for a tick, forgetting any later branch.
    pub(crate) fn record_input(&mut self, tick: u64, input: Option<Direction>) {
        let _ = self.inputs.split_off(&tick);
        let _ = self.inputs.insert(tick, input);
    }

    fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.retain(|kept| kept.tick < snapshot.tick);
        self.snapshots.push(Arc::new(snapshot));
    }

    fn at(&self, tick: u64) -> Option<Arc<Snapshot>> {
        self.snapshots
            .binary_search_by_key(&tick, |snapshot| snapshot.tick)
            .ok()
            .map(|index| Arc::clone(&self.snapshots[index]))
    }

    /// Inputs recorded for the ticks after `from` up to and including `to`.
    fn inputs_between(&self, from: u64, to: u64) -> VecDeque<Option<Direction>> {
        self.inputs
            .range(from.saturating_add(1)..=to)
            .map(|(_, input)| *input)
            .collect()
    }
}

/// Historical actor and the inputs it still has to replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Replay {
    pub(crate) actor: EntityId,
    inputs: VecDeque<Option<Direction>>,
}

/// Appends the end-of-tick state to the timeline.
pub(crate) fn snapshot(world: &mut World) {
    let snapshot = Snapshot {
        tick: world.tick,
        board: world.board.clone(),
        battles: world.battles.clone(),
        buildables: world.buildables.clone(),
        rng: world.rng.clone(),
    };
    world.timeline.record(snapshot);
}

/// Converts a rewind request into the tick to restore.
pub(crate) fn validate(world: &World, ticks: i64) -> Result<u64, DungeonError> {
    let _ = world.require_live_player()?;
    let elapsed = world.tick;
    u64::try_from(ticks)
        .ok()
        .filter(|count| (1..=elapsed).contains(count))
        .map(|count| elapsed - count)
        .ok_or_else(|| {
            DungeonError::invalid_action(format!(
                "cannot rewind {ticks} ticks after {elapsed} have elapsed"
            ))
        })
}

/// Restores the snapshot taken at `target`, keeping the live player as it is.
///
/// The player as it stood at `target` reappears as the historical actor and
/// replays the inputs recorded between `target` and the current tick.
pub(crate) fn restore(world: &mut World, target: u64, out_events: &mut Vec<Event>) {
    let Some(snapshot) = world.timeline.at(target) else {
        warn!(target, "no snapshot recorded for tick");
        return;
    };
    let origin = world.tick;
    let live = world.board.shared(world.player);
    let past = snapshot
        .board
        .get(world.player)
        .and_then(|entity| Some((entity.cell, entity.player()?.clone())));

    let mut board = snapshot.board.clone();
    for player in board.ids_where(|entity| entity.player().is_some()) {
        let _ = board.remove(player);
    }
    if let Some(live) = live {
        board.insert_shared(live);
    }
    world.board = board;
    world.battles = snapshot.battles.clone();
    world.buildables = snapshot.buildables.clone();
    world.rng = snapshot.rng.clone();
    world.tick = target;
    world.replay = None;

    if let Some((cell, mut state)) = past {
        state.role = ActorRole::Historical;
        let actor = world.allocate_id();
        world
            .board
            .insert(Entity::new(actor, cell, Body::Player(state)));
        out_events.push(Event::EntitySpawned {
            entity: actor,
            kind: EntityType::OlderPlayer,
            cell,
        });
        world.replay = Some(Replay {
            actor,
            inputs: world.timeline.inputs_between(target, origin),
        });
    }

    info!(from = origin, to = target, "time rewound");
    out_events.push(Event::TimeRewound {
        from: origin,
        to: target,
    });
}

/// Plays the historical actor's input for the current tick.
///
/// The actor retires once its inputs run out or when it re-enters a time
/// travelling portal.
pub(crate) fn replay_historical(world: &mut World, out_events: &mut Vec<Event>) {
    let Some(replay) = world.replay.as_mut() else {
        return;
    };
    let actor = replay.actor;
    match replay.inputs.pop_front() {
        None => retire(world, actor, out_events),
        Some(None) => {}
        Some(Some(direction)) => {
            if movement::move_historical(world, actor, direction, out_events) == Landing::TimeTravel
            {
                retire(world, actor, out_events);
            }
        }
    }
}

fn retire(world: &mut World, actor: EntityId, out_events: &mut Vec<Event>) {
    world.replay = None;
    if world.board.remove(actor).is_some() {
        info!(entity = %actor, "historical actor retired");
        out_events.push(Event::HistoricalActorRetired { entity: actor });
    }
}
