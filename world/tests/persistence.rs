use delve_core::{Command, Config, Direction, DungeonLayout};
use delve_world::{self as world, persistence, query, World};

fn layout() -> DungeonLayout {
    serde_json::from_str(
        r#"{
            "entities": [
                { "type": "player", "x": 0, "y": 0 },
                { "type": "zombie_toast", "x": 5, "y": 5 },
                { "type": "spider", "x": -4, "y": 3 },
                { "type": "treasure", "x": 1, "y": 0 },
                { "type": "exit", "x": 3, "y": 0 },
                { "type": "wall", "x": 7, "y": 7 }
            ],
            "goal-condition": { "goal": "AND", "subgoals": [
                { "goal": "exit" },
                { "goal": "treasure" }
            ] }
        }"#,
    )
    .expect("layout parses")
}

fn advance(world: &mut World, directions: &[Direction]) {
    for direction in directions {
        let mut events = Vec::new();
        world::apply(
            world,
            Command::Move {
                direction: *direction,
            },
            &mut events,
        )
        .expect("move accepted");
    }
}

fn started() -> World {
    let mut world = World::new(&layout(), Config::default(), 21).expect("layout is valid");
    advance(&mut world, &[Direction::East, Direction::South, Direction::North]);
    world
}

#[test]
fn json_saves_continue_where_they_stopped() {
    let mut original = started();
    let json = serde_json::to_string(&persistence::save(&original)).expect("serialize");
    let mut loaded = persistence::load(serde_json::from_str(&json).expect("deserialize"));

    assert_eq!(query::view(&loaded), query::view(&original));

    let rest = [Direction::West, Direction::West, Direction::South];
    advance(&mut original, &rest);
    advance(&mut loaded, &rest);
    assert_eq!(query::view(&loaded), query::view(&original));
}

#[test]
fn bincode_saves_keep_the_timeline() {
    let original = started();
    let bytes = bincode::serialize(&persistence::save(&original)).expect("serialize");
    let mut loaded = persistence::load(bincode::deserialize(&bytes).expect("deserialize"));

    let mut events = Vec::new();
    world::apply(&mut loaded, Command::Rewind { ticks: 3 }, &mut events).expect("rewind");

    assert_eq!(query::tick(&loaded), 0);
    assert!(query::historical_actor(&loaded).is_some());
}

#[test]
fn goal_text_follows_progress() {
    let mut world = World::new(&layout(), Config::default(), 2).expect("layout is valid");
    assert_eq!(query::goals(&world), ":exit AND :treasure");

    advance(&mut world, &[Direction::East]);
    assert_eq!(query::goals(&world), ":exit");

    advance(&mut world, &[Direction::East, Direction::East]);
    assert_eq!(query::goals(&world), "");
    assert!(query::is_finished(&world));
    assert!(query::view(&world).goals.is_empty());
}
