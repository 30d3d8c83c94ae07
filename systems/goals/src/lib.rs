#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Win-condition evaluation over a snapshot of world facts.
//!
//! The world summarises the handful of counters the goals depend on into
//! [`GoalFacts`]; this system never sees entities directly. Both the verdict
//! and the remaining-goal description are recomputed from those facts on
//! every query, so nothing here caches state between ticks.

use delve_core::GoalSpec;
use serde::{Deserialize, Serialize};

/// Node of a win-condition tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalNode {
    /// Finished when every child is finished.
    And(Vec<GoalNode>),
    /// Finished when any child is finished, or when it has no children.
    Or(Vec<GoalNode>),
    /// Finished while the live player stands on an exit.
    Exit,
    /// Finished once enough treasure has been collected.
    Treasure,
    /// Finished while every switch is pressed.
    Boulders,
    /// Finished once enough enemies have been defeated.
    Enemies,
}

/// Counters the goal tree is evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoalFacts {
    /// Whether the live player stands on an exit tile.
    pub player_on_exit: bool,
    /// Treasure and sun stones collected so far.
    pub treasure_collected: u32,
    /// Treasure required by the treasure goal.
    pub treasure_goal: u32,
    /// Number of switches in the dungeon.
    pub switches_total: usize,
    /// Number of switches currently pressed.
    pub switches_active: usize,
    /// Enemies defeated so far.
    pub enemies_defeated: u32,
    /// Kills required by the enemies goal.
    pub enemy_goal: u32,
}

impl GoalNode {
    /// Builds the goal tree described by a layout in one recursive pass.
    #[must_use]
    pub fn from_spec(spec: &GoalSpec) -> Self {
        match spec {
            GoalSpec::And { subgoals } => Self::And(subgoals.iter().map(Self::from_spec).collect()),
            GoalSpec::Or { subgoals } => Self::Or(subgoals.iter().map(Self::from_spec).collect()),
            GoalSpec::Exit => Self::Exit,
            GoalSpec::Treasure => Self::Treasure,
            GoalSpec::Boulders => Self::Boulders,
            GoalSpec::Enemies => Self::Enemies,
        }
    }

    /// Reports whether the condition holds for the provided facts.
    #[must_use]
    pub fn is_finished(&self, facts: &GoalFacts) -> bool {
        match self {
            Self::And(children) => children.iter().all(|child| child.is_finished(facts)),
            Self::Or(children) => {
                children.is_empty() || children.iter().any(|child| child.is_finished(facts))
            }
            Self::Exit => facts.player_on_exit,
            Self::Treasure => facts.treasure_collected >= facts.treasure_goal,
            Self::Boulders => facts.switches_active >= facts.switches_total,
            Self::Enemies => facts.enemies_defeated >= facts.enemy_goal,
        }
    }

    /// Describes what remains to be done; empty once the goal is finished.
    #[must_use]
    pub fn describe(&self, facts: &GoalFacts) -> String {
        if self.is_finished(facts) {
            return String::new();
        }

        match self {
            Self::And(children) => join_unfinished(children, facts, " AND "),
            Self::Or(children) => join_unfinished(children, facts, " OR "),
            Self::Exit => ":exit".to_owned(),
            Self::Treasure => ":treasure".to_owned(),
            Self::Boulders => ":boulders".to_owned(),
            Self::Enemies => ":enemies".to_owned(),
        }
    }

    fn is_composite(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_))
    }
}

fn join_unfinished(children: &[GoalNode], facts: &GoalFacts, separator: &str) -> String {
    children
        .iter()
        .filter(|child| !child.is_finished(facts))
        .map(|child| {
            let text = child.describe(facts);
            if child.is_composite() {
                format!("({text})")
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> GoalFacts {
        GoalFacts {
            treasure_goal: 2,
            enemy_goal: 1,
            switches_total: 2,
            ..GoalFacts::default()
        }
    }

    fn tree() -> GoalNode {
        let spec: GoalSpec = serde_json::from_str(
            r#"{ "goal": "AND", "subgoals": [
                { "goal": "exit" },
                { "goal": "OR", "subgoals": [{ "goal": "treasure" }, { "goal": "boulders" }] }
            ] }"#,
        )
        .expect("goal parses");
        GoalNode::from_spec(&spec)
    }

    #[test]
    fn construction_mirrors_the_layout_tree() {
        assert_eq!(
            tree(),
            GoalNode::And(vec![
                GoalNode::Exit,
                GoalNode::Or(vec![GoalNode::Treasure, GoalNode::Boulders]),
            ])
        );
    }

    #[test]
    fn description_lists_only_unfinished_children() {
        let goal = tree();
        let mut facts = facts();

        assert_eq!(goal.describe(&facts), ":exit AND (:treasure OR :boulders)");

        facts.player_on_exit = true;
        assert_eq!(goal.describe(&facts), "(:treasure OR :boulders)");

        facts.switches_active = 2;
        assert!(goal.is_finished(&facts));
        assert_eq!(goal.describe(&facts), "");
    }

    #[test]
    fn description_is_rebuilt_when_facts_regress() {
        let goal = tree();
        let mut facts = facts();
        facts.player_on_exit = true;
        facts.treasure_collected = 2;
        assert_eq!(goal.describe(&facts), "");

        facts.player_on_exit = false;
        assert_eq!(goal.describe(&facts), ":exit");
    }

    #[test]
    fn leaves_compare_against_configured_thresholds() {
        let facts = GoalFacts {
            treasure_collected: 1,
            treasure_goal: 1,
            enemies_defeated: 0,
            enemy_goal: 1,
            ..GoalFacts::default()
        };

        assert!(GoalNode::Treasure.is_finished(&facts));
        assert!(!GoalNode::Enemies.is_finished(&facts));
        assert!(GoalNode::Boulders.is_finished(&facts));
        assert!(!GoalNode::Exit.is_finished(&facts));
    }

    #[test]
    fn text_is_empty_exactly_when_finished() {
        let goal = GoalNode::Or(vec![
            GoalNode::And(vec![GoalNode::Enemies, GoalNode::Exit]),
            GoalNode::Treasure,
        ]);

        for kills in 0..2 {
            for treasure in 0..3 {
                for on_exit in [false, true] {
                    let facts = GoalFacts {
                        player_on_exit: on_exit,
                        treasure_collected: treasure,
                        enemies_defeated: kills,
                        ..facts()
                    };
                    assert_eq!(
                        goal.describe(&facts).is_empty(),
                        goal.is_finished(&facts)
                    );
                }
            }
        }
    }

    #[test]
    fn childless_composites_count_as_finished() {
        let facts = facts();
        let empty_or = GoalNode::Or(Vec::new());
        let nested = GoalNode::And(vec![GoalNode::Or(Vec::new()), GoalNode::Exit]);

        assert!(empty_or.is_finished(&facts));
        assert!(empty_or.describe(&facts).is_empty());
        assert!(GoalNode::And(Vec::new()).is_finished(&facts));
        assert_eq!(nested.describe(&facts), ":exit");
    }
}
