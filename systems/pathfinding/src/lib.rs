#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted shortest-path search over a bounded window of the dungeon.
//!
//! The search never looks at the whole dungeon. It builds a square window of
//! [`SEARCH_RADIUS`] cells around the origin and runs Dijkstra inside it, with
//! the caller deciding which cells are blocked and what entering each open cell
//! costs. Ties between frontier cells at equal distance are broken by
//! lexicographic `(x, y)` order, so the returned step is deterministic.

use std::{cmp::Reverse, collections::BinaryHeap};

use delve_core::{CellCoord, Direction};

/// Square radius of the search window around the origin.
pub const SEARCH_RADIUS: u32 = 20;

/// Cost of entering an ordinary cell.
pub const BASE_COST: u32 = 1;

/// Returns the first cell on a cheapest path from `origin` to `target`.
///
/// `entry_cost` reports the cost of stepping onto a cell, or `None` when the
/// cell is blocked. Costs below [`BASE_COST`] are raised to it. The function
/// returns `None` when the target lies outside the search window, when it is
/// unreachable, or when the origin already equals the target; callers hold
/// position in every one of those cases.
pub fn next_step<F>(origin: CellCoord, target: CellCoord, entry_cost: F) -> Option<CellCoord>
where
    F: FnMut(CellCoord) -> Option<u32>,
{
    let grid = SearchGrid::centred_on(origin, SEARCH_RADIUS);
    let path = grid.shortest_path(origin, target, entry_cost)?;
    path.into_iter().nth(1)
}

/// Square window of cells in which a single search runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchGrid {
    min: CellCoord,
    side: u32,
}

impl SearchGrid {
    /// Creates a window covering every cell within `radius` of `centre`.
    #[must_use]
    pub fn centred_on(centre: CellCoord, radius: u32) -> Self {
        let reach = i32::try_from(radius).unwrap_or(i32::MAX / 4);
        Self {
            min: CellCoord::new(
                centre.x().saturating_sub(reach),
                centre.y().saturating_sub(reach),
            ),
            side: radius.saturating_mul(2).saturating_add(1),
        }
    }

    /// Reports whether the cell lies inside the window.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Number of cells covered by the window.
    #[must_use]
    pub fn len(&self) -> usize {
        let side = usize::try_from(self.side).unwrap_or(0);
        side.saturating_mul(side)
    }

    /// Reports whether the window covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs Dijkstra from `origin` and returns the full path to `target`.
    ///
    /// The returned path starts with `origin` and ends with `target`.
    pub fn shortest_path<F>(
        &self,
        origin: CellCoord,
        target: CellCoord,
        mut entry_cost: F,
    ) -> Option<Vec<CellCoord>>
    where
        F: FnMut(CellCoord) -> Option<u32>,
    {
        if origin == target {
            return None;
        }
        let origin_index = self.index(origin)?;
        let target_index = self.index(target)?;

        let node_count = self.len();
        let mut distance = vec![u32::MAX; node_count];
        let mut predecessor = vec![None::<usize>; node_count];
        let mut settled = vec![false; node_count];
        let mut frontier = BinaryHeap::new();

        distance[origin_index] = 0;
        frontier.push(Reverse((0u32, origin)));

        while let Some(Reverse((current_distance, cell))) = frontier.pop() {
            let Some(current_index) = self.index(cell) else {
                continue;
            };
            if settled[current_index] {
                continue;
            }
            settled[current_index] = true;

            if current_index == target_index {
                break;
            }

            for direction in Direction::ALL {
                let neighbor = cell.step(direction);
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if settled[neighbor_index] {
                    continue;
                }
                let Some(cost) = entry_cost(neighbor) else {
                    continue;
                };

                let tentative = current_distance.saturating_add(cost.max(BASE_COST));
                if tentative >= distance[neighbor_index] {
                    continue;
                }

                distance[neighbor_index] = tentative;
                predecessor[neighbor_index] = Some(current_index);
                frontier.push(Reverse((tentative, neighbor)));
            }
        }

        if distance[target_index] == u32::MAX {
            return None;
        }

        self.reconstruct(&predecessor, origin_index, target_index)
    }

    fn reconstruct(
        &self,
        predecessor: &[Option<usize>],
        origin_index: usize,
        target_index: usize,
    ) -> Option<Vec<CellCoord>> {
        let mut cursor = target_index;
        let mut indices = vec![cursor];

        while cursor != origin_index {
            cursor = predecessor.get(cursor).copied().flatten()?;
            indices.push(cursor);
        }
        indices.reverse();

        indices
            .into_iter()
            .map(|index| self.cell_at(index))
            .collect()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(i64::from(cell.x()) - i64::from(self.min.x())).ok()?;
        let row = u32::try_from(i64::from(cell.y()) - i64::from(self.min.y())).ok()?;
        if column >= self.side || row >= self.side {
            return None;
        }
        let side = usize::try_from(self.side).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(side)?.checked_add(column)
    }

    fn cell_at(&self, index: usize) -> Option<CellCoord> {
        let side = usize::try_from(self.side).ok()?;
        if side == 0 {
            return None;
        }
        let column = i32::try_from(index % side).ok()?;
        let row = i32::try_from(index / side).ok()?;
        Some(CellCoord::new(
            self.min.x().checked_add(column)?,
            self.min.y().checked_add(row)?,
        ))
    }
}
