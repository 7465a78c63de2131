//! The A* search itself, grounded line-for-line in `astar()` from
//! `navigate_route_astar.c`: a priority queue keyed by `g + h`, a closed set,
//! and a predecessor map walked backwards to reconstruct the path.
//!
//! The original indexes predecessors by raw line id into two arrays sized by
//! `roadmap_line_count()` (`GraphPrevList`/`GraphOppositePrevList`). Since
//! [`MapQuery::LineId`] here is an opaque associated type, predecessors are
//! keyed by [`DirectedEdge`] in a hash map instead — the same adaptation the
//! teacher's own `decoder::shortest_path` makes for its `HashMap<VertexId,
//! (EdgeId, VertexId)>` predecessor table.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::graph::tile::{successors, StreetGraphTile};
use crate::model::DirectedEdge;
use crate::routing::cost::CostFn;
use crate::MapQuery;

/// Caps reported progress at 90%, matching `update_progress`'s
/// `progress * 9 / 10` in the original: the final 10% is reserved for
/// instruction annotation that happens after the search returns.
const PROGRESS_CAP_PERCENT: u8 = 90;

/// Polled after every settled node. Returning `true` aborts the search with
/// [`SearchOutcome::Cancelled`].
///
/// Unlike the original, which only calls its progress callback when
/// `!recalc` (silently disabling cancellation during a recalculation), this
/// callback is polled regardless of `recalc` — the spec's cancellation
/// contract ("the router polls a cancelled flag through its progress
/// callback") makes no exception for recalculation, and silently ignoring
/// cancellation mid-reroute would be surprising.
pub trait Progress {
    /// `percent` is already clamped to `[0, 90]`; `recalc` tells the callback
    /// whether to surface this as a visible progress update.
    fn report(&mut self, percent: u8, recalc: bool) -> bool;
}

impl<F: FnMut(u8, bool) -> bool> Progress for F {
    fn report(&mut self, percent: u8, recalc: bool) -> bool {
        self(percent, recalc)
    }
}

/// A no-op progress sink for callers that don't need cancellation or a UI.
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _percent: u8, _recalc: bool) -> bool {
        false
    }
}

pub enum SearchOutcome<LineId> {
    Found { path: Vec<DirectedEdge<LineId>>, cost: u32 },
    NoPath,
    Cancelled,
}

struct HeapElement<LineId, PointId> {
    f_cost: u32,
    seq: u32,
    edge: DirectedEdge<LineId>,
    node: PointId,
}

impl<LineId, PointId> PartialEq for HeapElement<LineId, PointId> {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}
impl<LineId, PointId> Eq for HeapElement<LineId, PointId> {}

impl<LineId, PointId> Ord for HeapElement<LineId, PointId> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest f_cost out
        // first, breaking ties by insertion order for determinism.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<LineId, PointId> PartialOrd for HeapElement<LineId, PointId> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs A* from `start` (already at `start_node`, the head of the initial
/// directed edge) until it settles a directed edge whose head is `goal_node`.
///
/// Tiles are pulled from `cache` lazily, one square at a time, as the search
/// frontier reaches them — mirroring the original's square-at-a-time graph
/// loading rather than pre-loading the whole region.
#[allow(clippy::too_many_arguments)]
pub fn search<G: MapQuery, C: CostFn<G>>(
    graph: &G,
    cache: &mut crate::graph::cache::GraphCache<G>,
    cost: &C,
    start: DirectedEdge<G::LineId>,
    start_node: G::PointId,
    goal_node: G::PointId,
    goal_position: crate::model::Position,
    recalc: bool,
    progress: &mut dyn Progress,
) -> Result<SearchOutcome<G::LineId>, G::Error> {
    let start_position = graph.point_position(start_node)?;
    let initial_distance = graph.distance(start_position, goal_position).meters().max(1);

    let mut open = BinaryHeap::new();
    let mut best_g: FxHashMap<DirectedEdge<G::LineId>, u32> = FxHashMap::default();
    let mut came_from: FxHashMap<DirectedEdge<G::LineId>, (DirectedEdge<G::LineId>, G::PointId)> =
        FxHashMap::default();
    let mut closed: FxHashSet<DirectedEdge<G::LineId>> = FxHashSet::default();
    let mut seq = 0u32;
    let mut min_distance_to_goal = initial_distance;

    best_g.insert(start, 0);
    open.push(HeapElement {
        f_cost: cost.heuristic(graph, start_position, goal_position),
        seq,
        edge: start,
        node: start_node,
    });

    while let Some(HeapElement { edge, node, .. }) = open.pop() {
        if closed.contains(&edge) {
            continue;
        }
        closed.insert(edge);

        let node_position = graph.point_position(node)?;
        let distance_to_goal = graph.distance(node_position, goal_position).meters();
        if distance_to_goal < min_distance_to_goal {
            min_distance_to_goal = distance_to_goal;
        }
        let percent = 100u32.saturating_sub(100 * min_distance_to_goal / initial_distance);
        let capped = (percent as u8).min(PROGRESS_CAP_PERCENT);
        if progress.report(capped, recalc) {
            return Ok(SearchOutcome::Cancelled);
        }

        if node == goal_node {
            trace!(?edge, "goal reached");
            let path = reconstruct(start, edge, &came_from);
            let total_cost = best_g[&edge];
            return Ok(SearchOutcome::Found { path, cost: total_cost });
        }

        let square = graph.point_square(node)?;
        let tile = cache.get(graph, square)?;

        for (candidate, head) in successors(graph, tile, edge, node)? {
            if closed.contains(&candidate) {
                continue;
            }

            let Some(step_cost) = cost.edge_cost(graph, candidate, Some((edge, node)))? else {
                continue;
            };

            let tentative_g = best_g[&edge].saturating_add(step_cost);
            if tentative_g < *best_g.get(&candidate).unwrap_or(&u32::MAX) {
                best_g.insert(candidate, tentative_g);
                came_from.insert(candidate, (edge, node));

                let head_position = graph.point_position(head)?;
                let h = cost.heuristic(graph, head_position, goal_position);
                seq += 1;
                open.push(HeapElement {
                    f_cost: tentative_g.saturating_add(h),
                    seq,
                    edge: candidate,
                    node: head,
                });
            }
        }
    }

    Ok(SearchOutcome::NoPath)
}

fn reconstruct<LineId: Copy + Eq + std::hash::Hash, PointId: Copy + Eq + std::hash::Hash>(
    start: DirectedEdge<LineId>,
    goal: DirectedEdge<LineId>,
    came_from: &FxHashMap<DirectedEdge<LineId>, (DirectedEdge<LineId>, PointId)>,
) -> Vec<DirectedEdge<LineId>> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        let Some(&(prev, _)) = came_from.get(&current) else {
            break;
        };
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
