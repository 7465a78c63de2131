//! Pluggable edge costs (§4.3): `time` and `distance`, both aware of the
//! previous edge/node so U-turn and road-class-change penalties can be
//! applied uniformly, grounded in `NavigateCostFn`'s signature in
//! `navigate_cost.c`.

use crate::model::DirectedEdge;
use crate::MapQuery;

/// Assumed free-flow speed used by the time heuristic, meters/second.
///
/// Matches `HU_SPEED` in `navigate_route_astar.c`. As in the original, this
/// is a constant upper bound rather than per-layer speed data, so the time
/// heuristic is only admissible for maps with no roads faster than this.
pub const ASSUMED_SPEED_MPS: f64 = 28.0;

/// A cost function pluggable into [`super::find_route`].
///
/// `edge_cost` returning `Ok(None)` marks the edge as untraversable for this
/// cost function (distinct from a [`MapQuery`] error).
pub trait CostFn<G: MapQuery> {
    fn edge_cost(
        &self,
        graph: &G,
        candidate: DirectedEdge<G::LineId>,
        prev: Option<(DirectedEdge<G::LineId>, G::PointId)>,
    ) -> Result<Option<u32>, G::Error>;

    /// Admissible lower-bound estimate of the remaining cost from `from` to
    /// `goal`.
    fn heuristic(&self, graph: &G, from: crate::model::Position, goal: crate::model::Position) -> u32;
}

/// Returns `true` if traversing `candidate` from `via_node` would immediately
/// reverse back through the node `prev` was entered from — a U-turn at a
/// divided road rather than a genuine continuation.
fn is_u_turn<G: MapQuery>(
    graph: &G,
    candidate: DirectedEdge<G::LineId>,
    prev: DirectedEdge<G::LineId>,
) -> Result<bool, G::Error> {
    let (prev_from, prev_to) = graph.line_endpoints(prev.line)?;
    let prev_tail = if prev.reversed { prev_to } else { prev_from };

    let (cand_from, cand_to) = graph.line_endpoints(candidate.line)?;
    let cand_head = if candidate.reversed { cand_from } else { cand_to };

    Ok(cand_head == prev_tail)
}

#[derive(Debug, Clone, Copy)]
pub struct TimeCost {
    pub assumed_speed_mps: f64,
    pub u_turn_penalty_secs: u32,
}

impl Default for TimeCost {
    fn default() -> Self {
        Self {
            assumed_speed_mps: ASSUMED_SPEED_MPS,
            u_turn_penalty_secs: 60,
        }
    }
}

impl<G: MapQuery> CostFn<G> for TimeCost {
    fn edge_cost(
        &self,
        graph: &G,
        candidate: DirectedEdge<G::LineId>,
        prev: Option<(DirectedEdge<G::LineId>, G::PointId)>,
    ) -> Result<Option<u32>, G::Error> {
        let mut cost = graph.line_cross_time(candidate.line, candidate.reversed)?.as_secs();

        if let Some((prev_edge, _)) = prev
            && is_u_turn(graph, candidate, prev_edge)?
        {
            cost += self.u_turn_penalty_secs;
        }

        Ok(Some(cost))
    }

    fn heuristic(&self, graph: &G, from: crate::model::Position, goal: crate::model::Position) -> u32 {
        (graph.distance(from, goal).meters() as f64 / self.assumed_speed_mps) as u32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DistanceCost {
    pub u_turn_penalty_meters: u32,
}

impl Default for DistanceCost {
    fn default() -> Self {
        Self {
            u_turn_penalty_meters: 200,
        }
    }
}

impl<G: MapQuery> CostFn<G> for DistanceCost {
    fn edge_cost(
        &self,
        graph: &G,
        candidate: DirectedEdge<G::LineId>,
        prev: Option<(DirectedEdge<G::LineId>, G::PointId)>,
    ) -> Result<Option<u32>, G::Error> {
        let mut cost = graph.line_length(candidate.line)?.meters();

        if let Some((prev_edge, _)) = prev
            && is_u_turn(graph, candidate, prev_edge)?
        {
            cost += self.u_turn_penalty_meters;
        }

        Ok(Some(cost))
    }

    fn heuristic(&self, graph: &G, from: crate::model::Position, goal: crate::model::Position) -> u32 {
        graph.distance(from, goal).meters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{LineId, PointId, TestGraph};

    #[test]
    fn reversing_through_the_entry_node_is_a_u_turn() {
        let graph = TestGraph::new();
        // Arrived at node 2 via L1 forward (1 -> 2); immediately leaving
        // back along L1 reversed (2 -> 1) returns through the same node.
        let prev = DirectedEdge::new(LineId(1), false);
        let candidate = DirectedEdge::new(LineId(1), true);
        assert!(is_u_turn(&graph, candidate, prev).unwrap());
    }

    #[test]
    fn continuing_onto_a_different_line_is_not_a_u_turn() {
        let graph = TestGraph::new();
        let prev = DirectedEdge::new(LineId(1), false);
        let candidate = DirectedEdge::new(LineId(2), false);
        assert!(!is_u_turn(&graph, candidate, prev).unwrap());
    }

    #[test]
    fn distance_cost_adds_the_u_turn_penalty_only_on_reversal() {
        let graph = TestGraph::new();
        let cost = DistanceCost::default();
        let prev_edge = DirectedEdge::new(LineId(1), false);
        let prev_node = PointId(2);

        let straight = cost
            .edge_cost(&graph, DirectedEdge::new(LineId(2), false), Some((prev_edge, prev_node)))
            .unwrap()
            .unwrap();
        let reversal = cost
            .edge_cost(&graph, DirectedEdge::new(LineId(1), true), Some((prev_edge, prev_node)))
            .unwrap()
            .unwrap();

        let plain_length = graph.line_length(LineId(1)).unwrap().meters();
        assert_eq!(straight, graph.line_length(LineId(2)).unwrap().meters());
        assert_eq!(reversal, plain_length + cost.u_turn_penalty_meters);
    }

    #[test]
    fn time_cost_adds_the_u_turn_penalty_only_on_reversal() {
        let graph = TestGraph::new();
        let cost = TimeCost::default();
        let prev_edge = DirectedEdge::new(LineId(1), false);
        let prev_node = PointId(2);

        let reversal = cost
            .edge_cost(&graph, DirectedEdge::new(LineId(1), true), Some((prev_edge, prev_node)))
            .unwrap()
            .unwrap();
        let base = graph.line_cross_time(LineId(1), true).unwrap().as_secs();
        assert_eq!(reversal, base + cost.u_turn_penalty_secs);
    }

    #[test]
    fn heuristic_never_exceeds_the_true_remaining_cost_for_a_straight_line() {
        let graph = TestGraph::new();
        let cost = DistanceCost::default();
        let from = graph.point_position(PointId(1)).unwrap();
        let goal = graph.point_position(PointId(3)).unwrap();
        let h = cost.heuristic(&graph, from, goal);
        let true_cost = graph.line_length(LineId(1)).unwrap().meters() + graph.line_length(LineId(2)).unwrap().meters();
        assert!(h <= true_cost, "heuristic {h} must not overestimate {true_cost}");
    }
}
