//! The Router (C3): A* shortest-path search over the street graph, with
//! initial/final leg orientation handling grounded in
//! `navigate_route_get_segments` (`navigate_route_astar.c`).

pub mod astar;
pub mod cost;

use tracing::{info, warn};

use crate::error::RouteError;
use crate::graph::cache::{GraphCache, GraphCacheConfig};
use crate::model::DirectedEdge;
use crate::routing::astar::{Progress, SearchOutcome};
use crate::routing::cost::CostFn;
use crate::MapQuery;

#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub graph_cache: GraphCacheConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            graph_cache: GraphCacheConfig::default(),
        }
    }
}

/// The ordered directed-edge path a search returns, before instruction
/// annotation turns it into a [`crate::model::Announcement`]-bearing route.
#[derive(Debug, Clone)]
pub struct RouteSearchResult<LineId> {
    pub edges: Vec<DirectedEdge<LineId>>,
    pub cost: u32,
}

/// Owns the tile cache and drives [`astar::search`] against it.
///
/// One `Router` is expected to live for the lifetime of a `NavigationCore`;
/// its cache persists across recalculations so a reroute along a familiar
/// area doesn't re-fetch tiles it already holds.
pub struct Router<G: MapQuery> {
    cache: GraphCache<G>,
}

impl<G: MapQuery> Router<G> {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            cache: GraphCache::new(config.graph_cache),
        }
    }

    /// Finds a route from `from_point` along `from_line` to `to_point` along
    /// `to_line`.
    ///
    /// The search starts on the directed orientation of `from_line` whose
    /// tail is `from_point` (self-loop lines only have one orientation).
    /// When the search settles a node by a line other than `to_line`, a
    /// synthetic final leg onto `to_line` is appended so the returned path
    /// always ends on the requested destination line, regardless of which
    /// other line sharing that node the search happened to find cheapest —
    /// this is the canonical form chosen to resolve the ambiguity the
    /// original's router backends handled slightly differently for the
    /// final-leg insertion.
    #[allow(clippy::too_many_arguments)]
    pub fn find_route<C: CostFn<G>>(
        &mut self,
        graph: &G,
        cost: &C,
        from_line: G::LineId,
        from_point: G::PointId,
        to_line: G::LineId,
        to_point: G::PointId,
        recalc: bool,
        progress: &mut dyn Progress,
    ) -> Result<RouteSearchResult<G::LineId>, RouteError<G::Error>> {
        let start = directed_edge_from_tail(graph, from_line, from_point).map_err(RouteError::MapQueryFailed)?;
        let (start_from, start_to) = graph.line_endpoints(from_line).map_err(RouteError::MapQueryFailed)?;
        let start_head = if start.reversed { start_from } else { start_to };
        let goal_position = graph.point_position(to_point).map_err(RouteError::MapQueryFailed)?;

        let outcome = astar::search(
            graph,
            &mut self.cache,
            cost,
            start,
            start_head,
            to_point,
            goal_position,
            recalc,
            progress,
        )
        .map_err(RouteError::MapQueryFailed)?;

        match outcome {
            SearchOutcome::Found { path: mut edges, cost } => {
                if edges.last().map(|e| e.line) != Some(to_line) {
                    let last_leg =
                        directed_edge_from_tail(graph, to_line, to_point).map_err(RouteError::MapQueryFailed)?;
                    edges.push(last_leg);
                }
                info!(segments = edges.len(), cost, "route found");
                Ok(RouteSearchResult { edges, cost })
            }
            SearchOutcome::NoPath => {
                warn!("no path between source and destination");
                Err(RouteError::NoPath)
            }
            SearchOutcome::Cancelled => Err(RouteError::Cancelled),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// The directed orientation of `line` whose tail is `tail`.
///
/// Self-loop lines (`from_point == to_point`) only have one orientation, by
/// convention the forward one.
fn directed_edge_from_tail<G: MapQuery>(
    graph: &G,
    line: G::LineId,
    tail: G::PointId,
) -> Result<DirectedEdge<G::LineId>, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(line)?;
    if from_point == to_point {
        return Ok(DirectedEdge::new(line, false));
    }
    Ok(DirectedEdge::new(line, tail != from_point))
}
