//! The Route Recalculator (C7): invokes the router (C3) on deviation, with
//! a backoff timer so repeated deviations don't hammer the router.
//! Grounded in `navigate_main.c`'s `navigate_main_recalc_route` and spec
//! §4.7.

use tracing::{info, warn};

use crate::annotate::{self, AnnotatorConfig};
use crate::error::RouteError;
use crate::graph::cache::GraphCache;
use crate::model::Position;
use crate::routing::astar::NoProgress;
use crate::routing::cost::CostFn;
use crate::routing::Router;
use crate::trip::Route;
use crate::MapQuery;

#[derive(Debug, Clone, Copy)]
pub struct RecalcConfig {
    pub annotator: AnnotatorConfig,
    /// Minimum time, in seconds, between recalculation attempts after a
    /// router failure — an explicit tunable for the "don't hammer the
    /// router" behavior implicit in the original's single-shot retry.
    pub backoff_secs: u32,
}

impl Default for RecalcConfig {
    fn default() -> Self {
        Self {
            annotator: AnnotatorConfig::default(),
            backoff_secs: 5,
        }
    }
}

/// Tracks the backoff timer across attempts. Owned by whatever drives the
/// event loop (`NavigationCore`), alongside the [`crate::trip::TripState`]
/// it recalculates on behalf of.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalcState {
    /// `gps_time` of the last failed attempt, if any.
    last_failure_at: Option<i64>,
}

impl RecalcState {
    fn ready(&self, config: &RecalcConfig, now: i64) -> bool {
        match self.last_failure_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= config.backoff_secs as i64,
        }
    }
}

/// Result of a recalculation attempt.
pub enum RecalcOutcome<LineId, StreetId> {
    /// A new route was found; the caller should replace `current_route` and
    /// reset `current_segment_idx` to 0.
    Replaced(Route<LineId, StreetId>),
    /// The backoff interval since the last failure hasn't elapsed yet; no
    /// attempt was made.
    StillBackingOff,
    /// The router failed; the caller should keep the old route, emit a
    /// "lost route" event, and leave the controller in recovery.
    Failed,
}

/// Recalculates from `from_line`/`from_point` (the currently matched edge)
/// to `to_line`/`to_point` (the destination, possibly still mid-line).
#[allow(clippy::too_many_arguments)]
pub fn recalculate<G: MapQuery, C: CostFn<G>>(
    graph: &G,
    router: &mut Router<G>,
    graph_cache: &mut GraphCache<G>,
    config: &RecalcConfig,
    state: &mut RecalcState,
    cost: &C,
    now: i64,
    from_line: G::LineId,
    from_point: G::PointId,
    to_line: G::LineId,
    to_point: G::PointId,
    source_pos: Position,
    dest_pos: Position,
) -> Result<RecalcOutcome<G::LineId, G::StreetId>, RouteError<G::Error>> {
    if !state.ready(config, now) {
        return Ok(RecalcOutcome::StillBackingOff);
    }

    let result = router.find_route(
        graph,
        cost,
        from_line,
        from_point,
        to_line,
        to_point,
        true,
        &mut NoProgress,
    );

    match result {
        Ok(search) => {
            let segments = annotate::annotate(graph, graph_cache, &config.annotator, &search.edges, source_pos, dest_pos)
                .map_err(RouteError::MapQueryFailed)?;
            state.last_failure_at = None;
            info!("route recalculated");
            Ok(RecalcOutcome::Replaced(Route { segments }))
        }
        Err(RouteError::NoPath) | Err(RouteError::Cancelled) => {
            warn!("recalculation failed, backing off");
            state.last_failure_at = Some(now);
            Ok(RecalcOutcome::Failed)
        }
        Err(other) => Err(other),
    }
}
