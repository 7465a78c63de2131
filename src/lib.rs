#![doc = include_str!("../README.md")]

mod annotate;
mod error;
mod geometry;
mod graph;
mod matcher;
mod model;
mod recalc;
mod routing;
mod snap;
mod trip;

use tracing::{info, warn};

use crate::recalc::{RecalcOutcome, RecalcState};
use crate::routing::astar::Progress;
use crate::trip::{Route, TripState};

pub use crate::annotate::{AnnotatorConfig, Segment};
pub use crate::error::{ConfigError, RecalcError, RouteError};
pub use crate::graph::cache::{GraphCache, GraphCacheConfig};
pub use crate::graph::tile::StreetGraphTile;
pub use crate::graph::MapQuery;
pub use crate::matcher::{fuzzy_and, fuzzy_direction, fuzzy_distance, fuzzy_not, MatchEvent, MatcherConfig, TrackedPosition};
pub use crate::model::{
    Announcement, Azimuth, DirectedEdge, Focus, GpsFix, Layer, Length, Maneuver, Position, Seconds, TrafficDirection,
    VehicleKind,
};
pub use crate::recalc::RecalcConfig;
pub use crate::routing::astar::NoProgress;
pub use crate::routing::cost::{CostFn, DistanceCost, TimeCost, ASSUMED_SPEED_MPS};
pub use crate::routing::{Router, RouterConfig};
pub use crate::snap::SnapConfig;
pub use crate::trip::{TripConfig, TripEvent};

/// The host-implemented callback surface, per §6 "Events emitted". One
/// method per event; default implementations are no-ops so a host only
/// overrides the ones it cares about.
///
/// Modeled as a trait object passed explicitly into the calls that can
/// produce events, per the "plugin seam" design note, rather than stored as
/// `Box<dyn Fn>` fields on [`NavigationCore`].
pub trait NavigationEvents {
    /// A voice/text prompt should fire.
    fn on_instruction(&mut self, _announcement: &Announcement) {}
    /// The upcoming cross-street guess changed; `street_name` is `None` when
    /// the previous guess was cleared without a new one taking its place.
    fn on_approaching(&mut self, _street_name: Option<&str>) {}
    fn on_arrival(&mut self) {}
    fn on_route_changed(&mut self) {}
    fn on_route_lost(&mut self) {}
}

/// Aggregates every component's tunables, per the "C0 Configuration" ambient
/// component: constructed once by the host and threaded through C2-C7 by
/// reference.
#[derive(Debug, Clone, Default)]
pub struct NavigationConfig {
    pub router: RouterConfig,
    pub recalc: RecalcConfig,
    pub trip: TripConfig,
    pub snap: SnapConfig,
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trip.validate()?;
        if self.router.graph_cache.capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }
}

/// The totals a freshly calculated route carries alongside its segments,
/// computed once so the host doesn't need to fold over `route.segments`
/// itself just to show "12 km, 14 min" before navigation starts.
#[derive(Debug, Clone)]
pub struct RouteResult<LineId, StreetId> {
    pub route: Route<LineId, StreetId>,
    pub distance: Length,
    pub eta: Seconds,
}

fn route_totals<LineId, StreetId>(route: &Route<LineId, StreetId>) -> (Length, Seconds) {
    route
        .segments
        .iter()
        .fold((Length::ZERO, Seconds::ZERO), |(d, e), s| (d + s.distance, e + s.cross_time))
}

/// The navigation core (§6): owns the router, the graph-tile cache, the
/// active trip and the recalculation backoff timer, and exposes the small
/// surface a host application drives.
///
/// Generic over the host's map database (`G`) and its chosen cost function
/// (`C`); both are supplied once at construction, per the spec's "plugin
/// seam" design note (a trait for the map query, another for the cost
/// function, passed explicitly rather than selected through a global).
pub struct NavigationCore<G: MapQuery, C: CostFn<G>> {
    graph: G,
    cost: C,
    config: NavigationConfig,
    router: Router<G>,
    graph_cache: GraphCache<G>,
    trip: TripState<G>,
    recalc_state: RecalcState,
    pending_route: Option<Route<G::LineId, G::StreetId>>,
    departure: Option<Position>,
    destination: Option<Position>,
    last_gps_position: Option<Position>,
    last_heading: Option<Azimuth>,
    focus_position: Option<Position>,
}

impl<G: MapQuery, C: CostFn<G>> NavigationCore<G, C> {
    pub fn new(graph: G, cost: C, config: NavigationConfig) -> Self {
        let router = Router::new(config.router);
        let graph_cache = GraphCache::new(config.router.graph_cache);
        Self {
            graph,
            cost,
            config,
            router,
            graph_cache,
            trip: TripState::new(),
            recalc_state: RecalcState::default(),
            pending_route: None,
            departure: None,
            destination: None,
            last_gps_position: None,
            last_heading: None,
            focus_position: None,
        }
    }

    pub fn map(&self) -> &G {
        &self.graph
    }

    pub fn set_destination(&mut self, position: Position) {
        self.destination = Some(position);
    }

    pub fn set_departure(&mut self, position: Position) {
        self.departure = Some(position);
    }

    /// Synchronous route calculation (§2's static flow): snaps both ends to
    /// the street graph, runs the router, annotates the result, and stashes
    /// it so a subsequent [`Self::start_navigation`] can install it.
    ///
    /// Does not itself start navigation; the host decides when to do that,
    /// per §6 listing `calculate_route` and `start_navigation` as separate
    /// entry points.
    pub fn calculate_route(
        &mut self,
        progress: &mut dyn Progress,
    ) -> Result<RouteResult<G::LineId, G::StreetId>, RouteError<G::Error>> {
        let source_pos = self
            .departure
            .or(self.last_gps_position)
            .ok_or(RouteError::NoNearbyRoadSource)?;
        let dest_pos = self.destination.ok_or(RouteError::NoNearbyRoadDestination)?;

        let result = self.route_between(source_pos, dest_pos, self.last_heading, progress)?;
        self.pending_route = Some(result.route.clone());
        Ok(result)
    }

    /// Swaps departure and destination and recalculates, per §6
    /// `reverse_route()`. If navigation was active, the new route replaces
    /// the old one and navigation restarts from its first segment.
    pub fn reverse_route(
        &mut self,
        progress: &mut dyn Progress,
    ) -> Result<RouteResult<G::LineId, G::StreetId>, RouteError<G::Error>> {
        let was_active = self.trip.route_active;
        let new_departure = self.destination.or(self.last_gps_position);
        self.destination = self.departure.or(self.destination);
        self.departure = new_departure;

        let result = self.calculate_route(progress)?;
        if was_active {
            self.start_navigation();
        }
        Ok(result)
    }

    /// Installs the route computed by the last [`Self::calculate_route`]
    /// call as the current route and begins navigating it. Returns `false`
    /// (and does nothing) if no route is pending.
    pub fn start_navigation(&mut self) -> bool {
        match self.pending_route.take() {
            Some(route) => {
                self.trip.start_navigation(route);
                true
            }
            None => false,
        }
    }

    pub fn stop_navigation(&mut self) {
        self.trip.stop_navigation();
    }

    pub fn route_active(&self) -> bool {
        self.trip.route_active
    }

    pub fn current_route(&self) -> Option<&Route<G::LineId, G::StreetId>> {
        self.trip.route.as_ref()
    }

    /// The single entry point for live GPS input (§6). Runs map-matching,
    /// advances the trip cursor, fires announcements/arrival, and — on a
    /// declared deviation — orchestrates the recalculator (C7) itself
    /// before returning, so the host only ever observes the net result
    /// through `events`.
    pub fn on_gps_fix(&mut self, fix: GpsFix, events: &mut dyn NavigationEvents) -> Result<(), RecalcError<G::Error>> {
        self.last_gps_position = Some(fix.position);
        self.last_heading = Some(fix.steering);

        let trip_events = trip::on_gps_fix(&self.graph, &mut self.graph_cache, &self.config.trip, &mut self.trip, fix)
            .map_err(|e| RecalcError::RouteFailed(RouteError::MapQueryFailed(e)))?;

        let mut deviated = false;
        for event in trip_events {
            match event {
                TripEvent::Announcement(announcement) => events.on_instruction(&announcement),
                TripEvent::Approaching(street_name) => events.on_approaching(street_name.as_deref()),
                TripEvent::Arrived => events.on_arrival(),
                TripEvent::Deviated => deviated = true,
            }
        }

        if deviated {
            self.recalculate_from(fix.position, fix.gps_time, events)?;
        }

        Ok(())
    }

    /// Re-snaps `current_position` onto the street graph rather than trusting
    /// the matcher's last confirmed edge, so a deviation that drops tracking
    /// entirely (off any road) recovers the same way as one that merely
    /// settles on the wrong edge.
    fn recalculate_from(
        &mut self,
        current_position: Position,
        now: i64,
        events: &mut dyn NavigationEvents,
    ) -> Result<(), RecalcError<G::Error>> {
        let Some(dest_pos) = self.destination else {
            return Ok(());
        };

        let Some((from_line, from_point, _)) =
            snap::snap_source(&self.graph, &self.config.snap, current_position, dest_pos, self.last_heading)
                .map_err(RouteError::MapQueryFailed)?
        else {
            warn!("current position no longer snaps to any line during recalculation");
            events.on_route_lost();
            return Ok(());
        };

        let Some((to_line, to_point, _)) = snap::snap_destination(&self.graph, &self.config.snap, dest_pos, current_position)
            .map_err(RouteError::MapQueryFailed)?
        else {
            warn!("destination no longer snaps to any line during recalculation");
            events.on_route_lost();
            return Ok(());
        };

        let outcome = recalc::recalculate(
            &self.graph,
            &mut self.router,
            &mut self.graph_cache,
            &self.config.recalc,
            &mut self.recalc_state,
            &self.cost,
            now,
            from_line,
            from_point,
            to_line,
            to_point,
            current_position,
            dest_pos,
        )?;

        match outcome {
            RecalcOutcome::Replaced(route) => {
                self.trip.start_navigation(route);
                info!("route replaced after deviation");
                events.on_route_changed();
            }
            RecalcOutcome::Failed => {
                events.on_route_lost();
            }
            RecalcOutcome::StillBackingOff => {}
        }

        Ok(())
    }

    pub fn set_focus(&mut self, focus: Focus, position: Option<Position>) {
        self.trip.focus = focus;
        self.focus_position = position;
    }

    /// The current focus kind and the position the map should center on.
    pub fn get_focus(&self) -> (Focus, Option<Position>) {
        let position = match self.trip.focus {
            Focus::Gps => self
                .trip
                .matched
                .as_ref()
                .map(|tracked| tracked.approach)
                .or(self.last_gps_position),
            Focus::Destination => self.destination,
            Focus::Departure => self.departure,
            Focus::Selection | Focus::Address | Focus::Hold | Focus::Waypoint(_) => self.focus_position,
        };
        (self.trip.focus, position)
    }

    fn route_between(
        &mut self,
        source_pos: Position,
        dest_pos: Position,
        heading: Option<Azimuth>,
        progress: &mut dyn Progress,
    ) -> Result<RouteResult<G::LineId, G::StreetId>, RouteError<G::Error>> {
        let (from_line, from_point, _) = snap::snap_source(&self.graph, &self.config.snap, source_pos, dest_pos, heading)
            .map_err(RouteError::MapQueryFailed)?
            .ok_or(RouteError::NoNearbyRoadSource)?;

        let (to_line, to_point, _) = snap::snap_destination(&self.graph, &self.config.snap, dest_pos, source_pos)
            .map_err(RouteError::MapQueryFailed)?
            .ok_or(RouteError::NoNearbyRoadDestination)?;

        let search = self.router.find_route(
            &self.graph,
            &self.cost,
            from_line,
            from_point,
            to_line,
            to_point,
            false,
            progress,
        )?;

        let segments = annotate::annotate(
            &self.graph,
            &mut self.graph_cache,
            &self.config.recalc.annotator,
            &search.edges,
            source_pos,
            dest_pos,
        )
        .map_err(RouteError::MapQueryFailed)?;

        let route = Route { segments };
        let (distance, eta) = route_totals(&route);
        Ok(RouteResult { route, distance, eta })
    }
}
