//! The Trip Controller (C6): owns the active route and the map-matching
//! belief, advances the current segment, maintains distance/ETA-to-turn
//! bookkeeping and the announce schedule, and reports deviations for the
//! route recalculator (C7) to act on.
//!
//! Grounded in `navigate_main.c`'s global state (`NavigateCurrentSegment`,
//! `NavigateDistanceToTurn`, `NavigateNextAnnounce`, `NavigateFlags`), made
//! explicit as struct fields per the "global state → explicit" design note.

use tracing::debug;

use crate::annotate::{self, Segment};
use crate::error::ConfigError;
use crate::graph::cache::GraphCache;
use crate::matcher::{self, MatchEvent, MatcherConfig, TrackedPosition};
use crate::model::{Announcement, Focus, GpsFix, Length, Maneuver, Seconds};
use crate::MapQuery;

/// Tunables for the announce schedule and arrival detection, named in
/// spec §4.6.
#[derive(Debug, Clone)]
pub struct TripConfig {
    pub matcher: MatcherConfig,
    /// Distances, in meters, at which a voice prompt fires before a turn.
    /// Must be strictly decreasing (e.g. `[800, 200, 50]`).
    pub announce_thresholds: Vec<u32>,
    /// Slack added to a threshold so a prompt fires on the first fix at or
    /// under it rather than being skipped between two fixes (`COMPENSATE`
    /// in the original).
    pub announce_compensate: u32,
    /// Distance, in meters, at or under which `ApproachingDestination`
    /// triggers arrival.
    pub arrival_radius: u32,
}

impl TripConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.announce_thresholds.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ConfigError::AnnounceThresholdsNotDecreasing);
        }
        Ok(())
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            announce_thresholds: vec![800, 200, 50],
            announce_compensate: 20,
            arrival_radius: 20,
        }
    }
}

/// An ordered sequence of annotated segments, source-to-destination.
#[derive(Debug, Clone)]
pub struct Route<LineId, StreetId> {
    pub segments: Vec<Segment<LineId, StreetId>>,
}

/// Events the trip controller produces for a single GPS fix. The host
/// translates these into its `on_instruction`/`on_arrival` callbacks;
/// `Deviated` is consumed internally by the route recalculator (C7).
#[derive(Debug, Clone, PartialEq)]
pub enum TripEvent {
    Announcement(Announcement),
    /// The upcoming cross-street guess changed (§4.5's "Emit Approaching X").
    Approaching(Option<String>),
    Arrived,
    Deviated,
}

/// The trip state machine's fields, per spec §3 "Trip state". Exclusively
/// owns the current route and the map-matching belief; every other
/// component receives borrowed views.
pub struct TripState<G: MapQuery> {
    pub route: Option<Route<G::LineId, G::StreetId>>,
    pub current_segment_idx: usize,
    pub route_active: bool,
    pub distance_to_destination: Length,
    pub eta: Seconds,
    pub distance_to_turn: Length,
    pub eta_to_turn: Seconds,
    pub focus: Focus,
    pub matched: Option<TrackedPosition<G>>,
    /// Set while a deviation has been declared and recalculation has not
    /// yet replaced the route; step 3 of §4.6 suppresses instructions
    /// while this is set.
    pub in_recovery: bool,
    next_announce_distance: Option<u32>,
    announced_group: Option<u32>,
}

impl<G: MapQuery> Default for TripState<G> {
    fn default() -> Self {
        Self {
            route: None,
            current_segment_idx: 0,
            route_active: false,
            distance_to_destination: Length::ZERO,
            eta: Seconds::ZERO,
            distance_to_turn: Length::ZERO,
            eta_to_turn: Seconds::ZERO,
            focus: Focus::default(),
            matched: None,
            in_recovery: false,
            next_announce_distance: None,
            announced_group: None,
        }
    }
}

impl<G: MapQuery> TripState<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins navigating `route`: resets the segment cursor to its start
    /// and the announce schedule, and centers the focus on the live GPS
    /// position, per §4.6 "Starting a route".
    pub fn start_navigation(&mut self, route: Route<G::LineId, G::StreetId>) {
        self.route = Some(route);
        self.current_segment_idx = 0;
        self.route_active = true;
        self.in_recovery = false;
        self.next_announce_distance = None;
        self.announced_group = None;
        self.focus = Focus::Gps;
    }

    pub fn stop_navigation(&mut self) {
        self.route_active = false;
    }
}

/// Runs one fix through map-matching (C5) and the trip bookkeeping above,
/// returning the events the host (or the route recalculator, for
/// `Deviated`) should react to.
pub fn on_gps_fix<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    config: &TripConfig,
    state: &mut TripState<G>,
    fix: GpsFix,
) -> Result<Vec<TripEvent>, G::Error> {
    if !state.route_active {
        return Ok(Vec::new());
    }

    let match_events = matcher::on_gps_fix(graph, cache, &config.matcher, &mut state.matched, fix)?;

    let mut events = Vec::new();
    for event in match_events {
        if let MatchEvent::Approaching(street) = event {
            let name = match street {
                Some(s) => Some(graph.street_name(s)?),
                None => None,
            };
            events.push(TripEvent::Approaching(name));
        }
    }

    let Some(route) = state.route.as_ref() else {
        return Ok(events);
    };

    let Some(tracked) = state.matched.as_ref() else {
        state.in_recovery = true;
        events.push(TripEvent::Deviated);
        return Ok(events);
    };
    let approach = tracked.approach;
    let tracked_edge = tracked.directed_edge;

    let current_edge = route.segments[state.current_segment_idx].directed_edge;
    if tracked_edge != current_edge {
        let next_match = ((state.current_segment_idx + 1)..route.segments.len())
            .find(|&i| route.segments[i].directed_edge == tracked_edge);

        match next_match {
            Some(i) => {
                debug!(from = state.current_segment_idx, to = i, "advanced current segment");
                state.current_segment_idx = i;
                state.in_recovery = false;
            }
            None => {
                state.in_recovery = true;
                events.push(TripEvent::Deviated);
                return Ok(events);
            }
        }
    } else if state.in_recovery {
        state.in_recovery = false;
    }

    let current = &route.segments[state.current_segment_idx];

    if state.announced_group != Some(current.group_id) {
        state.next_announce_distance = None;
        state.announced_group = Some(current.group_id);
    }

    let (distance_to_turn, eta_to_turn) =
        distance_eta_to_turn(graph, &route.segments, state.current_segment_idx, approach);
    state.distance_to_turn = distance_to_turn;
    state.eta_to_turn = eta_to_turn;

    let (beyond_distance, beyond_eta) = distance_eta_beyond_group(&route.segments, state.current_segment_idx);
    state.distance_to_destination = distance_to_turn + beyond_distance;
    state.eta = eta_to_turn + beyond_eta;

    if state.next_announce_distance.is_none() {
        state.next_announce_distance = Some(initial_next_announce(&config.announce_thresholds, distance_to_turn.meters()));
    }

    if let Some(next) = state.next_announce_distance
        && distance_to_turn.meters() <= next + config.announce_compensate
    {
        let named_idx = next_group_start(&route.segments, state.current_segment_idx);
        let street_name = match route.segments[named_idx].street {
            Some(street) => Some(graph.street_name(street)?),
            None => None,
        };

        let tail = &route.segments[group_tail(&route.segments, state.current_segment_idx)];

        events.push(TripEvent::Announcement(Announcement {
            maneuver: tail.instruction,
            street_name,
            distance_hint: Length::from_meters(next),
        }));

        state.next_announce_distance = next_smaller_announce(&config.announce_thresholds, next);
    }

    if current.instruction == Maneuver::ApproachingDestination && distance_to_turn.meters() <= config.arrival_radius {
        state.route_active = false;
        events.push(TripEvent::Arrived);
    }

    Ok(events)
}

/// Distance and ETA from `approach` to the far end of the current segment's
/// maneuver group: the remainder of the current segment plus every segment
/// sharing its `group_id`, per §4.6 steps 4-5.
fn distance_eta_to_turn<G: MapQuery>(
    graph: &G,
    segments: &[Segment<G::LineId, G::StreetId>],
    current_idx: usize,
    approach: crate::model::Position,
) -> (Length, Seconds) {
    let current = &segments[current_idx];
    let remaining = annotate::distance_to_end(graph, current, approach);

    let segment_length = current.distance.meters().max(1) as f64;
    let eta = Seconds::from_secs((current.cross_time.as_secs() as f64 * remaining.meters() as f64 / segment_length).round() as u32);

    let group = current.group_id;
    let tail = segments[current_idx + 1..].iter().take_while(|s| s.group_id == group);

    tail.fold((remaining, eta), |(d, e), s| (d + s.distance, e + s.cross_time))
}

/// Distance and ETA of every segment beyond the current maneuver group, to
/// the end of the route.
fn distance_eta_beyond_group<LineId, StreetId>(
    segments: &[Segment<LineId, StreetId>],
    current_idx: usize,
) -> (Length, Seconds) {
    let group = segments[current_idx].group_id;
    let beyond = segments[current_idx..].iter().skip_while(|s| s.group_id == group);
    beyond.fold((Length::ZERO, Seconds::ZERO), |(d, e), s| (d + s.distance, e + s.cross_time))
}

/// Index of the first segment of the maneuver group following the current
/// one (the street the driver will be on after completing the turn), or the
/// last segment if the current group runs to the end of the route.
fn next_group_start<LineId, StreetId>(segments: &[Segment<LineId, StreetId>], current_idx: usize) -> usize {
    let group = segments[current_idx].group_id;
    segments
        .iter()
        .enumerate()
        .skip(current_idx)
        .find(|(_, s)| s.group_id != group)
        .map(|(i, _)| i)
        .unwrap_or(segments.len() - 1)
}

/// Index of the last segment sharing `current_idx`'s `group_id`: the tail of
/// the current maneuver group, whose `instruction` is the maneuver a driver
/// should actually be told about (the turn itself lives on the group's last
/// segment; interior segments are `Continue`).
fn group_tail<LineId, StreetId>(segments: &[Segment<LineId, StreetId>], current_idx: usize) -> usize {
    let group = segments[current_idx].group_id;
    segments
        .iter()
        .enumerate()
        .skip(current_idx)
        .take_while(|(_, s)| s.group_id == group)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(current_idx)
}

/// The smallest threshold greater than `distance_to_turn`, or the smallest
/// threshold at all if none qualifies, per `navigate_update`'s
/// initialization loop (it only scans all-but-the-last threshold, falling
/// back to the last).
fn initial_next_announce(thresholds: &[u32], distance_to_turn: u32) -> u32 {
    let without_last = &thresholds[..thresholds.len().saturating_sub(1)];
    for &threshold in without_last {
        if distance_to_turn > threshold {
            return threshold;
        }
    }
    thresholds.last().copied().unwrap_or(0)
}

/// The next threshold to re-arm after firing `fired`, or `None` if no
/// smaller threshold is still ahead (no more prompts until the maneuver
/// group changes). Keyed off the threshold that just fired rather than the
/// live `distance_to_turn`: firing adds `announce_compensate` slack, so a
/// live-distance compare could re-select the threshold that just fired on
/// the very next fix, re-announcing it and breaking the schedule's strictly
/// decreasing guarantee.
fn next_smaller_announce(thresholds: &[u32], fired: u32) -> Option<u32> {
    thresholds.iter().copied().find(|&threshold| threshold < fired)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::graph::cache::GraphCacheConfig;
    use crate::model::{Azimuth, DirectedEdge, Layer, Position, TrafficDirection, VehicleKind};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PointId(pub u32);
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct LineId(pub u32);
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SquareId;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct StreetId(pub u32);

    /// A straight two-block street, 1 -> 2 -> 3, 1000m apiece, one street.
    struct TripTestGraph {
        points: FxHashMap<PointId, Position>,
        lines: FxHashMap<LineId, (PointId, PointId)>,
    }

    impl TripTestGraph {
        fn new() -> Self {
            let points = FxHashMap::from_iter([
                (PointId(1), Position::new(0, 0)),
                (PointId(2), Position::new(1_000_000, 0)),
                (PointId(3), Position::new(2_000_000, 0)),
            ]);
            let lines = FxHashMap::from_iter([
                (LineId(1), (PointId(1), PointId(2))),
                (LineId(2), (PointId(2), PointId(3))),
            ]);
            Self { points, lines }
        }
    }

    impl MapQuery for TripTestGraph {
        type Error = Infallible;
        type PointId = PointId;
        type LineId = LineId;
        type SquareId = SquareId;
        type StreetId = StreetId;

        fn line_endpoints(&self, line: LineId) -> Result<(PointId, PointId), Infallible> {
            Ok(self.lines[&line])
        }

        fn point_position(&self, point: PointId) -> Result<Position, Infallible> {
            Ok(self.points[&point])
        }

        fn point_square(&self, _point: PointId) -> Result<SquareId, Infallible> {
            Ok(SquareId)
        }

        fn line_shape(&self, _line: LineId) -> Result<Vec<Position>, Infallible> {
            Ok(vec![])
        }

        fn line_layer(&self, _line: LineId) -> Result<Layer, Infallible> {
            Ok(Layer(0))
        }

        fn line_direction(&self, _line: LineId, _kind: VehicleKind) -> Result<TrafficDirection, Infallible> {
            Ok(TrafficDirection::Both)
        }

        fn line_cross_time(&self, line: LineId, _reversed: bool) -> Result<Seconds, Infallible> {
            self.line_length(line).map(|l| Seconds::from_secs(l.meters() / 10))
        }

        fn line_length(&self, line: LineId) -> Result<Length, Infallible> {
            let (from, to) = self.lines[&line];
            Ok(self.distance(self.points[&from], self.points[&to]))
        }

        fn line_street(&self, _line: LineId) -> Result<Option<StreetId>, Infallible> {
            Ok(Some(StreetId(1)))
        }

        fn street_name(&self, _street: StreetId) -> Result<String, Infallible> {
            Ok("Main".into())
        }

        fn turn_restricted(&self, _via: PointId, _from: LineId, _to: LineId) -> Result<bool, Infallible> {
            Ok(false)
        }

        fn lines_in_square(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
            let mut lines: Vec<_> = self.lines.keys().copied().collect();
            lines.sort();
            Ok(lines)
        }

        fn lines_in_square_incoming(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
            Ok(vec![])
        }

        fn line_count(&self) -> Result<usize, Infallible> {
            Ok(self.lines.len())
        }

        fn navigable_layers(&self, _kind: VehicleKind) -> Result<Vec<Layer>, Infallible> {
            Ok(vec![Layer(0)])
        }

        fn square_at_position(&self, _position: Position) -> Result<Option<SquareId>, Infallible> {
            Ok(Some(SquareId))
        }
    }

    fn two_segment_route(graph: &TripTestGraph) -> Route<LineId, StreetId> {
        let mut cache = GraphCache::new(GraphCacheConfig::default());
        let config = crate::annotate::AnnotatorConfig::default();
        let edges = vec![DirectedEdge::new(LineId(1), false), DirectedEdge::new(LineId(2), false)];
        let source = graph.point_position(PointId(1)).unwrap();
        let dest = graph.point_position(PointId(3)).unwrap();
        let segments = crate::annotate::annotate(graph, &mut cache, &config, &edges, source, dest).unwrap();
        Route { segments }
    }

    fn fix_at(position: Position, steering_degrees: f64) -> GpsFix {
        GpsFix {
            gps_time: 0,
            precision: Length::from_meters(5),
            position,
            altitude_meters: 0.0,
            speed_knots: 10.0,
            steering: Azimuth::from_degrees(steering_degrees),
        }
    }

    #[test]
    fn initializes_next_announce_from_the_largest_exceeded_threshold() {
        assert_eq!(initial_next_announce(&[800, 200, 50], 1_000), 800);
        assert_eq!(initial_next_announce(&[800, 200, 50], 500), 200);
        assert_eq!(initial_next_announce(&[800, 200, 50], 100), 50);
    }

    #[test]
    fn no_fix_ever_arrives_while_navigation_is_inactive() {
        let graph = TripTestGraph::new();
        let mut cache = GraphCache::new(GraphCacheConfig::default());
        let config = TripConfig::default();
        let mut state: TripState<TripTestGraph> = TripState::new();

        let events = on_gps_fix(&graph, &mut cache, &config, &mut state, fix_at(Position::new(500_000, 0), 90.0)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn advancing_along_the_route_updates_the_segment_cursor() {
        let graph = TripTestGraph::new();
        let mut cache = GraphCache::new(GraphCacheConfig::default());
        let config = TripConfig::default();
        let mut state: TripState<TripTestGraph> = TripState::new();
        state.start_navigation(two_segment_route(&graph));

        on_gps_fix(&graph, &mut cache, &config, &mut state, fix_at(Position::new(500_000, 0), 90.0)).unwrap();
        assert_eq!(state.current_segment_idx, 0);

        on_gps_fix(&graph, &mut cache, &config, &mut state, fix_at(Position::new(1_500_000, 0), 90.0)).unwrap();
        assert_eq!(state.current_segment_idx, 1);
    }

    #[test]
    fn arrival_fires_when_within_radius_of_the_destination() {
        let graph = TripTestGraph::new();
        let mut cache = GraphCache::new(GraphCacheConfig::default());
        let config = TripConfig::default();
        let mut state: TripState<TripTestGraph> = TripState::new();
        state.start_navigation(two_segment_route(&graph));

        let events = on_gps_fix(&graph, &mut cache, &config, &mut state, fix_at(Position::new(1_999_995, 0), 90.0)).unwrap();

        assert!(events.contains(&TripEvent::Arrived));
        assert!(!state.route_active);
    }

    #[test]
    fn a_fix_on_neither_segment_is_a_deviation() {
        let graph = TripTestGraph::new();
        let mut cache = GraphCache::new(GraphCacheConfig::default());
        let config = TripConfig::default();
        let mut state: TripState<TripTestGraph> = TripState::new();
        state.start_navigation(two_segment_route(&graph));

        let events =
            on_gps_fix(&graph, &mut cache, &config, &mut state, fix_at(Position::new(50_000_000, 50_000_000), 90.0)).unwrap();

        assert!(events.contains(&TripEvent::Deviated));
        assert!(state.in_recovery);
    }
}
