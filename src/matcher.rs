//! The Map-Matcher (C5): fuzzy scoring of live GPS fixes against the street
//! graph, grounded in `roadmap_navigate.c`'s `roadmap_navigate_fuzzify` /
//! `roadmap_navigate_find_intersection`. Called synchronously from the
//! trip controller's `on_gps_fix` (§5: single-threaded, no re-entrancy).

use crate::graph::cache::GraphCache;
use crate::graph::tile::successors;
use crate::model::{Azimuth, DirectedEdge, GpsFix, Length, Position};
use crate::MapQuery;

/// Tunables for fuzzy scoring, named in spec §4.5.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Distance, in meters, beyond which [`fuzzy_distance`] is zero.
    pub max_acceptable_distance: Length,
    /// Angular window, in degrees, beyond which [`fuzzy_direction`] is zero.
    pub direction_tolerance_degrees: f64,
    /// Minimum combined score for a match to be considered acceptable.
    pub acceptable_threshold: f64,
    /// Below this speed (knots), GPS heading is unreliable; fixes are
    /// ignored for map-matching purposes.
    pub speed_floor_knots: f64,
    /// Minimum degrees of separation required between the heading deltas to
    /// the two endpoints of the confirmed edge before picking one as "ahead".
    pub intersection_heading_spread_degrees: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_acceptable_distance: Length::from_meters(30),
            direction_tolerance_degrees: 45.0,
            acceptable_threshold: 0.3,
            speed_floor_knots: 3.0,
            intersection_heading_spread_degrees: 30.0,
        }
    }
}

/// 1.0 at `distance = 0`, ramping linearly to 0.0 at `max`.
pub fn fuzzy_distance(distance: Length, max: Length) -> f64 {
    if max.meters() == 0 {
        return if distance.meters() == 0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance.meters() as f64 / max.meters() as f64).clamp(0.0, 1.0)
}

/// 1.0 when `a` and `b` agree exactly, decaying to 0.0 beyond `tolerance_degrees`.
pub fn fuzzy_direction(a: Azimuth, b: Azimuth, tolerance_degrees: f64) -> f64 {
    if tolerance_degrees <= 0.0 {
        return if a.delta(b) == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - a.delta(b).abs() / tolerance_degrees).clamp(0.0, 1.0)
}

pub fn fuzzy_and(a: f64, b: f64) -> f64 {
    a.min(b)
}

pub fn fuzzy_not(a: f64) -> f64 {
    1.0 - a
}

/// The current map-matching belief: which directed edge the user is on.
#[derive(Debug, Clone)]
pub struct TrackedPosition<G: MapQuery> {
    pub directed_edge: DirectedEdge<G::LineId>,
    pub score: f64,
    /// GPS position projected onto `directed_edge`.
    pub approach: Position,
    pub azimuth: Azimuth,
    pub street: Option<G::StreetId>,
    /// The currently announced "approaching" cross street, if any.
    pub upcoming_intersection: Option<G::StreetId>,
}

/// Events the matcher surfaces to the trip controller for a single fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent<StreetId> {
    /// The confirmed edge changed (or was found for the first time).
    StreetChanged,
    /// The upcoming-intersection guess changed; carries the new guess.
    Approaching(Option<StreetId>),
    /// Map-matching lost confidence; no edge is confirmed any more.
    Lost,
}

/// Runs one fix through the matcher, mutating `state` in place and
/// returning the events it produced.
pub fn on_gps_fix<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    config: &MatcherConfig,
    state: &mut Option<TrackedPosition<G>>,
    fix: GpsFix,
) -> Result<Vec<MatchEvent<G::StreetId>>, G::Error> {
    if fix.speed_knots < config.speed_floor_knots {
        return Ok(Vec::new());
    }

    if let Some(tracked) = state.as_ref() {
        let (score, approach) = score_distance_direction(graph, tracked.directed_edge, fix, config)?;
        if score >= config.acceptable_threshold {
            let tracked = state.as_mut().expect("checked Some above");
            tracked.score = score;
            tracked.approach = approach;

            let guess = intersection_guess(graph, cache, config, tracked, fix)?;
            if guess != tracked.upcoming_intersection {
                tracked.upcoming_intersection = guess;
                return Ok(vec![MatchEvent::Approaching(guess)]);
            }
            return Ok(Vec::new());
        }
    }

    let previous = state.as_ref();
    let best = find_best_candidate(graph, config, fix, previous)?;

    match best {
        Some((edge, score, approach, azimuth, street)) if score >= config.acceptable_threshold => {
            let changed = !matches!(previous, Some(tracked) if tracked.directed_edge == edge);
            *state = Some(TrackedPosition {
                directed_edge: edge,
                score,
                approach,
                azimuth,
                street,
                upcoming_intersection: None,
            });
            Ok(if changed { vec![MatchEvent::StreetChanged] } else { Vec::new() })
        }
        _ => {
            let was_tracked = state.is_some();
            *state = None;
            Ok(if was_tracked { vec![MatchEvent::Lost] } else { Vec::new() })
        }
    }
}

/// Re-scores the currently confirmed edge against a new fix (the "fast
/// path" of §4.5's per-fix procedure: distance and direction only, no
/// connectivity term, since the edge is trivially connected to itself).
fn score_distance_direction<G: MapQuery>(
    graph: &G,
    edge: DirectedEdge<G::LineId>,
    fix: GpsFix,
    config: &MatcherConfig,
) -> Result<(f64, Position), G::Error> {
    let (tail_pos, head_pos) = edge_positions(graph, edge)?;
    let (distance, approach) = graph.distance_from_segment(fix.position, tail_pos, head_pos);
    let azimuth = graph.azimuth(tail_pos, head_pos);

    let score = fuzzy_and(
        fuzzy_distance(distance, config.max_acceptable_distance),
        fuzzy_direction(fix.steering, azimuth, config.direction_tolerance_degrees),
    );
    Ok((score, approach))
}

#[allow(clippy::type_complexity)]
fn find_best_candidate<G: MapQuery>(
    graph: &G,
    config: &MatcherConfig,
    fix: GpsFix,
    previous: Option<&TrackedPosition<G>>,
) -> Result<Option<(DirectedEdge<G::LineId>, f64, Position, Azimuth, Option<G::StreetId>)>, G::Error> {
    let Some(square) = graph.square_at_position(fix.position)? else {
        return Ok(None);
    };

    let mut best: Option<(DirectedEdge<G::LineId>, f64, Position, Azimuth, Option<G::StreetId>)> = None;

    for layer in graph.navigable_layers(crate::model::VehicleKind::Car)? {
        let mut lines = graph.lines_in_square(square, layer)?;
        lines.extend(graph.lines_in_square_incoming(square, layer)?);

        for line in lines {
            for reversed in [false, true] {
                let direction = graph.line_direction(line, crate::model::VehicleKind::Car)?;
                if !direction.allows(reversed) {
                    continue;
                }

                let edge = DirectedEdge::new(line, reversed);
                let (score, approach, azimuth) = score_candidate(graph, edge, fix, previous, config)?;

                if best.as_ref().is_none_or(|&(_, best_score, ..)| score > best_score) {
                    let street = graph.line_street(line)?;
                    best = Some((edge, score, approach, azimuth, street));
                }
            }
        }
    }

    Ok(best)
}

fn score_candidate<G: MapQuery>(
    graph: &G,
    candidate: DirectedEdge<G::LineId>,
    fix: GpsFix,
    previous: Option<&TrackedPosition<G>>,
    config: &MatcherConfig,
) -> Result<(f64, Position, Azimuth), G::Error> {
    let (tail_point, head_point) = directed_endpoints(graph, candidate)?;
    let tail_pos = graph.point_position(tail_point)?;
    let head_pos = graph.point_position(head_point)?;

    let (distance, approach) = graph.distance_from_segment(fix.position, tail_pos, head_pos);
    let azimuth = graph.azimuth(tail_pos, head_pos);

    let fdist = fuzzy_distance(distance, config.max_acceptable_distance);
    let fdir = fuzzy_direction(fix.steering, azimuth, config.direction_tolerance_degrees);

    let fconnected = match previous {
        None => 1.0,
        Some(tracked) => {
            let (_, prev_head) = directed_endpoints(graph, tracked.directed_edge)?;
            if tail_point == prev_head || head_point == prev_head {
                1.0
            } else {
                let prev_head_pos = graph.point_position(prev_head)?;
                fuzzy_distance(graph.distance(tail_pos, prev_head_pos), config.max_acceptable_distance) * 0.5
            }
        }
    };

    let score = fuzzy_and(fconnected, fuzzy_and(fdist, fdir));
    Ok((score, approach, azimuth))
}

fn directed_endpoints<G: MapQuery>(
    graph: &G,
    edge: DirectedEdge<G::LineId>,
) -> Result<(G::PointId, G::PointId), G::Error> {
    let (from, to) = graph.line_endpoints(edge.line)?;
    Ok(if edge.reversed { (to, from) } else { (from, to) })
}

fn edge_positions<G: MapQuery>(graph: &G, edge: DirectedEdge<G::LineId>) -> Result<(Position, Position), G::Error> {
    let (tail, head) = directed_endpoints(graph, edge)?;
    Ok((graph.point_position(tail)?, graph.point_position(head)?))
}

/// Infers which endpoint of the confirmed edge the user is heading toward,
/// then picks the incident street whose axis differs most from the current
/// heading (a real cross street, not a continuation), per
/// `roadmap_navigate_find_intersection`.
fn intersection_guess<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    config: &MatcherConfig,
    tracked: &TrackedPosition<G>,
    fix: GpsFix,
) -> Result<Option<G::StreetId>, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(tracked.directed_edge.line)?;
    let from_pos = graph.point_position(from_point)?;
    let to_pos = graph.point_position(to_point)?;

    let delta_from = fix.steering.delta(graph.azimuth(fix.position, from_pos)).abs();
    let delta_to = fix.steering.delta(graph.azimuth(fix.position, to_pos)).abs();

    let ahead = if delta_to + config.intersection_heading_spread_degrees < delta_from {
        Some(to_point)
    } else if delta_from + config.intersection_heading_spread_degrees < delta_to {
        Some(from_point)
    } else {
        None
    };

    let Some(node) = ahead else {
        return Ok(None);
    };

    let square = graph.point_square(node)?;
    let tile = cache.get(graph, square)?;
    let node_pos = graph.point_position(node)?;

    let mut best: Option<(G::StreetId, f64)> = None;
    for (candidate, head) in successors(graph, tile, tracked.directed_edge, node)? {
        if candidate.line == tracked.directed_edge.line {
            continue;
        }
        let Some(candidate_street) = graph.line_street(candidate.line)? else {
            continue;
        };
        if Some(candidate_street) == tracked.street {
            continue;
        }

        let head_pos = graph.point_position(head)?;
        let candidate_azimuth = graph.azimuth(node_pos, head_pos);
        let deviation = fix.steering.delta(candidate_azimuth).abs();

        if best.as_ref().is_none_or(|&(_, best_deviation)| deviation > best_deviation) {
            best = Some((candidate_street, deviation));
        }
    }

    Ok(best.map(|(street, _)| street))
}
