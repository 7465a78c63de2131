//! Snapping a raw [`Position`] (source, destination, or a departure override)
//! onto the nearest navigable line, the one spatial step the spec leaves
//! folded into "C1 (snap to nearest line)" in the static flow diagram (§2).
//!
//! Grounded in `roadmap_street.c`'s `roadmap_street_get_closest`: scan the
//! lines of the square covering the position, keep the closest, reject if
//! nothing is within the acceptable distance.

use crate::model::{Azimuth, Length, Position, VehicleKind};
use crate::MapQuery;

/// Tunables for snapping a position to a line, named in spec §6/§7
/// (`NoNearbyRoadSource`/`NoNearbyRoadDestination`).
#[derive(Debug, Clone, Copy)]
pub struct SnapConfig {
    /// Distance, in meters, beyond which no line is considered "nearby".
    pub max_distance: Length,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            max_distance: Length::from_meters(300),
        }
    }
}

/// Finds the line nearest `position`, and which of its endpoints should be
/// the tail (`from_point` in [`crate::routing::Router::find_route`]).
///
/// `heading`, when known (the last GPS fix's steering), disambiguates which
/// of two lines meeting exactly at `position` to prefer, and which direction
/// along the chosen line to start in. Without it, `anchor` (the destination,
/// for a source snap) is used instead: the tail is whichever endpoint is
/// farther from `anchor`, so the line is entered heading towards it.
pub(crate) fn snap_source<G: MapQuery>(
    graph: &G,
    config: &SnapConfig,
    position: Position,
    anchor: Position,
    heading: Option<Azimuth>,
) -> Result<Option<(G::LineId, G::PointId, Position)>, G::Error> {
    let Some((line, projection)) = nearest_line(graph, config, position, heading)? else {
        return Ok(None);
    };
    let point = choose_tail(graph, line, heading, anchor)?;
    Ok(Some((line, point, projection)))
}

/// Finds the line nearest `position` for use as the destination line, and
/// which of its endpoints the router should treat as the goal node
/// (`to_point`). There is no meaningful "heading" at a destination, so the
/// endpoint farther from `anchor` (the source) is always used: the node the
/// route approaches through, not the one it would be leaving from.
pub(crate) fn snap_destination<G: MapQuery>(
    graph: &G,
    config: &SnapConfig,
    position: Position,
    anchor: Position,
) -> Result<Option<(G::LineId, G::PointId, Position)>, G::Error> {
    let Some((line, projection)) = nearest_line(graph, config, position, None)? else {
        return Ok(None);
    };
    let point = choose_far_endpoint(graph, line, anchor)?;
    Ok(Some((line, point, projection)))
}

fn nearest_line<G: MapQuery>(
    graph: &G,
    config: &SnapConfig,
    position: Position,
    heading: Option<Azimuth>,
) -> Result<Option<(G::LineId, Position)>, G::Error> {
    let Some(square) = graph.square_at_position(position)? else {
        return Ok(None);
    };

    let mut best: Option<(G::LineId, Position, f64, Length)> = None;

    for layer in graph.navigable_layers(VehicleKind::Car)? {
        let mut lines = graph.lines_in_square(square, layer)?;
        lines.extend(graph.lines_in_square_incoming(square, layer)?);

        for line in lines {
            let (from_point, to_point) = graph.line_endpoints(line)?;
            let from_pos = graph.point_position(from_point)?;
            let to_pos = graph.point_position(to_point)?;
            let (distance, projection) = graph.distance_from_segment(position, from_pos, to_pos);

            let score = heading_tiebreak(graph, from_pos, to_pos, distance, heading)?;

            if best.as_ref().is_none_or(|&(_, _, best_score, _)| score < best_score) {
                best = Some((line, projection, score, distance));
            }
        }
    }

    match best {
        Some((line, projection, _, distance)) if distance <= config.max_distance => Ok(Some((line, projection))),
        _ => Ok(None),
    }
}

/// A line's selection score: its distance to the query position, plus a
/// small penalty (capped well below a meter's worth of distance) when its
/// axis disagrees with `heading`. This only breaks ties between lines that
/// are equally close — e.g. the two lines meeting exactly at an
/// intersection node — it never overrides a genuinely closer line.
fn heading_tiebreak<G: MapQuery>(
    graph: &G,
    from_pos: Position,
    to_pos: Position,
    distance: Length,
    heading: Option<Azimuth>,
) -> Result<f64, G::Error> {
    let mut score = distance.meters() as f64;
    if let Some(heading) = heading {
        let axis = graph.azimuth(from_pos, to_pos);
        let delta = heading.delta(axis).abs().min(180.0 - heading.delta(axis).abs());
        score += delta / 90.0;
    }
    Ok(score)
}

fn choose_tail<G: MapQuery>(
    graph: &G,
    line: G::LineId,
    heading: Option<Azimuth>,
    anchor: Position,
) -> Result<G::PointId, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(line)?;
    let from_pos = graph.point_position(from_point)?;
    let to_pos = graph.point_position(to_point)?;

    if let Some(heading) = heading {
        let forward = graph.azimuth(from_pos, to_pos);
        let backward = graph.azimuth(to_pos, from_pos);
        return Ok(if heading.delta(forward).abs() <= heading.delta(backward).abs() {
            from_point
        } else {
            to_point
        });
    }

    choose_far_endpoint(graph, line, anchor)
}

/// The endpoint of `line` farther from `anchor`, so traveling tail-to-head
/// moves towards `anchor`.
fn choose_far_endpoint<G: MapQuery>(graph: &G, line: G::LineId, anchor: Position) -> Result<G::PointId, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(line)?;
    let from_pos = graph.point_position(from_point)?;
    let to_pos = graph.point_position(to_point)?;

    Ok(if graph.distance(to_pos, anchor) >= graph.distance(from_pos, anchor) {
        to_point
    } else {
        from_point
    })
}
