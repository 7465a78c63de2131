//! The Instruction Annotator (C4): turns a raw edge sequence from the router
//! into annotated, grouped [`Segment`]s, grounded line-for-line in
//! `navigate_instr.c`'s `navigate_instr_prepare_segments` /
//! `navigate_instr_set_road_instr` / `navigate_instr_check_neighbours`.

use crate::graph::cache::GraphCache;
use crate::graph::tile::successors;
use crate::model::{DirectedEdge, Length, Maneuver, Position, Seconds};
use crate::MapQuery;

/// Tunables for maneuver classification, named in spec §4.4.
#[derive(Debug, Clone, Copy)]
pub struct AnnotatorConfig {
    /// Degrees above which a junction is a turn rather than a continuation,
    /// for segments on different streets.
    pub turn_threshold_degrees: f64,
    /// Same threshold, raised when both segments share a street, to avoid
    /// spurious turns on long curves along a named road.
    pub same_street_threshold_degrees: f64,
    /// Degrees at or beyond which a turn is sharp enough to be a `Turn*`
    /// rather than a `Keep*`.
    pub sharp_turn_degrees: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            turn_threshold_degrees: 15.0,
            same_street_threshold_degrees: 45.0,
            sharp_turn_degrees: 45.0,
        }
    }
}

/// An annotated directed edge, the per-maneuver building block of a [`crate::trip::Route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<LineId, StreetId> {
    pub directed_edge: DirectedEdge<LineId>,
    pub from_pos: Position,
    pub to_pos: Position,
    /// Intermediate shape points between `from_pos` and `to_pos`, in
    /// traversal order, already clipped to the segment's extent.
    pub shape: Vec<Position>,
    pub street: Option<StreetId>,
    pub instruction: Maneuver,
    pub group_id: u32,
    pub distance: Length,
    pub cross_time: Seconds,
}

impl<LineId, StreetId: PartialEq> Segment<LineId, StreetId> {
    fn same_street(&self, other: &Self) -> bool {
        matches!((&self.street, &other.street), (Some(a), Some(b)) if a == b)
    }

    fn azimuth_out<G>(&self, graph: &G) -> crate::model::Azimuth
    where
        G: MapQuery<LineId = LineId>,
    {
        let next = self.shape.first().copied().unwrap_or(self.to_pos);
        graph.azimuth(self.from_pos, next)
    }

    fn azimuth_in<G>(&self, graph: &G) -> crate::model::Azimuth
    where
        G: MapQuery<LineId = LineId>,
    {
        let prev = self.shape.last().copied().unwrap_or(self.from_pos);
        graph.azimuth(prev, self.to_pos)
    }
}

/// Converts a raw router edge sequence into annotated, grouped segments.
///
/// `cache` is used to probe the street graph around ambiguous junctions
/// (the "neighbour probing" step of §4.4); it is typically the same
/// [`GraphCache`] the router used, passed in by the caller so tiles warmed
/// during the search are reused rather than rebuilt.
pub fn annotate<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    config: &AnnotatorConfig,
    edges: &[DirectedEdge<G::LineId>],
    source_pos: Position,
    dest_pos: Position,
) -> Result<Vec<Segment<G::LineId, G::StreetId>>, G::Error> {
    let mut segments = Vec::with_capacity(edges.len());
    for &edge in edges {
        segments.push(build_raw_segment(graph, edge)?);
    }

    for i in 0..segments.len().saturating_sub(1) {
        let instruction = classify_junction(graph, cache, config, &segments[i], &segments[i + 1])?;
        segments[i].instruction = instruction;
    }

    if let Some(last) = segments.last_mut() {
        last.instruction = Maneuver::ApproachingDestination;
    }

    assign_groups(&mut segments);

    if let Some(first) = segments.first_mut() {
        clip_start(graph, first, source_pos)?;
    }
    if segments.len() == 1 {
        clip_end(graph, &mut segments[0], dest_pos)?;
    } else if let Some(last) = segments.last_mut() {
        clip_end(graph, last, dest_pos)?;
    }

    Ok(segments)
}

fn build_raw_segment<G: MapQuery>(
    graph: &G,
    edge: DirectedEdge<G::LineId>,
) -> Result<Segment<G::LineId, G::StreetId>, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(edge.line)?;
    let (tail, head) = if edge.reversed {
        (to_point, from_point)
    } else {
        (from_point, to_point)
    };

    let from_pos = graph.point_position(tail)?;
    let to_pos = graph.point_position(head)?;

    let mut shape = graph.line_shape(edge.line)?;
    if edge.reversed {
        shape.reverse();
    }

    let street = graph.line_street(edge.line)?;
    let cross_time = graph.line_cross_time(edge.line, edge.reversed)?;
    let distance = graph.line_length(edge.line)?;

    Ok(Segment {
        directed_edge: edge,
        from_pos,
        to_pos,
        shape,
        street,
        instruction: Maneuver::Continue,
        group_id: 0,
        distance,
        cross_time,
    })
}

/// Classifies the junction between `seg1` (arriving) and `seg2` (departing),
/// per `navigate_instr_set_road_instr`.
fn classify_junction<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    config: &AnnotatorConfig,
    seg1: &Segment<G::LineId, G::StreetId>,
    seg2: &Segment<G::LineId, G::StreetId>,
) -> Result<Maneuver, G::Error> {
    let azimuth_in = seg1.azimuth_in(graph);
    let azimuth_out = seg2.azimuth_out(graph);
    let delta = azimuth_in.delta(azimuth_out);

    let same_street = seg1.same_street(seg2);
    let threshold = if same_street {
        config.same_street_threshold_degrees
    } else {
        config.turn_threshold_degrees
    };

    if delta < -threshold {
        return Ok(if delta <= -config.sharp_turn_degrees {
            Maneuver::TurnRight
        } else {
            Maneuver::KeepRight
        });
    }

    if delta > threshold {
        return Ok(if delta >= config.sharp_turn_degrees {
            Maneuver::TurnLeft
        } else {
            Maneuver::KeepLeft
        });
    }

    if same_street {
        return Ok(Maneuver::Continue);
    }

    probe_neighbours(graph, cache, seg1, azimuth_in, delta)
}

/// Resolves a near-straight junction between differently-named streets by
/// probing the other lines incident to the junction node, per
/// `navigate_instr_check_neighbours`.
fn probe_neighbours<G: MapQuery>(
    graph: &G,
    cache: &mut GraphCache<G>,
    seg1: &Segment<G::LineId, G::StreetId>,
    azimuth_in: crate::model::Azimuth,
    our_delta: f64,
) -> Result<Maneuver, G::Error> {
    let (from_point, to_point) = graph.line_endpoints(seg1.directed_edge.line)?;
    let junction = if seg1.directed_edge.reversed { from_point } else { to_point };

    let square = graph.point_square(junction)?;
    let tile = cache.get(graph, square)?;

    let mut left_extreme = our_delta;
    let mut right_extreme = our_delta;

    for (candidate, head) in successors(graph, tile, seg1.directed_edge, junction)? {
        let head_pos = graph.point_position(head)?;
        let junction_pos = graph.point_position(junction)?;
        let candidate_azimuth = graph.azimuth(junction_pos, head_pos);
        let candidate_delta = azimuth_in.delta(candidate_azimuth);

        if candidate_delta < left_extreme {
            left_extreme = candidate_delta;
        }
        if candidate_delta > right_extreme {
            right_extreme = candidate_delta;
        }
    }

    let left_deviates = left_extreme != our_delta;
    let right_deviates = right_extreme != our_delta;

    Ok(if left_deviates == right_deviates {
        Maneuver::Continue
    } else if left_deviates {
        Maneuver::KeepLeft
    } else {
        Maneuver::KeepRight
    })
}

/// Assigns group ids: a maximal run of `Continue` segments on the same
/// street shares a group, per `navigate_instr_prepare_segments`'s grouping
/// loop. The last segment (forced `ApproachingDestination`) always starts
/// its own group.
fn assign_groups<LineId, StreetId: PartialEq>(segments: &mut [Segment<LineId, StreetId>]) {
    if segments.is_empty() {
        return;
    }

    let mut group_id = 0u32;
    let mut i = 0usize;
    let last = segments.len() - 1;

    while i < segments.len() {
        let mut j = i;
        while segments[j].instruction == Maneuver::Continue {
            if j == last {
                break;
            }
            let next = j + 1;
            let same_street = segments[j].same_street(&segments[next]);
            if !same_street {
                break;
            }
            j = next;
        }

        for segment in &mut segments[i..=j] {
            segment.group_id = group_id;
        }

        i = j + 1;
        group_id += 1;
    }
}

/// Remaining distance along `segment`'s polyline from the point of
/// `from_position` nearest to it, to the segment's far endpoint
/// (`to_pos`) — the per-fix `navigate_instr_calc_length(.., LINE_END)` used
/// by the trip controller's distance-to-turn bookkeeping.
pub(crate) fn distance_to_end<G: MapQuery>(
    graph: &G,
    segment: &Segment<G::LineId, G::StreetId>,
    from_position: Position,
) -> Length {
    let verts = vertices(segment);
    let (index, projection) = project_onto_polyline(graph, from_position, &verts);

    let mut remaining = Vec::with_capacity(verts.len() - index);
    remaining.push(projection);
    remaining.extend_from_slice(&verts[index + 1..]);

    polyline_length(graph, &remaining)
}

/// Vertex list of a segment in traversal order: `from_pos`, its shape
/// points, then `to_pos`.
fn vertices<LineId: Copy, StreetId>(segment: &Segment<LineId, StreetId>) -> Vec<Position> {
    let mut v = Vec::with_capacity(segment.shape.len() + 2);
    v.push(segment.from_pos);
    v.extend_from_slice(&segment.shape);
    v.push(segment.to_pos);
    v
}

/// Projects `point` onto the polyline `verts`, returning the index of the
/// sub-segment it falls on and the projected position.
fn project_onto_polyline<G: MapQuery>(graph: &G, point: Position, verts: &[Position]) -> (usize, Position) {
    let mut best_index = 0;
    let mut best_distance = Length::MAX;
    let mut best_projection = verts[0];

    for (index, pair) in verts.windows(2).enumerate() {
        let (distance, projection) = graph.distance_from_segment(point, pair[0], pair[1]);
        if distance < best_distance {
            best_distance = distance;
            best_index = index;
            best_projection = projection;
        }
    }

    (best_index, best_projection)
}

fn polyline_length<G: MapQuery>(graph: &G, verts: &[Position]) -> Length {
    verts
        .windows(2)
        .fold(Length::ZERO, |acc, pair| acc + graph.distance(pair[0], pair[1]))
}

/// Clips `segment.from_pos` to the projection of `source_pos`, per
/// `navigate_fix_line_end(.., LINE_START)`, and rescales its cross-time.
fn clip_start<G: MapQuery>(
    graph: &G,
    segment: &mut Segment<G::LineId, G::StreetId>,
    source_pos: Position,
) -> Result<(), G::Error> {
    let full_length = graph.line_length(segment.directed_edge.line)?;
    let full_cross_time = segment.cross_time;

    let verts = vertices(segment);
    let (index, projection) = project_onto_polyline(graph, source_pos, &verts);

    segment.from_pos = projection;
    segment.shape = segment.shape.split_off(index.min(segment.shape.len()));

    rescale(graph, segment, full_length, full_cross_time);
    Ok(())
}

/// Clips `segment.to_pos` to the projection of `dest_pos`, per
/// `navigate_fix_line_end(.., LINE_END)`, and rescales its cross-time.
fn clip_end<G: MapQuery>(
    graph: &G,
    segment: &mut Segment<G::LineId, G::StreetId>,
    dest_pos: Position,
) -> Result<(), G::Error> {
    let full_length = graph.line_length(segment.directed_edge.line)?;
    let full_cross_time = segment.cross_time;

    let verts = vertices(segment);
    let (index, projection) = project_onto_polyline(graph, dest_pos, &verts);

    segment.to_pos = projection;
    segment.shape.truncate(index.min(segment.shape.len()));

    rescale(graph, segment, full_length, full_cross_time);
    Ok(())
}

fn rescale<G: MapQuery>(
    graph: &G,
    segment: &mut Segment<G::LineId, G::StreetId>,
    full_length: Length,
    full_cross_time: Seconds,
) {
    let verts = vertices(segment);
    let clipped_length = polyline_length(graph, &verts);
    segment.distance = clipped_length;

    let ratio = clipped_length.meters() as f64 / full_length.meters().max(1) as f64;
    segment.cross_time = Seconds::from_secs((full_cross_time.as_secs() as f64 * ratio).round() as u32);
}
