//! The Map Query Interface (C1): a narrow, read-only contract the core
//! consumes from the host's map database.

use std::error::Error;
use std::fmt::Debug;
use std::hash::Hash;

use crate::model::{Azimuth, Length, Position, TrafficDirection, VehicleKind};
use crate::{geometry, Layer};

/// Read-only accessors over an already-loaded map.
///
/// Implemented by the host's map database. All methods are fallible: a
/// missing or inconsistent map should surface `Self::Error` rather than
/// panic, since the host may swap or partially load maps between calls.
pub trait MapQuery {
    type Error: Error;
    /// Identifies a point (node) that belongs to exactly one square.
    type PointId: Debug + Copy + Eq + Hash + Ord;
    /// Identifies a line (edge), unique within the active map region.
    type LineId: Debug + Copy + Eq + Hash + Ord;
    /// Identifies a square (map tile), the unit of spatial indexing.
    type SquareId: Debug + Copy + Eq + Hash + Ord;
    /// Identifies the named street a line belongs to, independent of how
    /// many lines (one per block, direction or carriageway) make it up.
    type StreetId: Debug + Copy + Eq + Hash;

    fn line_endpoints(
        &self,
        line: Self::LineId,
    ) -> Result<(Self::PointId, Self::PointId), Self::Error>;

    fn point_position(&self, point: Self::PointId) -> Result<Position, Self::Error>;

    fn point_square(&self, point: Self::PointId) -> Result<Self::SquareId, Self::Error>;

    /// Intermediate shape points between a line's endpoints, in
    /// `from_point -> to_point` order.
    fn line_shape(&self, line: Self::LineId) -> Result<Vec<Position>, Self::Error>;

    fn line_layer(&self, line: Self::LineId) -> Result<Layer, Self::Error>;

    fn line_direction(
        &self,
        line: Self::LineId,
        kind: VehicleKind,
    ) -> Result<TrafficDirection, Self::Error>;

    /// Cross-time, in seconds, to traverse the line in the given direction.
    fn line_cross_time(
        &self,
        line: Self::LineId,
        reversed: bool,
    ) -> Result<crate::model::Seconds, Self::Error>;

    fn line_length(&self, line: Self::LineId) -> Result<Length, Self::Error>;

    /// The street a line belongs to, if named. Two lines on the same street
    /// are treated as a continuation rather than a turn by the instruction
    /// annotator, even across a junction.
    fn line_street(&self, line: Self::LineId) -> Result<Option<Self::StreetId>, Self::Error>;

    fn street_name(&self, street: Self::StreetId) -> Result<String, Self::Error>;

    /// True if turning from `from_line` to `to_line` through `via` is
    /// forbidden by a turn restriction.
    fn turn_restricted(
        &self,
        via: Self::PointId,
        from_line: Self::LineId,
        to_line: Self::LineId,
    ) -> Result<bool, Self::Error>;

    /// Lines in `square` on `layer` whose `from_point` lies in the square,
    /// as a contiguous `[first, last]` index range understood by the map
    /// database's own line table. Used by the graph index to build tiles.
    fn lines_in_square(
        &self,
        square: Self::SquareId,
        layer: Layer,
    ) -> Result<Vec<Self::LineId>, Self::Error>;

    /// Lines crossing into `square` on `layer` whose `to_point` lies in the
    /// square but `from_point` does not (incoming-only lines).
    fn lines_in_square_incoming(
        &self,
        square: Self::SquareId,
        layer: Layer,
    ) -> Result<Vec<Self::LineId>, Self::Error>;

    /// Total number of lines in the active map. Exposed for a host's own
    /// diagnostics and progress reporting; the router itself keys its
    /// predecessor map by [`crate::DirectedEdge`] rather than a line-indexed
    /// array, so it has no need of this count.
    fn line_count(&self) -> Result<usize, Self::Error>;

    /// Layers navigable by the given kind of traffic.
    fn navigable_layers(&self, kind: VehicleKind) -> Result<Vec<Layer>, Self::Error>;

    /// The square covering `position`, if the active map has data there.
    ///
    /// Grounded in `roadmap_square_search`: the map-matcher (C5) uses this to
    /// collect candidate lines in the focus rectangle around a GPS fix. The
    /// spec leaves the map's on-disk tiling scheme out of scope (§1); this is
    /// the one spatial-lookup seam the core still needs from it.
    fn square_at_position(&self, position: Position) -> Result<Option<Self::SquareId>, Self::Error>;

    fn distance(&self, a: Position, b: Position) -> Length {
        geometry::distance(a, b)
    }

    fn azimuth(&self, a: Position, b: Position) -> Azimuth {
        geometry::azimuth(a, b)
    }

    fn distance_from_segment(&self, point: Position, a: Position, b: Position) -> (Length, Position) {
        geometry::distance_from_segment(point, a, b)
    }
}

pub mod cache;
pub mod tile;

#[cfg(test)]
pub mod tests;
