//! A tiny, hand-built map used to test [`super::tile`] and [`super::cache`]
//! in isolation from the rest of the core.

#![allow(clippy::unwrap_used)]

use std::convert::Infallible;

use rustc_hash::FxHashMap;

use crate::model::{Layer, Length, Position, Seconds, TrafficDirection, VehicleKind};
use crate::MapQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SquareId(pub u32);

struct LineRecord {
    from: PointId,
    to: PointId,
    direction: TrafficDirection,
}

/// A handful of points connected in a small non-grid shape:
///
/// ```text
/// 1 --L1--> 2 --L2--> 3
///           |
///          L3
///           v
///           4
/// ```
///
/// all in square 0, all bidirectional, with one turn restriction
/// `(2, L1, L3)` forbidding the left turn from L1 onto L3.
pub struct TestGraph {
    points: FxHashMap<PointId, Position>,
    lines: FxHashMap<LineId, LineRecord>,
    restriction: (PointId, LineId, LineId),
}

impl TestGraph {
    pub fn new() -> Self {
        let points = FxHashMap::from_iter([
            (PointId(1), Position::new(0, 0)),
            (PointId(2), Position::new(1_000_000, 0)),
            (PointId(3), Position::new(2_000_000, 0)),
            (PointId(4), Position::new(1_000_000, 1_000_000)),
        ]);

        let lines = FxHashMap::from_iter([
            (
                LineId(1),
                LineRecord {
                    from: PointId(1),
                    to: PointId(2),
                    direction: TrafficDirection::Both,
                },
            ),
            (
                LineId(2),
                LineRecord {
                    from: PointId(2),
                    to: PointId(3),
                    direction: TrafficDirection::Both,
                },
            ),
            (
                LineId(3),
                LineRecord {
                    from: PointId(2),
                    to: PointId(4),
                    direction: TrafficDirection::Both,
                },
            ),
        ]);

        Self {
            points,
            lines,
            restriction: (PointId(2), LineId(1), LineId(3)),
        }
    }
}

impl MapQuery for TestGraph {
    type Error = Infallible;
    type PointId = PointId;
    type LineId = LineId;
    type SquareId = SquareId;
    type StreetId = LineId;

    fn line_endpoints(&self, line: LineId) -> Result<(PointId, PointId), Infallible> {
        let record = &self.lines[&line];
        Ok((record.from, record.to))
    }

    fn point_position(&self, point: PointId) -> Result<Position, Infallible> {
        Ok(self.points[&point])
    }

    fn point_square(&self, _point: PointId) -> Result<SquareId, Infallible> {
        Ok(SquareId(0))
    }

    fn line_shape(&self, _line: LineId) -> Result<Vec<Position>, Infallible> {
        Ok(vec![])
    }

    fn line_layer(&self, _line: LineId) -> Result<Layer, Infallible> {
        Ok(Layer(0))
    }

    fn line_direction(&self, line: LineId, _kind: VehicleKind) -> Result<TrafficDirection, Infallible> {
        Ok(self.lines[&line].direction)
    }

    fn line_cross_time(&self, _line: LineId, _reversed: bool) -> Result<Seconds, Infallible> {
        Ok(Seconds::from_secs(10))
    }

    fn line_length(&self, line: LineId) -> Result<Length, Infallible> {
        let record = &self.lines[&line];
        let (a, b) = (self.points[&record.from], self.points[&record.to]);
        Ok(self.distance(a, b))
    }

    fn line_street(&self, line: LineId) -> Result<Option<LineId>, Infallible> {
        Ok(Some(line))
    }

    fn street_name(&self, street: LineId) -> Result<String, Infallible> {
        Ok(format!("Test Street {}", street.0))
    }

    fn turn_restricted(&self, via: PointId, from_line: LineId, to_line: LineId) -> Result<bool, Infallible> {
        Ok(self.restriction == (via, from_line, to_line))
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
        Ok(Some(SquareId(0)))
    }
}

#[cfg(test)]
mod invariants {
    use std::collections::HashSet;

    use super::*;
    use crate::graph::tile::{successors, StreetGraphTile};

    #[test]
    fn enumeration_is_exhaustive_without_duplicates() {
        let graph = TestGraph::new();
        let tile = StreetGraphTile::build(&graph, SquareId(0)).unwrap();

        let entries: Vec<_> = tile.entries_at(PointId(2)).collect();
        let unique: HashSet<_> = entries.iter().copied().collect();
        assert_eq!(entries.len(), unique.len(), "no duplicate entries");

        // node 2 has: L1 reversed (arriving from 1), L2 forward (leaving to 3),
        // L3 forward (leaving to 4).
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn enumeration_order_is_deterministic_across_rebuilds() {
        let graph = TestGraph::new();
        let tile_a = StreetGraphTile::build(&graph, SquareId(0)).unwrap();
        let tile_b = StreetGraphTile::build(&graph, SquareId(0)).unwrap();

        let a: Vec<_> = tile_a.entries_at(PointId(2)).collect();
        let b: Vec<_> = tile_b.entries_at(PointId(2)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn successors_skip_the_via_edge_and_restricted_turns() {
        let graph = TestGraph::new();
        let tile = StreetGraphTile::build(&graph, SquareId(0)).unwrap();

        let via = crate::model::DirectedEdge::new(LineId(1), false); // arrived via L1 forward
        let next = successors(&graph, &tile, via, PointId(2)).unwrap();

        let lines: Vec<_> = next.iter().map(|(edge, _)| edge.line).collect();
        assert!(!lines.contains(&LineId(1)), "via edge never a successor");
        assert!(
            !lines.contains(&LineId(3)),
            "turn restriction (2, L1, L3) forbids this transition"
        );
        assert!(lines.contains(&LineId(2)));
    }
}
