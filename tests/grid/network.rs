//! A small, procedurally generated street network used by the end-to-end
//! scenario tests: one east-west street ("Main") crossing one north-south
//! street ("1st") at a single intersection, laid out on an 11x11 coordinate
//! lattice with roughly 111m spacing between adjacent points.
//!
//! Unlike a full grid, only the two streets through the center exist — this
//! keeps shortest paths between any two points on the network unique, so
//! routing assertions don't depend on A*'s tie-breaking order.

use std::convert::Infallible;

use streetnav_core::{Layer, Length, MapQuery, Position, Seconds, TrafficDirection, VehicleKind};

pub const GRID_MIN: i32 = 0;
pub const GRID_MAX: i32 = 10;
pub const CENTER: i32 = 5;
pub const STEP_MICRODEGREES: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId {
    pub row: i32,
    pub col: i32,
}

pub const fn point(row: i32, col: i32) -> PointId {
    PointId { row, col }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineId {
    /// `col -> col + 1` along row `CENTER` (Main).
    Horizontal(i32),
    /// `row -> row + 1` along col `CENTER` (1st).
    Vertical(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SquareId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreetId {
    Main,
    First,
}

fn position_of(p: PointId) -> Position {
    Position::new(p.col * STEP_MICRODEGREES, p.row * STEP_MICRODEGREES)
}

/// A turn restriction: forbids turning from `.1` onto `.2` through `.0`.
pub type Restriction = (PointId, LineId, LineId);

/// The restriction scenario 3 exercises: turning from Main (arriving at the
/// intersection eastbound, from the block just west of it) onto 1st
/// (northbound) is forbidden.
pub fn center_turn_restriction() -> Restriction {
    (point(CENTER, CENTER), LineId::Horizontal(CENTER - 1), LineId::Vertical(CENTER))
}

pub struct CrossGraph {
    restriction: Option<Restriction>,
}

impl CrossGraph {
    pub fn new() -> Self {
        Self { restriction: None }
    }

    pub fn with_restriction(restriction: Restriction) -> Self {
        Self {
            restriction: Some(restriction),
        }
    }
}

impl MapQuery for CrossGraph {
    type Error = Infallible;
    type PointId = PointId;
    type LineId = LineId;
    type SquareId = SquareId;
    type StreetId = StreetId;

    fn line_endpoints(&self, line: LineId) -> Result<(PointId, PointId), Infallible> {
        Ok(match line {
            LineId::Horizontal(col) => (point(CENTER, col), point(CENTER, col + 1)),
            LineId::Vertical(row) => (point(row, CENTER), point(row + 1, CENTER)),
        })
    }

    fn point_position(&self, point: PointId) -> Result<Position, Infallible> {
        Ok(position_of(point))
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
        let meters = self.line_length(line)?.meters();
        Ok(Seconds::from_secs((meters / 10).max(1)))
    }

    fn line_length(&self, line: LineId) -> Result<Length, Infallible> {
        let (from, to) = self.line_endpoints(line)?;
        Ok(self.distance(position_of(from), position_of(to)))
    }

    fn line_street(&self, line: LineId) -> Result<Option<StreetId>, Infallible> {
        Ok(Some(match line {
            LineId::Horizontal(_) => StreetId::Main,
            LineId::Vertical(_) => StreetId::First,
        }))
    }

    fn street_name(&self, street: StreetId) -> Result<String, Infallible> {
        Ok(match street {
            StreetId::Main => "Main".into(),
            StreetId::First => "1st".into(),
        })
    }

    fn turn_restricted(&self, via: PointId, from_line: LineId, to_line: LineId) -> Result<bool, Infallible> {
        Ok(self.restriction == Some((via, from_line, to_line)))
    }

    fn lines_in_square(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
        let mut lines: Vec<LineId> = (GRID_MIN..GRID_MAX).map(LineId::Horizontal).collect();
        lines.extend((GRID_MIN..GRID_MAX).map(LineId::Vertical));
        Ok(lines)
    }

    fn lines_in_square_incoming(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
        Ok(vec![])
    }

    fn line_count(&self) -> Result<usize, Infallible> {
        Ok(((GRID_MAX - GRID_MIN) * 2) as usize)
    }

    fn navigable_layers(&self, _kind: VehicleKind) -> Result<Vec<Layer>, Infallible> {
        Ok(vec![Layer(0)])
    }

    fn square_at_position(&self, _position: Position) -> Result<Option<SquareId>, Infallible> {
        Ok(Some(SquareId))
    }
}
