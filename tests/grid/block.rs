//! A single city block: a direct street `AB` plus a three-edge loop
//! (`AD`, `DC`, `CB`) around it of equal length, used by the U-turn
//! rejection scenario. The loop is short enough, relative to `AB`, that a
//! large-enough U-turn penalty makes going around strictly cheaper than
//! reversing back onto `AB`.

use std::convert::Infallible;

use streetnav_core::{Layer, Length, MapQuery, Position, Seconds, TrafficDirection, VehicleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointId {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineId {
    Ab,
    Ad,
    Dc,
    Cb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SquareId;

fn position_of(point: PointId) -> Position {
    const STEP: i32 = 1_000;
    match point {
        PointId::A => Position::new(0, 0),
        PointId::B => Position::new(0, STEP),
        PointId::D => Position::new(STEP, 0),
        PointId::C => Position::new(STEP, STEP),
    }
}

pub struct BlockGraph;

impl MapQuery for BlockGraph {
    type Error = Infallible;
    type PointId = PointId;
    type LineId = LineId;
    type SquareId = SquareId;
    type StreetId = LineId;

    fn line_endpoints(&self, line: LineId) -> Result<(PointId, PointId), Infallible> {
        Ok(match line {
            LineId::Ab => (PointId::A, PointId::B),
            LineId::Ad => (PointId::A, PointId::D),
            LineId::Dc => (PointId::D, PointId::C),
            LineId::Cb => (PointId::C, PointId::B),
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
        Ok(Seconds::from_secs((self.line_length(line)?.meters() / 10).max(1)))
    }

    fn line_length(&self, line: LineId) -> Result<Length, Infallible> {
        let (from, to) = self.line_endpoints(line)?;
        Ok(self.distance(position_of(from), position_of(to)))
    }

    fn line_street(&self, line: LineId) -> Result<Option<LineId>, Infallible> {
        Ok(Some(line))
    }

    fn street_name(&self, street: LineId) -> Result<String, Infallible> {
        Ok(format!("{street:?}"))
    }

    fn turn_restricted(&self, _via: PointId, _from: LineId, _to: LineId) -> Result<bool, Infallible> {
        Ok(false)
    }

    fn lines_in_square(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
        Ok(vec![LineId::Ab, LineId::Ad, LineId::Dc, LineId::Cb])
    }

    fn lines_in_square_incoming(&self, _square: SquareId, _layer: Layer) -> Result<Vec<LineId>, Infallible> {
        Ok(vec![])
    }

    fn line_count(&self) -> Result<usize, Infallible> {
        Ok(4)
    }

    fn navigable_layers(&self, _kind: VehicleKind) -> Result<Vec<Layer>, Infallible> {
        Ok(vec![Layer(0)])
    }

    fn square_at_position(&self, _position: Position) -> Result<Option<SquareId>, Infallible> {
        Ok(Some(SquareId))
    }
}
