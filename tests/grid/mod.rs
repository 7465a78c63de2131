pub mod block;
pub mod network;

pub use block::BlockGraph;
pub use network::{center_turn_restriction, point, CrossGraph, LineId, PointId, SquareId, StreetId, CENTER, STEP_MICRODEGREES};
