//! Core value types shared by every component: positions, lengths, bearings,
//! road classification and the small enums that drive routing and matching.

use std::ops::{Add, Sub};

/// A WGS84 longitude/latitude pair in signed integer micro-degrees.
///
/// Equality is exact integer comparison, matching the "same position" tests
/// used when snapping a GPS fix to a street (never an epsilon compare).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub lon: i32,
    pub lat: i32,
}

impl Position {
    pub const fn new(lon: i32, lat: i32) -> Self {
        Self { lon, lat }
    }
}

/// A length in whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Length(u32);

impl Length {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u32::MAX);

    pub const fn from_meters(meters: u32) -> Self {
        Self(meters)
    }

    pub const fn meters(self) -> u32 {
        self.0
    }

    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Length {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Length {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

/// Time, in whole seconds, to cross a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Seconds(u32);

impl Seconds {
    pub const ZERO: Self = Self(0);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u32 {
        self.0
    }
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

/// An azimuth/heading in degrees, normalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub struct Azimuth(f64);

impl Azimuth {
    pub fn from_degrees(degrees: f64) -> Self {
        let mut d = degrees % 360.0;
        if d < 0.0 {
            d += 360.0;
        }
        Self(d)
    }

    pub const fn degrees(self) -> f64 {
        self.0
    }

    /// Signed difference `self - other`, normalized to `(-180, 180]`.
    ///
    /// Grounded in `navigate_instr_azymuth_delta`: a positive delta means the
    /// outgoing azimuth turns to the left of the incoming one.
    pub fn delta(self, other: Self) -> f64 {
        let mut delta = self.0 - other.0;
        while delta > 180.0 {
            delta -= 360.0;
        }
        while delta <= -180.0 {
            delta += 360.0;
        }
        delta
    }
}

/// Road classification used to pick navigable layers and cost penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Layer(pub u16);

/// Kind of traffic a direction query is restricted to.
///
/// The spec names only `Car`; lane-level/multi-modal routing is a declared
/// Non-goal, so no other variant is exercised yet, but the type keeps the
/// door open rather than hardcoding "car" as a bare token through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum VehicleKind {
    Car,
}

/// Permitted traffic direction along a line, relative to its `from -> to`
/// orientation as stored in the map database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficDirection {
    None,
    WithLine,
    AgainstLine,
    Both,
}

impl TrafficDirection {
    /// Whether traveling in the given direction (`reversed` = against the
    /// line's stored orientation) is permitted.
    pub const fn allows(self, reversed: bool) -> bool {
        match (self, reversed) {
            (Self::Both, _) => true,
            (Self::WithLine, false) => true,
            (Self::AgainstLine, true) => true,
            _ => false,
        }
    }
}

/// A directed traversal of a line: `reversed` selects which endpoint is the
/// tail (`true` = traveling from the line's `to_point` towards `from_point`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectedEdge<LineId> {
    pub line: LineId,
    pub reversed: bool,
}

impl<LineId: Copy> DirectedEdge<LineId> {
    pub const fn new(line: LineId, reversed: bool) -> Self {
        Self { line, reversed }
    }

    pub const fn reverse(self) -> Self {
        Self {
            line: self.line,
            reversed: !self.reversed,
        }
    }
}

/// A live GPS fix delivered to the core via `on_gps_fix`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    /// Fix timestamp, host-defined units (unix seconds is typical).
    pub gps_time: i64,
    /// Reported precision/accuracy, in meters.
    pub precision: Length,
    pub position: Position,
    pub altitude_meters: f64,
    /// Speed in knots, as delivered by the device; converted internally.
    pub speed_knots: f64,
    /// Heading in degrees `[0, 360)`.
    pub steering: Azimuth,
}

impl GpsFix {
    const KNOTS_TO_MPS: f64 = 0.514_444;

    pub fn speed_mps(&self) -> f64 {
        self.speed_knots * Self::KNOTS_TO_MPS
    }
}

/// A driver-facing maneuver classification at a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Maneuver {
    TurnLeft,
    TurnRight,
    KeepLeft,
    KeepRight,
    Continue,
    ApproachingDestination,
}

/// A fired voice/text prompt: the host's `on_instruction` callback payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub maneuver: Maneuver,
    pub street_name: Option<String>,
    /// Distance, in meters, at which this announcement was scheduled to fire.
    pub distance_hint: Length,
}

/// What the map is currently centered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Focus {
    Gps,
    Destination,
    Departure,
    Selection,
    Address,
    Hold,
    Waypoint(u16),
}

impl Default for Focus {
    fn default() -> Self {
        Self::Gps
    }
}
