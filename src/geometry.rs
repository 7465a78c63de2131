//! Pure geometry helpers over [`Position`]. These are the `math.*` functions
//! the spec describes as part of the Map Query Interface; they are kept as
//! free functions (and default trait methods on [`crate::MapQuery`]) because
//! they need no map-database state, only coordinates.

use geo::{Distance, Haversine};

use crate::model::{Azimuth, Length, Position};

fn to_point(position: Position) -> geo::Point<f64> {
    geo::Point::new(
        position.lon as f64 / 1_000_000.0,
        position.lat as f64 / 1_000_000.0,
    )
}

/// Great-circle distance between two positions, in whole meters.
pub fn distance(a: Position, b: Position) -> Length {
    let meters = Haversine.distance(to_point(a), to_point(b));
    Length::from_meters(meters.round() as u32)
}

/// Initial bearing from `a` to `b`, in degrees `[0, 360)`.
pub fn azimuth(a: Position, b: Position) -> Azimuth {
    if a == b {
        return Azimuth::from_degrees(0.0);
    }

    let lat1 = (a.lat as f64 / 1_000_000.0).to_radians();
    let lat2 = (b.lat as f64 / 1_000_000.0).to_radians();
    let dlon = ((b.lon - a.lon) as f64 / 1_000_000.0).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    Azimuth::from_degrees(y.atan2(x).to_degrees())
}

/// Distance from `point` to the closest position on segment `a -> b`, along
/// with the projection of `point` onto that segment (clamped to the
/// segment's extent).
pub fn distance_from_segment(point: Position, a: Position, b: Position) -> (Length, Position) {
    let (ax, ay) = (a.lon as f64, a.lat as f64);
    let (bx, by) = (b.lon as f64, b.lat as f64);
    let (px, py) = (point.lon as f64, point.lat as f64);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let projection = Position::new((ax + t * dx).round() as i32, (ay + t * dy).round() as i32);

    (distance(point, projection), projection)
}
