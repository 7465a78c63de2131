//! Error kinds raised by the core, per §7 of the specification.
//!
//! The router and annotator surface their results through ordinary return
//! values; the controller recovers transient deviations internally. Every
//! other failure propagates to the host through the [`crate::NavigationEvents`]
//! callbacks. The core never aborts the process.

use thiserror::Error;

use crate::model::Position;

/// Failures raised while calculating or maintaining a route.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError<E> {
    #[error("no map data covers position {0:?}")]
    NoMapForPosition(PositionDebug),
    #[error("no road found near the route source")]
    NoNearbyRoadSource,
    #[error("no road found near the route destination")]
    NoNearbyRoadDestination,
    #[error("no path exists between source and destination")]
    NoPath,
    #[error("route calculation was cancelled")]
    Cancelled,
    #[error("map query failed: {0}")]
    MapQueryFailed(#[source] E),
}

/// Wrapper so [`Position`] (which is `Copy`/`Eq` but not `Display`) can be
/// embedded in an error message without requiring the host's map error type
/// to implement anything beyond [`std::error::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDebug(pub Position);

impl<E> From<Position> for RouteError<E> {
    fn from(position: Position) -> Self {
        Self::NoMapForPosition(PositionDebug(position))
    }
}

/// Failures raised while recalculating a route after a deviation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecalcError<E> {
    #[error("recalculation failed: {0}")]
    RouteFailed(#[from] RouteError<E>),
}

/// Configuration values that failed validation at construction time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("announce thresholds must be sorted in strictly decreasing order")]
    AnnounceThresholdsNotDecreasing,
    #[error("graph cache capacity must be at least 1")]
    ZeroCacheCapacity,
}
