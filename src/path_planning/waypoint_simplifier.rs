//! Waypoint reduction by line-of-sight shortcutting
//!
//! Starting from the first point, the simplifier keeps the farthest later
//! point that is directly visible from the current anchor, moves the anchor
//! there and repeats until the last point is kept. Visibility is the
//! sampled raycast of [`CollisionChecker::raycast`], so two waypoints are
//! never joined across an occupied cell. The result is greedy, not the
//! shortest visibility path.

use log::{debug, trace, warn};

use crate::common::{CollisionChecker, Path3D, PathSimplifier};
use crate::mapping::ObstacleField;

/// Greedy farthest-visible-point simplifier
pub struct WaypointSimplifier<'a, C: CollisionChecker = ObstacleField> {
    field: &'a C,
}

impl<'a, C: CollisionChecker> WaypointSimplifier<'a, C> {
    pub fn new(field: &'a C) -> Self {
        Self { field }
    }

    /// Reduce `path` to the waypoints needed to stay collision free.
    ///
    /// `max_deviation` is reserved for a tolerance-based look-ahead and does
    /// not relax the straight-line collision test.
    pub fn simplify(&self, path: &Path3D, max_deviation: f64) -> Path3D {
        trace!(
            "[Simplifier] {} points, max_deviation={} (unused)",
            path.len(),
            max_deviation
        );
        if path.len() <= 2 {
            return path.clone();
        }

        let points = &path.points;
        let mut waypoints = vec![points[0]];
        let mut anchor = 0;

        while anchor < points.len() - 1 {
            // the next point is kept even when nothing farther is visible
            let mut farthest = anchor + 1;
            for candidate in (anchor + 2)..points.len() {
                if self.field.raycast(&points[anchor], &points[candidate]) {
                    farthest = candidate;
                }
            }

            if farthest == anchor + 1 && !self.field.raycast(&points[anchor], &points[farthest]) {
                warn!(
                    "[Simplifier] segment {} -> {} of the input path is blocked",
                    anchor, farthest
                );
            }

            waypoints.push(points[farthest]);
            anchor = farthest;
        }

        debug!(
            "[Simplifier] reduced {} points to {} waypoints",
            points.len(),
            waypoints.len()
        );
        Path3D::from_points(waypoints)
    }

    /// Whether every consecutive pair of `path` is mutually visible
    pub fn is_collision_free(&self, path: &Path3D) -> bool {
        path.points
            .windows(2)
            .all(|w| self.field.raycast(&w[0], &w[1]))
    }
}

impl<'a, C: CollisionChecker> PathSimplifier for WaypointSimplifier<'a, C> {
    fn simplify(&self, path: &Path3D, max_deviation: f64) -> Path3D {
        WaypointSimplifier::simplify(self, path, max_deviation)
    }
}
