//! Common traits defining interfaces for the planning engine

use crate::common::error::PlanningResult;
use crate::common::types::*;

/// Occupancy queries used by the planners while searching and raycasting
pub trait CollisionChecker {
    /// Spacing of the lattice the occupancy is recorded on
    fn grid_size(&self) -> f64;

    /// Whether the lattice cell nearest to `point` is occupied
    fn is_occupied(&self, point: &Point3D) -> bool;

    /// Sample the straight segment `a -> b` at lattice resolution and report
    /// whether every sample is free. Each sample counts as the lattice cell
    /// nearest to it.
    fn raycast(&self, a: &Point3D, b: &Point3D) -> bool {
        let grid_size = self.grid_size();
        let steps = ((a.distance(b) / grid_size).floor() as usize).max(1);
        (0..=steps).all(|i| {
            let t = i as f64 / steps as f64;
            !self.is_occupied(&a.lerp(b, t))
        })
    }
}

/// Trait for 3D path planning algorithms
pub trait PathPlanner3D {
    /// Plan a path from start to goal
    fn plan(&self, start: Point3D, goal: Point3D) -> PlanningResult<Path3D>;
}

/// Trait for path post-processing that drops redundant waypoints
pub trait PathSimplifier {
    fn simplify(&self, path: &Path3D, max_deviation: f64) -> Path3D;
}
