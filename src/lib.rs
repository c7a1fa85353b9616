//! drone_motion_planning - 3D motion planning for drones
//!
//! Obstacles are inflated into a lattice [`ObstacleField`], an A* search
//! finds a collision-free lattice path through it, and a line-of-sight pass
//! reduces that path to a short waypoint sequence.
//!
//! ```
//! use drone_motion_planning::{AStar3DPlanner, ObstacleField, Point3D, WaypointSimplifier};
//!
//! let mut field = ObstacleField::new(1.0)?;
//! field.register_obstacle(Point3D::new(5.0, 0.0, 0.0), 2.0, -10.0..=10.0);
//!
//! let start = Point3D::origin();
//! let goal = Point3D::new(10.0, 0.0, 0.0);
//! let path = AStar3DPlanner::with_defaults(&field).find_path(start, goal);
//! let waypoints = WaypointSimplifier::new(&field).simplify(&path, 1.0);
//!
//! assert_eq!(path.first(), Some(&start));
//! assert!(waypoints.len() >= 3 && waypoints.len() < path.len());
//! # Ok::<(), drone_motion_planning::PlanningError>(())
//! ```

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod path_planning;

pub mod scenario;

// Re-export common types for convenience
pub use common::{LatticePoint, Path3D, Point3D};
pub use common::{CollisionChecker, PathPlanner3D, PathSimplifier};
pub use common::{PlanningError, PlanningResult};
pub use mapping::{Obstacle, ObstacleField};
pub use path_planning::{
    AStar3DPlanner, CancelToken, PlannerConfig, RevisitPolicy, SearchBounds, SearchOutcome,
    WaypointSimplifier,
};
