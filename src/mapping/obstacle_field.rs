//! Obstacle field for 3D lattice planning
//!
//! Occupied volume is recorded as a hash set of lattice cells. Each
//! registered obstacle is inflated into a vertical cylinder: every cell
//! whose horizontal offset from the obstacle center lies within the radius
//! is marked across the whole vertical band, so the footprint does not
//! shrink near the top and bottom the way a sphere would.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use itertools::iproduct;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::common::{CollisionChecker, LatticePoint, PlanningError, PlanningResult, Point3D};

const EPSILON: f64 = 1e-9;

/// Default cap on the cells a single obstacle may inflate into
pub const DEFAULT_MAX_CELLS_PER_OBSTACLE: usize = 10_000_000;

/// Obstacle as reported by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Point3D,
    /// Horizontal radius [m]
    pub radius: f64,
    /// Vertical band as `[below, above]` offsets from `center.z` [m]
    pub vertical_extent: [f64; 2],
}

impl Obstacle {
    pub fn new(center: Point3D, radius: f64, vertical_extent: RangeInclusive<f64>) -> Self {
        Self {
            center,
            radius,
            vertical_extent: [*vertical_extent.start(), *vertical_extent.end()],
        }
    }

    /// Obstacle whose vertical band matches its radius
    pub fn symmetric(center: Point3D, radius: f64) -> Self {
        Self::new(center, radius, -radius..=radius)
    }
}

/// Set of occupied lattice cells built from inflated obstacles
#[derive(Debug, Clone)]
pub struct ObstacleField {
    grid_size: f64,
    safety_margin: f64,
    max_cells_per_obstacle: usize,
    occupied: HashSet<LatticePoint>,
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    /// Create an empty field on a lattice of the given spacing
    pub fn new(grid_size: f64) -> PlanningResult<Self> {
        if !grid_size.is_finite() || grid_size <= 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "grid_size must be positive and finite, got {}",
                grid_size
            )));
        }
        Ok(Self {
            grid_size,
            safety_margin: 0.0,
            max_cells_per_obstacle: DEFAULT_MAX_CELLS_PER_OBSTACLE,
            occupied: HashSet::new(),
            obstacles: Vec::new(),
        })
    }

    /// Extra clearance added to every obstacle registered afterwards
    pub fn with_safety_margin(mut self, margin: f64) -> PlanningResult<Self> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "safety_margin must be non-negative and finite, got {}",
                margin
            )));
        }
        self.safety_margin = margin;
        Ok(self)
    }

    /// Obstacles that would inflate into more cells than this are refused
    pub fn with_max_cells_per_obstacle(mut self, max_cells: usize) -> Self {
        self.max_cells_per_obstacle = max_cells;
        self
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// Obstacles registered so far, in registration order
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Number of occupied cells
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Remove every obstacle
    pub fn clear(&mut self) {
        self.occupied.clear();
        self.obstacles.clear();
    }

    /// Inflate an obstacle into the occupied set.
    ///
    /// `vertical_extent` holds offsets from `center.z`. A radius that is
    /// zero, negative or NaN registers nothing.
    pub fn register_obstacle(
        &mut self,
        center: Point3D,
        radius: f64,
        vertical_extent: RangeInclusive<f64>,
    ) {
        self.insert(&Obstacle::new(center, radius, vertical_extent));
    }

    /// Register an obstacle whose vertical band is `-radius..=radius`
    pub fn add_obstacle(&mut self, center: Point3D, radius: f64) {
        self.insert(&Obstacle::symmetric(center, radius));
    }

    /// Inflate `obstacle` into the field. An obstacle that `try_insert`
    /// refuses is logged and skipped.
    pub fn insert(&mut self, obstacle: &Obstacle) {
        if let Err(e) = self.try_insert(obstacle) {
            warn!("[ObstacleField] obstacle skipped: {}", e);
        }
    }

    /// Inflate `obstacle` into the field and return the number of newly
    /// occupied cells.
    ///
    /// Degenerate obstacles register nothing and return `Ok(0)`. An obstacle
    /// whose inflation would exceed the per-obstacle cell cap is refused with
    /// `InvalidParameter` before any cell is touched.
    pub fn try_insert(&mut self, obstacle: &Obstacle) -> PlanningResult<usize> {
        // NaN fails this comparison as well
        if !(obstacle.radius > 0.0) || !obstacle.center.is_finite() {
            debug!(
                "[ObstacleField] ignoring degenerate obstacle at ({:.2},{:.2},{:.2}) radius={}",
                obstacle.center.x, obstacle.center.y, obstacle.center.z, obstacle.radius
            );
            return Ok(0);
        }
        let [below, above] = obstacle.vertical_extent;
        if !(below <= above) {
            debug!(
                "[ObstacleField] ignoring obstacle with empty vertical extent [{}, {}]",
                below, above
            );
            return Ok(0);
        }

        let g = self.grid_size;
        let c = obstacle.center;
        let radius = obstacle.radius + self.safety_margin;
        let z_min = c.z + below - self.safety_margin;
        let z_max = c.z + above + self.safety_margin;

        // Bounding box estimate in f64 so huge inputs cannot overflow
        let side = 2.0 * radius / g + 1.0;
        let estimate = side * side * ((z_max - z_min) / g + 1.0);
        if !(estimate <= self.max_cells_per_obstacle as f64) {
            return Err(PlanningError::InvalidParameter(format!(
                "obstacle at ({:.2},{:.2},{:.2}) r={} would inflate into ~{:.0} cells (cap {})",
                c.x, c.y, c.z, radius, estimate, self.max_cells_per_obstacle
            )));
        }

        let mut layers = Self::index_span(z_min / g, z_max / g);
        if layers.is_empty() {
            // Band thinner than one layer: keep the layer nearest its middle
            let mid = ((z_min + z_max) / 2.0 / g).round() as i64;
            layers = mid..=mid;
        }
        let columns = Self::index_span((c.x - radius) / g, (c.x + radius) / g);
        let rows = Self::index_span((c.y - radius) / g, (c.y + radius) / g);
        let r2 = radius * radius + EPSILON;

        let before = self.occupied.len();
        let center_cell = LatticePoint::from_point(&c, g);
        let footprint: Vec<(i64, i64)> = iproduct!(columns, rows)
            .filter(|&(ix, iy)| {
                let dx = ix as f64 * g - c.x;
                let dy = iy as f64 * g - c.y;
                dx * dx + dy * dy <= r2
            })
            .chain(std::iter::once((center_cell.x, center_cell.y)))
            .collect();
        for ((ix, iy), iz) in iproduct!(footprint, layers) {
            self.occupied.insert(LatticePoint::new(ix, iy, iz));
        }
        let added = self.occupied.len() - before;
        trace!(
            "[ObstacleField] obstacle at ({:.2},{:.2},{:.2}) r={:.2} added {} cells",
            c.x,
            c.y,
            c.z,
            radius,
            added
        );

        if !self.obstacles.contains(obstacle) {
            self.obstacles.push(obstacle.clone());
        }
        Ok(added)
    }

    /// Whether the cell nearest to `point` is occupied
    pub fn is_occupied(&self, point: &Point3D) -> bool {
        self.occupied.contains(&self.cell_of(point))
    }

    /// Centers of all occupied cells
    pub fn occupied_cells(&self) -> impl Iterator<Item = Point3D> + '_ {
        let g = self.grid_size;
        self.occupied
            .iter()
            .map(move |c| c.to_point(&Point3D::origin(), g))
    }

    fn cell_of(&self, point: &Point3D) -> LatticePoint {
        LatticePoint::from_point(point, self.grid_size)
    }

    /// Lattice indices whose positions fall inside `[lo, hi]` (in cells)
    fn index_span(lo: f64, hi: f64) -> RangeInclusive<i64> {
        (lo - EPSILON).ceil() as i64..=(hi + EPSILON).floor() as i64
    }
}

impl CollisionChecker for ObstacleField {
    fn grid_size(&self) -> f64 {
        self.grid_size
    }

    fn is_occupied(&self, point: &Point3D) -> bool {
        ObstacleField::is_occupied(self, point)
    }
}
