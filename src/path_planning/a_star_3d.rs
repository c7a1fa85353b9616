//! A* path planning on a uniform 3D lattice
//!
//! The search starts from the caller's start position and steps by one grid
//! size along each axis, so every node lies on the lattice anchored at the
//! start. A node is identified by its integer offset from the start, in grid
//! steps, and its position is computed from that offset instead of being
//! accumulated, so any positive grid size works without drift. Each node has
//! up to 26 neighbours and the step cost is the Euclidean distance between
//! node positions, which keeps the Euclidean heuristic admissible and
//! consistent.
//!
//! The search succeeds as soon as a popped node lies within one grid step
//! of the goal; the returned path ends at that node.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::iproduct;
use log::{debug, trace, warn};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::common::{
    CollisionChecker, LatticePoint, Path3D, PathPlanner3D, PlanningError, PlanningResult,
    Point3D,
};
use crate::mapping::ObstacleField;
use crate::path_planning::waypoint_simplifier::WaypointSimplifier;

/// What happens when a cheaper route to an already expanded point shows up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisitPolicy {
    /// Expanded points are closed for good. A popped entry for a closed
    /// point is skipped and cheaper routes found later are ignored, which
    /// can return a slightly longer path when floating costs nearly tie.
    #[default]
    CloseOnExpand,
    /// Closed points are reopened whenever a strictly cheaper route is
    /// found (decrease-key by lazy deletion). Optimal for a consistent
    /// heuristic, at the price of extra expansions.
    Reopen,
}

/// Axis-aligned box limiting where the search may go
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBounds {
    pub min: Point3D,
    pub max: Point3D,
}

impl SearchBounds {
    pub fn new(min: Point3D, max: Point3D) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: &Point3D) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }
}

/// Configuration for the 3D A* planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub revisit_policy: RevisitPolicy,
    /// Maximum number of node expansions before giving up (None = unbounded)
    pub max_expansions: Option<usize>,
    /// Wall-clock budget, checked between node expansions
    pub timeout: Option<Duration>,
    /// Optional search volume; neighbours outside it are never generated
    pub bounds: Option<SearchBounds>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            revisit_policy: RevisitPolicy::CloseOnExpand,
            max_expansions: Some(200_000),
            timeout: None,
            bounds: None,
        }
    }
}

impl PlannerConfig {
    pub fn with_revisit_policy(mut self, policy: RevisitPolicy) -> Self {
        self.revisit_policy = policy;
        self
    }

    pub fn with_max_expansions(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_bounds(mut self, bounds: SearchBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn validate(&self) -> PlanningResult<()> {
        if self.max_expansions == Some(0) {
            return Err(PlanningError::InvalidParameter(
                "max_expansions must be at least 1".to_string(),
            ));
        }
        if let Some(b) = &self.bounds {
            let ordered = b.min.x <= b.max.x && b.min.y <= b.max.y && b.min.z <= b.max.z;
            if !ordered || !b.min.is_finite() || !b.max.is_finite() {
                return Err(PlanningError::InvalidParameter(format!(
                    "search bounds {:?} are not an ordered finite box",
                    b
                )));
            }
        }
        Ok(())
    }
}

/// Flag shared with another thread to stop a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a successful search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Lattice points from start to the node that reached the goal
    pub path: Path3D,
    /// Accumulated step cost along `path`
    pub cost: f64,
    /// Number of nodes expanded
    pub expanded: usize,
}

#[derive(Debug, Clone)]
struct SearchNode {
    /// Offset from the start in grid steps
    lattice: LatticePoint,
    position: Point3D,
    cost: f64,
    parent_index: Option<usize>,
}

/// Open set entry: (f, insertion order, node index), popped lowest f first
/// and, among equal f, earliest inserted first.
type OpenEntry = (Reverse<NotNan<f64>>, Reverse<u64>, usize);

/// Scratch state owned by a single search call
struct SearchState {
    nodes: Vec<SearchNode>,
    open_set: BinaryHeap<OpenEntry>,
    closed_set: HashSet<LatticePoint>,
    best_cost: HashMap<LatticePoint, f64>,
    sequence: u64,
}

impl SearchState {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            open_set: BinaryHeap::new(),
            closed_set: HashSet::new(),
            best_cost: HashMap::new(),
            sequence: 0,
        }
    }

    fn push(&mut self, node: SearchNode, goal: &Point3D) -> PlanningResult<()> {
        let f = node.cost + node.position.distance(goal);
        let priority = NotNan::new(f)
            .map_err(|_| PlanningError::NumericalError("NaN node priority".to_string()))?;
        self.best_cost.insert(node.lattice, node.cost);
        self.nodes.push(node);
        self.open_set
            .push((Reverse(priority), Reverse(self.sequence), self.nodes.len() - 1));
        self.sequence += 1;
        Ok(())
    }

    fn build_path(&self, goal_index: usize) -> Path3D {
        let mut points = Vec::new();
        let mut current_index = Some(goal_index);

        while let Some(index) = current_index {
            let node = &self.nodes[index];
            points.push(node.position);
            current_index = node.parent_index;
        }

        points.reverse();
        Path3D::from_points(points)
    }
}

/// A* planner over a uniform 3D lattice.
///
/// Borrows the obstacle field for its whole lifetime, so the field cannot be
/// mutated while a search or simplification is running.
pub struct AStar3DPlanner<'a, C: CollisionChecker = ObstacleField> {
    field: &'a C,
    config: PlannerConfig,
    motion: Vec<(i64, i64, i64)>,
}

impl<'a, C: CollisionChecker> AStar3DPlanner<'a, C> {
    pub fn new(field: &'a C, config: PlannerConfig) -> Self {
        let motion = Self::get_motion_model();
        Self { field, config, motion }
    }

    pub fn with_defaults(field: &'a C) -> Self {
        Self::new(field, PlannerConfig::default())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a path, returning an empty path when the goal cannot be reached
    pub fn find_path(&self, start: Point3D, goal: Point3D) -> Path3D {
        match self.search(start, goal) {
            Ok(outcome) => outcome.path,
            Err(e) if e.is_unreachable() => {
                debug!("[AStar3D] {}", e);
                Path3D::new()
            }
            Err(e) => {
                warn!("[AStar3D] search aborted: {}", e);
                Path3D::new()
            }
        }
    }

    /// Plan a path and reduce it to waypoints with the same field
    pub fn find_waypoints(
        &self,
        start: Point3D,
        goal: Point3D,
        max_deviation: f64,
    ) -> PlanningResult<Path3D> {
        let outcome = self.search(start, goal)?;
        Ok(WaypointSimplifier::new(self.field).simplify(&outcome.path, max_deviation))
    }

    pub fn search(&self, start: Point3D, goal: Point3D) -> PlanningResult<SearchOutcome> {
        self.run(start, goal, None)
    }

    /// Same as [`search`](Self::search), checking `token` between expansions
    pub fn search_with_cancel(
        &self,
        start: Point3D,
        goal: Point3D,
        token: &CancelToken,
    ) -> PlanningResult<SearchOutcome> {
        self.run(start, goal, Some(token))
    }

    fn run(
        &self,
        start: Point3D,
        goal: Point3D,
        token: Option<&CancelToken>,
    ) -> PlanningResult<SearchOutcome> {
        self.config.validate()?;
        if !start.is_finite() || !goal.is_finite() {
            return Err(PlanningError::NumericalError(format!(
                "non-finite endpoint: start={:?} goal={:?}",
                start, goal
            )));
        }
        trace!(
            "[AStar3D] search: start=({:.2},{:.2},{:.2}) goal=({:.2},{:.2},{:.2})",
            start.x, start.y, start.z, goal.x, goal.y, goal.z
        );
        if self.field.is_occupied(&start) {
            warn!(
                "[AStar3D] start ({:.2},{:.2},{:.2}) lies in an occupied cell",
                start.x, start.y, start.z
            );
        }
        if self.field.is_occupied(&goal) {
            warn!(
                "[AStar3D] goal ({:.2},{:.2},{:.2}) lies in an occupied cell",
                goal.x, goal.y, goal.z
            );
        }

        let step = self.field.grid_size();
        let policy = self.config.revisit_policy;
        let started = Instant::now();
        let mut state = SearchState::new();
        let mut expanded = 0;

        state.push(
            SearchNode {
                lattice: LatticePoint::new(0, 0, 0),
                position: start,
                cost: 0.0,
                parent_index: None,
            },
            &goal,
        )?;

        while let Some((_, _, index)) = state.open_set.pop() {
            let current = state.nodes[index].clone();

            if policy == RevisitPolicy::Reopen {
                // a cheaper entry for this point was pushed after this one
                let best = state.best_cost.get(&current.lattice).copied();
                if best.map_or(false, |b| b < current.cost) {
                    continue;
                }
            }

            if current.position.distance(&goal) < step {
                debug!(
                    "[AStar3D] goal reached: cost={:.3} expanded={} open={}",
                    current.cost,
                    expanded,
                    state.open_set.len()
                );
                return Ok(SearchOutcome {
                    path: state.build_path(index),
                    cost: current.cost,
                    expanded,
                });
            }

            let newly_closed = state.closed_set.insert(current.lattice);
            if policy == RevisitPolicy::CloseOnExpand && !newly_closed {
                continue;
            }

            if let Some(limit) = self.config.max_expansions {
                if expanded >= limit {
                    debug!("[AStar3D] expansion limit {} reached", limit);
                    return Err(PlanningError::ExpansionLimit { limit });
                }
            }
            if let Some(timeout) = self.config.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(PlanningError::Timeout { elapsed });
                }
            }
            if token.map_or(false, CancelToken::is_cancelled) {
                return Err(PlanningError::Cancelled);
            }
            expanded += 1;

            for &(dx, dy, dz) in &self.motion {
                let lattice = current.lattice.offset(dx, dy, dz);
                let position = lattice.to_point(&start, step);

                if self.field.is_occupied(&position) {
                    continue;
                }
                if let Some(bounds) = &self.config.bounds {
                    if !bounds.contains(&position) {
                        continue;
                    }
                }
                if policy == RevisitPolicy::CloseOnExpand && state.closed_set.contains(&lattice) {
                    continue;
                }

                let cost = current.cost + current.position.distance(&position);
                if let Some(&known) = state.best_cost.get(&lattice) {
                    if known <= cost {
                        continue;
                    }
                }

                state.push(
                    SearchNode {
                        lattice,
                        position,
                        cost,
                        parent_index: Some(index),
                    },
                    &goal,
                )?;
            }
        }

        debug!(
            "[AStar3D] open set exhausted after {} expansions ({} closed)",
            expanded,
            state.closed_set.len()
        );
        Err(PlanningError::NoPath { expanded })
    }

    fn get_motion_model() -> Vec<(i64, i64, i64)> {
        // dx, dy, dz in grid steps (26-connected lattice)
        let delta = [-1, 0, 1];
        iproduct!(delta, delta, delta)
            .filter(|&m| m != (0, 0, 0))
            .collect()
    }
}

impl<'a, C: CollisionChecker> PathPlanner3D for AStar3DPlanner<'a, C> {
    fn plan(&self, start: Point3D, goal: Point3D) -> PlanningResult<Path3D> {
        self.search(start, goal).map(|outcome| outcome.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::test_support::assert_valid_path;
    use approx::assert_relative_eq;

    fn empty_field() -> ObstacleField {
        ObstacleField::new(1.0).unwrap()
    }

    /// Hollow cube of single-cell obstacles at Chebyshev distance 2 from the origin
    fn sealed_shell() -> ObstacleField {
        let mut field = empty_field();
        for (x, y, z) in iproduct!(-2i32..=2, -2i32..=2, -2i32..=2) {
            if x.abs().max(y.abs()).max(z.abs()) == 2 {
                field.register_obstacle(
                    Point3D::new(x as f64, y as f64, z as f64),
                    0.1,
                    0.0..=0.0,
                );
            }
        }
        field
    }

    #[test]
    fn test_motion_model_has_26_neighbours() {
        let motion = AStar3DPlanner::<ObstacleField>::get_motion_model();
        assert_eq!(motion.len(), 26);
        assert!(motion.contains(&(1, -1, 0)));
        assert!(!motion.contains(&(0, 0, 0)));
    }

    #[test]
    fn test_grid_finer_than_a_centimeter() {
        let field = ObstacleField::new(0.004).unwrap();
        let planner = AStar3DPlanner::with_defaults(&field);
        let goal = Point3D::new(0.1005, 0.0, 0.0);

        let outcome = planner.search(Point3D::origin(), goal).unwrap();

        assert_eq!(outcome.path.len(), 26);
        assert_relative_eq!(outcome.cost, 0.1, epsilon = 1e-9);
        assert!(outcome.path.last().unwrap().distance(&goal) < 0.004);
        assert_valid_path(&field, &outcome.path);
    }

    #[test]
    fn test_grid_off_the_centimeter_lattice_keeps_step_length() {
        let field = ObstacleField::new(0.015).unwrap();
        let planner = AStar3DPlanner::with_defaults(&field);

        let outcome = planner
            .search(Point3D::origin(), Point3D::new(0.1525, 0.0, 0.0))
            .unwrap();

        assert_eq!(outcome.path.len(), 11);
        for (a, b) in outcome.path.points.iter().zip(outcome.path.points.iter().skip(1)) {
            assert_relative_eq!(a.distance(b), 0.015, epsilon = 1e-12);
        }
        assert_relative_eq!(outcome.cost, 0.15, epsilon = 1e-9);

        // diagonal moves on the same grid, from an unaligned start
        let start = Point3D::new(0.0031, -0.007, 0.02);
        let path = planner.find_path(start, Point3D::new(0.2, 0.06, -0.04));
        assert_eq!(path.first(), Some(&start));
        assert_valid_path(&field, &path);
    }

    #[test]
    fn test_straight_line_is_optimal_on_empty_field() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);

        let outcome = planner
            .search(Point3D::origin(), Point3D::new(3.0, 0.0, 0.0))
            .unwrap();

        assert_eq!(outcome.path.len(), 4);
        assert_relative_eq!(outcome.cost, 3.0, epsilon = 1e-9);
        assert_relative_eq!(outcome.path.total_length(), 3.0, epsilon = 1e-9);
        assert_eq!(outcome.path.last(), Some(&Point3D::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_diagonal_uses_3d_moves() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);

        let outcome = planner
            .search(Point3D::origin(), Point3D::new(4.0, 4.0, 4.0))
            .unwrap();

        assert_eq!(outcome.path.len(), 5);
        assert_relative_eq!(outcome.cost, 4.0 * 3f64.sqrt(), epsilon = 1e-9);
        assert_valid_path(&field, &outcome.path);
    }

    #[test]
    fn test_start_equal_goal_returns_single_point() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);
        let p = Point3D::new(1.5, -2.0, 7.25);

        let outcome = planner.search(p, p).unwrap();

        assert_eq!(outcome.path.points, vec![p]);
        assert_eq!(outcome.expanded, 0);
    }

    #[test]
    fn test_unaligned_endpoints_stop_within_one_step() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);
        let start = Point3D::new(0.25, 0.1, 0.0);
        let goal = Point3D::new(5.7, 0.3, 1.2);

        let path = planner.find_path(start, goal);

        assert_eq!(path.first(), Some(&start));
        assert!(path.last().unwrap().distance(&goal) < 1.0);
        assert_valid_path(&field, &path);
    }

    #[test]
    fn test_detours_around_column() {
        let mut field = empty_field();
        field.register_obstacle(Point3D::new(5.0, 0.0, 0.0), 2.0, -10.0..=10.0);
        let planner = AStar3DPlanner::with_defaults(&field);

        let path = planner.find_path(Point3D::origin(), Point3D::new(10.0, 0.0, 0.0));

        assert!(!path.is_empty());
        assert_valid_path(&field, &path);
        assert!(path.total_length() > 10.0);
        assert!(path.iter().any(|p| p.y.abs() > 2.0));
    }

    #[test]
    fn test_sealed_shell_is_unreachable() {
        let field = sealed_shell();
        let planner = AStar3DPlanner::with_defaults(&field);

        let result = planner.search(Point3D::origin(), Point3D::new(10.0, 0.0, 0.0));
        match result {
            Err(PlanningError::NoPath { expanded }) => assert_eq!(expanded, 27),
            other => panic!("expected NoPath, got {:?}", other),
        }
        assert!(planner
            .find_path(Point3D::origin(), Point3D::new(10.0, 0.0, 0.0))
            .is_empty());
        assert!(planner
            .plan(Point3D::origin(), Point3D::new(10.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn test_start_inside_obstacle_is_still_searched() {
        let mut field = empty_field();
        field.add_obstacle(Point3D::origin(), 1.0);
        let planner = AStar3DPlanner::with_defaults(&field);

        let path = planner.find_path(Point3D::origin(), Point3D::new(5.0, 0.0, 0.0));

        assert_eq!(path.first(), Some(&Point3D::origin()));
        assert!(path.len() > 1);
        assert!(path.points[1..].iter().all(|p| !field.is_occupied(p)));
    }

    #[test]
    fn test_occupied_goal_is_unreachable_within_bounds() {
        let mut field = empty_field();
        field.add_obstacle(Point3D::new(5.0, 0.0, 0.0), 1.0);
        let bounds = SearchBounds::new(Point3D::new(-2.0, -4.0, -4.0), Point3D::new(8.0, 4.0, 4.0));
        let planner = AStar3DPlanner::new(&field, PlannerConfig::default().with_bounds(bounds));

        let result = planner.search(Point3D::origin(), Point3D::new(5.0, 0.0, 0.0));
        assert!(matches!(result, Err(PlanningError::NoPath { .. })));
    }

    #[test]
    fn test_bounds_confine_search() {
        let field = empty_field();
        let bounds = SearchBounds::new(Point3D::origin(), Point3D::new(5.0, 5.0, 5.0));
        let planner = AStar3DPlanner::new(&field, PlannerConfig::default().with_bounds(bounds));

        match planner.search(Point3D::origin(), Point3D::new(10.0, 0.0, 0.0)) {
            Err(PlanningError::NoPath { expanded }) => assert_eq!(expanded, 216),
            other => panic!("expected NoPath, got {:?}", other),
        }
    }

    #[test]
    fn test_expansion_limit() {
        let field = empty_field();
        let config = PlannerConfig::default().with_max_expansions(Some(10));
        let planner = AStar3DPlanner::new(&field, config);

        let result = planner.search(Point3D::origin(), Point3D::new(50.0, 50.0, 50.0));
        assert!(matches!(result, Err(PlanningError::ExpansionLimit { limit: 10 })));
        assert!(planner
            .find_path(Point3D::origin(), Point3D::new(50.0, 50.0, 50.0))
            .is_empty());
    }

    #[test]
    fn test_timeout() {
        let field = empty_field();
        let planner = AStar3DPlanner::new(&field, PlannerConfig::default().with_timeout(Duration::ZERO));

        let result = planner.search(Point3D::origin(), Point3D::new(5.0, 0.0, 0.0));
        assert!(matches!(result, Err(PlanningError::Timeout { .. })));
    }

    #[test]
    fn test_cancelled_search() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);
        let token = CancelToken::new();
        let remote = token.clone();
        remote.cancel();

        let result = planner.search_with_cancel(Point3D::origin(), Point3D::new(5.0, 0.0, 0.0), &token);
        assert!(matches!(result, Err(PlanningError::Cancelled)));
    }

    #[test]
    fn test_invalid_inputs() {
        let field = empty_field();
        let planner = AStar3DPlanner::new(&field, PlannerConfig::default().with_max_expansions(Some(0)));
        assert!(matches!(
            planner.search(Point3D::origin(), Point3D::new(1.0, 0.0, 0.0)),
            Err(PlanningError::InvalidParameter(_))
        ));

        let planner = AStar3DPlanner::with_defaults(&field);
        assert!(matches!(
            planner.search(Point3D::new(f64::NAN, 0.0, 0.0), Point3D::origin()),
            Err(PlanningError::NumericalError(_))
        ));
    }

    #[test]
    fn test_reopen_never_worse_than_close_on_expand() {
        let mut field = empty_field();
        field.register_obstacle(Point3D::new(4.0, 1.0, 0.0), 1.5, -3.0..=1.0);
        field.register_obstacle(Point3D::new(8.0, -2.0, 2.0), 2.0, -2.0..=2.0);
        field.add_obstacle(Point3D::new(6.0, 4.0, -1.0), 1.0);
        let start = Point3D::new(0.0, 0.0, 0.0);
        let goal = Point3D::new(12.0, 1.0, 1.0);

        let closed = AStar3DPlanner::with_defaults(&field).search(start, goal).unwrap();
        let reopen = AStar3DPlanner::new(
            &field,
            PlannerConfig::default().with_revisit_policy(RevisitPolicy::Reopen),
        )
        .search(start, goal)
        .unwrap();

        assert!(reopen.cost <= closed.cost + 1e-9);
        assert_valid_path(&field, &reopen.path);
        assert_valid_path(&field, &closed.path);
    }

    #[test]
    fn test_search_is_deterministic() {
        let mut field = empty_field();
        field.register_obstacle(Point3D::new(3.0, 0.0, 0.0), 1.0, -5.0..=5.0);
        let planner = AStar3DPlanner::with_defaults(&field);

        let a = planner.find_path(Point3D::origin(), Point3D::new(6.0, 0.0, 0.0));
        let b = planner.find_path(Point3D::origin(), Point3D::new(6.0, 0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_find_waypoints_simplifies_result() {
        let field = empty_field();
        let planner = AStar3DPlanner::with_defaults(&field);

        let waypoints = planner
            .find_waypoints(Point3D::origin(), Point3D::new(8.0, 0.0, 0.0), 1.0)
            .unwrap();
        assert_eq!(
            waypoints.points,
            vec![Point3D::origin(), Point3D::new(8.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_config_serde_roundtrip_defaults() {
        let config: PlannerConfig =
            serde_json::from_str(r#"{ "revisit_policy": "reopen" }"#).unwrap();
        assert_eq!(config.revisit_policy, RevisitPolicy::Reopen);
        assert_eq!(config.max_expansions, Some(200_000));
        assert!(config.bounds.is_none());
    }
}
