//! Planning scenarios: obstacles, endpoints and planner settings in one
//! JSON document, plus a seeded generator for random obstacle fields.

use std::fs;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::{Path3D, PlanningResult, Point3D};
use crate::mapping::{Obstacle, ObstacleField};
use crate::path_planning::{AStar3DPlanner, PlannerConfig, WaypointSimplifier};

fn default_grid_size() -> f64 {
    1.0
}

fn default_max_deviation() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub safety_margin: f64,
    pub start: Point3D,
    pub goal: Point3D,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default = "default_max_deviation")]
    pub max_deviation: f64,
}

/// Outcome of running a scenario end to end
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub raw_path: Path3D,
    pub waypoints: Path3D,
    pub cost: f64,
    pub expanded: usize,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> PlanningResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> PlanningResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> PlanningResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Scattered columns between start and goal, reproducible from `seed`
    pub fn random(seed: u64, obstacle_count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let start = Point3D::new(0.0, 0.0, 5.0);
        let goal = Point3D::new(30.0, 0.0, 5.0);
        let obstacles = (0..obstacle_count)
            .map(|_| {
                let center = Point3D::new(
                    rng.gen_range(5.0..25.0_f64).round(),
                    rng.gen_range(-8.0..8.0_f64).round(),
                    5.0,
                );
                let radius = rng.gen_range(1.0..3.0);
                let height = rng.gen_range(2.0..8.0);
                Obstacle::new(center, radius, -height..=height)
            })
            .collect();

        Self {
            grid_size: default_grid_size(),
            safety_margin: 0.0,
            start,
            goal,
            obstacles,
            planner: PlannerConfig::default(),
            max_deviation: default_max_deviation(),
        }
    }

    pub fn build_field(&self) -> PlanningResult<ObstacleField> {
        let mut field = ObstacleField::new(self.grid_size)?.with_safety_margin(self.safety_margin)?;
        for obstacle in &self.obstacles {
            field.insert(obstacle);
        }
        Ok(field)
    }

    /// Build the field, search and simplify
    pub fn run(&self, field: &ObstacleField) -> PlanningResult<PlanReport> {
        let planner = AStar3DPlanner::new(field, self.planner.clone());
        let outcome = planner.search(self.start, self.goal)?;
        let waypoints = WaypointSimplifier::new(field).simplify(&outcome.path, self.max_deviation);
        info!(
            "planned {} lattice points (cost {:.2}, {} expansions), {} waypoints",
            outcome.path.len(),
            outcome.cost,
            outcome.expanded,
            waypoints.len()
        );
        Ok(PlanReport {
            raw_path: outcome.path,
            waypoints,
            cost: outcome.cost,
            expanded: outcome.expanded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PlanningError;
    use crate::path_planning::RevisitPolicy;

    const SCENARIO: &str = r#"{
        "grid_size": 1.0,
        "start": [0, 0, 0],
        "goal": [12, 0, 0],
        "obstacles": [
            { "center": [6, 0, 0], "radius": 2.0, "vertical_extent": [-6, 6] }
        ],
        "planner": { "revisit_policy": "reopen", "max_expansions": 50000 }
    }"#;

    #[test]
    fn test_parse_scenario_with_defaults() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        assert_eq!(scenario.safety_margin, 0.0);
        assert_eq!(scenario.max_deviation, 1.0);
        assert_eq!(scenario.planner.revisit_policy, RevisitPolicy::Reopen);
        assert_eq!(scenario.planner.max_expansions, Some(50_000));
        assert_eq!(scenario.obstacles[0].vertical_extent, [-6.0, 6.0]);
    }

    #[test]
    fn test_run_scenario() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        let field = scenario.build_field().unwrap();

        let report = scenario.run(&field).unwrap();

        assert_eq!(report.raw_path.first(), Some(&scenario.start));
        assert!(report.waypoints.len() >= 3);
        assert!(report.waypoints.len() <= report.raw_path.len());
        assert!(report.cost > 12.0);
    }

    #[test]
    fn test_invalid_scenario() {
        assert!(matches!(
            Scenario::from_json_str("{ \"start\": [0, 0] }"),
            Err(PlanningError::Scenario(_))
        ));
        let mut scenario = Scenario::from_json_str(SCENARIO).unwrap();
        scenario.grid_size = 0.0;
        assert!(matches!(
            scenario.build_field(),
            Err(PlanningError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_random_scenario_is_reproducible() {
        let a = Scenario::random(3, 8);
        let b = Scenario::random(3, 8);
        assert_eq!(a, b);
        assert_eq!(a.obstacles.len(), 8);

        let json = a.to_json().unwrap();
        assert_eq!(Scenario::from_json_str(&json).unwrap(), a);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::from_file("/nonexistent/scenario.json"),
            Err(PlanningError::Io(_))
        ));
    }
}
