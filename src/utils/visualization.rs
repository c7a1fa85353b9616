//! Visualization utilities for drone_motion_planning
//!
//! Collects obstacle cells, paths and markers, then renders them into a
//! single gnuplot 3D axes.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Path3D, PlanningError, PlanningResult, Point3D};
use crate::mapping::ObstacleField;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = GRAY;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const WAYPOINTS: &str = ORANGE;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Path")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        style: PathStyle,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        style: PointStyle,
    },
}

/// 3D plot builder
pub struct Visualizer {
    series: Vec<Series>,
    title: String,
    view: Option<(f64, f64)>,
    z_range: Option<(f64, f64)>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            title: String::new(),
            view: None,
            z_range: None,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Camera pitch and yaw in degrees
    pub fn set_view(&mut self, pitch: f64, yaw: f64) -> &mut Self {
        self.view = Some((pitch, yaw));
        self
    }

    pub fn set_z_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.z_range = Some((min, max));
        self
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Plot every occupied cell of the field
    pub fn plot_obstacle_field(&mut self, field: &ObstacleField) -> &mut Self {
        let cells: Vec<Point3D> = field.occupied_cells().collect();
        let style = PointStyle::new(colors::OBSTACLE, "Obstacles")
            .with_symbol('S')
            .with_size(0.5);
        self.plot_points(&cells, &style)
    }

    pub fn plot_path(&mut self, path: &Path3D, style: &PathStyle) -> &mut Self {
        self.series.push(Series::Lines {
            x: path.x_coords(),
            y: path.y_coords(),
            z: path.z_coords(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_points(&mut self, points: &[Point3D], style: &PointStyle) -> &mut Self {
        self.series.push(Series::Points {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            z: points.iter().map(|p| p.z).collect(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_point(&mut self, point: Point3D, style: &PointStyle) -> &mut Self {
        self.plot_points(&[point], style)
    }

    pub fn plot_start(&mut self, point: Point3D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, point: Point3D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    pub fn show(&self) -> PlanningResult<()> {
        let mut figure = self.render();
        figure
            .show()
            .map(|_| ())
            .map_err(|e| PlanningError::Visualization(e.to_string()))
    }

    pub fn save_png(&self, path: &str, width: u32, height: u32) -> PlanningResult<()> {
        self.render()
            .save_to_png(path, width, height)
            .map_err(|e| PlanningError::Visualization(e.to_string()))
    }

    pub fn save_svg(&self, path: &str) -> PlanningResult<()> {
        self.render()
            .save_to_svg(path, 800, 600)
            .map_err(|e| PlanningError::Visualization(e.to_string()))
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes3d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);
        axes.set_z_label("Z [m]", &[]);
        if let Some((pitch, yaw)) = self.view {
            axes.set_view(pitch, yaw);
        }
        if let Some((min, max)) = self.z_range {
            axes.set_z_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }

        for series in &self.series {
            match series {
                Series::Lines { x, y, z, style } => {
                    axes.lines(x, y, z, &[
                        Caption(style.caption.as_str()),
                        Color(style.color.as_str()),
                        LineWidth(style.line_width),
                    ]);
                }
                Series::Points { x, y, z, style } => {
                    axes.points(x, y, z, &[
                        Caption(style.caption.as_str()),
                        Color(style.color.as_str()),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Plot field, raw path and waypoints of one planning run
pub fn quick_plot_plan(
    field: &ObstacleField,
    raw_path: &Path3D,
    waypoints: &Path3D,
    title: &str,
) -> Visualizer {
    let mut vis = Visualizer::new();
    vis.set_title(title);
    vis.plot_obstacle_field(field);
    vis.plot_path(raw_path, &PathStyle::new(colors::PATH, "A* path").with_line_width(1.0));
    vis.plot_path(waypoints, &PathStyle::new(colors::WAYPOINTS, "Waypoints"));
    if let Some(start) = raw_path.first() {
        vis.plot_start(*start);
    }
    if let Some(goal) = raw_path.last() {
        vis.plot_goal(*goal);
    }
    vis
}
