//! Utility modules for drone_motion_planning

pub mod visualization;

pub use visualization::{Visualizer, PathStyle, PointStyle, colors, quick_plot_plan};
