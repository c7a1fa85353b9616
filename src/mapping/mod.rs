// Mapping module: occupied volume for 3D planning

pub mod obstacle_field;

pub use obstacle_field::*;
