// Path Planning algorithms module

pub mod a_star_3d;
pub mod waypoint_simplifier;

pub use a_star_3d::*;
pub use waypoint_simplifier::*;
