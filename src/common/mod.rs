//! Common types, traits, and error definitions for drone_motion_planning
//!
//! This module provides the foundational building blocks shared by the
//! obstacle field, the planner and the simplifier.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
