//! Common types used throughout drone_motion_planning

use itertools::Itertools;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 3D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn distance(&self, other: &Point3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Point at parameter `t` along the segment from `self` to `other`
    pub fn lerp(&self, other: &Point3D, t: f64) -> Point3D {
        let a = self.to_vector();
        (a + (other.to_vector() - a) * t).into()
    }

    /// Offset by the given deltas
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Point3D {
        Point3D::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<(f64, f64, f64)> for Point3D {
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1, z: tuple.2 }
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(a: [f64; 3]) -> Self {
        Self { x: a[0], y: a[1], z: a[2] }
    }
}

impl From<Point3D> for [f64; 3] {
    fn from(p: Point3D) -> Self {
        [p.x, p.y, p.z]
    }
}

impl From<Vector3<f64>> for Point3D {
    fn from(v: Vector3<f64>) -> Self {
        Self { x: v[0], y: v[1], z: v[2] }
    }
}

/// Integer index of a point on a lattice of spacing `grid_size`.
///
/// Lattice identity is decided on these integers rather than on float
/// coordinates, so accumulated drift never splits one lattice point into
/// two, whatever the spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticePoint {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl LatticePoint {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Index of the lattice point nearest to `p`
    pub fn from_point(p: &Point3D, grid_size: f64) -> Self {
        Self {
            x: (p.x / grid_size).round() as i64,
            y: (p.y / grid_size).round() as i64,
            z: (p.z / grid_size).round() as i64,
        }
    }

    /// Position of this index on a lattice anchored at `origin`
    pub fn to_point(&self, origin: &Point3D, grid_size: f64) -> Point3D {
        origin.offset(
            self.x as f64 * grid_size,
            self.y as f64 * grid_size,
            self.z as f64 * grid_size,
        )
    }

    pub fn offset(&self, dx: i64, dy: i64, dz: i64) -> LatticePoint {
        LatticePoint::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// Path represented as a sequence of 3D points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path3D {
    pub points: Vec<Point3D>,
}

impl Path3D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point3D> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point3D> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3D> {
        self.points.iter()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn z_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.z).collect()
    }

    pub fn total_length(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.distance(b))
            .sum()
    }
}

impl From<Vec<Point3D>> for Path3D {
    fn from(points: Vec<Point3D>) -> Self {
        Self::from_points(points)
    }
}

impl<'a> IntoIterator for &'a Path3D {
    type Item = &'a Point3D;
    type IntoIter = std::slice::Iter<'a, Point3D>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point3d_distance() {
        let p1 = Point3D::origin();
        let p2 = Point3D::new(1.0, 2.0, 2.0);
        assert_relative_eq!(p1.distance(&p2), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point3d_lerp() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(4.0, -2.0, 8.0);
        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.x, 2.0);
        assert_relative_eq!(mid.y, -1.0);
        assert_relative_eq!(mid.z, 4.0);
    }

    #[test]
    fn test_lattice_point_absorbs_float_drift() {
        let drifted = Point3D::new(0.1 + 0.2, 1.0 - 1e-9, -2.004);
        let clean = Point3D::new(0.3, 1.0, -2.0);
        assert_eq!(
            LatticePoint::from_point(&drifted, 0.1),
            LatticePoint::from_point(&clean, 0.1)
        );
        assert_eq!(LatticePoint::from_point(&clean, 0.1), LatticePoint::new(3, 10, -20));
    }

    #[test]
    fn test_lattice_point_on_fine_grid() {
        // spacings finer than a centimeter still give distinct indices
        let a = LatticePoint::from_point(&Point3D::new(0.004, 0.0, 0.0), 0.004);
        let b = LatticePoint::from_point(&Point3D::new(0.008, 0.0, 0.0), 0.004);
        assert_ne!(a, b);
        assert_eq!(b, a.offset(1, 0, 0));
    }

    #[test]
    fn test_lattice_point_to_point_is_anchored() {
        let origin = Point3D::new(0.25, -1.0, 3.0);
        let p = LatticePoint::new(2, 0, -1).to_point(&origin, 0.015);
        assert_relative_eq!(p.x, 0.28, epsilon = 1e-12);
        assert_relative_eq!(p.y, -1.0);
        assert_relative_eq!(p.z, 2.985, epsilon = 1e-12);
        assert_eq!(LatticePoint::new(0, 0, 0).to_point(&origin, 0.015), origin);
    }

    #[test]
    fn test_path3d_total_length() {
        let path = Path3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(1.0, 1.0, 0.0),
            Point3D::new(1.0, 1.0, 1.0),
        ]);
        assert_relative_eq!(path.total_length(), 3.0, epsilon = 1e-12);
        assert_eq!(path.z_coords(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_point3d_serde_as_array() {
        let p: Point3D = serde_json::from_str("[1.5, -2.0, 3.0]").unwrap();
        assert_eq!(p, Point3D::new(1.5, -2.0, 3.0));
        assert_eq!(serde_json::to_string(&p).unwrap(), "[1.5,-2.0,3.0]");
    }
}
