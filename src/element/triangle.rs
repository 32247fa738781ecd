use itertools::Itertools;
use nalgebra::{distance, Matrix2, Point2, Vector2};

/// An affine triangle in two dimensions.
///
/// The reference triangle has the corners (0, 0), (1, 0), (0, 1), and local face `k` connects
/// vertex `k` to vertex `(k + 1) % 3`. Vertices are expected in counter-clockwise order, so
/// that the Jacobian determinant is positive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriangleElement {
    vertices: [Point2<f64>; 3],
}

impl TriangleElement {
    pub fn from_vertices(vertices: [Point2<f64>; 3]) -> Self {
        Self { vertices }
    }

    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)])
    }

    pub fn vertices(&self) -> &[Point2<f64>; 3] {
        &self.vertices
    }

    /// The (constant) Jacobian of the reference map.
    pub fn reference_jacobian(&self) -> Matrix2<f64> {
        let [x0, x1, x2] = &self.vertices;
        Matrix2::from_columns(&[x1 - x0, x2 - x0])
    }

    pub fn map_reference_coords(&self, xi: &Point2<f64>) -> Point2<f64> {
        self.vertices[0] + self.reference_jacobian() * xi.coords
    }

    /// Maps physical coordinates back to the reference triangle.
    ///
    /// Returns `None` if the triangle is degenerate.
    pub fn map_physical_coords(&self, x: &Point2<f64>) -> Option<Point2<f64>> {
        let j_inv = self.reference_jacobian().try_inverse()?;
        Some(Point2::from(j_inv * (x - self.vertices[0])))
    }

    /// Signed area, positive for counter-clockwise vertices.
    pub fn signed_area(&self) -> f64 {
        0.5 * self.reference_jacobian().determinant()
    }

    pub fn diameter(&self) -> f64 {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(0.0, f64::max)
    }

    /// The end points of local face `k`.
    pub fn face(&self, k: usize) -> [Point2<f64>; 2] {
        [self.vertices[k], self.vertices[(k + 1) % 3]]
    }

    pub fn face_length(&self, k: usize) -> f64 {
        let [a, b] = self.face(k);
        distance(&a, &b)
    }

    /// Outward unit normal of face `k`.
    pub fn face_normal(&self, k: usize) -> Vector2<f64> {
        let [a, b] = self.face(k);
        let t = b - a;
        Vector2::new(t.y, -t.x).normalize()
    }

    /// Reference coordinates of the point at parameter `t` in `[0, 1]` along face `k`.
    pub fn face_reference_point(k: usize, t: f64) -> Point2<f64> {
        let corners = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let a = corners[k];
        let b = corners[(k + 1) % 3];
        a + (b - a) * t
    }
}

/// Whether reference coordinates lie in the reference triangle, up to the given tolerance.
pub fn reference_triangle_contains(xi: &Point2<f64>, tol: f64) -> bool {
    xi.x >= -tol && xi.y >= -tol && xi.x + xi.y <= 1.0 + tol
}
