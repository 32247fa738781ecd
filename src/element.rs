//! Triangle geometry and Lagrange shape functions.
use icestream_quadrature::{univariate, Rule1d, Rule2d};
use nalgebra::{Matrix2, Point2, Vector2};

mod triangle;

pub use triangle::*;

/// Lagrange shape functions on the reference triangle.
///
/// Node order: the three vertices, followed (for degree 2) by the edge midpoints of local faces
/// 0, 1 and 2, i.e. node `3 + k` sits on the midpoint between vertex `k` and vertex `(k + 1) % 3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LagrangeBasis {
    Linear,
    Quadratic,
}

static LINEAR_FACE_NODES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
static QUADRATIC_FACE_NODES: [[usize; 3]; 3] = [[0, 1, 3], [1, 2, 4], [2, 0, 5]];

impl LagrangeBasis {
    pub fn from_degree(degree: usize) -> Option<Self> {
        match degree {
            1 => Some(Self::Linear),
            2 => Some(Self::Quadratic),
            _ => None,
        }
    }

    pub fn degree(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Linear => 3,
            Self::Quadratic => 6,
        }
    }

    pub fn reference_node(&self, index: usize) -> Point2<f64> {
        assert!(index < self.num_nodes());
        match index {
            0 => Point2::new(0.0, 0.0),
            1 => Point2::new(1.0, 0.0),
            2 => Point2::new(0.0, 1.0),
            3 => Point2::new(0.5, 0.0),
            4 => Point2::new(0.5, 0.5),
            _ => Point2::new(0.0, 0.5),
        }
    }

    /// Local nodes on face `k`: the two end points in face order, then the edge node (degree 2).
    pub fn face_nodes(&self, k: usize) -> &'static [usize] {
        match self {
            Self::Linear => &LINEAR_FACE_NODES[k],
            Self::Quadratic => &QUADRATIC_FACE_NODES[k],
        }
    }

    /// Evaluates all basis functions at `xi`.
    ///
    /// # Panics
    ///
    /// Panics if `phi` does not have one entry per node.
    pub fn populate_basis(&self, phi: &mut [f64], xi: &Point2<f64>) {
        assert_eq!(phi.len(), self.num_nodes());
        let l = barycentric(xi);
        match self {
            Self::Linear => phi.copy_from_slice(&l),
            Self::Quadratic => {
                for i in 0..3 {
                    phi[i] = l[i] * (2.0 * l[i] - 1.0);
                    phi[3 + i] = 4.0 * l[i] * l[(i + 1) % 3];
                }
            }
        }
    }

    /// Evaluates the gradients of all basis functions with respect to reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `gradients` does not have one entry per node.
    pub fn populate_reference_gradients(&self, gradients: &mut [Vector2<f64>], xi: &Point2<f64>) {
        assert_eq!(gradients.len(), self.num_nodes());
        let grad_l = [Vector2::new(-1.0, -1.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        match self {
            Self::Linear => gradients.copy_from_slice(&grad_l),
            Self::Quadratic => {
                let l = barycentric(xi);
                for i in 0..3 {
                    let j = (i + 1) % 3;
                    gradients[i] = grad_l[i] * (4.0 * l[i] - 1.0);
                    gradients[3 + i] = (grad_l[j] * l[i] + grad_l[i] * l[j]) * 4.0;
                }
            }
        }
    }

    /// Cell quadrature that integrates the stiffness of an affine cell exactly.
    pub fn cell_quadrature(&self) -> Rule2d {
        match self {
            Self::Linear => icestream_quadrature::triangle::strength_2(),
            Self::Quadratic => icestream_quadrature::triangle::strength_4(),
        }
    }

    /// Gauss rule on `[0, 1]` for face integrals.
    pub fn face_quadrature(&self) -> Rule1d {
        univariate::gauss_unit_interval(self.degree() + 1)
    }
}

fn barycentric(xi: &Point2<f64>) -> [f64; 3] {
    [1.0 - xi.x - xi.y, xi.x, xi.y]
}

/// Transforms reference gradients to physical gradients, `∇φ = J⁻ᵀ ∇̂φ`.
pub fn transform_gradients(
    jacobian_inverse_transpose: &Matrix2<f64>,
    reference_gradients: &[Vector2<f64>],
    gradients: &mut [Vector2<f64>],
) {
    assert_eq!(reference_gradients.len(), gradients.len());
    for (grad, grad_ref) in gradients.iter_mut().zip(reference_gradients) {
        *grad = jacobian_inverse_transpose * grad_ref;
    }
}
