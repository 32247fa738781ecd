//! Scalar and vector fields over the plane.
//!
//! Fields are total functions: the solver may sample them anywhere in the domain, including at
//! quadrature points and on refined vertices that were not part of the input mesh.
use crate::constants::PhysicalConstants;
use nalgebra::{Point2, Vector2};

/// A scalar field with point and gradient evaluation, e.g. ice thickness or bed elevation.
pub trait ScalarField: Send + Sync {
    fn value(&self, x: &Point2<f64>) -> f64;

    fn gradient(&self, x: &Point2<f64>) -> Vector2<f64>;
}

/// A vector-valued field, e.g. the prescribed boundary velocity.
pub trait VectorField: Send + Sync {
    fn value(&self, x: &Point2<f64>) -> Vector2<f64>;
}

impl<F> ScalarField for &F
where
    F: ?Sized + ScalarField,
{
    fn value(&self, x: &Point2<f64>) -> f64 {
        F::value(self, x)
    }

    fn gradient(&self, x: &Point2<f64>) -> Vector2<f64> {
        F::gradient(self, x)
    }
}

impl<F> ScalarField for Box<F>
where
    F: ?Sized + ScalarField,
{
    fn value(&self, x: &Point2<f64>) -> f64 {
        F::value(self, x)
    }

    fn gradient(&self, x: &Point2<f64>) -> Vector2<f64> {
        F::gradient(self, x)
    }
}

impl<F> VectorField for &F
where
    F: ?Sized + VectorField,
{
    fn value(&self, x: &Point2<f64>) -> Vector2<f64> {
        F::value(self, x)
    }
}

impl<F> VectorField for Box<F>
where
    F: ?Sized + VectorField,
{
    fn value(&self, x: &Point2<f64>) -> Vector2<f64> {
        F::value(self, x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField(pub f64);

impl ScalarField for ConstantField {
    fn value(&self, _x: &Point2<f64>) -> f64 {
        self.0
    }

    fn gradient(&self, _x: &Point2<f64>) -> Vector2<f64> {
        Vector2::zeros()
    }
}

/// The field `x ↦ value_at_origin + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineField {
    pub value_at_origin: f64,
    pub slope: Vector2<f64>,
}

impl AffineField {
    pub fn new(value_at_origin: f64, slope: Vector2<f64>) -> Self {
        Self { value_at_origin, slope }
    }

    /// The field varying linearly in `x` from `start` at `x = 0` to `end` at `x = length`.
    pub fn linear_in_x(start: f64, end: f64, length: f64) -> Self {
        Self::new(start, Vector2::new((end - start) / length, 0.0))
    }
}

impl ScalarField for AffineField {
    fn value(&self, x: &Point2<f64>) -> f64 {
        self.value_at_origin + self.slope.dot(&x.coords)
    }

    fn gradient(&self, _x: &Point2<f64>) -> Vector2<f64> {
        self.slope
    }
}

/// A vector field defined by a closure.
#[derive(Debug, Clone, Copy)]
pub struct FnVectorField<F>(pub F);

impl<F> VectorField for FnVectorField<F>
where
    F: Fn(&Point2<f64>) -> Vector2<f64> + Send + Sync,
{
    fn value(&self, x: &Point2<f64>) -> Vector2<f64> {
        (self.0)(x)
    }
}

/// Surface elevation of ice with the given bed elevation and thickness.
///
/// Ice floats whenever hydrostatic equilibrium puts its surface above `bed + thickness`.
pub fn flotation_surface(bed: f64, thickness: f64, constants: &PhysicalConstants) -> f64 {
    let grounded = bed + thickness;
    let floating = (1.0 - constants.density_ratio()) * thickness;
    grounded.max(floating)
}

/// The surface elevation derived from bed and thickness fields.
#[derive(Clone, Copy)]
pub struct IceSurface<'a> {
    bed: &'a dyn ScalarField,
    thickness: &'a dyn ScalarField,
    constants: PhysicalConstants,
}

impl<'a> IceSurface<'a> {
    pub fn new(bed: &'a dyn ScalarField, thickness: &'a dyn ScalarField, constants: PhysicalConstants) -> Self {
        Self {
            bed,
            thickness,
            constants,
        }
    }

    pub fn bed(&self) -> &'a dyn ScalarField {
        self.bed
    }

    pub fn thickness(&self) -> &'a dyn ScalarField {
        self.thickness
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    pub fn is_floating(&self, x: &Point2<f64>) -> bool {
        let h = self.thickness.value(x);
        let grounded = self.bed.value(x) + h;
        let floating = (1.0 - self.constants.density_ratio()) * h;
        floating > grounded
    }

    /// Elevation of the ice base, `surface - thickness`.
    pub fn base(&self, x: &Point2<f64>) -> f64 {
        self.value(x) - self.thickness.value(x)
    }
}

impl ScalarField for IceSurface<'_> {
    fn value(&self, x: &Point2<f64>) -> f64 {
        flotation_surface(self.bed.value(x), self.thickness.value(x), &self.constants)
    }

    fn gradient(&self, x: &Point2<f64>) -> Vector2<f64> {
        let grad_h = self.thickness.gradient(x);
        if self.is_floating(x) {
            grad_h * (1.0 - self.constants.density_ratio())
        } else {
            self.bed.gradient(x) + grad_h
        }
    }
}
