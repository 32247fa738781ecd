//! Adaptive finite element solver for the shallow-shelf approximation (SSA) of ice flow.
//!
//! The crate computes the depth-integrated velocity of an ice shelf from its geometry. The
//! pieces, from the bottom up:
//!
//! - [`fields`]: thickness, bed and derived surface elevation,
//! - [`physics`]: the linear (bootstrap) and nonlinear (Glen's law) viscosity,
//! - [`assembly`]: cell-local and global assembly of the momentum balance,
//! - [`constraints`]: hanging-node constraints on locally refined meshes,
//! - [`solver`]: preconditioned CG for the linear systems and the Picard iteration around it,
//! - [`adapt`]: error estimation, marking and solution transfer between mesh generations,
//! - [`driver`]: the refinement cycle loop.
pub mod adapt;
pub mod assembly;
pub mod benchmark;
pub mod config;
pub mod constants;
pub mod constraints;
pub mod dofs;
pub mod driver;
pub mod element;
pub mod error;
pub mod fields;
pub mod mesh;
pub mod physics;
pub mod solver;
pub mod velocity;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use icestream_quadrature as quadrature;
pub use icestream_sparse as sparse;
