use icestream::assembly::global::apply_dirichlet_bc;
use icestream::assembly::{Discretization, GlobalSystemBuilder};
use icestream::benchmark::{ConfinedShelf, CALVING_FRONT_MARKER, WALL_MARKER};
use icestream::constants::rheology;
use icestream::element::LagrangeBasis;
use icestream::fields::{IceSurface, ScalarField};
use icestream::mesh::{AdaptiveMesh, RefinementFlag};
use icestream::physics::Viscosity;
use icestream::solver::DiagnosticError;
use icestream::sparse::{CooMatrix, CsrMatrix};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, Point2};

fn shelf_mesh(shelf: &ConfinedShelf, locally_refined: bool) -> AdaptiveMesh {
    let mut mesh = shelf.base_mesh();
    mesh.refine_globally();
    if locally_refined {
        let mut flags = vec![RefinementFlag::Keep; mesh.num_active_cells()];
        flags[0] = RefinementFlag::Refine;
        flags[5] = RefinementFlag::Refine;
        mesh.execute_refinement(&flags);
    }
    mesh
}

fn linear_viscosity(shelf: &ConfinedShelf) -> Viscosity {
    Viscosity::linear_from_guess(rheology(shelf.temperature), 0.01)
}

fn max_abs(matrix: &DMatrix<f64>) -> f64 {
    matrix.iter().fold(0.0, |max, x| f64::max(max, x.abs()))
}

#[test]
fn linear_stiffness_is_symmetric_with_rigid_body_kernel() {
    let shelf = ConfinedShelf::default();
    let mesh = shelf_mesh(&shelf, false);
    let (thickness, bed) = (shelf.thickness(), shelf.bed());
    let surface = IceSurface::new(&bed, &thickness, shelf.constants);

    for basis in [LagrangeBasis::Linear, LagrangeBasis::Quadratic] {
        let discretization = Discretization::new(&mesh, basis, &shelf.exact_velocity(), &[WALL_MARKER]);
        let builder = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, true);
        let (matrix, _) = builder.assemble(linear_viscosity(&shelf), None).unwrap();

        let k = DMatrix::from(&matrix);
        let scale = max_abs(&k);
        assert_matrix_eq!(k, k.transpose(), comp = abs, tol = 1e-12 * scale);

        // Rigid body motions (two translations and a rotation) span the kernel
        let eigenvalues = k.symmetric_eigenvalues();
        assert!(eigenvalues.iter().all(|&lambda| lambda >= -1e-9 * scale));
        let num_zero = eigenvalues
            .iter()
            .filter(|&&lambda| lambda.abs() <= 1e-9 * scale)
            .count();
        assert_eq!(num_zero, 3);
    }
}

#[test]
fn reduced_system_is_positive_definite() {
    let shelf = ConfinedShelf::default();
    let (thickness, bed) = (shelf.thickness(), shelf.bed());
    let surface = IceSurface::new(&bed, &thickness, shelf.constants);

    for locally_refined in [false, true] {
        let mesh = shelf_mesh(&shelf, locally_refined);
        for basis in [LagrangeBasis::Linear, LagrangeBasis::Quadratic] {
            let discretization = Discretization::new(&mesh, basis, &shelf.exact_velocity(), &[WALL_MARKER]);
            assert_eq!(discretization.constraints().is_empty(), !locally_refined);
            let builder = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, false);
            let (matrix, rhs) = builder.build(linear_viscosity(&shelf), None).unwrap();

            let k = DMatrix::from(&matrix);
            assert_matrix_eq!(k, k.transpose(), comp = abs, tol = 1e-12 * max_abs(&k));
            let cholesky = k.cholesky().expect("Reduced system must be positive definite");

            // The solution satisfies the boundary conditions and vanishes at dependent DoFs
            let u = cholesky.solve(&rhs);
            for &(dof, value) in discretization.boundary_values() {
                assert_scalar_eq!(u[dof], value, comp = abs, tol = 1e-9 * shelf.max_velocity());
            }
            for (dof, _) in discretization.constraints().iter() {
                assert_eq!(u[dof], 0.0);
            }
        }
    }
}

#[test]
fn load_is_in_hydrostatic_balance() {
    // Integrated over the shelf, driving stress and calving front pressure leave exactly the
    // net hydrostatic force ½ ρ g (1 - ρ/ρ_w) W h0² acting on the inflow boundary
    let shelf = ConfinedShelf::default();
    let mesh = shelf_mesh(&shelf, true);
    let (thickness, bed) = (shelf.thickness(), shelf.bed());
    let surface = IceSurface::new(&bed, &thickness, shelf.constants);
    let discretization = Discretization::new(&mesh, LagrangeBasis::Linear, &shelf.exact_velocity(), &[WALL_MARKER]);
    let builder = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, true);
    let (_, rhs) = builder.assemble(linear_viscosity(&shelf), None).unwrap();

    let constants = &shelf.constants;
    let h0 = thickness.value(&Point2::origin());
    let expected = 0.5 * constants.rho_ice * constants.gravity * (1.0 - constants.density_ratio()) * shelf.width * h0 * h0;
    let total_x: f64 = rhs.iter().step_by(2).sum();
    let total_y: f64 = rhs.iter().skip(1).step_by(2).sum();
    assert_scalar_eq!(total_x, expected, comp = abs, tol = 1e-9 * expected);
    assert_scalar_eq!(total_y, 0.0, comp = abs, tol = 1e-9 * expected);
}

#[test]
fn parallel_and_serial_assembly_agree() {
    let shelf = ConfinedShelf::default();
    let mesh = shelf_mesh(&shelf, true);
    let (thickness, bed) = (shelf.thickness(), shelf.bed());
    let surface = IceSurface::new(&bed, &thickness, shelf.constants);
    let exact = shelf.exact_velocity();
    let discretization = Discretization::new(&mesh, LagrangeBasis::Quadratic, &exact, &[WALL_MARKER]);
    let u = discretization.dofs().interpolate(&exact);
    let viscosity = Viscosity::Nonlinear {
        rheology: rheology(shelf.temperature),
    };

    let serial = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, false)
        .build(viscosity, Some(&u))
        .unwrap();
    let parallel = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, true)
        .build(viscosity, Some(&u))
        .unwrap();
    assert_eq!(serial.0.values(), parallel.0.values());
    assert_eq!(serial.1, parallel.1);
}

#[test]
fn nonlinear_assembly_requires_velocity() {
    let shelf = ConfinedShelf::default();
    let mesh = shelf.base_mesh();
    let (thickness, bed) = (shelf.thickness(), shelf.bed());
    let surface = IceSurface::new(&bed, &thickness, shelf.constants);
    let discretization = Discretization::new(&mesh, LagrangeBasis::Linear, &shelf.exact_velocity(), &[WALL_MARKER]);
    let builder = GlobalSystemBuilder::new(&mesh, &discretization, surface, CALVING_FRONT_MARKER, true);
    let result = builder.build(Viscosity::Nonlinear { rheology: 1.0 }, None);
    assert!(matches!(result, Err(DiagnosticError::Assembly(_))));
}

#[test]
fn dirichlet_elimination_keeps_symmetry() {
    let mut coo = CooMatrix::new(3, 3);
    for (i, j, v) in [(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 4.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 4.0)] {
        coo.push(i, j, v);
    }
    let mut matrix = CsrMatrix::from(&coo);
    let mut rhs = DVector::from_vec(vec![1.0, 2.0, 3.0]);
    apply_dirichlet_bc(&mut matrix, &mut rhs, &[(0, 2.0)]);

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        4.0, 0.0, 0.0,
        0.0, 4.0, 1.0,
        0.0, 1.0, 4.0,
    ]);
    assert_matrix_eq!(DMatrix::from(&matrix), expected);
    assert_eq!(rhs.as_slice(), &[8.0, 0.0, 3.0]);
}
