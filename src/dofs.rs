//! Degrees of freedom of the velocity on an active mesh generation.
use crate::assembly::local::CellConnectivityAssembler;
use crate::element::LagrangeBasis;
use crate::fields::VectorField;
use crate::mesh::{edge_key, AdaptiveMesh, EdgeTopology, FaceNeighbor};
use nalgebra::{DVector, Point2};
use std::collections::HashMap;

/// Number of velocity components.
pub const SOLUTION_DIM: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Vertex(usize),
    Edge(usize, usize),
}

/// A face on the domain boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundaryFace {
    /// Position of the cell in the active list.
    pub position: usize,
    pub face: usize,
    pub marker: u32,
}

/// Lagrange nodes and degrees of freedom for the active cells of one mesh generation.
///
/// Velocity components are interleaved, i.e. component `c` of node `n` is DoF `2 n + c`.
/// Nodes are numbered in order of first appearance when walking the active cells.
///
/// For quadratic elements, the edge node of a face whose neighbors are finer is the hanging
/// midpoint vertex, so that coarse and fine cells share it.
#[derive(Debug, Clone)]
pub struct DofMap {
    generation: usize,
    basis: LagrangeBasis,
    cells: Vec<usize>,
    cell_nodes: Vec<usize>,
    node_positions: Vec<Point2<f64>>,
    node_keys: HashMap<NodeKey, usize>,
    boundary_faces: Vec<BoundaryFace>,
}

impl DofMap {
    /// Builds the DoF map for the current generation of the mesh.
    ///
    /// # Panics
    ///
    /// Panics if the topology does not belong to the current mesh generation.
    pub fn new(mesh: &AdaptiveMesh, topology: &EdgeTopology, basis: LagrangeBasis) -> Self {
        assert_eq!(
            topology.generation(),
            mesh.generation(),
            "Topology must belong to the current mesh generation"
        );

        let mut node_keys = HashMap::new();
        let mut node_positions = Vec::new();
        let mut cell_nodes = Vec::with_capacity(basis.num_nodes() * mesh.num_active_cells());
        let mut boundary_faces = Vec::new();

        let mut node_for_key = |key: NodeKey| {
            *node_keys.entry(key).or_insert_with(|| {
                let position = match key {
                    NodeKey::Vertex(v) => mesh.vertices()[v],
                    NodeKey::Edge(a, b) => nalgebra::center(&mesh.vertices()[a], &mesh.vertices()[b]),
                };
                node_positions.push(position);
                node_positions.len() - 1
            })
        };

        for (position, &cell_index) in mesh.active_cells().iter().enumerate() {
            let cell = mesh.cell(cell_index);
            for &v in cell.vertices() {
                cell_nodes.push(node_for_key(NodeKey::Vertex(v)));
            }

            let faces = topology.cell_faces(position);
            if basis == LagrangeBasis::Quadratic {
                for (k, neighbor) in faces.iter().enumerate() {
                    let key = match neighbor {
                        FaceNeighbor::Finer { midpoint, .. } => NodeKey::Vertex(*midpoint),
                        _ => {
                            let [a, b] = cell.face_vertices(k);
                            let (a, b) = edge_key(a, b);
                            NodeKey::Edge(a, b)
                        }
                    };
                    cell_nodes.push(node_for_key(key));
                }
            }

            for (face, neighbor) in faces.iter().enumerate() {
                if let FaceNeighbor::Boundary { marker } = neighbor {
                    boundary_faces.push(BoundaryFace {
                        position,
                        face,
                        marker: *marker,
                    });
                }
            }
        }

        Self {
            generation: mesh.generation(),
            basis,
            cells: mesh.active_cells().to_vec(),
            cell_nodes,
            node_positions,
            node_keys,
            boundary_faces,
        }
    }

    /// The mesh generation the map was built for.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn basis(&self) -> LagrangeBasis {
        self.basis
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Arena index of the cell at the given active position.
    pub fn cell(&self, position: usize) -> usize {
        self.cells[position]
    }

    pub fn num_nodes(&self) -> usize {
        self.node_positions.len()
    }

    pub fn num_dofs(&self) -> usize {
        SOLUTION_DIM * self.num_nodes()
    }

    /// Global nodes of the cell at the given active position, in local node order.
    pub fn cell_nodes(&self, position: usize) -> &[usize] {
        let n = self.basis.num_nodes();
        &self.cell_nodes[n * position..n * (position + 1)]
    }

    pub fn node_positions(&self) -> &[Point2<f64>] {
        &self.node_positions
    }

    pub fn vertex_node(&self, vertex: usize) -> Option<usize> {
        self.node_keys.get(&NodeKey::Vertex(vertex)).copied()
    }

    /// The edge node of the edge between two vertices (quadratic elements only).
    pub fn edge_node(&self, a: usize, b: usize) -> Option<usize> {
        let (a, b) = edge_key(a, b);
        self.node_keys.get(&NodeKey::Edge(a, b)).copied()
    }

    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary_faces
    }

    /// Sorted nodes on boundary faces carrying one of the given markers.
    pub fn boundary_nodes(&self, markers: &[u32]) -> Vec<usize> {
        let mut nodes: Vec<_> = self
            .boundary_faces
            .iter()
            .filter(|face| markers.contains(&face.marker))
            .flat_map(|face| {
                let cell_nodes = self.cell_nodes(face.position);
                self.basis
                    .face_nodes(face.face)
                    .iter()
                    .map(move |&local| cell_nodes[local])
            })
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Interpolates the field at the nodes on boundary faces with the given markers.
    ///
    /// Returns `(dof, value)` pairs sorted by DoF.
    pub fn boundary_values(&self, field: &dyn VectorField, markers: &[u32]) -> Vec<(usize, f64)> {
        self.boundary_nodes(markers)
            .into_iter()
            .flat_map(|node| {
                let value = field.value(&self.node_positions[node]);
                (0..SOLUTION_DIM).map(move |c| (SOLUTION_DIM * node + c, value[c]))
            })
            .collect()
    }

    /// Nodal interpolation of a vector field.
    pub fn interpolate(&self, field: &dyn VectorField) -> DVector<f64> {
        let mut values = DVector::zeros(self.num_dofs());
        for (node, x) in self.node_positions.iter().enumerate() {
            let value = field.value(x);
            for c in 0..SOLUTION_DIM {
                values[SOLUTION_DIM * node + c] = value[c];
            }
        }
        values
    }
}

impl CellConnectivityAssembler for DofMap {
    fn solution_dim(&self) -> usize {
        SOLUTION_DIM
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn num_nodes(&self) -> usize {
        self.node_positions.len()
    }

    fn cell_node_count(&self, _cell: usize) -> usize {
        self.basis.num_nodes()
    }

    fn populate_cell_nodes(&self, output: &mut [usize], cell: usize) {
        output.copy_from_slice(self.cell_nodes(cell));
    }
}
