//! Adaptive triangle meshes.
//!
//! An [`AdaptiveMesh`] is an arena of triangles. Refinement never modifies an existing cell:
//! refining a cell appends its four children to the arena, and coarsening reactivates the
//! parent. The set of *active* cells together with a generation counter defines the current
//! mesh. Local refinement produces non-conforming meshes with at most one hanging vertex per
//! edge, which [`EdgeTopology`] makes explicit.
use crate::element::TriangleElement;
use nalgebra::Point2;
use std::array;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

pub mod procedural;
pub mod refinement;

pub use refinement::{mark_fixed_number, CellOrigin, GenerationTransfer, RefinementFlag};

/// A triangle in the mesh arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    vertices: [usize; 3],
    level: usize,
    parent: Option<usize>,
    children: Option<[usize; 4]>,
    face_markers: [Option<u32>; 3],
}

impl Cell {
    /// Vertex indices in counter-clockwise order.
    pub fn vertices(&self) -> &[usize; 3] {
        &self.vertices
    }

    /// Number of refinements separating this cell from the base mesh.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// The children of the cell, if it has ever been refined.
    ///
    /// Children are kept in the arena when their parent is coarsened again, so this does not
    /// indicate whether the cell is active.
    pub fn children(&self) -> Option<&[usize; 4]> {
        self.children.as_ref()
    }

    /// Boundary markers of the three faces. Only faces on the domain boundary carry a marker.
    pub fn face_markers(&self) -> &[Option<u32>; 3] {
        &self.face_markers
    }

    /// The vertices of local face `k`, in counter-clockwise order.
    pub fn face_vertices(&self, k: usize) -> [usize; 2] {
        [self.vertices[k], self.vertices[(k + 1) % 3]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MeshError {
    MarkerCountMismatch { num_cells: usize, num_markers: usize },
    InvalidVertexIndex { cell: usize, vertex: usize },
    InvalidOrientation { cell: usize },
    NonManifoldEdge { vertices: [usize; 2] },
    UnmarkedBoundaryFace { cell: usize, face: usize },
    MarkedInteriorFace { cell: usize, face: usize },
}

impl Display for MeshError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkerCountMismatch { num_cells, num_markers } => {
                write!(f, "{num_markers} face marker triplets given for {num_cells} cells")
            }
            Self::InvalidVertexIndex { cell, vertex } => {
                write!(f, "cell {cell} references non-existent vertex {vertex}")
            }
            Self::InvalidOrientation { cell } => {
                write!(f, "cell {cell} is degenerate or not counter-clockwise")
            }
            Self::NonManifoldEdge { vertices: [a, b] } => {
                write!(f, "edge ({a}, {b}) is shared by more than two cells")
            }
            Self::UnmarkedBoundaryFace { cell, face } => {
                write!(f, "boundary face {face} of cell {cell} has no boundary marker")
            }
            Self::MarkedInteriorFace { cell, face } => {
                write!(f, "interior face {face} of cell {cell} has a boundary marker")
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// Canonical (sorted) key for the edge between two vertices.
pub fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveMesh {
    vertices: Vec<Point2<f64>>,
    cells: Vec<Cell>,
    active: Vec<usize>,
    generation: usize,
    // Midpoint vertices are shared between the cells on either side of an edge, also when the
    // two sides are refined in different generations
    midpoints: HashMap<(usize, usize), usize>,
}

impl AdaptiveMesh {
    /// Constructs a base mesh from counter-clockwise triangles and per-face boundary markers.
    ///
    /// Faces on the domain boundary (faces belonging to exactly one triangle) must carry a
    /// marker, interior faces must not.
    pub fn from_vertices_and_triangles(
        vertices: Vec<Point2<f64>>,
        triangles: Vec<[usize; 3]>,
        face_markers: Vec<[Option<u32>; 3]>,
    ) -> Result<Self, MeshError> {
        if triangles.len() != face_markers.len() {
            return Err(MeshError::MarkerCountMismatch {
                num_cells: triangles.len(),
                num_markers: face_markers.len(),
            });
        }

        let mut face_counts = HashMap::new();
        for (cell, triangle) in triangles.iter().enumerate() {
            if let Some(&vertex) = triangle.iter().find(|&&v| v >= vertices.len()) {
                return Err(MeshError::InvalidVertexIndex { cell, vertex });
            }
            let element = TriangleElement::from_vertices(triangle.map(|v| vertices[v]));
            if !(element.signed_area() > 0.0) {
                return Err(MeshError::InvalidOrientation { cell });
            }
            for k in 0..3 {
                let key = edge_key(triangle[k], triangle[(k + 1) % 3]);
                let count = face_counts.entry(key).or_insert(0);
                *count += 1;
                if *count > 2 {
                    return Err(MeshError::NonManifoldEdge {
                        vertices: [key.0, key.1],
                    });
                }
            }
        }

        for (cell, (triangle, markers)) in triangles.iter().zip(&face_markers).enumerate() {
            for face in 0..3 {
                let key = edge_key(triangle[face], triangle[(face + 1) % 3]);
                let is_boundary = face_counts[&key] == 1;
                match (is_boundary, markers[face]) {
                    (true, None) => return Err(MeshError::UnmarkedBoundaryFace { cell, face }),
                    (false, Some(_)) => return Err(MeshError::MarkedInteriorFace { cell, face }),
                    _ => {}
                }
            }
        }

        let cells: Vec<_> = triangles
            .into_iter()
            .zip(face_markers)
            .map(|(vertices, face_markers)| Cell {
                vertices,
                level: 0,
                parent: None,
                children: None,
                face_markers,
            })
            .collect();

        Ok(Self {
            vertices,
            active: (0..cells.len()).collect(),
            cells,
            generation: 0,
            midpoints: HashMap::new(),
        })
    }

    /// Constructs a base mesh, marking every boundary face with the marker returned by
    /// `boundary_marker` for the face's end points.
    pub fn from_vertices_and_triangles_with_boundary(
        vertices: Vec<Point2<f64>>,
        triangles: Vec<[usize; 3]>,
        boundary_marker: impl Fn(&Point2<f64>, &Point2<f64>) -> u32,
    ) -> Result<Self, MeshError> {
        let mut face_counts = HashMap::new();
        for triangle in &triangles {
            for k in 0..3 {
                *face_counts
                    .entry(edge_key(triangle[k], triangle[(k + 1) % 3]))
                    .or_insert(0usize) += 1;
            }
        }

        let mut face_markers = Vec::with_capacity(triangles.len());
        for (cell, triangle) in triangles.iter().enumerate() {
            if let Some(&vertex) = triangle.iter().find(|&&v| v >= vertices.len()) {
                return Err(MeshError::InvalidVertexIndex { cell, vertex });
            }
            face_markers.push(array::from_fn(|k| {
                let (a, b) = (triangle[k], triangle[(k + 1) % 3]);
                (face_counts[&edge_key(a, b)] == 1).then(|| boundary_marker(&vertices[a], &vertices[b]))
            }));
        }

        Self::from_vertices_and_triangles(vertices, triangles, face_markers)
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// All cells ever created, active or not.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Arena indices of the active cells of the current generation.
    ///
    /// Per-cell data (DoF maps, error indicators, refinement flags) is indexed by position in
    /// this list.
    pub fn active_cells(&self) -> &[usize] {
        &self.active
    }

    pub fn num_active_cells(&self) -> usize {
        self.active.len()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn element(&self, cell: usize) -> TriangleElement {
        TriangleElement::from_vertices(self.cells[cell].vertices.map(|v| self.vertices[v]))
    }

    /// Maps arena indices to positions in the active list.
    pub fn active_positions(&self) -> Vec<Option<usize>> {
        let mut positions = vec![None; self.cells.len()];
        for (position, &cell) in self.active.iter().enumerate() {
            positions[cell] = Some(position);
        }
        positions
    }

    /// The midpoint vertex of the edge between `a` and `b`, if the edge has ever been split.
    pub fn midpoint(&self, a: usize, b: usize) -> Option<usize> {
        self.midpoints.get(&edge_key(a, b)).copied()
    }

    fn midpoint_or_insert(&mut self, a: usize, b: usize) -> usize {
        let vertices = &mut self.vertices;
        *self.midpoints.entry(edge_key(a, b)).or_insert_with(|| {
            let midpoint = nalgebra::center(&vertices[a], &vertices[b]);
            vertices.push(midpoint);
            vertices.len() - 1
        })
    }

    /// Determines the neighbor relation of every face of every active cell.
    pub fn topology(&self) -> EdgeTopology {
        let mut edges: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
        for &cell in &self.active {
            for k in 0..3 {
                let [a, b] = self.cells[cell].face_vertices(k);
                edges.entry(edge_key(a, b)).or_default().push((cell, k));
            }
        }

        let mut half_edge_parents = HashMap::with_capacity(2 * self.midpoints.len());
        for (&(p, q), &m) in &self.midpoints {
            half_edge_parents.insert(edge_key(p, m), (p, q));
            half_edge_parents.insert(edge_key(m, q), (p, q));
        }

        let other_side = |key: (usize, usize), cell: usize| {
            edges
                .get(&key)
                .and_then(|faces| faces.iter().find(|(c, _)| *c != cell))
                .copied()
        };

        let faces = self
            .active
            .iter()
            .map(|&cell| {
                let markers = self.cells[cell].face_markers;
                array::from_fn(|k| {
                    if let Some(marker) = markers[k] {
                        return FaceNeighbor::Boundary { marker };
                    }
                    let [a, b] = self.cells[cell].face_vertices(k);
                    if let Some((cell, face)) = other_side(edge_key(a, b), cell) {
                        return FaceNeighbor::Conforming { cell, face };
                    }
                    if let Some(m) = self.midpoint(a, b) {
                        if let (Some(first), Some(second)) =
                            (other_side(edge_key(a, m), cell), other_side(edge_key(m, b), cell))
                        {
                            return FaceNeighbor::Finer {
                                midpoint: m,
                                halves: [first, second],
                            };
                        }
                    }
                    let (cell, face) = half_edge_parents
                        .get(&edge_key(a, b))
                        .and_then(|&parent_edge| other_side(parent_edge, cell))
                        .expect("Balanced refinement leaves at most one hanging vertex per edge");
                    FaceNeighbor::Coarser { cell, face }
                })
            })
            .collect();

        EdgeTopology {
            generation: self.generation,
            faces,
        }
    }
}

/// What lies across a face of an active cell.
///
/// Neighbor cells are given as arena indices together with the local face index in the
/// neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceNeighbor {
    Boundary {
        marker: u32,
    },
    /// The neighbor shares the complete face.
    Conforming {
        cell: usize,
        face: usize,
    },
    /// The face is split at `midpoint` (a hanging vertex) and each half belongs to a finer
    /// neighbor. `halves[0]` is adjacent to the first vertex of the face.
    Finer {
        midpoint: usize,
        halves: [(usize, usize); 2],
    },
    /// The face is half of a face of a coarser neighbor.
    Coarser {
        cell: usize,
        face: usize,
    },
}

impl FaceNeighbor {
    /// Arena indices of the cells across the face.
    pub fn cells(&self) -> impl Iterator<Item = usize> {
        let cells = match *self {
            Self::Boundary { .. } => [None, None],
            Self::Conforming { cell, .. } | Self::Coarser { cell, .. } => [Some(cell), None],
            Self::Finer { halves, .. } => [Some(halves[0].0), Some(halves[1].0)],
        };
        cells.into_iter().flatten()
    }
}

/// Face neighbors of all active cells of one mesh generation, indexed by active position.
#[derive(Debug, Clone)]
pub struct EdgeTopology {
    generation: usize,
    faces: Vec<[FaceNeighbor; 3]>,
}

impl EdgeTopology {
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn cell_faces(&self, position: usize) -> &[FaceNeighbor; 3] {
        &self.faces[position]
    }

    /// Arena indices of all cells sharing (part of) a face with the given active cell.
    pub fn neighbors(&self, position: usize) -> impl Iterator<Item = usize> + '_ {
        self.faces[position].iter().flat_map(FaceNeighbor::cells)
    }
}
