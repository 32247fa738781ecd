//! Marking, balancing and execution of local refinement and coarsening.
//!
//! Cells are refined by red refinement: the three edge midpoints split a triangle into four
//! similar children. A group of four siblings is coarsened by reactivating their parent.
use crate::mesh::{AdaptiveMesh, Cell};
use log::debug;
use std::collections::HashSet;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RefinementFlag {
    #[default]
    Keep,
    Refine,
    Coarsen,
}

/// Marks a fixed number of cells based on per-cell error indicators.
///
/// Cells are ranked by indicator in descending order, with ties broken by position. The first
/// `⌊refine_fraction · n⌋` cells are marked for refinement, provided their indicator is
/// positive, and the last `⌊coarsen_fraction · n⌋` cells not already marked are marked for
/// coarsening.
pub fn mark_fixed_number(indicators: &[f64], refine_fraction: f64, coarsen_fraction: f64) -> Vec<RefinementFlag> {
    let n = indicators.len();
    let mut order: Vec<_> = (0..n).collect();
    // Stable sort, so that equal indicators keep their original order
    order.sort_by(|&i, &j| indicators[j].total_cmp(&indicators[i]));

    let num_refine = (refine_fraction * n as f64).floor() as usize;
    let num_coarsen = (coarsen_fraction * n as f64).floor() as usize;

    let mut flags = vec![RefinementFlag::Keep; n];
    for &i in order.iter().take(num_refine) {
        if indicators[i] > 0.0 {
            flags[i] = RefinementFlag::Refine;
        }
    }
    for &i in order.iter().rev().take(num_coarsen) {
        if flags[i] == RefinementFlag::Keep {
            flags[i] = RefinementFlag::Coarsen;
        }
    }
    flags
}

/// How an active cell of a new generation relates to the active cells of the previous one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellOrigin {
    /// The cell was active in the previous generation.
    Kept { cell: usize },
    /// The cell is a child of a refined cell.
    Refined { parent: usize },
    /// The cell is the parent of four coarsened cells.
    Coarsened { children: [usize; 4] },
}

/// The mapping from one mesh generation to the next.
#[derive(Debug, Clone)]
pub struct GenerationTransfer {
    old_generation: usize,
    new_generation: usize,
    origins: Vec<CellOrigin>,
}

impl GenerationTransfer {
    pub fn old_generation(&self) -> usize {
        self.old_generation
    }

    pub fn new_generation(&self) -> usize {
        self.new_generation
    }

    /// The origin of every new active cell, indexed by position in the new active list.
    pub fn origins(&self) -> &[CellOrigin] {
        &self.origins
    }

    pub fn num_refined(&self) -> usize {
        self.origins
            .iter()
            .filter(|origin| matches!(origin, CellOrigin::Refined { .. }))
            .count()
            / 4
    }

    pub fn num_coarsened(&self) -> usize {
        self.origins
            .iter()
            .filter(|origin| matches!(origin, CellOrigin::Coarsened { .. }))
            .count()
    }
}

impl AdaptiveMesh {
    fn final_level(&self, cell: usize, flag: RefinementFlag) -> usize {
        let level = self.cells[cell].level;
        match flag {
            RefinementFlag::Keep => level,
            RefinementFlag::Refine => level + 1,
            RefinementFlag::Coarsen => level - 1,
        }
    }

    /// Whether all siblings of the cell are active and marked for coarsening.
    fn sibling_group_coarsens(&self, cell: usize, positions: &[Option<usize>], flags: &[RefinementFlag]) -> bool {
        self.cells[cell]
            .parent
            .and_then(|parent| self.cells[parent].children)
            .map(|siblings| {
                siblings.iter().all(|&sibling| {
                    positions[sibling].map_or(false, |position| flags[position] == RefinementFlag::Coarsen)
                })
            })
            .unwrap_or(false)
    }

    /// Drops refinement flags until executing them keeps the level difference between
    /// neighboring cells at most one.
    ///
    /// Coarsening is only possible for a complete group of active siblings that are all marked
    /// for coarsening. Conflicts are resolved by dropping coarsening flags first, then
    /// refinement flags. Returns the number of dropped flags.
    ///
    /// # Panics
    ///
    /// Panics if there is not exactly one flag per active cell.
    pub fn balance_flags(&self, flags: &mut [RefinementFlag]) -> usize {
        assert_eq!(flags.len(), self.num_active_cells(), "Need one flag per active cell");
        let positions = self.active_positions();
        let topology = self.topology();

        let mut dropped = 0;
        loop {
            let mut changed = false;

            for (position, &cell) in self.active.iter().enumerate() {
                if flags[position] == RefinementFlag::Coarsen && !self.sibling_group_coarsens(cell, &positions, flags) {
                    flags[position] = RefinementFlag::Keep;
                    dropped += 1;
                    changed = true;
                }
            }

            for (position, &cell) in self.active.iter().enumerate() {
                for neighbor in topology.neighbors(position) {
                    let neighbor_position = positions[neighbor].expect("Neighbors are active");
                    let level = self.final_level(cell, flags[position]);
                    let neighbor_level = self.final_level(neighbor, flags[neighbor_position]);
                    if level < neighbor_level + 2 {
                        continue;
                    }

                    if flags[neighbor_position] == RefinementFlag::Coarsen {
                        dropped += self.drop_sibling_coarsening(neighbor, &positions, flags);
                    } else {
                        debug_assert_eq!(flags[position], RefinementFlag::Refine);
                        flags[position] = RefinementFlag::Keep;
                        dropped += 1;
                    }
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        if dropped > 0 {
            debug!("Dropped {dropped} refinement flags to keep neighbor levels balanced");
        }
        dropped
    }

    fn drop_sibling_coarsening(&self, cell: usize, positions: &[Option<usize>], flags: &mut [RefinementFlag]) -> usize {
        let mut dropped = 0;
        let siblings = self.cells[cell]
            .parent
            .and_then(|parent| self.cells[parent].children);
        for sibling in siblings.iter().flatten() {
            if let Some(position) = positions[*sibling] {
                if flags[position] == RefinementFlag::Coarsen {
                    flags[position] = RefinementFlag::Keep;
                    dropped += 1;
                }
            }
        }
        dropped
    }

    /// Executes the given flags, producing the next mesh generation.
    ///
    /// The flags are balanced first (see [`balance_flags`](Self::balance_flags)). The new
    /// active list is ordered by walking the old one: kept cells stay in place, refined cells are
    /// replaced by their four children and a coarsened group is replaced by its parent at the
    /// position of the first sibling encountered.
    pub fn execute_refinement(&mut self, flags: &[RefinementFlag]) -> GenerationTransfer {
        let mut flags = flags.to_vec();
        self.balance_flags(&mut flags);

        let old_active = std::mem::take(&mut self.active);
        let mut new_active = Vec::with_capacity(old_active.len());
        let mut origins = Vec::with_capacity(old_active.len());
        let mut reactivated_parents = HashSet::new();

        for (&cell, &flag) in old_active.iter().zip(&flags) {
            match flag {
                RefinementFlag::Keep => {
                    new_active.push(cell);
                    origins.push(CellOrigin::Kept { cell });
                }
                RefinementFlag::Refine => {
                    for child in self.refine_cell(cell) {
                        new_active.push(child);
                        origins.push(CellOrigin::Refined { parent: cell });
                    }
                }
                RefinementFlag::Coarsen => {
                    let parent = self.cells[cell]
                        .parent
                        .expect("Balanced coarsening flags belong to cells with a parent");
                    if reactivated_parents.insert(parent) {
                        let children = self.cells[parent]
                            .children
                            .expect("A parent of an active cell has children");
                        new_active.push(parent);
                        origins.push(CellOrigin::Coarsened { children });
                    }
                }
            }
        }

        let old_generation = self.generation;
        self.active = new_active;
        self.generation += 1;

        let transfer = GenerationTransfer {
            old_generation,
            new_generation: self.generation,
            origins,
        };
        debug!(
            "Generation {}: refined {} and coarsened {} cells, {} active cells",
            self.generation,
            transfer.num_refined(),
            transfer.num_coarsened(),
            self.active.len()
        );
        transfer
    }

    /// Refines every active cell once.
    pub fn refine_globally(&mut self) -> GenerationTransfer {
        let flags = vec![RefinementFlag::Refine; self.num_active_cells()];
        self.execute_refinement(&flags)
    }

    fn refine_cell(&mut self, cell: usize) -> [usize; 4] {
        if let Some(children) = self.cells[cell].children {
            return children;
        }

        let Cell {
            vertices: [v0, v1, v2],
            level,
            face_markers: [f0, f1, f2],
            ..
        } = self.cells[cell].clone();
        let m01 = self.midpoint_or_insert(v0, v1);
        let m12 = self.midpoint_or_insert(v1, v2);
        let m20 = self.midpoint_or_insert(v2, v0);

        // Faces of corner children lying on a parent face inherit its marker
        let children = [
            ([v0, m01, m20], [f0, None, f2]),
            ([m01, v1, m12], [f0, f1, None]),
            ([m20, m12, v2], [None, f1, f2]),
            ([m01, m12, m20], [None, None, None]),
        ];

        let first = self.cells.len();
        for (vertices, face_markers) in children {
            self.cells.push(Cell {
                vertices,
                level: level + 1,
                parent: Some(cell),
                children: None,
                face_markers,
            });
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.cells[cell].children = Some(children);
        children
    }
}
