//! Tetrahedron arena and face-adjacency primitives.
//!
//! A [`Tet`] is a record of four vertex references in ordinal positions `A,B,C,D` (`0..4`) and
//! four face-neighbor references, where the neighbor at ordinal `X` is the tetrahedron sharing the
//! face opposite vertex `X` (or `None` at the boundary of the universe). The mesh stores these in
//! a flat `Vec` arena keyed by `TetIdx` — indices, not owning references, so the adjacency graph
//! has no ownership cycles. Freed slots are left behind (not recycled): the flip cascade repatches
//! external references explicitly rather than compacting the arena.

use crate::types::{FaceOrdinal, TetIdx, VertexIdx};

/// For each face ordinal `f`, the three vertex ordinals (in CCW ring order as seen from the
/// incident side) forming the face opposite vertex `f`.
pub const FACE_VERTS: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

/// A single tetrahedron record in the mesh arena.
#[derive(Debug, Clone, Copy)]
pub struct Tet {
    pub verts: [VertexIdx; 4],
    pub neighbors: [Option<TetIdx>; 4],
    pub alive: bool,
}

impl Tet {
    pub const fn dead() -> Self {
        Self {
            verts: [0; 4],
            neighbors: [None; 4],
            alive: false,
        }
    }

    pub const fn new(verts: [VertexIdx; 4]) -> Self {
        Self {
            verts,
            neighbors: [None; 4],
            alive: true,
        }
    }

    /// Vertex at ordinal `f`.
    #[inline]
    pub fn vertex(&self, f: FaceOrdinal) -> VertexIdx {
        self.verts[f]
    }

    /// The three ring vertices of the face opposite ordinal `f`, in CCW order, `getVertex(0..2)`.
    #[inline]
    pub fn ring(&self, f: FaceOrdinal) -> [VertexIdx; 3] {
        let idx = FACE_VERTS[f];
        [self.verts[idx[0]], self.verts[idx[1]], self.verts[idx[2]]]
    }

    /// The face ordinal at which `other` appears as a neighbor, or `None` if it isn't one.
    pub fn ordinal_of_neighbor(&self, other: TetIdx) -> Option<FaceOrdinal> {
        self.neighbors.iter().position(|n| *n == Some(other))
    }

    /// The face ordinal at which `v` appears as a vertex, or `None` if it isn't one.
    pub fn ordinal_of_vertex(&self, v: VertexIdx) -> Option<FaceOrdinal> {
        self.verts.iter().position(|&x| x == v)
    }
}

/// The tetrahedron arena.
#[derive(Debug, Default)]
pub struct Mesh {
    tets: Vec<Tet>,
}

impl Mesh {
    pub fn new() -> Self {
        Self { tets: Vec::new() }
    }

    /// Inserts a new live tetrahedron and returns its index.
    pub fn insert(&mut self, verts: [VertexIdx; 4]) -> TetIdx {
        let idx = self.tets.len();
        self.tets.push(Tet::new(verts));
        idx
    }

    #[inline]
    pub fn get(&self, t: TetIdx) -> &Tet {
        let tet = &self.tets[t];
        assert!(tet.alive, "mesh invariant violation: access to dead tetrahedron {t}");
        tet
    }

    #[inline]
    pub fn get_mut(&mut self, t: TetIdx) -> &mut Tet {
        assert!(
            self.tets[t].alive,
            "mesh invariant violation: access to dead tetrahedron {t}"
        );
        &mut self.tets[t]
    }

    /// Marks a tetrahedron dead. Callers must have already repatched every live reference to it.
    pub fn kill(&mut self, t: TetIdx) {
        self.tets[t].alive = false;
    }

    pub fn is_alive(&self, t: TetIdx) -> bool {
        self.tets[t].alive
    }

    pub fn len(&self) -> usize {
        self.tets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tets.is_empty()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (TetIdx, &Tet)> {
        self.tets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.alive)
    }

    /// Sets the mutual neighbor relation between `a` (at ordinal `fa`) and `b` (at ordinal `fb`).
    /// `b == None` clears the neighbor at `fa` without touching the other side.
    pub fn set_neighbor(&mut self, a: TetIdx, fa: FaceOrdinal, b: Option<TetIdx>) {
        self.get_mut(a).neighbors[fa] = b;
    }

    /// Patches the neighbor relation so that `new_tet` replaces `old_tet` wherever `far` referred
    /// to `old_tet`, and `new_tet` points back at `far`. If `far` is `None` (boundary face), this
    /// is a no-op beyond the caller's own bookkeeping. Used for external re-linking after every
    /// flip.
    pub fn patch(&mut self, far: Option<TetIdx>, old_tet: TetIdx, new_tet: TetIdx, new_ordinal: FaceOrdinal) {
        if let Some(far_idx) = far {
            if let Some(f) = self.get(far_idx).ordinal_of_neighbor(old_tet) {
                self.set_neighbor(far_idx, f, Some(new_tet));
                self.set_neighbor(new_tet, new_ordinal, Some(far_idx));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_table_excludes_own_ordinal() {
        for f in 0..4 {
            assert!(!FACE_VERTS[f].contains(&f));
        }
    }

    #[test]
    fn insert_and_fetch_roundtrips() {
        let mut mesh = Mesh::new();
        let idx = mesh.insert([0, 1, 2, 3]);
        assert_eq!(mesh.get(idx).verts, [0, 1, 2, 3]);
        assert!(mesh.is_alive(idx));
    }

    #[test]
    fn kill_marks_dead() {
        let mut mesh = Mesh::new();
        let idx = mesh.insert([0, 1, 2, 3]);
        mesh.kill(idx);
        assert!(!mesh.is_alive(idx));
    }

    #[test]
    fn patch_relinks_far_neighbor() {
        let mut mesh = Mesh::new();
        let a = mesh.insert([0, 1, 2, 3]);
        let b = mesh.insert([1, 2, 3, 4]);
        mesh.set_neighbor(a, 0, Some(b));
        mesh.set_neighbor(b, 0, Some(a));
        let c = mesh.insert([5, 6, 7, 8]);
        mesh.patch(Some(b), a, c, 0);
        assert_eq!(mesh.get(b).neighbors[0], Some(c));
        assert_eq!(mesh.get(c).neighbors[0], Some(b));
    }
}
