//! `OrientedFace`: a transient (tetrahedron, face ordinal) view used during the flip cascade.
//!
//! `Copy`, passed by value, no heap allocation — a back-reference plus an index, with `const
//! fn`-style accessors, the same shape as a 2D half-edge/half-triangle view generalized to 3D.

use crate::mesh::Mesh;
use crate::predicates::{in_sphere, left_of_plane};
use crate::types::{FaceOrdinal, TetIdx, Vertex3, VertexIdx};

#[derive(Clone, Copy)]
pub struct OrientedFace<'a> {
    mesh: &'a Mesh,
    positions: &'a [Vertex3],
    pub tet: TetIdx,
    pub f: FaceOrdinal,
}

impl<'a> OrientedFace<'a> {
    pub fn new(mesh: &'a Mesh, positions: &'a [Vertex3], tet: TetIdx, f: FaceOrdinal) -> Self {
        Self {
            mesh,
            positions,
            tet,
            f,
        }
    }

    #[inline]
    fn pos(&self, v: VertexIdx) -> Vertex3 {
        self.positions[v]
    }

    /// `T.vertex(f)`.
    pub fn incident_vertex(&self) -> VertexIdx {
        self.mesh.get(self.tet).vertex(self.f)
    }

    /// The three ring vertices of this face, in CCW order as seen from the incident side.
    pub fn ring(&self) -> [VertexIdx; 3] {
        self.mesh.get(self.tet).ring(self.f)
    }

    /// The tetrahedron across this face, if any (boundary faces of the universe have none).
    pub fn neighbor_tet(&self) -> Option<TetIdx> {
        self.mesh.get(self.tet).neighbors[self.f]
    }

    /// The ordinal of `self.tet` within the neighbor tetrahedron, if a neighbor exists.
    pub fn neighbor_ordinal(&self) -> Option<FaceOrdinal> {
        let n = self.neighbor_tet()?;
        self.mesh.get(n).ordinal_of_neighbor(self.tet)
    }

    /// The neighbor's vertex opposite the shared face, i.e. `T.neighbor(f)`'s fourth corner.
    pub fn adjacent_vertex(&self) -> Option<VertexIdx> {
        let n = self.neighbor_tet()?;
        let ordinal = self.neighbor_ordinal()?;
        Some(self.mesh.get(n).vertex(ordinal))
    }

    /// True when the adjacent vertex lies strictly inside the circumsphere of `self.tet` — the
    /// face is not locally Delaunay.
    pub fn not_regular(&self) -> bool {
        let Some(adjacent) = self.adjacent_vertex() else {
            return false;
        };
        let verts = self.mesh.get(self.tet).verts;
        let [a, b, c, d] = verts.map(|v| self.pos(v));
        in_sphere(a, b, c, d, self.pos(adjacent)) > 0.0
    }

    /// Tests whether the adjacent vertex lies on the positive side of the oriented plane through
    /// `(incident_vertex, ring[i], ring[(i+1)%3])` — the `i`-th ring edge is reflex if so.
    pub fn is_reflex(&self, i: usize) -> bool {
        let top = self.incident_vertex();
        let ring = self.ring();
        let bot = self
            .adjacent_vertex()
            .expect("is_reflex called on a boundary face");
        let r0 = ring[i];
        let r1 = ring[(i + 1) % 3];
        left_of_plane(self.pos(top), self.pos(r0), self.pos(r1), self.pos(bot)) > 0.0
    }

    /// Number of reflex ring edges among `{0,1,2}`, short-circuited at 2 (the flip policy only
    /// distinguishes `0`, `1`, and `>=2`).
    pub fn reflex_count(&self) -> usize {
        let mut r = 0;
        for i in 0..3 {
            if self.is_reflex(i) {
                r += 1;
                if r >= 2 {
                    return r;
                }
            }
        }
        r
    }

    /// The unique reflex ring index, if exactly one ring edge is reflex.
    pub fn single_reflex_index(&self) -> Option<usize> {
        let mut found = None;
        for i in 0..3 {
            if self.is_reflex(i) {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    /// Two tets glued along face 0, sharing the positive-x / positive-y / positive-z wedge, with
    /// `apex_b` placed far enough outside `tet_a`'s circumsphere that the shared face is regular.
    fn regular_pair() -> (Mesh, Vec<Vertex3>) {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [-5.0, -5.0, -5.0],
        ];
        let mut mesh = Mesh::new();
        let a = mesh.insert([1, 2, 3, 0]);
        let b = mesh.insert([2, 1, 3, 4]);
        mesh.set_neighbor(a, 3, Some(b));
        mesh.set_neighbor(b, 3, Some(a));
        (mesh, positions)
    }

    #[test]
    fn boundary_face_has_no_neighbor_and_is_regular() {
        let (mesh, positions) = regular_pair();
        let face = OrientedFace::new(&mesh, &positions, 0, 0);
        assert!(face.neighbor_tet().is_none());
        assert!(!face.not_regular());
    }

    #[test]
    fn shared_face_reports_its_neighbor_and_adjacent_vertex() {
        let (mesh, positions) = regular_pair();
        let face = OrientedFace::new(&mesh, &positions, 0, 3);
        assert_eq!(face.neighbor_tet(), Some(1));
        assert_eq!(face.adjacent_vertex(), Some(4));
    }

    #[test]
    fn reflex_count_is_between_zero_and_three() {
        let (mesh, positions) = regular_pair();
        let face = OrientedFace::new(&mesh, &positions, 0, 3);
        assert!(face.reflex_count() <= 3);
    }
}
