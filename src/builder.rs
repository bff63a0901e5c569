//! The incremental 3D Delaunay builder: `insert`, point location, the 1→4 insertion flip, and the
//! 2→3 / 3→2 bistellar flip cascade.
//!
//! Each newly inserted point splits its enclosing tetrahedron into four (1→4), then a LIFO stack
//! of candidate faces drains into a cascade of 2→3 and 3→2 bistellar flips until every face is
//! locally Delaunay, generalizing the classic 2D edge-flip ear-stack pattern to 3D faces and
//! tetrahedra. Point location walks a real far-away "universe" tetrahedron rather than a
//! symbolic infinity vertex.

use std::cell::RefCell;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mesh::Mesh;
use crate::oriented_face::OrientedFace;
use crate::predicates::left_of_plane;
use crate::stats::{Threshold, VertexStats};
use crate::types::{FaceOrdinal, TetIdx, Vertex3, VertexIdx};

/// All 6 permutations of `{0,1,2}`, used to shuffle the 3 non-entry faces tested during a
/// `locate` step. Fixed, not computed per call: a constant table, not a polymorphic dispatch.
const PERM3: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// A single inserted (or universe) vertex: its position, a "hint" tetrahedron known to contain it
/// (refreshed on degenerate-pair removal), and a statistics cache keyed
/// against the builder's check stamp.
pub struct Vertex {
    pub pos: Vertex3,
    pub hint: TetIdx,
    pub(crate) stats_cache: RefCell<Option<(u64, VertexStats)>>,
}

/// The incremental 3D Delaunay builder and Voronoi-statistics front end.
///
/// One builder instance per thread; no internal locking. Owns its RNG so that
/// two builders seeded identically and fed the same insertion sequence are reproducible.
pub struct Builder {
    pub(crate) mesh: Mesh,
    pub(crate) vertices: Vec<Vertex>,
    /// Positions mirrored out of `vertices` so `OrientedFace` (which borrows a plain position
    /// slice) can be constructed without holding a second borrow of `vertices` itself.
    pub(crate) positions: Vec<Vertex3>,
    pub(crate) universe_verts: usize,
    insertion_order: Vec<VertexIdx>,
    last_hint: TetIdx,
    check: u64,
    rng: StdRng,
    active_vertex: VertexIdx,
    pub(crate) area_threshold: Threshold,
    pub(crate) length_threshold: Threshold,
    pub(crate) index_length: usize,
    pub(crate) no_warning: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Seeds a default (entropy-derived) RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Accepts an explicit RNG, required for reproducibility.
    pub fn with_rng(rng: StdRng) -> Self {
        let mut mesh = Mesh::new();
        let mut vertices = Vec::new();

        // Universe tetrahedron: four real, far-away vertices, scaled asymmetrically per axis to
        // break symmetry. `m` is chosen comfortably larger than any input this crate expects to
        // see (~2 * 2^30).
        let m = 2.0_f64.powi(30) * 2.0;
        let universe = [
            [m, 1.3 * m, 0.7 * m],
            [m, -1.3 * m, -0.7 * m],
            [-m, 1.3 * m, -0.7 * m],
            [-m, -1.3 * m, 0.7 * m],
        ];
        debug_assert!(left_of_plane(universe[0], universe[1], universe[2], universe[3]) > 0.0);

        let universe_tet = mesh.insert([0, 1, 2, 3]);
        let mut positions = Vec::new();
        for p in universe {
            vertices.push(Vertex {
                pos: p,
                hint: universe_tet,
                stats_cache: RefCell::new(None),
            });
            positions.push(p);
        }

        Self {
            mesh,
            vertices,
            positions,
            universe_verts: 4,
            insertion_order: Vec::new(),
            last_hint: universe_tet,
            check: 0,
            rng,
            active_vertex: 0,
            area_threshold: Threshold::default(),
            length_threshold: Threshold::default(),
            index_length: 9,
            no_warning: false,
        }
    }

    // ----- configuration (chainable) -----

    pub fn area_threshold(&mut self, r: f64) -> &mut Self {
        self.area_threshold = Threshold::Relative(r);
        self
    }

    pub fn area_threshold_abs(&mut self, a: f64) -> &mut Self {
        self.area_threshold = Threshold::Absolute(a);
        self
    }

    pub fn length_threshold(&mut self, r: f64) -> &mut Self {
        self.length_threshold = Threshold::Relative(r);
        self
    }

    pub fn length_threshold_abs(&mut self, a: f64) -> &mut Self {
        self.length_threshold = Threshold::Absolute(a);
        self
    }

    pub fn index_length(&mut self, l: usize) -> &mut Self {
        assert!(l >= 1, "index_length must be >= 1");
        self.index_length = l;
        self
    }

    pub fn no_warning(&mut self, flag: bool) -> &mut Self {
        self.no_warning = flag;
        self
    }

    // ----- queries -----

    pub fn num_vertices(&self) -> usize {
        self.insertion_order.len()
    }

    /// The global vertex index of the `i`-th inserted site (insertion-order preserved),
    /// `getVertex(i)`. `Err` if `i >= num_vertices()`.
    pub fn vertex(&self, i: usize) -> Result<VertexIdx> {
        self.insertion_order.get(i).copied().ok_or_else(|| {
            anyhow::Error::msg(format!(
                "vertex: index {i} out of range ({} vertices inserted)",
                self.num_vertices()
            ))
        })
    }

    /// All inserted (non-universe) vertices, in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexIdx> + '_ {
        self.insertion_order.iter().copied()
    }

    /// `Err` if `v` is not a live vertex index.
    pub fn position(&self, v: VertexIdx) -> Result<Vertex3> {
        self.vertices.get(v).map(|vert| vert.pos).ok_or_else(|| {
            anyhow::Error::msg(format!(
                "position: vertex index {v} out of range ({} vertices total)",
                self.vertices.len()
            ))
        })
    }

    pub fn x(&self, v: VertexIdx) -> Result<f64> {
        self.position(v).map(|p| p[0])
    }

    pub fn y(&self, v: VertexIdx) -> Result<f64> {
        self.position(v).map(|p| p[1])
    }

    pub fn z(&self, v: VertexIdx) -> Result<f64> {
        self.position(v).map(|p| p[2])
    }

    /// Infallible internal position lookup for mesh-sourced (always-valid) vertex indices.
    pub(crate) fn pos_unchecked(&self, v: VertexIdx) -> Vertex3 {
        self.vertices[v].pos
    }

    pub fn is_universe_vertex(&self, v: VertexIdx) -> bool {
        v < self.universe_verts
    }

    pub fn num_tetrahedra(&self) -> usize {
        self.mesh.iter_live().count()
    }

    pub fn check_stamp(&self) -> u64 {
        self.check
    }

    // ----- insertion -----

    /// Inserts a point and returns its global vertex index.
    ///
    /// If the point coincides with (or is coplanar with) an existing vertex such that the 1→4
    /// split would produce a degenerate tetrahedron, `insert` returns `Err` rather than silently
    /// perturbing the input.
    pub fn insert(&mut self, x: f64, y: f64, z: f64) -> Result<VertexIdx> {
        self.check = self.check.wrapping_add(1);
        let p = [x, y, z];

        let start = self.last_hint;
        let enclosing = self.locate(p, start);

        // Reject degenerate/duplicate input: every face of the enclosing tetrahedron must have p
        // strictly on the interior side.
        for f in 0..4 {
            let ring = self.mesh.get(enclosing).ring(f);
            let val = left_of_plane(
                self.vertices[ring[0]].pos,
                self.vertices[ring[1]].pos,
                self.vertices[ring[2]].pos,
                p,
            );
            if val <= 0.0 {
                return Err(anyhow::Error::msg(
                    "insert: point coincides with or is coplanar to an existing vertex; \
                     duplicate/degenerate input is not supported",
                ));
            }
        }

        let v = self.vertices.len();
        self.vertices.push(Vertex {
            pos: p,
            hint: enclosing,
            stats_cache: RefCell::new(None),
        });
        self.positions.push(p);
        self.active_vertex = v;

        let new_tets = self.flip_1_to_4(enclosing, v);

        let mut stack: Vec<(TetIdx, FaceOrdinal)> = Vec::new();
        for &nt in &new_tets {
            // The four candidate faces are the *original* external faces, each now opposite V
            // (ordinal 3 by construction — see `flip_1_to_4`).
            if self.mesh.get(nt).neighbors[3].is_some() {
                stack.push((nt, 3));
            }
        }

        let mut last_produced = new_tets[3];
        while let Some((t, f)) = stack.pop() {
            if !self.mesh.is_alive(t) {
                continue;
            }
            if let Some(produced) = self.try_flip(t, f, &mut stack) {
                last_produced = produced;
            }
        }

        self.vertices[v].hint = last_produced;
        self.last_hint = last_produced;
        self.insertion_order.push(v);

        #[cfg(feature = "logging")]
        log::debug!(
            "insert({x},{y},{z}) -> vertex {v}, mesh now has {} live tetrahedra",
            self.num_tetrahedra()
        );

        Ok(v)
    }

    /// Walks from `start` to the tetrahedron strictly enclosing `p`.
    fn locate(&mut self, p: Vertex3, start: TetIdx) -> TetIdx {
        let mut current = start;
        let mut entry_face: Option<FaceOrdinal> = None;

        loop {
            let non_entry: Vec<FaceOrdinal> = (0..4).filter(|&f| Some(f) != entry_face).collect();
            let perm = PERM3[self.rng.gen_range(0..6)];
            // `non_entry` has 3 faces once we've crossed at least once, and all 4 on the very
            // first step (no entry face to exclude yet) — in that case test the fourth face last.
            let order: Vec<FaceOrdinal> = perm.iter().map(|&i| non_entry[i % 3]).collect();
            let order: Vec<FaceOrdinal> = if non_entry.len() == 4 {
                let mut o = order;
                o.push(non_entry[3]);
                o
            } else {
                order
            };

            let mut crossed = None;
            for &f in &order {
                let ring = self.mesh.get(current).ring(f);
                let val = left_of_plane(
                    self.vertices[ring[0]].pos,
                    self.vertices[ring[1]].pos,
                    self.vertices[ring[2]].pos,
                    p,
                );
                if val < 0.0 {
                    let neighbor = self.mesh.get(current).neighbors[f].expect(
                        "locate: walked past the universe boundary — invariant violation",
                    );
                    crossed = Some((neighbor, f));
                    break;
                }
            }

            match crossed {
                Some((neighbor, exit_face)) => {
                    entry_face = self.mesh.get(neighbor).ordinal_of_neighbor(current);
                    let _ = exit_face;
                    current = neighbor;
                }
                None => return current,
            }
        }
    }

    /// Builds a tetrahedron from 4 vertices in an order guaranteed to satisfy the orientation
    /// invariant, swapping the last two vertices if the naive order is negatively oriented.
    fn build_oriented_tet(&mut self, a: VertexIdx, b: VertexIdx, c: VertexIdx, d: VertexIdx) -> TetIdx {
        let (pa, pb, pc, pd) = (
            self.vertices[a].pos,
            self.vertices[b].pos,
            self.vertices[c].pos,
            self.vertices[d].pos,
        );
        if left_of_plane(pa, pb, pc, pd) > 0.0 {
            self.mesh.insert([a, b, c, d])
        } else {
            self.mesh.insert([a, b, d, c])
        }
    }

    /// Splits `enclosing` into four tetrahedra sharing the new vertex `v`.
    /// `enclosing`'s ring tables are already known to place `v` strictly inside every face
    /// (checked by the caller), so no orientation fixup is needed here.
    fn flip_1_to_4(&mut self, enclosing: TetIdx, v: VertexIdx) -> [TetIdx; 4] {
        let old = *self.mesh.get(enclosing);
        let mut new_tets = [0usize; 4];
        for f in 0..4 {
            let ring = old.ring(f);
            new_tets[f] = self.mesh.insert([ring[0], ring[1], ring[2], v]);
        }

        // Internal wiring: T_f and T_g (f != g) share the face opposite whichever ring position
        // of T_f holds old.vertex(g).
        for f in 0..4 {
            for g in 0..4 {
                if f == g {
                    continue;
                }
                if let Some(p) = crate::mesh::FACE_VERTS[f].iter().position(|&x| x == g) {
                    self.mesh.set_neighbor(new_tets[f], p, Some(new_tets[g]));
                }
            }
        }

        // External patch: T_f's ordinal-3 face (opposite V) replaces old's face f.
        for f in 0..4 {
            let far = old.neighbors[f];
            self.mesh.patch(far, enclosing, new_tets[f], 3);
        }

        self.mesh.kill(enclosing);
        new_tets
    }

    /// Pushes the (outward, neighbor-having) faces of `t` that contain vertex `v` onto `stack`.
    fn enqueue_containing(&self, t: TetIdx, v: VertexIdx, stack: &mut Vec<(TetIdx, FaceOrdinal)>) {
        if !self.mesh.is_alive(t) {
            return;
        }
        let tet = self.mesh.get(t);
        if let Some(v_ord) = tet.ordinal_of_vertex(v) {
            for f in 0..4 {
                if f != v_ord && tet.neighbors[f].is_some() {
                    stack.push((t, f));
                }
            }
        }
    }

    fn try_flip(
        &mut self,
        t: TetIdx,
        f: FaceOrdinal,
        stack: &mut Vec<(TetIdx, FaceOrdinal)>,
    ) -> Option<TetIdx> {
        if !self.mesh.is_alive(t) {
            return None;
        }
        let face = OrientedFace::new(&self.mesh, &self.positions, t, f);
        if face.neighbor_tet().is_none() || !face.not_regular() {
            return None;
        }
        let r = face.reflex_count();
        if r == 0 {
            Some(self.flip_2_to_3(t, f, stack))
        } else if r == 1 {
            let ridx = OrientedFace::new(&self.mesh, &self.positions, t, f)
                .single_reflex_index()
                .expect("reflex_count()==1 implies a unique reflex index");
            self.flip_3_to_2(t, f, ridx, stack)
        } else {
            None
        }
    }

    /// Replaces `T` (at `tet`/`f`) and its neighbor `T'` by three tetrahedra around the edge
    /// `(top, bot)` (the 2→3 flip).
    fn flip_2_to_3(&mut self, tet: TetIdx, f: FaceOrdinal, stack: &mut Vec<(TetIdx, FaceOrdinal)>) -> TetIdx {
        let face = OrientedFace::new(&self.mesh, &self.positions, tet, f);
        let top = face.incident_vertex();
        let t_prime = face.neighbor_tet().expect("2->3 flip requires a neighbor");
        let bot = face.adjacent_vertex().expect("regularity check guarantees an adjacent vertex");
        let ring = face.ring();

        let t_ext: [Option<TetIdx>; 3] = std::array::from_fn(|i| {
            let ord = self.mesh.get(tet).ordinal_of_vertex(ring[i]).unwrap();
            self.mesh.get(tet).neighbors[ord]
        });
        let tp_ext: [Option<TetIdx>; 3] = std::array::from_fn(|i| {
            let ord = self.mesh.get(t_prime).ordinal_of_vertex(ring[i]).unwrap();
            self.mesh.get(t_prime).neighbors[ord]
        });

        let mut new_tets = [0usize; 3];
        for i in 0..3 {
            new_tets[i] = self.build_oriented_tet(top, bot, ring[i], ring[(i + 1) % 3]);
        }

        // Internal wiring: every pair of the 3 new tets shares exactly 3 vertices.
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    continue;
                }
                let vi = self.mesh.get(new_tets[i]).verts;
                let vj = self.mesh.get(new_tets[j]).verts;
                if let Some(excl) = vi.iter().copied().find(|v| !vj.contains(v)) {
                    if vi.iter().filter(|v| vj.contains(v)).count() == 3 {
                        let ord = self.mesh.get(new_tets[i]).ordinal_of_vertex(excl).unwrap();
                        self.mesh.set_neighbor(new_tets[i], ord, Some(new_tets[j]));
                    }
                }
            }
        }

        // External patch: new_tets[i]'s face opposite `bot` came from T (opposite the missing
        // ring vertex), and opposite `top` came from T'.
        for i in 0..3 {
            let missing = (i + 2) % 3;
            let bot_ord = self.mesh.get(new_tets[i]).ordinal_of_vertex(bot).unwrap();
            self.mesh.patch(t_ext[missing], tet, new_tets[i], bot_ord);
            let top_ord = self.mesh.get(new_tets[i]).ordinal_of_vertex(top).unwrap();
            self.mesh.patch(tp_ext[missing], t_prime, new_tets[i], top_ord);
        }

        self.mesh.kill(tet);
        self.mesh.kill(t_prime);

        let mut last = new_tets[2];
        for &nt in &new_tets {
            if self.remove_any_degenerate_pair(nt) || !self.mesh.is_alive(nt) {
                continue;
            }
            self.enqueue_containing(nt, self.active_vertex, stack);
            last = nt;
        }
        last
    }

    /// Replaces the 3 tetrahedra sharing edge `(W1,W2)` — `T` (at `tet`/`f`), its neighbor `T'`,
    /// and the third tetrahedron `T'' = T.neighbor(ring[r])` — by two tetrahedra sharing the new
    /// face `(X, top, bot)` (the 3→2 flip).
    fn flip_3_to_2(
        &mut self,
        tet: TetIdx,
        f: FaceOrdinal,
        r: usize,
        stack: &mut Vec<(TetIdx, FaceOrdinal)>,
    ) -> Option<TetIdx> {
        let face = OrientedFace::new(&self.mesh, &self.positions, tet, f);
        let top = face.incident_vertex();
        let t_prime = face.neighbor_tet()?;
        let bot = face.adjacent_vertex()?;
        let ring = face.ring();
        let x = ring[r];
        let w1 = ring[(r + 1) % 3];
        let w2 = ring[(r + 2) % 3];

        let x_ord = self.mesh.get(tet).ordinal_of_vertex(x).unwrap();
        let t_double_prime = self.mesh.get(tet).neighbors[x_ord]?;

        let ext = |this: &Self, owner: TetIdx, v: VertexIdx| -> Option<TetIdx> {
            let ord = this.mesh.get(owner).ordinal_of_vertex(v)?;
            this.mesh.get(owner).neighbors[ord]
        };

        let ext_tet_w1 = ext(self, tet, w1);
        let ext_tet_w2 = ext(self, tet, w2);
        let ext_tprime_w1 = ext(self, t_prime, w1);
        let ext_tprime_w2 = ext(self, t_prime, w2);
        let ext_tdp_w1 = ext(self, t_double_prime, w1);
        let ext_tdp_w2 = ext(self, t_double_prime, w2);

        let new1 = self.build_oriented_tet(x, top, bot, w1);
        let new2 = self.build_oriented_tet(x, top, bot, w2);

        let ord1 = self.mesh.get(new1).ordinal_of_vertex(w1).unwrap();
        self.mesh.set_neighbor(new1, ord1, Some(new2));
        let ord2 = self.mesh.get(new2).ordinal_of_vertex(w2).unwrap();
        self.mesh.set_neighbor(new2, ord2, Some(new1));

        let o_x1 = self.mesh.get(new1).ordinal_of_vertex(x).unwrap();
        self.mesh.patch(ext_tdp_w1, t_double_prime, new1, o_x1);
        let o_top1 = self.mesh.get(new1).ordinal_of_vertex(top).unwrap();
        self.mesh.patch(ext_tet_w1, tet, new1, o_top1);
        let o_bot1 = self.mesh.get(new1).ordinal_of_vertex(bot).unwrap();
        self.mesh.patch(ext_tprime_w1, t_prime, new1, o_bot1);

        let o_x2 = self.mesh.get(new2).ordinal_of_vertex(x).unwrap();
        self.mesh.patch(ext_tdp_w2, t_double_prime, new2, o_x2);
        let o_top2 = self.mesh.get(new2).ordinal_of_vertex(top).unwrap();
        self.mesh.patch(ext_tet_w2, tet, new2, o_top2);
        let o_bot2 = self.mesh.get(new2).ordinal_of_vertex(bot).unwrap();
        self.mesh.patch(ext_tprime_w2, t_prime, new2, o_bot2);

        self.mesh.kill(tet);
        self.mesh.kill(t_prime);
        self.mesh.kill(t_double_prime);

        self.enqueue_containing(new1, self.active_vertex, stack);
        self.enqueue_containing(new2, self.active_vertex, stack);

        Some(new2)
    }

    /// If `t` shares two distinct faces with the same neighbor `n` (a zero-volume degenerate
    /// pair), removes both and repatches the two remaining "far" neighbors around the surviving
    /// edge. Returns `true` if a removal happened (in which case `t` is dead).
    fn remove_any_degenerate_pair(&mut self, t: TetIdx) -> bool {
        if !self.mesh.is_alive(t) {
            return false;
        }
        let nbrs = self.mesh.get(t).neighbors;
        let mut dup = None;
        'outer: for i in 0..4 {
            for j in (i + 1)..4 {
                if let (Some(ni), Some(nj)) = (nbrs[i], nbrs[j]) {
                    if ni == nj {
                        dup = Some((i, j, ni));
                        break 'outer;
                    }
                }
            }
        }
        let Some((i, j, n)) = dup else {
            return false;
        };

        let verts_t = self.mesh.get(t).verts;
        let others: Vec<usize> = (0..4).filter(|&k| k != i && k != j).collect();
        let (g1, g2) = (others[0], others[1]);
        let vg1 = verts_t[g1];
        let vg2 = verts_t[g2];

        let far1 = self.mesh.get(t).neighbors[g1];
        let far2 = self.mesh.get(t).neighbors[g2];
        let n_ord_g1 = self.mesh.get(n).ordinal_of_vertex(vg1);
        let n_ord_g2 = self.mesh.get(n).ordinal_of_vertex(vg2);
        let far1_n = n_ord_g1.and_then(|o| self.mesh.get(n).neighbors[o]);
        let far2_n = n_ord_g2.and_then(|o| self.mesh.get(n).neighbors[o]);

        self.mesh.kill(t);
        self.mesh.kill(n);

        if let (Some(f1), Some(f2n)) = (far1, far2_n) {
            if let (Some(o1), Some(o2)) = (
                self.mesh.get(f1).ordinal_of_neighbor(t),
                self.mesh.get(f2n).ordinal_of_neighbor(n),
            ) {
                self.mesh.set_neighbor(f1, o1, Some(f2n));
                self.mesh.set_neighbor(f2n, o2, Some(f1));
            }
        }
        if let (Some(f2), Some(f1n)) = (far2, far1_n) {
            if let (Some(o1), Some(o2)) = (
                self.mesh.get(f2).ordinal_of_neighbor(t),
                self.mesh.get(f1n).ordinal_of_neighbor(n),
            ) {
                self.mesh.set_neighbor(f2, o1, Some(f1n));
                self.mesh.set_neighbor(f1n, o2, Some(f2));
            }
        }

        let survivor = far1.or(far2).or(far1_n).or(far2_n);
        if let Some(s) = survivor {
            for &v in &verts_t {
                self.vertices[v].hint = s;
            }
        }

        #[cfg(feature = "logging")]
        log::trace!("removed degenerate tetrahedron pair ({t}, {n})");

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::Distribution;
    use rand_distr::Normal;

    fn seeded() -> Builder {
        Builder::with_rng(StdRng::seed_from_u64(42))
    }

    /// Samples `n` vertices from a zero-mean Gaussian, mirroring the teacher's own
    /// `sample_weights` (`rand_distr::Normal`) rather than the uniform-only point sampler.
    fn sample_gaussian_points(n: usize, std_dev: f64, seed: u64) -> Vec<(f64, f64, f64)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, std_dev).unwrap();
        (0..n).map(|_| (normal.sample(&mut rng), normal.sample(&mut rng), normal.sample(&mut rng))).collect()
    }

    #[test]
    fn orientation_invariant_holds_for_gaussian_point_cloud() {
        let mut b = seeded();
        for (x, y, z) in sample_gaussian_points(40, 2.0, 99) {
            b.insert(x, y, z).unwrap();
        }
        for (_, tet) in b.mesh.iter_live() {
            let p = tet.verts.map(|v| b.vertices[v].pos);
            assert!(left_of_plane(p[0], p[1], p[2], p[3]) > 0.0);
        }
    }

    #[test]
    fn single_insertion_has_no_real_neighbors() {
        let mut b = seeded();
        let v = b.insert(0.0, 0.0, 0.0).unwrap();
        assert_eq!(b.num_vertices(), 1);
        assert_eq!(b.vertex(0).unwrap(), v);
    }

    #[test]
    fn regular_tetrahedron_inserts_cleanly() {
        let mut b = seeded();
        b.insert(1.0, 1.0, 1.0).unwrap();
        b.insert(1.0, -1.0, -1.0).unwrap();
        b.insert(-1.0, 1.0, -1.0).unwrap();
        b.insert(-1.0, -1.0, 1.0).unwrap();
        assert_eq!(b.num_vertices(), 4);
        assert!(b.num_tetrahedra() > 0);
    }

    #[test]
    fn reproducibility_with_same_seed() {
        let mut b1 = Builder::with_rng(StdRng::seed_from_u64(7));
        let mut b2 = Builder::with_rng(StdRng::seed_from_u64(7));
        let pts = [(0.1, 0.2, 0.3), (0.4, -0.1, 0.2), (-0.3, 0.3, -0.2), (0.5, 0.5, 0.5)];
        for &(x, y, z) in &pts {
            b1.insert(x, y, z).unwrap();
            b2.insert(x, y, z).unwrap();
        }
        assert_eq!(b1.num_tetrahedra(), b2.num_tetrahedra());
    }

    #[test]
    fn orientation_invariant_holds_after_inserts() {
        let mut b = seeded();
        for (x, y, z) in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)] {
            b.insert(x, y, z).unwrap();
        }
        for (_, tet) in b.mesh.iter_live() {
            let p = tet.verts.map(|v| b.vertices[v].pos);
            assert!(left_of_plane(p[0], p[1], p[2], p[3]) > 0.0);
        }
    }

    #[test]
    fn out_of_range_queries_return_err_not_panic() {
        let mut b = seeded();
        b.insert(0.0, 0.0, 0.0).unwrap();
        assert!(b.vertex(1).is_err());
        assert!(b.position(999).is_err());
        assert!(b.x(999).is_err());
    }
}
