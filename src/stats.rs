//! Per-vertex Voronoi statistics: neighborhood traversal, per-neighbor ring walk, and the derived
//! coordination/atomic-volume/cavity-radius/index quantities.
//!
//! Cached per vertex against the builder's check stamp, an "epoch counter" made explicit via a
//! `RefCell` cache cell on each [`crate::builder::Vertex`].

use std::cell::Ref;
use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::builder::Builder;
use crate::mesh::{Mesh, Tet};
use crate::predicates::{area, center_sphere};
use crate::types::{dist, TetIdx, Vertex3, VertexIdx};

/// Either a relative threshold (scaled against a reference quantity) or an absolute one. Setting
/// one via the builder's chainable setters disables the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    Relative(f64),
    Absolute(f64),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Relative(0.0)
    }
}

impl Threshold {
    fn exceeded_by(&self, value: f64, reference: f64) -> bool {
        match self {
            Threshold::Relative(r) => value > r * reference,
            Threshold::Absolute(a) => value > *a,
        }
    }

    fn collapses(&self, edge_len: f64, reference: f64) -> bool {
        match self {
            Threshold::Relative(r) => edge_len < r * reference,
            Threshold::Absolute(a) => edge_len < *a,
        }
    }
}

/// One Voronoi face of a vertex's cell, shared with `neighbor_vertex`.
#[derive(Clone, Debug)]
pub struct VertexFace {
    pub neighbor_vertex: VertexIdx,
    pub area: f64,
    pub dis: f64,
    pub tet_num: usize,
    pub complete: bool,
}

/// The full set of derived statistics for one vertex, recomputed when the builder's check stamp
/// has advanced since the last computation.
#[derive(Clone, Debug, Default)]
pub struct VertexStats {
    pub faces: Vec<VertexFace>,
    pub surface_area: f64,
    pub coordination: usize,
    pub atomic_volume: f64,
    pub cavity_radius: f64,
    pub index: Vec<usize>,
}

/// The immutable slice of a [`Builder`] that per-vertex statistics computation needs: the mesh,
/// vertex positions, and the active threshold/index configuration. Unlike `Builder` itself (which
/// holds a `RefCell` stats cache per vertex and so is never `Sync`), every field here is `Sync`,
/// which is what lets [`Builder::par_refresh_all_stats`] share one `StatsContext` across `rayon`
/// worker threads instead of `&Builder`.
struct StatsContext<'a> {
    mesh: &'a Mesh,
    positions: &'a [Vertex3],
    universe_verts: usize,
    area_threshold: Threshold,
    length_threshold: Threshold,
    index_length: usize,
    no_warning: bool,
}

impl<'a> StatsContext<'a> {
    fn is_universe_vertex(&self, v: VertexIdx) -> bool {
        v < self.universe_verts
    }

    fn tet_touches_universe(&self, t: TetIdx) -> bool {
        self.mesh.get(t).verts.iter().any(|&v| self.is_universe_vertex(v))
    }

    /// DFS from `v`'s hint tetrahedron through face-neighbors, visiting every live tetrahedron
    /// incident to `v`.
    fn incident_tets(&self, v: VertexIdx, hint: TetIdx) -> Vec<TetIdx> {
        let mut seen = HashSet::new();
        let mut stack = vec![hint];
        let mut result = Vec::new();
        while let Some(t) = stack.pop() {
            if !seen.insert(t) || !self.mesh.is_alive(t) {
                continue;
            }
            let tet = self.mesh.get(t);
            if tet.ordinal_of_vertex(v).is_none() {
                continue;
            }
            result.push(t);
            for f in 0..4 {
                if let Some(n) = tet.neighbors[f] {
                    if !seen.contains(&n) && self.mesh.is_alive(n) {
                        stack.push(n);
                    }
                }
            }
        }
        result
    }

    fn neighbor_candidates(&self, v: VertexIdx, incident: &[TetIdx]) -> Vec<VertexIdx> {
        let mut set = BTreeSet::new();
        for &t in incident {
            for &w in &self.mesh.get(t).verts {
                if w != v && !self.is_universe_vertex(w) {
                    set.insert(w);
                }
            }
        }
        set.into_iter().collect()
    }

    /// The ring-neighbor of `t` around edge `(v,w)` other than `prev`.
    fn get_neighbor(&self, v: VertexIdx, w: VertexIdx, t: TetIdx, prev: Option<TetIdx>) -> Option<TetIdx> {
        let tet = self.mesh.get(t);
        for &wing in tet.verts.iter() {
            if wing == v || wing == w {
                continue;
            }
            let ord = tet.ordinal_of_vertex(wing)?;
            if let Some(candidate) = tet.neighbors[ord] {
                if Some(candidate) != prev {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Walks the ring of tetrahedra around edge `(v,w)` starting at `start`, collecting one
    /// circumcenter per ring tetrahedron. Stops (marking the face incomplete) if the ring runs
    /// into a universe-touching tetrahedron or a missing neighbor before closing.
    fn walk_ring(&self, v: VertexIdx, w: VertexIdx, start: TetIdx) -> (Vec<Vertex3>, bool) {
        let mut centers = Vec::new();
        let mut current = start;
        let mut prev = None;
        let mut complete = true;
        let guard = self.mesh.len() + 1;

        for _ in 0..guard {
            if self.tet_touches_universe(current) {
                complete = false;
                break;
            }
            let verts = self.mesh.get(current).verts.map(|x| self.positions[x]);
            centers.push(center_sphere(verts[0], verts[1], verts[2], verts[3]));

            let next = match self.get_neighbor(v, w, current, prev) {
                Some(n) => n,
                None => {
                    complete = false;
                    break;
                }
            };
            if next == start {
                break;
            }
            if !self.mesh.is_alive(next) {
                complete = false;
                break;
            }
            prev = Some(current);
            current = next;
        }

        (centers, complete)
    }

    /// Fan-triangulates the ring of circumcenters from the first one, collapsing short edges per
    /// the active length threshold.
    fn fan_area(&self, centers: &[Vertex3], dis: f64) -> (f64, usize) {
        if centers.len() < 2 {
            return (0.0, centers.len());
        }
        let mut kept = vec![centers[0]];
        for &c in &centers[1..] {
            let last = *kept.last().unwrap();
            if !self.length_threshold.collapses(dist(last, c), dis) {
                kept.push(c);
            }
        }
        let mut total = 0.0;
        for i in 1..kept.len().saturating_sub(1) {
            total += area(kept[0], kept[i], kept[i + 1]);
        }
        (total, kept.len())
    }

    fn compute_stats(&self, v: VertexIdx, hint: TetIdx, no_warning: bool) -> VertexStats {
        let incident = self.incident_tets(v, hint);
        let neighbors = self.neighbor_candidates(v, &incident);

        let mut faces = Vec::with_capacity(neighbors.len());
        for w in neighbors {
            let start = match incident.iter().copied().find(|&t| self.mesh.get(t).ordinal_of_vertex(w).is_some()) {
                Some(t) => t,
                None => continue,
            };
            let dis = dist(self.positions[v], self.positions[w]);
            let (centers, complete) = self.walk_ring(v, w, start);
            let (face_area, tet_num) = self.fan_area(&centers, dis);

            if !complete && !no_warning {
                #[cfg(feature = "logging")]
                log::warn!("incomplete Voronoi face between vertex {v} and neighbor {w}");
            }

            faces.push(VertexFace {
                neighbor_vertex: w,
                area: face_area,
                dis,
                tet_num,
                complete,
            });
        }

        let surface_area: f64 = faces.iter().map(|f| f.area).sum();
        let coordination = faces
            .iter()
            .filter(|f| self.area_threshold.exceeded_by(f.area, surface_area))
            .count();
        let atomic_volume: f64 = faces.iter().map(|f| f.area * f.dis / 6.0).sum();
        let cavity_radius = incident
            .iter()
            .map(|&t| {
                let verts = self.mesh.get(t).verts.map(|x| self.positions[x]);
                dist(self.positions[v], center_sphere(verts[0], verts[1], verts[2], verts[3]))
            })
            .fold(0.0_f64, f64::max);

        let index_len = self.index_length.max(1);
        let mut index = vec![0usize; index_len];
        for f in &faces {
            if !self.area_threshold.exceeded_by(f.area, surface_area) {
                continue;
            }
            if f.tet_num > index_len && !no_warning {
                #[cfg(feature = "logging")]
                log::warn!("tetNum {} exceeds indexLength {index_len}", f.tet_num);
            }
            let bucket = f.tet_num.min(index_len).saturating_sub(1);
            index[bucket] += 1;
        }

        VertexStats {
            faces,
            surface_area,
            coordination,
            atomic_volume,
            cavity_radius,
            index,
        }
    }
}

impl Builder {
    // ----- public per-vertex read interface -----

    pub fn coordination(&self, v: VertexIdx) -> usize {
        self.ensure_stats(v);
        self.stats_ref(v).coordination
    }

    pub fn atomic_volume(&self, v: VertexIdx) -> f64 {
        self.ensure_stats(v);
        self.stats_ref(v).atomic_volume
    }

    pub fn cavity_radius(&self, v: VertexIdx) -> f64 {
        self.ensure_stats(v);
        self.stats_ref(v).cavity_radius
    }

    pub fn index(&self, v: VertexIdx) -> Ref<'_, [usize]> {
        self.ensure_stats(v);
        Ref::map(self.vertices[v].stats_cache.borrow(), |c| {
            c.as_ref().expect("ensure_stats just populated this cell").1.index.as_slice()
        })
    }

    pub fn surface_area(&self, v: VertexIdx) -> f64 {
        self.ensure_stats(v);
        self.stats_ref(v).surface_area
    }

    pub fn neighbor_vertices(&self, v: VertexIdx) -> Vec<VertexIdx> {
        self.ensure_stats(v);
        self.stats_ref(v).faces.iter().map(|f| f.neighbor_vertex).collect()
    }

    pub fn neighbor_tetrahedra(&self, v: VertexIdx) -> Vec<TetIdx> {
        self.ctx().incident_tets(v, self.vertices[v].hint)
    }

    // ----- per-tetrahedron read interface -----

    /// `Err` if `t` is not a live tetrahedron index.
    pub fn tetrahedron(&self, t: TetIdx) -> Result<&Tet> {
        if t >= self.mesh.len() || !self.mesh.is_alive(t) {
            return Err(anyhow::Error::msg(format!(
                "tetrahedron: index {t} is not a live tetrahedron"
            )));
        }
        Ok(self.mesh.get(t))
    }

    pub fn tetrahedra(&self) -> impl Iterator<Item = (TetIdx, &Tet)> {
        self.mesh.iter_live()
    }

    /// `None` if the tetrahedron touches a universe vertex (its circumcenter is not a meaningful
    /// Voronoi vertex of the real point set).
    pub fn tet_center_sphere(&self, t: TetIdx) -> Option<Vertex3> {
        if self.ctx().tet_touches_universe(t) {
            return None;
        }
        let verts = self.mesh.get(t).verts.map(|v| self.pos_unchecked(v));
        Some(center_sphere(verts[0], verts[1], verts[2], verts[3]))
    }

    pub fn tet_neighbor_vertex(&self, t: TetIdx, f: usize) -> Option<VertexIdx> {
        let tet = self.mesh.get(t);
        let n = tet.neighbors[f]?;
        self.mesh.get(n).ordinal_of_neighbor(t).map(|ord| self.mesh.get(n).vertex(ord))
    }

    pub fn tet_neighbor_tetrahedron(&self, t: TetIdx, f: usize) -> Option<TetIdx> {
        self.mesh.get(t).neighbors[f]
    }

    /// Recomputes every inserted vertex's statistics in parallel using `rayon`'s `par_iter`, then
    /// refreshes each vertex's cache against the current check stamp. Mirrors the shape of the
    /// teacher's own `par_is_regular` sweep: an index range driving `into_par_iter()`, collected
    /// back on the calling thread.
    #[cfg(feature = "parallel")]
    pub fn par_refresh_all_stats(&self) {
        let stamp = self.check_stamp();
        let ctx = self.ctx();
        let no_warning = self.no_warning;
        let hints: Vec<(VertexIdx, TetIdx)> =
            self.vertices().map(|v| (v, self.vertices[v].hint)).collect();

        let computed: Vec<(VertexIdx, VertexStats)> = hints
            .into_par_iter()
            .map(|(v, hint)| (v, ctx.compute_stats(v, hint, no_warning)))
            .collect();

        for (v, stats) in computed {
            *self.vertices[v].stats_cache.borrow_mut() = Some((stamp, stats));
        }
    }

    // ----- internals -----

    fn ctx(&self) -> StatsContext<'_> {
        StatsContext {
            mesh: &self.mesh,
            positions: &self.positions,
            universe_verts: self.universe_verts,
            area_threshold: self.area_threshold,
            length_threshold: self.length_threshold,
            index_length: self.index_length,
            no_warning: self.no_warning,
        }
    }

    fn ensure_stats(&self, v: VertexIdx) {
        let fresh = matches!(&*self.vertices[v].stats_cache.borrow(), Some((stamp, _)) if *stamp == self.check_stamp());
        if !fresh {
            let ctx = self.ctx();
            let computed = ctx.compute_stats(v, self.vertices[v].hint, self.no_warning);
            *self.vertices[v].stats_cache.borrow_mut() = Some((self.check_stamp(), computed));
        }
    }

    fn stats_ref(&self, v: VertexIdx) -> Ref<'_, VertexStats> {
        Ref::map(self.vertices[v].stats_cache.borrow(), |c| {
            &c.as_ref().expect("ensure_stats just populated this cell").1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> Builder {
        Builder::with_rng(StdRng::seed_from_u64(1))
    }

    #[test]
    fn single_insertion_has_no_interior_neighbors() {
        let mut b = seeded();
        let v = b.insert(0.0, 0.0, 0.0).unwrap();
        assert_eq!(b.neighbor_vertices(v).len(), 0);
        assert_eq!(b.coordination(v), 0);
    }

    #[test]
    fn regular_tetrahedron_neighbors_each_other() {
        let mut b = seeded();
        let v0 = b.insert(1.0, 1.0, 1.0).unwrap();
        let v1 = b.insert(1.0, -1.0, -1.0).unwrap();
        let v2 = b.insert(-1.0, 1.0, -1.0).unwrap();
        let v3 = b.insert(-1.0, -1.0, 1.0).unwrap();
        for v in [v0, v1, v2, v3] {
            assert_eq!(b.neighbor_vertices(v).len(), 3);
        }
    }

    #[test]
    fn index_histogram_sums_to_coordination() {
        let mut b = seeded();
        let v0 = b.insert(1.0, 1.0, 1.0).unwrap();
        b.insert(1.0, -1.0, -1.0).unwrap();
        b.insert(-1.0, 1.0, -1.0).unwrap();
        b.insert(-1.0, -1.0, 1.0).unwrap();
        let sum: usize = b.index(v0).iter().sum();
        assert_eq!(sum, b.coordination(v0));
    }

    #[test]
    fn threshold_default_is_relative_zero() {
        assert_eq!(Threshold::default(), Threshold::Relative(0.0));
    }

    #[test]
    fn tetrahedron_out_of_range_returns_err() {
        let b = seeded();
        assert!(b.tetrahedron(999).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn par_refresh_all_stats_matches_sequential() {
        let mut b = seeded();
        let v0 = b.insert(1.0, 1.0, 1.0).unwrap();
        let v1 = b.insert(1.0, -1.0, -1.0).unwrap();
        let v2 = b.insert(-1.0, 1.0, -1.0).unwrap();
        b.insert(-1.0, -1.0, 1.0).unwrap();

        let sequential_coordination = [b.coordination(v0), b.coordination(v1), b.coordination(v2)];

        b.par_refresh_all_stats();

        assert_eq!(b.coordination(v0), sequential_coordination[0]);
        assert_eq!(b.coordination(v1), sequential_coordination[1]);
        assert_eq!(b.coordination(v2), sequential_coordination[2]);
    }
}
