// Copyright 2025 Lars Brubaker
// License: MIT
//
// Triangle-quality improvement by rotating internal edges.
//
// A slim half-edge view is laid over the triangle array: slot t*3+k is
// the directed edge tris[t][k] -> tris[t][(k+1)%3], so the in-triangle
// successor is implicit and the triangle array itself stays the one
// source of vertex identity. Each undirected edge shared by two
// triangles gets a radial twin link plus a stable id into a heap side
// table. Rotating an edge rewrites the six slots of the two triangles
// touched (and the radial links of their four outside partners), then
// recosts exactly the five edges involved.

use crate::geom::{area_tri_signed_2x, len_v2v2, Real};
use crate::heap::{Heap, INVALID_HANDLE};
use crate::polyfill::{PolyfillError, Tri, INVALID};

#[derive(Copy, Clone)]
struct EdgeHalf {
    /// Radial twin slot in the adjacent triangle, INVALID on boundary.
    radial: u32,
    /// Stable undirected-edge id into the heap table, INVALID on boundary.
    base: u32,
}

const UNPAIRED: EdgeHalf = EdgeHalf {
    radial: INVALID,
    base: INVALID,
};

/// Reusable edge-rotation engine; see [`beautify`].
///
/// Scratch state (half-edge table, heap, pairing buffer) is retained
/// between calls.
pub struct Beautifier {
    halves: Vec<EdgeHalf>,
    /// Edge id -> heap handle, INVALID_HANDLE while the edge is not queued.
    handles: Vec<u32>,
    heap: Heap,
    pairing: Vec<(u32, u32, u32)>,
}

/// Improve triangle shapes by rotating internal edges until no rotation
/// helps.
///
/// `tris` must have come from [`crate::triangulate`] over the same
/// `coords` ordering (boundary-edge detection relies on it). The triangle
/// array is rewritten in place; triangle count and the covered vertex set
/// are preserved. Running the pass a second time changes nothing.
pub fn beautify(coords: &[[Real; 2]], tris: &mut [Tri]) -> Result<(), PolyfillError> {
    Beautifier::new().beautify(coords, tris)
}

impl Beautifier {
    pub fn new() -> Self {
        Beautifier {
            halves: Vec::new(),
            handles: Vec::new(),
            heap: Heap::new(),
            pairing: Vec::new(),
        }
    }

    pub fn beautify(
        &mut self,
        coords: &[[Real; 2]],
        tris: &mut [Tri],
    ) -> Result<(), PolyfillError> {
        let n = coords.len();
        if n < 3 {
            return Err(PolyfillError::TooFewVertices(n));
        }
        if tris.len() != n - 2 {
            return Err(PolyfillError::TriangleCountMismatch {
                expected: n - 2,
                got: tris.len(),
            });
        }

        self.build_adjacency(n as u32, tris);
        self.seed_heap(coords, tris);

        while let Some((_, slot)) = self.heap.pop_min() {
            let base = self.halves[slot as usize].base;
            self.handles[base as usize] = INVALID_HANDLE;
            // Entries are kept in step incrementally, but check anyway in
            // case the surrounding geometry shifted under this one.
            if self.rotate_cost(coords, tris, slot) >= 0.0 {
                continue;
            }
            let touched = self.rotate(tris, slot);
            for s in touched {
                self.recost(coords, tris, s);
            }
        }
        Ok(())
    }

    /// Pair up the directed edges. Edges whose endpoints are adjacent in
    /// the original boundary order never pair: they are polygon boundary,
    /// and key-hole input can even duplicate them.
    fn build_adjacency(&mut self, n: u32, tris: &[Tri]) {
        self.halves.clear();
        self.halves.resize(tris.len() * 3, UNPAIRED);

        self.pairing.clear();
        self.pairing.reserve(tris.len() * 3);
        for (t, tri) in tris.iter().enumerate() {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                if hi - lo == 1 || (lo == 0 && hi == n - 1) {
                    continue;
                }
                self.pairing.push((lo, hi, (t * 3 + k) as u32));
            }
        }
        self.pairing.sort_unstable();

        let mut base_num = 0u32;
        let mut i = 0;
        while i + 1 < self.pairing.len() {
            let (lo, hi, s0) = self.pairing[i];
            let (lo1, hi1, s1) = self.pairing[i + 1];
            if lo == lo1 && hi == hi1 {
                // Two triangles only make a rotatable pair when they sit on
                // opposite sides, i.e. traverse the edge in opposite
                // directions. Same-direction duplicates (overlapping output
                // from a self-intersecting boundary) stay unrotatable.
                let o0 = tris[s0 as usize / 3][s0 as usize % 3];
                let o1 = tris[s1 as usize / 3][s1 as usize % 3];
                if o0 != o1 {
                    self.halves[s0 as usize] = EdgeHalf {
                        radial: s1,
                        base: base_num,
                    };
                    self.halves[s1 as usize] = EdgeHalf {
                        radial: s0,
                        base: base_num,
                    };
                    base_num += 1;
                }
                i += 2;
            } else {
                // Appears once: coincides with the polygon boundary some
                // other way; leave it unrotatable.
                i += 1;
            }
        }

        self.handles.clear();
        self.handles.resize(base_num as usize, INVALID_HANDLE);
    }

    fn seed_heap(&mut self, coords: &[[Real; 2]], tris: &[Tri]) {
        self.heap.clear();
        for slot in 0..self.halves.len() as u32 {
            let eh = self.halves[slot as usize];
            // One entry per undirected edge.
            if eh.base == INVALID || eh.radial < slot {
                continue;
            }
            self.recost(coords, tris, slot);
        }
    }

    /// Quad corners around the edge held in `slot`:
    /// shared diagonal (v2, v4), apexes v1 (this side) and v3 (far side).
    #[inline]
    fn quad_of(&self, tris: &[Tri], slot: u32) -> [u32; 4] {
        let radial = self.halves[slot as usize].radial;
        let ta = (slot / 3) as usize;
        let k = (slot % 3) as usize;
        let tb = (radial / 3) as usize;
        let j = (radial % 3) as usize;
        let v2 = tris[ta][k];
        let v4 = tris[ta][(k + 1) % 3];
        let v1 = tris[ta][(k + 2) % 3];
        let v3 = tris[tb][(j + 2) % 3];
        debug_assert_eq!(tris[tb][j], v4);
        debug_assert_eq!(tris[tb][(j + 1) % 3], v2);
        [v1, v2, v3, v4]
    }

    fn rotate_cost(&self, coords: &[[Real; 2]], tris: &[Tri], slot: u32) -> Real {
        let [v1, v2, v3, v4] = self.quad_of(tris, slot);
        // Key-hole boundaries can glue two triangles along coincident
        // vertices; a diagonal between equal indices is no diagonal.
        if v1 == v3 {
            return Real::MAX;
        }
        quad_rotate_cost(
            &coords[v1 as usize],
            &coords[v2 as usize],
            &coords[v3 as usize],
            &coords[v4 as usize],
        )
    }

    /// Swap the diagonal held in `slot` for the quad's other one. Returns
    /// the five slots whose edges need recosting: the new diagonal plus
    /// the four perimeter edges.
    fn rotate(&mut self, tris: &mut [Tri], slot: u32) -> [u32; 5] {
        let radial = self.halves[slot as usize].radial;
        let ta = (slot / 3) as usize;
        let k = (slot % 3) as usize;
        let tb = (radial / 3) as usize;
        let j = (radial % 3) as usize;

        let [v1, v2, v3, v4] = self.quad_of(tris, slot);
        let base_diag = self.halves[slot as usize].base;

        // Perimeter halves, captured before anything is overwritten.
        let e41 = self.halves[ta * 3 + (k + 1) % 3];
        let e12 = self.halves[ta * 3 + (k + 2) % 3];
        let e23 = self.halves[tb * 3 + (j + 1) % 3];
        let e34 = self.halves[tb * 3 + (j + 2) % 3];

        // New pair around diagonal (v1, v3); both keep the old orientation.
        tris[ta] = [v1, v2, v3];
        tris[tb] = [v3, v4, v1];

        let a0 = (ta * 3) as u32; // v1 -> v2
        let a1 = a0 + 1; // v2 -> v3
        let a2 = a0 + 2; // v3 -> v1, diagonal
        let b0 = (tb * 3) as u32; // v3 -> v4
        let b1 = b0 + 1; // v4 -> v1
        let b2 = b0 + 2; // v1 -> v3, diagonal

        self.halves[a0 as usize] = e12;
        self.halves[a1 as usize] = e23;
        self.halves[a2 as usize] = EdgeHalf {
            radial: b2,
            base: base_diag,
        };
        self.halves[b0 as usize] = e34;
        self.halves[b1 as usize] = e41;
        self.halves[b2 as usize] = EdgeHalf {
            radial: a2,
            base: base_diag,
        };

        // Outside partners follow their edges to the new slots.
        if e12.radial != INVALID {
            self.halves[e12.radial as usize].radial = a0;
        }
        if e23.radial != INVALID {
            self.halves[e23.radial as usize].radial = a1;
        }
        if e34.radial != INVALID {
            self.halves[e34.radial as usize].radial = b0;
        }
        if e41.radial != INVALID {
            self.halves[e41.radial as usize].radial = b1;
        }

        [a2, a0, a1, b0, b1]
    }

    /// Recompute one edge's rotation cost and bring its heap entry in
    /// line: queued iff the cost is negative. Re-inserting (rather than
    /// updating in place) also refreshes the payload, since the edge may
    /// have moved to a different slot during the rotation.
    fn recost(&mut self, coords: &[[Real; 2]], tris: &[Tri], slot: u32) {
        let base = self.halves[slot as usize].base;
        if base == INVALID {
            return;
        }
        let cost = self.rotate_cost(coords, tris, slot);
        let handle = self.handles[base as usize];
        if handle != INVALID_HANDLE {
            self.heap.remove(handle);
            self.handles[base as usize] = INVALID_HANDLE;
        }
        if cost < 0.0 {
            self.handles[base as usize] = self.heap.insert(cost, slot);
        }
    }
}

impl Default for Beautifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Cost of replacing diagonal (v2, v4) of quad (v1, v2, v3, v4) with
/// (v1, v3): the current pair's area/perimeter quality minus the rotated
/// pair's. Negative when the rotated pair is better shaped; `Real::MAX`
/// when rotation is rejected outright.
fn quad_rotate_cost(v1: &[Real; 2], v2: &[Real; 2], v3: &[Real; 2], v4: &[Real; 2]) -> Real {
    let area_2x_123 = area_tri_signed_2x(v1, v2, v3);
    let area_2x_134 = area_tri_signed_2x(v1, v3, v4);

    // Opposing orientations mean the quad is concave across the new
    // diagonal; rotating would fold one triangle over the other.
    if (area_2x_123 >= 0.0) != (area_2x_134 >= 0.0) {
        return Real::MAX;
    }

    let area_2x_124 = area_tri_signed_2x(v1, v2, v4);
    let area_2x_234 = area_tri_signed_2x(v2, v3, v4);

    // Only rotate into a degenerate pair when escaping an existing one.
    if area_2x_123 == 0.0 || area_2x_134 == 0.0 {
        if !(area_2x_124 == 0.0 || area_2x_234 == 0.0) {
            return Real::MAX;
        }
    }

    let len_12 = len_v2v2(v1, v2);
    let len_23 = len_v2v2(v2, v3);
    let len_34 = len_v2v2(v3, v4);
    let len_41 = len_v2v2(v4, v1);
    let len_24 = len_v2v2(v2, v4);
    let len_13 = len_v2v2(v1, v3);

    let quality_cur =
        tri_quality(area_2x_124, len_12 + len_24 + len_41) + tri_quality(area_2x_234, len_23 + len_34 + len_24);
    let quality_new =
        tri_quality(area_2x_123, len_12 + len_23 + len_13) + tri_quality(area_2x_134, len_13 + len_34 + len_41);

    let cost = quality_cur - quality_new;
    if !cost.is_finite() {
        return Real::MAX;
    }
    cost
}

/// Area/perimeter shape ratio: equilateral triangles score highest,
/// slivers tend to zero. Guarded so a collapsed triangle never divides
/// by (near) zero.
#[inline]
fn tri_quality(area_2x: Real, perimeter: Real) -> Real {
    if perimeter <= Real::EPSILON {
        return 0.0;
    }
    (area_2x.abs() * 0.5) / perimeter
}
