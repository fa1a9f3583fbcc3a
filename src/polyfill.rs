// Copyright 2025 Lars Brubaker
// License: MIT
//
// Ear-clipping triangulation of a single closed 2D boundary.
//
// The boundary lives in a circular doubly-linked list over a flat node
// arena (u32 prev/next links, no per-node allocation). Each vertex is
// classified by the sign of the area it spans with its two live
// neighbors; the reflex (concave/tangential) subset is mirrored into a
// KD-tree so the "does this candidate ear contain another vertex" test
// costs O(log n) instead of a scan. Cutting an ear unlinks one node,
// reclassifies its two neighbors, and advances a sweeping search start
// so output fans don't all hang off one corner.

use thiserror::Error;

use crate::geom::{cross_poly_2x, span_tri_sign, Real, Sign};
use crate::kdtree::KdTree2d;

pub const INVALID: u32 = u32::MAX;

/// A triangle as three indices into the caller's coordinate array.
pub type Tri = [u32; 3];

/// Caller's knowledge of the input polygon's winding.
///
/// `Unknown` spends one O(n) shoelace pass to find out; pass the real
/// winding when it is already known (negative signed area = `Clockwise`,
/// positive = `CounterClockwise`, y-up).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
    Unknown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyfillError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("triangle buffer too small: need {need}, got {got}")]
    OutputTooSmall { need: usize, got: usize },
    #[error("triangle buffer length {got} does not match boundary ({expected} expected)")]
    TriangleCountMismatch { expected: usize, got: usize },
}

#[derive(Clone)]
struct PolyIndex {
    next: u32,
    prev: u32,
    /// Position in the caller's coordinate array.
    index: u32,
    sign: Sign,
}

/// Reusable triangulation engine.
///
/// All scratch state (boundary-node arena, KD-tree) is retained between
/// calls, so feeding many similar-size polygons through one `Triangulator`
/// amortizes allocation. A `Triangulator` must not be shared across threads
/// for the same call; independent instances are fully independent.
pub struct Triangulator {
    nodes: Vec<PolyIndex>,
    kdtree: KdTree2d,
    reflex: Vec<u32>,
}

/// Triangulate a simple (possibly self-touching) closed boundary.
///
/// Returns exactly `coords.len() - 2` triangles whose indices are in range
/// and pairwise distinct. Self-intersecting input degrades to a geometrically
/// imperfect but fully-indexed triangulation rather than failing.
pub fn triangulate(coords: &[[Real; 2]], winding: Winding) -> Result<Vec<Tri>, PolyfillError> {
    Triangulator::new().triangulate(coords, winding)
}

impl Triangulator {
    pub fn new() -> Self {
        Triangulator {
            nodes: Vec::new(),
            kdtree: KdTree2d::new(),
            reflex: Vec::new(),
        }
    }

    /// As [`triangulate`], allocating the output.
    pub fn triangulate(
        &mut self,
        coords: &[[Real; 2]],
        winding: Winding,
    ) -> Result<Vec<Tri>, PolyfillError> {
        if coords.len() < 3 {
            return Err(PolyfillError::TooFewVertices(coords.len()));
        }
        let mut tris = vec![[INVALID; 3]; coords.len() - 2];
        self.triangulate_into(coords, winding, &mut tris)?;
        Ok(tris)
    }

    /// Triangulate into a caller-provided buffer of at least
    /// `coords.len() - 2` triangles; exactly that many are written.
    pub fn triangulate_into(
        &mut self,
        coords: &[[Real; 2]],
        winding: Winding,
        tris: &mut [Tri],
    ) -> Result<(), PolyfillError> {
        let n = coords.len();
        if n < 3 {
            return Err(PolyfillError::TooFewVertices(n));
        }
        let need = n - 2;
        if tris.len() < need {
            return Err(PolyfillError::OutputTooSmall {
                need,
                got: tris.len(),
            });
        }
        self.prepare(coords, winding);
        self.clip(coords, &mut tris[..need]);
        Ok(())
    }

    /// Build the circular node list in clockwise order (reversing the index
    /// mapping when the input winds the other way), classify every vertex,
    /// and mirror the reflex subset into the KD-tree.
    fn prepare(&mut self, coords: &[[Real; 2]], winding: Winding) {
        let n = coords.len() as u32;
        let clockwise = match winding {
            Winding::Clockwise => true,
            Winding::CounterClockwise => false,
            Winding::Unknown => cross_poly_2x(coords) <= 0.0,
        };

        self.nodes.clear();
        self.nodes.reserve(n as usize);
        for i in 0..n {
            self.nodes.push(PolyIndex {
                next: if i + 1 == n { 0 } else { i + 1 },
                prev: if i == 0 { n - 1 } else { i - 1 },
                index: if clockwise { i } else { (n - 1) - i },
                sign: Sign::Convex,
            });
        }
        for pi in 0..n {
            self.nodes[pi as usize].sign = self.calc_sign(coords, pi);
        }

        self.reflex.clear();
        for pi in 0..n as usize {
            if self.nodes[pi].sign != Sign::Convex {
                self.reflex.push(self.nodes[pi].index);
            }
        }
        self.kdtree.init(coords, &mut self.reflex);
    }

    fn calc_sign(&self, coords: &[[Real; 2]], pi: u32) -> Sign {
        let node = &self.nodes[pi as usize];
        let prev = &self.nodes[node.prev as usize];
        let next = &self.nodes[node.next as usize];
        span_tri_sign(
            &coords[prev.index as usize],
            &coords[node.index as usize],
            &coords[next.index as usize],
        )
    }

    fn clip(&mut self, coords: &[[Real; 2]], tris: &mut [Tri]) {
        let mut num_remaining = self.nodes.len() as u32;
        let mut search_start: u32 = 0;
        let mut reverse = false;
        let mut emit = 0usize;

        while num_remaining > 3 {
            let ear = self.ear_find(coords, search_start, reverse, num_remaining);
            // The ear may be a reflex vertex when the desperate fallback
            // fired; untrack it either way.
            self.kdtree.remove(self.nodes[ear as usize].index);

            let prev = self.nodes[ear as usize].prev;
            let next = self.nodes[ear as usize].next;

            tris[emit] = [
                self.nodes[prev as usize].index,
                self.nodes[ear as usize].index,
                self.nodes[next as usize].index,
            ];
            emit += 1;

            self.nodes[prev as usize].next = next;
            self.nodes[next as usize].prev = prev;
            num_remaining -= 1;

            // Cutting changes what the two survivors span.
            self.reclassify(coords, prev);
            self.reclassify(coords, next);

            // Sweep on past the cut, flipping direction each round so one
            // corner can't fan out the whole polygon.
            search_start = if reverse {
                self.nodes[prev as usize].prev
            } else {
                self.nodes[next as usize].next
            };
            reverse = !reverse;
        }

        // Final triangle: the three survivors in list order.
        let a = search_start;
        let b = self.nodes[a as usize].next;
        let c = self.nodes[b as usize].next;
        tris[emit] = [
            self.nodes[a as usize].index,
            self.nodes[b as usize].index,
            self.nodes[c as usize].index,
        ];
    }

    /// Find the next ear to cut, scanning the live ring from `start`.
    ///
    /// Pass 1 accepts only strictly convex ears; pass 2 (reached on
    /// nearly-degenerate boundaries) relaxes to tangential ones. If no
    /// candidate passes the containment test the polygon overlaps itself
    /// somewhere; cut any non-concave vertex, or `start` itself, so the
    /// loop always terminates. The resulting triangle can overlap earlier
    /// output for such input; callers rely on termination over geometric
    /// perfection there.
    fn ear_find(&self, coords: &[[Real; 2]], start: u32, reverse: bool, num_remaining: u32) -> u32 {
        let mut ear = start;
        for _ in 0..num_remaining {
            if self.ear_check(coords, ear, Sign::Convex) {
                return ear;
            }
            ear = self.step(ear, reverse);
        }

        let mut ear = start;
        for _ in 0..num_remaining {
            if self.ear_check(coords, ear, Sign::Tangential) {
                return ear;
            }
            ear = self.step(ear, reverse);
        }

        let mut ear = start;
        for _ in 0..num_remaining {
            if self.nodes[ear as usize].sign != Sign::Concave {
                return ear;
            }
            ear = self.step(ear, reverse);
        }
        start
    }

    #[inline]
    fn step(&self, pi: u32, reverse: bool) -> u32 {
        if reverse {
            self.nodes[pi as usize].prev
        } else {
            self.nodes[pi as usize].next
        }
    }

    fn ear_check(&self, coords: &[[Real; 2]], ear: u32, accept: Sign) -> bool {
        let node = &self.nodes[ear as usize];
        match node.sign {
            Sign::Concave => return false,
            Sign::Tangential if accept == Sign::Convex => return false,
            _ => {}
        }
        if self.kdtree.is_empty() {
            return true;
        }
        let tri = [
            self.nodes[node.prev as usize].index,
            node.index,
            self.nodes[node.next as usize].index,
        ];
        !self.kdtree.triangle_intersects(coords, &tri)
    }

    /// Recompute a survivor's classification and keep the KD-tree in step
    /// with the reflex set.
    fn reclassify(&mut self, coords: &[[Real; 2]], pi: u32) {
        let sign_prev = self.nodes[pi as usize].sign;
        let sign_new = self.calc_sign(coords, pi);
        if sign_new == sign_prev {
            return;
        }
        self.nodes[pi as usize].sign = sign_new;
        let index = self.nodes[pi as usize].index;
        if sign_new == Sign::Convex {
            self.kdtree.remove(index);
        } else if sign_prev == Sign::Convex {
            self.kdtree.insert(coords, index);
        }
        // Tangential <-> Concave transitions stay tracked either way.
    }
}

impl Default for Triangulator {
    fn default() -> Self {
        Self::new()
    }
}
