// Copyright 2025 Lars Brubaker
// License: MIT
//
// A 2D KD-tree over the polygon's reflex (concave/tangential) vertices.
//
// All links are u32 indices into a node arena (KDNODE_UNSET = null), with
// parent back-links so removal can unlink childless chains. Removal is
// lazy: a node is flag-marked and only detached from its parent once its
// whole subtree is empty, which keeps queries shallow without ever moving
// nodes. The arena is reset wholesale between polygons.

use crate::geom::{span_tri_sign, Real, Sign};

pub const KDNODE_UNSET: u32 = u32::MAX;

#[derive(Clone)]
struct KdNode {
    neg: u32,
    pos: u32,
    parent: u32,
    /// Index into the caller's coordinate array.
    index: u32,
    axis: u8,
    removed: bool,
}

pub struct KdTree2d {
    nodes: Vec<KdNode>,
    /// Coordinate index -> arena slot, KDNODE_UNSET when untracked.
    node_map: Vec<u32>,
    root: u32,
    node_num: u32,
}

impl KdTree2d {
    pub fn new() -> Self {
        KdTree2d {
            nodes: Vec::new(),
            node_map: Vec::new(),
            root: KDNODE_UNSET,
            node_num: 0,
        }
    }

    #[inline]
    pub fn node_num(&self) -> u32 {
        self.node_num
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node_num == 0
    }

    /// Rebuild the tree over `indices` (balanced by recursive median
    /// split on alternating axes). `indices` is scratch and gets reordered.
    pub fn init(&mut self, coords: &[[Real; 2]], indices: &mut [u32]) {
        self.nodes.clear();
        self.node_map.clear();
        self.node_map.resize(coords.len(), KDNODE_UNSET);
        self.nodes.reserve(indices.len());
        self.node_num = indices.len() as u32;
        self.root = Self::balance(
            &mut self.nodes,
            &mut self.node_map,
            coords,
            indices,
            0,
            KDNODE_UNSET,
        );
    }

    fn balance(
        nodes: &mut Vec<KdNode>,
        node_map: &mut [u32],
        coords: &[[Real; 2]],
        items: &mut [u32],
        axis: u8,
        parent: u32,
    ) -> u32 {
        if items.is_empty() {
            return KDNODE_UNSET;
        }
        let a = axis as usize;
        items.sort_unstable_by(|&i, &j| {
            coords[i as usize][a]
                .partial_cmp(&coords[j as usize][a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = items.len() / 2;
        let index = items[mid];
        let slot = nodes.len() as u32;
        nodes.push(KdNode {
            neg: KDNODE_UNSET,
            pos: KDNODE_UNSET,
            parent,
            index,
            axis,
            removed: false,
        });
        node_map[index as usize] = slot;

        let (lo, rest) = items.split_at_mut(mid);
        let hi = &mut rest[1..];
        let neg = Self::balance(nodes, node_map, coords, lo, axis ^ 1, slot);
        let pos = Self::balance(nodes, node_map, coords, hi, axis ^ 1, slot);
        nodes[slot as usize].neg = neg;
        nodes[slot as usize].pos = pos;
        slot
    }

    /// Track a vertex that has turned reflex after construction. Walks down
    /// from the root without rebalancing; removed nodes still route
    /// correctly since coordinates never change.
    pub fn insert(&mut self, coords: &[[Real; 2]], index: u32) {
        debug_assert_eq!(self.node_map[index as usize], KDNODE_UNSET);
        let slot = self.nodes.len() as u32;
        if self.root == KDNODE_UNSET {
            self.nodes.push(KdNode {
                neg: KDNODE_UNSET,
                pos: KDNODE_UNSET,
                parent: KDNODE_UNSET,
                index,
                axis: 0,
                removed: false,
            });
            self.root = slot;
        } else {
            let co = &coords[index as usize];
            let mut curr = self.root;
            loop {
                let node = &self.nodes[curr as usize];
                let a = node.axis as usize;
                let next = if co[a] < coords[node.index as usize][a] {
                    node.neg
                } else {
                    node.pos
                };
                if next == KDNODE_UNSET {
                    break;
                }
                curr = next;
            }
            let axis = self.nodes[curr as usize].axis ^ 1;
            self.nodes.push(KdNode {
                neg: KDNODE_UNSET,
                pos: KDNODE_UNSET,
                parent: curr,
                index,
                axis,
                removed: false,
            });
            let parent = &mut self.nodes[curr as usize];
            let a = parent.axis as usize;
            if coords[index as usize][a] < coords[parent.index as usize][a] {
                parent.neg = slot;
            } else {
                parent.pos = slot;
            }
        }
        self.node_map[index as usize] = slot;
        self.node_num += 1;
    }

    /// Untrack a vertex. No-op when it was never tracked. Childless removed
    /// chains are unlinked from their parents on the way up.
    pub fn remove(&mut self, index: u32) {
        let mut node_index = self.node_map[index as usize];
        if node_index == KDNODE_UNSET {
            return;
        }
        self.node_map[index as usize] = KDNODE_UNSET;
        debug_assert!(!self.nodes[node_index as usize].removed);
        self.nodes[node_index as usize].removed = true;
        self.node_num -= 1;

        loop {
            let node = &self.nodes[node_index as usize];
            if node.neg != KDNODE_UNSET || node.pos != KDNODE_UNSET || node.parent == KDNODE_UNSET
            {
                break;
            }
            let parent_index = node.parent;
            let parent = &mut self.nodes[parent_index as usize];
            if parent.neg == node_index {
                parent.neg = KDNODE_UNSET;
            } else {
                debug_assert_eq!(parent.pos, node_index);
                parent.pos = KDNODE_UNSET;
            }
            if parent.removed {
                node_index = parent_index;
            } else {
                break;
            }
        }
    }

    /// Does any tracked vertex lie inside (or on the edge of) the triangle
    /// formed by the three coordinate indices in `tri`? The triangle's own
    /// corners never count, even when they are tracked themselves.
    pub fn triangle_intersects(&self, coords: &[[Real; 2]], tri: &[u32; 3]) -> bool {
        if self.node_num == 0 {
            return false;
        }
        let vs = [
            &coords[tri[0] as usize],
            &coords[tri[1] as usize],
            &coords[tri[2] as usize],
        ];
        let mut bb_min = [Real::MAX, Real::MAX];
        let mut bb_max = [Real::MIN, Real::MIN];
        for v in &vs {
            for a in 0..2 {
                bb_min[a] = bb_min[a].min(v[a]);
                bb_max[a] = bb_max[a].max(v[a]);
            }
        }
        self.isect_recursive(coords, tri, &vs, &bb_min, &bb_max, self.root)
    }

    fn isect_recursive(
        &self,
        coords: &[[Real; 2]],
        tri: &[u32; 3],
        vs: &[&[Real; 2]; 3],
        bb_min: &[Real; 2],
        bb_max: &[Real; 2],
        node_index: u32,
    ) -> bool {
        let node = &self.nodes[node_index as usize];
        let co = &coords[node.index as usize];

        if !node.removed
            && co[0] >= bb_min[0]
            && co[0] <= bb_max[0]
            && co[1] >= bb_min[1]
            && co[1] <= bb_max[1]
            && span_tri_sign(vs[0], vs[1], co) != Sign::Concave
            && span_tri_sign(vs[1], vs[2], co) != Sign::Concave
            && span_tri_sign(vs[2], vs[0], co) != Sign::Concave
            && node.index != tri[0]
            && node.index != tri[1]
            && node.index != tri[2]
        {
            return true;
        }

        let a = node.axis as usize;
        if node.neg != KDNODE_UNSET
            && bb_min[a] <= co[a]
            && self.isect_recursive(coords, tri, vs, bb_min, bb_max, node.neg)
        {
            return true;
        }
        if node.pos != KDNODE_UNSET
            && bb_max[a] >= co[a]
            && self.isect_recursive(coords, tri, vs, bb_min, bb_max, node.pos)
        {
            return true;
        }
        false
    }
}
