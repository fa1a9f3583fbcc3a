// Copyright 2025 Lars Brubaker
// Shared test utilities for polyfill2d tests.

#![allow(dead_code)]

use polyfill2d::{Real, Tri};

/// Parse the `.dat` polygon format: one vertex per line as `x y` or
/// `x, y`; blank lines separate polygons. Returns one point list per
/// polygon.
pub fn parse_polygons(data: &str) -> Vec<Vec<[Real; 2]>> {
    let mut polygons: Vec<Vec<[Real; 2]>> = Vec::new();
    let mut current: Vec<[Real; 2]> = Vec::new();

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                polygons.push(std::mem::take(&mut current));
            }
            continue;
        }
        let floats: Vec<Real> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<Real>().ok())
            .collect();
        for pair in floats.chunks(2) {
            if pair.len() == 2 {
                current.push([pair[0], pair[1]]);
            }
        }
    }
    if !current.is_empty() {
        polygons.push(current);
    }
    polygons
}

/// Twice the signed area of a triangle; positive = counter-clockwise.
pub fn triangle_area_2x(coords: &[[Real; 2]], tri: &Tri) -> Real {
    let a = coords[tri[0] as usize];
    let b = coords[tri[1] as usize];
    let c = coords[tri[2] as usize];
    (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
}

/// Signed area of a closed polygon; positive = counter-clockwise.
pub fn polygon_signed_area(coords: &[[Real; 2]]) -> Real {
    let n = coords.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += coords[i][0] * coords[j][1];
        area -= coords[j][0] * coords[i][1];
    }
    area * 0.5
}

/// Sum of unsigned triangle areas.
pub fn total_triangle_area(coords: &[[Real; 2]], tris: &[Tri]) -> Real {
    tris.iter()
        .map(|tri| triangle_area_2x(coords, tri).abs() * 0.5)
        .sum()
}

/// Every index in range, every triangle's indices pairwise distinct.
pub fn verify_valid_indices(coords: &[[Real; 2]], tris: &[Tri]) {
    for (i, tri) in tris.iter().enumerate() {
        for &v in tri {
            assert!(
                (v as usize) < coords.len(),
                "triangle {} index {} out of range (vertex count {})",
                i,
                v,
                coords.len()
            );
        }
        assert!(
            tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2],
            "triangle {} has repeated indices: {:?}",
            i,
            tri
        );
    }
}

/// Every input vertex appears in at least one triangle.
pub fn verify_vertex_coverage(coords: &[[Real; 2]], tris: &[Tri]) {
    let mut seen = vec![false; coords.len()];
    for tri in tris {
        for &v in tri {
            seen[v as usize] = true;
        }
    }
    for (i, &s) in seen.iter().enumerate() {
        assert!(s, "vertex {} never appears in any triangle", i);
    }
}

/// Planar-triangulation identity for non-self-intersecting input: each of
/// the n boundary edges occurs exactly once, each of the n-3 internal
/// edges exactly twice.
pub fn verify_edge_topology(n: usize, tris: &[Tri]) {
    let mut counts = std::collections::HashMap::<(u32, u32), usize>::new();
    for tri in tris {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut boundary = 0usize;
    let mut internal = 0usize;
    for (&(a, b), &c) in &counts {
        let adjacent = b - a == 1 || (a == 0 && b as usize == n - 1);
        if adjacent {
            assert_eq!(c, 1, "boundary edge ({}, {}) occurs {} times", a, b, c);
            boundary += 1;
        } else {
            assert_eq!(c, 2, "internal edge ({}, {}) occurs {} times", a, b, c);
            internal += 1;
        }
    }
    assert_eq!(boundary, n, "expected {} boundary edges, got {}", n, boundary);
    assert_eq!(
        internal,
        n - 3,
        "expected {} internal edges, got {}",
        n - 3,
        internal
    );
}

/// All triangles wind the same way (the engine emits clockwise, i.e.
/// non-positive signed area).
pub fn verify_winding_consistent(coords: &[[Real; 2]], tris: &[Tri]) {
    for (i, tri) in tris.iter().enumerate() {
        let a = triangle_area_2x(coords, tri);
        assert!(
            a <= 0.0,
            "triangle {} winds against the rest (2x area {})",
            i,
            a
        );
    }
}

/// The aggregate shape quality the beautify pass maximizes: area over
/// perimeter, summed over all triangles.
pub fn total_quality(coords: &[[Real; 2]], tris: &[Tri]) -> Real {
    tris.iter()
        .map(|tri| {
            let a = coords[tri[0] as usize];
            let b = coords[tri[1] as usize];
            let c = coords[tri[2] as usize];
            let perimeter = dist(&a, &b) + dist(&b, &c) + dist(&c, &a);
            if perimeter <= Real::EPSILON {
                0.0
            } else {
                triangle_area_2x(coords, tri).abs() * 0.5 / perimeter
            }
        })
        .sum()
}

fn dist(a: &[Real; 2], b: &[Real; 2]) -> Real {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// The undirected internal edges (those shared by two triangles).
pub fn internal_edges(tris: &[Tri]) -> Vec<(u32, u32)> {
    let mut counts = std::collections::HashMap::<(u32, u32), usize>::new();
    for tri in tris {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut edges: Vec<(u32, u32)> = counts
        .into_iter()
        .filter_map(|(e, c)| (c == 2).then_some(e))
        .collect();
    edges.sort_unstable();
    edges
}
