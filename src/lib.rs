// polyfill2d: 2D polygon triangulation with a quality post-pass
// Copyright 2025 Lars Brubaker
// License: MIT

pub mod beautify;
pub mod geom;
pub mod heap;
pub mod kdtree;
pub mod polyfill;

pub use beautify::{beautify, Beautifier};
pub use geom::Real;
pub use polyfill::{triangulate, PolyfillError, Tri, Triangulator, Winding};
