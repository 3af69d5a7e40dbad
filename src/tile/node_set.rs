//! The tile's deduplicated vertex set and triangle-face table (§3 `Node`,
//! `Face`; §4.8 steps 10-14).
//!
//! `NodeSet` is append-only until [`NodeSet::sort_and_lock`] is called
//! exactly once (stage 2 step 11), after which positions are looked up by
//! coordinate but never mutated and no further insertion is allowed —
//! matching the data model's "sorted exactly once; thereafter
//! index-stable" lifecycle.

use super::area_type::AreaType;
use crate::geometry::{EcefVector, Point2, Point3};
use std::collections::HashMap;

/// Grid used to collapse bit-identical (or effectively so) duplicate
/// vertex positions during sort. Matches `crate::clipper`'s quantization
/// scale so vertices produced by the clipper adapter collapse cleanly.
const DEDUP_UNITS_PER_DEGREE: f64 = 1.0e9;

fn quantize_key(p: Point2) -> (i64, i64) {
    (
        (p.lon * DEDUP_UNITS_PER_DEGREE).round() as i64,
        (p.lat * DEDUP_UNITS_PER_DEGREE).round() as i64,
    )
}

/// A deduplicated vertex of the tile mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub pos: Point2,
    pub elevation_m: f64,
    pub boundary: bool,
    pub fixed_elevation: bool,
    /// Indices into the tile's `faces` vector, filled by
    /// `lookup_faces_per_node` (§4.8 step 14).
    pub faces: Vec<usize>,
    pub normal: Option<EcefVector>,
}

impl Node {
    pub fn point3(&self) -> Point3 {
        Point3::from_point2(self.pos, self.elevation_m)
    }
}

/// A triangulated face, addressed by which land-class shape/segment/
/// triangle it came from (§3 `Face`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceRef {
    pub area_type: AreaType,
    pub shape_idx: usize,
    pub segment_idx: usize,
    pub tri_idx: usize,
}

#[derive(Debug, Clone)]
pub struct Face {
    pub id: FaceRef,
    pub nodes: [usize; 3],
    pub area_m2: f64,
    pub normal: EcefVector,
}

#[derive(Debug, Default)]
pub struct NodeSet {
    pending: Vec<(Point2, bool, bool)>, // (position, boundary, fixed_elevation)
    nodes: Vec<Node>,
    index: HashMap<(i64, i64), usize>,
    sorted: bool,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Appends a vertex. Before [`NodeSet::sort_and_lock`], order is
    /// irrelevant and duplicates are expected (many triangles share
    /// vertices); panics if called after sorting, matching §7's "abort
    /// process" policy for a programmer-error invariant violation.
    pub fn add(&mut self, pos: Point2) {
        assert!(!self.sorted, "NodeSet::add called after sort_and_lock");
        self.pending.push((pos, false, false));
    }

    pub fn add_boundary(&mut self, pos: Point2) {
        assert!(!self.sorted, "NodeSet::add_boundary called after sort_and_lock");
        self.pending.push((pos, true, false));
    }

    pub fn add_fixed_elevation(&mut self, pos: Point2) {
        assert!(!self.sorted, "NodeSet::add_fixed_elevation called after sort_and_lock");
        self.pending.push((pos, false, true));
    }

    /// Sorts, dedups (by quantized position — first-seen value wins, so
    /// every node's stored position is bit-identical to one of its
    /// original insertions, never an average), and forbids further
    /// insertion. Deterministic regardless of insertion order, which is
    /// what makes a tile's output byte-identical across reruns with
    /// unchanged inputs (§4.8's idempotence requirement).
    pub fn sort_and_lock(&mut self) {
        assert!(!self.sorted, "NodeSet::sort_and_lock called twice");

        let mut by_key: HashMap<(i64, i64), Node> = HashMap::new();
        for (pos, boundary, fixed) in self.pending.drain(..) {
            let key = quantize_key(pos);
            let entry = by_key.entry(key).or_insert_with(|| Node {
                pos,
                elevation_m: 0.0,
                boundary: false,
                fixed_elevation: false,
                faces: Vec::new(),
                normal: None,
            });
            entry.boundary |= boundary;
            entry.fixed_elevation |= fixed;
        }

        let mut keyed: Vec<((i64, i64), Node)> = by_key.into_iter().collect();
        keyed.sort_by_key(|(k, _)| *k);

        self.nodes = Vec::with_capacity(keyed.len());
        self.index = HashMap::with_capacity(keyed.len());
        for (key, node) in keyed {
            self.index.insert(key, self.nodes.len());
            self.nodes.push(node);
        }
        self.sorted = true;
    }

    /// Looks up a node's index by position. Only valid after
    /// [`NodeSet::sort_and_lock`].
    pub fn index_of(&self, pos: Point2) -> Option<usize> {
        assert!(self.sorted, "NodeSet::index_of called before sort_and_lock");
        self.index.get(&quantize_key(pos)).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn get(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_positions_collapse_to_one_node() {
        let mut set = NodeSet::new();
        set.add(Point2::new(1.0, 2.0));
        set.add(Point2::new(1.0, 2.0));
        set.add(Point2::new(3.0, 4.0));
        set.sort_and_lock();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_position_recovered_by_index_is_bit_exact() {
        let mut set = NodeSet::new();
        let p = Point2::new(-122.123456789, 47.987654321);
        set.add(p);
        set.sort_and_lock();
        let idx = set.index_of(p).expect("inserted position must be found");
        assert_eq!(set.get(idx).pos, p);
    }

    #[test]
    #[should_panic(expected = "sort_and_lock")]
    fn test_add_after_sort_panics() {
        let mut set = NodeSet::new();
        set.add(Point2::new(0.0, 0.0));
        set.sort_and_lock();
        set.add(Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_sort_is_deterministic_regardless_of_insertion_order() {
        let pts = [Point2::new(3.0, 1.0), Point2::new(1.0, 1.0), Point2::new(2.0, 1.0)];

        let mut a = NodeSet::new();
        for p in pts {
            a.add(p);
        }
        a.sort_and_lock();

        let mut b = NodeSet::new();
        for p in pts.iter().rev() {
            b.add(*p);
        }
        b.sort_and_lock();

        let pos_a: Vec<Point2> = a.nodes().iter().map(|n| n.pos).collect();
        let pos_b: Vec<Point2> = b.nodes().iter().map(|n| n.pos).collect();
        assert_eq!(pos_a, pos_b);
    }
}
