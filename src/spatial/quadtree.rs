//! Lazily split quad-tree over the unit square.
//!
//! Inserting never splits. A leaf is only partitioned the first time a tile
//! query needs to look below it, so zoom levels nobody visits cost nothing.

use crate::{
    core::{constants::MAX_QUERY_DEPTH, geo::tiles_per_row},
    spatial::overlay::{Overlay, OverlayId},
};

#[derive(Debug, Clone)]
enum Node {
    Leaf(Vec<OverlayId>),
    Branch(Box<[Node; 4]>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Leaf(Vec::new())
    }
}

impl Node {
    /// Partition `items` of the square at `(left, top)` into four leaves.
    fn split(items: Vec<OverlayId>, overlays: &[Overlay], left: f64, top: f64, size: f64) -> Node {
        let mut children: [Node; 4] = Default::default();
        for id in items {
            let quadrant = overlays[id.0].quadrant(left, top, size);
            if let Node::Leaf(leaf) = &mut children[quadrant] {
                leaf.push(id);
            }
        }
        Node::Branch(Box::new(children))
    }

    fn collect(&self, out: &mut Vec<OverlayId>) {
        match self {
            Node::Leaf(items) => out.extend_from_slice(items),
            Node::Branch(children) => children.iter().for_each(|child| child.collect(out)),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Branch(children) => 1 + children.iter().map(Node::depth).max().unwrap_or(0),
        }
    }
}

/// Overlay collection with per-tile lookup.
#[derive(Debug, Clone, Default)]
pub struct OverlayQuadTree {
    /// Every overlay in insertion order; ids index into this.
    overlays: Vec<Overlay>,
    root: Node,
}

impl OverlayQuadTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an overlay. It lands in the first leaf on its path.
    pub fn insert(&mut self, overlay: Overlay) -> OverlayId {
        let id = OverlayId(self.overlays.len());

        let (mut left, mut top, mut size) = (0.0, 0.0, 1.0);
        let mut node = &mut self.root;
        while let Node::Branch(children) = node {
            let quadrant = overlay.quadrant(left, top, size);
            size /= 2.0;
            left += (quadrant & 1) as f64 * size;
            top += (quadrant >> 1) as f64 * size;
            node = &mut children[quadrant];
        }
        if let Node::Leaf(items) = node {
            items.push(id);
        }

        self.overlays.push(overlay);
        id
    }

    pub fn extend<I: IntoIterator<Item = Overlay>>(&mut self, overlays: I) {
        for overlay in overlays {
            self.insert(overlay);
        }
    }

    /// Overlays on tile `(x, y)` of zoom level `zoom`.
    ///
    /// Out of range tiles and negative zoom levels have no overlays.
    pub fn query(&mut self, x: i64, y: i64, zoom: i32) -> Vec<(OverlayId, &Overlay)> {
        let ids = self.query_ids(x, y, zoom);
        ids.into_iter().map(|id| (id, &self.overlays[id.0])).collect()
    }

    fn query_ids(&mut self, x: i64, y: i64, zoom: i32) -> Vec<OverlayId> {
        if zoom < 0 || zoom as u32 > MAX_QUERY_DEPTH {
            return Vec::new();
        }
        let count = match tiles_per_row(zoom) {
            Some(count) => count,
            None => return Vec::new(),
        };
        if !(0..count).contains(&x) || !(0..count).contains(&y) {
            return Vec::new();
        }

        let overlays = &self.overlays;
        let mut node = &mut self.root;
        for level in 0..zoom {
            if let Node::Leaf(items) = node {
                if items.is_empty() {
                    return Vec::new();
                }
                let cells = (1_i64 << level) as f64;
                let size = 1.0 / cells;
                let left = (x >> (zoom - level)) as f64 / cells;
                let top = (y >> (zoom - level)) as f64 / cells;
                let items = std::mem::take(items);
                *node = Node::split(items, overlays, left, top, size);
            }

            let shift = zoom - level - 1;
            let quadrant = (((x >> shift) & 1) | (((y >> shift) & 1) << 1)) as usize;
            node = match node {
                Node::Branch(children) => &mut children[quadrant],
                Node::Leaf(_) => return Vec::new(),
            };
        }

        let mut found = Vec::new();
        node.collect(&mut found);
        found
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(id.0)
    }

    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> {
        self.overlays.iter().enumerate().map(|(i, o)| (OverlayId(i), o))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// How many levels have been split so far.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Drop every overlay and reset to a single empty leaf.
    pub fn clear(&mut self) {
        self.overlays.clear();
        self.root = Node::default();
    }
}
