use glam::DVec2;
use std::collections::VecDeque;

use crate::error::SpatialError;

/// Axis-aligned region of page space. `tl.y >= br.y` (y-up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub tl: DVec2,
    pub br: DVec2,
}

impl Region {
    pub fn new(tl: DVec2, br: DVec2) -> Self {
        Self { tl, br }
    }

    /// Inclusive containment
    #[inline(always)]
    pub fn contains(&self, p: DVec2) -> bool {
        self.tl.x <= p.x && self.br.x >= p.x && self.tl.y >= p.y && self.br.y <= p.y
    }

    #[inline(always)]
    pub fn intersects(&self, other: &Region) -> bool {
        self.tl.x <= other.br.x
            && other.tl.x <= self.br.x
            && self.br.y <= other.tl.y
            && other.br.y <= self.tl.y
    }

    #[inline(always)]
    fn mid(&self) -> DVec2 {
        DVec2::new(
            self.tl.x + (self.br.x - self.tl.x) / 2.0,
            self.br.y + (self.tl.y - self.br.y) / 2.0,
        )
    }

    /// Quadrant `q` in TL, TR, BL, BR order
    fn quadrant(&self, q: usize) -> Region {
        let m = self.mid();
        match q {
            0 => Region::new(self.tl, m),
            1 => Region::new(DVec2::new(m.x, self.tl.y), DVec2::new(self.br.x, m.y)),
            2 => Region::new(DVec2::new(self.tl.x, m.y), DVec2::new(m.x, self.br.y)),
            _ => Region::new(m, self.br),
        }
    }

    /// Can this region still be bisected at f64 resolution?
    fn splittable(&self) -> bool {
        let m = self.mid();
        m.x > self.tl.x && m.x < self.br.x && m.y > self.br.y && m.y < self.tl.y
    }
}

/// A keyed point and its data
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<T> {
    pub point: DVec2,
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeIndex(usize);

#[derive(Debug)]
enum NodeContent<T> {
    /// Payloads stored directly; all share one coordinate
    Leaf(Vec<Payload<T>>),
    /// Pure router; children are created on first need
    Internal([Option<NodeIndex>; 4]),
}

#[derive(Debug)]
struct QuadNode<T> {
    region: Region,
    depth: usize,
    content: NodeContent<T>,
}

/// Point-keyed quadtree over page coordinates.
///
/// Nodes live in an arena and refer to their children by index. A node
/// holds payloads only while they all share one coordinate; the first
/// distinct point splits it into a router and pushes everything down.
#[derive(Debug)]
pub struct QuadTree<T> {
    nodes: Vec<QuadNode<T>>,
    len: usize,
    sum: DVec2,
}

impl<T> QuadTree<T> {
    pub fn new(region: Region) -> Self {
        Self {
            nodes: vec![QuadNode {
                region,
                depth: 1,
                content: NodeContent::Leaf(Vec::new()),
            }],
            len: 0,
            sum: DVec2::ZERO,
        }
    }

    pub fn region(&self) -> Region {
        self.nodes[0].region
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deepest node currently holding payloads
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(&n.content, NodeContent::Leaf(b) if !b.is_empty()))
            .map(|n| n.depth)
            .max()
            .unwrap_or(0)
    }

    /// Mean position of all payloads
    pub fn center_of_mass(&self) -> Option<DVec2> {
        (self.len > 0).then(|| self.sum / self.len as f64)
    }

    pub fn insert(&mut self, point: DVec2, data: T) -> Result<(), SpatialError> {
        if !point.is_finite() {
            return Err(SpatialError::NonFinite);
        }
        if !self.nodes[0].region.contains(point) {
            return Err(SpatialError::OutOfBounds {
                x: point.x,
                y: point.y,
            });
        }

        let mut idx = NodeIndex(0);
        let payload = Payload { point, data };
        loop {
            let node = &mut self.nodes[idx.0];
            if let NodeContent::Leaf(bucket) = &mut node.content {
                let colocated = bucket.first().map_or(true, |p| p.point == point);
                if colocated || !node.region.splittable() {
                    bucket.push(payload);
                    break;
                }
                // Distinct point: become a router and move the existing
                // co-located bucket down into its quadrant
                let old = std::mem::take(bucket);
                node.content = NodeContent::Internal([None; 4]);
                let child = self.child_for(idx, old[0].point);
                self.nodes[child.0].content = NodeContent::Leaf(old);
            }
            idx = self.child_for(idx, point);
        }

        self.len += 1;
        self.sum += point;
        Ok(())
    }

    /// Every payload whose point lies inside the rectangle
    pub fn query_region(&self, tl: DVec2, br: DVec2) -> Vec<&Payload<T>> {
        self.payloads_in_region(Region::new(tl, br)).collect()
    }

    /// Breadth-first traversal of all payloads
    pub fn payloads(&self) -> Payloads<'_, T> {
        Payloads::new(self, None)
    }

    /// Breadth-first traversal restricted to a region
    pub fn payloads_in_region(&self, region: Region) -> Payloads<'_, T> {
        Payloads::new(self, Some(region))
    }

    /// Bulk query with an optional result cap and payload filter
    pub fn contained<P>(&self, max_count: Option<usize>, mut keep: P) -> Vec<&Payload<T>>
    where
        P: FnMut(&Payload<T>) -> bool,
    {
        self.payloads()
            .filter(|p| keep(p))
            .take(max_count.unwrap_or(usize::MAX))
            .collect()
    }

    /// Child of a router node containing `point`, created on demand.
    /// Quadrants are tested in TL, TR, BL, BR order.
    fn child_for(&mut self, parent: NodeIndex, point: DVec2) -> NodeIndex {
        let region = self.nodes[parent.0].region;
        let depth = self.nodes[parent.0].depth;
        let q = (0..4)
            .find(|&q| region.quadrant(q).contains(point))
            .unwrap_or(3);

        if let NodeContent::Internal(children) = &self.nodes[parent.0].content {
            if let Some(child) = children[q] {
                return child;
            }
        }

        let child = NodeIndex(self.nodes.len());
        self.nodes.push(QuadNode {
            region: region.quadrant(q),
            depth: depth + 1,
            content: NodeContent::Leaf(Vec::new()),
        });
        if let NodeContent::Internal(children) = &mut self.nodes[parent.0].content {
            children[q] = Some(child);
        }
        child
    }
}

/// Lazy breadth-first payload iterator. Cloning restarts from the same
/// position.
#[derive(Debug)]
pub struct Payloads<'a, T> {
    tree: &'a QuadTree<T>,
    region: Option<Region>,
    queue: VecDeque<NodeIndex>,
    bucket: std::slice::Iter<'a, Payload<T>>,
}

impl<'a, T> Clone for Payloads<'a, T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            region: self.region,
            queue: self.queue.clone(),
            bucket: self.bucket.clone(),
        }
    }
}

impl<'a, T> Payloads<'a, T> {
    fn new(tree: &'a QuadTree<T>, region: Option<Region>) -> Self {
        let mut queue = VecDeque::new();
        let root = &tree.nodes[0];
        if region.map_or(true, |r| r.intersects(&root.region)) {
            queue.push_back(NodeIndex(0));
        }
        Self {
            tree,
            region,
            queue,
            bucket: Default::default(),
        }
    }
}

impl<'a, T> Iterator for Payloads<'a, T> {
    type Item = &'a Payload<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for payload in self.bucket.by_ref() {
                if self.region.map_or(true, |r| r.contains(payload.point)) {
                    return Some(payload);
                }
            }

            let idx = self.queue.pop_front()?;
            match &self.tree.nodes[idx.0].content {
                NodeContent::Leaf(bucket) => self.bucket = bucket.iter(),
                NodeContent::Internal(children) => {
                    for child in children.iter().flatten() {
                        let region = &self.tree.nodes[child.0].region;
                        if self.region.map_or(true, |r| r.intersects(region)) {
                            self.queue.push_back(*child);
                        }
                    }
                }
            }
        }
    }
}
