use std::collections::{BTreeMap, HashMap};

use tracing::warn;

/// Entity tag mapping. Ordered so rendering stays deterministic.
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lon: f64,
    pub lat: f64,
    pub tags: Tags,
}

/// Tags that never make a node worth drawing on its own
const UNINTERESTING_TAGS: [&str; 5] = ["created_by", "source", "attribution", "fixme", "note"];

impl Node {
    /// Does the node carry any tag beyond editing metadata?
    pub fn has_interesting_tags(&self) -> bool {
        self.tags
            .keys()
            .any(|k| !UNINTERESTING_TAGS.contains(&k.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub tags: Tags,
}

impl Way {
    /// A way is closed when it returns to its first node
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Way(WayId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Outer,
    Inner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub entity: EntityRef,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    pub tags: Tags,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(String::as_str) == Some("multipolygon")
    }
}

/// In-memory geographic database with read-only relationship queries.
///
/// Relationship indices are maintained on insertion, so lookups during
/// rendering never scan the full entity set.
#[derive(Debug, Default)]
pub struct Database {
    nodes: BTreeMap<NodeId, Node>,
    ways: BTreeMap<WayId, Way>,
    relations: BTreeMap<RelationId, Relation>,
    /// node -> ways that reference it (once per way)
    parent_ways: HashMap<NodeId, Vec<WayId>>,
    /// way -> (relation, role) memberships
    memberships: HashMap<WayId, Vec<(RelationId, Role)>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_way(&mut self, way: Way) {
        for &node in &way.nodes {
            let parents = self.parent_ways.entry(node).or_default();
            if !parents.contains(&way.id) {
                parents.push(way.id);
            }
        }
        self.ways.insert(way.id, way);
    }

    pub fn add_relation(&mut self, relation: Relation) {
        for member in &relation.members {
            if let EntityRef::Way(way) = member.entity {
                self.memberships
                    .entry(way)
                    .or_default()
                    .push((relation.id, member.role.clone()));
            }
        }
        self.relations.insert(relation.id, relation);
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[inline]
    pub fn way(&self, id: WayId) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.ways.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn has_parent_ways(&self, node: NodeId) -> bool {
        self.parent_way_count(node) > 0
    }

    pub fn parent_way_count(&self, node: NodeId) -> usize {
        self.parent_ways.get(&node).map_or(0, Vec::len)
    }

    /// Is the way a member of any multipolygon relation with the given role?
    pub fn is_multipolygon_member(&self, way: WayId, role: &Role) -> bool {
        self.multipolygons_of(way, role).next().is_some()
    }

    /// Inner ways of every multipolygon in which `way` is an outer member
    pub fn inner_ways_of(&self, way: WayId) -> Vec<WayId> {
        let mut inners = Vec::new();
        for relation in self.multipolygons_of(way, &Role::Outer) {
            for member in &relation.members {
                if let (EntityRef::Way(inner), Role::Inner) = (member.entity, &member.role) {
                    if self.ways.contains_key(&inner) && !inners.contains(&inner) {
                        inners.push(inner);
                    }
                }
            }
        }
        inners
    }

    /// Resolved (lon, lat) coordinates of a way, skipping unknown nodes
    pub fn way_coords(&self, way: &Way) -> Vec<(f64, f64)> {
        way.nodes
            .iter()
            .filter_map(|id| match self.nodes.get(id) {
                Some(n) => Some((n.lon, n.lat)),
                None => {
                    warn!(way = way.id.0, node = id.0, "way references unknown node");
                    None
                }
            })
            .collect()
    }

    fn multipolygons_of<'a>(
        &'a self,
        way: WayId,
        role: &'a Role,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.memberships
            .get(&way)
            .into_iter()
            .flatten()
            .filter(move |(_, r)| r == role)
            .filter_map(move |(rel, _)| self.relations.get(rel))
            .filter(|rel| rel.is_multipolygon())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, lon: f64, lat: f64) -> Node {
        Node {
            id: NodeId(id),
            lon,
            lat,
            tags: Tags::new(),
        }
    }

    fn way(id: u64, nodes: &[u64]) -> Way {
        Way {
            id: WayId(id),
            nodes: nodes.iter().copied().map(NodeId).collect(),
            tags: Tags::new(),
        }
    }

    #[test]
    fn test_closed_way() {
        assert!(way(1, &[1, 2, 3, 1]).is_closed());
        assert!(!way(1, &[1, 2, 3]).is_closed());
        assert!(!way(1, &[1, 1]).is_closed());
    }

    #[test]
    fn test_interesting_tags() {
        let mut n = node(1, 0.0, 0.0);
        assert!(!n.has_interesting_tags());
        n.tags.insert("source".into(), "survey".into());
        n.tags.insert("created_by".into(), "JOSM".into());
        assert!(!n.has_interesting_tags());
        n.tags.insert("highway".into(), "crossing".into());
        assert!(n.has_interesting_tags());
    }

    #[test]
    fn test_parent_way_counts() {
        let mut db = Database::new();
        for i in 1..=4 {
            db.add_node(node(i, i as f64, 0.0));
        }
        db.add_way(way(10, &[1, 2]));
        db.add_way(way(11, &[2, 3]));
        assert_eq!(db.parent_way_count(NodeId(2)), 2);
        assert_eq!(db.parent_way_count(NodeId(1)), 1);
        assert!(!db.has_parent_ways(NodeId(4)));
    }

    #[test]
    fn test_way_coords_skip_unknown_nodes() {
        let mut db = Database::new();
        db.add_node(node(1, 0.5, 1.0));
        db.add_node(node(3, 2.5, 3.0));
        let w = way(10, &[1, 2, 3]);
        assert_eq!(db.way_coords(&w), vec![(0.5, 1.0), (2.5, 3.0)]);
    }

    #[test]
    fn test_closed_way_counts_once_per_node() {
        let mut db = Database::new();
        db.add_way(way(10, &[1, 2, 3, 1]));
        assert_eq!(db.parent_way_count(NodeId(1)), 1);
    }

    #[test]
    fn test_multipolygon_membership() {
        let mut db = Database::new();
        db.add_way(way(1, &[1, 2, 3, 1]));
        db.add_way(way(2, &[4, 5, 6, 4]));
        let mut tags = Tags::new();
        tags.insert("type".into(), "multipolygon".into());
        db.add_relation(Relation {
            id: RelationId(100),
            tags,
            members: vec![
                Member {
                    entity: EntityRef::Way(WayId(1)),
                    role: Role::Outer,
                },
                Member {
                    entity: EntityRef::Way(WayId(2)),
                    role: Role::Inner,
                },
                Member {
                    entity: EntityRef::Node(NodeId(1)),
                    role: Role::Inner,
                },
            ],
        });

        assert!(db.is_multipolygon_member(WayId(2), &Role::Inner));
        assert!(!db.is_multipolygon_member(WayId(1), &Role::Inner));
        assert_eq!(db.inner_ways_of(WayId(1)), vec![WayId(2)]);
        assert!(db.inner_ways_of(WayId(2)).is_empty());
    }

    #[test]
    fn test_non_multipolygon_relation_ignored() {
        let mut db = Database::new();
        db.add_way(way(1, &[1, 2, 3, 1]));
        db.add_way(way(2, &[4, 5, 6, 4]));
        db.add_relation(Relation {
            id: RelationId(1),
            tags: Tags::new(),
            members: vec![
                Member {
                    entity: EntityRef::Way(WayId(1)),
                    role: Role::Outer,
                },
                Member {
                    entity: EntityRef::Way(WayId(2)),
                    role: Role::Inner,
                },
            ],
        });
        assert!(db.inner_ways_of(WayId(1)).is_empty());
    }
}
