mod model;

pub use model::{
    Database, EntityRef, Member, Node, NodeId, Relation, RelationId, Role, Tags, Way, WayId,
};

use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, JsonObject, JsonValue, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Load a GeoJSON file into a fresh database
pub fn load_geojson(path: &Path) -> Result<Database> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing GeoJSON in {}", path.display()))?;

    let mut builder = GeoJsonBuilder::default();
    builder.add_geojson(&geojson);
    let db = builder.finish();
    debug!(
        path = %path.display(),
        nodes = db.node_count(),
        ways = db.way_count(),
        "loaded GeoJSON"
    );
    Ok(db)
}

/// Converts GeoJSON features into nodes, ways and multipolygon relations.
///
/// Line and ring vertices at identical coordinates share one node, so
/// ways that meet at a vertex are connected in the relationship graph.
#[derive(Default)]
pub struct GeoJsonBuilder {
    db: Database,
    vertex_nodes: HashMap<(u64, u64), NodeId>,
    next_node: u64,
    next_way: u64,
    next_relation: u64,
}

impl GeoJsonBuilder {
    pub fn add_geojson(&mut self, geojson: &GeoJson) {
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in &fc.features {
                    if let Some(ref geometry) = feature.geometry {
                        let tags = properties_to_tags(feature.properties.as_ref());
                        self.add_geometry(geometry, &tags);
                    }
                }
            }
            GeoJson::Feature(f) => {
                if let Some(ref geometry) = f.geometry {
                    let tags = properties_to_tags(f.properties.as_ref());
                    self.add_geometry(geometry, &tags);
                }
            }
            GeoJson::Geometry(geometry) => {
                self.add_geometry(geometry, &Tags::new());
            }
        }
    }

    pub fn finish(self) -> Database {
        self.db
    }

    fn add_geometry(&mut self, geometry: &Geometry, tags: &Tags) {
        match &geometry.value {
            Value::Point(coords) => self.add_point(coords, tags),
            Value::MultiPoint(points) => {
                for coords in points {
                    self.add_point(coords, tags);
                }
            }
            Value::LineString(coords) => {
                self.add_line(coords, tags.clone());
            }
            Value::MultiLineString(lines) => {
                for coords in lines {
                    self.add_line(coords, tags.clone());
                }
            }
            Value::Polygon(rings) => self.add_polygon(rings, tags),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.add_polygon(rings, tags);
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.add_geometry(g, tags);
                }
            }
        }
    }

    fn add_point(&mut self, coords: &[f64], tags: &Tags) {
        if coords.len() < 2 {
            warn!("skipping point with fewer than two coordinates");
            return;
        }
        let id = self.fresh_node_id();
        self.db.add_node(Node {
            id,
            lon: coords[0],
            lat: coords[1],
            tags: tags.clone(),
        });
    }

    fn add_line(&mut self, coords: &[Vec<f64>], tags: Tags) -> Option<WayId> {
        let nodes: Vec<NodeId> = coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| self.vertex(c[0], c[1]))
            .collect();
        if nodes.len() < 2 {
            warn!(vertices = nodes.len(), "skipping degenerate line");
            return None;
        }
        self.next_way += 1;
        let id = WayId(self.next_way);
        self.db.add_way(Way { id, nodes, tags });
        Some(id)
    }

    /// Outer ring carries the feature tags. Holes become inner ways of a
    /// multipolygon relation with the outer ring.
    fn add_polygon(&mut self, rings: &[Vec<Vec<f64>>], tags: &Tags) {
        let Some((exterior, holes)) = rings.split_first() else {
            return;
        };
        let Some(outer) = self.add_line(exterior, tags.clone()) else {
            return;
        };
        if holes.is_empty() {
            return;
        }

        let mut members = vec![Member {
            entity: EntityRef::Way(outer),
            role: Role::Outer,
        }];
        for hole in holes {
            if let Some(inner) = self.add_line(hole, Tags::new()) {
                members.push(Member {
                    entity: EntityRef::Way(inner),
                    role: Role::Inner,
                });
            }
        }

        self.next_relation += 1;
        let mut relation_tags = Tags::new();
        relation_tags.insert("type".to_string(), "multipolygon".to_string());
        self.db.add_relation(Relation {
            id: RelationId(self.next_relation),
            tags: relation_tags,
            members,
        });
    }

    fn vertex(&mut self, lon: f64, lat: f64) -> NodeId {
        let key = (lon.to_bits(), lat.to_bits());
        if let Some(&id) = self.vertex_nodes.get(&key) {
            return id;
        }
        let id = self.fresh_node_id();
        self.db.add_node(Node {
            id,
            lon,
            lat,
            tags: Tags::new(),
        });
        self.vertex_nodes.insert(key, id);
        id
    }

    fn fresh_node_id(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }
}

/// Flatten feature properties into string tags
fn properties_to_tags(props: Option<&JsonObject>) -> Tags {
    let mut tags = Tags::new();
    for (key, value) in props.into_iter().flatten() {
        let text = match value {
            JsonValue::Null => continue,
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        tags.insert(key.clone(), text);
    }
    tags
}
