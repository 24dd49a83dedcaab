use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use glam::DVec2;
use map_press::config::{JobConfig, PageSetup};
use map_press::data::{Database, Node, NodeId, Tags, Way, WayId};
use map_press::geo::GeoBounds;
use map_press::map::{offset_curve, MapRenderer, PathProperties, QuadTree, Region};
use map_press::style::RuleSet;
use map_press::surface::RecordingSurface;

const STYLE: &str = r#"{"rules":[
    {"selector":"canvas","properties":{"fill_color":15658734}},
    {"selector":"way","conditions":{"highway":"*"},
     "properties":{"width":2,"color":8421504,"casing_width":1}},
    {"selector":"way","conditions":{"highway":"*","name":"*"},"kind":"text",
     "properties":{"text":"name","font_size":7}},
    {"selector":"area","conditions":{"building":"*"},"properties":{"fill_color":13421772}}
]}"#;

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `n` x `n` street grid over the unit square with a building in each block
fn gen_city(n: usize) -> Database {
    let mut db = Database::new();
    let mut next = 0u64;
    let mut node = |db: &mut Database, lon: f64, lat: f64| {
        next += 1;
        db.add_node(Node {
            id: NodeId(next),
            lon,
            lat,
            tags: Tags::new(),
        });
        NodeId(next)
    };
    let step = 1.0 / n as f64;
    let mut way_id = 0u64;

    for i in 0..=n {
        let c = i as f64 * step;
        for horizontal in [true, false] {
            let nodes = (0..=n)
                .map(|j| {
                    let d = j as f64 * step;
                    if horizontal {
                        node(&mut db, d, c)
                    } else {
                        node(&mut db, c, d)
                    }
                })
                .collect();
            way_id += 1;
            let name = format!("Street {way_id}");
            db.add_way(Way {
                id: WayId(way_id),
                nodes,
                tags: tags(&[("highway", "residential"), ("name", &name)]),
            });
        }
    }
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f64 * step + step * 0.2, j as f64 * step + step * 0.2);
            let s = step * 0.6;
            let mut ring: Vec<NodeId> = [(x, y), (x + s, y), (x + s, y + s), (x, y + s)]
                .iter()
                .map(|&(lon, lat)| node(&mut db, lon, lat))
                .collect();
            ring.push(ring[0]);
            way_id += 1;
            db.add_way(Way {
                id: WayId(way_id),
                nodes: ring,
                tags: tags(&[("building", "yes")]),
            });
        }
    }
    db
}

fn gen_polyline(n: usize) -> Vec<DVec2> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.1;
            DVec2::new(t * 10.0, t.sin() * 20.0)
        })
        .collect()
}

fn bench_quadtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree");
    let region = Region::new(DVec2::new(0.0, 1000.0), DVec2::new(1000.0, 0.0));
    for n in [1_000usize, 10_000] {
        let points: Vec<DVec2> = (0..n)
            .map(|i| {
                let h = (i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                DVec2::new((h % 1000) as f64, ((h >> 20) % 1000) as f64)
            })
            .collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("insert_n{n}"), |b| {
            b.iter_batched(
                || QuadTree::new(region),
                |mut tree| {
                    for (i, &p) in points.iter().enumerate() {
                        let _ = tree.insert(p, i);
                    }
                    tree
                },
                BatchSize::SmallInput,
            )
        });

        let mut tree = QuadTree::new(region);
        for (i, &p) in points.iter().enumerate() {
            let _ = tree.insert(p, i);
        }
        group.bench_function(format!("query_n{n}"), |b| {
            b.iter(|| {
                tree.query_region(black_box(DVec2::new(400.0, 600.0)), DVec2::new(450.0, 550.0))
                    .len()
            })
        });
    }
    group.finish();
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    let path = gen_polyline(2_000);
    group.bench_function("path_properties", |b| {
        b.iter(|| PathProperties::compute(black_box(&path), false))
    });
    group.bench_function("offset_curve", |b| {
        b.iter(|| offset_curve(black_box(&path), 3.0, false))
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let mut bytes = STYLE.as_bytes().to_vec();
    let styles = RuleSet::from_json(&mut bytes).expect("style parses");
    let job = JobConfig::new(GeoBounds::new(0.0, 0.0, 1.0, 1.0), PageSetup::default());

    for n in [10usize, 30] {
        let db = gen_city(n);
        group.bench_function(format!("page_grid_n{n}"), |b| {
            let renderer = MapRenderer::new(&db, &styles);
            b.iter(|| {
                let mut surface = RecordingSurface::new();
                renderer.render(&job, &mut surface).map(|s| s.items)
            })
        });
    }

    let db = gen_city(30);
    group.bench_function("atlas_2x2_n30", |b| {
        let renderer = MapRenderer::new(&db, &styles);
        b.iter(|| renderer.render_atlas(&job, 2, 2).map(|pages| pages.len()))
    });
    group.finish();
}

criterion_group!(benches, bench_quadtree, bench_geometry, bench_render);
criterion_main!(benches);
