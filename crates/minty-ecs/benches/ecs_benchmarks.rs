//! Registry throughput benchmarks.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use minty_ecs::prelude::*;
use minty_serialize::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Position {
    x: f32,
    y: f32,
}

impl Serializable for Position {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("x", &self.x);
        writer.write("y", &self.y);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("x", &mut self.x);
        reader.try_read("y", &mut self.y);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct Velocity {
    dx: f32,
    dy: f32,
}

impl Serializable for Velocity {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("dx", &self.dx);
        writer.write("dy", &self.dy);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("dx", &mut self.dx);
        reader.try_read("dy", &mut self.dy);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Every entity gets a Position; every other entity also gets a Velocity.
fn populated(count: usize) -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry.register_component::<Position>("Position");
    registry.register_component::<Velocity>("Velocity");
    for i in 0..count {
        let e = registry.create();
        registry
            .add(e, Position { x: i as f32, y: 0.0 })
            .unwrap();
        if i % 2 == 0 {
            registry.add(e, Velocity { dx: 1.0, dy: 0.5 }).unwrap();
        }
    }
    registry
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("view");
    for count in [1_000usize, 10_000] {
        let registry = populated(count);
        group.bench_with_input(BenchmarkId::new("pair", count), &registry, |b, registry| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for (_, (pos, vel)) in registry.view::<(&Position, &Velocity)>() {
                    sum += pos.x * vel.dx;
                }
                black_box(sum)
            });
        });

        let mut registry = populated(count);
        group.bench_function(BenchmarkId::new("integrate", count), |b| {
            b.iter(|| {
                for (_, pos, vel) in registry.view_mut_with::<Position, Velocity>() {
                    pos.x += vel.dx;
                    pos.y += vel.dy;
                }
            });
        });
    }
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    c.bench_function("create_destroy_1000", |b| {
        let mut registry = populated(0);
        b.iter(|| {
            let entities: Vec<Entity> = (0..1_000).map(|_| registry.create()).collect();
            for &e in &entities {
                registry.add(e, Position::default()).unwrap();
                registry.queue_destroy(e).unwrap();
            }
            black_box(registry.destroy_queued())
        });
    });
}

fn bench_serialize(c: &mut Criterion) {
    let registry = populated(1_000);
    c.bench_function("serialize_1000_to_text", |b| {
        b.iter(|| black_box(to_node("Scene", &registry).to_text()));
    });

    let text = to_node("Scene", &registry).to_text();
    c.bench_function("load_1000_from_text", |b| {
        b.iter(|| {
            let node = Node::parse_text(&text).unwrap();
            let mut restored = registry.empty_like();
            black_box(restored.load_entities(&Reader::new(&node)).unwrap())
        });
    });
}

criterion_group!(benches, bench_view, bench_churn, bench_serialize);
criterion_main!(benches);
