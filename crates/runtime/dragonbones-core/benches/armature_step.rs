//! Per-tick cost of advancing armatures, live and with cache frames.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dragonbones_core::{
    AnimationFadeOutMode, DataParser, Factory, JsonDataParser, RuntimeConfig,
};
use dragonbones_test_fixtures::skeletons;

fn mk_factory(cache_frame_rate: f32) -> Factory {
    let config = RuntimeConfig {
        default_cache_frame_rate: cache_frame_rate,
        ..RuntimeConfig::default()
    };
    let mut factory = Factory::with_config(JsonDataParser::new(), config);
    let raw = skeletons::json("hero").expect("hero fixture");
    factory
        .parse_dragonbones_data(&raw, None, 1.0)
        .expect("hero parses");
    factory
}

fn bench_parse(c: &mut Criterion) {
    let raw = skeletons::json("hero").expect("hero fixture");
    let parser = JsonDataParser::new();
    c.bench_function("parse_hero", |b| {
        b.iter(|| parser.parse_dragonbones_data(black_box(&raw), 1.0))
    });
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("armature_step");
    for (label, rate) in [("live", 0.0), ("cached", 30.0)] {
        let mut factory = mk_factory(rate);
        let mut hero = factory
            .build_armature("hero", None, None, None)
            .expect("hero builds");
        hero.animation_mut().play(Some("walk"), 0);
        group.bench_with_input(BenchmarkId::from_parameter(label), &rate, |b, _| {
            b.iter(|| hero.advance_time(black_box(1.0 / 60.0)))
        });
    }
    group.finish();
}

fn bench_cross_fade(c: &mut Criterion) {
    let mut factory = mk_factory(0.0);
    let mut hero = factory
        .build_armature("hero", None, None, None)
        .expect("hero builds");
    let mut flip = false;
    c.bench_function("cross_fade", |b| {
        b.iter(|| {
            flip = !flip;
            let name = if flip { "walk" } else { "idle" };
            hero.animation_mut()
                .fade_in(name, 0.2, 0, 0, None, AnimationFadeOutMode::SameLayer);
            hero.advance_time(black_box(1.0 / 60.0));
        })
    });
}

criterion_group!(benches, bench_parse, bench_advance, bench_cross_fade);
criterion_main!(benches);
