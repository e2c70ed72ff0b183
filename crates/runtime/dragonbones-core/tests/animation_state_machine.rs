use dragonbones_core::{AnimationConfig, AnimationFadeOutMode, Armature, Factory};
use dragonbones_test_fixtures::skeletons;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn mk_factory() -> Factory {
    let mut factory: Factory = Factory::default();
    let raw = skeletons::json("hero").expect("hero fixture");
    factory
        .parse_dragonbones_data(&raw, None, 1.0)
        .expect("hero parses");
    factory
}

fn mk_hero(factory: &mut Factory) -> Armature {
    factory
        .build_armature("hero", None, None, None)
        .expect("hero builds")
}

/// it should start the default action right after building
#[test]
fn build_runs_default_actions() {
    let mut factory = mk_factory();
    let hero = mk_hero(&mut factory);
    assert_eq!(hero.animation().last_animation_name(), Some("idle"));
    assert_eq!(hero.animation().state_ids().len(), 1);
}

/// it should blend the walk translation into the body bone
#[test]
fn play_samples_bone_timelines() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    hero.animation_mut().play(Some("walk"), -1);
    hero.advance_time(0.5);

    let body = hero.get_bone("body").unwrap();
    assert!(approx(body.global().x, 15.0, 1e-3), "x = {}", body.global().x);
    assert!(approx(body.global().y, -50.0, 1e-3));
    // idle faded out with a zero fade time and is gone
    assert_eq!(hero.animation().state_ids().len(), 1);
    assert_eq!(hero.animation().last_animation_name(), Some("walk"));
}

/// it should complete after the configured number of loops and stay on the last frame
#[test]
fn play_times_complete_the_state() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let id = hero.animation_mut().play(Some("walk"), -1).unwrap();
    hero.advance_time(1.5);
    {
        let state = hero.animation().state(id).unwrap();
        assert_eq!(state.play_times, 2);
        assert_eq!(state.current_play_times(), 1);
        assert!(state.is_playing());
    }
    hero.advance_time(1.0);
    let state = hero.animation().state(id).unwrap();
    assert!(state.is_completed());
    assert!(!state.is_playing());
    assert!(hero.animation().is_completed());
    let body = hero.get_bone("body").unwrap();
    assert!(approx(body.global().x, 30.0, 1e-2));
}

/// it should honor an explicit play count over the animation's own
#[test]
fn explicit_play_times_override() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let id = hero.animation_mut().play(Some("idle"), 1).unwrap();
    hero.advance_time(1.2);
    assert!(hero.animation().state(id).unwrap().is_completed());
}

/// it should return None and keep the current state for an unknown animation
#[test]
fn unknown_animation_is_ignored() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    assert!(hero.animation_mut().play(Some("fly"), -1).is_none());
    assert_eq!(hero.animation().last_animation_name(), Some("idle"));
}

/// it should seek by time, frame and progress
#[test]
fn goto_and_stop_positions_the_head() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);

    let id = hero.animation_mut().goto_and_stop_by_time("walk", 0.5).unwrap();
    hero.advance_time(0.25);
    let state = hero.animation().state(id).unwrap();
    assert!(!state.is_playing());
    assert!(approx(state.current_time(), 0.5, 1e-4));
    assert!(approx(hero.get_bone("body").unwrap().global().x, 15.0, 1e-3));

    let id = hero.animation_mut().goto_and_stop_by_frame("walk", 6).unwrap();
    hero.advance_time(0.1);
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.2, 1e-4));

    let id = hero
        .animation_mut()
        .goto_and_stop_by_progress("walk", 0.75)
        .unwrap();
    hero.advance_time(0.1);
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.75, 1e-4));
}

/// it should wrap negative and overshooting start positions into the animation
#[test]
fn start_position_wraps() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);

    let id = hero
        .animation_mut()
        .goto_and_play_by_time("walk", -0.25, -1)
        .unwrap();
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.75, 1e-4));

    let id = hero
        .animation_mut()
        .goto_and_play_by_time("walk", 1.25, -1)
        .unwrap();
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.25, 1e-4));
}

/// it should cross-fade: the outgoing state fades while the incoming one fades in
#[test]
fn fade_in_cross_fades_same_layer() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    hero.advance_time(0.1);

    let attack = hero
        .animation_mut()
        .fade_in("attack", 0.2, -1, 0, None, AnimationFadeOutMode::SameLayer)
        .unwrap();
    hero.advance_time(0.1);
    {
        let animation = hero.animation();
        assert_eq!(animation.state_ids().len(), 2);
        let state = animation.state(attack).unwrap();
        assert!(state.is_fade_in());
        assert!(approx(state.fade_progress(), 0.5, 1e-3));
        let idle = animation.get_state("idle", -1).unwrap();
        assert!(animation.state(idle).unwrap().is_fade_out());
    }

    hero.advance_time(0.15);
    let animation = hero.animation();
    assert_eq!(animation.state_ids().len(), 1);
    assert!(animation.state(attack).unwrap().is_fade_complete());
    assert!(animation.get_state("idle", -1).is_none());
}

/// it should keep states on other layers and order them highest layer first
#[test]
fn layers_are_independent() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let upper = hero
        .animation_mut()
        .fade_in("attack", 0.0, 0, 1, None, AnimationFadeOutMode::SameLayer)
        .unwrap();
    hero.advance_time(0.1);

    let animation = hero.animation();
    assert_eq!(animation.state_ids().len(), 2);
    assert_eq!(animation.state_ids()[0], upper);
    assert!(animation.get_state("idle", 0).is_some());
    assert!(animation.get_state("idle", 1).is_none());
}

/// it should reuse a running state in single mode instead of stacking a new one
#[test]
fn single_mode_reuses_state() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let idle = hero.animation().get_state("idle", -1).unwrap();
    let again = hero
        .animation_mut()
        .fade_in("idle", 0.0, -1, 0, None, AnimationFadeOutMode::Single)
        .unwrap();
    assert_eq!(idle, again);
    assert_eq!(hero.animation().state_ids().len(), 1);
}

/// it should restrict a masked state to the listed bones
#[test]
fn bone_mask_limits_targets() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let armature = hero.armature_data().clone();
    let mut config = AnimationConfig::new("walk");
    config.fade_in_time = 0.0;
    config.add_bone_mask(&armature, "arm", true);
    hero.animation_mut().play_config(&config).unwrap();
    hero.advance_time(0.5);

    // the body translation is masked out; the arm swings
    assert!(approx(hero.get_bone("body").unwrap().global().x, 0.0, 1e-3));
    assert!(approx(
        hero.get_bone("arm").unwrap().animation_pose().rotation,
        20f32.to_radians(),
        1e-3
    ));
}

/// it should resume a stopped state on an unnamed play
#[test]
fn play_without_name_resumes() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let id = hero.animation_mut().play(Some("walk"), -1).unwrap();
    hero.advance_time(0.2);
    hero.animation_mut().stop(Some("walk"));
    assert!(!hero.animation().is_playing());
    hero.advance_time(0.2);
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.2, 1e-4));

    assert_eq!(hero.animation_mut().play(None, -1), Some(id));
    hero.advance_time(0.2);
    assert!(hero.animation().is_playing());
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.4, 1e-4));
}

/// it should scale time per armature and per state
#[test]
fn time_scale_multiplies() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let id = hero.animation_mut().play(Some("walk"), -1).unwrap();
    hero.animation_mut().time_scale = 0.5;
    hero.animation_mut().state_mut(id).unwrap().time_scale = 2.0;
    hero.advance_time(0.3);
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.3, 1e-4));
    assert!(approx(hero.animation().inherit_time_scale(), 0.5, 1e-6));
}

/// it should switch slot displays from display timelines
#[test]
fn display_timeline_switches_display() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    hero.animation_mut().play(Some("attack"), -1);
    hero.advance_time(0.1);
    assert_eq!(hero.get_slot("head").unwrap().display_index(), 0);
    assert_eq!(hero.get_slot("effect").unwrap().display_index(), -1);

    hero.advance_time(0.15);
    let head = hero.get_slot("head").unwrap();
    assert_eq!(head.display_index(), 1);
    assert_eq!(head.display().unwrap().name, "hero/head_alt");
    assert_eq!(hero.get_slot("effect").unwrap().display_index(), 0);
}

/// it should reorder slots from z-order keyframes and restore them afterwards
#[test]
fn z_order_timeline_reorders() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    assert_eq!(hero.draw_order(), &[0, 1, 2, 3, 4]);
    hero.animation_mut().play(Some("shuffle"), -1);
    hero.advance_time(0.1);
    assert_eq!(hero.draw_order(), &[1, 2, 0, 3, 4]);

    hero.animation_mut().play(Some("idle"), -1);
    hero.advance_time(0.1);
    assert_eq!(hero.draw_order(), &[0, 1, 2, 3, 4]);
}

/// it should fade out only the states of the same group
#[test]
fn same_group_fade_out() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    hero.animation_mut()
        .fade_in("attack", 0.3, 1, 0, Some("g1"), AnimationFadeOutMode::SameGroup)
        .unwrap();
    let walk = hero
        .animation_mut()
        .fade_in("walk", 0.3, 0, 0, Some("g1"), AnimationFadeOutMode::SameGroup)
        .unwrap();
    hero.advance_time(0.2);
    hero.advance_time(0.2);

    let animation = hero.animation();
    assert!(animation.get_state("attack", -1).is_none());
    assert!(animation.state(walk).is_some());
    // idle has no group and keeps playing underneath
    assert!(animation.get_state("idle", -1).is_some());
}

/// it should remove a state once an explicit fade-out has run its course
#[test]
fn fade_out_removes_state() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let idle = hero.animation().get_state("idle", -1).unwrap();
    hero.animation_mut()
        .state_mut(idle)
        .unwrap()
        .fade_out(0.2, true);
    hero.advance_time(0.1);
    assert!(hero.animation().state(idle).unwrap().is_fade_out());
    hero.advance_time(0.15);
    assert!(hero.animation().state(idle).is_none());
    assert!(hero.animation().state_ids().is_empty());
    assert!(!hero.animation().is_completed());
}

/// it should keep the state list sorted by layer, highest first
#[test]
fn states_stay_sorted_by_layer() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    for (name, layer) in [("walk", 2), ("attack", 5), ("shuffle", 1)] {
        hero.animation_mut()
            .fade_in(name, 0.1, -1, layer, None, AnimationFadeOutMode::SameLayer)
            .unwrap();
    }
    let animation = hero.animation();
    let layers: Vec<i32> = animation
        .state_ids()
        .iter()
        .map(|&id| animation.state(id).unwrap().layer)
        .collect();
    assert_eq!(layers, vec![5, 2, 1, 0]);
    assert!(layers.windows(2).all(|w| w[0] >= w[1]));
}

/// it should resume the same state on repeated unnamed plays
#[test]
fn repeated_unnamed_play_is_idempotent() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let idle = hero.animation().last_state().unwrap();
    assert_eq!(hero.animation_mut().play(None, -1), Some(idle));
    hero.advance_time(0.1);
    assert_eq!(hero.animation_mut().play(None, -1), Some(idle));
    assert_eq!(hero.animation().state_ids().len(), 1);
}

/// it should report the seeked frame time and stay stopped
#[test]
fn goto_and_stop_by_frame_round_trip() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let id = hero.animation_mut().goto_and_stop_by_frame("walk", 9).unwrap();
    let state = hero.animation().state(id).unwrap();
    let data = state.animation_data().unwrap();
    let expected = data.duration * 9.0 / data.frame_count as f32;
    assert!(approx(state.current_time(), expected, 1e-4));
    assert!(!state.is_playing());
}

/// it should fall back to a surviving state when the last played one fades away
#[test]
fn last_state_moves_to_survivor() {
    let mut factory = mk_factory();
    let mut hero = mk_hero(&mut factory);
    let walk = hero.animation_mut().play(Some("walk"), -1).unwrap();
    hero.advance_time(0.1);
    let attack = hero
        .animation_mut()
        .fade_in("attack", 0.0, 0, 1, None, AnimationFadeOutMode::SameLayer)
        .unwrap();
    hero.advance_time(0.1);
    assert_eq!(hero.animation().last_state(), Some(attack));

    hero.animation_mut()
        .state_mut(attack)
        .unwrap()
        .fade_out(0.0, true);
    hero.advance_time(0.1);
    hero.advance_time(0.1);
    assert_eq!(hero.animation().state_ids(), &[walk]);
    assert_eq!(hero.animation().last_state(), Some(walk));
    assert_eq!(hero.animation().last_animation_name(), Some("walk"));

    assert_eq!(hero.animation_mut().play(None, -1), Some(walk));
    assert_eq!(hero.animation().state_ids().len(), 1);
}
