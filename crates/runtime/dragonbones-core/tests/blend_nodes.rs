use dragonbones_core::{Armature, Factory};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

// "mix" drives "lean" through progress (type 40) and weight (type 41) timelines.
const BLENDER: &str = r#"{
    "name": "blender",
    "frameRate": 10,
    "armature": [{
        "name": "blender",
        "bone": [{ "name": "root" }, { "name": "spine", "parent": "root" }],
        "animation": [
            {
                "name": "mix",
                "duration": 10,
                "playTimes": 0,
                "timeline": [
                    { "name": "lean", "type": 40, "frame": [
                        { "duration": 10, "tweenEasing": 0, "value": 0 },
                        { "duration": 0, "value": 1 }
                    ] },
                    { "name": "lean", "type": 41, "frame": [
                        { "duration": 10, "value": 0.5 }
                    ] }
                ]
            },
            {
                "name": "lean",
                "duration": 10,
                "playTimes": 0,
                "bone": [{
                    "name": "spine",
                    "translateFrame": [
                        { "duration": 10, "tweenEasing": 0, "x": 0 },
                        { "duration": 0, "x": 100 }
                    ]
                }]
            }
        ]
    }]
}"#;

fn mk_blender() -> Armature {
    let mut factory: Factory = Factory::default();
    factory
        .parse_dragonbones_data(BLENDER, None, 1.0)
        .expect("blender parses");
    factory
        .build_armature("blender", None, None, None)
        .expect("blender builds")
}

/// it should attach referenced animations as stopped, silent children of the parent state
#[test]
fn child_states_are_linked() {
    let mut hero = mk_blender();
    let mix = hero.animation_mut().play(Some("mix"), -1).unwrap();

    let animation = hero.animation();
    assert_eq!(animation.state_ids().len(), 2);
    assert_eq!(animation.state_ids()[0], mix);
    let lean = animation.get_state("lean", -1).unwrap();
    let state = animation.state(lean).unwrap();
    assert_eq!(state.parent(), Some(mix));
    assert!(!state.action_enabled);
    assert!(!state.reset_to_pose);
    assert!(!state.is_playing());
    assert_eq!(animation.last_state(), Some(mix));
}

/// it should drive the child's time and weight from the parent's timelines
#[test]
fn parent_timelines_drive_child() {
    let mut hero = mk_blender();
    hero.animation_mut().play(Some("mix"), -1).unwrap();
    hero.advance_time(0.5);

    let animation = hero.animation();
    let lean = animation.get_state("lean", -1).unwrap();
    let state = animation.state(lean).unwrap();
    assert!(approx(state.weight(), 0.5, 1e-4));
    assert!(approx(state.current_time(), 0.5, 1e-3));

    // half the sampled translation at half weight
    let spine = hero.get_bone("spine").unwrap();
    assert!(approx(spine.global().x, 25.0, 1e-2), "x = {}", spine.global().x);
}

/// it should drop children when the parent state goes away
#[test]
fn releasing_parent_drops_children() {
    let mut hero = mk_blender();
    hero.animation_mut().play(Some("mix"), -1).unwrap();
    hero.advance_time(0.1);
    hero.animation_mut().reset();
    assert!(hero.animation().state_ids().is_empty());
    assert!(hero.animation().get_state("lean", -1).is_none());
}
