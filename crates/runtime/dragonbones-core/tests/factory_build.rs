use std::cell::RefCell;
use std::rc::Rc;

use dragonbones_core::model::{ArmatureData, SlotData};
use dragonbones_core::{
    ColorTransform, DataParser, DisplayBackend, DisplayRef, Factory, JsonDataParser, Matrix,
    RenderProxy, RuntimeConfig,
};
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
    let atlas = skeletons::atlas_json("hero")
        .expect("hero atlas fixture")
        .expect("hero ships an atlas");
    factory
        .parse_texture_atlas_data(&atlas, None, 0.0)
        .expect("atlas parses");
    factory
}

#[derive(Default)]
struct Calls {
    armatures: Vec<String>,
    slots: Vec<String>,
    displays: Vec<(String, Option<String>)>,
    destroyed: usize,
}

struct RecordingProxy {
    slot: String,
    calls: Rc<RefCell<Calls>>,
}

impl RenderProxy for RecordingProxy {
    fn update_transform(&mut self, _matrix: &Matrix) {}

    fn update_color(&mut self, _color: &ColorTransform) {}

    fn update_display(&mut self, display: DisplayRef<'_>) {
        let texture = display.texture.map(|t| t.name.clone());
        self.calls
            .borrow_mut()
            .displays
            .push((self.slot.clone(), texture));
    }

    fn destroy(&mut self) {
        self.calls.borrow_mut().destroyed += 1;
    }
}

struct RecordingBackend(Rc<RefCell<Calls>>);

impl DisplayBackend for RecordingBackend {
    fn armature_proxy(&mut self, armature: &ArmatureData) -> Box<dyn RenderProxy> {
        self.0.borrow_mut().armatures.push(armature.name.clone());
        Box::new(RecordingProxy {
            slot: String::new(),
            calls: self.0.clone(),
        })
    }

    fn slot_proxy(&mut self, _armature: &ArmatureData, slot: &SlotData) -> Box<dyn RenderProxy> {
        self.0.borrow_mut().slots.push(slot.name.clone());
        Box::new(RecordingProxy {
            slot: slot.name.clone(),
            calls: self.0.clone(),
        })
    }
}

/// it should register parsed data under its declared names
#[test]
fn parse_registers_data() {
    let factory = mk_factory();
    let data = factory.get_dragonbones_data("hero").unwrap();
    assert_eq!(data.armature_names(), &["hero".to_string(), "pet".to_string()]);
    let atlases = factory.get_texture_atlas_data("hero").unwrap();
    assert_eq!(atlases.len(), 1);
    assert_eq!(atlases[0].image_path, "hero_tex.png");
    assert!(factory.get_armature_data("pet", None).is_some());
    assert!(factory.get_armature_data("pet", Some("nope")).is_none());
}

/// it should keep the first data set registered under a name
#[test]
fn duplicate_names_keep_first() {
    let mut factory = mk_factory();
    let first = factory.get_dragonbones_data("hero").unwrap().clone();
    let raw = skeletons::json("rig").unwrap();
    let rig = factory.parse_dragonbones_data(&raw, Some("hero"), 1.0).unwrap();
    assert!(Rc::ptr_eq(factory.get_dragonbones_data("hero").unwrap(), &first));
    assert!(!Rc::ptr_eq(&rig, &first));

    assert!(factory.remove_dragonbones_data("hero").is_some());
    assert!(factory.get_dragonbones_data("hero").is_none());
    assert!(factory.build_armature("hero", None, None, None).is_none());
}

/// it should build bones parents first, slots with textures and a child armature
#[test]
fn build_wires_pose_and_displays() {
    let mut factory = mk_factory();
    let hero = factory.build_armature("hero", None, None, None).unwrap();

    let names: Vec<&str> = hero.get_bones().iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["root", "body", "head", "arm", "hand"]);
    assert!(hero.bone_contains("body", "hand"));
    assert!(!hero.bone_contains("hand", "body"));

    let head = hero.get_slot("head").unwrap();
    assert_eq!(head.display_frames().len(), 2);
    let texture = head.display_frames()[1].texture().unwrap();
    assert!(texture.rotated);
    assert_eq!(head.display_frames()[0].texture().unwrap().name, "hero/head");

    let arm = hero.get_slot("arm").unwrap();
    assert!(approx(arm.color().alpha_multiplier, 0.8, 1e-6));

    let effect = hero.get_slot("effect").unwrap();
    assert_eq!(effect.display_index(), -1);
    assert!(effect.display().is_none());

    let pet = hero.get_slot("pet").unwrap().child_armature().unwrap();
    assert_eq!(pet.name(), "pet");
    assert!(!pet.inherit_animation);
    assert_eq!(pet.animation().last_animation_name(), Some("wag"));
}

/// it should ask the backend for one proxy per armature and slot, and release them on dispose
#[test]
fn backend_supplies_proxies() {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut factory = mk_factory();
    factory.set_backend(Box::new(RecordingBackend(calls.clone())));
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();

    {
        let calls = calls.borrow();
        assert_eq!(calls.armatures, vec!["pet".to_string(), "hero".to_string()]);
        assert_eq!(calls.slots.len(), 6);
        assert!(calls
            .displays
            .contains(&("body".to_string(), Some("hero/body".to_string()))));
    }

    hero.dispose();
    // hero, 5 hero slots, pet and its slot
    assert_eq!(calls.borrow().destroyed, 8);
}

/// it should take slot displays from the requested skin and fall back to the default skin
#[test]
fn build_with_skin() {
    let mut factory = mk_factory();
    let hero = factory
        .build_armature("hero", None, Some("armor"), None)
        .unwrap();
    let body = hero.get_slot("body").unwrap();
    assert_eq!(body.display().unwrap().name, "hero/body_armor");
    assert_eq!(body.display_frames()[0].texture().unwrap().name, "hero/body_armor");
    assert_eq!(hero.get_slot("head").unwrap().display().unwrap().name, "hero/head");
}

/// it should swap skins at runtime, honoring exclusions
#[test]
fn replace_skin_swaps_displays() {
    let mut factory = mk_factory();
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();
    let armor = hero.armature_data().get_skin("armor").unwrap().clone();

    assert!(factory.replace_skin(&mut hero, &armor, false, &["head"]));
    assert_eq!(hero.get_slot("body").unwrap().display().unwrap().name, "hero/body_armor");
    assert_eq!(hero.get_slot("head").unwrap().display().unwrap().name, "hero/head");

    let default = hero.armature_data().default_skin().unwrap().clone();
    assert!(factory.replace_skin(&mut hero, &default, false, &[]));
    assert_eq!(hero.get_slot("body").unwrap().display().unwrap().name, "hero/body");

    // uncovered slots fall back to the default skin, child armatures included
    assert!(factory.replace_skin(&mut hero, &armor, true, &[]));
    assert_eq!(hero.get_slot("head").unwrap().display().unwrap().name, "hero/head");
    let pet = hero.get_slot("pet").unwrap().child_armature().unwrap();
    assert_eq!(pet.animation().last_animation_name(), Some("wag"));
}

/// it should replace a single display, building child armatures for armature displays
#[test]
fn replace_slot_display() {
    let mut factory = mk_factory();
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();

    let slot = hero.get_slot_mut("body").unwrap();
    assert!(factory.replace_slot_display(None, "hero", "head", "hero/head_alt", slot, -1));
    assert_eq!(slot.display().unwrap().name, "hero/head_alt");
    assert_eq!(slot.display_frames()[0].texture().unwrap().name, "hero/head_alt");

    let effect = hero.get_slot_mut("effect").unwrap();
    assert!(factory.replace_slot_display(None, "hero", "pet", "pet", effect, 2));
    assert_eq!(effect.display_frame_count(), 3);
    assert_eq!(effect.display_frames()[2].armature().unwrap().name(), "pet");

    assert!(!factory.replace_slot_display(None, "ghost", "body", "x", effect, 0));
}

/// it should copy a whole display list from another slot
#[test]
fn replace_display_list() {
    let mut factory = mk_factory();
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();
    let body = hero.get_slot_mut("body").unwrap();
    assert!(factory.replace_slot_display_list(None, "hero", "head", body));
    assert_eq!(body.display_frame_count(), 2);
    assert_eq!(body.display_frames()[1].display().unwrap().name, "hero/head_alt");
}

/// it should merge or override animations from another armature
#[test]
fn replace_animation_merges() {
    let mut factory = mk_factory();
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();
    let pet = factory.get_armature_data("pet", None).unwrap();

    assert!(factory.replace_animation(&mut hero, &pet, false));
    assert!(hero.animation().has_animation("wag"));
    assert!(hero.animation().has_animation("walk"));

    assert!(factory.replace_animation(&mut hero, &pet, true));
    assert!(hero.animation().has_animation("wag"));
    assert!(!hero.animation().has_animation("walk"));
    assert!(hero.animation_mut().play(Some("sit"), -1).is_some());
}

// Same bone and slot names as the hero, declared in another order.
const MIRROR: &str = r#"{
    "name": "mirror",
    "frameRate": 30,
    "armature": [{
        "name": "mirror",
        "frameRate": 30,
        "bone": [
            { "name": "root" },
            { "name": "arm", "parent": "root" },
            { "name": "body", "parent": "root" },
            { "name": "head", "parent": "root" },
            { "name": "hand", "parent": "root" }
        ],
        "slot": [
            { "name": "arm", "parent": "arm" },
            { "name": "body", "parent": "body" },
            { "name": "head", "parent": "head" },
            { "name": "pet", "parent": "root" },
            { "name": "effect", "parent": "hand" }
        ],
        "skin": [{ "name": "default", "slot": [] }],
        "animation": [
            {
                "name": "slide",
                "duration": 30,
                "playTimes": 0,
                "bone": [{
                    "name": "body",
                    "translateFrame": [
                        { "duration": 30, "tweenEasing": 0, "x": 0 },
                        { "duration": 0, "x": 30 }
                    ]
                }]
            },
            {
                "name": "lift",
                "duration": 10,
                "playTimes": 1,
                "zOrder": { "frame": [{ "duration": 10, "zOrder": [1, 2] }] }
            }
        ]
    }]
}"#;

/// it should drive bones and slots by name after taking animations from a differently ordered armature
#[test]
fn replaced_animations_follow_names() {
    let mut factory = mk_factory();
    factory
        .parse_dragonbones_data(MIRROR, None, 1.0)
        .expect("mirror parses");
    let mut hero = factory.build_armature("hero", None, None, None).unwrap();
    let mirror = factory.get_armature_data("mirror", None).unwrap();
    assert!(factory.replace_animation(&mut hero, &mirror, false));

    hero.animation_mut().play(Some("slide"), -1).unwrap();
    hero.advance_time(0.5);
    let body = hero.get_bone("body").unwrap();
    assert!(approx(body.animation_pose().x, 15.0, 1e-3), "x = {}", body.animation_pose().x);
    assert!(approx(body.global().x, 15.0, 1e-3));
    assert!(approx(hero.get_bone("head").unwrap().animation_pose().x, 0.0, 1e-6));
    assert!(approx(hero.get_bone("arm").unwrap().animation_pose().x, 0.0, 1e-6));

    // mirror order [arm, head, pet, body, effect] in hero slot indices
    hero.animation_mut().play(Some("lift"), -1).unwrap();
    hero.advance_time(0.1);
    assert_eq!(hero.draw_order(), &[2, 1, 3, 0, 4]);
}

/// it should reuse recycled armatures for later builds
#[test]
fn recycle_and_rebuild() {
    let mut factory = mk_factory();
    let hero = factory.build_armature("hero", None, None, None).unwrap();
    factory.recycle_armature(hero);
    assert_eq!(factory.recycled_count(), 1);

    let pet = factory.build_armature("pet", None, None, None).unwrap();
    assert_eq!(factory.recycled_count(), 0);
    assert_eq!(pet.name(), "pet");
    assert_eq!(pet.get_bones().len(), 2);
    assert!(pet.animation().has_animation("wag"));
    assert!(!pet.animation().has_animation("walk"));
}

/// it should search every data set for armatures when auto-search is on
#[test]
fn auto_search_finds_armatures() {
    let mut config = RuntimeConfig::default();
    config.auto_search = true;
    let mut factory = Factory::with_config(JsonDataParser::new(), config);
    let raw = skeletons::json("hero").unwrap();
    factory.parse_dragonbones_data(&raw, Some("characters"), 1.0).unwrap();

    // named data is missing and the only registered set does not opt in
    assert!(factory.build_armature("pet", Some("hero"), None, None).is_none());

    let mut shared = JsonDataParser::new().parse_dragonbones_data(&raw, 1.0).unwrap();
    shared.auto_search = true;
    assert!(factory.add_dragonbones_data(Rc::new(shared), Some("shared")));
    assert!(factory.build_armature("pet", Some("hero"), None, None).is_some());
}

/// it should build the IK rig and bend the chain toward its target
#[test]
fn ik_rig_reaches_target() {
    let mut factory: Factory = Factory::default();
    let raw = skeletons::json("rig").unwrap();
    factory.parse_dragonbones_data(&raw, None, 1.0).unwrap();
    let mut leg = factory.build_armature("leg", None, None, None).unwrap();
    assert_eq!(leg.get_constraints().len(), 1);
    assert_eq!(leg.get_constraints()[0].name(), "knee");

    leg.advance_time(0.0);
    let shin = leg.get_bone("shin").unwrap();
    let thigh = leg.get_bone("thigh").unwrap();
    // the thigh bends away from straight down while the shin still starts at the thigh tip
    assert!(!approx(thigh.global().rotation, std::f32::consts::FRAC_PI_2, 1e-3));
    let tip_x = thigh.global().x + 50.0 * thigh.global().rotation.cos();
    let tip_y = thigh.global().y + 50.0 * thigh.global().rotation.sin();
    assert!(approx(shin.global().x, tip_x, 1e-2));
    assert!(approx(shin.global().y, tip_y, 1e-2));
}
