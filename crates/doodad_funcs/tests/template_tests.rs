//! End-to-end runs of loaded templates through the engine

use std::sync::Arc;

use doodad_core::{ManualClock, ObjectId, PhaseTarget};
use doodad_engine::prelude::*;
use doodad_funcs::prelude::*;
use doodad_math::Transform;

const TEMPLATES: &str = r#"{
  "templates": [
    {
      "id": 1000,
      "name": "Apple Tree",
      "groups": [
        {
          "id": 10,
          "kind": "Start",
          "phase_funcs": [{ "type": "DoodadFuncGrowth", "duration_ms": 60000 }],
          "triggers": [{ "type": "DoodadFuncUse", "skill_id": 3, "next_phase": 11 }]
        },
        {
          "id": 11,
          "phase_funcs": [{ "type": "DoodadFuncRatioChange", "ratio": 10000, "next_phase": 12 }]
        },
        {
          "id": 12,
          "phase_funcs": [{ "type": "DoodadFuncQuestGlow", "on": true }],
          "triggers": [{ "type": "DoodadFuncToPhaseAndUse", "next_phase": 13 }]
        },
        {
          "id": 13,
          "kind": "Extra",
          "triggers": [{ "type": "DoodadFuncSetData", "value": 7 }]
        }
      ]
    },
    {
      "id": 2000,
      "name": "Bonfire",
      "groups": [
        {
          "id": 20,
          "kind": "Start",
          "triggers": [{ "type": "DoodadFuncSkillHit", "skill_id": 50, "next_phase": -1 }]
        }
      ]
    },
    {
      "id": 3000,
      "name": "Lever",
      "groups": [
        {
          "id": 30,
          "kind": "Start",
          "triggers": [{ "type": "DoodadFuncRequireActor", "next_phase": 31 }]
        },
        { "id": 31, "phase_funcs": [{ "type": "DoodadFuncFinal" }] }
      ]
    }
  ]
}"#;

fn world() -> DoodadWorld {
    let TemplateSet { templates, catalog } = TemplateSet::from_json_str(TEMPLATES).unwrap();
    let engine = PhaseEngine::with_config(
        Arc::new(catalog),
        Arc::new(NullBroadcaster),
        EngineConfig::default().with_seed(3),
    )
    .with_clock(Arc::new(ManualClock::at_epoch()));

    let mut world = DoodadWorld::new(Arc::new(engine));
    for template in templates {
        world.register_template(template);
    }
    world
}

#[test]
fn test_loaded_template_groups() {
    let set = TemplateSet::from_json_str(TEMPLATES).unwrap();
    assert_eq!(set.templates.len(), 3);
    assert_eq!(set.templates[0].name, "Apple Tree");
    assert_eq!(set.templates[0].start_func_groups(), vec![10]);
    assert_eq!(set.catalog.trigger_funcs(10).len(), 1);
    assert_eq!(set.catalog.phase_funcs(11)[0].func_type, "DoodadFuncRatioChange");
}

#[test]
fn test_apple_tree_harvest_cascade() {
    let mut world = world();
    let actor = Actor::character(ObjectId::new(9), 90);
    let tree = world
        .spawn_template(1000, Transform::IDENTITY, Some(actor), false)
        .unwrap();

    let now = world.engine().now();
    let doodad = world.get(tree).unwrap();
    assert_eq!(doodad.current_phase_id(), 10);
    assert_eq!(doodad.time_left(now), 60_000);

    // Wrong skill: nothing matches
    world.use_doodad(tree, Some(actor), 4).unwrap();
    assert_eq!(world.get(tree).unwrap().current_phase_id(), 10);

    // Harvest: 10 -> 11, whose certain ratio roll cascades into 12
    world.use_doodad(tree, Some(actor), 3).unwrap();
    let doodad = world.get(tree).unwrap();
    assert_eq!(doodad.current_phase_id(), 12);
    assert_eq!(doodad.quest_glow, 1);

    // 12 moves to 13 and immediately fires 13's trigger
    world.use_doodad(tree, Some(actor), 99).unwrap();
    let doodad = world.get(tree).unwrap();
    assert_eq!(doodad.current_phase_id(), 13);
    assert_eq!(doodad.data(), 7);
}

#[test]
fn test_bonfire_extinguished_by_skill_hit() {
    let mut world = world();
    let fire = world
        .spawn_template(2000, Transform::IDENTITY, None, false)
        .unwrap();

    world.skill_hit(fire, None, 49).unwrap();
    assert!(world.contains(fire));

    world.skill_hit(fire, None, 50).unwrap();
    assert!(!world.contains(fire));
}

#[test]
fn test_lever_requires_actor() {
    let mut world = world();
    let lever = world
        .spawn_template(3000, Transform::IDENTITY, None, false)
        .unwrap();

    world.use_doodad(lever, None, 1).unwrap();
    assert_eq!(world.get(lever).unwrap().current_phase_id(), 30);

    world
        .use_doodad(lever, Some(Actor::npc(ObjectId::new(4))), 1)
        .unwrap();
    assert!(!world.contains(lever));
}

#[test]
fn test_unknown_phase_is_refused() {
    let mut world = world();
    let tree = world
        .spawn_template(1000, Transform::IDENTITY, None, false)
        .unwrap();
    world.go_to_phase(tree, None, PhaseTarget::Phase(20)).unwrap();
    assert_eq!(world.get(tree).unwrap().current_phase_id(), 10);
}
