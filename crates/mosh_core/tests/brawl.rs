mod common;

use common::{arena_grid, load_resources, loaded_proxy, player, zombie, Recorder};
use mosh_core::components::{
    vitality, HealthComponent, NpcController, PlayerInput, SpatialGridController, Vitality,
};
use mosh_core::ecs::{topics, EntityManager};
use mosh_core::fsm::{CharacterInput, DEATH};
use mosh_core::math::Vec3;

fn press(manager: &mut EntityManager, keys: CharacterInput) {
    manager
        .get_mut("player")
        .unwrap()
        .component_mut::<PlayerInput>()
        .unwrap()
        .set(keys);
}

#[test]
fn one_swing_fells_the_zombie_in_front() {
    let grid = arena_grid();
    let proxy = loaded_proxy();
    let mut manager = EntityManager::new();
    manager.add(player(&grid, &proxy), "player").unwrap();

    let mut victim = zombie(&grid, &proxy, Vec3::new(0.0, 0.0, 3.0), 0.0);
    victim
        .add_component(Recorder::on(&[topics::HEALTH_DEATH, topics::HEALTH_UPDATE]))
        .unwrap();
    manager.add(victim, "npc-zombie-0").unwrap();
    manager
        .add(zombie(&grid, &proxy, Vec3::new(0.0, 0.0, -3.0), 0.0), "npc-zombie-1")
        .unwrap();
    load_resources(&mut manager);

    press(
        &mut manager,
        CharacterInput {
            space: true,
            ..CharacterInput::default()
        },
    );
    manager.update(1.0 / 30.0);
    press(&mut manager, CharacterInput::default());
    for _ in 0..30 {
        let report = manager.update(1.0 / 30.0);
        assert_eq!(report.failures, 0);
    }

    let front = manager.get("npc-zombie-0").unwrap();
    assert_eq!(vitality(front), Vitality::Dead);
    assert!(front
        .component::<NpcController>()
        .unwrap()
        .machine()
        .is_in(DEATH));
    let recorder = front.component::<Recorder>().unwrap();
    assert_eq!(recorder.count(topics::HEALTH_DEATH), 1);
    assert_eq!(recorder.count(topics::HEALTH_UPDATE), 1);

    let behind = manager.get("npc-zombie-1").unwrap();
    assert_eq!(vitality(behind), Vitality::Alive);
    assert_eq!(
        manager
            .get("player")
            .unwrap()
            .component::<HealthComponent>()
            .unwrap()
            .health(),
        100.0
    );
}

#[test]
fn zombies_close_in_and_stop_at_contact_range() {
    let grid = arena_grid();
    let proxy = loaded_proxy();
    let mut manager = EntityManager::new();
    manager.add(player(&grid, &proxy), "player").unwrap();
    for (i, at) in [Vec3::new(20.0, 0.0, 0.0), Vec3::new(-15.0, 0.0, 15.0)]
        .into_iter()
        .enumerate()
    {
        manager
            .add(zombie(&grid, &proxy, at, 3.0), &format!("npc-zombie-{i}"))
            .unwrap();
    }
    load_resources(&mut manager);

    for _ in 0..600 {
        manager.update(1.0 / 30.0);
    }
    for name in ["npc-zombie-0", "npc-zombie-1"] {
        let npc = manager.get(name).unwrap();
        let distance = npc.position().distance(Vec3::ZERO);
        assert!((3.8..=4.0 + 1e-3).contains(&distance), "{name} at {distance}");

        let client = npc
            .component::<SpatialGridController>()
            .unwrap()
            .client()
            .unwrap();
        let recorded = grid.borrow().client(client).unwrap().position;
        assert!(recorded.distance(mosh_core::math::planar(npc.position())) < 1e-5);
    }
}

#[test]
fn removing_an_entity_frees_its_grid_slot() {
    let grid = arena_grid();
    let proxy = loaded_proxy();
    let mut manager = EntityManager::new();
    manager.add(player(&grid, &proxy), "player").unwrap();
    manager
        .add(zombie(&grid, &proxy, Vec3::new(1.0, 0.0, 1.0), 0.0), "npc")
        .unwrap();
    assert_eq!(grid.borrow().len(), 2);

    drop(manager.remove("npc").unwrap());
    assert_eq!(grid.borrow().len(), 1);
    let near = manager
        .get("player")
        .unwrap()
        .component::<SpatialGridController>()
        .unwrap()
        .find_nearby_entities(50.0);
    assert!(near.is_empty());
}
