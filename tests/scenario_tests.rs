//! End-to-end intersection scenarios driven through `SimWorld`

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use signal_sim::simulation::{
    Axis, CarId, ControlMode, Direction, LightColor, SimCar, SimConfig, SimWorld, SpawnRule,
};

/// A world that never spawns on its own
fn quiet_config(mode: ControlMode) -> SimConfig {
    SimConfig {
        mode,
        seed: Some(7),
        spawn_policy: vec![(SpawnRule::None, 1.0)],
        ..SimConfig::default()
    }
}

/// Fixed timer that never fires, so the initial green holds
fn frozen_signal_config() -> SimConfig {
    SimConfig {
        green_duration: u32::MAX,
        ..quiet_config(ControlMode::FixedTimer)
    }
}

#[test]
fn test_single_car_crosses_on_green() {
    let mut world = SimWorld::new_with_signal(frozen_signal_config(), Axis::NS).unwrap();
    let id = world.spawn_with(Direction::Up, false);

    let mut crossed_stop_line = false;
    for _ in 0..1000 {
        world.tick();
        match world.cars.iter().find(|car| car.id == id) {
            Some(car) => {
                assert!(!car.stopped, "car stopped on a green light");
                assert!(car.position.y >= 0.0);
                if car.position.y < 500.0 {
                    crossed_stop_line = true;
                }
            }
            None => break,
        }
    }

    assert!(crossed_stop_line);
    assert!(world.cars.is_empty());
    assert_eq!(world.stats().total_cars_exited, 1);
    // 1000 units at 2 per tick, removed on the first step below zero
    assert_eq!(world.elapsed_ticks(), 501);
}

#[test]
fn test_queue_waits_on_red_and_resumes_in_order() {
    let mut world = SimWorld::new_with_signal(frozen_signal_config(), Axis::EW).unwrap();
    let leader = world.spawn_with(Direction::Up, false);
    for _ in 0..45 {
        world.tick();
    }
    let follower = world.spawn_with(Direction::Up, false);

    for _ in 0..300 {
        world.tick();
    }
    assert_eq!(world.cars.len(), 2);
    assert!(world.cars.iter().all(|car| car.stopped));
    assert_eq!(world.cars[0].id, leader);
    assert_eq!(world.cars[1].id, follower);
    assert_eq!(world.cars[0].position.y, 552.0);
    assert_eq!(world.cars[1].position.y, 598.0);
    assert_eq!(world.stats().queue_length(Direction::Up), 2);

    // Waiting grows by one per tick while red, including through yellow
    world.signal.switch_to_yellow();
    for _ in 0..89 {
        let before: Vec<u32> = world.cars.iter().map(|car| car.waiting_time).collect();
        world.tick();
        assert_eq!(world.signal.color_ns, LightColor::Red);
        for (car, waited) in world.cars.iter().zip(before) {
            assert!(car.stopped);
            assert_eq!(car.waiting_time, waited + 1);
        }
    }

    // NS turns green on this tick and both cars move off together
    world.tick();
    assert_eq!(world.signal.color_ns, LightColor::Green);
    assert!(world.cars.iter().all(|car| !car.stopped && car.waiting_time == 0));

    let config = world.config.clone();
    while world.cars.len() == 2 {
        let lead = &world.cars[0];
        let follow = &world.cars[1];
        assert_eq!(lead.id, leader);
        let gap = follow.position.y - (lead.position.y + lead.length);
        assert!(gap >= config.follow_gap_min, "following gap {} too small", gap);
        world.tick();
    }
    assert_eq!(world.cars[0].id, follower);
}

#[test]
fn test_fixed_timer_changes_at_threshold() {
    let config = SimConfig {
        green_duration: 300,
        ..quiet_config(ControlMode::FixedTimer)
    };
    let mut world = SimWorld::new_with_signal(config, Axis::NS).unwrap();

    // Traffic on the red axis makes no difference to the timer
    for direction in [Direction::Left, Direction::Right, Direction::Left] {
        world.spawn_with(direction, false);
        for _ in 0..10 {
            world.tick();
        }
    }

    while world.elapsed_ticks() < 299 {
        world.tick();
        assert_eq!(world.signal.color_ns, LightColor::Green);
    }
    world.tick();
    assert_eq!(world.signal.time_green, 300);
    assert_eq!(world.signal.color_ns, LightColor::Yellow);
    assert_eq!(world.stats().signal_changes_requested, 1);

    for _ in 0..90 {
        world.tick();
    }
    assert_eq!(world.signal.color_ns, LightColor::Red);
    assert_eq!(world.signal.color_ew, LightColor::Green);
}

#[test]
fn test_adaptive_controller_waits_for_dwell_and_second_boundary() {
    let mut world =
        SimWorld::new_with_signal(quiet_config(ControlMode::PolicyIteration), Axis::NS).unwrap();

    for _ in 0..149 {
        world.tick();
    }
    assert_eq!(world.stats().controller_queries, 0);

    world.tick();
    assert_eq!(world.stats().controller_queries, 1);

    while world.elapsed_ticks() < 179 {
        world.tick();
    }
    assert_eq!(world.stats().controller_queries, 1);

    world.tick();
    assert_eq!(world.stats().controller_queries, 2);

    // Empty intersection: nothing to gain from switching
    assert_eq!(world.signal.color_ns, LightColor::Green);
    assert_eq!(world.stats().signal_changes_requested, 0);
}

#[test]
fn test_adaptive_controller_serves_waiting_queue() {
    for mode in [ControlMode::PolicyIteration, ControlMode::ValueIteration] {
        let mut world = SimWorld::new_with_signal(quiet_config(mode), Axis::NS).unwrap();
        let id = world.spawn_with(Direction::Left, false);

        for _ in 0..300 {
            world.tick();
        }
        assert_eq!(world.signal.color_ns, LightColor::Yellow, "mode {}", mode);
        let car = world.cars.iter().find(|car| car.id == id).unwrap();
        assert!(car.stopped);
        assert_eq!(car.position.x, 552.0);

        for _ in 0..100 {
            world.tick();
        }
        assert_eq!(world.signal.color_ew, LightColor::Green, "mode {}", mode);
        let car = world.cars.iter().find(|car| car.id == id).unwrap();
        assert!(!car.stopped);
        assert!(car.position.x < 552.0);
    }
}

#[test]
fn test_waiting_time_invariant_holds_in_busy_run() {
    let config = SimConfig {
        mode: ControlMode::PolicyIteration,
        seed: Some(42),
        car_spawn_frequency: 1.0,
        simulation_duration: 60.0,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new(config).unwrap();
    let mut last: HashMap<CarId, (bool, u32)> = HashMap::new();

    for _ in 0..3000 {
        world.tick();
        let mut seen = HashMap::new();
        for car in &world.cars {
            if !car.stopped {
                assert_eq!(car.waiting_time, 0, "moving car {:?} has waiting time", car.id);
            }
            if let Some((was_stopped, waited)) = last.get(&car.id) {
                if *was_stopped && car.stopped {
                    assert!(car.waiting_time >= *waited);
                }
            }
            seen.insert(car.id, (car.stopped, car.waiting_time));
        }
        last = seen;

        let reds = [world.signal.color_ns, world.signal.color_ew]
            .iter()
            .filter(|color| **color == LightColor::Red)
            .count();
        assert_eq!(reds, 1);
    }

    assert!(world.stats().total_cars_spawned > 0);
    assert_eq!(world.stats().cumulative_waiting_time_by_second.len(), 100);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let config = SimConfig {
        mode: ControlMode::ValueIteration,
        seed: Some(99),
        ..SimConfig::default()
    };
    let mut a = SimWorld::new(config.clone()).unwrap();
    let mut b = SimWorld::new(config).unwrap();

    for _ in 0..2000 {
        a.tick();
        b.tick();
    }

    assert_eq!(a.cars, b.cars);
    assert_eq!(a.signal, b.signal);
    assert_eq!(
        a.stats().cumulative_waiting_time_by_second,
        b.stats().cumulative_waiting_time_by_second
    );
    assert_eq!(a.stats().total_cars_spawned, b.stats().total_cars_spawned);
}

#[test]
fn test_spawn_respects_filter() {
    let mut world = SimWorld::new(quiet_config(ControlMode::FixedTimer)).unwrap();
    let mut spawned = Vec::new();
    for _ in 0..20 {
        if let Some(id) = world.spawn(Some(&[Direction::Left, Direction::Right])) {
            let car = world.cars.iter().find(|car| car.id == id).unwrap();
            spawned.push(car.direction);
        }
        for _ in 0..30 {
            world.tick();
        }
    }

    assert!(!spawned.is_empty());
    assert!(spawned
        .iter()
        .all(|direction| matches!(direction, Direction::Left | Direction::Right)));
    let stats = world.stats();
    assert_eq!(stats.total_cars_spawned, spawned.len());
    assert_eq!(stats.total_cars_spawned + stats.spawns_blocked, 20);

    // An empty filter spawns nothing and is not counted as blocked
    let blocked = world.stats().spawns_blocked;
    assert_eq!(world.spawn(Some(&[])), None);
    assert_eq!(world.stats().spawns_blocked, blocked);
}

#[test]
fn test_spawn_waits_for_clear_entry() {
    let mut world = SimWorld::new(quiet_config(ControlMode::FixedTimer)).unwrap();
    world.spawn_with(Direction::Up, false);

    assert_eq!(world.spawn(Some(&[Direction::Up])), None);
    assert_eq!(world.stats().spawns_blocked, 1);

    // 22 ticks moves the first car 44 units: still short of 40 + 4 + 2
    for _ in 0..22 {
        world.tick();
    }
    assert_eq!(world.spawn(Some(&[Direction::Up])), None);

    world.tick();
    assert!(world.spawn(Some(&[Direction::Up])).is_some());
    assert_eq!(world.stats().spawns_blocked, 2);
    assert_eq!(world.stats().total_cars_spawned, 2);
}

/// Pairs of same-heading cars overlapping before the center
fn approach_overlaps(world: &SimWorld) -> Vec<(CarId, CarId)> {
    let center = world.intersection.center;
    let approaching = |car: &SimCar| match car.direction {
        Direction::Up => car.position.y > center.y,
        Direction::Down => car.position.y + car.length < center.y,
        Direction::Left => car.position.x > center.x,
        Direction::Right => car.position.x + car.length < center.x,
    };

    let mut overlaps = Vec::new();
    for (i, a) in world.cars.iter().enumerate() {
        for b in &world.cars[i + 1..] {
            if a.direction != b.direction || !approaching(a) || !approaching(b) {
                continue;
            }
            let distance = match a.direction {
                Direction::Up | Direction::Down => (a.position.y - b.position.y).abs(),
                Direction::Left | Direction::Right => (a.position.x - b.position.x).abs(),
            };
            if distance < a.length {
                overlaps.push((a.id, b.id));
            }
        }
    }
    overlaps
}

#[test]
fn test_fast_spawning_never_overlaps_cars() {
    for mode in [ControlMode::FixedTimer, ControlMode::ValueIteration] {
        let config = SimConfig {
            mode,
            seed: Some(11),
            car_spawn_frequency: 0.5,
            spawn_policy: vec![(SpawnRule::AllDirections, 1.0)],
            ..SimConfig::default()
        };
        let mut world = SimWorld::new(config).unwrap();

        for _ in 0..3000 {
            world.tick();
            let overlaps = approach_overlaps(&world);
            assert!(
                overlaps.is_empty(),
                "overlapping cars {:?} at tick {} in {} mode",
                overlaps,
                world.elapsed_ticks(),
                mode
            );
        }
        // One spawn every 30 units of travel: repeats of a lane must wait
        assert!(world.stats().spawns_blocked > 0);
        assert!(world.stats().total_cars_spawned > 0);
    }
}

#[test]
fn test_spawn_cadence_follows_schedule() {
    let config = SimConfig {
        seed: Some(3),
        spawn_policy: vec![(SpawnRule::UpDown, 1.0), (SpawnRule::LeftRight, 1.0)],
        simulation_duration: 20.0,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new(config).unwrap();

    // Heading of every car on the tick it appears, before any turn
    let mut spawn_directions: HashMap<CarId, Direction> = HashMap::new();
    let mut record_new_cars = |world: &SimWorld| {
        for car in &world.cars {
            spawn_directions.entry(car.id).or_insert(car.direction);
        }
    };

    // One spawn every 45 ticks; first 10 seconds are up_down only
    for _ in 0..299 {
        world.tick();
        record_new_cars(&world);
    }
    assert_eq!(world.stats().total_cars_spawned, 6);
    assert_eq!(world.current_spawn_rule(), SpawnRule::UpDown);

    while world.elapsed_ticks() < 330 {
        world.tick();
        record_new_cars(&world);
    }
    assert_eq!(world.current_spawn_rule(), SpawnRule::LeftRight);

    // The schedule wraps back to up_down at 20 seconds
    while world.elapsed_ticks() < 590 {
        world.tick();
        record_new_cars(&world);
    }

    let mut ids: Vec<&CarId> = spawn_directions.keys().collect();
    ids.sort();
    let (first, later) = ids.split_at(6);
    assert!(first
        .iter()
        .all(|id| spawn_directions[*id].axis() == Axis::NS));
    assert!(!later.is_empty());
    assert!(later
        .iter()
        .all(|id| spawn_directions[*id].axis() == Axis::EW));
}

#[test]
fn test_stop_flag_ends_run_between_ticks() {
    let mut world = SimWorld::new(quiet_config(ControlMode::FixedTimer)).unwrap();
    let stop = AtomicBool::new(true);
    assert_eq!(world.run(100, &stop), 0);
    assert_eq!(world.elapsed_ticks(), 0);

    let go = AtomicBool::new(false);
    assert_eq!(world.run(100, &go), 100);
    assert_eq!(world.elapsed_ticks(), 100);
}
