//! Signal state machine and spawn schedule tests

use rand::rngs::StdRng;
use rand::SeedableRng;

use signal_sim::simulation::{
    parse_spawn_policy, Axis, LightColor, SignalState, SpawnRule, SpawnSchedule, YELLOW_DURATION,
};

fn assert_mutually_exclusive(signal: &SignalState) {
    let reds = [signal.color_ns, signal.color_ew]
        .iter()
        .filter(|color| **color == LightColor::Red)
        .count();
    assert_eq!(
        reds, 1,
        "exactly one axis must be red: NS={:?} EW={:?}",
        signal.color_ns, signal.color_ew
    );
}

#[test]
fn test_signal_initial_states() {
    let ns = SignalState::new(Axis::NS, YELLOW_DURATION);
    assert_eq!(ns.color_ns, LightColor::Green);
    assert_eq!(ns.color_ew, LightColor::Red);
    assert_eq!(ns.green_axis(), Some(Axis::NS));

    let ew = SignalState::new(Axis::EW, YELLOW_DURATION);
    assert_eq!(ew.color_ns, LightColor::Red);
    assert_eq!(ew.color_ew, LightColor::Green);
    assert_eq!(ew.right_of_way(), Axis::EW);
}

#[test]
fn test_random_signal_starts_on_a_green_state() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut seen_ns = false;
    let mut seen_ew = false;
    for _ in 0..64 {
        let signal = SignalState::random(&mut rng, YELLOW_DURATION);
        assert_mutually_exclusive(&signal);
        match signal.green_axis() {
            Some(Axis::NS) => seen_ns = true,
            Some(Axis::EW) => seen_ew = true,
            None => panic!("initial signal has no green axis"),
        }
    }
    assert!(seen_ns && seen_ew);
}

#[test]
fn test_yellow_turns_red_after_yellow_duration() {
    let mut signal = SignalState::new(Axis::NS, YELLOW_DURATION);
    for _ in 0..40 {
        signal.tick();
    }
    assert_eq!(signal.time_green, 40);

    signal.switch_to_yellow();
    assert_eq!(signal.color_ns, LightColor::Yellow);
    assert_eq!(signal.green_axis(), None);

    for _ in 0..YELLOW_DURATION - 1 {
        signal.tick();
        assert_eq!(signal.color_ns, LightColor::Yellow);
        assert_eq!(signal.color_ew, LightColor::Red);
    }

    signal.tick();
    assert_eq!(signal.color_ns, LightColor::Red);
    assert_eq!(signal.color_ew, LightColor::Green);
    assert_eq!(signal.time_green, 0);
    assert_eq!(signal.time_yellow, 0);
}

#[test]
fn test_switch_to_yellow_is_noop_while_yellow() {
    let mut signal = SignalState::new(Axis::EW, YELLOW_DURATION);
    signal.switch_to_yellow();
    signal.tick();
    let before = signal.clone();
    signal.switch_to_yellow();
    assert_eq!(signal, before);
    assert_eq!(signal.color_ew, LightColor::Yellow);
    assert_eq!(signal.color_ns, LightColor::Red);
}

#[test]
fn test_signal_never_has_two_open_axes() {
    let mut signal = SignalState::new(Axis::NS, YELLOW_DURATION);
    for tick in 0..5000u32 {
        if tick % 137 == 0 || tick % 311 == 0 {
            signal.switch_to_yellow();
        }
        signal.tick();
        assert_mutually_exclusive(&signal);
    }
}

#[test]
fn test_spawn_schedule_proportional_intervals() {
    let policy = vec![
        (SpawnRule::UpDown, 1.0),
        (SpawnRule::LeftRight, 1.0),
        (SpawnRule::AllDirections, 2.0),
    ];
    let schedule = SpawnSchedule::new(&policy, 40.0).unwrap();

    let lengths: Vec<f64> = schedule.intervals().iter().map(|(_, l)| *l).collect();
    assert_eq!(lengths, vec![10.0, 10.0, 20.0]);
    assert_eq!(schedule.period(), 40.0);

    assert_eq!(schedule.current_interval(0.0), SpawnRule::UpDown);
    assert_eq!(schedule.current_interval(9.99), SpawnRule::UpDown);
    assert_eq!(schedule.current_interval(10.0), SpawnRule::LeftRight);
    assert_eq!(schedule.current_interval(25.0), SpawnRule::AllDirections);
    assert_eq!(schedule.current_interval(39.9), SpawnRule::AllDirections);
    // Wraps around after one period
    assert_eq!(schedule.current_interval(40.0), SpawnRule::UpDown);
    assert_eq!(schedule.current_interval(55.0), SpawnRule::LeftRight);
}

#[test]
fn test_spawn_schedule_rejects_bad_policies() {
    assert!(SpawnSchedule::new(&[], 60.0).is_err());
    assert!(SpawnSchedule::new(&[(SpawnRule::UpDown, 0.0)], 60.0).is_err());
    assert!(SpawnSchedule::new(&[(SpawnRule::UpDown, -1.0)], 60.0).is_err());
    assert!(SpawnSchedule::new(&[(SpawnRule::UpDown, 1.0)], 0.0).is_err());
}

#[test]
fn test_parse_spawn_policy() {
    let policy = parse_spawn_policy("up_down:1, none:3,all_directions:0.5").unwrap();
    assert_eq!(
        policy,
        vec![
            (SpawnRule::UpDown, 1.0),
            (SpawnRule::None, 3.0),
            (SpawnRule::AllDirections, 0.5)
        ]
    );

    assert!(parse_spawn_policy("diagonal:1").is_err());
    assert!(parse_spawn_policy("up_down").is_err());
    assert!(parse_spawn_policy("up_down:lots").is_err());
    assert!(parse_spawn_policy("").is_err());
}

#[test]
fn test_spawn_rule_directions() {
    assert_eq!(SpawnRule::UpDown.allowed_directions().len(), 2);
    assert_eq!(SpawnRule::LeftRight.allowed_directions().len(), 2);
    assert_eq!(SpawnRule::AllDirections.allowed_directions().len(), 4);
    assert!(SpawnRule::None.allowed_directions().is_empty());
}
