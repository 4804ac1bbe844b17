use rescue_world_core::{
    Action, Entity, KeyColor, MissionStatus, Position, RescueConfig, RescueEnvironment,
    entity::EMPTY_INDEX, infer_room_size, load_level_from_string,
};

fn play(map: &str) -> RescueEnvironment {
    let level = load_level_from_string(map, 5).expect("scenario parses");
    RescueEnvironment::with_level(RescueConfig::default(), level).expect("scenario has an agent")
}

const STACKED_ROOMS: &str = "
    WL WL WL WL WL WL WL WL WL
    WL A> V^ .. WL .. .. .. WL
    WL .. .. .. WL .. .. .. WL
    WL .. .. .. WL .. .. .. WL
    WL WL DR WL WL WL WL WL WL
    WL .. .. .. WL .. .. .. WL
    WL .. .. .. WL .. .. .. WL
    WL .. .. .. WL .. .. .. WL
    WL WL WL WL WL WL WL WL WL
";

#[test]
fn mission_completes_only_after_leaving_the_start_room() {
    let mut env = play(STACKED_ROOMS);
    let rescue = env.step(Action::Pickup);
    assert_eq!(rescue.reward, 1.0);
    assert_eq!(rescue.info.status, MissionStatus::Continue);

    for action in [
        Action::Right,
        Action::Forward,
        Action::Forward,
        Action::Left,
        Action::Forward,
        Action::Right,
    ] {
        let result = env.step(action);
        assert_eq!(result.info.status, MissionStatus::Continue);
        assert_eq!(env.get_mission_status().status, MissionStatus::Continue);
    }
    // Closed door ahead.
    env.step(Action::Forward);
    assert_eq!(env.level().agent_pos(), Some(Position::new(2, 3)));
    env.step(Action::Toggle);

    let exit = env.step(Action::Forward);
    assert_eq!(env.level().agent_pos(), Some(Position::new(2, 4)));
    assert_eq!(exit.info.status, MissionStatus::Success);
    assert!(exit.info.mission_complete);
    assert!(exit.terminated);
    assert_eq!(env.step_count(), 10);
    let expected = 1.0 - 0.9 * (10.0 / env.max_steps() as f64);
    assert!((exit.reward - expected).abs() < 1e-9);
}

const BEHIND_LOCK: &str = "
    WL WL WL WL WL WL WL WL WL
    WL A> KB .. LB .. V> .. WL
    WL .. .. .. WL .. .. .. WL
    WL .. FR^ .. WL .. .. .. WL
    WL WL WL WL WL WL WL WL WL
";

#[test]
fn locked_door_opens_with_its_key() {
    let mut env = play(BEHIND_LOCK);
    let pickup = env.step(Action::Pickup);
    assert_eq!(pickup.reward, 0.0);
    assert_eq!(
        pickup.observation.carrying,
        Some(Entity::Key {
            color: KeyColor::Blue
        })
    );

    env.step(Action::Forward);
    env.step(Action::Forward);
    env.step(Action::Forward);
    assert_eq!(env.level().agent_pos(), Some(Position::new(3, 1)));
    env.step(Action::Toggle);
    env.step(Action::Forward);
    env.step(Action::Forward);
    assert_eq!(env.level().agent_pos(), Some(Position::new(5, 1)));

    // The last real victim, rescued outside the start room: pickup bonus.
    let last = env.step(Action::Pickup);
    assert_eq!(last.reward, 2.0);
    assert!(last.terminated);
    assert!(last.info.mission_complete);
    assert_eq!(env.get_mission_status().saved_victims, 1);
}

#[test]
fn locked_door_stays_shut_without_the_key() {
    let mut env = play(&BEHIND_LOCK.replace("KB", ".."));
    env.step(Action::Forward);
    env.step(Action::Forward);
    env.step(Action::Toggle);
    let bump = env.step(Action::Forward);
    assert_eq!(bump.observation.agent.position, Position::new(3, 1));
    assert_eq!(bump.info.status, MissionStatus::Continue);
}

#[test]
fn fake_victims_cost_points_but_never_count() {
    let mut env = play(BEHIND_LOCK);
    env.step(Action::Right);
    env.step(Action::Forward);
    env.step(Action::Left);
    env.step(Action::Forward);
    env.step(Action::Right);
    // Facing the fake victim at (2, 3) from (2, 2).
    let fake = env.step(Action::Pickup);
    assert_eq!(fake.reward, -0.5);
    assert_eq!(fake.observation.objects[Position::new(2, 3)], EMPTY_INDEX);
    let report = env.get_mission_status();
    assert_eq!(report.saved_victims, 0);
    assert_eq!(report.remaining_victims, 1);
    assert_eq!(env.score(), -0.5);
}

#[test]
fn done_is_a_no_op() {
    let mut env = play(STACKED_ROOMS);
    let before = env.level().agent();
    let result = env.step(Action::Done);
    assert_eq!(env.level().agent(), before);
    assert_eq!(result.reward, 0.0);
    assert!(!result.terminated);
}

const DEMO_MAP: &str = include_str!("../../maps/rescue_demo.txt");

#[test]
fn shipped_demo_map_is_playable() {
    let room_size = infer_room_size(DEMO_MAP).expect("demo walls form a lattice");
    assert_eq!(room_size, 6);
    let level = load_level_from_string(DEMO_MAP, room_size).expect("demo map parses");
    assert_eq!((level.num_rows(), level.num_cols()), (2, 2));
    assert_eq!(level.check_objs_reachable(), Ok(()));
    let env = RescueEnvironment::with_level(RescueConfig::default(), level).unwrap();
    assert_eq!(env.get_mission_status().remaining_victims, 4);
}
