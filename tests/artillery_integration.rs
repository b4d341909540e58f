//! Artillery scheduling through the battle controller

use iron_front::battle::*;
use iron_front::core::BattleError;

fn battle() -> BattleState {
    let mut field = Battlefield::new(BattleMap::new(12, 12));
    field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(1, 1));
    field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(10, 10));
    BattleState::new(field, Rules::default(), 17)
}

/// Player ends, enemy ends: one full turn advance
fn next_turn(state: &mut BattleState) {
    state.apply_action(Action::EndTurn).unwrap();
    state.apply_action(Action::EndTurn).unwrap();
}

fn strike_events(state: &BattleState, team: Team) -> Vec<StrikeEvent> {
    state
        .log
        .iter()
        .filter_map(|e| match &e.event_type {
            BattleEventType::Strike { team: t, event } if *t == team => Some(event.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_light_barrage_lands_next_turn_and_ends() {
    let mut state = battle();
    let strike = match state
        .apply_action(Action::RequestStrike {
            team: Team::Player,
            strike_type: StrikeType::LightBarrage,
            target: GridCoord::new(10, 10),
        })
        .unwrap()
    {
        ActionOutcome::StrikeRequested(strike) => strike,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(strike.impact_turn, 2);
    assert_eq!(state.player.artillery.points, 100);
    assert!(state.player.artillery.active.is_empty());

    next_turn(&mut state);
    assert_eq!(state.player.artillery.active.len(), 1);
    assert!(matches!(
        strike_events(&state, Team::Player).as_slice(),
        [StrikeEvent::StrikeLanded { .. }]
    ));

    next_turn(&mut state);
    assert!(state.player.artillery.active.is_empty());
    assert!(matches!(
        strike_events(&state, Team::Player).last(),
        Some(StrikeEvent::BarrageEnded { .. })
    ));
    assert_eq!(state.player.artillery.points, 150);
}

#[test]
fn test_heavy_barrage_needs_spotter() {
    let mut state = battle();
    let request = Action::RequestStrike {
        team: Team::Player,
        strike_type: StrikeType::HeavyBarrage,
        target: GridCoord::new(6, 6),
    };

    let result = state.apply_action(request.clone());
    assert!(matches!(result, Err(BattleError::InvalidUnitState(_))));
    assert_eq!(state.player.artillery.points, 150);

    state.field.units.spawn(UnitType::Officer, Team::Player, GridCoord::new(0, 0));
    assert!(state.apply_action(request).is_ok());
    assert_eq!(state.player.artillery.points, 50);

    // Delay two: lands on the second advance and leaves a crater
    next_turn(&mut state);
    assert!(!state.field.map.is_crater(GridCoord::new(6, 6)));
    next_turn(&mut state);
    assert_eq!(state.field.map.terrain_at(GridCoord::new(6, 6)), Some(TerrainType::Crater));
}

#[test]
fn test_smoke_barrage_blinds_immediately() {
    let mut state = battle();
    state.field.units.get_mut(UnitId(1)).unwrap().position = GridCoord::new(2, 1);

    state
        .apply_action(Action::RequestStrike {
            team: Team::Enemy,
            strike_type: StrikeType::SmokeBarrage,
            target: GridCoord::new(2, 1),
        })
        .unwrap_err();

    state
        .apply_action(Action::RequestStrike {
            team: Team::Player,
            strike_type: StrikeType::SmokeBarrage,
            target: GridCoord::new(2, 1),
        })
        .unwrap();
    assert!(state.field.map.is_smoked(GridCoord::new(2, 1)));

    let attack = state.apply_action(Action::Attack {
        attacker: UnitId(0),
        defender: UnitId(1),
    });
    assert!(matches!(attack, Err(BattleError::InvalidTarget(_))));

    // Smoke costs no hit points
    assert_eq!(state.field.units.get(UnitId(0)).unwrap().hp, 5);
    assert_eq!(state.field.units.get(UnitId(1)).unwrap().hp, 5);
}

#[test]
fn test_creeping_barrage_moves_twice() {
    let mut state = battle();
    state.field.units.spawn(UnitType::Officer, Team::Player, GridCoord::new(0, 0));
    state
        .apply_action(Action::RequestStrike {
            team: Team::Player,
            strike_type: StrikeType::CreepingBarrage,
            target: GridCoord::new(6, 3),
        })
        .unwrap();

    for _ in 0..5 {
        next_turn(&mut state);
    }

    let events = strike_events(&state, Team::Player);
    let moves: Vec<(GridCoord, GridCoord)> = events
        .iter()
        .filter_map(|e| match e {
            StrikeEvent::BarrageMoved { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        moves,
        vec![
            (GridCoord::new(6, 3), GridCoord::new(6, 4)),
            (GridCoord::new(6, 4), GridCoord::new(6, 5)),
        ]
    );
    assert!(state.player.artillery.active.is_empty());
}

#[test]
fn test_cooldown_blocks_repeat_request() {
    let mut state = battle();
    let request = Action::RequestStrike {
        team: Team::Player,
        strike_type: StrikeType::LightBarrage,
        target: GridCoord::new(8, 8),
    };
    state.apply_action(request.clone()).unwrap();
    let again = state.apply_action(request);
    assert!(matches!(again, Err(BattleError::InsufficientResources(_))));
    assert_eq!(state.player.artillery.points, 100);
}
