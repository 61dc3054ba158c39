use bot_core::config::BotConfig;
use bot_core::controller::Controller;
use bot_core::engine::{GameEngine, Team, UnitKind};
use bot_core::grid::{Cell, Planet, PlanetMap};
use bot_core::sandbox::SandboxEngine;
use bot_core::squad::{Action, ActionKind, FollowUp, SquadState};
use bot_test_utils::fixtures::{quiet_config, run_ticks};

#[test]
fn move_then_attack_on_empty_target_frees_the_squad() {
    let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 12, 12), Team::Red);
    engine.spawn(UnitKind::Knight, Team::Red, Cell::new(1, 1));
    let mut controller = Controller::new(quiet_config(), &engine);

    run_ticks(&mut controller, &mut engine, 1);
    let squad = controller.context().squads.squads().next().unwrap().id;
    assert_eq!(controller.context().squads.count(SquadState::Free), 1);

    controller
        .context_mut()
        .squads
        .enqueue(Action::new(ActionKind::Move, Cell::new(9, 9)).then(FollowUp::ThenAttack));
    run_ticks(&mut controller, &mut engine, 1);

    let squads = &controller.context().squads;
    assert_eq!(squads.squad(squad).unwrap().state, SquadState::Committed);
    assert!(squads.plan().is_empty(), "move is one-shot");
    assert_eq!(squads.next_action(squad).map(|a| a.kind), Some(ActionKind::Attack));

    let mut saw_attack = false;
    let mut freed = false;
    for _ in 0..30 {
        run_ticks(&mut controller, &mut engine, 1);
        let squads = &controller.context().squads;
        saw_attack |= squads.plan().iter().any(|a| a.kind == ActionKind::Attack);
        if squads.squad(squad).unwrap().state == SquadState::Free {
            freed = true;
            break;
        }
    }

    assert!(saw_attack);
    assert!(freed);
    let squads = &controller.context().squads;
    assert!(squads.plan().is_empty());
    assert!(squads.next_action(squad).is_none());
    let knight = engine.units_of(Team::Red)[0].cell_on(Planet::Earth).unwrap();
    // Arrived next to the target, then possibly wandered one step once freed.
    assert!(knight.chebyshev(Cell::new(9, 9)) <= 2);
}

#[test]
fn squad_boards_rocket_and_launches() {
    let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 10, 10), Team::Red);
    let rocket = engine.spawn(UnitKind::Rocket, Team::Red, Cell::new(5, 5));
    engine.spawn(UnitKind::Knight, Team::Red, Cell::new(4, 5));
    engine.spawn(UnitKind::Knight, Team::Red, Cell::new(6, 5));
    let config = BotConfig {
        embark_from_round: 0,
        ..quiet_config()
    };
    let mut controller = Controller::new(config, &engine);

    let reports = run_ticks(&mut controller, &mut engine, 5);
    let launches: u32 = reports.iter().map(|r| r.squads.launches).sum();
    let loads: u32 = reports.iter().map(|r| r.squads.loads).sum();

    assert_eq!(loads, 2);
    assert_eq!(launches, 1);
    let location = engine.unit(rocket).unwrap().location.map_location().unwrap();
    assert_eq!(location.planet, Planet::Mars);
    assert_eq!(controller.context().squads.squads().count(), 0);
}

#[test]
fn scouts_spot_enemy_factory_and_squad_attacks_it() {
    let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 14, 14), Team::Red);
    engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(6, 6));
    engine.spawn(UnitKind::Knight, Team::Red, Cell::new(2, 2));
    engine.spawn(UnitKind::Knight, Team::Red, Cell::new(3, 2));
    let enemy = engine.spawn(UnitKind::Factory, Team::Blue, Cell::new(10, 10));
    let config = BotConfig {
        scout_quota: 1,
        ..BotConfig::default()
    };
    let mut controller = Controller::new(config, &engine);

    let reports = run_ticks(&mut controller, &mut engine, 40);

    assert_eq!(controller.context().scouts.scouts(), &[1]);
    assert!(reports.iter().any(|r| r.sightings > 0));
    assert!(reports.iter().any(|r| r.squads.planned > 0));
    let health = engine.unit(enemy).map_or(0, |u| u.health);
    assert!(health < 300);
}
