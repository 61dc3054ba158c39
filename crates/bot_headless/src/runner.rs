//! Single match runner.
//!
//! Plays the controller against a sandbox built from a [`Scenario`] and
//! folds the per-tick reports into a [`MatchSummary`].

use bot_core::config::BotConfig;
use bot_core::controller::{Controller, TickReport};
use bot_core::engine::{GameEngine, Team, UnitKind};
use bot_core::sandbox::SandboxEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::Scenario;

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Every own unit on Earth is gone.
    Eliminated,
    /// Every enemy unit is gone.
    EnemyEliminated,
    /// `max_rounds` was reached.
    RoundLimit,
}

/// Totals over a whole match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Scenario name.
    pub scenario: String,
    /// Seed for the map and the controller.
    pub seed: u64,
    /// How the match ended.
    pub outcome: MatchOutcome,
    /// Rounds actually played.
    pub rounds: u32,
    /// Karbonite left at the end.
    pub final_karbonite: u32,
    /// Own robots alive at the end, on any planet.
    pub robots: u32,
    /// Own built factories at the end.
    pub factories: u32,
    /// Own built rockets still on Earth at the end.
    pub rockets: u32,
    /// Enemy units alive at the end.
    pub enemy_units: u32,
    /// Structures finished.
    pub structures_completed: u32,
    /// Harvest actions.
    pub harvests: u32,
    /// Robots produced.
    pub produced: u32,
    /// New enemy sightings.
    pub sightings: u32,
    /// Attacks landed.
    pub attacks: u32,
    /// Heals landed.
    pub heals: u32,
    /// Rockets launched.
    pub launches: u32,
}

impl MatchSummary {
    fn new(scenario: &Scenario, seed: u64) -> Self {
        Self {
            scenario: scenario.name.clone(),
            seed,
            outcome: MatchOutcome::RoundLimit,
            rounds: 0,
            final_karbonite: 0,
            robots: 0,
            factories: 0,
            rockets: 0,
            enemy_units: 0,
            structures_completed: 0,
            harvests: 0,
            produced: 0,
            sightings: 0,
            attacks: 0,
            heals: 0,
            launches: 0,
        }
    }

    fn absorb(&mut self, tick: &TickReport) {
        self.rounds += 1;
        self.structures_completed += tick.construction.completed;
        self.harvests += tick.harvest.harvested;
        self.produced += tick.production.produced;
        self.sightings += tick.sightings;
        self.attacks += tick.squads.attacks;
        self.heals += tick.squads.heals;
        self.launches += tick.squads.launches;
    }

    fn finish(&mut self, engine: &SandboxEngine) {
        let planet = engine.planet();
        let own = engine.my_units();
        let built = |kind: UnitKind| own.iter().filter(move |u| u.kind == kind && u.is_built);

        self.final_karbonite = engine.karbonite();
        self.robots = count(own.iter().filter(|u| u.kind.is_robot()).count());
        self.factories = count(built(UnitKind::Factory).count());
        self.rockets = count(
            built(UnitKind::Rocket)
                .filter(|u| u.cell_on(planet).is_some())
                .count(),
        );
        self.enemy_units = count(engine.units_of(engine.team().enemy()).len());
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Optional per-tick hook, used to stream reports.
pub type TickObserver<'a> = &'a mut dyn FnMut(&TickReport);

/// Play one match.
///
/// The controller runs with the scenario's bot config, reseeded with
/// `seed` so the map and the controller's random choices move together.
pub fn run_match(scenario: &Scenario, seed: u64, mut observer: Option<TickObserver<'_>>) -> MatchSummary {
    let mut engine = scenario.build_engine(seed);
    let config = BotConfig {
        seed,
        ..scenario.bot.clone()
    };
    let mut controller = Controller::new(config, &engine);
    let mut summary = MatchSummary::new(scenario, seed);

    info!(scenario = %scenario.name, seed, max_rounds = scenario.max_rounds, "Match started");

    for _ in 0..scenario.max_rounds {
        if !has_local_units(&engine, Team::Red) {
            summary.outcome = MatchOutcome::Eliminated;
            break;
        }
        if engine.units_of(Team::Blue).is_empty() {
            summary.outcome = MatchOutcome::EnemyEliminated;
            break;
        }

        let report = controller.tick(&mut engine);
        summary.absorb(&report);
        if let Some(observe) = observer.as_mut() {
            observe(&report);
        }
        engine.advance_round();
    }

    summary.finish(&engine);
    debug!(?summary, "Match summary");
    info!(
        seed,
        outcome = ?summary.outcome,
        rounds = summary.rounds,
        robots = summary.robots,
        "Match finished"
    );
    summary
}

fn has_local_units(engine: &SandboxEngine, team: Team) -> bool {
    let planet = engine.planet();
    engine
        .units_of(team)
        .iter()
        .any(|u| u.cell_on(planet).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::UnitPlacement;

    fn short_skirmish(rounds: u32) -> Scenario {
        Scenario {
            max_rounds: rounds,
            wall_percent: 0,
            ..Scenario::skirmish()
        }
    }

    #[test]
    fn test_match_runs_to_round_limit() {
        let summary = run_match(&short_skirmish(40), 3, None);
        assert_eq!(summary.outcome, MatchOutcome::RoundLimit);
        assert_eq!(summary.rounds, 40);
        assert!(summary.harvests > 0);
        assert!(summary.robots >= 3);
    }

    #[test]
    fn test_same_seed_same_summary() {
        let scenario = short_skirmish(60);
        assert_eq!(run_match(&scenario, 8, None), run_match(&scenario, 8, None));
    }

    #[test]
    fn test_observer_sees_every_tick() {
        let mut rounds = Vec::new();
        let mut observe = |r: &TickReport| rounds.push(r.round);
        let observer: TickObserver<'_> = &mut observe;
        run_match(&short_skirmish(5), 1, Some(observer));
        assert_eq!(rounds, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_enemy_ends_immediately() {
        let scenario = Scenario {
            units: vec![UnitPlacement::new(UnitKind::Worker, Team::Red, 1, 1)],
            ..short_skirmish(50)
        };
        let summary = run_match(&scenario, 0, None);
        assert_eq!(summary.outcome, MatchOutcome::EnemyEliminated);
        assert_eq!(summary.rounds, 0);
    }

    #[test]
    fn test_count_saturates() {
        assert_eq!(count(7), 7);
        assert_eq!(count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let summary = run_match(&short_skirmish(3), 2, None);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"outcome\":\"RoundLimit\""));
        let back: MatchSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
