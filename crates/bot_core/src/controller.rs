//! The per-round entry point.
//!
//! [`Controller::tick`] runs one full decision pass against the engine.
//! Phases always run in the same order and each one only sees workers the
//! earlier phases left in the pool.

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::config::BotConfig;
use crate::construction::{self, ConstructionReport};
use crate::context::SimContext;
use crate::engine::GameEngine;
use crate::harvest::{self, HarvestReport};
use crate::production::{self, ProductionReport};
use crate::squad::{opportunistic_attacks, SquadReport, SquadState};

/// Everything one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Round the tick ran in.
    pub round: u32,
    /// Karbonite at the start of the tick.
    pub karbonite: u32,
    /// Units lost from the scout roster.
    pub scouts_lost: u32,
    /// New enemy sightings.
    pub sightings: u32,
    /// Construction phase.
    pub construction: ConstructionReport,
    /// Harvest phase.
    pub harvest: HarvestReport,
    /// Production phase.
    pub production: ProductionReport,
    /// Squad phase.
    pub squads: SquadReport,
    /// Squads without orders after the tick.
    pub free_squads: u32,
    /// Squads with orders after the tick.
    pub committed_squads: u32,
}

/// Owns the match state and drives it one round at a time.
#[derive(Debug, Clone)]
pub struct Controller {
    ctx: SimContext,
}

impl Controller {
    /// Set up for a new match.
    pub fn new<E: GameEngine + ?Sized>(config: BotConfig, engine: &E) -> Self {
        Self {
            ctx: SimContext::new(config, engine),
        }
    }

    /// Match state.
    #[must_use]
    pub const fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Mutable match state, for seeding orders from outside.
    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    /// Run one decision pass.
    pub fn tick<E: GameEngine + ?Sized>(&mut self, engine: &mut E) -> TickReport {
        let round = engine.round();
        let _span = info_span!("tick", round).entered();
        let ctx = &mut self.ctx;

        // 1. Snapshot: ledger, resource cache, idle workers, fresh units
        let mut snapshot = ctx.begin_tick(&*engine);
        let mut report = TickReport {
            round,
            karbonite: ctx.ledger.balance(),
            ..TickReport::default()
        };

        // 2. Scouting
        report.scouts_lost = count(ctx.scouts.drop_stale(&*engine));
        report.sightings = count(ctx.scouts.explore(engine, &mut ctx.rng, &mut ctx.sightings));

        // 3. Construction claims workers first
        report.construction = construction::run(engine, &ctx.config, &mut ctx.ledger, &mut snapshot);

        // 4. Whatever is left harvests
        report.harvest = harvest::run(engine, &ctx.resources, &mut snapshot.workers);

        // 5. Factories
        report.production = production::run(
            engine,
            &ctx.config,
            &mut ctx.ledger,
            &mut ctx.army_cursor,
            &snapshot,
        );

        // 6. Squads
        let mut squads = SquadReport::default();
        ctx.squads.drop_stale(&*engine);
        let recruits = ctx.scouts.enlist(snapshot.fresh.clone());
        if ctx.squads.enlist(&recruits).is_some() {
            squads.formed += 1;
        }
        squads.planned = ctx
            .squads
            .plan_orders(&ctx.config, &mut ctx.sightings, &snapshot);
        ctx.squads.execute(engine, &ctx.config, &mut ctx.rng, &mut squads);
        ctx.squads.service(engine, &mut ctx.rng, &mut squads);
        ctx.squads.retry_launches(engine, &mut ctx.rng, &mut squads);
        opportunistic_attacks(engine, &mut squads);
        report.squads = squads;
        report.free_squads = count(ctx.squads.count(SquadState::Free));
        report.committed_squads = count(ctx.squads.count(SquadState::Committed));

        #[cfg(feature = "debug-validation")]
        for problem in ctx.invariant_violations(&snapshot) {
            tracing::warn!(round, problem = %problem, "Invariant violated");
        }

        debug!(
            round,
            karbonite = report.karbonite,
            projects = ctx.ledger.projects().count(),
            plan = ctx.squads.plan().len(),
            "Tick complete"
        );
        report
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Team, UnitKind};
    use crate::grid::{Cell, Planet, PlanetMap};
    use crate::sandbox::SandboxEngine;

    fn small_match() -> SandboxEngine {
        let mut map = PlanetMap::new(Planet::Earth, 16, 16);
        map.set_initial_karbonite(Cell::new(3, 3), 100);
        map.set_initial_karbonite(Cell::new(12, 12), 100);
        let mut engine = SandboxEngine::new(map, Team::Red);
        engine.set_karbonite(250);
        engine.spawn(UnitKind::Worker, Team::Red, Cell::new(1, 1));
        engine.spawn(UnitKind::Worker, Team::Red, Cell::new(2, 1));
        engine.spawn(UnitKind::Worker, Team::Red, Cell::new(1, 2));
        engine
    }

    #[test]
    fn test_first_tick_opens_project_and_mines() {
        let mut engine = small_match();
        let mut controller = Controller::new(BotConfig::default(), &engine);

        let report = controller.tick(&mut engine);
        assert_eq!(report.round, 1);
        assert_eq!(report.karbonite, 250);
        assert_eq!(report.construction.opened, 1);
        let claimed = report.construction.workers_claimed;
        let harvesting = report.harvest.harvested + report.harvest.travelling + report.harvest.idle;
        assert_eq!(claimed + harvesting, 3);

        engine.advance_round();
        let snapshot = controller.context_mut().begin_tick(&engine);
        assert!(controller.context().invariant_violations(&snapshot).is_empty());
    }

    #[test]
    fn test_ticks_are_deterministic_for_a_seed() {
        let run = |seed: u64| {
            let mut engine = small_match();
            let config = BotConfig {
                seed,
                ..BotConfig::default()
            };
            let mut controller = Controller::new(config, &engine);
            let mut reports = Vec::new();
            for _ in 0..30 {
                reports.push(controller.tick(&mut engine));
                engine.advance_round();
            }
            (reports, engine.units_of(Team::Red))
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_fresh_soldiers_become_a_squad() {
        let mut engine = SandboxEngine::new(PlanetMap::new(Planet::Earth, 10, 10), Team::Red);
        engine.spawn(UnitKind::Knight, Team::Red, Cell::new(4, 4));
        engine.spawn(UnitKind::Knight, Team::Red, Cell::new(5, 4));
        let config = BotConfig {
            scout_quota: 0,
            ..BotConfig::default()
        };
        let mut controller = Controller::new(config, &engine);

        let report = controller.tick(&mut engine);
        assert_eq!(report.squads.formed, 1);
        assert_eq!(report.free_squads, 1);
        assert_eq!(controller.context().squads.all_members().count(), 2);

        engine.advance_round();
        let report = controller.tick(&mut engine);
        assert_eq!(report.squads.formed, 0);
    }
}
