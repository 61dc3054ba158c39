//! Deterministic in-memory engine implementing [`GameEngine`].
//!
//! The sandbox exists so the controller can be driven end to end in tests
//! and in the headless runner. Its rules are intentionally small: one
//! move and one action per robot per round, instant production, a flat
//! harvest amount and linear construction. It has no fog of war except
//! cells explicitly hidden with [`SandboxEngine::hide`].
//!
//! Units are stored by id in a `BTreeMap` so every query iterates in a
//! stable order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::engine::{EngineResult, GameEngine, Team, UnitId, UnitInfo, UnitKind, UnitLocation};
use crate::error::EngineError;
use crate::grid::{Cell, Direction, MapLocation, Planet, PlanetMap};

/// Karbonite mined per harvest action.
pub const HARVEST_AMOUNT: u32 = 3;

/// Health restored per heal.
pub const HEAL_AMOUNT: u32 = 10;

/// Static per-kind numbers used by the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindStats {
    /// Maximum health.
    pub max_health: u32,
    /// Squared attack/heal range.
    pub attack_range: u32,
    /// Squared vision range.
    pub vision_range: u32,
    /// Damage per attack; zero for non-combatants.
    pub damage: u32,
    /// Garrison capacity; zero for robots.
    pub capacity: u32,
    /// Karbonite cost.
    pub cost: u32,
}

impl KindStats {
    /// Sandbox stats for a unit kind.
    #[must_use]
    pub const fn of(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Worker => Self::robot(100, 0, 50, 0, 50),
            UnitKind::Knight => Self::robot(250, 2, 50, 60, 40),
            UnitKind::Ranger => Self::robot(200, 50, 70, 40, 40),
            UnitKind::Mage => Self::robot(80, 30, 30, 60, 40),
            UnitKind::Healer => Self::robot(100, 30, 50, 0, 40),
            UnitKind::Factory => Self::structure(300, 8, 200),
            UnitKind::Rocket => Self::structure(200, 8, 150),
        }
    }

    const fn robot(max_health: u32, attack_range: u32, vision_range: u32, damage: u32, cost: u32) -> Self {
        Self {
            max_health,
            attack_range,
            vision_range,
            damage,
            capacity: 0,
            cost,
        }
    }

    const fn structure(max_health: u32, capacity: u32, cost: u32) -> Self {
        Self {
            max_health,
            attack_range: 0,
            vision_range: 2,
            damage: 0,
            capacity,
            cost,
        }
    }
}

#[derive(Debug, Clone)]
struct SandboxUnit {
    id: UnitId,
    kind: UnitKind,
    team: Team,
    location: UnitLocation,
    health: u32,
    is_built: bool,
    garrison: Vec<UnitId>,
    /// First round a move is allowed again.
    move_ready: u32,
    /// First round an attack/heal/worker action is allowed again.
    action_ready: u32,
}

impl SandboxUnit {
    fn stats(&self) -> KindStats {
        KindStats::of(self.kind)
    }

    fn to_info(&self) -> UnitInfo {
        let stats = self.stats();
        UnitInfo {
            id: self.id,
            kind: self.kind,
            team: self.team,
            location: self.location,
            health: self.health,
            max_health: stats.max_health,
            attack_range: stats.attack_range,
            vision_range: stats.vision_range,
            is_built: self.is_built,
            garrison: self.garrison.clone(),
            capacity: stats.capacity,
        }
    }
}

/// In-memory two-planet match.
#[derive(Debug, Clone)]
pub struct SandboxEngine {
    round: u32,
    team: Team,
    planet: Planet,
    earth: PlanetMap,
    mars: PlanetMap,
    /// Live karbonite deposits on the home planet.
    deposits: BTreeMap<Cell, u32>,
    hidden: HashSet<Cell>,
    karbonite: HashMap<Team, u32>,
    income_per_round: u32,
    units: BTreeMap<UnitId, SandboxUnit>,
    occupancy: HashMap<MapLocation, UnitId>,
    next_id: UnitId,
    pending_failure: Option<String>,
}

impl SandboxEngine {
    /// Create a match on `earth` for `team`, with an open Mars of the same size.
    #[must_use]
    pub fn new(earth: PlanetMap, team: Team) -> Self {
        let mars = PlanetMap::new(Planet::Mars, earth.width(), earth.height());
        let deposits = earth
            .cells()
            .filter_map(|c| {
                let amount = earth.initial_karbonite(c);
                (amount > 0).then_some((c, amount))
            })
            .collect();

        Self {
            round: 1,
            team,
            planet: Planet::Earth,
            earth,
            mars,
            deposits,
            hidden: HashSet::new(),
            karbonite: HashMap::from([(Team::Red, 0), (Team::Blue, 0)]),
            income_per_round: 0,
            units: BTreeMap::new(),
            occupancy: HashMap::new(),
            next_id: 1,
            pending_failure: None,
        }
    }

    /// Replace the Mars map.
    #[must_use]
    pub fn with_mars(mut self, mars: PlanetMap) -> Self {
        self.mars = mars;
        self
    }

    /// Set the karbonite balance of the controlled team.
    pub fn set_karbonite(&mut self, amount: u32) {
        self.karbonite.insert(self.team, amount);
    }

    /// Karbonite added to every team at the end of each round.
    pub fn set_income(&mut self, per_round: u32) {
        self.income_per_round = per_round;
    }

    /// Set the live deposit at a home-planet cell.
    pub fn set_deposit(&mut self, cell: Cell, amount: u32) {
        if amount == 0 {
            self.deposits.remove(&cell);
        } else {
            self.deposits.insert(cell, amount);
        }
    }

    /// Make a cell invisible to `karbonite_at`.
    pub fn hide(&mut self, cell: Cell) {
        self.hidden.insert(cell);
    }

    /// Make the next mutating call fail with `reason`.
    pub fn reject_next_call(&mut self, reason: impl Into<String>) {
        self.pending_failure = Some(reason.into());
    }

    /// Move to the next round.
    pub fn advance_round(&mut self) {
        self.round += 1;
        if self.income_per_round > 0 {
            for balance in self.karbonite.values_mut() {
                *balance += self.income_per_round;
            }
        }
    }

    /// Spawn a finished unit on the home planet.
    ///
    /// The cell is not validated; tests may stack units deliberately.
    pub fn spawn(&mut self, kind: UnitKind, team: Team, cell: Cell) -> UnitId {
        let loc = MapLocation::new(self.planet, cell);
        self.insert(kind, team, UnitLocation::OnMap(loc), true)
    }

    /// Spawn an unfinished structure on the home planet.
    pub fn spawn_blueprint(&mut self, kind: UnitKind, team: Team, cell: Cell) -> UnitId {
        let loc = MapLocation::new(self.planet, cell);
        self.insert(kind, team, UnitLocation::OnMap(loc), false)
    }

    /// Spawn a robot directly into a structure's garrison.
    pub fn spawn_in_garrison(&mut self, structure: UnitId, kind: UnitKind) -> Option<UnitId> {
        let team = self.units.get(&structure)?.team;
        let id = self.insert(kind, team, UnitLocation::Garrisoned(structure), true);
        if let Some(holder) = self.units.get_mut(&structure) {
            holder.garrison.push(id);
        }
        Some(id)
    }

    /// Remove a unit (and anything garrisoned inside it).
    pub fn kill(&mut self, id: UnitId) {
        let Some(unit) = self.units.remove(&id) else {
            return;
        };
        if let UnitLocation::OnMap(loc) = unit.location {
            self.occupancy.remove(&loc);
        }
        if let UnitLocation::Garrisoned(holder) = unit.location {
            if let Some(h) = self.units.get_mut(&holder) {
                h.garrison.retain(|&g| g != id);
            }
        }
        for inner in unit.garrison {
            self.kill(inner);
        }
    }

    /// Override a unit's health.
    pub fn set_health(&mut self, id: UnitId, health: u32) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.health = health.min(unit.stats().max_health);
        }
    }

    /// Karbonite balance of any team.
    #[must_use]
    pub fn karbonite_of(&self, team: Team) -> u32 {
        self.karbonite.get(&team).copied().unwrap_or(0)
    }

    /// Unit standing on a home-planet cell.
    #[must_use]
    pub fn unit_at(&self, cell: Cell) -> Option<UnitInfo> {
        let id = self.occupancy.get(&MapLocation::new(self.planet, cell))?;
        self.units.get(id).map(SandboxUnit::to_info)
    }

    /// All units of a team in id order.
    #[must_use]
    pub fn units_of(&self, team: Team) -> Vec<UnitInfo> {
        self.units
            .values()
            .filter(|u| u.team == team)
            .map(SandboxUnit::to_info)
            .collect()
    }

    fn insert(&mut self, kind: UnitKind, team: Team, location: UnitLocation, built: bool) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;

        let stats = KindStats::of(kind);
        let health = if built {
            stats.max_health
        } else {
            stats.max_health / 4
        };
        if let UnitLocation::OnMap(loc) = location {
            self.occupancy.insert(loc, id);
        }
        self.units.insert(
            id,
            SandboxUnit {
                id,
                kind,
                team,
                location,
                health,
                is_built: built,
                garrison: Vec::new(),
                move_ready: self.round,
                action_ready: self.round,
            },
        );
        id
    }

    fn map_of(&self, planet: Planet) -> &PlanetMap {
        match planet {
            Planet::Earth => &self.earth,
            Planet::Mars => &self.mars,
        }
    }

    fn is_free(&self, loc: MapLocation) -> bool {
        self.map_of(loc.planet).is_passable(loc.cell) && !self.occupancy.contains_key(&loc)
    }

    fn on_map(&self, id: UnitId) -> Option<(&SandboxUnit, MapLocation)> {
        let unit = self.units.get(&id)?;
        let loc = unit.location.map_location()?;
        Some((unit, loc))
    }

    /// Both on the same planet and within `range_sq` of each other.
    fn within(&self, a: UnitId, b: UnitId, range_sq: u32) -> bool {
        match (self.on_map(a), self.on_map(b)) {
            (Some((_, la)), Some((_, lb))) => {
                la.planet == lb.planet && la.cell.distance_squared(lb.cell) <= range_sq
            }
            _ => false,
        }
    }

    fn action_ready(&self, id: UnitId) -> bool {
        self.units.get(&id).is_some_and(|u| u.action_ready <= self.round)
    }

    fn relocate(&mut self, id: UnitId, location: UnitLocation) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        if let UnitLocation::OnMap(old) = unit.location {
            self.occupancy.remove(&old);
        }
        unit.location = location;
        if let UnitLocation::OnMap(new) = location {
            self.occupancy.insert(new, id);
        }
    }

    /// Consume an injected failure, then check the call's precondition.
    fn gate(&mut self, action: &'static str, precondition: bool) -> EngineResult {
        if let Some(reason) = self.pending_failure.take() {
            return Err(EngineError::rejected(action, reason));
        }
        if precondition {
            Ok(())
        } else {
            Err(EngineError::rejected(action, "precondition not met"))
        }
    }

    fn spend(&mut self, team: Team, amount: u32) {
        if let Some(balance) = self.karbonite.get_mut(&team) {
            *balance = balance.saturating_sub(amount);
        }
    }
}

impl GameEngine for SandboxEngine {
    fn round(&self) -> u32 {
        self.round
    }

    fn team(&self) -> Team {
        self.team
    }

    fn planet(&self) -> Planet {
        self.planet
    }

    fn planet_map(&self, planet: Planet) -> &PlanetMap {
        self.map_of(planet)
    }

    fn karbonite(&self) -> u32 {
        self.karbonite_of(self.team)
    }

    fn karbonite_at(&self, cell: Cell) -> Option<u32> {
        if !self.earth.in_bounds(cell) || self.hidden.contains(&cell) {
            return None;
        }
        Some(self.deposits.get(&cell).copied().unwrap_or(0))
    }

    fn cost_of(&self, kind: UnitKind) -> u32 {
        KindStats::of(kind).cost
    }

    fn my_units(&self) -> Vec<UnitInfo> {
        self.units_of(self.team)
    }

    fn unit(&self, id: UnitId) -> Option<UnitInfo> {
        self.units.get(&id).map(SandboxUnit::to_info)
    }

    fn sense_nearby_units(&self, center: Cell, radius_squared: u32) -> Vec<UnitInfo> {
        self.units
            .values()
            .filter(|u| {
                u.location
                    .cell_on(self.planet)
                    .is_some_and(|c| c.distance_squared(center) <= radius_squared)
            })
            .map(SandboxUnit::to_info)
            .collect()
    }

    fn is_occupied(&self, cell: Cell) -> bool {
        self.occupancy
            .contains_key(&MapLocation::new(self.planet, cell))
    }

    fn is_move_ready(&self, unit: UnitId) -> bool {
        self.units
            .get(&unit)
            .is_some_and(|u| u.kind.is_robot() && u.move_ready <= self.round)
    }

    fn can_move(&self, unit: UnitId, dir: Direction) -> bool {
        if dir == Direction::Center {
            return false;
        }
        match self.on_map(unit) {
            Some((u, loc)) if u.kind.is_robot() => {
                self.is_free(MapLocation::new(loc.planet, loc.cell.add(dir)))
            }
            _ => false,
        }
    }

    fn is_attack_ready(&self, unit: UnitId) -> bool {
        self.units
            .get(&unit)
            .is_some_and(|u| u.stats().damage > 0 && u.action_ready <= self.round)
    }

    fn can_attack(&self, unit: UnitId, target: UnitId) -> bool {
        let (Some(attacker), Some(victim)) = (self.units.get(&unit), self.units.get(&target)) else {
            return false;
        };
        let stats = attacker.stats();
        stats.damage > 0 && attacker.team != victim.team && self.within(unit, target, stats.attack_range)
    }

    fn is_heal_ready(&self, unit: UnitId) -> bool {
        self.units
            .get(&unit)
            .is_some_and(|u| u.kind == UnitKind::Healer && u.action_ready <= self.round)
    }

    fn can_heal(&self, healer: UnitId, target: UnitId) -> bool {
        let (Some(h), Some(t)) = (self.units.get(&healer), self.units.get(&target)) else {
            return false;
        };
        h.kind == UnitKind::Healer
            && h.team == t.team
            && t.kind.is_robot()
            && self.within(healer, target, h.stats().attack_range)
    }

    fn can_blueprint(&self, worker: UnitId, kind: UnitKind, dir: Direction) -> bool {
        if !kind.is_structure() || dir == Direction::Center || !self.action_ready(worker) {
            return false;
        }
        match self.on_map(worker) {
            Some((w, loc)) if w.kind == UnitKind::Worker => {
                self.karbonite_of(w.team) >= KindStats::of(kind).cost
                    && self.is_free(MapLocation::new(loc.planet, loc.cell.add(dir)))
            }
            _ => false,
        }
    }

    fn can_build(&self, worker: UnitId, structure: UnitId) -> bool {
        let (Some(w), Some(s)) = (self.units.get(&worker), self.units.get(&structure)) else {
            return false;
        };
        w.kind == UnitKind::Worker
            && s.kind.is_structure()
            && !s.is_built
            && w.team == s.team
            && self.action_ready(worker)
            && self.within(worker, structure, 2)
    }

    fn can_harvest(&self, worker: UnitId, dir: Direction) -> bool {
        if !self.action_ready(worker) {
            return false;
        }
        match self.on_map(worker) {
            Some((w, loc)) if w.kind == UnitKind::Worker && loc.planet == self.planet => self
                .deposits
                .get(&loc.cell.add(dir))
                .is_some_and(|&amount| amount > 0),
            _ => false,
        }
    }

    fn can_load(&self, structure: UnitId, robot: UnitId) -> bool {
        let (Some(s), Some(r)) = (self.units.get(&structure), self.units.get(&robot)) else {
            return false;
        };
        s.kind.is_structure()
            && s.is_built
            && s.team == r.team
            && r.kind.is_robot()
            && (s.garrison.len() as u32) < s.stats().capacity
            && self.is_move_ready(robot)
            && self.within(structure, robot, 2)
    }

    fn can_unload(&self, structure: UnitId, dir: Direction) -> bool {
        if dir == Direction::Center {
            return false;
        }
        match self.on_map(structure) {
            Some((s, loc)) => {
                s.is_built
                    && !s.garrison.is_empty()
                    && self.is_free(MapLocation::new(loc.planet, loc.cell.add(dir)))
            }
            None => false,
        }
    }

    fn can_launch(&self, rocket: UnitId, destination: MapLocation) -> bool {
        match self.on_map(rocket) {
            Some((r, loc)) => {
                r.kind == UnitKind::Rocket
                    && r.is_built
                    && loc.planet != destination.planet
                    && self.is_free(destination)
            }
            None => false,
        }
    }

    fn can_produce(&self, factory: UnitId, kind: UnitKind) -> bool {
        let Some(f) = self.units.get(&factory) else {
            return false;
        };
        f.kind == UnitKind::Factory
            && f.is_built
            && kind.is_robot()
            && f.action_ready <= self.round
            && (f.garrison.len() as u32) < f.stats().capacity
            && self.karbonite_of(f.team) >= KindStats::of(kind).cost
    }

    fn move_unit(&mut self, unit: UnitId, dir: Direction) -> EngineResult {
        let ok = self.is_move_ready(unit) && self.can_move(unit, dir);
        self.gate("move", ok)?;
        let Some((_, loc)) = self.on_map(unit) else {
            return Err(EngineError::UnknownUnit(unit));
        };
        let target = MapLocation::new(loc.planet, loc.cell.add(dir));
        self.relocate(unit, UnitLocation::OnMap(target));
        if let Some(u) = self.units.get_mut(&unit) {
            u.move_ready = self.round + 1;
        }
        Ok(())
    }

    fn attack(&mut self, unit: UnitId, target: UnitId) -> EngineResult {
        let ok = self.is_attack_ready(unit) && self.can_attack(unit, target);
        self.gate("attack", ok)?;
        let damage = self.units.get(&unit).map_or(0, |u| u.stats().damage);
        if let Some(u) = self.units.get_mut(&unit) {
            u.action_ready = self.round + 1;
        }
        let destroyed = match self.units.get_mut(&target) {
            Some(victim) => {
                victim.health = victim.health.saturating_sub(damage);
                victim.health == 0
            }
            None => return Err(EngineError::UnknownUnit(target)),
        };
        if destroyed {
            self.kill(target);
        }
        Ok(())
    }

    fn heal(&mut self, healer: UnitId, target: UnitId) -> EngineResult {
        let ok = self.is_heal_ready(healer) && self.can_heal(healer, target);
        self.gate("heal", ok)?;
        if let Some(h) = self.units.get_mut(&healer) {
            h.action_ready = self.round + 1;
        }
        let t = self
            .units
            .get_mut(&target)
            .ok_or(EngineError::UnknownUnit(target))?;
        t.health = (t.health + HEAL_AMOUNT).min(t.stats().max_health);
        Ok(())
    }

    fn blueprint(&mut self, worker: UnitId, kind: UnitKind, dir: Direction) -> EngineResult {
        let ok = self.can_blueprint(worker, kind, dir);
        self.gate("blueprint", ok)?;
        let (team, loc) = match self.on_map(worker) {
            Some((w, loc)) => (w.team, loc),
            None => return Err(EngineError::UnknownUnit(worker)),
        };
        self.spend(team, KindStats::of(kind).cost);
        if let Some(w) = self.units.get_mut(&worker) {
            w.action_ready = self.round + 1;
        }
        let site = MapLocation::new(loc.planet, loc.cell.add(dir));
        self.insert(kind, team, UnitLocation::OnMap(site), false);
        Ok(())
    }

    fn build(&mut self, worker: UnitId, structure: UnitId) -> EngineResult {
        let ok = self.can_build(worker, structure);
        self.gate("build", ok)?;
        if let Some(w) = self.units.get_mut(&worker) {
            w.action_ready = self.round + 1;
        }
        let s = self
            .units
            .get_mut(&structure)
            .ok_or(EngineError::UnknownUnit(structure))?;
        let max = s.stats().max_health;
        s.health = (s.health + max / 10).min(max);
        if s.health == max {
            s.is_built = true;
        }
        Ok(())
    }

    fn harvest(&mut self, worker: UnitId, dir: Direction) -> EngineResult {
        let ok = self.can_harvest(worker, dir);
        self.gate("harvest", ok)?;
        let (team, cell) = match self.on_map(worker) {
            Some((w, loc)) => (w.team, loc.cell.add(dir)),
            None => return Err(EngineError::UnknownUnit(worker)),
        };
        let available = self.deposits.get(&cell).copied().unwrap_or(0);
        let mined = available.min(HARVEST_AMOUNT);
        self.set_deposit(cell, available - mined);
        *self.karbonite.entry(team).or_insert(0) += mined;
        if let Some(w) = self.units.get_mut(&worker) {
            w.action_ready = self.round + 1;
        }
        Ok(())
    }

    fn load(&mut self, structure: UnitId, robot: UnitId) -> EngineResult {
        let ok = self.can_load(structure, robot);
        self.gate("load", ok)?;
        self.relocate(robot, UnitLocation::Garrisoned(structure));
        if let Some(r) = self.units.get_mut(&robot) {
            r.move_ready = self.round + 1;
        }
        if let Some(s) = self.units.get_mut(&structure) {
            s.garrison.push(robot);
        }
        Ok(())
    }

    fn unload(&mut self, structure: UnitId, dir: Direction) -> EngineResult {
        let ok = self.can_unload(structure, dir);
        self.gate("unload", ok)?;
        let Some((_, loc)) = self.on_map(structure) else {
            return Err(EngineError::UnknownUnit(structure));
        };
        let target = MapLocation::new(loc.planet, loc.cell.add(dir));
        let robot = match self.units.get_mut(&structure) {
            Some(s) if !s.garrison.is_empty() => s.garrison.remove(0),
            _ => return Err(EngineError::rejected("unload", "garrison is empty")),
        };
        self.relocate(robot, UnitLocation::OnMap(target));
        if let Some(r) = self.units.get_mut(&robot) {
            r.move_ready = self.round + 1;
        }
        Ok(())
    }

    fn launch(&mut self, rocket: UnitId, destination: MapLocation) -> EngineResult {
        let ok = self.can_launch(rocket, destination);
        self.gate("launch", ok)?;
        self.relocate(rocket, UnitLocation::OnMap(destination));
        Ok(())
    }

    fn produce(&mut self, factory: UnitId, kind: UnitKind) -> EngineResult {
        let ok = self.can_produce(factory, kind);
        self.gate("produce", ok)?;
        let team = self
            .units
            .get(&factory)
            .map(|f| f.team)
            .ok_or(EngineError::UnknownUnit(factory))?;
        self.spend(team, KindStats::of(kind).cost);
        if let Some(f) = self.units.get_mut(&factory) {
            f.action_ready = self.round + 1;
        }
        self.spawn_in_garrison(factory, kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SandboxEngine {
        SandboxEngine::new(PlanetMap::new(Planet::Earth, 8, 8), Team::Red)
    }

    #[test]
    fn test_blueprint_then_build_to_completion() {
        let mut engine = engine();
        engine.set_karbonite(300);
        let worker = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(2, 2));

        assert!(engine.can_blueprint(worker, UnitKind::Factory, Direction::East));
        engine
            .blueprint(worker, UnitKind::Factory, Direction::East)
            .unwrap();
        assert_eq!(engine.karbonite(), 100);

        let site = engine.unit_at(Cell::new(3, 2)).unwrap();
        assert_eq!(site.kind, UnitKind::Factory);
        assert!(!site.is_built);

        // Blueprinting used this round's action.
        assert!(!engine.can_build(worker, site.id));

        let mut rounds = 0;
        while !engine.unit(site.id).unwrap().is_built {
            engine.advance_round();
            engine.build(worker, site.id).unwrap();
            rounds += 1;
            assert!(rounds < 20, "construction never finished");
        }
        assert!(!engine.can_build(worker, site.id));
    }

    #[test]
    fn test_harvest_moves_karbonite() {
        let mut map = PlanetMap::new(Planet::Earth, 4, 4);
        map.set_initial_karbonite(Cell::new(1, 1), 5);
        let mut engine = SandboxEngine::new(map, Team::Red);
        let worker = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(0, 0));

        engine.harvest(worker, Direction::Northeast).unwrap();
        assert_eq!(engine.karbonite(), 3);
        assert_eq!(engine.karbonite_at(Cell::new(1, 1)), Some(2));

        engine.advance_round();
        engine.harvest(worker, Direction::Northeast).unwrap();
        assert_eq!(engine.karbonite_at(Cell::new(1, 1)), Some(0));
        assert!(!engine.can_harvest(worker, Direction::Northeast));
    }

    #[test]
    fn test_attack_destroys_unit() {
        let mut engine = engine();
        let knight = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(2, 2));
        let enemy = engine.spawn(UnitKind::Worker, Team::Blue, Cell::new(3, 3));

        engine.attack(knight, enemy).unwrap();
        assert!(!engine.is_attack_ready(knight));
        engine.advance_round();
        engine.attack(knight, enemy).unwrap();
        assert!(engine.unit(enemy).is_none());
        assert!(!engine.is_occupied(Cell::new(3, 3)));
    }

    #[test]
    fn test_cannot_attack_friendly() {
        let mut engine = engine();
        let knight = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(2, 2));
        let friend = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(3, 3));
        assert!(!engine.can_attack(knight, friend));
        assert!(engine.attack(knight, friend).is_err());
    }

    #[test]
    fn test_produce_unload_load_launch() {
        let mut engine = engine();
        engine.set_karbonite(100);
        let factory = engine.spawn(UnitKind::Factory, Team::Red, Cell::new(4, 4));

        engine.produce(factory, UnitKind::Ranger).unwrap();
        assert_eq!(engine.karbonite(), 60);
        let ranger = engine.unit(factory).unwrap().garrison[0];
        assert_eq!(
            engine.unit(ranger).unwrap().location,
            UnitLocation::Garrisoned(factory)
        );

        engine.unload(factory, Direction::West).unwrap();
        assert_eq!(engine.unit_at(Cell::new(3, 4)).map(|u| u.id), Some(ranger));

        let rocket = engine.spawn(UnitKind::Rocket, Team::Red, Cell::new(2, 4));
        engine.advance_round();
        engine.load(rocket, ranger).unwrap();
        assert!(!engine.is_occupied(Cell::new(3, 4)));

        let dest = MapLocation::new(Planet::Mars, Cell::new(1, 1));
        assert!(engine.can_launch(rocket, dest));
        engine.launch(rocket, dest).unwrap();
        assert_eq!(
            engine.unit(rocket).unwrap().location,
            UnitLocation::OnMap(dest)
        );
        assert!(!engine.is_occupied(Cell::new(2, 4)));
    }

    #[test]
    fn test_kill_removes_garrison() {
        let mut engine = engine();
        let factory = engine.spawn(UnitKind::Factory, Team::Red, Cell::new(4, 4));
        let inner = engine.spawn_in_garrison(factory, UnitKind::Knight).unwrap();
        engine.kill(factory);
        assert!(engine.unit(inner).is_none());
        assert!(engine.my_units().is_empty());
    }

    #[test]
    fn test_hidden_cells_are_not_reported() {
        let mut engine = engine();
        engine.set_deposit(Cell::new(1, 1), 9);
        engine.hide(Cell::new(1, 1));
        assert_eq!(engine.karbonite_at(Cell::new(1, 1)), None);
        assert_eq!(engine.karbonite_at(Cell::new(2, 1)), Some(0));
        assert_eq!(engine.karbonite_at(Cell::new(-1, 1)), None);
    }

    #[test]
    fn test_income_accrues_per_round() {
        let mut engine = engine();
        engine.set_income(5);
        engine.advance_round();
        engine.advance_round();
        assert_eq!(engine.karbonite(), 10);
        assert_eq!(engine.karbonite_of(Team::Blue), 10);
    }
}
