//! Boundary contract with the game engine.
//!
//! The controller never owns units. It holds [`UnitId`]s and resolves them
//! against the engine every round; a failed resolution means the unit is
//! gone (destroyed or carried off-planet) and is dropped from tracking.
//!
//! Every mutating call is fire-and-forget. Callers check the paired
//! `can_*` predicate first and go through [`crate::commands`], which turns
//! the outcome into an explicit [`crate::commands::CallStatus`].

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::grid::{Cell, Direction, MapLocation, Planet, PlanetMap};

/// Unique, stable identifier of a unit for its lifetime.
pub type UnitId = u32;

/// Result of a mutating engine call.
pub type EngineResult = std::result::Result<(), EngineError>;

/// Side of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Team {
    /// Red team.
    #[default]
    Red,
    /// Blue team.
    Blue,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn enemy(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

/// Every unit type the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Harvests, blueprints and builds.
    Worker,
    /// Melee soldier.
    Knight,
    /// Long range soldier; also the default scout.
    Ranger,
    /// Area damage caster.
    Mage,
    /// Heals friendly units.
    Healer,
    /// Produces robots; holds them in its garrison until unloaded.
    Factory,
    /// Transport that launches its garrison to the other planet.
    Rocket,
}

impl UnitKind {
    /// Structures cannot move and are built by workers.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Factory | Self::Rocket)
    }

    /// Combat robots organised into squads.
    #[must_use]
    pub const fn is_soldier(self) -> bool {
        matches!(self, Self::Knight | Self::Ranger | Self::Mage | Self::Healer)
    }

    /// Robots are everything that is not a structure.
    #[must_use]
    pub const fn is_robot(self) -> bool {
        !self.is_structure()
    }
}

/// Where a unit currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitLocation {
    /// Standing on a map cell.
    OnMap(MapLocation),
    /// Inside the garrison of a structure.
    Garrisoned(UnitId),
    /// In flight between planets.
    InSpace,
}

impl UnitLocation {
    /// Map location, if the unit stands on a map.
    #[must_use]
    pub const fn map_location(self) -> Option<MapLocation> {
        match self {
            Self::OnMap(loc) => Some(loc),
            _ => None,
        }
    }

    /// Cell on `planet`, if the unit stands there.
    #[must_use]
    pub fn cell_on(self, planet: Planet) -> Option<Cell> {
        self.map_location()
            .filter(|loc| loc.planet == planet)
            .map(|loc| loc.cell)
    }
}

/// Snapshot of one unit as reported by the engine this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    /// Stable id.
    pub id: UnitId,
    /// Unit type.
    pub kind: UnitKind,
    /// Owning team.
    pub team: Team,
    /// Current location.
    pub location: UnitLocation,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Squared attack (or heal) range; zero for units that cannot attack.
    pub attack_range: u32,
    /// Squared vision range.
    pub vision_range: u32,
    /// Structures only: construction finished.
    pub is_built: bool,
    /// Structures only: ids of garrisoned units.
    pub garrison: Vec<UnitId>,
    /// Structures only: garrison capacity.
    pub capacity: u32,
}

impl UnitInfo {
    /// Cell on `planet`, if the unit stands there.
    #[must_use]
    pub fn cell_on(&self, planet: Planet) -> Option<Cell> {
        self.location.cell_on(planet)
    }

    /// True if a structure can take more units.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        (self.garrison.len() as u32) < self.capacity
    }

    /// True if the unit is below full health.
    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.health < self.max_health
    }
}

/// Everything the controller may ask of, or tell to, the game engine.
///
/// Queries are cheap snapshots of the current round. Mutating calls are
/// only legal when the paired predicate holds; the engine reports
/// violations through [`EngineError`].
pub trait GameEngine {
    /// Current round number.
    fn round(&self) -> u32;

    /// Team this controller plays for.
    fn team(&self) -> Team;

    /// Planet this controller runs on.
    fn planet(&self) -> Planet;

    /// Starting map of a planet.
    fn planet_map(&self, planet: Planet) -> &PlanetMap;

    /// Team-wide karbonite balance.
    fn karbonite(&self) -> u32;

    /// Karbonite currently at a cell, or `None` if the cell is not visible.
    fn karbonite_at(&self, cell: Cell) -> Option<u32>;

    /// Karbonite cost of producing (robots) or blueprinting (structures) a kind.
    fn cost_of(&self, kind: UnitKind) -> u32;

    /// All own units, on any planet or in any garrison.
    fn my_units(&self) -> Vec<UnitInfo>;

    /// Look up a unit by id; `None` if it no longer exists or is not visible.
    fn unit(&self, id: UnitId) -> Option<UnitInfo>;

    /// Visible units of any team within a squared radius of a cell on this planet.
    fn sense_nearby_units(&self, center: Cell, radius_squared: u32) -> Vec<UnitInfo>;

    /// True if any unit stands on the cell.
    fn is_occupied(&self, cell: Cell) -> bool {
        !self.sense_nearby_units(cell, 0).is_empty()
    }

    /// Movement cooldown has elapsed.
    fn is_move_ready(&self, unit: UnitId) -> bool;

    /// Moving in `dir` is legal right now (ignores cooldown).
    fn can_move(&self, unit: UnitId, dir: Direction) -> bool;

    /// Attack cooldown has elapsed.
    fn is_attack_ready(&self, unit: UnitId) -> bool;

    /// `unit` may attack `target` (range and team checks).
    fn can_attack(&self, unit: UnitId, target: UnitId) -> bool;

    /// Heal cooldown has elapsed.
    fn is_heal_ready(&self, unit: UnitId) -> bool;

    /// `healer` may heal `target`.
    fn can_heal(&self, healer: UnitId, target: UnitId) -> bool;

    /// `worker` may place a `kind` blueprint in `dir`.
    fn can_blueprint(&self, worker: UnitId, kind: UnitKind, dir: Direction) -> bool;

    /// `worker` may work on the unfinished `structure`.
    fn can_build(&self, worker: UnitId, structure: UnitId) -> bool;

    /// `worker` may harvest in `dir`.
    fn can_harvest(&self, worker: UnitId, dir: Direction) -> bool;

    /// `structure` may load `robot` into its garrison.
    fn can_load(&self, structure: UnitId, robot: UnitId) -> bool;

    /// `structure` may unload its next garrisoned unit in `dir`.
    fn can_unload(&self, structure: UnitId, dir: Direction) -> bool;

    /// `rocket` may launch to `destination`.
    fn can_launch(&self, rocket: UnitId, destination: MapLocation) -> bool;

    /// `factory` may start producing a `kind`.
    fn can_produce(&self, factory: UnitId, kind: UnitKind) -> bool;

    /// Step one cell.
    fn move_unit(&mut self, unit: UnitId, dir: Direction) -> EngineResult;

    /// Attack a unit.
    fn attack(&mut self, unit: UnitId, target: UnitId) -> EngineResult;

    /// Heal a unit.
    fn heal(&mut self, healer: UnitId, target: UnitId) -> EngineResult;

    /// Place a structure blueprint next to the worker. Spends its cost.
    fn blueprint(&mut self, worker: UnitId, kind: UnitKind, dir: Direction) -> EngineResult;

    /// Advance construction of a blueprint.
    fn build(&mut self, worker: UnitId, structure: UnitId) -> EngineResult;

    /// Mine karbonite from a neighbouring cell.
    fn harvest(&mut self, worker: UnitId, dir: Direction) -> EngineResult;

    /// Load a robot into a structure's garrison.
    fn load(&mut self, structure: UnitId, robot: UnitId) -> EngineResult;

    /// Unload the next garrisoned unit.
    fn unload(&mut self, structure: UnitId, dir: Direction) -> EngineResult;

    /// Launch a rocket and its garrison.
    fn launch(&mut self, rocket: UnitId, destination: MapLocation) -> EngineResult;

    /// Produce a robot into the factory's garrison. Spends its cost.
    fn produce(&mut self, factory: UnitId, kind: UnitKind) -> EngineResult;
}

/// Resolve a tracked id to a unit that is still on `planet`.
///
/// A unit garrisoned in a structure counts as local when the structure
/// does. Anything else (destroyed, in space, on the other planet) is gone.
pub fn resolve_local<E: GameEngine + ?Sized>(
    engine: &E,
    id: UnitId,
    planet: Planet,
) -> Option<UnitInfo> {
    let unit = engine.unit(id)?;
    let local = match unit.location {
        UnitLocation::OnMap(loc) => loc.planet == planet,
        UnitLocation::Garrisoned(holder) => engine
            .unit(holder)
            .and_then(|h| h.cell_on(planet))
            .is_some(),
        UnitLocation::InSpace => false,
    };
    local.then_some(unit)
}
