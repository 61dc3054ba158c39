//! Squads, the action plan queue, and unit micro.
//!
//! Fresh combat units are grouped into squads once and stay there until
//! they are gone. A squad is either [`SquadState::Free`] (members skirmish
//! or wander on their own) or [`SquadState::Committed`] to an [`Action`].
//!
//! Actions sit in a FIFO plan queue:
//!
//! - `Move` is one-shot. It hands every member a [`Waypoint`], leaves the
//!   queue immediately and parks its follow-up (an `Attack` or `Embark` on
//!   the same target) in the squad's next-action slot.
//! - The follow-up enters the queue once no member is still moving.
//! - `Attack` stays queued while enemies remain around its target.
//! - `Embark` stays queued until the transport holds enough units, then
//!   schedules a launch.

use std::collections::{BTreeMap, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::{try_attack, try_heal, try_launch, try_load, CallStatus};
use crate::config::BotConfig;
use crate::context::TickSnapshot;
use crate::engine::{resolve_local, GameEngine, UnitId, UnitInfo, UnitKind};
use crate::grid::{Cell, MapLocation};
use crate::navigation::{advance_within, random_step, ADJACENT};
use crate::scout::Sightings;

/// Identifier of a squad.
pub type SquadId = u32;

/// Identifier of a planned action.
pub type ActionId = u32;

/// How a unit fights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Rangers.
    Ranged,
    /// Healers.
    Healer,
    /// Mages.
    Caster,
    /// Knights.
    Melee,
}

impl Role {
    /// Role of a combat unit kind.
    #[must_use]
    pub const fn of(kind: UnitKind) -> Option<Self> {
        match kind {
            UnitKind::Ranger => Some(Self::Ranged),
            UnitKind::Healer => Some(Self::Healer),
            UnitKind::Mage => Some(Self::Caster),
            UnitKind::Knight => Some(Self::Melee),
            _ => None,
        }
    }
}

/// Whether a squad has orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SquadState {
    /// No orders; members act on their own.
    #[default]
    Free,
    /// Executing an action or waiting on its follow-up.
    Committed,
}

/// A group of combat units that takes orders together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    /// Squad id.
    pub id: SquadId,
    /// Current state.
    pub state: SquadState,
    roster: BTreeMap<Role, Vec<UnitId>>,
}

impl Squad {
    fn new(id: SquadId) -> Self {
        Self {
            id,
            state: SquadState::Free,
            roster: BTreeMap::new(),
        }
    }

    fn add(&mut self, id: UnitId, role: Role) {
        self.roster.entry(role).or_default().push(id);
    }

    /// All members, grouped by role.
    pub fn members(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.roster.values().flatten().copied()
    }

    /// Members with a given role.
    #[must_use]
    pub fn with_role(&self, role: Role) -> &[UnitId] {
        self.roster.get(&role).map_or(&[], Vec::as_slice)
    }

    /// Role of a member.
    #[must_use]
    pub fn role_of(&self, id: UnitId) -> Option<Role> {
        self.roster
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(&role, _)| role)
    }

    /// True if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.role_of(id).is_some()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roster.values().map(Vec::len).sum()
    }

    /// True if every member is gone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&mut self, mut keep: impl FnMut(UnitId) -> bool) -> Vec<UnitId> {
        let mut removed = Vec::new();
        for ids in self.roster.values_mut() {
            ids.retain(|&id| {
                let k = keep(id);
                if !k {
                    removed.push(id);
                }
                k
            });
        }
        self.roster.retain(|_, ids| !ids.is_empty());
        removed
    }
}

/// How close a waypoint has to be approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reach {
    /// Within the unit's own attack range.
    AttackRange,
    /// Next to the cell.
    Adjacent,
}

/// A unit's pending movement intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Destination.
    pub cell: Cell,
    /// Arrival condition.
    pub reach: Reach,
}

/// What an action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Send members toward the target.
    Move,
    /// Fight enemies around the target.
    Attack,
    /// Board the transport standing on the target.
    Embark,
}

/// What a `Move` turns into once the squad has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FollowUp {
    /// Nothing; the squad frees up after arriving.
    #[default]
    None,
    /// Attack around the target.
    ThenAttack,
    /// Board the transport.
    ThenEmbark,
}

/// A planned order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Assigned when enqueued.
    pub id: ActionId,
    /// Order type.
    pub kind: ActionKind,
    /// Target cell.
    pub target: Cell,
    /// Successor for `Move`.
    pub follow_up: FollowUp,
    /// Squad bound to the action; `None` binds the newest free squad.
    pub squad: Option<SquadId>,
    /// Transport for `Embark`.
    pub transport: Option<UnitId>,
}

impl Action {
    /// Unbound action without follow-up.
    #[must_use]
    pub const fn new(kind: ActionKind, target: Cell) -> Self {
        Self {
            id: 0,
            kind,
            target,
            follow_up: FollowUp::None,
            squad: None,
            transport: None,
        }
    }

    /// Set the follow-up.
    #[must_use]
    pub const fn then(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Bind to a squad.
    #[must_use]
    pub const fn for_squad(mut self, squad: SquadId) -> Self {
        self.squad = Some(squad);
        self
    }

    /// Use a transport.
    #[must_use]
    pub const fn via(mut self, transport: UnitId) -> Self {
        self.transport = Some(transport);
        self
    }

    fn successor(&self) -> Option<Self> {
        let kind = match self.follow_up {
            FollowUp::None => return None,
            FollowUp::ThenAttack => ActionKind::Attack,
            FollowUp::ThenEmbark => ActionKind::Embark,
        };
        Some(Self {
            id: self.id,
            kind,
            target: self.target,
            follow_up: FollowUp::None,
            squad: self.squad,
            transport: self.transport,
        })
    }
}

/// Counters for one squad pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadReport {
    /// Squads formed this tick.
    pub formed: u32,
    /// Actions added by planning.
    pub planned: u32,
    /// Actions executed.
    pub executed: u32,
    /// Actions retired or abandoned.
    pub retired: u32,
    /// Attacks that landed.
    pub attacks: u32,
    /// Heals that landed.
    pub heals: u32,
    /// Units loaded into transports.
    pub loads: u32,
    /// Transports launched.
    pub launches: u32,
}

enum Outcome {
    Keep(Action),
    Drop,
}

/// Squad table, plan queue and all per-unit movement intents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadManager {
    squads: BTreeMap<SquadId, Squad>,
    plan: VecDeque<Action>,
    next_actions: BTreeMap<SquadId, Action>,
    waypoints: BTreeMap<UnitId, Waypoint>,
    /// Transports in processing, with the launch site picked so far.
    launches: BTreeMap<UnitId, Option<MapLocation>>,
    next_squad: SquadId,
    next_action: ActionId,
}

impl SquadManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All squads in id order.
    pub fn squads(&self) -> impl Iterator<Item = &Squad> {
        self.squads.values()
    }

    /// Look up a squad.
    #[must_use]
    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    /// Every rostered unit, squad by squad.
    pub fn all_members(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.squads.values().flat_map(Squad::members)
    }

    /// The plan queue, front first.
    #[must_use]
    pub fn plan(&self) -> &VecDeque<Action> {
        &self.plan
    }

    /// Follow-up waiting for a squad to stop moving.
    #[must_use]
    pub fn next_action(&self, squad: SquadId) -> Option<&Action> {
        self.next_actions.get(&squad)
    }

    /// Pending movement intent of a unit.
    #[must_use]
    pub fn waypoint(&self, unit: UnitId) -> Option<&Waypoint> {
        self.waypoints.get(&unit)
    }

    /// True if a transport is waiting to launch.
    #[must_use]
    pub fn is_launching(&self, transport: UnitId) -> bool {
        self.launches.contains_key(&transport)
    }

    /// Number of squads in `state`.
    #[must_use]
    pub fn count(&self, state: SquadState) -> usize {
        self.squads.values().filter(|s| s.state == state).count()
    }

    /// Add an action to the back of the plan queue.
    pub fn enqueue(&mut self, mut action: Action) -> ActionId {
        self.next_action += 1;
        action.id = self.next_action;
        debug!(action = action.id, kind = ?action.kind, target = %action.target, "Action queued");
        self.plan.push_back(action);
        self.next_action
    }

    fn has_pending(&self, squad: SquadId) -> bool {
        self.next_actions.contains_key(&squad) || self.plan.iter().any(|a| a.squad == Some(squad))
    }

    fn transport_claimed(&self, transport: UnitId) -> bool {
        self.launches.contains_key(&transport)
            || self
                .plan
                .iter()
                .chain(self.next_actions.values())
                .any(|a| a.transport == Some(transport))
    }

    /// Remove members, waypoints and launches whose units are gone.
    ///
    /// Squads left empty are disbanded together with their follow-ups.
    pub fn drop_stale<E: GameEngine + ?Sized>(&mut self, engine: &E) -> usize {
        let planet = engine.planet();
        let alive = |id: UnitId| resolve_local(engine, id, planet).is_some();

        let mut dropped = 0;
        for squad in self.squads.values_mut() {
            for id in squad.retain(alive) {
                debug!(squad = squad.id, unit = id, "Member gone");
                self.waypoints.remove(&id);
                dropped += 1;
            }
        }

        let empty: Vec<SquadId> = self
            .squads
            .values()
            .filter(|s| s.is_empty())
            .map(|s| s.id)
            .collect();
        for id in empty {
            debug!(squad = id, "Squad disbanded");
            self.squads.remove(&id);
            self.next_actions.remove(&id);
        }

        self.waypoints.retain(|&id, _| alive(id));
        self.launches.retain(|&id, _| alive(id));
        dropped
    }

    /// Form one free squad from this tick's fresh combat units.
    pub fn enlist(&mut self, fresh: &[UnitInfo]) -> Option<SquadId> {
        let recruits: Vec<(UnitId, Role)> = fresh
            .iter()
            .filter(|u| !self.squads.values().any(|s| s.contains(u.id)))
            .filter_map(|u| Role::of(u.kind).map(|r| (u.id, r)))
            .collect();
        if recruits.is_empty() {
            return None;
        }

        self.next_squad += 1;
        let mut squad = Squad::new(self.next_squad);
        for (id, role) in recruits {
            squad.add(id, role);
        }
        info!(squad = squad.id, size = squad.len(), "Squad formed");
        let id = squad.id;
        self.squads.insert(id, squad);
        Some(id)
    }

    /// Give orders to free squads, newest first.
    ///
    /// Sighted enemies are attacked first. Once `embark_from_round` is
    /// reached, a squad with nothing to attack is sent to an own rocket
    /// with room.
    pub fn plan_orders(
        &mut self,
        config: &BotConfig,
        sightings: &mut Sightings,
        snapshot: &TickSnapshot,
    ) -> u32 {
        let idle: Vec<SquadId> = self
            .squads
            .values()
            .rev()
            .filter(|s| s.state == SquadState::Free)
            .map(|s| s.id)
            .collect();

        let mut planned = 0;
        for squad in idle {
            if self.has_pending(squad) {
                continue;
            }
            if let Some(target) = sightings.pop_target() {
                self.enqueue(
                    Action::new(ActionKind::Move, target)
                        .then(FollowUp::ThenAttack)
                        .for_squad(squad),
                );
                planned += 1;
                continue;
            }
            if snapshot.round < config.embark_from_round {
                continue;
            }
            let rocket = snapshot
                .structures()
                .find(|(u, _)| {
                    u.kind == UnitKind::Rocket
                        && u.is_built
                        && u.has_capacity()
                        && !self.transport_claimed(u.id)
                })
                .map(|(u, c)| (u.id, c));
            if let Some((rocket, cell)) = rocket {
                self.enqueue(
                    Action::new(ActionKind::Move, cell)
                        .then(FollowUp::ThenEmbark)
                        .for_squad(squad)
                        .via(rocket),
                );
                planned += 1;
            }
        }
        planned
    }

    /// Run every queued action once, in queue order.
    pub fn execute<E, R>(&mut self, engine: &mut E, config: &BotConfig, rng: &mut R, report: &mut SquadReport)
    where
        E: GameEngine + ?Sized,
        R: Rng + ?Sized,
    {
        for _ in 0..self.plan.len() {
            let Some(action) = self.plan.pop_front() else {
                break;
            };
            match self.execute_action(engine, config, rng, action, report) {
                Outcome::Keep(action) => self.plan.push_back(action),
                Outcome::Drop => {}
            }
        }
    }

    fn execute_action<E, R>(
        &mut self,
        engine: &mut E,
        config: &BotConfig,
        rng: &mut R,
        mut action: Action,
        report: &mut SquadReport,
    ) -> Outcome
    where
        E: GameEngine + ?Sized,
        R: Rng + ?Sized,
    {
        let squad_id = match action.squad {
            Some(id) => id,
            None => {
                let newest_free = self
                    .squads
                    .values()
                    .rev()
                    .find(|s| s.state == SquadState::Free && !self.has_pending(s.id))
                    .map(|s| s.id);
                match newest_free {
                    Some(id) => {
                        action.squad = Some(id);
                        id
                    }
                    None => return Outcome::Keep(action),
                }
            }
        };
        let Some(squad) = self.squads.get_mut(&squad_id) else {
            debug!(action = action.id, squad = squad_id, "Squad gone, action dropped");
            report.retired += 1;
            return Outcome::Drop;
        };
        squad.state = SquadState::Committed;
        report.executed += 1;

        match action.kind {
            ActionKind::Move => {
                let reach = match action.follow_up {
                    FollowUp::ThenEmbark => Reach::Adjacent,
                    FollowUp::None | FollowUp::ThenAttack => Reach::AttackRange,
                };
                let members: Vec<UnitId> = squad.members().collect();
                for id in members {
                    self.waypoints.insert(
                        id,
                        Waypoint {
                            cell: action.target,
                            reach,
                        },
                    );
                }
                if let Some(next) = action.successor() {
                    self.next_actions.insert(squad_id, next);
                }
                Outcome::Drop
            }
            ActionKind::Attack => self.execute_attack(engine, config, action, squad_id, report),
            ActionKind::Embark => self.execute_embark(engine, config, rng, action, squad_id, report),
        }
    }

    fn execute_attack<E: GameEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        config: &BotConfig,
        action: Action,
        squad_id: SquadId,
        report: &mut SquadReport,
    ) -> Outcome {
        let enemies = enemies_near(engine, action.target, config.attack_sense_radius_sq);
        if enemies.is_empty() {
            debug!(action = action.id, squad = squad_id, "Target clear, attack retired");
            report.retired += 1;
            if !self.next_actions.contains_key(&squad_id) {
                if let Some(squad) = self.squads.get_mut(&squad_id) {
                    squad.state = SquadState::Free;
                }
            }
            return Outcome::Drop;
        }

        let planet = engine.planet();
        let members: Vec<(UnitId, Option<Role>)> = match self.squads.get(&squad_id) {
            Some(squad) => squad.members().map(|id| (id, squad.role_of(id))).collect(),
            None => return Outcome::Drop,
        };
        for (id, role) in members {
            if self.waypoints.contains_key(&id) {
                continue;
            }
            let Some(unit) = resolve_local(engine, id, planet) else {
                continue;
            };
            if unit.cell_on(planet).is_none() {
                continue;
            }
            if role == Some(Role::Healer) {
                heal_nearest(engine, &unit, report);
            } else if !attack_first(engine, &unit, &enemies, report) {
                if let Some(cell) = enemies[0].cell_on(planet) {
                    advance_within(engine, &unit, cell, unit.attack_range);
                }
            }
        }
        Outcome::Keep(action)
    }

    fn execute_embark<E, R>(
        &mut self,
        engine: &mut E,
        config: &BotConfig,
        rng: &mut R,
        action: Action,
        squad_id: SquadId,
        report: &mut SquadReport,
    ) -> Outcome
    where
        E: GameEngine + ?Sized,
        R: Rng + ?Sized,
    {
        let planet = engine.planet();
        let transport = action
            .transport
            .and_then(|id| resolve_local(engine, id, planet))
            .filter(|t| t.is_built);
        let Some(transport) = transport else {
            debug!(action = action.id, squad = squad_id, "Transport gone, embark abandoned");
            report.retired += 1;
            return Outcome::Drop;
        };
        let Some(dock) = transport.cell_on(planet) else {
            return Outcome::Keep(action);
        };
        if self.launches.contains_key(&transport.id) {
            report.retired += 1;
            return Outcome::Drop;
        }

        let team = engine.team();
        let mut candidates: Vec<UnitId> = self
            .squads
            .get(&squad_id)
            .map(|s| s.members().collect())
            .unwrap_or_default();
        let mut bystanders: Vec<UnitId> = engine
            .sense_nearby_units(dock, ADJACENT)
            .into_iter()
            .filter(|u| u.team == team && u.kind.is_robot() && !candidates.contains(&u.id))
            .map(|u| u.id)
            .collect();
        bystanders.sort_unstable();
        candidates.extend(bystanders);

        for id in candidates {
            let has_room = engine.unit(transport.id).is_some_and(|t| t.has_capacity());
            if !has_room {
                break;
            }
            if try_load(engine, transport.id, id).is_done() {
                self.waypoints.remove(&id);
                report.loads += 1;
            }
        }

        let aboard = engine.unit(transport.id).map_or(0, |t| t.garrison.len());
        if aboard >= config.launch_threshold {
            info!(transport = transport.id, aboard, "Transport full, launch scheduled");
            let site = random_site(engine, rng);
            self.launches.insert(transport.id, site);
            report.retired += 1;
            return Outcome::Drop;
        }
        Outcome::Keep(action)
    }

    /// Advance committed squads and let free squads act on their own.
    pub fn service<E, R>(&mut self, engine: &mut E, rng: &mut R, report: &mut SquadReport)
    where
        E: GameEngine + ?Sized,
        R: Rng + ?Sized,
    {
        let planet = engine.planet();
        let ids: Vec<SquadId> = self.squads.keys().copied().collect();

        for squad_id in ids {
            let Some(squad) = self.squads.get(&squad_id) else {
                continue;
            };
            let state = squad.state;
            let members: Vec<(UnitId, Option<Role>)> =
                squad.members().map(|id| (id, squad.role_of(id))).collect();

            match state {
                SquadState::Committed => {
                    for (id, _) in &members {
                        let Some(waypoint) = self.waypoints.get(id).copied() else {
                            continue;
                        };
                        let Some(unit) = resolve_local(engine, *id, planet) else {
                            continue;
                        };
                        let range = match waypoint.reach {
                            Reach::AttackRange => unit.attack_range,
                            Reach::Adjacent => ADJACENT,
                        };
                        if advance_within(engine, &unit, waypoint.cell, range) {
                            self.waypoints.remove(id);
                        }
                    }

                    let moving = members.iter().any(|(id, _)| self.waypoints.contains_key(id));
                    if moving {
                        continue;
                    }
                    if let Some(next) = self.next_actions.remove(&squad_id) {
                        debug!(squad = squad_id, kind = ?next.kind, "Squad arrived, follow-up queued");
                        self.plan.push_back(next);
                    } else if !self.has_pending(squad_id) {
                        if let Some(squad) = self.squads.get_mut(&squad_id) {
                            squad.state = SquadState::Free;
                        }
                    }
                }
                SquadState::Free => {
                    for (id, role) in members {
                        let Some(unit) = resolve_local(engine, id, planet) else {
                            continue;
                        };
                        let Some(here) = unit.cell_on(planet) else {
                            continue;
                        };
                        // Only a unit that can act this round holds its ground.
                        let engaged = if role == Some(Role::Healer) {
                            engine.is_heal_ready(id) && heal_nearest(engine, &unit, report)
                        } else {
                            let enemies = enemies_near(engine, here, unit.attack_range);
                            engine.is_attack_ready(id) && attack_first(engine, &unit, &enemies, report)
                        };
                        if !engaged {
                            random_step(engine, id, rng);
                        }
                    }
                }
            }
        }
    }

    /// Try every scheduled launch again.
    pub fn retry_launches<E, R>(&mut self, engine: &mut E, rng: &mut R, report: &mut SquadReport)
    where
        E: GameEngine + ?Sized,
        R: Rng + ?Sized,
    {
        let pending: Vec<(UnitId, Option<MapLocation>)> =
            self.launches.iter().map(|(&id, &site)| (id, site)).collect();

        for (transport, site) in pending {
            let Some(site) = site.or_else(|| random_site(engine, rng)) else {
                continue;
            };
            match try_launch(engine, transport, site) {
                CallStatus::Done => {
                    info!(transport, cell = %site.cell, "Transport launched");
                    self.launches.remove(&transport);
                    report.launches += 1;
                }
                CallStatus::NotReady => {
                    // Site taken or transport not ready: pick again next tick.
                    self.launches.insert(transport, None);
                }
                CallStatus::Failed(_) => {
                    self.launches.insert(transport, Some(site));
                }
            }
        }
    }
}

/// Enemy units within `radius_squared` of `center`.
fn enemies_near<E: GameEngine + ?Sized>(engine: &E, center: Cell, radius_squared: u32) -> Vec<UnitInfo> {
    let enemy = engine.team().enemy();
    engine
        .sense_nearby_units(center, radius_squared)
        .into_iter()
        .filter(|u| u.team == enemy)
        .collect()
}

/// Attack the first enemy the unit is allowed to hit.
///
/// Returns `true` if such an enemy exists, even when the attack itself is
/// still on cooldown.
fn attack_first<E: GameEngine + ?Sized>(
    engine: &mut E,
    unit: &UnitInfo,
    enemies: &[UnitInfo],
    report: &mut SquadReport,
) -> bool {
    let Some(target) = enemies.iter().find(|e| engine.can_attack(unit.id, e.id)) else {
        return false;
    };
    if try_attack(engine, unit.id, target.id).is_done() {
        report.attacks += 1;
    }
    true
}

/// Heal the nearest damaged friendly robot in range.
///
/// Returns `true` if there was someone to heal.
fn heal_nearest<E: GameEngine + ?Sized>(engine: &mut E, healer: &UnitInfo, report: &mut SquadReport) -> bool {
    let planet = engine.planet();
    let team = engine.team();
    let Some(here) = healer.cell_on(planet) else {
        return false;
    };
    let mut patients: Vec<(u32, UnitId)> = engine
        .sense_nearby_units(here, healer.attack_range)
        .into_iter()
        .filter(|u| u.team == team && u.kind.is_robot() && u.is_damaged())
        .filter_map(|u| u.cell_on(planet).map(|c| (c.distance_squared(here), u.id)))
        .collect();
    patients.sort_unstable();

    let Some(&(_, patient)) = patients.iter().find(|(_, id)| engine.can_heal(healer.id, *id)) else {
        return false;
    };
    if try_heal(engine, healer.id, patient).is_done() {
        report.heals += 1;
    }
    true
}

/// Random passable cell on the other planet.
fn random_site<E, R>(engine: &E, rng: &mut R) -> Option<MapLocation>
where
    E: GameEngine + ?Sized,
    R: Rng + ?Sized,
{
    let destination = engine.planet().other();
    let cells: Vec<Cell> = engine.planet_map(destination).passable_cells().collect();
    cells
        .choose(rng)
        .map(|&cell| MapLocation::new(destination, cell))
}

/// Last-chance attack for every own combat unit, in or out of a squad.
pub fn opportunistic_attacks<E: GameEngine + ?Sized>(engine: &mut E, report: &mut SquadReport) {
    let planet = engine.planet();
    let mut units: Vec<UnitInfo> = engine
        .my_units()
        .into_iter()
        .filter(|u| u.kind.is_soldier() && u.kind != UnitKind::Healer)
        .filter(|u| u.cell_on(planet).is_some())
        .collect();
    units.sort_by_key(|u| u.id);

    for unit in units {
        if !engine.is_attack_ready(unit.id) {
            continue;
        }
        let Some(here) = unit.cell_on(planet) else {
            continue;
        };
        let enemies = enemies_near(engine, here, unit.attack_range);
        attack_first(engine, &unit, &enemies, report);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::context::SimContext;
    use crate::engine::Team;
    use crate::grid::{Planet, PlanetMap};
    use crate::sandbox::SandboxEngine;

    fn engine(w: u32, h: u32) -> SandboxEngine {
        SandboxEngine::new(PlanetMap::new(Planet::Earth, w, h), Team::Red)
    }

    fn units(engine: &SandboxEngine, ids: &[UnitId]) -> Vec<UnitInfo> {
        ids.iter().filter_map(|&id| engine.unit(id)).collect()
    }

    #[test]
    fn test_enlist_groups_by_role() {
        let mut engine = engine(8, 8);
        let r = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(0, 0));
        let h = engine.spawn(UnitKind::Healer, Team::Red, Cell::new(1, 0));
        let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(2, 0));
        let w = engine.spawn(UnitKind::Worker, Team::Red, Cell::new(3, 0));

        let mut squads = SquadManager::new();
        let id = squads.enlist(&units(&engine, &[r, h, k, w])).unwrap();
        let squad = squads.squad(id).unwrap();

        assert_eq!(squad.len(), 3);
        assert_eq!(squad.with_role(Role::Ranged), &[r]);
        assert_eq!(squad.with_role(Role::Healer), &[h]);
        assert_eq!(squad.role_of(k), Some(Role::Melee));
        assert!(!squad.contains(w));
        assert_eq!(squad.state, SquadState::Free);

        // Already rostered units are not enlisted twice.
        assert!(squads.enlist(&units(&engine, &[r])).is_none());
    }

    #[test]
    fn test_move_is_one_shot_and_parks_follow_up() {
        let mut engine = engine(10, 10);
        let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(0, 0));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[k])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();

        squads.enqueue(Action::new(ActionKind::Move, Cell::new(8, 8)).then(FollowUp::ThenAttack));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);

        assert!(squads.plan().is_empty());
        assert_eq!(squads.squad(squad).unwrap().state, SquadState::Committed);
        assert_eq!(squads.waypoint(k).map(|w| w.cell), Some(Cell::new(8, 8)));
        let next = squads.next_action(squad).unwrap();
        assert_eq!(next.kind, ActionKind::Attack);
        assert_eq!(next.squad, Some(squad));
    }

    #[test]
    fn test_unbound_action_waits_for_free_squad() {
        let mut engine = engine(6, 6);
        let mut squads = SquadManager::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();

        squads.enqueue(Action::new(ActionKind::Move, Cell::new(3, 3)));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);
        assert_eq!(squads.plan().len(), 1);
        assert_eq!(report.executed, 0);
    }

    #[test]
    fn test_attack_hits_enemy_near_target() {
        let mut engine = engine(10, 10);
        let r = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(2, 2));
        let enemy = engine.spawn(UnitKind::Worker, Team::Blue, Cell::new(5, 5));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[r])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();

        squads.enqueue(Action::new(ActionKind::Attack, Cell::new(5, 5)).for_squad(squad));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);

        assert_eq!(report.attacks, 1);
        assert_eq!(squads.plan().len(), 1);
        assert!(engine.unit(enemy).unwrap().health < 100);
    }

    #[test]
    fn test_attack_without_enemies_frees_squad() {
        let mut engine = engine(10, 10);
        let r = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(2, 2));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[r])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();

        squads.enqueue(Action::new(ActionKind::Attack, Cell::new(7, 7)).for_squad(squad));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);

        assert!(squads.plan().is_empty());
        assert_eq!(report.retired, 1);
        assert_eq!(squads.squad(squad).unwrap().state, SquadState::Free);
    }

    #[test]
    fn test_healer_heals_damaged_friend() {
        let mut engine = engine(10, 10);
        let h = engine.spawn(UnitKind::Healer, Team::Red, Cell::new(2, 2));
        let friend = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(3, 3));
        engine.spawn(UnitKind::Worker, Team::Blue, Cell::new(6, 6));
        engine.set_health(friend, 100);

        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[h])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();

        squads.enqueue(Action::new(ActionKind::Attack, Cell::new(6, 6)).for_squad(squad));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);

        assert_eq!(report.heals, 1);
        assert_eq!(engine.unit(friend).unwrap().health, 110);
    }

    #[test]
    fn test_drop_stale_disbands_empty_squad() {
        let mut engine = engine(8, 8);
        let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(0, 0));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[k])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = SquadReport::default();
        squads.enqueue(Action::new(ActionKind::Move, Cell::new(7, 7)).then(FollowUp::ThenAttack));
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);

        engine.kill(k);
        assert_eq!(squads.drop_stale(&engine), 1);
        assert!(squads.squad(squad).is_none());
        assert!(squads.next_action(squad).is_none());
        assert!(squads.waypoint(k).is_none());
    }

    #[test]
    fn test_plan_targets_sightings_newest_squad_first() {
        let mut engine = engine(12, 12);
        let a = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(0, 0));
        let b = engine.spawn(UnitKind::Ranger, Team::Red, Cell::new(1, 0));
        let mut squads = SquadManager::new();
        let first = squads.enlist(&units(&engine, &[a])).unwrap();
        let second = squads.enlist(&units(&engine, &[b])).unwrap();

        let mut sightings = Sightings::default();
        sightings.report(UnitKind::Factory, Cell::new(9, 9));
        let mut ctx = SimContext::new(BotConfig::default(), &engine);
        let snapshot = ctx.begin_tick(&engine);

        let planned = squads.plan_orders(&ctx.config, &mut sightings, &snapshot);
        assert_eq!(planned, 1);
        let action = &squads.plan()[0];
        assert_eq!(action.squad, Some(second));
        assert_eq!(action.target, Cell::new(9, 9));
        assert_eq!(action.follow_up, FollowUp::ThenAttack);
        assert!(sightings.is_empty());
        assert!(!squads.plan().iter().any(|x| x.squad == Some(first)));
    }

    #[test]
    fn test_embark_loads_and_launches() {
        let mut engine = engine(10, 10);
        let rocket = engine.spawn(UnitKind::Rocket, Team::Red, Cell::new(5, 5));
        let a = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(4, 5));
        let b = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(6, 5));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[a, b])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut report = SquadReport::default();
        let config = BotConfig::default();

        squads.enqueue(
            Action::new(ActionKind::Embark, Cell::new(5, 5))
                .for_squad(squad)
                .via(rocket),
        );
        squads.execute(&mut engine, &config, &mut rng, &mut report);

        assert_eq!(report.loads, 2);
        assert!(squads.plan().is_empty());
        assert!(squads.is_launching(rocket));

        squads.retry_launches(&mut engine, &mut rng, &mut report);
        assert_eq!(report.launches, 1);
        let location = engine.unit(rocket).unwrap().location;
        assert!(matches!(
            location,
            crate::engine::UnitLocation::OnMap(loc) if loc.planet == Planet::Mars
        ));

        // Launched units are no longer local.
        squads.drop_stale(&engine);
        assert!(squads.squad(squad).is_none());
        assert!(!squads.is_launching(rocket));
    }

    #[test]
    fn test_embark_abandoned_when_transport_gone() {
        let mut engine = engine(10, 10);
        let rocket = engine.spawn(UnitKind::Rocket, Team::Red, Cell::new(5, 5));
        let a = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(1, 1));
        let mut squads = SquadManager::new();
        let squad = squads.enlist(&units(&engine, &[a])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut report = SquadReport::default();

        squads.enqueue(
            Action::new(ActionKind::Embark, Cell::new(5, 5))
                .for_squad(squad)
                .via(rocket),
        );
        engine.kill(rocket);
        squads.execute(&mut engine, &BotConfig::default(), &mut rng, &mut report);
        assert!(squads.plan().is_empty());
        assert_eq!(report.retired, 1);
    }

    #[test]
    fn test_opportunistic_pass_attacks_in_range() {
        let mut engine = engine(8, 8);
        let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(2, 2));
        let enemy = engine.spawn(UnitKind::Worker, Team::Blue, Cell::new(3, 2));
        let mut report = SquadReport::default();

        opportunistic_attacks(&mut engine, &mut report);
        assert_eq!(report.attacks, 1);
        assert!(engine.unit(enemy).unwrap().health < 100);
        assert!(!engine.is_attack_ready(k));
    }

    #[test]
    fn test_free_unit_on_cooldown_wanders() {
        let mut moved = 0;
        for seed in 0..20 {
            let mut engine = engine(12, 12);
            let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(5, 5));
            engine.spawn(UnitKind::Factory, Team::Blue, Cell::new(6, 5));
            let mut squads = SquadManager::new();
            squads.enlist(&units(&engine, &[k])).unwrap();
            let mut report = SquadReport::default();

            opportunistic_attacks(&mut engine, &mut report);
            assert!(!engine.is_attack_ready(k));

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            squads.service(&mut engine, &mut rng, &mut report);
            if engine.unit(k).and_then(|u| u.cell_on(Planet::Earth)) != Some(Cell::new(5, 5)) {
                moved += 1;
            }
        }
        assert!(moved >= 10, "moved in {moved}/20 seeds");
    }

    #[test]
    fn test_free_unit_ready_to_attack_holds_ground() {
        let mut engine = engine(12, 12);
        let k = engine.spawn(UnitKind::Knight, Team::Red, Cell::new(5, 5));
        engine.spawn(UnitKind::Factory, Team::Blue, Cell::new(6, 5));
        let mut squads = SquadManager::new();
        squads.enlist(&units(&engine, &[k])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut report = SquadReport::default();

        squads.service(&mut engine, &mut rng, &mut report);
        assert_eq!(report.attacks, 1);
        assert_eq!(engine.unit(k).and_then(|u| u.cell_on(Planet::Earth)), Some(Cell::new(5, 5)));
    }
}
