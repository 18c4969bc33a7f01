//! Agent-based simulation: a population of simple walkers
//! released onto a `PointMap` at a Poisson rate, each stepping by a
//! configurable look program and leaving an optional trail.
//!
//! Every source of randomness here is an explicit per-agent `StdRng`
//! minted from a `ReplayToken` sub-stream — there is no
//! shared/global RNG, so two runs from the same seed produce identical
//! agent populations and paths regardless of release order.

mod look;

pub use look::{Feeler, LookRule, OcclusionMemory};

use rand::Rng;
use rand::rngs::StdRng;

use crate::error::Result;
use crate::geom::{Direction, PixelRef, Region};
use crate::grid::{Point, PointMap, PointState};
use crate::rng::ReplayToken;
use crate::shapes::{SalaShape, ShapeMap, ShapeRef};

/// Which of the three agent "colours" a released agent is tagged with
/// (mirroring `PointState::AGENT_A/B/C` so up to three
/// populations can coexist on one map and be told apart visually).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentGroup {
    A,
    B,
    C,
}

impl AgentGroup {
    fn flag(self) -> PointState {
        match self {
            AgentGroup::A => PointState::AGENT_A,
            AgentGroup::B => PointState::AGENT_B,
            AgentGroup::C => PointState::AGENT_C,
        }
    }
}

/// Configuration shared by one population of agents: release rate,
/// lifetime, look program, and how far each of the 8 feelers probes
/// before giving up.
#[derive(Clone, Debug)]
pub struct AgentSet {
    pub group: AgentGroup,
    pub look_rule: LookRule,
    /// Expected number of new agents released per `step` call (Poisson
    /// mean); fractional rates are handled exactly by the Poisson draw.
    pub release_rate: f64,
    pub lifetime: u32,
    pub feeler_length: u32,
    /// Agents are released uniformly at random from the open cells
    /// within this region; `None` means anywhere on the map.
    pub release_region: Option<Region>,
    pub record_trails: bool,
}

impl Default for AgentSet {
    fn default() -> Self {
        Self {
            group: AgentGroup::A,
            look_rule: LookRule::Standard,
            release_rate: 1.0,
            lifetime: 500,
            feeler_length: 20,
            release_region: None,
            record_trails: false,
        }
    }
}

struct Agent {
    pos: PixelRef,
    facing: Direction,
    ticks_left: u32,
    rng: StdRng,
    memory: OcclusionMemory,
    trail: Option<ShapeRef>,
}

/// Runs one or more `AgentSet` populations over a `PointMap`, released
/// tick by tick and stepped forward one cell at a time.
pub struct AgentEngine {
    seed_token: ReplayToken,
    tick: u64,
    next_id: u64,
    agents: Vec<Agent>,
    pub trails: Option<ShapeMap>,
}

impl AgentEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            seed_token: ReplayToken::new(seed, 0),
            tick: 0,
            next_id: 0,
            agents: Vec::new(),
            trails: None,
        }
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Draws a Poisson(`set.release_rate`) number of new agents and
    /// spawns them at random open cells (within `set.release_region` if
    /// given), each a fresh sub-stream off the engine's seed.
    pub fn release(&mut self, map: &PointMap, set: &AgentSet) {
        if set.record_trails && self.trails.is_none() {
            self.trails = Some(ShapeMap::new("agent trails"));
        }
        let mut release_rng = self.seed_token.derive(self.tick.wrapping_mul(2)).to_rng();
        let count = sample_poisson(&mut release_rng, set.release_rate);

        let candidates: Vec<PixelRef> = map
            .open_cells()
            .filter(|&p| {
                set.release_region
                    .as_ref()
                    .is_none_or(|r| r.contains_touch(map.get(p).unwrap().location))
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;
            let mut agent_rng = self.seed_token.derive(id.wrapping_mul(3) + 1).to_rng();
            let pos = candidates[agent_rng.gen_range(0..candidates.len())];
            let facing = Direction::ALL[agent_rng.gen_range(0..Direction::ALL.len())];
            let trail = self.trails.as_mut().map(|t| {
                let p = map.get(pos).unwrap().location;
                t.insert(SalaShape::point(p))
            });
            self.agents.push(Agent {
                pos,
                facing,
                ticks_left: set.lifetime,
                rng: agent_rng,
                memory: OcclusionMemory::default(),
                trail,
            });
        }
    }

    /// Advances every live agent by one step: look, pick a heading,
    /// move if the destination is open, record the trail segment, and
    /// retire agents whose lifetime has run out.
    pub fn step(&mut self, map: &mut PointMap, set: &AgentSet) -> Result<()> {
        self.tick += 1;
        let flag = set.group.flag();
        let feeler_length = set.feeler_length;
        let mut retired = Vec::new();

        for (i, agent) in self.agents.iter_mut().enumerate() {
            if let Some(pt) = map.get_mut(agent.pos) {
                pt.state.remove(flag);
            }

            let feelers = look_around(map, agent.pos, feeler_length);
            let chosen = look::choose_direction(set.look_rule, &feelers, agent.facing, &mut agent.memory, &mut agent.rng);

            if let Some(dir) = chosen {
                let target = agent.pos.moved(dir);
                if can_step(map, agent.pos, dir, target) {
                    agent.pos = target;
                    agent.facing = dir;
                }
            }

            if let Some(pt) = map.get_mut(agent.pos) {
                pt.state.insert(flag);
            }

            if let (Some(trail_ref), Some(trails)) = (agent.trail, self.trails.as_mut()) {
                if let Some(existing) = trails.get(trail_ref).cloned() {
                    let mut points = existing.points();
                    points.push(map.get(agent.pos).unwrap().location);
                    trails.move_shape(trail_ref, SalaShape::polyline(points));
                }
            }

            agent.ticks_left = agent.ticks_left.saturating_sub(1);
            if agent.ticks_left == 0 {
                retired.push(i);
            }
        }

        for &i in retired.iter().rev() {
            let agent = self.agents.remove(i);
            if let Some(pt) = map.get_mut(agent.pos) {
                pt.state.remove(flag);
            }
        }

        Ok(())
    }
}

/// A diagonal step is rejected if both orthogonal flanking cells are
/// blocked ("agents never cut a blocked corner"); a straight
/// step is rejected only if the destination itself is closed.
fn can_step(map: &PointMap, from: PixelRef, dir: Direction, to: PixelRef) -> bool {
    let Some(dest) = map.get(to) else { return false };
    if !dest.is_open() {
        return false;
    }
    let is_diagonal = matches!(dir, Direction::Ne | Direction::Nw | Direction::Sw | Direction::Se);
    if !is_diagonal {
        return true;
    }
    let (h, v) = match dir {
        Direction::Ne => (Direction::E, Direction::N),
        Direction::Nw => (Direction::W, Direction::N),
        Direction::Sw => (Direction::W, Direction::S),
        Direction::Se => (Direction::E, Direction::S),
        _ => unreachable!(),
    };
    let h_open = map.get(from.moved(h)).map(Point::is_open).unwrap_or(false);
    let v_open = map.get(from.moved(v)).map(Point::is_open).unwrap_or(false);
    h_open || v_open
}

/// Casts a feeler along each of the 8 directions from `pos`, counting
/// how many consecutive open cells lie ahead before a wall or the
/// `max_len` cap (vision cone, simplified from the source's
/// continuous field of view to the 8 grid directions `PointMap`
/// already tracks connectivity over).
fn look_around(map: &PointMap, pos: PixelRef, max_len: u32) -> [Feeler; 8] {
    let mut out = [Feeler {
        direction: Direction::E,
        open: false,
        depth: 0,
    }; 8];
    for (i, &dir) in Direction::ALL.iter().enumerate() {
        let mut cur = pos;
        let mut depth = 0;
        let mut open = false;
        for _ in 0..max_len {
            let next = cur.moved(dir);
            match map.get(next) {
                Some(pt) if pt.is_open() => {
                    depth += 1;
                    open = true;
                    cur = next;
                }
                _ => break,
            }
        }
        out[i] = Feeler { direction: dir, open, depth };
    }
    out
}

/// Knuth's direct-simulation Poisson sampler; adequate for the small
/// per-tick lambdas agent release rates use, and keeps the
/// crate's dependency stack unchanged rather than pulling in `rand_distr`
/// for one distribution.
fn sample_poisson(rng: &mut StdRng, lambda: f64) -> u32 {
    if lambda <= 0.0 {
        return 0;
    }
    let l = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= l {
            return k - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NullCommunicator;
    use crate::geom::Region;
    use crate::grid::build_visibility;
    use nalgebra::Vector2;

    fn small_room() -> PointMap {
        let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let mut map = PointMap::new(region, 1.0).unwrap();
        map.fill_region(&region);
        build_visibility(&mut map, &[], &NullCommunicator).unwrap();
        map
    }

    #[test]
    fn release_is_deterministic_for_the_same_seed() {
        let map = small_room();
        let set = AgentSet {
            release_rate: 5.0,
            ..Default::default()
        };
        let mut a = AgentEngine::new(99);
        let mut b = AgentEngine::new(99);
        a.release(&map, &set);
        b.release(&map, &set);
        assert_eq!(a.agent_count(), b.agent_count());
    }

    #[test]
    fn agents_never_move_onto_a_blocked_cell() {
        let mut map = small_room();
        map.get_mut(PixelRef::new(5, 5)).unwrap().set_blocked();
        let set = AgentSet {
            release_rate: 20.0,
            lifetime: 50,
            ..Default::default()
        };
        let mut engine = AgentEngine::new(7);
        engine.release(&map, &set);
        for _ in 0..30 {
            engine.step(&mut map, &set).unwrap();
        }
        assert!(!map.get(PixelRef::new(5, 5)).unwrap().state.contains(set.group.flag()));
    }

    #[test]
    fn agents_retire_after_their_lifetime() {
        let map = small_room();
        let set = AgentSet {
            release_rate: 10.0,
            lifetime: 3,
            ..Default::default()
        };
        let mut engine = AgentEngine::new(1);
        let mut map = map;
        engine.release(&map, &set);
        assert!(engine.agent_count() > 0);
        for _ in 0..3 {
            engine.step(&mut map, &set).unwrap();
        }
        assert_eq!(engine.agent_count(), 0);
    }

    #[test]
    fn trail_recording_grows_a_polyline_per_agent() {
        let mut map = small_room();
        let set = AgentSet {
            release_rate: 1.0,
            lifetime: 10,
            record_trails: true,
            ..Default::default()
        };
        let mut engine = AgentEngine::new(3);
        engine.release(&map, &set);
        for _ in 0..5 {
            engine.step(&mut map, &set).unwrap();
        }
        let trails = engine.trails.as_ref().unwrap();
        assert!(!trails.is_empty());
    }
}
