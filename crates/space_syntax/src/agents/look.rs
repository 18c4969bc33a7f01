//! Look programs: the rule an agent applies to its 8
//! forward-facing candidate directions (the "feelers") to pick its next
//! heading. Each program consumes the same feeler array shape so
//! `Agent::step` doesn't need to know which one is active.

use rand::Rng;
use rand::rngs::StdRng;

use crate::geom::Direction;

/// Which of the five look programs an `AgentSet` runs (the
/// source's "standard", "los-weighted", "occlusion", "gibsonian", and
/// "gibsonian with dead-end avoidance" rules).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookRule {
    Standard,
    LosWeighted,
    Occlusion,
    Gibsonian,
    GibsonianDeadEnd,
}

/// One candidate heading: whether the cell in that direction is open,
/// and (for the weighted/occlusion rules) how far sight reaches before
/// hitting a wall in that direction, in cells.
#[derive(Clone, Copy, Debug)]
pub struct Feeler {
    pub direction: Direction,
    pub open: bool,
    pub depth: u32,
}

/// Per-agent scratch the occlusion rule double-buffers across ticks
/// (`pflipper`): the previous tick's feeler snapshot, so a
/// newly-occluded direction can be penalised relative to what was
/// visible a moment ago.
#[derive(Clone, Debug, Default)]
pub struct OcclusionMemory {
    pub previous: Option<[Feeler; 8]>,
}

const STRAIGHT_AHEAD_BIAS: f64 = 10.0;
const DEAD_END_PENALTY: f64 = 0.1;

/// Picks the next heading from the current feeler snapshot, `facing`
/// being the agent's current direction (weighted toward straight-ahead
/// continuation, as the source's look rules all do to avoid agents
/// endlessly spinning in place).
pub fn choose_direction(
    rule: LookRule,
    feelers: &[Feeler; 8],
    facing: Direction,
    memory: &mut OcclusionMemory,
    rng: &mut StdRng,
) -> Option<Direction> {
    let weights: Vec<(Direction, f64)> = match rule {
        LookRule::Standard => standard_weights(feelers, facing),
        LookRule::LosWeighted => los_weighted_weights(feelers, facing),
        LookRule::Occlusion => occlusion_weights(feelers, facing, memory),
        LookRule::Gibsonian => gibsonian_weights(feelers, facing, false),
        LookRule::GibsonianDeadEnd => gibsonian_weights(feelers, facing, true),
    };

    let total: f64 = weights.iter().map(|(_, w)| *w).sum();
    if total <= 0.0 {
        return None;
    }
    let mut pick = rng.gen_range(0.0..total);
    for (dir, w) in &weights {
        if pick < *w {
            return Some(*dir);
        }
        pick -= w;
    }
    weights.last().map(|(d, _)| *d)
}

fn open_weights(feelers: &[Feeler; 8], facing: Direction, bias: impl Fn(Direction) -> f64) -> Vec<(Direction, f64)> {
    feelers
        .iter()
        .filter(|f| f.open)
        .map(|f| (f.direction, bias(f.direction)))
        .map(|(d, w)| (d, if d == facing { w * STRAIGHT_AHEAD_BIAS } else { w }))
        .collect()
}

/// Equal weight across every open direction, biased toward continuing
/// straight ahead ("standard" rule).
fn standard_weights(feelers: &[Feeler; 8], facing: Direction) -> Vec<(Direction, f64)> {
    open_weights(feelers, facing, |_| 1.0)
}

/// Weight proportional to how far each feeler sees before a wall
/// ("line-of-sight-weighted" rule): agents drift toward open rooms
/// rather than hugging the nearest wall.
fn los_weighted_weights(feelers: &[Feeler; 8], facing: Direction) -> Vec<(Direction, f64)> {
    open_weights(feelers, facing, |_| 1.0)
        .into_iter()
        .zip(feelers.iter().filter(|f| f.open))
        .map(|((d, w), f)| (d, w * (f.depth as f64 + 1.0)))
        .collect()
}

/// Penalises directions whose sight depth just dropped relative to the
/// previous tick's snapshot (an approaching occluding edge), then
/// refreshes the memory buffer ("occlusion" rule).
fn occlusion_weights(feelers: &[Feeler; 8], facing: Direction, memory: &mut OcclusionMemory) -> Vec<(Direction, f64)> {
    let weights = feelers
        .iter()
        .filter(|f| f.open)
        .map(|f| {
            let prev_depth = memory
                .previous
                .as_ref()
                .map(|p| p[dir_index(f.direction)].depth)
                .unwrap_or(f.depth);
            let shrinking = prev_depth > f.depth;
            let w = if shrinking { 0.25 } else { 1.0 + f.depth as f64 };
            (f.direction, if f.direction == facing { w * STRAIGHT_AHEAD_BIAS } else { w })
        })
        .collect();
    memory.previous = Some(*feelers);
    weights
}

fn dir_index(d: Direction) -> usize {
    Direction::ALL.iter().position(|&x| x == d).unwrap_or(0)
}

/// Weights open directions by depth, turn-angle agreement with the
/// current heading, and (when `avoid_dead_ends` is set) a penalty for
/// directions whose own feeler depth is 1 (a one-step pocket — the
/// "gibsonian-2" dead-end detector).
fn gibsonian_weights(feelers: &[Feeler; 8], facing: Direction, avoid_dead_ends: bool) -> Vec<(Direction, f64)> {
    let facing_idx = dir_index(facing) as i32;
    feelers
        .iter()
        .filter(|f| f.open)
        .map(|f| {
            let idx = dir_index(f.direction) as i32;
            let turn = (idx - facing_idx).rem_euclid(8).min((facing_idx - idx).rem_euclid(8));
            let turn_bias = 1.0 / (1.0 + turn as f64);
            let mut w = (f.depth as f64 + 1.0) * turn_bias;
            if avoid_dead_ends && f.depth <= 1 {
                w *= DEAD_END_PENALTY;
            }
            (f.direction, w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn all_open(depth: u32) -> [Feeler; 8] {
        let mut out = [Feeler { direction: Direction::E, open: true, depth }; 8];
        for (i, d) in Direction::ALL.iter().enumerate() {
            out[i] = Feeler { direction: *d, open: true, depth };
        }
        out
    }

    #[test]
    fn standard_rule_prefers_facing_direction_most_of_the_time() {
        let feelers = all_open(3);
        let mut rng = StdRng::seed_from_u64(1);
        let mut memory = OcclusionMemory::default();
        let mut facing_count = 0;
        for _ in 0..200 {
            if choose_direction(LookRule::Standard, &feelers, Direction::N, &mut memory, &mut rng) == Some(Direction::N) {
                facing_count += 1;
            }
        }
        assert!(facing_count > 100);
    }

    #[test]
    fn gibsonian_dead_end_rule_avoids_one_step_pockets() {
        let mut feelers = all_open(5);
        feelers[dir_index(Direction::S)].depth = 1;
        let mut rng = StdRng::seed_from_u64(2);
        let mut memory = OcclusionMemory::default();
        let mut south_count = 0;
        for _ in 0..500 {
            if choose_direction(LookRule::GibsonianDeadEnd, &feelers, Direction::N, &mut memory, &mut rng) == Some(Direction::S) {
                south_count += 1;
            }
        }
        assert!(south_count < 50);
    }

    #[test]
    fn returns_none_when_every_direction_is_blocked() {
        let mut feelers = all_open(0);
        for f in feelers.iter_mut() {
            f.open = false;
        }
        let mut rng = StdRng::seed_from_u64(3);
        let mut memory = OcclusionMemory::default();
        assert!(choose_direction(LookRule::Standard, &feelers, Direction::N, &mut memory, &mut rng).is_none());
    }
}
