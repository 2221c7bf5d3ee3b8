//! Shot probability math (stateless).
//!
//! ## Pipeline
//! ```text
//! composite(attributes, stamina, zone) - contest * contest_weight
//!     → logistic(midpoint, k) → clamp [0.01, 0.99]
//!     → apply_modifiers(move + effects + home court) → clamp
//!     → resolve_shot: ONE Bernoulli draw
//! ```

use rand::Rng;

use super::state::AgentState;
use crate::models::{Attribute, RuleSet, ShotZone};

/// Lower bound on any rolled probability.
pub const MIN_PROBABILITY: f64 = 0.01;
/// Upper bound on any rolled probability.
pub const MAX_PROBABILITY: f64 = 0.99;

#[inline]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return MIN_PROBABILITY;
    }
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Standard logistic curve.
#[inline]
pub fn logistic(x: f64, midpoint: f64, k: f64) -> f64 {
    1.0 / (1.0 + (-k * (x - midpoint)).exp())
}

/// Attribute composite for a zone on the 0..=100 scale, before stamina.
pub fn zone_composite(shooter: &AgentState<'_>, zone: ShotZone) -> f64 {
    let scoring = shooter.attr(Attribute::Scoring);
    let speed = shooter.attr(Attribute::Speed);
    let iq = shooter.attr(Attribute::Iq);
    match zone {
        ShotZone::AtRim => 0.6 * scoring + 0.3 * speed + 0.1 * iq,
        ShotZone::MidRange => 0.7 * scoring + 0.3 * iq,
        ShotZone::ThreePoint => 0.85 * scoring + 0.15 * iq,
        ShotZone::FreeThrow => 0.8 * scoring + 0.2 * iq,
    }
}

/// Probability that `shooter` makes a shot from `zone` against a contest.
///
/// `defender_contest` is roughly 0..1 (see `defense::contest_strength`); free
/// throws ignore it. Fate shifts the composite during the Elam period.
/// Always returns a value in `[MIN_PROBABILITY, MAX_PROBABILITY]`.
pub fn shot_probability(
    shooter: &AgentState<'_>,
    zone: ShotZone,
    defender_contest: f64,
    rules: &RuleSet,
    elam: bool,
) -> f64 {
    let stamina_factor = 0.7 + 0.3 * shooter.stamina.clamp(0.0, 1.0);
    let mut composite = zone_composite(shooter, zone) * stamina_factor;

    if elam {
        composite += (shooter.attr(Attribute::Fate) - 50.0) * 0.1;
    }

    if zone.is_field_goal() && defender_contest.is_finite() {
        composite -= defender_contest.max(0.0) * rules.contest_weight;
    }

    let (midpoint, k) = rules.curve_for(zone);
    clamp_probability(logistic(composite, midpoint, k))
}

/// Fold additive modifiers into a probability. Never raises; a broken
/// modifier (NaN, huge) just clamps.
pub fn apply_modifiers(base: f64, deltas: &[f64]) -> f64 {
    let total: f64 = deltas.iter().filter(|d| d.is_finite()).sum();
    clamp_probability(base + total)
}

/// Single Bernoulli draw: exactly one `f64` from the stream per attempt.
#[inline]
pub fn resolve_shot<R: Rng + ?Sized>(probability: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < clamp_probability(probability)
}

/// Bernoulli draw for non-shot events (turnovers, fouls...). Unclamped
/// except to [0, 1], so a zero rate never fires.
#[inline]
pub fn roll<R: Rng + ?Sized>(probability: f64, rng: &mut R) -> bool {
    let p = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
    rng.gen::<f64>() < p
}

/// Weighted index choice with one draw. Non-positive weights never win;
/// if every weight is non-positive the first index is returned.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    let draw = rng.gen::<f64>();
    if total <= 0.0 || weights.is_empty() {
        return 0;
    }
    let mut target = draw * total;
    let mut last_positive = 0;
    for (i, w) in weights.iter().enumerate() {
        if !w.is_finite() || *w <= 0.0 {
            continue;
        }
        last_positive = i;
        if target < *w {
            return i;
        }
        target -= w;
    }
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, Attributes, TeamSide};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn shooter_with(attrs: Attributes) -> Agent {
        Agent::new("s", "Shooter", attrs)
    }

    #[test]
    fn test_median_shooter_probabilities_ordered() {
        let agent = shooter_with(Attributes::default());
        let state = AgentState::new(&agent, TeamSide::Home, true);
        let rules = RuleSet::default();
        let rim = shot_probability(&state, ShotZone::AtRim, 0.4, &rules, false);
        let mid = shot_probability(&state, ShotZone::MidRange, 0.4, &rules, false);
        let three = shot_probability(&state, ShotZone::ThreePoint, 0.4, &rules, false);
        assert!(rim > mid && mid > three, "rim {rim} mid {mid} three {three}");
        assert!((0.2..0.7).contains(&rim));
    }

    #[test]
    fn test_contest_lowers_probability() {
        let agent = shooter_with(Attributes::default());
        let state = AgentState::new(&agent, TeamSide::Home, true);
        let rules = RuleSet::default();
        let open = shot_probability(&state, ShotZone::MidRange, 0.0, &rules, false);
        let contested = shot_probability(&state, ShotZone::MidRange, 0.8, &rules, false);
        assert!(contested < open);
        let ft_open = shot_probability(&state, ShotZone::FreeThrow, 0.0, &rules, false);
        let ft_contested = shot_probability(&state, ShotZone::FreeThrow, 0.8, &rules, false);
        assert_eq!(ft_open, ft_contested);
    }

    #[test]
    fn test_extremes_stay_in_bounds() {
        let mut maxed = Attributes::uniform(0);
        maxed.scoring = 100;
        maxed.speed = 100;
        maxed.iq = 100;
        maxed.fate = 60;
        let hero = shooter_with(maxed);
        let zero = shooter_with(Attributes::uniform(0));
        let mut rules = RuleSet::default();
        rules.at_rim_k = 1.0;
        rules.three_point_k = 1.0;

        for agent in [&hero, &zero] {
            let mut state = AgentState::new(agent, TeamSide::Away, true);
            for stamina in [0.0, 1.0] {
                state.stamina = stamina;
                for zone in [ShotZone::AtRim, ShotZone::MidRange, ShotZone::ThreePoint, ShotZone::FreeThrow] {
                    for contest in [-5.0, 0.0, 10.0, f64::INFINITY, f64::NAN] {
                        for elam in [false, true] {
                            let p = shot_probability(&state, zone, contest, &rules, elam);
                            assert!((MIN_PROBABILITY..=MAX_PROBABILITY).contains(&p), "{p}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_modifiers_clamp() {
        assert_eq!(apply_modifiers(0.5, &[0.9]), MAX_PROBABILITY);
        assert_eq!(apply_modifiers(0.5, &[-0.9]), MIN_PROBABILITY);
        assert_eq!(apply_modifiers(0.5, &[f64::NAN, 0.1]), 0.6);
    }

    #[test]
    fn test_resolve_shot_draws_exactly_once() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let _ = resolve_shot(0.5, &mut a);
        let _: f64 = b.gen();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_negative_modifier_lowers_make_rate() {
        let base = 0.5;
        let trials = 10_000;
        let mut rng_plain = ChaCha8Rng::seed_from_u64(99);
        let mut rng_penalized = ChaCha8Rng::seed_from_u64(99);
        let plain = (0..trials).filter(|_| resolve_shot(apply_modifiers(base, &[0.0]), &mut rng_plain)).count();
        let penalized =
            (0..trials).filter(|_| resolve_shot(apply_modifiers(base, &[-0.3]), &mut rng_penalized)).count();
        assert!(penalized < plain, "penalized {penalized} vs plain {plain}");
        // ~5000 vs ~2000: well outside sampling noise
        assert!(plain - penalized > 2_000);
    }

    #[test]
    fn test_weighted_index_skips_non_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let i = weighted_index(&[0.0, -1.0, 2.0, f64::NAN], &mut rng);
            assert_eq!(i, 2);
        }
        assert_eq!(weighted_index(&[0.0, 0.0], &mut rng), 0);
    }

    #[cfg(all(test, feature = "proptest"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any attribute block, stamina, contest and modifier stays in bounds
            #[test]
            fn prop_probability_bounded(
                scoring in 0u8..=100,
                speed in 0u8..=100,
                iq in 0u8..=100,
                fate in 0u8..=100,
                stamina in -1.0f64..2.0,
                contest in -10.0f64..10.0,
                modifier in -5.0f64..5.0,
                elam in proptest::bool::ANY,
            ) {
                let mut attrs = Attributes::uniform(0);
                attrs.scoring = scoring;
                attrs.speed = speed;
                attrs.iq = iq;
                attrs.fate = fate;
                let agent = Agent::new("p", "P", attrs);
                let mut state = AgentState::new(&agent, TeamSide::Home, true);
                state.stamina = stamina;
                let rules = RuleSet::default();
                for zone in [ShotZone::AtRim, ShotZone::MidRange, ShotZone::ThreePoint, ShotZone::FreeThrow] {
                    let p = apply_modifiers(shot_probability(&state, zone, contest, &rules, elam), &[modifier]);
                    prop_assert!((MIN_PROBABILITY..=MAX_PROBABILITY).contains(&p));
                }
            }
        }
    }
}
