//! Defensive model: schemes, scheme selection, matchups, stamina economics.
//!
//! RNG contract (stable across versions, replays depend on it):
//! - `select_scheme`: exactly one `f64`
//! - `assign_matchups`: exactly `n * n` standard-normal samples
//! - stamina functions: none

use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use rand::Rng;
use rand_distr::StandardNormal;

use super::probability::weighted_index;
use super::state::{AgentState, TeamState};
use crate::models::{Attribute, RuleSet, SchemeKind, ShotZone};

/// Tunables for one defensive scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeProfile {
    pub kind: SchemeKind,
    pub contest_rim: f64,
    pub contest_mid: f64,
    pub contest_three: f64,
    pub turnover_bonus: f64,
    pub stamina_cost: f64,
    pub foul_factor: f64,
    /// Unbiased selection weight
    pub base_weight: f64,
}

impl SchemeProfile {
    pub fn contest_for(&self, zone: ShotZone) -> f64 {
        match zone {
            ShotZone::AtRim => self.contest_rim,
            ShotZone::MidRange => self.contest_mid,
            ShotZone::ThreePoint => self.contest_three,
            ShotZone::FreeThrow => 0.0,
        }
    }
}

impl SchemeKind {
    pub const ALL: [SchemeKind; 4] =
        [SchemeKind::ManTight, SchemeKind::ManSwitch, SchemeKind::Zone, SchemeKind::Press];

    pub fn profile(&self) -> SchemeProfile {
        match self {
            SchemeKind::ManTight => SchemeProfile {
                kind: *self,
                contest_rim: 0.08,
                contest_mid: 0.08,
                contest_three: 0.08,
                turnover_bonus: 0.02,
                stamina_cost: 0.012,
                foul_factor: 1.3,
                base_weight: 1.0,
            },
            SchemeKind::ManSwitch => SchemeProfile {
                kind: *self,
                contest_rim: 0.05,
                contest_mid: 0.05,
                contest_three: 0.05,
                turnover_bonus: 0.01,
                stamina_cost: 0.008,
                foul_factor: 1.0,
                base_weight: 1.2,
            },
            SchemeKind::Zone => SchemeProfile {
                kind: *self,
                contest_rim: 0.10,
                contest_mid: 0.05,
                contest_three: -0.02,
                turnover_bonus: 0.0,
                stamina_cost: 0.005,
                foul_factor: 0.7,
                base_weight: 0.8,
            },
            SchemeKind::Press => SchemeProfile {
                kind: *self,
                contest_rim: 0.04,
                contest_mid: 0.04,
                contest_three: 0.04,
                turnover_bonus: 0.06,
                stamina_cost: 0.020,
                foul_factor: 1.5,
                base_weight: 0.5,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchemeKind::ManTight => "man_tight",
            SchemeKind::ManSwitch => "man_switch",
            SchemeKind::Zone => "zone",
            SchemeKind::Press => "press",
        }
    }

    pub fn is_legal(&self, rules: &RuleSet) -> bool {
        match self {
            SchemeKind::ManTight => rules.allow_man_tight,
            SchemeKind::ManSwitch => rules.allow_man_switch,
            SchemeKind::Zone => rules.allow_zone,
            SchemeKind::Press => rules.allow_press,
        }
    }
}

/// Schemes the rules allow, in canonical order.
pub fn legal_schemes(rules: &RuleSet) -> Vec<SchemeKind> {
    SchemeKind::ALL.iter().copied().filter(|s| s.is_legal(rules)).collect()
}

/// Offensive threat on the 0..=100 scale, stamina-scaled.
pub fn threat(attacker: &AgentState<'_>) -> f64 {
    let raw = 0.5 * attacker.attr(Attribute::Scoring)
        + 0.2 * attacker.attr(Attribute::Passing)
        + 0.15 * attacker.attr(Attribute::Iq)
        + 0.15 * attacker.attr(Attribute::Speed);
    raw * attacker.stamina
}

/// Defensive containment on the 0..=100 scale, stamina-scaled.
pub fn containment(defender: &AgentState<'_>) -> f64 {
    let raw = 0.6 * defender.attr(Attribute::Defense)
        + 0.2 * defender.attr(Attribute::Speed)
        + 0.2 * defender.attr(Attribute::Iq);
    raw * defender.stamina
}

/// How tiring an attacker is to guard (0..=1).
pub fn drain_factor(attacker: &AgentState<'_>) -> f64 {
    (0.4 * attacker.attr(Attribute::ChaoticAlignment)
        + 0.35 * attacker.attr(Attribute::Speed)
        + 0.25 * attacker.attr(Attribute::Iq))
        / 100.0
}

/// Stamina multiplier: low-Stamina agents tire faster (0.75..=1.25).
pub fn endurance(agent: &AgentState<'_>) -> f64 {
    1.25 - agent.attr(Attribute::Stamina) / 200.0
}

/// Contest strength fed to `shot_probability` (roughly 0..1).
pub fn contest_strength(defender: &AgentState<'_>, zone: ShotZone, scheme: SchemeKind) -> f64 {
    (containment(defender) / 100.0 + scheme.profile().contest_for(zone)).max(0.0)
}

/// Pick this possession's scheme for `defense` against `offense`.
///
/// Always consumes one draw. Illegal schemes get zero weight; if every
/// biased weight collapses, the first legal scheme is used.
pub fn select_scheme<R: Rng + ?Sized>(
    defense: &TeamState<'_>,
    offense: &TeamState<'_>,
    rules: &RuleSet,
    elam: bool,
    rng: &mut R,
) -> SchemeKind {
    let opponent_scoring = offense.avg_attr(Attribute::Scoring);
    let stamina = defense.avg_stamina();
    let foul_trouble =
        defense.max_on_court_fouls() + 2 >= rules.personal_foul_limit && defense.max_on_court_fouls() > 0;
    let differential = defense.score as i64 - offense.score as i64;

    let weights: Vec<f64> = SchemeKind::ALL
        .iter()
        .map(|kind| {
            if !kind.is_legal(rules) {
                return 0.0;
            }
            let mut w = kind.profile().base_weight;
            match kind {
                SchemeKind::Zone => {
                    w *= 1.0 + ((50.0 - opponent_scoring) / 25.0).max(0.0);
                    if foul_trouble {
                        w *= 1.3;
                    }
                    if differential >= 5 {
                        w *= 1.2;
                    }
                }
                SchemeKind::Press => {
                    w *= stamina * stamina;
                    if foul_trouble {
                        w *= 0.5;
                    }
                    if differential <= -5 {
                        w *= 1.5;
                    }
                }
                SchemeKind::ManTight => {
                    if foul_trouble {
                        w *= 0.5;
                    }
                    if differential <= -5 {
                        w *= 1.2;
                    }
                }
                SchemeKind::ManSwitch => {}
            }
            if elam {
                w = w.powf(rules.elam_commitment);
            }
            w
        })
        .collect();

    let picked = SchemeKind::ALL[weighted_index(&weights, rng)];
    if picked.is_legal(rules) {
        picked
    } else {
        legal_schemes(rules).first().copied().unwrap_or(SchemeKind::ManSwitch)
    }
}

/// Optimal defender → attacker assignment, as `(defender_idx, attacker_idx)`
/// roster indices in defender on-court order.
///
/// Cost = mismatch + guard stamina cost + IQ-scaled noise, minimized with
/// the Hungarian algorithm on an integer matrix.
pub fn assign_matchups<R: Rng + ?Sized>(
    defense: &TeamState<'_>,
    offense: &TeamState<'_>,
    rules: &RuleSet,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let defenders = defense.on_court();
    let attackers = offense.on_court();
    let n = defenders.len().min(attackers.len());
    if n == 0 {
        return Vec::new();
    }

    let sd = rules.matchup_variance * (1.5 - defense.avg_attr(Attribute::Iq) / 100.0);
    let noise: Vec<f64> = (0..n * n)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            z * sd
        })
        .collect();

    let costs = Matrix::from_fn(n, n, |(d, a)| {
        let defender = &defense.agents[defenders[d]];
        let attacker = &offense.agents[attackers[a]];
        let mismatch = (threat(attacker) - containment(defender)).max(0.0);
        let guard_cost = 20.0 * drain_factor(attacker) * (1.0 + (1.0 - defender.stamina));
        let cost = mismatch + guard_cost + noise[d * n + a];
        (cost * 100.0).round() as i64
    });

    let (_, assignments) = kuhn_munkres_min(&costs);
    assignments.iter().enumerate().map(|(d, &a)| (defenders[d], attackers[a])).collect()
}

/// Per-possession stamina change for both sides.
///
/// `matchups` are `(defender_idx, attacker_idx)` pairs; a defender with no
/// assignment uses an average drain factor of 0.5.
pub fn apply_possession_stamina(
    offense: &mut TeamState<'_>,
    defense: &mut TeamState<'_>,
    scheme: SchemeKind,
    ball_handler: usize,
    matchups: &[(usize, usize)],
    rules: &RuleSet,
) {
    let floor = rules.stamina_floor;
    let profile = scheme.profile();

    let guarded: Vec<(usize, f64)> = matchups
        .iter()
        .map(|&(d, a)| (d, drain_factor(&offense.agents[a])))
        .collect();

    for (i, agent) in offense.agents.iter_mut().enumerate() {
        if agent.on_court {
            let e = endurance(agent);
            let mut amount = rules.stamina_drain_per_possession * e;
            if i == ball_handler {
                amount += rules.ball_handler_drain * e;
            }
            agent.drain(amount, floor);
        } else {
            agent.recover(rules.bench_recovery_per_possession, floor);
        }
    }

    for (i, agent) in defense.agents.iter_mut().enumerate() {
        if agent.on_court {
            let e = endurance(agent);
            let factor = guarded.iter().find(|(d, _)| *d == i).map(|(_, f)| *f).unwrap_or(0.5);
            let amount = rules.stamina_drain_per_possession * e + profile.stamina_cost * e * (0.5 + factor);
            agent.drain(amount, floor);
        } else {
            agent.recover(rules.bench_recovery_per_possession, floor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, Attributes, Team, TeamSide};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn team_from(id: &str, attrs: [Attributes; 3]) -> Team {
        Team::new(
            id,
            id,
            attrs.iter().enumerate().map(|(i, a)| Agent::new(format!("{id}-{i}"), format!("P{i}"), *a)).collect(),
        )
    }

    fn median(id: &str) -> Team {
        team_from(id, [Attributes::default(); 3])
    }

    #[test]
    fn test_scheme_table() {
        let zone = SchemeKind::Zone.profile();
        assert_eq!(zone.contest_for(ShotZone::ThreePoint), -0.02);
        assert_eq!(zone.contest_for(ShotZone::FreeThrow), 0.0);
        assert_eq!(SchemeKind::Press.profile().turnover_bonus, 0.06);
        assert_eq!(SchemeKind::ManTight.profile().foul_factor, 1.3);
    }

    #[test]
    fn test_only_legal_scheme_selected() {
        let home = median("h");
        let away = median("a");
        let d = TeamState::new(&home, TeamSide::Home);
        let o = TeamState::new(&away, TeamSide::Away);
        let mut rules = RuleSet::default();
        rules.allow_man_tight = false;
        rules.allow_man_switch = false;
        rules.allow_press = false;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(select_scheme(&d, &o, &rules, false, &mut rng), SchemeKind::Zone);
            assert_eq!(select_scheme(&d, &o, &rules, true, &mut rng), SchemeKind::Zone);
        }
    }

    #[test]
    fn test_weak_shooters_draw_more_zone() {
        let mut weak = Attributes::default();
        weak.scoring = 5;
        let home = median("h");
        let shooters = median("a");
        let bricklayers = team_from("b", [weak; 3]);
        let rules = RuleSet::default();
        let d = TeamState::new(&home, TeamSide::Home);
        let strong_o = TeamState::new(&shooters, TeamSide::Away);
        let weak_o = TeamState::new(&bricklayers, TeamSide::Away);

        let count_zone = |o: &TeamState<'_>| {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            (0..2_000).filter(|_| select_scheme(&d, o, &rules, false, &mut rng) == SchemeKind::Zone).count()
        };
        assert!(count_zone(&weak_o) > count_zone(&strong_o));
    }

    #[test]
    fn test_scheme_selection_single_draw() {
        let home = median("h");
        let away = median("a");
        let d = TeamState::new(&home, TeamSide::Home);
        let o = TeamState::new(&away, TeamSide::Away);
        let mut a = ChaCha8Rng::seed_from_u64(5);
        let mut b = ChaCha8Rng::seed_from_u64(5);
        select_scheme(&d, &o, &RuleSet::default(), false, &mut a);
        let _: f64 = b.gen();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_matchups_are_a_permutation() {
        let home = median("h");
        let away = median("a");
        let d = TeamState::new(&home, TeamSide::Home);
        let o = TeamState::new(&away, TeamSide::Away);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let pairs = assign_matchups(&d, &o, &RuleSet::default(), &mut rng);
        assert_eq!(pairs.len(), 3);
        let mut attackers: Vec<usize> = pairs.iter().map(|(_, a)| *a).collect();
        attackers.sort_unstable();
        assert_eq!(attackers, vec![0, 1, 2]);
    }

    #[test]
    fn test_best_defender_takes_star_without_noise() {
        let mut star = Attributes::uniform(20);
        star.scoring = 100;
        star.speed = 60;
        let mut stopper = Attributes::uniform(20);
        stopper.defense = 100;
        stopper.speed = 60;
        let offense_team = team_from("o", [Attributes::uniform(20), star, Attributes::uniform(20)]);
        let defense_team = team_from("d", [Attributes::uniform(20), Attributes::uniform(20), stopper]);
        let o = TeamState::new(&offense_team, TeamSide::Away);
        let d = TeamState::new(&defense_team, TeamSide::Home);
        let mut rules = RuleSet::default();
        rules.matchup_variance = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pairs = assign_matchups(&d, &o, &rules, &mut rng);
        assert!(pairs.contains(&(2, 1)), "{pairs:?}");
    }

    #[test]
    fn test_defense_drains_more_under_press() {
        let home = median("h");
        let away = median("a");
        let rules = RuleSet::default();
        let run = |scheme: SchemeKind| {
            let mut o = TeamState::new(&away, TeamSide::Away);
            let mut d = TeamState::new(&home, TeamSide::Home);
            apply_possession_stamina(&mut o, &mut d, scheme, 0, &[(0, 0), (1, 1), (2, 2)], &rules);
            (o.agents[0].stamina, o.agents[1].stamina, d.agents[0].stamina)
        };
        let (handler, off_ball, zone_def) = run(SchemeKind::Zone);
        let (_, _, press_def) = run(SchemeKind::Press);
        assert!(handler < off_ball);
        assert!(press_def < zone_def);
    }

    #[test]
    fn test_bench_recovers() {
        let mut roster = median("h");
        roster.agents.push(Agent::new("h-3", "Sixth", Attributes::default()));
        let away = median("a");
        let rules = RuleSet::default();
        let mut d = TeamState::new(&roster, TeamSide::Home);
        let mut o = TeamState::new(&away, TeamSide::Away);
        d.agents[3].stamina = 0.5;
        apply_possession_stamina(&mut o, &mut d, SchemeKind::ManSwitch, 0, &[], &rules);
        assert!((d.agents[3].stamina - (0.5 + rules.bench_recovery_per_possession)).abs() < 1e-12);
    }
}
