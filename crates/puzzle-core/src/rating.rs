//! Glicko-2 rating updates for a solver and a puzzle.
//!
//! Each attempt is one game between the solver and the puzzle. Before the game,
//! each side's deviation grows with the rating periods it sat idle.
//! Reference: Glickman, "Example of the Glicko-2 system" (2013).

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Conversion factor between the Glicko and Glicko-2 scales.
const SCALE: f64 = 173.7178;
const BASE_RATING: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub value: f64,
    pub deviation: f64,
    pub volatility: f64,
}

impl Rating {
    pub fn new(value: f64, deviation: f64, volatility: f64) -> Self {
        Self {
            value,
            deviation,
            volatility,
        }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::new(1500.0, 350.0, 0.06)
    }
}

#[derive(Debug, Clone)]
pub struct RatingConfig {
    /// System constant constraining volatility change.
    pub tau: f64,
    pub min_deviation: f64,
    pub max_deviation: f64,
    /// Idle time that counts as one rating period when inflating deviation.
    pub rating_period: Duration,
    pub convergence_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            tau: 0.5,
            min_deviation: 30.0,
            max_deviation: 350.0,
            rating_period: Duration::hours(24),
            convergence_tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// A rating plus the time it was last updated (`None` if never).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatedParty {
    pub rating: Rating,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RatedParty {
    pub fn new(rating: Rating, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            rating,
            last_updated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingUpdate {
    pub solver: Rating,
    pub puzzle: Rating,
}

#[derive(Debug, Clone, Default)]
pub struct RatingUpdater {
    config: RatingConfig,
}

impl RatingUpdater {
    pub fn new(config: RatingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Grow the deviation by the rating periods elapsed between `last_updated`
    /// and `at`, capped at the configured maximum.
    pub fn inflate_deviation(
        &self,
        party: &RatedParty,
        at: DateTime<Utc>,
    ) -> Rating {
        let mut rating = party.rating;
        let Some(last) = party.last_updated else {
            return rating;
        };
        let period_secs = self.config.rating_period.num_seconds().max(1) as f64;
        let periods = ((at - last).num_seconds().max(0) as f64) / period_secs;
        let sigma = rating.volatility * SCALE;
        let inflated = (rating.deviation.powi(2) + periods * sigma.powi(2)).sqrt();
        rating.deviation = self.clamp_deviation(inflated);
        rating
    }

    /// Rate one attempt. `solved` means the solver won the game against the
    /// puzzle. Idle time is measured up to `started`.
    pub fn update(
        &self,
        solver: &RatedParty,
        puzzle: &RatedParty,
        solved: bool,
        started: DateTime<Utc>,
        ended: DateTime<Utc>,
    ) -> RatingUpdate {
        let solver_before = self.inflate_deviation(solver, started);
        let puzzle_before = self.inflate_deviation(puzzle, started);
        let (solver_score, puzzle_score) = if solved { (1.0, 0.0) } else { (0.0, 1.0) };

        tracing::debug!(
            solved,
            duration_secs = (ended - started).num_seconds(),
            solver_before = solver_before.value,
            puzzle_before = puzzle_before.value,
            "Rating attempt"
        );

        RatingUpdate {
            solver: self.rate_game(solver_before, puzzle_before, solver_score),
            puzzle: self.rate_game(puzzle_before, solver_before, puzzle_score),
        }
    }

    /// Glicko-2 update for a single game of `player` against `opponent`.
    fn rate_game(&self, player: Rating, opponent: Rating, score: f64) -> Rating {
        let mu = (player.value - BASE_RATING) / SCALE;
        let phi = player.deviation / SCALE;
        let mu_j = (opponent.value - BASE_RATING) / SCALE;
        let phi_j = opponent.deviation / SCALE;

        let g = g(phi_j);
        let e = expected_score(mu, mu_j, g);
        let v = 1.0 / (g.powi(2) * e * (1.0 - e));
        let delta = v * g * (score - e);

        let sigma = self.new_volatility(phi, player.volatility, v, delta);

        let phi_star = (phi.powi(2) + sigma.powi(2)).sqrt();
        let phi_new = 1.0 / (1.0 / phi_star.powi(2) + 1.0 / v).sqrt();
        let mu_new = mu + phi_new.powi(2) * g * (score - e);

        Rating {
            value: mu_new * SCALE + BASE_RATING,
            deviation: self.clamp_deviation(phi_new * SCALE),
            volatility: sigma,
        }
    }

    /// Solve for the new volatility with the Illinois variant of regula falsi.
    fn new_volatility(&self, phi: f64, sigma: f64, v: f64, delta: f64) -> f64 {
        let tau = self.config.tau;
        let a = sigma.powi(2).ln();
        let f = |x: f64| {
            let ex = x.exp();
            let denom = phi.powi(2) + v + ex;
            ex * (delta.powi(2) - phi.powi(2) - v - ex) / (2.0 * denom.powi(2)) - (x - a) / tau.powi(2)
        };

        let mut big_a = a;
        let mut big_b = if delta.powi(2) > phi.powi(2) + v {
            (delta.powi(2) - phi.powi(2) - v).ln()
        } else {
            let mut k = 1.0;
            let mut steps = 0;
            while f(a - k * tau) < 0.0 && steps < self.config.max_iterations {
                k += 1.0;
                steps += 1;
            }
            a - k * tau
        };

        let mut f_a = f(big_a);
        let mut f_b = f(big_b);
        let mut iterations = 0;
        while (big_b - big_a).abs() > self.config.convergence_tolerance
            && iterations < self.config.max_iterations
        {
            let big_c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
            let f_c = f(big_c);
            if f_c * f_b <= 0.0 {
                big_a = big_b;
                f_a = f_b;
            } else {
                f_a /= 2.0;
            }
            big_b = big_c;
            f_b = f_c;
            iterations += 1;
        }

        (big_a / 2.0).exp()
    }

    fn clamp_deviation(&self, deviation: f64) -> f64 {
        deviation.clamp(self.config.min_deviation, self.config.max_deviation)
    }
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi.powi(2) / PI.powi(2)).sqrt()
}

fn expected_score(mu: f64, mu_j: f64, g: f64) -> f64 {
    1.0 / (1.0 + (-g * (mu - mu_j)).exp())
}
