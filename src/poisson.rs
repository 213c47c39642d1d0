use crate::outcome::Prob3;

/// Joint Poisson goal model: sums the independent-goals joint PMF over
/// `h, a in 0..=5` into a three-way outcome distribution and normalizes
/// (spec §4.5 point 3). No Dixon-Coles low-score correlation term is
/// applied here — the contracted ensemble model in spec.md does not call
/// for one, unlike the home-advantage fitting the teacher used it for
/// elsewhere (see DESIGN.md).
pub fn poisson_outcome_probs(lambda_home: f64, lambda_away: f64) -> Prob3 {
    let mut p_home = 0.0_f64;
    let mut p_draw = 0.0_f64;
    let mut p_away = 0.0_f64;

    for h in 0..=5u32 {
        for a in 0..=5u32 {
            let p = poisson_pmf(h, lambda_home) * poisson_pmf(a, lambda_away);
            if h > a {
                p_home += p;
            } else if h == a {
                p_draw += p;
            } else {
                p_away += p;
            }
        }
    }

    Prob3::new(p_home, p_draw, p_away)
}

pub fn poisson_pmf(goals: u32, lambda: f64) -> f64 {
    let numer = lambda.powi(goals as i32) * (-lambda).exp();
    let denom = (1..=goals).fold(1.0_f64, |acc, k| acc * k as f64).max(1.0);
    numer / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_sum_to_one() {
        let p = poisson_outcome_probs(1.4, 1.1);
        assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-9);
    }

    #[test]
    fn higher_home_lambda_favors_home() {
        let p = poisson_outcome_probs(2.2, 0.8);
        assert!(p.home > p.away);
    }

    #[test]
    fn equal_lambdas_favor_draw_over_either_side_individually() {
        let p = poisson_outcome_probs(1.3, 1.3);
        assert!((p.home - p.away).abs() < 1e-9);
    }
}
