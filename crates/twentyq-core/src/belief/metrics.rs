use super::Posterior;
use serde::Serialize;

/// Coarse summary of a posterior, emitted alongside each turn's trace event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PosteriorMetrics {
    pub active: usize,
    pub total_mass: f64,
    pub top_probability: f64,
    pub margin: f64,
    /// Shannon entropy (nats) of the posterior after normalising its mass to one.
    pub entropy: f64,
}

impl PosteriorMetrics {
    pub fn from_posterior(posterior: &Posterior) -> Self {
        let total_mass = posterior.total();
        let mut top = 0.0_f64;
        let mut second = 0.0_f64;
        let mut entropy = 0.0_f64;

        for entry in posterior.iter() {
            let p = entry.probability;
            if p > top {
                second = top;
                top = p;
            } else if p > second {
                second = p;
            }
            if total_mass > 0.0 && p > 0.0 {
                let share = p / total_mass;
                entropy -= share * share.ln();
            }
        }

        Self {
            active: posterior.len(),
            total_mass,
            top_probability: top,
            margin: top - second,
            entropy,
        }
    }
}
