//! Celebration effect for high quiz scores
//!
//! The effect is decorative and fire-and-forget: the engine calls
//! `Celebration::fire` once per qualifying result and never waits on it.

use serde::Deserialize;
use tracing::debug;

/// Default score at or above which a result is celebrated
pub const CELEBRATION_THRESHOLD: f32 = 80.0;

/// Parameters of one confetti burst
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfettiBurst {
    pub particle_count: u32,

    /// Angular spread in degrees
    pub spread: f32,

    /// Horizontal origin as a fraction of the viewport width
    pub origin_x: f32,

    /// Vertical origin as a fraction of the viewport height
    pub origin_y: f32,
}

impl Default for ConfettiBurst {
    fn default() -> Self {
        Self {
            particle_count: 100,
            spread: 70.0,
            origin_x: 0.5,
            origin_y: 0.6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CelebrationConfig {
    pub threshold: f32,
    pub burst: ConfettiBurst,
}

impl Default for CelebrationConfig {
    fn default() -> Self {
        Self {
            threshold: CELEBRATION_THRESHOLD,
            burst: ConfettiBurst::default(),
        }
    }
}

impl CelebrationConfig {
    pub fn should_celebrate(&self, score: f32) -> bool {
        score >= self.threshold
    }
}

/// Visual effect sink
pub trait Celebration: Send + Sync {
    fn fire(&self, burst: &ConfettiBurst);
}

/// Celebration that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCelebration;

impl Celebration for NoCelebration {
    fn fire(&self, burst: &ConfettiBurst) {
        debug!("Celebration requested ({} particles)", burst.particle_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let config = CelebrationConfig::default();
        assert!(config.should_celebrate(80.0));
        assert!(config.should_celebrate(85.0));
        assert!(!config.should_celebrate(79.0));
        assert!(!config.should_celebrate(79.9));
    }

    #[test]
    fn test_burst_from_toml() {
        let config: CelebrationConfig = toml::from_str(
            r#"
            threshold = 90.0
            [burst]
            particle_count = 150
            "#,
        )
        .unwrap();
        assert_eq!(config.threshold, 90.0);
        assert_eq!(config.burst.particle_count, 150);
        assert_eq!(config.burst.spread, 70.0);
    }
}
