use rand::seq::SliceRandom;
use rand::Rng;
use review_config::HttpConfig;
use std::time::Duration;

/// Identity rotation and throttling applied to every outgoing request
pub trait RequestPolicy: Send + Sync {
    fn user_agent(&self) -> String;

    /// Pause before each attempt
    fn pause(&self) -> Duration;
}

/// Random user agent from a fixed pool and a uniformly jittered delay
pub struct RandomizedPolicy {
    user_agents: Vec<String>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl RandomizedPolicy {
    pub fn new(user_agents: Vec<String>, min_delay: Duration, max_delay: Duration) -> Self {
        let min_delay_ms = min_delay.as_millis() as u64;
        let max_delay_ms = (max_delay.as_millis() as u64).max(min_delay_ms);
        Self {
            user_agents: user_agents.into_iter().filter(|ua| !ua.trim().is_empty()).collect(),
            min_delay_ms,
            max_delay_ms,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(
            config.user_agents.clone(),
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl RequestPolicy for RandomizedPolicy {
    fn user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "Mozilla/5.0".to_string())
    }

    fn pause(&self) -> Duration {
        if self.min_delay_ms == self.max_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Deterministic policy: one user agent, constant delay
pub struct FixedPolicy {
    user_agent: String,
    pause: Duration,
}

impl FixedPolicy {
    pub fn new(user_agent: impl Into<String>, pause: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            pause,
        }
    }

    /// No delay at all
    pub fn immediate() -> Self {
        Self::new("reviewscope-test", Duration::ZERO)
    }
}

impl RequestPolicy for FixedPolicy {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn pause(&self) -> Duration {
        self.pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomized_policy_stays_in_bounds() {
        let policy = RandomizedPolicy::new(
            vec!["a".to_string(), "b".to_string()],
            Duration::from_millis(500),
            Duration::from_millis(1500),
        );

        for _ in 0..200 {
            let pause = policy.pause();
            assert!(pause >= Duration::from_millis(500));
            assert!(pause <= Duration::from_millis(1500));
            let ua = policy.user_agent();
            assert!(ua == "a" || ua == "b");
        }
    }

    #[test]
    fn test_randomized_policy_empty_pool_falls_back() {
        let policy = RandomizedPolicy::new(vec!["  ".to_string()], Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.user_agent(), "Mozilla/5.0");
        assert_eq!(policy.pause(), Duration::ZERO);
    }

    #[test]
    fn test_inverted_bounds_are_normalized() {
        let policy = RandomizedPolicy::new(vec!["a".to_string()], Duration::from_millis(900), Duration::from_millis(100));
        assert_eq!(policy.pause(), Duration::from_millis(900));
    }
}
