//! Fallback replies for messages no plugin answered

use rand::seq::SliceRandom;

pub const DEFAULT_FALLBACK: &str = "I don't understand.";

/// Picks the "don't understand" reply
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    phrases: Vec<String>,
}

impl FallbackPolicy {
    pub fn new(phrases: Vec<String>) -> Self {
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Uniformly random phrase, or [`DEFAULT_FALLBACK`] when none are configured
    pub fn choose(&self) -> String {
        self.phrases
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sentence_without_phrases() {
        assert_eq!(FallbackPolicy::default().choose(), DEFAULT_FALLBACK);
        assert_eq!(FallbackPolicy::new(Vec::new()).choose(), DEFAULT_FALLBACK);
    }

    #[test]
    fn test_choice_comes_from_pool() {
        let policy = FallbackPolicy::new(vec!["a".to_string(), "b".to_string()]);
        for _ in 0..100 {
            let picked = policy.choose();
            assert!(picked == "a" || picked == "b", "unexpected fallback {picked}");
        }
    }
}
