use rand::seq::SliceRandom;

use crate::constants::DEFAULT_USER_AGENTS;
use crate::error::{Result, ScraperError};

/// Rotates the client signature presented to remote sources.
///
/// `next` walks the pool cyclically; `random` picks uniformly and leaves the cursor alone.
#[derive(Debug, Clone)]
pub struct IdentityRotator {
    identities: Vec<String>,
    cursor: usize,
}

impl IdentityRotator {
    /// Build a rotator over `identities`; an empty pool is an error
    pub fn new(identities: Vec<String>) -> Result<Self> {
        if identities.is_empty() {
            return Err(ScraperError::EmptyIdentityPool);
        }
        let mut rotator = Self {
            identities: Vec::with_capacity(identities.len()),
            cursor: 0,
        };
        for identity in identities {
            rotator.add(identity);
        }
        if rotator.identities.is_empty() {
            return Err(ScraperError::EmptyIdentityPool);
        }
        Ok(rotator)
    }

    /// Build a rotator over `identities`, using the built-in browser pool when it is empty
    pub fn or_default(identities: Vec<String>) -> Self {
        Self::new(identities).unwrap_or_default()
    }

    pub fn next(&mut self) -> &str {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.identities.len();
        &self.identities[index]
    }

    pub fn random(&self) -> &str {
        self.identities
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            // pool is never empty after construction
            .unwrap_or_default()
    }

    /// Append an identity unless it is blank or already pooled
    pub fn add(&mut self, identity: impl Into<String>) {
        let identity = identity.into();
        if !identity.trim().is_empty() && !self.identities.contains(&identity) {
            self.identities.push(identity);
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self {
            identities: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            cursor: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_next_cycles_and_wraps() {
        let mut rotator = IdentityRotator::new(pool()).unwrap();
        let seen: Vec<String> = (0..4).map(|_| rotator.next().to_string()).collect();
        assert_eq!(seen, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_random_does_not_move_cursor() {
        let mut rotator = IdentityRotator::new(pool()).unwrap();
        for _ in 0..10 {
            assert!(pool().contains(&rotator.random().to_string()));
        }
        assert_eq!(rotator.next(), "a");
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut rotator = IdentityRotator::new(pool()).unwrap();
        rotator.add("d");
        rotator.add("d");
        rotator.add("a");
        rotator.add("  ");
        assert_eq!(rotator.len(), 4);
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(matches!(
            IdentityRotator::new(Vec::new()),
            Err(ScraperError::EmptyIdentityPool)
        ));
    }

    #[test]
    fn test_or_default_falls_back_to_browser_pool() {
        let rotator = IdentityRotator::or_default(Vec::new());
        assert_eq!(rotator.len(), DEFAULT_USER_AGENTS.len());
        assert!(rotator.random().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_duplicate_input_is_collapsed() {
        let rotator =
            IdentityRotator::new(vec!["a".to_string(), "a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(rotator.len(), 2);
    }
}
