//! Weighted voting primitives
//!
//! A request advances only when BOTH the number of distinct approvers and
//! their summed weight reach the policy's threshold. Neither condition alone
//! is sufficient.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::ids::PrincipalId;
use crate::window;

/// The (count, weight) pair a request must reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub required_count: u32,
    pub required_weight: u64,
}

impl Threshold {
    pub fn new(required_count: u32, required_weight: u64) -> Self {
        Self {
            required_count,
            required_weight,
        }
    }

    /// Conjunctive check: count AND weight must both be reached
    pub fn is_met_by(&self, tally: Tally) -> bool {
        tally.count >= self.required_count && tally.weight >= self.required_weight
    }
}

/// Accumulated approvals at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub count: u32,
    pub weight: u64,
}

impl Tally {
    fn add(self, weight: u64) -> Self {
        Self {
            count: self.count.saturating_add(1),
            weight: self.weight.saturating_add(weight),
        }
    }
}

/// A single principal's approval, with the weight it carried when given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub principal: PrincipalId,
    pub weight: u64,
    pub approved_at: Timestamp,
}

/// Approvals on one request, at most one per principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalSet(Vec<Approval>);

impl ApprovalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, principal: &PrincipalId) -> bool {
        self.0.iter().any(|a| &a.principal == principal)
    }

    /// Add an approval; returns false (and changes nothing) on a duplicate
    pub fn insert(&mut self, approval: Approval) -> bool {
        if self.contains(&approval.principal) {
            return false;
        }
        self.0.push(approval);
        true
    }

    /// Count and weight of every recorded approval
    pub fn tally(&self) -> Tally {
        self.0.iter().fold(Tally::default(), |t, a| t.add(a.weight))
    }

    /// Count and weight of approvals no older than `window` at `now`
    pub fn tally_within(&self, now: Timestamp, window: Duration) -> Tally {
        self.0
            .iter()
            .filter(|a| window::within_window(a.approved_at, window, now))
            .fold(Tally::default(), |t, a| t.add(a.weight))
    }

    pub fn principals(&self) -> Vec<&PrincipalId> {
        self.0.iter().map(|a| &a.principal).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Approval> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn approval(who: &str, weight: u64, at: Timestamp) -> Approval {
        Approval {
            principal: PrincipalId::from(who),
            weight,
            approved_at: at,
        }
    }

    #[test]
    fn test_threshold_is_conjunctive() {
        let threshold = Threshold::new(2, 200);

        // Enough weight, not enough signers
        assert!(!threshold.is_met_by(Tally { count: 1, weight: 500 }));
        // Enough signers, not enough weight
        assert!(!threshold.is_met_by(Tally { count: 3, weight: 150 }));
        // Both
        assert!(threshold.is_met_by(Tally { count: 2, weight: 200 }));
    }

    #[test]
    fn test_duplicate_approval_ignored() {
        let now = Utc::now();
        let mut set = ApprovalSet::new();

        assert!(set.insert(approval("alice", 100, now)));
        assert!(!set.insert(approval("alice", 100, now)));

        assert_eq!(set.len(), 1);
        assert_eq!(set.tally(), Tally { count: 1, weight: 100 });
    }

    #[test]
    fn test_tally_within_excludes_stale_approvals() {
        let now = Utc::now();
        let mut set = ApprovalSet::new();
        set.insert(approval("g1", 100, now - Duration::hours(3)));
        set.insert(approval("g2", 150, now - Duration::minutes(30)));
        set.insert(approval("g3", 50, now));

        let tally = set.tally_within(now, Duration::hours(1));
        assert_eq!(tally, Tally { count: 2, weight: 200 });
        assert_eq!(set.tally(), Tally { count: 3, weight: 300 });
    }

    #[test]
    fn test_tally_saturates() {
        let now = Utc::now();
        let mut set = ApprovalSet::new();
        set.insert(approval("a", u64::MAX, now));
        set.insert(approval("b", 10, now));

        assert_eq!(set.tally().weight, u64::MAX);
    }
}
