//! Per-principal assessment history
//!
//! Bounded ring of recent assessments per principal. It feeds the velocity
//! signal and answers history queries; the oldest entries fall off once the
//! limit is reached.

use std::collections::{HashMap, VecDeque};

use chrono::Duration;
use quorum_core::{PrincipalId, Timestamp};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::assessment::RiskAssessment;

#[derive(Debug)]
pub struct AssessmentHistory {
    limit: usize,
    entries: HashMap<PrincipalId, VecDeque<RiskAssessment>>,
}

impl AssessmentHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: HashMap::new(),
        }
    }

    /// Record an assessment, evicting the oldest if the limit is reached
    pub fn record(&mut self, assessment: RiskAssessment) {
        let queue = self
            .entries
            .entry(assessment.principal_id.clone())
            .or_default();
        if queue.len() == self.limit {
            queue.pop_front();
        }
        queue.push_back(assessment);
    }

    /// Most recent assessment of a principal
    pub fn latest(&self, principal: &PrincipalId) -> Option<&RiskAssessment> {
        self.entries.get(principal).and_then(|q| q.back())
    }

    /// Up to `limit` assessments, most recent first
    pub fn recent(&self, principal: &PrincipalId, limit: usize) -> Vec<RiskAssessment> {
        self.entries
            .get(principal)
            .map(|q| q.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Velocity points at `now`
    ///
    /// Each prior assessment inside the window adds `weight` scaled by the
    /// fraction of the window it still has to run, so recent activity counts
    /// more than old activity.
    pub fn velocity_score(&self, principal: &PrincipalId, now: Timestamp, window: Duration, weight: u32) -> u32 {
        let window_secs = window.num_seconds();
        if window_secs <= 0 {
            return 0;
        }
        let window_secs = Decimal::from(window_secs);
        let weight = Decimal::from(weight);

        let total = self
            .entries
            .get(principal)
            .map(|q| {
                q.iter()
                    .filter(|a| a.checked_at <= now)
                    .map(|a| Decimal::from((now - a.checked_at).num_seconds()))
                    .filter(|age| *age < window_secs)
                    .map(|age| weight * (window_secs - age) / window_secs)
                    .sum::<Decimal>()
            })
            .unwrap_or(Decimal::ZERO);

        total.floor().to_u32().unwrap_or(u32::MAX)
    }

    pub fn len(&self, principal: &PrincipalId) -> usize {
        self.entries.get(principal).map_or(0, VecDeque::len)
    }
}
