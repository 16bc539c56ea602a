// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use axum::http::StatusCode;
use std::collections::HashMap;

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of admitted requests by client
    admitted_per_client: HashMap<String, usize>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    RateLimited,
    Rejected,
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => Outcome::Accepted,
            StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
            _ => Outcome::Rejected,
        }
    }
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, client: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome != Outcome::RateLimited {
            *self
                .admitted_per_client
                .entry(client.to_string())
                .or_insert(0) += 1;
        }
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Admitted requests for one client.
    pub fn admitted_for(&self, client: &str) -> usize {
        self.admitted_per_client.get(client).copied().unwrap_or(0)
    }

    /// Largest number of admissions any single client received.
    pub fn max_admitted_per_client(&self) -> usize {
        self.admitted_per_client.values().copied().max().unwrap_or(0)
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            accepted: self.count(Outcome::Accepted),
            rate_limited: self.count(Outcome::RateLimited),
            rejected: self.count(Outcome::Rejected),
            admitted_clients: self.admitted_per_client.len(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub accepted: usize,
    pub rate_limited: usize,
    pub rejected: usize,
    pub admitted_clients: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Accepted:          {}", self.accepted)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Rejected:          {}", self.rejected)?;
        writeln!(f, "Admitted Clients:  {}", self.admitted_clients)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();

        metrics.record(Outcome::Accepted, "10.0.0.1:1");
        metrics.record(Outcome::Rejected, "10.0.0.1:1");
        metrics.record(Outcome::RateLimited, "10.0.0.1:1");

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Accepted), 1);
        assert_eq!(metrics.admitted_for("10.0.0.1:1"), 2);
    }

    #[test]
    fn test_max_admitted_per_client() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Accepted, "10.0.0.1:1");
        }
        metrics.record(Outcome::Accepted, "10.0.0.2:1");
        metrics.record(Outcome::RateLimited, "10.0.0.2:1");

        assert_eq!(metrics.max_admitted_per_client(), 3);
        assert_eq!(metrics.report().admitted_clients, 2);
        assert_eq!(metrics.report().rate_limited, 1);
    }
}
