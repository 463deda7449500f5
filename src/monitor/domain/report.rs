//! Aggregated results of one dispatch.

use super::{MonitorName, MonitorResult};
use crate::connection::domain::AgentName;
use std::collections::BTreeMap;

/// One (monitor, agent) pair of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonitorCell {
    monitor: MonitorName,
    agent: AgentName,
}

impl MonitorCell {
    /// Creates a cell.
    #[must_use]
    pub const fn new(monitor: MonitorName, agent: AgentName) -> Self {
        Self { monitor, agent }
    }

    /// Returns the monitor name.
    #[must_use]
    pub const fn monitor(&self) -> &MonitorName {
        &self.monitor
    }

    /// Returns the agent name.
    #[must_use]
    pub const fn agent(&self) -> &AgentName {
        &self.agent
    }
}

/// Results of a dispatch keyed by cell, iterated in monitor-then-agent order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorReport {
    results: BTreeMap<MonitorCell, MonitorResult>,
    cancelled: bool,
}

impl MonitorReport {
    /// Creates a report from collected results.
    #[must_use]
    pub const fn new(results: BTreeMap<MonitorCell, MonitorResult>, cancelled: bool) -> Self {
        Self { results, cancelled }
    }

    /// Returns the result for `monitor` on `agent`.
    #[must_use]
    pub fn get(&self, monitor: &MonitorName, agent: &AgentName) -> Option<&MonitorResult> {
        self.results
            .get(&MonitorCell::new(monitor.clone(), agent.clone()))
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns whether the report has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns whether the dispatch was cancelled before completing.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Iterates cells in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&MonitorCell, &MonitorResult)> {
        self.results.iter()
    }

    /// Returns the cells whose check failed.
    #[must_use]
    pub fn failures(&self) -> Vec<(&MonitorCell, &MonitorResult)> {
        self.iter().filter(|(_, result)| result.is_failed()).collect()
    }

    /// Returns the cells whose check has no implementation.
    #[must_use]
    pub fn ignored(&self) -> Vec<&MonitorCell> {
        self.iter()
            .filter(|(_, result)| result.is_ignored())
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Returns every result for one agent, ordered by monitor name.
    #[must_use]
    pub fn for_agent(&self, agent: &AgentName) -> Vec<(&MonitorName, &MonitorResult)> {
        self.iter()
            .filter(|(cell, _)| cell.agent() == agent)
            .map(|(cell, result)| (cell.monitor(), result))
            .collect()
    }
}
