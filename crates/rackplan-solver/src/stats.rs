//! Solving statistics.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::params::Parameters;

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Search effort at the moment a solution was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SolutionStatistics {
    pub nodes: u64,
    pub backtracks: u64,
    /// Time since the solve call started, in milliseconds.
    pub time_ms: u64,
    pub objective: Option<i64>,
}

impl fmt::Display for SolutionStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {}ms: {} node(s), {} backtrack(s)",
            self.time_ms, self.nodes, self.backtracks
        )?;
        if let Some(obj) = self.objective {
            write!(f, ", objective: {obj}")?;
        }
        Ok(())
    }
}

/// Statistics of one solve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolvingStatistics {
    pub params: Parameters,
    pub nb_nodes: usize,
    pub nb_vms: usize,
    pub nb_constraints: usize,
    pub nb_managed_vms: usize,
    pub search_nodes: u64,
    pub backtracks: u64,
    pub core_build_ms: u64,
    pub specialization_ms: u64,
    pub solving_ms: u64,
    pub hit_timeout: bool,
    pub start_epoch_ms: u64,
    pub solutions: Vec<SolutionStatistics>,
}

impl SolvingStatistics {
    /// Empty statistics for an instance of the given size.
    pub fn new(params: Parameters, nb_nodes: usize, nb_vms: usize, nb_constraints: usize) -> Self {
        Self {
            params,
            nb_nodes,
            nb_vms,
            nb_constraints,
            nb_managed_vms: 0,
            search_nodes: 0,
            backtracks: 0,
            core_build_ms: 0,
            specialization_ms: 0,
            solving_ms: 0,
            hit_timeout: false,
            start_epoch_ms: epoch_ms(),
            solutions: Vec::new(),
        }
    }

    pub fn is_solved(&self) -> bool {
        !self.solutions.is_empty()
    }
}

/// Render the parameters that matter in a report header.
pub fn write_parameters(f: &mut fmt::Formatter<'_>, params: &Parameters) -> fmt::Result {
    if params.optimize {
        write!(f, "; optimize")?;
    }
    if params.time_limit_secs > 0 {
        write!(f, "; timeout: {}s", params.time_limit_secs)?;
    }
    Ok(())
}

impl fmt::Display for SolvingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node(s); {} VM(s)", self.nb_nodes, self.nb_vms)?;
        if self.nb_managed_vms != self.nb_vms {
            write!(f, " ({} managed)", self.nb_managed_vms)?;
        }
        write!(f, "; {} constraint(s)", self.nb_constraints)?;
        write_parameters(f, &self.params)?;
        write!(
            f,
            "\nBuilding duration: {}ms (core-RP) + {}ms (specialization)",
            self.core_build_ms, self.specialization_ms
        )?;
        write!(f, "\nAfter {}ms of search", self.solving_ms)?;
        f.write_str(if self.hit_timeout { " (timeout)" } else { " (terminated)" })?;
        write!(
            f,
            ": {} opened search node(s), {} backtrack(s), {} solution(s)",
            self.search_nodes,
            self.backtracks,
            self.solutions.len()
        )?;
        if self.solutions.is_empty() {
            return f.write_str(".");
        }
        writeln!(f, ":")?;
        for (i, s) in self.solutions.iter().enumerate() {
            writeln!(f, "\t{}) {s}", i + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_solutions() {
        let mut st = SolvingStatistics::new(Parameters::default(), 3, 6, 2);
        st.nb_managed_vms = 4;
        st.search_nodes = 12;
        st.solutions.push(SolutionStatistics {
            nodes: 12,
            backtracks: 0,
            time_ms: 5,
            objective: Some(40),
        });
        let s = st.to_string();
        assert!(s.starts_with("3 node(s); 6 VM(s) (4 managed); 2 constraint(s)\n"));
        assert!(s.contains("(terminated): 12 opened search node(s), 0 backtrack(s), 1 solution(s):"));
        assert!(s.contains("\t1) at 5ms: 12 node(s), 0 backtrack(s), objective: 40\n"));
    }

    #[test]
    fn unsolved_report_ends_with_a_period() {
        let mut p = Parameters::default();
        p.time_limit_secs = 5;
        let mut st = SolvingStatistics::new(p, 1, 1, 0);
        st.nb_managed_vms = 1;
        st.hit_timeout = true;
        let s = st.to_string();
        assert!(s.contains("; timeout: 5s"));
        assert!(s.ends_with("(timeout): 0 opened search node(s), 0 backtrack(s), 0 solution(s)."));
    }
}
