//! Statistics of a static-partitioning run.

use std::fmt;

use serde::Serialize;

use rackplan_solver::{Parameters, SolutionStatistics, SolvingStatistics, write_parameters};

/// Aggregated statistics over every partition of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticPartitioningStatistics {
    pub params: Parameters,
    pub nb_nodes: usize,
    pub nb_vms: usize,
    pub nb_constraints: usize,
    pub workers: usize,
    pub nb_partitions: usize,
    pub split_ms: u64,
    pub solving_ms: u64,
    pub start_epoch_ms: u64,
    // Sums over the partitions.
    pub search_nodes: u64,
    pub backtracks: u64,
    pub nb_managed_vms: usize,
    // Maxima over the partitions.
    pub core_build_ms: u64,
    pub specialization_ms: u64,
    pub hit_timeout: bool,
    /// Statistics of each partition, in the order they were added.
    pub partitions: Vec<SolvingStatistics>,
}

impl StaticPartitioningStatistics {
    pub fn new(
        params: Parameters,
        nb_nodes: usize,
        nb_vms: usize,
        nb_constraints: usize,
        start_epoch_ms: u64,
        workers: usize,
    ) -> Self {
        Self {
            params,
            nb_nodes,
            nb_vms,
            nb_constraints,
            workers,
            nb_partitions: 0,
            split_ms: 0,
            solving_ms: 0,
            start_epoch_ms,
            search_nodes: 0,
            backtracks: 0,
            nb_managed_vms: 0,
            core_build_ms: 0,
            specialization_ms: 0,
            hit_timeout: false,
            partitions: Vec::new(),
        }
    }

    pub fn set_splitting(&mut self, nb_partitions: usize, split_ms: u64) {
        self.nb_partitions = nb_partitions;
        self.split_ms = split_ms;
    }

    pub fn set_solving_duration(&mut self, ms: u64) {
        self.solving_ms = ms;
    }

    /// Fold the statistics of one partition in.
    pub fn add_partition(&mut self, st: SolvingStatistics) {
        self.search_nodes += st.search_nodes;
        self.backtracks += st.backtracks;
        self.nb_managed_vms += st.nb_managed_vms;
        self.hit_timeout |= st.hit_timeout;
        self.core_build_ms = self.core_build_ms.max(st.core_build_ms);
        self.specialization_ms = self.specialization_ms.max(st.specialization_ms);
        self.partitions.push(st);
    }

    /// Number of partitions with at least one solution.
    pub fn nb_solved(&self) -> usize {
        self.partitions.iter().filter(|p| p.is_solved()).count()
    }

    /// Solutions of the whole instance, rebuilt from the partitions.
    ///
    /// The first entry combines the first solution of every partition; it
    /// is found when the slowest partition found its own. When some
    /// partition found several solutions, a second entry combines the
    /// last ones. Empty when some partition has no solution.
    pub fn solutions(&self) -> Vec<SolutionStatistics> {
        if self.partitions.is_empty() {
            return Vec::new();
        }
        let mut firsts = Vec::with_capacity(self.partitions.len());
        let mut lasts = Vec::with_capacity(self.partitions.len());
        let mut several = false;
        for p in &self.partitions {
            let (Some(first), Some(last)) = (p.solutions.first(), p.solutions.last()) else {
                return Vec::new();
            };
            several |= p.solutions.len() > 1;
            firsts.push((p.start_epoch_ms, *first));
            lasts.push((p.start_epoch_ms, *last));
        }

        let mut sols = vec![self.combine(&firsts)];
        if several {
            sols.push(self.combine(&lasts));
        }
        sols
    }

    fn combine(&self, parts: &[(u64, SolutionStatistics)]) -> SolutionStatistics {
        let end = parts
            .iter()
            .map(|(start, s)| start + s.time_ms)
            .fold(self.start_epoch_ms, u64::max);
        let objective = parts
            .iter()
            .map(|(_, s)| s.objective)
            .sum::<Option<i64>>();
        SolutionStatistics {
            nodes: parts.iter().map(|(_, s)| s.nodes).sum(),
            backtracks: parts.iter().map(|(_, s)| s.backtracks).sum(),
            time_ms: end - self.start_epoch_ms,
            objective,
        }
    }
}

impl fmt::Display for StaticPartitioningStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sols = self.solutions();

        write!(f, "{} node(s); {} VM(s)", self.nb_nodes, self.nb_vms)?;
        if self.nb_managed_vms != self.nb_vms {
            write!(f, " ({} managed)", self.nb_managed_vms)?;
        }
        write!(
            f,
            "; {} worker(s), {} partition(s); {} constraint(s)",
            self.workers, self.nb_partitions, self.nb_constraints
        )?;
        write_parameters(f, &self.params)?;
        write!(
            f,
            "\nmax. building duration: {}ms (core-RP) + {}ms (specialization)",
            self.core_build_ms, self.specialization_ms
        )?;
        write!(f, "\nAfter {}ms of search", self.solving_ms)?;
        f.write_str(if self.hit_timeout { " (timeout)" } else { " (terminated)" })?;
        write!(
            f,
            ": {} opened search node(s), {} backtrack(s), {} solution(s)",
            self.search_nodes,
            self.backtracks,
            sols.len()
        )?;

        if sols.is_empty() {
            return write!(f, ": {}/{} solved partition(s)", self.nb_solved(), self.nb_partitions);
        }
        let sizes: Vec<String> = self.partitions.iter().map(|p| p.solutions.len().to_string()).collect();
        writeln!(f, " [{}]:", sizes.join(", "))?;
        for (i, s) in sols.iter().enumerate() {
            writeln!(f, "\t{}) {s}", i + 1)?;
        }
        Ok(())
    }
}
