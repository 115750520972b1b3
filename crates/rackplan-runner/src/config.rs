//! planner.toml configuration parser.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rackplan_model::NodeId;
use rackplan_partition::{NodeOrder, PartitionStrategy, ReadyVmPolicy};
use rackplan_solver::Parameters;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub runner: RunnerConfig,
    pub partitioning: PartitioningConfig,
    pub solver: Parameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Worker threads solving partitions. Host parallelism when unset.
    pub workers: Option<usize>,
    /// Stop at the first partition failure instead of draining the others.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    FixedSize,
    FixedCount,
    FixedNodeSets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadyVms {
    #[default]
    Unassigned,
    RoundRobin,
}

/// Partition size used when none is configured.
pub const DEFAULT_PARTITION_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningConfig {
    pub strategy: StrategyKind,
    pub size: Option<usize>,
    pub count: Option<usize>,
    /// Node identifiers of each group, for `fixed-node-sets`.
    pub node_sets: Option<Vec<Vec<u32>>>,
    /// Pick nodes up in a shuffled order.
    pub random: bool,
    pub seed: Option<u64>,
    pub ready_vms: ReadyVms,
}

impl Default for PartitioningConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::FixedSize,
            size: Some(DEFAULT_PARTITION_SIZE),
            count: None,
            node_sets: None,
            random: false,
            seed: None,
            ready_vms: ReadyVms::Unassigned,
        }
    }
}

impl PartitioningConfig {
    fn order(&self) -> NodeOrder {
        if self.random {
            NodeOrder::Shuffled { seed: self.seed }
        } else {
            NodeOrder::Stable
        }
    }

    pub fn strategy(&self) -> ConfigResult<PartitionStrategy> {
        let missing = |key: &str| ConfigError::Invalid {
            section: "partitioning",
            reason: format!("strategy needs '{key}'"),
        };
        match self.strategy {
            StrategyKind::FixedSize => Ok(PartitionStrategy::FixedSize {
                size: self.size.ok_or_else(|| missing("size"))?,
                order: self.order(),
            }),
            StrategyKind::FixedCount => Ok(PartitionStrategy::FixedCount {
                count: self.count.ok_or_else(|| missing("count"))?,
                order: self.order(),
            }),
            StrategyKind::FixedNodeSets => {
                let sets = self.node_sets.as_ref().ok_or_else(|| missing("node_sets"))?;
                let groups = sets
                    .iter()
                    .map(|s| s.iter().map(|n| NodeId(*n)).collect::<BTreeSet<_>>())
                    .collect();
                Ok(PartitionStrategy::FixedNodeSets(groups))
            }
        }
    }

    pub fn ready_vm_policy(&self) -> ReadyVmPolicy {
        match self.ready_vms {
            ReadyVms::Unassigned => ReadyVmPolicy::Unassigned,
            ReadyVms::RoundRobin => ReadyVmPolicy::RoundRobin,
        }
    }
}

impl PlannerConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: PlannerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A configuration for a first run: fixed-size partitions, ready VMs
    /// dealt round-robin, one minute per partition.
    pub fn scaffold() -> Self {
        PlannerConfig {
            runner: RunnerConfig::default(),
            partitioning: PartitioningConfig {
                ready_vms: ReadyVms::RoundRobin,
                ..Default::default()
            },
            solver: Parameters {
                time_limit_secs: 60,
                ..Parameters::default()
            },
        }
    }

    /// Worker count, defaulting to the host parallelism.
    pub fn workers(&self) -> usize {
        self.runner
            .workers
            .unwrap_or_else(crate::default_workers)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.runner.workers == Some(0) {
            return Err(ConfigError::Invalid {
                section: "runner",
                reason: "workers must be positive".into(),
            });
        }
        self.partitioning.strategy().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_scaffold_round_trips() {
        let config = PlannerConfig::scaffold();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("fixed-size"));
        assert!(toml_str.contains("round-robin"));
        let back = PlannerConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_parse_sections() {
        let toml_str = r#"
[runner]
workers = 3
fail_fast = true

[partitioning]
strategy = "fixed-node-sets"
node_sets = [[0, 1], [2]]

[solver]
time_limit_secs = 10
optimize = true

[solver.durations]
boot_node = 12
"#;
        let config = PlannerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.workers(), 3);
        assert!(config.runner.fail_fast);
        assert_eq!(config.partitioning.ready_vm_policy(), ReadyVmPolicy::Unassigned);
        assert_eq!(
            config.partitioning.strategy().unwrap(),
            PartitionStrategy::FixedNodeSets(vec![
                BTreeSet::from([NodeId(0), NodeId(1)]),
                BTreeSet::from([NodeId(2)]),
            ])
        );
        assert!(config.solver.optimize);
        assert_eq!(config.solver.durations.boot_node, 12);
        assert_eq!(config.solver.durations.boot_vm, 3);
    }

    #[test]
    fn test_random_order_keeps_seed() {
        let config = PlannerConfig::from_toml_str(
            "[partitioning]\nstrategy = \"fixed-count\"\ncount = 4\nrandom = true\nseed = 9\n",
        )
        .unwrap();
        assert_eq!(
            config.partitioning.strategy().unwrap(),
            PartitionStrategy::FixedCount {
                count: 4,
                order: NodeOrder::Shuffled { seed: Some(9) },
            }
        );
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(
            config.partitioning.strategy().unwrap(),
            PartitionStrategy::fixed_size(DEFAULT_PARTITION_SIZE)
        );
        assert!(config.workers() >= 1);
    }

    #[test]
    fn test_missing_strategy_parameter() {
        let err = PlannerConfig::from_toml_str("[partitioning]\nstrategy = \"fixed-count\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { section: "partitioning", .. }));
        let err = PlannerConfig::from_toml_str("[partitioning]\nstrategy = \"spiral\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\nworkers = 2\n[partitioning]\nsize = 8").unwrap();
        let config = PlannerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.workers(), 2);
        assert_eq!(config.partitioning.size, Some(8));

        let err = PlannerConfig::from_file(Path::new("/nonexistent/planner.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
