//! rackplan-bench — synthetic clusters through the static-partitioning
//! pipeline.
//!
//! Builds `--nodes` online nodes each hosting `--vms-per-node` running
//! VMs, plus `--ready` VMs waiting to be booted, with every VM under a
//! `Running` constraint. The instance is partitioned, solved with the
//! lifecycle solver and the aggregated statistics are printed.
//!
//! # Usage
//!
//! ```text
//! rackplan-bench --nodes 1000 --vms-per-node 4 --ready 200 --size 50 --workers 8
//! rackplan-bench --config planner.toml --random --seed 7 --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rackplan_constraint::{Constraint, Instance, Objective, Running};
use rackplan_model::Model;
use rackplan_plan::TransitionCounter;
use rackplan_runner::{PlannerConfig, StaticPartitioning, StrategyKind};
use rackplan_solver::LifecycleSolver;

#[derive(Parser)]
#[command(name = "rackplan-bench", about = "Static-partitioning benchmark")]
struct Cli {
    /// Online nodes to generate.
    #[arg(long, default_value = "100")]
    nodes: usize,

    /// Running VMs hosted on each node.
    #[arg(long, default_value = "3")]
    vms_per_node: usize,

    /// Ready VMs to boot.
    #[arg(long, default_value = "0")]
    ready: usize,

    /// Planner configuration. A scaffolded one is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nodes per partition. Switches to the fixed-size strategy.
    #[arg(long)]
    size: Option<usize>,

    /// Worker threads solving partitions.
    #[arg(long)]
    workers: Option<usize>,

    /// Shuffle nodes before cutting partitions.
    #[arg(long)]
    random: bool,

    /// Seed of the shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the statistics as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rackplan=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let instance = generate(cli.nodes, cli.vms_per_node, cli.ready)?;
    info!(
        nodes = cli.nodes,
        vms = instance.model().mapping().nb_vms(),
        constraints = instance.constraints().len(),
        "instance generated"
    );

    let driver = StaticPartitioning::from_config(&config, Arc::new(LifecycleSolver::new()))
        .context("building the planner")?;
    info!(
        strategy = %driver.partitioner().strategy(),
        workers = driver.workers(),
        "planner ready"
    );

    let outcome = driver.solve(&instance).await.context("planning")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.statistics)?);
    } else {
        println!("{}", outcome.statistics);
    }

    match &outcome.plan {
        Some(plan) => {
            let mut counter = TransitionCounter::new();
            counter.count_plan(plan);
            info!(
                actions = plan.len(),
                duration = plan.duration(),
                rejected = outcome.rejected.len(),
                "plan: {counter}"
            );
        }
        None => info!("no plan"),
    }
    Ok(())
}

// ── Configuration ──────────────────────────────────────────────

fn load_config(cli: &Cli) -> anyhow::Result<PlannerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlannerConfig::scaffold(),
    };

    if let Some(size) = cli.size {
        config.partitioning.strategy = StrategyKind::FixedSize;
        config.partitioning.size = Some(size);
    }
    if let Some(workers) = cli.workers {
        anyhow::ensure!(workers > 0, "--workers must be positive");
        config.runner.workers = Some(workers);
    }
    if cli.random {
        config.partitioning.random = true;
    }
    if cli.seed.is_some() {
        config.partitioning.seed = cli.seed;
    }
    Ok(config)
}

// ── Instance generation ────────────────────────────────────────

fn generate(nodes: usize, vms_per_node: usize, ready: usize) -> anyhow::Result<Instance> {
    let mut mo = Model::new();
    let mut cstrs: Vec<Constraint> = Vec::with_capacity(nodes * vms_per_node + ready);
    for _ in 0..nodes {
        let n = mo.new_node();
        mo.mapping_mut().add_online_node(n)?;
        for _ in 0..vms_per_node {
            let vm = mo.new_vm();
            mo.mapping_mut().add_running_vm(vm, n)?;
            cstrs.push(Running { vm }.into());
        }
    }
    for _ in 0..ready {
        let vm = mo.new_vm();
        mo.mapping_mut().add_ready_vm(vm)?;
        cstrs.push(Running { vm }.into());
    }
    Ok(Instance::new(mo, cstrs, Objective::MinMttr))
}
