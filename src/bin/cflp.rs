use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use cflp::instance::{generate, read_dataset, write_dataset, GeneratorConfig};
use cflp::{shipment_plan, solve, BendersSettings, Instance, Result};

/// Solve capacitated facility location instances with Benders decomposition.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random instance and solve it.
    Random {
        #[command(flatten)]
        size: SizeArgs,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Solve an instance read from a dataset file.
    File {
        /// Path to the dataset
        path: PathBuf,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Write a random instance to a dataset file without solving it.
    Generate {
        /// Where to write the dataset
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        size: SizeArgs,
    },
}

#[derive(Args, Debug)]
struct SizeArgs {
    /// Number of customers
    #[arg(short, long, default_value_t = 100)]
    customers: usize,
    /// Number of candidate facilities
    #[arg(short, long, default_value_t = 10)]
    facilities: usize,
    /// Seed of the instance generator
    #[arg(short, long, default_value_t = 2024)]
    seed: u64,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Only separate cuts at integer candidates
    #[arg(long)]
    no_relaxation_cuts: bool,
    /// Wall-clock budget in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Maximum number of branch-and-cut nodes
    #[arg(long)]
    node_limit: Option<u64>,
    /// Relative optimality gap
    #[arg(long)]
    gap: Option<f64>,
    /// Print the non-zero shipments of the final plan
    #[arg(long)]
    show_plan: bool,
}

impl SolveArgs {
    fn settings(&self) -> BendersSettings {
        let mut settings = BendersSettings::default().with_relaxation_cuts(!self.no_relaxation_cuts);
        if let Some(seconds) = self.time_limit {
            settings = settings.with_time_limit(seconds);
        }
        if let Some(nodes) = self.node_limit {
            settings = settings.with_max_nodes(nodes);
        }
        if let Some(gap) = self.gap {
            settings = settings.with_gap_tol(gap);
        }
        settings
    }
}

impl SizeArgs {
    fn generate(&self) -> Result<Instance> {
        let config = GeneratorConfig::default().with_seed(self.seed);
        generate(self.customers, self.facilities, &config)
    }
}

fn run_solve(instance: &Instance, args: &SolveArgs) -> Result<()> {
    let solution = solve(instance, &args.settings())?;
    println!("{solution}");

    if args.show_plan {
        let plan = shipment_plan(instance, &solution)?;
        println!("Shipments (facility -> customer: units @ unit cost):");
        for ((i, j), &units) in plan.shipments.indexed_iter() {
            if units > 1e-9 {
                println!(
                    "  {j} -> {i}: {units:.2} @ {:.2}",
                    instance.shipment_cost(i, j)
                );
            }
        }
        println!("Shipment cost: {:.4}", plan.objective);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Random { size, solve } => {
            let instance = size.generate()?;
            run_solve(&instance, &solve)
        }
        Command::File { path, solve } => {
            let instance = read_dataset(&path)?;
            run_solve(&instance, &solve)
        }
        Command::Generate { output, size } => {
            let instance = size.generate()?;
            write_dataset(&instance, &output)?;
            println!(
                "Wrote {} facilities and {} customers to {}",
                instance.num_facilities(),
                instance.num_customers(),
                output.display()
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
