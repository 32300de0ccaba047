use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use satvis::config::{Scenario, SimulationConfig};
use satvis::report::{self, ReportFormat};
use satvis::scheduler::compute_all;
use satvis::snapshot::snapshot_all;

#[derive(Parser)]
#[command(name = "satvis")]
#[command(about = "Satellite visibility window calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate { config: PathBuf },
    /// Compute all visibility windows of a scenario
    Run {
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print every satellite's geodetic state at one instant
    States {
        config: PathBuf,
        /// RFC 3339 time; defaults to the end of the simulation
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            format,
            output,
        } => run(&config, format, output.as_deref()),
        Commands::States { config, at, format } => states(&config, at, format),
    }
}

fn load(path: &Path) -> Option<Scenario> {
    let config = match SimulationConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            return None;
        }
    };
    match config.build_context() {
        Ok(scenario) => Some(scenario),
        Err(e) => {
            eprintln!("Invalid scenario: {}", e);
            None
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    let Some(scenario) = load(path) else {
        return ExitCode::FAILURE;
    };
    let ctx = &scenario.context;

    println!(
        "Scenario is valid ({} -> {}, {:.0} s)",
        ctx.start,
        ctx.end,
        ctx.duration_s()
    );
    for sat in &scenario.satellites {
        println!(
            "  satellite #{}: {} (period {:.0} s)",
            sat.index, sat.name, sat.period_s
        );
    }
    for (index, err) in &scenario.rejected {
        println!("  satellite #{}: rejected: {}", index, err);
    }
    for gs in &scenario.ground_stations {
        println!(
            "  ground station {}: {:.4}, {:.4}, {:.0} m",
            gs.id, gs.latitude_deg, gs.longitude_deg, gs.altitude_m
        );
    }
    ExitCode::SUCCESS
}

fn run(path: &Path, format: ReportFormat, output: Option<&Path>) -> ExitCode {
    let Some(scenario) = load(path) else {
        return ExitCode::FAILURE;
    };

    let results = match compute_all(
        &scenario.satellites,
        &scenario.ground_stations,
        &scenario.context,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Computation aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let written = match output {
        Some(file) => File::create(file).and_then(|f| {
            let mut out = BufWriter::new(f);
            report::write_report(&mut out, &results, format)?;
            out.flush()
        }),
        None => report::write_report(&mut io::stdout().lock(), &results, format),
    };
    if let Err(e) = written {
        eprintln!("Error writing {} report: {}", format, e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn states(path: &Path, at: Option<DateTime<Utc>>, format: ReportFormat) -> ExitCode {
    let Some(scenario) = load(path) else {
        return ExitCode::FAILURE;
    };
    let t = at.unwrap_or(scenario.context.end);
    let snapshots = snapshot_all(&scenario.satellites, t);

    if let Err(e) = report::write_snapshots(&mut io::stdout().lock(), &snapshots, format) {
        eprintln!("Error writing states: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
