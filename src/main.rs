// src/main.rs
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::{error, info, warn};

use xtalcomp::config::Config;
use xtalcomp::io::load_structure;
use xtalcomp::model::{Chirality, SpeciesTable};
use xtalcomp::physics::compare_with_report;
use xtalcomp::utils::logger;

/// Decides whether two crystal structure files describe the same crystal.
#[derive(Clone, Debug, Parser)]
#[command(name = "xtalcomp", version)]
struct Cli {
    /// First structure (POSCAR/CONTCAR)
    #[arg(value_name = "FILE1")]
    first: PathBuf,

    /// Second structure (POSCAR/CONTCAR)
    #[arg(value_name = "FILE2")]
    second: PathBuf,

    /// Cartesian distance tolerance in Å
    #[arg(long = "tol", value_name = "D")]
    distance_tolerance: Option<f64>,

    /// Angle tolerance in degrees
    #[arg(long = "angle", value_name = "A")]
    angle_tolerance: Option<f64>,

    /// Treat mirror images as different structures
    #[arg(long)]
    strict_chirality: bool,

    /// Search candidate transforms on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// More log output; repeat for debug and trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Flags override what the config file says.
    fn apply(&self, cfg: &mut Config) {
        if let Some(d) = self.distance_tolerance {
            cfg.distance_tolerance = d;
        }
        if let Some(a) = self.angle_tolerance {
            cfg.angle_tolerance = a;
        }
        if self.strict_chirality {
            cfg.chirality = Chirality::Strict;
        }
        if self.parallel {
            cfg.parallel = true;
        }
        cfg.verbosity = cfg.verbosity.saturating_add(self.verbose);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut cfg, config_msg) = Config::load();
    cli.apply(&mut cfg);

    if logger::init(cfg.verbosity).is_err() {
        eprintln!("Logger already initialised");
    }
    info!("{}", config_msg);

    if cli.save_config {
        info!("{}", cfg.save());
    }

    // One table for both files so symbols map to the same labels
    let mut species = SpeciesTable::new();
    let mut structures = Vec::with_capacity(2);
    for path in [&cli.first, &cli.second] {
        match load_structure(path, &mut species) {
            Ok(s) => {
                info!("Loaded {} ({} atoms)", path.display(), s.len());
                structures.push(s);
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        }
    }

    match compare_with_report(&structures[0], &structures[1], &cfg.compare_options()) {
        Ok(report) => {
            info!(
                "{} lattice candidates, {} transforms tried",
                report.lattice_candidates, report.transforms_tried
            );
            if report.equivalent {
                println!("equivalent");
                ExitCode::SUCCESS
            } else {
                println!("not equivalent");
                ExitCode::from(1)
            }
        }
        Err(e) => {
            if e.is_invalid_input() {
                warn!("Input rejected");
            }
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "xtalcomp",
            "a.vasp",
            "b.vasp",
            "--tol",
            "0.1",
            "--strict-chirality",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.first, PathBuf::from("a.vasp"));
        assert_eq!(cli.second, PathBuf::from("b.vasp"));
        assert!(!cli.save_config);

        let mut cfg = Config {
            angle_tolerance: 0.7,
            ..Config::default()
        };
        cli.apply(&mut cfg);
        assert_eq!(cfg.distance_tolerance, 0.1);
        assert_eq!(cfg.angle_tolerance, 0.7);
        assert_eq!(cfg.chirality, Chirality::Strict);
        assert!(!cfg.parallel);
        assert_eq!(cfg.verbosity, 2);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["xtalcomp", "only_one"]).is_err());
        assert!(Cli::try_parse_from(["xtalcomp", "a", "b", "c"]).is_err());
        assert!(Cli::try_parse_from(["xtalcomp", "a", "b", "--angle"]).is_err());
        assert!(Cli::try_parse_from(["xtalcomp", "a", "b", "--angle", "x"]).is_err());
        assert!(Cli::try_parse_from(["xtalcomp", "a", "b", "--bogus"]).is_err());
    }
}
