//! flowc - dataflow compiler IR tools
//!
//! # Usage
//!
//! ```bash
//! # Validate a lowered program with the standard profile
//! flowc validate program.json
//!
//! # Validate IR after reference counting was inserted
//! flowc validate --profile final program.json
//!
//! # Recompute passed-variable lists, then validate
//! flowc fixup program.json -o fixed.json
//!
//! # Print the IR tree
//! flowc dump program.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process;

use compiler::config::{parse_config, FlowcConfig, Profile, CONFIG_FILE};
use compiler::ir::{
    dump, FixupMode, FixupVariables, PassManager, Program, ValidationError, Validator,
    ValidatorConfig, IR_VERSION,
};
use compiler::logging;

/// Exit status for invalid IR, which is a compiler defect rather than a user error
const EXIT_INTERNAL_ERROR: i32 = 70;

#[derive(Parser)]
#[command(name = "flowc")]
#[command(version = "0.1.0")]
#[command(about = "flowc - dataflow compiler IR tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a program against the IR invariants
    Validate {
        /// Path to the program (JSON)
        file: PathBuf,

        /// Validator profile (overrides flowc.toml)
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,

        /// Configuration file (defaults to flowc.toml next to the program)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Reject nested-block continuations
        #[arg(long)]
        no_nested_blocks: bool,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Recompute passed-variable lists of task-spawning continuations
    Fixup {
        /// Path to the program (JSON)
        file: PathBuf,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to flowc.toml next to the program)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Print a program as an IR tree
    Dump {
        /// Path to the program (JSON)
        file: PathBuf,
    },

    /// Show information about the IR format
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    /// Before reference counting is inserted
    Standard,
    /// Final form, after reference counting
    Final,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => Profile::Standard,
            ProfileArg::Final => Profile::Final,
        }
    }
}

/// Why a command failed
enum Failure {
    /// Bad input: unreadable file, malformed JSON or config
    User(String),
    /// The IR broke an invariant
    Invalid(ValidationError),
}

impl From<ValidationError> for Failure {
    fn from(e: ValidationError) -> Self {
        Failure::Invalid(e)
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            file,
            profile,
            config,
            no_nested_blocks,
            verbose,
        } => {
            logging::init_for_cli(verbose);
            validate_file(&file, profile, config.as_deref(), no_nested_blocks)
        }
        Commands::Fixup {
            file,
            output,
            config,
            verbose,
        } => {
            logging::init_for_cli(verbose);
            fixup_file(&file, output.as_deref(), config.as_deref())
        }
        Commands::Dump { file } => dump_file(&file),
        Commands::Info => {
            show_info();
            Ok(())
        }
    };

    match result {
        Ok(()) => {}
        Err(Failure::User(e)) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        Err(Failure::Invalid(e)) => {
            eprintln!("Internal error: invalid IR ({})", e.kind());
            eprintln!("{}", e);
            process::exit(EXIT_INTERNAL_ERROR);
        }
    }
}

fn load_program(file: &Path) -> Result<Program, Failure> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| Failure::User(format!("Failed to read {}: {}", file.display(), e)))?;
    let program = Program::from_json(&text)
        .map_err(|e| Failure::User(format!("Failed to parse {}: {}", file.display(), e)))?;
    debug!(
        "loaded {} with {} functions and {} nodes",
        file.display(),
        program.functions.len(),
        program.node_count()
    );
    Ok(program)
}

/// Explicit config file, else `flowc.toml` beside the program, else defaults
fn load_config(file: &Path, config: Option<&Path>) -> Result<FlowcConfig, Failure> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let beside = file
                .parent()
                .map(|dir| dir.join(CONFIG_FILE))
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            if !beside.exists() {
                return Ok(FlowcConfig::default());
            }
            beside
        }
    };
    info!("using configuration {}", path.display());
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Failure::User(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_config(&text).map_err(Failure::User)
}

fn validator_config(
    file: &Path,
    profile: Option<ProfileArg>,
    config: Option<&Path>,
    no_nested_blocks: bool,
) -> Result<ValidatorConfig, Failure> {
    let mut section = load_config(file, config)?.validate;
    if let Some(profile) = profile {
        section.profile = profile.into();
    }
    if no_nested_blocks {
        section.no_nested_blocks = Some(true);
    }
    Ok(section.validator_config())
}

fn validate_file(
    file: &Path,
    profile: Option<ProfileArg>,
    config: Option<&Path>,
    no_nested_blocks: bool,
) -> Result<(), Failure> {
    let program = load_program(file)?;
    let config = validator_config(file, profile, config, no_nested_blocks)?;
    debug!("validator config: {:?}", config);

    Validator::new(config).validate(&program)?;
    println!(
        "{}: ok ({} functions)",
        file.display(),
        program.functions.len()
    );
    Ok(())
}

fn fixup_file(file: &Path, output: Option<&Path>, config: Option<&Path>) -> Result<(), Failure> {
    let mut program = load_program(file)?;
    let config = validator_config(file, None, config, false)?;

    let mut passes = PassManager::new().with_validator(Validator::new(config));
    passes.add_pass(FixupVariables::new(FixupMode::Repair));
    passes.run(&mut program)?;

    let json = program
        .to_json()
        .map_err(|e| Failure::User(format!("Failed to serialize program: {}", e)))?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| Failure::User(format!("Failed to write {}: {}", path.display(), e)))?;
            info!("wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn dump_file(file: &Path) -> Result<(), Failure> {
    let program = load_program(file)?;
    print!("{}", dump::dump_program(&program));
    Ok(())
}

fn show_info() {
    println!("flowc {}", env!("CARGO_PKG_VERSION"));
    println!("IR format version: {}", IR_VERSION);
    println!();
    println!("Validator profiles:");
    for (name, config) in [
        ("standard", ValidatorConfig::standard()),
        ("final", ValidatorConfig::final_form()),
    ] {
        println!(
            "  {:<9} var-passing={} cleanups={:?} refcount-cleanups={} exec-context={} fixup={}",
            name,
            config.check_var_passing,
            config.cleanup_policy,
            if config.reject_refcount_cleanups { "rejected" } else { "allowed" },
            config.check_exec_context,
            config.run_fixup
        );
    }
}
