use clap::{Parser, Subcommand};
use stacksynth::app;
use stacksynth::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Synthesizes the workflow trigger deployment into a provisioning template
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config (falls back to $STACKSYNTH_CONFIG, then ./stacksynth.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fail when a resolver's integration identity lacks the permission it invokes
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the template and binary assembly
    Synth {
        /// Output directory
        #[arg(short, long, default_value = "stack.out")]
        out: PathBuf,
        /// Print the template instead of writing files
        #[arg(long)]
        stdout: bool,
    },
    /// Print the order resources will be provisioned in
    Plan,
    /// Compare the current synthesis with a previously written assembly
    Diff {
        /// A `<stack>.assembly.bin` from an earlier `synth`
        #[arg(short, long)]
        previous: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref())
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e)));

    let synth_start = Instant::now();
    let assembly = app::synthesize(&config, cli.strict)
        .unwrap_or_else(|e| exit_with_error(&format!("Synthesis failed: {}", e)));
    let synth_duration = synth_start.elapsed();

    for warning in assembly.warnings() {
        eprintln!("[Warning at {}] {}", warning.path, warning.message);
    }

    match cli.command {
        Command::Synth { out, stdout } => {
            if stdout {
                println!("{}", assembly.template);
                return;
            }
            let (template_path, assembly_path) = assembly
                .write_to_dir(&out)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write assembly: {}", e)));
            println!(
                "Synthesized '{}' ({} resources) in {:?}",
                assembly.stack_name,
                assembly.plan.len(),
                synth_duration
            );
            println!("  -> Template: {}", template_path.display());
            println!("  -> Assembly: {}", assembly_path.display());
            println!("  -> Fingerprint: {}", assembly.fingerprint);
        }
        Command::Plan => {
            println!("Provisioning order for '{}':\n", assembly.stack_name);
            print!("{}", assembly.plan);
        }
        Command::Diff { previous } => {
            let previous = Assembly::from_file(&previous).unwrap_or_else(|e| {
                exit_with_error(&format!(
                    "Failed to load previous assembly '{}': {}",
                    previous.display(),
                    e
                ))
            });
            if previous.fingerprint == assembly.fingerprint {
                println!("There were no differences");
                return;
            }
            let changes = ChangeSet::between(&previous, &assembly)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to compare templates: {}", e)));
            print!("{}", changes);
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
