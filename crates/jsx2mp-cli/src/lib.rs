mod cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jsx2mp_compiler::{MergePolicy, Target};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsx2mp", version, about = "jsx2mp - JSX to mini-program template compiler")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one file and print the result
    Compile {
        /// Source file (.jsx or .js)
        file: PathBuf,
        /// Host runtime: ali or wechat
        #[arg(long, default_value_t = Target::Ali)]
        target: Target,
        /// Nested loop capture merging: flatten or scoped
        #[arg(long, default_value = "flatten")]
        policy: MergePolicy,
        /// Treat the file as a single markup expression
        #[arg(long)]
        expression: bool,
        /// Print without whitespace
        #[arg(long)]
        minify: bool,
    },
    /// Compile every source of the project in the current directory
    Build {
        /// Override the target from jsx2mp.json
        #[arg(long)]
        target: Option<Target>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            file,
            target,
            policy,
            expression,
            minify,
        } => cmd::compile::run(&file, target, policy, expression, minify),
        Commands::Build { target } => cmd::build::run(target),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
