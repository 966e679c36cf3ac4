//! # Symmetriq CLI (`symq`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `symq calc` | Print ideal body proportions for the given measurements |
//! | `symq ask "<question>"` | Answer one question from the knowledge corpus |
//! | `symq chat` | Interactive coach session reusing one index |
//!
//! ## Examples
//!
//! ```bash
//! symq calc --wrist 6.5 --ankle 8.5 --waist 32 --shoulders 48
//! symq ask "How much protein do I need?"
//! symq ask "Should I bulk?" --corpus ./fitness_knowledge.txt --json
//! RUST_LOG=symmetriq=debug symq chat --config ./config/symq.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use symmetriq::calc::{self, Measurements};
use symmetriq::{coach, config};

/// Symmetriq: ideal body proportions and a retrieval-augmented fitness coach.
#[derive(Parser)]
#[command(name = "symq", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Built-in defaults are used when the file does not exist.
    #[arg(long, global = true, default_value = "./config/symq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate ideal measurements from frame size.
    Calc {
        /// Height (inches).
        #[arg(long, default_value_t = 70.0)]
        height: f64,
        /// Wrist circumference (inches).
        #[arg(long, default_value_t = 5.5)]
        wrist: f64,
        /// Ankle circumference (inches).
        #[arg(long, default_value_t = 7.5)]
        ankle: f64,
        /// Waist circumference (inches).
        #[arg(long, default_value_t = 29.0)]
        waist: f64,
        /// Current shoulder circumference (inches), for the V-taper check.
        #[arg(long, default_value_t = 0.0)]
        shoulders: f64,
    },

    /// Ask the fitness coach one question.
    Ask {
        question: String,

        /// Plain-text knowledge file; defaults to the built-in Q&A.
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Print the answer as JSON, including source segment indices.
        #[arg(long)]
        json: bool,
    },

    /// Interactive coach session.
    Chat {
        /// Plain-text knowledge file; defaults to the built-in Q&A.
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calc {
            height,
            wrist,
            ankle,
            waist,
            shoulders,
        } => {
            calc::run_calc(&Measurements {
                height,
                wrist,
                ankle,
                waist,
                shoulders,
            })?;
        }
        Commands::Ask {
            question,
            corpus,
            json,
        } => {
            let cfg = config::load_or_default(&cli.config)?;
            coach::run_ask(&cfg, corpus.as_deref(), &question, json).await?;
        }
        Commands::Chat { corpus } => {
            let cfg = config::load_or_default(&cli.config)?;
            coach::run_chat(&cfg, corpus.as_deref()).await?;
        }
    }

    Ok(())
}
