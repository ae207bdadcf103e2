//! oumatrix CLI — author, store and exchange matrix questions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "oumatrix", version, about = "Matrix question authoring and storage")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an authored form without saving it
    Validate {
        /// Path to the form .toml file
        #[arg(long)]
        form: PathBuf,
    },

    /// Validate and store an authored form
    Save {
        /// Path to the form .toml file
        #[arg(long)]
        form: PathBuf,

        /// Question id to save under
        #[arg(long)]
        question: u64,

        /// Context the feedback files belong to
        #[arg(long, default_value = "1")]
        context: u64,

        /// Store the form's options as the new defaults
        #[arg(long)]
        remember_defaults: bool,
    },

    /// Print a stored question
    Show {
        #[arg(long)]
        question: u64,

        /// Print the edit-form field layout instead of the table
        #[arg(long)]
        fields: bool,
    },

    /// Write a question as an interchange document
    Export {
        #[arg(long)]
        question: u64,

        #[arg(long, default_value = "1")]
        context: u64,

        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import every matrix question of an interchange document
    Import {
        /// Interchange document to read
        #[arg(long)]
        input: PathBuf,

        /// Id of the first imported question; later ones use the next ids
        #[arg(long)]
        question: u64,

        #[arg(long, default_value = "1")]
        context: u64,
    },

    /// Delete a stored question and its files
    Delete {
        #[arg(long)]
        question: u64,

        #[arg(long, default_value = "1")]
        context: u64,
    },

    /// Create starter config and example form
    Init,
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "oumatrix=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Validate { form } => commands::validate::execute(form, config),
        Commands::Save {
            form,
            question,
            context,
            remember_defaults,
        } => commands::save::execute(form, question, context, remember_defaults, config),
        Commands::Show { question, fields } => commands::show::execute(question, fields, config),
        Commands::Export {
            question,
            context,
            output,
        } => commands::export::execute(question, context, output, config),
        Commands::Import {
            input,
            question,
            context,
        } => commands::import::execute(input, question, context, config),
        Commands::Delete { question, context } => {
            commands::delete::execute(question, context, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
