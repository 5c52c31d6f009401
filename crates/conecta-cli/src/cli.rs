use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "conecta",
    about = "ConectaITSON student records with encrypted fields",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to `student list` when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Check storage connectivity and the encryption round trip.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage student records.
    #[command(subcommand)]
    Student(StudentCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StudentCommand {
    /// List all students.
    List(OutputArgs),
    /// Register a student.
    Add {
        /// Full name.
        #[arg(long)]
        name: Option<String>,
        /// Enrollment number (matrícula).
        #[arg(long)]
        enrollment: Option<i32>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show one student by id.
    Show {
        id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Remove a student by id.
    Remove { id: String },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}
