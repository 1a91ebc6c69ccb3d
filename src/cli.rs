use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// enrollkit - course selection and enrollment progress from the command line
#[derive(Parser)]
#[command(name = "enrollkit")]
#[command(about = "Course co-requisite selection and enrollment progress tracking")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the persisted progress file
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply one toggle or remove action to a course selection
    #[command(group(ArgGroup::new("action").required(true).args(["toggle", "remove"])))]
    Select {
        /// Catalog JSON file (array of options)
        #[arg(long)]
        catalog: PathBuf,
        /// Currently selected ids, comma separated
        #[arg(long, value_delimiter = ',')]
        selected: Vec<String>,
        /// Option id to toggle
        #[arg(long)]
        toggle: Option<String>,
        /// Option id to remove (chip "x")
        #[arg(long)]
        remove: Option<String>,
    },
    /// Enrollment progress commands
    Progress {
        #[command(subcommand)]
        action: ProgressCommands,
    },
    /// Validate a configuration file
    ValidateConfig {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ProgressCommands {
    /// Show the step list, status and remark
    Show,
    /// Record a newly created enrollment
    Start {
        #[arg(long)]
        id: String,
    },
    /// Apply a remote snapshot from a JSON file
    Apply {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Look up an enrollment by id or email
    #[command(group(ArgGroup::new("query").required(true).args(["id", "email"])))]
    Track {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Re-fetch the current enrollment
    Refresh,
    /// Advance one step locally
    Advance {
        /// Attach a local proof of payment file before advancing (not uploaded)
        #[arg(long)]
        proof: Option<PathBuf>,
    },
    /// Attach a proof of payment file and upload it
    Upload {
        /// Proof of payment file
        file: PathBuf,
    },
    /// Forget the enrollment on this device
    Reset,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
