//! enrollkit - Main entry point
//!
//! Drives the selection engine and the enrollment store from the command line.

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use enrollkit::cli::{Cli, Commands, ProgressCommands};
use enrollkit::config::EnrollkitConfig;
use enrollkit::enrollment_state::{
    AdvanceOutcome, EnrollmentProgress, EnrollmentSnapshot, EnrollmentStep, StepState,
};
use enrollkit::logic::selection::{self, Catalog, SelectionSet};
use enrollkit::services::{LocalProofArchive, SnapshotDirectory, TrackQuery};
use enrollkit::storage::JsonFileStorage;
use enrollkit::store::EnrollmentStore;
use enrollkit::EnrollError;

type CliStore = EnrollmentStore<SnapshotDirectory, LocalProofArchive, JsonFileStorage>;

/// Initialize the logger with appropriate settings
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logger();
    debug!("enrollkit starting up");

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        let message = match e.downcast_ref::<EnrollError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("✗ {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Select {
            catalog,
            selected,
            toggle,
            remove,
        } => {
            let catalog = Catalog::load_from_file(&catalog)?;
            let current = SelectionSet::from_ids(selected);
            let next = match (toggle, remove) {
                (Some(id), _) => selection::toggle(&id, &catalog, &current),
                (None, Some(id)) => selection::remove(&id, &catalog, &current),
                (None, None) => current.clone(),
            };
            print_selection(&next, &catalog);
        }
        Commands::ValidateConfig { config } => {
            info!("Validating configuration file: {:?}", config);
            let loaded = EnrollkitConfig::load_from_file(&config)?;
            loaded.validate()?;
            println!("✓ Configuration file is valid: {:?}", config);
        }
        Commands::Progress { action } => {
            let config = load_config(cli.config.as_deref(), cli.state_file)?;
            let store = open_store(&config);
            run_progress(&store, action).await?;
        }
    }

    Ok(())
}

fn load_config(
    path: Option<&std::path::Path>,
    state_file: Option<std::path::PathBuf>,
) -> Result<EnrollkitConfig> {
    let mut config = match path {
        Some(path) => EnrollkitConfig::load_from_file(path)?,
        None => EnrollkitConfig::default(),
    };
    if let Some(state_file) = state_file {
        config.state_file = state_file;
    }
    config.validate()?;
    Ok(config)
}

fn open_store(config: &EnrollkitConfig) -> CliStore {
    EnrollmentStore::open(
        SnapshotDirectory::new(&config.snapshot_dir),
        LocalProofArchive::new(&config.proof_archive_root),
        JsonFileStorage::new(&config.state_file),
        config.proof_directory.clone(),
    )
}

async fn run_progress(store: &CliStore, action: ProgressCommands) -> Result<()> {
    match action {
        ProgressCommands::Show => {}
        ProgressCommands::Start { id } => {
            store.start_enrollment(&id)?;
        }
        ProgressCommands::Apply { snapshot } => {
            let content = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read snapshot from {:?}", snapshot))?;
            let snapshot: EnrollmentSnapshot =
                serde_json::from_str(&content).context("Failed to parse snapshot JSON")?;
            store.apply_remote_snapshot(&snapshot)?;
        }
        ProgressCommands::Track { id, email } => {
            let query = match (id, email) {
                (Some(id), _) => TrackQuery::Id(id),
                (None, Some(email)) => TrackQuery::Email(email),
                (None, None) => anyhow::bail!("Either --id or --email is required"),
            };
            store.track(&query).await?;
        }
        ProgressCommands::Refresh => {
            store.refresh().await?;
        }
        ProgressCommands::Advance { proof } => {
            if let Some(proof) = proof {
                store.set_payment_proof_attachment(proof)?;
            }
            match store.advance()? {
                AdvanceOutcome::Advanced { to, .. } => println!("→ Moved to: {}", to),
                AdvanceOutcome::Completed => println!("✓ Enrollment complete"),
                AdvanceOutcome::AlreadyComplete => println!("Enrollment is already complete"),
            }
        }
        ProgressCommands::Upload { file } => {
            store.set_payment_proof_attachment(file)?;
            let url = store.upload_payment_proof().await?;
            println!("✓ Proof of payment uploaded: {}", url);
        }
        ProgressCommands::Reset => {
            store.reset()?;
            println!("✓ Enrollment cleared");
            return Ok(());
        }
    }

    print_progress(&store.progress()?);
    Ok(())
}

fn print_selection(selection: &SelectionSet, catalog: &Catalog) {
    if selection.is_empty() {
        println!("(no courses selected)");
    }
    for id in selection.iter() {
        let label = catalog.find(id).map_or(id, |o| o.label.as_str());
        println!("• {} ({})", id, label);
    }
    for (id, partner) in selection.missing_co_requisites(catalog) {
        println!("! {} also requires {}", id, partner);
    }
}

fn print_progress(progress: &EnrollmentProgress) {
    match &progress.enrollment_id {
        Some(id) => println!("Enrollment {}", id),
        None => {
            println!("No enrollment on this device");
            return;
        }
    }

    for step in EnrollmentStep::all_steps() {
        let marker = match progress.step_state(*step) {
            StepState::Completed => "[✓]",
            StepState::Current => "[>]",
            StepState::Pending => "[ ]",
        };
        println!("  {} {}. {}", marker, step.number(), step);
    }

    println!("Status: {}", progress.status);
    if let Some(remark) = &progress.remark_msg {
        println!("Remark: {}", remark);
    }
    if let Some(path) = &progress.payment_proof_path {
        println!("Proof of payment: {}", path);
    }
}
