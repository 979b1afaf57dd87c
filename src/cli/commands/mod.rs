//! Command implementations for the CLI.
//!
//! Every command produces an [`Envelope`]; `main` prints it and exits with
//! its exit code.

pub mod import;
pub mod init;
pub mod query;

use crate::cli::Commands;
use crate::config::Settings;
use crate::io::Envelope;
use crate::service::AnalysisService;
use crate::storage::IndexPersistence;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Settings and sources shared by every command.
pub struct CommandContext {
    pub settings: Arc<Settings>,
    /// Fact file given with `--facts`, used instead of the imported index
    pub facts: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(settings: Settings, facts: Option<PathBuf>) -> Self {
        Self {
            settings: Arc::new(settings),
            facts,
        }
    }

    pub fn persistence(&self) -> IndexPersistence {
        IndexPersistence::new(self.settings.resolved_index_path())
    }

    /// Service over the `--facts` file, or over the imported index.
    pub fn open_service(&self) -> Result<AnalysisService, Envelope> {
        let settings = Arc::clone(&self.settings);
        let opened = match &self.facts {
            Some(path) => IndexPersistence::load_file(path)
                .and_then(|data| AnalysisService::from_data(data, settings)),
            None => AnalysisService::open(&self.persistence(), settings),
        };
        opened.map_err(|e| Envelope::from_index_error(&e))
    }
}

/// Run one command to completion.
pub async fn run(
    command: Commands,
    context: &CommandContext,
    cancel: &CancellationToken,
) -> anyhow::Result<Envelope> {
    match command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&context.settings),
        Commands::Import { path } => import::run(&path, context).await,
        command => {
            let service = match context.open_service() {
                Ok(service) => service,
                Err(envelope) => return Ok(envelope),
            };
            query::run(command, &service, cancel).await
        }
    }
}
