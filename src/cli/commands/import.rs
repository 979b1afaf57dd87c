//! Import command: validate a front end's fact file and store it.

use crate::cli::CommandContext;
use crate::indexing::BuildStats;
use crate::io::{EntityType, Envelope};
use crate::log_event;
use crate::service::{AnalysisService, IndexCapabilities};
use crate::storage::IndexPersistence;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ImportSummary {
    source: PathBuf,
    stored_at: PathBuf,
    build: BuildStats,
    capabilities: IndexCapabilities,
}

pub async fn run(path: &Path, context: &CommandContext) -> anyhow::Result<Envelope> {
    let data = match IndexPersistence::load_file(path) {
        Ok(data) => data,
        Err(e) => return Ok(Envelope::from_index_error(&e)),
    };

    let service = AnalysisService::new(Arc::clone(&context.settings));
    if let Err(e) = service.replace_all(data).await {
        return Ok(Envelope::from_index_error(&e));
    }

    let persistence = context.persistence();
    if let Err(e) = service.save(&persistence).await {
        return Ok(Envelope::from_index_error(&e));
    }

    let summary = ImportSummary {
        source: path.to_path_buf(),
        stored_at: persistence.facts_path(),
        build: service.last_build().await,
        capabilities: service.capabilities(),
    };
    log_event!(
        "import",
        "stored",
        "{} files, {} call edges",
        summary.capabilities.indexed_files,
        summary.build.call_edges
    );

    let message = format!(
        "Imported {} files: {} symbols, {} call edges, {} type usages",
        summary.capabilities.indexed_files,
        summary.build.symbols,
        summary.build.call_edges,
        summary.build.type_usages
    );
    Ok(Envelope::success(serde_json::to_value(&summary)?)
        .with_entity_type(EntityType::IndexSummary)
        .with_message(message))
}
