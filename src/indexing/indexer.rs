use crate::error::{IndexError, IndexResult};
use crate::indexing::builder::{BuildStats, GraphBuilder};
use crate::indexing::facts::FileFacts;
use crate::storage::{GraphStore, IndexData};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Single writer over the fact store.
///
/// Each mutation replaces facts for whole files, rebuilds the graph from the
/// complete fact store and publishes it, so readers always see a graph built
/// from one consistent set of facts.
pub struct GraphIndexer {
    data: IndexData,
    store: Arc<GraphStore>,
    last_build: BuildStats,
}

impl GraphIndexer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            data: IndexData::new(),
            store,
            last_build: BuildStats::default(),
        }
    }

    /// Create from loaded facts and publish the resulting graph.
    pub fn from_data(data: IndexData, store: Arc<GraphStore>) -> IndexResult<Self> {
        for (path, facts) in &data.files {
            validate_facts(path, facts)?;
        }
        let mut indexer = Self::new(store);
        indexer.data = data;
        indexer.rebuild();
        Ok(indexer)
    }

    /// Get the data for persistence
    pub fn data(&self) -> &IndexData {
        &self.data
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn file_count(&self) -> usize {
        self.data.file_count()
    }

    pub fn last_build(&self) -> BuildStats {
        self.last_build
    }

    /// Replace the facts of one file. Returns `false` when the content hash is
    /// unchanged and nothing was rebuilt.
    pub fn index_file(&mut self, path: &str, facts: FileFacts) -> IndexResult<bool> {
        if self.data.content_hash(path) == Some(facts.content_hash.as_str()) {
            debug!("[indexer] {path} unchanged, skipping");
            return Ok(false);
        }
        validate_facts(path, &facts)?;

        self.data.files.insert(path.to_string(), facts);
        self.rebuild();
        Ok(true)
    }

    /// Replace several files and rebuild once. Returns how many changed.
    pub fn index_files(
        &mut self,
        files: impl IntoIterator<Item = (String, FileFacts)>,
    ) -> IndexResult<usize> {
        let mut changed = Vec::new();
        for (path, facts) in files {
            if self.data.content_hash(&path) == Some(facts.content_hash.as_str()) {
                continue;
            }
            validate_facts(&path, &facts)?;
            changed.push((path, facts));
        }

        let count = changed.len();
        if count > 0 {
            self.data.files.extend(changed);
            self.rebuild();
        }
        Ok(count)
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        if self.data.files.shift_remove(path).is_none() {
            return false;
        }
        self.rebuild();
        true
    }

    /// Replace the entire fact store.
    pub fn replace_all(&mut self, data: IndexData) -> IndexResult<()> {
        for (path, facts) in &data.files {
            validate_facts(path, facts)?;
        }
        self.data = data;
        self.rebuild();
        Ok(())
    }

    pub fn rebuild(&mut self) -> BuildStats {
        let start = Instant::now();
        let (graph, stats) = GraphBuilder::new(&self.data).build();
        self.store.publish(graph);
        self.last_build = stats;

        info!(
            "[indexer] published graph: {} symbols, {} call edges, {} type usages from {} files in {:?}",
            stats.symbols,
            stats.call_edges,
            stats.type_usages,
            self.data.file_count(),
            start.elapsed()
        );
        if stats.unresolved_usages > 0 || stats.skipped_declarations > 0 {
            debug!(
                "[indexer] {} unresolved usages, {} skipped declarations",
                stats.unresolved_usages, stats.skipped_declarations
            );
        }
        stats
    }
}

/// Declarations must carry the detail their kind needs and belong to the file
/// they are reported for.
fn validate_facts(path: &str, facts: &FileFacts) -> IndexResult<()> {
    for decl in &facts.declarations {
        let invalid = |reason: &str| IndexError::InvalidDeclaration {
            name: decl.qualified_name.clone(),
            reason: reason.to_string(),
        };

        if decl.qualified_name.trim().is_empty() {
            return Err(invalid("qualified name is empty"));
        }
        if decl.file_path != path {
            return Err(invalid(&format!(
                "declared in '{}' but reported for '{path}'",
                decl.file_path
            )));
        }
        match (decl.kind.is_callable(), &decl.signature, &decl.type_shape) {
            (true, None, _) => return Err(invalid("method declaration without signature")),
            (true, Some(_), Some(_)) => return Err(invalid("method declaration with a type shape")),
            (false, Some(_), _) => return Err(invalid("type declaration with a method signature")),
            _ => {}
        }
    }
    Ok(())
}
