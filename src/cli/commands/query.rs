//! Analysis commands over the reference graph.

use crate::analysis::CallFilter;
use crate::cli::{Commands, UsageFilter};
use crate::error::QueryResult;
use crate::io::{EntityType, Envelope, ResultCode};
use crate::service::AnalysisService;
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub async fn run(
    command: Commands,
    service: &AnalysisService,
    cancel: &CancellationToken,
) -> anyhow::Result<Envelope> {
    let start = Instant::now();
    let envelope = dispatch(command, service, cancel).await?;
    Ok(envelope.with_duration_ms(start.elapsed().as_millis() as u64))
}

async fn dispatch(
    command: Commands,
    service: &AnalysisService,
    cancel: &CancellationToken,
) -> anyhow::Result<Envelope> {
    match command {
        Commands::Capabilities => {
            let capabilities = service.capabilities();
            let hint = (!capabilities.ready)
                .then_some("The index is empty; run 'refgraph import <facts.json>' first");
            let envelope = Envelope::success(serde_json::to_value(&capabilities)?)
                .with_entity_type(EntityType::Capabilities);
            Ok(match hint {
                Some(hint) => envelope.with_hint(hint),
                None => envelope,
            })
        }

        Commands::Callers { method, filter } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = query.describe();
            let operation = match CallFilter::from(filter) {
                CallFilter::All => "find_callers",
                CallFilter::Direct => "find_direct_callers",
                CallFilter::Indirect => "find_indirect_callers",
            };
            let result = service
                .callers(operation, query, filter.into(), cancel)
                .await;
            found(result, EntityType::Callers, &label, |r| r.total_callers)
        }

        Commands::Callees { method, filter } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = query.describe();
            let result = service
                .callees("find_callees", query, filter.into(), cancel)
                .await;
            found(result, EntityType::Callees, &label, |r| r.total_callees)
        }

        Commands::Chains {
            method,
            direction,
            depth,
        } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = format!("{} ({direction})", query.describe());
            let result = service
                .find_call_chains(query, direction, depth, cancel)
                .await;
            let depth = result.as_ref().ok().and_then(Option::as_ref).map(|r| r.max_depth);
            with_depth(
                found(result, EntityType::CallChains, &label, |r| r.total_paths)?,
                depth,
            )
        }

        Commands::Between { route, depth } => {
            let (from, to) = route.queries();
            let label = format!("{} -> {}", from.describe(), to.describe());
            let result = service
                .find_call_chains_between(from, to, depth, cancel)
                .await
                .map(Some);
            found(result, EntityType::CallChains, &label, Vec::len)
        }

        Commands::Recursive { method, depth } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = query.describe();
            let result = service
                .find_recursive_call_chains(query, depth, cancel)
                .await;
            found(result, EntityType::CallChains, &label, Vec::len)
        }

        Commands::CallGraph {
            type_name,
            namespace,
        } => {
            let label = type_name
                .clone()
                .or_else(|| namespace.clone())
                .unwrap_or_default();
            let result = service
                .analyze_call_graph(type_name.as_deref(), namespace.as_deref(), cancel)
                .await
                .map(Some);
            found(result, EntityType::CallGraph, &label, |r| r.total_edges)
        }

        Commands::Cycles { namespace } => {
            let label = namespace.clone().unwrap_or_default();
            let result = service
                .find_circular_dependencies(namespace.as_deref(), cancel)
                .await
                .map(Some);
            found(result, EntityType::CircularDependencies, &label, Vec::len)
        }

        Commands::Reachable { method, depth } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = query.describe();
            let result = service.find_reachable_methods(query, depth, cancel).await;
            let depth = result.as_ref().ok().and_then(Option::as_ref).map(|r| r.max_depth);
            with_depth(
                found(result, EntityType::ReachableMethods, &label, |r| r.total_reachable)?,
                depth,
            )
        }

        Commands::ShortestPath { route } => {
            let (from, to) = route.queries();
            let label = format!("{} -> {}", from.describe(), to.describe());
            let result = service.find_shortest_path(from, to, cancel).await;
            found(result, EntityType::CallChains, &label, |p| p.length())
        }

        Commands::TypeUsages {
            type_name,
            kind,
            full_name,
        } => {
            let result = match (kind, full_name) {
                (UsageFilter::All, true) => {
                    service
                        .find_type_usages_by_full_name(&type_name, cancel)
                        .await
                }
                (UsageFilter::All, false) => service.find_type_usages(&type_name, cancel).await,
                (UsageFilter::Instantiations, _) => {
                    service.find_instantiations(&type_name, cancel).await
                }
                (UsageFilter::Implementations, _) => {
                    service
                        .find_interface_implementations(&type_name, cancel)
                        .await
                }
                (UsageFilter::Generics, _) => service.find_generic_usages(&type_name, cancel).await,
            };
            found(result, EntityType::TypeUsages, &type_name, |r| {
                r.total_usages
            })
        }

        Commands::Inheritance { type_name } => {
            let result = service.analyze_inheritance(&type_name, cancel).await;
            found(result, EntityType::Inheritance, &type_name, |r| {
                r.derived_classes.len()
            })
        }

        Commands::TypeDeps { type_name } => {
            let result = service.analyze_type_dependencies(&type_name, cancel).await;
            found(result, EntityType::TypeDependencies, &type_name, |r| {
                r.outgoing_dependencies.len() + r.incoming_dependencies.len()
            })
        }

        Commands::Refactoring { namespace } => {
            let label = namespace.clone().unwrap_or_default();
            let result = service
                .find_refactoring_opportunities(namespace.as_deref(), cancel)
                .await
                .map(Some);
            found(result, EntityType::RefactoringOpportunities, &label, |r| {
                r.total_opportunities
            })
        }

        Commands::AnalyzeMethod { method, depth } => {
            let query = match method.to_query() {
                Ok(query) => query,
                Err(e) => return Ok(Envelope::from_query_error(&e)),
            };
            let label = query.describe();
            let result = service.analyze_method(query, depth, cancel).await;
            found(result, EntityType::MethodAnalysis, &label, |r| {
                r.signatures.len()
            })
        }

        Commands::AnalyzeType { type_name } => {
            let result = service.analyze_type(&type_name, cancel).await;
            found(result, EntityType::TypeAnalysis, &type_name, |r| {
                r.usages.as_ref().map_or(0, |u| u.total_usages)
            })
        }

        Commands::Init { .. } | Commands::Config | Commands::Import { .. } => Ok(Envelope::error(
            ResultCode::InternalError,
            "Not an analysis command",
        )),
    }
}

/// Envelope for a query result: not-found for `None`, error envelopes for
/// invalid input and cancellation.
fn found<T: Serialize>(
    result: QueryResult<Option<T>>,
    entity_type: EntityType,
    label: &str,
    count: impl FnOnce(&T) -> usize,
) -> anyhow::Result<Envelope> {
    let envelope = match result {
        Err(e) => Envelope::from_query_error(&e),
        Ok(None) => Envelope::not_found(format!("Nothing in the index matches '{label}'"))
            .with_entity_type(entity_type)
            .with_hint("Check the spelling, or pass --type to name the declaring type"),
        Ok(Some(data)) => {
            let count = count(&data);
            Envelope::success(serde_json::to_value(&data)?)
                .with_entity_type(entity_type)
                .with_count(count)
        }
    };
    Ok(if label.is_empty() {
        envelope
    } else {
        envelope.with_query(label)
    })
}

fn with_depth(envelope: Envelope, depth: Option<usize>) -> anyhow::Result<Envelope> {
    Ok(match depth {
        Some(depth) => envelope.with_depth(depth),
        None => envelope,
    })
}
