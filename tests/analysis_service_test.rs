//! End-to-end queries through the analysis service.

use refgraph::analysis::{CallFilter, Direction};
use refgraph::symbol::TypeShape;
use refgraph::{
    AnalysisService, CallKind, Confidence, FileFacts, IndexData, IndexPersistence, MethodQuery,
    MethodSignature, QueryError, Range, Settings, SymbolDeclaration, SymbolKind, SyntacticForm,
    UsageSite,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SERVICES: &str = "src/services.cs";
const CYCLES: &str = "src/cycles.cs";

fn class(name: &str, file: &str) -> SymbolDeclaration {
    class_with(name, TypeShape::default(), file)
}

fn class_with(name: &str, shape: TypeShape, file: &str) -> SymbolDeclaration {
    SymbolDeclaration::type_decl(name, SymbolKind::Class, shape, file, Range::default())
}

fn interface(name: &str, file: &str) -> SymbolDeclaration {
    SymbolDeclaration::type_decl(
        name,
        SymbolKind::Interface,
        TypeShape::default(),
        file,
        Range::default(),
    )
}

fn method(ty: &str, name: &str, file: &str) -> SymbolDeclaration {
    let sig = MethodSignature::from_types(ty, name, "void", &[]).unwrap();
    SymbolDeclaration::method(sig, file, Range::default())
}

fn services() -> FileFacts {
    let implementing = TypeShape {
        interfaces: vec!["IService".to_string()],
        ..TypeShape::default()
    };

    FileFacts::new("services-v1")
        .declare(class("App.Manager", SERVICES))
        .declare(class("App.Service", SERVICES))
        .declare(interface("App.IService", SERVICES))
        .declare(class_with("App.ServiceImpl", implementing, SERVICES))
        .declare(class("App.Consumer", SERVICES))
        .declare(class("App.RecursiveService", SERVICES))
        .declare(method("App.Manager", "Run", SERVICES))
        .declare(method("App.Service", "Execute", SERVICES))
        .declare(method("App.IService", "Execute", SERVICES))
        .declare(method("App.ServiceImpl", "Execute", SERVICES))
        .declare(method("App.Consumer", "Use", SERVICES))
        .declare(method("App.RecursiveService", "Compute", SERVICES))
        .usage(
            UsageSite::call("App.Manager.Run()", "App.Service.Execute()", SERVICES, 12, 9)
                .with_receiver("App.Service")
                .with_snippet("service.Execute();"),
        )
        .usage(
            UsageSite::call("App.Consumer.Use()", "App.IService.Execute()", SERVICES, 30, 13)
                .with_receiver("App.IService"),
        )
        .usage(
            UsageSite::new(SyntacticForm::ObjectCreation, "App.ServiceImpl", SERVICES, 28, 23)
                .within("App.Consumer.Use()"),
        )
        .usage(UsageSite::call(
            "App.RecursiveService.Compute()",
            "App.RecursiveService.Compute()",
            SERVICES,
            44,
            16,
        ))
}

fn cycles() -> FileFacts {
    FileFacts::new("cycles-v1")
        .declare(class("App.Cycles.A", CYCLES))
        .declare(class("App.Cycles.B", CYCLES))
        .declare(method("App.Cycles.A", "MethodA", CYCLES))
        .declare(method("App.Cycles.B", "MethodB", CYCLES))
        .usage(UsageSite::call("App.Cycles.A.MethodA()", "App.Cycles.B.MethodB()", CYCLES, 5, 9))
        .usage(UsageSite::call("App.Cycles.B.MethodB()", "App.Cycles.A.MethodA()", CYCLES, 15, 9))
}

fn index_data() -> IndexData {
    let mut data = IndexData::new();
    data.files.insert(SERVICES.to_string(), services());
    data.files.insert(CYCLES.to_string(), cycles());
    data
}

fn service() -> AnalysisService {
    AnalysisService::from_data(index_data(), Arc::new(Settings::default())).unwrap()
}

fn by_name(name: &str, ty: &str) -> MethodQuery {
    MethodQuery::by_name(name, Some(ty))
}

#[tokio::test]
async fn test_direct_caller() {
    let service = service();
    let cancel = CancellationToken::new();

    let result = service
        .find_callers("Execute", Some("Service"), &cancel)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.total_callers, 1);
    assert_eq!(result.direct_callers, 1);
    let caller = &result.callers[0];
    assert_eq!(caller.caller_method, "App.Manager.Run()");
    assert_eq!(caller.line, 12);
    assert_eq!(caller.call_type, CallKind::Direct);
    assert_eq!(caller.confidence, Confidence::High);
    assert_eq!(caller.snippet.as_deref(), Some("service.Execute();"));
}

#[tokio::test]
async fn test_interface_call_is_indirect_caller_of_implementation() {
    let service = service();
    let cancel = CancellationToken::new();

    let indirect = service
        .find_indirect_callers("Execute", Some("ServiceImpl"), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(indirect.total_callers, 1);
    assert_eq!(indirect.callers[0].caller_method, "App.Consumer.Use()");
    assert_eq!(indirect.callers[0].call_type, CallKind::Indirect);

    let direct = service
        .find_direct_callers("Execute", Some("ServiceImpl"), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(direct.total_callers, 0);
}

#[tokio::test]
async fn test_indirect_caller_of_interface_member() {
    let service = service();
    let cancel = CancellationToken::new();

    let result = service
        .find_indirect_callers("Execute", Some("IService"), &cancel)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.total_callers, 1);
    assert_eq!(result.indirect_callers, 1);
    let caller = &result.callers[0];
    assert_eq!(caller.caller_method, "App.Consumer.Use()");
    assert_eq!(caller.caller_type, "App.Consumer");
    assert_eq!(caller.call_type, CallKind::Indirect);
    assert_eq!(caller.confidence, Confidence::Medium);
}

#[tokio::test]
async fn test_callees_by_signature() {
    let service = service();
    let cancel = CancellationToken::new();
    let signature = MethodSignature::from_types("App.Consumer", "Use", "void", &[]).unwrap();

    let result = service
        .find_callees_by_signature(signature, &cancel)
        .await
        .unwrap()
        .unwrap();

    let callees: Vec<_> = result.callees.iter().map(|c| c.callee_method.as_str()).collect();
    assert_eq!(callees, vec!["App.IService.Execute()", "App.ServiceImpl.Execute()"]);
    assert_eq!(result.indirect_callees, 2);
}

#[tokio::test]
async fn test_unknown_method_is_not_found() {
    let service = service();
    let cancel = CancellationToken::new();

    assert!(service.find_callers("Missing", None, &cancel).await.unwrap().is_none());
    assert!(
        service
            .find_reachable_methods(by_name("Missing", "App.Manager"), None, &cancel)
            .await
            .unwrap()
            .is_none()
    );
    assert!(service.find_type_usages("Missing", &cancel).await.unwrap().is_none());
    assert!(
        service
            .find_call_chains(
                MethodQuery::by_name("NoSuchMethod", None),
                Direction::Forward,
                None,
                &cancel
            )
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_recursion_detected() {
    let service = service();
    let cancel = CancellationToken::new();

    let paths = service
        .find_recursive_call_chains(by_name("Compute", "RecursiveService"), Some(5), &cancel)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(paths.len(), 1);
    assert!(paths[0].is_recursive);
    assert_eq!(paths[0].length(), 1);
    assert_eq!(paths[0].end_method(), Some("App.RecursiveService.Compute()"));
}

#[tokio::test]
async fn test_two_method_cycle() {
    let service = service();
    let cancel = CancellationToken::new();

    let cycles = service
        .find_circular_dependencies(Some("App.Cycles"), &cancel)
        .await
        .unwrap();

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_length, 2);
    assert_eq!(cycles[0].steps.len(), 2);
    assert_eq!(cycles[0].files_involved, vec![CYCLES.to_string()]);

    let everywhere = service.find_circular_dependencies(None, &cancel).await.unwrap();
    assert_eq!(everywhere.len(), 2);
}

#[tokio::test]
async fn test_reachability_by_depth() {
    let service = service();
    let cancel = CancellationToken::new();

    let none = service
        .find_reachable_methods(by_name("Run", "Manager"), Some(0), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(none.total_reachable, 0);

    let one = service
        .find_reachable_methods(by_name("Run", "Manager"), Some(1), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.reachable_methods, vec!["App.Service.Execute()"]);
    assert_eq!(one.methods_by_depth[&1], vec!["App.Service.Execute()"]);
}

#[tokio::test]
async fn test_call_graph_is_stable() {
    let service = service();
    let cancel = CancellationToken::new();

    let first = service.analyze_call_graph(None, Some("App"), &cancel).await.unwrap();
    let second = service.analyze_call_graph(None, Some("App"), &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_edges, 6);
    assert!(first.entry_points.contains(&"App.Manager.Run()".to_string()));
}

#[tokio::test]
async fn test_chains_stay_within_depth() {
    let service = service();
    let cancel = CancellationToken::new();

    let result = service
        .find_call_chains(by_name("MethodA", "A"), Direction::Forward, Some(1), &cancel)
        .await
        .unwrap()
        .unwrap();

    assert!(!result.paths.is_empty());
    assert!(result.paths.iter().all(|p| p.length() <= 1));

    let backward = service
        .find_call_chains(by_name("Execute", "App.Service"), Direction::Backward, None, &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(backward.total_paths, 1);
    assert_eq!(backward.paths[0].end_method(), Some("App.Manager.Run()"));
}

#[tokio::test]
async fn test_shortest_path_between_cycle_members() {
    let service = service();
    let cancel = CancellationToken::new();

    let path = service
        .find_shortest_path(by_name("MethodA", "A"), by_name("MethodB", "B"), &cancel)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(path.length(), 1);
    assert_eq!(path.methods(), vec!["App.Cycles.A.MethodA()", "App.Cycles.B.MethodB()"]);
}

#[tokio::test]
async fn test_invalid_input_and_cancellation() {
    let service = service();
    let cancel = CancellationToken::new();

    let err = service
        .find_call_chains(by_name("Run", "Manager"), Direction::Forward, Some(0), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidInput { field: "max_depth", .. }));

    let err = service
        .analyze_call_graph(Some("App.Manager"), Some("App"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidInput { field: "scope", .. }));

    let err = service.find_callers("", None, &cancel).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidInput { .. }));

    cancel.cancel();
    let err = service
        .callers("find_callers", by_name("Execute", "Service"), CallFilter::All, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_type_queries() {
    let service = service();
    let cancel = CancellationToken::new();

    let created = service
        .find_instantiations("ServiceImpl", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.total_usages, 1);
    assert_eq!(created.usages[0].using_type.as_deref(), Some("App.Consumer"));

    let implementations = service
        .find_interface_implementations("IService", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(implementations.total_usages, 1);

    let inheritance = service
        .analyze_inheritance("IService", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert!(inheritance.is_interface);
    assert_eq!(inheritance.interface_implementations, vec!["App.ServiceImpl"]);

    let opportunities = service.find_refactoring_opportunities(None, &cancel).await.unwrap();
    assert_eq!(opportunities.single_implementation_interfaces, vec!["App.IService"]);
    assert_eq!(
        opportunities.total_opportunities,
        opportunities.breakdown.values().sum::<usize>()
    );
}

#[tokio::test]
async fn test_reindexing_replaces_snapshot() {
    let service = service();
    let cancel = CancellationToken::new();
    let before = service.snapshot();

    let rewritten = FileFacts::new("services-v2")
        .declare(class("App.Manager", SERVICES))
        .declare(method("App.Manager", "Run", SERVICES));
    assert!(service.index_file(SERVICES, rewritten).await.unwrap());

    assert!(service.find_callers("Execute", Some("Service"), &cancel).await.unwrap().is_none());
    assert_eq!(before.call_edge_count(), 6);
    assert_eq!(service.capabilities().call_edges, 2);

    assert!(service.remove_file(CYCLES).await);
    assert_eq!(service.capabilities().call_edges, 0);
}

#[tokio::test]
async fn test_persisted_index_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let persistence = IndexPersistence::new(temp_dir.path().join("index"));
    let settings = Arc::new(Settings::default());
    let cancel = CancellationToken::new();

    let service = service();
    service.save(&persistence).await.unwrap();
    assert!(persistence.exists());

    let reopened = AnalysisService::open(&persistence, Arc::clone(&settings)).unwrap();
    assert_eq!(reopened.capabilities(), service.capabilities());

    let callers = reopened
        .find_callers("Execute", Some("Service"), &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(callers.callers[0].caller_method, "App.Manager.Run()");

    let empty = AnalysisService::open(&IndexPersistence::new(temp_dir.path().join("none")), settings)
        .unwrap();
    assert!(!empty.capabilities().ready);
}
