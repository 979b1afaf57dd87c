use refgraph::symbol::TypeShape;
use refgraph::{
    FileFacts, IndexData, MethodSignature, Range, SymbolDeclaration, SymbolKind, UsageSite,
};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const FILE: &str = "src/app.cs";

fn write_facts(dir: &Path) -> std::path::PathBuf {
    let method = |ty: &str, name: &str| {
        let sig = MethodSignature::from_types(ty, name, "void", &[]).unwrap();
        SymbolDeclaration::method(sig, FILE, Range::default())
    };
    let class = |name: &str| {
        SymbolDeclaration::type_decl(name, SymbolKind::Class, TypeShape::default(), FILE, Range::default())
    };

    let facts = FileFacts::new("app-v1")
        .declare(class("App.Manager"))
        .declare(class("App.Service"))
        .declare(method("App.Manager", "Run"))
        .declare(method("App.Service", "Execute"))
        .usage(UsageSite::call("App.Manager.Run()", "App.Service.Execute()", FILE, 12, 9));

    let mut data = IndexData::new();
    data.files.insert(FILE.to_string(), facts);

    let path = dir.join("facts.json");
    std::fs::write(&path, serde_json::to_string_pretty(&data).unwrap()).unwrap();
    path
}

fn refgraph(dir: &Path, args: &[&str]) -> (Output, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_refgraph"))
        .current_dir(dir)
        .env_remove("REFGRAPH_CONFIG")
        .arg("--compact")
        .args(args)
        .output()
        .expect("Failed to run refgraph");
    let json = serde_json::from_slice(&output.stdout).expect("stdout is not a JSON envelope");
    (output, json)
}

#[test]
fn test_callers_from_fact_file() {
    let temp_dir = TempDir::new().unwrap();
    let facts = write_facts(temp_dir.path());
    let facts = facts.to_str().unwrap();

    let (output, json) = refgraph(
        temp_dir.path(),
        &["--facts", facts, "callers", "Execute", "--type", "Service"],
    );

    assert!(output.status.success());
    assert_eq!(json["status"], "success");
    assert_eq!(json["meta"]["entity_type"], "callers");
    assert_eq!(json["meta"]["count"], 1);
    assert_eq!(json["data"]["callers"][0]["caller_method"], "App.Manager.Run()");
}

#[test]
fn test_unknown_method_exits_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let facts = write_facts(temp_dir.path());
    let facts = facts.to_str().unwrap();

    let (output, json) = refgraph(temp_dir.path(), &["--facts", facts, "callers", "Missing"]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(json["status"], "not_found");
    assert_eq!(json["code"], "NOT_FOUND");
}

#[test]
fn test_depth_over_limit_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    let facts = write_facts(temp_dir.path());
    let facts = facts.to_str().unwrap();

    let (output, json) = refgraph(
        temp_dir.path(),
        &["--facts", facts, "reachable", "Run", "--depth", "100"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json["code"], "INVALID_INPUT");
    assert_eq!(json["error"]["field"], "max_depth");
}

#[test]
fn test_import_then_query_stored_index() {
    let temp_dir = TempDir::new().unwrap();
    let facts = write_facts(temp_dir.path());
    let facts = facts.to_str().unwrap();

    let (output, json) = refgraph(temp_dir.path(), &["import", facts]);
    assert!(output.status.success());
    assert_eq!(json["meta"]["entity_type"], "index_summary");
    assert!(temp_dir.path().join(".refgraph/index/facts.json").exists());

    let (output, json) = refgraph(temp_dir.path(), &["callees", "Run", "--type", "Manager"]);
    assert!(output.status.success());
    assert_eq!(json["data"]["callees"][0]["callee_method"], "App.Service.Execute()");
}

#[test]
fn test_init_writes_settings() {
    let temp_dir = TempDir::new().unwrap();

    let (output, _) = refgraph(temp_dir.path(), &["init"]);
    assert!(output.status.success());

    let content = std::fs::read_to_string(temp_dir.path().join(".refgraph/settings.toml")).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[analysis]"));

    let (output, json) = refgraph(temp_dir.path(), &["init"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json["code"], "CONFIG_ERROR");
}

#[test]
fn test_config_hints_until_initialized() {
    let temp_dir = TempDir::new().unwrap();

    let (output, json) = refgraph(temp_dir.path(), &["config"]);
    assert!(output.status.success());
    assert_eq!(json["data"]["analysis"]["max_depth_limit"], 32);
    assert!(json["hint"].as_str().unwrap().contains("refgraph init"));

    let (output, _) = refgraph(temp_dir.path(), &["init"]);
    assert!(output.status.success());

    let (_, json) = refgraph(temp_dir.path(), &["config"]);
    assert!(json.get("hint").is_none());
}
