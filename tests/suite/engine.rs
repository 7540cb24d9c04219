//! End-to-end analysis runs against the scripted fake server

use std::path::Path;

use serde_json::json;
use sonar_analysis::{
    AnalysisError, AnalysisReport, AnalysisSettings, Analyzer, Confidence, DetectorKind,
    EngineState, FileSelection, discover,
};
use sonar_lsp::{ServerConfig, SpawnSpec};

use crate::common::{Script, kind, location, project, start, symbol, uri_of};

fn settings(detectors: &[DetectorKind]) -> AnalysisSettings {
    AnalysisSettings {
        detectors: detectors.to_vec(),
        ..AnalysisSettings::default()
    }
}

async fn analyze(
    root: &Path,
    script: Script,
    detectors: &[DetectorKind],
) -> (Analyzer, Result<AnalysisReport, AnalysisError>) {
    let (client, _log, _server) = start(script, root).await;
    let mut analyzer = Analyzer::new(root, settings(detectors));
    let paths = discover(root, &FileSelection::default());
    let result = analyzer
        .analyze(client, &paths, &ServerConfig::new("fake-ls", Vec::new()))
        .await;
    (analyzer, result)
}

#[tokio::test]
async fn unused_and_hotspots() {
    let (_dir, root) = project(&[
        (
            "a.ts",
            "export function used() {}\nexport function orphan() {}\nexport class Popular {}\n",
        ),
        ("b.ts", "import { used, Popular } from './a';\n"),
    ]);
    let a = uri_of(&root, "a.ts");
    let b = uri_of(&root, "b.ts");
    let c = uri_of(&root, "c.ts");

    let mut script = Script::default();
    script
        .symbols(
            &a,
            vec![
                symbol("used", kind::FUNCTION, 0, 0, 16),
                symbol("orphan", kind::FUNCTION, 1, 1, 16),
                symbol("Popular", kind::CLASS, 2, 2, 13),
            ],
        )
        .references(&a, (0, 16), vec![location(&b, 0, 9)])
        // Only the declaration itself.
        .references(&a, (1, 16), vec![location(&a, 1, 16)])
        .references(
            &a,
            (2, 13),
            (0..10)
                .map(|i| location(if i % 2 == 0 { &b } else { &c }, i, 0))
                .collect(),
        );

    let (analyzer, result) =
        analyze(&root, script, &[DetectorKind::Unused, DetectorKind::Hotspots]).await;
    let report = result.unwrap();
    assert_eq!(analyzer.state(), EngineState::Done);

    let unused = report.findings.unused.as_ref().unwrap();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].symbol.name, "orphan");
    assert_eq!(unused[0].symbol.file, "a.ts");
    assert_eq!(unused[0].symbol.line, 2);
    assert_eq!(unused[0].confidence, Confidence::High);

    let hotspots = report.findings.hotspots.as_ref().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0].symbol.name, "Popular");
    assert_eq!(hotspots[0].reference_count, 10);
    assert_eq!(hotspots[0].referencing_files, vec!["b.ts", "c.ts"]);

    assert_eq!(report.summary.files_analyzed, 2);
    assert_eq!(report.summary.total_symbols, 3);
    assert!(report.findings.signatures.is_none());
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn duplicate_signatures_and_dead_parameters() {
    let text = "function add(a: number, b: number): number {\n  return a + b;\n}\nfunction sum(x: number, y: number): number {\n  return x;\n}\n";
    let (_dir, root) = project(&[("math.ts", text)]);
    let uri = uri_of(&root, "math.ts");

    let mut script = Script::default();
    script
        .symbols(
            &uri,
            vec![
                symbol("add", kind::FUNCTION, 0, 2, 9),
                symbol("sum", kind::FUNCTION, 3, 5, 9),
            ],
        )
        .hover(&uri, (0, 9), "function add(a: number, b: number): number")
        .hover(&uri, (3, 9), "function sum(x: number, y: number): number");

    let (_analyzer, result) = analyze(
        &root,
        script,
        &[DetectorKind::Signatures, DetectorKind::DeadParams],
    )
    .await;
    let report = result.unwrap();

    let groups = report.findings.signatures.as_ref().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].signature, "(number, number): number");
    let names: Vec<&str> = groups[0].members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["add", "sum"]);

    let dead = report.findings.dead_params.as_ref().unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].symbol.name, "sum");
    assert_eq!(dead[0].param, "y");
}

#[tokio::test]
async fn cooccurrence_and_similar_types() {
    let text = "export interface Config {\n  host: string;\n  port: number;\n}\nexport function loadConfig() {}\n";
    let names = ["one.ts", "two.ts", "three.ts"];
    let (_dir, root) = project(&names.map(|name| (name, text)));

    let mut script = Script::default();
    for name in names {
        script.symbols(
            &uri_of(&root, name),
            vec![
                symbol("Config", kind::INTERFACE, 0, 3, 17),
                symbol("loadConfig", kind::FUNCTION, 4, 4, 16),
            ],
        );
    }

    let (_analyzer, result) = analyze(
        &root,
        script,
        &[DetectorKind::Cooccurrence, DetectorKind::SimilarTypes],
    )
    .await;
    let report = result.unwrap();

    let pairs = report.findings.cooccurrence.as_ref().unwrap();
    assert_eq!(pairs.len(), 1);
    let mut pair = [pairs[0].symbol_a.as_str(), pairs[0].symbol_b.as_str()];
    pair.sort_unstable();
    assert_eq!(pair, ["Config", "loadConfig"]);
    assert_eq!(pairs[0].shared_files, vec!["one.ts", "three.ts", "two.ts"]);

    let similar = report.findings.similar_types.as_ref().unwrap();
    assert_eq!(similar.len(), 3);
    for pair in similar {
        assert!((pair.similarity - 1.0).abs() < 1e-9);
        assert_eq!(pair.shared_properties, vec!["host", "port"]);
    }

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["findings"]["similar-types"], 3);
    assert!(json["findings"].get("unused").is_none());
}

#[tokio::test]
async fn reference_detectors_skipped_without_references_provider() {
    let (_dir, root) = project(&[("a.ts", "export function f() {}\n")]);
    let uri = uri_of(&root, "a.ts");
    let mut script = Script {
        capabilities: json!({ "documentSymbolProvider": true, "hoverProvider": true }),
        ..Script::default()
    };
    script.symbols(&uri, vec![symbol("f", kind::FUNCTION, 0, 0, 16)]);

    let (_analyzer, result) = analyze(&root, script, &DetectorKind::ALL).await;
    let report = result.unwrap();

    assert_eq!(
        report.skipped,
        vec![DetectorKind::Unused, DetectorKind::Hotspots]
    );
    assert!(report.findings.unused.is_none());
    assert!(report.findings.hotspots.is_none());
    assert!(report.findings.dead_params.is_some());
    assert!(report.to_text().contains("Skipped unused"));
}

#[tokio::test]
async fn server_crash_aborts_the_run() {
    let (_dir, root) = project(&[
        ("a.ts", "export function f() {}\n"),
        ("b.ts", "export function g() {}\n"),
    ]);
    let mut script = Script {
        crash_after: Some(1),
        ..Script::default()
    };
    script.symbols(
        &uri_of(&root, "a.ts"),
        vec![symbol("f", kind::FUNCTION, 0, 0, 16)],
    );

    let (analyzer, result) = analyze(&root, script, &DetectorKind::ALL).await;
    let err = result.unwrap_err();
    assert!(matches!(err, AnalysisError::ProcessExited { ref file } if file.ends_with("a.ts")));
    assert_eq!(err.phase(), "collect");
    assert_eq!(analyzer.state(), EngineState::Done);
}

#[tokio::test]
async fn analyzer_runs_once() {
    let (_dir, root) = project(&[("a.ts", "")]);
    let (_analyzer, first) = analyze(&root, Script::default(), &[DetectorKind::Unused]).await;
    assert!(first.is_ok());

    let mut analyzer = Analyzer::new(&root, AnalysisSettings::default());
    let (client, _log, _server) = start(Script::default(), &root).await;
    let _ = analyzer
        .analyze(client, &[], &ServerConfig::new("fake-ls", Vec::new()))
        .await
        .unwrap();
    let (client, _log, _server) = start(Script::default(), &root).await;
    let again = analyzer
        .analyze(client, &[], &ServerConfig::new("fake-ls", Vec::new()))
        .await;
    assert!(matches!(again, Err(AnalysisError::AlreadyRan(EngineState::Done))));
}

#[tokio::test]
async fn missing_server_binary_fails_in_spawn_phase() {
    let (_dir, root) = project(&[("a.ts", "")]);
    let spec = SpawnSpec {
        server: ServerConfig::new("sonar-no-such-language-server-binary", Vec::new()),
        workspace_root: root.clone(),
    };
    let analyzer = Analyzer::new(&root, AnalysisSettings::default());
    let Err(err) = analyzer.start_client(&spec).await else {
        panic!("expected spawn failure");
    };
    assert!(matches!(err, AnalysisError::Spawn(_)));
    assert_eq!(err.phase(), "spawn");
    assert_eq!(analyzer.state(), EngineState::Idle);
}
