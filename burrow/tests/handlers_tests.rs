use burrow::command_argument_builder;
use burrow::handlers::*;
use burrow_core::{
    DiscoveryTree, FilterMode, ReportFormat, ResumeState, ScanConfig, ScanMode, ScanPlan,
    ShowField,
};
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scan_config_from(args: &[&str]) -> anyhow::Result<ScanConfig> {
    let mut argv = vec!["burrow", "scan"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder().try_get_matches_from(argv)?;
    let sub = matches
        .subcommand_matches("scan")
        .expect("scan subcommand should be present");
    build_config(sub)
}

fn wordlist(words: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for word in words {
        writeln!(file, "{}", word).unwrap();
    }
    file
}

fn quiet_output(format: ReportFormat, output: Option<PathBuf>) -> OutputOptions {
    OutputOptions {
        format,
        output,
        quiet: true,
    }
}

async fn site() -> MockServer {
    let server = MockServer::start().await;
    for route in ["/admin", "/admin/panel", "/backup"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {}", route)))
            .mount(&server)
            .await;
    }
    server
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_build_config_from_flags() {
    let config = scan_config_from(&[
        "-u",
        "http://target.test/",
        "-w",
        "words.txt",
        "-d",
        "2",
        "-t",
        "4",
        "--throttle",
        "20",
        "-f",
        "status:200-299",
        "-f",
        "!size:0",
        "--or",
        "--transform",
        "lower",
        "--unique",
        "-H",
        "X-Token: abc",
        "-s",
        "hash",
        "-m",
        "recursive",
    ])
    .unwrap();

    assert_eq!(config.url, "http://target.test/");
    assert_eq!(config.wordlists, vec![PathBuf::from("words.txt")]);
    assert_eq!(config.max_depth, 2);
    assert_eq!(config.threads, 4);
    assert_eq!(config.throttle, 20);
    assert_eq!(config.filters, vec!["status:200-299", "!size:0"]);
    assert_eq!(config.filter_mode, FilterMode::Or);
    assert_eq!(config.transforms, vec!["lower"]);
    assert!(config.unique);
    assert_eq!(config.headers, vec!["X-Token: abc"]);
    assert_eq!(config.show, vec![ShowField::Hash]);
    assert_eq!(config.mode, ScanMode::Recursive);
}

#[test]
fn test_build_config_defaults_state_file() {
    let config = scan_config_from(&["-u", "http://target.test/"]).unwrap();
    assert_eq!(config.state_file, Some(PathBuf::from(DEFAULT_STATE_FILE)));
    assert_eq!(config.placeholder, "$");
    assert_eq!(config.filter_mode, FilterMode::And);
}

#[test]
fn test_flags_override_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "url = \"http://from-file.test/\"").unwrap();
    writeln!(file, "threads = 4").unwrap();
    writeln!(file, "max-depth = 5").unwrap();
    writeln!(file, "filters = [\"status:200\"]").unwrap();
    let config_path = file.path().to_string_lossy().to_string();

    let config = scan_config_from(&["-c", &config_path, "-t", "8"]).unwrap();

    assert_eq!(config.url, "http://from-file.test/");
    assert_eq!(config.threads, 8);
    assert_eq!(config.max_depth, 5);
    assert_eq!(config.filters, vec!["status:200"]);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = scan_config_from(&["-c", "/nonexistent/burrow.toml"]);
    assert!(result.is_err());
}

#[test]
fn test_invalid_mode_rejected_by_parser() {
    let result = command_argument_builder().try_get_matches_from([
        "burrow", "scan", "-u", "http://x.test/", "-m", "sideways",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_resume_requires_state() {
    let result = command_argument_builder().try_get_matches_from(["burrow", "resume"]);
    assert!(result.is_err());
}

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path(&PathBuf::from("~/words.txt"));
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert_eq!(
        expand_path(&PathBuf::from("/tmp/words.txt")),
        PathBuf::from("/tmp/words.txt")
    );
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_recursive_scan_against_live_server() {
    let server = site().await;
    let words = wordlist(&["admin", "panel", "backup", "nothing"]);
    let out_dir = TempDir::new().unwrap();
    let report_path = out_dir.path().join("report.txt");

    let mut config = ScanConfig::new(format!("{}/", server.uri()));
    config.wordlists = vec![words.path().to_path_buf()];
    config.filters = vec!["status:200".to_string()];
    config.max_depth = 2;
    config.threads = 3;

    let plan = ScanPlan::from_config(config).unwrap();
    let summary = execute(
        plan,
        None,
        &quiet_output(ReportFormat::Plain, Some(report_path.clone())),
    )
    .await
    .unwrap();

    let RunSummary::Completed {
        stats, discovered, ..
    } = &summary
    else {
        panic!("scan should complete");
    };
    assert_eq!(summary.exit_code(), EXIT_OK);
    assert_eq!(*discovered, 3);
    // 4 words at the root, then 4 under each of the 2 hits
    assert_eq!(stats.requests, 12);

    let report = std::fs::read_to_string(&report_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    let uri = server.uri();
    assert!(lines.contains(&format!("{}/admin", uri).as_str()));
    assert!(lines.contains(&format!("{}/admin/panel", uri).as_str()));
    assert!(lines.contains(&format!("{}/backup", uri).as_str()));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_classic_scan_against_live_server() {
    let server = site().await;
    let words = wordlist(&["admin", "backup", "secret"]);

    let mut config = ScanConfig::new(format!("{}/$", server.uri()));
    config.wordlists = vec![words.path().to_path_buf()];
    config.filters = vec!["status:200".to_string()];

    let plan = ScanPlan::from_config(config).unwrap();
    let summary = execute(plan, None, &quiet_output(ReportFormat::Csv, None))
        .await
        .unwrap();

    let RunSummary::Completed {
        report, discovered, ..
    } = summary
    else {
        panic!("scan should complete");
    };
    assert_eq!(discovered, 2);
    assert!(report.starts_with("depth,word,url,status"));
    assert!(report.contains(&format!("{}/admin", server.uri())));
    assert!(report.contains(&format!("{}/backup", server.uri())));
    assert!(!report.contains("secret"));
}

#[tokio::test]
async fn test_resume_from_saved_state() {
    let server = site().await;
    let url = format!("{}/", server.uri());

    let mut config = ScanConfig::new(url.clone());
    config.filters = vec!["status:200".to_string()];
    config.max_depth = 2;
    let words: Vec<String> = ["admin", "panel"].iter().map(|w| w.to_string()).collect();

    let mut tree = DiscoveryTree::new();
    tree.insert(url.as_str(), None, None);

    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    ResumeState::new(config, words, 0, tree, Vec::new())
        .save(&state_path)
        .unwrap();

    let state = ResumeState::load(&state_path).unwrap();
    let plan = ScanPlan::compile(state.config.clone(), state.words.clone()).unwrap();
    let summary = execute(plan, Some(state), &quiet_output(ReportFormat::Json, None))
        .await
        .unwrap();

    let RunSummary::Completed {
        report, discovered, ..
    } = summary
    else {
        panic!("resumed scan should complete");
    };
    assert_eq!(discovered, 2);
    let json: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(json["discovered"], 2);
}

#[tokio::test]
async fn test_unreachable_target_records_failures() {
    let words = wordlist(&["admin"]);
    let mut config = ScanConfig::new("http://127.0.0.1:1/");
    config.wordlists = vec![words.path().to_path_buf()];
    config.timeout_secs = 1;

    let plan = ScanPlan::from_config(config).unwrap();
    let summary = execute(plan, None, &quiet_output(ReportFormat::Tree, None))
        .await
        .unwrap();

    let RunSummary::Completed {
        stats, discovered, ..
    } = summary
    else {
        panic!("scan should complete");
    };
    assert_eq!(discovered, 0);
    assert_eq!(stats.failed, 1);
}
