//! End-to-end runs: canned enterprise API, fake scanner, real output file

#![cfg(unix)]

mod common;

use common::{fake_scanner, repo_json, Canned, CannedServer, REPORTING_SCANNER};
use reposec::app::cli::{Args, Config};
use reposec::app::startup::{run, run_pipeline};
use reposec::core::shutdown::ShutdownCoordinator;
use reposec::directory::{DirectorySettings, GheClient};
use reposec::metrics::NoopMetrics;
use reposec::scan::{ScanOrchestrator, Summary};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn args(server: &CannedServer, scanner: &Path, output: &Path, format: &str) -> Args {
    Args {
        ghe_token: Some("ghp_test".to_string()),
        ghe_base_url: Some(server.url().to_string()),
        lava_binary_path: Some(scanner.to_string_lossy().into_owned()),
        lava_check_image: Some("check:latest".to_string()),
        output_file: Some(output.to_path_buf()),
        output_format: Some(format.to_string()),
        ..Default::default()
    }
}

/// Two organizations; org2 holds an empty repository that is filtered out
fn two_orgs(server: &CannedServer) {
    server.with_user("octocat");
    server.route(
        "/api/v3/organizations?per_page=100",
        vec![Canned::json(r#"[{"login":"org1"},{"login":"org2"}]"#)],
    );
    server.route(
        "/api/v3/orgs/org1/repos?per_page=100",
        vec![Canned::json(format!(
            "[{},{}]",
            repo_json("org1", "repo1", 10),
            repo_json("org1", "repo2", 20)
        ))],
    );
    server.route(
        "/api/v3/orgs/org2/repos?per_page=100",
        vec![Canned::json(format!("[{}]", repo_json("org2", "empty", 0)))],
    );
}

#[tokio::test]
async fn test_run_writes_json_report_and_exits_zero() {
    let server = CannedServer::start().await;
    two_orgs(&server);
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.json");

    let config = Config::resolve(args(&server, &scanner, &output, "json"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();
    let code = run(config, coordinator.signal()).await;

    assert_eq!(code, 0);
    let written: Vec<Summary> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let mut repositories: Vec<&str> = written.iter().map(|s| s.repository()).collect();
    repositories.sort_unstable();
    assert_eq!(
        repositories,
        vec!["https://ghe.example/org1/repo1", "https://ghe.example/org1/repo2"]
    );
    assert!(written
        .iter()
        .all(|s| s.control_in_place() && s.number_of_controls() == 2 && !s.is_error()));
}

#[tokio::test]
async fn test_target_org_restricts_listing_and_writes_csv() {
    let server = CannedServer::start().await;
    server.with_user("octocat");
    server.route(
        "/api/v3/orgs/org1/repos?per_page=100",
        vec![Canned::json(format!("[{}]", repo_json("org1", "repo1", 10)))],
    );
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.csv");

    let config = Config::resolve(
        Args {
            target_org: Some("org1".to_string()),
            ..args(&server, &scanner, &output, "csv")
        },
        None,
    )
    .unwrap();
    let coordinator = ShutdownCoordinator::new();
    let code = run(config, coordinator.signal()).await;

    assert_eq!(code, 0);
    assert_eq!(server.hits("/api/v3/organizations?per_page=100"), 0);
    let csv = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "https://ghe.example/org1/repo1,true,2,MFA#BranchProtection,"
    );
}

#[tokio::test]
async fn test_scan_failures_still_produce_output() {
    let server = CannedServer::start().await;
    two_orgs(&server);
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", "exit 1");
    let output = dir.path().join("report.json");

    let config = Config::resolve(args(&server, &scanner, &output, "json"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();
    let code = run(config, coordinator.signal()).await;

    assert_eq!(code, 0);
    let written: Vec<Summary> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written
        .iter()
        .all(|s| s.error() == "error running Lava: exit status 1"));
}

#[tokio::test]
async fn test_bad_credentials_exit_nonzero_without_output() {
    let server = CannedServer::start().await;
    server.route(
        "/api/v3/user",
        vec![Canned::status(401, r#"{"message":"Bad credentials"}"#)],
    );
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.json");

    let config = Config::resolve(args(&server, &scanner, &output, "json"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();
    let code = run(config, coordinator.signal()).await;

    assert_eq!(code, 1);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_failed_organization_listing_is_fatal() {
    let server = CannedServer::start().await;
    server.with_user("octocat");
    server.route(
        "/api/v3/organizations?per_page=100",
        vec![Canned::status(500, r#"{"message":"Server Error"}"#)],
    );
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.json");

    let config = Config::resolve(args(&server, &scanner, &output, "json"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();

    assert_eq!(run(config, coordinator.signal()).await, 1);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_run_pipeline_reports_counts() {
    let server = CannedServer::start().await;
    two_orgs(&server);
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.csv");

    let config = Config::resolve(args(&server, &scanner, &output, "csv"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();
    let client = GheClient::connect(
        &DirectorySettings {
            base_url: server.url().to_string(),
            token: "ghp_test".to_string(),
        },
        coordinator.signal(),
    )
    .await
    .unwrap();
    let orchestrator = ScanOrchestrator::new(config.scan.clone(), coordinator.signal()).unwrap();

    let outcome = run_pipeline(
        &config,
        Arc::new(client),
        orchestrator,
        Arc::new(NoopMetrics),
        &coordinator.signal(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.repositories, 2);
    assert_eq!(outcome.summaries, 2);
    assert_eq!(outcome.output, output);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_cancelled_run_writes_partial_output_and_exits_130() {
    let server = CannedServer::start().await;
    two_orgs(&server);
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", "exec sleep 30");
    let output = dir.path().join("report.json");

    let config = Config::resolve(args(&server, &scanner, &output, "json"), None).unwrap();
    let coordinator = ShutdownCoordinator::new();
    let cancel = async {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        coordinator.trigger_shutdown();
    };
    let (code, _) = tokio::join!(run(config, coordinator.signal()), cancel);

    assert_eq!(code, 130);
    let written: Vec<Summary> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written
        .iter()
        .all(|s| s.error() == "error running Lava: scan cancelled"));
}

#[tokio::test]
async fn test_cancelled_discovery_writes_no_output() {
    let server = CannedServer::start().await;
    server.with_user("octocat");
    server.route(
        "/api/v3/orgs/org1/repos?per_page=100",
        vec![Canned::json(format!("[{}]", repo_json("org1", "repo1", 10)))],
    );
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.json");

    let config = Config::resolve(
        Args {
            target_org: Some("org1".to_string()),
            ..args(&server, &scanner, &output, "json")
        },
        None,
    )
    .unwrap();
    let coordinator = ShutdownCoordinator::new();
    let client = GheClient::connect(&config.directory, coordinator.signal())
        .await
        .unwrap();
    let orchestrator = ScanOrchestrator::new(config.scan.clone(), coordinator.signal()).unwrap();
    coordinator.trigger_shutdown();

    let err = run_pipeline(
        &config,
        Arc::new(client),
        orchestrator,
        Arc::new(NoopMetrics),
        &coordinator.signal(),
    )
    .await
    .err()
    .expect("cancelled discovery must not reach output");

    assert!(err.is_cancelled());
    assert_eq!(err.exit_code(), 130);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_enabled_metrics_reach_the_statsd_agent() {
    let server = CannedServer::start().await;
    two_orgs(&server);
    let dir = TempDir::new().unwrap();
    let scanner = fake_scanner(dir.path(), "lava", REPORTING_SCANNER);
    let output = dir.path().join("report.json");
    let agent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    agent
        .set_read_timeout(Some(std::time::Duration::from_secs(5)))
        .unwrap();

    let config = Config::resolve(
        Args {
            metrics_enabled: Some(true),
            metrics_address: Some(agent.local_addr().unwrap().to_string()),
            metrics_tags: vec!["env:test".to_string()],
            ..args(&server, &scanner, &output, "json")
        },
        None,
    )
    .unwrap();
    let coordinator = ShutdownCoordinator::new();
    assert_eq!(run(config, coordinator.signal()).await, 0);

    let mut lines: Vec<String> = Vec::new();
    let mut buf = [0u8; 8192];
    while !lines.iter().any(|line| line.starts_with("_sc|")) {
        let n = agent.recv(&mut buf).expect("metrics datagram");
        lines.extend(
            String::from_utf8_lossy(&buf[..n])
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    assert!(lines
        .iter()
        .any(|l| l.starts_with("reposec.organizations:2") && l.ends_with("|g|#env:test")));
    assert!(lines.iter().any(|l| l.starts_with("reposec.repositories:2")
        && l.ends_with("|g|#status:selected,organization:org1,env:test")));
    assert!(lines.iter().any(|l| l.starts_with("reposec.took:")));
    assert!(lines.contains(&"_sc|reposec.service_check|0|#env:test|m:OK".to_string()));
}
