//! CLI tests for kubestack
//!
//! This test suite covers:
//! - Argument parsing and help output
//! - Template synthesis against a network fixture
//! - Declaration errors and their exit codes
//! - The diff/deploy lifecycle with the local state engine
//! - Project scaffolding with `init`

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const NETWORKS: &str = r#"networks:
  - id: vpc-0default
    is_default: true
    region: us-east-1
    subnets:
      - id: subnet-a
        availability_zone: us-east-1a
      - id: subnet-b
        availability_zone: us-east-1b
      - id: subnet-c
        availability_zone: us-east-1c
      - id: subnet-e
        availability_zone: us-east-1e
"#;

const STACK: &str = r#"stack_name: InfrastructureStack
cluster:
  name: eks-cluster
  version: "1.30"
network:
  selection: default
  zones: [us-east-1a, us-east-1b, us-east-1c]
registry:
  name: ecr-repo
access:
  - identity: resche
    groups: ["system:masters"]
"#;

/// Workspace with a network fixture and a stack file
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("networks.yml"), NETWORKS).unwrap();
        std::fs::write(dir.path().join("stack.yml"), STACK).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_stack(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("kubestack").unwrap();
        cmd.current_dir(self.path())
            .env_remove("KUBESTACK_CONFIG")
            .env_remove("RUST_LOG")
            .env("KUBESTACK_STATE_DIR", self.path().join("state"))
            .arg("--no-color")
            .arg("--networks")
            .arg(self.path().join("networks.yml"));
        cmd
    }
}

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("kubestack")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("graph"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("kubestack")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kubestack"));
}

#[test]
fn test_missing_subcommand_fails() {
    Command::cargo_bin("kubestack").unwrap().assert().failure();
}

// ============================================================================
// synth
// ============================================================================

#[test]
fn test_synth_prints_template() {
    let ws = Workspace::new();
    let output = ws.cmd().arg("synth").arg("stack.yml").output().unwrap();
    assert!(output.status.success());

    let template: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        template["Resources"]["EKSCluster"]["Properties"]["ResourcesVpcConfig"]["SubnetIds"],
        serde_json::json!(["subnet-a", "subnet-b", "subnet-c"])
    );
    assert!(template["Resources"]["AwsAuth"].is_object());
    assert!(template["Resources"].get("DefaultVPC").is_none());
    assert_eq!(
        template["Outputs"]["ECRRepoUri"]["Description"],
        "ECR Repository URI"
    );
}

#[test]
fn test_synth_verbose_keeps_stdout_json() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["-vv", "synth", "stack.yml"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let template: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(template["Resources"]["EKSCluster"].is_object());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Using network fixture"));
}

#[test]
fn test_invalid_env_version_is_reported() {
    let ws = Workspace::new();
    ws.cmd()
        .env("KUBESTACK_BUNDLED_KUBECTL", "not-a-version")
        .args(["synth", "stack.yml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring KUBESTACK_BUNDLED_KUBECTL"));
}

#[test]
fn test_synth_writes_file() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["synth", "stack.yml", "--out", "template.json"])
        .assert()
        .success();

    let content = std::fs::read_to_string(ws.path().join("template.json")).unwrap();
    assert!(content.contains("\"ECRRepo\""));
}

#[test]
fn test_synth_missing_layer_exit_code() {
    let ws = Workspace::new();
    ws.write_stack(
        "old.yml",
        "cluster: { name: eks-cluster, version: '1.23' }\nregistry: { name: ecr-repo }\n",
    );
    ws.cmd()
        .args(["synth", "old.yml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("compatibility layer"));
}

#[test]
fn test_synth_empty_zone_filter_exit_code() {
    let ws = Workspace::new();
    ws.write_stack(
        "zones.yml",
        "cluster: { name: eks-cluster, version: '1.30' }\nregistry: { name: ecr-repo }\nnetwork: { zones: [eu-west-1a] }\n",
    );
    ws.cmd()
        .args(["synth", "zones.yml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no subnets remain"));
}

#[test]
fn test_synth_unknown_network_exit_code() {
    let ws = Workspace::new();
    ws.write_stack(
        "imported.yml",
        "cluster: { name: eks-cluster, version: '1.30' }\nregistry: { name: ecr-repo }\nnetwork: { selection: { id: vpc-missing } }\n",
    );
    ws.cmd().args(["synth", "imported.yml"]).assert().code(4);
}

#[test]
fn test_synth_invalid_stack_file() {
    let ws = Workspace::new();
    ws.write_stack("broken.yml", "cluster: [not, a, map]\n");
    ws.cmd().args(["synth", "broken.yml"]).assert().code(2);
}

// ============================================================================
// graph and validate
// ============================================================================

#[test]
fn test_graph_dot() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["graph", "stack.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph resources"))
        .stdout(predicate::str::contains("\"EKSCluster\" -> \"AwsAuth\";"));
}

#[test]
fn test_graph_waves_json() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["--output", "json", "graph", "stack.yml"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let order: Vec<&str> = value["order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let position = |id: &str| order.iter().position(|x| *x == id).unwrap();
    assert!(position("DefaultVPC") < position("EKSCluster"));
    assert!(position("EKSCluster") < position("ClusterInternalTraffic"));
}

#[test]
fn test_validate() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["validate", "stack.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stack is valid"))
        .stdout(predicate::str::contains("subnet-c"));
}

// ============================================================================
// diff and deploy
// ============================================================================

#[test]
fn test_deploy_then_diff_is_clean() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["deploy", "stack.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"))
        .stdout(predicate::str::contains("Deployed:"));

    assert!(ws.path().join("state/InfrastructureStack.json").exists());

    ws.cmd()
        .args(["diff", "stack.yml", "--exit-code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 created, 0 updated"));
}

#[test]
fn test_diff_reports_changes() {
    let ws = Workspace::new();
    ws.cmd().args(["deploy", "stack.yml"]).assert().success();

    ws.write_stack("stack.yml", &STACK.replace("\"1.30\"", "\"1.31\""));
    ws.cmd()
        .args(["diff", "stack.yml", "--exit-code"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("updated"))
        .stdout(predicate::str::contains("1.31"));
}

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_scaffolds_usable_project() {
    let dir = tempdir().unwrap();
    let project = dir.path().join("infra");

    Command::cargo_bin("kubestack")
        .unwrap()
        .args(["--no-color", "init"])
        .arg(&project)
        .assert()
        .success();

    assert!(project.join("stack.yml").exists());
    assert!(project.join("networks.yml").exists());

    Command::cargo_bin("kubestack")
        .unwrap()
        .env_remove("KUBESTACK_CONFIG")
        .arg("--networks")
        .arg(project.join("networks.yml"))
        .arg("synth")
        .arg(project.join("stack.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("EKSCluster"));
}

#[test]
fn test_init_keeps_existing_files() {
    let ws = Workspace::new();
    Command::cargo_bin("kubestack")
        .unwrap()
        .args(["--no-color", "init"])
        .arg(ws.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));

    let content = std::fs::read_to_string(ws.path().join("stack.yml")).unwrap();
    assert_eq!(content, STACK);
}
