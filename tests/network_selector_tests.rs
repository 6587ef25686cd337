//! Network selector tests for kubestack

mod common;

use common::*;
use kubestack::context::ExecutionContext;
use kubestack::error::Error;
use kubestack::resources::{
    resolve_network, select_subnets, Network, NetworkLookup, NetworkSelection,
    StaticNetworkLookup, ZoneAllowList,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::Builder;

#[test]
fn test_no_allow_list_keeps_every_subnet() {
    let selection = select_subnets(&default_network(), &NetworkSelection::Default, None).unwrap();
    assert_eq!(
        selection.subnet_ids(),
        vec!["subnet-a", "subnet-b", "subnet-c", "subnet-e"]
    );
    assert!(selection.excluded.is_empty());
    assert!(!selection.filtered);
}

#[test]
fn test_allow_list_is_superset_filter() {
    let allow = zones(&["us-east-1a", "us-east-1b", "us-east-1f"]);
    let selection =
        select_subnets(&default_network(), &NetworkSelection::Default, Some(&allow)).unwrap();

    assert_eq!(selection.subnet_ids(), vec!["subnet-a", "subnet-b"]);
    assert_eq!(selection.zones(), vec!["us-east-1a", "us-east-1b"]);
    assert!(selection.filtered);
}

#[test]
fn test_selection_keeps_lookup_order() {
    let network = Network::new("vpc-1")
        .with_subnet("subnet-2", "us-east-1b")
        .with_subnet("subnet-1", "us-east-1a");
    let allow = zones(&["us-east-1a", "us-east-1b"]);
    let selection =
        select_subnets(&network, &NetworkSelection::Id("vpc-1".into()), Some(&allow)).unwrap();
    assert_eq!(selection.subnet_ids(), vec!["subnet-2", "subnet-1"]);
}

#[test]
fn test_empty_intersection_is_configuration_error() {
    let allow = zones(&["ap-south-1a"]);
    let err =
        select_subnets(&default_network(), &NetworkSelection::Default, Some(&allow)).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.is_declaration_error());
}

#[test]
fn test_empty_allow_list_rejected() {
    assert!(ZoneAllowList::new(Vec::<String>::new()).is_err());
    assert!(ZoneAllowList::new(["  "]).is_err());
}

#[test]
fn test_allow_list_deduplicates() {
    let allow = ZoneAllowList::new(["us-east-1a", "us-east-1a", " us-east-1b "]).unwrap();
    assert_eq!(allow.zones(), ["us-east-1a", "us-east-1b"]);
}

#[test]
fn test_selection_resource_is_imported() {
    let selection = select_subnets(&default_network(), &NetworkSelection::Default, None).unwrap();
    let resource = selection.to_resource();
    assert_eq!(resource.id, "DefaultVPC");
    assert!(resource.imported);
}

#[tokio::test]
async fn test_lookup_by_id() {
    let lookup = fixture_lookup();
    let network = lookup
        .lookup(&NetworkSelection::Id(OTHER_VPC.into()), &ExecutionContext::new())
        .await
        .unwrap();
    assert_eq!(network.id, OTHER_VPC);
}

#[tokio::test]
async fn test_lookup_respects_region() {
    let lookup = fixture_lookup();
    let context = ExecutionContext::new().with_region("eu-west-1");
    let err = lookup
        .lookup(&NetworkSelection::Default, &context)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
}

#[tokio::test]
async fn test_ambiguous_default_network() {
    let lookup = StaticNetworkLookup::new(vec![
        Network::new("vpc-1").default_network(),
        Network::new("vpc-2").default_network(),
    ]);
    let err = lookup
        .lookup(&NetworkSelection::Default, &ExecutionContext::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ambiguous"));
}

#[tokio::test]
async fn test_network_without_subnets_fails_resolution() {
    let lookup = StaticNetworkLookup::new(vec![Network::new("vpc-empty").default_network()]);
    let err = resolve_network(
        &lookup,
        &NetworkSelection::Default,
        None,
        &ExecutionContext::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
}

#[test]
fn test_fixture_file_yaml() {
    let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
    writeln!(
        file,
        r#"networks:
  - id: vpc-0abc
    is_default: true
    region: us-east-1
    subnets:
      - id: subnet-1
        availability_zone: us-east-1a
"#
    )
    .unwrap();

    let lookup = StaticNetworkLookup::from_file(file.path()).unwrap();
    assert_eq!(lookup.networks.len(), 1);
    assert!(lookup.networks[0].is_default);
    assert_eq!(lookup.networks[0].subnets[0].availability_zone, "us-east-1a");

    let network = tokio_test::block_on(
        lookup.lookup(&NetworkSelection::Default, &ExecutionContext::new()),
    )
    .unwrap();
    assert_eq!(network.id, "vpc-0abc");
}

#[test]
fn test_missing_fixture_file() {
    let err = StaticNetworkLookup::from_file("/nonexistent/networks.yml").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}
