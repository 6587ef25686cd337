//! Intra-cluster traffic rule.

use super::cluster::Cluster;
use super::{Resource, ResourceKind};

/// Logical id of the traffic rule
pub const TRAFFIC_POLICY_ID: &str = "ClusterInternalTraffic";

/// Unrestricted traffic among the cluster's own managed interfaces.
///
/// Rendered as a self-referencing ingress rule on the cluster security
/// group, so nothing outside that group is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficPolicy {
    pub logical_id: String,
    pub cluster_id: String,
}

impl TrafficPolicy {
    pub fn for_cluster(cluster: &Cluster) -> Self {
        Self {
            logical_id: TRAFFIC_POLICY_ID.to_string(),
            cluster_id: cluster.logical_id.clone(),
        }
    }

    pub fn to_resource(&self, cluster: &Cluster) -> Resource {
        let group = cluster.security_group();
        Resource::new(&self.logical_id, ResourceKind::TrafficPolicy).with_properties(
            serde_json::json!({
                "Description": "Allow all traffic between cluster-managed interfaces",
                "GroupId": group,
                "SourceSecurityGroupId": group,
                "IpProtocol": "-1",
            }),
        )
    }
}
