//! EC2-backed network lookup.
//!
//! Only compiled with the `aws` feature. Credentials and region come from
//! the standard AWS configuration chain; the execution context region wins
//! when it is set.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use tracing::debug;

use super::network::{Network, NetworkLookup, NetworkSelection, Subnet};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};

/// Looks up networks with `DescribeVpcs` / `DescribeSubnets`
#[derive(Debug, Clone, Default)]
pub struct Ec2NetworkLookup {
    region: Option<String>,
}

impl Ec2NetworkLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the region, overriding the execution context
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    async fn create_client(region: Option<&str>) -> Client {
        let config = if let Some(region_str) = region {
            aws_config::defaults(BehaviorVersion::latest())
                .region(aws_sdk_ec2::config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::defaults(BehaviorVersion::latest())
                .load()
                .await
        };

        Client::new(&config)
    }

    async fn find_network(client: &Client, selection: &NetworkSelection) -> Result<Network> {
        let filter = match selection {
            NetworkSelection::Default => Filter::builder().name("isDefault").values("true").build(),
            NetworkSelection::Id(id) => Filter::builder().name("vpc-id").values(id).build(),
        };

        let resp = client
            .describe_vpcs()
            .filters(filter)
            .send()
            .await
            .map_err(|e| {
                Error::resolution(
                    selection.logical_id(),
                    format!("failed to describe VPCs: {}", e),
                )
            })?;

        let vpcs: Vec<(String, bool)> = resp
            .vpcs()
            .iter()
            .filter_map(|vpc| {
                vpc.vpc_id()
                    .map(|id| (id.to_string(), vpc.is_default().unwrap_or(false)))
            })
            .collect();

        match vpcs.as_slice() {
            [(id, is_default)] => {
                let mut network = Network::new(id.clone());
                network.is_default = *is_default;
                Ok(network)
            }
            [] => Err(Error::resolution(
                selection.logical_id(),
                format!("no {} found", selection),
            )),
            many => Err(Error::resolution(
                selection.logical_id(),
                format!(
                    "{} is ambiguous: matched {}",
                    selection,
                    many.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>().join(", ")
                ),
            )),
        }
    }

    async fn find_subnets(client: &Client, network: &Network) -> Result<Vec<Subnet>> {
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = client
                .describe_subnets()
                .filters(Filter::builder().name("vpc-id").values(&network.id).build())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    Error::resolution(&network.id, format!("failed to describe subnets: {}", e))
                })?;

            for subnet in resp.subnets() {
                if let (Some(id), Some(zone)) = (subnet.subnet_id(), subnet.availability_zone()) {
                    subnets.push(Subnet::new(id, zone));
                }
            }

            match resp.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        // Stable order across API pages
        subnets.sort_by(|a, b| {
            a.availability_zone
                .cmp(&b.availability_zone)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(subnets)
    }
}

#[async_trait]
impl NetworkLookup for Ec2NetworkLookup {
    async fn lookup(
        &self,
        selection: &NetworkSelection,
        context: &ExecutionContext,
    ) -> Result<Network> {
        let region = self.region.as_deref().or(context.region.as_deref());
        let client = Self::create_client(region).await;

        let mut network = Self::find_network(&client, selection).await?;
        network.region = region.map(String::from);
        network.subnets = Self::find_subnets(&client, &network).await?;

        debug!(
            network = %network.id,
            subnets = network.subnets.len(),
            "Looked up network from EC2"
        );
        Ok(network)
    }
}
