//! Network selection.
//!
//! Resolves an existing virtual network through a [`NetworkLookup`] and
//! narrows its subnets to an approved set of availability zones. The
//! allow-list is a superset filter: zones it names that the network does not
//! have are ignored, but a filter that leaves nothing behind is rejected at
//! declaration time.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Resource, ResourceKind};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};

/// Logical id of the account/region default network
pub const DEFAULT_NETWORK_ID: &str = "DefaultVPC";
/// Logical id of a network selected by explicit identifier
pub const IMPORTED_NETWORK_ID: &str = "ImportedVPC";

const ENTITY: &str = "NetworkSelector";

/// A subnet of an existing network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet identifier
    pub id: String,
    /// Availability zone the subnet lives in
    pub availability_zone: String,
}

impl Subnet {
    pub fn new(id: impl Into<String>, availability_zone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            availability_zone: availability_zone.into(),
        }
    }
}

/// An existing virtual network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network identifier
    pub id: String,
    /// Whether this is the account/region default network
    #[serde(default)]
    pub is_default: bool,
    /// Region the network lives in
    #[serde(default)]
    pub region: Option<String>,
    /// Subnets, in lookup order
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

impl Network {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_default: false,
            region: None,
            subnets: Vec::new(),
        }
    }

    /// Mark as the default network
    pub fn default_network(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Set the region
    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add a subnet
    pub fn with_subnet(mut self, id: impl Into<String>, zone: impl Into<String>) -> Self {
        self.subnets.push(Subnet::new(id, zone));
        self
    }
}

/// How the network is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkSelection {
    /// The account/region default network
    Default,
    /// A network with this identifier
    Id(String),
}

impl NetworkSelection {
    /// Logical id the network gets in the resource graph
    pub fn logical_id(&self) -> &'static str {
        match self {
            NetworkSelection::Default => DEFAULT_NETWORK_ID,
            NetworkSelection::Id(_) => IMPORTED_NETWORK_ID,
        }
    }
}

impl std::fmt::Display for NetworkSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkSelection::Default => write!(f, "default network"),
            NetworkSelection::Id(id) => write!(f, "network {}", id),
        }
    }
}

/// Ordered, de-duplicated set of approved availability zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ZoneAllowList {
    zones: Vec<String>,
}

impl ZoneAllowList {
    /// Create an allow-list; an empty list can never select a subnet
    pub fn new<I, S>(zones: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for zone in zones {
            let zone: String = zone.into();
            let zone = zone.trim().to_string();
            if zone.is_empty() {
                return Err(Error::configuration(
                    ENTITY,
                    "zone allow-list contains an empty zone identifier",
                ));
            }
            if seen.insert(zone.clone()) {
                ordered.push(zone);
            }
        }

        if ordered.is_empty() {
            return Err(Error::configuration(ENTITY, "zone allow-list is empty"));
        }

        Ok(Self { zones: ordered })
    }

    /// Whether a zone is approved
    pub fn contains(&self, zone: &str) -> bool {
        self.zones.iter().any(|z| z == zone)
    }

    /// Approved zones, in declaration order
    pub fn zones(&self) -> &[String] {
        &self.zones
    }
}

impl TryFrom<Vec<String>> for ZoneAllowList {
    type Error = Error;

    fn try_from(zones: Vec<String>) -> Result<Self> {
        Self::new(zones)
    }
}

impl From<ZoneAllowList> for Vec<String> {
    fn from(list: ZoneAllowList) -> Self {
        list.zones
    }
}

/// Resolved network plus the subnets the cluster may be placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSelection {
    /// Logical id of the network in the resource graph
    pub logical_id: String,
    /// The resolved network
    pub network: Network,
    /// Subnets the cluster may use, in network order
    pub subnets: Vec<Subnet>,
    /// Subnets removed by the zone filter
    pub excluded: Vec<Subnet>,
    /// Whether a zone filter was applied
    pub filtered: bool,
}

impl SubnetSelection {
    /// Selected subnet identifiers
    pub fn subnet_ids(&self) -> Vec<String> {
        self.subnets.iter().map(|s| s.id.clone()).collect()
    }

    /// Availability zones covered by the selection
    pub fn zones(&self) -> Vec<String> {
        let mut zones: Vec<String> = Vec::new();
        for subnet in &self.subnets {
            if !zones.contains(&subnet.availability_zone) {
                zones.push(subnet.availability_zone.clone());
            }
        }
        zones
    }

    /// Graph node for the imported network
    pub fn to_resource(&self) -> Resource {
        Resource::new(&self.logical_id, ResourceKind::Network)
            .with_properties(serde_json::json!({
                "VpcId": self.network.id,
                "IsDefault": self.network.is_default,
            }))
            .imported()
    }
}

/// Filter a network's subnets by an optional zone allow-list.
pub fn select_subnets(
    network: &Network,
    selection: &NetworkSelection,
    zones: Option<&ZoneAllowList>,
) -> Result<SubnetSelection> {
    let (subnets, excluded): (Vec<Subnet>, Vec<Subnet>) = match zones {
        Some(allow) => network
            .subnets
            .iter()
            .cloned()
            .partition(|s| allow.contains(&s.availability_zone)),
        None => (network.subnets.clone(), Vec::new()),
    };

    if let Some(allow) = zones {
        if subnets.is_empty() {
            let present: Vec<&str> = network
                .subnets
                .iter()
                .map(|s| s.availability_zone.as_str())
                .collect();
            return Err(Error::configuration(
                ENTITY,
                format!(
                    "no subnets remain after zone filtering: {} has subnets in [{}], allow-list is [{}]",
                    network.id,
                    present.join(", "),
                    allow.zones().join(", ")
                ),
            ));
        }

        for subnet in &excluded {
            debug!(
                subnet = %subnet.id,
                zone = %subnet.availability_zone,
                "Excluding subnet outside the zone allow-list"
            );
        }
    }

    Ok(SubnetSelection {
        logical_id: selection.logical_id().to_string(),
        network: network.clone(),
        subnets,
        excluded,
        filtered: zones.is_some(),
    })
}

/// Source of existing networks.
///
/// Implementations must fail with [`Error::Resolution`] when the selection
/// matches no network or more than one.
#[async_trait]
pub trait NetworkLookup: Send + Sync {
    /// Resolve a selection to a network
    async fn lookup(
        &self,
        selection: &NetworkSelection,
        context: &ExecutionContext,
    ) -> Result<Network>;
}

/// Look up the network and apply the zone filter.
pub async fn resolve_network(
    lookup: &dyn NetworkLookup,
    selection: &NetworkSelection,
    zones: Option<&ZoneAllowList>,
    context: &ExecutionContext,
) -> Result<SubnetSelection> {
    let network = lookup.lookup(selection, context).await?;

    if network.subnets.is_empty() {
        return Err(Error::resolution(
            selection.logical_id(),
            format!("{} has no subnets", network.id),
        ));
    }

    let result = select_subnets(&network, selection, zones)?;
    info!(
        network = %network.id,
        selected = result.subnets.len(),
        excluded = result.excluded.len(),
        "Resolved {}",
        selection
    );
    Ok(result)
}

/// Networks described up front, from code or a fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticNetworkLookup {
    /// Known networks
    #[serde(default)]
    pub networks: Vec<Network>,
}

impl StaticNetworkLookup {
    pub fn new(networks: Vec<Network>) -> Self {
        Self { networks }
    }

    /// Load networks from a YAML or JSON fixture
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let lookup = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(lookup)
    }

    fn in_region<'a>(&'a self, context: &'a ExecutionContext) -> impl Iterator<Item = &'a Network> {
        self.networks.iter().filter(move |n| match (&n.region, &context.region) {
            (Some(network_region), Some(region)) => network_region == region,
            _ => true,
        })
    }
}

#[async_trait]
impl NetworkLookup for StaticNetworkLookup {
    async fn lookup(
        &self,
        selection: &NetworkSelection,
        context: &ExecutionContext,
    ) -> Result<Network> {
        let candidates: Vec<&Network> = match selection {
            NetworkSelection::Default => self.in_region(context).filter(|n| n.is_default).collect(),
            NetworkSelection::Id(id) => self.in_region(context).filter(|n| &n.id == id).collect(),
        };

        match candidates.as_slice() {
            [network] => Ok((*network).clone()),
            [] => Err(Error::resolution(
                selection.logical_id(),
                format!("no {} found", selection),
            )),
            many => Err(Error::resolution(
                selection.logical_id(),
                format!(
                    "{} is ambiguous: matched {}",
                    selection,
                    many.iter().map(|n| n.id.as_str()).collect::<Vec<_>>().join(", ")
                ),
            )),
        }
    }
}
