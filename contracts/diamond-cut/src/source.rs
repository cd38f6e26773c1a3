//! Contract Sources
//!
//! Where facet ABIs and deployed addresses come from. In a deployment this
//! is the build artifacts plus the network's deployment record; here it is
//! the [`ContractSource`] trait and the in-memory [`ArtifactCatalog`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fasset_common::{Abi, DiamondError, DiamondResult, FacetAddress};

/// ABI and deployment of one contract or interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArtifact {
    /// Contract or interface name
    pub name: String,
    /// Deployed address; `None` for interfaces and undeployed contracts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<FacetAddress>,
    /// Contract ABI
    pub abi: Abi,
}

impl ContractArtifact {
    /// Deployed contract
    pub fn deployed(name: &str, address: FacetAddress, abi: Abi) -> Self {
        Self {
            name: name.to_string(),
            address: Some(address),
            abi,
        }
    }

    /// Interface (never deployed)
    pub fn interface(name: &str, abi: Abi) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            abi,
        }
    }

    /// Deployed address, or `MissingDeployment`
    pub fn deployed_address(&self) -> DiamondResult<FacetAddress> {
        self.address.ok_or_else(|| DiamondError::MissingDeployment {
            name: self.name.clone(),
        })
    }
}

/// Lookup of contract artifacts by name
pub trait ContractSource {
    /// Artifact named `name`, or `UnknownContract`
    fn contract(&self, name: &str) -> DiamondResult<&ContractArtifact>;
}

/// In-memory artifact collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactCatalog {
    contracts: BTreeMap<String, ContractArtifact>,
}

impl ArtifactCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of artifacts (`[{"name", "address"?, "abi"}]`)
    pub fn from_json(json: &str) -> DiamondResult<Self> {
        let artifacts: Vec<ContractArtifact> =
            serde_json::from_str(json).map_err(|err| DiamondError::InvalidConfig {
                reason: format!("artifact catalog: {err}"),
            })?;
        Ok(artifacts.into_iter().fold(Self::new(), Self::with))
    }

    /// Adds (or replaces) an artifact, builder style
    pub fn with(mut self, artifact: ContractArtifact) -> Self {
        self.insert(artifact);
        self
    }

    /// Adds (or replaces) an artifact
    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.contracts.insert(artifact.name.clone(), artifact);
    }

    /// Number of known artifacts
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if no artifact is known
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl ContractSource for ArtifactCatalog {
    fn contract(&self, name: &str) -> DiamondResult<&ContractArtifact> {
        self.contracts
            .get(name)
            .ok_or_else(|| DiamondError::UnknownContract {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fasset_common::AbiItem;

    #[test]
    fn test_lookup() {
        let address = FacetAddress::new([4u8; 20]);
        let catalog = ArtifactCatalog::new()
            .with(ContractArtifact::deployed(
                "SettingsFacet",
                address,
                Abi::new(vec![AbiItem::function("setLotSize", &["uint64"])]),
            ))
            .with(ContractArtifact::interface("ISettings", Abi::default()));

        assert_eq!(catalog.len(), 2);
        let facet = catalog.contract("SettingsFacet").unwrap();
        assert_eq!(facet.deployed_address().unwrap(), address);

        let iface = catalog.contract("ISettings").unwrap();
        assert_eq!(iface.deployed_address().unwrap_err().code(), "E022_MISSING_DEPLOYMENT");

        assert_eq!(
            catalog.contract("Nope").unwrap_err(),
            DiamondError::UnknownContract { name: "Nope".to_string() }
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"name": "PauseFacet", "address": "0x0000000000000000000000000000000000000abc",
             "abi": [{"type": "function", "name": "pause", "inputs": []}]},
            {"name": "IPause", "abi": [{"type": "function", "name": "pause", "inputs": []}]}
        ]"#;
        let catalog = ArtifactCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contract("PauseFacet").unwrap().address.is_some());
        assert!(catalog.contract("IPause").unwrap().address.is_none());

        assert!(ArtifactCatalog::from_json(r#"[{"name": "X"}]"#).is_err());
    }
}
