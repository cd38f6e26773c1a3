//! Cut Configuration
//!
//! JSON description of an upgrade, in the shape the FAsset deploy scripts
//! use:
//!
//! ```json
//! {
//!   "diamond": "AssetManager_FTestXRP",
//!   "facets": [
//!     { "contract": "MintingFacet", "exposedInterfaces": ["IIAssetManager"] },
//!     { "contract": "SettingsManagementFacet", "methods": ["setLotSizeAmg"] }
//!   ],
//!   "deleteMethods": ["oldMintingFee()", "0x12345678"],
//!   "init": { "contract": "AssetManagerInit", "method": "upgradeInit", "args": "0x" }
//! }
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use fasset_common::{DiamondError, DiamondResult};

/// One upgrade of one diamond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiamondCutConfig {
    /// Name of the diamond being cut (for logs and reports)
    pub diamond: String,
    /// Facets whose methods the diamond should route
    #[serde(default)]
    pub facets: Vec<FacetConfig>,
    /// Methods to remove: signatures or encoded selectors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_methods: Vec<String>,
    /// Initialization call executed after the cuts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitConfig>,
}

/// One facet of a cut configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FacetConfig {
    /// Contract name of the facet
    pub contract: String,
    /// Only expose methods declared in these interfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_interfaces: Option<Vec<String>>,
    /// Only expose these methods (names, signatures or selectors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

impl FacetConfig {
    /// Facet exposing every function of `contract`
    pub fn all(contract: &str) -> Self {
        Self {
            contract: contract.to_string(),
            exposed_interfaces: None,
            methods: None,
        }
    }
}

/// Initialization call of a cut configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitConfig {
    /// Contract holding the init method (must be deployed)
    pub contract: String,
    /// Init method: name or signature
    pub method: String,
    /// ABI-encoded arguments appended after the selector, hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

impl InitConfig {
    /// Decoded argument bytes (empty when absent)
    pub fn args_bytes(&self) -> DiamondResult<Vec<u8>> {
        let Some(args) = &self.args else {
            return Ok(Vec::new());
        };
        let digits = args.trim().strip_prefix("0x").unwrap_or(args.trim());
        hex::decode(digits).map_err(|err| DiamondError::InvalidConfig {
            reason: format!("init args of `{}`: {err}", self.contract),
        })
    }
}

impl DiamondCutConfig {
    /// Parses and validates a JSON cut configuration
    pub fn from_json(json: &str) -> DiamondResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| DiamondError::InvalidConfig {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need contract artifacts
    pub fn validate(&self) -> DiamondResult<()> {
        if self.diamond.trim().is_empty() {
            return Err(invalid("`diamond` must not be empty"));
        }
        if self.facets.is_empty() && self.delete_methods.is_empty() && self.init.is_none() {
            return Err(invalid("configuration changes nothing"));
        }

        let mut seen = BTreeSet::new();
        for facet in &self.facets {
            if facet.contract.trim().is_empty() {
                return Err(invalid("facet `contract` must not be empty"));
            }
            if !seen.insert(facet.contract.as_str()) {
                return Err(invalid(&format!("facet `{}` listed twice", facet.contract)));
            }
        }

        if let Some(init) = &self.init {
            init.args_bytes()?;
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> DiamondError {
    DiamondError::InvalidConfig {
        reason: reason.to_string(),
    }
}
