//! ABI Descriptors
//!
//! Serde model of the standard JSON ABI, restricted to what selector
//! derivation needs: item kind, name and typed inputs.

use serde::{Deserialize, Serialize};

use crate::errors::{DiamondError, DiamondResult};
use crate::signature::{canonical_type, is_identifier, Keccak256Hasher, SignatureHasher};
use crate::types::Selector;
use crate::{String, ToString, Vec};

/// Kind of an ABI item (`"type"` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiItemKind {
    /// Callable function (the ABI default when `type` is omitted)
    #[default]
    Function,
    Event,
    Error,
    Constructor,
    Fallback,
    Receive,
}

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

/// Typed parameter of an ABI item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParam {
    /// Parameter name (may be empty)
    #[serde(default)]
    pub name: String,
    /// ABI type, e.g. `uint256`, `tuple[]`
    #[serde(rename = "type")]
    pub ty: String,
    /// Tuple components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
    /// Event parameter indexing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl AbiParam {
    /// Creates an unnamed parameter of the given type
    pub fn new(ty: &str) -> Self {
        Self {
            ty: ty.to_string(),
            ..Self::default()
        }
    }

    /// Canonical type, with `tuple` expanded from its components
    pub fn canonical_type(&self) -> DiamondResult<String> {
        match self.ty.strip_prefix("tuple") {
            Some(suffix) => {
                let mut components = Vec::with_capacity(self.components.len());
                for component in &self.components {
                    components.push(component.canonical_type()?);
                }
                let mut out = String::from("(");
                out.push_str(&components.join(","));
                out.push(')');
                out.push_str(suffix);
                // Validates the array suffix
                canonical_type(&out)
            }
            None => canonical_type(&self.ty),
        }
    }
}

/// One entry of a JSON ABI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiItem {
    /// Item kind
    #[serde(rename = "type", default)]
    pub kind: AbiItemKind,
    /// Item name (empty for constructor, fallback and receive)
    #[serde(default)]
    pub name: String,
    /// Input parameters
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// Output parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<AbiParam>,
    /// State mutability (functions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
}

impl AbiItem {
    /// Creates a function item from a name and input types
    pub fn function(name: &str, input_types: &[&str]) -> Self {
        Self {
            kind: AbiItemKind::Function,
            name: name.to_string(),
            inputs: input_types.iter().map(|ty| AbiParam::new(ty)).collect(),
            outputs: Vec::new(),
            state_mutability: Some(StateMutability::Nonpayable),
        }
    }

    /// Creates an event item from a name and input types
    pub fn event(name: &str, input_types: &[&str]) -> Self {
        Self {
            kind: AbiItemKind::Event,
            state_mutability: None,
            ..Self::function(name, input_types)
        }
    }

    /// Returns true for callable functions (the only items that get selectors)
    pub fn is_function(&self) -> bool {
        self.kind == AbiItemKind::Function
    }

    /// Canonical signature `name(type,...)`
    pub fn signature(&self) -> DiamondResult<String> {
        if !is_identifier(&self.name) {
            return Err(DiamondError::MalformedSignature {
                input: self.name.clone(),
                reason: "invalid function name",
            });
        }
        let mut types = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            types.push(input.canonical_type()?);
        }

        let mut out = self.name.clone();
        out.push('(');
        out.push_str(&types.join(","));
        out.push(')');
        Ok(out)
    }

    /// Selector of this item using Keccak-256
    pub fn selector(&self) -> DiamondResult<Selector> {
        self.selector_with(&Keccak256Hasher)
    }

    /// Selector of this item using a custom hasher
    pub fn selector_with<H>(&self, hasher: &H) -> DiamondResult<Selector>
    where
        H: SignatureHasher + ?Sized,
    {
        Ok(hasher.selector_of(&self.signature()?))
    }
}

/// A contract ABI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Abi {
    pub items: Vec<AbiItem>,
}

impl Abi {
    /// Creates an ABI from its items
    pub fn new(items: Vec<AbiItem>) -> Self {
        Self { items }
    }

    /// Parses a JSON ABI array, or a build artifact object carrying an `abi` field
    pub fn from_json(json: &str) -> DiamondResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(invalid_json)?;
        let items = match value {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| DiamondError::InvalidConfig {
                    reason: "artifact has no `abi` field".to_string(),
                })?,
            other => other,
        };
        let items: Vec<AbiItem> = serde_json::from_value(items).map_err(invalid_json)?;
        Ok(Self { items })
    }

    /// Callable functions, in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &AbiItem> {
        self.items.iter().filter(|item| item.is_function())
    }

    /// Functions matching `method`, given either as a bare name (all
    /// overloads match) or as a signature (exact canonical match)
    pub fn find_functions<'a>(&'a self, method: &str) -> DiamondResult<Vec<&'a AbiItem>> {
        let method = method.trim();
        if method.contains('(') {
            let wanted = crate::signature::canonical_signature(method)?;
            let mut found = Vec::new();
            for item in self.functions() {
                if item.signature()? == wanted {
                    found.push(item);
                }
            }
            Ok(found)
        } else {
            Ok(self.functions().filter(|item| item.name == method).collect())
        }
    }
}

fn invalid_json(err: serde_json::Error) -> DiamondError {
    DiamondError::InvalidConfig {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_FRAGMENT: &str = r#"[
        {"type": "constructor", "inputs": [{"name": "name_", "type": "string"}]},
        {"type": "event", "name": "Transfer", "inputs": [
            {"name": "from", "type": "address", "indexed": true},
            {"name": "to", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}
        ], "anonymous": false},
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
         "outputs": [{"name": "", "type": "bool"}]},
        {"type": "function", "name": "balanceOf", "stateMutability": "view",
         "inputs": [{"name": "account", "type": "address"}],
         "outputs": [{"name": "", "type": "uint256"}]},
        {"type": "error", "name": "InsufficientBalance", "inputs": []}
    ]"#;

    #[test]
    fn test_parse_json_abi() {
        let abi = Abi::from_json(ERC20_FRAGMENT).unwrap();
        assert_eq!(abi.items.len(), 5);
        let names: Vec<&str> = abi.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["transfer", "balanceOf"]);
        assert_eq!(abi.items[2].state_mutability, Some(StateMutability::Nonpayable));
    }

    #[test]
    fn test_parse_artifact_object() {
        let artifact = format!(r#"{{"contractName": "Token", "abi": {ERC20_FRAGMENT}}}"#);
        let abi = Abi::from_json(&artifact).unwrap();
        assert_eq!(abi.functions().count(), 2);

        let err = Abi::from_json(r#"{"contractName": "Token"}"#).unwrap_err();
        assert_eq!(err.code(), "E024_INVALID_CONFIG");
        assert!(Abi::from_json("not json").is_err());
    }

    #[test]
    fn test_item_selector_matches_signature_selector() {
        let abi = Abi::from_json(ERC20_FRAGMENT).unwrap();
        let transfer = abi.find_functions("transfer").unwrap()[0];
        assert_eq!(transfer.signature().unwrap(), "transfer(address,uint256)");
        assert_eq!(transfer.selector().unwrap(), "0xa9059cbb".parse().unwrap());
    }

    #[test]
    fn test_tuple_components_are_expanded() {
        let item: AbiItem = serde_json::from_str(
            r#"{"type": "function", "name": "diamondCut", "inputs": [
                {"name": "_cut", "type": "tuple[]", "components": [
                    {"name": "facetAddress", "type": "address"},
                    {"name": "action", "type": "uint8"},
                    {"name": "functionSelectors", "type": "bytes4[]"}
                ]},
                {"name": "_init", "type": "address"},
                {"name": "_calldata", "type": "bytes"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            item.signature().unwrap(),
            crate::constants::signatures::DIAMOND_CUT
        );
    }

    #[test]
    fn test_missing_type_defaults_to_function() {
        let item: AbiItem = serde_json::from_str(r#"{"name": "pause", "inputs": []}"#).unwrap();
        assert!(item.is_function());
        assert_eq!(item.signature().unwrap(), "pause()");
    }

    #[test]
    fn test_find_functions_by_name_and_signature() {
        let abi = Abi::new(vec![
            AbiItem::function("mint", &["address", "uint256"]),
            AbiItem::function("mint", &["uint256"]),
            AbiItem::event("mint", &["uint256"]),
        ]);
        assert_eq!(abi.find_functions("mint").unwrap().len(), 2);
        let exact = abi.find_functions("mint(uint)").unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].inputs.len(), 1);
        assert!(abi.find_functions("burn").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_name_is_malformed() {
        let item = AbiItem::function("", &[]);
        assert_eq!(item.signature().unwrap_err().code(), "E003_MALFORMED_SIGNATURE");
    }
}
