//! Core Types for FAsset Diamond Tooling
//!
//! This module defines the fundamental data structures shared by the
//! selector registry and the cut planner.

use core::fmt;
use core::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{action, address, selector};
use crate::errors::{DiamondError, DiamondResult};
use crate::{String, ToString, Vec};

// ============ Selector ============

/// 4-byte function selector
///
/// Ordered by byte value. Text form is `0x` followed by eight lower-case
/// hex digits; parsing accepts either case.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize, BorshDeserialize,
)]
pub struct Selector(pub [u8; selector::LEN]);

impl Selector {
    /// Creates a selector from raw bytes
    pub const fn new(bytes: [u8; selector::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw selector bytes
    pub fn as_bytes(&self) -> &[u8; selector::LEN] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex encoding
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(2 + selector::HEX_DIGITS);
        out.push_str(selector::HEX_PREFIX);
        out.push_str(&hex::encode(self.0));
        out
    }

    /// Returns true if `input` has the shape of an encoded selector (`0x` + 8 hex digits)
    pub fn looks_encoded(input: &str) -> bool {
        strip_hex_prefix(input.trim()).is_some_and(|digits| {
            digits.len() == selector::HEX_DIGITS && digits.bytes().all(|b| b.is_ascii_hexdigit())
        })
    }
}

impl From<[u8; selector::LEN]> for Selector {
    fn from(bytes: [u8; selector::LEN]) -> Self {
        Self(bytes)
    }
}

impl From<u32> for Selector {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl FromStr for Selector {
    type Err = DiamondError;

    fn from_str(input: &str) -> DiamondResult<Self> {
        let malformed = |reason| DiamondError::MalformedSignature {
            input: input.to_string(),
            reason,
        };

        let digits = strip_hex_prefix(input.trim()).ok_or_else(|| malformed("missing 0x prefix"))?;
        if digits.len() != selector::HEX_DIGITS {
            return Err(malformed("selector must have exactly 8 hex digits"));
        }

        let mut bytes = [0u8; selector::LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| malformed("invalid hex digit"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ============ Facet Address ============

/// Opaque reference to a facet (implementation contract)
///
/// The registry only relies on equality and ordering. The all-zero
/// address is the conventional facet of `Remove` cuts.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, BorshSerialize, BorshDeserialize,
)]
pub struct FacetAddress(pub [u8; address::LEN]);

impl FacetAddress {
    /// The zero address
    pub const ZERO: Self = Self(address::ZERO);

    /// Creates an address from raw bytes
    pub const fn new(bytes: [u8; address::LEN]) -> Self {
        Self(bytes)
    }

    /// Returns true for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == address::ZERO
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; address::LEN] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex encoding
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(2 + address::LEN * 2);
        out.push_str(selector::HEX_PREFIX);
        out.push_str(&hex::encode(self.0));
        out
    }
}

impl From<[u8; address::LEN]> for FacetAddress {
    fn from(bytes: [u8; address::LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for FacetAddress {
    type Err = DiamondError;

    fn from_str(input: &str) -> DiamondResult<Self> {
        let invalid = || DiamondError::InvalidAddress {
            input: input.to_string(),
        };

        let digits = strip_hex_prefix(input.trim()).ok_or_else(invalid)?;
        if digits.len() != address::LEN * 2 {
            return Err(invalid());
        }

        let mut bytes = [0u8; address::LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for FacetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FacetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FacetAddress({self})")
    }
}

impl Serialize for FacetAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FacetAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn strip_hex_prefix(input: &str) -> Option<&str> {
    input
        .strip_prefix(selector::HEX_PREFIX)
        .or_else(|| input.strip_prefix("0X"))
}

// ============ Cut Types ============

/// Kind of a diamond cut operation
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(into = "u8", try_from = "u8")]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum FacetCutAction {
    /// Route new selectors to a facet
    Add = 0,
    /// Re-route existing selectors to a facet
    Replace = 1,
    /// Drop existing selectors
    Remove = 2,
}

impl FacetCutAction {
    /// On-chain enum value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses the on-chain enum value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            action::ADD => Some(Self::Add),
            action::REPLACE => Some(Self::Replace),
            action::REMOVE => Some(Self::Remove),
            _ => None,
        }
    }
}

impl From<FacetCutAction> for u8 {
    fn from(action: FacetCutAction) -> Self {
        action.as_u8()
    }
}

impl TryFrom<u8> for FacetCutAction {
    type Error = DiamondError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| {
            let mut reason = String::from("unknown cut action ");
            reason.push_str(&value.to_string());
            DiamondError::InvalidConfig { reason }
        })
    }
}

impl fmt::Display for FacetCutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Add => "Add",
            Self::Replace => "Replace",
            Self::Remove => "Remove",
        })
    }
}

/// One diamond cut operation (`IDiamond.FacetCut`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCut {
    /// Operation kind
    pub action: FacetCutAction,
    /// Target facet (zero for `Remove`)
    pub facet_address: FacetAddress,
    /// Selectors affected by this operation
    pub function_selectors: Vec<Selector>,
}

impl FacetCut {
    /// Creates an `Add` cut
    pub fn add(facet_address: FacetAddress, function_selectors: Vec<Selector>) -> Self {
        Self {
            action: FacetCutAction::Add,
            facet_address,
            function_selectors,
        }
    }

    /// Creates a `Replace` cut
    pub fn replace(facet_address: FacetAddress, function_selectors: Vec<Selector>) -> Self {
        Self {
            action: FacetCutAction::Replace,
            facet_address,
            function_selectors,
        }
    }

    /// Creates a `Remove` cut (facet is always the zero address)
    pub fn remove(function_selectors: Vec<Selector>) -> Self {
        Self {
            action: FacetCutAction::Remove,
            facet_address: FacetAddress::ZERO,
            function_selectors,
        }
    }
}

/// Optional initialization call executed (via delegatecall) after the cuts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InitCall {
    /// Contract holding the init function
    pub address: FacetAddress,
    /// ABI-encoded call data (selector followed by arguments)
    #[serde(with = "hex_bytes")]
    pub calldata: Vec<u8>,
}

/// Ordered list of cuts plus optional init call, ready for `diamondCut`
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct CutPlan {
    /// Cuts in execution order (adds, then replaces, then removes)
    pub cuts: Vec<FacetCut>,
    /// Initialization call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitCall>,
}

impl CutPlan {
    /// Creates a plan without init call
    pub fn new(cuts: Vec<FacetCut>) -> Self {
        Self { cuts, init: None }
    }

    /// Attaches an init call
    pub fn with_init(mut self, init: InitCall) -> Self {
        self.init = Some(init);
        self
    }

    /// Returns true if executing the plan would change nothing
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty() && self.init.is_none()
    }

    /// Cuts of the given kind
    pub fn cuts_of(&self, action: FacetCutAction) -> impl Iterator<Item = &FacetCut> {
        self.cuts.iter().filter(move |cut| cut.action == action)
    }

    /// Number of selectors touched by cuts of the given kind
    pub fn selector_count(&self, action: FacetCutAction) -> usize {
        self.cuts_of(action).map(|cut| cut.function_selectors.len()).sum()
    }

    /// Human-readable listing of the plan, one cut per line
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(no changes)");
        }
        for (i, cut) in self.cuts.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{:<7} {}:", cut.action, cut.facet_address)?;
            for selector in &cut.function_selectors {
                write!(f, " {selector}")?;
            }
        }
        if let Some(init) = &self.init {
            if !self.cuts.is_empty() {
                f.write_str("\n")?;
            }
            write!(f, "Init    {}: 0x{}", init.address, hex::encode(&init.calldata))?;
        }
        Ok(())
    }
}

/// Serde helper encoding byte vectors as `0x`-prefixed hex strings
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::{String, Vec};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mut text = String::from("0x");
        text.push_str(&hex::encode(bytes));
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        let digits = text.strip_prefix("0x").unwrap_or(text.as_str());
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
