//! Error Types for FAsset Diamond Tooling
//!
//! Nearly every failure here is a configuration or logic defect upstream and
//! repeats on retry. [`DiamondError::is_recoverable`] names the exceptions.

use thiserror::Error;

use crate::types::{FacetAddress, FacetCutAction, Selector};
use crate::String;

/// Result type alias for diamond operations
pub type DiamondResult<T> = Result<T, DiamondError>;

/// Main error enum for selector registry and cut planning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiamondError {
    // ============ Registry Errors ============
    /// Two registries route the same selector to different facets
    #[error("selector {selector} is claimed by facet {existing} and by facet {incoming}")]
    ConflictingSelectorAssignment {
        selector: Selector,
        existing: FacetAddress,
        incoming: FacetAddress,
    },

    /// A facet's filtered method list is empty
    #[error("facet `{facet}` exposes no methods (check the method and interface filters)")]
    EmptyExposedMethodSet { facet: String },

    /// Signature or encoded selector could not be parsed
    #[error("malformed signature `{input}`: {reason}")]
    MalformedSignature { input: String, reason: &'static str },

    /// Live loupe data routes one selector to two facets
    #[error("live diamond reports selector {selector} under facet {first} and facet {second}")]
    DuplicateSelectorInLiveSource {
        selector: Selector,
        first: FacetAddress,
        second: FacetAddress,
    },

    // ============ Cut Errors ============
    /// Cut operation without selectors
    #[error("{action} cut for facet {facet} has no selectors")]
    EmptySelectorsInCutOperation {
        action: FacetCutAction,
        facet: FacetAddress,
    },

    /// Add of a selector that is already routed
    #[error("cannot add selector {selector}: already routed to facet {facet}")]
    SelectorAlreadyExists { selector: Selector, facet: FacetAddress },

    /// Replace or remove of a selector that is not routed
    #[error("selector {selector} is not routed by the diamond")]
    SelectorNotFound { selector: Selector },

    /// Replace of a selector with the facet it already routes to
    #[error("cannot replace selector {selector} with its current facet {facet}")]
    ReplaceWithSameFacet { selector: Selector, facet: FacetAddress },

    /// Add or replace targeting the zero address
    #[error("{action} cut must not target the zero address")]
    ZeroFacetAddress { action: FacetCutAction },

    /// Remove targeting a non-zero address
    #[error("remove cut must target the zero address, got {facet}")]
    RemoveFacetNotZero { facet: FacetAddress },

    /// The same selector appears in more than one cut of a plan
    #[error("selector {selector} appears in more than one cut")]
    DuplicateSelectorInPlan { selector: Selector },

    /// A cut would remove a selector the diamond needs to stay upgradeable
    #[error("refusing to remove protected selector {selector} ({signature})")]
    ProtectedSelectorRemoval {
        selector: Selector,
        signature: &'static str,
    },

    // ============ Source Errors ============
    /// Address text could not be parsed
    #[error("invalid address `{input}`")]
    InvalidAddress { input: String },

    /// Contract artifact not known to the source
    #[error("unknown contract `{name}`")]
    UnknownContract { name: String },

    /// Contract artifact has no deployed address
    #[error("contract `{name}` has no deployed address")]
    MissingDeployment { name: String },

    /// Method not present in the contract's ABI
    #[error("contract `{contract}` has no function `{method}`")]
    UnknownMethod { contract: String, method: String },

    /// Cut configuration or ABI document could not be read
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Live loupe query failed
    #[error("loupe query failed: {reason}")]
    LoupeUnavailable { reason: String },
}

impl DiamondError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConflictingSelectorAssignment { .. } => "E001_CONFLICTING_SELECTOR",
            Self::EmptyExposedMethodSet { .. } => "E002_EMPTY_EXPOSED_METHODS",
            Self::MalformedSignature { .. } => "E003_MALFORMED_SIGNATURE",
            Self::DuplicateSelectorInLiveSource { .. } => "E004_DUPLICATE_LIVE_SELECTOR",
            Self::EmptySelectorsInCutOperation { .. } => "E010_EMPTY_CUT",
            Self::SelectorAlreadyExists { .. } => "E011_SELECTOR_EXISTS",
            Self::SelectorNotFound { .. } => "E012_SELECTOR_NOT_FOUND",
            Self::ReplaceWithSameFacet { .. } => "E013_REPLACE_SAME_FACET",
            Self::ZeroFacetAddress { .. } => "E014_ZERO_FACET",
            Self::RemoveFacetNotZero { .. } => "E015_REMOVE_FACET_NOT_ZERO",
            Self::DuplicateSelectorInPlan { .. } => "E016_DUPLICATE_PLAN_SELECTOR",
            Self::ProtectedSelectorRemoval { .. } => "E017_PROTECTED_SELECTOR",
            Self::InvalidAddress { .. } => "E020_INVALID_ADDRESS",
            Self::UnknownContract { .. } => "E021_UNKNOWN_CONTRACT",
            Self::MissingDeployment { .. } => "E022_MISSING_DEPLOYMENT",
            Self::UnknownMethod { .. } => "E023_UNKNOWN_METHOD",
            Self::InvalidConfig { .. } => "E024_INVALID_CONFIG",
            Self::LoupeUnavailable { .. } => "E030_LOUPE_UNAVAILABLE",
        }
    }

    /// Returns true if the error can go away without editing the cut inputs
    /// (a missing deployment can be deployed, a failed loupe query re-run)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingDeployment { .. } | Self::LoupeUnavailable { .. }
        )
    }
}
