//! FAsset Common Library
//!
//! Shared types, constants, and utilities for the FAsset diamond
//! deployment tooling.
//!
//! ## Diamonds in one paragraph
//!
//! The FAsset `AssetManager` is an EIP-2535 diamond: a single proxy that
//! routes every call by its 4-byte function selector to one of many
//! implementation contracts ("facets"). Upgrading the diamond means sending
//! a list of cuts (`Add`, `Replace`, `Remove`) that edit this routing table
//! atomically.
//!
//! This crate holds the vocabulary that the planning crate builds on:
//!
//! - **Selectors**: 4-byte identifiers and their derivation from canonical
//!   function signatures (`signature` module)
//! - **Facet addresses**: opaque 20-byte module references
//! - **Cuts and plans**: `FacetCut`, `InitCall`, `CutPlan`
//! - **ABI descriptors**: JSON ABI items a facet exposes (`abi` module)
//! - **Errors**: the full `DiamondError` taxonomy with stable codes
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString},
    vec::Vec,
};
#[cfg(feature = "std")]
pub use std::{
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString},
    vec::Vec,
};

pub mod abi;
pub mod constants;
pub mod errors;
pub mod signature;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use abi::*;
pub use errors::*;
pub use signature::*;
pub use types::*;
pub use validation::{
    check_protected_removals, protected_selectors, validate_cut, validate_plan,
    PROTECTED_SIGNATURES,
};
