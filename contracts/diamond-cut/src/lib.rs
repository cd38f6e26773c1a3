//! FAsset Diamond Cut Planner
//!
//! Selector registries and cut planning for the FAsset `AssetManager`
//! diamond.
//!
//! ## Flow
//!
//! ```text
//!   loupe ──► current registry ─┐
//!                               ├─► create_cut ──► CutPlan ──► CutExecutor
//!   config + artifacts ──► desired / deleted registries ┘
//! ```
//!
//! - [`registry`]: the selector → facet mapping and its set algebra
//! - [`cut`]: cut computation and in-memory application
//! - [`loupe`]: the live diamond seen through `facets()` / `diamondCut`
//! - [`source`]: contract ABIs and deployed addresses
//! - [`config`]: JSON upgrade descriptions
//! - [`planner`]: all of the above wired together
//!
//! Removal is always explicit: a routed selector that the new
//! configuration does not mention stays routed unless it is listed in
//! `deleteMethods`.

pub mod config;
pub mod cut;
pub mod loupe;
pub mod planner;
pub mod registry;
pub mod source;


pub use config::{DiamondCutConfig, FacetConfig, InitConfig};
pub use cut::{create_cut, create_cut_with, CutOptions};
pub use loupe::{CutExecutor, DiamondLoupe, LoupeFacet, LoupeSnapshot};
pub use planner::DiamondCutPlanner;
pub use registry::{SelectorRegistry, SelectorSet};
pub use source::{ArtifactCatalog, ContractArtifact, ContractSource};

// The planning vocabulary lives in the common crate
pub use fasset_common::{
    CutPlan, DiamondError, DiamondResult, FacetAddress, FacetCut, FacetCutAction, InitCall,
    Selector,
};
