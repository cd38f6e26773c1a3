//! Validation Helpers for Diamond Cuts
//!
//! Checks that mirror what the on-chain `diamondCut` implementation
//! rejects, so that a plan can be verified before it is sent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fasset_common::validation::{check, validate_plan};
//!
//! check!(!cut.function_selectors.is_empty(), DiamondError::EmptySelectorsInCutOperation { .. });
//!
//! validate_plan(&plan)?;
//! ```

use crate::constants::signatures;
use crate::errors::{DiamondError, DiamondResult};
use crate::signature::to_selector;
use crate::types::{CutPlan, FacetCut, FacetCutAction, Selector};
use crate::{BTreeSet, Vec};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// ```rust,ignore
/// check!(!facet.is_zero(), DiamondError::ZeroFacetAddress { action });
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Cut Validation ============

/// Validates the shape of one cut.
///
/// - selector list must be non-empty
/// - `Add` / `Replace` must target a non-zero facet
/// - `Remove` must target the zero address
/// - a selector may appear only once
pub fn validate_cut(cut: &FacetCut) -> DiamondResult<()> {
    check!(
        !cut.function_selectors.is_empty(),
        DiamondError::EmptySelectorsInCutOperation {
            action: cut.action,
            facet: cut.facet_address,
        }
    );

    match cut.action {
        FacetCutAction::Add | FacetCutAction::Replace => {
            check!(
                !cut.facet_address.is_zero(),
                DiamondError::ZeroFacetAddress { action: cut.action }
            );
        }
        FacetCutAction::Remove => {
            check!(
                cut.facet_address.is_zero(),
                DiamondError::RemoveFacetNotZero {
                    facet: cut.facet_address
                }
            );
        }
    }

    let mut seen = BTreeSet::new();
    for selector in &cut.function_selectors {
        check!(
            seen.insert(*selector),
            DiamondError::DuplicateSelectorInPlan { selector: *selector }
        );
    }

    Ok(())
}

/// Validates every cut of a plan and that no selector is touched twice.
pub fn validate_plan(plan: &CutPlan) -> DiamondResult<()> {
    let mut seen = BTreeSet::new();
    for cut in &plan.cuts {
        validate_cut(cut)?;
        for selector in &cut.function_selectors {
            check!(
                seen.insert(*selector),
                DiamondError::DuplicateSelectorInPlan { selector: *selector }
            );
        }
    }
    Ok(())
}

// ============ Protected Selectors ============

/// Signatures whose removal would leave the diamond unable to be
/// inspected or cut again
pub const PROTECTED_SIGNATURES: [&str; 5] = [
    signatures::DIAMOND_CUT,
    signatures::LOUPE_FACETS,
    signatures::LOUPE_FACET_FUNCTION_SELECTORS,
    signatures::LOUPE_FACET_ADDRESSES,
    signatures::LOUPE_FACET_ADDRESS,
];

/// Protected selectors paired with their signatures
pub fn protected_selectors() -> Vec<(Selector, &'static str)> {
    PROTECTED_SIGNATURES
        .iter()
        .filter_map(|signature| to_selector(signature).ok().map(|selector| (selector, *signature)))
        .collect()
}

/// Rejects plans whose `Remove` cuts touch a protected selector.
pub fn check_protected_removals(plan: &CutPlan) -> DiamondResult<()> {
    let protected = protected_selectors();
    for cut in plan.cuts_of(FacetCutAction::Remove) {
        for selector in &cut.function_selectors {
            if let Some((_, signature)) = protected.iter().find(|(p, _)| p == selector) {
                return Err(DiamondError::ProtectedSelectorRemoval {
                    selector: *selector,
                    signature: *signature,
                });
            }
        }
    }
    Ok(())
}
