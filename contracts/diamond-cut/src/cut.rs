//! Cut Computation
//!
//! Computes the cuts that move a diamond from its current routing table to
//! a desired one, and applies cuts to a registry in memory.
//!
//! ## Algorithm
//!
//! 1. **Add**: selectors in `desired` but not in `current`
//! 2. **Replace**: selectors in both, routed to `desired`'s facet
//! 3. **Remove**: selectors in `deleted` that `desired` does not route
//!
//! Each set is grouped by facet and emitted as one cut per facet, adds
//! first, then replaces, then removes. Selectors that are routed now but
//! are neither desired nor deleted stay where they are: removal is always
//! explicit.

use std::collections::BTreeMap;

use fasset_common::{
    check, validate_cut, DiamondError, DiamondResult, FacetAddress, FacetCut, FacetCutAction,
    Selector,
};

use crate::registry::SelectorRegistry;

/// Tuning knobs for [`create_cut_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutOptions {
    /// Drop replace entries whose facet does not change.
    ///
    /// Off by default: no-op replaces are harmless to compute, but the
    /// on-chain `diamondCut` rejects them, so executors need this on.
    pub skip_unchanged_replaces: bool,
}

/// Cuts transforming `current` into `desired`, removing only `deleted` selectors
pub fn create_cut(
    current: &SelectorRegistry,
    desired: &SelectorRegistry,
    deleted: Option<&SelectorRegistry>,
) -> Vec<FacetCut> {
    create_cut_with(current, desired, deleted, CutOptions::default())
}

/// [`create_cut`] with explicit options
pub fn create_cut_with(
    current: &SelectorRegistry,
    desired: &SelectorRegistry,
    deleted: Option<&SelectorRegistry>,
    options: CutOptions,
) -> Vec<FacetCut> {
    let to_add = desired.remove(current);

    let mut to_replace = desired.restrict(current);
    if options.skip_unchanged_replaces {
        to_replace = to_replace.filter(|selector, facet| current.get(selector) != Some(*facet));
    }

    let to_remove = deleted
        .map(|deleted| deleted.remove(desired))
        .unwrap_or_default();

    let mut cuts = Vec::new();
    for (facet, selectors) in to_add.facets() {
        if !selectors.is_empty() {
            cuts.push(FacetCut::add(facet, selectors));
        }
    }
    for (facet, selectors) in to_replace.facets() {
        if !selectors.is_empty() {
            cuts.push(FacetCut::replace(facet, selectors));
        }
    }
    // Grouped by the facet they came from; the cut itself targets zero
    for (_, selectors) in to_remove.facets() {
        if !selectors.is_empty() {
            cuts.push(FacetCut::remove(selectors));
        }
    }
    cuts
}

impl SelectorRegistry {
    /// Registry after executing `cuts` with on-chain `diamondCut` rules
    ///
    /// # Errors
    ///
    /// - `EmptySelectorsInCutOperation`, `ZeroFacetAddress`,
    ///   `RemoveFacetNotZero`: malformed cut
    /// - `SelectorAlreadyExists`: add of a routed selector
    /// - `SelectorNotFound`: replace or remove of an unrouted selector
    /// - `ReplaceWithSameFacet`: replace that changes nothing
    ///
    /// The receiver is never modified; on error no partial result escapes.
    pub fn apply_cuts(&self, cuts: &[FacetCut]) -> DiamondResult<SelectorRegistry> {
        self.apply_cuts_inner(cuts, false)
    }

    /// Registry after executing `cuts` with relaxed rules: a replace onto the
    /// facet a selector already routes to (at that point of the sequence) is
    /// skipped instead of rejected, matching the plans [`create_cut`] emits
    /// by default
    pub fn apply_cuts_lenient(&self, cuts: &[FacetCut]) -> DiamondResult<SelectorRegistry> {
        self.apply_cuts_inner(cuts, true)
    }

    fn apply_cuts_inner(
        &self,
        cuts: &[FacetCut],
        lenient: bool,
    ) -> DiamondResult<SelectorRegistry> {
        let mut routes: BTreeMap<Selector, FacetAddress> = self.iter().collect();

        for cut in cuts {
            validate_cut(cut)?;
            for &selector in &cut.function_selectors {
                match cut.action {
                    FacetCutAction::Add => {
                        if let Some(&facet) = routes.get(&selector) {
                            return Err(DiamondError::SelectorAlreadyExists { selector, facet });
                        }
                        routes.insert(selector, cut.facet_address);
                    }
                    FacetCutAction::Replace => match routes.get(&selector) {
                        None => return Err(DiamondError::SelectorNotFound { selector }),
                        Some(&facet) if facet == cut.facet_address => {
                            check!(
                                lenient,
                                DiamondError::ReplaceWithSameFacet { selector, facet }
                            );
                        }
                        Some(_) => {
                            routes.insert(selector, cut.facet_address);
                        }
                    },
                    FacetCutAction::Remove => {
                        if routes.remove(&selector).is_none() {
                            return Err(DiamondError::SelectorNotFound { selector });
                        }
                    }
                }
            }
        }

        Ok(SelectorRegistry::from_map(routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facet(n: u8) -> FacetAddress {
        FacetAddress::new([n; 20])
    }

    fn sel(value: u32) -> Selector {
        Selector::from(value)
    }

    fn registry(entries: &[(u32, u8)]) -> SelectorRegistry {
        SelectorRegistry::from_pairs(entries.iter().map(|&(s, f)| (sel(s), facet(f)))).unwrap()
    }

    #[test]
    fn test_scenario_drops_absent_selector_silently() {
        let current = registry(&[(0xaaaa_aaaa, 1), (0xbbbb_bbbb, 1)]);
        let desired = registry(&[(0xaaaa_aaaa, 2), (0xcccc_cccc, 1)]);

        let cuts = create_cut(&current, &desired, None);
        assert_eq!(
            cuts,
            vec![
                FacetCut::add(facet(1), vec![sel(0xcccc_cccc)]),
                FacetCut::replace(facet(2), vec![sel(0xaaaa_aaaa)]),
            ]
        );
    }

    #[test]
    fn test_explicit_deletions_become_removes() {
        let current = registry(&[(1, 1), (2, 1), (3, 1)]);
        let desired = registry(&[(1, 1)]);
        // 1 is both deleted and desired: desired wins
        let deleted = registry(&[(1, 1), (2, 1)]);

        let cuts = create_cut(&current, &desired, Some(&deleted));
        assert_eq!(
            cuts,
            vec![
                FacetCut::replace(facet(1), vec![sel(1)]),
                FacetCut::remove(vec![sel(2)]),
            ]
        );
    }

    #[test]
    fn test_removes_grouped_by_source_facet() {
        let current = registry(&[(1, 1), (2, 2)]);
        let deleted = registry(&[(1, 1), (2, 2)]);
        let cuts = create_cut(&current, &SelectorRegistry::new(), Some(&deleted));
        assert_eq!(
            cuts,
            vec![FacetCut::remove(vec![sel(1)]), FacetCut::remove(vec![sel(2)])]
        );
        assert!(cuts.iter().all(|cut| cut.facet_address.is_zero()));
    }

    #[test]
    fn test_order_adds_then_replaces_then_removes() {
        let current = registry(&[(1, 1), (2, 1)]);
        let desired = registry(&[(1, 3), (5, 2), (6, 1)]);
        let deleted = registry(&[(2, 1)]);

        let actions: Vec<_> = create_cut(&current, &desired, Some(&deleted))
            .iter()
            .map(|cut| cut.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                FacetCutAction::Add,
                FacetCutAction::Add,
                FacetCutAction::Replace,
                FacetCutAction::Remove,
            ]
        );
    }

    #[test]
    fn test_self_cut_only_replaces() {
        let r = registry(&[(1, 1), (2, 2)]);
        let cuts = create_cut(&r, &r, None);
        assert!(cuts.iter().all(|cut| cut.action == FacetCutAction::Replace));
        assert_eq!(cuts.len(), 2);

        let skipped = create_cut_with(&r, &r, None, CutOptions { skip_unchanged_replaces: true });
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_empty_inputs_emit_nothing() {
        let empty = SelectorRegistry::new();
        assert!(create_cut(&empty, &empty, None).is_empty());
        assert!(create_cut(&empty, &empty, Some(&empty)).is_empty());
    }

    #[test]
    fn test_apply_round_trip() {
        let current = registry(&[(1, 1), (2, 1), (3, 2)]);
        let desired = registry(&[(1, 2), (2, 1), (4, 3)]);
        let deleted = registry(&[(3, 2)]);

        let strict = create_cut_with(
            &current,
            &desired,
            Some(&deleted),
            CutOptions { skip_unchanged_replaces: true },
        );
        assert_eq!(current.apply_cuts(&strict).unwrap(), desired);

        let lenient = create_cut(&current, &desired, Some(&deleted));
        assert_eq!(current.apply_cuts_lenient(&lenient).unwrap(), desired);
    }

    #[test]
    fn test_lenient_apply_follows_running_state() {
        let r = registry(&[(1, 1)]);
        // Away and back again: the second replace is only a no-op against the start state
        let cuts = [
            FacetCut::replace(facet(2), vec![sel(1)]),
            FacetCut::replace(facet(1), vec![sel(1)]),
        ];
        assert_eq!(r.apply_cuts_lenient(&cuts).unwrap(), registry(&[(1, 1)]));
        assert_eq!(r.apply_cuts(&cuts).unwrap(), registry(&[(1, 1)]));

        // A replace that is a no-op at its position is skipped, not rejected
        let cuts = [
            FacetCut::replace(facet(2), vec![sel(1)]),
            FacetCut::replace(facet(2), vec![sel(1)]),
        ];
        assert_eq!(r.apply_cuts_lenient(&cuts).unwrap(), registry(&[(1, 2)]));
        assert_eq!(
            r.apply_cuts(&cuts),
            Err(DiamondError::ReplaceWithSameFacet { selector: sel(1), facet: facet(2) })
        );
    }

    #[test]
    fn test_apply_enforces_diamond_rules() {
        let r = registry(&[(1, 1)]);

        assert_eq!(
            r.apply_cuts(&[FacetCut::add(facet(2), vec![sel(1)])]),
            Err(DiamondError::SelectorAlreadyExists { selector: sel(1), facet: facet(1) })
        );
        assert_eq!(
            r.apply_cuts(&[FacetCut::replace(facet(2), vec![sel(9)])]),
            Err(DiamondError::SelectorNotFound { selector: sel(9) })
        );
        assert_eq!(
            r.apply_cuts(&[FacetCut::replace(facet(1), vec![sel(1)])]),
            Err(DiamondError::ReplaceWithSameFacet { selector: sel(1), facet: facet(1) })
        );
        assert_eq!(
            r.apply_cuts(&[FacetCut::remove(vec![sel(9)])]),
            Err(DiamondError::SelectorNotFound { selector: sel(9) })
        );
        assert_eq!(
            r.apply_cuts(&[FacetCut::add(facet(2), vec![])]),
            Err(DiamondError::EmptySelectorsInCutOperation {
                action: FacetCutAction::Add,
                facet: facet(2),
            })
        );
        // Receiver unchanged after failures
        assert_eq!(r, registry(&[(1, 1)]));
    }
}
