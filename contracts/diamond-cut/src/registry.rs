//! Selector Registry
//!
//! Immutable mapping from function selector to the facet that implements
//! it. Every selector routes to at most one facet; every transform returns
//! a new registry and leaves the receiver untouched.
//!
//! ## Sources
//!
//! - **Method lists**: a facet address plus its ABI functions
//!   (`from_methods`, `from_exposed_methods`)
//! - **Live diamonds**: the loupe's `facets()` groups (`from_loupe`)
//! - **Raw data**: explicit selectors or `(selector, facet)` pairs

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use fasset_common::{
    AbiItem, DiamondError, DiamondResult, FacetAddress, Keccak256Hasher, Selector, SignatureHasher,
};

use crate::loupe::{DiamondLoupe, LoupeFacet};

// ============ Selector Sets ============

/// Anything that can answer "is this selector in the set"
///
/// Used as the argument of [`SelectorRegistry::restrict`] and
/// [`SelectorRegistry::remove`], so both accept registries and plain
/// selector collections.
pub trait SelectorSet {
    /// Returns true if `selector` is a member
    fn contains_selector(&self, selector: &Selector) -> bool;
}

impl SelectorSet for BTreeSet<Selector> {
    fn contains_selector(&self, selector: &Selector) -> bool {
        self.contains(selector)
    }
}

impl SelectorSet for [Selector] {
    fn contains_selector(&self, selector: &Selector) -> bool {
        self.contains(selector)
    }
}

impl SelectorSet for Vec<Selector> {
    fn contains_selector(&self, selector: &Selector) -> bool {
        self.as_slice().contains(selector)
    }
}

impl SelectorSet for SelectorRegistry {
    fn contains_selector(&self, selector: &Selector) -> bool {
        self.has(selector)
    }
}

// ============ Registry ============

/// Mapping from selector to implementing facet
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(transparent)]
pub struct SelectorRegistry {
    entries: BTreeMap<Selector, FacetAddress>,
}

impl SelectorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Construction -----

    /// Routes every given selector to `facet`
    pub fn from_selectors<I>(facet: FacetAddress, selectors: I) -> Self
    where
        I: IntoIterator<Item = Selector>,
    {
        Self {
            entries: selectors.into_iter().map(|selector| (selector, facet)).collect(),
        }
    }

    /// Wraps an already consistent map
    pub(crate) fn from_map(entries: BTreeMap<Selector, FacetAddress>) -> Self {
        Self { entries }
    }

    /// Builds a registry from `(selector, facet)` pairs.
    ///
    /// A selector repeated with the same facet is accepted once; repeated
    /// with a different facet it is a `ConflictingSelectorAssignment`.
    pub fn from_pairs<I>(pairs: I) -> DiamondResult<Self>
    where
        I: IntoIterator<Item = (Selector, FacetAddress)>,
    {
        let mut entries = BTreeMap::new();
        for (selector, facet) in pairs {
            if let Some(existing) = entries.insert(selector, facet) {
                if existing != facet {
                    return Err(DiamondError::ConflictingSelectorAssignment {
                        selector,
                        existing,
                        incoming: facet,
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// Selectors of the callable functions in `methods`, routed to `facet`
    ///
    /// Events, errors, constructors, fallback and receive items are skipped.
    /// `filter` sees each function together with its selector and decides
    /// whether it is exposed.
    pub fn from_methods<'a, I, F>(facet: FacetAddress, methods: I, filter: F) -> DiamondResult<Self>
    where
        I: IntoIterator<Item = &'a AbiItem>,
        F: FnMut(&AbiItem, Selector) -> bool,
    {
        Self::from_methods_with(&Keccak256Hasher, facet, methods, filter)
    }

    /// [`from_methods`](Self::from_methods) with a custom signature hasher
    pub fn from_methods_with<'a, H, I, F>(
        hasher: &H,
        facet: FacetAddress,
        methods: I,
        mut filter: F,
    ) -> DiamondResult<Self>
    where
        H: SignatureHasher + ?Sized,
        I: IntoIterator<Item = &'a AbiItem>,
        F: FnMut(&AbiItem, Selector) -> bool,
    {
        let mut entries = BTreeMap::new();
        for item in methods.into_iter().filter(|item| item.is_function()) {
            let selector = item.selector_with(hasher)?;
            if filter(item, selector) {
                entries.insert(selector, facet);
            }
        }
        Ok(Self { entries })
    }

    /// Like [`from_methods`](Self::from_methods), for contexts where the facet
    /// must expose something.
    ///
    /// # Errors
    ///
    /// `EmptyExposedMethodSet(facet_name)` when no function passes `filter`.
    pub fn from_exposed_methods<'a, I, F>(
        facet_name: &str,
        facet: FacetAddress,
        methods: I,
        filter: F,
    ) -> DiamondResult<Self>
    where
        I: IntoIterator<Item = &'a AbiItem>,
        F: FnMut(&AbiItem, Selector) -> bool,
    {
        Self::from_exposed_methods_with(&Keccak256Hasher, facet_name, facet, methods, filter)
    }

    /// [`from_exposed_methods`](Self::from_exposed_methods) with a custom signature hasher
    pub fn from_exposed_methods_with<'a, H, I, F>(
        hasher: &H,
        facet_name: &str,
        facet: FacetAddress,
        methods: I,
        filter: F,
    ) -> DiamondResult<Self>
    where
        H: SignatureHasher + ?Sized,
        I: IntoIterator<Item = &'a AbiItem>,
        F: FnMut(&AbiItem, Selector) -> bool,
    {
        let registry = Self::from_methods_with(hasher, facet, methods, filter)?;
        if registry.is_empty() {
            return Err(DiamondError::EmptyExposedMethodSet {
                facet: facet_name.to_string(),
            });
        }
        Ok(registry)
    }

    /// Flattens the live routing table reported by a diamond loupe
    ///
    /// # Errors
    ///
    /// `DuplicateSelectorInLiveSource` if the loupe reports one selector
    /// under two different facets; loupe failures are passed through.
    pub fn from_loupe<L: DiamondLoupe + ?Sized>(loupe: &L) -> DiamondResult<Self> {
        Self::from_loupe_facets(&loupe.facets()?)
    }

    /// Flattens already fetched loupe groups
    pub fn from_loupe_facets(facets: &[LoupeFacet]) -> DiamondResult<Self> {
        let mut entries = BTreeMap::new();
        for group in facets {
            for &selector in &group.function_selectors {
                if let Some(first) = entries.insert(selector, group.facet_address) {
                    if first != group.facet_address {
                        return Err(DiamondError::DuplicateSelectorInLiveSource {
                            selector,
                            first,
                            second: group.facet_address,
                        });
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    // ----- Queries -----

    /// Returns true if `selector` is routed
    pub fn has(&self, selector: &Selector) -> bool {
        self.entries.contains_key(selector)
    }

    /// Facet routing `selector`
    pub fn get(&self, selector: &Selector) -> Option<FacetAddress> {
        self.entries.get(selector).copied()
    }

    /// All selectors, ascending by byte value
    pub fn selectors(&self) -> Vec<Selector> {
        self.entries.keys().copied().collect()
    }

    /// Selectors grouped by facet; facets and selectors ascending
    pub fn facets(&self) -> BTreeMap<FacetAddress, Vec<Selector>> {
        let mut groups: BTreeMap<FacetAddress, Vec<Selector>> = BTreeMap::new();
        for (&selector, &facet) in &self.entries {
            groups.entry(facet).or_default().push(selector);
        }
        groups
    }

    /// Groups in loupe shape, for snapshots and display
    pub fn to_loupe_facets(&self) -> Vec<LoupeFacet> {
        self.facets()
            .into_iter()
            .map(|(facet_address, function_selectors)| LoupeFacet {
                facet_address,
                function_selectors,
            })
            .collect()
    }

    /// Number of routed selectors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is routed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(selector, facet)` entries, ascending by selector
    pub fn iter(&self) -> impl Iterator<Item = (Selector, FacetAddress)> + '_ {
        self.entries.iter().map(|(&selector, &facet)| (selector, facet))
    }

    // ----- Transforms -----

    /// Entries satisfying `predicate`
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Selector, &FacetAddress) -> bool,
    {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(selector, facet)| predicate(*selector, *facet))
                .map(|(&selector, &facet)| (selector, facet))
                .collect(),
        }
    }

    /// Entries whose selector is in `other`, keeping this registry's facets
    pub fn restrict<S: SelectorSet + ?Sized>(&self, other: &S) -> Self {
        self.filter(|selector, _| other.contains_selector(selector))
    }

    /// Entries whose selector is not in `other`
    pub fn remove<S: SelectorSet + ?Sized>(&self, other: &S) -> Self {
        self.filter(|selector, _| !other.contains_selector(selector))
    }

    /// Union of both registries
    ///
    /// # Errors
    ///
    /// `ConflictingSelectorAssignment` if a selector routes to different
    /// facets in the two registries. Equal assignments merge silently.
    pub fn merge(&self, other: &SelectorRegistry) -> DiamondResult<Self> {
        let mut entries = self.entries.clone();
        for (&selector, &incoming) in &other.entries {
            match entries.get(&selector) {
                Some(&existing) if existing != incoming => {
                    return Err(DiamondError::ConflictingSelectorAssignment {
                        selector,
                        existing,
                        incoming,
                    });
                }
                Some(_) => {}
                None => {
                    entries.insert(selector, incoming);
                }
            }
        }
        Ok(Self { entries })
    }

    /// Merges a sequence of registries left to right
    pub fn merge_all<'a, I>(registries: I) -> DiamondResult<Self>
    where
        I: IntoIterator<Item = &'a SelectorRegistry>,
    {
        registries
            .into_iter()
            .try_fold(Self::new(), |acc, registry| acc.merge(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fasset_common::{Abi, AbiItem, Sha256Hasher};

    fn facet(n: u8) -> FacetAddress {
        FacetAddress::new([n; 20])
    }

    fn sel(value: u32) -> Selector {
        Selector::from(value)
    }

    fn registry(entries: &[(u32, u8)]) -> SelectorRegistry {
        SelectorRegistry::from_pairs(entries.iter().map(|&(s, f)| (sel(s), facet(f)))).unwrap()
    }

    fn token_abi() -> Abi {
        Abi::new(vec![
            AbiItem::function("transfer", &["address", "uint256"]),
            AbiItem::function("balanceOf", &["address"]),
            AbiItem::event("Transfer", &["address", "address", "uint256"]),
        ])
    }

    #[test]
    fn test_from_methods_skips_non_functions() {
        let abi = token_abi();
        let registry = SelectorRegistry::from_methods(facet(1), &abi.items, |_, _| true).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.has(&sel(0xa905_9cbb)));
        assert!(registry.has(&sel(0x70a0_8231)));
        assert_eq!(registry.get(&sel(0xa905_9cbb)), Some(facet(1)));
    }

    #[test]
    fn test_from_methods_filter_by_name() {
        let abi = token_abi();
        let registry =
            SelectorRegistry::from_methods(facet(1), &abi.items, |item, _| item.name == "balanceOf")
                .unwrap();
        assert_eq!(registry.selectors(), vec![sel(0x70a0_8231)]);
    }

    #[test]
    fn test_from_methods_is_deterministic() {
        let abi = token_abi();
        let a = SelectorRegistry::from_methods(facet(1), &abi.items, |_, _| true).unwrap();
        let b = SelectorRegistry::from_methods(facet(1), &abi.items, |_, _| true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_methods_with_custom_hasher() {
        let abi = token_abi();
        let keccak = SelectorRegistry::from_methods(facet(1), &abi.items, |_, _| true).unwrap();
        let sha =
            SelectorRegistry::from_methods_with(&Sha256Hasher, facet(1), &abi.items, |_, _| true)
                .unwrap();
        assert_eq!(sha.len(), keccak.len());
        assert_ne!(sha.selectors(), keccak.selectors());
    }

    #[test]
    fn test_empty_exposed_method_set() {
        let abi = token_abi();
        let err =
            SelectorRegistry::from_exposed_methods("TokenFacet", facet(1), &abi.items, |item, _| {
                item.name == "tranfser"
            })
            .unwrap_err();
        assert_eq!(
            err,
            DiamondError::EmptyExposedMethodSet {
                facet: "TokenFacet".to_string()
            }
        );

        // The plain constructor accepts an empty result
        let empty =
            SelectorRegistry::from_methods(facet(1), &abi.items, |item, _| item.name == "tranfser")
                .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_from_pairs_detects_conflicts() {
        let ok = SelectorRegistry::from_pairs([(sel(1), facet(1)), (sel(1), facet(1))]).unwrap();
        assert_eq!(ok.len(), 1);

        let err =
            SelectorRegistry::from_pairs([(sel(1), facet(1)), (sel(1), facet(2))]).unwrap_err();
        assert_eq!(
            err,
            DiamondError::ConflictingSelectorAssignment {
                selector: sel(1),
                existing: facet(1),
                incoming: facet(2),
            }
        );
    }

    #[test]
    fn test_from_loupe_facets_detects_duplicates() {
        let groups = vec![
            LoupeFacet {
                facet_address: facet(1),
                function_selectors: vec![sel(1), sel(2)],
            },
            LoupeFacet {
                facet_address: facet(2),
                function_selectors: vec![sel(2)],
            },
        ];
        let err = SelectorRegistry::from_loupe_facets(&groups).unwrap_err();
        assert_eq!(
            err,
            DiamondError::DuplicateSelectorInLiveSource {
                selector: sel(2),
                first: facet(1),
                second: facet(2),
            }
        );
    }

    #[test]
    fn test_selectors_sorted_and_facets_grouped() {
        let r = registry(&[(3, 2), (1, 1), (2, 2)]);
        assert_eq!(r.selectors(), vec![sel(1), sel(2), sel(3)]);

        let groups = r.facets();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&facet(1)], vec![sel(1)]);
        assert_eq!(groups[&facet(2)], vec![sel(2), sel(3)]);
        assert_eq!(r.to_loupe_facets().len(), 2);
    }

    #[test]
    fn test_filter_does_not_mutate_receiver() {
        let r = registry(&[(1, 1), (2, 2)]);
        let only_two = r.filter(|_, f| *f == facet(2));
        assert_eq!(only_two.selectors(), vec![sel(2)]);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_restrict_and_remove_accept_any_selector_set() {
        let r = registry(&[(1, 1), (2, 1), (3, 2)]);
        let other = registry(&[(2, 9), (3, 9), (4, 9)]);

        let restricted = r.restrict(&other);
        assert_eq!(restricted, registry(&[(2, 1), (3, 2)]));
        assert_eq!(r.remove(&other), registry(&[(1, 1)]));

        let slice = [sel(1)];
        assert_eq!(r.restrict(&slice[..]), registry(&[(1, 1)]));
        let set: BTreeSet<Selector> = [sel(3)].into_iter().collect();
        assert_eq!(r.remove(&set), registry(&[(1, 1), (2, 1)]));
        assert_eq!(r.remove(&vec![sel(1), sel(2), sel(3)]), SelectorRegistry::new());
    }

    #[test]
    fn test_merge_same_facet_is_idempotent() {
        let a = registry(&[(1, 1), (2, 1)]);
        let b = registry(&[(2, 1), (3, 2)]);
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged, registry(&[(1, 1), (2, 1), (3, 2)]));
        assert_eq!(a.merge(&a).unwrap(), a);
        assert_eq!(a.merge(&SelectorRegistry::new()).unwrap(), a);
    }

    #[test]
    fn test_merge_conflict_names_both_facets() {
        let a = registry(&[(1, 1)]);
        let b = registry(&[(1, 2)]);
        assert_eq!(
            a.merge(&b),
            Err(DiamondError::ConflictingSelectorAssignment {
                selector: sel(1),
                existing: facet(1),
                incoming: facet(2),
            })
        );
    }

    #[test]
    fn test_merge_all() {
        let parts = [registry(&[(1, 1)]), registry(&[(2, 2)]), registry(&[(3, 3)])];
        let merged = SelectorRegistry::merge_all(&parts).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(SelectorRegistry::merge_all(&[registry(&[(1, 1)]), registry(&[(1, 2)])]).is_err());
    }

    #[test]
    fn test_json_shape() {
        let r = registry(&[(0xaaaa_aaaa, 1)]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, format!(r#"{{"0xaaaaaaaa":"{}"}}"#, facet(1)));
    }
}
