//! Diamond Loupe and Cut Execution
//!
//! The live diamond is an external collaborator. It is reached through two
//! narrow traits:
//!
//! - [`DiamondLoupe`]: read the current routing table (`IDiamondLoupe.facets()`)
//! - [`CutExecutor`]: submit a cut plan (`IDiamondCut.diamondCut`), atomically
//!
//! [`LoupeSnapshot`] implements both in memory. It is what tests and dry
//! runs use, and what a caller gets after dumping a live loupe to JSON.

use serde::{Deserialize, Serialize};

use fasset_common::{
    validate_plan, CutPlan, DiamondError, DiamondResult, FacetAddress, InitCall, Selector,
};

use crate::registry::SelectorRegistry;

/// One group of the loupe's `facets()` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoupeFacet {
    /// Facet the selectors route to
    pub facet_address: FacetAddress,
    /// Selectors routed to the facet
    pub function_selectors: Vec<Selector>,
}

/// Read-only view of a diamond's routing table
pub trait DiamondLoupe {
    /// All `(facet, selectors)` groups currently routed
    fn facets(&self) -> DiamondResult<Vec<LoupeFacet>>;
}

/// Applies cut plans to a diamond
///
/// Implementations must be atomic: either the whole plan (cuts and init
/// call) takes effect, or nothing does.
pub trait CutExecutor {
    /// Executes `plan`
    fn execute(&mut self, plan: &CutPlan) -> DiamondResult<()>;
}

/// In-memory diamond state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoupeSnapshot {
    facets: Vec<LoupeFacet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    init_calls: Vec<InitCall>,
}

impl LoupeSnapshot {
    /// Snapshot routing exactly the given registry
    pub fn new(registry: &SelectorRegistry) -> Self {
        Self::from_facets(registry.to_loupe_facets())
    }

    /// Snapshot from raw loupe groups, as reported by a live diamond
    ///
    /// The groups are stored verbatim; inconsistencies surface when the
    /// snapshot is read into a registry.
    pub fn from_facets(facets: Vec<LoupeFacet>) -> Self {
        Self {
            facets,
            init_calls: Vec::new(),
        }
    }

    /// Parses a JSON dump of the loupe's `facets()` result
    pub fn from_json(json: &str) -> DiamondResult<Self> {
        let facets: Vec<LoupeFacet> =
            serde_json::from_str(json).map_err(|err| DiamondError::InvalidConfig {
                reason: format!("loupe dump: {err}"),
            })?;
        Ok(Self::from_facets(facets))
    }

    /// Current routing as a registry
    pub fn registry(&self) -> DiamondResult<SelectorRegistry> {
        SelectorRegistry::from_loupe_facets(&self.facets)
    }

    /// Init calls executed so far, oldest first
    pub fn init_calls(&self) -> &[InitCall] {
        &self.init_calls
    }
}

impl DiamondLoupe for LoupeSnapshot {
    fn facets(&self) -> DiamondResult<Vec<LoupeFacet>> {
        Ok(self.facets.clone())
    }
}

impl CutExecutor for LoupeSnapshot {
    fn execute(&mut self, plan: &CutPlan) -> DiamondResult<()> {
        validate_plan(plan)?;
        let updated = self.registry()?.apply_cuts(&plan.cuts)?;

        self.facets = updated.to_loupe_facets();
        if let Some(init) = &plan.init {
            self.init_calls.push(init.clone());
        }
        tracing::debug!(
            cuts = plan.cuts.len(),
            selectors = updated.len(),
            "applied cut plan to snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fasset_common::FacetCut;

    fn facet(n: u8) -> FacetAddress {
        FacetAddress::new([n; 20])
    }

    #[test]
    fn test_snapshot_round_trips_registry() {
        let selectors = [Selector::from(1u32), Selector::from(2u32)];
        let registry = SelectorRegistry::from_selectors(facet(1), selectors);
        let snapshot = LoupeSnapshot::new(&registry);
        assert_eq!(SelectorRegistry::from_loupe(&snapshot).unwrap(), registry);
    }

    #[test]
    fn test_inconsistent_live_source_surfaces() {
        let snapshot = LoupeSnapshot::from_facets(vec![
            LoupeFacet {
                facet_address: facet(1),
                function_selectors: vec![Selector::from(7u32)],
            },
            LoupeFacet {
                facet_address: facet(2),
                function_selectors: vec![Selector::from(7u32)],
            },
        ]);
        let err = SelectorRegistry::from_loupe(&snapshot).unwrap_err();
        assert_eq!(err.code(), "E004_DUPLICATE_LIVE_SELECTOR");
    }

    #[test]
    fn test_from_json_dump() {
        let json = format!(
            r#"[{{"facetAddress": "{}", "functionSelectors": ["0x7a0ed627", "0xCDFFACC6"]}}]"#,
            facet(3)
        );
        let snapshot = LoupeSnapshot::from_json(&json).unwrap();
        let registry = snapshot.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&"0xcdffacc6".parse().unwrap()), Some(facet(3)));

        let err = LoupeSnapshot::from_json(r#"[{"facetAddress": "0x12"}]"#).unwrap_err();
        assert_eq!(err.code(), "E024_INVALID_CONFIG");
    }

    #[test]
    fn test_execute_is_atomic() {
        let registry = SelectorRegistry::from_selectors(facet(1), [Selector::from(1u32)]);
        let mut snapshot = LoupeSnapshot::new(&registry);

        // Second cut fails (selector 9 is not routed), so the first must not stick
        let plan = CutPlan::new(vec![
            FacetCut::add(facet(2), vec![Selector::from(2u32)]),
            FacetCut::remove(vec![Selector::from(9u32)]),
        ]);
        let err = snapshot.execute(&plan).unwrap_err();
        assert_eq!(err, DiamondError::SelectorNotFound { selector: Selector::from(9u32) });
        assert_eq!(snapshot.registry().unwrap(), registry);
    }

    #[test]
    fn test_execute_records_init_call() {
        let mut snapshot = LoupeSnapshot::default();
        let init = InitCall {
            address: facet(5),
            calldata: vec![1, 2, 3, 4],
        };
        let plan = CutPlan::new(vec![FacetCut::add(facet(1), vec![Selector::from(1u32)])])
            .with_init(init.clone());
        snapshot.execute(&plan).unwrap();
        assert_eq!(snapshot.init_calls(), &[init]);
        assert!(snapshot.registry().unwrap().has(&Selector::from(1u32)));
    }
}
