//! Cut Planner
//!
//! Turns a [`DiamondCutConfig`] into a [`CutPlan`] for one live diamond:
//!
//! 1. read the current routing table through the loupe
//! 2. build each facet's exposed registry from its artifact, restricted by
//!    `exposedInterfaces` and `methods`, and merge them (conflicts abort)
//! 3. resolve `deleteMethods` into the deleted registry
//! 4. compute the cuts and attach the init call
//!
//! The planner never talks to a chain itself; submitting the plan is the
//! job of a [`CutExecutor`](crate::loupe::CutExecutor).

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use fasset_common::{
    check_protected_removals, to_selector_with, validate_plan, CutPlan, DiamondError,
    DiamondResult, FacetAddress, FacetCutAction, InitCall, Keccak256Hasher, Selector,
    SignatureHasher,
};

use crate::config::{DiamondCutConfig, FacetConfig, InitConfig};
use crate::cut::{create_cut_with, CutOptions};
use crate::loupe::DiamondLoupe;
use crate::registry::SelectorRegistry;
use crate::source::{ContractArtifact, ContractSource};

/// Plans diamond cuts from configuration and contract artifacts
pub struct DiamondCutPlanner<'a, S, H = Keccak256Hasher>
where
    S: ContractSource + ?Sized,
    H: SignatureHasher,
{
    source: &'a S,
    hasher: H,
    options: CutOptions,
}

impl<'a, S: ContractSource + ?Sized> DiamondCutPlanner<'a, S> {
    /// Planner using Keccak-256 selectors
    ///
    /// Unchanged replaces are skipped, since `diamondCut` rejects them.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            hasher: Keccak256Hasher,
            options: CutOptions {
                skip_unchanged_replaces: true,
            },
        }
    }
}

impl<'a, S: ContractSource + ?Sized, H: SignatureHasher> DiamondCutPlanner<'a, S, H> {
    /// Same planner with another signature hasher
    pub fn with_hasher<H2: SignatureHasher>(self, hasher: H2) -> DiamondCutPlanner<'a, S, H2> {
        DiamondCutPlanner {
            source: self.source,
            hasher,
            options: self.options,
        }
    }

    /// Same planner with other cut options
    ///
    /// With `skip_unchanged_replaces` off, plans keep no-op replaces and
    /// only a lenient executor can run them.
    pub fn with_options(mut self, options: CutOptions) -> Self {
        self.options = options;
        self
    }

    /// Selectors a facet should expose
    ///
    /// # Errors
    ///
    /// - `UnknownContract` / `MissingDeployment` for the facet or an interface
    /// - `UnknownMethod` when a `methods` entry matches nothing in the facet
    /// - `EmptyExposedMethodSet` when the filters leave nothing
    pub fn facet_registry(&self, facet: &FacetConfig) -> DiamondResult<SelectorRegistry> {
        let artifact = self.source.contract(&facet.contract)?;
        let address = artifact.deployed_address()?;

        let interface_selectors = match &facet.exposed_interfaces {
            Some(interfaces) => Some(self.interface_selectors(interfaces)?),
            None => None,
        };
        let method_selectors = match &facet.methods {
            Some(methods) => Some(self.method_selectors(artifact, methods)?),
            None => None,
        };

        let registry = SelectorRegistry::from_exposed_methods_with(
            &self.hasher,
            &facet.contract,
            address,
            &artifact.abi.items,
            |_, selector| {
                interface_selectors
                    .as_ref()
                    .map_or(true, |allowed| allowed.contains(&selector))
                    && method_selectors
                        .as_ref()
                        .map_or(true, |allowed| allowed.contains(&selector))
            },
        )?;

        debug!(
            facet = %facet.contract,
            address = %address,
            selectors = registry.len(),
            "facet exposes methods"
        );
        Ok(registry)
    }

    /// Union of all facets' registries
    pub fn desired_registry(&self, config: &DiamondCutConfig) -> DiamondResult<SelectorRegistry> {
        let mut desired = SelectorRegistry::new();
        for facet in &config.facets {
            desired = desired.merge(&self.facet_registry(facet)?)?;
        }
        Ok(desired)
    }

    /// `deleteMethods` as a registry routed to the zero address
    pub fn deleted_registry(&self, config: &DiamondCutConfig) -> DiamondResult<SelectorRegistry> {
        let mut selectors = Vec::with_capacity(config.delete_methods.len());
        for method in &config.delete_methods {
            selectors.push(to_selector_with(&self.hasher, method)?);
        }
        Ok(SelectorRegistry::from_selectors(FacetAddress::ZERO, selectors))
    }

    /// Resolves the init contract address and call data
    pub fn init_call(&self, init: &InitConfig) -> DiamondResult<InitCall> {
        let artifact = self.source.contract(&init.contract)?;
        let address = artifact.deployed_address()?;

        let candidates = artifact.abi.find_functions(&init.method)?;
        let item = match candidates.as_slice() {
            [item] => *item,
            [] => return Err(unknown_method(artifact, &init.method)),
            _ => {
                return Err(DiamondError::InvalidConfig {
                    reason: format!(
                        "init method `{}` is overloaded in `{}`, give the full signature",
                        init.method, init.contract
                    ),
                })
            }
        };

        let mut calldata = item.selector_with(&self.hasher)?.as_bytes().to_vec();
        calldata.extend(init.args_bytes()?);
        Ok(InitCall { address, calldata })
    }

    /// Full plan for `config` against the diamond behind `loupe`
    ///
    /// Deleted selectors the diamond does not route are skipped, so planning
    /// an already executed config again yields no cuts. Before it is
    /// returned, the plan is dry-run against the current routing table.
    ///
    /// # Errors
    ///
    /// Anything the registry construction, the loupe or the source reports,
    /// `ProtectedSelectorRemoval` if the plan would remove `diamondCut` or a
    /// loupe function, and the `diamondCut` rule violation of a failed dry
    /// run.
    pub fn plan<L: DiamondLoupe + ?Sized>(
        &self,
        loupe: &L,
        config: &DiamondCutConfig,
    ) -> DiamondResult<CutPlan> {
        config.validate()?;

        let current = SelectorRegistry::from_loupe(loupe)?;
        let desired = self.desired_registry(config)?;
        let deleted = self.deleted_registry(config)?;

        let left_in_place = current.remove(&desired).remove(&deleted);
        if !left_in_place.is_empty() {
            warn!(
                diamond = %config.diamond,
                count = left_in_place.len(),
                selectors = ?left_in_place.selectors(),
                "routed selectors are neither configured nor deleted; leaving them in place"
            );
        }

        let unrouted = deleted.remove(&current);
        if !unrouted.is_empty() {
            warn!(
                diamond = %config.diamond,
                selectors = ?unrouted.selectors(),
                "deleted selectors are not routed; skipping"
            );
        }
        let deleted = deleted.restrict(&current);

        let deleted = (!deleted.is_empty()).then_some(&deleted);
        let mut plan = CutPlan::new(create_cut_with(&current, &desired, deleted, self.options));
        if let Some(init) = &config.init {
            plan = plan.with_init(self.init_call(init)?);
        }

        validate_plan(&plan)?;
        check_protected_removals(&plan)?;
        let after = self.dry_run(&current, &plan)?;
        debug!(
            diamond = %config.diamond,
            routed_before = current.len(),
            routed_after = after.len(),
            "dry run succeeded"
        );

        info!(
            diamond = %config.diamond,
            adds = plan.selector_count(FacetCutAction::Add),
            replaces = plan.selector_count(FacetCutAction::Replace),
            removes = plan.selector_count(FacetCutAction::Remove),
            init = plan.init.is_some(),
            "cut plan ready"
        );
        Ok(plan)
    }

    /// Routing table after `plan`, with the same rules the executor uses
    fn dry_run(
        &self,
        current: &SelectorRegistry,
        plan: &CutPlan,
    ) -> DiamondResult<SelectorRegistry> {
        if self.options.skip_unchanged_replaces {
            current.apply_cuts(&plan.cuts)
        } else {
            current.apply_cuts_lenient(&plan.cuts)
        }
    }

    fn interface_selectors(&self, interfaces: &[String]) -> DiamondResult<BTreeSet<Selector>> {
        let mut selectors = BTreeSet::new();
        for name in interfaces {
            let interface = self.source.contract(name)?;
            for item in interface.abi.functions() {
                selectors.insert(item.selector_with(&self.hasher)?);
            }
        }
        Ok(selectors)
    }

    fn method_selectors(
        &self,
        artifact: &ContractArtifact,
        methods: &[String],
    ) -> DiamondResult<BTreeSet<Selector>> {
        let mut selectors = BTreeSet::new();
        for method in methods {
            if Selector::looks_encoded(method) {
                let selector: Selector = method.parse()?;
                let mut found = false;
                for item in artifact.abi.functions() {
                    found |= item.selector_with(&self.hasher)? == selector;
                }
                if !found {
                    return Err(unknown_method(artifact, method));
                }
                selectors.insert(selector);
                continue;
            }

            let matches = artifact.abi.find_functions(method)?;
            if matches.is_empty() {
                return Err(unknown_method(artifact, method));
            }
            for item in matches {
                selectors.insert(item.selector_with(&self.hasher)?);
            }
        }
        Ok(selectors)
    }
}

fn unknown_method(artifact: &ContractArtifact, method: &str) -> DiamondError {
    DiamondError::UnknownMethod {
        contract: artifact.name.clone(),
        method: method.to_string(),
    }
}
