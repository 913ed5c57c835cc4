//! Single-implementation interface elimination
//!
//! Finds interfaces implemented by exactly one class in the scope, retypes every
//! use of the interface to that class, turns `invoke-interface` into
//! `invoke-virtual` and deletes the interface. Erasing one interface can leave
//! another with a single implementor, so the pass repeats until a cycle erases
//! nothing or the cycle cap is reached.
//!
//! ```text
//! BUILD -> SELECT -> ANALYZE -> REWRITE -+-> BUILD   (removed > 0, cycles < cap)
//!                                        +-> DONE
//! ```

mod analysis;
mod rewrite;
mod subst;
mod type_maps;
mod use_sites;

pub use analysis::{EscapeReason, SingleImplAnalysis, SingleImplCandidate};
pub use rewrite::RewriteOutcome;
pub use subst::{TypeKey, TypeSubstitution};
pub use type_maps::{
    build_type_maps, collect_single_impl, InterfaceImplementors, SingleImplMap, TypeMaps,
};
pub use use_sites::UseSite;

use super::{PassContext, PassReport, ScopePass};
use crate::class_hierarchy::ClassHierarchy;
use crate::config::{PgoInput, SingleImplConfig};
use crate::errors::{OptimizerError, Result};
use crate::ir::{DexClass, DexProgram, Scope};
use crate::type_interner::TypeInterner;
use tracing::{debug, info};

/// Stage of the pass driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Build,
    Select,
    Analyze,
    Rewrite,
    Done,
}

impl PassState {
    /// State after the current one completes.
    ///
    /// `removed` is the number of interfaces the cycle erased and `cycles` the
    /// number of completed cycles; both only matter when leaving `Rewrite`.
    pub fn next(self, removed: usize, cycles: usize, max_cycles: usize) -> Self {
        match self {
            PassState::Build => PassState::Select,
            PassState::Select => PassState::Analyze,
            PassState::Analyze => PassState::Rewrite,
            PassState::Rewrite if removed > 0 && cycles < max_cycles => PassState::Build,
            PassState::Rewrite | PassState::Done => PassState::Done,
        }
    }
}

/// Counters reported by the pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleImplStats {
    pub removed_interfaces: usize,
    pub invoke_interface_rewrites: usize,
    pub cycles: usize,
}

impl SingleImplStats {
    pub fn merge(&mut self, other: &SingleImplStats) {
        self.removed_interfaces += other.removed_interfaces;
        self.invoke_interface_rewrites += other.invoke_interface_rewrites;
        self.cycles += other.cycles;
    }
}

pub struct SingleImplPass {
    config: SingleImplConfig,
}

impl SingleImplPass {
    pub fn new(config: SingleImplConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SingleImplConfig {
        &self.config
    }

    /// Run the pass to a fixed point (or the cycle cap) over every container
    /// of `program`.
    ///
    /// The containers are handed back to `program` even when an invariant
    /// violation aborts the run.
    pub fn run_pass(&self, program: &mut DexProgram, pgo: &PgoInput) -> Result<SingleImplStats> {
        if !pgo.is_empty() {
            debug!("single-impl: profile input present, not used by this pass");
        }

        let mut scope = Scope::from_dexen(std::mem::take(&mut program.dexen));
        let result = self.run_cycles(&mut scope, &program.library, &mut program.types);
        program.dexen = scope.into_dexen();

        let stats = result?;
        info!(
            "single-impl: {} interface(s) removed in {} cycle(s)",
            stats.removed_interfaces, stats.cycles
        );
        info!(
            "single-impl: {} invoke-interface instruction(s) rewritten to invoke-virtual",
            stats.invoke_interface_rewrites
        );
        Ok(stats)
    }

    fn run_cycles(
        &self,
        scope: &mut Scope,
        library: &[DexClass],
        types: &mut TypeInterner,
    ) -> Result<SingleImplStats> {
        let mut stats = SingleImplStats::default();

        loop {
            let analysis = self.plan_cycle(scope, library, types, stats.cycles + 1)?;

            let before = scope.len();
            let outcome = rewrite::optimize(&analysis, scope, types);
            check_shrunk(outcome.removed, before, scope.len())?;
            stats.cycles += 1;
            stats.removed_interfaces += outcome.removed;
            stats.invoke_interface_rewrites += outcome.invoke_interface_rewrites;
            info!(
                "single-impl: cycle {}: removed {} interface(s), rewrote {} invoke-interface(s)",
                stats.cycles, outcome.removed, outcome.invoke_interface_rewrites
            );

            let state = PassState::Rewrite.next(outcome.removed, stats.cycles, self.config.max_cycles);
            if state == PassState::Done {
                break;
            }
        }

        Ok(stats)
    }

    /// The `Build`, `Select` and `Analyze` stages of one cycle, sharing a
    /// single class graph that is dropped before the rewrite
    fn plan_cycle(
        &self,
        scope: &Scope,
        library: &[DexClass],
        types: &TypeInterner,
        cycle: usize,
    ) -> Result<SingleImplAnalysis> {
        let hierarchy = ClassHierarchy::build(scope, library, types);
        let maps = build_type_maps(scope, &hierarchy);

        let single_impl = collect_single_impl(&maps.implementors, &hierarchy)?;
        debug!(
            "single-impl: cycle {}: {} implemented interface(s), {} with a single implementor",
            cycle,
            maps.implementors.len(),
            single_impl.len()
        );

        Ok(SingleImplAnalysis::analyze(
            scope,
            &hierarchy,
            &single_impl,
            &maps.interfaces,
            &self.config,
        ))
    }
}

/// The scope must lose exactly the interfaces the rewrite erased
fn check_shrunk(removed: usize, before: usize, after: usize) -> Result<()> {
    if before.checked_sub(removed) == Some(after) {
        Ok(())
    } else {
        Err(OptimizerError::ScopeDidNotShrink {
            removed,
            before,
            after,
        })
    }
}

impl ScopePass for SingleImplPass {
    fn name(&self) -> &'static str {
        "single-impl"
    }

    fn run(&mut self, program: &mut DexProgram, ctx: &PassContext) -> Result<PassReport> {
        let stats = self.run_pass(program, &ctx.pgo)?;
        let mut report = PassReport::new(self.name());
        report.record("removed_interfaces", stats.removed_interfaces);
        report.record("invoke_interface_rewrites", stats.invoke_interface_rewrites);
        report.record("cycles", stats.cycles);
        Ok(report)
    }
}
