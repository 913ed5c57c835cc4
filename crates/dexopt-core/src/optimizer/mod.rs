//! Whole-program optimization passes over a [`DexProgram`]
//!
//! Passes run in the order the configuration lists them. Each pass sees the
//! whole program and reports its counters in a [`PassReport`].

pub mod single_impl;

pub use single_impl::{SingleImplPass, SingleImplStats};

use crate::config::{OptimizerConfig, PgoInput};
use crate::errors::Result;
use crate::ir::DexProgram;
use indexmap::IndexMap;
use tracing::{info, warn};

/// Inputs shared by every pass of a run
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub pgo: PgoInput,
}

impl PassContext {
    pub fn new(pgo: PgoInput) -> Self {
        Self { pgo }
    }
}

/// Named counters produced by one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: &'static str,
    pub metrics: IndexMap<&'static str, usize>,
}

impl PassReport {
    pub fn new(pass: &'static str) -> Self {
        Self {
            pass,
            metrics: IndexMap::new(),
        }
    }

    pub fn record(&mut self, metric: &'static str, value: usize) {
        *self.metrics.entry(metric).or_insert(0) += value;
    }

    pub fn metric(&self, metric: &str) -> usize {
        self.metrics.get(metric).copied().unwrap_or(0)
    }
}

/// A pass that transforms the whole program at once
pub trait ScopePass {
    fn name(&self) -> &'static str;

    fn run(&mut self, program: &mut DexProgram, ctx: &PassContext) -> Result<PassReport>;
}

/// Runs registered passes in order
pub struct PassManager {
    passes: Vec<Box<dyn ScopePass>>,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Register the passes named in `config.passes`; unknown names are skipped
    /// with a warning
    pub fn from_config(config: &OptimizerConfig) -> Self {
        let mut manager = Self::new();
        for name in &config.passes {
            match name.as_str() {
                "single-impl" => manager.add(SingleImplPass::new(config.single_impl.clone())),
                other => warn!("Unknown pass `{}` in configuration, skipping", other),
            }
        }
        manager
    }

    pub fn add(&mut self, pass: impl ScopePass + 'static) {
        self.passes.push(Box::new(pass));
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass; stops at the first error
    pub fn run(&mut self, program: &mut DexProgram, ctx: &PassContext) -> Result<Vec<PassReport>> {
        if self.passes.is_empty() {
            warn!("No optimization passes configured");
        }

        let mut reports = Vec::with_capacity(self.passes.len());
        for pass in &mut self.passes {
            info!("Running pass {}", pass.name());
            reports.push(pass.run(program, ctx)?);
        }
        Ok(reports)
    }
}
