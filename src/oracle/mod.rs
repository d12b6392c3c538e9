//! Capabilities the engine consumes from upstream analyses.
//!
//! Every query takes the function being analyzed so one implementation can
//! serve a whole module. [`facts::FunctionFacts`] answers them from results
//! recorded next to the program structure.

pub mod facts;

use crate::engine::Computation;
use crate::ir::{Function, LoopId, RegionId, Span};

pub trait SideEffects {
    /// Every memory effect inside the region is characterized.
    fn has_full_side_effect_info(&self, func: &Function, region: RegionId) -> bool;

    /// A narrower region worth analyzing when `region` itself is not.
    fn reduce_region(&self, func: &Function, region: RegionId) -> Option<RegionId>;
}

pub trait RegionSafety {
    /// The region's loop nest can be analyzed as a unit.
    fn is_safely_region_loops(&self, func: &Function, region: RegionId) -> bool;

    fn region_span(&self, func: &Function, region: RegionId) -> Span {
        func.region_span(region)
    }
}

pub trait Reconstruction {
    fn is_safe(&self, func: &Function, region: RegionId) -> bool;
}

/// Synthesizes the data-access expressions of a scope.
///
/// On success the implementation fills the computation's fragments, guard
/// and restrict flag. A `false` return leaves the scope unannotated.
pub trait Recovery {
    fn analyze_loop(
        &self,
        func: &Function,
        lp: LoopId,
        line: u32,
        computation: &mut Computation,
    ) -> bool;

    fn analyze_region(
        &self,
        func: &Function,
        region: RegionId,
        line: u32,
        computation: &mut Computation,
    ) -> bool;
}

#[derive(Clone, Copy)]
pub struct Oracles<'a> {
    pub side_effects: &'a dyn SideEffects,
    pub safety: &'a dyn RegionSafety,
    pub reconstruction: &'a dyn Reconstruction,
    pub recovery: &'a dyn Recovery,
}

impl<'a> Oracles<'a> {
    /// Uses one value for every capability.
    pub fn uniform<T>(oracle: &'a T) -> Self
    where
        T: SideEffects + RegionSafety + Reconstruction + Recovery,
    {
        Self {
            side_effects: oracle,
            safety: oracle,
            reconstruction: oracle,
            recovery: oracle,
        }
    }
}
