//! Safety predicates shared by both traversal policies.

use crate::config::Config;
use crate::error::Rejection;
use crate::ir::{Function, LoopId, RegionId};
use crate::oracle::SideEffects;

/// Side-effect information is complete for the region of the loop header and
/// for the region of every block in the loop.
pub fn is_loop_analyzable(func: &Function, lp: LoopId, side_effects: &dyn SideEffects) -> bool {
    let l = func.get_loop(lp);
    std::iter::once(l.header)
        .chain(l.blocks.iter().copied())
        .all(|block| {
            func.region_for(block)
                .is_some_and(|region| side_effects.has_full_side_effect_info(func, region))
        })
}

/// Checks the latch markers of a loop.
pub(crate) fn parallel_status(func: &Function, lp: LoopId, config: &Config) -> Result<(), Rejection> {
    let Some(latch) = func.get_loop(lp).latch else {
        return Err(Rejection::UnsafeRegion);
    };
    let markers = func.get_block(latch).markers;
    if !markers.parallel {
        return Err(Rejection::UnsafeRegion);
    }
    if config.discard_divergent && markers.divergent {
        return Err(Rejection::UnsafeDivergence);
    }
    Ok(())
}

pub fn is_loop_parallel(func: &Function, lp: LoopId, config: &Config) -> bool {
    parallel_status(func, lp, config).is_ok()
}

/// A region can be isolated as a kernel scope.
///
/// Without parallel emission any isolable region qualifies; with it, every
/// loop touching the region must be proven parallel.
pub fn is_safe_memory_coalescing(func: &Function, region: RegionId, config: &Config) -> bool {
    let r = func.get_region(region);
    if !r.has_entering_block && !r.is_top_level() {
        return false;
    }
    if !config.emit_parallel {
        return true;
    }
    func.loops_touching(&r.blocks)
        .into_iter()
        .all(|lp| is_loop_parallel(func, lp, config))
}
