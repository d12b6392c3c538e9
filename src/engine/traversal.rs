use log::{debug, trace};

use super::Walker;
use super::predicates::{is_loop_analyzable, is_safe_memory_coalescing, parallel_status};
use crate::config::Policy;
use crate::error::Rejection;
use crate::ir::{BlockId, LoopId, RegionId, Span};

impl Walker<'_, '_> {
    /// Counts the function's loops, then walks its region tree from the
    /// outermost region with the configured policy.
    pub(super) fn function_identify(&mut self) {
        let func = self.func;
        let all: Vec<BlockId> = func.blocks().map(|(id, _)| id).collect();
        let loops = func.loops_touching(&all);
        self.session.stats.loops += loops.len() as u64;

        for &lp in &loops {
            self.count_safe_calls(lp);
        }

        let Some(top) = func.top_region() else {
            return;
        };

        match self.session.config.policy() {
            Policy::LoopMetadata => self.region_identify(top),
            Policy::MemoryCoalescing => self.region_identify_coalescing(top),
        }
    }

    fn count_safe_calls(&mut self, lp: LoopId) {
        let func = self.func;
        if !is_loop_analyzable(func, lp, self.oracles.side_effects) {
            return;
        }
        let calls = func
            .calls_in(&func.get_loop(lp).blocks)
            .filter(|call| call.has_value)
            .count();
        self.session.stats.safe_calls += calls as u64;
    }

    fn descend(&mut self, region: RegionId, visit: fn(&mut Self, RegionId)) {
        let func = self.func;
        for &child in &func.get_region(region).children {
            visit(self, child);
        }
    }

    /// Annotates the loop owning the region's first block when upstream
    /// metadata and the oracles allow it, and otherwise tries the children.
    pub(super) fn region_identify(&mut self, region: RegionId) {
        let func = self.func;
        let emit_parallel = self.session.config.emit_parallel;
        let r = func.get_region(region);
        trace!("{}: visiting region {}", func.name, r.name);

        let Some(lp) = r.blocks.first().and_then(|&b| func.loop_for(b)) else {
            self.descend(region, Self::region_identify);
            return;
        };

        if emit_parallel && let Err(reason) = parallel_status(func, lp, &self.session.config) {
            self.reject(self.loop_name(lp), reason);
            self.descend(region, Self::region_identify);
            return;
        }

        if !is_loop_analyzable(func, lp, self.oracles.side_effects) {
            self.reject(self.loop_name(lp), Rejection::IncompleteAnalysisInfo);
            self.descend(region, Self::region_identify);
            return;
        }

        if !self.oracles.safety.is_safely_region_loops(func, region) {
            self.reject(&r.name, Rejection::UnsafeRegion);
            self.descend(region, Self::region_identify);
            return;
        }

        self.mark_analyzable(lp);

        let Some(line) = func.get_loop(lp).start_line else {
            self.reject(self.loop_name(lp), Rejection::MissingLineInfo);
            return;
        };

        let mut computation = self.session.next_computation();
        if !self
            .oracles
            .recovery
            .analyze_loop(func, lp, line, &mut computation)
        {
            self.reject(self.loop_name(lp), Rejection::RecoveryFailure);
            return;
        }
        debug!(
            "{}: loop {} recovered as {}",
            func.name,
            self.loop_name(lp),
            computation.name()
        );

        self.collect_routines(&func.get_loop(lp).blocks);
        self.session.comments.merge(&computation.fragments);

        if emit_parallel {
            self.denotate_loop_parallel(lp, &computation.guard);
            return;
        }
        self.mark_annotated(lp);
    }

    /// Annotates the region as a kernel scope, falling back to a reduced
    /// region and then to the children.
    pub(super) fn region_identify_coalescing(&mut self, region: RegionId) {
        let func = self.func;
        let oracles = self.oracles;
        let r = func.get_region(region);
        trace!("{}: visiting region {}", func.name, r.name);

        let span = oracles.safety.region_span(func, region);
        if !is_safe_memory_coalescing(func, region, &self.session.config)
            || !oracles.safety.is_safely_region_loops(func, region)
        {
            self.reject(&r.name, Rejection::UnsafeRegion);
            self.descend(region, Self::region_identify_coalescing);
            return;
        }

        let invalid = !oracles.side_effects.has_full_side_effect_info(func, region)
            || !oracles.reconstruction.is_safe(func, region);
        if !invalid {
            self.write_computation(region, span);
            return;
        }

        if let Some(reduced) = oracles.side_effects.reduce_region(func, region)
            && oracles.reconstruction.is_safe(func, reduced)
            && oracles.side_effects.has_full_side_effect_info(func, reduced)
        {
            debug!(
                "{}: region {} reduced to {}",
                func.name,
                r.name,
                func.get_region(reduced).name
            );
            let span = oracles.safety.region_span(func, reduced);
            self.write_computation(reduced, span);
            return;
        }

        self.reject(&r.name, Rejection::IncompleteAnalysisInfo);
        self.descend(region, Self::region_identify_coalescing);
    }

    fn write_computation(&mut self, region: RegionId, span: Span) {
        let func = self.func;
        let name = &func.get_region(region).name;

        let Some(line) = span.start else {
            self.reject(name, Rejection::MissingLineInfo);
            return;
        };

        let mut computation = self.session.next_computation();
        if !self
            .oracles
            .recovery
            .analyze_region(func, region, line, &mut computation)
        {
            self.reject(name, Rejection::RecoveryFailure);
            return;
        }
        debug!("{}: region {name} recovered as {}", func.name, computation.name());

        self.collect_routines(&func.get_region(region).blocks);
        self.session.comments.merge(&computation.fragments);
        self.annotate_kernels(region, computation.name(), computation.restrict);

        if let Some(end) = span.end {
            self.session.comments.add(end, "}\n");
        }
    }

    fn collect_routines(&mut self, blocks: &[BlockId]) {
        let target = self.session.config.target;
        for call in self.func.calls_in(blocks) {
            if !self.session.routines.contains(&call.callee) {
                super::find_routines(self.module, &call.callee, target, &mut self.session.routines);
            }
        }
    }
}
