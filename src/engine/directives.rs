use std::collections::HashSet;

use super::Walker;
use super::predicates::{is_safe_memory_coalescing, parallel_status};
use crate::config::Target;
use crate::error::Rejection;
use crate::ir::{LoopId, RegionId};

pub(crate) fn parallel_loop_directive(target: Target, guard: &str) -> String {
    let directive = target.parallel_loop_directive();
    if guard.is_empty() {
        format!("{directive}\n")
    } else {
        format!("{directive} {guard}\n")
    }
}

pub(crate) fn kernels_directive(name: &str, restrict: bool) -> String {
    if restrict {
        format!("#pragma acc kernels if(!RST_{name})\n")
    } else {
        "#pragma acc kernels\n".to_string()
    }
}

impl Walker<'_, '_> {
    /// Emits the parallel-loop directive on `lp` and on its whole sub-loop
    /// nest. Only `lp` itself is checked against its latch markers.
    pub(super) fn denotate_loop_parallel(&mut self, lp: LoopId, guard: &str) {
        if let Err(reason) = parallel_status(self.func, lp, &self.session.config) {
            self.reject(self.loop_name(lp), reason);
            return;
        }
        let directive = parallel_loop_directive(self.session.config.target, guard);
        self.annotate_nest(lp, &directive);
    }

    fn annotate_nest(&mut self, lp: LoopId, directive: &str) {
        let func = self.func;
        let l = func.get_loop(lp);
        match l.start_line {
            Some(line) => {
                self.session.comments.add(line, directive);
                self.session.stats.annotated_loops += 1;
            }
            None => self.reject(&l.name, Rejection::MissingLineInfo),
        }
        for &sub in &l.sub_loops {
            self.annotate_nest(sub, directive);
        }
    }

    /// Emits a kernel directive on every outermost loop whose header lies in
    /// the region. Loops nested in an annotated loop are skipped. A region
    /// that cannot be isolated gets no kernel directive at all.
    pub(super) fn annotate_kernels(&mut self, region: RegionId, name: &str, restrict: bool) {
        let func = self.func;
        if !is_safe_memory_coalescing(func, region, &self.session.config) {
            self.reject(&func.get_region(region).name, Rejection::UnsafeRegion);
            return;
        }

        let r = func.get_region(region);
        let mut visited = HashSet::new();
        for &block in &r.blocks {
            let Some(mut lp) = func.loop_for(block) else {
                continue;
            };
            if !r.contains(func.get_loop(lp).header) {
                continue;
            }
            while let Some(parent) = func.get_loop(lp).parent {
                if !r.contains(func.get_loop(parent).header) {
                    break;
                }
                lp = parent;
            }
            if visited.contains(&lp) {
                continue;
            }

            self.write_kernels(lp, name, restrict);
            visited.extend(func.loop_nest(lp));
        }
    }

    fn write_kernels(&mut self, lp: LoopId, name: &str, restrict: bool) {
        let func = self.func;
        let target = self.session.config.target;
        let emit_parallel = self.session.config.emit_parallel;

        let Some(line) = func.get_loop(lp).start_line else {
            self.reject(self.loop_name(lp), Rejection::MissingLineInfo);
            return;
        };
        let directive = kernels_directive(name, restrict);

        if target.is_accelerator() && !emit_parallel {
            self.session.comments.add(line, &directive);
            self.session.stats.annotated_loops += 1;
            return;
        }

        let parallel = func
            .get_loop(lp)
            .latch
            .is_some_and(|latch| func.get_block(latch).markers.parallel);
        if !parallel {
            self.reject(self.loop_name(lp), Rejection::UnsafeRegion);
            return;
        }

        if target.is_accelerator() {
            self.session.comments.add(line, &directive);
        }
        if emit_parallel {
            self.denotate_loop_parallel(lp, "");
        }
    }
}
