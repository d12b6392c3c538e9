use std::collections::BTreeSet;

use crate::config::Target;
use crate::ir::Module;

/// Registers `root` and every function transitively reachable from it as a
/// device routine.
///
/// Only accelerator targets have routines. Declarations, intrinsics and
/// available-externally functions are neither registered nor walked. The
/// registry doubles as the visited set, so call cycles terminate.
pub fn find_routines(module: &Module, root: &str, target: Target, registry: &mut BTreeSet<String>) {
    if !target.is_accelerator() {
        return;
    }

    let mut worklist = vec![root];
    while let Some(name) = worklist.pop() {
        let Some(func) = module.function(name) else {
            log::trace!("call to unknown function {name}");
            continue;
        };
        if !func.is_routine_candidate() || !registry.insert(func.name.clone()) {
            continue;
        }
        log::debug!("registered routine {name}");

        worklist.extend(
            func.calls()
                .map(|call| call.callee.as_str())
                .filter(|callee| !registry.contains(*callee)),
        );
    }
}
