use std::collections::HashMap;

use super::{Reconstruction, Recovery, RegionSafety, SideEffects};
use crate::engine::Computation;
use crate::ir::{Function, LoopId, RegionId};

/// Outcome of expression recovery for one scope. `{name}` in the guard and
/// in fragment text is replaced with the computation's name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryFacts {
    pub recovers: bool,
    pub guard: String,
    pub restrict: bool,
    pub fragments: Vec<(u32, String)>,
}

impl RecoveryFacts {
    fn apply(&self, computation: &mut Computation) -> bool {
        if !self.recovers {
            return false;
        }
        let name = computation.name().to_string();
        computation.guard = self.guard.replace("{name}", &name);
        computation.restrict = self.restrict;
        for (line, text) in &self.fragments {
            computation.fragments.add(*line, &text.replace("{name}", &name));
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionFacts {
    pub full_side_effects: bool,
    pub safe_loops: bool,
    pub sound: bool,
    pub reduced: Option<RegionId>,
    pub recovery: RecoveryFacts,
}

/// Upstream analysis results for one function. Anything not recorded is
/// answered conservatively.
#[derive(Debug, Clone, Default)]
pub struct FunctionFacts {
    pub regions: HashMap<RegionId, RegionFacts>,
    pub loops: HashMap<LoopId, RecoveryFacts>,
}

impl FunctionFacts {
    fn region(&self, region: RegionId) -> Option<&RegionFacts> {
        self.regions.get(&region)
    }
}

impl SideEffects for FunctionFacts {
    fn has_full_side_effect_info(&self, _func: &Function, region: RegionId) -> bool {
        self.region(region).is_some_and(|r| r.full_side_effects)
    }

    fn reduce_region(&self, _func: &Function, region: RegionId) -> Option<RegionId> {
        self.region(region).and_then(|r| r.reduced)
    }
}

impl RegionSafety for FunctionFacts {
    fn is_safely_region_loops(&self, _func: &Function, region: RegionId) -> bool {
        self.region(region).is_some_and(|r| r.safe_loops)
    }
}

impl Reconstruction for FunctionFacts {
    fn is_safe(&self, _func: &Function, region: RegionId) -> bool {
        self.region(region).is_some_and(|r| r.sound)
    }
}

impl Recovery for FunctionFacts {
    fn analyze_loop(
        &self,
        _func: &Function,
        lp: LoopId,
        _line: u32,
        computation: &mut Computation,
    ) -> bool {
        self.loops
            .get(&lp)
            .is_some_and(|facts| facts.apply(computation))
    }

    fn analyze_region(
        &self,
        _func: &Function,
        region: RegionId,
        _line: u32,
        computation: &mut Computation,
    ) -> bool {
        self.region(region)
            .is_some_and(|facts| facts.recovery.apply(computation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Instruction};

    #[test]
    fn test_unrecorded_is_conservative() {
        let mut b = FunctionBuilder::new("f");
        b.block("a", vec![Instruction::at(1)]);
        let func = b.build().unwrap();
        let facts = FunctionFacts::default();
        let top = func.top_region().unwrap();

        assert!(!facts.has_full_side_effect_info(&func, top));
        assert!(!facts.is_safely_region_loops(&func, top));
        assert!(!facts.is_safe(&func, top));
        assert_eq!(facts.reduce_region(&func, top), None);

        let mut computation = Computation::new(1);
        assert!(!facts.analyze_region(&func, top, 1, &mut computation));
    }

    #[test]
    fn test_recovery_substitutes_name() {
        let facts = RecoveryFacts {
            recovers: true,
            guard: "if(!RST_{name})".to_string(),
            restrict: true,
            fragments: vec![(2, "#pragma acc data create({name}[0:n])\n".to_string())],
        };
        let mut computation = Computation::new(7);
        assert!(facts.apply(&mut computation));
        assert_eq!(computation.guard, "if(!RST_AI7)");
        assert!(computation.restrict);
        assert_eq!(
            computation.fragments.get(2),
            Some("#pragma acc data create(AI7[0:n])\n")
        );
    }
}
