//! Structural view of a program.
//!
//! A [`Function`] owns its blocks, its region tree and its loop nest as flat
//! arenas indexed by [`BlockId`], [`RegionId`] and [`LoopId`]. The view is
//! immutable once built by [`FunctionBuilder`]; the innermost region and
//! innermost loop of every block are precomputed at that point.

mod builder;
pub mod grammar;

use std::collections::{BTreeSet, HashMap, VecDeque};

pub use builder::FunctionBuilder;

use crate::Error;
use crate::oracle::facts::FunctionFacts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callee: String,
    /// The call produces a named value.
    pub has_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instruction {
    pub line: Option<u32>,
    pub call: Option<Call>,
}

impl Instruction {
    pub fn at(line: u32) -> Self {
        Self {
            line: Some(line),
            call: None,
        }
    }

    pub fn call(callee: impl Into<String>, has_value: bool, line: Option<u32>) -> Self {
        Self {
            line,
            call: Some(Call {
                callee: callee.into(),
                has_value,
            }),
        }
    }
}

/// Metadata carried by a block's terminating instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    pub parallel: bool,
    pub divergent: bool,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub markers: Markers,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub parent: Option<RegionId>,
    pub children: Vec<RegionId>,
    /// Every block of the region, including the blocks of its children.
    pub blocks: Vec<BlockId>,
    pub has_entering_block: bool,
}

impl Region {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.blocks.contains(&block)
    }
}

#[derive(Debug, Clone)]
pub struct Loop {
    pub name: String,
    pub header: BlockId,
    pub latch: Option<BlockId>,
    pub exit: Option<BlockId>,
    pub start_line: Option<u32>,
    /// Every block of the loop, including the blocks of its sub-loops.
    pub blocks: Vec<BlockId>,
    pub parent: Option<LoopId>,
    pub sub_loops: Vec<LoopId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Linkage {
    #[default]
    Internal,
    External,
    /// A body is visible but the definition lives elsewhere.
    AvailableExternally,
}

/// First and one-past-last source lines covered by a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub intrinsic: bool,
    blocks: Vec<Block>,
    regions: Vec<Region>,
    loops: Vec<Loop>,
    block_region: Vec<Option<RegionId>>,
    block_loop: Vec<Option<LoopId>>,
}

impl Function {
    /// A function known only by its signature.
    pub fn declaration(name: impl Into<String>, linkage: Linkage, intrinsic: bool) -> Self {
        Self {
            name: name.into(),
            linkage,
            intrinsic,
            blocks: vec![],
            regions: vec![],
            loops: vec![],
            block_region: vec![],
            block_loop: vec![],
        }
    }

    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Whether the function may be emitted as a device routine.
    pub fn is_routine_candidate(&self) -> bool {
        self.has_body() && !self.intrinsic && self.linkage != Linkage::AvailableExternally
    }

    pub fn get_block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn get_region(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }

    pub fn get_loop(&self, id: LoopId) -> &Loop {
        &self.loops[id.0]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    pub fn regions(&self) -> impl Iterator<Item = (RegionId, &Region)> {
        self.regions.iter().enumerate().map(|(i, r)| (RegionId(i), r))
    }

    pub fn loops(&self) -> impl Iterator<Item = (LoopId, &Loop)> {
        self.loops.iter().enumerate().map(|(i, l)| (LoopId(i), l))
    }

    pub fn region_for(&self, block: BlockId) -> Option<RegionId> {
        self.block_region.get(block.0).copied().flatten()
    }

    pub fn loop_for(&self, block: BlockId) -> Option<LoopId> {
        self.block_loop.get(block.0).copied().flatten()
    }

    /// Outermost region reached from the entry block.
    pub fn top_region(&self) -> Option<RegionId> {
        let mut region = self.region_for(BlockId(0))?;
        while let Some(parent) = self.get_region(region).parent {
            region = parent;
        }
        Some(region)
    }

    /// `root` followed by all of its nested sub-loops, breadth first.
    pub fn loop_nest(&self, root: LoopId) -> Vec<LoopId> {
        let mut nest = vec![];
        let mut queue = VecDeque::from([root]);
        while let Some(lp) = queue.pop_front() {
            nest.push(lp);
            queue.extend(self.get_loop(lp).sub_loops.iter().copied());
        }
        nest
    }

    /// Distinct innermost loops of the given blocks.
    pub fn loops_touching(&self, blocks: &[BlockId]) -> BTreeSet<LoopId> {
        blocks.iter().filter_map(|&b| self.loop_for(b)).collect()
    }

    pub fn calls_in<'a>(&'a self, blocks: &'a [BlockId]) -> impl Iterator<Item = &'a Call> + 'a {
        blocks
            .iter()
            .flat_map(|&b| self.get_block(b).instructions.iter())
            .filter_map(|inst| inst.call.as_ref())
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.blocks
            .iter()
            .flat_map(|b| b.instructions.iter())
            .filter_map(|inst| inst.call.as_ref())
    }

    /// Starts at the earliest loop touching the region and ends on the line
    /// after the region's last instruction.
    pub fn region_span(&self, region: RegionId) -> Span {
        let blocks = &self.get_region(region).blocks;

        let start = self
            .loops_touching(blocks)
            .into_iter()
            .filter_map(|lp| self.get_loop(lp).start_line)
            .min();

        let end = blocks
            .iter()
            .flat_map(|&b| self.get_block(b).instructions.iter())
            .filter_map(|inst| inst.line)
            .max()
            .map(|line| line + 1);

        Span { start, end }
    }
}

#[derive(Debug, Default)]
pub struct Module {
    functions: Vec<Function>,
    index: HashMap<String, usize>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: Function) -> Result<(), Error> {
        if self.index.contains_key(&function.name) {
            return Err(Error::InvalidProgram(format!(
                "function '{}' is defined twice",
                function.name
            )));
        }
        self.index.insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.index.get(name).map(|&i| &self.functions[i])
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }
}

/// A module together with the upstream analysis results for each function.
#[derive(Debug, Default)]
pub struct Program {
    pub module: Module,
    facts: HashMap<String, FunctionFacts>,
}

impl Program {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            facts: HashMap::new(),
        }
    }

    pub fn set_facts(&mut self, function: &str, facts: FunctionFacts) {
        self.facts.insert(function.to_string(), facts);
    }

    pub fn facts(&self, function: &str) -> Option<&FunctionFacts> {
        self.facts.get(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Function {
        let mut b = FunctionBuilder::new("f");
        let entry = b.block("entry", vec![Instruction::at(1)]);
        let outer = b.block("outer", vec![Instruction::at(3)]);
        let inner = b.block("inner", vec![Instruction::at(4), Instruction::default()]);
        let latch = b.block("latch", vec![Instruction::at(6)]);
        let exit = b.block("exit", vec![Instruction::at(8)]);

        let top = b.region("top", None, &[entry, outer, inner, latch, exit], false);
        b.region("body", Some(top), &[outer, inner, latch], true);

        let l0 = b.add_loop("l0", None, outer, Some(latch), Some(exit), Some(3), &[outer, inner, latch]);
        b.add_loop("l1", Some(l0), inner, Some(inner), None, Some(4), &[inner]);
        b.build().unwrap()
    }

    #[test]
    fn test_innermost_lookups() {
        let f = nested();
        assert_eq!(f.loop_for(BlockId(0)), None);
        assert_eq!(f.loop_for(BlockId(1)), Some(LoopId(0)));
        assert_eq!(f.loop_for(BlockId(2)), Some(LoopId(1)));
        assert_eq!(f.region_for(BlockId(0)), Some(RegionId(0)));
        assert_eq!(f.region_for(BlockId(2)), Some(RegionId(1)));
        assert_eq!(f.top_region(), Some(RegionId(0)));
    }

    #[test]
    fn test_loop_nest_is_breadth_first() {
        let f = nested();
        assert_eq!(f.loop_nest(LoopId(0)), vec![LoopId(0), LoopId(1)]);
        assert_eq!(f.loop_nest(LoopId(1)), vec![LoopId(1)]);
    }

    #[test]
    fn test_region_span() {
        let f = nested();
        assert_eq!(
            f.region_span(RegionId(1)),
            Span {
                start: Some(3),
                end: Some(7)
            }
        );
        assert_eq!(
            f.region_span(RegionId(0)),
            Span {
                start: Some(3),
                end: Some(9)
            }
        );
    }

    #[test]
    fn test_duplicate_function() {
        let mut module = Module::new();
        module
            .add(Function::declaration("puts", Linkage::External, false))
            .unwrap();
        let result = module.add(Function::declaration("puts", Linkage::External, false));
        assert!(matches!(result, Err(Error::InvalidProgram(_))));
    }
}
