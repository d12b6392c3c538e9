use std::collections::HashSet;

use super::{Block, BlockId, Function, Instruction, Linkage, Loop, LoopId, Markers, Region, RegionId};
use crate::Error;

/// Incrementally assembles a [`Function`] and checks that its region tree and
/// loop nest are consistent before freezing it.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    linkage: Linkage,
    intrinsic: bool,
    blocks: Vec<Block>,
    regions: Vec<Region>,
    loops: Vec<Loop>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linkage: Linkage::Internal,
            intrinsic: false,
            blocks: vec![],
            regions: vec![],
            loops: vec![],
        }
    }

    pub fn linkage(&mut self, linkage: Linkage) -> &mut Self {
        self.linkage = linkage;
        self
    }

    pub fn intrinsic(&mut self, intrinsic: bool) -> &mut Self {
        self.intrinsic = intrinsic;
        self
    }

    pub fn block(&mut self, name: impl Into<String>, instructions: Vec<Instruction>) -> BlockId {
        self.blocks.push(Block {
            name: name.into(),
            instructions,
            markers: Markers::default(),
        });
        BlockId(self.blocks.len() - 1)
    }

    pub fn mark(&mut self, block: BlockId, markers: Markers) -> &mut Self {
        self.blocks[block.0].markers = markers;
        self
    }

    pub fn region(
        &mut self,
        name: impl Into<String>,
        parent: Option<RegionId>,
        blocks: &[BlockId],
        has_entering_block: bool,
    ) -> RegionId {
        let id = RegionId(self.regions.len());
        self.regions.push(Region {
            name: name.into(),
            parent,
            children: vec![],
            blocks: blocks.to_vec(),
            has_entering_block,
        });
        if let Some(parent) = parent {
            self.regions[parent.0].children.push(id);
        }
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_loop(
        &mut self,
        name: impl Into<String>,
        parent: Option<LoopId>,
        header: BlockId,
        latch: Option<BlockId>,
        exit: Option<BlockId>,
        start_line: Option<u32>,
        blocks: &[BlockId],
    ) -> LoopId {
        let id = LoopId(self.loops.len());
        self.loops.push(Loop {
            name: name.into(),
            header,
            latch,
            exit,
            start_line,
            blocks: blocks.to_vec(),
            parent,
            sub_loops: vec![],
        });
        if let Some(parent) = parent {
            self.loops[parent.0].sub_loops.push(id);
        }
        id
    }

    pub fn build(mut self) -> Result<Function, Error> {
        if self.blocks.is_empty() {
            return Ok(Function::declaration(self.name, self.linkage, self.intrinsic));
        }

        if self.regions.is_empty() {
            let all: Vec<_> = (0..self.blocks.len()).map(BlockId).collect();
            self.region("top", None, &all, false);
        }

        self.check()?;

        let region_depth = depths(&self.regions, |r| r.parent.map(|p| p.0));
        let loop_depth = depths(&self.loops, |l| l.parent.map(|p| p.0));

        let mut block_region: Vec<Option<RegionId>> = vec![None; self.blocks.len()];
        for (idx, region) in self.regions.iter().enumerate() {
            for block in &region.blocks {
                let slot = &mut block_region[block.0];
                if slot.is_none_or(|cur| region_depth[cur.0] < region_depth[idx]) {
                    *slot = Some(RegionId(idx));
                }
            }
        }

        let mut block_loop: Vec<Option<LoopId>> = vec![None; self.blocks.len()];
        for (idx, lp) in self.loops.iter().enumerate() {
            for block in &lp.blocks {
                let slot = &mut block_loop[block.0];
                if slot.is_none_or(|cur| loop_depth[cur.0] < loop_depth[idx]) {
                    *slot = Some(LoopId(idx));
                }
            }
        }

        Ok(Function {
            name: self.name,
            linkage: self.linkage,
            intrinsic: self.intrinsic,
            blocks: self.blocks,
            regions: self.regions,
            loops: self.loops,
            block_region,
            block_loop,
        })
    }

    fn check(&self) -> Result<(), Error> {
        let invalid = |message: String| Error::InvalidProgram(format!("{}: {message}", self.name));

        let roots: Vec<_> = self.regions.iter().filter(|r| r.is_top_level()).collect();
        let [root] = roots.as_slice() else {
            return Err(invalid(format!(
                "expected one top-level region, found {}",
                roots.len()
            )));
        };
        let covered: HashSet<_> = root.blocks.iter().collect();
        if let Some(block) = self.blocks.iter().enumerate().find_map(|(i, b)| {
            (!covered.contains(&BlockId(i))).then_some(&b.name)
        }) {
            return Err(invalid(format!(
                "block '{block}' is outside the top-level region '{}'",
                root.name
            )));
        }

        let in_range = |b: &BlockId| b.0 < self.blocks.len();
        for region in &self.regions {
            if !region.blocks.iter().all(in_range) {
                return Err(invalid(format!("region '{}' names an unknown block", region.name)));
            }
            if let Some(parent) = region.parent {
                let outer: HashSet<_> = self.regions[parent.0].blocks.iter().collect();
                if !region.blocks.iter().all(|b| outer.contains(b)) {
                    return Err(invalid(format!(
                        "region '{}' is not contained in its parent",
                        region.name
                    )));
                }
            }
        }

        for lp in &self.loops {
            if !lp.blocks.iter().all(in_range) {
                return Err(invalid(format!("loop '{}' names an unknown block", lp.name)));
            }
            if !lp.blocks.contains(&lp.header) {
                return Err(invalid(format!("loop '{}' does not contain its header", lp.name)));
            }
            if let Some(latch) = lp.latch
                && !lp.blocks.contains(&latch)
            {
                return Err(invalid(format!("loop '{}' does not contain its latch", lp.name)));
            }
            if let Some(parent) = lp.parent {
                let outer: HashSet<_> = self.loops[parent.0].blocks.iter().collect();
                if !lp.blocks.iter().all(|b| outer.contains(b)) {
                    return Err(invalid(format!(
                        "loop '{}' is not contained in its parent",
                        lp.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Nesting depth of every node of a parent-linked forest.
fn depths<T>(nodes: &[T], parent: impl Fn(&T) -> Option<usize>) -> Vec<usize> {
    (0..nodes.len())
        .map(|mut idx| {
            let mut depth = 0;
            while let Some(p) = parent(&nodes[idx]) {
                depth += 1;
                idx = p;
            }
            depth
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_top_region() {
        let mut b = FunctionBuilder::new("f");
        b.block("a", vec![Instruction::at(1)]);
        b.block("b", vec![Instruction::at(2)]);
        let f = b.build().unwrap();
        let top = f.top_region().unwrap();
        assert!(f.get_region(top).is_top_level());
        assert_eq!(f.get_region(top).blocks.len(), 2);
    }

    #[test]
    fn test_empty_is_declaration() {
        let f = FunctionBuilder::new("g").build().unwrap();
        assert!(!f.has_body());
        assert!(!f.is_routine_candidate());
    }

    #[test]
    fn test_child_region_outside_parent() {
        let mut b = FunctionBuilder::new("f");
        let x = b.block("x", vec![]);
        let y = b.block("y", vec![]);
        let top = b.region("top", None, &[x, y], false);
        let mid = b.region("mid", Some(top), &[x], true);
        b.region("bad", Some(mid), &[y], true);
        assert!(matches!(b.build(), Err(Error::InvalidProgram(m)) if m.contains("bad")));
    }

    #[test]
    fn test_top_region_covers_every_block() {
        let mut b = FunctionBuilder::new("f");
        b.block("entry", vec![Instruction::at(1)]);
        let header = b.block("header", vec![Instruction::at(3)]);
        let latch = b.block("latch", vec![Instruction::at(4)]);
        b.region("top", None, &[header, latch], false);
        b.add_loop("l0", None, header, Some(latch), None, Some(3), &[header, latch]);
        assert!(matches!(b.build(), Err(Error::InvalidProgram(m)) if m.contains("'entry'")));
    }

    #[test]
    fn test_loop_without_header() {
        let mut b = FunctionBuilder::new("f");
        let x = b.block("x", vec![]);
        let y = b.block("y", vec![]);
        b.add_loop("l", None, x, None, None, None, &[y]);
        assert!(matches!(b.build(), Err(Error::InvalidProgram(_))));
    }

    #[test]
    fn test_two_roots() {
        let mut b = FunctionBuilder::new("f");
        let x = b.block("x", vec![]);
        b.region("a", None, &[x], false);
        b.region("b", None, &[x], false);
        assert!(matches!(b.build(), Err(Error::InvalidProgram(_))));
    }
}
