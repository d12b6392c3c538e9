use std::collections::HashMap;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use super::{BlockId, Function, FunctionBuilder, Instruction, Linkage, LoopId, Markers, Module, Program, RegionId};
use crate::Error;
use crate::oracle::facts::{FunctionFacts, RecoveryFacts, RegionFacts};

#[derive(Parser)]
#[grammar = "../grammar/program.pest"]
struct ProgramParser;

pub fn parse(input: impl AsRef<str>) -> Result<Program, Error> {
    let program = ProgramParser::parse(Rule::Program, input.as_ref())
        .map_err(|e| Error::ParseError(e.to_string()))?
        .next()
        .ok_or_else(|| Error::ParseError("empty program".to_string()))?;

    let mut module = Module::new();
    let mut facts = vec![];

    for item in program.into_inner() {
        match item.as_rule() {
            Rule::Declare => module.add(parse_declare(item))?,
            Rule::Function => {
                let (function, function_facts) = FunctionScope::parse(item)?;
                facts.push((function.name.clone(), function_facts));
                module.add(function)?;
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }

    let mut program = Program::new(module);
    for (name, function_facts) in facts {
        program.set_facts(&name, function_facts);
    }
    Ok(program)
}

fn parse_declare(pair: Pair<'_, Rule>) -> Function {
    let mut name = String::new();
    let mut linkage = Linkage::External;
    let mut intrinsic = false;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::Ident => name = p.as_str().to_string(),
            Rule::Attr => apply_attr(p.as_str(), &mut linkage, &mut intrinsic),
            _ => unreachable!(),
        }
    }

    Function::declaration(name, linkage, intrinsic)
}

fn apply_attr(attr: &str, linkage: &mut Linkage, intrinsic: &mut bool) {
    match attr {
        "intrinsic" => *intrinsic = true,
        "external" => *linkage = Linkage::External,
        "available_externally" => *linkage = Linkage::AvailableExternally,
        _ => unreachable!(),
    }
}

fn number(pair: Pair<'_, Rule>) -> Result<u32, Error> {
    // At > Number
    let digits = pair.into_inner().next().map_or("", |n| n.as_str());
    digits
        .parse()
        .map_err(|e| Error::ParseError(format!("line number '{digits}': {e}")))
}

fn string(pair: Pair<'_, Rule>) -> String {
    // Str > StrInner
    let raw = pair.into_inner().next().map_or("", |s| s.as_str());
    raw.replace("\\n", "\n").replace("\\\"", "\"")
}

fn first_ident(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

/// Name tables and facts collected while reading one function.
struct FunctionScope {
    builder: FunctionBuilder,
    blocks: HashMap<String, BlockId>,
    regions: HashMap<String, RegionId>,
    loops: HashMap<String, LoopId>,
    facts: FunctionFacts,
    reductions: Vec<(RegionId, String)>,
}

impl FunctionScope {
    fn parse(pair: Pair<'_, Rule>) -> Result<(Function, FunctionFacts), Error> {
        let mut inner = pair.into_inner();
        let name = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();

        let mut scope = FunctionScope {
            builder: FunctionBuilder::new(name.clone()),
            blocks: HashMap::new(),
            regions: HashMap::new(),
            loops: HashMap::new(),
            facts: FunctionFacts::default(),
            reductions: vec![],
        };

        let mut linkage = Linkage::Internal;
        let mut intrinsic = false;

        for p in inner {
            match p.as_rule() {
                Rule::Attr => apply_attr(p.as_str(), &mut linkage, &mut intrinsic),
                Rule::Block => scope.parse_block(p)?,
                Rule::Loop => scope.parse_loop(p, None)?,
                Rule::Region => scope.parse_region(p, None)?,
                _ => unreachable!(),
            }
        }

        for (region, target) in std::mem::take(&mut scope.reductions) {
            let reduced = scope.region(&target)?;
            scope.facts.regions.entry(region).or_default().reduced = Some(reduced);
        }

        scope.builder.linkage(linkage).intrinsic(intrinsic);
        let function = scope.builder.build()?;
        log::trace!(
            "parsed function {name}: {} blocks, {} loops, {} regions",
            scope.blocks.len(),
            scope.loops.len(),
            scope.regions.len()
        );
        Ok((function, scope.facts))
    }

    fn block(&self, name: &str) -> Result<BlockId, Error> {
        self.blocks
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidProgram(format!("unknown block '{name}'")))
    }

    fn region(&self, name: &str) -> Result<RegionId, Error> {
        self.regions
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidProgram(format!("unknown region '{name}'")))
    }

    fn block_list(&self, pair: Pair<'_, Rule>) -> Result<Vec<BlockId>, Error> {
        pair.into_inner().map(|p| self.block(p.as_str())).collect()
    }

    fn parse_block(&mut self, pair: Pair<'_, Rule>) -> Result<(), Error> {
        let mut name = String::new();
        let mut markers = Markers::default();
        let mut instructions = vec![];

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::Ident => name = p.as_str().to_string(),
                Rule::Marker => match p.as_str() {
                    "parallel" => markers.parallel = true,
                    _ => markers.divergent = true,
                },
                Rule::Inst => instructions.push(parse_inst(p)?),
                _ => unreachable!(),
            }
        }

        if self.blocks.contains_key(&name) {
            return Err(Error::InvalidProgram(format!("block '{name}' is defined twice")));
        }
        let id = self.builder.block(name.clone(), instructions);
        self.builder.mark(id, markers);
        self.blocks.insert(name, id);
        Ok(())
    }

    fn parse_loop(&mut self, pair: Pair<'_, Rule>, parent: Option<LoopId>) -> Result<(), Error> {
        let mut name = String::new();
        let mut header = None;
        let mut latch = None;
        let mut exit = None;
        let mut line = None;
        let mut blocks = vec![];
        let mut recovery = RecoveryFacts::default();
        let mut sub_loops = None;

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::Ident => name = p.as_str().to_string(),
                Rule::Header => header = Some(self.block(&first_ident(p))?),
                Rule::Latch => latch = Some(self.block(&first_ident(p))?),
                Rule::Exit => exit = Some(self.block(&first_ident(p))?),
                Rule::At => line = Some(number(p)?),
                Rule::Blocks => blocks = self.block_list(p)?,
                Rule::Recover | Rule::Guard | Rule::Emit => apply_recovery(p, &mut recovery)?,
                Rule::SubLoops => sub_loops = Some(p),
                _ => unreachable!(),
            }
        }

        let header = header.ok_or_else(|| Error::ParseError(format!("loop '{name}' has no header")))?;
        if self.loops.contains_key(&name) {
            return Err(Error::InvalidProgram(format!("loop '{name}' is defined twice")));
        }
        let id = self
            .builder
            .add_loop(name.clone(), parent, header, latch, exit, line, &blocks);
        self.loops.insert(name, id);
        self.facts.loops.insert(id, recovery);

        if let Some(sub_loops) = sub_loops {
            for p in sub_loops.into_inner() {
                self.parse_loop(p, Some(id))?;
            }
        }
        Ok(())
    }

    fn parse_region(&mut self, pair: Pair<'_, Rule>, parent: Option<RegionId>) -> Result<(), Error> {
        let mut name = String::new();
        let mut entering = false;
        let mut blocks = vec![];
        let mut facts = RegionFacts::default();
        let mut reduce = None;
        let mut children = None;

        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::Ident => name = p.as_str().to_string(),
                Rule::Entering => entering = true,
                Rule::Blocks => blocks = self.block_list(p)?,
                Rule::Full => facts.full_side_effects = true,
                Rule::Safe => facts.safe_loops = true,
                Rule::Sound => facts.sound = true,
                Rule::Reduce => reduce = Some(first_ident(p)),
                Rule::Restrict => facts.recovery.restrict = true,
                Rule::Recover | Rule::Emit => apply_recovery(p, &mut facts.recovery)?,
                Rule::Children => children = Some(p),
                _ => unreachable!(),
            }
        }

        if self.regions.contains_key(&name) {
            return Err(Error::InvalidProgram(format!("region '{name}' is defined twice")));
        }
        let id = self.builder.region(name.clone(), parent, &blocks, entering);
        self.regions.insert(name, id);
        self.facts.regions.insert(id, facts);
        if let Some(target) = reduce {
            self.reductions.push((id, target));
        }

        if let Some(children) = children {
            for p in children.into_inner() {
                self.parse_region(p, Some(id))?;
            }
        }
        Ok(())
    }
}

fn parse_inst(pair: Pair<'_, Rule>) -> Result<Instruction, Error> {
    let mut inst = Instruction::default();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::Plain => {}
            Rule::Call => {
                let mut callee = String::new();
                let mut has_value = false;
                for c in p.into_inner() {
                    match c.as_rule() {
                        Rule::Ident => callee = c.as_str().to_string(),
                        Rule::Value => has_value = true,
                        _ => unreachable!(),
                    }
                }
                inst = Instruction::call(callee, has_value, inst.line);
            }
            Rule::At => inst.line = Some(number(p)?),
            _ => unreachable!(),
        }
    }
    Ok(inst)
}

fn apply_recovery(pair: Pair<'_, Rule>, recovery: &mut RecoveryFacts) -> Result<(), Error> {
    match pair.as_rule() {
        Rule::Recover => recovery.recovers = true,
        Rule::Guard => recovery.guard = pair.into_inner().next().map(string).unwrap_or_default(),
        Rule::Emit => {
            let mut inner = pair.into_inner();
            let line = match inner.next() {
                Some(at) => number(at)?,
                None => return Err(Error::ParseError("emit without a line".to_string())),
            };
            let mut text = inner.next().map(string).unwrap_or_default();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            recovery.fragments.push((line, text));
        }
        _ => unreachable!(),
    }
    Ok(())
}
