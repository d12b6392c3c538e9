//! The annotation engine.
//!
//! A [`Session`] carries all state that outlives a single function: the
//! computation sequence counter, the routine registry, the statistics and the
//! merged output. Each function is walked by a short-lived `Walker` that
//! borrows the session mutably together with the function view and its
//! oracles.

mod directives;
mod predicates;
mod routines;
mod traversal;


use std::collections::BTreeSet;
use std::fmt::{self, Display};

pub use predicates::{is_loop_analyzable, is_loop_parallel, is_safe_memory_coalescing};
pub use routines::find_routines;

use crate::comments::CommentMap;
use crate::config::Config;
use crate::error::Rejection;
use crate::ir::{Function, LoopId, Module};
use crate::oracle::Oracles;
use crate::stats::Statistics;

/// Record of one annotation attempt.
#[derive(Debug, Clone)]
pub struct Computation {
    sequence: u64,
    name: String,
    pub restrict: bool,
    pub guard: String,
    pub fragments: CommentMap,
}

impl Computation {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            name: format!("AI{sequence}"),
            restrict: false,
            guard: String::new(),
            fragments: CommentMap::new(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub comments: CommentMap,
    pub routines: BTreeSet<String>,
    pub stats: Statistics,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.comments)?;
        for routine in &self.routines {
            writeln!(f, "routine\t{routine}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    sequence: u64,
    stats: Statistics,
    routines: BTreeSet<String>,
    comments: CommentMap,
    output: CommentMap,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sequence: 0,
            stats: Statistics::default(),
            routines: BTreeSet::new(),
            comments: CommentMap::new(),
            output: CommentMap::new(),
        }
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn routines(&self) -> &BTreeSet<String> {
        &self.routines
    }

    /// Annotations of the function analyzed last.
    pub fn comments(&self) -> &CommentMap {
        &self.comments
    }

    /// Adds entries to the run's output ahead of any traversal.
    pub fn seed(&mut self, comments: &CommentMap) {
        self.output.merge(comments);
    }

    /// Reset point for per-function state.
    pub fn begin_function(&mut self) {
        self.comments.clear();
    }

    pub fn annotate_function(&mut self, module: &Module, func: &Function, oracles: Oracles<'_>) {
        self.begin_function();
        if !func.has_body() {
            return;
        }

        log::debug!("analyzing function {}", func.name);
        Walker {
            session: self,
            module,
            func,
            oracles,
        }
        .function_identify();

        self.output.merge(&self.comments);
    }

    pub fn finish(self) -> Report {
        Report {
            comments: self.output,
            routines: self.routines,
            stats: self.stats,
        }
    }

    fn next_computation(&mut self) -> Computation {
        self.sequence += 1;
        Computation::new(self.sequence)
    }
}

struct Walker<'s, 'a> {
    session: &'s mut Session,
    module: &'a Module,
    func: &'a Function,
    oracles: Oracles<'a>,
}

impl<'a> Walker<'_, 'a> {
    fn reject(&self, scope: impl Display, reason: Rejection) {
        log::debug!("{}: not annotating {scope}: {reason}", self.func.name);
    }

    fn loop_name(&self, lp: LoopId) -> &'a str {
        &self.func.get_loop(lp).name
    }

    fn mark_analyzable(&mut self, lp: LoopId) {
        self.session.stats.analyzable_loops += self.func.loop_nest(lp).len() as u64;
    }

    fn mark_annotated(&mut self, lp: LoopId) {
        self.session.stats.annotated_loops += self.func.loop_nest(lp).len() as u64;
    }
}
