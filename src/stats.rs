use std::fmt;

/// Run-wide counters describing how much of the program was covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub loops: u64,
    pub analyzable_loops: u64,
    pub annotated_loops: u64,
    pub safe_calls: u64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            (self.loops, "Number of loops"),
            (self.analyzable_loops, "Number of analyzable loops"),
            (self.annotated_loops, "Number of annotated loops"),
            (self.safe_calls, "Number of safe call instructions inside loops"),
        ];
        for (count, description) in rows {
            writeln!(f, "{count:>8} parloop - {description}")?;
        }
        Ok(())
    }
}
