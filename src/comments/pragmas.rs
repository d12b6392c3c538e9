//! Pragma injection files.
//!
//! Each non-blank line is either a bare source line number, which receives the
//! target's parallel-loop directive, or a line number followed by the exact
//! directive text to place there.

use std::path::Path;

use pest::Parser;
use pest_derive::Parser;

use super::CommentMap;
use crate::Error;
use crate::config::Target;

#[derive(Parser)]
#[grammar = "../grammar/pragmas.pest"]
struct PragmaParser;

pub fn read_pragma_file(path: &Path, target: Target) -> Result<CommentMap, Error> {
    let input = std::fs::read_to_string(path)?;
    parse_pragmas(&input, target)
}

pub fn parse_pragmas(input: &str, target: Target) -> Result<CommentMap, Error> {
    let mut comments = CommentMap::new();

    for (idx, raw) in input.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }

        let invalid = |message: String| Error::InvalidPragma {
            line: idx + 1,
            message,
        };

        let entry = PragmaParser::parse(Rule::Entry, raw.trim())
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("empty entry".to_string()))?;

        let mut line = None;
        let mut directive = None;
        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::Number => {
                    let n = pair
                        .as_str()
                        .parse::<u32>()
                        .map_err(|e| invalid(e.to_string()))?;
                    if n == 0 {
                        return Err(invalid("source lines start at 1".to_string()));
                    }
                    line = Some(n);
                }
                Rule::Directive => directive = Some(pair.as_str().trim_end().to_string()),
                _ => {}
            }
        }

        let line = line.ok_or_else(|| invalid("missing line number".to_string()))?;
        let directive =
            directive.unwrap_or_else(|| target.parallel_loop_directive().to_string());
        log::trace!("seeding line {line} with `{directive}`");
        comments.add(line, &format!("{directive}\n"));
    }

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_line_uses_target_directive() {
        let map = parse_pragmas("12\n\n30\n", Target::HostCpu).unwrap();
        assert_eq!(map.get(12), Some("#pragma omp parallel for\n"));
        assert_eq!(map.get(30), Some("#pragma omp parallel for\n"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_explicit_directive() {
        let map = parse_pragmas("5 #pragma acc data copy(a[0:n])", Target::Accelerator).unwrap();
        assert_eq!(map.get(5), Some("#pragma acc data copy(a[0:n])\n"));
    }

    #[test]
    fn test_accelerator_default() {
        let map = parse_pragmas("8", Target::Accelerator).unwrap();
        assert_eq!(map.get(8), Some("#pragma acc loop independent\n"));
    }

    #[test]
    fn test_malformed_line() {
        let result = parse_pragmas("4\nfoo 3\n", Target::Accelerator);
        assert!(matches!(result, Err(Error::InvalidPragma { line: 2, .. })));

        let result = parse_pragmas("12abc\n", Target::Accelerator);
        assert!(matches!(result, Err(Error::InvalidPragma { line: 1, .. })));

        let result = parse_pragmas("3\n0\n", Target::Accelerator);
        assert!(matches!(result, Err(Error::InvalidPragma { line: 2, .. })));
    }

    #[test]
    fn test_tab_separated_directive() {
        let map = parse_pragmas("7\t#pragma omp simd", Target::HostCpu).unwrap();
        assert_eq!(map.get(7), Some("#pragma omp simd\n"));
    }
}
