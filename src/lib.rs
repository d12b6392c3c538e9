pub mod comments;
pub mod config;
pub mod engine;
mod error;
pub mod ir;
pub mod oracle;
mod render;
mod stats;

pub use comments::CommentMap;
pub use config::{Config, Policy, Target};
pub use engine::{Computation, Report, Session};
pub use error::{Error, Rejection};
pub use ir::Program;
pub use stats::Statistics;

use oracle::Oracles;
use oracle::facts::FunctionFacts;

pub fn parse_program(input: &str) -> Result<Program, Error> {
    ir::grammar::parse(input)
}

/// Annotates every function of `program` using the facts recorded for it.
///
/// The pragma file named by the configuration, if any, seeds the output
/// before the first function is analyzed.
pub fn annotate(program: &Program, config: &Config) -> Result<Report, Error> {
    let mut session = Session::new(config.clone());

    if let Some(path) = &config.pragma_file {
        let seeded = comments::pragmas::read_pragma_file(path, config.target)?;
        log::debug!("seeded {} lines from {}", seeded.len(), path.display());
        session.seed(&seeded);
    }

    let unknown = FunctionFacts::default();
    for func in program.module.functions() {
        let facts = program.facts(&func.name).unwrap_or(&unknown);
        session.annotate_function(&program.module, func, Oracles::uniform(facts));
    }

    let report = session.finish();
    log::info!(
        "annotated {} of {} loops ({} analyzable), {} routines",
        report.stats.annotated_loops,
        report.stats.loops,
        report.stats.analyzable_loops,
        report.routines.len()
    );
    Ok(report)
}

pub fn parse_and_annotate(input: &str, config: &Config) -> Result<Report, Error> {
    let program = parse_program(input)?;
    annotate(&program, config)
}

/// Graphviz rendering of one function's region tree and loop nest.
pub fn render_regions(program: &Program, function: &str) -> Result<String, Error> {
    let func = program
        .module
        .function(function)
        .ok_or_else(|| Error::UnknownFunction(function.to_string()))?;
    Ok(render::render_dot(&render::region_tree(func)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNEL: &str = r##"
        fn scale {
            block entry { inst @1; }
            block body { inst @5; call norm value @6; }
            block latch parallel { inst @7; }
            block exit { inst @9; }

            loop l0 header body latch latch exit exit @5 [body, latch]
                recover emit @4 "#pragma acc data copy(v[0:n])"

            region top [entry, body, latch, exit] {
                region r1 entering [body, latch] full safe sound
                    recover restrict emit @4 "#pragma acc data copy(v[0:n]) /* {name} */"
            }
        }

        fn norm {
            block entry { call sqrt value @20; }
        }

        declare sqrt;
    "##;

    #[test]
    fn test_loop_metadata_end_to_end() {
        let config = Config {
            emit_parallel: true,
            ..Default::default()
        };
        let report = parse_and_annotate(KERNEL, &config).unwrap();

        assert_eq!(
            report.comments.get(4),
            Some("#pragma acc data copy(v[0:n])\n")
        );
        assert_eq!(
            report.comments.get(5),
            Some("#pragma acc loop independent\n")
        );
        assert_eq!(report.routines.iter().collect::<Vec<_>>(), vec!["norm"]);
        assert_eq!(report.stats.loops, 1);
        assert_eq!(report.stats.annotated_loops, 1);
        assert_eq!(report.stats.safe_calls, 1);
    }

    #[test]
    fn test_coalescing_end_to_end() {
        let config = Config {
            coalescing: true,
            ..Default::default()
        };
        let report = parse_and_annotate(KERNEL, &config).unwrap();

        // The top region has no recorded facts, so r1 is annotated instead.
        assert_eq!(
            report.comments.get(4),
            Some("#pragma acc data copy(v[0:n]) /* AI1 */\n")
        );
        assert_eq!(
            report.comments.get(5),
            Some("#pragma acc kernels if(!RST_AI1)\n")
        );
        assert_eq!(report.comments.get(8), Some("}\n"));
    }

    #[test]
    fn test_pragma_file_seeds_output() {
        let path = std::env::temp_dir().join(format!("parloop-seed-{}.txt", std::process::id()));
        std::fs::write(&path, "2\n5 #pragma omp simd\n").unwrap();

        let config = Config {
            target: Target::HostCpu,
            emit_parallel: true,
            pragma_file: Some(path.clone()),
            ..Default::default()
        };
        let report = parse_and_annotate(KERNEL, &config);
        std::fs::remove_file(&path).unwrap();
        let report = report.unwrap();

        assert_eq!(report.comments.get(2), Some("#pragma omp parallel for\n"));
        assert_eq!(
            report.comments.get(5),
            Some("#pragma omp simd\n#pragma omp parallel for\n")
        );
        assert!(report.routines.is_empty());
    }

    #[test]
    fn test_missing_pragma_file() {
        let config = Config {
            pragma_file: Some("/nonexistent/parloop/pragmas".into()),
            ..Default::default()
        };
        let result = parse_and_annotate(KERNEL, &config);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_render_regions() {
        let program = parse_program(KERNEL).unwrap();
        let dot = render_regions(&program, "scale").unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(matches!(
            render_regions(&program, "missing"),
            Err(Error::UnknownFunction(_))
        ));
    }
}
