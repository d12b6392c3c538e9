use std::path::PathBuf;

use clap::{ArgGroup, ArgMatches, arg, command, value_parser};

pub(crate) fn cli() -> ArgMatches {
    command!()
        .subcommand_required(true)
        .subcommand(
            command!("annotate")
                .about("Emit parallel-loop and kernel directives for a program")
                .arg(arg!(-i --input <INPUT> "Raw program description (inline)"))
                .arg(
                    arg!(-f --file <INPUT> "Program description file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .group(
                    ArgGroup::new("input-source")
                        .args(["input", "file"])
                        .required(true)
                        .multiple(false),
                )
                .arg(
                    arg!(-t --target <TARGET> "Directive family to emit")
                        .value_parser(["acc", "omp-gpu", "omp-cpu"])
                        .default_value("acc"),
                )
                .arg(arg!(--"emit-parallel" "Annotate loops proven parallel upstream"))
                .arg(arg!(--"discard-divergent" "Skip loops whose latch is marked divergent"))
                .arg(arg!(--coalescing "Annotate whole regions as kernel scopes"))
                .arg(
                    arg!(-p --pragmas <FILE> "Pragma injection file seeding the output")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --output <OUTPUT> "Write the comment map to a file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(arg!(--stats "Print statistics to stderr")),
        )
        .subcommand(
            command!("regions")
                .about("Render the region tree of a function as Graphviz")
                .arg(arg!(-i --input <INPUT> "Raw program description (inline)"))
                .arg(
                    arg!(-f --file <INPUT> "Program description file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .group(
                    ArgGroup::new("input-source")
                        .args(["input", "file"])
                        .required(true)
                        .multiple(false),
                )
                .arg(arg!(-F --function <NAME> "Function to render").required(true))
                .arg(
                    arg!(-o --output <OUTPUT> "Output to DOT file")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .get_matches()
}
