mod cli;

use std::fs;
use std::path::PathBuf;

use clap::ArgMatches;
use env_logger::Env;
use parloop::{Config, Error, Target};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let matches = cli::cli();
    if let Err(error) = run(&matches) {
        eprintln!("❌ {error}");
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    match matches.subcommand() {
        Some(("annotate", sub)) => {
            let program = parloop::parse_program(&read_input(sub)?)?;
            let report = parloop::annotate(&program, &config(sub)?)?;
            if sub.get_flag("stats") {
                eprint!("{}", report.stats);
            }
            write_output(sub, &report.to_string())
        }
        Some(("regions", sub)) => {
            let program = parloop::parse_program(&read_input(sub)?)?;
            let function = sub
                .get_one::<String>("function")
                .ok_or_else(|| Error::UnknownFunction(String::new()))?;
            write_output(sub, &parloop::render_regions(&program, function)?)
        }
        _ => Ok(()),
    }
}

fn config(matches: &ArgMatches) -> Result<Config, Error> {
    let target = match matches.get_one::<String>("target") {
        Some(target) => target.parse::<Target>()?,
        None => Target::default(),
    };
    Ok(Config {
        target,
        emit_parallel: matches.get_flag("emit-parallel"),
        discard_divergent: matches.get_flag("discard-divergent"),
        coalescing: matches.get_flag("coalescing"),
        pragma_file: matches.get_one::<PathBuf>("pragmas").cloned(),
    })
}

fn read_input(matches: &ArgMatches) -> Result<String, Error> {
    if let Some(input) = matches.get_one::<String>("input") {
        return Ok(input.clone());
    }
    match matches.get_one::<PathBuf>("file") {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Err(Error::ParseError("no input given".to_string())),
    }
}

fn write_output(matches: &ArgMatches, text: &str) -> Result<(), Error> {
    match matches.get_one::<PathBuf>("output") {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}
