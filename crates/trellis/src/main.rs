use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use trellis_core::{compact, elaborate, Error, NetworkDefinition};

/// Elaborate declarative network topology descriptions into graphs.
///
/// Prints the elaborated graph and its gate-compacted form as DOT text.
#[derive(Parser)]
#[clap(name = "trellis", version)]
struct Cli {
    /// Topology description files, merged into one definition.
    #[clap(required = true, value_name = "CONFIG")]
    configs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli.configs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(configs: &[PathBuf]) -> Result<(), Error> {
    let mut def = NetworkDefinition::default();
    for path in configs {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        def.merge_json(&text)?;
        debug!("merged {}: {} modules so far", path.display(), def.modules.len());
    }

    let graph = elaborate(&def)?;
    print!("{}", graph.to_dot(true));
    let graph = compact(graph)?;
    print!("{}", graph.to_dot(true));
    Ok(())
}
