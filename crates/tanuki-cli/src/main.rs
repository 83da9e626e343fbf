mod cli;
mod compile;

use cli::{build_cli, CompileParams};

fn main() {
    let matches = build_cli().get_matches();
    let params = CompileParams::from_matches(&matches);
    std::process::exit(compile::run(params.into()));
}
