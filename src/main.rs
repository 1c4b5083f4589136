use std::process::ExitCode;

use supahost::{cli, logging};

fn main() -> ExitCode {
    let cli = match cli::parse(std::env::args_os()) {
        Ok(cli) => cli,
        Err(exit) => {
            print!("{}", exit.output);
            return ExitCode::from(exit.code);
        }
    };

    logging::init(cli.verbose);

    match cli::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
