use std::process::ExitCode;

fn main() -> ExitCode {
    cotar_cli::run()
}
