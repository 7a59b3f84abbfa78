use std::process::ExitCode;

fn main() -> ExitCode {
    playground::run_generate_project()
}
