use std::process::ExitCode;

fn main() -> ExitCode {
    playground::run_launch_on_simulator()
}
