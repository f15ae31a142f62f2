use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
