mod app;

use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) if command == "make-link" => app::make_link(rest),
        _ => app::run(app::build_app()),
    }
}
