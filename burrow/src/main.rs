use burrow::command_argument_builder;
use burrow::handlers::{handle_resume, handle_scan, init_logging, print_banner, report_error};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbosity = chosen_command.get_count("verbose");

    init_logging(verbosity, quiet);

    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("scan", sub_matches)) => handle_scan(sub_matches, quiet).await,
        Some(("resume", sub_matches)) => handle_resume(sub_matches, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => report_error(&e),
    };
    std::process::exit(code);
}
