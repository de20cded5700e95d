use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("burrow")
        .about("Recursive, depth-synchronized web content discovery")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("burrow")
        .styles(CLAP_STYLING)
        .arg_required_else_help(true)
        .arg(
            arg!(-q --"quiet" "Suppress the banner, progress bar and summary")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v debug, -vv trace)")
                .global(true)
                .action(clap::ArgAction::Count),
        )
        .subcommand(scan_command())
        .subcommand(resume_command())
}

fn scan_command() -> clap::Command {
    let cmd = command!("scan")
        .about("Discover content under a URL, level by level")
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("Target URL; a URL containing the placeholder runs a classic fuzz"),
        )
        .arg(
            arg!(-w --"wordlist" <FILE>)
                .required(false)
                .action(clap::ArgAction::Append)
                .help("Wordlist file, may be repeated")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(-c --"config" <FILE>)
                .required(false)
                .help("TOML scan configuration; flags given here override it")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum recursion depth")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(-t --"threads" <THREADS>)
                .required(false)
                .help("Number of concurrent workers")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(--"throttle" <RPS>)
                .required(false)
                .help("Requests per second per worker, 0 disables throttling")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            arg!(-f --"filter" <EXPR>)
                .required(false)
                .action(clap::ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Keep responses matching EXPR, e.g. status:200-299 or !hash:<sha256>"),
        )
        .arg(
            arg!(--"or" "Keep a response when any filter matches instead of all")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"wordlist-filter" <EXPR>)
                .required(false)
                .action(clap::ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Drop words before scanning, e.g. ends=.php or !contains=test"),
        )
        .arg(
            arg!(--"transform" <EXPR>)
                .required(false)
                .action(clap::ArgAction::Append)
                .help("Rewrite words, e.g. upper, prefix:api- or replace:a=@"),
        )
        .arg(
            arg!(--"unique" "Remove duplicate words after transforms")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"placeholder" <TOKEN>)
                .required(false)
                .help("Placeholder substituted in classic mode, defaults to $"),
        )
        .arg(
            arg!(-p --"permutations" "Fill every placeholder with a distinct word arrangement")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-m --"mode" <MODE>)
                .required(false)
                .help("Scan strategy")
                .value_parser(["auto", "recursive", "classic"]),
        )
        .arg(
            arg!(-s --"show" <FIELD>)
                .required(false)
                .action(clap::ArgAction::Append)
                .help("Extra detail in reports")
                .value_parser(["hash", "headers", "body", "size", "time", "words", "lines"]),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            arg!(-H --"header" <HEADER>)
                .required(false)
                .action(clap::ArgAction::Append)
                .help("Extra request header as 'Name: value', may be repeated"),
        )
        .arg(arg!(--"user-agent" <AGENT>).required(false).help("User-Agent header"))
        .arg(
            arg!(--"follow-redirects" "Follow HTTP redirects instead of recording them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"grace-period" <MILLIS>)
                .required(false)
                .help("How long in-flight requests may finish after Ctrl-C")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            arg!(--"state-file" <FILE>)
                .required(false)
                .help("Where to save progress if the scan is interrupted")
                .value_parser(clap::value_parser!(PathBuf)),
        );
    with_output_args(cmd)
}

fn resume_command() -> clap::Command {
    let cmd = command!("resume")
        .about("Continue an interrupted scan from its state file")
        .arg(
            arg!(--"state" <FILE>)
                .required(true)
                .help("State file written by an interrupted scan")
                .value_parser(clap::value_parser!(PathBuf)),
        );
    with_output_args(cmd)
}

fn with_output_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-o --"output" <FILE>)
            .required(false)
            .help("Write the report to FILE instead of stdout")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"format" <FORMAT>)
            .required(false)
            .help("Report format")
            .value_parser(["tree", "json", "csv", "markdown", "md", "plain"])
            .default_value("tree"),
    )
}
