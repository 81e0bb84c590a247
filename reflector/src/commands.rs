use crate::CLAP_STYLING;
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgGroup, arg};
use reflector_core::{DEFAULT_CONCURRENCY, DEFAULT_MARKER};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("reflector")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("reflector")
        .about(
            "Crawl a site, collect every GET parameter seen in its links and report the \
            parameters whose value is reflected back in the response.",
        )
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging on stderr").required(false))
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("Target to scan, including http:// or https:// (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            arg!(-H --"hosts-file" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of targets")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .group(
            ArgGroup::new("targets")
                .args(["url", "hosts-file"])
                .required(true)
                .multiple(true),
        )
        .arg(
            arg!(-s --"subdomains")
                .required(false)
                .help("Also crawl subdomains of the target host")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-c --"concurrency" <NUM_WORKERS>)
                .required(false)
                .help(format!(
                    "Maximum probes in flight at once, 0 = unlimited (default: {})",
                    DEFAULT_CONCURRENCY
                ))
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(--"max-pages" <NUM>)
                .required(false)
                .help("Stop crawling after this many pages (default: no limit)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds (default: none)")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Directory under which per-target result folders are created")
                .default_value("."),
        )
        .arg(
            arg!(--"marker" <VALUE>)
                .required(false)
                .help("Value injected into each parameter")
                .value_parser(NonEmptyStringValueParser::new())
                .default_value(DEFAULT_MARKER),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Final report format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
}
