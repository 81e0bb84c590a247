use reflector::handlers::{handle_scan, init_logging, print_banner};

mod commands;

use commands::command_argument_builder;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let matches = cmd.get_matches();

    init_logging(matches.get_flag("verbose"));

    let json = matches
        .get_one::<String>("format")
        .is_some_and(|f| f == "json");
    if !matches.get_flag("quiet") && !json {
        print_banner();
    }

    let code = handle_scan(&matches).await;
    std::process::exit(code);
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
