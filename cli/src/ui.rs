use std::path::Path;

use owo_colors::OwoColorize;

pub fn app_name() -> &'static str {
    "controly"
}

pub fn build_banner() -> String {
    let indent = "   ";

    #[allow(clippy::uninlined_format_args)]
    let logo = format!(
        "{indent} ██████╗ ██████╗ ███╗   ██╗████████╗██████╗  ██████╗ ██╗  ██╗   ██╗\n\
         {indent}██╔════╝██╔═══██╗████╗  ██║╚══██╔══╝██╔══██╗██╔═══██╗██║  ╚██╗ ██╔╝\n\
         {indent}██║     ██║   ██║██╔██╗ ██║   ██║   ██████╔╝██║   ██║██║   ╚████╔╝\n\
         {indent}██║     ██║   ██║██║╚██╗██║   ██║   ██╔══██╗██║   ██║██║    ╚██╔╝\n\
         {indent}╚██████╗╚██████╔╝██║ ╚████║   ██║   ██║  ██║╚██████╔╝███████╗██║\n\
         {indent} ╚═════╝ ╚═════╝ ╚═╝  ╚═══╝   ╚═╝   ╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝",
        indent = indent
    )
    .bright_cyan()
    .bold()
    .to_string();

    let line = format!("{indent}{}", "━".repeat(68).dimmed());

    let name = "CONTROLY".bright_white().bold().to_string();
    let sep = "•".dimmed().to_string();
    let desc = "Realtime Display Control Relay".white().to_string();
    let ver = format!("v{}", env!("CARGO_PKG_VERSION"))
        .bright_yellow()
        .to_string();

    format!(
        "\n{logo}\n\
         {line}\n\
         {indent} {name} {sep} {desc} {sep} {ver}\n\
         {line}"
    )
}

pub fn print_version() {
    println!("{} v{}", app_name(), env!("CARGO_PKG_VERSION"));
}

pub fn print_config_error(path: &Path, error: &anyhow::Error) {
    eprintln!(
        "{} failed to load config from {}\n{error:?}",
        "error:".bright_red().bold(),
        path.display().bright_white(),
    );
}
