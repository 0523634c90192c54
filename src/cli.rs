use clap::{Arg, ArgAction, Command};
use std::env;
use std::path::PathBuf;

/// Environment override that skips the confirmation prompt, for
/// non-interactive and test invocations.
pub const AUTO_YES_ENV: &str = "MDAPPLY_AUTO_YES";

pub struct Config {
    /// Markdown source; `None` means the system clipboard.
    pub input: Option<PathBuf>,
    /// Keep changes without asking.
    pub assume_yes: bool,
    /// External check command to run before and after applying.
    pub check_command: Option<String>,
}

pub fn parse_args() -> Config {
    let matches = Command::new("mdapply")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Applies fenced code blocks from a markdown source to the filesystem")
        .after_help(
            "Code blocks must be formatted as:\n\
             \x20 ```[language] // path/to/your/file.ext\n\
             \x20 ...content...\n\
             \x20 ```\n\
             or carry the '// path/to/your/file.ext' comment on the first line\n\
             inside the fence. Analysis is performed first; malformed blocks are\n\
             reported as issues while any valid blocks are still applied.",
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Read markdown from FILE instead of the system clipboard")
                .num_args(1),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Keep the applied changes without asking for confirmation"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .value_name("CMD")
                .num_args(0..=1)
                .default_missing_value("tsc --noEmit")
                .help("Run CMD before and after applying and report the error/warning delta"),
        )
        .get_matches();

    let input = matches.get_one::<String>("input").map(PathBuf::from);
    let check_command = matches.get_one::<String>("check").cloned();
    let assume_yes = matches.get_flag("yes") || auto_yes_from_env();

    Config {
        input,
        assume_yes,
        check_command,
    }
}

fn auto_yes_from_env() -> bool {
    env::var(AUTO_YES_ENV)
        .map(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1"
        })
        .unwrap_or(false)
}
