mod run;
mod status;

use anyhow::{Result, bail};
use console::style;
use std::path::PathBuf;

use crate::core::config::Overrides;
use crate::core::terminal::GuideSection;

fn print_help() {
    GuideSection::new("Commands")
        .command("run", "Start the bot (default)")
        .command("status --chat <id>", "Print days since the last incident from the state file")
        .command("help", "Show this help")
        .print();

    GuideSection::new("Options")
        .command("--state-file <path>", "State file (default ~/.incident-days/incidents.json)")
        .command("--daily-time <HH:MM>", "Default daily update time (default 08:00)")
        .command("--timezone <IANA>", "Reference timezone (default Asia/Seoul)")
        .command("--announce-chat <id>", "Chat that gets the daily update from startup")
        .command("--log-level <level>", "trace, debug, info, warn or error")
        .print();

    println!(
        "\n {} {} <command> [options]\n {} BOT_TOKEN must be set to run the bot.\n",
        style("Usage:").bold(),
        style("incident-days").green(),
        style("Note:").bold(),
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandArgs {
    pub overrides: Overrides,
    pub chat: Option<String>,
}

/// Reads `--flag value` pairs from `args[start..]`. `--chat` is only
/// accepted when `allow_chat` is set.
pub(crate) fn parse_command_args(
    args: &[String],
    start: usize,
    allow_chat: bool,
) -> Result<CommandArgs> {
    let mut parsed = CommandArgs::default();
    let mut i = start;
    while i < args.len() {
        let flag = args[i].as_str();
        let Some(value) = args.get(i + 1).cloned() else {
            bail!("missing value for {}", flag);
        };
        match flag {
            "--state-file" => parsed.overrides.state_file = Some(PathBuf::from(value)),
            "--daily-time" => parsed.overrides.daily_time = Some(value),
            "--timezone" | "--tz" => parsed.overrides.timezone = Some(value),
            "--announce-chat" => parsed.overrides.announce_chat = Some(value),
            "--log-level" => parsed.overrides.log_level = Some(value),
            "--chat" | "-c" if allow_chat => parsed.chat = Some(value),
            "--chat" | "-c" => bail!("{} is only valid for the status command", flag),
            _ => bail!("unknown option {}", flag),
        }
        i += 2;
    }
    Ok(parsed)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let (cmd, start) = match args.get(1).map(String::as_str) {
        None => ("run", 1),
        Some("--help") => ("help", 2),
        Some(flag) if flag.starts_with("--") => ("run", 1),
        Some(cmd) => (cmd, 2),
    };

    match cmd {
        "run" => {
            let parsed = parse_command_args(&args, start, false)?;
            run::run_bot(parsed.overrides).await
        }
        "status" => {
            let parsed = parse_command_args(&args, start, true)?;
            status::show_status(parsed.overrides, parsed.chat).await
        }
        "help" | "-h" => {
            print_help();
            Ok(())
        }
        _ => {
            print_help();
            bail!("Unknown command: {}", cmd)
        }
    }
}
