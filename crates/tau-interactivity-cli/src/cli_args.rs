use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "tau-interactivity",
    about = "Run a selection prompt against replies read from stdin",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "option",
        value_name = "VALUE[=REPLY]",
        action = ArgAction::Append,
        required = true,
        value_parser = parse_option,
        help = "Selectable value and the reply text choosing it; repeat for each option"
    )]
    pub(crate) options: Vec<(String, String)>,

    #[arg(long, help = "Select options by their 1-based position instead of reply text")]
    pub(crate) numbered: bool,

    #[arg(long, env = "TAU_INTERACTIVITY_ALLOW_CANCEL", help = "Accept the cancel phrase")]
    pub(crate) allow_cancel: bool,

    #[arg(long, help = "Compare replies with exact case")]
    pub(crate) case_sensitive: bool,

    #[arg(
        long = "allowed-user",
        value_name = "USER_ID",
        action = ArgAction::Append,
        help = "Restrict replies to this user id; repeat for more users"
    )]
    pub(crate) allowed_users: Vec<u64>,

    #[arg(long, default_value_t = 1, help = "Author id attached to stdin replies")]
    pub(crate) author_id: u64,

    #[arg(long, default_value_t = 1, help = "Channel id the prompt and replies use")]
    pub(crate) channel_id: u64,

    #[arg(long, help = "Prompt timeout in milliseconds; defaults to the config value")]
    pub(crate) timeout_ms: Option<u64>,

    #[arg(long, help = "Prompt title passed through as presentation payload")]
    pub(crate) title: Option<String>,

    #[arg(long, help = "Delete replies that match nothing")]
    pub(crate) delete_invalid: bool,

    #[arg(long, help = "Delete the reply that resolved the prompt")]
    pub(crate) delete_valid: bool,

    #[arg(
        long,
        env = "TAU_INTERACTIVITY_CONFIG",
        value_name = "PATH",
        help = "JSON config file; TAU_INTERACTIVITY_* env vars apply when absent"
    )]
    pub(crate) config: Option<PathBuf>,
}

pub(crate) fn parse_option(raw: &str) -> Result<(String, String), String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("option cannot be empty".to_string());
    }
    let (value, reply) = match raw.split_once('=') {
        Some((value, reply)) => (value.trim(), reply.trim()),
        None => (raw, raw),
    };
    if value.is_empty() {
        return Err(format!("option '{raw}' has an empty value"));
    }
    if reply.is_empty() {
        return Err(format!("option '{raw}' has an empty reply"));
    }
    Ok((value.to_string(), reply.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parse_option_splits_value_and_reply() {
        assert_eq!(
            parse_option("A=apple"),
            Ok(("A".to_string(), "apple".to_string()))
        );
        assert_eq!(
            parse_option("banana"),
            Ok(("banana".to_string(), "banana".to_string()))
        );
    }

    #[test]
    fn regression_parse_option_rejects_empty_parts() {
        assert!(parse_option("=apple").is_err());
        assert!(parse_option("A=").is_err());
        assert!(parse_option("  ").is_err());
    }

    #[test]
    fn functional_cli_collects_repeated_options_and_users() {
        let cli = Cli::try_parse_from([
            "tau-interactivity",
            "--option",
            "A=apple",
            "--option",
            "B=banana",
            "--allowed-user",
            "7",
            "--allow-cancel",
        ])
        .expect("parse cli");
        assert_eq!(cli.options.len(), 2);
        assert_eq!(cli.allowed_users, vec![7]);
        assert!(cli.allow_cancel);
        assert_eq!(cli.timeout_ms, None);
    }
}
