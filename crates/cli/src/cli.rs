use std::path::PathBuf;

use clap::Parser;

/// Sends birthday reminders for the contacts in a CardDAV address book.
#[derive(Parser, Debug)]
#[command(name = "birthday-notifier", version, about)]
pub struct CliArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "BIRTHDAY_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds to wait for in-flight deliveries on shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout: u64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn explicit_flags() {
        let args = CliArgs::try_parse_from([
            "birthday-notifier",
            "-c",
            "/etc/birthday/config.yaml",
            "--log-level",
            "debug",
            "--shutdown-timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/birthday/config.yaml"));
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.shutdown_timeout, 3);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(CliArgs::try_parse_from(["birthday-notifier", "--frobnicate"]).is_err());
    }
}
