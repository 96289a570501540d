mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bm257s", version, about = "Brymen BM257s multimeter reader")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "BM257S_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use bm257s::measure::ModeChange;

    use super::*;

    const VOLTS: &str = "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5";

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "bm257s",
            "monitor",
            "/dev/ttyUSB1",
            "--window",
            "2s",
            "--count",
            "3",
        ])
        .expect("monitor args should parse");

        let Command::Monitor(args) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.port, "/dev/ttyUSB1");
        assert_eq!(args.window.as_deref(), Some("2s"));
        assert_eq!(args.count, Some(3));
        assert_eq!(args.read_timeout, "100ms");
    }

    #[test]
    fn parses_decode_mode_change() {
        let cli = Cli::try_parse_from(["bm257s", "decode", VOLTS, "--mode-change", "truncate"])
            .expect("decode args should parse");

        let Command::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.frames, [VOLTS]);
        assert_eq!(args.mode_change, ModeChange::Truncate);
    }

    #[test]
    fn rejects_unknown_mode_change() {
        let err = Cli::try_parse_from(["bm257s", "decode", VOLTS, "--mode-change", "maybe"])
            .expect_err("unknown mode should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_frames_with_file() {
        let err = Cli::try_parse_from(["bm257s", "decode", VOLTS, "--file", "frames.log"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn decode_needs_input() {
        let err = Cli::try_parse_from(["bm257s", "decode"]).expect_err("no frames should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bm257s", "ports", "--format", "json", "--log-level", "off"])
            .expect("global flags should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.log_level, LogLevel::Off));
        assert!(matches!(cli.command, Command::Ports(_)));
    }
}
