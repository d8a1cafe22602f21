mod cmd;
mod exit;
mod logging;
mod output;
mod sim;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "motorline", version, about = "ASCII motor-control protocol tool")]
struct Cli {
    /// How encode/decode results are printed; defaults to a table on a terminal.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Diagnostics format on stderr.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Diagnostics level on stderr; MOTORLINE_LOG takes precedence when set.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let code = cmd::run(cli.command, format).unwrap_or_else(|err| {
        eprintln!("motorline: {err}");
        err.code
    });
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{EncodeCommand, FrameTag};

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "motorline",
            "serve",
            "--device",
            "/dev/ttyACM0",
            "--checksum",
            "--axes",
            "4",
        ])
        .expect("serve args should parse");

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert!(args.checksum);
        assert_eq!(args.axes, Some(4));
    }

    #[test]
    fn parses_encode_current_with_tag() {
        let cli = Cli::try_parse_from([
            "motorline",
            "--format",
            "raw",
            "encode",
            "current",
            "1.5",
            "-2",
            "--tag",
            "p",
        ])
        .expect("encode args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Raw));
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert!(matches!(
            args.command,
            EncodeCommand::Current {
                tag: FrameTag::P,
                ..
            }
        ));
    }

    #[test]
    fn coupled_requires_six_values() {
        let err = Cli::try_parse_from(["motorline", "encode", "coupled", "1", "2", "3"])
            .expect_err("missing values should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_log_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "motorline",
            "version",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .expect("global flags should parse");
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
