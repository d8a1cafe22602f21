use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the protocol engine against a simulated device.
    Serve(ServeArgs),
    /// Build an incoming wire frame.
    Encode(EncodeArgs),
    /// Decode a response byte stream.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial device or file to read commands from and write responses to.
    /// Default: stdin and stdout.
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Simulated device configuration (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Append checksums to text responses.
    #[arg(long)]
    pub checksum: bool,
    /// Number of simulated axes.
    #[arg(long, value_name = "N")]
    pub axes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub command: EncodeCommand,
}

#[derive(Subcommand, Debug)]
pub enum EncodeCommand {
    /// A text command line, such as "p 0 1.5".
    Text {
        line: String,
        /// Use a length-prefixed frame instead of newline termination.
        #[arg(long)]
        fixed: bool,
    },
    /// Binary per-axis current (`C`) or coupled position (`P`) message.
    Current {
        #[arg(allow_negative_numbers = true)]
        i0: f32,
        #[arg(allow_negative_numbers = true)]
        i1: f32,
        #[arg(long, value_enum, ignore_case = true, default_value = "c")]
        tag: FrameTag,
    },
    /// Binary coupled setpoint-and-gains (`S`) message.
    Coupled {
        #[arg(allow_negative_numbers = true)]
        sp_theta: f32,
        #[arg(allow_negative_numbers = true)]
        kp_theta: f32,
        #[arg(allow_negative_numbers = true)]
        kd_theta: f32,
        #[arg(allow_negative_numbers = true)]
        sp_gamma: f32,
        #[arg(allow_negative_numbers = true)]
        kp_gamma: f32,
        #[arg(allow_negative_numbers = true)]
        kd_gamma: f32,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrameTag {
    C,
    P,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Response stream to decode. Default: stdin.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Expect and verify `*N` checksums on text responses.
    #[arg(long)]
    pub checksum: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
