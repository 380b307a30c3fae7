//! CLI argument definitions using clap derive macros.

use std::net::IpAddr;

use clap::Parser;

/// Relay browser requests to the Stack Exchange Data Explorer.
///
/// Logs in on behalf of the caller, hands back the session cookie and runs or
/// saves queries with it. Settings are read from the environment (and `.env`).
#[derive(Parser, Debug)]
#[command(name = "sede-proxy")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Listen port (overrides PORT)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
}
