//! chainsync CLI: follow a chain-sync endpoint and inspect its payloads.
//!
//! # Commands
//! ```text
//! chainsync tail    --url <ws> [--pipeline N] [--count N] [--legacy] [--points JSON] [--retries N]
//! chainsync decode  --file <path> [--format json|cbor-point|attribute-point]
//! chainsync enough  --have <json> --want <json>
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod cmd_decode;
mod cmd_enough;
mod cmd_tail;
mod logging;

use logging::LogConfig;

#[derive(Parser, Debug)]
#[command(
    name = "chainsync",
    about = "Chain-sync client: tail a node, decode saved frames, check values",
    long_about = "
chainsync follows a chain-sync WebSocket endpoint, speaking either the
current JSON-RPC protocol or the legacy JSON-WSP one, and prints every
response in the current shape.

ENVIRONMENT VARIABLES:
  CHAINSYNC_URL   default endpoint for `tail --url`
  RUST_LOG        overrides --log-level
",
    version
)]
struct Cli {
    /// Log filter, e.g. "info" or "info,chainsync_ws=debug"
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream responses from a chain-sync endpoint
    Tail {
        /// WebSocket endpoint
        #[arg(long, env = "CHAINSYNC_URL")]
        url: String,
        /// Next-block requests kept in flight
        #[arg(long, default_value_t = 50)]
        pipeline: usize,
        /// Stop after this many responses
        #[arg(long)]
        count: Option<u64>,
        /// Speak the legacy JSON-WSP protocol
        #[arg(long)]
        legacy: bool,
        /// Intersection candidates as a JSON array, e.g. '["origin"]'
        #[arg(long)]
        points: Option<String>,
        /// Reconnect this many times after a connection failure
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Print each response as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Decode a saved payload and print it in the current shape
    Decode {
        /// Path to the payload
        #[arg(short, long)]
        file: String,
        /// Payload encoding
        #[arg(long, value_enum, default_value_t = DecodeFormat::Json)]
        format: DecodeFormat,
    },

    /// Check whether one value covers another
    Enough {
        /// Value on hand, as JSON
        #[arg(long)]
        have: String,
        /// Value required, as JSON
        #[arg(long)]
        want: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DecodeFormat {
    /// A response frame (either protocol)
    Json,
    /// A CBOR-encoded point
    CborPoint,
    /// An attribute-value point, as JSON
    AttributePoint,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&LogConfig {
        level: cli.log_level,
        json: cli.json_logs,
    });

    match cli.command {
        Commands::Tail { url, pipeline, count, legacy, points, retries, json } => {
            cmd_tail::run(cmd_tail::TailArgs {
                url,
                pipeline,
                count,
                legacy,
                points,
                retries,
                json,
            })
            .await
        }

        Commands::Decode { file, format } => cmd_decode::run(&file, format),

        Commands::Enough { have, want } => cmd_enough::run(&have, &want),
    }
}
