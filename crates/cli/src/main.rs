//! `receive-probe`: Ferry's command-line composition root.
//!
//! Wires the workspace together for one request body:
//!
//! 1. **Parse configuration** from flags and the optional `--config` JSON file
//!    (`{ "receive": ReceiveConfig, "json": JsonConfig }`).
//! 2. **Wire observability** by installing a `tracing-subscriber` (pretty or
//!    JSON) on stderr, filtered by `RUST_LOG`.
//! 3. **Construct the pipeline** with the default transformations, plus
//!    `DoubleReceive` in the Before phase when requested.
//! 4. **Probe** by building one call over the input and receiving its body
//!    `--attempts` times, printing one JSON report per attempt to stdout.

mod config;
mod logging;
mod report;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use json_client::{JsonFeature, JsonSerializer};
use receive::{ApplicationCall, ByteReadChannel, DoubleReceive, ReceivePhase, ReceivePipeline};
use tracing::{debug, info};

use crate::config::ProbeConfig;
use crate::logging::LogFormat;
use crate::report::BodyKind;

#[derive(Debug, Parser)]
#[command(name = "receive-probe", version, about = "Receive a request body through the Ferry pipeline")]
struct Args {
    /// Content-Type header of the simulated request.
    #[arg(long)]
    content_type: Option<String>,

    /// Shape to receive the body as.
    #[arg(long = "as", value_enum, default_value = "text")]
    kind: BodyKind,

    /// Body file; stdin when absent.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Number of receive attempts on the same call.
    #[arg(long, default_value_t = 1)]
    attempts: u32,

    /// Install DoubleReceive so every attempt sees the body.
    #[arg(long)]
    double_receive: bool,

    /// Use the nullable receive form: failed conversions report `null`.
    #[arg(long)]
    nullable: bool,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_format);

    let config = ProbeConfig::load(args.config.as_deref())?;
    let feature = JsonFeature::new(config.json.clone());

    let mut pipeline = ReceivePipeline::with_defaults(config.receive.clone());
    if args.double_receive {
        pipeline.intercept(ReceivePhase::Before, DoubleReceive::new());
    }
    info!(pipeline = ?pipeline, "receive pipeline ready");

    let mut call = build_call(&args, Arc::new(pipeline)).await?;
    for n in 1..=args.attempts {
        let report = report::attempt(&mut call, n, args.kind, args.nullable, &feature).await;
        let body = feature
            .serializer()
            .write_with(&report, feature.config().content_type.clone())?;
        debug!(attempt = n, content_type = %body.content_type(), "writing report");
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(body.bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    Ok(())
}

async fn build_call(args: &Args, pipeline: Arc<ReceivePipeline>) -> anyhow::Result<ApplicationCall> {
    let mut request = http::Request::post("/receive-probe");
    if let Some(content_type) = &args.content_type {
        request = request.header(http::header::CONTENT_TYPE, content_type.as_str());
    }
    let (head, ()) = request
        .body(())
        .context("invalid request head")?
        .into_parts();

    let body = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            ByteReadChannel::from_reader(file)
        }
        None => ByteReadChannel::from_reader(tokio::io::stdin()),
    };
    Ok(ApplicationCall::new(head, body, pipeline))
}
