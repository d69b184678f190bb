mod args;

use args::{get_log_level_filter, parse_args};
use dash_player::{DashEvent, DashPlayer};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[tokio::main]
async fn main() {
    let args = parse_args();

    // Build the FmtSubscriber layer
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_filter(get_log_level_filter(&args));
    let subscriber = tracing_subscriber::registry().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global default subscriber");

    info!("Starting DASH client");
    info!("{:?}", args);

    let output = match tokio::fs::File::create(&args.output).await {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot open output {}: {}", args.output.display(), e);
            std::process::exit(2);
        }
    };

    let callback = |event: DashEvent| match event {
        DashEvent::QualityChanged { from, to, representation_id, bandwidth } => {
            info!("Quality {} -> {} ({} @ {} bps)", from, to, representation_id, bandwidth);
        }
        DashEvent::DownloadError { url, reason, consecutive_failures } => {
            error!("Error downloading {} ({} in a row): {}", url, consecutive_failures, reason);
        }
        _ => {}
    };
    let player = DashPlayer::new(args.player_config()).on_event(Arc::new(callback));

    let token = player.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing current segment");
            token.cancel();
        }
    });

    let summary = player.run(output).await;
    let report = summary.report();

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
    }

    if summary.is_complete() {
        info!(
            "Download completed: {} segments, {} bytes written to {}",
            report.segments_written,
            report.bytes_written,
            args.output.display()
        );
        if let Some(transfers) = &report.transfers {
            info!(
                "Latency avg {:.2} ms (min {:.2}, max {:.2}), jitter {:.2} ms, throughput {:.2} Mbps",
                transfers.mean_latency_ms,
                transfers.min_latency_ms,
                transfers.max_latency_ms,
                transfers.jitter_ms,
                transfers.throughput_bps / 1e6
            );
        }
    } else {
        error!(
            "Download aborted after {} segments ({} bytes): {}",
            report.segments_written,
            report.bytes_written,
            report.error.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
}
