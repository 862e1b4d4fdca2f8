use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use varsieve::{
    Config, IntervalList, VariantInput,
    config::{Command, FilterArgs, ServeArgs},
    filter::{cancel_pair, filter_input},
    handlers::{AppState, create_router},
    sink::ResultSink,
    storage::LocalStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match config.command {
        Command::Filter(args) => run_filter(args).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_filter(args: FilterArgs) -> anyhow::Result<()> {
    // Reject bad selections before touching the interval list.
    let input = VariantInput::from_selection(&args.variants)?;
    let intervals = Arc::new(IntervalList::load(&args.intervals, Some(args.max_interval_bytes)).await?);
    let options = args.flags.filter_options();

    let output_path = args.output_path(&input.display_name());
    let sink = ResultSink::new(BufWriter::new(File::create(&output_path)?));

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            handle.cancel();
        }
    });

    let outcome = match filter_input(&input, intervals, &options, Some(signal), sink).await {
        Ok((report, sink)) => sink.finish().map(|_| report),
        Err(e) => Err(e),
    };

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            // No partial artifacts.
            let _ = std::fs::remove_file(&output_path);
            return Err(e.into());
        }
    };

    for warning in &report.warnings {
        tracing::warn!(%warning, "filter warning");
    }
    tracing::info!(
        output = %output_path.display(),
        headers = report.headers,
        emitted = report.emitted,
        dropped = report.dropped,
        warnings = report.warnings.len(),
        "filtered VCF written"
    );
    Ok(())
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let storage = Arc::new(LocalStorage::new(args.data_dir.clone()));

    let state = AppState {
        storage,
        options: args.flags.filter_options(),
        max_payload: args.max_payload,
    };

    let app = create_router(state);
    let app = if args.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr = args.bind_addr();
    tracing::info!("Starting varsieve server on {}", addr);
    tracing::info!("Data directory: {:?}", args.data_dir);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
