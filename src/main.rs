#![warn(clippy::all)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use bucket_view::{
    Arguments, BucketViewError, BucketViewResult, BucketViewApp, PolarsEngine, Session,
};
use std::sync::Arc;
use tracing::error;

/*
cargo fmt
cargo test -- --nocapture
cargo test -- --show-output tests_engine
cargo run -- --help
cargo run -- --root /data/store --bucket sales
BUCKET_VIEW_TOKEN=secret cargo run -- --root /data/store --bucket sales --print-tree
cargo doc --open
cargo b -r && cargo install --path=.
*/

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    // Initialize the tracing subscriber for logging.
    // Use RUST_LOG environment variable to set logging level.  eg `export RUST_LOG=info`
    tracing_subscriber::fmt::init();

    let args = Arguments::build();

    if args.print_tree {
        if let Err(err) = print_tree(&args) {
            error!("Failed to print the bucket tree: {err}");
            eprintln!("{err}");
            std::process::exit(1);
        }
        return Ok(());
    }

    let native_options = eframe::NativeOptions {
        centered: true,
        persist_window: true,
        vsync: true,
        viewport: egui::ViewportBuilder::default().with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Bucket View",
        native_options,
        Box::new(move |creation_context| {
            let app = BucketViewApp::new(creation_context, &args)
                .inspect_err(|err| error!("Failed to initialize BucketViewApp: {err}"))?;
            Ok(Box::new(app))
        }),
    )
}

/// Headless mode: runs discovery once and writes the tree markup to stdout.
fn print_tree(args: &Arguments) -> BucketViewResult<()> {
    let token = args.token.as_deref().ok_or(BucketViewError::MissingToken)?;
    let bucket = args.bucket.as_deref().ok_or(BucketViewError::MissingBucket)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let engine = PolarsEngine::connect(token, &args.root)?;
    let session = Session::new(Arc::new(engine), bucket)?;

    let tree = runtime.block_on(session.list_tree())?;
    println!("{}", tree.to_markup());
    Ok(())
}
