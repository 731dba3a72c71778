//! ringwatch daemon entry point.

use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::Notify;

use ringwatch::config::Config;
use ringwatch::controller::{ClusterController, ControllerOptions};
use ringwatch::render;
use ringwatch::source::HttpClusterSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting ringwatch with config: {:?}", cfg);

    let source = HttpClusterSource::new(&cfg.endpoint, cfg.request_timeout());
    info!("Watching {}", source.url());
    let controller = Arc::new(ClusterController::new(
        Arc::new(source),
        ControllerOptions::from(&cfg),
    ));

    // Renderer
    let mut view_rx = controller.subscribe();
    let render_handle = tokio::spawn(async move {
        while view_rx.changed().await.is_ok() {
            let view = view_rx.borrow_and_update().clone();
            println!("{}", render::render(&view));
        }
    });

    // Commands on stdin: r = reload, c = clear plan, q = quit
    let quit = Arc::new(Notify::new());
    let commands_handle = tokio::spawn({
        let controller = Arc::clone(&controller);
        let quit = Arc::clone(&quit);
        async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let result = match line.trim() {
                    "r" => controller.reload().await.map(|_| ()),
                    "c" => controller.clear_plan().await.map(|_| ()),
                    "q" => {
                        quit.notify_one();
                        break;
                    }
                    "" => continue,
                    other => {
                        warn!("Unknown command {:?} (r = reload, c = clear plan, q = quit)", other);
                        continue;
                    }
                };
                if let Err(e) = result {
                    error!("Command {:?} failed: {}", line.trim(), e);
                }
            }
        }
    });

    controller.activate().await;

    // Graceful Shutdown
    tokio::select! {
        res = signal::ctrl_c() => match res {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        },
        _ = quit.notified() => info!("Quit requested, shutting down..."),
    }

    controller.cancel_interval();
    render_handle.abort();
    commands_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}
