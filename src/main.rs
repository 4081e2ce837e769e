use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{info, warn};

use roombook::capacity::RoomCapacityTable;
use roombook::command;
use roombook::config::Config;
use roombook::engine::Engine;
use roombook::lecture::LectureSchedule;
use roombook::limits::MAX_REQUEST_LINE_LEN;
use roombook::notify::{Inbox, NotifyHub};
use roombook::store::ReservationStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    roombook::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let capacity = Arc::new(RoomCapacityTable::load(&config.capacity_file)?);
    let store = Arc::new(ReservationStore::open(&config.store_file)?);
    let lectures = Arc::new(LectureSchedule::open(&config.lecture_file)?);

    let (hub, rx) = NotifyHub::new(config.notify_queue);
    let inbox = Arc::new(Inbox::new());
    tokio::spawn(roombook::notify::run_dispatcher(rx, inbox));

    let engine = Arc::new(Engine::new(store, capacity, Arc::new(hub)).with_lectures(lectures));

    if let Some(dir) = config.backup_dir.clone() {
        info!("  backups: {} every {:?}", dir.display(), config.backup_interval);
        tokio::spawn(roombook::backup::run_backup_scheduler(
            engine.clone(),
            dir,
            config.backup_interval,
        ));
    }

    info!("roombook ready");
    info!("  store: {}", config.store_file.display());
    info!("  capacity: {}", config.capacity_file.display());
    info!("  lectures: {}", config.lecture_file.display());
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let mut requests = FramedRead::new(tokio::io::stdin(), LinesCodec::new_with_max_length(MAX_REQUEST_LINE_LEN));
    let mut responses = FramedWrite::new(tokio::io::stdout(), LinesCodec::new());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            next = requests.next() => {
                let line = match next {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        // Oversized line or broken input.
                        warn!("unreadable request: {e}");
                        let resp = serde_json::json!({"code": 400, "message": format!("unreadable request: {e}")});
                        responses.send(resp.to_string()).await?;
                        continue;
                    }
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                let resp = command::execute_line(&engine, &line).await;
                responses.send(serde_json::to_string(&resp)?).await?;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("roombook stopped");
    Ok(())
}
