use std::net::SocketAddr;

use crate::command::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests executed. Labels: op, code.
pub const REQUESTS_TOTAL: &str = "roombook_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "roombook_request_duration_seconds";

/// Counter: booking requests refused by the admission pipeline. Labels: stage.
pub const ADMISSION_REJECTIONS_TOTAL: &str = "roombook_admission_rejections_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: full-file store rewrite duration in seconds.
pub const STORE_FLUSH_DURATION_SECONDS: &str = "roombook_store_flush_duration_seconds";

/// Gauge: records currently held by the store, any status.
pub const STORE_RECORDS: &str = "roombook_store_records";

/// Gauge: lectures currently on the timetable.
pub const LECTURE_RECORDS: &str = "roombook_lecture_records";

/// Counter: notifications dropped because the outbound queue was full or closed.
pub const NOTIFICATIONS_DROPPED_TOTAL: &str = "roombook_notifications_dropped_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Request variant to a short label for metrics.
pub fn op_label(req: &Request) -> &'static str {
    match req {
        Request::CreateReservation(_) => "create_reservation",
        Request::CancelReservation { .. } => "cancel_reservation",
        Request::ModifyReservation { .. } => "modify_reservation",
        Request::ApproveReservation { .. } => "approve_reservation",
        Request::DeleteReservation { .. } => "delete_reservation",
        Request::GetReservation { .. } => "get_reservation",
        Request::ListPending => "list_pending",
        Request::ListByRequester { .. } => "list_by_requester",
        Request::WeekByRequester { .. } => "week_by_requester",
        Request::WeekByRoom(_) => "week_by_room",
        Request::Backup { .. } => "backup",
        Request::Restore { .. } => "restore",
        Request::UpsertLecture(_) => "upsert_lecture",
        Request::DeleteLecture { .. } => "delete_lecture",
        Request::LecturesByRoom { .. } => "lectures_by_room",
        Request::LecturesByTerm { .. } => "lectures_by_term",
    }
}
