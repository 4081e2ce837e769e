use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::error;
use ulid::Ulid;

use crate::engine::{Engine, EngineError, StatusCode};
use crate::lecture::{Lecture, Semester};
use crate::model::{BookingRequest, Location, Reservation, ReservationDetails, WeekGrid};
use crate::observability::{self, REQUEST_DURATION_SECONDS, REQUESTS_TOTAL};

/// One operation, as a JSON object tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateReservation(BookingRequest),
    CancelReservation {
        requester: String,
        id: Ulid,
        #[serde(default)]
        reason: Option<String>,
    },
    ModifyReservation {
        id: Ulid,
        #[serde(flatten)]
        details: ReservationDetails,
    },
    ApproveReservation {
        id: Ulid,
    },
    DeleteReservation {
        id: Ulid,
    },
    GetReservation {
        id: Ulid,
    },
    ListPending,
    ListByRequester {
        requester: String,
    },
    WeekByRequester {
        requester: String,
    },
    WeekByRoom(Location),
    Backup {
        path: PathBuf,
    },
    Restore {
        path: PathBuf,
    },
    UpsertLecture(Lecture),
    DeleteLecture {
        id: String,
    },
    LecturesByRoom {
        year: i32,
        semester: Semester,
        #[serde(flatten)]
        location: Location,
    },
    LecturesByTerm {
        year: i32,
        semester: Semester,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub code: u16,
    #[serde(flatten)]
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Message(String),
    Reservation(Reservation),
    Reservations(Vec<Reservation>),
    Grid(WeekGrid),
    Success(bool),
    Lecture(Lecture),
    Lectures(Vec<Lecture>),
}

impl Response {
    fn ok(body: Body) -> Self {
        Self {
            code: StatusCode::Ok.as_u16(),
            body,
        }
    }

    fn message(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_u16(),
            body: Body::Message(message.into()),
        }
    }

    fn success(ok: bool) -> Self {
        let code = if ok { StatusCode::Ok } else { StatusCode::Internal };
        Self {
            code: code.as_u16(),
            body: Body::Success(ok),
        }
    }
}

impl From<EngineError> for Response {
    fn from(e: EngineError) -> Self {
        let code = e.status_code();
        if code == StatusCode::Internal {
            error!("request failed: {e}");
        }
        Response::message(code, e.to_string())
    }
}

/// Parse one JSON request line and execute it. Malformed input is a 400.
pub async fn execute_line(engine: &Engine, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(req) => execute(engine, req).await,
        Err(e) => {
            metrics::counter!(REQUESTS_TOTAL, "op" => "unparsed", "code" => "400").increment(1);
            Response::message(StatusCode::BadRequest, format!("malformed request: {e}"))
        }
    }
}

pub async fn execute(engine: &Engine, req: Request) -> Response {
    let op = observability::op_label(&req);
    let start = Instant::now();
    let resp = dispatch(engine, req).await.unwrap_or_else(Response::from);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "op" => op).record(start.elapsed().as_secs_f64());
    metrics::counter!(REQUESTS_TOTAL, "op" => op, "code" => resp.code.to_string()).increment(1);
    resp
}

async fn dispatch(engine: &Engine, req: Request) -> Result<Response, EngineError> {
    match req {
        Request::CreateReservation(booking) => {
            let r = engine.create_reservation(booking).await?;
            Ok(Response::ok(Body::Reservation(r)))
        }
        Request::CancelReservation { requester, id, reason } => {
            engine.cancel_reservation(&requester, id, reason).await?;
            Ok(Response::ok(Body::Message(format!("reservation {id} cancelled"))))
        }
        Request::ModifyReservation { id, details } => {
            engine.modify_reservation(id, details).await?;
            Ok(Response::ok(Body::Message(format!("reservation {id} modified"))))
        }
        Request::ApproveReservation { id } => {
            engine.approve_reservation(id).await?;
            Ok(Response::ok(Body::Message(format!("reservation {id} approved"))))
        }
        Request::DeleteReservation { id } => {
            engine.delete_reservation(id).await?;
            Ok(Response::ok(Body::Message(format!("reservation {id} deleted"))))
        }
        Request::GetReservation { id } => {
            let r = engine.get_reservation(id).await?;
            Ok(Response::ok(Body::Reservation(r)))
        }
        Request::ListPending => Ok(Response::ok(Body::Reservations(engine.pending_reservations().await))),
        Request::ListByRequester { requester } => Ok(Response::ok(Body::Reservations(
            engine.reservations_by_requester(&requester).await,
        ))),
        Request::WeekByRequester { requester } => {
            Ok(Response::ok(Body::Grid(engine.week_by_requester(&requester).await)))
        }
        Request::WeekByRoom(location) => Ok(Response::ok(Body::Grid(engine.week_by_room(&location).await))),
        Request::Backup { path } => Ok(Response::success(engine.backup(&path).await)),
        Request::Restore { path } => Ok(Response::success(engine.restore(&path).await)),
        Request::UpsertLecture(lecture) => {
            let saved = engine.upsert_lecture(lecture).await?;
            Ok(Response::ok(Body::Lecture(saved)))
        }
        Request::DeleteLecture { id } => {
            engine.delete_lecture(&id).await?;
            Ok(Response::ok(Body::Message(format!("lecture {} deleted", id.trim()))))
        }
        Request::LecturesByRoom {
            year,
            semester,
            location,
        } => Ok(Response::ok(Body::Lectures(
            engine.lectures_by_room(year, semester, &location).await,
        ))),
        Request::LecturesByTerm { year, semester } => {
            Ok(Response::ok(Body::Lectures(engine.lectures_by_term(year, semester).await)))
        }
    }
}
