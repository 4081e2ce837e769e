use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Value, json};
use ulid::Ulid;

use roombook::capacity::RoomCapacityTable;
use roombook::clock::FixedClock;
use roombook::command::execute_line;
use roombook::engine::Engine;
use roombook::notify::{Inbox, NotifyHub};
use roombook::store::ReservationStore;

// ── Test infrastructure ──────────────────────────────────────

struct Harness {
    engine: Engine,
    inbox: Arc<Inbox>,
    dir: PathBuf,
}

const CAPACITY_FILE: &str = r#"{"rooms": [
    {"building": "Info Hall", "floor": 9, "room": "911", "capacity": 3},
    {"building": "Info Hall", "floor": "9", "room": "912", "capacity": 40}
]}"#;

fn harness(today: &str) -> Harness {
    let dir = std::env::temp_dir().join(format!("roombook_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let capacity_path = dir.join("room-capacity.json");
    std::fs::write(&capacity_path, CAPACITY_FILE).unwrap();

    let store = Arc::new(ReservationStore::open(dir.join("reservations.json")).unwrap());
    let capacity = Arc::new(RoomCapacityTable::load(&capacity_path).unwrap());
    let (hub, rx) = NotifyHub::new(64);
    let inbox = Arc::new(Inbox::new());
    tokio::spawn(roombook::notify::run_dispatcher(rx, inbox.clone()));
    let today = NaiveDate::parse_from_str(today, "%Y-%m-%d").unwrap();
    let engine = Engine::with_clock(store, capacity, Arc::new(hub), Arc::new(FixedClock(today)));
    Harness { engine, inbox, dir }
}

impl Harness {
    async fn call(&self, request: Value) -> Value {
        let resp = execute_line(&self.engine, &request.to_string()).await;
        serde_json::to_value(resp).unwrap()
    }

    async fn book(&self, requester: &str, room: &str, date: &str, start: &str, end: &str) -> Value {
        self.call(json!({
            "op": "create_reservation",
            "requester": requester,
            "location": {"building": "Info Hall", "floor": "9", "room": room},
            "date": date,
            "start_time": start,
            "end_time": end,
            "purpose": "team project",
            "accompanying_count": 2,
            "accompanying_students": [{"student_id": "s2", "name": "Lee"}]
        }))
        .await
    }

    /// Notifications are delivered by a background task.
    async fn wait_for_notifications(&self, requester: &str, n: usize) -> Vec<String> {
        for _ in 0..100 {
            if self.inbox.all(requester).len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.inbox.all(requester).into_iter().map(|n| n.title).collect()
    }
}

fn id_of(resp: &Value) -> String {
    resp["reservation"]["id"].as_str().unwrap().to_string()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_through_commands() {
    let h = harness("2025-01-10");

    let created = h.book("s2021001", "912", "2025-01-11", "10:00", "11:00").await;
    assert_eq!(created["code"], 200);
    assert_eq!(created["reservation"]["status"], "pending");
    assert_eq!(created["reservation"]["accompanying_count"], 2);
    let id = id_of(&created);

    let pending = h.call(json!({"op": "list_pending"})).await;
    assert_eq!(pending["reservations"].as_array().unwrap().len(), 1);

    let approved = h.call(json!({"op": "approve_reservation", "id": id})).await;
    assert_eq!(approved["code"], 200);
    let again = h.call(json!({"op": "approve_reservation", "id": id})).await;
    assert_eq!(again["code"], 409);

    let stranger = h
        .call(json!({"op": "cancel_reservation", "requester": "s9", "id": id}))
        .await;
    assert_eq!(stranger["code"], 403);

    let cancelled = h
        .call(json!({"op": "cancel_reservation", "requester": "S2021001", "id": id, "reason": "sick"}))
        .await;
    assert_eq!(cancelled["code"], 200);

    let fetched = h.call(json!({"op": "get_reservation", "id": id})).await;
    assert_eq!(fetched["reservation"]["status"], "cancelled");
    assert_eq!(fetched["reservation"]["cancellation_reason"], "sick");

    let titles = h.wait_for_notifications("s2021001", 3).await;
    assert_eq!(
        titles,
        ["Reservation requested", "Reservation approved", "Reservation cancelled"]
    );
    assert_eq!(h.inbox.take_unread("s2021001").len(), 3);
    assert!(h.inbox.take_unread("s2021001").is_empty());
}

#[tokio::test]
async fn capacity_from_file_limits_slot() {
    let h = harness("2025-01-10");
    assert_eq!(h.book("s1", "911", "2025-01-11", "10:00", "11:00").await["code"], 200);
    assert_eq!(h.book("s2", "911", "2025-01-11", "10:00", "11:00").await["code"], 200);

    let third = h.book("s3", "911", "2025-01-11", "10:00", "11:00").await;
    assert_eq!(third["code"], 403);
    assert!(third["message"].as_str().unwrap().contains("50%"));

    // Different start time is a different slot.
    assert_eq!(h.book("s3", "911", "2025-01-11", "11:00", "12:00").await["code"], 200);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let h = harness("2025-01-10");

    let resp = execute_line(&h.engine, "{not json").await;
    assert_eq!(resp.code, 400);

    let unknown_op = h.call(json!({"op": "launch_rocket"})).await;
    assert_eq!(unknown_op["code"], 400);

    let bad_id = h.call(json!({"op": "get_reservation", "id": "42"})).await;
    assert_eq!(bad_id["code"], 400);

    let bad_time = h.book("s1", "911", "2025-01-11", "25:00", "26:00").await;
    assert_eq!(bad_time["code"], 400);

    let bad_role = h.book("x1", "911", "2025-01-11", "10:00", "11:00").await;
    assert_eq!(bad_role["code"], 400);

    let missing = h.call(json!({"op": "get_reservation", "id": Ulid::new().to_string()})).await;
    assert_eq!(missing["code"], 404);
}

#[tokio::test]
async fn admin_modify_and_delete() {
    let h = harness("2025-01-10");
    let id = id_of(&h.book("p1", "912", "2025-01-10", "13:00", "16:00").await);

    let modified = h
        .call(json!({
            "op": "modify_reservation",
            "id": id,
            "location": {"building": "Info Hall", "floor": "9", "room": "911"},
            "date": "2025-01-12",
            "start_time": "09:00",
            "end_time": "10:00",
            "title": "Office hours"
        }))
        .await;
    assert_eq!(modified["code"], 200);

    let fetched = h.call(json!({"op": "get_reservation", "id": id})).await;
    assert_eq!(fetched["reservation"]["location"]["room"], "911");
    assert_eq!(fetched["reservation"]["title"], "Office hours");
    assert_eq!(fetched["reservation"]["requester"], "p1");

    let inverted = h
        .call(json!({
            "op": "modify_reservation",
            "id": id,
            "location": {"building": "Info Hall", "floor": "9", "room": "911"},
            "date": "2025-01-12",
            "start_time": "10:00",
            "end_time": "09:00"
        }))
        .await;
    assert_eq!(inverted["code"], 400);

    assert_eq!(h.call(json!({"op": "delete_reservation", "id": id})).await["code"], 200);
    let fetched = h.call(json!({"op": "get_reservation", "id": id})).await;
    assert_eq!(fetched["reservation"]["status"], "deleted");
    assert!(h.call(json!({"op": "list_pending"})).await["reservations"].as_array().unwrap().is_empty());
    assert_eq!(h.call(json!({"op": "delete_reservation", "id": id})).await["code"], 409);
}

#[tokio::test]
async fn listings_and_grids() {
    let h = harness("2025-01-10");
    h.book("s1", "911", "2025-01-11", "10:00", "11:00").await;
    h.book("s1", "912", "2025-01-13", "09:00", "10:00").await;
    h.book("s2", "911", "2025-01-11", "10:00", "11:00").await;

    let mine = h.call(json!({"op": "list_by_requester", "requester": "s1"})).await;
    let dates: Vec<_> = mine["reservations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, ["2025-01-11", "2025-01-13"]);

    let grid = h.call(json!({"op": "week_by_requester", "requester": "s1"})).await;
    assert_eq!(grid["grid"]["start"], "2025-01-10");
    assert_eq!(grid["grid"]["cells"].as_array().unwrap().len(), 7);
    assert_eq!(grid["grid"]["cells"][1][1].as_array().unwrap().len(), 1);
    assert_eq!(grid["grid"]["cells"][3][0].as_array().unwrap().len(), 1);

    let room = h
        .call(json!({"op": "week_by_room", "building": "Info Hall", "floor": "9", "room": "911"}))
        .await;
    assert_eq!(room["grid"]["cells"][1][1].as_array().unwrap().len(), 2);
    assert_eq!(room["grid"]["cells"][0].as_array().unwrap().len(), 13);
}

#[tokio::test]
async fn backup_and_restore_commands() {
    let h = harness("2025-01-10");
    let first = id_of(&h.book("s1", "911", "2025-01-11", "10:00", "11:00").await);
    let backup = h.dir.join("backup.json");

    let resp = h.call(json!({"op": "backup", "path": backup})).await;
    assert_eq!(resp, json!({"code": 200, "success": true}));

    h.book("s2", "911", "2025-01-12", "10:00", "11:00").await;
    let resp = h.call(json!({"op": "restore", "path": backup})).await;
    assert_eq!(resp["success"], true);

    let all = h.call(json!({"op": "list_pending"})).await;
    let ids: Vec<_> = all["reservations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![first]);

    let missing = h
        .call(json!({"op": "restore", "path": h.dir.join("nope.json")}))
        .await;
    assert_eq!(missing, json!({"code": 500, "success": false}));
}

#[tokio::test]
async fn store_survives_restart() {
    let h = harness("2025-01-10");
    let id = id_of(&h.book("s1", "911", "2025-01-11", "10:00", "11:00").await);
    h.call(json!({"op": "approve_reservation", "id": id})).await;

    let reopened = ReservationStore::open(h.dir.join("reservations.json")).unwrap();
    let all = reopened.find_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id.to_string(), id);
    assert_eq!(all[0].status, roombook::model::Status::Approved);
}

#[tokio::test]
async fn lecture_timetable_commands() {
    let h = harness("2025-01-10");
    let lecture = |id: &str, day: &str, start: &str, end: &str| {
        json!({
            "op": "upsert_lecture",
            "id": id,
            "title": "Operating Systems",
            "professor": "p2001",
            "location": {"building": "Info Hall", "floor": "9", "room": "911"},
            "day": day,
            "start_time": start,
            "end_time": end,
            "year": 2025,
            "semester": "first"
        })
    };

    let saved = h.call(lecture("OS1", "Tue", "09:00", "10:30")).await;
    assert_eq!(saved["code"], 200);
    assert_eq!(saved["lecture"]["id"], "OS1");

    assert_eq!(h.call(lecture("OS2", "Tue", "10:00", "11:00")).await["code"], 409);
    assert_eq!(h.call(lecture("OS2", "Tue", "10:30", "12:00")).await["code"], 200);
    assert_eq!(h.call(lecture("OS3", "Thursday", "11:00", "10:00")).await["code"], 400);

    let room = h
        .call(json!({
            "op": "lectures_by_room", "year": 2025, "semester": "first",
            "building": "Info Hall", "floor": "9", "room": "911"
        }))
        .await;
    let ids: Vec<_> = room["lectures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["OS1", "OS2"]);

    assert_eq!(h.call(json!({"op": "delete_lecture", "id": "OS1"})).await["code"], 200);
    assert_eq!(h.call(json!({"op": "delete_lecture", "id": "OS1"})).await["code"], 404);
    let term = h
        .call(json!({"op": "lectures_by_term", "year": 2025, "semester": "first"}))
        .await;
    assert_eq!(term["lectures"].as_array().unwrap().len(), 1);

    // Lectures and reservations do not share the overlap check.
    assert_eq!(h.book("s1", "911", "2025-01-14", "09:00", "10:00").await["code"], 200);
}
