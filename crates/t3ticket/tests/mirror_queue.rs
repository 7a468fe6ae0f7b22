use std::sync::Arc;

use chrono::NaiveDate;
use t3ticket::{Intake, MirrorQueue, StatusMirror};
use t3ticket_db::TicketDb;
use t3ticket_protocol::{NewTicket, StatusChange, CHANGE_HEADERS, TICKET_HEADERS};
use t3ticket_sheets::{
    InjectedFailure, MemorySheets, RetryPolicy, SheetCall, SheetSync, SyncTarget,
};

fn new_ticket(name: &str) -> NewTicket {
    NewTicket {
        user_type: "staff".into(),
        transport: "train".into(),
        reason: "meeting".into(),
        full_name: name.into(),
        tc_no: "12345678901".into(),
        phone: "555".into(),
        email: "a@example.org".into(),
        origin: "Ankara".into(),
        destination: "Izmir".into(),
        travel_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        ..NewTicket::default()
    }
}

fn seeded_store() -> Arc<MemorySheets> {
    Arc::new(
        MemorySheets::new()
            .with_sheet("Tickets", [TICKET_HEADERS.to_vec()])
            .with_sheet("Changes", [CHANGE_HEADERS.to_vec()]),
    )
}

fn engine(store: &Arc<MemorySheets>) -> Arc<SheetSync> {
    let sync = SheetSync::new(
        store.clone(),
        SyncTarget::tickets("Tickets"),
        SyncTarget::changes("Changes"),
    )
    .with_retry(RetryPolicy::none(), RetryPolicy::none());
    Arc::new(sync)
}

fn column(name: &str) -> usize {
    TICKET_HEADERS.iter().position(|h| *h == name).unwrap()
}

#[tokio::test]
async fn test_submit_status_and_change_are_mirrored() {
    let store = seeded_store();
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db.clone(), queue.handle());

    let ticket = intake.submit_ticket(new_ticket("Ayse")).await.unwrap();
    let code = ticket.tracking_code.clone();
    intake
        .set_status(
            &code,
            StatusChange::Ticket {
                pnr_code: "XK92PQ".into(),
                purchased_by: None,
            },
        )
        .await
        .unwrap();
    intake.request_change(&code, "date moved").await.unwrap();
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.failed, 0);

    let tickets = store.data_rows("Tickets");
    assert_eq!(tickets.len(), 1, "status change must update, not append");
    assert_eq!(tickets[0][column("tracking_code")], code.as_str());
    assert_eq!(tickets[0][column("status")], "ticketed");
    assert_eq!(tickets[0][column("pnr_code")], "XK92PQ");

    let changes = store.data_rows("Changes");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0][0], code.as_str());
    assert_eq!(changes[0][1], "date moved");
    assert!(!changes[0][2].is_empty());
}

#[tokio::test]
async fn test_mirror_failure_keeps_database_write() {
    let store = seeded_store();
    store.fail_next(InjectedFailure::BadRequest, 10);
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db.clone(), queue.handle());

    let ticket = intake.submit_ticket(new_ticket("Mehmet")).await.unwrap();
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.succeeded, 0);
    assert_eq!(stats.failed, 1);

    assert!(store.data_rows("Tickets").is_empty());
    let stored = db.require_ticket(&ticket.tracking_code).await.unwrap();
    assert_eq!(stored, ticket);
}

#[tokio::test]
async fn test_failed_job_does_not_stop_the_worker() {
    let store = seeded_store();
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db, queue.handle());

    // Only the first job's header read fails.
    store.fail_next(InjectedFailure::BadRequest, 1);
    intake.submit_ticket(new_ticket("A")).await.unwrap();
    intake.submit_ticket(new_ticket("B")).await.unwrap();
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);
    let rows = store.data_rows("Tickets");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column("full_name")], "B");
}

#[tokio::test]
async fn test_jobs_for_one_key_are_serialized() {
    let store = seeded_store();
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db, queue.handle());

    let code = intake
        .submit_ticket(new_ticket("A"))
        .await
        .unwrap()
        .tracking_code;
    for _ in 0..3 {
        intake
            .set_status(
                &code,
                StatusChange::Reject {
                    reason: "budget".into(),
                    rejected_by: None,
                },
            )
            .await
            .unwrap();
        intake.set_status(&code, StatusChange::Reset).await.unwrap();
    }
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.succeeded, 7);
    let rows = store.data_rows("Tickets");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column("status")], "pending");
}

#[tokio::test]
async fn test_status_patch_writes_only_status_cells() {
    let store = seeded_store();
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db, queue.handle()).with_status_mirror(StatusMirror::Patch);

    let code = intake
        .submit_ticket(new_ticket("A"))
        .await
        .unwrap()
        .tracking_code;
    intake
        .set_status(
            &code,
            StatusChange::Reject {
                reason: "budget".into(),
                rejected_by: Some("lead".into()),
            },
        )
        .await
        .unwrap();
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.succeeded, 2);

    let batch = store
        .calls()
        .into_iter()
        .find_map(|call| match call {
            SheetCall::BatchUpdate { ranges } => Some(ranges),
            _ => None,
        })
        .expect("status patch issues a batch update");
    assert_eq!(batch.len(), 6);

    let rows = store.data_rows("Tickets");
    assert_eq!(rows[0][column("status")], "rejected");
    assert_eq!(rows[0][column("rejection_reason")], "budget");
    assert_eq!(rows[0][column("full_name")], "A");
}

#[tokio::test]
async fn test_status_patch_without_row_is_counted_as_failure() {
    let store = seeded_store();
    let db = TicketDb::open_in_memory().await.unwrap();
    let code = db.create_ticket(new_ticket("A")).await.unwrap().tracking_code;

    let queue = MirrorQueue::start(engine(&store));
    let intake = Intake::new(db.clone(), queue.handle()).with_status_mirror(StatusMirror::Patch);
    intake.set_status(&code, StatusChange::Reset).await.unwrap_err();
    intake
        .set_status(
            &code,
            StatusChange::Ticket {
                pnr_code: "P1".into(),
                purchased_by: None,
            },
        )
        .await
        .unwrap();
    drop(intake);

    let stats = queue.shutdown().await;
    assert_eq!(stats.failed, 1);
    assert!(store.data_rows("Tickets").is_empty());
    assert_eq!(
        db.require_ticket(&code).await.unwrap().pnr_code.as_deref(),
        Some("P1")
    );
}

#[tokio::test]
async fn test_disabled_queue_still_commits() {
    let db = TicketDb::open_in_memory().await.unwrap();
    let queue = MirrorQueue::disabled();
    let intake = Intake::new(db.clone(), queue.handle());

    let ticket = intake.submit_ticket(new_ticket("A")).await.unwrap();
    drop(intake);

    assert_eq!(queue.shutdown().await, Default::default());
    assert!(db.get_ticket(&ticket.tracking_code).await.unwrap().is_some());
}
