use chrono::NaiveDate;
use t3ticket::listing::list_tickets;
use t3ticket::TicketFilter;
use t3ticket_db::TicketDb;
use t3ticket_protocol::{NewTicket, StatusChange, TicketStatus};

fn new_ticket(name: &str, transport: &str, user_type: &str) -> NewTicket {
    NewTicket {
        user_type: user_type.into(),
        transport: transport.into(),
        reason: "meeting".into(),
        full_name: name.into(),
        tc_no: "1".into(),
        phone: "2".into(),
        email: "x@example.org".into(),
        origin: "Ankara".into(),
        destination: "Van".into(),
        travel_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        ..NewTicket::default()
    }
}

async fn seeded() -> TicketDb {
    let db = TicketDb::open_in_memory().await.unwrap();
    db.create_ticket(new_ticket("Ayse Yilmaz", "plane", "staff"))
        .await
        .unwrap();
    let mehmet = db
        .create_ticket(new_ticket("Mehmet Demir", "bus", "student"))
        .await
        .unwrap();
    db.create_ticket(new_ticket("Zeynep Kaya", "plane", "student"))
        .await
        .unwrap();
    // Timestamps are millisecond precision.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.apply_status(
        &mehmet.tracking_code,
        StatusChange::Ticket {
            pnr_code: "XK92PQ".into(),
            purchased_by: None,
        },
    )
    .await
    .unwrap();
    db
}

fn names(tickets: &[t3ticket_protocol::TicketRecord]) -> Vec<&str> {
    tickets.iter().map(|t| t.full_name.as_str()).collect()
}

#[tokio::test]
async fn test_empty_filter_lists_everything_recent_first() {
    let db = seeded().await;
    let tickets = list_tickets(&db, &TicketFilter::default()).await.unwrap();

    assert_eq!(tickets.len(), 3);
    assert_eq!(tickets[0].full_name, "Mehmet Demir");
}

#[tokio::test]
async fn test_status_filter() {
    let db = seeded().await;
    let filter = TicketFilter {
        status: Some(TicketStatus::Pending),
        ..Default::default()
    };
    let mut pending = names(&list_tickets(&db, &filter).await.unwrap())
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    pending.sort();
    assert_eq!(pending, vec!["Ayse Yilmaz", "Zeynep Kaya"]);
}

#[tokio::test]
async fn test_search_matches_name_code_and_pnr() {
    let db = seeded().await;
    let search = |text: &str| TicketFilter {
        search: Some(text.into()),
        ..Default::default()
    };

    let by_name = list_tickets(&db, &search("  yilmaz ")).await.unwrap();
    assert_eq!(names(&by_name), vec!["Ayse Yilmaz"]);

    let by_pnr = list_tickets(&db, &search("xk92")).await.unwrap();
    assert_eq!(names(&by_pnr), vec!["Mehmet Demir"]);

    let code = by_pnr[0].tracking_code.as_str().to_lowercase();
    let by_code = list_tickets(&db, &search(&code)).await.unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].tracking_code, by_pnr[0].tracking_code);

    assert!(list_tickets(&db, &search("nobody")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_filters_combine() {
    let db = seeded().await;
    let filter = TicketFilter {
        status: Some(TicketStatus::Pending),
        transport: Some("PLANE".into()),
        user_type: Some("student".into()),
        search: None,
    };
    let tickets = list_tickets(&db, &filter).await.unwrap();
    assert_eq!(names(&tickets), vec!["Zeynep Kaya"]);
}
