//! Settlement board against a mock ledger

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use tally_engine::ConfirmOutcome;
use tally_types::{BoardStatus, GroupId, RowStatus};

use crate::common::{group_json, mount_groups, start_ledger, tally_for, tx_json};

const A: (&str, &str) = ("u1", "A");
const B: (&str, &str) = ("u2", "B");
const C: (&str, &str) = ("u3", "C");

fn two_edges() -> serde_json::Value {
    json!([tx_json(A, B, 50.0), tx_json(C, B, 20.0)])
}

#[tokio::test]
async fn confirm_settles_and_refetches() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[A, B, C])])).await;

    // First fetch shows two edges; after settling, the ledger drops A -> B.
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_edges()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tx_json(C, B, 20.0)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/settlements/settle"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "groupId": "g1",
            "fromId": "u1",
            "toId": "u2",
            "amount": 50.0,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Settled"})))
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let board = tally.settlement_board();
    board.open(None).await.unwrap();
    assert_eq!(board.status(), BoardStatus::Outstanding(2));

    assert_eq!(board.confirm(0).await, ConfirmOutcome::Settled);
    assert_eq!(
        board.notice().unwrap().text(),
        "Successfully settled ₹50 between A and B"
    );
    let remaining = board.transactions();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].from, "C");
}

#[tokio::test]
async fn failed_confirm_surfaces_server_message_and_keeps_row() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[A, B])])).await;
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tx_json(A, B, 50.0)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/settlements/settle"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Nothing to settle"})),
        )
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let board = tally.settlement_board();
    board.open(None).await.unwrap();

    assert_eq!(board.confirm(0).await, ConfirmOutcome::Failed);
    let notice = board.notice().unwrap();
    assert!(notice.is_error());
    assert_eq!(notice.text(), "Nothing to settle");
    assert_eq!(board.transactions().len(), 1);
    assert_eq!(board.row_status(0), RowStatus::Pending);
}

#[tokio::test]
async fn second_confirm_while_first_in_flight_sends_nothing() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[A, B, C])])).await;
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_edges()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/settlements/settle"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let board = tally.settlement_board();
    board.open(None).await.unwrap();

    let first = {
        let board = board.clone();
        tokio::spawn(async move { board.confirm(0).await })
    };
    while !board.is_busy() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(board.confirm(1).await, ConfirmOutcome::Busy);
    assert_eq!(board.row_status(1), RowStatus::Pending);
    assert_eq!(first.await.unwrap(), ConfirmOutcome::Settled);
}

#[tokio::test]
async fn preferred_group_and_fully_settled_state() {
    let server = start_ledger().await;
    mount_groups(
        &server,
        json!([group_json("g1", "Trip", &[A, B]), group_json("g2", "Flat", &[A, C])]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/settlements/g2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "currency_symbol = \"$\"");
    let board = tally.settlement_board();
    board.open(Some(&GroupId::from("g2"))).await.unwrap();

    assert_eq!(board.selected_group(), Some(GroupId::from("g2")));
    assert_eq!(board.status(), BoardStatus::Settled);
}

#[tokio::test]
async fn unreachable_settlements_are_not_reported_settled() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[A, B])])).await;
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let board = tally.settlement_board();

    assert!(board.open(None).await.is_err());
    assert_eq!(board.status(), BoardStatus::Unavailable);
    assert!(board.transactions().is_empty());
}

#[tokio::test]
async fn reminder_stays_local() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[A, B])])).await;
    Mock::given(method("GET"))
        .and(path("/settlements/g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tx_json(A, B, 50.0)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/settlements/settle"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u2", "reminder_notice_secs = 3");
    let board = tally.settlement_board();
    board.open(None).await.unwrap();

    assert!(board.remind(0));
    assert_eq!(board.notice().unwrap().text(), "Reminder sent to A!");
}
