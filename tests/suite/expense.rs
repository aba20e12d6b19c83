//! Add-expense form against a mock ledger

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use tally_types::{GroupId, UserId};

use crate::common::{group_json, mount_groups, start_ledger, tally_for};

const ALICE: (&str, &str) = ("u1", "Alice");
const BOB: (&str, &str) = ("u2", "Bob");
const CAROL: (&str, &str) = ("u3", "Carol");

fn created(amount: f64) -> serde_json::Value {
    json!({
        "_id": "e1",
        "group": "g1",
        "description": "Dinner",
        "amount": amount,
        "paidBy": "u1",
        "splitBetween": [],
    })
}

#[tokio::test]
async fn submitted_split_matches_preview() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[ALICE, BOB, CAROL])])).await;
    Mock::given(method("POST"))
        .and(path("/expenses"))
        .and(body_json(json!({
            "group": "g1",
            "description": "Dinner",
            "amount": 90.0,
            "paidBy": "u1",
            "splitBetween": [
                {"user": "u1", "share": 30.0},
                {"user": "u2", "share": 30.0},
                {"user": "u3", "share": 30.0},
            ],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created(90.0)))
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let mut form = tally.expense_form();
    form.refresh_groups().await.unwrap();
    form.set_amount("90");
    form.set_description("Dinner");
    assert_eq!(form.preview_share().as_deref(), Some("30.00"));

    form.submit().await.unwrap();
    assert!(!tally.notices().current().unwrap().is_error());
    assert!(form.amount().is_empty());
}

#[tokio::test]
async fn deselected_member_is_left_out() {
    let server = start_ledger().await;
    mount_groups(&server, json!([group_json("g1", "Trip", &[ALICE, BOB, CAROL])])).await;
    Mock::given(method("POST"))
        .and(path("/expenses"))
        .and(body_json(json!({
            "group": "g1",
            "description": "Dinner",
            "amount": 50.0,
            "paidBy": "u1",
            "splitBetween": [
                {"user": "u1", "share": 25.0},
                {"user": "u3", "share": 25.0},
            ],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created(50.0)))
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let mut form = tally.expense_form();
    form.refresh_groups().await.unwrap();
    form.toggle_member(&UserId::from("u2"));
    form.set_amount("50");
    form.set_description("Dinner");
    form.submit().await.unwrap();
}

#[tokio::test]
async fn ledger_rejection_keeps_the_form() {
    let server = start_ledger().await;
    mount_groups(
        &server,
        json!([
            group_json("g1", "Trip", &[ALICE, BOB]),
            group_json("g2", "Flat", &[ALICE, CAROL]),
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/expenses"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let mut form = tally.expense_form();
    form.refresh_groups().await.unwrap();
    form.switch_group(&GroupId::from("g2"));
    form.set_amount("12");
    form.set_description("Milk");

    let err = form.submit().await.unwrap_err();
    assert_eq!(err.user_message(), "Error adding expense");
    assert_eq!(form.selected_group().unwrap().id, GroupId::from("g2"));
    assert_eq!(form.description(), "Milk");
    assert_eq!(tally.notices().current().unwrap().text(), "Error adding expense");
}
