//! Group roster against a mock ledger

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use tally_engine::{DeletionConfirmed, MemberPicker};
use tally_types::{Group, User, UserId};

use crate::common::{group_json, start_ledger, tally_for, user_json};

fn user(id: &str, name: &str) -> User {
    serde_json::from_value(user_json(id, name)).unwrap()
}

fn group(id: &str, name: &str, members: &[(&str, &str)]) -> Group {
    serde_json::from_value(group_json(id, name, members)).unwrap()
}

#[tokio::test]
async fn create_group_sends_name_and_other_members() {
    let server = start_ledger().await;
    Mock::given(method("POST"))
        .and(path("/groups"))
        .and(body_json(json!({"name": "Goa Trip", "members": ["u2", "u3"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(group_json(
            "g9",
            "Goa Trip",
            &[("u1", "Alice"), ("u2", "Bob"), ("u3", "Carol")],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let mut picker = MemberPicker::new();
    picker.toggle(&user("u3", "Carol"));
    picker.toggle(&user("u2", "Bob"));
    picker.toggle(&user("u4", "Dave"));
    picker.toggle(&user("u4", "Dave"));
    picker.toggle(&user("u1", "Alice"));

    let created = tally.roster().create_group("Goa Trip", &picker).await.unwrap();
    assert_eq!(created.members.len(), 3);
}

#[tokio::test]
async fn duplicate_member_reported_by_ledger_is_a_conflict() {
    let server = start_ledger().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/g1/members"))
        .and(body_json(json!({"userId": "u2"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"msg": "User already in group"})),
        )
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    // Local copy is stale: it does not list Bob yet.
    let stale = group("g1", "Flat", &[("u1", "Alice")]);
    let err = tally
        .roster()
        .add_member(&stale, &UserId::from("u2"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.user_message("Failed to add member"), "User already in group");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let server = start_ledger().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/g1/members"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "User not found"})),
        )
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let flat = group("g1", "Flat", &[("u1", "Alice")]);
    let err = tally
        .roster()
        .add_member(&flat, &UserId::from("ghost"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rename_and_delete_round_trip() {
    let server = start_ledger().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/g1"))
        .and(body_json(json!({"name": "Flat 4B"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(group_json("g1", "Flat 4B", &[("u1", "Alice")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/g1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Group deleted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tally = tally_for(&server, "u1", "");
    let roster = tally.roster();
    let flat = group("g1", "Flat", &[("u1", "Alice")]);

    // Unchanged name never reaches the ledger.
    assert_eq!(roster.rename_group(&flat, "Flat").await.unwrap(), flat);
    let renamed = roster.rename_group(&flat, "Flat 4B").await.unwrap();
    assert_eq!(renamed.name, "Flat 4B");

    roster
        .delete_group(&renamed, DeletionConfirmed::for_group(&renamed))
        .await
        .unwrap();
}
