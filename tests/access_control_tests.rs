mod common;

use chrono::NaiveDate;
use serde_json::json;

use common::{request, seed_core, seed_menu, seed_school, seed_student, seed_user, setup};

#[tokio::test]
async fn health_probes_need_no_identity() {
    let (app, _pool) = setup().await;

    let (status, body) = request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = request(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn missing_or_unknown_identity_is_unauthorized() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;

    let (status, body) = request(&app, "GET", "/menus", None, None).await;
    assert_eq!(status, 401, "{body}");
    assert_eq!(body["success"], false);

    let (status, _) = request(&app, "GET", "/menus", Some("nobody"), None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn parents_cannot_create_menus() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;

    let (status, body) = request(
        &app,
        "POST",
        "/menus",
        Some("parent1"),
        Some(json!({
            "school_id": "s1",
            "date": "2026-01-05",
            "meal_type": "LUNCH",
            "description": "menu",
            "items": [],
            "allergens": []
        })),
    )
    .await;
    assert_eq!(status, 403, "{body}");
}

#[tokio::test]
async fn canteen_staff_are_confined_to_their_own_school() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    seed_school(&pool, "s2", None).await;

    let (status, body) = request(
        &app,
        "POST",
        "/menus",
        Some("staff1"),
        Some(json!({
            "school_id": "s2",
            "date": "2026-01-05",
            "meal_type": "LUNCH",
            "description": "menu",
            "items": [],
            "allergens": []
        })),
    )
    .await;
    assert_eq!(status, 403, "{body}");
}

#[tokio::test]
async fn school_admin_assignment_is_read_per_request() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    seed_school(&pool, "s2", None).await;
    let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
    seed_user(&pool, "staff2", "CANTEEN_STAFF", Some("s2")).await;
    seed_menu(&pool, "m2", "s2", date, "LUNCH", "PENDING", "staff2").await;

    // sa1 administers s1, not s2
    let (status, _) = request(
        &app,
        "POST",
        "/menus/m2/approve",
        Some("sa1"),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, 403);

    // Reassigning the admin takes effect immediately, no restart or
    // re-login involved.
    sqlx::query("UPDATE schools SET admin_id = NULL WHERE id = 's1'")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE schools SET admin_id = 'sa1' WHERE id = 's2'")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = request(
        &app,
        "POST",
        "/menus/m2/approve",
        Some("sa1"),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, 200, "{body}");
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    seed_school(&pool, "s2", None).await;
    let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
    seed_menu(&pool, "m1", "s1", date, "LUNCH", "APPROVED", "staff1").await;
    seed_menu(&pool, "m2", "s2", date, "LUNCH", "APPROVED", "staff1").await;

    // Platform admin sees both schools
    let (status, body) = request(&app, "GET", "/menus", Some("admin1"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Parent's scope comes from their children's schools
    let (status, body) = request(&app, "GET", "/menus", Some("parent1"), None).await;
    assert_eq!(status, 200);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["school_id"], "s1");

    // Asking for a school outside the scope is refused outright
    let (status, _) = request(&app, "GET", "/menus?school_id=s2", Some("parent1"), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn parent_without_students_sees_nothing() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    seed_user(&pool, "parent2", "PARENT", None).await;
    let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
    seed_menu(&pool, "m1", "s1", date, "LUNCH", "APPROVED", "staff1").await;

    let (status, body) = request(&app, "GET", "/menus", Some("parent2"), None).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = request(&app, "GET", "/menus/today?school_id=s1", Some("parent2"), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn parent_with_children_in_two_schools_sees_both() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    seed_school(&pool, "s2", None).await;
    seed_student(&pool, "st2", "s2", Some("parent1")).await;
    let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
    seed_menu(&pool, "m1", "s1", date, "LUNCH", "APPROVED", "staff1").await;
    seed_menu(&pool, "m2", "s2", date, "LUNCH", "APPROVED", "staff1").await;

    let (status, body) = request(&app, "GET", "/menus", Some("parent1"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn notifications_are_private_to_their_owner() {
    let (app, pool) = setup().await;
    seed_core(&pool).await;
    let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
    seed_menu(&pool, "m1", "s1", date, "LUNCH", "PENDING", "staff1").await;

    request(
        &app,
        "POST",
        "/menus/m1/approve",
        Some("sa1"),
        Some(json!({ "approved": true })),
    )
    .await;

    let (status, body) = request(&app, "GET", "/notifications", Some("staff1"), None).await;
    assert_eq!(status, 200);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    let notification_id = data[0]["id"].as_str().unwrap().to_string();
    assert_eq!(data[0]["is_read"], false);

    // Someone else cannot mark it read
    let (status, _) = request(
        &app,
        "POST",
        &format!("/notifications/{notification_id}/read"),
        Some("parent1"),
        None,
    )
    .await;
    assert_eq!(status, 404);

    // The owner can
    let (status, _) = request(
        &app,
        "POST",
        &format!("/notifications/{notification_id}/read"),
        Some("staff1"),
        None,
    )
    .await;
    assert_eq!(status, 200);

    let (_, body) = request(&app, "GET", "/notifications", Some("staff1"), None).await;
    assert_eq!(body["data"][0]["is_read"], true);
}
