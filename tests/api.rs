//! End-to-end HTTP flows against the in-memory store.

mod helpers;

use axum::http::StatusCode;
use helpers::{LEARNER, OTHER_LEARNER, TUTOR_ANA, TUTOR_BO, TUTOR_CY, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_and_status_report_memory_backend() {
    let app = TestApp::new("").await;

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let app = TestApp::new("").await;
    let (status, body) = app.get("/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn authenticated_routes_require_a_valid_session() {
    let app = TestApp::new("").await;

    let (status, body) = app.get("/api/doubts", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/doubts", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creating_a_doubt_runs_matching_in_the_background() {
    let app = TestApp::new("Ana, Carl, cy").await;

    let (status, created) = app
        .post(
            "/api/doubts",
            Some(LEARNER),
            json!({ "title": "Limits", "description": "What is a limit?", "subject": "Math" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["uid"], "l1");
    assert_eq!(created["name"], "Lina");
    assert_eq!(created["recommendedTutors"], json!([]));
    let id = created["id"].as_str().unwrap().to_owned();

    app.settle().await;
    assert_eq!(app.completion.calls(), 1);

    let (status, doubt) = app.get(&format!("/api/doubts/{id}"), Some(TUTOR_ANA)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doubt["recommendedTutors"], json!(["t1", "t3"]));
    assert_eq!(doubt["acceptedTutors"], json!([]));
    assert_eq!(doubt["tutorNames"], json!({ "t1": "Ana", "t3": "Cy" }));
}

#[tokio::test]
async fn doubt_creation_validates_role_and_fields() {
    let app = TestApp::new("Ana").await;

    let (status, body) = app
        .post(
            "/api/doubts",
            Some(LEARNER),
            json!({ "title": "  ", "description": "d", "subject": "Math" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");

    let (status, _) = app
        .post(
            "/api/doubts",
            Some(TUTOR_ANA),
            json!({ "title": "t", "description": "d", "subject": "Math" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app.get("/api/doubts", Some(LEARNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
    app.settle().await;
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new("").await;
    let (status, body) = app
        .post("/api/doubts", Some(LEARNER), json!("not an object"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn doubts_are_listed_newest_first_and_filterable() {
    let app = TestApp::new("").await;
    for (title, subject) in [("first", "Math"), ("second", "Physics"), ("third", "Math")] {
        let (status, _) = app
            .post(
                "/api/doubts",
                Some(LEARNER),
                json!({ "title": title, "description": "d", "subject": subject }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        // createdAt has millisecond resolution.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    app.settle().await;

    let (_, all) = app.get("/api/doubts", Some(TUTOR_ANA)).await;
    let titles: Vec<_> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["third", "second", "first"]);

    let (_, math) = app.get("/api/doubts?subject=Math", Some(TUTOR_ANA)).await;
    assert_eq!(math.as_array().unwrap().len(), 2);

    let (_, mine) = app.get("/api/doubts/mine", Some(OTHER_LEARNER)).await;
    assert_eq!(mine, json!([]));
    let (_, mine) = app.get("/api/doubts/mine", Some(LEARNER)).await;
    assert_eq!(mine.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn only_tutors_of_the_subject_can_accept() {
    let app = TestApp::new("").await;
    let (_, created) = app
        .post(
            "/api/doubts",
            Some(LEARNER),
            json!({ "title": "t", "description": "d", "subject": "Math" }),
        )
        .await;
    let accept = format!("/api/doubts/{}/accept", created["id"].as_str().unwrap());

    let (status, body) = app.post(&accept, Some(TUTOR_BO), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.post(&accept, Some(OTHER_LEARNER), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&accept, Some(TUTOR_ANA), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["doubt"]["acceptedTutors"], json!(["t1"]));

    let (status, body) = app.post(&accept, Some(TUTOR_ANA), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["doubt"]["acceptedTutors"], json!(["t1"]));

    let (_, body) = app.post(&accept, Some(TUTOR_CY), json!({})).await;
    assert_eq!(body["doubt"]["acceptedTutors"], json!(["t1", "t3"]));
    assert_eq!(body["doubt"]["tutorNames"], json!({ "t1": "Ana", "t3": "Cy" }));

    let (_, mine) = app.get("/api/doubts/mine", Some(LEARNER)).await;
    assert_eq!(mine[0]["tutorNames"]["t3"], "Cy");

    let (status, _) = app
        .post("/api/doubts/missing/accept", Some(TUTOR_ANA), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn match_tutor_endpoint_persists_and_returns_matches() {
    let app = TestApp::new("ana, Carl").await;
    let (_, created) = app
        .post(
            "/api/doubts",
            Some(LEARNER),
            json!({ "title": "t", "description": "limits", "subject": "Math" }),
        )
        .await;
    app.settle().await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/matchTutor",
            None,
            json!({ "doubtId": id, "subject": "Math", "description": "limits" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "matchedTutors": ["t1"] }));

    let (_, doubt) = app.get(&format!("/api/doubts/{id}"), Some(LEARNER)).await;
    assert_eq!(doubt["recommendedTutors"], json!(["t1"]));
}

#[tokio::test]
async fn match_tutor_validates_input() {
    let app = TestApp::new("Ana").await;

    let (status, _) = app
        .post(
            "/api/matchTutor",
            None,
            json!({ "doubtId": "", "subject": "Math", "description": "d" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/matchTutor",
            None,
            json!({ "doubtId": "missing", "subject": "Math", "description": "d" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn connection_request_lifecycle() {
    let app = TestApp::new("").await;

    let (status, request) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "t1" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["fromName"], "Lina");
    assert_eq!(request["toName"], "Ana");
    assert_eq!(request["message"], "Hi! I'd like to connect and collaborate!");
    let id = request["id"].as_str().unwrap().to_owned();

    let (status, body) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "t1", "message": "again" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, outgoing) = app.get("/api/requests/outgoing", Some(LEARNER)).await;
    assert_eq!(outgoing.as_array().unwrap().len(), 1);
    let (_, incoming) = app.get("/api/requests/incoming", Some(TUTOR_ANA)).await;
    assert_eq!(incoming[0]["id"], id.as_str());

    // Only the recipient may respond.
    let (status, _) = app
        .post(&format!("/api/requests/{id}/accept"), Some(LEARNER), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, connection) = app
        .post(&format!("/api/requests/{id}/accept"), Some(TUTOR_ANA), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(connection["peerUid"], "l1");
    assert_eq!(connection["peerName"], "Lina");
    assert_eq!(connection["initiatedBy"], "l1");

    let (status, _) = app
        .post(&format!("/api/requests/{id}/accept"), Some(TUTOR_ANA), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = app.get("/api/connections", Some(LEARNER)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["peerUid"], "t1");
    assert_eq!(mine[0]["peerName"], "Ana");

    let (status, _) = app
        .post("/api/requests", Some(TUTOR_ANA), json!({ "toUid": "l1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, incoming) = app.get("/api/requests/incoming", Some(TUTOR_ANA)).await;
    assert_eq!(incoming, json!([]));
}

#[tokio::test]
async fn rejected_requests_leave_no_connection() {
    let app = TestApp::new("").await;
    let (_, request) = app
        .post(
            "/api/requests",
            Some(TUTOR_BO),
            json!({ "toUid": "l2", "message": "  physics help?  " }),
        )
        .await;
    assert_eq!(request["message"], "physics help?");
    let id = request["id"].as_str().unwrap();

    let (status, body) = app
        .post(&format!("/api/requests/{id}/reject"), Some(OTHER_LEARNER), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (_, connections) = app.get("/api/connections", Some(OTHER_LEARNER)).await;
    assert_eq!(connections, json!([]));

    // A new request is allowed after rejection.
    let (status, _) = app
        .post("/api/requests", Some(TUTOR_BO), json!({ "toUid": "l2" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_connection_requests_are_rejected() {
    let app = TestApp::new("").await;

    let (status, _) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "l1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn crossed_requests_leave_nothing_pending_after_one_accept() {
    let app = TestApp::new("").await;

    let (_, forward) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "t1" }))
        .await;
    let (status, backward) = app
        .post("/api/requests", Some(TUTOR_ANA), json!({ "toUid": "l1" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let forward_accept = format!("/api/requests/{}/accept", forward["id"].as_str().unwrap());
    let (status, _) = app.post(&forward_accept, Some(TUTOR_ANA), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, incoming) = app.get("/api/requests/incoming", Some(LEARNER)).await;
    assert_eq!(incoming, json!([]));
    let (_, outgoing) = app.get("/api/requests/outgoing", Some(TUTOR_ANA)).await;
    assert_eq!(outgoing, json!([]));

    let backward_accept = format!("/api/requests/{}/accept", backward["id"].as_str().unwrap());
    let (status, _) = app.post(&backward_accept, Some(LEARNER), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_directory_excludes_self_and_connected_peers() {
    let app = TestApp::new("").await;

    let (status, peers) = app.get("/api/users", Some(LEARNER)).await;
    assert_eq!(status, StatusCode::OK);
    let uids: Vec<_> = peers.as_array().unwrap().iter().map(|p| p["uid"].clone()).collect();
    assert_eq!(uids, [json!("l2"), json!("t1"), json!("t2"), json!("t3")]);
    assert!(peers[1].get("email").is_none());

    let (_, request) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "t1" }))
        .await;
    let accept = format!("/api/requests/{}/accept", request["id"].as_str().unwrap());
    app.post(&accept, Some(TUTOR_ANA), json!({})).await;

    let (_, peers) = app.get("/api/users?subject=math", Some(LEARNER)).await;
    let uids: Vec<_> = peers.as_array().unwrap().iter().map(|p| p["uid"].clone()).collect();
    assert_eq!(uids, [json!("t3")]);

    let (_, peers) = app.get("/api/users?subject=PHYS", Some(TUTOR_ANA)).await;
    let uids: Vec<_> = peers.as_array().unwrap().iter().map(|p| p["uid"].clone()).collect();
    assert_eq!(uids, [json!("t2"), json!("t3")]);

    let (status, _) = app.get("/api/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_profile_reports_connection_state() {
    let app = TestApp::new("").await;

    let (status, profile) = app.get("/api/users/t1", Some(LEARNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Ana");
    assert_eq!(profile["role"], "Tutor");
    assert_eq!(profile["subjects"], json!(["Math"]));
    assert_eq!(profile["bio"], "Calculus and limits");
    assert_eq!(profile["connected"], false);

    let (_, request) = app
        .post("/api/requests", Some(LEARNER), json!({ "toUid": "t1" }))
        .await;
    let accept = format!("/api/requests/{}/accept", request["id"].as_str().unwrap());
    app.post(&accept, Some(TUTOR_ANA), json!({})).await;

    let (_, profile) = app.get("/api/users/t1", Some(LEARNER)).await;
    assert_eq!(profile["connected"], true);

    let (status, body) = app.get("/api/users/ghost", Some(LEARNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
