use axum::body::Bytes;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tera::Tera;
use url::Url;

use super::{create_router, App};
use crate::auth::tests::{authenticator, claims, ADMIN};
use crate::counter::LikeState;
use crate::database::Database;
use crate::model::{now, BlogPost, NewBlogPost, NewProject, Project};
use crate::session::{Sessions, SESSION_COOKIE};
use crate::storage::Storage;

const BOUNDARY: &str = "folio-test-boundary";

async fn app() -> App {
    let database = Database::memory().await.unwrap();
    let tera = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html")).unwrap();
    let root = std::env::temp_dir().join(format!("folio-api-{}", uuid::Uuid::new_v4()));
    let storage = Storage::new(root, Url::parse("http://localhost:3000").unwrap());

    App::new(database, authenticator(), storage, Sessions::default(), tera)
}

fn server(app: &App) -> TestServer {
    TestServer::new(create_router(app.clone())).unwrap()
}

/// Signs in through the identity token endpoint and returns the session cookie value.
async fn sign_in(server: &TestServer, uid: &str, email: &str) -> String {
    let token = authenticator().encode(&claims(uid, email)).unwrap();
    let response = server.post("/auth/signin").json(&json!({ "token": token })).await;
    response.assert_status_ok();

    response.cookie(SESSION_COOKIE).value().to_string()
}

async fn visitor(server: &TestServer) -> String {
    sign_in(server, "alice", "alice@example.com").await
}

async fn admin(server: &TestServer) -> String {
    sign_in(server, "admin", ADMIN).await
}

fn as_user(request: TestRequest, session: &str) -> TestRequest {
    let cookie = format!("{SESSION_COOKIE}={session}");
    request.add_header(header::COOKIE, HeaderValue::from_str(&cookie).unwrap())
}

async fn tap(server: &TestServer, path: &str, session: &str) -> LikeState {
    let response = as_user(server.post(path), session).await;
    response.assert_status_ok();
    response.json()
}

async fn seeded_project(app: &App, views: u64, likes: u64) -> String {
    let mut project = NewProject::sample("seeded");
    project.views = views;
    project.likes = likes;
    project.insert(&app.database).await.unwrap().id.key()
}

async fn seeded_post(app: &App, views: u64, likes: u64) -> String {
    let mut post = NewBlogPost::sample("seeded");
    post.views = views;
    post.likes = likes;
    post.insert(&app.database).await.unwrap().id.key()
}

async fn stored_project(app: &App, key: &str) -> Option<Project> {
    Project::get(key, &app.database).await.unwrap()
}

async fn stored_post(app: &App, key: &str) -> Option<BlogPost> {
    BlogPost::get(key, &app.database).await.unwrap()
}

fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Bytes {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }

    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Bytes::from(body)
}

fn multipart_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

#[tokio::test]
async fn every_render_of_a_detail_page_counts_a_view() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_project(&app, 10, 0).await;

    server.get(&format!("/projects/{key}")).await.assert_status_ok();
    server.get(&format!("/projects/{key}")).await.assert_status_ok();

    assert_eq!(stored_project(&app, &key).await.unwrap().views, 12);
}

#[tokio::test]
async fn blog_mount_and_four_taps_show_one_more_view_and_like() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_post(&app, 10, 5).await;
    let session = visitor(&server).await;
    let like = format!("/blog/{key}/like");

    as_user(server.get(&format!("/blog/{key}")), &session)
        .await
        .assert_status_ok();

    for expected in 1..=3 {
        let state = tap(&server, &like, &session).await;

        assert_eq!(state.progress, expected);
        assert_eq!(state.likes, 5);
        assert!(state.primed);
        assert!(!state.committed);
        assert_eq!(stored_post(&app, &key).await.unwrap().likes, 5);
    }

    let state = tap(&server, &like, &session).await;
    assert_eq!((state.likes, state.progress, state.committed), (6, 0, true));

    let stored = stored_post(&app, &key).await.unwrap();
    assert_eq!((stored.likes, stored.views), (6, 11));
}

#[tokio::test]
async fn project_likes_are_sent_on_every_tap() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_project(&app, 10, 5).await;
    let session = visitor(&server).await;
    let like = format!("/projects/{key}/like");

    as_user(server.get(&format!("/projects/{key}")), &session)
        .await
        .assert_status_ok();

    for expected in 6..=8 {
        let state = tap(&server, &like, &session).await;

        assert_eq!(state.likes, expected);
        assert_eq!(state.progress, 0);
        assert!(state.committed);
        assert_eq!(stored_project(&app, &key).await.unwrap().likes, expected);
    }
}

#[tokio::test]
async fn reloading_a_post_clears_like_progress() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_post(&app, 0, 5).await;
    let session = visitor(&server).await;
    let page = format!("/blog/{key}");
    let like = format!("/blog/{key}/like");

    as_user(server.get(&page), &session).await.assert_status_ok();
    tap(&server, &like, &session).await;
    assert_eq!(tap(&server, &like, &session).await.progress, 2);

    as_user(server.get(&page), &session).await.assert_status_ok();
    let state = tap(&server, &like, &session).await;

    assert_eq!(state.progress, 1);
    assert_eq!(stored_post(&app, &key).await.unwrap().likes, 5);
}

#[tokio::test]
async fn liking_before_any_render_seeds_from_the_store() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_post(&app, 10, 5).await;
    let session = visitor(&server).await;

    let state = tap(&server, &format!("/blog/{key}/like"), &session).await;

    assert_eq!((state.likes, state.progress), (5, 1));
    assert_eq!(stored_post(&app, &key).await.unwrap().views, 10);
}

#[tokio::test]
async fn anonymous_taps_are_rejected_without_a_write() {
    let app = app().await;
    let server = server(&app);
    let project = seeded_project(&app, 0, 5).await;
    let post = seeded_post(&app, 0, 5).await;

    for _ in 0..4 {
        server
            .post(&format!("/projects/{project}/like"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post(&format!("/blog/{post}/like"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    assert_eq!(stored_project(&app, &project).await.unwrap().likes, 5);
    assert_eq!(stored_post(&app, &post).await.unwrap().likes, 5);
}

#[tokio::test]
async fn liking_a_missing_entity_is_not_found() {
    let app = app().await;
    let server = server(&app);
    let session = visitor(&server).await;

    as_user(server.post("/blog/missing/like"), &session)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(stored_post(&app, "missing").await.is_none());
}

#[tokio::test]
async fn signing_out_ends_the_session() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_project(&app, 0, 5).await;
    let session = visitor(&server).await;

    tap(&server, &format!("/projects/{key}/like"), &session).await;

    as_user(server.post("/auth/signout"), &session)
        .await
        .assert_status(StatusCode::SEE_OTHER);

    as_user(server.post(&format!("/projects/{key}/like")), &session)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(stored_project(&app, &key).await.unwrap().likes, 6);
}

#[tokio::test]
async fn deleted_projects_are_gone() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_project(&app, 0, 0).await;
    let admin = admin(&server).await;

    as_user(server.post(&format!("/projects/{key}/delete")), &admin)
        .await
        .assert_status(StatusCode::SEE_OTHER);

    assert!(stored_project(&app, &key).await.is_none());
    server
        .get(&format!("/projects/{key}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/projects/{key}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admins_delete_posts_through_the_json_api() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_post(&app, 0, 0).await;
    let admin = admin(&server).await;

    as_user(server.delete(&format!("/api/blog/{key}")), &admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(stored_post(&app, &key).await.is_none());
    server
        .get(&format!("/api/blog/{key}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    as_user(server.delete(&format!("/api/blog/{key}")), &admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visitors_cannot_delete_or_open_admin_forms() {
    let app = app().await;
    let server = server(&app);
    let key = seeded_project(&app, 0, 0).await;
    let visitor = visitor(&server).await;

    let response = as_user(server.post(&format!("/projects/{key}/delete")), &visitor).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(response
        .text()
        .contains("You do not have permission to view this page."));

    as_user(server.delete(&format!("/api/projects/{key}")), &visitor)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/projects/{key}"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/blog/new")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(stored_project(&app, &key).await.is_some());
}

#[tokio::test]
async fn projects_without_an_image_are_rejected_before_any_write() {
    let app = app().await;
    let server = server(&app);
    let admin = admin(&server).await;

    as_user(server.post("/projects"), &admin)
        .content_type(&multipart_type())
        .bytes(multipart(&[("title", "Folio"), ("description", "This site")], None))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(Project::all(&app.database).await.unwrap().is_empty());
}

#[tokio::test]
async fn admins_create_projects_with_an_uploaded_image() {
    let app = app().await;
    let server = server(&app);
    let admin = admin(&server).await;

    let body = multipart(
        &[
            ("title", "Folio"),
            ("description", "This site"),
            ("status", "completed"),
            ("technologies", "rust"),
            ("technologies", "axum"),
        ],
        Some(("shot.png", b"not really a png")),
    );

    as_user(server.post("/projects"), &admin)
        .content_type(&multipart_type())
        .bytes(body)
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let projects = Project::all(&app.database).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].technologies, vec!["rust", "axum"]);
    assert!(projects[0]
        .image_url
        .starts_with("http://localhost:3000/uploads/projects/"));
    assert!(projects[0].image_url.ends_with("-shot.png"));
}

#[tokio::test]
async fn guestbook_entries_are_listed_after_signing() {
    let app = app().await;
    let server = server(&app);
    let session = visitor(&server).await;
    let before = now();

    as_user(server.post("/guestbook"), &session)
        .form(&json!({ "content": "hello" }))
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let entries: Vec<Value> = server.get("/api/feedback").await.json();
    let entry = entries
        .iter()
        .find(|entry| entry["content"] == "hello")
        .unwrap();
    let created_at = entry["created_at"].as_i64().unwrap();
    assert!(created_at >= before && created_at - before < 5_000);

    let page = server.get("/guestbook").await.text();
    assert!(page.contains("hello"));
}

#[tokio::test]
async fn signing_the_guestbook_needs_a_session() {
    let app = app().await;
    let server = server(&app);

    server
        .post("/guestbook")
        .form(&json!({ "content": "hello" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_opens_a_session_with_the_resolved_role() {
    let app = app().await;
    let server = server(&app);
    let token = authenticator().encode(&claims("u1", ADMIN)).unwrap();

    let response = server.post("/auth/signin").json(&json!({ "token": token })).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["role"], "admin");
    assert_eq!(body["email"], ADMIN);

    let session = response.cookie(SESSION_COOKIE).value().to_string();
    as_user(server.get("/projects/new"), &session)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn forged_tokens_do_not_sign_in() {
    let app = app().await;
    let server = server(&app);

    let response = server
        .post("/auth/signin")
        .json(&json!({ "token": "not-a-token" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn pages_render() {
    let app = app().await;
    let server = server(&app);
    let project = seeded_project(&app, 0, 0).await;
    let post = seeded_post(&app, 0, 0).await;
    let session = visitor(&server).await;

    let paths = [
        "/".to_string(),
        "/about".to_string(),
        "/projects".to_string(),
        "/blog".to_string(),
        "/guestbook".to_string(),
        format!("/projects/{project}"),
        format!("/blog/{post}"),
    ];

    for path in &paths {
        server.get(path).await.assert_status_ok();
        as_user(server.get(path), &session).await.assert_status_ok();
    }
}
