//! Petition signing and results API tests

use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test};

use crate::model::Model;
use crate::model::session::SessionState;
use crate::model::session::tests::keys;
use crate::model::signatures::Signature;
use crate::service;
use crate::service::session::SESSION_COOKIE;
use crate::service::tests::{Visitor, body, location, sets_cookie};

#[actix_web::test]
async fn root_redirects_to_petition() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    let resp = visitor.call(&app, visitor.get("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/petition"));
}

#[actix_web::test]
async fn anonymous_visitor_cannot_see_results() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    for uri in ["/thanks", "/signers"] {
        let resp = visitor.call(&app, visitor.get(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), Some("/petition"));
    }

    assert_eq!(visitor.state(), SessionState::Anonymous);
}

#[actix_web::test]
async fn every_response_denies_framing() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    for uri in ["/", "/petition", "/thanks", "/signers", "/register", "/login"] {
        let resp = visitor.call(&app, visitor.get(uri).to_request()).await;
        assert_eq!(
            resp.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "deny",
            "{uri}"
        );
    }

    // Also the rejected ones
    let resp = visitor
        .call(
            &app,
            visitor
                .post_unprotected("/petition", &[("first", "A")])
                .to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        resp.headers().get(header::X_FRAME_OPTIONS).unwrap(),
        "deny"
    );
}

#[actix_web::test]
async fn first_visit_starts_session() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    let resp = visitor.call(&app, visitor.get("/petition").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(sets_cookie(&resp));

    let cookie = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .unwrap();
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    assert!(cookie.max_age().unwrap().whole_days() >= 13);

    let session = visitor.session().unwrap();
    assert_eq!(session.state, SessionState::Anonymous);
    assert!(body(resp).await.contains(session.csrf.as_str()));

    // Unchanged session is not sent again
    let resp = visitor.call(&app, visitor.get("/petition").to_request()).await;
    assert!(!sets_cookie(&resp));
    assert_eq!(visitor.session().unwrap().csrf, session.csrf);
}

#[actix_web::test]
async fn signing_petition() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(
        model.clone(),
        keys(),
    )))
    .await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;

    let resp = visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/thanks"));

    let signature = visitor.state().signature().unwrap();
    assert_eq!(visitor.state(), SessionState::Signed(signature));
    assert_eq!(Signature::count(model.db()).await.unwrap(), 1);

    let resp = visitor.call(&app, visitor.get("/thanks").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let thanks = body(resp).await;
    assert!(thanks.contains("Ada Lovelace"));
    assert!(thanks.contains(r#"<p class="count">1 people"#));

    // Can't get back to the form once signed
    let resp = visitor.call(&app, visitor.get("/petition").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/thanks"));

    let resp = visitor.call(&app, visitor.get("/signers").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("<li>Ada Lovelace</li>"));
}

#[actix_web::test]
async fn signers_lists_everyone() {
    let model = Model::test().await.unwrap();
    Signature::new("Alan", "Turing", "sig")
        .create(model.db())
        .await
        .unwrap();

    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;

    let resp = visitor.call(&app, visitor.get("/thanks").to_request()).await;
    assert!(body(resp).await.contains(r#"<p class="count">2 people"#));

    let resp = visitor.call(&app, visitor.get("/signers").to_request()).await;
    let signers = body(resp).await;
    let turing = signers.find("<li>Alan Turing</li>").unwrap();
    let lovelace = signers.find("<li>Ada Lovelace</li>").unwrap();
    assert!(turing < lovelace);
}

#[actix_web::test]
async fn rejected_signature() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(
        model.clone(),
        keys(),
    )))
    .await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    let before = visitor.session().unwrap();

    // Missing signature field
    let resp = visitor
        .call(
            &app,
            visitor
                .post("/petition", &[("first", "Ada"), ("last", "Lovelace")])
                .to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!sets_cookie(&resp));
    let form = body(resp).await;
    assert!(form.contains(r#"data-error="signature-rejected""#));
    assert!(form.contains(r#"action="/petition""#));

    // Blank name
    let resp = visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", " "), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(visitor.session().unwrap(), before);
    assert_eq!(Signature::count(model.db()).await.unwrap(), 0);

    // Still unsigned, so the form is available
    let resp = visitor.call(&app, visitor.get("/petition").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn forged_submission_refused() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(
        model.clone(),
        keys(),
    )))
    .await;
    let mut visitor = Visitor::new();
    let fields = [("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")];

    // No session at all
    let resp = visitor
        .call(
            &app,
            visitor.post_unprotected("/petition", &fields).to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Session, but no token
    visitor.call(&app, visitor.get("/petition").to_request()).await;
    let resp = visitor
        .call(
            &app,
            visitor.post_unprotected("/petition", &fields).to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Token of another session
    let mut form = fields.to_vec();
    form.push(("_csrf", "bm90LXRoZS1yaWdodC10b2tlbg"));
    let resp = visitor
        .call(
            &app,
            visitor.post_unprotected("/petition", &form).to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    assert_eq!(visitor.state(), SessionState::Anonymous);
    assert_eq!(Signature::count(model.db()).await.unwrap(), 0);
}

#[actix_web::test]
async fn storage_unavailable() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(
        model.clone(),
        keys(),
    )))
    .await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    model.db().close().await;

    let resp = visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!sets_cookie(&resp));
    assert!(body(resp).await.contains("Something went wrong"));
    assert_eq!(visitor.state(), SessionState::Anonymous);
}

#[actix_web::test]
async fn results_storage_unavailable() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(
        model.clone(),
        keys(),
    )))
    .await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    let before = visitor.session().unwrap();
    model.db().close().await;

    for uri in ["/thanks", "/signers"] {
        let resp = visitor.call(&app, visitor.get(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert!(!sets_cookie(&resp));
        assert!(body(resp).await.contains("Something went wrong"));
    }

    assert_eq!(visitor.session().unwrap(), before);
}

#[actix_web::test]
async fn session_expiry_is_fixed() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    let started = visitor.session().unwrap();

    // Expiry is stored with seconds precision, a recomputed one would differ
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let resp = visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    assert!(sets_cookie(&resp));

    let signed = visitor.session().unwrap();
    assert_ne!(signed.state, started.state);
    assert_eq!(signed.expires_at, started.expires_at);
}

#[actix_web::test]
async fn tampered_cookie_starts_over() {
    let model = Model::test().await.unwrap();
    let app = test::init_service(App::new().configure(service::configure(model, keys()))).await;
    let mut visitor = Visitor::new();

    visitor.call(&app, visitor.get("/petition").to_request()).await;
    visitor
        .call(
            &app,
            visitor
                .post(
                    "/petition",
                    &[("first", "Ada"), ("last", "Lovelace"), ("signature", "sig")],
                )
                .to_request(),
        )
        .await;
    assert!(visitor.state().signature().is_some());

    let forged = test::TestRequest::get()
        .uri("/thanks")
        .cookie(Cookie::new(SESSION_COOKIE, "v4.local.forged"))
        .to_request();
    let resp = test::call_service(&app, forged).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/petition"));
    assert!(sets_cookie(&resp));
}
