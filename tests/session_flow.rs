//! End-to-end session lifecycle against an on-disk database

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use session_gate::{
    auth::{
        api::RedirectPaths,
        clock::{Clock, ManualClock},
        cookie::CookiePolicy,
        db::Database,
        error::{AuthError, TokenError},
        jwt::{SigningSecret, TokenIssuer},
        middleware::GateMode,
        models::RegisterRequest,
        password::MIN_COST,
        service::CredentialService,
        session_store::{SessionStore, SqliteSessionStore},
        user_store::SqliteUserStore,
    },
    build_router, AppState, Config,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const T0: i64 = 1_700_000_000;
const SECRET: &str = "integration-secret-0123456789abcdef";

struct Fixture {
    _dir: TempDir,
    db: Database,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("auth.db");
    let db = Database::open(path.to_str().unwrap()).unwrap();
    Fixture {
        _dir: dir,
        db,
        clock: Arc::new(ManualClock::at_unix(T0)),
    }
}

fn service(f: &Fixture) -> (CredentialService, Arc<SqliteSessionStore>) {
    let clock: Arc<dyn Clock> = f.clock.clone();
    let sessions = Arc::new(SqliteSessionStore::new(f.db.clone(), clock.clone()));
    let issuer = Arc::new(TokenIssuer::new(
        SigningSecret::new(SECRET).unwrap(),
        clock.clone(),
    ));
    let service = CredentialService::new(
        Arc::new(SqliteUserStore::new(f.db.clone())),
        sessions.clone(),
        issuer,
        clock,
    )
    .with_bcrypt_cost(MIN_COST);
    (service, sessions)
}

fn router(f: &Fixture) -> Router {
    let config = Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        db_path: String::new(),
        signing_secret: SigningSecret::new(SECRET).unwrap(),
        session_ttl: Duration::minutes(20),
        cookies: CookiePolicy::default(),
        bcrypt_cost: MIN_COST,
        gate_mode: GateMode::Stateless,
        redirects: RedirectPaths::default(),
    };
    build_router(AppState::with_database(&config, f.db.clone(), f.clock.clone()))
}

fn ada() -> RegisterRequest {
    RegisterRequest {
        fullname: "Ada".to_string(),
        email: "ada@x.com".to_string(),
        password: "p1".to_string(),
    }
}

async fn me_status(app: &Router, token: &str) -> StatusCode {
    app.clone()
        .oneshot(
            Request::get("/api/v1/user/me")
                .header(header::COOKIE, format!("session_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn stale_token_passes_gate_until_its_own_expiry() {
    let f = fixture();
    let (service, sessions) = service(&f);
    let app = router(&f);

    service.register(ada()).unwrap();

    // First login at T0
    let t1 = service.login("ada@x.com", "p1").unwrap();
    assert_eq!(t1.expires_at.timestamp(), T0 + 1200);

    // Second login at T0+60 replaces the stored session
    f.clock.advance(Duration::seconds(60));
    let t2 = service.login("ada@x.com", "p1").unwrap();
    assert_ne!(t1.token, t2.token);
    assert_eq!(sessions.count_for_email("ada@x.com").unwrap(), 1);
    assert_eq!(
        sessions.lookup_by_email("ada@x.com").unwrap().unwrap().token,
        t2.token
    );

    // The superseded token still verifies on its own
    assert_eq!(me_status(&app, &t1.token).await, StatusCode::OK);
    assert_eq!(me_status(&app, &t2.token).await, StatusCode::OK);

    // At T0+1200 the first token has expired, the second has not
    f.clock.set(chrono::DateTime::from_timestamp(T0 + 1200, 0).unwrap());
    assert_eq!(me_status(&app, &t1.token).await, StatusCode::UNAUTHORIZED);
    assert_eq!(me_status(&app, &t2.token).await, StatusCode::OK);

    // And at T0+1260 neither passes
    f.clock.advance(Duration::seconds(60));
    assert_eq!(me_status(&app, &t2.token).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_and_foreign_tokens_are_rejected() {
    let f = fixture();
    let (service, _sessions) = service(&f);
    let app = router(&f);

    service.register(ada()).unwrap();
    let issued = service.login("ada@x.com", "p1").unwrap();

    let last = issued.token.len() - 1;
    for (index, replacement) in [(last, b'A'), (last, b'+'), (5, b'!'), (5, b'=')] {
        let mut tampered = issued.token.clone().into_bytes();
        if tampered[index] == replacement {
            tampered[index] = b'B';
        } else {
            tampered[index] = replacement;
        }
        let tampered = String::from_utf8(tampered).unwrap();
        assert_eq!(
            service.issuer().verify(&tampered),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(me_status(&app, &tampered).await, StatusCode::UNAUTHORIZED);
    }

    let other = TokenIssuer::new(
        SigningSecret::new("some-other-secret-0123456789abcdef").unwrap(),
        f.clock.clone(),
    );
    let foreign = other.mint("ada@x.com", Duration::minutes(20)).unwrap();
    assert_eq!(me_status(&app, &foreign.token).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        service.issuer().verify(&foreign.token),
        Err(TokenError::InvalidSignature)
    );

    assert_eq!(me_status(&app, "garbage").await, StatusCode::BAD_REQUEST);
}

#[test]
fn data_survives_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("auth.db");
    let path = path.to_str().unwrap();
    let clock = Arc::new(ManualClock::at_unix(T0));

    {
        let db = Database::open(path).unwrap();
        let sessions = SqliteSessionStore::new(db, clock.clone());
        sessions
            .upsert("ada@x.com", "t1", clock.now() + Duration::minutes(20))
            .unwrap();
    }

    let db = Database::open(path).unwrap();
    let sessions = SqliteSessionStore::new(db, clock.clone());
    let session = sessions.token_validity("t1").unwrap();
    assert_eq!(session.email, "ada@x.com");
}

#[test]
fn concurrent_logins_leave_one_session() {
    let f = fixture();
    let (service, sessions) = service(&f);
    service.register(ada()).unwrap();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            std::thread::spawn(move || service.login("ada@x.com", "p1").unwrap())
        })
        .collect();
    let tokens: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().token)
        .collect();

    assert_eq!(sessions.count_for_email("ada@x.com").unwrap(), 1);
    let stored = sessions.lookup_by_email("ada@x.com").unwrap().unwrap();
    assert!(tokens.contains(&stored.token));
}

#[test]
fn concurrent_registrations_create_one_user() {
    let f = fixture();
    let (service, _sessions) = service(&f);
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            std::thread::spawn(move || service.register(ada()))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AuthError::DuplicateEmail)));

    let users = SqliteUserStore::new(f.db.clone());
    assert_eq!(users.count_by_email("ada@x.com").unwrap(), 1);
}
