//! Dispatch behavior against a local fake portal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use courtsnipe::dispatch::BookingDispatcher;
use courtsnipe::error::{ClientError, DispatchError};
use courtsnipe::session::AuthenticatedSession;
use courtsnipe::site::{BookingOutcome, Locators, LoggedOutMarker, SiteDescriptor};
use courtsnipe::slot::BookingSlot;

#[derive(Default)]
struct PortalState {
    arrivals: Mutex<Vec<Instant>>,
    cookie_headers: Mutex<Vec<String>>,
}

async fn booking_endpoint(
    State(state): State<Arc<PortalState>>,
    headers: axum::http::HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    state.arrivals.lock().unwrap().push(Instant::now());
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        state
            .cookie_headers
            .lock()
            .unwrap()
            .push(cookie.to_str().unwrap_or_default().to_string());
    }

    // Long enough that serialized requests would be visibly staggered.
    tokio::time::sleep(Duration::from_millis(150)).await;

    match params.get("QTime").map(String::as_str) {
        Some("20") => "<script>location.href='x.aspx?PT=1&X=1&E=ok'</script>".to_string(),
        Some("21") => "<script>location.href='x.aspx?PT=1&X=2&E=taken'</script>".to_string(),
        _ => "<html>scheduled maintenance</html>".to_string(),
    }
}

/// Descriptor pointing at the local fake portal. Leaked so it satisfies
/// the `'static` the dispatcher works with.
fn local_site(base: String) -> &'static SiteDescriptor {
    let base: &'static str = Box::leak(base.into_boxed_str());
    Box::leak(Box::new(SiteDescriptor {
        name: "本機測試場館",
        login_url: base,
        booking_base: base,
        facility_id: 84,
        pad_hour: true,
        pre_login_dialogs: 0,
        submit_script: "DoSubmit()",
        logout_script: "void 0",
        logged_out: LoggedOutMarker {
            selector: "#member_login",
            text: "會員註冊/登入",
        },
        success_marker: "PT=1&X=1",
        failure_marker: "PT=1&X=2",
        locators: Locators {
            welcome_name: "#lab_Name",
            disclaimer_checkbox: ".swal2-actions",
            username_input: "#loginid",
            password_input: "#loginpw",
            login_failed: "#showerror3",
        },
    }))
}

async fn start_portal() -> (&'static SiteDescriptor, Arc<PortalState>) {
    let state = Arc::new(PortalState::default());
    let app = Router::new()
        .route("/", get(booking_endpoint))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (local_site(format!("http://{addr}/")), state)
}

fn session() -> AuthenticatedSession {
    AuthenticatedSession::from_cookies(HashMap::from([(
        "ASP.NET_SessionId".to_string(),
        "abc123".to_string(),
    )]))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slots_are_fired_concurrently_with_session_cookies() {
    let (site, state) = start_portal().await;
    let dispatcher = BookingDispatcher::new(site).unwrap();

    let slots = vec![
        BookingSlot::new(2025, 4, 26, 20).unwrap(),
        BookingSlot::new(2025, 4, 26, 21).unwrap(),
        BookingSlot::new(2025, 4, 26, 22).unwrap(),
    ];

    let results = dispatcher.dispatch(&session(), &slots).await.unwrap();
    assert_eq!(results.len(), 3);

    let arrivals = state.arrivals.lock().unwrap();
    assert_eq!(arrivals.len(), 3);
    let spread = arrivals.iter().max().unwrap().duration_since(*arrivals.iter().min().unwrap());
    assert!(
        spread < Duration::from_millis(100),
        "requests were staggered by {spread:?}; dispatch must not serialize"
    );

    for cookie in state.cookie_headers.lock().unwrap().iter() {
        assert_eq!(cookie, "ASP.NET_SessionId=abc123");
    }
}

#[tokio::test]
async fn outcomes_are_recorded_per_slot() {
    let (site, _state) = start_portal().await;
    let dispatcher = BookingDispatcher::new(site).unwrap();

    let won = BookingSlot::new(2025, 4, 26, 20).unwrap();
    let lost = BookingSlot::new(2025, 4, 26, 21).unwrap();

    let results = dispatcher.dispatch(&session(), &[won, lost]).await.unwrap();

    assert!(matches!(results.get(&won), Some(Ok(BookingOutcome::Success))));
    assert!(matches!(results.get(&lost), Some(Ok(BookingOutcome::Failure))));
}

#[tokio::test]
async fn unrecognized_body_fails_only_its_own_slot() {
    let (site, _state) = start_portal().await;
    let dispatcher = BookingDispatcher::new(site).unwrap();

    let odd = BookingSlot::new(2025, 4, 26, 9).unwrap();
    let fine = BookingSlot::new(2025, 4, 26, 20).unwrap();

    let results = dispatcher.dispatch(&session(), &[odd, fine]).await.unwrap();

    assert!(matches!(
        results.get(&odd),
        Some(Err(DispatchError::UnrecognizedResponse { .. }))
    ));
    assert!(matches!(results.get(&fine), Some(Ok(BookingOutcome::Success))));
}

#[tokio::test]
async fn transport_failure_is_isolated_to_its_slot() {
    // Unroutable port: every request to this site fails at the transport.
    let site = local_site("http://127.0.0.1:1/".to_string());
    let dispatcher = BookingDispatcher::new(site).unwrap();

    let slot = BookingSlot::new(2025, 4, 26, 20).unwrap();
    let results = dispatcher.dispatch(&session(), &[slot]).await.unwrap();

    assert!(matches!(results.get(&slot), Some(Err(DispatchError::Network(_)))));
}

#[tokio::test]
async fn invalid_session_refuses_dispatch() {
    let (site, state) = start_portal().await;
    let dispatcher = BookingDispatcher::new(site).unwrap();

    let mut dead = session();
    dead.invalidate();

    let slot = BookingSlot::new(2025, 4, 26, 20).unwrap();
    let err = dispatcher.dispatch(&dead, &[slot]).await.unwrap_err();
    assert!(matches!(err, ClientError::NotLoggedIn));
    assert!(state.arrivals.lock().unwrap().is_empty(), "no request may leave");
}
