//! End-to-end tests for the direct-HTTP session and the collector.
//!
//! Each test stands up a `wiremock` server playing the upstream site: a
//! landing page plus the form-POST API. Regions and pharmacies that a test
//! does not script fall through to a low-priority "not successful" answer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use farmaturno_scraper::session::DirectConnector;
use farmaturno_scraper::{
    CollectError, Collector, CollectorSettings, SessionFactory, UpstreamForm, UpstreamSession,
    UpstreamSettings,
};
use farmaturno_store::DatasetStore;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LANDING: &str = "/asdigital/index.php";
const API: &str = "/asdigital/mfarmacias/mapa.php";

static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

fn scratch_path(label: &str) -> PathBuf {
    let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "farmaturno-scraper-it-{label}-{}-{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("farmacias.json")
}

fn settings(server: &MockServer, max_retries: u32) -> UpstreamSettings {
    UpstreamSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        session_timeout: Duration::from_secs(5),
        user_agent: "farmaturno-test/0.1".to_owned(),
        max_retries,
        retry_backoff_base_ms: 0,
        chrome_path: None,
    }
}

fn collector(server: &MockServer, store: DatasetStore) -> Collector<DirectConnector> {
    Collector::new(
        DirectConnector::new(settings(server, 0)),
        store,
        CollectorSettings {
            max_in_flight: 4,
            timezone: chrono_tz::America::Santiago,
        },
    )
}

async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LANDING))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=test-session; Path=/")
                .set_body_string("<html><body>mapa</body></html>"),
        )
        .mount(server)
        .await;
}

async fn mount_fallback(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "correcto": false })))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_api(server: &MockServer, needle: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(1)
        .mount(server)
        .await;
}

fn locales(entries: Value) -> Value {
    json!({ "correcto": true, "respuesta": { "locales": entries } })
}

fn local(name: &str, turno: &str) -> Value {
    json!({
        "correcto": true,
        "respuesta": {
            "local": [{ "nm": name, "dr": "Calle 1", "cm_nombre": "Arica" }],
            "horario": { "turno": turno }
        }
    })
}

#[tokio::test]
async fn collects_two_regions_and_drops_failed_detail() {
    let server = MockServer::start().await;
    mount_landing(&server).await;
    mount_fallback(&server).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("func=region&filtro=turnos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([]))))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("&region=1&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([
            { "im": "101", "lt": "-18.47", "lg": "-70.31" },
            { "im": "102", "lt": "-18.48", "lg": "-70.32" }
        ]))))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("&region=2&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([
            { "im": "201", "lt": "-20.21", "lg": "-70.15" }
        ]))))
        .with_priority(1)
        .mount(&server)
        .await;

    mount_api(&server, "im=101&", local("Farmacia Uno", "08:00<br />a<BR>20:00")).await;
    mount_api(&server, "im=102&", local("Farmacia Dos", "   ")).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("im=201&"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;

    let store = DatasetStore::new(scratch_path("e2e"));
    let summary = collector(&server, store.clone())
        .run_collection()
        .await
        .expect("collection run");

    assert_eq!(summary.stubs, 3);
    assert_eq!(summary.pharmacies, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.regions_failed, 0);

    let raw = store.read_raw().await.expect("read").expect("committed");
    let document: Value = serde_json::from_slice(&raw).expect("json document");
    assert!(document["fechaActualizacion"].is_string());
    let farmacias = document["farmacias"].as_array().expect("farmacias array");
    assert_eq!(farmacias.len(), 2);
    assert_eq!(farmacias[0]["im"], "101");
    assert_eq!(farmacias[0]["lat"], "-18.47");
    assert_eq!(farmacias[0]["nm"], "Farmacia Uno");
    assert_eq!(farmacias[0]["horario_turno"], "08:00 a 20:00");
    assert_eq!(farmacias[1]["nm"], "Farmacia Dos");
    assert_eq!(farmacias[1]["horario_turno"], "No especificado");
}

#[tokio::test]
async fn api_requests_carry_ajax_headers_and_landing_cookie() {
    let server = MockServer::start().await;
    mount_landing(&server).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("cookie", "PHPSESSID=test-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let session = DirectConnector::new(settings(&server, 0))
        .open()
        .await
        .expect("open session");
    let stamp = farmaturno_scraper::RunStamp {
        date: "2026-10-19".to_owned(),
        time: "08:00:00".to_owned(),
    };
    let region = farmaturno_core::RegionCode::new(13).expect("region 13");
    let body = session
        .post_form(&UpstreamForm::discovery(region, &stamp))
        .await
        .expect("post form");
    session.close().await;

    assert_eq!(body["correcto"], true);
}

#[tokio::test]
async fn landing_failure_aborts_run_and_keeps_previous_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LANDING))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([]))))
        .expect(0)
        .mount(&server)
        .await;

    let store = DatasetStore::new(scratch_path("landing-fail"));
    let previous = farmaturno_core::Dataset::now(Vec::new());
    store.replace(&previous).await.expect("seed dataset");

    let err = collector(&server, store.clone())
        .run_collection()
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Session(_)), "got: {err:?}");
    assert_eq!(store.load().await.expect("load"), Some(previous));
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;
    mount_landing(&server).await;

    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([]))))
        .with_priority(2)
        .mount(&server)
        .await;

    let session = DirectConnector::new(settings(&server, 1))
        .open()
        .await
        .expect("open session");
    let stamp = farmaturno_scraper::RunStamp {
        date: "2026-10-19".to_owned(),
        time: "16:00:00".to_owned(),
    };
    let region = farmaturno_core::RegionCode::new(1).expect("region 1");
    let body = session
        .post_form(&UpstreamForm::discovery(region, &stamp))
        .await
        .expect("retried post succeeds");
    session.close().await;

    assert_eq!(body["respuesta"]["locales"], json!([]));
}

#[tokio::test]
async fn non_json_answer_drops_only_that_pharmacy() {
    let server = MockServer::start().await;
    mount_landing(&server).await;
    mount_fallback(&server).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("&region=13&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locales(json!([
            { "im": 1301, "lt": -33.44, "lg": -70.65 },
            { "im": 1302, "lt": -33.45, "lg": -70.66 }
        ]))))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("im=1301&"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<b>Fatal error</b>"))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_api(&server, "im=1302&", local("Farmacia Centro", "24 horas")).await;

    let store = DatasetStore::new(scratch_path("non-json"));
    let summary = collector(&server, store.clone())
        .run_collection()
        .await
        .expect("collection run");

    assert_eq!(summary.pharmacies, 1);
    assert_eq!(summary.regions_ok, 1);
    let dataset = store.load().await.expect("load").expect("committed");
    assert_eq!(dataset.pharmacies[0].get("im"), Some(&json!(1302)));
    assert_eq!(dataset.pharmacies[0].get("lat"), Some(&json!(-33.45)));
}

fn timed_settings(server: &MockServer, request_ms: u64, session_ms: u64) -> UpstreamSettings {
    UpstreamSettings {
        request_timeout: Duration::from_millis(request_ms),
        session_timeout: Duration::from_millis(session_ms),
        ..settings(server, 0)
    }
}

async fn mount_slow_landing(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(LANDING))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>mapa</body></html>")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn slow_landing_within_session_timeout_opens_session() {
    let server = MockServer::start().await;
    mount_slow_landing(&server, Duration::from_millis(1500)).await;

    let session = DirectConnector::new(timed_settings(&server, 500, 5_000))
        .open()
        .await
        .expect("landing slower than a request but within the session timeout");
    session.close().await;
}

#[tokio::test]
async fn landing_past_session_timeout_fails_to_open() {
    let server = MockServer::start().await;
    mount_slow_landing(&server, Duration::from_secs(3)).await;

    let err = DirectConnector::new(timed_settings(&server, 5_000, 500))
        .open()
        .await
        .err()
        .expect("session timeout");

    assert!(
        err.to_string().contains("did not respond within"),
        "got: {err}"
    );
}

#[tokio::test]
async fn api_outage_after_landing_keeps_previous_dataset() {
    let server = MockServer::start().await;
    mount_landing(&server).await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(500))
        .expect(16)
        .mount(&server)
        .await;

    let store = DatasetStore::new(scratch_path("api-outage"));
    let previous: farmaturno_core::Dataset = serde_json::from_value(json!({
        "fechaActualizacion": "2026-10-19T11:00:00.000Z",
        "farmacias": [{ "im": "7845", "lat": "-33.43", "lng": "-70.65", "nm": "Farmacia Central" }]
    }))
    .expect("dataset fixture");
    store.replace(&previous).await.expect("seed dataset");

    let err = collector(&server, store.clone())
        .run_collection()
        .await
        .unwrap_err();

    assert!(
        matches!(err, CollectError::NoRegions { regions: 16 }),
        "got: {err:?}"
    );
    assert_eq!(store.load().await.expect("load"), Some(previous));
}
