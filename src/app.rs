use std::{path::Path, sync::Arc};

use crate::{
    config::Config,
    error::ServerError,
    ledger::{SessionLedger, DEFAULT_CONVERSATION_LIMIT},
    responder::{ticket_priority, Responder},
    rules::RuleTable,
    types::*,
    widget::{render_widget, WidgetContext, QUICK_TOPICS},
};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

const SESSION_COOKIE: &str = "support_session";
const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx"];
const WIDGET_GREETING: &str = "Welcome! I'm your support assistant. I can help with billing, technical issues, account questions, and more. How can I assist you today?";

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

struct VisitorSession {
    id: String,
    issued: bool,
}

fn is_valid_session_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 100
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn session_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

/// Explicit id from the request body first, then the cookie, else a fresh one.
fn resolve_session(headers: &HeaderMap, explicit: Option<&str>) -> VisitorSession {
    let known = explicit
        .map(str::trim)
        .filter(|id| is_valid_session_id(id))
        .map(str::to_string)
        .or_else(|| session_from_cookie(headers).filter(|id| is_valid_session_id(id)));

    match known {
        Some(id) => VisitorSession { id, issued: false },
        None => VisitorSession {
            id: Uuid::new_v4().to_string(),
            issued: true,
        },
    }
}

fn with_session_cookie(mut response: Response, session: &VisitorSession) -> Response {
    if !session.issued {
        return response;
    }
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        session.id
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied name to a safe basename: accents folded to ASCII,
/// whitespace folded to `_`, then only word characters, dots and dashes kept,
/// with no leading or trailing dots.
fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let ascii = base.nfkd().filter(char::is_ascii).collect::<String>();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let Ok(unsafe_chars) = Regex::new(r"[^A-Za-z0-9_.-]") else {
        return String::new();
    };
    unsafe_chars
        .replace_all(&joined, "")
        .trim_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

fn accept_attribute() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

async fn home(headers: HeaderMap) -> Response {
    let session = resolve_session(&headers, None);
    let accept = accept_attribute();
    let page = render_widget(&WidgetContext {
        title: "Support Center",
        greeting: WIDGET_GREETING,
        quick_topics: QUICK_TOPICS,
        accept: &accept,
    });
    with_session_cookie(Html(page).into_response(), &session)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "now": now_iso(),
        "persistence": state.ledger.mode()
    }))
}

async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // anything that is not a JSON object with a string message reads as ""
    let body = serde_json::from_slice::<ChatBody>(&body).unwrap_or_default();
    let session = resolve_session(&headers, body.session_id.as_deref());

    let classification = state.responder.classify(&body.message);

    let ticket = match ticket_priority(&classification) {
        Some(priority) => Some(TicketNotice {
            ticket_created: true,
            ticket_id: state.ledger.open_ticket(&session.id, priority).await,
        }),
        None => None,
    };

    state
        .ledger
        .record_turn(
            &session.id,
            &body.message,
            &classification.response_text,
            Speaker::User,
        )
        .await;

    let reply = ChatReply {
        response: classification.response_text,
        ticket,
    };
    with_session_cookie(Json(reply).into_response(), &session)
}

async fn store_upload(dir: &Path, stored_name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(dir.join(stored_name), bytes).await
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let session = resolve_session(&headers, None);
    let reply = receive_upload(&state, &session, multipart).await;
    with_session_cookie(Json(reply).into_response(), &session)
}

async fn receive_upload(
    state: &AppState,
    session: &VisitorSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadReply {
    let Ok(mut multipart) = multipart else {
        return UploadReply::rejected("No file selected");
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(session_id = %session.id, error = %err, "failed to read multipart body");
                return UploadReply::rejected("File upload failed");
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or("").to_string();
        if original.is_empty() {
            return UploadReply::rejected("No file selected");
        }
        if !allowed_file(&original) {
            tracing::debug!(session_id = %session.id, filename = %original, "upload rejected by extension");
            return UploadReply::rejected("File type not allowed");
        }
        let filename = secure_filename(&original);

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(session_id = %session.id, error = %err, "failed to read upload");
                return UploadReply::rejected("File upload failed");
            }
        };

        let stored_name = format!("{}_{}", Uuid::new_v4(), filename);
        if let Err(err) = store_upload(&state.upload_dir, &stored_name, &bytes).await {
            tracing::warn!(session_id = %session.id, error = %err, "failed to store upload");
            return UploadReply::rejected("File upload failed");
        }

        state
            .ledger
            .record_upload(&session.id, &stored_name, &filename)
            .await;

        return UploadReply::stored(format!(
            "Thanks for uploading {filename}! I've received your file and our support team can now review it to better assist you."
        ));
    }

    UploadReply::rejected("No file selected")
}

async fn admin_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT);
    Json(state.ledger.list_conversations(limit).await)
}

async fn admin_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let tickets = match query.session_id.as_deref() {
        Some(session_id) => state.ledger.list_tickets_for_session(session_id).await,
        None => state.ledger.list_tickets().await,
    };
    Json(tickets)
}

async fn admin_uploads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ledger.list_uploads().await)
}

pub fn router(state: Arc<AppState>, max_content_length: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/chat", post(post_chat))
        .route("/upload", post(upload_file))
        .route("/admin/conversations", get(admin_conversations))
        .route("/admin/tickets", get(admin_tickets))
        .route("/admin/uploads", get(admin_uploads))
        .layer(DefaultBodyLimit::max(max_content_length))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn open_ledger(config: &Config) -> SessionLedger {
    if !config.persistence_enabled {
        return SessionLedger::Disabled;
    }
    match SessionLedger::connect(&config.database_url, config.persist_timeout).await {
        Ok(ledger) => ledger,
        Err(err) => {
            tracing::warn!(error = %err, "database unavailable, chat continues without persistence");
            SessionLedger::Disabled
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub async fn run() -> Result<(), ServerError> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    let rules = match &config.rules_path {
        Some(path) => RuleTable::from_json_file(path)?,
        None => RuleTable::builtin(),
    };

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|source| ServerError::UploadDir {
            path: config.upload_dir.display().to_string(),
            source,
        })?;

    let ledger = open_ledger(&config).await;
    tracing::info!(
        persistence = ledger.mode(),
        upload_dir = %config.upload_dir.display(),
        faq_rules = rules.faq.len(),
        general_rules = rules.general.len(),
        "support chat configured"
    );

    let state = Arc::new(AppState {
        responder: Responder::new(Arc::new(rules)),
        ledger,
        upload_dir: config.upload_dir.clone(),
    });

    let app = router(state.clone(), config.max_content_length);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("support chat server running at http://localhost:{}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    state.ledger.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::DEFAULT_MAX_CONTENT_LENGTH;

    struct Harness {
        app: Router,
        state: Arc<AppState>,
        _uploads: TempDir,
    }

    async fn harness(persistent: bool) -> Harness {
        harness_with_limit(persistent, DEFAULT_MAX_CONTENT_LENGTH).await
    }

    async fn harness_with_limit(persistent: bool, max_content_length: usize) -> Harness {
        let uploads = tempfile::tempdir().unwrap();
        let ledger = if persistent {
            SessionLedger::connect("sqlite::memory:", Duration::from_secs(5))
                .await
                .unwrap()
        } else {
            SessionLedger::Disabled
        };
        let state = Arc::new(AppState {
            responder: Responder::new(Arc::new(RuleTable::builtin())),
            ledger,
            upload_dir: uploads.path().to_path_buf(),
        });
        Harness {
            app: router(state.clone(), max_content_length),
            state,
            _uploads: uploads,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let (status, headers, body) = send(app, request).await;
        (status, headers, serde_json::from_slice(&body).unwrap())
    }

    fn chat(body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = cookie {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={id}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn upload(filename: &str, content: &str) -> Request<Body> {
        let boundary = "SUPPORTBOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::COOKIE, format!("{SESSION_COOKIE}=uploader"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn set_cookie(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn home_page_renders_widget_and_issues_session() {
        let h = harness(false).await;
        let (status, headers, body) = send(&h.app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Support Center"));
        let cookie = set_cookie(&headers).unwrap();
        assert!(cookie.starts_with("support_session="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn greeting_gets_a_canned_reply_without_ticket() {
        let h = harness(true).await;
        let (status, headers, body) =
            send_json(&h.app, chat(json!({ "message": "hello" }), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().contains("Welcome"));
        assert!(body.get("ticketCreated").is_none());
        assert!(body.get("ticketId").is_none());
        assert!(set_cookie(&headers).is_some());
    }

    #[tokio::test]
    async fn escalation_opens_exactly_one_ticket_and_records_the_turn() {
        let h = harness(true).await;
        let (status, headers, body) = send_json(
            &h.app,
            chat(json!({ "message": "please connect me to a human" }), Some("visitor-1")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticketCreated"], json!(true));
        let ticket_id = body["ticketId"].as_str().unwrap().to_string();
        assert!(set_cookie(&headers).is_none());

        let tickets = h.state.ledger.list_tickets_for_session("visitor-1").await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].id, ticket_id);
        assert_eq!(tickets[0].priority, TicketPriority::High);

        let turns = h.state.ledger.list_conversations(10).await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, "please connect me to a human");
        assert_eq!(turns[0].response, body["response"].as_str().unwrap());
    }

    #[tokio::test]
    async fn escalation_without_persistence_still_answers() {
        let h = harness(false).await;
        let (status, _, body) =
            send_json(&h.app, chat(json!({ "message": "agent for billing" }), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"]
            .as_str()
            .unwrap()
            .contains("connecting you with a live agent"));
        assert_eq!(body["ticketCreated"], json!(true));
        assert_eq!(body["ticketId"], Value::Null);
    }

    #[tokio::test]
    async fn chat_survives_a_failing_store() {
        let h = harness(true).await;
        h.state.ledger.close().await;
        let (status, _, body) =
            send_json(&h.app, chat(json!({ "message": "human" }), Some("s"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticketCreated"], json!(true));
        assert_eq!(body["ticketId"], Value::Null);
    }

    #[tokio::test]
    async fn malformed_chat_bodies_get_the_fallback() {
        let h = harness(false).await;
        let fallback = {
            let rules = RuleTable::builtin();
            format!("{}{}", rules.default_response, rules.topic_suffix)
        };

        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .body(Body::from("not json at all"))
            .unwrap();
        let (status, _, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], json!(fallback));

        let (status, _, body) = send_json(&h.app, chat(json!({ "message": 7 }), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], json!(fallback));
    }

    #[tokio::test]
    async fn non_string_session_id_keeps_the_message() {
        let h = harness(true).await;
        let (status, headers, body) = send_json(
            &h.app,
            chat(json!({ "message": "hello", "sessionId": 42 }), Some("cookie-visitor")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], json!(RuleTable::builtin().general[0].response));
        assert!(body["response"].as_str().unwrap().starts_with("Hi there!"));
        assert!(set_cookie(&headers).is_none());

        let turns = h.state.ledger.list_conversations(10).await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].session_id, "cookie-visitor");
        assert_eq!(turns[0].message, "hello");
    }

    #[tokio::test]
    async fn body_session_id_wins_over_cookie() {
        let h = harness(true).await;
        send_json(
            &h.app,
            chat(json!({ "message": "human", "sessionId": "from-body" }), Some("from-cookie")),
        )
        .await;
        assert_eq!(h.state.ledger.list_tickets_for_session("from-body").await.len(), 1);
        assert!(h.state.ledger.list_tickets_for_session("from-cookie").await.is_empty());
    }

    #[tokio::test]
    async fn unusable_cookie_is_replaced() {
        let h = harness(false).await;
        let (_, headers, _) =
            send_json(&h.app, chat(json!({ "message": "hi" }), Some("../../etc"))).await;
        assert!(set_cookie(&headers).is_some());
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected_softly() {
        let h = harness(true).await;
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "error": "No file selected" }));
    }

    #[tokio::test]
    async fn allowed_upload_is_stored_and_recorded() {
        let h = harness(true).await;
        let (status, _, body) = send_json(&h.app, upload("test.txt", "hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert!(body["message"].as_str().unwrap().contains("test.txt"));

        let uploads = h.state.ledger.list_uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].session_id, "uploader");
        assert_eq!(uploads[0].original_filename, "test.txt");
        assert!(uploads[0].stored_filename.ends_with("_test.txt"));

        let stored = h.state.upload_dir.join(&uploads[0].stored_filename);
        assert_eq!(std::fs::read_to_string(stored).unwrap(), "hello");
    }

    #[tokio::test]
    async fn upload_works_without_persistence() {
        let h = harness(false).await;
        let (_, _, body) = send_json(&h.app, upload("Shot.PNG", "png-bytes")).await;
        assert_eq!(body["success"], json!(true));
        let files = std::fs::read_dir(&h.state.upload_dir).unwrap().count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn disallowed_extension_is_refused() {
        let h = harness(true).await;
        let (_, _, body) = send_json(&h.app, upload("setup.exe", "MZ")).await;
        assert_eq!(body, json!({ "success": false, "error": "File type not allowed" }));
        assert!(h.state.ledger.list_uploads().await.is_empty());
        assert_eq!(std::fs::read_dir(&h.state.upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_over_the_body_limit_reports_failure() {
        let h = harness_with_limit(true, 64).await;
        let (status, _, body) = send_json(&h.app, upload("a.txt", &"a".repeat(500))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "error": "File upload failed" }));
        assert!(h.state.ledger.list_uploads().await.is_empty());
        assert_eq!(std::fs::read_dir(&h.state.upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn non_ascii_names_are_checked_before_sanitising() {
        let h = harness(true).await;
        let (_, _, body) = send_json(&h.app, upload("résumé.pdf", "%PDF")).await;
        assert_eq!(body["success"], json!(true));
        let (_, _, body) = send_json(&h.app, upload("中文.txt", "notes")).await;
        assert_eq!(body["success"], json!(true));

        let uploads = h.state.ledger.list_uploads().await;
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].original_filename, "txt");
        assert!(uploads[1].stored_filename.ends_with("_resume.pdf"));
    }

    #[tokio::test]
    async fn admin_listings_are_most_recent_first() {
        let h = harness(true).await;
        for message in ["hello", "billing", "human"] {
            send_json(&h.app, chat(json!({ "message": message }), Some("admin-view"))).await;
        }

        let (status, _, turns) = send_json(&h.app, get("/admin/conversations")).await;
        assert_eq!(status, StatusCode::OK);
        let messages = turns
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["message"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["human", "billing", "hello"]);
        assert_eq!(turns[0]["sessionId"], json!("admin-view"));
        assert_eq!(turns[0]["speaker"], json!("user"));

        let (_, _, limited) = send_json(&h.app, get("/admin/conversations?limit=1")).await;
        assert_eq!(limited.as_array().unwrap().len(), 1);

        let (_, _, tickets) = send_json(&h.app, get("/admin/tickets")).await;
        assert_eq!(tickets.as_array().unwrap().len(), 1);
        assert_eq!(tickets[0]["status"], json!("open"));
        assert_eq!(tickets[0]["priority"], json!("high"));

        let (_, _, none) = send_json(&h.app, get("/admin/tickets?sessionId=other")).await;
        assert_eq!(none, json!([]));
    }

    #[tokio::test]
    async fn admin_listings_are_empty_without_persistence() {
        let h = harness(false).await;
        for uri in ["/admin/conversations", "/admin/tickets", "/admin/uploads"] {
            let (status, _, body) = send_json(&h.app, get(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!([]), "{uri}");
        }
    }

    #[tokio::test]
    async fn health_reports_persistence_mode() {
        let h = harness(false).await;
        let (_, _, body) = send_json(&h.app, get("/health")).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["persistence"], json!("disabled"));
    }

    #[test]
    fn filenames_are_reduced_to_safe_basenames() {
        assert_eq!(secure_filename("my report.pdf"), "my_report.pdf");
        assert_eq!(secure_filename("../../etc/passwd.txt"), "passwd.txt");
        assert_eq!(secure_filename("C:\\Users\\me\\shot.png"), "shot.png");
        assert_eq!(secure_filename(".hidden.txt"), "hidden.txt");
        assert_eq!(secure_filename("résumé.docx"), "resume.docx");
        assert_eq!(secure_filename("中文.txt"), "txt");
        assert_eq!(secure_filename("../.."), "");
    }

    #[test]
    fn extension_allow_list_uses_the_last_dot() {
        assert!(allowed_file("notes.TXT"));
        assert!(allowed_file("archive.tar.pdf"));
        assert!(!allowed_file("report.pdf.exe"));
        assert!(!allowed_file("txt"));
        assert!(!allowed_file("photo.webp"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; support_session=abc-123 ; lang=en"),
        );
        let session = resolve_session(&headers, None);
        assert_eq!(session.id, "abc-123");
        assert!(!session.issued);

        let session = resolve_session(&HeaderMap::new(), Some("   "));
        assert!(session.issued);
        assert!(Uuid::parse_str(&session.id).is_ok());
    }
}
