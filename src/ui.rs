use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::extract::{self, UploadKind, UNSUPPORTED_PLACEHOLDER};
use crate::flow::FlowBackend;
use crate::session::{self, ChatSession, Message, PendingUpload};

const SESSION_ID_LEN: usize = 32;

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<dyn FlowBackend>,
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<ChatSession>>>>>,
}

impl AppState {
    pub fn new(flow: Arc<dyn FlowBackend>) -> Self {
        Self {
            flow,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn session(&self, id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.read().await.get(id).cloned()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/session", post(create_session))
        .route("/api/history/{session_id}", get(history))
        .route("/api/chat", post(chat))
        .route("/api/upload", post(upload))
        .route("/api/send_file", post(send_file))
        .route("/api/send_image", post(send_image))
        .route("/api/clear", post(clear))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: String,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Deserialize)]
struct UploadRequest {
    session_id: String,
    filename: String,
    /// Base64-encoded file bytes.
    data: String,
}

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    kind: &'static str,
    preview: String,
}

#[derive(Deserialize)]
struct SessionRef {
    session_id: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct ClearResponse {
    status: &'static str,
}

async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let id = Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LEN);
    state
        .sessions
        .write()
        .await
        .insert(id.clone(), Arc::new(Mutex::new(ChatSession::new())));
    info!(session_id = %id, "session created");
    (StatusCode::OK, Json(SessionResponse { session_id: id }))
}

async fn history(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let Some(session) = state.session(&session_id).await else {
        return unknown_session();
    };
    let session = session.lock().await;
    (
        StatusCode::OK,
        Json(HistoryResponse {
            messages: session.messages().to_vec(),
        }),
    )
        .into_response()
}

async fn chat(State(state): State<AppState>, Json(payload): Json<ChatRequest>) -> Response {
    let Some(session) = state.session(&payload.session_id).await else {
        return unknown_session();
    };
    // The lock is held across the upstream call, so a session never has
    // more than one turn in flight.
    let mut session = session.lock().await;
    let reply = session.submit(state.flow.as_ref(), payload.message).await;
    (StatusCode::OK, Json(ChatResponse { reply })).into_response()
}

async fn upload(State(state): State<AppState>, Json(payload): Json<UploadRequest>) -> Response {
    let Some(session) = state.session(&payload.session_id).await else {
        return unknown_session();
    };

    let data = match BASE64.decode(payload.data.as_bytes()) {
        Ok(data) => data,
        Err(err) => return bad_request(format!("invalid upload encoding: {err}")),
    };

    let (kind, pending) = match UploadKind::from_filename(&payload.filename) {
        Some(UploadKind::Image) => (
            UploadKind::Image.as_str(),
            PendingUpload::Image {
                filename: payload.filename.clone(),
            },
        ),
        Some(kind) => match extract::extract_text(kind, &data) {
            Ok(text) => (
                kind.as_str(),
                PendingUpload::Text {
                    filename: payload.filename.clone(),
                    text,
                },
            ),
            Err(err) => return bad_request(err.to_string()),
        },
        None => (
            "unknown",
            PendingUpload::Text {
                filename: payload.filename.clone(),
                text: UNSUPPORTED_PLACEHOLDER.to_string(),
            },
        ),
    };

    info!(filename = %payload.filename, kind = %kind, "upload stored");
    let preview = pending.preview();
    session.lock().await.set_pending(pending);

    (
        StatusCode::OK,
        Json(UploadResponse {
            filename: payload.filename,
            kind,
            preview,
        }),
    )
        .into_response()
}

async fn send_file(State(state): State<AppState>, Json(payload): Json<SessionRef>) -> Response {
    let Some(session) = state.session(&payload.session_id).await else {
        return unknown_session();
    };
    let mut session = session.lock().await;

    let text = match session.pending() {
        Some(PendingUpload::Text { text, .. }) => text.clone(),
        _ => return bad_request("no extracted file content to send".to_string()),
    };

    let reply = session.submit(state.flow.as_ref(), text).await;
    (StatusCode::OK, Json(ChatResponse { reply })).into_response()
}

async fn send_image(State(state): State<AppState>, Json(payload): Json<SessionRef>) -> Response {
    let Some(session) = state.session(&payload.session_id).await else {
        return unknown_session();
    };
    let mut session = session.lock().await;

    let notice = match session.pending() {
        Some(PendingUpload::Image { filename }) => session::image_notice(filename),
        _ => return bad_request("no uploaded image to describe".to_string()),
    };

    let reply = session.submit(state.flow.as_ref(), notice).await;
    (StatusCode::OK, Json(ChatResponse { reply })).into_response()
}

async fn clear(State(state): State<AppState>, Json(payload): Json<SessionRef>) -> Response {
    let Some(session) = state.session(&payload.session_id).await else {
        return unknown_session();
    };
    session.lock().await.clear();
    (StatusCode::OK, Json(ClearResponse { status: "cleared" })).into_response()
}

fn unknown_session() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "unknown session".to_string(),
        }),
    )
        .into_response()
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

const CHAT_PAGE: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Customer Support Agent</title>
  <style>
    :root {
      --bg: #f8fafc;
      --card: #ffffff;
      --accent: #2563eb;
      --text: #1e293b;
      --muted: #64748b;
      --border: rgba(0,0,0,0.08);
      --danger: #b91c1c;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: 'Helvetica Neue', system-ui, sans-serif;
      background: var(--bg);
      color: var(--text);
      max-width: 860px;
      margin: 0 auto;
      padding: 24px;
    }
    h1 { font-size: 24px; margin-bottom: 4px; }
    .subtitle { color: var(--muted); margin-bottom: 16px; }
    #log {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 8px;
      padding: 16px;
      height: 380px;
      overflow-y: auto;
      margin-bottom: 12px;
    }
    .msg { padding: 10px 14px; border-radius: 8px; margin-bottom: 10px; white-space: pre-wrap; }
    .msg.user { background: #e0e7ff; }
    .msg.assistant { background: #f0f2f6; }
    .msg .who { font-size: 12px; color: var(--muted); display: block; margin-bottom: 2px; }
    form { display: flex; gap: 8px; margin-bottom: 16px; }
    input[type=text] {
      flex: 1;
      background: #f0f2f6;
      border: 1px solid var(--border);
      border-radius: 6px;
      padding: 10px;
    }
    button {
      background: var(--accent);
      color: white;
      border: none;
      border-radius: 6px;
      padding: 10px 16px;
      cursor: pointer;
    }
    button:disabled { opacity: 0.5; cursor: wait; }
    button.secondary { background: #475569; }
    .upload {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 8px;
      padding: 16px;
    }
    .upload .row { display: flex; gap: 8px; align-items: center; margin-top: 10px; }
    #preview {
      background: #f0f2f6;
      border-radius: 6px;
      padding: 10px;
      margin-top: 10px;
      max-height: 160px;
      overflow-y: auto;
      white-space: pre-wrap;
      font-size: 13px;
      display: none;
    }
    #upload-error { color: var(--danger); margin-top: 8px; }
  </style>
</head>
<body>
  <h1>🤖 Customer Support Agent</h1>
  <p class="subtitle">Ask about orders, shipping, returns, and FAQs — or upload a file for the agent.</p>

  <div id="log"></div>

  <form id="chat-form">
    <input type="text" id="chat-input" placeholder="How can I help you today?" autocomplete="off">
    <button type="submit" id="send-btn">Send</button>
    <button type="button" class="secondary" id="clear-btn">Clear Chat History</button>
  </form>

  <div class="upload">
    <input type="file" id="file-input" accept=".txt,.pdf,.csv,.png,.jpg,.jpeg">
    <div class="row">
      <button type="button" id="send-file-btn" disabled>Send File Content to Agent</button>
      <button type="button" id="send-image-btn" disabled>Send Image Info to Agent</button>
    </div>
    <div id="preview"></div>
    <div id="upload-error"></div>
  </div>

  <script>
    const log = document.getElementById('log');
    const form = document.getElementById('chat-form');
    const input = document.getElementById('chat-input');
    const sendBtn = document.getElementById('send-btn');
    const clearBtn = document.getElementById('clear-btn');
    const fileInput = document.getElementById('file-input');
    const sendFileBtn = document.getElementById('send-file-btn');
    const sendImageBtn = document.getElementById('send-image-btn');
    const preview = document.getElementById('preview');
    const uploadError = document.getElementById('upload-error');

    let sessionId = sessionStorage.getItem('flowchat_session');

    async function api(path, body) {
      const res = await fetch(path, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(body || {}),
      });
      const json = await res.json();
      if (!res.ok) throw new Error(json.error || res.statusText);
      return json;
    }

    async function ensureSession() {
      if (sessionId) {
        const res = await fetch('/api/history/' + sessionId);
        if (res.ok) {
          const json = await res.json();
          json.messages.forEach(m => append(m.role, m.content));
          return;
        }
      }
      const json = await api('/api/session');
      sessionId = json.session_id;
      sessionStorage.setItem('flowchat_session', sessionId);
    }

    function append(role, content) {
      const div = document.createElement('div');
      div.className = 'msg ' + role;
      const who = document.createElement('span');
      who.className = 'who';
      who.textContent = role;
      const body = document.createElement('span');
      body.textContent = content;
      div.appendChild(who);
      div.appendChild(body);
      log.appendChild(div);
      log.scrollTop = log.scrollHeight;
    }

    // One turn at a time: everything stays disabled until the reply lands.
    function setBusy(busy) {
      sendBtn.disabled = busy;
      input.disabled = busy;
      sendFileBtn.disabled = busy || !pendingKind || pendingKind === 'image';
      sendImageBtn.disabled = busy || pendingKind !== 'image';
    }

    let pendingKind = null;

    async function turn(path, body, shown) {
      append('user', shown);
      setBusy(true);
      try {
        const json = await api(path, body);
        append('assistant', json.reply);
      } catch (err) {
        append('assistant', '⚠️ Error: ' + err.message);
      } finally {
        setBusy(false);
      }
    }

    form.addEventListener('submit', async (e) => {
      e.preventDefault();
      const message = input.value.trim();
      if (!message) return;
      input.value = '';
      await turn('/api/chat', { session_id: sessionId, message }, message);
    });

    clearBtn.addEventListener('click', async () => {
      await api('/api/clear', { session_id: sessionId });
      log.innerHTML = '';
    });

    fileInput.addEventListener('change', () => {
      const file = fileInput.files[0];
      uploadError.textContent = '';
      preview.style.display = 'none';
      pendingKind = null;
      setBusy(false);
      if (!file) return;

      const reader = new FileReader();
      reader.onload = async () => {
        const data = reader.result.split(',')[1];
        try {
          const json = await api('/api/upload', {
            session_id: sessionId,
            filename: file.name,
            data,
          });
          pendingKind = json.kind;
          if (json.kind !== 'image') {
            preview.textContent = json.preview;
            preview.style.display = 'block';
          }
          setBusy(false);
        } catch (err) {
          uploadError.textContent = '⚠️ Error: ' + err.message;
        }
      };
      reader.readAsDataURL(file);
    });

    sendFileBtn.addEventListener('click', async () => {
      const file = fileInput.files[0];
      await turn('/api/send_file', { session_id: sessionId },
        '📄 Uploaded `' + (file ? file.name : 'file') + '` sent to the agent.');
    });

    sendImageBtn.addEventListener('click', async () => {
      const file = fileInput.files[0];
      await turn('/api/send_image', { session_id: sessionId },
        '📷 User uploaded an image: ' + (file ? file.name : 'image'));
    });

    ensureSession();
  </script>
</body>
</html>
"##;
