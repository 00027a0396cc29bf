//! Preview server with live reload and the checkout endpoint

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::cart::CheckoutLineItem;
use crate::checkout::{CheckoutBridge, CheckoutError, StripeProvider};
use crate::Folio;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
    /// `None` when no provider secret is configured
    checkout: Option<CheckoutBridge>,
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    line_items: Vec<CheckoutLineItem>,
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    retryable: bool,
}

/// Start the preview server
pub async fn start(
    folio: &Folio,
    ip: &str,
    port: u16,
    live_reload: bool,
    open: bool,
) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: folio.public_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload,
        checkout: checkout_bridge(folio),
    });

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if live_reload {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    // Start file watcher if live reload is enabled
    if live_reload {
        let folio = folio.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch(folio, Some(reload_tx)) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .route("/api/checkout", post(checkout_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Build the checkout bridge, or `None` when the provider is not configured
fn checkout_bridge(folio: &Folio) -> Option<CheckoutBridge> {
    let config = &folio.config.checkout;
    match StripeProvider::from_env(config) {
        Ok(provider) => Some(CheckoutBridge::new(
            Arc::new(provider),
            &folio.config.checkout_base_url(),
            config.clone(),
        )),
        Err(e) => {
            tracing::warn!("Checkout disabled: {}", e);
            None
        }
    }
}

/// `POST /api/checkout` with `{ "line_items": [{ "price", "quantity" }] }`
async fn checkout_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    let Some(bridge) = &state.checkout else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "checkout is not configured".to_string(),
            false,
        );
    };

    match bridge.create_session(request.line_items).await {
        Ok(redirect) => Json(CheckoutResponse { url: redirect.url }).into_response(),
        Err(e) => {
            let status = match e {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::Provider(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, e.to_string(), e.is_retryable())
        }
    }
}

fn error_response(status: StatusCode, error: String, retryable: bool) -> Response {
    (status, Json(ErrorResponse { error, retryable })).into_response()
}

/// Watch the content tree and config, regenerate on change and notify
/// live reload clients. Blocks until the watcher shuts down.
pub fn watch(folio: Folio, reload_tx: Option<broadcast::Sender<()>>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    let dirs = [folio.content_dir.clone(), folio.base_dir.join("static")];
    for dir in dirs.iter().filter(|d| d.exists()) {
        debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", dir);
    }

    let files = [folio.base_dir.join("_config.yml"), folio.catalog_path()];
    for file in files.iter().filter(|f| f.exists()) {
        debouncer
            .watcher()
            .watch(file, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", file);
    }

    // Handle file change events
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // Filter out editor and VCS noise
                let relevant_events: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant_events.is_empty() {
                    continue;
                }

                for event in &relevant_events {
                    tracing::info!("File changed: {}", event.path.display());
                }

                // Config edits need a fresh Folio
                let result = Folio::new(&folio.base_dir).and_then(|f| f.generate());
                match result {
                    Ok(()) => {
                        tracing::info!("Regenerated successfully");
                        if let Some(tx) = &reload_tx {
                            // No receivers just means no open pages
                            let _ = tx.send(());
                        }
                    }
                    Err(e) => {
                        tracing::error!("Generation failed: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Fallback handler that serves files, injects the live reload script and
/// answers unknown paths with the generated 404 page
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path();

    let file_path = if path == "/" {
        state.public_dir.join("index.html")
    } else {
        let clean_path = path.trim_start_matches('/');
        let candidate = state.public_dir.join(clean_path);

        if candidate.is_dir() {
            candidate.join("index.html")
        } else if candidate.exists() {
            candidate
        } else {
            // Try adding .html extension
            let with_html = state.public_dir.join(format!("{}.html", clean_path));
            if with_html.exists() {
                with_html
            } else {
                candidate
            }
        }
    };

    if !file_path.exists() || path.contains("..") {
        return not_found(&state).await;
    }

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => not_found(&state).await,
        }
    } else {
        // Serve static file using tower-http
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

async fn not_found(state: &ServerState) -> Response {
    match tokio::fs::read_to_string(state.public_dir.join("404.html")).await {
        Ok(content) => {
            let body = if state.live_reload {
                inject_live_reload(&content)
            } else {
                content
            };
            (StatusCode::NOT_FOUND, Html(body)).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::tests::FakeProvider;
    use crate::config::CheckoutConfig;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn state(public_dir: PathBuf, checkout: Option<CheckoutBridge>) -> Arc<ServerState> {
        let (reload_tx, _) = broadcast::channel(1);
        Arc::new(ServerState {
            public_dir,
            reload_tx,
            live_reload: false,
            checkout,
        })
    }

    fn bridge(provider: Arc<FakeProvider>) -> CheckoutBridge {
        CheckoutBridge::new(provider, "https://example.com", CheckoutConfig::default())
    }

    fn request(items: Vec<CheckoutLineItem>) -> Json<CheckoutRequest> {
        Json(CheckoutRequest { line_items: items })
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><p>x</p></body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</body>\n</html>"));
        assert!(inject_live_reload("<p>bare</p>").contains("__livereload"));
    }

    #[tokio::test]
    async fn test_checkout_ok() {
        let provider = Arc::new(FakeProvider::ok());
        let state = state(PathBuf::new(), Some(bridge(provider.clone())));
        let response = checkout_handler(
            State(state),
            request(vec![CheckoutLineItem::new("price_a", 1)]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkout_empty_is_bad_request() {
        let provider = Arc::new(FakeProvider::ok());
        let state = state(PathBuf::new(), Some(bridge(provider.clone())));
        let response = checkout_handler(State(state), request(Vec::new())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_checkout_provider_failure() {
        let provider = Arc::new(FakeProvider::failing());
        let state = state(PathBuf::new(), Some(bridge(provider)));
        let response = checkout_handler(
            State(state),
            request(vec![CheckoutLineItem::new("price_a", 1)]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_checkout_unconfigured() {
        let state = state(PathBuf::new(), None);
        let response = checkout_handler(
            State(state),
            request(vec![CheckoutLineItem::new("price_a", 1)]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_path_serves_404_page() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("404.html"), "<h1>Page Not Found</h1>").unwrap();
        let state = state(tmp.path().to_path_buf(), None);

        let request = Request::builder()
            .uri("/does-not-exist")
            .body(Body::empty())
            .unwrap();
        let response = fallback_handler(State(state), request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
