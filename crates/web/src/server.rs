//! Web server implementation

use crate::auth::CredentialVerifier;
use crate::pages;
use crate::session::{SessionCodec, SESSION_COOKIE};
use crate::snapshot::DomainSnapshotStore;
use crate::static_files::StaticFiles;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use yak_common::{Credential, SessionClaims};

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    verifier: CredentialVerifier,
    codec: SessionCodec,
    snapshots: Arc<DomainSnapshotStore>,
    static_files: StaticFiles,
}

impl WebServerState {
    /// Claims from a valid session cookie. Every failure reads as "not logged in".
    fn session(&self, jar: &CookieJar) -> Option<SessionClaims> {
        let cookie = jar.get(SESSION_COOKIE)?;
        match self.codec.decode(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                None
            }
        }
    }
}

impl WebServer {
    /// Create a new web server
    pub fn new(
        verifier: CredentialVerifier,
        codec: SessionCodec,
        snapshots: Arc<DomainSnapshotStore>,
        static_files: StaticFiles,
    ) -> Self {
        Self {
            state: Arc::new(WebServerState {
                verifier,
                codec,
                snapshots,
                static_files,
            }),
        }
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/login", post(login_handler))
            .route("/logout", post(logout_handler))
            .route("/healthz", get(health_handler))
            .nest_service("/images", self.state.static_files.service())
            .fallback(not_found_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` fires
    pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Web console listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

// ============================================================================
// Handlers
// ============================================================================

async fn index_handler(State(state): State<Arc<WebServerState>>, jar: CookieJar) -> Html<String> {
    match state.session(&jar) {
        Some(claims) => Html(pages::domain_list(&claims.username, &state.snapshots.current())),
        None => Html(pages::LOGIN_PAGE.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

async fn login_handler(
    State(state): State<Arc<WebServerState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Redirect) {
    let credential = Credential::new(form.name, form.password);
    if !credential.is_complete() {
        debug!("Login form submitted without name or password");
        return (jar, Redirect::to("/"));
    }

    let username = credential.username.clone();
    let claims = match state.verifier.verify(credential).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!(user = %username, kind = e.kind(), "Login failed: {}", e);
            return (jar, Redirect::to("/"));
        }
    };

    match state.codec.encode(&claims) {
        Ok(token) => {
            info!(user = %username, "Login succeeded");
            (jar.add(session_cookie(token)), Redirect::to("/"))
        }
        Err(e) => {
            error!(user = %username, "Failed to issue session: {}", e);
            (jar, Redirect::to("/"))
        }
    }
}

async fn logout_handler(State(state): State<Arc<WebServerState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(claims) = state.session(&jar) {
        info!(user = %claims.username, "Logout");
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Redirect::to("/"))
}

async fn health_handler(State(state): State<Arc<WebServerState>>) -> impl IntoResponse {
    format!("ok generation={}\n", state.snapshots.current().generation)
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, "404 not found.").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthBackend, AuthError, Conversation, Prompt};
    use crate::session::SessionKeys;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use std::time::Duration;
    use tower::ServiceExt;

    struct AcceptAlice;

    impl AuthBackend for AcceptAlice {
        fn authenticate(&self, username: &str, mut conversation: Conversation) -> Result<(), AuthError> {
            let password = conversation.respond(&Prompt::EchoOff("Password: ".into()))?;
            if username == "alice" && password == "correct" {
                Ok(())
            } else {
                Err(AuthError::BadCredentials("authentication failure".into()))
            }
        }
    }

    fn server() -> WebServer {
        let snapshots = Arc::new(DomainSnapshotStore::new());
        snapshots.publish(vec!["web1".into(), "db1".into()]);
        WebServer::new(
            CredentialVerifier::new(Arc::new(AcceptAlice)),
            SessionCodec::new(SessionKeys::generate(), Duration::from_secs(3600)),
            snapshots,
            StaticFiles::new(std::env::temp_dir().join("yak-no-such-dir")),
        )
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_methods_are_rejected() {
        let app = server().router();
        for (method, uri) in [
            (Method::POST, "/"),
            (Method::GET, "/login"),
            (Method::GET, "/logout"),
        ] {
            let resp = app.clone().oneshot(request(method, uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let resp = server()
            .router()
            .oneshot(request(Method::GET, "/admin"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_login_fields_do_not_set_cookie() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=alice"))
            .unwrap();
        let resp = server().router().oneshot(req).await.unwrap();
        assert!(resp.status().is_redirection());
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_healthz_reports_generation() {
        let resp = server()
            .router()
            .oneshot(request(Method::GET, "/healthz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok generation=1\n");
    }
}
