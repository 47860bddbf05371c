use axum::{
    http::Method,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::require_auth;
use crate::handlers;
use crate::state::AppState;

/// Create the HTTP router. Everything except registration, login and the
/// health check sits behind the bearer-token middleware. Each route also
/// answers without its trailing slash.
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let protected_routes: [(&str, MethodRouter<AppState>); 7] = [
        ("/user/tweets/feed/", get(handlers::feed)),
        ("/user/following/", get(handlers::following)),
        ("/user/followers/", get(handlers::followers)),
        (
            "/user/tweets/",
            get(handlers::own_tweets).post(handlers::create_tweet),
        ),
        (
            "/tweets/:tweet_id/",
            get(handlers::tweet_detail).delete(handlers::delete_tweet),
        ),
        ("/tweets/:tweet_id/likes/", get(handlers::tweet_likes)),
        ("/tweets/:tweet_id/replies/", get(handlers::tweet_replies)),
    ];
    let protected = protected_routes
        .into_iter()
        .fold(Router::new(), |router, (path, methods)| {
            with_and_without_slash(router, path, methods)
        })
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes: [(&str, MethodRouter<AppState>); 2] = [
        ("/register/", post(handlers::register)),
        ("/login/", post(handlers::login)),
    ];
    public_routes
        .into_iter()
        .fold(
            Router::new().route("/health", get(handlers::health)),
            |router, (path, methods)| with_and_without_slash(router, path, methods),
        )
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn with_and_without_slash(
    router: Router<AppState>,
    path: &str,
    methods: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path.trim_end_matches('/'), methods.clone())
        .route(path, methods)
}

/// Serve on `addr` until Ctrl+C or SIGTERM.
pub async fn start_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = create_server(state);

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
