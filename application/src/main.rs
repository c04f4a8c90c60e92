use std::{
    future::IntoFuture as _,
    io,
    sync::{Arc, OnceLock},
    time,
};

use application::{api, graphql, Args, Config};
use axum::{
    extract::MatchedPath,
    routing::{get, on, MethodFilter},
    Extension, Router,
};
use axum_client_ip::InsecureClientIp;
use futures::{future, TryFutureExt as _};
use service::{
    infra::{notifier, postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

/// Levels written to stderr instead of stdout.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Maximum level to log, set once the [`Config`] is loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    init_logging();

    _ = start().await;
}

/// Installs two compact [`tracing_subscriber`] layers: warnings and errors
/// go to stderr, everything else to stdout.
fn init_logging() {
    let enabled = |to_stderr: bool| {
        filter_fn(move |meta| {
            if meta.is_span() {
                return true;
            }
            let max = LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO);
            STDERR_LEVELS.contains(meta.level()) == to_stderr
                && max >= *meta.level()
        })
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(enabled(false)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(enabled(true)),
        )
        .init();
}

async fn start() -> Result<(), ()> {
    let Args {
        config,
        migrate_only,
    } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        server,
        log,
    } = Config::new(&config).map_err(|e| {
        log::error!("failed to load `Config` from `{config}`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let mut postgres = Postgres::new(&postgres.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;
    let applied =
        postgres.migrate(migrations::runner()).await.map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;
    if migrate_only {
        log::info!("applied {applied} migration(s), exiting");
        return Ok(());
    }

    let service: service::Config = service.into();
    log::info!(
        deliver_notifications.interval = ?service.deliver_notifications.interval,
        deliver_notifications.batch_size =
            service.deliver_notifications.batch_size,
        mark_overdue_rent_payments.interval =
            ?service.mark_overdue_rent_payments.interval,
        "starting background tasks",
    );
    let (service, background) = Service::new(service, postgres, notifier::Log);

    let schema = api::Schema::new(
        api::Query,
        api::Mutation,
        juniper::EmptySubscription::new(),
    );

    let mut cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ]);
    for origin in server.cors.origins {
        let origin =
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not a valid CORS origin: {e}");
            })?;
        cors = cors.allow_origin(origin);
    }

    let app = Router::new()
        .route(
            "/graphql",
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .route("/graphiql", get(juniper_axum::graphiql("/graphql", None)))
        .layer(Extension(Arc::new(schema)))
        .layer(Extension(service))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|r: &http::Request<_>| http_span(r))
                .on_response(
                    |r: &http::Response<_>,
                     dur: time::Duration,
                     span: &tracing::Span| {
                        log_response(r, dur, span);
                    },
                ),
        );

    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        log::error!("failed to listen on `{addr}`: {e}");
    })?;
    log::info!("listening on `{addr}`");

    future::try_join(
        axum::serve(listener, app)
            .into_future()
            .map_err(|e| log::error!("webserver failed: {e}")),
        background.into_future().map_err(|e| {
            log::error!("background task failed: {e}");
        }),
    )
    .await
    .map(drop)
}

/// Creates the [`tracing::Span`] of an incoming HTTP request.
fn http_span<B>(r: &http::Request<B>) -> tracing::Span {
    tracing::info_span!(
        "HTTP request",
        http.client_ip = InsecureClientIp::from(r.headers(), r.extensions())
            .map(|ip| ip.0.to_string())
            .ok(),
        http.flavor = ?r.version(),
        http.host = r.uri().host(),
        http.method = r.method().as_str(),
        http.route = r
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        http.scheme = r.uri().scheme().map(http::uri::Scheme::as_str),
        http.target = r
            .uri()
            .path_and_query()
            .map(http::uri::PathAndQuery::as_str),
        http.user_agent = r
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok()),
        http.status_code = tracing::field::Empty,
    )
}

/// Records the status of an HTTP response into its `span`.
///
/// Client and server errors are logged as errors.
fn log_response<B>(
    r: &http::Response<B>,
    dur: time::Duration,
    span: &tracing::Span,
) {
    let status = r.status();
    _ = span.record("http.status_code", status.as_u16());

    let duration = format!("{}ms", dur.as_millis());
    if status.is_client_error() || status.is_server_error() {
        tracing::error!(duration = %duration);
    } else {
        tracing::info!(duration = %duration);
    }
}
