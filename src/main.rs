use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use howling_mine::{
    application::{
        content::ContentService, error::AppError, mining_stats::MiningStatsService,
        repos::ContentSource, revalidate::Revalidator, routes::enumerate_routes,
    },
    config::{self, ContentBackend, ContentSettings},
    infra::{
        cache::ResponseCache,
        error::InfraError,
        fixtures::FixtureContentSource,
        http::{self, RouterState},
        sanity::SanityClient,
        stats::HttpStatsUpstream,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Routes(_) => run_routes(settings).await,
    }
}

async fn build_content_source(
    settings: &ContentSettings,
) -> Result<Arc<dyn ContentSource>, AppError> {
    match &settings.backend {
        ContentBackend::Fixtures { path } => {
            let source = FixtureContentSource::load(path)
                .await
                .map_err(InfraError::from)?;
            info!(path = %path.display(), "serving content from fixtures");
            Ok(Arc::new(source))
        }
        ContentBackend::Sanity(sanity) => {
            let client = SanityClient::from_settings(sanity, settings.request_timeout)?;
            info!(
                endpoint = %client.endpoint(),
                dataset = %sanity.dataset,
                "serving content from sanity"
            );
            Ok(Arc::new(client))
        }
    }
}

async fn run_routes(settings: config::Settings) -> Result<(), AppError> {
    let content = ContentService::new(build_content_source(&settings.content).await?);
    for route in enumerate_routes(&content).await? {
        println!("{route}");
    }
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let content = ContentService::new(build_content_source(&settings.content).await?);

    let revalidator = Revalidator::new(settings.revalidate.secret.clone());
    if !revalidator.is_configured() {
        warn!("revalidate.secret is not set; webhook requests will be rejected");
    }

    let stats = match settings.stats.upstream_url.clone() {
        Some(base) => {
            let upstream = HttpStatsUpstream::new(base, settings.stats.timeout)?;
            MiningStatsService::new(Some(Arc::new(upstream)))
        }
        None => {
            warn!("stats.upstream_url is not set; mining stats requests will fail");
            MiningStatsService::new(None)
        }
    };

    let cache = settings
        .cache
        .enabled
        .then(|| ResponseCache::new(settings.cache.max_entries.get()));

    let state = RouterState::new(
        content,
        &settings.site.title,
        settings.site.environment,
        cache,
        revalidator,
        stats,
    );
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        addr = %settings.server.addr,
        environment = %settings.site.environment,
        "listening"
    );

    serve_until_shutdown(listener, router, settings.server.graceful_shutdown).await
}

async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    grace: Duration,
) -> Result<(), AppError> {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        })
        .into_future();
    let mut handle = tokio::spawn(server);

    tokio::select! {
        joined = &mut handle => return server_outcome(joined),
        _ = shutdown_signal() => {}
    }

    info!(grace_seconds = grace.as_secs(), "shutting down");
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!("graceful shutdown deadline elapsed; aborting open connections");
            handle.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
