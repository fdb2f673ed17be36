use std::{process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use quire::{
    application::{
        engagement::EngagementService,
        error::AppError,
        feed::FeedService,
        feed_index::{FeedIndexService, FeedLimits},
        jobs::{CacheSweepContext, cache_sweep_schedule, process_cache_sweep_job},
        leaderboard::LeaderboardService,
        projections::ProjectionService,
        repos::{
            ArticlesRepo, EngagementWriteRepo, FeedIndexRepo, HealthRepo, JobsRepo,
            ReputationRepo,
        },
        scoring::ScoringDebouncer,
        stats::StatsService,
    },
    cache::{BoundedCache, CacheBackend, CacheConfig, KvCache, MemoryCache},
    config,
    infra::{
        db::{PoolOptions, PostgresCache, PostgresRepositories},
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::SweepCache(_) => run_sweep_cache(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = build_cache(&repositories, &CacheConfig::from(&settings.cache));
    let http_state = build_http_state(repositories.clone(), cache.clone(), &settings);

    let monitor_handle = spawn_job_monitor(cache, &settings.jobs)?;

    let result = serve_http(&settings, http_state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

async fn run_sweep_cache(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = PostgresCache::new(repositories.pool().clone());

    let purged = cache
        .purge_expired()
        .await
        .map_err(|err| AppError::unexpected(format!("cache sweep failed: {err}")))?;

    info!(
        target = "quire::sweep_cache",
        purged, "Purged expired cache entries"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let options = PoolOptions {
        max_connections: settings.database.max_connections.get(),
        acquire_timeout: settings.database.acquire_timeout,
        statement_timeout: settings.database.statement_timeout,
    };
    let pool = PostgresRepositories::connect(database_url, &options)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    PostgresRepositories::run_queue_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_cache(repositories: &PostgresRepositories, config: &CacheConfig) -> Arc<dyn KvCache> {
    let backend: Arc<dyn KvCache> = match config.backend {
        CacheBackend::Memory => {
            warn!(
                target = "quire::bootstrap",
                "Memory cache selected; debounce leases only coordinate within this process"
            );
            Arc::new(MemoryCache::new())
        }
        CacheBackend::Postgres => Arc::new(PostgresCache::new(repositories.pool().clone())),
    };
    info!(
        target = "quire::bootstrap",
        backend = ?config.backend,
        timeout_ms = config.operation_timeout.as_millis() as u64,
        "Cache backend configured"
    );
    Arc::new(BoundedCache::new(backend, config.operation_timeout))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    cache: Arc<dyn KvCache>,
    settings: &config::Settings,
) -> HttpState {
    let cache_config = CacheConfig::from(&settings.cache);
    let feed_repo: Arc<dyn FeedIndexRepo> = repositories.clone();
    let articles_repo: Arc<dyn ArticlesRepo> = repositories.clone();
    let writes_repo: Arc<dyn EngagementWriteRepo> = repositories.clone();
    let reputation_repo: Arc<dyn ReputationRepo> = repositories.clone();
    let jobs_repo: Arc<dyn JobsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let index = Arc::new(FeedIndexService::new(
        feed_repo,
        FeedLimits::from(&settings.feed),
    ));
    let projections = Arc::new(ProjectionService::new(
        cache.clone(),
        articles_repo.clone(),
        cache_config.projection_ttl,
    ));
    let stats = Arc::new(StatsService::new(
        cache.clone(),
        articles_repo.clone(),
        cache_config.stats_ttl,
    ));
    let scoring = Arc::new(ScoringDebouncer::new(
        cache.clone(),
        jobs_repo,
        settings.scoring.debounce_ttl,
    ));

    HttpState {
        feed: Arc::new(FeedService::new(index, projections, stats)),
        leaderboard: Arc::new(LeaderboardService::new(
            cache,
            reputation_repo,
            cache_config.leaderboard_ttl,
        )),
        engagement: Arc::new(EngagementService::new(
            articles_repo,
            writes_repo,
            scoring,
            settings.scoring.view_window,
        )),
        health: health_repo,
    }
}

fn spawn_job_monitor(
    cache: Arc<dyn KvCache>,
    jobs: &config::JobsSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = cache_sweep_schedule(&jobs.cache_sweep_cron)
        .map_err(|err| AppError::from(InfraError::configuration(err)))?;

    let cache_sweep_worker = WorkerBuilder::new("cache-sweep-worker")
        .data(CacheSweepContext { cache })
        .backend(CronStream::new(schedule))
        .build_fn(process_cache_sweep_job);

    let monitor = Monitor::new().register(cache_sweep_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "quire::bootstrap",
        addr = %settings.server.addr,
        "HTTP listener bound"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "quire::bootstrap", "Shutdown signal received");
}
