use std::{process, sync::Arc};

use taccuino::{
    application::{
        articles::ArticleService,
        catalog::CatalogService,
        error::AppError,
        readme::{ReadmeHeader, render_catalog_markdown},
        refresh::RefreshService,
        render::render_service,
        sync::RepositorySync,
        webhook,
    },
    cache::{CacheConfig, connect_cache},
    config,
    infra::{
        assets::StaticAssets,
        error::InfraError,
        http::{self, HttpState},
        secret::load_secret,
        telemetry,
    },
    presentation::views::LayoutChrome,
};
use tokio::io::AsyncWriteExt;
use tracing::{Dispatch, Level, dispatcher, error, info};
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
        config::Command::Catalog(args) => run_catalog(settings, args).await,
        config::Command::Sign(args) => run_sign(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    // Everything that can refuse to start happens before the listener binds.
    let secret = load_secret(&settings.webhook.secret_file).await?;

    let content = &settings.content;
    let catalog = Arc::new(
        CatalogService::load(
            content.articles_dir.clone(),
            content.filename_pattern.clone(),
        )
        .await?,
    );

    let cache = connect_cache(&CacheConfig::from(&settings.cache)).await;
    let articles = ArticleService::new(&content.articles_dir, render_service(), cache.clone())
        .map_err(|err| {
            AppError::from(InfraError::configuration(format!(
                "article directory `{}` is not usable: {err}",
                content.articles_dir.display()
            )))
        })?
        .with_cache_bypass(settings.server.debug);

    let sync = settings
        .sync
        .enabled
        .then(|| RepositorySync::new(&settings.sync.git_binary, &settings.sync.repo_dir));
    let refresh = RefreshService::new(catalog.clone(), cache.clone(), sync);

    let state = HttpState {
        catalog,
        articles: Arc::new(articles),
        refresh: Arc::new(refresh),
        secret: Arc::new(secret),
        chrome: Arc::new(LayoutChrome::from_site(&settings.site)),
        about_file: Arc::from(content.about_file.as_str()),
        assets: Arc::new(StaticAssets::new(&content.static_dir)),
        webhook_body_limit: settings.webhook.max_body_bytes,
        debug: settings.server.debug,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "taccuino::serve",
        addr = %settings.server.addr,
        debug = settings.server.debug,
        cache = %cache.backend(),
        sync = settings.sync.enabled,
        "Server listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "taccuino::serve", "Server stopped");
    Ok(())
}

async fn run_catalog(settings: config::Settings, args: config::CatalogArgs) -> Result<(), AppError> {
    let content = &settings.content;
    let catalog =
        CatalogService::load(content.articles_dir.clone(), content.filename_pattern.clone())
            .await?
            .current();

    let articles_dir = content.articles_dir.to_string_lossy();
    let header = ReadmeHeader {
        title: &settings.site.title,
        announcement: &settings.site.announcement,
        articles_dir: &articles_dir,
        about_file: &content.about_file,
    };
    let markdown = render_catalog_markdown(&header, &catalog);

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, markdown).await?;
            info!(
                target = "taccuino::catalog",
                path = %path.display(),
                articles = catalog.len(),
                "Catalog written"
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(markdown.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

async fn run_sign(settings: config::Settings, args: config::SignArgs) -> Result<(), AppError> {
    let secret = load_secret(&settings.webhook.secret_file).await?;
    let body = tokio::fs::read(&args.body_file).await?;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n", webhook::sign(&secret, &body)).as_bytes())
        .await?;
    stdout.flush().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "taccuino::serve", error = %err, "failed to listen for Ctrl-C");
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
                error!(target = "taccuino::serve", error = %err, "failed to listen for SIGTERM");
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

    info!(target = "taccuino::serve", "Shutdown signal received");
}
