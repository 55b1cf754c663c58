use std::{process, sync::Arc, time::Duration};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

use veridia::{
    application::{
        auth::AuthService,
        blog::BlogService,
        clients::{EmailSender, PaymentGateway},
        donations::DonationsService,
        email_admin::EmailAdminService,
        error::AppError,
        forum::ForumService,
        newsletter::NewsletterService,
        password_reset::PasswordResetService,
        product_votes::ProductVotingService,
        reports::ReportsService,
        repos::{
            BlogRepo, ConcernsRepo, DonationsRepo, ForumRepo, NewsletterRepo, PasswordResetsRepo,
            ProductVotesRepo, ReportOrdersRepo, ReportsRepo, SubscriptionsRepo, UsersRepo,
            WaitlistRepo,
        },
        stats::StatsService,
        subscriptions::SubscriptionsService,
        voting::VotingService,
        waitlist::WaitlistService,
        webhooks::WebhooksService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        email::MailgunMailer,
        error::InfraError,
        http::{self, ApiState},
        payments::RazorpayGateway,
        telemetry,
    },
};

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
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_api_state(repositories, &settings);

    let router = http::build_api_router(state)
        .layer(axum::middleware::from_fn(http::set_request_context));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "veridia::server",
        addr = %settings.server.addr,
        "listening",
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

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

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(repositories: Arc<PostgresRepositories>, settings: &config::Settings) -> ApiState {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let waitlist_repo: Arc<dyn WaitlistRepo> = repositories.clone();
    let reports_repo: Arc<dyn ReportsRepo> = repositories.clone();
    let report_orders_repo: Arc<dyn ReportOrdersRepo> = repositories.clone();
    let concerns_repo: Arc<dyn ConcernsRepo> = repositories.clone();
    let forum_repo: Arc<dyn ForumRepo> = repositories.clone();
    let blog_repo: Arc<dyn BlogRepo> = repositories.clone();
    let newsletter_repo: Arc<dyn NewsletterRepo> = repositories.clone();
    let subscriptions_repo: Arc<dyn SubscriptionsRepo> = repositories.clone();
    let donations_repo: Arc<dyn DonationsRepo> = repositories.clone();
    let product_votes_repo: Arc<dyn ProductVotesRepo> = repositories.clone();
    let password_resets_repo: Arc<dyn PasswordResetsRepo> = repositories.clone();

    let mailer: Arc<dyn EmailSender> = Arc::new(MailgunMailer::new(settings.email.clone()));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayGateway::new(settings.payments.clone()));

    let rate_limiter = Arc::new(http::ApiRateLimiter::new(
        Duration::from_secs(settings.rate_limit.window_seconds.get() as u64),
        settings.rate_limit.max_requests.get(),
    ));

    ApiState {
        auth: Arc::new(AuthService::new(
            users_repo.clone(),
            &settings.auth.jwt_secret,
            settings.auth.token_ttl,
        )),
        waitlist: Arc::new(WaitlistService::new(waitlist_repo.clone(), mailer.clone())),
        reports: Arc::new(ReportsService::new(
            reports_repo,
            report_orders_repo.clone(),
            gateway.clone(),
            settings.payments.key_secret.clone(),
            settings.payments.currency.clone(),
        )),
        voting: Arc::new(VotingService::new(concerns_repo.clone())),
        forum: Arc::new(ForumService::new(forum_repo)),
        blog: Arc::new(BlogService::new(blog_repo)),
        newsletter: Arc::new(NewsletterService::new(newsletter_repo)),
        stats: Arc::new(StatsService::new(
            users_repo.clone(),
            waitlist_repo,
            concerns_repo,
            product_votes_repo.clone(),
        )),
        subscriptions: Arc::new(SubscriptionsService::new(
            subscriptions_repo.clone(),
            gateway.clone(),
            settings.payments.key_secret.clone(),
            settings.payments.currency.clone(),
        )),
        donations: Arc::new(DonationsService::new(
            donations_repo.clone(),
            gateway,
            settings.payments.key_secret.clone(),
            settings.payments.currency.clone(),
        )),
        product_votes: Arc::new(ProductVotingService::new(
            product_votes_repo,
            subscriptions_repo.clone(),
        )),
        password_reset: Arc::new(PasswordResetService::new(
            users_repo,
            password_resets_repo,
            mailer.clone(),
        )),
        email_admin: Arc::new(EmailAdminService::new(mailer)),
        webhooks: Arc::new(WebhooksService::new(
            report_orders_repo,
            subscriptions_repo,
            donations_repo,
            settings.payments.webhook_secret.clone(),
        )),
        db: Some(repositories),
        rate_limiter,
    }
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(target = "veridia::server", "shutdown signal received");

    // In-flight requests get the grace period, then the process goes down hard.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "veridia::server",
            "graceful shutdown period elapsed, forcing exit",
        );
        process::exit(1);
    });
}
