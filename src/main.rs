mod api;
mod app_state;
mod client;
mod env_config;
mod layers;
mod logger;
mod models;
mod services;
mod views;

use app_state::models::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use client::{DashboardBackend, RestClient};
use env_config::models::{app_config::AppConfig, app_env::AppEnv, app_setting::AppSettings};
use layers::{create_cors, create_trace};
use services::polling::MarketHours;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info};
use views::ViewRegistry;

#[tokio::main]
async fn main() {
    // Инициализация приложения
    let settings: Arc<AppSettings> = Arc::new(initialize_application());

    // Клиент REST бэкенда
    let backend = initialize_backend_client(&settings);

    // Настройка адреса сервера
    let server_address: SocketAddr = format!(
        "{}:{}",
        settings.app_env.server_address, settings.app_env.server_port,
    )
    .parse()
    .expect("Invalid server address configuration");

    info!("Server will listen on: {}", server_address);
    info!("Market session open now: {}", services::polling::is_market_open());

    // Монтирование представлений и запуск контроллеров опроса
    let views = Arc::new(ViewRegistry::mount(
        &settings.app_config,
        backend,
        Arc::new(MarketHours::default()),
        settings.app_config.polling.start_visible,
    ));

    // Создание глобального состояния приложения
    let app_state: Arc<AppState> = Arc::new(AppState::new(settings.clone(), views.clone()));

    // Создание API роутера
    let app_router = create_application_router(app_state.clone());

    // Запуск HTTP сервера (до Ctrl-C)
    start_http_server(app_router, server_address).await;

    // Остановка всех таймеров перед выходом
    views.shutdown().await;

    info!("Application stopped");
}

/// Инициализирует настройки и логирование приложения
fn initialize_application() -> AppSettings {
    // Загрузка переменных окружения и конфигурации
    let environment = AppEnv::new();
    let config = AppConfig::new(&environment.env);
    let app_settings = AppSettings {
        app_config: config,
        app_env: environment,
    };

    // Настройка логирования с уровнем и форматом из конфигурации
    logger::init_logger(
        &app_settings.app_config.log.level,
        &app_settings.app_config.log.format,
        app_settings.app_env.is_local(),
    )
    .expect("Failed to initialize logger");

    info!("Starting Dashboard Service application...");
    info!("Current environment: {}", app_settings.app_env.env);

    // Добавление подробного логирования в режиме разработки
    if app_settings.app_env.is_local() {
        info!("Running in local development mode");
        debug!("Configuration details: {:#?}", app_settings);
    } else {
        info!("Running in production mode");
    }

    app_settings
}

/// Создает HTTP клиент для REST бэкенда
fn initialize_backend_client(settings: &AppSettings) -> Arc<dyn DashboardBackend> {
    let timeout = Duration::from_secs(settings.app_config.backend.timeout_seconds);

    match RestClient::new(&settings.app_env.backend_url, timeout) {
        Ok(client) => {
            info!("Backend client configured for {}", client.base_url());
            Arc::new(client)
        }
        Err(err) => {
            error!("Failed to build backend client: {}", err);
            panic!("Cannot continue without backend client");
        }
    }
}

/// Создает API роутер со всеми эндпоинтами и middleware
fn create_application_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api-health", get(api::health_api))
        .route("/backend-health", get(api::health_backend))
        .route("/alerts", get(api::get_alerts))
        .route("/views/{view}", get(api::get_view).delete(api::delete_view))
        .route("/views/{view}/visibility", put(api::put_visibility))
        .route("/views/{view}/refresh", post(api::post_refresh))
        .layer(axum::Extension(app_state))
        .layer(create_cors())
        .layer(create_trace())
}

/// Запускает HTTP сервер на указанном адресе
async fn start_http_server(app: Router, addr: SocketAddr) {
    info!("Starting HTTP server on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind to address {}: {}", addr, err);
            panic!("Cannot start server: {}", err);
        }
    };

    info!("Server started successfully, now accepting connections");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
        panic!("Server failed: {}", err);
    }
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
