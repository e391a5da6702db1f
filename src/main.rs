use tower_http::services::ServeDir; // Used to serve the panel's static files (HTML/CSS/JS)

use tv_panel::{
    build_router, config::Config, media::MediaLibrary, plug::PlugClient, store::JsonStore,
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let plug = match PlugClient::new(config.plug_url.clone(), config.plug_timeout) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(
        JsonStore::new(&config.data_dir),
        MediaLibrary::new(&config.movies_dir),
        plug,
    );

    let mut app = build_router(state);
    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    // Print where things live
    tracing::info!("Server running at http://{}", config.bind);
    tracing::info!("State files:  {}", config.data_dir.display());
    tracing::info!("Movies:       {}", config.movies_dir.display());
    tracing::info!("TV plug:      {}", config.plug_url);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .expect("bind failed");

    axum::serve(listener, app).await.expect("server error");
}
