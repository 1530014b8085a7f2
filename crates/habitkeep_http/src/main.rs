use habitkeep_core::{init_logging, StateStore};
use habitkeep_http::{build_router, AppState, ServerConfig};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run(config: ServerConfig) -> Result<(), String> {
    if let Some(log_dir) = &config.log_dir {
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", log_dir.display()))?;
        init_logging(&config.log_level, log_dir)?;
    }

    let store = StateStore::open_file(&config.store).map_err(|err| {
        format!(
            "failed to open state document `{}`: {err}",
            config.store.data_path.display()
        )
    })?;
    let app = build_router(AppState::new(Arc::new(store)));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| format!("bind {} failed: {err}", config.bind_addr))?;
    info!(
        "event=http_listen module=http status=ok bind_addr={} data_path={}",
        config.bind_addr,
        config.store.data_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|err| format!("server failed: {err}"))?;
    info!("event=http_shutdown module=http status=ok");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let result = match ServerConfig::from_env() {
        Ok(config) => run(config).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=http_exit module=http status=error error={err}");
            eprintln!("habitkeep_http: {err}");
            ExitCode::FAILURE
        }
    }
}
