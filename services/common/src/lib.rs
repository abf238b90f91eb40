use std::{env, fs, io, net::SocketAddr, panic, path::PathBuf, str::FromStr};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the process-wide subscriber. Stdout always, plus a daily rolling
/// file under `LOG_DIR/<service_name>` when `LOG_DIR` is set. Old files are
/// left to whatever rotates the host's log directory.
pub fn init_tracing(service_name: &str) -> TracingGuards {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(io::stdout);

    let mut file_guard: Option<WorkerGuard> = None;
    let mut file_layer = None;
    if let Some(root) = log_root(service_name) {
        if fs::create_dir_all(&root).is_ok() {
            let appender = panic::catch_unwind(|| {
                tracing_appender::rolling::daily(&root, format!("{service_name}.log"))
            })
            .ok();

            if let Some(appender) = appender {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                file_layer = Some(fmt::layer().with_ansi(false).with_writer(writer));
                file_guard = Some(guard);
            }
        }
    }

    // set_global_default fails on a second call; the first subscriber wins.
    if let Some(layer) = file_layer {
        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_layer)
            .with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = Registry::default().with(filter).with(stdout_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    TracingGuards {
        _file_guard: file_guard,
    }
}

pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

pub fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Per-service log directory under `LOG_DIR`; unset or blank disables file
/// logging (Lambda only has stdout).
fn log_root(service_name: &str) -> Option<PathBuf> {
    env::var("LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(|dir| PathBuf::from(dir).join(service_name))
}

pub async fn bind_listener(port: u16) -> io::Result<TcpListener> {
    // Bind on all interfaces for container compatibility.
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable, waiting on ctrl-c");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
