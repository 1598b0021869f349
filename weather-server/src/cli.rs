use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use weather_core::{Config, OpenWeatherProvider};

use crate::app::{self, AppState, RateLimits};

/// How often idle rate-limit entries are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather web service")]
pub struct Cli {
    /// Path to a TOML config file. Defaults to the platform config directory.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Directory with index.html and the assets served under /static.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Derive client keys from X-Real-IP / X-Forwarded-For.
    #[arg(long)]
    pub trust_proxy: bool,
}

impl Cli {
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        self.resolve_config_with(|name| std::env::var(name).ok())
    }

    /// File, then environment read through `lookup`, then flags.
    pub fn resolve_config_with<F>(&self, lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::load_with(self.config.as_deref(), lookup)?;

        if let Some(bind) = self.bind {
            cfg.server.bind = bind;
        }
        if let Some(dir) = &self.static_dir {
            cfg.server.static_dir = dir.clone();
        }
        if self.trust_proxy {
            cfg.server.trust_proxy = true;
        }

        Ok(cfg)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cfg = self.resolve_config()?;

        if !cfg.has_api_key() {
            tracing::warn!(
                "{} not set; real-time weather lookups will answer 503",
                weather_core::config::API_KEY_ENV
            );
        }

        let provider = OpenWeatherProvider::from_config(&cfg.provider)?;

        let state = AppState::new(Arc::new(provider), cfg.server.static_dir.clone());
        let limits = RateLimits::default();

        let sweeper = limits.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                let tracked = sweeper.purge_idle();
                tracing::debug!(tracked, "swept idle rate-limit entries");
            }
        });

        let app = app::build_app(state, &limits, cfg.server.trust_proxy)
            .layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(cfg.server.bind)
            .await
            .with_context(|| format!("failed to bind {}", cfg.server.bind))?;

        tracing::info!(
            addr = %cfg.server.bind,
            static_dir = %cfg.server.static_dir.display(),
            trust_proxy = cfg.server.trust_proxy,
            "listening"
        );

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server failed")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbind = \"127.0.0.1:9000\"\nstatic_dir = \"assets\"\n")
            .unwrap();

        let cli = Cli::parse_from([
            "weather-server",
            "--config",
            path.to_str().unwrap(),
            "--static-dir",
            "/srv/www",
            "--trust-proxy",
        ]);
        let cfg = cli.resolve_config_with(|_| None).unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.server.static_dir, PathBuf::from("/srv/www"));
        assert!(cfg.server.trust_proxy);
    }

    #[test]
    fn flags_override_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let cli = Cli::parse_from([
            "weather-server",
            "--config",
            path.to_str().unwrap(),
            "--bind",
            "127.0.0.1:7000",
        ]);
        let cfg = cli
            .resolve_config_with(|name| match name {
                "WEATHER_BIND_ADDR" => Some("0.0.0.0:8080".into()),
                "OPENWEATHERMAP_API_KEY" => Some("ENV_KEY".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
        assert!(cfg.has_api_key());
        assert!(!cfg.server.trust_proxy);
    }

    #[test]
    fn bind_flag_must_be_socket_address() {
        let err = Cli::try_parse_from(["weather-server", "--bind", "localhost"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
