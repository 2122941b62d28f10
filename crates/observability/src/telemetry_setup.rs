use std::net::SocketAddr;

use anyhow::Result;
use care_scheduler_config::{AppConfig, LogConfig, OutputFormat};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 构建日志过滤器，`RUST_LOG` 优先于配置
pub fn build_env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_env_filter(config));

    match config.format {
        OutputFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location);

            registry.with(fmt_layer).try_init()?;
        }
        OutputFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location);

            registry.with(fmt_layer).try_init()?;
        }
        OutputFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location);

            registry.with(fmt_layer).try_init()?;
        }
    }

    info!(
        logging.format = ?config.format,
        logging.level = %config.level,
        logging.location = config.include_location,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 安装 Prometheus 导出器，需在 tokio 运行时内调用
pub fn init_metrics(listen_addr: SocketAddr) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| anyhow::anyhow!("安装Prometheus导出器失败: {}", e))?;

    info!("指标导出已启动: http://{}/metrics", listen_addr);
    Ok(())
}

pub fn init_observability(config: &AppConfig) -> Result<()> {
    init_logging(&config.logging)?;
    if config.observability.metrics_enabled {
        init_metrics(config.observability.listen_addr()?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_scheduler_config::LogLevel;

    #[test]
    fn test_build_env_filter_uses_config_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LogConfig {
            level: LogLevel::Warn,
            ..LogConfig::default()
        };
        assert_eq!(build_env_filter(&config).to_string(), "warn");
    }
}
