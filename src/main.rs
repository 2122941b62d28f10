use std::time::Duration;

use anyhow::{Context, Result};
use care_scheduler_config::{AppConfig, LogLevel, OutputFormat};
use care_scheduler_observability::init_observability;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, warn};

mod app;
mod shutdown;

use app::Application;
use shutdown::{wait_for_shutdown_signal, ShutdownManager};

fn build_cli() -> Command {
    Command::new("care-scheduler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("护理活动排班与逾期升级引擎")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时按默认路径查找"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty", "compact"]),
        )
        .arg(
            Arg::new("snapshot")
                .short('s')
                .long("snapshot")
                .value_name("FILE")
                .help("用于初始化内存存储的JSON快照"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("只执行一次巡检并输出JSON报告")
                .action(ArgAction::SetTrue),
        )
}

/// 命令行参数覆盖配置文件
fn apply_cli_overrides(config: &mut AppConfig, matches: &ArgMatches) -> Result<()> {
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format
            .parse::<OutputFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(path) = matches.get_one::<String>("snapshot") {
        config.snapshot.path = Some(path.clone());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config_path = matches.get_one::<String>("config").map(String::as_str);

    let mut config = AppConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;
    apply_cli_overrides(&mut config, &matches)?;

    init_observability(&config).context("初始化日志与指标失败")?;

    let app = Application::new(config).await?;

    if matches.get_flag("once") {
        let report = app.run_once().await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("序列化巡检报告失败")?
        );
        return Ok(());
    }

    info!("启动护理排班服务");
    let shutdown_manager = ShutdownManager::new();

    let app_handle = {
        let shutdown_manager = shutdown_manager.clone();
        tokio::spawn(async move {
            if let Err(e) = app.run(&shutdown_manager).await {
                error!("应用运行失败: {e}");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    Ok(())
}
