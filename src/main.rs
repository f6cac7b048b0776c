use anyhow::{Context, Result};
use apply_custom_config::descriptor::DESCRIPTOR_FILE;
use apply_custom_config::{Descriptor, RunContext, Settings, run};
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "apply-custom-config", version, about)]
struct Cli {
    /// Cordova 项目根目录
    #[arg(short = 'r', long, default_value = ".")]
    project_root: PathBuf,
    /// 配置文件地址 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// 备份目录所在的插件 id
    #[arg(long)]
    plugin_id: Option<String>,
    #[arg(long)]
    stop_on_error: bool,
    #[arg(short, long)]
    verbose: bool,
    /// 以 JSON 输出结果
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let descriptor_path = cli.project_root.join(DESCRIPTOR_FILE);
    let descriptor = Descriptor::load(&descriptor_path)
        .with_context(|| format!("failed to read {}", descriptor_path.display()))?;

    // 配置优先级: 默认值 < TOML < config.xml < 命令行
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_descriptor(&descriptor);
    if let Some(plugin_id) = cli.plugin_id {
        settings.plugin_id = plugin_id;
    }
    if cli.stop_on_error {
        settings.stop_on_error = true;
    }

    let mut ctx = RunContext::new(&cli.project_root, &descriptor, &settings);
    let report = run(&mut ctx).context("failed to apply custom config")?;
    info!("Updated {} file(s)", report.updated_files.len());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
