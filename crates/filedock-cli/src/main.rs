//! Filedock CLI
//!
//! 命令行客户端：上传、列出、删除文件，复制链接，监听新文件

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use filedock_core::{ClientSettings, LinkFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filedock", version, about = "Filedock - 文件托管命令行客户端")]
struct Cli {
    /// 服务器地址 (覆盖配置文件)
    #[arg(short, long, global = true)]
    server: Option<String>,
    /// 链接格式: url, markdown, html, ubb (覆盖配置文件)
    #[arg(short, long, global = true)]
    format: Option<LinkFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按顺序上传文件，`-` 表示从标准输入读取
    Upload {
        /// 要上传的文件路径
        #[arg(required = true)]
        paths: Vec<String>,
        /// 标准输入内容的文件名
        #[arg(short, long)]
        name: Option<String>,
    },
    /// 列出服务器上的文件
    List {
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 删除单个文件
    Delete {
        /// 文件 ID
        id: String,
        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
    /// 批量删除文件
    BatchDelete {
        /// 文件 ID 列表
        #[arg(required = true)]
        ids: Vec<String>,
        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
    /// 复制单个文件的链接 (`/d/<id>` 或文件 ID)
    CopyLink { path: String },
    /// 按链接格式复制多个文件的链接
    CopyLinks {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// 监听新上传的文件
    Watch,
    /// 查看或修改配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 显示当前配置
    Show,
    /// 设置服务器地址
    SetServer { url: String },
    /// 设置默认链接格式
    SetFormat { format: LinkFormat },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（filedock-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    // 日志输出到 stderr，stdout 只留给命令结果
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,filedock_core=debug")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let mut settings = ClientSettings::load();
    if let Some(server) = cli.server {
        settings.server_url = server;
    }
    if let Some(format) = cli.format {
        settings.link_format = format;
    }
    tracing::debug!("Using server {}", settings.origin());

    match cli.command {
        Commands::Upload { paths, name } => commands::upload(&settings, paths, name).await?,
        Commands::List { json } => commands::list(&settings, json).await?,
        Commands::Delete { id, yes } => commands::delete(&settings, &id, yes).await?,
        Commands::BatchDelete { ids, yes } => commands::batch_delete(&settings, ids, yes).await?,
        Commands::CopyLink { path } => commands::copy_link(&settings, &path)?,
        Commands::CopyLinks { ids } => commands::copy_links(&settings, ids).await?,
        Commands::Watch => commands::watch(&settings).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::show_config(&settings)?,
            ConfigAction::SetServer { url } => {
                let mut saved = ClientSettings::load();
                saved.server_url = url;
                saved.save()?;
                println!("✅ 服务器地址已设置为 {}", saved.server_url);
            }
            ConfigAction::SetFormat { format } => {
                let mut saved = ClientSettings::load();
                saved.link_format = format;
                saved.save()?;
                println!("✅ 默认链接格式已设置为 {}", format.label());
            }
        },
    }

    Ok(())
}
