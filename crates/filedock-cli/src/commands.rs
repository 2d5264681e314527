//! 子命令实现

use anyhow::{Context, Result};
use filedock_core::{
    ApiClient, ClientSettings, CompletedRow, CompletionReporter, FileBrowser, HostingApi,
    HttpPushSource, HttpTransferChannel, LiveRosterSync, Notice, PipelineEvent, Roster,
    SyncState, SystemClipboard, UploadPipeline, UploadSource,
};
use std::io::{self, BufRead, Write};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

const BAR_WIDTH: usize = 30;

fn api(settings: &ClientSettings) -> Result<ApiClient> {
    ApiClient::from_settings(settings)
        .with_context(|| format!("无法创建 HTTP 客户端 ({})", settings.server_url))
}

/// 询问 y/N
fn confirm(prompt: &str) -> bool {
    print!("⚠️  {} [y/N] ", prompt);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirm_unless(skip: bool) -> impl FnOnce(&str) -> bool {
    move |prompt| skip || confirm(prompt)
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{}", notice);
    } else {
        println!("{}", notice);
    }
}

/// 从服务端列表构建浏览器，并勾选给定的 ID
async fn browser_with_selection(
    settings: &ClientSettings,
    api: &ApiClient,
    ids: &[String],
) -> Result<FileBrowser> {
    let entries = api.list_files().await.context("获取文件列表失败")?;
    let mut browser = FileBrowser::with_roster(settings.origin(), Roster::from_entries(entries))
        .with_link_format(settings.link_format);

    for id in ids {
        if !browser.set_checked(id, true) {
            eprintln!("   ⚠️  未找到文件: {}", id);
        }
    }
    Ok(browser)
}

pub async fn upload(settings: &ClientSettings, paths: Vec<String>, name: Option<String>) -> Result<()> {
    let api = api(settings)?;

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        if path == "-" {
            let mut data = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut data)
                .await
                .context("读取标准输入失败")?;
            let name = name.clone().unwrap_or_else(|| "stdin".to_string());
            sources.push(UploadSource::memory(name, data));
        } else {
            sources.push(UploadSource::path(path));
        }
    }

    let (handle, mut events) = UploadPipeline::spawn(HttpTransferChannel::new(api));
    let total = sources.len();
    handle.enqueue(sources)?;
    handle.shutdown();

    let mut reporter = CompletionReporter::new();
    while let Some(event) = events.recv().await {
        reporter.apply(&event);

        match &event {
            PipelineEvent::Started { name, .. } => {
                println!("📤 上传: {}", name);
            }
            PipelineEvent::Progress { id, .. } => {
                if let Some(row) = reporter.progress_row(id) {
                    print!("\r   [{}] {:>3}%", row.bar(BAR_WIDTH), row.percent_or_zero());
                    let _ = io::stdout().flush();
                }
            }
            PipelineEvent::Finished { .. } => {
                print!("\r\x1b[2K");
                match reporter.completed().last() {
                    Some(CompletedRow::Success { url, .. }) => {
                        println!("   ✅ {}{}", settings.origin(), url);
                    }
                    Some(CompletedRow::Failure { message, .. }) => {
                        println!("   ❌ {}", message);
                    }
                    None => {}
                }
            }
        }
    }

    let failed = reporter
        .completed()
        .iter()
        .filter(|row| matches!(row, CompletedRow::Failure { .. }))
        .count();
    println!("\n完成: {} 成功, {} 失败", total - failed, failed);

    if failed > 0 {
        anyhow::bail!("{} 个文件上传失败", failed);
    }
    Ok(())
}

pub async fn list(settings: &ClientSettings, json: bool) -> Result<()> {
    let api = api(settings)?;
    let entries = api.list_files().await.context("获取文件列表失败")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("   暂无文件");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "   {:<24} {:<32} {:>10}  {}",
            entry.file_id,
            entry.filename,
            entry.formatted_size(),
            entry.formatted_date()
        );
    }
    println!("共 {} 个文件", entries.len());
    Ok(())
}

pub async fn delete(settings: &ClientSettings, id: &str, yes: bool) -> Result<()> {
    let api = api(settings)?;
    let mut browser = FileBrowser::new(settings.origin());
    let skip = yes || !settings.confirm_deletes;

    match browser.delete_file(&api, id, confirm_unless(skip)).await {
        None => println!("   已取消"),
        Some(None) => println!("🗑️  已删除: {}", id),
        Some(Some(notice)) => {
            print_notice(&notice);
            anyhow::bail!("删除失败");
        }
    }
    Ok(())
}

pub async fn batch_delete(settings: &ClientSettings, ids: Vec<String>, yes: bool) -> Result<()> {
    let api = api(settings)?;
    let mut browser = browser_with_selection(settings, &api, &ids).await?;
    let skip = yes || !settings.confirm_deletes;

    let Some(report) = browser.batch_delete(&api, confirm_unless(skip)).await else {
        println!("   已取消");
        return Ok(());
    };

    for notice in &report.notices {
        print_notice(notice);
    }
    if report.reload_required {
        println!("   剩余 {} 个文件", browser.roster().len());
    }
    if !report.failed.is_empty() || !report.reload_required {
        anyhow::bail!("部分文件未删除");
    }
    Ok(())
}

pub fn copy_link(settings: &ClientSettings, path: &str) -> Result<()> {
    let browser = FileBrowser::new(settings.origin());
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/d/{}", path)
    };

    let notice = browser.copy_link(&path, &mut SystemClipboard::new());
    print_notice(&notice);
    if notice.is_error() {
        // 无法访问剪贴板时仍输出链接
        println!("{}", browser.absolute_url(&path));
    }
    Ok(())
}

pub async fn copy_links(settings: &ClientSettings, ids: Vec<String>) -> Result<()> {
    let api = api(settings)?;
    let browser = browser_with_selection(settings, &api, &ids).await?;

    let notice = browser.copy_selected_links(&mut SystemClipboard::new());
    for link in browser.selected_links() {
        println!("{}", link);
    }
    print_notice(&notice);
    Ok(())
}

pub async fn watch(settings: &ClientSettings) -> Result<()> {
    let api = api(settings)?;
    let origin = settings.origin().to_string();

    let sync = LiveRosterSync::new(HttpPushSource::new(api))
        .with_retry_delay(settings.reconnect_delay());
    let mut state = sync.subscribe_state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(sync.run(tx));

    println!("👀 监听新文件 ({}/api/file-updates)，按 Ctrl+C 退出", origin);

    loop {
        tokio::select! {
            entry = rx.recv() => match entry {
                Some(entry) => println!(
                    "🔔 {} ({}, {})  {}{}",
                    entry.filename,
                    entry.formatted_size(),
                    entry.formatted_date(),
                    origin,
                    entry.download_path()
                ),
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                match current {
                    SyncState::Connected => println!("🔌 已连接"),
                    SyncState::Disconnected => println!(
                        "   连接断开，{} 秒后重连",
                        settings.reconnect_delay_secs
                    ),
                    SyncState::Connecting => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(rx);
    let _ = task.await;
    Ok(())
}

pub fn show_config(settings: &ClientSettings) -> Result<()> {
    println!("# {}", ClientSettings::config_path().display());
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
