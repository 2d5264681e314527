//! UI rendering module

use filedock_core::{CompletedRow, NoticeLevel, SyncState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, LineGauge, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::app::{App, AppMode, Tab};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_main(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    if app.nav.expanded {
        draw_help(frame, frame.area());
    }
    if let AppMode::Confirm(action) = &app.mode {
        draw_confirm(frame, &action.prompt(), frame.area());
    }
    if app.modal.is_open() {
        draw_modal(frame, app, frame.area());
    }
    draw_toasts(frame, app, frame.area());
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<&str> = Tab::ALL.iter().map(Tab::title).collect();
    let selected = Tab::ALL
        .iter()
        .position(|tab| app.nav.is_active(tab.link()))
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" Filedock "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).bold());

    frame.render_widget(tabs, area);
}

fn draw_main(frame: &mut Frame, app: &App, area: Rect) {
    match app.tab {
        Tab::Upload => draw_upload_tab(frame, app, area),
        Tab::Files => draw_files_tab(frame, app, area),
        Tab::Log => draw_log_tab(frame, app, area),
    }
}

fn draw_upload_tab(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Path input
            Constraint::Percentage(40), // Progress
            Constraint::Min(5),         // Completed
        ])
        .split(area);

    let (input_text, input_style) = match app.mode {
        AppMode::Input => (
            format!("{}▏", app.input_buffer),
            Style::default().fg(Color::Yellow),
        ),
        _ => (
            "按 'i' 输入文件路径 (空格分隔多个，含空格的路径加引号)".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };
    let input = Paragraph::new(input_text)
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(" 📂 上传路径 "));
    frame.render_widget(input, chunks[0]);

    // 每个上传中的文件一行进度条
    let progress_block = Block::default().borders(Borders::ALL).title(" 📦 上传进度 ");
    let inner = progress_block.inner(chunks[1]);
    frame.render_widget(progress_block, chunks[1]);

    let rows: Vec<_> = app.reporter.in_progress().collect();
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new("无活动上传").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
    } else {
        let slots = Layout::default()
            .direction(Direction::Vertical)
            .constraints(rows.iter().map(|_| Constraint::Length(1)).collect::<Vec<_>>())
            .split(inner);
        for (row, slot) in rows.iter().zip(slots.iter()) {
            let percent = row.percent_or_zero();
            let gauge = LineGauge::default()
                .filled_style(Style::default().fg(Color::Green))
                .unfilled_style(Style::default().fg(Color::DarkGray))
                .ratio(f64::from(percent.min(100)) / 100.0)
                .label(format!("{} {:>3}%", row.name, percent));
            frame.render_widget(gauge, *slot);
        }
    }

    let items: Vec<ListItem> = app
        .reporter
        .completed()
        .iter()
        .map(|row| match row {
            CompletedRow::Success { name, url, .. } => ListItem::new(format!(
                "✅ {}  {}",
                name,
                app.browser.absolute_url(url)
            ))
            .style(Style::default().fg(Color::Green)),
            CompletedRow::Failure { name, message, .. } => {
                ListItem::new(format!("❌ {}  {}", name, message))
                    .style(Style::default().fg(Color::Red))
            }
        })
        .collect();
    let completed =
        List::new(items).block(Block::default().borders(Borders::ALL).title(" 完成 "));
    frame.render_widget(completed, chunks[2]);
}

fn draw_files_tab(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let controls = app.browser.controls();
    let select_all = if controls.select_all_checked { "[x]" } else { "[ ]" };
    let action_style = |enabled: bool| {
        if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let bar = Line::from(vec![
        Span::raw(format!("{} 全选 [a]   ", select_all)),
        Span::styled("批量删除 [D]   ", action_style(controls.delete_enabled)),
        Span::styled("复制链接 [C]   ", action_style(controls.copy_enabled)),
        Span::raw(format!("格式: {} [f]   ", app.browser.link_format().label())),
        Span::styled(
            controls.counter_label.clone(),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(bar).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let roster = app.browser.roster();
    let list_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" 🗂️  文件 ({}) ", roster.len()));

    if roster.shows_empty_placeholder() {
        frame.render_widget(
            Paragraph::new("暂无文件")
                .style(Style::default().fg(Color::DarkGray))
                .block(list_block),
            chunks[1],
        );
        return;
    }

    let items: Vec<ListItem> = roster
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let check = if row.checked { "[x]" } else { "[ ]" };
            let content = format!(
                "{} {:<32} {:>10}  {}",
                check,
                row.entry.filename,
                row.entry.formatted_size(),
                row.entry.formatted_date()
            );
            let mut style = Style::default();
            if row.fresh {
                style = style.fg(Color::Yellow);
            }
            if i == app.selected_row {
                style = style.bg(Color::DarkGray).fg(Color::White);
            }
            ListItem::new(content).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(list_block), chunks[1]);
}

fn draw_log_tab(frame: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .visible_logs()
        .rev()
        .take(height)
        .map(|entry| ListItem::new(entry.display_line()))
        .collect();

    let title = format!(" 📋 日志 (≤{}) [d]切换级别 [c]清空 ", app.log_level);
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(list, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (sync_text, sync_color) = match app.sync_state() {
        SyncState::Connected => (" 🟢 已连接 ", Color::Green),
        SyncState::Connecting => (" 🟡 连接中 ", Color::Yellow),
        SyncState::Disconnected => (" 🔴 已断开 ", Color::Red),
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(sync_text, Style::default().fg(sync_color)),
        Span::raw(format!(
            "│ {} │ 上传中: {} │ [Tab]切换 [?]帮助 [q]退出",
            app.settings.origin(),
            app.reporter.in_progress().count()
        )),
    ]))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let text = "上传:  i/Enter 输入路径  Enter 加入队列  Esc 取消\n\
                文件:  ↑/↓ 选择  空格 勾选  a 全选\n\
                \x20      d 删除  D 批量删除  c 复制链接  C 复制选中链接\n\
                \x20      f 切换链接格式  Enter 详情  r 刷新\n\
                日志:  d 切换级别  c 清空\n\n\
                按 ? 关闭";
    let popup = centered_rect(60, 40, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(" 帮助 "))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn draw_confirm(frame: &mut Frame, prompt: &str, area: Rect) {
    let popup = centered_rect(50, 20, area);
    frame.render_widget(Clear, popup);
    let text = format!("{}\n\n[y] 确认    [n] 取消", prompt);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" ⚠️  确认 "),
            ),
        popup,
    );
}

fn draw_modal(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled(
            app.modal.caption().to_string(),
            Style::default().bold(),
        )),
        Line::from(""),
        Line::from(app.modal.src().to_string()),
    ];
    if let Some(row) = app.browser.roster().get(app.selected_row) {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("ID: {}", row.entry.file_id)));
        lines.push(Line::from(format!(
            "{}  {}",
            row.entry.formatted_size(),
            row.entry.formatted_date()
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("[Enter] 关闭"));

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" 详情 ")),
        popup,
    );
}

/// 右上角堆叠显示
fn draw_toasts(frame: &mut Frame, app: &App, area: Rect) {
    let mut y = area.y + 1;
    for notice in app.notices.visible() {
        let text = notice.to_string();
        let width = (text.chars().count() as u16 + 4).min(area.width);
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height: 3,
        };
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            ),
            rect,
        );
        y += 3;
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
