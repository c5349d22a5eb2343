//! セットアップウィザードの描画とイベントループ

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::state::{Key, Prompt, Transition, WizardState};
use super::terminal::{Tui, restore_terminal, setup_terminal};
use astro_core::{AstroError, ProbedCapabilities, Selection};

/// ウィザードを実行して選択内容を返す
///
/// Esc / q で中止した場合は `AstroError::UserAborted` を返します。
/// `vpn_available` が false なら VPN の設問は出しません。
pub fn run_setup_wizard(
    initial: Selection,
    capabilities: &ProbedCapabilities,
    vpn_available: bool,
) -> anyhow::Result<Selection> {
    let mut terminal = setup_terminal()?;
    let mut state = WizardState::new(initial, capabilities).with_vpn_available(vpn_available);

    let result = event_loop(&mut terminal, &mut state);
    restore_terminal(&mut terminal)?;

    match result? {
        Some(selection) => Ok(selection),
        None => Err(AstroError::UserAborted.into()),
    }
}

fn event_loop(terminal: &mut Tui, state: &mut WizardState) -> anyhow::Result<Option<Selection>> {
    loop {
        terminal.draw(|f| draw_ui(f, state))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(key) = map_key(key.code)
        {
            match state.handle(key) {
                Transition::Continue => {}
                Transition::Confirmed(selection) => return Ok(Some(selection)),
                Transition::Aborted => return Ok(None),
            }
        }
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Key::Abort),
        KeyCode::Enter => Some(Key::Confirm),
        KeyCode::Backspace => Some(Key::Back),
        KeyCode::Char(' ') => Some(Key::Toggle),
        KeyCode::Down | KeyCode::Char('j') => Some(Key::Down),
        KeyCode::Up | KeyCode::Char('k') => Some(Key::Up),
        _ => None,
    }
}

fn draw_ui(frame: &mut Frame, state: &WizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    draw_content(frame, chunks[1], state);
    draw_footer(frame, chunks[2], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &WizardState) {
    let (current, total) = state.progress();
    let text = if state.prompt() == Prompt::Welcome {
        "Astro セットアップウィザード".to_string()
    } else {
        format!("Astro セットアップウィザード ({}/{})", current, total)
    };

    let title = Paragraph::new(text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn draw_content(frame: &mut Frame, area: Rect, state: &WizardState) {
    match state.prompt() {
        Prompt::Welcome => draw_welcome(frame, area),
        Prompt::Summary => draw_summary(frame, area, state),
        _ => draw_menu(frame, area, state),
    }
}

fn draw_welcome(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Astro へようこそ！",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("いくつかの質問に答えると、メディアサーバーのスタックを"),
        Line::from("生成して起動します。"),
        Line::from(""),
        Line::from(Span::styled(
            "Enterキーを押して続ける",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_menu(frame: &mut Frame, area: Rect, state: &WizardState) {
    let items: Vec<ListItem> = state
        .items()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == state.cursor() {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let label = match item.checked {
                Some(true) => format!("[x] {}", item.label),
                Some(false) => format!("[ ] {}", item.label),
                None => item.label,
            };

            let mut content = vec![Line::from(Span::styled(label, style))];
            if !item.description.is_empty() {
                content.push(Line::from(Span::styled(
                    format!("  {}", item.description),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(content)
        })
        .collect();

    let mut list_state = ListState::default().with_selected(Some(state.cursor()));
    let list = List::new(items).block(
        Block::default()
            .title(format!("{} を選択", state.prompt().title()))
            .borders(Borders::ALL),
    );

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_summary(frame: &mut Frame, area: Rect, state: &WizardState) {
    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "以下の構成でセットアップします：",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (title, value) in state.summary() {
        text.push(Line::from(vec![
            Span::raw(format!("{}: ", title)),
            Span::styled(value, Style::default().fg(Color::Green)),
        ]));
    }

    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "Enterで確定、Backspaceで戻る",
        Style::default().fg(Color::Yellow),
    )));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("確認"));
    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &WizardState) {
    let help_text = match state.prompt() {
        Prompt::Welcome => "Enter: 次へ | q/Esc: 終了",
        Prompt::Addons => {
            "↑↓/jk: 移動 | Space: 切り替え | Enter: 次へ | Backspace: 戻る | q/Esc: 終了"
        }
        Prompt::Summary => "Enter: 確定 | Backspace: 戻る | q/Esc: 終了",
        _ => "↑↓/jk: 選択 | Enter: 次へ | Backspace: 戻る | q/Esc: 終了",
    };

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(KeyCode::Esc), Some(Key::Abort));
        assert_eq!(map_key(KeyCode::Char('q')), Some(Key::Abort));
        assert_eq!(map_key(KeyCode::Char(' ')), Some(Key::Toggle));
        assert_eq!(map_key(KeyCode::Char('j')), Some(Key::Down));
        assert_eq!(map_key(KeyCode::Tab), None);
    }
}
