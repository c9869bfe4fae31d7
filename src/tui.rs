use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::info;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use launchdeck::adapter::Launcher;
use launchdeck::picker::FilePicker;
use launchdeck::platform::Platform;
use launchdeck::target::{
    Browser, LaunchTarget, TargetDraft, TargetKind, ALL_CATEGORIES, UNCATEGORIZED,
};

const NAME_COLUMN_WIDTH: usize = 28;

pub fn run<P: FilePicker>(launcher: Launcher<P>) -> Result<()> {
    let mut app = TuiState::new(launcher, Platform::current());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal, &mut app);

    restore_terminal(&mut terminal)?;
    result
}

fn event_loop<B, P>(terminal: &mut Terminal<B>, app: &mut TuiState<P>) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
    P: FilePicker,
{
    let tick_rate = Duration::from_millis(200);
    loop {
        terminal.draw(|frame| render(frame, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if let Some(action) = app.take_pending_action() {
            app.execute_deferred_action(terminal, action)?;
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn restore_terminal<B>(terminal: &mut Terminal<B>) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn with_terminal_suspension<B, F, T>(terminal: &mut Terminal<B>, f: F) -> Result<T>
where
    B: ratatui::backend::Backend + Write,
    F: FnOnce() -> Result<T>,
{
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    let result = f();
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    result
}

fn render<P: FilePicker>(frame: &mut Frame, app: &TuiState<P>) {
    let size = frame.size();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.background)),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(size);

    let header = Paragraph::new("launchdeck")
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(app.theme.text)
                .bg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(header, chunks[0]);

    let shortcuts = Paragraph::new(app.footer_line())
        .alignment(Alignment::Center)
        .style(Style::default().bg(app.theme.highlight));
    frame.render_widget(shortcuts, chunks[1]);

    let categories = Paragraph::new(app.category_line())
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    frame.render_widget(categories, chunks[2]);

    let content_area = chunks[3];
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.surface)),
        content_area,
    );
    render_targets(
        frame,
        content_area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
        app,
    );

    let status = Paragraph::new(app.status_text())
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .bg(app.theme.primary)
                .fg(app.theme.text)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(status, chunks[4]);

    if let Some(popup) = &app.active_popup {
        render_popup(frame, popup, app);
    }
}

fn render_targets<P: FilePicker>(frame: &mut Frame, area: Rect, app: &TuiState<P>) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let summary_width = (area.width as usize).saturating_sub(NAME_COLUMN_WIDTH + 12);
    let mut items: Vec<ListItem> = app
        .visible
        .iter()
        .map(|&index| {
            let target = &app.targets[index];
            let kind = match target.kind() {
                TargetKind::Software => "app",
                TargetKind::Browser => "web",
            };
            let line = Line::from(vec![
                Span::styled(
                    fit_width(&target.name, NAME_COLUMN_WIDTH),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {kind}  "), Style::default().fg(app.theme.accent)),
                Span::raw(fit_width(&target.summary(), summary_width)),
            ]);
            ListItem::new(line)
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No launch targets here. Press n to add one."));
    }

    let list = List::new(items)
        .block(Block::default().style(Style::default().bg(app.theme.surface).fg(app.theme.text)))
        .highlight_style(
            Style::default()
                .bg(app.theme.highlight)
                .fg(app.theme.background)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default();
    if !app.visible.is_empty() {
        state.select(Some(app.current_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_popup<P: FilePicker>(frame: &mut Frame, popup: &PopupState, app: &TuiState<P>) {
    let (title, body, area) = match popup {
        PopupState::Info(info) => (
            "Launch Target",
            format!(
                "Name: {}\nCategory: {}\nTags: {}\nType: {}\nCommand: {}\nId: {}\n\nPress Enter or Esc to close.",
                info.name, info.category, info.tags, info.kind, info.command, info.id
            ),
            centered_rect(frame.size(), 70, 40),
        ),
        PopupState::Message(msg) => (
            "Message",
            format!("{msg}\n\nPress Enter or Esc to close."),
            centered_rect(frame.size(), 50, 30),
        ),
        PopupState::ConfirmDelete { name, .. } => (
            "Delete",
            format!("Delete \"{name}\"?\n\ny: delete   n/Esc: keep"),
            centered_rect(frame.size(), 50, 30),
        ),
    };
    frame.render_widget(Clear, area);
    let block = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().bg(app.theme.surface)),
        );
    frame.render_widget(block, area);
}

fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100 - height_percent) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

/// Truncates with an ellipsis or pads with spaces to exactly `width` columns.
fn fit_width(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.width() <= width {
        return format!("{text}{}", " ".repeat(width - text.width()));
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

#[derive(Clone, Copy)]
struct Theme {
    primary: Color,
    accent: Color,
    highlight: Color,
    background: Color,
    surface: Color,
    text: Color,
}

impl Theme {
    fn nord() -> Self {
        Self {
            primary: color_from_hex("#5E81AC").unwrap_or(Color::Blue),
            accent: color_from_hex("#D08770").unwrap_or(Color::Yellow),
            highlight: color_from_hex("#76B3C5").unwrap_or(Color::Cyan),
            background: color_from_hex("#2E3440").unwrap_or(Color::Black),
            surface: color_from_hex("#3B4252").unwrap_or(Color::DarkGray),
            text: color_from_hex("#ECEFF4").unwrap_or(Color::White),
        }
    }
}

fn color_from_hex(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

struct InfoPopup {
    id: String,
    name: String,
    category: String,
    tags: String,
    kind: &'static str,
    command: String,
}

enum PopupState {
    Info(InfoPopup),
    Message(String),
    ConfirmDelete { id: String, name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeferredAction {
    NewTarget,
    NewCategory,
}

struct FooterShortcut {
    key: &'static str,
    label: &'static str,
}

const FOOTER_SHORTCUTS: &[FooterShortcut] = &[
    FooterShortcut { key: "q", label: " Exit" },
    FooterShortcut { key: "↵", label: " Launch" },
    FooterShortcut { key: "n", label: " New" },
    FooterShortcut { key: "c", label: " Category" },
    FooterShortcut { key: "d", label: " Delete" },
    FooterShortcut { key: "i", label: " Info" },
    FooterShortcut { key: "⇥", label: " Filter" },
    FooterShortcut { key: "r", label: " Reload" },
];

struct TuiState<P> {
    launcher: Launcher<P>,
    platform: Platform,
    targets: Vec<LaunchTarget>,
    categories: Vec<String>,
    category_index: usize,
    visible: Vec<usize>,
    current_index: usize,
    should_quit: bool,
    pending_action: Option<DeferredAction>,
    status_message: Option<String>,
    active_popup: Option<PopupState>,
    theme: Theme,
}

impl<P: FilePicker> TuiState<P> {
    fn new(launcher: Launcher<P>, platform: Platform) -> Self {
        let mut app = TuiState {
            launcher,
            platform,
            targets: Vec::new(),
            categories: Vec::new(),
            category_index: 0,
            visible: Vec::new(),
            current_index: 0,
            should_quit: false,
            pending_action: None,
            status_message: None,
            active_popup: None,
            theme: Theme::nord(),
        };
        app.refresh();
        app
    }

    fn refresh(&mut self) {
        let current = self.current_category().to_string();
        self.targets = self.launcher.list_targets();
        self.categories = self.launcher.categories();
        self.category_index = self
            .categories
            .iter()
            .position(|name| *name == current)
            .unwrap_or(0);
        self.rebuild_display();
    }

    fn rebuild_display(&mut self) {
        let category = self.current_category().to_string();
        self.visible = self
            .targets
            .iter()
            .enumerate()
            .filter(|(_, target)| category == ALL_CATEGORIES || target.category == category)
            .map(|(index, _)| index)
            .collect();
        if self.current_index >= self.visible.len() {
            self.current_index = self.visible.len().saturating_sub(1);
        }
    }

    fn current_category(&self) -> &str {
        self.categories
            .get(self.category_index)
            .map(String::as_str)
            .unwrap_or(ALL_CATEGORIES)
    }

    fn selected_target(&self) -> Option<&LaunchTarget> {
        self.visible
            .get(self.current_index)
            .and_then(|&index| self.targets.get(index))
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let Some(popup) = &self.active_popup {
            match popup {
                PopupState::Info(_) | PopupState::Message(_) => {
                    if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                        self.active_popup = None;
                    }
                }
                PopupState::ConfirmDelete { id, .. } => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        let id = id.clone();
                        self.active_popup = None;
                        self.delete_target(&id);
                    }
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.active_popup = None;
                        self.set_status(Some("Delete cancelled".into()));
                    }
                    _ => {}
                },
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection_down(),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.next_category(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => self.previous_category(),
            KeyCode::Enter => self.launch_selected(),
            KeyCode::Char('n') => self.pending_action = Some(DeferredAction::NewTarget),
            KeyCode::Char('c') => self.pending_action = Some(DeferredAction::NewCategory),
            KeyCode::Char('d') => self.confirm_delete(),
            KeyCode::Char('i') => self.show_info_popup(),
            KeyCode::Char('r') => match self.launcher.reload() {
                Ok(()) => {
                    self.refresh();
                    self.set_status(Some("Registry reloaded".into()));
                }
                Err(err) => self.show_message(format!("Reload failed: {err}")),
            },
            _ => {}
        }
    }

    fn move_selection_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        if self.current_index == 0 {
            self.current_index = self.visible.len() - 1;
        } else {
            self.current_index -= 1;
        }
    }

    fn move_selection_down(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        self.current_index = (self.current_index + 1) % self.visible.len();
    }

    fn next_category(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        self.category_index = (self.category_index + 1) % self.categories.len();
        self.current_index = 0;
        self.rebuild_display();
    }

    fn previous_category(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        self.category_index = self
            .category_index
            .checked_sub(1)
            .unwrap_or(self.categories.len() - 1);
        self.current_index = 0;
        self.rebuild_display();
    }

    fn launch_selected(&mut self) {
        let Some(target) = self.selected_target().cloned() else {
            return;
        };
        if self.launcher.dispatch(&target) {
            self.set_status(Some(format!("Launched {}", target.name)));
        } else {
            self.set_status(Some(format!("Launch failed: {}", target.name)));
        }
    }

    fn confirm_delete(&mut self) {
        if let Some(target) = self.selected_target() {
            self.active_popup = Some(PopupState::ConfirmDelete {
                id: target.id.clone(),
                name: target.name.clone(),
            });
        }
    }

    fn delete_target(&mut self, id: &str) {
        match self.launcher.remove_target(id) {
            Ok(_) => {
                self.refresh();
                self.set_status(Some("Target deleted".into()));
            }
            Err(err) => self.show_message(format!("Delete failed: {err}")),
        }
    }

    fn show_info_popup(&mut self) {
        if let Some(target) = self.selected_target() {
            let command = launchdeck::dispatch::resolve(target, self.platform).command_line();
            self.active_popup = Some(PopupState::Info(InfoPopup {
                id: target.id.clone(),
                name: target.name.clone(),
                category: target.category.clone(),
                tags: if target.tags.is_empty() {
                    "-".to_string()
                } else {
                    target.tags.join(", ")
                },
                kind: match target.kind() {
                    TargetKind::Software => "software",
                    TargetKind::Browser => "browser",
                },
                command,
            }));
        }
    }

    fn show_message(&mut self, message: String) {
        self.active_popup = Some(PopupState::Message(message));
    }

    fn add_drafts(&mut self, drafts: Vec<TargetDraft>) {
        let mut added = 0;
        for draft in &drafts {
            if let Err(err) = self.launcher.add_target(draft) {
                self.refresh();
                self.show_message(format!("Add failed: {err}"));
                return;
            }
            added += 1;
        }
        self.refresh();
        self.set_status(Some(match added {
            1 => "Target added".to_string(),
            n => format!("{n} targets added"),
        }));
    }

    fn add_category(&mut self, name: &str) {
        if name.trim().is_empty() {
            self.set_status(Some("Category not added".into()));
            return;
        }
        match self.launcher.add_category(name) {
            Ok(()) => {
                self.refresh();
                self.set_status(Some(format!("Category {} ready", name.trim())));
            }
            Err(err) => self.show_message(format!("Add category failed: {err}")),
        }
    }

    fn default_category(&self) -> String {
        match self.current_category() {
            ALL_CATEGORIES => UNCATEGORIZED.to_string(),
            name => name.to_string(),
        }
    }

    fn take_pending_action(&mut self) -> Option<DeferredAction> {
        self.pending_action.take()
    }

    fn execute_deferred_action<B>(
        &mut self,
        terminal: &mut Terminal<B>,
        action: DeferredAction,
    ) -> Result<()>
    where
        B: ratatui::backend::Backend + Write,
    {
        match action {
            DeferredAction::NewTarget => {
                let default_category = self.default_category();
                let extension = self.platform.executable_extension();
                let launcher = &self.launcher;
                let drafts = with_terminal_suspension(terminal, || {
                    prompt_new_targets(launcher, &default_category, extension)
                })?;
                match drafts {
                    Some(drafts) if !drafts.is_empty() => self.add_drafts(drafts),
                    _ => self.set_status(Some("Add cancelled".into())),
                }
            }
            DeferredAction::NewCategory => {
                let name = with_terminal_suspension(terminal, || prompt_optional("Category name"))?;
                self.add_category(&name);
            }
        }
        Ok(())
    }

    fn set_status(&mut self, message: Option<String>) {
        if let Some(msg) = &message {
            info!(status = %msg, "tui");
        }
        self.status_message = message;
    }

    fn status_text(&self) -> String {
        let total = self.visible.len();
        let current = if total == 0 { 0 } else { self.current_index + 1 };
        let mut text = format!(
            "Target {}/{} | Category: {}",
            current,
            total,
            self.current_category()
        );
        if let Some(msg) = &self.status_message {
            text.push_str(" | ");
            text.push_str(msg);
        }
        text
    }

    fn category_line(&self) -> Line<'static> {
        let mut spans = vec![Span::raw(" ")];
        for (index, name) in self.categories.iter().enumerate() {
            if index > 0 {
                spans.push(Span::raw(" | "));
            }
            let style = if index == self.category_index {
                Style::default()
                    .bg(self.theme.highlight)
                    .fg(self.theme.background)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.text)
            };
            spans.push(Span::styled(name.clone(), style));
        }
        Line::from(spans)
    }

    fn footer_line(&self) -> Line<'static> {
        let shortcut_style = Style::default()
            .fg(self.theme.accent)
            .bg(self.theme.highlight)
            .add_modifier(Modifier::BOLD);
        let label_style = Style::default()
            .fg(self.theme.surface)
            .bg(self.theme.highlight);
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (index, shortcut) in FOOTER_SHORTCUTS.iter().enumerate() {
            if index > 0 {
                spans.push(Span::styled(" | ", label_style));
            }
            spans.push(Span::styled(shortcut.key, shortcut_style));
            spans.push(Span::styled(shortcut.label, label_style));
        }
        Line::from(spans)
    }
}

fn prompt_new_targets<P: FilePicker>(
    launcher: &Launcher<P>,
    default_category: &str,
    extension: &str,
) -> Result<Option<Vec<TargetDraft>>> {
    println!("New launch target\n");
    let kind = prompt_with_default("Type (software/browser)", "software")?;
    if matches!(kind.to_ascii_lowercase().as_str(), "browser" | "b" | "web") {
        let browser = prompt_with_default("Browser (edge/chrome)", "edge")?
            .parse::<Browser>()
            .unwrap_or_else(|err| {
                println!("{err}; using edge");
                Browser::Edge
            });
        let url = prompt_optional("URL")?;
        let name = prompt_optional("Name")?;
        let category = prompt_with_default("Category", default_category)?;
        let tags = split_tags(&prompt_optional("Tags (comma separated)")?);
        return Ok(Some(vec![TargetDraft::browser(name, browser, url)
            .with_category(category)
            .with_tags(tags)]));
    }

    let path = prompt_optional("Executable path (blank to browse)")?;
    let paths = if path.is_empty() {
        match launcher.pick_file() {
            Ok(picked) if picked.cancelled => return Ok(None),
            Ok(picked) => picked.paths,
            Err(err) => {
                println!("File chooser unavailable: {err}");
                prompt_optional("Press Enter to continue")?;
                return Ok(None);
            }
        }
    } else {
        vec![path]
    };
    let args = prompt_optional("Arguments (passed as typed)")?;
    let category = prompt_with_default("Category", default_category)?;
    let tags = split_tags(&prompt_optional("Tags (comma separated)")?);
    let mut drafts = Vec::with_capacity(paths.len());
    for path in paths {
        let derived = launcher.derive_name(&path, extension);
        let name = prompt_with_default(&format!("Name for {path}"), &derived)?;
        drafts.push(
            TargetDraft::software(name, path)
                .with_args(args.clone())
                .with_category(category.clone())
                .with_tags(tags.clone()),
        );
    }
    Ok(Some(drafts))
}

fn split_tags(input: &str) -> Vec<String> {
    input.split(',').map(str::to_string).collect()
}

fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    println!("{prompt} [{default}]: ");
    print!("> ");
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn prompt_optional(prompt: &str) -> Result<String> {
    println!("{prompt}: ");
    print!("> ");
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim_end_matches(['\r', '\n']).trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use launchdeck::dispatch::Dispatcher;
    use launchdeck::error::PickerError;
    use launchdeck::picker::PickedFiles;
    use launchdeck::registry::Registry;
    use tempfile::TempDir;

    struct NoPicker;

    impl FilePicker for NoPicker {
        fn pick_files(&self) -> Result<PickedFiles, PickerError> {
            Ok(PickedFiles::cancelled())
        }
    }

    fn state(dir: &TempDir) -> TuiState<NoPicker> {
        let registry = Registry::open(dir.path().join("registry.json")).unwrap();
        let mut launcher = Launcher::new(registry, Dispatcher::new(Platform::Linux), NoPicker);
        launcher
            .add_target(&TargetDraft::software("Editor", "/usr/bin/vim").with_category("Dev"))
            .unwrap();
        let docs = TargetDraft::browser("Docs", Browser::Chrome, "https://docs.example.com")
            .with_category("Web")
            .with_tags(["reference"]);
        launcher.add_target(&docs).unwrap();
        launcher
            .add_target(&TargetDraft::software("Shell", "/bin/sh").with_category("Dev"))
            .unwrap();
        TuiState::new(launcher, Platform::Linux)
    }

    fn press(app: &mut TuiState<NoPicker>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn category_filter_cycles_from_all() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        assert_eq!(app.current_category(), "all");
        assert_eq!(app.visible.len(), 3);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_category(), "Dev");
        assert_eq!(app.visible, vec![0, 2]);

        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_category(), "Web");
        assert_eq!(app.selected_target().map(|t| t.name.as_str()), Some("Docs"));
    }

    #[test]
    fn selection_wraps() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.current_index, 2);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.current_index, 0);
    }

    #[test]
    fn delete_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(app.active_popup, Some(PopupState::ConfirmDelete { .. })));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.targets.len(), 3);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.targets.len(), 2);
        assert_eq!(app.targets[0].name, "Docs");
    }

    #[test]
    fn failed_launch_is_reported_in_status() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path().join("registry.json")).unwrap();
        let mut launcher = Launcher::new(registry, Dispatcher::new(Platform::current()), NoPicker);
        launcher
            .add_target(&TargetDraft::software("Ghost", "/no/such/ghost"))
            .unwrap();
        let mut app = TuiState::new(launcher, Platform::current());
        press(&mut app, KeyCode::Enter);
        assert!(app.status_text().contains("Launch failed: Ghost"));
        assert_eq!(app.targets.len(), 1);
    }

    #[test]
    fn invalid_draft_shows_message() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        app.add_drafts(vec![TargetDraft::browser("Docs", Browser::Edge, "")]);
        match &app.active_popup {
            Some(PopupState::Message(msg)) => assert_eq!(msg, "Add failed: url is required"),
            _ => panic!("expected an error message"),
        }
        assert_eq!(app.targets.len(), 3);
    }

    #[test]
    fn new_category_is_selectable() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        app.add_category("Research");
        assert_eq!(app.categories, vec!["all", "Research", "Dev", "Web"]);
    }

    #[test]
    fn info_popup_lists_tags() {
        let dir = TempDir::new().unwrap();
        let mut app = state(&dir);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('i'));
        match &app.active_popup {
            Some(PopupState::Info(info)) => {
                assert_eq!(info.name, "Docs");
                assert_eq!(info.tags, "reference");
                assert_eq!(info.command, "google-chrome https://docs.example.com");
            }
            _ => panic!("expected the info popup"),
        }
    }

    #[test]
    fn typed_tags_are_split_on_commas() {
        let draft = TargetDraft::software("Tool", "/bin/tool").with_tags(split_tags(" a, b ,,a"));
        let target = draft.build("id".into()).unwrap();
        assert_eq!(target.tags, ["a", "b"]);
    }

    #[test]
    fn fit_width_pads_and_truncates() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdef", 4), "abc…");
        assert_eq!(fit_width("日本語テキスト", 5), "日本…");
        assert_eq!(fit_width("anything", 0), "");
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(color_from_hex("#5E81AC"), Some(Color::Rgb(0x5e, 0x81, 0xac)));
        assert_eq!(color_from_hex("zzzzzz"), None);
        assert_eq!(color_from_hex("#fff"), None);
    }
}
