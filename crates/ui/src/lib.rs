//! Terminal UI for Leafview.

use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use leafview_application::{AppContext, OpenError, OpenProgress, TocTree, ViewerEvent};
use leafview_core::{Config, Notification, Rotation, Severity};
use leafview_engine::Engine;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};
use unicode_width::UnicodeWidthStr;

mod image_protocol;
mod viewport;

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;
const SCROLL_ROWS: u32 = 3;
const SCROLL_COLS: u32 = 4;
const RAIL_WIDTH: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub config: Config,
    pub config_changed: bool,
}

pub struct Ui {
    ctx: AppContext,
    engine: Engine,
    image_picker: Picker,
    queued_paths: VecDeque<PathBuf>,
    goto_panel: GotoPanel,
    open_panel: OpenPanel,
    password_panel: PasswordPanel,
    toc_panel: TocPanel,
    info_panel: InfoPanel,
    text_panel: TextPanel,
    rail: PageRail,
    page_view: PageViewCache,
    toasts: VecDeque<Toast>,
    config_changed: bool,
}

impl Ui {
    pub fn new(ctx: AppContext, engine: Engine, files: Vec<PathBuf>) -> Self {
        Self {
            ctx,
            engine,
            image_picker: Picker::halfblocks(),
            queued_paths: files.into(),
            goto_panel: GotoPanel::default(),
            open_panel: OpenPanel::default(),
            password_panel: PasswordPanel::default(),
            toc_panel: TocPanel::default(),
            info_panel: InfoPanel::default(),
            text_panel: TextPanel::default(),
            rail: PageRail::default(),
            page_view: PageViewCache::default(),
            toasts: VecDeque::new(),
            config_changed: false,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        self.image_picker =
            image_protocol::build_picker(&image_protocol::TerminalHints::from_env());
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn outcome(&self) -> UiOutcome {
        UiOutcome {
            config: self.ctx.config.clone(),
            config_changed: self.config_changed,
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let tick_rate = Duration::from_millis(250);
        let mut needs_redraw = true;

        loop {
            if self.open_queued_paths() {
                needs_redraw = true;
            }
            if self.expire_toasts() {
                needs_redraw = true;
            }
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                // Drawing can resize the viewer, which may raise more events.
                needs_redraw = self.collect_events();
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    let exit = self.handle_key(key)?;
                    self.collect_events();
                    if let Some(UiExit::Quit) = exit {
                        return Ok(self.outcome());
                    }
                }
                _ => {}
            }
        }
    }

    fn accent_color(&self) -> Color {
        Color::Yellow
    }

    fn open_queued_paths(&mut self) -> bool {
        let mut opened = false;
        while self.ctx.pending_password().is_none() {
            let Some(path) = self.queued_paths.pop_front() else {
                break;
            };
            self.open_path(path);
            opened = true;
        }
        opened
    }

    fn open_path(&mut self, path: PathBuf) {
        match self.ctx.open_path(&self.engine, &path) {
            OpenProgress::Opened(_) | OpenProgress::Focused(_) => self.on_tab_changed(),
            OpenProgress::AwaitingPassword => self.password_panel = PasswordPanel::default(),
            OpenProgress::Failed => {}
        }
        self.collect_events();
    }

    fn on_tab_changed(&mut self) {
        self.page_view = PageViewCache::default();
        self.text_panel.text = None;
        self.toc_panel.open = false;
        self.goto_panel.open = false;
        self.rail.selected = self
            .ctx
            .tabs
            .active()
            .map(|tab| tab.viewer.current_page().saturating_sub(1) as usize)
            .unwrap_or(0);
    }

    /// Routes viewer events to the side views and turns notifications into toasts.
    fn collect_events(&mut self) -> bool {
        let events = self.ctx.drain_viewer_events();
        let changed = !events.is_empty() || !self.ctx.notifications.is_empty();
        for event in events {
            match event {
                ViewerEvent::CurrentPageChanged(page) => {
                    self.rail.selected = page.saturating_sub(1) as usize;
                }
                ViewerEvent::ZoomChanged(zoom) => {
                    tracing::debug!(zoom, "zoom changed");
                }
                ViewerEvent::RotationChanged(rotation) => {
                    tracing::debug!(degrees = rotation.degrees(), "rotation changed");
                }
                ViewerEvent::FitModeChanged(_)
                | ViewerEvent::ZoomLimitReached { .. }
                | ViewerEvent::Notify(_) => {}
            }
        }
        while let Some(notification) = self.ctx.notifications.pop_front() {
            self.toasts.push_back(Toast {
                notification,
                shown_at: Instant::now(),
            });
        }
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
        changed
    }

    fn expire_toasts(&mut self) -> bool {
        let before = self.toasts.len();
        self.toasts
            .retain(|toast| toast.shown_at.elapsed() < TOAST_TTL);
        before != self.toasts.len()
    }

    fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(Some(UiExit::Quit));
        }
        if self.ctx.pending_password().is_some() {
            self.handle_password_key(key)
        } else if self.open_panel.open {
            self.handle_open_panel_key(key)
        } else if self.goto_panel.open {
            self.handle_goto_panel_key(key)
        } else if self.toc_panel.open {
            self.handle_toc_panel_key(key)
        } else if self.info_panel.open {
            self.handle_info_panel_key(key)
        } else if self.text_panel.open {
            self.handle_text_panel_key(key)
        } else if self.rail.visible && self.rail.focused {
            self.handle_rail_key(key)
        } else {
            self.handle_view_key(key)
        }
    }

    fn handle_view_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let (font_w, font_h) = self.image_picker.font_size();
        let row_px = i64::from(font_h.max(1)) * i64::from(SCROLL_ROWS);
        let col_px = i64::from(font_w.max(1)) * i64::from(SCROLL_COLS);

        match key.code {
            KeyCode::Char('q') => return Ok(Some(UiExit::Quit)),
            KeyCode::Char('o') => {
                self.open_panel = OpenPanel {
                    open: true,
                    ..OpenPanel::default()
                };
                return Ok(None);
            }
            KeyCode::Char('d') => {
                let next = self.ctx.config.dpi_scale.cycle();
                self.ctx.config.dpi_scale = next;
                self.config_changed = true;
                self.ctx.notify(Notification::success(
                    "DPI scale",
                    format!("Set to {next}; applies to files opened from now on."),
                ));
                return Ok(None);
            }
            KeyCode::Tab => {
                self.ctx.tabs.focus_next();
                self.on_tab_changed();
                return Ok(None);
            }
            KeyCode::BackTab => {
                self.ctx.tabs.focus_previous();
                self.on_tab_changed();
                return Ok(None);
            }
            KeyCode::Char('c') => {
                self.ctx.tabs.close_active();
                self.on_tab_changed();
                return Ok(None);
            }
            _ => {}
        }

        let Some(tab) = self.ctx.tabs.active_mut() else {
            return Ok(None);
        };
        let viewer = &mut tab.viewer;
        let page_px = i64::from(viewer.viewport().height.max(1)) - i64::from(font_h);

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => viewer.scroll_by(0, row_px),
            KeyCode::Up | KeyCode::Char('k') => viewer.scroll_by(0, -row_px),
            KeyCode::Right | KeyCode::Char('l') => viewer.scroll_by(col_px, 0),
            KeyCode::Left | KeyCode::Char('h') => viewer.scroll_by(-col_px, 0),
            KeyCode::PageDown | KeyCode::Char(' ') => viewer.scroll_by(0, page_px.max(1)),
            KeyCode::PageUp => viewer.scroll_by(0, -page_px.max(1)),
            KeyCode::Char('n') => {
                let _ = viewer.next_page();
            }
            KeyCode::Char('p') => {
                let _ = viewer.previous_page();
            }
            KeyCode::Home => {
                let _ = viewer.first_page();
            }
            KeyCode::End => {
                let _ = viewer.last_page();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                viewer.zoom_in();
            }
            KeyCode::Char('-') => {
                viewer.zoom_out();
            }
            KeyCode::Char('w') => viewer.toggle_fit_width(),
            KeyCode::Char('r') => viewer.rotate(),
            KeyCode::Char('g') => {
                self.goto_panel = GotoPanel {
                    open: true,
                    input: viewer.page_field().to_string(),
                };
            }
            KeyCode::Char('t') => {
                let selected = tab
                    .toc
                    .nearest_entry_for_page(tab.viewer.current_page())
                    .unwrap_or(0);
                self.toc_panel = TocPanel {
                    open: true,
                    selected,
                    query: String::new(),
                };
            }
            KeyCode::Char('i') => {
                self.info_panel = InfoPanel {
                    open: true,
                    scroll: 0,
                };
            }
            KeyCode::Char('x') => {
                self.text_panel.open = true;
                self.text_panel.scroll = 0;
            }
            KeyCode::Char('s') => {
                self.rail.visible = true;
                self.rail.focused = true;
                self.rail.selected = tab.viewer.current_page().saturating_sub(1) as usize;
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_password_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.ctx.cancel_password();
                self.password_panel = PasswordPanel::default();
            }
            KeyCode::Enter => {
                let candidate = std::mem::take(&mut self.password_panel.input);
                if let OpenProgress::Opened(_) = self.ctx.submit_password(&candidate) {
                    self.on_tab_changed();
                }
            }
            KeyCode::Backspace => {
                self.password_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.password_panel.input.clear();
            }
            KeyCode::Char(ch) => self.password_panel.input.push(ch),
            _ => {}
        }
        Ok(None)
    }

    fn handle_open_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.open_panel = OpenPanel::default();
            }
            KeyCode::Enter => {
                let input = self.open_panel.input.trim().to_string();
                if input.is_empty() {
                    self.open_panel.error = Some("Enter a file path".to_string());
                    return Ok(None);
                }
                self.open_panel = OpenPanel::default();
                self.open_path(PathBuf::from(input));
            }
            KeyCode::Backspace => {
                self.open_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.open_panel.input.clear();
            }
            KeyCode::Char(ch) => {
                self.open_panel.input.push(ch);
                self.open_panel.error = None;
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_goto_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.goto_panel = GotoPanel::default();
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.goto_panel.input);
                self.goto_panel.open = false;
                if let Some(tab) = self.ctx.tabs.active_mut() {
                    // Rejected input resets the field and raises a warning toast.
                    let _ = tab.viewer.submit_page_field(&input);
                }
            }
            KeyCode::Backspace => {
                self.goto_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.clear();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.goto_panel.input.push(ch);
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_toc_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let Some(tab) = self.ctx.tabs.active_mut() else {
            self.toc_panel.open = false;
            return Ok(None);
        };
        let visible = toc_visible_indices(&tab.toc, &self.toc_panel.query);
        let cursor = visible
            .iter()
            .position(|idx| *idx == self.toc_panel.selected)
            .unwrap_or(0);

        match key.code {
            KeyCode::Esc => {
                self.toc_panel.open = false;
            }
            KeyCode::Up => {
                if let Some(idx) = visible.get(cursor.saturating_sub(1)) {
                    self.toc_panel.selected = *idx;
                }
            }
            KeyCode::Down => {
                if let Some(idx) = visible.get((cursor + 1).min(visible.len().saturating_sub(1))) {
                    self.toc_panel.selected = *idx;
                }
            }
            KeyCode::Enter => {
                let Some(target) = visible
                    .get(cursor)
                    .and_then(|idx| tab.toc.node(*idx))
                    .map(|node| node.entry.page)
                else {
                    return Ok(None);
                };
                match target {
                    Some(page) => {
                        let _ = tab.viewer.go_to_page(i64::from(page));
                        self.toc_panel.open = false;
                    }
                    None => self.ctx.notify(Notification::warning(
                        "Table of contents",
                        "This entry does not point to a page.",
                    )),
                }
            }
            KeyCode::Backspace => {
                self.toc_panel.query.pop();
                self.reselect_toc();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.toc_panel.query.clear();
                self.reselect_toc();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                self.toc_panel.query.push(ch);
                self.reselect_toc();
            }
            _ => {}
        }
        Ok(None)
    }

    fn reselect_toc(&mut self) {
        let Some(tab) = self.ctx.tabs.active() else {
            return;
        };
        let visible = toc_visible_indices(&tab.toc, &self.toc_panel.query);
        if !visible.contains(&self.toc_panel.selected) {
            self.toc_panel.selected = visible.first().copied().unwrap_or(0);
        }
    }

    fn handle_info_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('i') => self.info_panel.open = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.info_panel.scroll = self.info_panel.scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.info_panel.scroll = self.info_panel.scroll.saturating_add(1);
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_text_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('x') => self.text_panel.open = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.text_panel.scroll = self.text_panel.scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.text_panel.scroll = self.text_panel.scroll.saturating_add(1);
            }
            KeyCode::PageDown => {
                self.text_panel.scroll = self.text_panel.scroll.saturating_add(10);
            }
            KeyCode::PageUp => {
                self.text_panel.scroll = self.text_panel.scroll.saturating_sub(10);
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_rail_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let Some(tab) = self.ctx.tabs.active_mut() else {
            self.rail.focused = false;
            return Ok(None);
        };
        let last = tab.viewer.page_count().saturating_sub(1) as usize;
        match key.code {
            KeyCode::Esc => self.rail.focused = false,
            KeyCode::Char('s') => {
                self.rail.visible = false;
                self.rail.focused = false;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.rail.selected = self.rail.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.rail.selected = (self.rail.selected + 1).min(last);
            }
            KeyCode::Enter => {
                let _ = tab.viewer.go_to_page(self.rail.selected as i64 + 1);
            }
            KeyCode::Char('q') => return Ok(Some(UiExit::Quit)),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_tab_bar(layout[0], frame);

        let body = if self.rail.visible && !self.ctx.tabs.is_empty() {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(RAIL_WIDTH), Constraint::Min(0)])
                .split(layout[1]);
            self.draw_page_rail(columns[0], frame);
            columns[1]
        } else {
            layout[1]
        };
        self.draw_page_view(body, frame);
        self.draw_footer(layout[2], frame);

        if self.goto_panel.open {
            self.draw_goto_panel(area, frame);
        }
        if self.toc_panel.open {
            self.draw_toc_panel(area, frame);
        }
        if self.info_panel.open {
            self.draw_info_panel(area, frame);
        }
        if self.text_panel.open {
            self.draw_text_panel(area, frame);
        }
        if self.open_panel.open {
            self.draw_open_panel(area, frame);
        }
        if self.ctx.pending_password().is_some() {
            self.draw_password_panel(area, frame);
        }
        self.draw_toasts(area, frame);
    }

    fn draw_tab_bar(&self, area: Rect, frame: &mut ratatui::Frame) {
        let active = self.ctx.tabs.active_index();
        let mut spans = vec![Span::styled(
            " Leafview ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for (idx, tab) in self.ctx.tabs.iter().enumerate() {
            let style = if Some(idx) == active {
                Style::default()
                    .fg(Color::Black)
                    .bg(self.accent_color())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {} ", tab.key), style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_page_view(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let font_size = self.image_picker.font_size();
        let Some(tab) = self.ctx.tabs.active_mut() else {
            let hint = Paragraph::new(Text::from(vec![
                Line::raw(""),
                Line::styled(
                    "No document open",
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::raw("o open a file · q quit"),
            ]))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(hint, area);
            return;
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(tab.path.display().to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let (width_px, height_px) = viewport::cells_to_pixels(inner.width, inner.height, font_size);
        tab.viewer.set_viewport_size(width_px, height_px);

        let key = RenderKey {
            tab: tab.key.clone(),
            scroll: tab.viewer.scroll(),
            zoom: tab.viewer.zoom(),
            rotation: tab.viewer.rotation(),
            viewport_px: (width_px, height_px),
            area: (inner.width, inner.height),
        };
        if self.page_view.key.as_ref() != Some(&key) {
            let started = Instant::now();
            let canvas = viewport::compose_viewport(&tab.viewer);
            let size = Rect::new(0, 0, inner.width, inner.height);
            match self.image_picker.new_protocol(
                image::DynamicImage::ImageRgba8(canvas),
                size,
                Resize::Fit(None),
            ) {
                Ok(protocol) => {
                    self.page_view.protocol = Some(protocol);
                    self.page_view.error = None;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "page view protocol failed");
                    self.page_view.protocol = None;
                    self.page_view.error = Some(err.to_string());
                }
            }
            tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                width_px,
                height_px,
                "page view composed"
            );
            self.page_view.key = Some(key);
        }

        if let Some(protocol) = self.page_view.protocol.as_ref() {
            let proto_area = protocol.area();
            let draw_area = Rect::new(
                inner.x,
                inner.y,
                proto_area.width.min(inner.width),
                proto_area.height.min(inner.height),
            );
            frame.render_widget(ImageWidget::new(protocol), draw_area);
        } else if let Some(err) = self.page_view.error.as_deref() {
            frame.render_widget(
                Paragraph::new(format!("(image protocol failed: {err})"))
                    .wrap(Wrap { trim: true }),
                inner,
            );
        }
    }

    fn draw_page_rail(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(tab) = self.ctx.tabs.active() else {
            return;
        };
        let border_style = if self.rail.focused {
            Style::default().fg(self.accent_color())
        } else {
            Style::default()
        };
        let items: Vec<ListItem> = (1..=tab.viewer.page_count())
            .map(|page| ListItem::new(Line::raw(format!("{page:>4}"))))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_spacing(HighlightSpacing::Never);
        let mut state = ListState::default();
        if tab.viewer.page_count() > 0 {
            state.select(Some(self.rail.selected));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, area: Rect, frame: &mut ratatui::Frame) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let status = match self.ctx.tabs.active() {
            Some(tab) => {
                let viewer = &tab.viewer;
                let fit = if viewer.is_fit_width() { " (fit)" } else { "" };
                Line::from(vec![
                    Span::styled("Page ", bold),
                    Span::raw(format!("{}/{}", viewer.page_field(), viewer.page_count())),
                    Span::styled("  Zoom ", bold),
                    Span::raw(format!("{}%{fit}", viewer.zoom())),
                    Span::styled("  Rotation ", bold),
                    Span::raw(format!("{}°", viewer.rotation().degrees())),
                    Span::styled("  DPI ", bold),
                    Span::raw(self.ctx.config.dpi_scale.to_string()),
                    Span::styled("  Graphics ", bold),
                    Span::raw(image_protocol::protocol_label(&self.image_picker)),
                ])
            }
            None => Line::from(vec![
                Span::styled("DPI ", bold),
                Span::raw(self.ctx.config.dpi_scale.to_string()),
            ]),
        };

        let hints = [
            ("j/k", "scroll"),
            ("n/p", "page"),
            ("g", "go to"),
            ("+/-", "zoom"),
            ("w", "fit"),
            ("r", "rotate"),
            ("t", "contents"),
            ("s", "pages"),
            ("i", "info"),
            ("x", "text"),
            ("o", "open"),
            ("Tab", "next tab"),
            ("c", "close"),
            ("d", "dpi"),
            ("q", "quit"),
        ];
        let mut hint_spans = Vec::new();
        for (key, label) in hints {
            hint_spans.push(Span::styled(key, bold));
            hint_spans.push(Span::raw(format!(" {label}  ")));
        }

        let footer = Paragraph::new(Text::from(vec![status, Line::from(hint_spans)]))
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, area);
    }

    fn draw_goto_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(40, 20, area);
        frame.render_widget(Clear, popup_area);
        let total = self
            .ctx
            .tabs
            .active()
            .map(|tab| tab.viewer.page_count())
            .unwrap_or(0);
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("Go to page (1-{total})"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let lines = vec![
            Line::from(vec![
                Span::styled("Page: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.goto_panel.input.clone()),
                Span::styled("_", Style::default().fg(self.accent_color())),
            ]),
            Line::raw(""),
            Line::raw("Enter jump, Esc cancel, Ctrl+u clear."),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true }),
            popup_area,
        );
    }

    fn draw_open_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(70, 20, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Open file",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Path: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.open_panel.input.clone()),
                Span::styled("_", Style::default().fg(self.accent_color())),
            ]),
            Line::raw(""),
            Line::raw("Enter open, Esc cancel, Ctrl+u clear."),
        ];
        if let Some(err) = &self.open_panel.error {
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true }),
            popup_area,
        );
    }

    fn draw_password_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(attempt) = self.ctx.pending_password() else {
            return;
        };
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.accent_color()))
            .title(Span::styled(
                "Password required",
                Style::default().add_modifier(Modifier::BOLD),
            ));
        let file_name = attempt
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut lines = vec![
            Line::raw(format!("{file_name} is password protected.")),
            Line::raw(""),
            Line::from(vec![
                Span::styled("Password: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(mask(&self.password_panel.input)),
                Span::styled("_", Style::default().fg(self.accent_color())),
            ]),
        ];
        if let Some(OpenError::PasswordIncorrect) = attempt.error() {
            lines.push(Line::styled(
                OpenError::PasswordIncorrect.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        lines.push(Line::raw(""));
        lines.push(Line::raw("Enter unlock, Esc cancel."));
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true }),
            popup_area,
        );
    }

    fn draw_toc_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(tab) = self.ctx.tabs.active() else {
            return;
        };
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let visible = toc_visible_indices(&tab.toc, &self.toc_panel.query);
        let title = if self.toc_panel.query.trim().is_empty() {
            format!("Table of Contents · {}", tab.toc.len())
        } else {
            format!("Table of Contents · {}/{}", visible.len(), tab.toc.len())
        };
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let header = Text::from(vec![
            Line::raw("↑/↓ select, Enter jump, type to filter, Esc close."),
            Line::from(vec![
                Span::styled("Filter: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.toc_panel.query.clone()),
            ]),
        ]);
        frame.render_widget(Paragraph::new(header), sections[0]);

        let current = tab.toc.nearest_entry_for_page(tab.viewer.current_page());
        let items: Vec<ListItem> = if tab.toc.is_empty() {
            vec![ListItem::new(Line::raw("(no outline found)"))]
        } else if visible.is_empty() {
            vec![ListItem::new(Line::raw("(no matches)"))]
        } else {
            visible
                .iter()
                .filter_map(|idx| tab.toc.node(*idx).map(|node| (*idx, node)))
                .map(|(idx, node)| {
                    let indent = "  ".repeat(node.depth.min(12));
                    let page = node
                        .entry
                        .page
                        .map(|p| format!("p{p}"))
                        .unwrap_or_else(|| "-".to_string());
                    let style = if Some(idx) == current {
                        Style::default().fg(self.accent_color())
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::styled(
                        format!("{indent}{}  [{page}]", node.entry.title),
                        style,
                    ))
                })
                .collect()
        };

        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        if let Some(cursor) = visible.iter().position(|idx| *idx == self.toc_panel.selected) {
            state.select(Some(cursor));
        }
        frame.render_stateful_widget(list, sections[1], &mut state);
    }

    fn draw_info_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(tab) = self.ctx.tabs.active() else {
            return;
        };
        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);
        let label_width = tab
            .info
            .rows()
            .iter()
            .map(|(label, _)| UnicodeWidthStr::width(label.as_str()))
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = tab
            .info
            .rows()
            .iter()
            .map(|(label, value)| {
                let pad = label_width.saturating_sub(UnicodeWidthStr::width(label.as_str()));
                Line::from(vec![
                    Span::styled(
                        format!("{label}{}  ", " ".repeat(pad)),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(value.clone()),
                ])
            })
            .collect();
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Document information",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .scroll((self.info_panel.scroll, 0)),
            popup_area,
        );
    }

    fn draw_text_panel(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(tab) = self.ctx.tabs.active() else {
            return;
        };
        let page = tab.viewer.current_page();
        if self.text_panel.page != page || self.text_panel.text.is_none() {
            let text = match tab.current_page_text() {
                Ok(text) if text.trim().is_empty() => "(no text on this page)".to_string(),
                Ok(text) => text,
                Err(err) => format!("(text extraction failed: {err:#})"),
            };
            self.text_panel.text = Some(text);
            self.text_panel.page = page;
            self.text_panel.scroll = 0;
        }

        let popup_area = centered_rect(80, 80, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("Text · page {page}"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let content = self.text_panel.text.clone().unwrap_or_default();
        frame.render_widget(
            Paragraph::new(content)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((self.text_panel.scroll, 0)),
            popup_area,
        );
    }

    fn draw_toasts(&self, area: Rect, frame: &mut ratatui::Frame) {
        let width = area.width.min(48);
        let mut y = area.y.saturating_add(1);
        for toast in self.toasts.iter().rev() {
            let height = 4;
            if y.saturating_add(height) > area.bottom() {
                break;
            }
            let rect = Rect::new(area.right().saturating_sub(width), y, width, height);
            let color = severity_color(toast.notification.severity);
            frame.render_widget(Clear, rect);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    toast.notification.title.clone(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
            frame.render_widget(
                Paragraph::new(toast.notification.message.clone())
                    .block(block)
                    .wrap(Wrap { trim: true }),
                rect,
            );
            y = y.saturating_add(height);
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GotoPanel {
    open: bool,
    input: String,
}

#[derive(Debug, Clone, Default)]
struct OpenPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct PasswordPanel {
    input: String,
}

#[derive(Debug, Clone, Default)]
struct TocPanel {
    open: bool,
    selected: usize,
    query: String,
}

#[derive(Debug, Clone, Default)]
struct InfoPanel {
    open: bool,
    scroll: u16,
}

#[derive(Debug, Clone, Default)]
struct TextPanel {
    open: bool,
    page: u32,
    scroll: u16,
    text: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct PageRail {
    visible: bool,
    focused: bool,
    selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderKey {
    tab: String,
    scroll: (u32, u32),
    zoom: u32,
    rotation: Rotation,
    viewport_px: (u32, u32),
    area: (u16, u16),
}

#[derive(Default)]
struct PageViewCache {
    key: Option<RenderKey>,
    protocol: Option<ImageProtocol>,
    error: Option<String>,
}

struct Toast {
    notification: Notification,
    shown_at: Instant,
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn mask(input: &str) -> String {
    "*".repeat(input.chars().count())
}

/// Outline rows whose title contains `query` (case-insensitive), in reading order.
fn toc_visible_indices(tree: &TocTree, query: &str) -> Vec<usize> {
    let query = query.trim().to_lowercase();
    tree.nodes()
        .iter()
        .enumerate()
        .filter(|(_, node)| query.is_empty() || node.entry.title.to_lowercase().contains(&query))
        .map(|(idx, _)| idx)
        .collect()
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
