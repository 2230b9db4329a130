//! Full-screen control panel: settings header, live document preview, and
//! key-driven editing. The usage clock redraws once a second while the
//! filter is on.
//!
//! The event loop uses `tokio::select!` to handle:
//! - User keyboard input (quit, toggle, setting edits, scrolling)
//! - The per-second clock tick, armed only while the filter is enabled

use crate::controller::Controller;
use crate::document::Document;
use crate::settings::{self, Algorithm};
use crate::ui::preview;
use crossterm::{
    event::{Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::io;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Interval;

/// Preset colors the a/b/g keys cycle through.
const PALETTE: [&str; 8] = [
    "#FF0000", "#0000FF", "#00AA00", "#FF8800", "#AA00AA", "#008888", "#222222", "#FFFFFF",
];

/// Percent per +/- keypress.
const SCALE_STEP: i32 = 10;

struct PanelState {
    should_exit: bool,
    scroll: u16,
    preview: Text<'static>,
}

/// Run the panel until the user quits. Raw mode and the alternate screen are
/// restored even when the loop errors out.
pub async fn run(
    document: Rc<Document>,
    mut controller: Controller,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    enable_raw_mode().map_err(to_boxed_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(to_boxed_err)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(to_boxed_err)?;

    let result = event_loop(&mut terminal, &document, &mut controller).await;

    disable_raw_mode().map_err(to_boxed_err)?;
    execute!(io::stdout(), LeaveAlternateScreen).map_err(to_boxed_err)?;
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    document: &Rc<Document>,
    controller: &mut Controller,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Single background thread polls crossterm events and forwards them to
    // the async loop. try_send lets the thread notice a closed receiver and
    // exit instead of blocking forever.
    let (event_tx, mut event_rx) = mpsc::channel(32);
    thread::spawn(move || {
        loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read()
                        && event_tx.try_send(ev).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {}
                Err(_) => thread::sleep(Duration::from_millis(100)),
            }
        }
    });

    let mut state = PanelState {
        should_exit: false,
        scroll: 0,
        preview: preview::render_document(document),
    };
    let mut clock = clock_interval(controller.is_enabled());

    draw(terminal, &state, controller)?;
    while !state.should_exit {
        tokio::select! {
            biased;

            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        let was_enabled = controller.is_enabled();
                        let changed = process_event(event, &mut state, controller).await;
                        if changed {
                            state.preview = preview::render_document(document);
                        }
                        if controller.is_enabled() != was_enabled {
                            clock = clock_interval(controller.is_enabled());
                        }
                    }
                    // Event channel closed -> exit gracefully
                    None => state.should_exit = true,
                }
                draw(terminal, &state, controller)?;
            }

            _ = tick(&mut clock) => {
                draw(terminal, &state, controller)?;
            }
        }
    }
    Ok(())
}

/// One-second cadence for the elapsed clock; `None` while the filter is off.
fn clock_interval(enabled: bool) -> Option<Interval> {
    if enabled {
        let start = tokio::time::Instant::now() + Duration::from_secs(1);
        Some(tokio::time::interval_at(start, Duration::from_secs(1)))
    } else {
        None
    }
}

async fn tick(clock: &mut Option<Interval>) {
    match clock {
        Some(interval) => {
            interval.tick().await;
        }
        None => futures_util::future::pending::<()>().await,
    }
}

/// Palette entry after `current`, wrapping. A color outside the palette
/// snaps to the first preset.
fn next_preset(current: &str) -> &'static str {
    match PALETTE.iter().position(|&preset| preset == current) {
        Some(index) => PALETTE[(index + 1) % PALETTE.len()],
        None => PALETTE[0],
    }
}

/// Handle one keyboard event. Returns true when a setting changed and the
/// preview needs a fresh render.
async fn process_event(
    event: Event,
    state: &mut PanelState,
    controller: &mut Controller,
) -> bool {
    let Event::Key(key) = event else {
        return false;
    };
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.should_exit = true;
            false
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_exit = true;
            false
        }
        KeyCode::Char('t') => {
            controller.toggle().await;
            true
        }
        KeyCode::Char('a') => {
            let next = next_preset(controller.settings().color_a.as_str());
            if let Ok(color) = settings::Color::parse(next) {
                controller.set_color_a(color).await;
            }
            true
        }
        KeyCode::Char('b') => {
            let next = next_preset(controller.settings().color_b.as_str());
            if let Ok(color) = settings::Color::parse(next) {
                controller.set_color_b(color).await;
            }
            true
        }
        KeyCode::Char('g') => {
            let next = next_preset(controller.settings().background.as_str());
            if let Ok(color) = settings::Color::parse(next) {
                controller.set_background(color).await;
            }
            true
        }
        KeyCode::Char('m') => {
            let next = match controller.settings().algorithm {
                Algorithm::Char => Algorithm::Word,
                Algorithm::Word => Algorithm::Char,
            };
            controller.set_algorithm(next).await;
            true
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            controller.adjust_text_scale(SCALE_STEP).await;
            true
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            controller.adjust_text_scale(-SCALE_STEP).await;
            true
        }
        KeyCode::Char('r') => {
            controller.reset_text_scale().await;
            true
        }
        KeyCode::Up => {
            state.scroll = state.scroll.saturating_sub(1);
            false
        }
        KeyCode::Down => {
            state.scroll = state.scroll.saturating_add(1);
            false
        }
        _ => false,
    }
}

fn draw<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &PanelState,
    controller: &Controller,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    terminal
        .draw(|frame| {
            let chunks = Layout::vertical([
                Constraint::Length(5),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

            frame.render_widget(header(controller), chunks[0]);
            frame.render_widget(preview_widget(state), chunks[1]);
            frame.render_widget(help_line(), chunks[2]);
        })
        .map_err(to_boxed_err)?;
    Ok(())
}

fn header(controller: &Controller) -> Paragraph<'static> {
    let s = controller.settings();
    let (status_text, status_style) = if controller.is_enabled() {
        (
            "ON",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("OFF", Style::default().fg(Color::DarkGray))
    };
    let lines = vec![
        Line::from(vec![
            Span::raw("Filter: "),
            Span::styled(status_text, status_style),
            Span::raw(format!("   Active: {}", controller.elapsed_display())),
        ]),
        Line::from(vec![
            Span::raw("Colors: "),
            color_chip(&s.color_a),
            Span::raw(" / "),
            color_chip(&s.color_b),
            Span::raw(format!("   Background: {}", s.background)),
        ]),
        Line::from(format!("Mode: {}   Scale: {}%", s.algorithm, s.text_scale)),
    ];
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("stereoread"))
}

fn color_chip(color: &settings::Color) -> Span<'static> {
    let (r, g, b) = color.to_rgb();
    Span::styled(color.to_string(), Style::default().fg(Color::Rgb(r, g, b)))
}

fn preview_widget(state: &PanelState) -> Paragraph<'static> {
    Paragraph::new(state.preview.clone())
        .block(Block::default().borders(Borders::ALL).title("Preview"))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0))
}

fn help_line() -> Paragraph<'static> {
    Paragraph::new(
        "t toggle | a/b colors | g bg | m mode | +/- scale | r reset | up/down scroll | q quit",
    )
    .style(Style::default().fg(Color::DarkGray))
}

fn to_boxed_err<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryStore, Settings};

    fn key(code: KeyCode) -> Event {
        Event::Key(crossterm::event::KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn blank_state() -> PanelState {
        PanelState {
            should_exit: false,
            scroll: 0,
            preview: Text::default(),
        }
    }

    #[test]
    fn test_next_preset_cycles_and_recovers() {
        assert_eq!(next_preset("#FF0000"), "#0000FF");
        assert_eq!(next_preset(PALETTE[PALETTE.len() - 1]), PALETTE[0]);
        // Unknown color (set from the CLI) snaps back to the first preset.
        assert_eq!(next_preset("#123456"), PALETTE[0]);
    }

    #[tokio::test]
    async fn test_keys_drive_controller_while_disabled() {
        let (tx, _rx) = mpsc::channel(8);
        let mut controller =
            Controller::new(Settings::default(), Box::new(MemoryStore::default()), tx);
        let mut state = blank_state();

        let changed = process_event(key(KeyCode::Char('m')), &mut state, &mut controller).await;
        assert!(changed);
        assert_eq!(controller.settings().algorithm, Algorithm::Word);

        process_event(key(KeyCode::Char('a')), &mut state, &mut controller).await;
        assert_eq!(controller.settings().color_a.as_str(), "#0000FF");

        process_event(key(KeyCode::Char('+')), &mut state, &mut controller).await;
        assert_eq!(controller.settings().text_scale, 110);

        process_event(key(KeyCode::Char('q')), &mut state, &mut controller).await;
        assert!(state.should_exit);
    }

    #[tokio::test]
    async fn test_scroll_keys_move_without_marking_change() {
        let (tx, _rx) = mpsc::channel(8);
        let mut controller =
            Controller::new(Settings::default(), Box::new(MemoryStore::default()), tx);
        let mut state = blank_state();

        let changed = process_event(key(KeyCode::Down), &mut state, &mut controller).await;
        assert!(!changed);
        assert_eq!(state.scroll, 1);
        process_event(key(KeyCode::Up), &mut state, &mut controller).await;
        process_event(key(KeyCode::Up), &mut state, &mut controller).await;
        assert_eq!(state.scroll, 0);
    }
}
