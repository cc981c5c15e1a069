//! Line-based console front end
//!
//! Screens are printed with numbered options. A line of input is either
//! `/start`, `#N` for the N-th option, an option label, or free text.

use crate::dialog::{Event, Input, Screen};
use crate::runtime::Renderer;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Prints screens to stdout and remembers the last one for input parsing
#[derive(Default)]
pub struct ConsoleRenderer {
    last: Mutex<Option<Screen>>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn last(&self) -> MutexGuard<'_, Option<Screen>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn a typed line into an event for the screen on display
    pub fn parse(&self, line: &str) -> Event {
        parse_line(line, self.last().as_ref())
    }
}

#[async_trait]
impl Renderer for ConsoleRenderer {
    async fn render(&self, user_id: i64, screen: &Screen) -> Result<(), String> {
        let text = format_screen(screen);
        *self.last() = Some(screen.clone());

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}")
            .and_then(|()| stdout.flush())
            .map_err(|e| format!("failed to write screen for user {user_id}: {e}"))
    }
}

pub fn format_screen(screen: &Screen) -> String {
    let mut out = String::new();
    for notice in &screen.notices {
        let _ = writeln!(out, "! {notice}");
    }
    if let Some(view) = &screen.view {
        let _ = writeln!(out, "{}", view.text);
        for (pos, choice) in view.options.iter().enumerate() {
            let _ = writeln!(out, "  #{} {}", pos + 1, choice.label);
        }
        if view.accepts_text {
            out.push_str("> ");
        }
    }
    out.trim_end_matches('\n').to_string()
}

pub fn parse_line(line: &str, screen: Option<&Screen>) -> Event {
    let line = line.trim();
    if line == "/start" {
        return Event::Start;
    }

    let frame = screen.and_then(|s| s.frame);
    let options = screen
        .and_then(|s| s.view.as_ref())
        .map(|v| v.options.as_slice())
        .unwrap_or_default();

    let chosen = line
        .strip_prefix('#')
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| options.get(index))
        .or_else(|| options.iter().find(|c| c.label.eq_ignore_ascii_case(line)));

    let input = match chosen {
        Some(choice) => choice.input.clone(),
        None => Input::Text(line.to_string()),
    };
    Event::Input { frame, input }
}
