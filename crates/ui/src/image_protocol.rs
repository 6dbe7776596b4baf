//! Terminal graphics detection for the page view.

use std::time::Duration;

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

const PAGE_BACKGROUND: image::Rgba<u8> = image::Rgba([255, 255, 255, 255]);

/// Environment hints that decide how the terminal is probed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub term: Option<String>,
    pub kitty_window_id: Option<String>,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let iterm = var("ITERM_SESSION_ID").is_some()
            || var("TERM_PROGRAM").is_some_and(|t| t.contains("iTerm"))
            || var("LC_TERMINAL").is_some_and(|t| t.contains("iTerm"));
        Self {
            term: var("TERM"),
            kitty_window_id: var("KITTY_WINDOW_ID"),
            iterm,
            tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    fn in_kitty(&self) -> bool {
        self.kitty_window_id.is_some()
    }

    // `KITTY_WINDOW_ID` is not forwarded over SSH, `TERM` is.
    fn term_is_kitty(&self) -> bool {
        self.term
            .as_deref()
            .is_some_and(|term| term.trim().starts_with("xterm-kitty"))
    }

    pub fn should_query(&self) -> bool {
        self.in_kitty() || self.term_is_kitty() || self.iterm || self.tmux
    }

    pub fn query_timeout(&self) -> Duration {
        if self.in_kitty() || self.term_is_kitty() || self.iterm {
            Duration::from_millis(1500)
        } else if self.tmux {
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }

    pub fn kitty_supported(&self, picker: &Picker) -> bool {
        if self.iterm {
            return false;
        }
        self.in_kitty()
            || picker
                .capabilities()
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty))
    }
}

/// Picks the best graphics protocol the terminal answers for, falling back to halfblocks.
pub(crate) fn build_picker(hints: &TerminalHints) -> Picker {
    if hints.tmux {
        ensure_tmux_allow_passthrough();
    }
    let mut picker = if hints.should_query() {
        let mut options = QueryStdioOptions::default();
        options.timeout = hints.query_timeout();
        options.text_sizing_protocol = false;
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "terminal graphics query failed");
            Picker::halfblocks()
        })
    } else {
        Picker::halfblocks()
    };
    picker.set_background_color(PAGE_BACKGROUND);
    if hints.kitty_supported(&picker) {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    tracing::info!(
        protocol = protocol_label(&picker),
        font_size = ?picker.font_size(),
        "image protocol selected"
    );
    picker
}

// Kitty graphics inside tmux need passthrough; older tmux versions reject the option.
fn ensure_tmux_allow_passthrough() {
    let _ = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(term: &str) -> TerminalHints {
        TerminalHints {
            term: Some(term.to_string()),
            ..TerminalHints::default()
        }
    }

    #[test]
    fn plain_terminals_are_not_queried() {
        let plain = hints("xterm-256color");
        assert!(!plain.should_query());
        assert_eq!(plain.query_timeout(), Duration::ZERO);
    }

    #[test]
    fn kitty_over_ssh_is_detected_from_term() {
        let kitty = hints("xterm-kitty");
        assert!(kitty.should_query());
        assert_eq!(kitty.query_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn tmux_queries_quickly() {
        let tmux = TerminalHints {
            tmux: true,
            ..hints("screen-256color")
        };
        assert!(tmux.should_query());
        assert_eq!(tmux.query_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn kitty_protocol_alone_is_not_trusted() {
        let mut picker = Picker::halfblocks();
        picker.set_protocol_type(ProtocolType::Kitty);
        assert!(!hints("xterm-256color").kitty_supported(&picker));

        let in_kitty = TerminalHints {
            kitty_window_id: Some("1".to_string()),
            ..TerminalHints::default()
        };
        assert!(in_kitty.kitty_supported(&Picker::halfblocks()));

        let iterm = TerminalHints {
            iterm: true,
            ..in_kitty
        };
        assert!(!iterm.kitty_supported(&Picker::halfblocks()));
    }
}
