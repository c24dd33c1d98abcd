use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    MoveUp,
    MoveDown,
    Refresh,
    OpenMenu,
    OpenBulkMenu,
    ToggleSelect,
    SelectAll,
    ClearSelection,
    OpenBrowser,
    // Menu popover
    MenuUp,
    MenuDown,
    MenuActivate,
    CloseMenu,
    // Confirmation dialog
    Confirm,
    CancelDialog,
    ToggleForce,
    TerminateInstead,
    Acknowledge,
    // Config overlay
    CloseOverlay,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    CopyToClipboard,
    None,
}

/// Which overlay (if any) is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    None,
    Config,
    Alert,
}

/// Phase of the visible confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogMode {
    #[default]
    None,
    Confirm,
    Submitting,
    Results,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    pub is_loading: bool,
    pub overlay: OverlayMode,
    pub dialog: DialogMode,
    pub has_popover: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match ctx.overlay {
        OverlayMode::Config => {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
                KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
                KeyCode::PageDown => Action::PageDown,
                KeyCode::PageUp => Action::PageUp,
                KeyCode::Char('g') => Action::ScrollToTop,
                KeyCode::Char('G') => Action::ScrollToBottom,
                KeyCode::Char('y') => Action::CopyToClipboard,
                KeyCode::Char('q') | KeyCode::Esc => Action::CloseOverlay,
                _ => Action::None,
            };
        }
        OverlayMode::Alert => {
            return match key.code {
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => Action::CloseOverlay,
                _ => Action::None,
            };
        }
        OverlayMode::None => {}
    }

    match ctx.dialog {
        DialogMode::Confirm => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Action::Confirm,
                KeyCode::Char('n' | 'q') | KeyCode::Esc => Action::CancelDialog,
                KeyCode::Char('f') => Action::ToggleForce,
                KeyCode::Char('t') => Action::TerminateInstead,
                _ => Action::None,
            };
        }
        DialogMode::Submitting => {
            return match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Action::CancelDialog,
                _ => Action::None,
            };
        }
        DialogMode::Results => {
            return match key.code {
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => Action::Acknowledge,
                _ => Action::None,
            };
        }
        DialogMode::None => {}
    }

    if ctx.has_popover {
        return match key.code {
            KeyCode::Up | KeyCode::Char('k') => Action::MenuUp,
            KeyCode::Down | KeyCode::Char('j') => Action::MenuDown,
            KeyCode::Enter | KeyCode::Char('l') => Action::MenuActivate,
            KeyCode::Esc | KeyCode::Char('q' | 'h') => Action::CloseMenu,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::Enter | KeyCode::Char('m' | 'l') => Action::OpenMenu,
        KeyCode::Char('M' | 'b') => Action::OpenBulkMenu,
        KeyCode::Char(' ') => Action::ToggleSelect,
        KeyCode::Char('a') => Action::SelectAll,
        KeyCode::Char('x') => Action::ClearSelection,
        KeyCode::Char('r') if !ctx.is_loading => Action::Refresh,
        KeyCode::Char('o') => Action::OpenBrowser,
        _ => Action::None,
    }
}
