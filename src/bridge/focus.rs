//! Window-focus gating.

use active_win_pos_rs::get_active_window;
use tracing::info;

/// Answers "should input reach the console right now?".
pub trait FocusProbe {
    fn focused(&mut self) -> bool;
}

/// No gating requested.
pub struct AlwaysFocused;

impl FocusProbe for AlwaysFocused {
    fn focused(&mut self) -> bool {
        true
    }
}

/// Gate on the foreground window title containing `needle`
/// (case-insensitive). A probe failure degrades to "focused" rather than
/// pausing the stream.
pub struct WindowFocus {
    needle: String,
}

impl FocusProbe for WindowFocus {
    fn focused(&mut self) -> bool {
        match get_active_window() {
            Ok(window) => window.title.to_lowercase().contains(&self.needle),
            Err(_) => true,
        }
    }
}

/// Build the probe for an optional target window title.
pub fn probe_for(target: Option<&str>) -> Box<dyn FocusProbe> {
    match target {
        Some(title) => {
            info!("Gating input on window focus: {title:?}");
            Box::new(WindowFocus {
                needle: title.to_lowercase(),
            })
        }
        None => Box::new(AlwaysFocused),
    }
}
