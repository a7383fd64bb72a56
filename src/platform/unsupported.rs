//! Fallback for targets without a display configuration backend.

use crate::{DisplayError, DisplayId, DisplayMode, DisplayResult, ModeCatalog};

/// Every query fails: only macOS exposes the display configuration API this tool drives
#[derive(Debug, Default)]
pub struct SystemCatalog;

impl SystemCatalog {
    pub fn new() -> Self {
        Self
    }
}

fn unsupported() -> DisplayError {
    DisplayError::DisplayQuery(format!(
        "display configuration is only supported on macOS, not {}",
        std::env::consts::OS
    ))
}

impl ModeCatalog for SystemCatalog {
    type Mode = DisplayMode;

    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>> {
        Err(unsupported())
    }

    fn current_mode(&self, _display: DisplayId) -> DisplayResult<DisplayMode> {
        Err(unsupported())
    }

    fn available_modes(&self, _display: DisplayId) -> DisplayResult<Vec<DisplayMode>> {
        Err(unsupported())
    }

    fn apply_mode(&self, _display: DisplayId, _mode: &DisplayMode) -> DisplayResult {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select_display;

    #[test]
    fn reports_missing_backend_as_display_query_error() {
        let err = select_display(&SystemCatalog::new(), 0).unwrap_err();
        assert!(matches!(err, DisplayError::DisplayQuery(_)));
        assert!(err.to_string().contains("only supported on macOS"));
    }
}
