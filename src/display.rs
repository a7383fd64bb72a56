use core::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::{DisplayId, DisplayMode, ModeRequest, ParseModeError};

/// Error type for the display module
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to get list of active displays: {0}")]
    DisplayQuery(String),
    #[error("failed trying to look up modes: {0}")]
    ModeQuery(String),
    #[error(transparent)]
    Format(#[from] ParseModeError),
    #[error("mode {0} not available")]
    ModeNotFound(ModeRequest),
    #[error("failed {step} err({code})")]
    Configuration { step: ConfigStep, code: i32 },
}

pub type DisplayResult<T = ()> = std::result::Result<T, DisplayError>;

/// The steps of a display configuration transaction
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConfigStep {
    Begin,
    Configure,
    Complete,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigStep::Begin => write!(f, "CGBeginDisplayConfiguration"),
            ConfigStep::Configure => write!(f, "CGConfigureDisplayWithDisplayMode"),
            ConfigStep::Complete => write!(f, "CGCompleteDisplayConfiguration"),
        }
    }
}

/// Access to the displays and modes the operating system knows about.
///
/// `Mode` is whatever the backend needs to hand a mode back to the OS; it only has to
/// expose the values it describes.
pub trait ModeCatalog {
    type Mode: AsRef<DisplayMode>;

    /// Lists the currently active displays
    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>>;

    /// Returns the mode the display is driven with right now
    fn current_mode(&self, display: DisplayId) -> DisplayResult<DisplayMode>;

    /// Returns every mode the display supports, in the order the OS reports them
    fn available_modes(&self, display: DisplayId) -> DisplayResult<Vec<Self::Mode>>;

    /// Switches the display to `mode` in a single configuration transaction
    fn apply_mode(&self, display: DisplayId, mode: &Self::Mode) -> DisplayResult;
}

/// Picks the display at `index` in the active display list
pub fn select_display<C: ModeCatalog>(catalog: &C, index: usize) -> DisplayResult<DisplayId> {
    let displays = catalog.active_displays()?;
    debug!("{} active display(s): {:?}", displays.len(), displays);

    displays.get(index).copied().ok_or_else(|| {
        if displays.is_empty() {
            DisplayError::DisplayQuery("no active display found".to_string())
        } else {
            DisplayError::DisplayQuery(format!(
                "display {} requested, but only {} active",
                index,
                displays.len()
            ))
        }
    })
}

/// Returns the values of every mode the display supports
pub fn list_modes<C: ModeCatalog>(catalog: &C, display: DisplayId) -> DisplayResult<Vec<DisplayMode>> {
    let modes = catalog.available_modes(display)?;
    debug!("display {} reports {} mode(s)", display, modes.len());
    Ok(modes.iter().map(|mode| *mode.as_ref()).collect())
}

/// Finds the first mode that exactly matches the request, in catalog order
pub fn find_mode<'a, M: AsRef<DisplayMode>>(modes: &'a [M], request: &ModeRequest) -> Option<&'a M> {
    modes.iter().find(|mode| mode.as_ref().matches(request))
}

/// Switches the display to the first catalog entry matching `request`.
///
/// Returns the mode that was applied.
pub fn set_mode<C: ModeCatalog>(
    catalog: &C,
    display: DisplayId,
    request: &ModeRequest,
) -> DisplayResult<DisplayMode> {
    let modes = catalog.available_modes(display)?;
    let mode = find_mode(&modes, request).ok_or(DisplayError::ModeNotFound(*request))?;
    let values = *mode.as_ref();
    debug!("matched {} on display {}", values, display);

    catalog.apply_mode(display, mode)?;
    info!("display {} switched to {}", display, values);
    Ok(values)
}
