//! CoreGraphics display configuration.

use log::{debug, warn};
use objc2_core_foundation::{CFArray, CFRetained};
use objc2_core_graphics::{
    CGBeginDisplayConfiguration, CGCancelDisplayConfiguration, CGCompleteDisplayConfiguration,
    CGConfigureDisplayWithDisplayMode, CGConfigureOption, CGDirectDisplayID, CGDisplayConfigRef,
    CGDisplayCopyAllDisplayModes, CGDisplayCopyDisplayMode, CGDisplayMode, CGError,
    CGGetActiveDisplayList,
};

use crate::{
    ConfigStep, DisplayError, DisplayId, DisplayMode, DisplayResult, ModeCatalog, ModeFlags,
    PixelEncoding,
};

/// The displays of the current login session, as seen by CoreGraphics
#[derive(Debug, Default)]
pub struct SystemCatalog;

impl SystemCatalog {
    pub fn new() -> Self {
        Self
    }
}

/// A CoreGraphics mode together with the values read from it
#[derive(Debug)]
pub struct SystemMode {
    mode: DisplayMode,
    native: CFRetained<CGDisplayMode>,
}

impl AsRef<DisplayMode> for SystemMode {
    fn as_ref(&self) -> &DisplayMode {
        &self.mode
    }
}

fn bit_depth(mode: &CGDisplayMode) -> u32 {
    #[allow(deprecated)]
    let Some(descriptor) = CGDisplayMode::pixel_encoding(Some(mode)) else {
        return 0;
    };
    let descriptor = descriptor.to_string();
    let encoding = PixelEncoding::from_descriptor(&descriptor);
    if encoding == PixelEncoding::Unknown {
        warn!("unrecognised pixel encoding {:?}", descriptor);
    }
    encoding.depth()
}

fn describe(mode: &CGDisplayMode) -> DisplayMode {
    DisplayMode {
        width: CGDisplayMode::width(Some(mode)) as u32,
        height: CGDisplayMode::height(Some(mode)) as u32,
        depth: bit_depth(mode),
        refresh_rate: CGDisplayMode::refresh_rate(Some(mode)),
        flags: ModeFlags {
            io_flags: CGDisplayMode::io_flags(Some(mode)),
            usable_for_desktop: CGDisplayMode::is_usable_for_desktop_gui(Some(mode)),
        },
    }
}

fn check(step: ConfigStep, status: CGError) -> DisplayResult {
    if status == CGError::Success {
        debug!("{} succeeded", step);
        Ok(())
    } else {
        Err(DisplayError::Configuration {
            step,
            code: status.0,
        })
    }
}

impl ModeCatalog for SystemCatalog {
    type Mode = SystemMode;

    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>> {
        let mut count: u32 = 0;
        let status = unsafe { CGGetActiveDisplayList(0, std::ptr::null_mut(), &mut count) };
        if status != CGError::Success {
            return Err(DisplayError::DisplayQuery(format!(
                "CGGetActiveDisplayList failed: {:?}",
                status
            )));
        }

        let mut displays: Vec<CGDirectDisplayID> = vec![0; count as usize];
        let status =
            unsafe { CGGetActiveDisplayList(count, displays.as_mut_ptr(), &mut count) };
        if status != CGError::Success {
            return Err(DisplayError::DisplayQuery(format!(
                "CGGetActiveDisplayList failed: {:?}",
                status
            )));
        }
        // the list can shrink between the two calls
        displays.truncate(count as usize);

        Ok(displays.into_iter().map(DisplayId).collect())
    }

    fn current_mode(&self, display: DisplayId) -> DisplayResult<DisplayMode> {
        let mode = CGDisplayCopyDisplayMode(display.0).ok_or_else(|| {
            DisplayError::ModeQuery(format!(
                "unable to copy current display mode of display {}",
                display
            ))
        })?;
        Ok(describe(&mode))
    }

    fn available_modes(&self, display: DisplayId) -> DisplayResult<Vec<SystemMode>> {
        let all: CFRetained<CFArray> = unsafe { CGDisplayCopyAllDisplayModes(display.0, None) }
            .ok_or_else(|| {
                DisplayError::ModeQuery(format!("no mode list for display {}", display))
            })?;
        // SAFETY: CGDisplayCopyAllDisplayModes returns an array of CGDisplayMode
        let all: &CFArray<CGDisplayMode> = unsafe { all.cast_unchecked() };

        Ok(all
            .iter()
            .map(|native| SystemMode {
                mode: describe(&native),
                native,
            })
            .collect())
    }

    fn apply_mode(&self, display: DisplayId, mode: &SystemMode) -> DisplayResult {
        let mut config: CGDisplayConfigRef = std::ptr::null_mut();
        check(ConfigStep::Begin, unsafe {
            CGBeginDisplayConfiguration(&mut config)
        })?;

        let configured = check(ConfigStep::Configure, unsafe {
            CGConfigureDisplayWithDisplayMode(config, display.0, Some(&mode.native), None)
        });
        if let Err(err) = configured {
            unsafe { CGCancelDisplayConfiguration(config) };
            return Err(err);
        }

        check(ConfigStep::Complete, unsafe {
            CGCompleteDisplayConfiguration(config, CGConfigureOption::ForSession)
        })
    }
}
