//! An in-memory [`ModeCatalog`], for exercising the matcher without display hardware.

use std::cell::{Cell, RefCell};

use crate::{ConfigStep, DisplayError, DisplayId, DisplayMode, DisplayResult, ModeCatalog};

/// A catalog backed by a fixed list of modes, shared by every display it reports
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    displays: Vec<DisplayId>,
    modes: Vec<DisplayMode>,
    current: RefCell<Option<DisplayMode>>,
    applied: RefCell<Vec<(DisplayId, usize)>>,
    failing_step: Cell<Option<(ConfigStep, i32)>>,
    failing_enumeration: Cell<bool>,
}

/// A mode handle pointing back into the catalog
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MemoryMode {
    index: usize,
    mode: DisplayMode,
}

impl AsRef<DisplayMode> for MemoryMode {
    fn as_ref(&self) -> &DisplayMode {
        &self.mode
    }
}

impl MemoryCatalog {
    pub fn new(displays: Vec<DisplayId>, modes: Vec<DisplayMode>) -> Self {
        Self {
            displays,
            modes,
            ..Self::default()
        }
    }

    /// Sets the mode reported by `current_mode`
    pub fn set_current(&self, mode: DisplayMode) {
        self.current.replace(Some(mode));
    }

    /// Makes the given configuration step fail with `code`
    pub fn fail_at(&self, step: ConfigStep, code: i32) {
        self.failing_step.set(Some((step, code)));
    }

    /// Makes mode enumeration fail
    pub fn fail_enumeration(&self) {
        self.failing_enumeration.set(true);
    }

    /// Every successful `apply_mode` call, as (display, catalog index)
    pub fn applied(&self) -> Vec<(DisplayId, usize)> {
        self.applied.borrow().clone()
    }

    fn step(&self, step: ConfigStep) -> DisplayResult {
        match self.failing_step.get() {
            Some((failing, code)) if failing == step => {
                Err(DisplayError::Configuration { step, code })
            }
            _ => Ok(()),
        }
    }
}

impl ModeCatalog for MemoryCatalog {
    type Mode = MemoryMode;

    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>> {
        Ok(self.displays.clone())
    }

    fn current_mode(&self, display: DisplayId) -> DisplayResult<DisplayMode> {
        self.current.borrow().ok_or_else(|| {
            DisplayError::ModeQuery(format!("unable to copy current mode of display {}", display))
        })
    }

    fn available_modes(&self, display: DisplayId) -> DisplayResult<Vec<MemoryMode>> {
        if self.failing_enumeration.get() {
            return Err(DisplayError::ModeQuery(format!(
                "no modes for display {}",
                display
            )));
        }
        Ok(self
            .modes
            .iter()
            .enumerate()
            .map(|(index, mode)| MemoryMode { index, mode: *mode })
            .collect())
    }

    fn apply_mode(&self, display: DisplayId, mode: &MemoryMode) -> DisplayResult {
        self.step(ConfigStep::Begin)?;
        self.step(ConfigStep::Configure)?;
        self.step(ConfigStep::Complete)?;

        self.applied.borrow_mut().push((display, mode.index));
        self.current.replace(Some(mode.mode));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_mode_is_missing_until_set() {
        let catalog = MemoryCatalog::new(vec![DisplayId(1)], vec![]);
        assert!(matches!(
            catalog.current_mode(DisplayId(1)),
            Err(DisplayError::ModeQuery(_))
        ));

        catalog.set_current(DisplayMode::new(800, 600, 8, 0.0));
        assert_eq!(
            catalog.current_mode(DisplayId(1)).unwrap(),
            DisplayMode::new(800, 600, 8, 0.0)
        );
    }

    #[test]
    fn each_step_can_fail() {
        let modes = vec![DisplayMode::new(640, 480, 8, 60.0)];
        for step in [ConfigStep::Begin, ConfigStep::Configure, ConfigStep::Complete] {
            let catalog = MemoryCatalog::new(vec![DisplayId(1)], modes.clone());
            catalog.fail_at(step, -1);
            let handle = catalog.available_modes(DisplayId(1)).unwrap()[0];
            match catalog.apply_mode(DisplayId(1), &handle) {
                Err(DisplayError::Configuration { step: failed, code: -1 }) => assert_eq!(failed, step),
                other => panic!("unexpected result: {:?}", other),
            }
            assert!(catalog.applied().is_empty());
        }
    }
}
