//! Per-invocation scan configuration.

use monoscan_core::{Error, MeasureParams, Result};
use monoscan_fit::Fit;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that stops a running scan.
///
/// The scan polls the token before each position and each repeat. Clones
/// share the same flag, so a token can be handed to another thread or a
/// signal handler.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Options for one scan invocation.
#[derive(Clone)]
pub struct ScanConfig {
    /// Counting parameters for each detector read.
    pub params: MeasureParams,
    /// Detector reads folded into each point.
    pub repeats: usize,
    /// Extra seconds per point for motion and overheads, used in estimates.
    pub pad: f64,
    /// Report each point at info level instead of debug.
    pub display: bool,
    /// Write a log of the scan.
    pub save: bool,
    /// Log path to use instead of asking the instrument.
    pub log_path: Option<PathBuf>,
    /// Model fitted to the completed series.
    pub fit: Option<Arc<dyn Fit>>,
    /// Cancellation flag.
    pub cancel: CancelToken,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            params: MeasureParams::default(),
            repeats: 1,
            pad: 0.0,
            display: true,
            save: true,
            log_path: None,
            fit: None,
            cancel: CancelToken::default(),
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the counting parameters.
    #[must_use]
    pub fn with_params(mut self, params: MeasureParams) -> Self {
        self.params = params;
        self
    }

    /// Set the number of reads per point.
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set the per-point overhead used in time estimates.
    #[must_use]
    pub fn with_pad(mut self, pad: f64) -> Self {
        self.pad = pad;
        self
    }

    /// Enable or disable per-point reporting.
    #[must_use]
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Enable or disable logging to file.
    #[must_use]
    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    /// Log to a fixed path.
    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Fit a model to the completed series.
    #[must_use]
    pub fn with_fit(mut self, fit: Arc<dyn Fit>) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Share a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checks durations and padding.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for negative or non-finite time
    /// parameters and [`Error::InvalidConfig`] for a bad pad.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if !self.pad.is_finite() || self.pad < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "pad must be finite and non-negative, got {}",
                self.pad
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("params", &self.params)
            .field("repeats", &self.repeats)
            .field("pad", &self.pad)
            .field("display", &self.display)
            .field("save", &self.save)
            .field("log_path", &self.log_path)
            .field("fit", &self.fit.as_ref().map(|fit| fit.name().to_string()))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
