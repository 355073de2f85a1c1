//! Live scan observers.

use crate::scanner::ScanStatus;
use log::{debug, info};
use monoscan_core::{ResultSeries, ScanPoint};
use monoscan_fit::{Fit, FitReport};

/// Receives progress while a scan runs.
///
/// Observers get immutable views only; the series passed to
/// [`ScanObserver::on_point`] already includes the new point.
pub trait ScanObserver {
    /// Called once before the first position with the number of positions.
    fn on_start(&mut self, _total: usize) {}

    /// Called after each point is measured and logged.
    fn on_point(&mut self, index: usize, point: &ScanPoint, series: &ResultSeries);

    /// Called once after the loop ends, whether completed or cancelled.
    fn on_finish(&mut self, _series: &ResultSeries, _status: ScanStatus) {}
}

impl ScanObserver for () {
    fn on_point(&mut self, _index: usize, _point: &ScanPoint, _series: &ResultSeries) {}
}

/// Refits a model after every point once enough points are available.
pub struct LiveFit<F> {
    fit: F,
    latest: Option<FitReport>,
}

impl<F: Fit> LiveFit<F> {
    /// Wraps a model.
    pub fn new(fit: F) -> Self {
        Self { fit, latest: None }
    }

    /// Most recent successful fit.
    pub fn latest(&self) -> Option<&FitReport> {
        self.latest.as_ref()
    }

    /// Consumes the observer, returning the most recent successful fit.
    pub fn into_latest(self) -> Option<FitReport> {
        self.latest
    }
}

impl<F: Fit> ScanObserver for LiveFit<F> {
    fn on_point(&mut self, index: usize, _point: &ScanPoint, series: &ResultSeries) {
        if series.len() < self.fit.min_points() {
            return;
        }
        match self.fit.fit_series(series) {
            Ok(report) => {
                info!("live fit after point {index}: {report}");
                self.latest = Some(report);
            }
            Err(err) => debug!("live fit after point {index} failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monoscan_core::{MonoidValue, Position};
    use monoscan_fit::{CurveFitter, Polynomial};

    #[test]
    fn test_live_fit_waits_for_min_points() {
        let mut live = LiveFit::new(CurveFitter::new(Polynomial::linear()));
        let mut series = ResultSeries::new();

        series.push(Position::single("x", 0.0), MonoidValue::from(1.0));
        live.on_point(0, &series.points()[0], &series);
        assert!(live.latest().is_none());

        series.push(Position::single("x", 1.0), MonoidValue::from(3.0));
        live.on_point(1, &series.points()[1], &series);
        let report = live.latest().unwrap();
        assert!((report.get("slope").unwrap() - 2.0).abs() < 1e-9);
    }
}
