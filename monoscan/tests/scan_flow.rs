//! End-to-end scans against a mock instrument.

use approx::assert_relative_eq;
use monoscan::{
    make_scan, CancelToken, Capability, Defaults, Error, LogContext, MeasureParams, MonoidKind,
    MonoidValue, Motion, Position, ResultSeries, ScanConfig, ScanObserver, ScanPath, ScanPoint,
    ScanStatus, SharedMotion, VirtualMotion,
};
use monoscan_core::{make_estimator, Count};
use monoscan_fit::{by_name, CurveFitter, Gaussian, Polynomial};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

/// Detector returns successive integers as counts, or reads a motion.
struct MockInstrument {
    log_dir: PathBuf,
    calls: u64,
    fail_on_call: Option<u64>,
    kind: MonoidKind,
    reading_sum: bool,
    follow: Option<SharedMotion>,
    titles: Vec<String>,
    advertise_log_file: bool,
}

impl MockInstrument {
    fn new(log_dir: &Path) -> Self {
        Self {
            log_dir: log_dir.to_path_buf(),
            calls: 0,
            fail_on_call: None,
            kind: MonoidKind::Count,
            reading_sum: false,
            follow: None,
            titles: Vec::new(),
            advertise_log_file: true,
        }
    }
}

impl Defaults for MockInstrument {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.advertise_log_file || *c != Capability::LogFile)
            .collect()
    }

    fn measure(&mut self, title: &str, _: &Position, _: &MeasureParams) -> monoscan::Result<()> {
        self.titles.push(title.to_string());
        Ok(())
    }

    fn detector(&mut self, _: &MeasureParams) -> monoscan::Result<MonoidValue> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(Error::Instrument("detector timeout".to_string()));
        }
        if let Some(motion) = &self.follow {
            let x = motion.position()?;
            return Ok(MonoidValue::from(2.0 * x + 1.0));
        }
        if self.reading_sum {
            #[allow(clippy::cast_precision_loss)]
            return Ok(MonoidValue::from(self.calls as f64));
        }
        Ok(MonoidValue::from(Count(self.calls)))
    }

    fn detector_kind(&self) -> MonoidKind {
        self.kind.clone()
    }

    fn time_estimator(&self, params: &MeasureParams) -> monoscan::Result<f64> {
        make_estimator(2.0)(params)
    }

    fn log_file(&self, context: &LogContext) -> monoscan::Result<PathBuf> {
        Ok(self
            .log_dir
            .join(format!("{}_{}.csv", context.instrument, context.points)))
    }
}

fn theta(values: &[f64]) -> ScanPath {
    ScanPath::axis(VirtualMotion::new("theta", 0.0).shared(), values.to_vec())
}

fn frames() -> MeasureParams {
    MeasureParams::new().with_frames(50)
}

#[test]
fn three_positions_two_repeats_fold_in_order() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let config = ScanConfig::new().with_params(frames()).with_repeats(2);

    let outcome = scanner.run(&theta(&[0.0, 1.0, 2.0]), &config).unwrap();

    assert_eq!(outcome.status, ScanStatus::Completed);
    let values: Vec<&MonoidValue> = outcome.series.iter().map(|p| &p.value).collect();
    assert_eq!(
        values,
        vec![
            &MonoidValue::from(Count(3)),
            &MonoidValue::from(Count(7)),
            &MonoidValue::from(Count(11)),
        ]
    );
    let xs: Vec<f64> = outcome
        .series
        .iter()
        .filter_map(|p| p.position.primary())
        .collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);

    // 3 points x 2 repeats x 5 s per 50 frames
    assert_relative_eq!(outcome.estimated_seconds.unwrap(), 30.0);

    let log_path = outcome.log_path.unwrap();
    assert_eq!(log_path, dir.path().join("mock_3.csv"));
    let log = std::fs::read_to_string(log_path).unwrap();
    assert_eq!(log.lines().count(), 4);
    let row: Vec<&str> = log.lines().nth(2).unwrap().split(',').collect();
    assert_eq!(&row[..3], &["1", "1", "7"]);
    assert_relative_eq!(row[3].parse::<f64>().unwrap(), 7f64.sqrt());
}

#[test]
fn missing_log_file_fails_at_construction() {
    let dir = tempdir().unwrap();
    let mut instrument = MockInstrument::new(dir.path());
    instrument.advertise_log_file = false;

    let err = make_scan(instrument).unwrap_err();
    assert!(matches!(
        err,
        Error::ContractViolation {
            capability: Capability::LogFile,
            ..
        }
    ));
}

#[test]
fn detector_failure_names_position_and_keeps_log() {
    let dir = tempdir().unwrap();
    let mut instrument = MockInstrument::new(dir.path());
    instrument.fail_on_call = Some(3);
    let scanner = make_scan(instrument).unwrap();
    let log_path = dir.path().join("partial.jsonl");
    let config = ScanConfig::new()
        .with_params(frames())
        .with_repeats(2)
        .with_log_path(&log_path);

    let err = scanner.run(&theta(&[0.0, 1.0, 2.0]), &config).unwrap_err();
    match err {
        Error::MeasurementFailure { position, reason } => {
            assert_eq!(position, Position::single("theta", 1.0));
            assert!(reason.contains("detector timeout"));
        }
        other => panic!("unexpected error {other}"),
    }

    let series = monoscan_io::ScanLogReader::open(&log_path)
        .unwrap()
        .read_series()
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.points()[0].value, MonoidValue::from(Count(3)));
}

struct CancelAfter {
    token: CancelToken,
    after: usize,
    finished: Option<ScanStatus>,
}

impl ScanObserver for CancelAfter {
    fn on_point(&mut self, _index: usize, _point: &ScanPoint, series: &ResultSeries) {
        if series.len() >= self.after {
            self.token.cancel();
        }
    }

    fn on_finish(&mut self, _series: &ResultSeries, status: ScanStatus) {
        self.finished = Some(status);
    }
}

#[test]
fn cancellation_returns_partial_series() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let token = CancelToken::new();
    let config = ScanConfig::new()
        .with_params(frames())
        .with_cancel(token.clone());
    let mut observer = CancelAfter {
        token,
        after: 2,
        finished: None,
    };

    let outcome = scanner
        .run_with(&theta(&[0.0, 1.0, 2.0, 3.0]), &config, &mut observer)
        .unwrap();
    assert_eq!(outcome.status, ScanStatus::Cancelled);
    assert_eq!(outcome.series.len(), 2);
    assert_eq!(observer.finished, Some(ScanStatus::Cancelled));

    let log = std::fs::read_to_string(outcome.log_path.unwrap()).unwrap();
    assert_eq!(log.lines().count(), 3);
}

#[test]
fn fit_divergence_keeps_series() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let config = ScanConfig::new()
        .with_params(frames())
        .with_save(false)
        .with_fit(Arc::new(CurveFitter::new(Gaussian)));

    let outcome = scanner.run(&theta(&[0.0, 1.0, 2.0]), &config).unwrap();
    assert_eq!(outcome.series.len(), 3);
    assert!(outcome.log_path.is_none());
    assert!(matches!(outcome.fit, Some(Err(Error::FitDivergence(_)))));
}

#[test]
fn linear_fit_over_motion_readback() {
    let dir = tempdir().unwrap();
    let motion = VirtualMotion::new("theta", 0.0).shared();
    let mut instrument = MockInstrument::new(dir.path());
    instrument.kind = MonoidKind::Sum;
    instrument.follow = Some(Arc::clone(&motion));
    let scanner = make_scan(instrument).unwrap();

    let path = ScanPath::axis(motion, vec![-1.0, 0.0, 1.0, 2.0]);
    let config = ScanConfig::new()
        .with_params(frames())
        .with_save(false)
        .with_fit(Arc::from(by_name("linear").unwrap()));

    let report = scanner.run(&path, &config).unwrap().fit.unwrap().unwrap();
    assert_relative_eq!(report.get("slope").unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(report.get("intercept").unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn zero_repeats_yield_kind_zero() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let config = ScanConfig::new()
        .with_params(frames())
        .with_repeats(0)
        .with_save(false);

    let outcome = scanner.run(&theta(&[0.0, 1.0]), &config).unwrap();
    assert!(outcome
        .series
        .iter()
        .all(|p| p.value == MonoidValue::from(Count(0))));
}

#[test]
fn reading_of_wrong_kind_is_type_mismatch() {
    let dir = tempdir().unwrap();
    let mut instrument = MockInstrument::new(dir.path());
    instrument.reading_sum = true;
    let scanner = make_scan(instrument).unwrap();
    let config = ScanConfig::new().with_params(frames()).with_save(false);

    let err = scanner.run(&theta(&[0.0]), &config).unwrap_err();
    assert!(matches!(
        err,
        Error::TypeMismatch {
            left: MonoidKind::Count,
            right: MonoidKind::Sum
        }
    ));
}

#[test]
fn estimator_errors_do_not_block_the_scan() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let both = MeasureParams::new().with_frames(50).with_seconds(1.0);
    let config = ScanConfig::new().with_params(both.clone()).with_save(false);

    let outcome = scanner.run(&theta(&[0.0, 1.0]), &config).unwrap();
    assert_eq!(outcome.series.len(), 2);
    assert!(outcome.estimated_seconds.is_none());

    let err = scanner.calculate(&theta(&[0.0, 1.0]), &both, 0.0).unwrap_err();
    assert!(matches!(err, Error::AmbiguousEstimate(_)));
}

#[test]
fn calculate_adds_padding_per_point() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let estimate = scanner
        .calculate(&theta(&[0.0, 1.0, 2.0]), &frames(), 1.0)
        .unwrap();
    assert_relative_eq!(estimate.seconds, 18.0);
}

#[test]
fn measure_interpolates_titles() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let path = theta(&[0.5, 1.25]) * ScanPath::axis(VirtualMotion::new("temp", 4.0).shared(), vec![4.0]);

    let count = scanner
        .measure(&path, "Sample at {theta} deg, {temp:.1} K", &frames())
        .unwrap();
    assert_eq!(count, 2);

    let titles = scanner.into_defaults().titles;
    assert_eq!(
        titles,
        vec![
            "Sample at 0.5 deg, 4.0 K".to_string(),
            "Sample at 1.25 deg, 4.0 K".to_string(),
        ]
    );
}

#[test]
fn second_scan_on_busy_instrument_is_rejected() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let config = ScanConfig::new().with_params(frames()).with_save(false);

    let nested = scanner
        .with_defaults(|_| scanner.run(&theta(&[0.0]), &config))
        .unwrap();
    assert!(matches!(nested, Err(Error::Busy(_))));
}

#[test]
fn product_scan_visits_every_combination() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let path = theta(&[0.0, 1.0]) * ScanPath::axis(VirtualMotion::new("phi", 0.0).shared(), vec![5.0, 6.0]);
    let config = ScanConfig::new().with_params(frames());

    let outcome = scanner.run(&path, &config).unwrap();
    assert_eq!(outcome.series.len(), 4);
    assert_eq!(outcome.series.points()[1].position.to_string(), "theta=0, phi=6");

    let log = std::fs::read_to_string(outcome.log_path.unwrap()).unwrap();
    assert!(log.starts_with("index,theta,phi,value,uncertainty\n"));
}

#[test]
fn linear_live_fit_sees_every_point() {
    let dir = tempdir().unwrap();
    let motion = VirtualMotion::new("theta", 0.0).shared();
    let mut instrument = MockInstrument::new(dir.path());
    instrument.kind = MonoidKind::Sum;
    instrument.follow = Some(Arc::clone(&motion));
    let scanner = make_scan(instrument).unwrap();

    let mut live = monoscan::LiveFit::new(CurveFitter::new(Polynomial::linear()));
    let config = ScanConfig::new().with_params(frames()).with_save(false);
    scanner
        .run_with(&ScanPath::axis(motion, vec![0.0, 1.0, 2.0]), &config, &mut live)
        .unwrap();
    let report = live.into_latest().unwrap();
    assert_eq!(report.points, 3);
    assert_relative_eq!(report.get("slope").unwrap(), 2.0, epsilon = 1e-9);
}

#[test]
fn sequential_scan_over_two_axes_logs_to_csv() {
    let dir = tempdir().unwrap();
    let scanner = make_scan(MockInstrument::new(dir.path())).unwrap();
    let log_path = dir.path().join("sequential.csv");
    let path = ScanPath::axis(VirtualMotion::new("x", 0.0).shared(), vec![1.0, 1.5])
        + ScanPath::axis(VirtualMotion::new("y", 0.0).shared(), vec![2.0]);
    let config = ScanConfig::new()
        .with_params(frames())
        .with_log_path(&log_path);

    let outcome = scanner.run(&path, &config).unwrap();
    assert_eq!(outcome.series.len(), 3);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "index,x,y,value,uncertainty");
    assert!(lines[1].starts_with("0,1,,1,"));
    assert!(lines[3].starts_with("2,,2,3,"));

    let series = monoscan_io::ScanLogReader::open(&log_path)
        .unwrap()
        .read_series()
        .unwrap();
    assert_eq!(series.points()[1].position, Position::single("x", 1.5));
    assert_eq!(series.points()[2].position, Position::single("y", 2.0));
}
