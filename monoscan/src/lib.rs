//! monoscan: Instrument scanning built on monoid measurements.
//!
//! [`make_scan`] turns an instrument's [`Defaults`] into a [`Scanner`]
//! that walks a [`ScanPath`], folds repeated detector reads into one
//! [`MonoidValue`] per position, estimates the run time, logs every point
//! and optionally fits a model to the result.
//!
//! ```
//! use monoscan::{make_scan, DefaultsBuilder, MeasureParams, MonoidValue, ScanConfig, ScanPath};
//! use monoscan::VirtualMotion;
//!
//! let defaults = DefaultsBuilder::new("demo")
//!     .measure(|_, _, _| Ok(()))
//!     .detector(|_| Ok(MonoidValue::from(1.0)))
//!     .flux(1.0)
//!     .log_file(|_| Ok(std::env::temp_dir().join("monoscan_doc.csv")))
//!     .build()
//!     .unwrap()
//!     .into_inner();
//! let scanner = make_scan(defaults).unwrap();
//!
//! let theta = VirtualMotion::new("theta", 0.0).shared();
//! let path = ScanPath::axis(theta, vec![0.0, 0.5, 1.0]);
//! let config = ScanConfig::new()
//!     .with_params(MeasureParams::new().with_seconds(1.0))
//!     .with_repeats(2)
//!     .with_save(false);
//! let outcome = scanner.run(&path, &config).unwrap();
//! assert_eq!(outcome.series.len(), 3);
//! ```
//!

mod config;
mod observer;
mod path;
mod scanner;

pub use config::{CancelToken, ScanConfig};
pub use observer::{LiveFit, ScanObserver};
pub use path::{ScanPath, Step};
pub use scanner::{make_scan, ScanOutcome, ScanStatus, Scanner, TimeEstimate};

// Re-export the building blocks instruments need.
pub use monoscan_core::{
    make_estimator, Capability, Defaults, DefaultsBuilder, Error, FnDefaults, LogContext,
    MeasureParams, MonoidKind, MonoidValue, Motion, PointSpec, Position, Result, ResultSeries, ScanPoint,
    SharedMotion, ValidatedDefaults, VirtualMotion,
};
pub use monoscan_fit::{Fit, FitReport};
