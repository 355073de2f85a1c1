//! monoscan-core: Core traits and types for instrument scanning.
//!
//! This crate provides the foundational abstractions shared by the scan,
//! fit and I/O crates: the monoid algebra used to fold repeated detector
//! reads, scan positions and point generation, motion collaborators, the
//! instrument defaults contract, and time estimation.
//!

pub mod defaults;
pub mod error;
pub mod estimator;
pub mod monoid;
pub mod motion;
pub mod points;
pub mod position;
pub mod series;
pub mod stats;
pub mod value;

pub use defaults::{
    Capability, Defaults, DefaultsBuilder, FnDefaults, LogContext, MeasureParams,
    ValidatedDefaults,
};
pub use error::{Error, Result};
pub use estimator::{make_estimator, FluxEstimator, FRAME_FREQUENCY_HZ, SECONDS_PER_UAMP};
pub use monoid::{Any, Average, Count, Monoid, Polarisation, Product, Sum, Unit};
pub use motion::{FnMotion, Motion, SharedMotion, VirtualMotion};
pub use points::{PointSpec, MAX_POINTS};
pub use position::Position;
pub use series::{ResultSeries, ScanPoint, XyData};
pub use value::{MonoidKind, MonoidValue};
