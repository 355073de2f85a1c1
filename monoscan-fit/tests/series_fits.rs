//! Fitting complete result series.

use approx::assert_relative_eq;
use monoscan_core::{Average, Error, MonoidValue, Position, ResultSeries};
use monoscan_fit::{best_fit, by_name, compare_fits, models, CurveFit, CurveFitter, Fit, Gaussian};

fn series_from(points: &[(f64, MonoidValue)]) -> ResultSeries {
    let mut series = ResultSeries::new();
    for (x, value) in points {
        series.push(Position::single("theta", *x), value.clone());
    }
    series
}

#[test]
fn linear_fit_recovers_slope_and_intercept() {
    let points: Vec<(f64, MonoidValue)> = (0..6)
        .map(|i| {
            let x = f64::from(i);
            (x, MonoidValue::from(3.0 * x - 2.0))
        })
        .collect();
    let report = by_name("linear")
        .unwrap()
        .fit_series(&series_from(&points))
        .unwrap();

    assert_relative_eq!(report.get("slope").unwrap(), 3.0, epsilon = 1e-9);
    assert_relative_eq!(report.get("intercept").unwrap(), -2.0, epsilon = 1e-9);
    assert!(report.rms < 1e-9);
    assert_eq!(report.points, 6);
}

#[test]
fn multichannel_values_reduce_to_median() {
    // Channel medians lie on y = x + 1; the outlying channel is ignored.
    let points: Vec<(f64, MonoidValue)> = (0..4)
        .map(|i| {
            let x = f64::from(i);
            let channels = vec![
                MonoidValue::from(x),
                MonoidValue::from(x + 1.0),
                MonoidValue::from(100.0),
            ];
            (x, MonoidValue::from(channels))
        })
        .collect();
    let series = series_from(&points);
    assert_eq!(series.xy().y, vec![1.0, 2.0, 3.0, 4.0]);

    let report = by_name("linear").unwrap().fit_series(&series).unwrap();
    assert_relative_eq!(report.get("slope").unwrap(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(report.get("intercept").unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn averages_fit_on_their_means() {
    let points = [
        (0.0, MonoidValue::from(Average::with_count(60.0, 10.0))),
        (1.0, MonoidValue::from(Average::with_count(160.0, 40.0))),
        (2.0, MonoidValue::from(Average::with_count(50.0, 10.0))),
    ];
    let data = series_from(&points).xy();
    assert_eq!(data.y, vec![6.0, 4.0, 5.0]);
}

#[test]
fn too_few_points_diverges_without_panicking() {
    let points = [(0.0, MonoidValue::from(1.0)), (1.0, MonoidValue::from(2.0))];
    let err = CurveFitter::new(Gaussian)
        .fit_series(&series_from(&points))
        .unwrap_err();
    assert!(matches!(err, Error::FitDivergence(_)));
}

#[test]
fn comparison_prefers_the_generating_model() {
    let truth = [0.5, 0.4, 80.0, 5.0];
    let points: Vec<(f64, MonoidValue)> = (0..31)
        .map(|i| {
            let x = -1.5 + 0.1 * f64::from(i);
            (x, MonoidValue::from(Gaussian.model(x, &truth)))
        })
        .collect();

    let comparisons = compare_fits(&models::builtin(), &series_from(&points));
    assert_eq!(comparisons.len(), 5);

    let best = best_fit(&comparisons).unwrap();
    assert_eq!(best.model, "gaussian");
    assert_relative_eq!(best.get("center").unwrap(), 0.5, epsilon = 1e-5);
}
