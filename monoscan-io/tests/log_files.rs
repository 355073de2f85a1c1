//! Logs written by one scan and read back by another session.

use monoscan_core::{Average, MonoidValue, Position};
use monoscan_io::{LogFileNamer, LogFormat, ScanLogReader, ScanLogWriter};
use tempfile::tempdir;

fn grid() -> Vec<(Position, MonoidValue)> {
    let mut points = Vec::new();
    for (i, theta) in [0.0, 0.5].into_iter().enumerate() {
        for (j, phi) in [10.0, 20.0].into_iter().enumerate() {
            let position = Position::single("theta", theta).with("phi", phi);
            let total = (i * 2 + j + 1) as f64;
            points.push((position, MonoidValue::from(Average::with_count(total * 3.0, 3.0))));
        }
    }
    points
}

#[test]
fn named_jsonl_log_restores_the_scan() {
    let dir = tempdir().unwrap();
    let namer = LogFileNamer::new(dir.path(), "sans2d").with_extension("jsonl");
    let path = namer.next_path();
    let axes = vec!["theta".to_string(), "phi".to_string()];

    {
        let mut writer = ScanLogWriter::create(&path, &axes).unwrap();
        for (index, (position, value)) in grid().iter().enumerate() {
            writer.write_point(index, position, value).unwrap();
        }
        assert_eq!(writer.records(), 4);
    }
    assert_ne!(namer.next_path(), path);

    let reader = ScanLogReader::open(&path).unwrap();
    assert_eq!(reader.format(), LogFormat::JsonLines);
    let series = reader.read_series().unwrap();
    assert_eq!(series.axes(), axes);

    let expected = grid();
    assert_eq!(series.len(), expected.len());
    for (point, (position, value)) in series.iter().zip(&expected) {
        assert_eq!(&point.position, position);
        assert_eq!(&point.value, value);
    }
}

#[test]
fn csv_log_keeps_scalar_view() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.csv");
    let axes = vec!["theta".to_string(), "phi".to_string()];
    {
        let mut writer = ScanLogWriter::create(&path, &axes).unwrap();
        for (index, (position, value)) in grid().iter().enumerate() {
            writer.write_point(index, position, value).unwrap();
        }
    }

    let series = ScanLogReader::open(&path).unwrap().read_series().unwrap();
    let values: Vec<f64> = series.iter().filter_map(|p| p.value.value()).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(series.points()[3].position.get("phi"), Some(20.0));
}

#[test]
fn missing_log_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = ScanLogReader::open(dir.path().join("absent.jsonl")).err().unwrap();
    assert!(matches!(err, monoscan_io::Error::Io(_)));
}
