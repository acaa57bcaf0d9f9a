//! Directory → session → masked stacks, end to end.

use std::path::Path;

use image::{GrayImage, Luma};
use trapframes::{
    DecodePolicy, Error, SessionBuilder, SessionConfig, TrapSession, TripletRole, exposure_time_ms,
};

fn write_png(dir: &Path, name: &str, size: u32, value: impl Fn(u32, u32) -> u8) {
    GrayImage::from_fn(size, size, |x, y| Luma([value(x, y)]))
        .save(dir.join(name))
        .unwrap();
}

fn write_traps(dir: &Path, json: &str) {
    std::fs::write(dir.join("trap_positions.json"), json).unwrap();
}

/// `captures` triplets at index 250 (2.0 ms); frame value is `10 * capture + role`.
fn acquisition(captures: u32) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for capture in 0..captures {
        for (r, role) in ["first", "second", "third"].iter().enumerate() {
            let name = format!("run_{}us_{role}.acq_250.png", (capture + 1) * 5);
            let value = (10 * capture + r as u32) as u8;
            write_png(dir.path(), &name, 20, |_, _| value);
        }
    }
    write_traps(
        dir.path(),
        r#"{"54": {"x": 10.0, "y": 10.0}, "12": {"x": 4.0, "y": 15.0}}"#,
    );
    dir
}

fn config() -> SessionConfig {
    SessionConfig::default().with_exposure_time_ms(2.0)
}

#[test]
fn exposure_buckets() {
    for i in 0..1000 {
        assert_eq!(exposure_time_ms(i).unwrap(), 2.0);
    }
    for i in 14000..15000 {
        assert_eq!(exposure_time_ms(i).unwrap(), 9.0);
    }
    assert!(matches!(
        exposure_time_ms(15000),
        Err(Error::InvalidIndex { index: 15000 })
    ));
}

#[test]
fn triplets_split_evenly() {
    let dir = acquisition(4);
    let session = TrapSession::open(dir.path(), config()).unwrap();
    let stacks = session.stacks();

    assert_eq!(stacks.all().dim().0, 12);
    assert_eq!(stacks.first().dim().0, 4);
    assert_eq!(stacks.second().dim().0, 4);
    assert_eq!(stacks.third().dim().0, 4);

    // catalog order interleaves the triplets capture by capture
    let roles: Vec<TripletRole> = session.frames().iter().map(|f| f.role).collect();
    assert_eq!(&roles[..3], &[TripletRole::First, TripletRole::Second, TripletRole::Third]);
    let firsts: Vec<u8> = (0..4).map(|i| stacks.first()[[i, 0, 0]]).collect();
    assert_eq!(firsts, vec![0, 10, 20, 30]);
}

#[test]
fn catalog_keeps_only_target_exposure() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "run_1us_first.acq_500.png", 8, |_, _| 1);
    write_png(dir.path(), "run_2us_first.acq_1500.png", 8, |_, _| 2);
    write_png(dir.path(), "run_3us_first.acq_14500.png", 8, |_, _| 3);
    write_traps(dir.path(), r#"{"54": {"x": 4.0, "y": 4.0}}"#);

    let frames = SessionBuilder::new(config().with_tolerance_ms(0.01))
        .catalog(dir.path())
        .unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].index, 500);
}

#[test]
fn mask_block_around_trap() {
    let dir = acquisition(1);
    let session = TrapSession::open(dir.path(), config()).unwrap();
    let masked = session.rebuild_mask(&[54], Some(2.0)).unwrap();

    let mask = masked.mask();
    for row in 0..20 {
        for col in 0..20 {
            let inside = (8..=12).contains(&row) && (8..=12).contains(&col);
            assert_eq!(mask[[row, col]], inside, "pixel ({row}, {col})");
        }
    }
}

#[test]
fn masked_mean_ignores_excluded_pixels() {
    let dir = tempfile::tempdir().unwrap();
    // Inside the 5x5 window around (10, 10) frames hold 1, 2, 3; outside 250.
    for (k, role) in ["first", "second", "third"].iter().enumerate() {
        let name = format!("run_5us_{role}.acq_7.png");
        write_png(dir.path(), &name, 20, |x, y| {
            if (8..=12).contains(&x) && (8..=12).contains(&y) {
                k as u8 + 1
            } else {
                250
            }
        });
    }
    write_traps(dir.path(), r#"{"54": {"x": 10.0, "y": 10.0}}"#);

    let session = TrapSession::open(dir.path(), config()).unwrap();
    let masked = session.rebuild_mask(&[], Some(2.0)).unwrap();
    let all = masked.all();

    assert_eq!(all.frame_count(), 3);
    let excluded = 20 * 20 - all.selected_pixels_per_frame();
    assert_eq!(excluded, 375);
    assert_eq!(all.mean(), Some(2.0));
    assert_eq!(all.frame_means(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(masked.second().mean(), Some(2.0));
}

#[test]
fn rebuilding_masks_is_pure() {
    let dir = acquisition(2);
    let session = TrapSession::open(dir.path(), config()).unwrap();

    let a = session.rebuild_mask(&[54, 12], Some(3.0)).unwrap();
    let b = session.rebuild_mask(&[54, 12], Some(3.0)).unwrap();
    assert_eq!(a.mask(), b.mask());

    let central = session.rebuild_mask(&[54], Some(3.0)).unwrap();
    let side = session.rebuild_mask(&[12], Some(3.0)).unwrap();
    assert_eq!(a.mask(), &(central.mask() | side.mask()));
    assert_ne!(central.all().mean(), None);
}

#[test]
fn undecodable_frame_is_skipped() {
    let dir = acquisition(2);
    std::fs::write(dir.path().join("run_5us_second.acq_250.png"), b"not a png").unwrap();

    let session = TrapSession::open(dir.path(), config()).unwrap();
    assert_eq!(session.frames().len(), 6);
    assert_eq!(session.stacks().all().dim().0, 5);
    assert_eq!(session.stacks().second().dim().0, 1);

    let strict = config().with_decode_policy(DecodePolicy::Abort);
    assert!(matches!(
        TrapSession::open(dir.path(), strict),
        Err(Error::ImageDecode { .. })
    ));
}

#[test]
fn stray_files_are_tolerated() {
    let dir = acquisition(1);
    write_png(dir.path(), "overview.png", 20, |_, _| 0);
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    let session = TrapSession::open(dir.path(), config()).unwrap();
    assert_eq!(session.stacks().all().dim().0, 3);
}

#[test]
fn mismatched_frame_sizes_are_fatal() {
    let dir = acquisition(1);
    write_png(dir.path(), "run_9us_first.acq_251.png", 16, |_, _| 0);

    assert!(matches!(
        TrapSession::open(dir.path(), config()),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn malformed_trap_file_is_fatal() {
    let dir = acquisition(1);
    write_traps(dir.path(), r#"{"54": {"x": 10.0}}"#);

    assert!(matches!(
        TrapSession::open(dir.path(), config()),
        Err(Error::TrapFileFormat { .. })
    ));
}
