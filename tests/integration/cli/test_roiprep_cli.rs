//! End-to-end runs of the `roiprep` binary.

use std::path::Path;
use std::process::Command;

use image::{Rgb, RgbImage};

fn write_input(dir: &Path) -> std::path::PathBuf {
    let mut img = RgbImage::new(16, 12);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgb([(x * 10) as u8, (y * 20) as u8, 128]);
    }
    let path = dir.join("input.png");
    img.save(&path).unwrap();
    path
}

fn roiprep() -> Command {
    Command::new(env!("CARGO_BIN_EXE_roiprep"))
}

#[test]
fn test_png_output_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("out.png");

    let run = roiprep()
        .args(["--input"])
        .arg(&input)
        .args(["--roi", "4,2,8,8", "--size", "4x4", "--algorithm", "nearest"])
        .args(["--layout", "nhwc", "--precision", "u8", "--repeat", "3", "--report", "json"])
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let img = image::open(&output).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (4, 4));
    // Nearest picks every second pixel of the 8x8 region at (4, 2).
    assert_eq!(img.get_pixel(1, 1), &Rgb([60, 80, 128]));

    let stdout = String::from_utf8_lossy(&run.stdout);
    let json_start = stdout.find('{').unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    let spans = report["spans"].as_array().unwrap();
    let preprocessing = spans.iter().find(|s| s["name"] == "Preprocessing").unwrap();
    assert_eq!(preprocessing["count"], 3);
}

#[test]
fn test_raw_float_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("out.bin");

    let run = roiprep()
        .arg("--input")
        .arg(&input)
        .args(["--size", "8x6", "--layout", "nchw", "--precision", "fp32", "--report", "none"])
        .arg("--output")
        .arg(&output)
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(bytes.len(), 3 * 6 * 8 * 4);
    // Blue plane is uniform.
    let blue = &bytes[2 * 48 * 4..];
    for chunk in blue.chunks_exact(4) {
        assert_eq!(f32::from_le_bytes(chunk.try_into().unwrap()), 128.0);
    }
}

#[test]
fn test_bad_roi_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let run = roiprep()
        .arg("--input")
        .arg(&input)
        .args(["--roi", "10,10,10,10"])
        .output()
        .unwrap();
    assert!(!run.status.success());
    assert!(String::from_utf8_lossy(&run.stderr).contains("out of bounds"));
}
