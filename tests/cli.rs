extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn ifsgen() -> Command {
    Command::cargo_bin("ifsgen").unwrap()
}

#[test]
fn ten_images_of_64_by_64() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data");
    ifsgen()
        .args(&["-o", out.to_str().unwrap(), "-k", "10", "--shape", "64", "64"])
        .assert()
        .success()
        .stdout(predicate::str::contains(out.to_str().unwrap()));

    let expected: Vec<String> = (0..10).map(|i| format!("{:06}.png", i)).collect();
    assert_eq!(listing(&out), expected);
    for name in &expected {
        let image = image::open(out.join(name)).unwrap().to_rgb();
        assert_eq!(image.dimensions(), (64, 64));
    }
}

#[test]
fn naming_does_not_depend_on_worker_count() {
    let dir = tempfile::tempdir().unwrap();
    let serial = dir.path().join("serial");
    let parallel = dir.path().join("parallel");
    for (out, workers) in &[(&serial, "1"), (&parallel, "8")] {
        ifsgen()
            .args(&[
                "-o",
                out.to_str().unwrap(),
                "-k",
                "300",
                "--shape",
                "32",
                "32",
                "--iterations",
                "2000",
                "--seed",
                "5",
                "-j",
                *workers,
            ])
            .assert()
            .success();
    }

    let expected: Vec<String> = (0..300).map(|i| format!("{:06}.png", i)).collect();
    assert_eq!(listing(&serial), expected);
    assert_eq!(listing(&parallel), expected);
    for name in &expected {
        assert_eq!(
            fs::read(serial.join(name)).unwrap(),
            fs::read(parallel.join(name)).unwrap(),
            "{} differs",
            name
        );
    }
}

#[test]
fn non_empty_output_needs_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("stale.txt"), "old").unwrap();
    ifsgen()
        .args(&["-o", dir.path().to_str().unwrap(), "-k", "1", "--shape", "32", "32"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(listing(dir.path()), vec!["stale.txt".to_string()]);

    ifsgen()
        .args(&[
            "-o",
            dir.path().to_str().unwrap(),
            "-k",
            "1",
            "--shape",
            "32",
            "32",
            "--iterations",
            "2000",
            "--overwrite",
        ])
        .assert()
        .success();
    assert_eq!(listing(dir.path()), vec!["000000.png".to_string()]);
}

#[test]
fn only_images_are_supported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data");
    ifsgen()
        .args(&["-o", out.to_str().unwrap(), "-k", "1", "--shape", "32", "32", "-t", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
    assert!(!out.exists());
}

#[test]
fn shape_needs_two_values() {
    let dir = tempfile::tempdir().unwrap();
    ifsgen()
        .args(&["-o", dir.path().to_str().unwrap(), "-k", "1", "--shape", "32"])
        .assert()
        .failure();
}

#[test]
fn threshold_must_be_positive() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data");
    ifsgen()
        .args(&["-o", out.to_str().unwrap(), "-k", "1", "--shape", "32", "32", "--threshold", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than 0"));
    assert!(!out.exists());
}
