// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for the `synthetic` subcommand.

use std::{fs::File, io::Write};

use indoc::indoc;
use tempfile::TempDir;

use crate::{get_cmd_output, sdgrid};

#[test]
fn test_synthetic_small_run() {
    #[rustfmt::skip]
    let cmd = sdgrid()
        .args([
            "synthetic",
            "--num-spectra", "300",
            "--num-channels", "16",
            "--width", "24",
            "--height", "24",
            "--num-output-channels", "2",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("sdgrid synthetic"));
    assert!(stdout.contains("Gridded 300 spectra serially"));
    assert!(stdout.contains("weight_sum[0, 0]"));
    assert!(stdout.contains("weight_sum[0, 1]"));
    assert!(stdout.contains("sdgrid synthetic complete."));
}

#[test]
fn test_synthetic_parallel_run() {
    #[rustfmt::skip]
    let cmd = sdgrid()
        .args([
            "synthetic",
            "--num-spectra", "100",
            "--num-channels", "8",
            "--kernel", "gaussian",
            "--support", "2",
            "-j", "2",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Gridded 100 spectra over 2 threads"));
}

#[test]
fn test_synthetic_dry_run() {
    let cmd = sdgrid()
        .args(["synthetic", "--dry-run", "--kernel", "box"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("pillbox kernel"));
    assert!(stdout.contains("Dry run"));
    assert!(!stdout.contains("Gridded"));
}

#[test]
fn test_synthetic_bad_kernel() {
    let cmd = sdgrid()
        .args(["synthetic", "--kernel", "gjinc", "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("gjinc"), "{stderr}");
    assert!(stderr.contains("spheroidal"), "{stderr}");
}

#[test]
fn test_synthetic_zero_width() {
    let cmd = sdgrid()
        .args(["synthetic", "--width", "0", "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("width"), "{stderr}");
}

#[test]
fn test_synthetic_arg_file_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let args_file = tmp_dir.path().join("args.toml");
    let mut f = File::create(&args_file).unwrap();
    f.write_all(
        indoc! {r#"
            [grid]
            kernel = "hanning"
            support = 2
            width = 20
            height = 16

            [synthetic]
            num_spectra = 50
            num_channels = 4
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let saved = tmp_dir.path().join("saved.toml");
    let cmd = sdgrid()
        .arg("synthetic")
        .arg(&args_file)
        .arg("--height")
        .arg("18")
        .arg("--save-toml")
        .arg(&saved)
        .arg("--no-progress-bars")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("hanning kernel, support 2"));
    assert!(stdout.contains("20x18 grid"));
    assert!(stdout.contains("Gridded 50 spectra"));

    // The saved file reproduces the run.
    let saved_contents = std::fs::read_to_string(&saved).unwrap();
    assert!(saved_contents.contains("hanning"), "{saved_contents}");
    assert!(saved_contents.contains("height = 18"), "{saved_contents}");
    let cmd = sdgrid()
        .arg("synthetic")
        .arg(&saved)
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("20x18 grid"));
}

#[test]
fn test_synthetic_bad_arg_file_extension() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let args_file = tmp_dir.path().join("args.yaml");
    File::create(&args_file).unwrap();

    let cmd = sdgrid()
        .arg("synthetic")
        .arg(&args_file)
        .arg("--no-progress-bars")
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("recognised file extension"), "{stderr}");
    assert!(stderr.contains("toml, json"), "{stderr}");
}
