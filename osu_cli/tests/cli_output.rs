use std::{
    env,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures").join(name)
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("osu_cli_{label}_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn decode_writes_beatmap_and_skin_json() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");
    let output_path = scratch_dir("decode").join("out.json");

    let out = Command::new(exe)
        .args([
            "decode",
            fixture("standard_v14.osu").to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let json = fs::read_to_string(&output_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["beatmap"]["metadata"]["title"], "Crimson Lane");
    assert_eq!(v["beatmap"]["format_version"], 14);
    assert!(v["skin"]["combo_colours"].as_array().is_some());
}

#[test]
fn decode_no_offsets_keeps_written_times() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");
    let dir = scratch_dir("decode_offsets");
    let shifted = dir.join("shifted.json");
    let raw = dir.join("raw.json");
    let input = fixture("old_v3.osu");

    for (path, extra) in [(&shifted, None), (&raw, Some("--no-offsets"))] {
        let mut cmd = Command::new(exe);
        cmd.args(["decode", input.to_str().unwrap(), "-o", path.to_str().unwrap()]);
        if let Some(flag) = extra {
            cmd.arg(flag);
        }
        assert!(cmd.output().unwrap().status.success());
    }

    let shifted: serde_json::Value = serde_json::from_str(&fs::read_to_string(&shifted).unwrap()).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&raw).unwrap()).unwrap();
    assert_eq!(shifted["beatmap"]["hit_objects"][0]["time"], 1024.0);
    assert_eq!(raw["beatmap"]["hit_objects"][0]["time"], 1000.0);
}

#[test]
fn reencode_output_starts_with_version_header() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");
    let output_path = scratch_dir("reencode").join("out.osu");

    let out = Command::new(exe)
        .args([
            "reencode",
            fixture("mania_v14.osu").to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let text = fs::read_to_string(&output_path).unwrap();
    assert!(text.starts_with("osu file format v14\n"));
    assert!(text.contains("\n[HitObjects]\n"));
    assert!(text.contains("192,192,300,128,0,900:0:0:0:0:\n"));
}

#[test]
fn verify_reports_each_fixture() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let out = Command::new(exe)
        .args([
            "verify",
            fixture("standard_v14.osu").to_str().unwrap(),
            fixture("taiko_v9.osu").to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    assert_eq!(stdout.lines().filter(|l| l.starts_with("ok ")).count(), 2);
    assert!(stdout.contains("(v9, "));
}

#[test]
fn decode_error_output_format_is_stable() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");
    let input = scratch_dir("decode_error").join("bad.osu");
    fs::write(&input, "osu file format v14\n\n[Difficulty]\nCircleSize:huge\n").unwrap();

    let out = Command::new(exe)
        .args(["decode", input.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: decode failed: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains(
        "E2002: invalid number 'huge' (field=CircleSize, context=CircleSize:huge) (line 4)"
    ));
}

#[test]
fn verify_missing_file_fails_with_exit_code_1() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");
    let missing = env::temp_dir().join(format!("osu_cli_missing_{}.osu", std::process::id()));
    let _ = fs::remove_file(&missing);

    let out = Command::new(exe)
        .args(["verify", missing.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("FAIL "));
    assert!(stderr.contains("failed to read beatmap:"));
    assert!(stderr.contains("1 of 1 beatmaps are not round-trip stable"));
}

#[test]
fn help_lists_subcommands() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let output = Command::new(exe).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    assert!(stdout.contains("decode"));
    assert!(stdout.contains("reencode"));
    assert!(stdout.contains("verify"));
}
