use std::{fs, path::Path};

use anyhow::{bail, Context};
use beatmap_schema::Beatmap;
use osu_codec::{DecodeOptions, DecodedBeatmap};
use serde_json::Value;
use tracing::debug;

/// Summary of a successful decode → encode → decode cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub format_version: u32,
    pub control_point_groups: usize,
    pub hit_objects: usize,
    pub encoded_bytes: usize,
}

/// Puts a decoded model into the form both sides of a comparison share.
///
/// Groups are ordered by time and each group's members are keyed, and thus
/// ordered, by kind name.
pub fn canonicalize(beatmap: &mut Beatmap) {
    beatmap.control_points.sort();
}

pub fn canonical_json(decoded: &DecodedBeatmap) -> anyhow::Result<Value> {
    let mut beatmap = decoded.beatmap.clone();
    canonicalize(&mut beatmap);
    let beatmap = serde_json::to_value(&beatmap).context("failed to serialize beatmap")?;
    let skin = serde_json::to_value(&decoded.skin).context("failed to serialize skin")?;
    Ok(serde_json::json!({ "beatmap": beatmap, "skin": skin }))
}

/// JSON path of the first value that differs between `left` and `right`.
pub fn first_difference(left: &Value, right: &Value) -> Option<String> {
    diff_at(left, right, "$".to_string())
}

fn diff_at(left: &Value, right: &Value, path: String) -> Option<String> {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, value) in a {
                let child = format!("{path}.{key}");
                match b.get(key) {
                    Some(other) => {
                        if let Some(found) = diff_at(value, other, child) {
                            return Some(found);
                        }
                    }
                    None => return Some(child),
                }
            }
            b.keys()
                .find(|key| !a.contains_key(*key))
                .map(|key| format!("{path}.{key}"))
        }
        (Value::Array(a), Value::Array(b)) => {
            for (i, (x, y)) in a.iter().zip(b).enumerate() {
                if let Some(found) = diff_at(x, y, format!("{path}[{i}]")) {
                    return Some(found);
                }
            }
            (a.len() != b.len()).then(|| format!("{path}[{}]", a.len().min(b.len())))
        }
        _ => (left != right).then_some(path),
    }
}

fn value_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let pointer: String = path
        .trim_start_matches('$')
        .replace('[', ".")
        .replace(']', "")
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| format!("/{s}"))
        .collect();
    root.pointer(&pointer)
}

/// Decodes `bytes` without early-version offsets, re-encodes and decodes
/// again; both models and skins must match after canonicalization.
pub fn check_round_trip(bytes: &[u8]) -> anyhow::Result<RoundTripReport> {
    let options = DecodeOptions {
        apply_offsets: false,
    };
    let first = osu_codec::decode_with_skin(bytes, options).context("failed to decode input")?;
    let encoded = osu_codec::encode(&first.beatmap, &first.skin).context("failed to encode beatmap")?;
    let second = osu_codec::decode_with_skin(encoded.as_slice(), options)
        .context("failed to decode re-encoded beatmap")?;

    let left = canonical_json(&first)?;
    let right = canonical_json(&second)?;
    if let Some(path) = first_difference(&left, &right) {
        let show = |v: &Value| value_at(v, &path).map_or("<missing>".to_string(), Value::to_string);
        bail!(
            "round trip changed {path}: {} != {}",
            show(&left),
            show(&right)
        );
    }

    let report = RoundTripReport {
        format_version: first.beatmap.format_version,
        control_point_groups: first.beatmap.control_points.groups.len(),
        hit_objects: first.beatmap.hit_objects.len(),
        encoded_bytes: encoded.len(),
    };
    debug!(?report, "round trip stable");
    Ok(report)
}

pub fn check_file(path: impl AsRef<Path>) -> anyhow::Result<RoundTripReport> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read beatmap: {}", path.display()))?;
    check_round_trip(&bytes).with_context(|| format!("round trip failed: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn fixtures() -> Vec<PathBuf> {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures");
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("osu"))
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn all_fixtures_are_round_trip_stable() {
        let paths = fixtures();
        assert!(!paths.is_empty());
        for path in paths {
            let report = check_file(&path).unwrap();
            assert!(report.encoded_bytes > 0, "{}", path.display());
        }
    }

    #[test]
    fn report_describes_first_decode() {
        let src = "osu file format v12\n[TimingPoints]\n0,500,4,1,0,100,1,0\n500,-50,4,1,0,100,0,0\n[HitObjects]\n1,1,0,1,0\n";
        let report = check_round_trip(src.as_bytes()).unwrap();
        assert_eq!(report.format_version, 12);
        assert_eq!(report.control_point_groups, 2);
        assert_eq!(report.hit_objects, 1);
    }

    #[test]
    fn first_difference_points_at_changed_leaf() {
        let a = json!({ "beatmap": { "groups": [ { "time": 0 }, { "time": 1 } ] }, "skin": {} });
        let b = json!({ "beatmap": { "groups": [ { "time": 0 }, { "time": 2 } ] }, "skin": {} });
        assert_eq!(first_difference(&a, &b).as_deref(), Some("$.beatmap.groups[1].time"));
        assert_eq!(value_at(&a, "$.beatmap.groups[1].time"), Some(&json!(1)));
        assert_eq!(first_difference(&a, &a), None);

        let shorter = json!({ "beatmap": { "groups": [ { "time": 0 } ] }, "skin": {} });
        assert_eq!(first_difference(&a, &shorter).as_deref(), Some("$.beatmap.groups[1]"));

        let extra = json!({ "beatmap": { "groups": [ { "time": 0 }, { "time": 1 } ] }, "skin": {}, "x": 1 });
        assert_eq!(first_difference(&a, &extra).as_deref(), Some("$.x"));
    }

    #[test]
    fn invalid_input_reports_decode_context() {
        let err = check_round_trip(b"not a beatmap\n").unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("failed to decode input"));
        assert!(chain.contains("E1002"));
    }

    #[test]
    fn canonicalize_orders_groups_by_time() {
        let mut beatmap = osu_codec::decode_str(
            "osu file format v14\n[TimingPoints]\n0,500,4,1,0,100,1,0\n",
        )
        .unwrap();
        let group = beatmap.control_points.groups[0].clone();
        let mut later = group.clone();
        later.time = 2000.0;
        beatmap.control_points.groups.insert(0, later);
        canonicalize(&mut beatmap);
        assert_eq!(beatmap.control_points.groups[0].time, 0.0);
        assert_eq!(beatmap.control_points.groups[1].time, 2000.0);
    }
}
