use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::Builder;

use occupancy_monitor::config::MonitorConfig;
use occupancy_monitor::Thresholds;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "OCCUPANCY_CONFIG",
        "OCCUPANCY_RESO",
        "OCCUPANCY_CONFIDENCE",
        "OCCUPANCY_NMS_THRESH",
        "OCCUPANCY_MODEL",
        "OCCUPANCY_FRONT_THRESHOLD",
        "OCCUPANCY_BACK_THRESHOLD",
        "OCCUPANCY_OUTPUT_DIR",
        "OCCUPANCY_LABELS",
        "OCCUPANCY_PALETTE",
        "OCCUPANCY_FONT",
        "OCCUPANCY_SEED",
    ] {
        std::env::remove_var(key);
    }
}

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("temp config");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_temp(
        ".json",
        r#"{
            "detector": {
                "input_size": 608,
                "confidence": 0.6,
                "nms_threshold": 0.45,
                "model_path": "models/yolo.onnx"
            },
            "thresholds": { "front": 5, "back": 12 },
            "output": { "dir": "frames" },
            "labels_path": "data/coco.names",
            "seed": 9,
            "tint_alpha": 0.3
        }"#,
    );

    std::env::set_var("OCCUPANCY_CONFIG", file.path());
    std::env::set_var("OCCUPANCY_BACK_THRESHOLD", "20");
    std::env::set_var("OCCUPANCY_OUTPUT_DIR", "/tmp/occupancy-out");

    let cfg = MonitorConfig::load(None).expect("load config");

    assert_eq!(cfg.detector.input_size, 608);
    assert_eq!(cfg.detector.confidence, 0.6);
    assert_eq!(cfg.detector.nms_threshold, 0.45);
    assert_eq!(cfg.model_path, Some(PathBuf::from("models/yolo.onnx")));
    assert_eq!(cfg.thresholds, Thresholds { front: 5, back: 20 });
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/occupancy-out"));
    assert_eq!(cfg.labels_path, Some(PathBuf::from("data/coco.names")));
    assert_eq!(cfg.seed, Some(9));
    assert_eq!(cfg.tint_alpha, 0.3);

    clear_env();
}

#[test]
fn explicit_path_wins_over_env_path_and_accepts_toml() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let ignored = write_temp(".json", r#"{ "thresholds": { "front": 99 } }"#);
    let file = write_temp(
        ".toml",
        r#"
seed = 4

[thresholds]
front = 2

[detector]
input_size = 320
"#,
    );
    std::env::set_var("OCCUPANCY_CONFIG", ignored.path());

    let cfg = MonitorConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.thresholds.front, 2);
    assert_eq!(cfg.thresholds.back, 10);
    assert_eq!(cfg.detector.input_size, 320);
    assert_eq!(cfg.seed, Some(4));

    clear_env();
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load(None).expect("load defaults");
    assert_eq!(cfg.detector.input_size, 416);
    assert_eq!(cfg.thresholds, Thresholds { front: 3, back: 10 });
    assert_eq!(cfg.output_dir, PathBuf::from("output"));
    assert!(cfg.model_path.is_none());
    assert!(cfg.seed.is_none());
}

#[test]
fn rejects_invalid_resolution_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OCCUPANCY_RESO", "400");
    let err = MonitorConfig::load(None).expect_err("400 is not a multiple of 32");
    assert!(err.to_string().contains("multiple of 32"));

    std::env::set_var("OCCUPANCY_RESO", "big");
    let err = MonitorConfig::load(None).expect_err("non-numeric");
    assert!(err.to_string().contains("OCCUPANCY_RESO"));

    clear_env();
}

#[test]
fn rejects_unreadable_or_malformed_files() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    assert!(MonitorConfig::load(Some(std::path::Path::new("/nonexistent/occupancy.json"))).is_err());

    let file = write_temp(".json", "{ not json");
    assert!(MonitorConfig::load(Some(file.path())).is_err());

    let file = write_temp(".json", r#"{ "detector": { "confidence": 2.0 } }"#);
    assert!(MonitorConfig::load(Some(file.path())).is_err());
}
