#![allow(dead_code)]

use proptest::prelude::*;
use serde_json::{Value, json};

pub fn proptest_config() -> ProptestConfig {
  ProptestConfig {
    cases: 128,
    failure_persistence: None,
    ..ProptestConfig::default()
  }
}

/// 两位小数的置信度，JSON 往返时不会丢失精度
pub fn score() -> impl Strategy<Value = f64> {
  (0u32..=100).prop_map(|v| v as f64 / 100.0)
}

pub fn label() -> impl Strategy<Value = String> {
  "[A-Za-z][A-Za-z ]{0,11}"
}

pub fn raw_box() -> impl Strategy<Value = [i64; 4]> {
  [-200i64..2000, -200i64..2000, -200i64..2000, -200i64..2000]
}

pub fn detection_json() -> impl Strategy<Value = (String, f64, [i64; 4])> {
  (label(), score(), raw_box())
}

/// 两种载荷形态之一：顶层 `detections` 或 `analysis_results` 包裹
pub fn payload(detections: &[(String, f64, [i64; 4])], nested: bool) -> Value {
  let list: Vec<Value> = detections
    .iter()
    .map(|(label, score, bbox)| json!({"label": label, "score": score, "box": bbox}))
    .collect();
  if nested {
    json!({"analysis_results": {"detections": list}})
  } else {
    json!({"detections": list})
  }
}
