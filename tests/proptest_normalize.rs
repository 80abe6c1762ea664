use proptest::prelude::*;
use serde_json::json;

use yingxi::{
  detection::{BoundingBox, Detection},
  normalize::{NormalizeOutcome, normalize_body},
  validate::validate,
};

mod proptest_helpers;
use proptest_helpers::{detection_json, payload, proptest_config, raw_box};

proptest! {
  #![proptest_config(proptest_config())]

  #[test]
  fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
    let body = String::from_utf8_lossy(&bytes);
    let normalized = normalize_body(&body);
    if serde_json::from_str::<serde_json::Value>(&body).is_err() {
      prop_assert!(normalized.result.is_empty());
      prop_assert_eq!(normalized.report.outcome, NormalizeOutcome::ParseError);
    }
  }

  #[test]
  fn wrapped_body_decodes_like_inner_body(
    detections in proptest::collection::vec(detection_json(), 0..6),
    nested in any::<bool>(),
  ) {
    let inner = payload(&detections, nested).to_string();
    let wrapped = json!({"statusCode": 200, "body": inner}).to_string();

    let direct = normalize_body(&inner);
    let unwrapped = normalize_body(&wrapped);
    prop_assert!(unwrapped.report.unwrapped_body);
    prop_assert_eq!(direct.result, unwrapped.result);
  }

  #[test]
  fn decoding_preserves_count_and_order(
    detections in proptest::collection::vec(detection_json(), 0..8),
    nested in any::<bool>(),
  ) {
    let body = payload(&detections, nested).to_string();
    let normalized = normalize_body(&body);

    let expected: Vec<Detection> = detections
      .iter()
      .map(|(label, score, bbox)| Detection::new(label.clone(), *score, *bbox))
      .collect();
    prop_assert_eq!(normalized.result.detections, expected);
    prop_assert_eq!(normalized.report.malformed, 0);
  }

  #[test]
  fn validated_boxes_lie_within_image(
    bbox in raw_box(),
    width in 1u32..500,
    height in 1u32..500,
  ) {
    let bbox = BoundingBox::from(bbox);
    if let Some(valid) = validate(bbox, width, height) {
      prop_assert!(0 <= valid.x1 && valid.x1 < valid.x2);
      prop_assert!(0 <= valid.y1 && valid.y1 < valid.y2);
      prop_assert!(valid.x2 <= i64::from(width) - 1);
      prop_assert!(valid.y2 <= i64::from(height) - 1);
    }
  }

  #[test]
  fn in_range_boxes_are_unchanged(
    x1 in 0i64..200,
    y1 in 0i64..200,
    dx in 1i64..200,
    dy in 1i64..200,
    margin_x in 0u32..50,
    margin_y in 0u32..50,
  ) {
    let bbox = BoundingBox::new(x1, y1, x1 + dx, y1 + dy);
    let width = (x1 + dx) as u32 + 1 + margin_x;
    let height = (y1 + dy) as u32 + 1 + margin_y;
    prop_assert_eq!(validate(bbox, width, height), Some(bbox));
  }

  #[test]
  fn degenerate_boxes_are_dropped(x in 0i64..100, y in 0i64..100, w in 1u32..200, h in 1u32..200) {
    prop_assert_eq!(validate(BoundingBox::new(x, y, x, y), w, h), None);
  }
}
