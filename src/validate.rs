// 该文件是 Yingxi （影析） 项目的一部分。
// src/validate.rs - 矩形框校验
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use tracing::debug;

use crate::detection::{BoundingBox, Detection};

/// 将矩形框约束到 `width x height` 的图像内。
/// 负坐标归零，右下角不超过 `width - 1` / `height - 1`；
/// 约束后面积为零或为负时返回 `None`。
pub fn validate(bbox: BoundingBox, width: u32, height: u32) -> Option<BoundingBox> {
  let max_x = i64::from(width) - 1;
  let max_y = i64::from(height) - 1;

  let clamped = BoundingBox {
    x1: bbox.x1.max(0),
    y1: bbox.y1.max(0),
    x2: bbox.x2.max(0).min(max_x),
    y2: bbox.y2.max(0).min(max_y),
  };

  if clamped.is_degenerate() {
    None
  } else {
    Some(clamped)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
  pub detections: Vec<Detection>,
  /// 约束后退化而被丢弃的数量
  pub degenerate: usize,
}

/// 校验一组检测结果，保持原有顺序
pub fn validate_detections(detections: &[Detection], width: u32, height: u32) -> Validated {
  let mut validated = Validated {
    detections: Vec::with_capacity(detections.len()),
    degenerate: 0,
  };

  for detection in detections {
    match validate(detection.bbox, width, height) {
      Some(bbox) => validated.detections.push(detection.with_bbox(bbox)),
      None => {
        debug!(
          "丢弃退化矩形框 {} {:?} (图像 {}x{})",
          detection.label, detection.bbox, width, height
        );
        validated.degenerate += 1;
      }
    }
  }

  validated
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn in_range_box_is_unchanged() {
    let bbox = BoundingBox::new(10, 10, 50, 50);
    assert_eq!(validate(bbox, 100, 100), Some(bbox));
  }

  #[test]
  fn overflowing_box_is_clamped() {
    assert_eq!(
      validate(BoundingBox::new(90, 90, 150, 150), 100, 100),
      Some(BoundingBox::new(90, 90, 99, 99))
    );
  }

  #[test]
  fn negative_coordinates_clamp_to_zero() {
    assert_eq!(
      validate(BoundingBox::new(-20, -5, 30, 40), 100, 100),
      Some(BoundingBox::new(0, 0, 30, 40))
    );
  }

  #[test]
  fn degenerate_boxes_are_dropped() {
    assert_eq!(validate(BoundingBox::new(5, 5, 5, 5), 100, 100), None);
    assert_eq!(validate(BoundingBox::new(50, 10, 20, 40), 100, 100), None);
    // 完全位于图像之外
    assert_eq!(validate(BoundingBox::new(120, 120, 150, 150), 100, 100), None);
    assert_eq!(validate(BoundingBox::new(-50, -50, -10, -10), 100, 100), None);
    // 约束后恰好退化
    assert_eq!(validate(BoundingBox::new(99, 0, 150, 10), 100, 100), None);
  }

  #[test]
  fn empty_image_drops_everything() {
    assert_eq!(validate(BoundingBox::new(0, 0, 10, 10), 0, 0), None);
    assert_eq!(validate(BoundingBox::new(0, 0, 10, 10), 1, 1), None);
  }

  #[test]
  fn batch_keeps_order_and_counts_drops() {
    let detections = vec![
      Detection::new("A", 0.9, [0, 0, 10, 10]),
      Detection::new("B", 0.9, [5, 5, 5, 5]),
      Detection::new("C", 0.9, [90, 90, 150, 150]),
    ];
    let validated = validate_detections(&detections, 100, 100);
    assert_eq!(validated.degenerate, 1);
    assert_eq!(
      validated.detections,
      vec![
        Detection::new("A", 0.9, [0, 0, 10, 10]),
        Detection::new("C", 0.9, [90, 90, 99, 99]),
      ]
    );
  }
}
