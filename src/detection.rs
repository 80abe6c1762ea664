// 该文件是 Yingxi （影析） 项目的一部分。
// src/detection.rs - 检测结果定义
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

use serde::Serialize;

/// 像素坐标系下的矩形框 [x1, y1, x2, y2]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[i64; 4]")]
pub struct BoundingBox {
  pub x1: i64,
  pub y1: i64,
  pub x2: i64,
  pub y2: i64,
}

impl BoundingBox {
  pub const fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> i64 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> i64 {
    self.y2 - self.y1
  }

  /// 宽或高不为正
  pub fn is_degenerate(&self) -> bool {
    self.x1 >= self.x2 || self.y1 >= self.y2
  }
}

impl From<[i64; 4]> for BoundingBox {
  fn from([x1, y1, x2, y2]: [i64; 4]) -> Self {
    Self { x1, y1, x2, y2 }
  }
}

impl From<BoundingBox> for [i64; 4] {
  fn from(bbox: BoundingBox) -> Self {
    [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub label: String,
  pub score: f64,
  #[serde(rename = "box")]
  pub bbox: BoundingBox,
}

impl Detection {
  pub fn new(label: impl Into<String>, score: f64, bbox: impl Into<BoundingBox>) -> Self {
    Self {
      label: label.into(),
      score,
      bbox: bbox.into(),
    }
  }

  /// 标签文本，例如 `Cat (0.90)`
  pub fn caption(&self) -> String {
    format!("{} ({:.2})", self.label, self.score)
  }

  pub fn with_bbox(&self, bbox: BoundingBox) -> Self {
    Self {
      label: self.label.clone(),
      score: self.score,
      bbox,
    }
  }
}

/// 规范化之后的推理结果，检测顺序与推理端一致
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedResult {
  pub detections: Vec<Detection>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub processed_image_url: Option<String>,
}

impl NormalizedResult {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}
