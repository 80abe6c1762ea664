// 该文件是 Yingxi （影析） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::{debug, info, warn};

use crate::{
  detection::{BoundingBox, Detection},
  output::bitmap_font::BitmapFont,
  validate::validate,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: u32 = 2;
const BOX_STROKE_WIDTH: u32 = 3;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

// 未指定字体时依次尝试的系统字体
const SYSTEM_FONT_CANDIDATES: [&str; 5] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

/// 文本测量能力，排版只依赖它而不依赖具体字体实现
pub trait MeasureText {
  fn measure_text(&self, text: &str) -> (u32, u32);
}

impl MeasureText for BitmapFont {
  fn measure_text(&self, text: &str) -> (u32, u32) {
    self.text_size(text)
  }
}

pub enum LabelFont {
  Scalable { font: FontVec, scale: PxScale },
  Bitmap(BitmapFont),
}

impl LabelFont {
  pub fn bitmap() -> Self {
    LabelFont::Bitmap(BitmapFont::default())
  }

  /// 加载可缩放字体，失败时回退到内置点阵字体
  pub fn from_file_or_bitmap(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    match load_scalable(path) {
      Some(font) => {
        info!("使用字体: {}", path.display());
        font
      }
      None => {
        warn!("无法加载字体 {}，使用内置点阵字体", path.display());
        LabelFont::bitmap()
      }
    }
  }

  /// 在常见的系统字体位置中查找，找不到时使用内置点阵字体
  pub fn discover() -> Self {
    SYSTEM_FONT_CANDIDATES
      .iter()
      .find_map(|candidate| load_scalable(Path::new(candidate)))
      .unwrap_or_else(|| {
        debug!("未找到系统字体，使用内置点阵字体");
        LabelFont::bitmap()
      })
  }

  pub fn is_scalable(&self) -> bool {
    matches!(self, LabelFont::Scalable { .. })
  }

  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    match self {
      LabelFont::Scalable { font, scale } => draw_text_mut(image, color, x, y, *scale, font, text),
      LabelFont::Bitmap(font) => font.draw_text(image, color, x, y, text),
    }
  }
}

impl MeasureText for LabelFont {
  fn measure_text(&self, text: &str) -> (u32, u32) {
    match self {
      LabelFont::Scalable { font, scale } => text_size(*scale, font, text),
      LabelFont::Bitmap(font) => font.measure_text(text),
    }
  }
}

fn load_scalable(path: &Path) -> Option<LabelFont> {
  let data = std::fs::read(path).ok()?;
  match FontVec::try_from_vec(data) {
    Ok(font) => Some(LabelFont::Scalable {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }),
    Err(e) => {
      warn!("字体文件无效 {}: {}", path.display(), e);
      None
    }
  }
}

/// 标签底框的左上角：优先放在矩形框上边沿之外，
/// 放不下（会超出图像顶部）时改为放在框内
pub fn label_origin(bbox: BoundingBox, tag_height: u32) -> (i32, i32) {
  let above = bbox.y1 - i64::from(tag_height);
  let y = if above >= 0 { above } else { bbox.y1 };
  (bbox.x1 as i32, y as i32)
}

pub struct Draw {
  font: LabelFont,
  stroke_width: u32,
  label_padding: u32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Draw::new(LabelFont::discover())
  }
}

impl Draw {
  pub fn new(font: LabelFont) -> Self {
    Self {
      font,
      stroke_width: BOX_STROKE_WIDTH,
      label_padding: LABEL_PADDING,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }

  pub fn with_font_file(path: impl AsRef<Path>) -> Self {
    Draw::new(LabelFont::from_file_or_bitmap(path))
  }

  pub fn font(&self) -> &LabelFont {
    &self.font
  }

  /// 在副本上绘制，原图保持不变
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut annotated = image.clone();
    self.annotate_in_place(&mut annotated, detections);
    annotated
  }

  /// 直接在调用方的图像上绘制。按检测顺序绘制，后绘制的覆盖先绘制的
  pub fn annotate_in_place(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      let Some(bbox) = validate(detection.bbox, image.width(), image.height()) else {
        debug!("跳过退化矩形框: {} {:?}", detection.label, detection.bbox);
        continue;
      };
      self.draw_outline(image, bbox);
      self.draw_label(image, bbox, &detection.caption());
    }
  }

  fn draw_outline(&self, image: &mut RgbImage, bbox: BoundingBox) {
    let width = bbox.width() + 1;
    let height = bbox.height() + 1;

    for inset in 0..i64::from(self.stroke_width) {
      let (w, h) = (width - 2 * inset, height - 2 * inset);
      if w <= 0 || h <= 0 {
        break;
      }
      let rect =
        Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }
  }

  fn draw_label(&self, image: &mut RgbImage, bbox: BoundingBox, caption: &str) {
    let (text_width, text_height) = self.font.measure_text(caption);
    let tag_width = text_width + 2 * self.label_padding;
    let tag_height = text_height + 2 * self.label_padding;

    let (x, y) = label_origin(bbox, tag_height);

    // 不超出图像右边界
    let tag_width = tag_width.min(image.width().saturating_sub(x as u32));
    if tag_width == 0 || tag_height == 0 {
      return;
    }

    let rect = Rect::at(x, y).of_size(tag_width, tag_height);
    draw_filled_rect_mut(image, rect, Rgb(self.box_color));

    let padding = self.label_padding as i32;
    self
      .font
      .draw_text(image, Rgb(self.text_color), x + padding, y + padding, caption);
  }
}
