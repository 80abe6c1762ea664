// 该文件是 Yingxi （影析） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::SourceImage,
  output::{Render, draw::Draw, draw_from_url, write_record},
  pipeline::Analysis,
};

/// 地址形如 `image:///out/cat.png?font=/path/font.ttf`，
/// 同时写出同名的 `.json` 检测记录。
/// 第 n 次（n >= 1）写出时文件名追加序号：`cat-1.png`、`cat-2.png`……
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
  rendered: AtomicUsize,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput::new(uri.path(), draw_from_url(uri)))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      path: path.into(),
      draw,
      rendered: AtomicUsize::new(0),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn record_path(&self) -> PathBuf {
    self.path.with_extension("json")
  }

  /// 第 `index` 次写出的图像路径，首次即为配置的路径
  pub fn image_path(&self, index: usize) -> PathBuf {
    if index == 0 {
      return self.path.clone();
    }
    let stem = self
      .path
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
      None => format!("{}-{}", stem, index),
    };
    self.path.with_file_name(name)
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, source: &SourceImage, analysis: &Analysis) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    if analysis.is_unavailable() {
      warn!("{}: 分析不可用，保存原图", source.file_name);
    }
    let index = self.rendered.fetch_add(1, Ordering::Relaxed);
    let path = self.image_path(index);
    if index > 0 {
      warn!("输出路径已写过 {} 次，改写到 {}", index, path.display());
    }

    let image = self.draw.annotate(&source.image, &analysis.detections);
    image.save(&path)?;
    write_record(&path.with_extension("json"), analysis)?;

    info!("保存图像到文件: {}", path.display());
    Ok(())
  }
}
