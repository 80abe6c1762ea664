// 该文件是 Yingxi （影析） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::SourceImage,
  output::{Render, draw::Draw, draw_from_url, write_record},
  pipeline::Analysis,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按日期分目录记录每次分析：`<dir>/<YYYY-MM-DD>/<stem>-<HHMMSSmmm>.png/.json`
pub struct DirectoryRecordOutput {
  dir: PathBuf,
  draw: Draw,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      dir: PathBuf::from(url.path()),
      draw: draw_from_url(url),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(dir: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      dir: dir.into(),
      draw,
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn record_stem(&self, source: &SourceImage, now: DateTime<Utc>) -> PathBuf {
    let stem = Path::new(&source.file_name)
      .file_stem()
      .map(|stem| stem.to_string_lossy().replace('.', "_"))
      .filter(|stem| !stem.is_empty())
      .unwrap_or_else(|| "image".to_string());

    self
      .dir
      .join(now.format("%Y-%m-%d").to_string())
      .join(format!("{}-{}", stem, now.format("%H%M%S%3f")))
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, source: &SourceImage, analysis: &Analysis) -> Result<(), Self::Error> {
    let stem = self.record_stem(source, Utc::now());
    if let Some(parent) = stem.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let image_path = stem.with_extension("png");
    let image = self.draw.annotate(&source.image, &analysis.detections);
    image.save(&image_path)?;
    write_record(&stem.with_extension("json"), analysis)?;

    info!("记录分析结果: {}", image_path.display());
    Ok(())
  }
}
