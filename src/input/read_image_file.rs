// 该文件是 Yingxi （影析） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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
  collections::VecDeque,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::SourceImage};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误 ({0}): {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("图像解码错误 ({0}): {1}")]
  ImageLoadError(PathBuf, image::ImageError),
  #[error("目录中没有可用的图像: {0}")]
  EmptyDirectory(PathBuf),
}

/// 地址形如 `image:///path/cat.jpg` 或 `image:///path/dir`，
/// 目录按文件名顺序逐个产出其中的 jpg/png 图像
pub struct ImageFileInput {
  pending: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    ImageFileInput::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let metadata =
      std::fs::metadata(path).map_err(|e| ImageFileInputError::IoError(path.to_path_buf(), e))?;

    let pending = if metadata.is_dir() {
      let files = list_images(path)?;
      if files.is_empty() {
        return Err(ImageFileInputError::EmptyDirectory(path.to_path_buf()));
      }
      debug!("目录 {} 中共有 {} 张图像", path.display(), files.len());
      files.into()
    } else {
      VecDeque::from([path.to_path_buf()])
    };

    Ok(ImageFileInput { pending })
  }

  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<SourceImage, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.pending.pop_front().map(|path| read_source_image(&path))
  }
}

fn read_source_image(path: &Path) -> Result<SourceImage, ImageFileInputError> {
  let bytes = std::fs::read(path).map_err(|e| ImageFileInputError::IoError(path.to_path_buf(), e))?;
  let file_name = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  let source = SourceImage::from_bytes(file_name, bytes)
    .map_err(|e| ImageFileInputError::ImageLoadError(path.to_path_buf(), e))?;
  debug!(
    "读取图像 {} ({}x{}, {} 字节)",
    path.display(),
    source.width(),
    source.height(),
    source.bytes.len()
  );
  Ok(source)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, ImageFileInputError> {
  let entries =
    std::fs::read_dir(dir).map_err(|e| ImageFileInputError::IoError(dir.to_path_buf(), e))?;

  let mut files = Vec::new();
  for entry in entries {
    let path = entry
      .map_err(|e| ImageFileInputError::IoError(dir.to_path_buf(), e))?
      .path();
    if path.is_file() && is_supported(&path) {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

fn is_supported(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}
