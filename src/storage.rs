// 该文件是 Yingxi （影析） 项目的一部分。
// src/storage.rs - 图像上传存储
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub(crate) mod directory_store;
pub use self::directory_store::DirectoryStore;

/// 存储位置，序列化结果即推理请求的负载 `{"bucket": ..., "key": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
  pub bucket: String,
  pub key: String,
}

impl StorageLocation {
  pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
    Self {
      bucket: bucket.into(),
      key: key.into(),
    }
  }
}

impl std::fmt::Display for StorageLocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.bucket, self.key)
  }
}

#[derive(Error, Debug)]
pub enum StorageError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("非法的对象键: {0}")]
  InvalidKey(String),
  #[error("缺少存储桶名称")]
  MissingBucket,
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 上传协作者：把字节放到某个键下，返回之后交给推理端的位置
pub trait ObjectStore {
  fn put(&self, bytes: &[u8], key: &str) -> Result<StorageLocation, StorageError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
  fn put(&self, bytes: &[u8], key: &str) -> Result<StorageLocation, StorageError> {
    (**self).put(bytes, key)
  }
}

/// 生成上传键 `uploads/{uuid}.{ext}`，扩展名取自原文件名
pub fn propose_key(file_name: &str) -> String {
  let extension = std::path::Path::new(file_name)
    .extension()
    .and_then(|ext| ext.to_str())
    .filter(|ext| !ext.is_empty())
    .map(str::to_ascii_lowercase)
    .unwrap_or_else(|| "bin".to_string());
  format!("uploads/{}.{}", uuid::Uuid::new_v4(), extension)
}

pub enum StorageWrapper {
  Directory(DirectoryStore),
}

impl FromUrl for StorageWrapper {
  type Error = StorageError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      DirectoryStore::SCHEME => Ok(StorageWrapper::Directory(DirectoryStore::from_url(url)?)),
      other => Err(StorageError::SchemeMismatch(other.to_string())),
    }
  }
}

impl ObjectStore for StorageWrapper {
  fn put(&self, bytes: &[u8], key: &str) -> Result<StorageLocation, StorageError> {
    match self {
      StorageWrapper::Directory(store) => store.put(bytes, key),
    }
  }
}
