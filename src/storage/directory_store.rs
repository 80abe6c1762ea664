// 该文件是 Yingxi （影析） 项目的一部分。
// src/storage/directory_store.rs - 本地目录存储
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

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  storage::{ObjectStore, StorageError, StorageLocation},
};

/// 把对象写入 `<root>/<bucket>/<key>` 的存储，
/// 地址形如 `dir:///var/lib/yingxi?bucket=uploads`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
  root: PathBuf,
  bucket: String,
}

impl FromUrlWithScheme for DirectoryStore {
  const SCHEME: &'static str = "dir";
}

impl FromUrl for DirectoryStore {
  type Error = StorageError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StorageError::SchemeMismatch(format!(
        "期望存储方式 '{}', 实际存储方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let bucket = url
      .query_pairs()
      .find(|(name, _)| name == "bucket")
      .map(|(_, value)| value.into_owned())
      .ok_or(StorageError::MissingBucket)?;

    DirectoryStore::new(url.path(), bucket)
  }
}

impl DirectoryStore {
  pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Result<Self, StorageError> {
    let bucket = bucket.into();
    if bucket.is_empty() || !is_relative_key(&bucket) || bucket.contains('/') {
      return Err(StorageError::MissingBucket);
    }
    Ok(Self {
      root: root.into(),
      bucket,
    })
  }

  pub fn bucket(&self) -> &str {
    &self.bucket
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// 对象在本地文件系统中的路径
  pub fn object_path(&self, location: &StorageLocation) -> Result<PathBuf, StorageError> {
    resolve_object_path(&self.root, location)
  }
}

impl ObjectStore for DirectoryStore {
  fn put(&self, bytes: &[u8], key: &str) -> Result<StorageLocation, StorageError> {
    let location = StorageLocation::new(self.bucket.clone(), key);
    let path = self.object_path(&location)?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;

    debug!("写入 {} 字节到 {}", bytes.len(), path.display());
    info!("上传完成: {}", location);
    Ok(location)
  }
}

/// 解析 `<root>/<bucket>/<key>`，拒绝绝对路径与 `..`
pub(crate) fn resolve_object_path(
  root: &Path,
  location: &StorageLocation,
) -> Result<PathBuf, StorageError> {
  for part in [&location.bucket, &location.key] {
    if part.is_empty() || !is_relative_key(part) {
      return Err(StorageError::InvalidKey(part.clone()));
    }
  }
  Ok(root.join(&location.bucket).join(&location.key))
}

fn is_relative_key(key: &str) -> bool {
  Path::new(key)
    .components()
    .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn put_writes_under_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path(), "images").unwrap();

    let location = store.put(b"payload", "uploads/a.png").unwrap();
    assert_eq!(location, StorageLocation::new("images", "uploads/a.png"));

    let written = std::fs::read(dir.path().join("images/uploads/a.png")).unwrap();
    assert_eq!(written, b"payload");
  }

  #[test]
  fn escaping_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path(), "images").unwrap();

    for key in ["../escape.png", "/etc/passwd", "uploads/../../x", ""] {
      assert!(
        matches!(store.put(b"x", key), Err(StorageError::InvalidKey(_))),
        "key {key:?} should be rejected"
      );
    }
  }

  #[test]
  fn from_url_reads_bucket_query() {
    let url = Url::parse("dir:///tmp/yingxi?bucket=ml-images").unwrap();
    let store = DirectoryStore::from_url(&url).unwrap();
    assert_eq!(store.bucket(), "ml-images");
    assert_eq!(store.root(), Path::new("/tmp/yingxi"));
  }

  #[test]
  fn from_url_requires_bucket() {
    let url = Url::parse("dir:///tmp/yingxi").unwrap();
    assert!(matches!(
      DirectoryStore::from_url(&url),
      Err(StorageError::MissingBucket)
    ));
  }
}
