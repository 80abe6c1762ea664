// 该文件是 Yingxi （影析） 项目的一部分。
// src/inference/stub_endpoint.rs - 本地桩推理端
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

//! 行为与线上的函数计算桩一致：从存储目录中读取图像尺寸，
//! 生成 0 到 3 个随机矩形框，并按网关代理的格式包装返回。
//! 用于离线演示与端到端测试，不做任何真实检测。

use std::path::PathBuf;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  envelope::ResponseEnvelope,
  inference::{Infer, InferenceError},
  storage::{StorageLocation, directory_store::resolve_object_path},
};

const STUB_LABELS: [&str; 6] = ["Cat", "Dog", "Car", "Bicycle", "Person", "Tree"];
const STUB_MAX_DETECTIONS: u32 = 3;
const STUB_MIN_BOX_SIZE: u32 = 50;
const STUB_SCORE_RANGE: (f64, f64) = (0.5, 0.99);

/// 地址形如 `stub:///var/lib/yingxi?seed=42&wrap=false`，
/// 根目录与 [`DirectoryStore`](crate::storage::DirectoryStore) 的根目录相同
#[derive(Debug, Clone)]
pub struct StubEndpoint {
  root: PathBuf,
  seed: Option<u64>,
  wrap: bool,
}

impl FromUrlWithScheme for StubEndpoint {
  const SCHEME: &'static str = "stub";
}

impl FromUrl for StubEndpoint {
  type Error = InferenceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InferenceError::SchemeMismatch);
    }

    let mut stub = StubEndpoint::new(url.path());
    for (name, value) in url.query_pairs() {
      match name.as_ref() {
        "seed" => {
          let seed = value
            .parse()
            .map_err(|_| InferenceError::EndpointError(format!("无效的随机种子: {}", value)))?;
          stub.seed = Some(seed);
        }
        "wrap" => {
          stub.wrap = value
            .parse()
            .map_err(|_| InferenceError::EndpointError(format!("无效的 wrap 参数: {}", value)))?;
        }
        other => warn!("忽略未知的桩推理端参数: {}", other),
      }
    }
    Ok(stub)
  }
}

impl StubEndpoint {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      seed: None,
      wrap: true,
    }
  }

  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// 是否按网关代理格式把结果包进 `body` 字符串
  pub fn with_wrap(mut self, wrap: bool) -> Self {
    self.wrap = wrap;
    self
  }

  fn rng(&self) -> StdRng {
    match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    }
  }

  fn handle(&self, location: &StorageLocation) -> (u16, Value) {
    if location.bucket.is_empty() || location.key.is_empty() {
      return (
        400,
        json!({"error": "Missing S3 bucket or key in request body."}),
      );
    }

    let path = match resolve_object_path(&self.root, location) {
      Ok(path) => path,
      Err(e) => return (400, json!({"error": e.to_string()})),
    };
    if !path.is_file() {
      warn!("对象不存在: {}", path.display());
      return (404, json!({"error": "Image not found in S3."}));
    }

    let (width, height) = match image::image_dimensions(&path) {
      Ok(dimensions) => dimensions,
      Err(e) => {
        warn!("读取图像失败: {}", e);
        return (
          500,
          json!({"error": format!("Internal server error: {}", e)}),
        );
      }
    };
    debug!("桩推理端读取图像 {} ({}x{})", location, width, height);

    let detections = random_detections(&mut self.rng(), width, height);
    info!("桩推理端生成 {} 个检测结果", detections.len());
    (200, json!({"detections": detections}))
  }
}

impl Infer for StubEndpoint {
  fn infer(&self, location: &StorageLocation) -> Result<ResponseEnvelope, InferenceError> {
    let (status_code, payload) = self.handle(location);

    // 包装模式模拟不转换状态码的网关：传输层恒为 200，函数状态留在包装层
    let (transport_status, body) = if self.wrap {
      let body = serde_json::to_string(&json!({
        "statusCode": status_code,
        "headers": {"Content-Type": "application/json"},
        "body": serde_json::to_string(&payload)?,
      }))?;
      (200, body)
    } else {
      (status_code, serde_json::to_string(&payload)?)
    };

    Ok(ResponseEnvelope::new(transport_status, body).with_header("Content-Type", "application/json"))
  }
}

fn random_detections<R: Rng>(rng: &mut R, width: u32, height: u32) -> Vec<Value> {
  if width < 2 || height < 2 {
    return Vec::new();
  }

  let count = rng.gen_range(0..=STUB_MAX_DETECTIONS);
  (0..count)
    .map(|_| {
      let x1 = rng.gen_range(0..=width / 2);
      let y1 = rng.gen_range(0..=height / 2);
      let x2 = rng.gen_range((x1 + STUB_MIN_BOX_SIZE).min(width)..=width);
      let y2 = rng.gen_range((y1 + STUB_MIN_BOX_SIZE).min(height)..=height);

      let x2 = x2.min(width - 1);
      let y2 = y2.min(height - 1);

      let label = STUB_LABELS.choose(rng).copied().unwrap_or(STUB_LABELS[0]);
      let score = rng.gen_range(STUB_SCORE_RANGE.0..=STUB_SCORE_RANGE.1);
      let score = (score * 100.0).round() / 100.0;

      json!({
        "label": label,
        "score": score,
        "box": [x1, y1, x2, y2],
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn random_boxes_stay_inside_image() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
      for det in random_detections(&mut rng, 120, 80) {
        let coords: Vec<i64> = det["box"]
          .as_array()
          .unwrap()
          .iter()
          .map(|v| v.as_i64().unwrap())
          .collect();
        assert!(coords[0] >= 0 && coords[2] <= 119);
        assert!(coords[1] >= 0 && coords[3] <= 79);
        let score = det["score"].as_f64().unwrap();
        assert!((0.5..=0.99).contains(&score));
        assert!(STUB_LABELS.contains(&det["label"].as_str().unwrap()));
      }
    }
  }

  #[test]
  fn tiny_images_get_no_boxes() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(random_detections(&mut rng, 1, 100).is_empty());
  }

  #[test]
  fn missing_key_is_bad_request() {
    let stub = StubEndpoint::new("/nonexistent");
    let envelope = stub.infer(&StorageLocation::new("bucket", "")).unwrap();
    assert_eq!(envelope.status_code, 200);
    let outer: Value = serde_json::from_str(&envelope.body).unwrap();
    assert_eq!(outer["statusCode"], 400);

    let envelope = stub
      .with_wrap(false)
      .infer(&StorageLocation::new("bucket", ""))
      .unwrap();
    assert_eq!(envelope.status_code, 400);
  }

  #[test]
  fn missing_object_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubEndpoint::new(dir.path()).with_wrap(false);
    let envelope = stub
      .infer(&StorageLocation::new("bucket", "uploads/none.png"))
      .unwrap();
    assert_eq!(envelope.status_code, 404);
    assert_eq!(envelope.body, r#"{"error":"Image not found in S3."}"#);
  }

  #[test]
  fn from_url_parses_query() {
    let url = Url::parse("stub:///srv/data?seed=42&wrap=false").unwrap();
    let stub = StubEndpoint::from_url(&url).unwrap();
    assert_eq!(stub.seed, Some(42));
    assert!(!stub.wrap);
    assert_eq!(stub.root, PathBuf::from("/srv/data"));

    let bad = Url::parse("stub:///srv/data?seed=abc").unwrap();
    assert!(StubEndpoint::from_url(&bad).is_err());
  }
}
