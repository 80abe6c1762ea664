// 该文件是 Yingxi （影析） 项目的一部分。
// src/inference.rs - 推理端调用
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, envelope::ResponseEnvelope, storage::StorageLocation};

#[cfg(feature = "http_inference")]
mod http_client;
#[cfg(feature = "http_inference")]
pub use self::http_client::InferenceClient;

#[cfg(feature = "stub_inference")]
mod stub_endpoint;
#[cfg(feature = "stub_inference")]
pub use self::stub_endpoint::StubEndpoint;

/// 推理调用：只负责把存储位置发出去并取回原始响应，不解释正文
pub trait Infer {
  fn infer(&self, location: &StorageLocation) -> Result<ResponseEnvelope, InferenceError>;
}

impl<M: Infer + ?Sized> Infer for &M {
  fn infer(&self, location: &StorageLocation) -> Result<ResponseEnvelope, InferenceError> {
    (**self).infer(location)
  }
}

#[derive(Error, Debug)]
pub enum InferenceError {
  /// 请求没有完成（连接失败、超时等），不会自动重试
  #[error("推理请求传输失败 ({endpoint}): {source}")]
  Transport {
    endpoint: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("请求负载序列化失败: {0}")]
  Payload(#[from] serde_json::Error),
  #[error("推理端地址错误: {0}")]
  EndpointError(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl InferenceError {
  pub fn transport<E>(endpoint: &str, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    InferenceError::Transport {
      endpoint: endpoint.to_string(),
      source: Box::new(source),
    }
  }

  pub fn is_transport(&self) -> bool {
    matches!(self, InferenceError::Transport { .. })
  }
}

pub enum InferenceWrapper {
  #[cfg(feature = "http_inference")]
  Http(InferenceClient),
  #[cfg(feature = "stub_inference")]
  Stub(StubEndpoint),
}

impl FromUrl for InferenceWrapper {
  type Error = InferenceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "http_inference")]
    {
      if InferenceClient::accepts_scheme(url.scheme()) {
        return Ok(InferenceWrapper::Http(InferenceClient::from_url(url)?));
      }
    }
    #[cfg(feature = "stub_inference")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == StubEndpoint::SCHEME {
        return Ok(InferenceWrapper::Stub(StubEndpoint::from_url(url)?));
      }
    }
    Err(InferenceError::SchemeMismatch)
  }
}

impl Infer for InferenceWrapper {
  fn infer(&self, location: &StorageLocation) -> Result<ResponseEnvelope, InferenceError> {
    match self {
      #[cfg(feature = "http_inference")]
      InferenceWrapper::Http(client) => client.infer(location),
      #[cfg(feature = "stub_inference")]
      InferenceWrapper::Stub(stub) => stub.infer(location),
      #[cfg(not(any(feature = "http_inference", feature = "stub_inference")))]
      _ => unreachable!("未启用任何推理端功能"),
    }
  }
}
