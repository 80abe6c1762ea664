// 该文件是 Yingxi （影析） 项目的一部分。
// src/inference/http_client.rs - HTTP 推理客户端
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

use std::collections::BTreeMap;

use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl,
  envelope::ResponseEnvelope,
  inference::{Infer, InferenceError},
  storage::StorageLocation,
};

const HTTP_SCHEMES: [&str; 2] = ["http", "https"];

/// 向推理端发送一次同步 POST 请求，负载为 `{"bucket", "key"}`。
/// 不重试，不覆盖传输层默认超时；非 2xx 状态码照常返回信封。
pub struct InferenceClient {
  endpoint: Url,
  agent: ureq::Agent,
}

impl FromUrl for InferenceClient {
  type Error = InferenceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !Self::accepts_scheme(url.scheme()) {
      return Err(InferenceError::EndpointError(format!(
        "推理端地址必须使用 http 或 https 方案, 实际为 '{}'",
        url.scheme()
      )));
    }
    if url.host_str().is_none() {
      return Err(InferenceError::EndpointError(format!(
        "推理端地址缺少主机: {}",
        url
      )));
    }
    Ok(InferenceClient::new(url.clone()))
  }
}

impl InferenceClient {
  pub fn new(endpoint: Url) -> Self {
    let config = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .build();
    let agent: ureq::Agent = config.into();
    Self { endpoint, agent }
  }

  pub fn accepts_scheme(scheme: &str) -> bool {
    HTTP_SCHEMES.contains(&scheme)
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }
}

impl Infer for InferenceClient {
  fn infer(&self, location: &StorageLocation) -> Result<ResponseEnvelope, InferenceError> {
    let endpoint = self.endpoint.as_str();
    info!("调用推理端 {}，对象 {}", endpoint, location);

    let mut response = self
      .agent
      .post(endpoint)
      .send_json(location)
      .map_err(|e| {
        error!("推理请求失败: {}", e);
        InferenceError::transport(endpoint, e)
      })?;

    let status_code = response.status().as_u16();
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
      if let Ok(value) = value.to_str() {
        headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
      }
    }

    let bytes = response
      .body_mut()
      .read_to_vec()
      .map_err(|e| InferenceError::transport(endpoint, e))?;
    let body = String::from_utf8_lossy(&bytes).into_owned();

    debug!("推理端响应: 状态码 {}, 正文 {} 字节", status_code, body.len());

    Ok(ResponseEnvelope {
      status_code,
      headers,
      body,
    })
  }
}
