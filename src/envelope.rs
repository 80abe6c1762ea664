// 该文件是 Yingxi （影析） 项目的一部分。
// src/envelope.rs - 推理响应信封
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

/// 传输层响应：状态码、头部与原始正文，正文不做任何解释
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
  pub status_code: u16,
  pub headers: BTreeMap<String, String>,
  pub body: String,
}

impl ResponseEnvelope {
  pub fn new(status_code: u16, body: impl Into<String>) -> Self {
    Self {
      status_code,
      headers: BTreeMap::new(),
      body: body.into(),
    }
  }

  /// 头部名称统一为小写
  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status_code)
  }
}
