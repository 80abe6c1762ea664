// 该文件是 Yingxi （影析） 项目的一部分。
// src/pipeline.rs - 上传、推理、规范化与校验流水线
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

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  detection::Detection,
  envelope::ResponseEnvelope,
  inference::{Infer, InferenceError},
  input::SourceImage,
  normalize::{NormalizeReport, normalize},
  storage::{ObjectStore, StorageError, StorageLocation, propose_key},
  validate::validate_detections,
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("上传失败: {0}")]
  Storage(#[from] StorageError),
  #[error(transparent)]
  Inference(#[from] InferenceError),
}

/// 推理端返回了非 2xx 状态码；不影响解析，但本次请求视为失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("推理端返回错误状态 {}: {}", .status_code, .message.as_deref().unwrap_or("推理端未提供错误信息"))]
pub struct HttpStatusError {
  pub status_code: u16,
  pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
  Completed,
  Failed {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
  },
  /// 推理调用本身没有完成，只能展示原图
  Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
  #[serde(flatten)]
  pub normalize: NormalizeReport,
  /// 约束到图像范围后退化而被丢弃的矩形框数量
  pub degenerate: usize,
}

/// 一次分析的完整结果，供渲染与展示使用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
  pub source: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<StorageLocation>,
  pub status: AnalysisStatus,
  pub detections: Vec<Detection>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub processed_image_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub diagnostics: Option<Diagnostics>,
}

impl Analysis {
  /// 由响应信封得到分析结果：规范化、按图像尺寸校验，并附上状态码信号
  pub fn from_envelope(
    source: impl Into<String>,
    location: Option<StorageLocation>,
    envelope: &ResponseEnvelope,
    width: u32,
    height: u32,
  ) -> Self {
    let normalized = normalize(envelope);
    let validated = validate_detections(&normalized.result.detections, width, height);

    // 传输层 2xx 时，网关可能把函数自身的错误状态留在包装层
    let failed_status = if !envelope.is_success() {
      Some(envelope.status_code)
    } else if normalized.report.wrapped_status_failed() {
      normalized.report.wrapped_status_code
    } else {
      None
    };
    let status = match failed_status {
      Some(status_code) => AnalysisStatus::Failed {
        status_code,
        message: normalized.report.diagnostic_message.clone(),
      },
      None => AnalysisStatus::Completed,
    };

    Analysis {
      source: source.into(),
      location,
      status,
      detections: validated.detections,
      processed_image_url: normalized.result.processed_image_url,
      diagnostics: Some(Diagnostics {
        normalize: normalized.report,
        degenerate: validated.degenerate,
      }),
    }
  }

  pub fn unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
    Analysis {
      source: source.into(),
      location: None,
      status: AnalysisStatus::Unavailable {
        reason: reason.into(),
      },
      detections: Vec::new(),
      processed_image_url: None,
      diagnostics: None,
    }
  }

  pub fn is_completed(&self) -> bool {
    self.status == AnalysisStatus::Completed
  }

  pub fn is_unavailable(&self) -> bool {
    matches!(self.status, AnalysisStatus::Unavailable { .. })
  }

  pub fn http_status_error(&self) -> Option<HttpStatusError> {
    match &self.status {
      AnalysisStatus::Failed {
        status_code,
        message,
      } => Some(HttpStatusError {
        status_code: *status_code,
        message: message.clone(),
      }),
      _ => None,
    }
  }
}

/// 单张图像依次经过：上传、推理、规范化、校验。不重试，不并发
pub struct Pipeline<S, M> {
  store: S,
  inference: M,
}

impl<S: ObjectStore, M: Infer> Pipeline<S, M> {
  pub fn new(store: S, inference: M) -> Self {
    Self { store, inference }
  }

  pub fn analyze(&self, source: &SourceImage) -> Result<Analysis, PipelineError> {
    let key = propose_key(&source.file_name);
    let location = self.store.put(&source.bytes, &key)?;
    let envelope = self.inference.infer(&location)?;

    let analysis = Analysis::from_envelope(
      source.file_name.clone(),
      Some(location),
      &envelope,
      source.width(),
      source.height(),
    );

    if let Some(e) = analysis.http_status_error() {
      warn!("{}: {}", source.file_name, e);
    }
    info!(
      "{}: 得到 {} 个有效检测结果",
      source.file_name,
      analysis.detections.len()
    );
    Ok(analysis)
  }

  /// 传输或上传失败时退化为“分析不可用”，原图仍可展示
  pub fn analyze_or_unavailable(&self, source: &SourceImage) -> Analysis {
    match self.analyze(source) {
      Ok(analysis) => analysis,
      Err(e) => {
        tracing::error!("{}: 分析不可用: {}", source.file_name, e);
        Analysis::unavailable(source.file_name.clone(), e.to_string())
      }
    }
  }
}
