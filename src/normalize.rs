// 该文件是 Yingxi （影析） 项目的一部分。
// src/normalize.rs - 推理响应规范化
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

//! 推理端的响应形态并不固定：检测结果可能直接位于顶层 `detections`，
//! 可能位于 `analysis_results` 之内，也可能被网关包装成 `body` 字段中的
//! JSON 字符串。本模块按固定顺序逐层剥离，得到规范的 [`NormalizedResult`]。
//!
//! [`normalize`] 是全函数：任何输入都不会 panic，也不会返回错误，
//! 解析失败只体现在 [`NormalizeReport`] 中。

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  detection::{BoundingBox, Detection, NormalizedResult},
  envelope::ResponseEnvelope,
};

const KEY_BODY: &str = "body";
const KEY_STATUS_CODE: &str = "statusCode";
const KEY_ANALYSIS_RESULTS: &str = "analysis_results";
const KEY_DETECTIONS: &str = "detections";
const KEY_PROCESSED_IMAGE_URL: &str = "processed_image_url";
const KEY_LABEL: &str = "label";
const KEY_SCORE: &str = "score";
const KEY_BOX: &str = "box";
const DIAGNOSTIC_KEYS: [&str; 2] = ["message", "error"];

/// 规范化的总体结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeOutcome {
  /// 找到了 `detections` 数组（可能为空）
  DetectionsFound,
  /// 响应是合法 JSON，但没有任何 `detections`
  NothingDetected,
  /// 响应正文不是合法 JSON
  ParseError,
}

/// 工作对象的形态，每次解析只判定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
  AnalysisResults,
  TopLevel,
  Unrecognized,
}

/// 单个检测元素被丢弃的原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedDetection {
  #[error("检测元素不是对象")]
  NotAnObject,
  #[error("缺少标签或标签为空")]
  Label,
  #[error("缺少数值型置信度")]
  Score,
  #[error("矩形框必须是 4 个整数")]
  Box,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeReport {
  pub outcome: NormalizeOutcome,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shape: Option<PayloadShape>,
  /// 是否从 `body` 字符串中剥离出了内层对象
  pub unwrapped_body: bool,
  /// `body` 是字符串但不是合法 JSON 对象，已回退到外层
  pub inner_parse_failed: bool,
  /// 被丢弃的畸形检测元素数量
  pub malformed: usize,
  /// 网关未转换状态码时，包装层中携带的 `statusCode`
  #[serde(skip_serializing_if = "Option::is_none")]
  pub wrapped_status_code: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub diagnostic_message: Option<String>,
}

impl NormalizeReport {
  fn new(outcome: NormalizeOutcome) -> Self {
    Self {
      outcome,
      shape: None,
      unwrapped_body: false,
      inner_parse_failed: false,
      malformed: 0,
      wrapped_status_code: None,
      diagnostic_message: None,
    }
  }

  /// 包装层的状态码是否表示失败
  pub fn wrapped_status_failed(&self) -> bool {
    self
      .wrapped_status_code
      .map(|code| !(200..300).contains(&code))
      .unwrap_or(false)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
  pub result: NormalizedResult,
  pub report: NormalizeReport,
}

enum WorkingShape<'a> {
  AnalysisResults(&'a Map<String, Value>),
  TopLevel(&'a Map<String, Value>),
  Unrecognized(Option<&'a Map<String, Value>>),
}

impl<'a> WorkingShape<'a> {
  fn classify(working: &'a Value) -> Self {
    let Some(object) = working.as_object() else {
      return WorkingShape::Unrecognized(None);
    };

    if let Some(inner) = object.get(KEY_ANALYSIS_RESULTS).and_then(Value::as_object) {
      WorkingShape::AnalysisResults(inner)
    } else if object.contains_key(KEY_DETECTIONS) {
      WorkingShape::TopLevel(object)
    } else {
      WorkingShape::Unrecognized(Some(object))
    }
  }

  fn kind(&self) -> PayloadShape {
    match self {
      WorkingShape::AnalysisResults(_) => PayloadShape::AnalysisResults,
      WorkingShape::TopLevel(_) => PayloadShape::TopLevel,
      WorkingShape::Unrecognized(_) => PayloadShape::Unrecognized,
    }
  }

  /// 读取 `detections` 与 `processed_image_url` 的对象
  fn payload(&self) -> Option<&'a Map<String, Value>> {
    match self {
      WorkingShape::AnalysisResults(object) | WorkingShape::TopLevel(object) => Some(object),
      WorkingShape::Unrecognized(object) => *object,
    }
  }
}

/// 规范化一个响应信封，状态码不影响解析过程
pub fn normalize(envelope: &ResponseEnvelope) -> Normalized {
  if !envelope.is_success() {
    debug!("响应状态码 {}，仍尝试解析正文", envelope.status_code);
  }
  normalize_body(&envelope.body)
}

/// 规范化原始响应正文
pub fn normalize_body(body: &str) -> Normalized {
  let outer: Value = match serde_json::from_str(body) {
    Ok(value) => value,
    Err(e) => {
      warn!("响应正文不是合法 JSON: {}", e);
      return Normalized {
        result: NormalizedResult::empty(),
        report: NormalizeReport::new(NormalizeOutcome::ParseError),
      };
    }
  };

  let mut report = NormalizeReport::new(NormalizeOutcome::NothingDetected);
  let inner = unwrap_body(&outer, &mut report);
  let working = inner.as_ref().unwrap_or(&outer);

  report.diagnostic_message = diagnostic_message(working);

  let shape = WorkingShape::classify(working);
  report.shape = Some(shape.kind());
  debug!("响应形态: {:?}", shape.kind());

  let Some(payload) = shape.payload() else {
    return Normalized {
      result: NormalizedResult::empty(),
      report,
    };
  };

  let processed_image_url = payload
    .get(KEY_PROCESSED_IMAGE_URL)
    .and_then(Value::as_str)
    .map(str::to_string);

  let detections = match payload.get(KEY_DETECTIONS) {
    Some(Value::Array(items)) => {
      report.outcome = NormalizeOutcome::DetectionsFound;
      decode_detections(items, &mut report)
    }
    Some(other) => {
      warn!("`detections` 不是数组，视为无检测结果: {}", type_name(other));
      Vec::new()
    }
    None => Vec::new(),
  };

  Normalized {
    result: NormalizedResult {
      detections,
      processed_image_url,
    },
    report,
  }
}

/// 剥离一层 `body` 字符串包装，失败时返回 `None` 以回退到外层对象
fn unwrap_body(outer: &Value, report: &mut NormalizeReport) -> Option<Value> {
  let text = outer.get(KEY_BODY)?.as_str()?;
  match serde_json::from_str::<Value>(text) {
    Ok(inner) if inner.is_object() => {
      report.unwrapped_body = true;
      report.wrapped_status_code = outer
        .get(KEY_STATUS_CODE)
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());
      Some(inner)
    }
    Ok(inner) => {
      warn!("`body` 内层不是 JSON 对象 ({})，回退到外层", type_name(&inner));
      report.inner_parse_failed = true;
      None
    }
    Err(e) => {
      warn!("`body` 内层解析失败，回退到外层: {}", e);
      report.inner_parse_failed = true;
      None
    }
  }
}

fn diagnostic_message(working: &Value) -> Option<String> {
  DIAGNOSTIC_KEYS
    .iter()
    .find_map(|key| working.get(key).and_then(Value::as_str))
    .map(str::to_string)
}

fn decode_detections(items: &[Value], report: &mut NormalizeReport) -> Vec<Detection> {
  let mut detections = Vec::with_capacity(items.len());
  for (index, item) in items.iter().enumerate() {
    match decode_detection(item) {
      Ok(detection) => detections.push(detection),
      Err(reason) => {
        debug!("丢弃第 {} 个检测元素: {}", index, reason);
        report.malformed += 1;
      }
    }
  }
  detections
}

/// 解析单个检测元素
pub fn decode_detection(item: &Value) -> Result<Detection, MalformedDetection> {
  let object = item.as_object().ok_or(MalformedDetection::NotAnObject)?;

  let label = object
    .get(KEY_LABEL)
    .and_then(Value::as_str)
    .filter(|label| !label.is_empty())
    .ok_or(MalformedDetection::Label)?;

  let score = object
    .get(KEY_SCORE)
    .and_then(Value::as_f64)
    .ok_or(MalformedDetection::Score)?;

  let bbox = object
    .get(KEY_BOX)
    .and_then(Value::as_array)
    .and_then(|coords| decode_box(coords))
    .ok_or(MalformedDetection::Box)?;

  Ok(Detection {
    label: label.to_string(),
    score,
    bbox,
  })
}

fn decode_box(coords: &[Value]) -> Option<BoundingBox> {
  let [x1, y1, x2, y2] = coords else {
    return None;
  };
  Some(BoundingBox::new(
    coordinate(x1)?,
    coordinate(y1)?,
    coordinate(x2)?,
    coordinate(y2)?,
  ))
}

/// 整数原样接受；浮点坐标四舍五入到最近的像素
fn coordinate(value: &Value) -> Option<i64> {
  value.as_i64().or_else(|| {
    value
      .as_f64()
      .filter(|v| v.is_finite())
      .map(|v| v.round() as i64)
  })
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
