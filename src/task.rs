// 该文件是 Yingxi （影析） 项目的一部分。
// src/task.rs - 分析任务
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

use std::time::Instant;

use tracing::{error, info, warn};

use crate::{
  inference::Infer,
  input::SourceImage,
  output::Render,
  pipeline::{Analysis, Pipeline},
  storage::ObjectStore,
};

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: P, output: O) -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
  /// 完成渲染的图像数
  pub images: usize,
  pub detections: usize,
  /// 推理端返回非 2xx 的请求数
  pub failed: usize,
  /// 推理或上传没有完成的请求数
  pub unavailable: usize,
  /// 读取失败而跳过的图像数
  pub skipped: usize,
}

impl TaskSummary {
  fn record(&mut self, analysis: &Analysis) {
    self.images += 1;
    self.detections += analysis.detections.len();
    if analysis.is_unavailable() {
      self.unavailable += 1;
    } else if !analysis.is_completed() {
      self.failed += 1;
    }
  }
}

fn analyze_and_render<S, M, O, RE>(
  pipeline: &Pipeline<S, M>,
  output: &O,
  source: &SourceImage,
  summary: &mut TaskSummary,
) -> Result<(), RE>
where
  S: ObjectStore,
  M: Infer,
  O: Render<Error = RE>,
{
  let now = Instant::now();
  let analysis = pipeline.analyze_or_unavailable(source);
  let elapsed_a = now.elapsed();

  for detection in &analysis.detections {
    info!(
      "  - {}: {:.2}% at ({}, {}, {}, {})",
      detection.label,
      detection.score * 100.0,
      detection.bbox.x1,
      detection.bbox.y1,
      detection.bbox.x2,
      detection.bbox.y2
    );
  }

  output.render_result(source, &analysis)?;
  let elapsed_b = now.elapsed();
  info!("分析完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);

  summary.record(&analysis);
  Ok(())
}

pub struct OneShotTask;

impl<I, S, M, O, IE, RE> Task<I, Pipeline<S, M>, O> for OneShotTask
where
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<SourceImage, IE>>,
  S: ObjectStore,
  M: Infer,
  O: Render<Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: Pipeline<S, M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let source = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))??;
    info!("输入图像获取成功: {}", source.file_name);

    let mut summary = TaskSummary::default();
    analyze_and_render(&pipeline, &output, &source, &mut summary)?;

    info!("任务完成，退出");
    Ok(summary)
  }
}

#[derive(Default, Debug)]
pub struct BatchTask {
  max_images: Option<usize>,
}

impl BatchTask {
  pub fn with_max_images(mut self, max_images: Option<usize>) -> Self {
    self.max_images = max_images;
    self
  }
}

impl<I, S, M, O, IE, RE> Task<I, Pipeline<S, M>, O> for BatchTask
where
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<SourceImage, IE>>,
  S: ObjectStore,
  M: Infer,
  O: Render<Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: Pipeline<S, M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始批量任务...");
    let mut summary = TaskSummary::default();

    for (index, item) in input.enumerate() {
      if self.max_images.map(|n| index >= n).unwrap_or(false) {
        info!("达到指定图像数 {}, 退出任务循环", index);
        break;
      }

      let source = match item {
        Ok(source) => source,
        Err(e) => {
          error!("读取第 {} 张图像失败，跳过: {}", index + 1, e);
          summary.skipped += 1;
          continue;
        }
      };

      info!("处理第 {} 张图像: {}", index + 1, source.file_name);
      analyze_and_render(&pipeline, &output, &source, &mut summary)?;
    }

    if summary.failed + summary.unavailable > 0 {
      warn!(
        "{} 张图像分析失败，{} 张分析不可用",
        summary.failed, summary.unavailable
      );
    }
    info!("任务完成，退出");
    Ok(summary)
  }
}
