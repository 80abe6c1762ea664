// 该文件是 Yingxi （影析） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use yingxi::{
  FromUrl,
  inference::InferenceWrapper,
  input::InputWrapper,
  output::OutputWrapper,
  pipeline::Pipeline,
  storage::StorageWrapper,
  task::{BatchTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("上传存储: {}", args.store);
  info!("推理端: {}", args.inference);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let store = StorageWrapper::from_url(&args.store)?;
  let inference = InferenceWrapper::from_url(&args.inference)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let pipeline = Pipeline::new(store, inference);

  let summary = if args.batch {
    let max_images = (args.max_images > 0).then_some(args.max_images);
    BatchTask::default()
      .with_max_images(max_images)
      .run_task(input, pipeline, output)?
  } else {
    OneShotTask.run_task(input, pipeline, output)?
  };

  info!("总图像数: {}", summary.images);
  info!("总检测数: {}", summary.detections);
  if summary.failed + summary.unavailable + summary.skipped > 0 {
    info!(
      "失败: {}, 不可用: {}, 跳过: {}",
      summary.failed, summary.unavailable, summary.skipped
    );
  }

  Ok(())
}
