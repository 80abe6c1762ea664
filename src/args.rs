// 该文件是 Yingxi （影析） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// Yingxi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// - 单张图片: image:///path/cat.jpg
  /// - 图片目录: image:///path/dir
  #[arg(long, env = "YINGXI_INPUT", value_name = "SOURCE")]
  pub input: Url,

  /// 上传存储，例如 dir:///var/lib/yingxi?bucket=ml-images
  #[arg(long, env = "YINGXI_STORE", value_name = "STORE")]
  pub store: Url,

  /// 推理端
  /// - HTTP: https://example.com/default/ImageInferenceFunction
  /// - 本地桩: stub:///var/lib/yingxi?seed=42
  #[arg(long, env = "YINGXI_INFERENCE", value_name = "ENDPOINT")]
  pub inference: Url,

  /// 输出
  /// - 图片文件: image:///out/cat.png?font=/path/font.ttf
  /// - 按日期记录: record:///out/records
  #[arg(long, env = "YINGXI_OUTPUT", value_name = "OUTPUT")]
  pub output: Url,

  /// 逐张分析输入中的所有图像
  #[arg(long)]
  pub batch: bool,

  /// 批量模式下最多处理的图像数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_images: usize,
}
