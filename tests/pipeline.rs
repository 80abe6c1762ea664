#![cfg(all(
  feature = "stub_inference",
  feature = "read_image_file",
  feature = "save_image_file",
  feature = "directory_record"
))]

use std::fs;

use serde_json::Value;
use url::Url;

use yingxi::{
  FromUrl,
  inference::{Infer, InferenceWrapper, StubEndpoint},
  input::{ImageFileInput, InputWrapper},
  output::{Draw, DirectoryRecordOutput, LabelFont, OutputWrapper, SaveImageFileOutput},
  pipeline::{Analysis, Pipeline},
  storage::{DirectoryStore, StorageLocation, StorageWrapper},
  task::{BatchTask, OneShotTask, Task},
};

mod common;
use common::{png_source, write_png};

#[test]
fn stub_pipeline_produces_valid_boxes() {
  let root = tempfile::tempdir().unwrap();
  let store = DirectoryStore::new(root.path(), "ml-images").unwrap();
  let inference = StubEndpoint::new(root.path()).with_seed(7);
  let pipeline = Pipeline::new(store, inference);

  let source = png_source("Cat.PNG", 200, 150);
  let analysis = pipeline.analyze(&source).unwrap();

  assert!(analysis.is_completed());
  let location = analysis.location.clone().unwrap();
  assert_eq!(location.bucket, "ml-images");
  assert!(location.key.starts_with("uploads/"));
  assert!(location.key.ends_with(".png"));
  assert!(root.path().join("ml-images").join(&location.key).is_file());

  let diagnostics = analysis.diagnostics.as_ref().unwrap();
  assert!(diagnostics.normalize.unwrapped_body);
  assert_eq!(diagnostics.degenerate, 0);
  assert!(analysis.detections.len() <= 3);
  for detection in &analysis.detections {
    assert!(0 <= detection.bbox.x1 && detection.bbox.x1 < detection.bbox.x2);
    assert!(0 <= detection.bbox.y1 && detection.bbox.y1 < detection.bbox.y2);
    assert!(detection.bbox.x2 <= 199 && detection.bbox.y2 <= 149);
    assert!((0.5..=0.99).contains(&detection.score));
  }
}

#[test]
fn seeded_stub_is_deterministic() {
  let root = tempfile::tempdir().unwrap();
  let pipeline = Pipeline::new(
    DirectoryStore::new(root.path(), "ml-images").unwrap(),
    StubEndpoint::new(root.path()).with_seed(42).with_wrap(false),
  );
  let source = png_source("dog.png", 320, 240);

  let first = pipeline.analyze(&source).unwrap();
  let second = pipeline.analyze(&source).unwrap();
  assert_ne!(first.location, second.location);
  assert_eq!(first.detections, second.detections);
  assert!(!first.diagnostics.unwrap().normalize.unwrapped_body);
}

#[test]
fn missing_object_is_reported_as_failure() {
  let store_root = tempfile::tempdir().unwrap();
  let other_root = tempfile::tempdir().unwrap();
  let pipeline = Pipeline::new(
    DirectoryStore::new(store_root.path(), "ml-images").unwrap(),
    StubEndpoint::new(other_root.path()).with_seed(1),
  );

  let analysis = pipeline.analyze(&png_source("cat.png", 64, 64)).unwrap();
  // 包装模式下传输层为 200，失败状态只出现在包装层
  let diagnostics = analysis.diagnostics.as_ref().unwrap();
  assert!(diagnostics.normalize.unwrapped_body);
  assert_eq!(diagnostics.normalize.wrapped_status_code, Some(404));
  assert!(!analysis.is_completed());
  assert!(analysis.detections.is_empty());
  let failure = analysis.http_status_error().unwrap();
  assert_eq!(failure.status_code, 404);
  assert_eq!(failure.message.as_deref(), Some("Image not found in S3."));
}

#[test]
fn gateway_wrapped_stub_answers_with_transport_ok() {
  let root = tempfile::tempdir().unwrap();
  let stub = StubEndpoint::new(root.path()).with_seed(1);
  let envelope = stub
    .infer(&StorageLocation::new("ml-images", "uploads/missing.png"))
    .unwrap();
  assert_eq!(envelope.status_code, 200);

  let analysis = Analysis::from_envelope("missing.png", None, &envelope, 64, 64);
  assert_eq!(analysis.http_status_error().map(|e| e.status_code), Some(404));
}

#[test]
fn one_shot_task_saves_annotated_image_and_record() {
  let root = tempfile::tempdir().unwrap();
  let image_path = root.path().join("cat.png");
  write_png(&image_path, 160, 120);
  let out_path = root.path().join("out").join("cat-annotated.png");

  let summary = OneShotTask
    .run_task(
      ImageFileInput::open(&image_path).unwrap(),
      Pipeline::new(
        DirectoryStore::new(root.path(), "ml-images").unwrap(),
        StubEndpoint::new(root.path()).with_seed(3),
      ),
      SaveImageFileOutput::new(&out_path, Draw::new(LabelFont::bitmap())),
    )
    .unwrap();

  assert_eq!(summary.images, 1);
  assert_eq!(summary.failed + summary.unavailable + summary.skipped, 0);

  let saved = image::open(&out_path).unwrap();
  assert_eq!((saved.width(), saved.height()), (160, 120));

  let record: Value =
    serde_json::from_str(&fs::read_to_string(out_path.with_extension("json")).unwrap()).unwrap();
  assert_eq!(record["source"], "cat.png");
  assert_eq!(record["status"]["state"], "completed");
  assert_eq!(record["location"]["bucket"], "ml-images");
  assert_eq!(
    record["detections"].as_array().unwrap().len(),
    summary.detections
  );
}

#[test]
fn batch_task_skips_unreadable_images() {
  let root = tempfile::tempdir().unwrap();
  let inputs = root.path().join("inputs");
  fs::create_dir_all(&inputs).unwrap();
  write_png(&inputs.join("a.png"), 80, 60);
  fs::write(inputs.join("b.jpg"), b"not an image").unwrap();
  write_png(&inputs.join("c.png"), 90, 70);
  let records = root.path().join("records");

  let summary = BatchTask::default()
    .run_task(
      ImageFileInput::open(&inputs).unwrap(),
      Pipeline::new(
        DirectoryStore::new(root.path(), "ml-images").unwrap(),
        StubEndpoint::new(root.path()).with_seed(11),
      ),
      DirectoryRecordOutput::new(&records, Draw::new(LabelFont::bitmap())),
    )
    .unwrap();

  assert_eq!(summary.images, 2);
  assert_eq!(summary.skipped, 1);

  let day = fs::read_dir(&records).unwrap().next().unwrap().unwrap().path();
  let mut names: Vec<String> = fs::read_dir(&day)
    .unwrap()
    .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  assert_eq!(names.len(), 4);
  assert!(names[0].starts_with("a-") && names[0].ends_with(".json"));
  assert!(names[3].starts_with("c-") && names[3].ends_with(".png"));
}

#[test]
fn batch_task_with_single_image_output_keeps_every_result() {
  let root = tempfile::tempdir().unwrap();
  let inputs = root.path().join("inputs");
  fs::create_dir_all(&inputs).unwrap();
  write_png(&inputs.join("a.png"), 50, 50);
  write_png(&inputs.join("b.png"), 60, 40);
  let out_path = root.path().join("out").join("result.png");

  let summary = BatchTask::default()
    .run_task(
      ImageFileInput::open(&inputs).unwrap(),
      Pipeline::new(
        DirectoryStore::new(root.path(), "ml-images").unwrap(),
        StubEndpoint::new(root.path()).with_seed(2),
      ),
      SaveImageFileOutput::new(&out_path, Draw::new(LabelFont::bitmap())),
    )
    .unwrap();
  assert_eq!(summary.images, 2);

  let out_dir = root.path().join("out");
  let first: Value =
    serde_json::from_str(&fs::read_to_string(out_dir.join("result.json")).unwrap()).unwrap();
  let second: Value =
    serde_json::from_str(&fs::read_to_string(out_dir.join("result-1.json")).unwrap()).unwrap();
  assert_eq!(first["source"], "a.png");
  assert_eq!(second["source"], "b.png");
  let saved = image::open(out_dir.join("result-1.png")).unwrap();
  assert_eq!((saved.width(), saved.height()), (60, 40));
}

#[test]
fn batch_task_honours_max_images() {
  let root = tempfile::tempdir().unwrap();
  let inputs = root.path().join("inputs");
  fs::create_dir_all(&inputs).unwrap();
  for name in ["a.png", "b.png", "c.png"] {
    write_png(&inputs.join(name), 40, 40);
  }

  let summary = BatchTask::default()
    .with_max_images(Some(2))
    .run_task(
      ImageFileInput::open(&inputs).unwrap(),
      Pipeline::new(
        DirectoryStore::new(root.path(), "ml-images").unwrap(),
        StubEndpoint::new(root.path()).with_seed(5),
      ),
      DirectoryRecordOutput::new(root.path().join("records"), Draw::new(LabelFont::bitmap())),
    )
    .unwrap();
  assert_eq!(summary.images, 2);
}

#[test]
fn wrappers_are_configured_from_urls() {
  let root = tempfile::tempdir().unwrap();
  let image_path = root.path().join("cat.png");
  write_png(&image_path, 64, 48);
  let root_str = root.path().display();

  let input = InputWrapper::from_url(&Url::parse(&format!("image://{}", image_path.display())).unwrap()).unwrap();
  let store =
    StorageWrapper::from_url(&Url::parse(&format!("dir://{root_str}?bucket=ml-images")).unwrap()).unwrap();
  let inference =
    InferenceWrapper::from_url(&Url::parse(&format!("stub://{root_str}?seed=9")).unwrap()).unwrap();
  let output = OutputWrapper::from_url(
    &Url::parse(&format!("record://{root_str}/records?font=/nonexistent/font.ttf")).unwrap(),
  )
  .unwrap();

  let summary = OneShotTask
    .run_task(input, Pipeline::new(store, inference), output)
    .unwrap();
  assert_eq!(summary.images, 1);
  assert!(root.path().join("records").is_dir());
}
