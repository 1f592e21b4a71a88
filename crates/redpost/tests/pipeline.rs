//! End-to-end pipeline runs with in-process generators and publishers

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redpost::preview::PreviewArtifact;
use redpost::providers::{ChatRequest, ImageGenerator, ImageRequest, ProviderError, TextGenerator};
use redpost::{
    GenerationInput, Pipeline, PipelineOutcome, PipelineStage, PublishReceipt, PublishRecordStore,
    PublishRequest, Publisher, RedpostConfig, RedpostError, ReviewPrompt, ScheduleAnswer,
};

const STRUCTURE_REPLY: &str = r##"好的，以下是结构：
```json
{
  "titles": [
    {"original": "只需1秒，AI帮你写完周报！", "type": "positive"},
    {"original": "还不会用AI写作？你亏大了", "type": "negative"},
    {"original": "5个AI写作神器，效率翻倍", "type": "positive"},
    {"original": "不用这些工具，加班到深夜", "type": "negative"},
    {"original": "打工人私藏的AI写作清单", "type": "positive"}
  ],
  "final_title": "5个AI写作神器，效率翻倍",
  "content_outline": ["写作痛点", "工具推荐", "使用技巧", "互动提问"],
  "tags": ["#AI写作", "#效率工具", "#打工人"]
}
```"##;

const CONTENT_REPLY: &str = "## 标题\n5个AI写作神器，效率翻倍！\n\n## 正文\n每天写周报写到头秃？\n今天分享5个AI写作工具。\n你最常用哪一个？\n\n## 图片建议\n浅色科技风，桌面场景\n\n## 标签\n#AI写作 #效率工具 #打工人";

const IMAGE_PROMPT_REPLY: &str = r#"{"cover_image": "明亮桌面上的笔记本电脑，屏幕发光", "content_images": ["五个悬浮的工具图标", "时间轴对比图"], "content_images_count": 2}"#;

struct ScriptedText {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedText {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn happy_path() -> Self {
        Self::new(&[STRUCTURE_REPLY, CONTENT_REPLY, IMAGE_PROMPT_REPLY])
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn chat(&self, _request: ChatRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::RequestFailed("script exhausted".to_string()))
    }
}

#[derive(Default)]
struct FakeImages {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn render(&self, request: ImageRequest) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(request.prompt);
        Ok(format!("https://img.example/{}.png", prompts.len()))
    }
}

#[derive(Default)]
struct RecordingPublisher {
    requests: Mutex<Vec<PublishRequest>>,
    fail: bool,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, request: &PublishRequest) -> redpost::Result<PublishReceipt> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(RedpostError::Transport {
                stage: PipelineStage::Publish,
                source: ProviderError::RpcError {
                    code: -32000,
                    message: "session expired".to_string(),
                },
            });
        }
        Ok(PublishReceipt {
            publisher: "recording".to_string(),
            reference: Some("note-1".to_string()),
            message: "ok".to_string(),
        })
    }
}

struct ScriptedReview {
    confirm: bool,
    times: VecDeque<ScheduleAnswer>,
    rejected: usize,
}

impl ScriptedReview {
    fn confirm_now() -> Self {
        Self {
            confirm: true,
            times: VecDeque::new(),
            rejected: 0,
        }
    }

    fn cancel() -> Self {
        Self {
            confirm: false,
            times: VecDeque::new(),
            rejected: 0,
        }
    }

    fn confirm_at(times: &[&str]) -> Self {
        Self {
            confirm: true,
            times: times
                .iter()
                .map(|t| ScheduleAnswer::At(t.to_string()))
                .collect(),
            rejected: 0,
        }
    }

    /// Confirms, then backs out at the publish-time question
    fn abort_at_schedule() -> Self {
        Self {
            confirm: true,
            times: VecDeque::from([ScheduleAnswer::Abort]),
            rejected: 0,
        }
    }
}

impl ReviewPrompt for ScriptedReview {
    fn confirm(&mut self, artifact: &PreviewArtifact) -> redpost::Result<bool> {
        assert!(artifact.path.exists());
        Ok(self.confirm)
    }

    fn schedule_time(&mut self) -> redpost::Result<ScheduleAnswer> {
        Ok(self.times.pop_front().unwrap_or(ScheduleAnswer::Now))
    }

    fn reject_schedule_time(&mut self, _input: &str, _error: &RedpostError) {
        self.rejected += 1;
    }
}

fn config(dir: &Path) -> RedpostConfig {
    let mut config = RedpostConfig::default();
    config.llm.api_key = Some("test-key".to_string());
    config.storage.output_dir = dir.join("output");
    config.storage.preview_dir = dir.join("preview");
    config.preview.open_browser = false;
    config
}

struct Harness {
    pipeline: Pipeline,
    text: Arc<ScriptedText>,
    images: Arc<FakeImages>,
    publisher: Arc<RecordingPublisher>,
    store: PublishRecordStore,
    _dir: tempfile::TempDir,
}

fn harness(text: ScriptedText, publisher: RecordingPublisher) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let text = Arc::new(text);
    let images = Arc::new(FakeImages::default());
    let publisher = Arc::new(publisher);

    let pipeline = Pipeline::new(&config, text.clone(), images.clone(), publisher.clone()).unwrap();
    let store = PublishRecordStore::in_dir(&config.storage.output_dir);

    Harness {
        pipeline,
        text,
        images,
        publisher,
        store,
        _dir: dir,
    }
}

#[tokio::test]
async fn confirmed_run_publishes_once_and_records() {
    let h = harness(ScriptedText::happy_path(), RecordingPublisher::default());
    let mut review = ScriptedReview::confirm_now();

    let outcome = h
        .pipeline
        .run(&GenerationInput::new("AI写作工具"), &mut review)
        .await
        .unwrap();

    let PipelineOutcome::Published {
        post,
        record,
        waited,
        ..
    } = outcome
    else {
        panic!("expected a published outcome");
    };

    assert_eq!(h.text.calls.load(Ordering::SeqCst), 3);
    assert_eq!(post.structure.titles.len(), 5);
    assert_eq!(post.structure.word_count, 600);
    assert_eq!(post.content.title, "5个AI写作神器，效率翻倍！");
    assert_eq!(post.image_config.content_images_count, 2);
    assert_eq!(post.images.len(), 3);
    assert_eq!(
        *h.images.prompts.lock().unwrap(),
        vec!["明亮桌面上的笔记本电脑，屏幕发光", "五个悬浮的工具图标", "时间轴对比图"]
    );
    assert_eq!(waited, Duration::ZERO);

    let requests = h.publisher.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].images[0], "https://img.example/1.png");
    assert_eq!(requests[0].tags, vec!["#AI写作", "#效率工具", "#打工人"]);

    let stored = h.store.load_all().await.unwrap();
    assert_eq!(stored, vec![record.clone()]);
    assert!(!record.scheduled);
    assert_eq!(record.publisher, "recording");
}

#[tokio::test]
async fn cancelled_run_neither_publishes_nor_records() {
    let h = harness(ScriptedText::happy_path(), RecordingPublisher::default());
    let mut review = ScriptedReview::cancel();

    let outcome = h
        .pipeline
        .run(&GenerationInput::new("AI写作工具"), &mut review)
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Cancelled { .. }));
    assert!(h.publisher.requests.lock().unwrap().is_empty());
    assert!(h.store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn abort_at_schedule_prompt_neither_publishes_nor_records() {
    let h = harness(ScriptedText::happy_path(), RecordingPublisher::default());
    let mut review = ScriptedReview::abort_at_schedule();

    let outcome = h
        .pipeline
        .run(&GenerationInput::new("AI写作工具"), &mut review)
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Cancelled { .. }));
    assert!(h.publisher.requests.lock().unwrap().is_empty());
    assert!(h.store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn past_schedule_publishes_without_waiting() {
    let h = harness(ScriptedText::happy_path(), RecordingPublisher::default());
    let mut review = ScriptedReview::confirm_at(&["next monday", "2020-01-01 08:00:00"]);

    let outcome = h
        .pipeline
        .run(&GenerationInput::new("AI写作工具"), &mut review)
        .await
        .unwrap();

    assert_eq!(review.rejected, 1);
    let PipelineOutcome::Published { record, waited, .. } = outcome else {
        panic!("expected a published outcome");
    };
    assert_eq!(waited, Duration::ZERO);
    assert!(record.scheduled);
    assert_eq!(record.scheduled_time.as_deref(), Some("2020-01-01 08:00:00"));
}

#[tokio::test]
async fn publish_failure_leaves_store_untouched() {
    let publisher = RecordingPublisher {
        fail: true,
        ..Default::default()
    };
    let h = harness(ScriptedText::happy_path(), publisher);

    let err = h
        .pipeline
        .quick_publish(&GenerationInput::new("AI写作工具"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Publish));
    assert_eq!(h.publisher.requests.lock().unwrap().len(), 1);
    assert!(h.store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_structure_stops_the_run() {
    let h = harness(
        ScriptedText::new(&["抱歉，我无法完成这个请求。"]),
        RecordingPublisher::default(),
    );

    let err = h
        .pipeline
        .quick_publish(&GenerationInput::new("AI写作工具"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Structure));
    assert_eq!(err.raw_response(), Some("抱歉，我无法完成这个请求。"));
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 1);
    assert!(h.images.prompts.lock().unwrap().is_empty());
    assert!(h.publisher.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_topic_is_rejected_before_any_call() {
    let h = harness(ScriptedText::happy_path(), RecordingPublisher::default());

    let err = h
        .pipeline
        .generate(&GenerationInput::new("  "))
        .await
        .unwrap_err();

    assert!(matches!(err, RedpostError::InvalidInput(_)));
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recent_history_is_newest_first_across_runs() {
    let h = harness(
        ScriptedText::new(&[
            STRUCTURE_REPLY,
            CONTENT_REPLY,
            IMAGE_PROMPT_REPLY,
            STRUCTURE_REPLY,
            CONTENT_REPLY,
            IMAGE_PROMPT_REPLY,
        ]),
        RecordingPublisher::default(),
    );

    let first = h
        .pipeline
        .quick_publish(&GenerationInput::new("第一篇"))
        .await
        .unwrap();
    let second = h
        .pipeline
        .quick_publish(&GenerationInput::new("第二篇"))
        .await
        .unwrap();
    assert!(first.is_published() && second.is_published());

    let recent = h.pipeline.store().recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].publish_time >= recent[1].publish_time);
}
