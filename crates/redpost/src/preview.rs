//! Preview gate - the human checkpoint between generation and publish
//!
//! ```text
//! Draft ──present──▶ Presented ──confirm(time?)──▶ Confirmed
//!                        │
//!                        └────────cancel─────────▶ Cancelled
//! ```
//!
//! Presenting writes a self-contained HTML page. The decision itself comes
//! from a [`ReviewPrompt`], normally the interactive terminal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::GeneratedPost;
use crate::scheduler::ScheduleTime;
use crate::{RedpostError, Result};

/// What the reviewer sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl PreviewData {
    pub fn from_post(post: &GeneratedPost) -> Self {
        Self {
            title: post.content.title.clone(),
            content: post.content.body.clone(),
            tags: post.content.tags.clone(),
            images: post.images.as_slice().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArtifact {
    pub path: PathBuf,
}

/// Result of a finished review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewDecision {
    Confirmed { schedule: Option<ScheduleTime> },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Draft,
    Presented { artifact: PreviewArtifact },
    Confirmed { schedule: Option<ScheduleTime> },
    Cancelled,
}

impl GateState {
    pub fn name(&self) -> &'static str {
        match self {
            GateState::Draft => "draft",
            GateState::Presented { .. } => "presented",
            GateState::Confirmed { .. } => "confirmed",
            GateState::Cancelled => "cancelled",
        }
    }
}

/// Tracks one post through the gate and refuses out-of-order transitions
#[derive(Debug)]
pub struct GateSession {
    state: GateState,
}

impl Default for GateSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GateSession {
    pub fn new() -> Self {
        Self {
            state: GateState::Draft,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn present(&mut self, artifact: PreviewArtifact) -> Result<()> {
        match self.state {
            GateState::Draft => {
                self.state = GateState::Presented { artifact };
                Ok(())
            }
            _ => Err(self.illegal("present")),
        }
    }

    pub fn confirm(&mut self, schedule: Option<ScheduleTime>) -> Result<()> {
        match self.state {
            GateState::Presented { .. } => {
                self.state = GateState::Confirmed { schedule };
                Ok(())
            }
            _ => Err(self.illegal("confirm")),
        }
    }

    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            GateState::Presented { .. } => {
                self.state = GateState::Cancelled;
                Ok(())
            }
            _ => Err(self.illegal("cancel")),
        }
    }

    /// Final decision; only available once the gate is closed
    pub fn decision(&self) -> Result<PreviewDecision> {
        match &self.state {
            GateState::Confirmed { schedule } => Ok(PreviewDecision::Confirmed {
                schedule: *schedule,
            }),
            GateState::Cancelled => Ok(PreviewDecision::Cancelled),
            _ => Err(self.illegal("decide")),
        }
    }

    fn illegal(&self, action: &str) -> RedpostError {
        RedpostError::GateTransition(format!("cannot {} from {}", action, self.state.name()))
    }
}

/// Reply to the publish-time question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleAnswer {
    /// Publish immediately
    Now,
    /// Raw `YYYY-MM-DD HH:mm:ss` input; blank counts as [`Now`](Self::Now)
    At(String),
    /// The reviewer backed out; nothing is published
    Abort,
}

/// Collects the human's answers at the gate
pub trait ReviewPrompt {
    /// `true` to publish, `false` to cancel
    fn confirm(&mut self, artifact: &PreviewArtifact) -> Result<bool>;

    /// Requested publish time
    fn schedule_time(&mut self) -> Result<ScheduleAnswer>;

    /// Told when the last answer to [`schedule_time`](Self::schedule_time) was rejected
    fn reject_schedule_time(&mut self, input: &str, error: &RedpostError);
}

pub struct PreviewGate {
    preview_dir: PathBuf,
    open_browser: bool,
}

impl PreviewGate {
    pub fn new(preview_dir: impl Into<PathBuf>, open_browser: bool) -> Self {
        Self {
            preview_dir: preview_dir.into(),
            open_browser,
        }
    }

    /// Run the gate from draft to a decision
    pub async fn review(
        &self,
        data: &PreviewData,
        prompt: &mut dyn ReviewPrompt,
    ) -> Result<PreviewDecision> {
        let mut session = GateSession::new();

        let artifact = self.write_artifact(data).await?;
        tracing::info!("[PREVIEW] Preview written to {}", artifact.path.display());

        if self.open_browser {
            if let Err(e) = open::that(&artifact.path) {
                tracing::warn!("[PREVIEW] Could not open browser: {}", e);
            }
        }

        session.present(artifact.clone())?;

        if !prompt.confirm(&artifact)? {
            session.cancel()?;
            tracing::info!("[PREVIEW] Publish cancelled by reviewer");
            return session.decision();
        }

        let schedule = loop {
            let input = match prompt.schedule_time()? {
                ScheduleAnswer::Now => break None,
                ScheduleAnswer::At(input) if input.trim().is_empty() => break None,
                ScheduleAnswer::At(input) => input,
                ScheduleAnswer::Abort => {
                    session.cancel()?;
                    tracing::info!("[PREVIEW] Publish cancelled while choosing a time");
                    return session.decision();
                }
            };
            match ScheduleTime::parse(&input) {
                Ok(time) => break Some(time),
                Err(e) => {
                    tracing::debug!("[PREVIEW] Rejected schedule time {:?}", input);
                    prompt.reject_schedule_time(&input, &e);
                }
            }
        };

        session.confirm(schedule)?;
        match &schedule {
            Some(time) => tracing::info!("[PREVIEW] Confirmed, scheduled for {}", time),
            None => tracing::info!("[PREVIEW] Confirmed, publishing now"),
        }
        session.decision()
    }

    async fn write_artifact(&self, data: &PreviewData) -> Result<PreviewArtifact> {
        tokio::fs::create_dir_all(&self.preview_dir).await?;

        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.preview_dir.join(format!("preview_{millis}.html"));
        tokio::fs::write(&path, render_html(data)).await?;

        Ok(PreviewArtifact { path })
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Self-contained preview page
pub fn render_html(data: &PreviewData) -> String {
    let images: String = data
        .images
        .iter()
        .map(|url| format!(r#"<img src="{}" class="slide" />"#, escape_html(url)))
        .collect();
    let tags = escape_html(&data.tags.join(" "));

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>发布预览 - {title}</title>
  <style>
    body {{ margin: 0; padding: 20px; background: #f6f6f6; font-family: -apple-system, "PingFang SC", Arial; }}
    .card {{ max-width: 420px; margin: 0 auto; background: #fff; border-radius: 14px; overflow: hidden; box-shadow: 0 10px 28px rgba(0,0,0,0.08); }}
    .images {{ display: flex; overflow-x: auto; scroll-snap-type: x mandatory; background: #000; }}
    .slide {{ width: 100%; flex-shrink: 0; scroll-snap-align: center; aspect-ratio: 3/4; object-fit: contain; }}
    .content {{ padding: 16px; }}
    h1 {{ font-size: 18px; margin: 0 0 12px; line-height: 1.4; }}
    .text {{ font-size: 14px; line-height: 1.7; white-space: pre-wrap; color: #333; }}
    .tags {{ margin-top: 12px; color: #999; font-size: 13px; }}
    .actions {{ padding: 16px; background: #fafafa; border-top: 1px solid #eee; }}
    .btn-group {{ display: flex; gap: 12px; }}
    .btn {{ flex: 1; padding: 12px; border: none; border-radius: 8px; font-size: 14px; cursor: pointer; }}
    .btn-confirm {{ background: #ff2442; color: #fff; }}
    .btn-cancel {{ background: #f0f0f0; color: #666; }}
    .schedule {{ margin-top: 12px; font-size: 13px; color: #666; }}
    .schedule input {{ width: 100%; margin-top: 8px; padding: 8px; box-sizing: border-box; }}
    .status {{ padding: 12px; text-align: center; font-size: 13px; color: #666; }}
  </style>
</head>
<body>
  <div class="card">
    <div class="images">{images}</div>
    <div class="content">
      <h1>{title}</h1>
      <div class="text">{content}</div>
      <div class="tags">{tags}</div>
    </div>
    <div class="actions">
      <div class="btn-group">
        <button class="btn btn-cancel" id="cancel">取消</button>
        <button class="btn btn-confirm" id="confirm">确认发布</button>
      </div>
      <div class="schedule">
        <label>定时发布（YYYY-MM-DD HH:mm:ss，留空立即发布）</label>
        <input type="text" id="scheduleTime" placeholder="2026-01-01 09:00:00" />
      </div>
    </div>
    <div class="status" id="status">确认无误后在终端中回复确认</div>
  </div>
  <script>
    const status = document.getElementById('status');
    document.getElementById('confirm').onclick = () => {{
      const time = document.getElementById('scheduleTime').value.trim();
      status.textContent = time ? '请在终端确认，定时：' + time : '请在终端确认发布';
    }};
    document.getElementById('cancel').onclick = () => {{
      status.textContent = '请在终端选择取消';
    }};
  </script>
</body>
</html>
"#,
        title = escape_html(&data.title),
        content = escape_html(&data.content),
        images = images,
        tags = tags,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers from a script and records rejected inputs
    struct ScriptedReview {
        confirm: bool,
        times: VecDeque<ScheduleAnswer>,
        rejected: Vec<String>,
        seen_artifact: Option<PathBuf>,
    }

    impl ScriptedReview {
        fn new(confirm: bool, times: Vec<ScheduleAnswer>) -> Self {
            Self {
                confirm,
                times: times.into(),
                rejected: Vec::new(),
                seen_artifact: None,
            }
        }
    }

    impl ReviewPrompt for ScriptedReview {
        fn confirm(&mut self, artifact: &PreviewArtifact) -> Result<bool> {
            self.seen_artifact = Some(artifact.path.clone());
            Ok(self.confirm)
        }

        fn schedule_time(&mut self) -> Result<ScheduleAnswer> {
            Ok(self.times.pop_front().unwrap_or(ScheduleAnswer::Now))
        }

        fn reject_schedule_time(&mut self, input: &str, _error: &RedpostError) {
            self.rejected.push(input.to_string());
        }
    }

    fn at(input: &str) -> ScheduleAnswer {
        ScheduleAnswer::At(input.to_string())
    }

    fn data() -> PreviewData {
        PreviewData {
            title: "AI <神器>".to_string(),
            content: "第一行\n第二行 & more".to_string(),
            tags: vec!["#AI".to_string(), "#效率".to_string()],
            images: vec!["https://img/1.png".to_string(), "https://img/2.png".to_string()],
        }
    }

    #[test]
    fn test_render_html_escapes_and_includes_everything() {
        let html = render_html(&data());

        assert!(html.contains("AI &lt;神器&gt;"));
        assert!(html.contains("第二行 &amp; more"));
        assert!(html.contains("#AI #效率"));
        assert!(html.contains(r#"src="https://img/2.png""#));
        assert!(html.contains("确认发布"));
        assert!(html.contains("取消"));
        assert!(html.contains(r#"id="scheduleTime""#));
    }

    #[test]
    fn test_confirming_a_draft_is_illegal() {
        let mut session = GateSession::new();
        let err = session.confirm(None).unwrap_err();
        assert!(matches!(err, RedpostError::GateTransition(_)));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut session = GateSession::new();
        session
            .present(PreviewArtifact {
                path: PathBuf::from("p.html"),
            })
            .unwrap();
        session.cancel().unwrap();

        assert!(session.confirm(None).is_err());
        assert_eq!(session.decision().unwrap(), PreviewDecision::Cancelled);
    }

    #[test]
    fn test_decision_requires_closed_gate() {
        assert!(GateSession::new().decision().is_err());
    }

    #[tokio::test]
    async fn test_review_writes_artifact_and_confirms_now() {
        let dir = tempfile::tempdir().unwrap();
        let gate = PreviewGate::new(dir.path().join("preview"), false);
        let mut prompt = ScriptedReview::new(true, vec![at("  ")]);

        let decision = gate.review(&data(), &mut prompt).await.unwrap();

        assert_eq!(decision, PreviewDecision::Confirmed { schedule: None });
        let path = prompt.seen_artifact.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("preview_") && name.ends_with(".html"));
        assert!(std::fs::read_to_string(path).unwrap().contains("AI &lt;神器&gt;"));
    }

    #[tokio::test]
    async fn test_review_reprompts_on_bad_time() {
        let dir = tempfile::tempdir().unwrap();
        let gate = PreviewGate::new(dir.path(), false);
        let mut prompt = ScriptedReview::new(
            true,
            vec![at("明天上午"), at("2026-02-30 10:00:00"), at("2026-03-01 10:00:00")],
        );

        let decision = gate.review(&data(), &mut prompt).await.unwrap();

        assert_eq!(prompt.rejected, vec!["明天上午", "2026-02-30 10:00:00"]);
        assert_eq!(
            decision,
            PreviewDecision::Confirmed {
                schedule: Some(ScheduleTime::parse("2026-03-01 10:00:00").unwrap())
            }
        );
    }

    #[tokio::test]
    async fn test_review_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let gate = PreviewGate::new(dir.path(), false);
        let mut prompt = ScriptedReview::new(false, vec![]);

        let decision = gate.review(&data(), &mut prompt).await.unwrap();

        assert_eq!(decision, PreviewDecision::Cancelled);
    }

    #[tokio::test]
    async fn test_abort_while_scheduling_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let gate = PreviewGate::new(dir.path(), false);
        let mut prompt =
            ScriptedReview::new(true, vec![at("not a time"), ScheduleAnswer::Abort]);

        let decision = gate.review(&data(), &mut prompt).await.unwrap();

        assert_eq!(decision, PreviewDecision::Cancelled);
        assert_eq!(prompt.rejected, vec!["not a time"]);
    }
}
