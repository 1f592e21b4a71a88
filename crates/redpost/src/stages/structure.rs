//! Stage 1: Structure
//!
//! Plans the post: five candidate titles, the chosen title, an outline and
//! tags. The model answers with a JSON record.

use std::sync::Arc;

use serde::Deserialize;

use crate::models::{ContentStructure, ResolvedInput, Title, STRUCTURE_TITLE_COUNT};
use crate::parser::{self, ParseError};
use crate::providers::{ChatConfig, TextGenerator};
use crate::{RedpostError, Result};

use super::{call_model, PipelineStage};

/// Fields the model is asked to fill
#[derive(Debug, Deserialize)]
struct StructureDraft {
    titles: Vec<Title>,
    final_title: String,
    #[serde(default)]
    content_outline: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub struct StructureStage {
    text: Arc<dyn TextGenerator>,
    chat: ChatConfig,
}

impl StructureStage {
    pub fn new(text: Arc<dyn TextGenerator>, chat: ChatConfig) -> Self {
        Self { text, chat }
    }

    pub async fn run(&self, input: &ResolvedInput) -> Result<ContentStructure> {
        tracing::info!("[STRUCTURE] Planning post for topic: {}", input.topic);

        let raw = call_model(
            self.text.as_ref(),
            PipelineStage::Structure,
            build_prompt(input),
            &self.chat,
        )
        .await?;

        let structure = assemble(&raw, input).map_err(|source| RedpostError::Parse {
            stage: PipelineStage::Structure,
            source,
        })?;

        tracing::info!(
            "[STRUCTURE] Final title: {} ({} outline points, {} tags)",
            structure.final_title,
            structure.content_outline.len(),
            structure.tags.len()
        );

        Ok(structure)
    }
}

pub fn build_prompt(input: &ResolvedInput) -> String {
    format!(
        r##"你是一位资深的小红书内容创作专家。

【你的任务】
根据用户的内容需求，严格填充下面的 JSON 结构，不得输出任何多余文字。

====================
【输入信息】
主题：{topic}
字数：{word_count}
背景：{context}
发布账号：{accounts}

====================
【标题创作规则】
1. 采用二极管标题法：
   - 正面刺激：产品或方法 + 只需1秒（短期）+ 便可开挂（逆天效果）
   - 负面刺激：你不X + 绝对会后悔（天大损失）+（紧迫感）
2. 使用标点符号制造紧迫感和惊喜感（！、？、…），采用有悬念的表述
3. 融入1-2个小红书爆款关键词
4. 每个标题控制在20字以内

【只完成标题与大纲】
1. 生成{title_count}个标题，每个标注 positive 或 negative
2. 给出最终标题，小于20字
3. 输出正文大纲
4. 给出5个标签
5. 全部使用中文

====================
只输出下面的 JSON，不得添加解释、注释或 markdown：
{{
  "titles": [{{"original": "标题文字", "type": "positive|negative"}}],
  "final_title": "最终标题",
  "content_outline": ["大纲要点1", "大纲要点2"],
  "tags": ["#标签1", "#标签2"]
}}"##,
        topic = input.topic,
        word_count = input.word_count,
        context = input.context,
        accounts = input.accounts.join("、"),
        title_count = STRUCTURE_TITLE_COUNT,
    )
}

/// Parse the model's record and re-attach the pass-through fields
pub fn assemble(
    raw: &str,
    input: &ResolvedInput,
) -> std::result::Result<ContentStructure, ParseError> {
    let draft: StructureDraft = parser::extract_record(raw)?;

    if draft.titles.len() != STRUCTURE_TITLE_COUNT {
        return Err(ParseError::new(
            format!(
                "expected {} titles, got {}",
                STRUCTURE_TITLE_COUNT,
                draft.titles.len()
            ),
            raw,
        ));
    }

    let final_title = draft.final_title.trim().to_string();
    if final_title.is_empty() {
        return Err(ParseError::new("final_title is empty", raw));
    }

    Ok(ContentStructure {
        titles: draft.titles,
        final_title,
        content_outline: draft.content_outline,
        tags: draft.tags,
        subject: input.topic.clone(),
        context: input.context.clone(),
        word_count: input.word_count,
        accounts: input.accounts.clone(),
    })
}
