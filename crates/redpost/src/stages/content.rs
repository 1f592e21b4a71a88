//! Stage 2: Content
//!
//! Writes the post body from the structure. The model answers in the
//! `## 标题` / `## 正文` / `## 图片建议` / `## 标签` section layout.

use std::sync::Arc;

use crate::models::{Content, ContentStructure};
use crate::parser::{self, ParseError};
use crate::providers::{ChatConfig, TextGenerator};
use crate::{RedpostError, Result};

use super::{call_model, PipelineStage};

pub struct ContentStage {
    text: Arc<dyn TextGenerator>,
    chat: ChatConfig,
}

impl ContentStage {
    pub fn new(text: Arc<dyn TextGenerator>, chat: ChatConfig) -> Self {
        Self { text, chat }
    }

    pub async fn run(&self, structure: &ContentStructure) -> Result<Content> {
        tracing::info!("[CONTENT] Writing body for: {}", structure.final_title);

        let raw = call_model(
            self.text.as_ref(),
            PipelineStage::Content,
            build_prompt(structure),
            &self.chat,
        )
        .await?;

        let content = assemble(&raw, structure).map_err(|source| RedpostError::Parse {
            stage: PipelineStage::Content,
            source,
        })?;

        tracing::info!(
            "[CONTENT] Body ready: {} chars, {} tags",
            content.body.chars().count(),
            content.tags.len()
        );

        Ok(content)
    }
}

pub fn build_prompt(structure: &ContentStructure) -> String {
    let outline = structure.content_outline.join("\n");
    format!(
        r#"你是一位资深的小红书内容创作专家，请根据以下需求创作笔记正文。

标题：{title}
主题：{subject}
大纲：
{outline}
背景：{context}

## 正文创作规则
1. 风格匹配：根据主题判断赛道与受众（生活类轻松亲切，职场干货类真诚务实，情感成长类温馨鼓励，活动促销类热情欢乐）。开篇用受众强相关的痛点或热议话题，3秒内抓住注意力。
2. 结构清晰：痛点引入、核心内容、互动引导，结尾设置开放式问题或投票。口语化表达，字数50-{word_count}字。
3. 严格围绕大纲创作，背景信息只在补充核心内容时按需选用，不引入无关信息。
4. 给出图片搭配建议：图片风格、构图技巧、色彩搭配和必备元素。不要使用emoji等特殊字符。

按以下 Markdown 格式输出：
## 标题
{title}

## 正文
（正文）

## 图片建议
（图片建议）

## 标签
{tags}"#,
        title = structure.final_title,
        subject = structure.subject,
        outline = outline,
        context = structure.context,
        word_count = structure.word_count,
        tags = structure.tags.join(" "),
    )
}

/// Slice the sections and fill gaps from the structure
///
/// Only an empty body is fatal. A missing title or tag section falls back to
/// the structure's final title or tags.
pub fn assemble(
    raw: &str,
    structure: &ContentStructure,
) -> std::result::Result<Content, ParseError> {
    let sections = parser::extract_sections(raw);

    if !sections.missing.is_empty() {
        let names: Vec<&str> = sections.missing.iter().map(|s| s.as_str()).collect();
        tracing::debug!("[CONTENT] Missing sections: {}", names.join(", "));
    }

    if sections.body.is_empty() {
        return Err(ParseError::new("body section is empty or missing", raw));
    }

    let title = match sections.title_line() {
        Some(title) => title.to_string(),
        None => {
            tracing::warn!(
                "[CONTENT] No title section, using structure title: {}",
                structure.final_title
            );
            structure.final_title.clone()
        }
    };

    let mut tags = sections.tag_list();
    if tags.is_empty() {
        tracing::warn!("[CONTENT] No tags section, inheriting structure tags");
        tags = structure.tags.clone();
    }

    Ok(Content {
        title,
        body: sections.body,
        tags,
        image_suggestions: sections.image_suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Title, TitlePolarity};
    use crate::stages::testing::{chat_config, ScriptedText};

    fn structure() -> ContentStructure {
        ContentStructure {
            titles: (0..5)
                .map(|i| Title {
                    original: format!("t{i}"),
                    polarity: TitlePolarity::Positive,
                })
                .collect(),
            final_title: "打工人必备AI工具".to_string(),
            content_outline: vec!["痛点".to_string(), "工具".to_string()],
            tags: vec!["#AI".to_string(), "#效率".to_string()],
            subject: "AI写作工具".to_string(),
            context: String::new(),
            word_count: 600,
            accounts: vec!["acc".to_string()],
        }
    }

    #[test]
    fn test_assemble_full_response() {
        let raw = "## 标题\n5个AI神器\n\n## 正文\n正文内容\n\n## 图片建议\n科技感\n\n## 标签\n#AI #神器";
        let content = assemble(raw, &structure()).unwrap();

        assert_eq!(content.title, "5个AI神器");
        assert_eq!(content.body, "正文内容");
        assert_eq!(content.image_suggestions, "科技感");
        assert_eq!(content.tags, vec!["#AI", "#神器"]);
    }

    #[test]
    fn test_missing_title_and_tags_fall_back_to_structure() {
        let raw = "## 正文\n只有正文";
        let content = assemble(raw, &structure()).unwrap();

        assert_eq!(content.title, "打工人必备AI工具");
        assert_eq!(content.tags, structure().tags);
        assert_eq!(content.image_suggestions, "");
    }

    #[test]
    fn test_empty_body_is_parse_error() {
        let raw = "## 标题\n标题\n## 正文\n\n## 标签\n#a";
        let err = assemble(raw, &structure()).unwrap_err();
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_prompt_carries_outline_and_tags() {
        let prompt = build_prompt(&structure());
        assert!(prompt.contains("痛点\n工具"));
        assert!(prompt.contains("#AI #效率"));
        assert!(prompt.contains("50-600字"));
    }

    #[tokio::test]
    async fn test_run_parses_model_output() {
        let text = Arc::new(ScriptedText::replying(vec![
            "好的！\n## 标题\nX\n## 正文\nbody\n## 图片建议\ny\n## 标签\n#z",
        ]));
        let stage = ContentStage::new(text.clone(), chat_config());

        let content = stage.run(&structure()).await.unwrap();

        assert_eq!(text.calls(), 1);
        assert_eq!(content.body, "body");
    }
}
