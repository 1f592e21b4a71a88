//! Recovery of structured data from free-form model output
//!
//! Two shapes are supported: a JSON record somewhere in the text, and the
//! `## 标题` / `## 正文` / `## 图片建议` / `## 标签` section layout used for the
//! finished post. Nothing in here performs I/O.

use serde::de::DeserializeOwned;

/// Model output that could not be turned into the expected shape
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}; raw response: {raw}")]
pub struct ParseError {
    pub reason: String,
    /// The untouched model output
    pub raw: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence and its closing fence
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Language tag runs to the end of the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Byte range of the first balanced `{...}` span
///
/// Braces inside JSON string literals are ignored, including escaped quotes.
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode a JSON record from model output
///
/// Tries the fence-stripped text first, then the first balanced object span.
/// There is no further fallback and no default value.
pub fn extract_record<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let cleaned = strip_code_fences(raw);

    let direct_err = match serde_json::from_str::<T>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(span) = find_balanced_object(cleaned) else {
        return Err(ParseError::new(
            format!("no JSON object found ({direct_err})"),
            raw,
        ));
    };

    serde_json::from_str::<T>(span)
        .map_err(|e| ParseError::new(format!("embedded JSON object did not decode: {e}"), raw))
}

/// Labeled sections of a finished post, in the order they must appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSection {
    Title,
    Body,
    ImageSuggestions,
    Tags,
}

impl ContentSection {
    pub const ORDERED: [ContentSection; 4] = [
        ContentSection::Title,
        ContentSection::Body,
        ContentSection::ImageSuggestions,
        ContentSection::Tags,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            ContentSection::Title => "## 标题",
            ContentSection::Body => "## 正文",
            ContentSection::ImageSuggestions => "## 图片建议",
            ContentSection::Tags => "## 标签",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSection::Title => "title",
            ContentSection::Body => "body",
            ContentSection::ImageSuggestions => "image_suggestions",
            ContentSection::Tags => "tags",
        }
    }
}

/// Sliced section text; absent sections are empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub title: String,
    pub body: String,
    pub image_suggestions: String,
    pub tags: String,
    pub missing: Vec<ContentSection>,
}

impl Sections {
    /// First non-empty line of the title section
    pub fn title_line(&self) -> Option<&str> {
        self.title.lines().map(str::trim).find(|l| !l.is_empty())
    }

    /// Tags split on whitespace and ASCII or full-width commas
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }

    fn slot(&mut self, section: ContentSection) -> &mut String {
        match section {
            ContentSection::Title => &mut self.title,
            ContentSection::Body => &mut self.body,
            ContentSection::ImageSuggestions => &mut self.image_suggestions,
            ContentSection::Tags => &mut self.tags,
        }
    }
}

/// Slice text between consecutive anchors
///
/// Anchors are searched in their fixed order, each one after the previous
/// match. A section ends where the next found anchor begins.
pub fn extract_sections(raw: &str) -> Sections {
    let text = strip_code_fences(raw);
    let mut sections = Sections::default();

    // (section, anchor start, content start)
    let mut found: Vec<(ContentSection, usize, usize)> = Vec::new();
    let mut cursor = 0;
    for section in ContentSection::ORDERED {
        match text[cursor..].find(section.marker()) {
            Some(rel) => {
                let anchor = cursor + rel;
                let content = anchor + section.marker().len();
                found.push((section, anchor, content));
                cursor = content;
            }
            None => sections.missing.push(section),
        }
    }

    for (i, (section, _, content_start)) in found.iter().enumerate() {
        let end = found.get(i + 1).map(|next| next.1).unwrap_or(text.len());
        *sections.slot(*section) = text[*content_start..end].trim().to_string();
    }

    sections
}

pub fn split_tags(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '，' || c == '、')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_fenced_and_commented_json_match_bare() {
        let bare = r#"{"name":"效率","count":3}"#;
        let fenced = format!("```json\n{bare}\n```");
        let commented = format!("好的，以下是结果：\n{bare}\n希望对你有帮助！");

        let expected: Sample = extract_record(bare).unwrap();
        assert_eq!(extract_record::<Sample>(&fenced).unwrap(), expected);
        assert_eq!(extract_record::<Sample>(&commented).unwrap(), expected);
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let raw = r#"note: {"name":"a } tricky \" {brace","count":1} trailing }"#;
        let parsed: Sample = extract_record(raw).unwrap();
        assert_eq!(parsed.name, "a } tricky \" {brace");
        assert_eq!(parsed.count, 1);
    }

    #[test]
    fn test_unrecoverable_text_keeps_raw() {
        let raw = "sorry, I cannot help with that";
        let err = extract_record::<Sample>(raw).unwrap_err();
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_wrong_shape_is_an_error_not_a_default() {
        let raw = r#"{"unrelated": true}"#;
        assert!(extract_record::<Sample>(raw).is_err());
    }

    #[test]
    fn test_unbalanced_object_is_an_error() {
        assert!(find_balanced_object(r#"{"name": "x", "count": 1"#).is_none());
        assert!(extract_record::<Sample>(r#"prefix {"name": "x", "count": 1"#).is_err());
    }

    #[test]
    fn test_extract_all_sections() {
        let raw = "## 标题\n打工人必备的5个AI工具\n\n## 正文\n第一段\n第二段\n\n## 图片建议\n明亮的桌面\n\n## 标签\n#AI工具 #效率，#职场";
        let sections = extract_sections(raw);

        assert!(sections.missing.is_empty());
        assert_eq!(sections.title_line(), Some("打工人必备的5个AI工具"));
        assert_eq!(sections.body, "第一段\n第二段");
        assert_eq!(sections.image_suggestions, "明亮的桌面");
        assert_eq!(sections.tag_list(), vec!["#AI工具", "#效率", "#职场"]);
    }

    #[test]
    fn test_missing_sections_are_reported() {
        let raw = "## 正文\n只有正文\n## 标签\n#a";
        let sections = extract_sections(raw);

        assert_eq!(
            sections.missing,
            vec![ContentSection::Title, ContentSection::ImageSuggestions]
        );
        assert_eq!(sections.title, "");
        assert_eq!(sections.body, "只有正文");
        assert_eq!(sections.tag_list(), vec!["#a"]);
    }

    #[test]
    fn test_no_anchors_gives_empty_sections() {
        let sections = extract_sections("just prose");
        assert_eq!(sections.missing.len(), 4);
        assert!(sections.body.is_empty());
    }
}
