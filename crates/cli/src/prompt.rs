//! Interactive terminal input
//!
//! Collects the topic request and answers the preview gate's questions.

use anyhow::Result;
use colored::Colorize;
use redpost::preview::PreviewArtifact;
use redpost::{GenerationInput, RedpostError, ReviewPrompt, ScheduleAnswer};
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor};

use crate::output::OutputHandler;

fn readline_error(e: ReadlineError) -> RedpostError {
    RedpostError::IoError(std::io::Error::other(e.to_string()))
}

/// Accept the usual yes answers, including the Chinese ones
pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "确认" | "好"
    )
}

/// Split a comma list, accepting full-width commas
pub fn split_accounts(line: &str) -> Vec<String> {
    line.split([',', '，'])
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map a schedule-time line; Ctrl-C / Ctrl-D (`None`) backs out
pub fn schedule_answer(line: Option<String>) -> ScheduleAnswer {
    match line {
        None => ScheduleAnswer::Abort,
        Some(line) if line.trim().is_empty() => ScheduleAnswer::Now,
        Some(line) => ScheduleAnswer::At(line),
    }
}

pub struct TerminalPrompt {
    editor: Editor<(), DefaultHistory>,
    output: OutputHandler,
}

impl TerminalPrompt {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: Editor::new()?,
            output: OutputHandler::new(),
        })
    }

    /// `Ok(None)` on Ctrl-C / Ctrl-D
    fn read(&mut self, prompt: &str) -> std::result::Result<Option<String>, ReadlineError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed.as_str());
                }
                Ok(Some(trimmed))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ask for every field the command line left out
    pub fn collect_input(&mut self, mut input: GenerationInput) -> Result<Option<GenerationInput>> {
        if input.topic.trim().is_empty() {
            loop {
                let Some(topic) = self.read(&format!("{} ", "Topic:".bright_cyan()))? else {
                    return Ok(None);
                };
                if !topic.is_empty() {
                    input.topic = topic;
                    break;
                }
                self.output.print_warning("The topic cannot be empty");
            }

            if input.accounts.is_none() {
                let prompt = format!(
                    "{} ",
                    "Accounts (comma separated, enter for default):".bright_cyan()
                );
                let Some(line) = self.read(&prompt)? else {
                    return Ok(None);
                };
                let accounts = split_accounts(&line);
                if !accounts.is_empty() {
                    input.accounts = Some(accounts);
                }
            }

            if input.word_count.is_none() {
                loop {
                    let prompt = format!("{} ", "Word count (enter for 600):".bright_cyan());
                    let Some(line) = self.read(&prompt)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        break;
                    }
                    match line.parse::<u32>() {
                        Ok(n) if n > 0 => {
                            input.word_count = Some(n);
                            break;
                        }
                        _ => self.output.print_warning("Enter a positive number"),
                    }
                }
            }

            if input.context.is_none() {
                let prompt = format!("{} ", "Background (optional):".bright_cyan());
                let Some(line) = self.read(&prompt)? else {
                    return Ok(None);
                };
                if !line.is_empty() {
                    input.context = Some(line);
                }
            }
        }

        Ok(Some(input))
    }
}

impl ReviewPrompt for TerminalPrompt {
    fn confirm(&mut self, artifact: &PreviewArtifact) -> redpost::Result<bool> {
        self.output
            .print_info(&format!("Preview: {}", artifact.path.display()));
        let prompt = format!("{} ", "Publish this note? [y/N]:".bright_yellow());
        match self.read(&prompt).map_err(readline_error)? {
            Some(answer) => Ok(is_yes(&answer)),
            None => Ok(false),
        }
    }

    fn schedule_time(&mut self) -> redpost::Result<ScheduleAnswer> {
        let prompt = format!(
            "{} ",
            "Schedule time (YYYY-MM-DD HH:mm:ss, enter to publish now, Ctrl-C to cancel):"
                .bright_yellow()
        );
        let line = self.read(&prompt).map_err(readline_error)?;
        Ok(schedule_answer(line))
    }

    fn reject_schedule_time(&mut self, input: &str, error: &RedpostError) {
        self.output
            .print_warning(&format!("'{}' was not accepted: {}", input, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(is_yes("是"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }

    #[test]
    fn test_schedule_answer_interrupt_aborts() {
        assert_eq!(schedule_answer(None), ScheduleAnswer::Abort);
        assert_eq!(schedule_answer(Some(String::new())), ScheduleAnswer::Now);
        assert_eq!(
            schedule_answer(Some("2026-11-01 09:00:00".to_string())),
            ScheduleAnswer::At("2026-11-01 09:00:00".to_string())
        );
    }

    #[test]
    fn test_split_accounts() {
        assert_eq!(
            split_accounts("效率闺蜜， 职场笔记,,"),
            vec!["效率闺蜜".to_string(), "职场笔记".to_string()]
        );
        assert!(split_accounts("  ").is_empty());
    }
}
