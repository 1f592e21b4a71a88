//! Output formatting and terminal rendering

use chrono::Local;
use colored::Colorize;
use redpost::{GeneratedPost, HistorySummary, PublishRecord, TitlePolarity};

/// Truncate to `max` characters, appending an ellipsis when cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Hide everything but the last four characters of a secret
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Output handler for terminal display
#[derive(Default)]
pub struct OutputHandler;

impl OutputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Print the welcome banner
    pub fn print_banner(&self) {
        println!();
        println!(
            "{}",
            "╔═══════════════════════════════════════════════════════════════╗".bright_red()
        );
        println!(
            "{}",
            "║                 Redpost - topic to published note             ║".bright_red()
        );
        println!(
            "{}",
            "╚═══════════════════════════════════════════════════════════════╝".bright_red()
        );
        println!();
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        eprintln!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    /// Print a generated post for review
    pub fn print_post(&self, post: &GeneratedPost) {
        self.print_header("Candidate titles");
        for title in &post.structure.titles {
            let marker = match title.polarity {
                TitlePolarity::Positive => "+".bright_green(),
                TitlePolarity::Negative => "-".bright_red(),
            };
            println!("  {} {}", marker, title.original);
        }

        self.print_header(&post.content.title);
        println!("{}", post.content.body);
        println!();
        println!("{}", post.content.tags.join(" ").bright_blue());

        if !post.content.image_suggestions.is_empty() {
            println!();
            println!("{} {}", "Image style:".dimmed(), post.content.image_suggestions);
        }

        self.print_header("Images");
        println!("  {} {}", "cover".bright_white(), post.images.cover());
        for (i, url) in post.images.content().iter().enumerate() {
            println!("  {} {}", format!("#{}", i + 1).bright_white(), url);
        }
        println!();
    }

    /// Print publish records table
    pub fn print_records_table(&self, records: &[PublishRecord]) {
        println!();
        println!(
            "{}",
            format!(
                "{:<10} {:<32} {:<20} {:<10} {:>8}",
                "ID", "Title", "Published", "Publisher", "Mode"
            )
            .bright_white()
            .bold()
        );
        println!("{}", "─".repeat(84).dimmed());

        for record in records {
            let id = record.id.to_string();
            let published = record
                .publish_time
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            let mode = if record.scheduled {
                "scheduled".bright_cyan()
            } else {
                "now".normal()
            };

            println!(
                "{:<10} {:<32} {:<20} {:<10} {:>8}",
                id[..8].dimmed(),
                truncate(&record.title, 30).bright_white(),
                published,
                record.publisher,
                mode
            );
            if let Some(time) = &record.scheduled_time {
                println!("{:<10} {} {}", "", "scheduled for".dimmed(), time);
            }
        }
        println!();
    }

    /// Print history summary
    pub fn print_summary(&self, summary: &HistorySummary) {
        self.print_header("Publish history summary");
        println!("  {} {}", "Total:".dimmed(), summary.total.to_string().bright_white());
        println!("  {} {}", "Immediate:".dimmed(), summary.immediate);
        println!("  {} {}", "Scheduled:".dimmed(), summary.scheduled);
        println!("  {} {}", "Private:".dimmed(), summary.private);

        if !summary.by_publisher.is_empty() {
            println!();
            for (publisher, count) in &summary.by_publisher {
                println!("  {:<12} {}", publisher.bright_white(), count);
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("短标题", 10), "短标题");
        assert_eq!(truncate("一二三四五六七八九十", 6), "一二三...");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("sk-1234567890"), "****7890");
    }
}
