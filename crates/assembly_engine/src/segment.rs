//! Freeform text segmentation
//!
//! Input is split into blocks of non-blank lines. Each block is classified by
//! its first line only:
//!
//! - `#`, `##`, ... starts a heading, sized by level
//! - `-`, `*` or `•` starts a bullet list
//! - anything else is a paragraph, either line-preserving or joined
//!
//! Blocks keep their input order, and blank-line boundaries are never merged.

use crate::plan::Plan;
use crate::settings::TextSettings;
use crate::{AssemblyError, Result};
use doc_backend::FontStyle;

const BULLET_MARKERS: [char; 3] = ['-', '*', '•'];

/// A classified block of input lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    Heading {
        level: usize,
        text: String,
        body: Vec<String>,
    },
    BulletList(Vec<String>),
    LinebreakPreserved(Vec<String>),
    PlainParagraph(Vec<String>),
}

impl TextBlock {
    /// Classify a non-empty block by its first line
    pub fn classify(lines: Vec<String>, preserve_linebreaks: bool) -> Self {
        let first = lines.first().map(|l| l.trim()).unwrap_or_default();
        if first.starts_with('#') {
            let level = first.chars().take_while(|c| *c == '#').count();
            let text = first[level..].trim().to_string();
            let body = lines.into_iter().skip(1).collect();
            TextBlock::Heading { level, text, body }
        } else if first.starts_with(BULLET_MARKERS) {
            TextBlock::BulletList(lines)
        } else if preserve_linebreaks {
            TextBlock::LinebreakPreserved(lines)
        } else {
            TextBlock::PlainParagraph(lines)
        }
    }
}

/// Options for turning freeform text into a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Explicit title; when absent the first line is promoted to title
    pub title: Option<String>,
    /// Apply heading/bullet heuristics; otherwise insert every line verbatim
    pub format_content: bool,
    pub preserve_linebreaks: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            title: None,
            format_content: true,
            preserve_linebreaks: true,
        }
    }
}

/// Group lines into blocks separated by one or more blank lines
pub fn split_blocks(content: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Title plus classified blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmented {
    pub title: Option<String>,
    pub blocks: Vec<TextBlock>,
}

/// Split and classify `content`
pub fn segment(content: &str, options: &TextOptions) -> Segmented {
    let mut raw = split_blocks(content);
    let mut title = options.title.clone().filter(|t| !t.is_empty());

    if title.is_none() && !raw.is_empty() {
        let first_block = &mut raw[0];
        title = Some(first_block.remove(0));
        if first_block.is_empty() {
            raw.remove(0);
        }
    }

    let blocks = raw
        .into_iter()
        .map(|lines| TextBlock::classify(lines, options.preserve_linebreaks))
        .collect();
    Segmented {
        title,
        blocks,
    }
}

/// Strip a bullet marker and re-prefix with the canonical one
fn bullet_line(line: &str, prefix: &str) -> String {
    let stripped = line.trim();
    let mut chars = stripped.chars();
    match chars.next() {
        Some(c) if BULLET_MARKERS.contains(&c) => format!("{}{}", prefix, chars.as_str().trim()),
        _ => stripped.to_string(),
    }
}

/// Build the insert plan for a freeform text document
pub fn plan_text(content: &str, options: &TextOptions, settings: &TextSettings) -> Result<Plan> {
    if content.is_empty() {
        return Err(AssemblyError::validation("Document content is required"));
    }
    let segmented = segment(content, options);
    let body_font = FontStyle::sized(settings.body_size);
    let mut plan = Plan::new();

    if let Some(title) = &segmented.title {
        plan.font(FontStyle::sized(settings.title_size).with_bold(true))
            .text(title.clone())
            .breaks(settings.title_breaks);
    }

    // Verbatim mode inserts every input line, the title line included
    if !options.format_content {
        plan.font(body_font);
        for line in content.split('\n') {
            if !line.trim().is_empty() {
                plan.text(line);
            }
            plan.paragraph_break();
        }
        tracing::debug!("Planned {} verbatim steps", plan.len());
        return Ok(plan);
    }

    for block in segmented.blocks {
        match block {
            TextBlock::Heading { level, text, body } => {
                plan.font(FontStyle::sized(settings.heading_size(level)).with_bold(true))
                    .line(text);
                if !body.is_empty() {
                    plan.font(body_font.clone());
                    for line in body {
                        plan.line(line);
                    }
                }
            }
            TextBlock::BulletList(lines) => {
                plan.font(body_font.clone());
                for line in lines {
                    plan.line(bullet_line(&line, &settings.bullet_prefix));
                }
            }
            TextBlock::LinebreakPreserved(lines) => {
                plan.font(body_font.clone());
                for line in lines {
                    plan.line(line);
                }
            }
            TextBlock::PlainParagraph(lines) => {
                plan.font(body_font.clone()).line(lines.join("\n"));
            }
        }
        plan.paragraph_break();
    }
    tracing::debug!("Planned {} steps for formatted text", plan.len());
    Ok(plan)
}

/// Insert plan for a single text run, splitting on real or escaped newlines
pub fn plan_lines(text: &str, preserve_linebreaks: bool) -> Plan {
    let mut plan = Plan::new();
    if preserve_linebreaks && (text.contains('\n') || text.contains("\\n")) {
        let normalized = text.replace("\\n", "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            plan.text(*line);
            if i + 1 < lines.len() {
                plan.paragraph_break();
            }
        }
    } else {
        plan.text(text);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStep;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_blocks_collapses_blank_runs() {
        let blocks = split_blocks("a\nb\n\n\n  \nc\n");
        assert_eq!(blocks, vec![lines(&["a", "b"]), lines(&["c"])]);
    }

    #[test]
    fn test_classify_heading() {
        let block = TextBlock::classify(lines(&["### Deep  ", "body"]), true);
        assert_eq!(
            block,
            TextBlock::Heading {
                level: 3,
                text: "Deep".into(),
                body: lines(&["body"])
            }
        );
    }

    #[test]
    fn test_classify_by_first_line_only() {
        assert!(matches!(
            TextBlock::classify(lines(&["  - item", "plain"]), true),
            TextBlock::BulletList(_)
        ));
        assert!(matches!(
            TextBlock::classify(lines(&["plain", "- item"]), false),
            TextBlock::PlainParagraph(_)
        ));
        assert!(matches!(
            TextBlock::classify(lines(&["plain"]), true),
            TextBlock::LinebreakPreserved(_)
        ));
    }

    #[test]
    fn test_first_line_becomes_title() {
        let seg = segment("My Title\nfirst body\n\nnext", &TextOptions::default());
        assert_eq!(seg.title.as_deref(), Some("My Title"));
        assert_eq!(seg.blocks.len(), 2);
    }

    #[test]
    fn test_single_line_title_block_is_dropped() {
        let seg = segment("Only Title\n\nbody", &TextOptions::default());
        assert_eq!(seg.blocks, vec![TextBlock::LinebreakPreserved(lines(&["body"]))]);
    }

    #[test]
    fn test_explicit_title_keeps_first_line() {
        let options = TextOptions {
            title: Some("Given".into()),
            ..TextOptions::default()
        };
        let seg = segment("line one", &options);
        assert_eq!(seg.title.as_deref(), Some("Given"));
        assert_eq!(seg.blocks.len(), 1);
    }

    #[test]
    fn test_bullet_canonicalization() {
        assert_eq!(bullet_line("- a", "• "), "• a");
        assert_eq!(bullet_line("  *b ", "• "), "• b");
        assert_eq!(bullet_line("• c", "• "), "• c");
        assert_eq!(bullet_line("  plain ", "• "), "plain");
    }

    #[test]
    fn test_heading_plan() {
        let options = TextOptions {
            title: Some("T".into()),
            ..TextOptions::default()
        };
        let plan = plan_text("# Title\nBody", &options, &TextSettings::default()).unwrap();
        let steps = plan.steps();
        assert!(steps.contains(&PlanStep::SetFont(FontStyle::sized(16).with_bold(true))));
        assert!(steps.contains(&PlanStep::Text("Title".into())));
        assert!(steps.contains(&PlanStep::SetFont(FontStyle::sized(11))));
        assert!(steps.contains(&PlanStep::Text("Body".into())));
    }

    #[test]
    fn test_plain_paragraph_is_joined() {
        let options = TextOptions {
            title: Some("T".into()),
            preserve_linebreaks: false,
            ..TextOptions::default()
        };
        let plan = plan_text("one\ntwo", &options, &TextSettings::default()).unwrap();
        assert!(plan.texts().any(|t| t == "one\ntwo"));
    }

    #[test]
    fn test_verbatim_mode_skips_heuristics() {
        let options = TextOptions {
            format_content: false,
            ..TextOptions::default()
        };
        let plan = plan_text("Title\n# not heading\n\n- raw", &options, &TextSettings::default()).unwrap();
        let texts: Vec<&str> = plan.texts().collect();
        assert_eq!(texts, vec!["Title", "Title", "# not heading", "- raw"]);

        let breaks = plan
            .steps()
            .iter()
            .filter(|s| **s == PlanStep::ParagraphBreak)
            .count();
        // two after the title, then one per input line
        assert_eq!(breaks, 2 + 4);
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let result = plan_text("", &TextOptions::default(), &TextSettings::default());
        assert!(matches!(result, Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn test_plan_lines_splits_escaped_newlines() {
        let plan = plan_lines("a\\nb\nc", true);
        assert_eq!(plan.texts().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(plan.len(), 5);

        let plan = plan_lines("a\\nb", false);
        assert_eq!(plan.texts().collect::<Vec<_>>(), vec!["a\\nb"]);
    }
}
