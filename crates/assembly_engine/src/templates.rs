//! Canned document templates
//!
//! Both templates are fixed recipes over the same plan steps the element
//! interpreter uses. The letter's date and sender lines are pushed right with
//! leading spaces; the backend has no paragraph alignment primitive.

use crate::plan::Plan;
use crate::settings::TemplateSettings;
use crate::{AssemblyError, Result};
use doc_backend::FontStyle;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REPORT_TITLE_SIZE: u32 = 22;
const REPORT_META_SIZE: u32 = 14;
const REPORT_SECTION_TITLE_SIZE: u32 = 16;
const REPORT_BODY_SIZE: u32 = 12;

const LETTER_TITLE_SIZE: u32 = 16;
const LETTER_BODY_SIZE: u32 = 12;

/// Templates selectable through a spec's `specialType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Report,
    Letter,
}

impl Template {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "report" => Some(Self::Report),
            "letter" => Some(Self::Letter),
            _ => None,
        }
    }

    /// Capitalized noun used in outcome messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Report => "Report",
            Self::Letter => "Letter",
        }
    }

    /// Build the plan for this template from raw parameters
    pub fn plan(&self, params: &Value, settings: &TemplateSettings, today: &str) -> Result<Plan> {
        match self {
            Self::Report => Ok(plan_report(&decode(params)?, settings, today)),
            Self::Letter => Ok(plan_letter(&decode(params)?, settings, today)),
        }
    }
}

fn decode<T: DeserializeOwned + Default>(params: &Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    T::deserialize(params).map_err(|e| AssemblyError::validation(format!("Invalid template parameters: {}", e)))
}

/// One titled section of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub sections: Option<Vec<Section>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterParams {
    pub title: Option<String>,
    pub recipient: Option<String>,
    pub content: Option<String>,
    pub sender: Option<String>,
    pub date: Option<String>,
}

pub fn plan_report(params: &ReportParams, settings: &TemplateSettings, today: &str) -> Plan {
    let title = params.title.as_deref().unwrap_or("Report Title");
    let author = params.author.as_deref().unwrap_or("Author");
    let date = params.date.as_deref().unwrap_or(today);
    let default_sections = [Section {
        title: "Section Title".to_string(),
        content: "Section content".to_string(),
    }];
    let sections = params.sections.as_deref().unwrap_or(&default_sections);

    let mut plan = Plan::new();
    plan.font(FontStyle::sized(REPORT_TITLE_SIZE).with_bold(true))
        .line(title)
        .paragraph_break();

    plan.font(FontStyle::sized(REPORT_META_SIZE))
        .line(format!("{}{}", settings.author_label, author))
        .line(format!("{}{}", settings.date_label, date))
        .paragraph_break();

    for section in sections {
        plan.font(FontStyle::sized(REPORT_SECTION_TITLE_SIZE).with_bold(true))
            .line(section.title.as_str());
        plan.font(FontStyle::sized(REPORT_BODY_SIZE))
            .line(section.content.as_str())
            .paragraph_break();
    }
    plan
}

pub fn plan_letter(params: &LetterParams, settings: &TemplateSettings, today: &str) -> Plan {
    let title = params.title.as_deref().unwrap_or("Untitled");
    let recipient = params.recipient.as_deref().unwrap_or("Recipient");
    let content = params.content.as_deref().unwrap_or("Enter your content here.");
    let sender = params.sender.as_deref().unwrap_or("Sender");
    let date = params.date.as_deref().unwrap_or(today);
    let indent = " ".repeat(settings.letter_indent);

    let mut plan = Plan::new();
    plan.font(FontStyle::sized(LETTER_TITLE_SIZE).with_bold(true))
        .line(title)
        .paragraph_break();
    plan.font(FontStyle::sized(LETTER_BODY_SIZE))
        .line(format!("{}{}", settings.recipient_label, recipient))
        .paragraph_break();
    plan.font(FontStyle::sized(LETTER_BODY_SIZE))
        .line(content)
        .paragraph_break();
    plan.font(FontStyle::sized(LETTER_BODY_SIZE))
        .line(format!("{}{}", indent, date));
    plan.font(FontStyle::sized(LETTER_BODY_SIZE).with_bold(true))
        .text(format!("{}{}", indent, sender));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStep;
    use serde_json::json;

    #[test]
    fn test_report_defaults() {
        let plan = Template::Report
            .plan(&Value::Null, &TemplateSettings::default(), "2026-01-02")
            .unwrap();
        let texts: Vec<&str> = plan.texts().collect();
        assert_eq!(
            texts,
            vec!["Report Title", "Author: Author", "Date: 2026-01-02", "Section Title", "Section content"]
        );
        assert_eq!(plan.steps()[0], PlanStep::SetFont(FontStyle::sized(22).with_bold(true)));
    }

    #[test]
    fn test_report_sections() {
        let params = json!({
            "title": "Q3",
            "author": "Ops",
            "sections": [{ "title": "One", "content": "a" }, { "title": "Two" }]
        });
        let plan = Template::Report
            .plan(&params, &TemplateSettings::default(), "today")
            .unwrap();
        let texts: Vec<&str> = plan.texts().collect();
        assert_eq!(texts, vec!["Q3", "Author: Ops", "Date: today", "One", "a", "Two", ""]);
    }

    #[test]
    fn test_letter_indents_date_and_sender() {
        let params = json!({ "recipient": "Kim", "sender": "Lee", "date": "May 1" });
        let plan = Template::Letter
            .plan(&params, &TemplateSettings::default(), "unused")
            .unwrap();
        let texts: Vec<&str> = plan.texts().collect();
        let pad = " ".repeat(40);
        assert_eq!(texts[1], "To: Kim");
        assert_eq!(texts[3], format!("{}May 1", pad));
        assert_eq!(texts[4], format!("{}Lee", pad));
        assert_eq!(
            plan.steps().last(),
            Some(&PlanStep::Text(format!("{}Lee", pad)))
        );
    }

    #[test]
    fn test_bad_params_are_rejected() {
        let result = Template::Letter.plan(&json!({ "title": 5 }), &TemplateSettings::default(), "x");
        assert!(matches!(result, Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn test_template_names() {
        assert_eq!(Template::from_name("report"), Some(Template::Report));
        assert_eq!(Template::from_name("memo"), None);
    }
}
