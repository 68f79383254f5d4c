//! Assembly settings
//!
//! Layout constants, default font sizes, template labels and output names.
//! Every section falls back to its defaults, so a settings file only needs to
//! name the values it overrides.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Settings container shared by every engine component
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblySettings {
    pub table: TableSettings,
    pub text: TextSettings,
    pub elements: ElementSettings,
    pub templates: TemplateSettings,
    pub output: OutputSettings,
}

/// Geometry of created tables, in backend units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableSettings {
    /// Width shared evenly among the columns
    pub total_width: u32,
    pub row_height: u32,
    /// Largest table a create request may ask for
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            total_width: 8000,
            row_height: 1000,
            max_rows: 10_000,
            max_cols: 1_000,
        }
    }
}

/// Freeform text formatting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextSettings {
    pub title_size: u32,
    /// Paragraph breaks after the title line
    pub title_breaks: usize,
    pub body_size: u32,
    /// Size of a level 1 heading; each further level is one point smaller
    pub heading_base_size: u32,
    pub heading_min_size: u32,
    /// Canonical prefix written in front of bullet items
    pub bullet_prefix: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            title_size: 16,
            title_breaks: 2,
            body_size: 11,
            heading_base_size: 16,
            heading_min_size: 11,
            bullet_prefix: "• ".to_string(),
        }
    }
}

impl TextSettings {
    /// Font size for a heading of the given level (1-based)
    pub fn heading_size(&self, level: usize) -> u32 {
        let step = u32::try_from(level.saturating_sub(1)).unwrap_or(u32::MAX);
        self.heading_base_size
            .saturating_sub(step)
            .max(self.heading_min_size)
    }
}

/// Defaults for declarative document elements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElementSettings {
    pub heading_size: u32,
    pub text_size: u32,
    /// Size of the leading title heading
    pub title_size: u32,
}

impl Default for ElementSettings {
    fn default() -> Self {
        Self {
            heading_size: 16,
            text_size: 10,
            title_size: 16,
        }
    }
}

/// Report and letter template settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateSettings {
    /// `chrono` format string for the default date
    pub date_format: String,
    /// Spaces written before the letter's date and sender lines
    pub letter_indent: usize,
    pub author_label: String,
    pub date_label: String,
    pub recipient_label: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            letter_indent: 40,
            author_label: "Author: ".to_string(),
            date_label: "Date: ".to_string(),
            recipient_label: "To: ".to_string(),
        }
    }
}

/// Output file names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub document_filename: String,
    pub report_filename: String,
    pub letter_filename: String,
    /// Used by a batch `save` that names no path
    pub scratch_filename: String,
    /// Directory that relative output names resolve against (current directory when unset)
    pub directory: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            document_filename: "generated_document.hwp".to_string(),
            report_filename: "report.hwp".to_string(),
            letter_filename: "letter.hwp".to_string(),
            scratch_filename: "temp_document.hwp".to_string(),
            directory: None,
        }
    }
}

impl OutputSettings {
    /// Location of the scratch file
    pub fn scratch_path(&self) -> PathBuf {
        let dir = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        dir.join(&self.scratch_filename)
    }

    /// Place a relative file name under the output directory, if one is configured
    pub fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        match &self.directory {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Loads settings from a JSON file, falling back to defaults
pub struct SettingsLoader {
    path: PathBuf,
    current: AssemblySettings,
}

impl SettingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: AssemblySettings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings from disk, or keep defaults if the file is missing or malformed
    pub fn load(&mut self) -> io::Result<&AssemblySettings> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            match serde_json::from_str::<AssemblySettings>(&content) {
                Ok(settings) => {
                    self.current = settings;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                    self.current = AssemblySettings::default();
                }
            }
        } else {
            tracing::debug!("No settings file at {}, using defaults", self.path.display());
            self.current = AssemblySettings::default();
        }
        Ok(&self.current)
    }

    /// Write the current settings as pretty JSON
    pub fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.path, content)
    }

    pub fn get(&self) -> &AssemblySettings {
        &self.current
    }

    pub fn into_settings(self) -> AssemblySettings {
        self.current
    }

    pub fn update(&mut self, settings: AssemblySettings) -> io::Result<()> {
        self.current = settings;
        self.save()
    }
}
