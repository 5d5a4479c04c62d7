use serde::{Deserialize, Serialize};

/// Named part of the routine, supplied with the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSection {
    pub id: String,
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Read-only list of sections ordered by start time.
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    sections: Vec<VideoSection>,
}

impl SectionIndex {
    pub fn new(mut sections: Vec<VideoSection>) -> Self {
        sections.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
        Self { sections }
    }

    pub fn sections(&self) -> &[VideoSection] {
        &self.sections
    }

    pub fn get(&self, id: &str) -> Option<&VideoSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// The last section starting at or before `position`, falling back to
    /// the first section before the routine starts.
    pub fn current_at(&self, position: f64) -> Option<&VideoSection> {
        self.sections
            .iter()
            .rev()
            .find(|section| position >= section.start_secs)
            .or_else(|| self.sections.first())
    }
}

/// Formats seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
