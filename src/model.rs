use std::fmt;

use serde::{Deserialize, Serialize};

/// Decision label shown in a listing row's decision cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accepted,
    Rejected,
    Interview,
    #[serde(alias = "Wait listed")]
    Waitlisted,
}

impl Decision {
    /// Case-insensitive; "Wait listed" and "Waitlisted" both map to `Waitlisted`.
    pub fn from_label(label: &str) -> Option<Self> {
        let folded: String = label
            .split_whitespace()
            .collect::<String>()
            .to_lowercase();
        match folded.as_str() {
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "interview" => Some(Self::Interview),
            "waitlisted" => Some(Self::Waitlisted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Interview => "Interview",
            Self::Waitlisted => "Waitlisted",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Citizenship {
    International,
    #[serde(alias = "Domestic")]
    American,
}

impl Citizenship {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::International => "International",
            Self::American => "American",
        }
    }
}

/// One parsed result posting.
///
/// Score fields stay as the strings found in the badge text; numeric
/// coercion happens in the loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationResultEntry {
    pub program_name: String,
    pub university: String,
    pub comments: Option<String>,
    pub date_posted: Option<String>,
    pub url: String,
    pub applicant_status: Option<Decision>,
    pub accepted_date: Option<String>,
    pub rejected_date: Option<String>,
    pub start_term: Option<String>,
    pub citizenship: Option<Citizenship>,
    pub gre_score: Option<String>,
    pub gre_v: Option<String>,
    pub gre_aw: Option<String>,
    pub degree: Option<String>,
    pub gpa: Option<String>,
}

/// An entry plus the standardized names returned by the LLM service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub entry: ApplicationResultEntry,
    #[serde(
        rename = "llm-generated-university",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub llm_generated_university: Option<String>,
    #[serde(
        rename = "llm-generated-program",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub llm_generated_program: Option<String>,
}

impl EnrichedEntry {
    pub fn is_standardized(&self) -> bool {
        self.llm_generated_university.is_some() || self.llm_generated_program.is_some()
    }
}

impl From<ApplicationResultEntry> for EnrichedEntry {
    fn from(entry: ApplicationResultEntry) -> Self {
        Self {
            entry,
            llm_generated_university: None,
            llm_generated_program: None,
        }
    }
}
