//! Workflow stages and their parameter contracts.
//!
//! ```text
//! Home ─▶ DocumentType ─▶ SelectOriginDetails ─▶ UploadDocument ─▶ Template
//!                                                                     │
//!   ┌─────────────────────────────────────────────────────────────────┘
//!   ▼
//! SelectTargetDetails ─▶ Loading ─┬─▶ ReviewData ─▶ Payment ─▶ Confirmation
//!                           ▲     └─▶ ExtractionFailed ─┐
//!                           └─────────── retry ─────────┤
//!                                   skip ─▶ ReviewData ◀┘
//! ```

use crate::context::StageField;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Home,
    DocumentType,
    SelectOriginDetails,
    UploadDocument,
    Template,
    SelectTargetDetails,
    /// Extraction then translation are in flight. Not interactive.
    Loading,
    /// The last loading attempt failed; retry or skip.
    ExtractionFailed,
    ReviewData,
    Payment,
    Confirmation,
}

impl Stage {
    /// Whether the user acts in this stage (as opposed to waiting on it).
    pub fn is_interactive(self) -> bool {
        !matches!(self, Stage::Loading)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Confirmation)
    }

    /// Where back-navigation leads.
    ///
    /// `None` for the initial and terminal stages. Loading is skipped over
    /// because re-entering it would restart the external calls.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Home | Stage::Confirmation => None,
            Stage::DocumentType => Some(Stage::Home),
            Stage::SelectOriginDetails => Some(Stage::DocumentType),
            Stage::UploadDocument => Some(Stage::SelectOriginDetails),
            Stage::Template => Some(Stage::UploadDocument),
            Stage::SelectTargetDetails => Some(Stage::Template),
            Stage::Loading | Stage::ExtractionFailed | Stage::ReviewData => {
                Some(Stage::SelectTargetDetails)
            }
            Stage::Payment => Some(Stage::ReviewData),
        }
    }

    /// Context fields this stage consumes.
    pub fn reads(self) -> &'static [StageField] {
        use StageField::*;
        match self {
            Stage::Home | Stage::DocumentType => &[],
            Stage::SelectOriginDetails => &[DocumentType],
            Stage::UploadDocument => &[DocumentType, OriginCountry],
            Stage::Template => &[DocumentType, OriginCountry],
            Stage::SelectTargetDetails => &[OriginCountry, OriginLanguage],
            Stage::Loading => &[DocumentImageRef, TargetLanguage, Template, OriginCountry],
            Stage::ExtractionFailed => &[DocumentImageRef, TargetLanguage],
            Stage::ReviewData => &[ExtractedText, TranslatedText, ReviewFields],
            Stage::Payment => &[ReviewFields, Template, TargetLanguage, ServiceTier],
            Stage::Confirmation => &[ReviewFields, ServiceTier, Template],
        }
    }

    /// Context fields this stage owns and must produce before moving on.
    pub fn writes(self) -> &'static [StageField] {
        use StageField::*;
        match self {
            Stage::Home | Stage::Confirmation => &[],
            Stage::DocumentType => &[DocumentType],
            Stage::SelectOriginDetails => &[OriginCountry, OriginLanguage],
            Stage::UploadDocument => &[DocumentImageRef],
            Stage::Template => &[Template],
            Stage::SelectTargetDetails => &[TargetCountry, TargetLanguage],
            Stage::Loading | Stage::ExtractionFailed => {
                &[ExtractedText, TranslatedText, ReviewFields]
            }
            Stage::ReviewData => &[ReviewFields],
            Stage::Payment => &[ServiceTier],
        }
    }

    /// Fields that must be set before the stage's forward transition opens.
    ///
    /// A subset of [`Stage::writes`]; the upload stage may be skipped and
    /// the loading stage decides its own outcome.
    pub fn required_to_advance(self) -> &'static [StageField] {
        use StageField::*;
        match self {
            Stage::DocumentType => &[DocumentType],
            Stage::SelectOriginDetails => &[OriginCountry, OriginLanguage],
            Stage::Template => &[Template],
            Stage::SelectTargetDetails => &[TargetCountry, TargetLanguage],
            Stage::ReviewData => &[ReviewFields],
            Stage::Payment => &[ServiceTier],
            _ => &[],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
