//! The stage parameter model: one context carried through the whole workflow.
//!
//! Stages never mutate the context directly. Each receives a snapshot and
//! hands back a [`ContextDelta`]; the controller checks the delta against the
//! stage's write set and merges it with [`WorkflowContext::merge`].

use crate::review::ReviewRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery option chosen on the payment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    /// Instant PDF download.
    Digital,
    /// Printed copy shipped with tracking.
    Printed,
}

impl ServiceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceTier::Digital => "digital",
            ServiceTier::Printed => "printed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceTier::Digital => "Digital Download",
            ServiceTier::Printed => "Printed Version",
        }
    }
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "digital" => Ok(ServiceTier::Digital),
            "printed" | "print" => Ok(ServiceTier::Printed),
            other => Err(format!("unknown service tier '{other}' (expected digital or printed)")),
        }
    }
}

/// Names of the context fields, used for stage read/write sets and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageField {
    DocumentType,
    OriginCountry,
    OriginLanguage,
    TargetCountry,
    TargetLanguage,
    Template,
    DocumentImageRef,
    ExtractedText,
    TranslatedText,
    ReviewFields,
    ServiceTier,
}

impl StageField {
    pub fn name(self) -> &'static str {
        match self {
            StageField::DocumentType => "documentType",
            StageField::OriginCountry => "originCountry",
            StageField::OriginLanguage => "originLanguage",
            StageField::TargetCountry => "targetCountry",
            StageField::TargetLanguage => "targetLanguage",
            StageField::Template => "template",
            StageField::DocumentImageRef => "documentImageRef",
            StageField::ExtractedText => "extractedText",
            StageField::TranslatedText => "translatedText",
            StageField::ReviewFields => "reviewFields",
            StageField::ServiceTier => "serviceTier",
        }
    }
}

impl fmt::Display for StageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session-scoped parameters accumulated across stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowContext {
    pub document_type: Option<String>,
    pub origin_country: Option<String>,
    pub origin_language: Option<String>,
    pub target_country: Option<String>,
    pub target_language: Option<String>,
    pub template: Option<String>,
    /// Handle into the session's image store, never the bytes themselves.
    pub document_image_ref: Option<String>,
    pub extracted_text: Option<String>,
    pub translated_text: Option<String>,
    pub review_fields: Option<ReviewRecord>,
    pub service_tier: Option<ServiceTier>,
}

/// Fields a stage wants to set. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextDelta {
    pub document_type: Option<String>,
    pub origin_country: Option<String>,
    pub origin_language: Option<String>,
    pub target_country: Option<String>,
    pub target_language: Option<String>,
    pub template: Option<String>,
    pub document_image_ref: Option<String>,
    pub extracted_text: Option<String>,
    pub translated_text: Option<String>,
    pub review_fields: Option<ReviewRecord>,
    pub service_tier: Option<ServiceTier>,
}

impl ContextDelta {
    /// The fields this delta would actually write.
    ///
    /// Blank strings are not counted: [`WorkflowContext::merge`] ignores them.
    pub fn touched(&self) -> Vec<StageField> {
        let mut fields = Vec::new();
        let strings = [
            (&self.document_type, StageField::DocumentType),
            (&self.origin_country, StageField::OriginCountry),
            (&self.origin_language, StageField::OriginLanguage),
            (&self.target_country, StageField::TargetCountry),
            (&self.target_language, StageField::TargetLanguage),
            (&self.template, StageField::Template),
            (&self.document_image_ref, StageField::DocumentImageRef),
            (&self.extracted_text, StageField::ExtractedText),
            (&self.translated_text, StageField::TranslatedText),
        ];
        for (value, field) in strings {
            if value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
                fields.push(field);
            }
        }
        if self.review_fields.is_some() {
            fields.push(StageField::ReviewFields);
        }
        if self.service_tier.is_some() {
            fields.push(StageField::ServiceTier);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.touched().is_empty()
    }
}

impl WorkflowContext {
    /// Merge a delta into the context.
    ///
    /// Absent and blank values never replace a populated field.
    pub fn merge(&mut self, delta: ContextDelta) {
        merge_string(&mut self.document_type, delta.document_type);
        merge_string(&mut self.origin_country, delta.origin_country);
        merge_string(&mut self.origin_language, delta.origin_language);
        merge_string(&mut self.target_country, delta.target_country);
        merge_string(&mut self.target_language, delta.target_language);
        merge_string(&mut self.template, delta.template);
        merge_string(&mut self.document_image_ref, delta.document_image_ref);
        merge_string(&mut self.extracted_text, delta.extracted_text);
        merge_string(&mut self.translated_text, delta.translated_text);
        if let Some(record) = delta.review_fields {
            self.review_fields = Some(record);
        }
        if let Some(tier) = delta.service_tier {
            self.service_tier = Some(tier);
        }
    }

    /// Whether `field` holds a non-blank value.
    pub fn is_set(&self, field: StageField) -> bool {
        let text = match field {
            StageField::DocumentType => &self.document_type,
            StageField::OriginCountry => &self.origin_country,
            StageField::OriginLanguage => &self.origin_language,
            StageField::TargetCountry => &self.target_country,
            StageField::TargetLanguage => &self.target_language,
            StageField::Template => &self.template,
            StageField::DocumentImageRef => &self.document_image_ref,
            StageField::ExtractedText => &self.extracted_text,
            StageField::TranslatedText => &self.translated_text,
            StageField::ReviewFields => return self.review_fields.is_some(),
            StageField::ServiceTier => return self.service_tier.is_some(),
        };
        text.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    /// Drop every output of the loading stage.
    ///
    /// Used only by the explicit "skip with empty fields" path.
    pub(crate) fn clear_extraction(&mut self) {
        self.extracted_text = None;
        self.translated_text = None;
        self.review_fields = None;
    }
}

fn merge_string(slot: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        if !v.trim().is_empty() {
            *slot = Some(v);
        }
    }
}
