//! Review record: the editable field set shown before payment.
//!
//! A record starts from whatever the loading stage produced and is then edited
//! by the user. The confirmation flag is the gate to payment and is dropped on
//! every edit, so a confirmed record is always one the user has seen in its
//! final form.
//!
//! ## Initial values
//!
//! Context-derived fields (document type, country of issue, language,
//! document reference) are copied from the [`WorkflowContext`]. The remaining
//! fields are filled best-effort from the OCR text:
//!
//! - the passport's machine-readable zone (ICAO 9303, TD3: two 44-character
//!   lines) gives the holder's name and the document number, accepted only when
//!   the number's check digit verifies;
//! - labelled lines ("Date of issue", "Authority", and their French, German,
//!   Italian and Spanish equivalents) give the issue date and authority.
//!
//! Whatever cannot be found stays empty for manual entry.

use crate::catalog;
use crate::context::WorkflowContext;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eight editable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewField {
    CertificateNumber,
    IssueDate,
    FullName,
    DocumentType,
    IssuingAuthority,
    CountryOfIssue,
    Language,
    DocumentReference,
}

impl ReviewField {
    pub const ALL: [ReviewField; 8] = [
        ReviewField::CertificateNumber,
        ReviewField::IssueDate,
        ReviewField::FullName,
        ReviewField::DocumentType,
        ReviewField::IssuingAuthority,
        ReviewField::CountryOfIssue,
        ReviewField::Language,
        ReviewField::DocumentReference,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ReviewField::CertificateNumber => "certificateNumber",
            ReviewField::IssueDate => "issueDate",
            ReviewField::FullName => "fullName",
            ReviewField::DocumentType => "documentType",
            ReviewField::IssuingAuthority => "issuingAuthority",
            ReviewField::CountryOfIssue => "countryOfIssue",
            ReviewField::Language => "language",
            ReviewField::DocumentReference => "documentReference",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReviewField::CertificateNumber => "Certificate Number",
            ReviewField::IssueDate => "Issue Date",
            ReviewField::FullName => "Full Name",
            ReviewField::DocumentType => "Document Type",
            ReviewField::IssuingAuthority => "Issuing Authority",
            ReviewField::CountryOfIssue => "Country of Issue",
            ReviewField::Language => "Language",
            ReviewField::DocumentReference => "Document Reference",
        }
    }
}

impl fmt::Display for ReviewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ReviewField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ReviewField::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s) || f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown review field '{s}'"))
    }
}

/// Structured, user-editable output of extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub certificate_number: String,
    pub issue_date: String,
    pub full_name: String,
    pub document_type: String,
    pub issuing_authority: String,
    pub country_of_issue: String,
    pub language: String,
    pub document_reference: String,
    pub reviewed_and_confirmed: bool,
}

impl ReviewRecord {
    /// A record with only the context-derived fields filled in.
    pub fn seeded(ctx: &WorkflowContext) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            document_type: text(&ctx.document_type),
            country_of_issue: text(&ctx.origin_country),
            language: text(&ctx.origin_language),
            document_reference: text(&ctx.template),
            ..Default::default()
        }
    }

    /// Build the initial record from the loading stage's output.
    pub fn from_extraction(
        ctx: &WorkflowContext,
        extracted: Option<&str>,
        translated: Option<&str>,
    ) -> Self {
        let mut record = Self::seeded(ctx);
        let sources: Vec<&str> = [extracted, translated].into_iter().flatten().collect();

        if let Some(mrz) = sources.iter().find_map(|s| parse_mrz(s)) {
            record.full_name = mrz.full_name;
            if let Some(number) = mrz.document_number {
                record.certificate_number = number;
            }
            if record.country_of_issue.is_empty() {
                if let Some(country) = catalog::country_for_icao(&mrz.issuing_state) {
                    record.country_of_issue = country.to_string();
                }
            }
        }

        if let Some(date) = sources
            .iter()
            .find_map(|s| labelled_value(s, ISSUE_DATE_LABELS))
            .and_then(|v| RE_DATE.find(&v).map(|m| m.as_str().to_string()))
        {
            record.issue_date = date;
        }
        if let Some(authority) = sources
            .iter()
            .find_map(|s| labelled_value(s, AUTHORITY_LABELS))
        {
            record.issuing_authority = authority;
        }

        record
    }

    pub fn get(&self, field: ReviewField) -> &str {
        match field {
            ReviewField::CertificateNumber => &self.certificate_number,
            ReviewField::IssueDate => &self.issue_date,
            ReviewField::FullName => &self.full_name,
            ReviewField::DocumentType => &self.document_type,
            ReviewField::IssuingAuthority => &self.issuing_authority,
            ReviewField::CountryOfIssue => &self.country_of_issue,
            ReviewField::Language => &self.language,
            ReviewField::DocumentReference => &self.document_reference,
        }
    }

    fn slot(&mut self, field: ReviewField) -> &mut String {
        match field {
            ReviewField::CertificateNumber => &mut self.certificate_number,
            ReviewField::IssueDate => &mut self.issue_date,
            ReviewField::FullName => &mut self.full_name,
            ReviewField::DocumentType => &mut self.document_type,
            ReviewField::IssuingAuthority => &mut self.issuing_authority,
            ReviewField::CountryOfIssue => &mut self.country_of_issue,
            ReviewField::Language => &mut self.language,
            ReviewField::DocumentReference => &mut self.document_reference,
        }
    }

    /// Replace one field. Always succeeds and always drops the confirmation.
    pub fn update_field(mut self, field: ReviewField, value: impl Into<String>) -> Self {
        *self.slot(field) = value.into();
        self.reviewed_and_confirmed = false;
        self
    }

    /// Mark the record as reviewed. Idempotent.
    pub fn confirm(mut self) -> Self {
        self.reviewed_and_confirmed = true;
        self
    }

    /// The payment gate.
    pub fn can_advance(&self) -> bool {
        self.reviewed_and_confirmed
    }

    /// Fields with no value yet.
    pub fn empty_fields(&self) -> Vec<ReviewField> {
        ReviewField::ALL
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }
}

// ── Machine-readable zone ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct MrzData {
    issuing_state: String,
    full_name: String,
    /// `None` when the check digit does not verify.
    document_number: Option<String>,
}

static RE_MRZ_LINE1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^P[A-Z<]([A-Z<]{3})([A-Z<]{30,39})$").unwrap());
static RE_MRZ_LINE2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9<]{9})([0-9])[A-Z<]{3}[0-9]{6}").unwrap());

fn parse_mrz(text: &str) -> Option<MrzData> {
    // OCR tends to insert spaces into the filler runs.
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase())
        .filter(|l| !l.is_empty())
        .collect();

    lines.windows(2).find_map(|pair| {
        let first = RE_MRZ_LINE1.captures(&pair[0])?;
        let second = RE_MRZ_LINE2.captures(&pair[1])?;

        let issuing_state = first[1].trim_end_matches('<').to_string();
        let mut names = first[2].splitn(2, "<<");
        let surname = mrz_words(names.next().unwrap_or(""));
        let given = mrz_words(names.next().unwrap_or(""));
        let full_name = [given, surname]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let raw_number = &second[1];
        let check = second[2].parse::<u32>().ok()?;
        let document_number = (mrz_check_digit(raw_number) == check)
            .then(|| raw_number.trim_end_matches('<').to_string());

        Some(MrzData {
            issuing_state,
            full_name,
            document_number,
        })
    })
}

/// `ANNA<MARIA<<<` → `Anna Maria`
fn mrz_words(raw: &str) -> String {
    raw.split('<')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// ICAO 9303 check digit: weights 7, 3, 1 over digit/letter values mod 10.
fn mrz_check_digit(field: &str) -> u32 {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    field
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let value = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'A'..='Z' => c as u32 - 'A' as u32 + 10,
                _ => 0,
            };
            value * WEIGHTS[i % 3]
        })
        .sum::<u32>()
        % 10
}

// ── Labelled lines ───────────────────────────────────────────────────────

const ISSUE_DATE_LABELS: &[&str] = &[
    "date of issue",
    "issue date",
    "date de délivrance",
    "date de delivrance",
    "ausstellungsdatum",
    "datum der ausstellung",
    "data di rilascio",
    "fecha de expedición",
    "fecha de expedicion",
];

const AUTHORITY_LABELS: &[&str] = &[
    "issuing authority",
    "authority",
    "autorité",
    "autorite",
    "behörde",
    "behorde",
    "autorità",
    "autorita",
    "autoridad",
];

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,2}[ ./-]+(?:\d{1,2}|[A-Za-zÀ-ÿ]{3,9})[ ./-]+\d{2,4}").unwrap()
});

/// Value following the last known label on a line, or on the next line when
/// the label stands alone.
fn labelled_value(text: &str, labels: &[&str]) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        let Some(end) = labels
            .iter()
            .filter_map(|label| lower.rfind(label).map(|pos| pos + label.len()))
            .max()
        else {
            continue;
        };

        // `end` indexes the lowercased copy. It only maps back onto the
        // original when case folding kept the byte lengths.
        let rest = if lower.len() == line.len() {
            line.get(end..).unwrap_or(&lower[end..])
        } else {
            &lower[end..]
        };
        let value = rest.trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '/' || c == '-');
        if !value.is_empty() {
            return Some(value.to_string());
        }
        if let Some(next) = lines[i + 1..].iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
            return Some(next.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICAO_SAMPLE: &str = "\
PASSPORT
P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<
L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    fn passport_context() -> WorkflowContext {
        WorkflowContext {
            document_type: Some("Passport".into()),
            origin_country: Some("France".into()),
            origin_language: Some("French".into()),
            template: Some("france-passport-2019".into()),
            ..Default::default()
        }
    }

    #[test]
    fn update_resets_confirmation() {
        let record = ReviewRecord::default().confirm();
        assert!(record.can_advance());

        let record = record.update_field(ReviewField::FullName, "Jean Dupont");
        assert!(!record.can_advance());
        assert_eq!(record.full_name, "Jean Dupont");

        let record = record.confirm();
        assert!(record.can_advance());
    }

    #[test]
    fn confirm_is_idempotent() {
        let once = ReviewRecord::default().confirm();
        let twice = once.clone().confirm();
        assert_eq!(once, twice);
    }

    #[test]
    fn editing_with_the_same_value_still_requires_reconfirmation() {
        let record = ReviewRecord {
            full_name: "Anna".into(),
            ..Default::default()
        }
        .confirm()
        .update_field(ReviewField::FullName, "Anna");
        assert!(!record.can_advance());
    }

    #[test]
    fn seeded_from_context() {
        let record = ReviewRecord::seeded(&passport_context());
        assert_eq!(record.document_type, "Passport");
        assert_eq!(record.country_of_issue, "France");
        assert_eq!(record.language, "French");
        assert_eq!(record.document_reference, "france-passport-2019");
        assert!(record.full_name.is_empty());
        assert!(!record.reviewed_and_confirmed);
    }

    #[test]
    fn mrz_fills_name_and_number() {
        let record = ReviewRecord::from_extraction(&passport_context(), Some(ICAO_SAMPLE), None);
        assert_eq!(record.full_name, "Anna Maria Eriksson");
        assert_eq!(record.certificate_number, "L898902C3");
        // The context wins over the MRZ issuing state.
        assert_eq!(record.country_of_issue, "France");
    }

    #[test]
    fn mrz_with_bad_check_digit_keeps_name_only() {
        let text = ICAO_SAMPLE.replace("L898902C36", "L898902C35");
        let mrz = parse_mrz(&text).expect("mrz should still be found");
        assert_eq!(mrz.document_number, None);
        assert_eq!(mrz.full_name, "Anna Maria Eriksson");
    }

    #[test]
    fn mrz_tolerates_ocr_spaces() {
        let text = "P<UTOERIKSSON<<ANNA<MARIA<<<<< <<<<<<<<<<<<<<\nL898902C3 6UTO7408122F1204159ZE184226B<<<<<10";
        let mrz = parse_mrz(text).expect("mrz");
        assert_eq!(mrz.issuing_state, "UTO");
        assert_eq!(mrz.document_number.as_deref(), Some("L898902C3"));
    }

    #[test]
    fn check_digit() {
        assert_eq!(mrz_check_digit("L898902C3"), 6);
        assert_eq!(mrz_check_digit("740812"), 2);
        assert_eq!(mrz_check_digit("120415"), 9);
    }

    #[test]
    fn labelled_issue_date_and_authority() {
        let text = "Date de délivrance / Date of issue\n12 03 2019\nAutorité / Authority: Préfecture de Paris";
        let record = ReviewRecord::from_extraction(&passport_context(), Some(text), None);
        assert_eq!(record.issue_date, "12 03 2019");
        assert_eq!(record.issuing_authority, "Préfecture de Paris");
    }

    #[test]
    fn labels_found_in_translation_when_missing_from_original() {
        let translated = "Ausstellungsdatum: 01.02.2020\nBehörde: Stadt Köln";
        let record =
            ReviewRecord::from_extraction(&passport_context(), Some("unreadable"), Some(translated));
        assert_eq!(record.issue_date, "01.02.2020");
        assert_eq!(record.issuing_authority, "Stadt Köln");
    }

    #[test]
    fn nothing_found_leaves_fields_empty() {
        let record = ReviewRecord::from_extraction(&passport_context(), Some("lorem ipsum"), None);
        let empty = record.empty_fields();
        assert!(empty.contains(&ReviewField::FullName));
        assert!(empty.contains(&ReviewField::IssueDate));
        assert!(!empty.contains(&ReviewField::DocumentType));
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("fullName".parse::<ReviewField>(), Ok(ReviewField::FullName));
        assert_eq!("Issue Date".parse::<ReviewField>(), Ok(ReviewField::IssueDate));
        assert!("nickname".parse::<ReviewField>().is_err());
    }
}
