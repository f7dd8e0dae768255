//! Template resolver: origin country → passport template versions.

use crate::catalog::{TemplateRow, DEFAULT_TEMPLATE_COUNTRY, TEMPLATE_CATALOG};
use serde::{Deserialize, Serialize};

/// One selectable passport version.
///
/// Generated fresh every time the template stage is entered; never stored in
/// the workflow context. Only the derived [`TemplateOption::template_id`] is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOption {
    /// 1-based position in the list, as a string (`"1"`, `"2"`, ...).
    pub id: String,
    pub year: String,
    pub country: String,
    /// Opaque reference to the sample image shown next to the option.
    pub image_ref: String,
}

impl TemplateOption {
    /// Canonical identifier: `lowercase(country)-passport-year`.
    pub fn template_id(&self) -> String {
        format!("{}-passport-{}", self.country.to_lowercase(), self.year)
    }
}

/// Return the template versions for `origin_country`, newest first.
///
/// Pure and deterministic. Countries without a table (including an empty
/// string) get the default catalog.
pub fn resolve_templates(origin_country: &str) -> Vec<TemplateOption> {
    let wanted = origin_country.trim();
    let Some((country, rows)) = TEMPLATE_CATALOG
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(wanted))
        .or_else(|| {
            TEMPLATE_CATALOG
                .iter()
                .find(|(c, _)| *c == DEFAULT_TEMPLATE_COUNTRY)
        })
    else {
        return Vec::new();
    };

    rows.iter()
        .enumerate()
        .map(|(i, row): (usize, &TemplateRow)| TemplateOption {
            id: (i + 1).to_string(),
            year: row.year.to_string(),
            country: country.to_string(),
            image_ref: row.image.to_string(),
        })
        .collect()
}
