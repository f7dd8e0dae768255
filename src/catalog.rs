//! Fixed lookup tables: document types, languages, countries and passport
//! template versions.
//!
//! Everything country-specific is data here rather than branching in the
//! stage logic, so adding a country means adding a row.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only document type with an implemented workflow.
pub const PASSPORT: &str = "Passport";

/// Document types offered on the document-type stage, in display order.
pub const DOCUMENT_TYPES: &[&str] = &[
    PASSPORT,
    "Marriage Certificate",
    "Birth Certificate",
    "Academic Transcript",
    "Diploma",
    "Legal Contract",
    "Medical Record",
    "Driver's License",
];

/// Look up a document type by name (case-insensitive), returning its canonical spelling.
pub fn find_document_type(name: &str) -> Option<&'static str> {
    let name = name.trim();
    DOCUMENT_TYPES
        .iter()
        .copied()
        .find(|d| d.eq_ignore_ascii_case(name))
}

/// Languages a document can be translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    German,
    French,
    English,
    Spanish,
    Italian,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::German,
        Language::French,
        Language::English,
        Language::Spanish,
        Language::Italian,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::German => "German",
            Language::French => "French",
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::Italian => "Italian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    /// Only catalog names are accepted; ISO codes such as `de` are not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Language::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownLanguage(s.to_string()))
    }
}

/// A country row: display name, default language, ICAO 9303 issuing-state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    pub language: Language,
    pub icao_code: &'static str,
}

pub const COUNTRIES: &[Country] = &[
    Country { name: "Germany", language: Language::German, icao_code: "D" },
    Country { name: "France", language: Language::French, icao_code: "FRA" },
    Country { name: "United Kingdom", language: Language::English, icao_code: "GBR" },
    Country { name: "United States", language: Language::English, icao_code: "USA" },
    Country { name: "Spain", language: Language::Spanish, icao_code: "ESP" },
    Country { name: "Italy", language: Language::Italian, icao_code: "ITA" },
];

/// Look up a country by display name (case-insensitive).
pub fn find_country(name: &str) -> Option<&'static Country> {
    let name = name.trim();
    COUNTRIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// The language selected automatically when a country is picked.
pub fn default_language(country: &str) -> Option<Language> {
    find_country(country).map(|c| c.language)
}

/// Resolve an MRZ issuing-state code (`FRA`, `D<<`, `DEU`, ...) to a country name.
pub fn country_for_icao(code: &str) -> Option<&'static str> {
    let code = code.trim_end_matches('<');
    // Germany prints `D` in the MRZ, but `DEU` appears in some readers' output.
    if code == "DEU" {
        return Some("Germany");
    }
    COUNTRIES.iter().find(|c| c.icao_code == code).map(|c| c.name)
}

/// One row of the passport template table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRow {
    pub year: &'static str,
    pub image: &'static str,
}

/// Passport template versions per origin country, newest first.
pub const TEMPLATE_CATALOG: &[(&str, &[TemplateRow])] = &[
    (
        "Italy",
        &[
            TemplateRow { year: "2023", image: "images/Itly2023.jpg" },
            TemplateRow { year: "2012", image: "images/Itly2012.jpg" },
            TemplateRow { year: "2006", image: "images/Itly2006.jpeg" },
        ],
    ),
    (
        "Germany",
        &[
            TemplateRow { year: "2024", image: "images/German2024.jpg" },
            TemplateRow { year: "2017", image: "images/German2017.jpeg" },
            TemplateRow { year: "2014", image: "images/German2014.jpeg" },
            TemplateRow { year: "2007", image: "images/German2007.jpeg" },
        ],
    ),
    (
        "France",
        &[
            TemplateRow { year: "2019", image: "images/pass2019.jpg" },
            TemplateRow { year: "2013", image: "images/pass2013.jpg" },
            TemplateRow { year: "2008", image: "images/pass2008.jpeg" },
            TemplateRow { year: "2006", image: "images/pass2006.jpeg" },
        ],
    ),
];

/// Catalog used for origin countries without their own template table.
pub const DEFAULT_TEMPLATE_COUNTRY: &str = "France";
