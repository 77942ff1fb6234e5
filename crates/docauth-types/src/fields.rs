//! # Document Fields
//!
//! Field values the engine extracted from the evidence. The wire form is a
//! flat JSON object; locally it splits into recognised keys with typed values
//! ([`FieldKey`] → [`FieldData`]) and an `unknown` bucket for everything the
//! schema does not name yet, since document layouts vary by issuer.
//!
//! Expected keys per document type are listed by [`DocumentKind::expected_keys`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

macro_rules! field_keys {
    ($($(#[$doc:meta])* $variant:ident => $name:literal),* $(,)?) => {
        /// Field names this client recognises.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum FieldKey {
            $($(#[$doc])* $variant,)*
        }

        impl FieldKey {
            /// Every recognised key.
            pub const ALL: &'static [FieldKey] = &[$(FieldKey::$variant,)*];

            /// Wire name of the key.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(FieldKey::$variant => $name,)*
                }
            }

            /// Look up a key by wire name.
            pub fn parse(name: &str) -> Option<FieldKey> {
                match name {
                    $($name => Some(FieldKey::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

field_keys! {
    /// Free-text document type as reported by the engine.
    DocumentType => "documentType",
    FirstName => "firstName",
    MiddleName => "middleName",
    LastName => "lastName",
    FullName => "fullName",
    DateOfBirth => "dateOfBirth",
    Gender => "gender",
    Address => "address",
    City => "city",
    /// Issuing state or province.
    State => "state",
    PostalCode => "postalCode",
    Country => "country",
    IssuingCountry => "issuingCountry",
    Nationality => "nationality",
    DocumentNumber => "documentNumber",
    IssueDate => "issueDate",
    ExpirationDate => "expirationDate",
    LicenseClass => "licenseClass",
    Restrictions => "restrictions",
    Endorsements => "endorsements",
    EyeColor => "eyeColor",
    HairColor => "hairColor",
    Height => "height",
    Weight => "weight",
    IsOrganDonor => "isOrganDonor",
    IsVeteran => "isVeteran",
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of a recognised field.
///
/// Untagged: the first variant that accepts the JSON value wins, so ISO
/// dates become [`FieldData::Date`] and any other string stays text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldData {
    Boolean(bool),
    Integer(i64),
    Date(NaiveDate),
    Text(String),
}

impl FieldData {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldData::Date(d) => Some(*d),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldData::Boolean(b) => Value::Bool(*b),
            FieldData::Integer(i) => Value::from(*i),
            FieldData::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldData::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldData::Boolean(b) => write!(f, "{b}"),
            FieldData::Integer(i) => write!(f, "{i}"),
            FieldData::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldData::Text(s) => f.write_str(s),
        }
    }
}

/// Broad document family, used to decide which keys to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    DriverLicense,
    Passport,
    IdCard,
    Unknown,
}

impl DocumentKind {
    /// Classify the engine's free-text document type.
    pub fn from_type_text(text: &str) -> DocumentKind {
        let normalized: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "dl" | "driverlicense" | "driverslicense" | "driverlicence" => {
                DocumentKind::DriverLicense
            }
            "passport" | "p" => DocumentKind::Passport,
            "id" | "idcard" | "identitycard" | "nationalid" => DocumentKind::IdCard,
            _ => DocumentKind::Unknown,
        }
    }

    /// Keys an engine normally returns for this kind of document.
    pub fn expected_keys(&self) -> &'static [FieldKey] {
        use FieldKey::*;
        match self {
            DocumentKind::DriverLicense => &[
                FirstName,
                LastName,
                DateOfBirth,
                Address,
                City,
                State,
                PostalCode,
                DocumentNumber,
                IssueDate,
                ExpirationDate,
                LicenseClass,
            ],
            DocumentKind::Passport => &[
                FirstName,
                LastName,
                DateOfBirth,
                Gender,
                Nationality,
                IssuingCountry,
                DocumentNumber,
                ExpirationDate,
            ],
            DocumentKind::IdCard => &[
                FirstName,
                LastName,
                DateOfBirth,
                IssuingCountry,
                DocumentNumber,
                ExpirationDate,
            ],
            DocumentKind::Unknown => &[],
        }
    }
}

/// Extracted document fields: recognised keys plus an unknown bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct DocumentFields {
    known: BTreeMap<FieldKey, FieldData>,
    unknown: BTreeMap<String, Value>,
}

impl DocumentFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldData> {
        self.known.get(&key)
    }

    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.get(key).and_then(FieldData::as_text)
    }

    pub fn date(&self, key: FieldKey) -> Option<NaiveDate> {
        self.get(key).and_then(FieldData::as_date)
    }

    pub fn insert(&mut self, key: FieldKey, data: FieldData) -> Option<FieldData> {
        self.known.insert(key, data)
    }

    /// Store a field outside the recognised schema.
    ///
    /// A name that is actually recognised is routed to the typed map when
    /// its value fits; otherwise it lands in the unknown bucket.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_null() {
            return;
        }
        if let Some(key) = FieldKey::parse(&name) {
            if let Ok(data) = serde_json::from_value::<FieldData>(value.clone()) {
                self.known.insert(key, data);
                return;
            }
        }
        self.unknown.insert(name, value);
    }

    pub fn known(&self) -> &BTreeMap<FieldKey, FieldData> {
        &self.known
    }

    pub fn unknown(&self) -> &BTreeMap<String, Value> {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.known.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.unknown.is_empty()
    }

    /// Kind derived from the `documentType` field.
    pub fn document_kind(&self) -> DocumentKind {
        self.text(FieldKey::DocumentType)
            .map(DocumentKind::from_type_text)
            .unwrap_or(DocumentKind::Unknown)
    }

    /// Expected keys for [`document_kind`](Self::document_kind) that are absent.
    pub fn missing_keys(&self) -> Vec<FieldKey> {
        self.document_kind()
            .expected_keys()
            .iter()
            .copied()
            .filter(|k| !self.known.contains_key(k))
            .collect()
    }
}

impl From<BTreeMap<String, Value>> for DocumentFields {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let mut fields = DocumentFields::default();
        for (name, value) in map {
            fields.insert_raw(name, value);
        }
        fields
    }
}

impl From<DocumentFields> for BTreeMap<String, Value> {
    fn from(fields: DocumentFields) -> Self {
        let mut map = fields.unknown;
        for (key, data) in &fields.known {
            map.insert(key.as_str().to_string(), data.to_json());
        }
        map
    }
}
