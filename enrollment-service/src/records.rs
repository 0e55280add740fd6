use serde::{Deserialize, Serialize};

/// Lead registration form. Stored exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub qualification: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub course: Option<String>,
}

/// "Pay after placement" enquiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryRecord {
    pub full_name: Option<String>,
    pub mobile: Option<String>,
}

impl RegistrationRecord {
    /// Returns the wire name of the first required field that is missing.
    pub fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("firstName", &self.first_name),
            ("email", &self.email),
            ("mobile", &self.mobile),
            ("course", &self.course),
        ])
    }
}

impl EnquiryRecord {
    pub fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[("fullName", &self.full_name), ("mobile", &self.mobile)])
    }
}

fn first_missing(fields: &[(&'static str, &Option<String>)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
}
