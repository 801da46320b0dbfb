//! Benchmark data model
//!
//! Optional fields are optional on the wire; required ones are checked by
//! the DAOs before anything is written.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wsbench_stats::CallRecord;

/// Postal address, at most six lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Address lines
    #[serde(default)]
    pub lines: Vec<String>,
    /// Postal code
    pub zip_code: Option<String>,
    /// City
    pub city: Option<String>,
    /// Country
    pub country: Option<String>,
}

/// Maximum number of stored address lines
pub const MAX_ADDRESS_LINES: usize = 6;

impl Address {
    /// Build from stored columns. Lines stop at the first missing or empty
    /// one.
    pub fn from_columns(
        zip_code: Option<String>,
        city: Option<String>,
        country: Option<String>,
        lines: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        let lines = lines
            .into_iter()
            .map_while(|line| line.filter(|l| !l.is_empty()))
            .collect();
        Self {
            lines,
            zip_code,
            city,
            country,
        }
    }

    /// Line `idx`, if present
    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(String::as_str)
    }
}

/// Phone kind, stored as a small integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneType {
    /// Fixed line (code 1)
    Landline,
    /// Mobile (code 2)
    Mobile,
}

impl PhoneType {
    /// Stored code
    pub const fn code(self) -> i16 {
        match self {
            Self::Landline => 1,
            Self::Mobile => 2,
        }
    }

    /// Decode a stored code
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Landline),
            2 => Some(Self::Mobile),
            _ => None,
        }
    }
}

/// Customer phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    /// Phone kind
    #[serde(rename = "type")]
    pub phone_type: PhoneType,
    /// Number as entered
    pub number: String,
}

impl Phone {
    /// Create a phone
    pub fn new(phone_type: PhoneType, number: impl Into<String>) -> Self {
        Self {
            phone_type,
            number: number.into(),
        }
    }
}

/// Customer with optional details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Identifier (UUID text), assigned on creation
    pub id: Option<String>,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Birth date
    pub birth_date: Option<NaiveDate>,
    /// Email address
    pub email: Option<String>,
    /// Postal address
    pub address: Option<Address>,
    /// Phone numbers
    #[serde(default)]
    pub phones: Vec<Phone>,
}

impl Customer {
    /// Listing view: identifier and names only
    pub fn summary(id: String, first_name: Option<String>, last_name: Option<String>) -> Self {
        Self {
            id: Some(id),
            first_name,
            last_name,
            ..Self::default()
        }
    }
}

/// One benchmark run as reported by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    /// Identifier, assigned on save
    pub id: Option<String>,
    /// Client CPU description
    pub client_cpu: Option<String>,
    /// Client memory description
    pub client_memory: Option<String>,
    /// Client runtime version
    #[serde(rename = "clientJvmVersion")]
    pub client_runtime_version: Option<String>,
    /// Client runtime vendor
    #[serde(rename = "clientJvmVendor")]
    pub client_runtime_vendor: Option<String>,
    /// Client OS name
    pub client_os_name: Option<String>,
    /// Client OS version
    pub client_os_version: Option<String>,
    /// Server CPU description
    pub server_cpu: Option<String>,
    /// Server memory description
    pub server_memory: Option<String>,
    /// Server runtime version
    #[serde(rename = "serverJvmVersion")]
    pub server_runtime_version: Option<String>,
    /// Server runtime vendor
    #[serde(rename = "serverJvmVendor")]
    pub server_runtime_vendor: Option<String>,
    /// Server OS name
    pub server_os_name: Option<String>,
    /// Server OS version
    pub server_os_version: Option<String>,
    /// Protocol under test
    pub protocol: Option<String>,
    /// Compression in use
    pub compression: Option<String>,
    /// Number of client threads
    #[serde(default)]
    pub nb_threads: i32,
    /// Free-form comment
    pub comment: Option<String>,
    /// Object mapper in use
    pub mapper: Option<String>,
    /// Measured calls
    #[serde(default)]
    pub calls: Vec<CallRecord>,
}
