//! UKRLP source records — training providers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Verification authorities ────────────────────────────────────────────────

/// Authorities under which UKRLP records verified identifiers.
pub mod authority {
  pub const URN:               &str = "DfE (Schools Unique Reference Number)";
  pub const COMPANIES_HOUSE:   &str = "Companies House";
  pub const CHARITY_COMMISSION: &str = "Charity Commission";
}

/// An identifier verified against an external authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationDetail {
  pub authority: String,
  pub id:        String,
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressStructure {
  pub address1:  Option<String>,
  pub address2:  Option<String>,
  pub address3:  Option<String>,
  pub address4:  Option<String>,
  pub town:      Option<String>,
  pub county:    Option<String>,
  pub post_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonName {
  pub title:    Option<String>,
  pub forename: Option<String>,
  pub surname:  Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderContact {
  pub contact_type:             Option<String>,
  pub contact_address:          Option<AddressStructure>,
  pub contact_personal_details: Option<PersonName>,
  pub contact_role:             Option<String>,
  pub contact_telephone1:       Option<String>,
  pub contact_telephone2:       Option<String>,
  pub contact_fax:              Option<String>,
  pub contact_website_address:  Option<String>,
  pub contact_email:            Option<String>,
  /// Source maintenance timestamp; excluded from change detection.
  pub last_updated:             Option<NaiveDate>,
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// A training provider. Natural key: UKPRN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
  pub ukprn:                      i64,
  pub provider_name:              Option<String>,
  pub accessible_provider_name:   Option<String>,
  pub provider_status:            Option<String>,
  pub provider_contacts:          Vec<ProviderContact>,
  pub verifications:              Vec<VerificationDetail>,
  /// Source verification timestamp; excluded from change detection.
  pub provider_verification_date: Option<NaiveDate>,
  /// Source expiry timestamp; excluded from change detection.
  pub expiry_date:                Option<NaiveDate>,
}

impl Provider {
  /// The first verification recorded under `authority`, compared
  /// case-insensitively.
  pub fn verification(&self, authority: &str) -> Option<&VerificationDetail> {
    self
      .verifications
      .iter()
      .find(|v| v.authority.eq_ignore_ascii_case(authority))
  }
}

// ─── Day data ────────────────────────────────────────────────────────────────

/// The full UKRLP extract for one calendar day. Empty is valid: no extract
/// was published for that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UkrlpDayData {
  pub providers: Vec<Provider>,
}
