//! GIAS source records — establishments, groups, local authorities.
//!
//! These are snapshots of the daily GIAS extract. They carry no version
//! metadata of their own; versioning is external (natural key + date).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Shared ──────────────────────────────────────────────────────────────────

/// A coded value with an optional human-readable name, as GIAS publishes
/// most of its categorical fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeNamePair {
  pub code:         Option<String>,
  pub display_name: Option<String>,
}

impl CodeNamePair {
  /// A pair carrying only a code, as built during group-link annotation.
  pub fn from_code(code: impl Into<String>) -> Self {
    Self { code: Some(code.into()), display_name: None }
  }
}

// ─── Establishment ───────────────────────────────────────────────────────────

/// A school or college. Natural key: URN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Establishment {
  pub urn:                        i64,
  pub establishment_name:         Option<String>,
  pub establishment_number:       Option<i64>,
  pub ukprn:                      Option<i64>,
  pub uprn:                       Option<String>,
  pub establishment_status:       Option<CodeNamePair>,
  pub establishment_type_group:   Option<CodeNamePair>,
  pub type_of_establishment:      Option<CodeNamePair>,
  pub phase_of_education:         Option<CodeNamePair>,
  pub gender:                     Option<CodeNamePair>,
  pub boarders:                   Option<CodeNamePair>,
  pub admissions_policy:          Option<CodeNamePair>,
  pub ofsted_rating:              Option<CodeNamePair>,
  pub ofsted_last_insp:           Option<NaiveDate>,
  pub la:                         Option<CodeNamePair>,
  /// Overwritten from the day's group links before change detection.
  pub trusts:                     Option<CodeNamePair>,
  /// Overwritten from the day's group links before change detection.
  pub federations:                Option<CodeNamePair>,
  pub companies_house_number:     Option<String>,
  pub charities_commission_number: Option<String>,
  pub open_date:                  Option<NaiveDate>,
  pub close_date:                 Option<NaiveDate>,
  pub number_of_pupils:           Option<i64>,
  pub school_capacity:            Option<i64>,
  pub statutory_low_age:          Option<i64>,
  pub statutory_high_age:         Option<i64>,
  pub percentage_fsm:             Option<f64>,
  pub street:                     Option<String>,
  pub locality:                   Option<String>,
  pub town:                       Option<String>,
  pub county:                     Option<String>,
  pub postcode:                   Option<String>,
  pub telephone_num:              Option<String>,
  pub contact_email:              Option<String>,
  pub school_website:             Option<String>,
  /// Source maintenance timestamp; excluded from change detection.
  pub last_changed_date:          Option<NaiveDate>,
}

impl Establishment {
  /// The LA code as an integer, or an error if absent or unparsable.
  pub fn la_code(&self) -> Result<i32> {
    let code = self
      .la
      .as_ref()
      .and_then(|la| la.code.as_deref())
      .ok_or_else(|| {
        Error::MalformedSource(format!("establishment {} has no LA code", self.urn))
      })?;
    code.parse().map_err(|_| {
      Error::MalformedSource(format!(
        "establishment {} has non-numeric LA code {code:?}",
        self.urn
      ))
    })
  }
}

// ─── Group ───────────────────────────────────────────────────────────────────

/// A trust or federation grouping establishments. Natural key: UID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
  pub uid:                    i64,
  pub group_name:             Option<String>,
  pub companies_house_number: Option<String>,
  pub ukprn:                  Option<i64>,
  pub group_type:             Option<String>,
  pub closed_date:            Option<NaiveDate>,
  pub status:                 Option<String>,
  pub group_street:           Option<String>,
  pub group_locality:         Option<String>,
  pub group_town:             Option<String>,
  pub group_county:           Option<String>,
  pub group_postcode:         Option<String>,
  pub head_of_group_title:    Option<String>,
  pub head_of_group_first_name: Option<String>,
  pub head_of_group_last_name: Option<String>,
}

/// An establishment ↔ group association from the day's extract. Used only to
/// annotate establishments; never snapshotted itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLink {
  pub urn:        i64,
  pub uid:        i64,
  pub group_type: Option<String>,
}

// ─── Local authority ─────────────────────────────────────────────────────────

/// A local authority. Natural key: LA code.
///
/// GIAS does not publish these as a standalone list; they are derived from
/// the day's establishments (see [`local_authorities_from_establishments`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalAuthority {
  pub code: i32,
  pub name: Option<String>,
}

impl LocalAuthority {
  /// Management-group type code local authorities carry in the registry.
  pub const MANAGEMENT_GROUP_TYPE: &'static str = "LA";
}

/// Derive the day's local-authority list by grouping establishments on LA
/// code. The first establishment's LA display name wins. Order follows first
/// appearance in the input.
pub fn local_authorities_from_establishments(
  establishments: &[Establishment],
) -> Result<Vec<LocalAuthority>> {
  let mut seen = std::collections::HashSet::new();
  let mut local_authorities = Vec::new();

  for establishment in establishments {
    let code = establishment.la_code()?;
    if seen.insert(code) {
      local_authorities.push(LocalAuthority {
        code,
        name: establishment
          .la
          .as_ref()
          .and_then(|la| la.display_name.clone()),
      });
    }
  }

  Ok(local_authorities)
}

// ─── Day data ────────────────────────────────────────────────────────────────

/// The full GIAS extract for one calendar day. Empty collections are valid:
/// no extract was published for that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GiasDayData {
  pub establishments:    Vec<Establishment>,
  pub groups:            Vec<Group>,
  pub group_links:       Vec<GroupLink>,
  pub local_authorities: Vec<LocalAuthority>,
}
