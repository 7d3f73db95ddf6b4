//! Structural change detection between two snapshots of the same record.
//!
//! One hand-written comparator per source type. Volatile maintenance fields
//! (source-side timestamps that churn without a real change) are omitted from
//! the comparator bodies and never contribute to changed status.

use crate::{
  gias::{CodeNamePair, Establishment, Group, LocalAuthority},
  ukrlp::{
    AddressStructure, PersonName, Provider, ProviderContact, VerificationDetail,
  },
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Structural comparison against the previous snapshot of the same record.
pub trait Delta {
  /// `true` if `self` (the current extract record) differs from `previous`
  /// in any non-volatile field.
  fn has_changed(&self, previous: &Self) -> bool;
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Nested optional record rule: both absent → unchanged; exactly one absent
/// → changed; both present → recurse.
pub fn option_delta<T: Delta>(previous: Option<&T>, current: Option<&T>) -> bool {
  match (previous, current) {
    (None, None) => false,
    (Some(p), Some(c)) => c.has_changed(p),
    _ => true,
  }
}

/// Unordered list rule: changed if the lengths differ, or if any element of
/// `current` has no element of `previous` it matches. One-directional: the
/// reverse containment is not checked beyond the length comparison.
pub fn slice_delta<T: Delta>(previous: &[T], current: &[T]) -> bool {
  if previous.len() != current.len() {
    return true;
  }
  current
    .iter()
    .any(|c| !previous.iter().any(|p| !c.has_changed(p)))
}

// ─── GIAS ────────────────────────────────────────────────────────────────────

impl Delta for CodeNamePair {
  fn has_changed(&self, previous: &Self) -> bool {
    self.code != previous.code || self.display_name != previous.display_name
  }
}

impl Delta for Establishment {
  // `last_changed_date` is volatile and deliberately not compared.
  fn has_changed(&self, previous: &Self) -> bool {
    self.urn != previous.urn
      || self.establishment_name != previous.establishment_name
      || self.establishment_number != previous.establishment_number
      || self.ukprn != previous.ukprn
      || self.uprn != previous.uprn
      || option_delta(
        previous.establishment_status.as_ref(),
        self.establishment_status.as_ref(),
      )
      || option_delta(
        previous.establishment_type_group.as_ref(),
        self.establishment_type_group.as_ref(),
      )
      || option_delta(
        previous.type_of_establishment.as_ref(),
        self.type_of_establishment.as_ref(),
      )
      || option_delta(
        previous.phase_of_education.as_ref(),
        self.phase_of_education.as_ref(),
      )
      || option_delta(previous.gender.as_ref(), self.gender.as_ref())
      || option_delta(previous.boarders.as_ref(), self.boarders.as_ref())
      || option_delta(
        previous.admissions_policy.as_ref(),
        self.admissions_policy.as_ref(),
      )
      || option_delta(previous.ofsted_rating.as_ref(), self.ofsted_rating.as_ref())
      || self.ofsted_last_insp != previous.ofsted_last_insp
      || option_delta(previous.la.as_ref(), self.la.as_ref())
      || option_delta(previous.trusts.as_ref(), self.trusts.as_ref())
      || option_delta(previous.federations.as_ref(), self.federations.as_ref())
      || self.companies_house_number != previous.companies_house_number
      || self.charities_commission_number != previous.charities_commission_number
      || self.open_date != previous.open_date
      || self.close_date != previous.close_date
      || self.number_of_pupils != previous.number_of_pupils
      || self.school_capacity != previous.school_capacity
      || self.statutory_low_age != previous.statutory_low_age
      || self.statutory_high_age != previous.statutory_high_age
      || self.percentage_fsm != previous.percentage_fsm
      || self.street != previous.street
      || self.locality != previous.locality
      || self.town != previous.town
      || self.county != previous.county
      || self.postcode != previous.postcode
      || self.telephone_num != previous.telephone_num
      || self.contact_email != previous.contact_email
      || self.school_website != previous.school_website
  }
}

impl Delta for Group {
  fn has_changed(&self, previous: &Self) -> bool {
    self.uid != previous.uid
      || self.group_name != previous.group_name
      || self.companies_house_number != previous.companies_house_number
      || self.ukprn != previous.ukprn
      || self.group_type != previous.group_type
      || self.closed_date != previous.closed_date
      || self.status != previous.status
      || self.group_street != previous.group_street
      || self.group_locality != previous.group_locality
      || self.group_town != previous.group_town
      || self.group_county != previous.group_county
      || self.group_postcode != previous.group_postcode
      || self.head_of_group_title != previous.head_of_group_title
      || self.head_of_group_first_name != previous.head_of_group_first_name
      || self.head_of_group_last_name != previous.head_of_group_last_name
  }
}

impl Delta for LocalAuthority {
  fn has_changed(&self, previous: &Self) -> bool {
    self.code != previous.code || self.name != previous.name
  }
}

// ─── UKRLP ───────────────────────────────────────────────────────────────────

impl Delta for AddressStructure {
  fn has_changed(&self, previous: &Self) -> bool {
    self.address1 != previous.address1
      || self.address2 != previous.address2
      || self.address3 != previous.address3
      || self.address4 != previous.address4
      || self.town != previous.town
      || self.county != previous.county
      || self.post_code != previous.post_code
  }
}

impl Delta for PersonName {
  fn has_changed(&self, previous: &Self) -> bool {
    self.title != previous.title
      || self.forename != previous.forename
      || self.surname != previous.surname
  }
}

impl Delta for VerificationDetail {
  fn has_changed(&self, previous: &Self) -> bool {
    self.authority != previous.authority || self.id != previous.id
  }
}

impl Delta for ProviderContact {
  // `last_updated` is volatile and deliberately not compared.
  fn has_changed(&self, previous: &Self) -> bool {
    self.contact_type != previous.contact_type
      || option_delta(
        previous.contact_address.as_ref(),
        self.contact_address.as_ref(),
      )
      || option_delta(
        previous.contact_personal_details.as_ref(),
        self.contact_personal_details.as_ref(),
      )
      || self.contact_role != previous.contact_role
      || self.contact_telephone1 != previous.contact_telephone1
      || self.contact_telephone2 != previous.contact_telephone2
      || self.contact_fax != previous.contact_fax
      || self.contact_website_address != previous.contact_website_address
      || self.contact_email != previous.contact_email
  }
}

impl Delta for Provider {
  // `provider_verification_date` and `expiry_date` are volatile and
  // deliberately not compared.
  fn has_changed(&self, previous: &Self) -> bool {
    self.ukprn != previous.ukprn
      || self.provider_name != previous.provider_name
      || self.accessible_provider_name != previous.accessible_provider_name
      || self.provider_status != previous.provider_status
      || slice_delta(&previous.provider_contacts, &self.provider_contacts)
      || slice_delta(&previous.verifications, &self.verifications)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
