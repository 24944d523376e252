use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeStatus {
    Outstanding,
    FullySatisfied,
    PartSatisfied,
    Satisfied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetsCeasedReleased {
    PropertyCeasedToBelong,
    PartPropertyReleaseAndCeasedToBelong,
    PartPropertyReleased,
    PartPropertyCeasedToBelong,
    WholePropertyReleased,
    MultipleFilings,
    WholePropertyReleasedAndCeasedToBelong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationType {
    NatureOfCharge,
    ChargeDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticularsType {
    ShortParticulars,
    ChargedPropertyDescription,
    ChargedPropertyOrUndertakingDescription,
    BriefDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecuredDetailsType {
    AmountSecured,
    ObligationsSecured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub kind: ClassificationType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Particulars {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParticularsType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_fixed_charge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_floating_charge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floating_charge_covers_all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_negative_pledge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chargor_acting_as_bare_trustee: Option<bool>,
}

impl Particulars {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuredDetails {
    #[serde(rename = "type")]
    pub kind: SecuredDetailsType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScottishAlterations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_alterations_to_order: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_alterations_to_prohibitions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_restricting_provisions: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonEntitled {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub filing_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<TransactionLinks>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// The charge as the charges data api stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChargeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_ceased_released: Option<AssetsCeasedReleased>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfied_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covering_instrument_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_than_four_persons_entitled: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub persons_entitled: Vec<PersonEntitled>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particulars: Option<Particulars>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secured_details: Option<SecuredDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scottish_alterations: Option<ScottishAlterations>,
    pub transactions: Vec<Transaction>,
    pub links: ChargeLinks,
}

/// Bookkeeping sent alongside the charge so the api can discard stale deltas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalData {
    /// `{topic}-{partition}-{offset}` of the message that produced the update
    pub updated_by: String,
    pub delta_at: DateTime<Utc>,
}

/// Request body for the charges data api upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalChargeApi {
    pub external_data: ChargeRecord,
    pub internal_data: InternalData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enums_serialise_as_kebab_case() {
        assert_eq!(
            serde_json::to_value(ChargeStatus::FullySatisfied).unwrap(),
            json!("fully-satisfied")
        );
        assert_eq!(
            serde_json::to_value(AssetsCeasedReleased::WholePropertyReleasedAndCeasedToBelong)
                .unwrap(),
            json!("whole-property-released-and-ceased-to-belong")
        );
        assert_eq!(
            serde_json::to_value(ParticularsType::ChargedPropertyOrUndertakingDescription)
                .unwrap(),
            json!("charged-property-or-undertaking-description")
        );
    }

    #[test]
    fn test_links_and_empty_fields_serialisation() {
        let transaction = Transaction {
            filing_type: "create-charge-with-deed".to_string(),
            transaction_id: Some(3157908914),
            delivered_on: NaiveDate::from_ymd_opt(2023, 2, 27),
            links: None,
        };

        assert_eq!(
            serde_json::to_value(&transaction).unwrap(),
            json!({
                "filing_type": "create-charge-with-deed",
                "transaction_id": 3157908914i64,
                "delivered_on": "2023-02-27",
            })
        );
        assert_eq!(
            serde_json::to_value(ChargeLinks {
                self_link: "/company/01099198/charges/abc".to_string()
            })
            .unwrap(),
            json!({"self": "/company/01099198/charges/abc"})
        );
        assert!(Particulars::default().is_empty());
    }
}
