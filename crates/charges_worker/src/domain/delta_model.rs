use serde::{Deserialize, Deserializer, Serialize};

/// Upsert delta as published by the upstream system.
///
/// Only the first entry of `charges` is ever processed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChargesDelta {
    #[serde(default)]
    pub charges: Vec<ChargeDelta>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub delta_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChargesDeleteDelta {
    #[serde(default, deserialize_with = "lenient_string")]
    pub charges_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub delta_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChargeDelta {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub company_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub charge_number: Option<String>,
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub charge_type: Option<String>,
    pub nature_of_charge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub trans_id: Option<String>,
    pub trans_desc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub notice_type: Option<String>,

    pub delivered_on: Option<String>,
    pub created_on: Option<String>,
    pub satisfied_on: Option<String>,
    pub acquired_on: Option<String>,
    pub covering_instrument_date: Option<String>,
    pub resolved_on: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub assets_ceased_released: Option<String>,
    #[serde(rename = "more_than_4_persons_entitled", deserialize_with = "lenient_string")]
    pub more_than_four_persons_entitled: Option<String>,
    pub persons_entitled: Vec<PersonEntitledDelta>,

    pub short_particulars: Option<String>,
    pub charged_property_description: Option<String>,
    pub charged_property_or_undertaking_description: Option<String>,
    pub brief_description: Option<String>,
    pub short_particular_flags: Vec<ShortParticularFlagsDelta>,

    pub obligations_secured: Option<String>,
    pub amount_secured: Option<String>,
    pub scottish_alterations: Option<ScottishAlterationsDelta>,
    pub additional_notices: Vec<AdditionalNoticeDelta>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonEntitledDelta {
    pub person: Option<String>,
}

/// `"1"` / `"0"` flags describing the kind of security created
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ShortParticularFlagsDelta {
    #[serde(deserialize_with = "lenient_string")]
    pub fixed_charge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub contains_fixed_charge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub floating_charge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub contains_floating_charge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub floating_charge_all: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub negative_pledge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub contains_negative_pledge: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub bare_trustee: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub chargor_acting_as_bare_trustee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScottishAlterationsDelta {
    #[serde(deserialize_with = "lenient_string")]
    pub has_alterations_to_order: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub has_alterations_to_prohibitions: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub has_restricting_provisions: Option<String>,
}

/// A later filing against the charge (satisfaction, release, alteration)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdditionalNoticeDelta {
    #[serde(deserialize_with = "lenient_string")]
    pub notice_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub trans_id: Option<String>,
    pub trans_desc: Option<String>,
    pub delivered_on: Option<String>,
}

/// Codes and ids show up both as JSON strings and as bare numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(
        Option::<Lenient>::deserialize(deserializer)?.map(|value| match value {
            Lenient::Text(text) => text,
            Lenient::Number(number) => number.to_string(),
            Lenient::Flag(true) => "1".to_string(),
            Lenient::Flag(false) => "0".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialise_upsert_delta() {
        let json = r#"{
            "charges": [{
                "id": 3001283055,
                "company_number": "01099198",
                "status": 0,
                "type": "CHARGE",
                "more_than_4_persons_entitled": "1",
                "persons_entitled": [{"person": "BARCLAYS BANK PLC"}],
                "short_particular_flags": [{"fixed_charge": "1"}],
                "additional_notices": [{"notice_type": "MR04", "trans_id": 3157908914}]
            }],
            "delta_at": "20230724093435661593"
        }"#;

        let delta: ChargesDelta = serde_json::from_str(json).unwrap();
        let charge = &delta.charges[0];

        assert_eq!(charge.id.as_deref(), Some("3001283055"));
        assert_eq!(charge.status.as_deref(), Some("0"));
        assert_eq!(charge.charge_type.as_deref(), Some("CHARGE"));
        assert_eq!(charge.more_than_four_persons_entitled.as_deref(), Some("1"));
        assert_eq!(charge.persons_entitled.len(), 1);
        assert_eq!(
            charge.short_particular_flags[0].fixed_charge.as_deref(),
            Some("1")
        );
        assert_eq!(
            charge.additional_notices[0].trans_id.as_deref(),
            Some("3157908914")
        );
        assert_eq!(delta.delta_at.as_deref(), Some("20230724093435661593"));
    }

    #[test]
    fn test_deserialise_sparse_delta() {
        let delta: ChargesDelta = serde_json::from_str(r#"{"charges": [{}]}"#).unwrap();
        assert!(delta.charges[0].id.is_none());
        assert!(delta.charges[0].additional_notices.is_empty());
        assert!(delta.delta_at.is_none());

        let delete: ChargesDeleteDelta =
            serde_json::from_str(r#"{"charges_id": null, "delta_at": "20230724093435661593"}"#)
                .unwrap();
        assert!(delete.charges_id.is_none());
    }
}
