use super::{
    assets_ceased_released, charge_status, format_as_entity_name, format_as_particulars,
    format_as_sentence, non_blank, or_flags, parse_delta_date, parse_delta_timestamp, parse_flag,
    resolve_filing_type, ChargeDelta, ChargeLinks, ChargeRecord, Classification,
    ClassificationType, IdentifierEncoder, InternalChargeApi, InternalData, Particulars,
    ParticularsType, PersonEntitled, ScottishAlterations, SecuredDetails, SecuredDetailsType,
    Transaction, TransactionLinks, TransformError,
};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Maps a raw charge delta onto the record the charges data api stores.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ChargeTransformer: Send + Sync {
    fn transform(
        &self,
        charge: &ChargeDelta,
        delta_at: Option<String>,
        updated_by: &str,
    ) -> Result<InternalChargeApi, TransformError>;
}

pub struct DeltaChargeTransformer {
    encoder: IdentifierEncoder,
}

impl DeltaChargeTransformer {
    pub fn new(encoder: IdentifierEncoder) -> Self {
        Self { encoder }
    }

    fn transactions(
        &self,
        charge: &ChargeDelta,
        company_number: &str,
    ) -> Result<Vec<Transaction>, TransformError> {
        let mut transactions = charge
            .additional_notices
            .iter()
            .map(|notice| {
                self.transaction(
                    company_number,
                    notice.notice_type.as_deref(),
                    notice.trans_id.as_deref(),
                    notice.trans_desc.as_deref(),
                    notice.delivered_on.as_deref(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        // stable, undated notices last
        transactions.sort_by(|a, b| match (a.delivered_on, b.delivered_on) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let creation = self.transaction(
            company_number,
            charge.notice_type.as_deref(),
            charge.trans_id.as_deref(),
            charge.trans_desc.as_deref(),
            charge.delivered_on.as_deref(),
        )?;
        transactions.insert(0, creation);

        Ok(transactions)
    }

    fn transaction(
        &self,
        company_number: &str,
        notice_type: Option<&str>,
        trans_id: Option<&str>,
        trans_desc: Option<&str>,
        delivered_on: Option<&str>,
    ) -> Result<Transaction, TransformError> {
        let trans_id = non_blank(trans_id);
        let transaction_id = trans_id
            .map(|id| {
                id.parse::<i64>().map_err(|_| TransformError::Mapping {
                    field: "trans_id",
                    reason: format!("{id:?} is not numeric"),
                })
            })
            .transpose()?;

        let encoded = self.encoder.encode_transaction_id(trans_id.unwrap_or_default());
        let filing = (!encoded.is_empty())
            .then(|| format!("/company/{company_number}/filing-history/{encoded}"));

        Ok(Transaction {
            filing_type: resolve_filing_type(notice_type, trans_desc),
            transaction_id,
            delivered_on: date("delivered_on", delivered_on)?,
            links: filing.map(|filing| TransactionLinks {
                filing: Some(filing),
            }),
        })
    }
}

impl ChargeTransformer for DeltaChargeTransformer {
    fn transform(
        &self,
        charge: &ChargeDelta,
        delta_at: Option<String>,
        updated_by: &str,
    ) -> Result<InternalChargeApi, TransformError> {
        let company_number = non_blank(charge.company_number.as_deref()).unwrap_or_default();
        let id = self
            .encoder
            .encode_charge_id(charge.id.as_deref().unwrap_or_default());

        let delta_at = parse_delta_timestamp(delta_at.as_deref())
            .map_err(|e| TransformError::invalid("delta_at", e))?
            .ok_or(TransformError::InvalidField {
                field: "delta_at",
                reason: "missing".to_string(),
            })?;

        let charge_number = non_blank(charge.charge_number.as_deref())
            .map(|n| {
                n.parse::<i64>().map_err(|_| TransformError::Mapping {
                    field: "charge_number",
                    reason: format!("{n:?} is not numeric"),
                })
            })
            .transpose()?;

        let record = ChargeRecord {
            charge_code: non_blank(charge.code.as_deref()).map(str::to_string),
            charge_number,
            classification: classification(charge),
            status: charge_status(charge.status.as_deref()),
            assets_ceased_released: assets_ceased_released(
                charge.assets_ceased_released.as_deref(),
            ),
            delivered_on: date("delivered_on", charge.delivered_on.as_deref())?,
            created_on: date("created_on", charge.created_on.as_deref())?,
            satisfied_on: date("satisfied_on", charge.satisfied_on.as_deref())?,
            acquired_on: date("acquired_on", charge.acquired_on.as_deref())?,
            covering_instrument_date: date(
                "covering_instrument_date",
                charge.covering_instrument_date.as_deref(),
            )?,
            resolved_on: date("resolved_on", charge.resolved_on.as_deref())?,
            more_than_four_persons_entitled: parse_flag(
                charge.more_than_four_persons_entitled.as_deref(),
            ),
            persons_entitled: charge
                .persons_entitled
                .iter()
                .filter_map(|p| non_blank(p.person.as_deref()))
                .map(|person| PersonEntitled {
                    name: format_as_entity_name(Some(person)),
                })
                .collect(),
            particulars: particulars(charge),
            secured_details: secured_details(charge),
            scottish_alterations: scottish_alterations(charge),
            transactions: self.transactions(charge, company_number)?,
            links: ChargeLinks {
                self_link: format!("/company/{company_number}/charges/{id}"),
            },
            id,
        };

        Ok(InternalChargeApi {
            external_data: record,
            internal_data: InternalData {
                updated_by: updated_by.to_string(),
                delta_at,
            },
        })
    }
}

fn date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, TransformError> {
    parse_delta_date(value).map_err(|e| TransformError::invalid(field, e))
}

fn classification(charge: &ChargeDelta) -> Option<Classification> {
    if let Some(nature) = non_blank(charge.nature_of_charge.as_deref()) {
        return Some(Classification {
            kind: ClassificationType::NatureOfCharge,
            description: format_as_sentence(Some(nature)),
        });
    }
    non_blank(charge.charge_type.as_deref()).map(|description| Classification {
        kind: ClassificationType::ChargeDescription,
        description: format_as_sentence(Some(description)),
    })
}

fn particulars(charge: &ChargeDelta) -> Option<Particulars> {
    let described = [
        (ParticularsType::ShortParticulars, &charge.short_particulars),
        (
            ParticularsType::ChargedPropertyDescription,
            &charge.charged_property_description,
        ),
        (
            ParticularsType::ChargedPropertyOrUndertakingDescription,
            &charge.charged_property_or_undertaking_description,
        ),
        (ParticularsType::BriefDescription, &charge.brief_description),
    ]
    .into_iter()
    .find_map(|(kind, text)| non_blank(text.as_deref()).map(|text| (kind, text)));

    let mut particulars = Particulars {
        kind: described.map(|(kind, _)| kind),
        description: described.and_then(|(_, text)| format_as_particulars(Some(text))),
        ..Particulars::default()
    };

    if let Some(flags) = charge.short_particular_flags.first() {
        let flag = |value: &Option<String>| parse_flag(value.as_deref());
        particulars.contains_fixed_charge =
            or_flags(flag(&flags.fixed_charge), flag(&flags.contains_fixed_charge));
        particulars.contains_floating_charge = or_flags(
            flag(&flags.floating_charge),
            flag(&flags.contains_floating_charge),
        );
        particulars.floating_charge_covers_all = flag(&flags.floating_charge_all);
        particulars.contains_negative_pledge = or_flags(
            flag(&flags.negative_pledge),
            flag(&flags.contains_negative_pledge),
        );
        particulars.chargor_acting_as_bare_trustee = or_flags(
            flag(&flags.bare_trustee),
            flag(&flags.chargor_acting_as_bare_trustee),
        );
    }

    (!particulars.is_empty()).then_some(particulars)
}

fn secured_details(charge: &ChargeDelta) -> Option<SecuredDetails> {
    let (kind, text) = match (
        non_blank(charge.amount_secured.as_deref()),
        non_blank(charge.obligations_secured.as_deref()),
    ) {
        (Some(amount), _) => (SecuredDetailsType::AmountSecured, amount),
        (None, Some(obligations)) => (SecuredDetailsType::ObligationsSecured, obligations),
        (None, None) => return None,
    };

    Some(SecuredDetails {
        kind,
        description: format_as_sentence(Some(text)),
    })
}

fn scottish_alterations(charge: &ChargeDelta) -> Option<ScottishAlterations> {
    let delta = charge.scottish_alterations.as_ref()?;
    let alterations = ScottishAlterations {
        has_alterations_to_order: parse_flag(delta.has_alterations_to_order.as_deref()),
        has_alterations_to_prohibitions: parse_flag(
            delta.has_alterations_to_prohibitions.as_deref(),
        ),
        has_restricting_provisions: parse_flag(delta.has_restricting_provisions.as_deref()),
    };

    (alterations != ScottishAlterations::default()).then_some(alterations)
}
