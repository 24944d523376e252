use super::{AssetsCeasedReleased, ChargeStatus, NormaliseError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y%m%d";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%6f";

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn digits_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a `yyyyMMdd` delta date. Missing or blank values are `None`.
pub fn parse_delta_date(value: Option<&str>) -> Result<Option<NaiveDate>, NormaliseError> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };

    let invalid = || NormaliseError {
        kind: "date",
        value: value.to_string(),
        expected: "yyyyMMdd",
    };

    if !digits_of_len(value, 8) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| invalid())
}

/// Parse a `yyyyMMddHHmmssSSSSSS` delta timestamp, read as UTC.
pub fn parse_delta_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, NormaliseError> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };

    let invalid = || NormaliseError {
        kind: "timestamp",
        value: value.to_string(),
        expected: "yyyyMMddHHmmssSSSSSS",
    };

    if !digits_of_len(value, 20) {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| Some(dt.and_utc()))
        .map_err(|_| invalid())
}

/// Tri-state delta flag: `"true"`/`"1"` is true, `"false"`/`"0"` false,
/// anything else unknown.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    let value = non_blank(value)?;
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// OR two tri-state flags. Unknown only when both sides are unknown.
pub fn or_flags(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (None, None) => None,
        (l, r) => Some(l.unwrap_or(false) || r.unwrap_or(false)),
    }
}

pub fn charge_status(code: Option<&str>) -> Option<ChargeStatus> {
    match non_blank(code)? {
        "0" => Some(ChargeStatus::Outstanding),
        "1" => Some(ChargeStatus::FullySatisfied),
        "2" => Some(ChargeStatus::PartSatisfied),
        "7" => Some(ChargeStatus::Satisfied),
        _ => None,
    }
}

pub fn assets_ceased_released(code: Option<&str>) -> Option<AssetsCeasedReleased> {
    use AssetsCeasedReleased::*;

    match non_blank(code)? {
        "3" => Some(PropertyCeasedToBelong),
        "4" => Some(PartPropertyReleaseAndCeasedToBelong),
        "5" => Some(PartPropertyReleased),
        "6" => Some(PartPropertyCeasedToBelong),
        "8" => Some(WholePropertyReleased),
        "9" => Some(MultipleFilings),
        "10" => Some(WholePropertyReleasedAndCeasedToBelong),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_delta_date() {
        assert_eq!(
            parse_delta_date(Some("20230227")).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 27)
        );
        assert_eq!(parse_delta_date(None).unwrap(), None);
        assert_eq!(parse_delta_date(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_parse_delta_date_rejects_malformed_values() {
        for bad in ["2023-02-27", "20231301", "20230230", "2023022", "abcdefgh"] {
            let err = parse_delta_date(Some(bad)).unwrap_err();
            assert_eq!(err.value, bad);
            assert_eq!(err.kind, "date");
        }
    }

    #[test]
    fn test_parse_delta_timestamp() {
        let ts = parse_delta_timestamp(Some("20230724093435661593"))
            .unwrap()
            .unwrap();

        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 7, 24));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 34, 35));
        assert_eq!(ts.nanosecond(), 661_593_000);
        assert_eq!(ts.to_rfc3339(), "2023-07-24T09:34:35.661593+00:00");
    }

    #[test]
    fn test_parse_delta_timestamp_rejects_malformed_values() {
        assert!(parse_delta_timestamp(Some("20230724")).is_err());
        assert!(parse_delta_timestamp(Some("2023072409343566159x")).is_err());
        assert_eq!(parse_delta_timestamp(Some("")).unwrap(), None);
    }

    #[test]
    fn test_flags() {
        assert_eq!(parse_flag(Some("1")), Some(true));
        assert_eq!(parse_flag(Some("0")), Some(false));
        assert_eq!(parse_flag(Some("true")), Some(true));
        assert_eq!(parse_flag(Some("FALSE")), Some(false));
        assert_eq!(parse_flag(Some("Y")), None);
        assert_eq!(parse_flag(None), None);

        assert_eq!(or_flags(None, None), None);
        assert_eq!(or_flags(Some(false), None), Some(false));
        assert_eq!(or_flags(None, Some(true)), Some(true));
        assert_eq!(or_flags(Some(false), Some(false)), Some(false));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(charge_status(Some("0")), Some(ChargeStatus::Outstanding));
        assert_eq!(charge_status(Some("1")), Some(ChargeStatus::FullySatisfied));
        assert_eq!(charge_status(Some("2")), Some(ChargeStatus::PartSatisfied));
        assert_eq!(charge_status(Some("7")), Some(ChargeStatus::Satisfied));
        assert_eq!(charge_status(Some("3")), None);
        assert_eq!(charge_status(None), None);
    }

    #[test]
    fn test_assets_ceased_released_codes() {
        assert_eq!(
            assets_ceased_released(Some("3")),
            Some(AssetsCeasedReleased::PropertyCeasedToBelong)
        );
        assert_eq!(
            assets_ceased_released(Some("10")),
            Some(AssetsCeasedReleased::WholePropertyReleasedAndCeasedToBelong)
        );
        assert_eq!(assets_ceased_released(Some("7")), None);
    }
}
