use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Filing type used when a notice type is unknown or no description rule matches
pub const FALLBACK_FILING_TYPE: &str = "charge-filing-other";

struct FilingRule {
    description: Regex,
    filing_type: &'static str,
}

fn rules(entries: &[(&str, &'static str)]) -> Vec<FilingRule> {
    entries
        .iter()
        .map(|(pattern, filing_type)| FilingRule {
            description: Regex::new(pattern).expect("filing type pattern"),
            filing_type: *filing_type,
        })
        .collect()
}

/// Notice type -> description rules, checked in order.
///
/// A notice type with a single rule always resolves to it; with several, the
/// first rule matching the transaction description wins.
static FILING_TYPES: Lazy<HashMap<&'static str, Vec<FilingRule>>> = Lazy::new(|| {
    HashMap::from([
        ("395", rules(&[(".*", "create-charge-pre-2006-companies-act")])),
        ("410", rules(&[(".*", "create-charge-pre-2006-companies-act-scotland")])),
        ("400", rules(&[(".*", "acquire-charge-pre-2006-companies-act")])),
        ("416", rules(&[(".*", "acquire-charge-pre-2006-companies-act-scotland")])),
        (
            "403a",
            rules(&[
                ("(?i)part", "part-charge-satisfaction-pre-2006-companies-act"),
                ("(?i)full|satisf", "charge-satisfaction-pre-2006-companies-act"),
            ]),
        ),
        (
            "403b",
            rules(&[
                ("(?i)ceased", "charge-ceased-pre-2006-companies-act"),
                ("(?i)release", "charge-release-pre-2006-companies-act"),
            ]),
        ),
        (
            "419a",
            rules(&[
                ("(?i)part", "part-charge-satisfaction-pre-2006-companies-act-scotland"),
                ("(?i)full|satisf", "charge-satisfaction-pre-2006-companies-act-scotland"),
            ]),
        ),
        (
            "419b",
            rules(&[
                ("(?i)ceased", "charge-ceased-pre-2006-companies-act-scotland"),
                ("(?i)release", "charge-release-pre-2006-companies-act-scotland"),
            ]),
        ),
        ("466", rules(&[(".*", "alteration-to-floating-charge-scotland")])),
        ("MG01", rules(&[(".*", "create-charge-companies-act-2006")])),
        ("MG01s", rules(&[(".*", "create-charge-companies-act-2006-scotland")])),
        (
            "MG02",
            rules(&[
                ("(?i)part", "part-charge-satisfaction-companies-act-2006"),
                ("(?i)full|satisf", "charge-satisfaction-companies-act-2006"),
            ]),
        ),
        (
            "MG04",
            rules(&[
                ("(?i)ceased", "charge-ceased-companies-act-2006"),
                ("(?i)release", "charge-release-companies-act-2006"),
            ]),
        ),
        ("MG06", rules(&[(".*", "acquire-charge-companies-act-2006")])),
        (
            "MR01",
            rules(&[
                ("(?i)deed", "create-charge-with-deed"),
                (".*", "create-charge-2013-companies-act"),
            ]),
        ),
        ("MR02", rules(&[(".*", "acquire-charge-2013-companies-act")])),
        (
            "MR04",
            rules(&[
                ("(?i)part", "part-charge-satisfaction-2013-companies-act"),
                ("(?i)full|satisf", "charge-satisfaction-2013-companies-act"),
            ]),
        ),
        (
            "MR05",
            rules(&[
                ("(?i)ceased", "charge-ceased-2013-companies-act"),
                ("(?i)release", "charge-release-2013-companies-act"),
            ]),
        ),
        ("MR08", rules(&[(".*", "create-charge-no-instrument-2013-companies-act")])),
        ("MR09", rules(&[(".*", "acquire-charge-no-instrument-2013-companies-act")])),
        ("MR10", rules(&[(".*", "alteration-to-floating-charge-2013-companies-act")])),
    ])
});

pub fn resolve_filing_type(notice_type: Option<&str>, description: Option<&str>) -> String {
    let Some(rules) = notice_type
        .map(str::trim)
        .and_then(|notice| FILING_TYPES.get(notice))
    else {
        return FALLBACK_FILING_TYPE.to_string();
    };

    let filing_type = match rules.as_slice() {
        [only] => Some(only.filing_type),
        _ => {
            let description = description.unwrap_or_default();
            rules
                .iter()
                .find(|rule| rule.description.is_match(description))
                .map(|rule| rule.filing_type)
        }
    };

    filing_type.unwrap_or(FALLBACK_FILING_TYPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rule_notice_types_ignore_description() {
        assert_eq!(
            resolve_filing_type(Some("395"), None),
            "create-charge-pre-2006-companies-act"
        );
        assert_eq!(
            resolve_filing_type(Some("MR02"), Some("anything")),
            "acquire-charge-2013-companies-act"
        );
    }

    #[test]
    fn test_multi_rule_notice_types_match_description() {
        assert_eq!(
            resolve_filing_type(Some("MR01"), Some("REGISTRATION OF A CHARGE WITH DEED")),
            "create-charge-with-deed"
        );
        assert_eq!(
            resolve_filing_type(Some("MR01"), Some("REGISTRATION OF A CHARGE")),
            "create-charge-2013-companies-act"
        );
        assert_eq!(
            resolve_filing_type(Some("MR04"), Some("SATISFACTION OF PART OF A CHARGE")),
            "part-charge-satisfaction-2013-companies-act"
        );
        assert_eq!(
            resolve_filing_type(Some("MR04"), Some("STATEMENT OF SATISFACTION IN FULL")),
            "charge-satisfaction-2013-companies-act"
        );
    }

    #[test]
    fn test_unmatched_or_unknown_falls_back() {
        assert_eq!(
            resolve_filing_type(Some("MR05"), Some("NOTICE")),
            FALLBACK_FILING_TYPE
        );
        assert_eq!(resolve_filing_type(Some("MR05"), None), FALLBACK_FILING_TYPE);
        assert_eq!(resolve_filing_type(Some("XX99"), None), FALLBACK_FILING_TYPE);
        assert_eq!(resolve_filing_type(None, Some("deed")), FALLBACK_FILING_TYPE);
    }
}
