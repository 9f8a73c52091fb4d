//! Substitution engine
//!
//! Replaces every token of every declared variable with its formatted value.
//! Values are resolved per category, special categories first in the order
//! given by [`VariableCategory::SPECIAL`] and scalar passthrough last. The
//! categories are disjoint, so each name has exactly one value. The content
//! is then rewritten in a single scan: text coming from the lead is never
//! matched as a token. Tokens for names outside the declared set are left
//! as is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::format::{Formatter, VariableCategory};
use crate::models::{Lead, VariableSet};
use crate::variables::{replace_placeholders, scan_placeholders};

/// Resolve `content` against `lead` for the declared `variables`
pub fn substitute(
    content: &str,
    variables: &VariableSet,
    lead: &Lead,
    now: DateTime<Utc>,
    zone: Tz,
) -> String {
    let formatter = Formatter::new(lead, now, zone);

    let passes = VariableCategory::SPECIAL
        .iter()
        .copied()
        .chain(std::iter::once(VariableCategory::Scalar));

    let mut values: HashMap<&str, String> = HashMap::with_capacity(variables.len());
    for category in passes {
        for name in variables
            .iter()
            .filter(|name| VariableCategory::of(name) == category)
        {
            values.insert(name.as_str(), formatter.format(name));
        }
    }

    replace_placeholders(content, |name| values.get(name).cloned())
}

/// Placeholders in `content` that substitution will leave untouched.
///
/// Callers log them so templates whose stored variable set is stale get
/// noticed.
pub fn undeclared_placeholders(content: &str, variables: &VariableSet) -> VariableSet {
    scan_placeholders(content)
        .difference(variables)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Address;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn declared(names: &[&str]) -> VariableSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap()
    }

    fn jane() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            total_budget: Some(1500.0),
            last_contacted_at: Some(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_greeting() {
        let content = "Hello {{fullName}}, total due {{totalBudget}}, seen {{lastContactedAt}}";
        let output = substitute(
            content,
            &declared(&["fullName", "totalBudget", "lastContactedAt"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(
            output,
            "Hello Jane Doe, total due $1,500.00, seen March 15, 2024"
        );
        assert!(scan_placeholders(&output).is_empty());
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let output = substitute(
            "{{fullName}} / {{ fullName }} / {{fullName}}",
            &declared(&["fullName"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "Jane Doe / Jane Doe / Jane Doe");
    }

    #[test]
    fn test_missing_scalar_becomes_empty() {
        let output = substitute(
            "Email: [{{businessEmail}}]",
            &declared(&["businessEmail"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "Email: []");
    }

    #[test]
    fn test_undeclared_tokens_pass_through() {
        let output = substitute(
            "{{fullName}} {{email}}",
            &declared(&["fullName"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "Jane Doe {{email}}");
        assert_eq!(
            undeclared_placeholders("{{fullName}} {{email}}", &declared(&["fullName"])),
            declared(&["email"])
        );
    }

    #[test]
    fn test_address_line_break_is_embedded_verbatim() {
        let mut lead = jane();
        lead.billing_address = Some(Address {
            street: Some("1 Main St".to_string()),
            city: Some("Austin".to_string()),
            state: Some("TX".to_string()),
            zip_code: Some("78701".to_string()),
            country: Some("USA".to_string()),
            ..Default::default()
        });
        let output = substitute(
            "Bill to:\n  {{billingAddress}}\nEnd",
            &declared(&["billingAddress"]),
            &lead,
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "Bill to:\n  1 Main St\nAustin, TX 78701, USA\nEnd");
    }

    #[test]
    fn test_dollar_signs_are_not_capture_references() {
        let mut lead = jane();
        lead.extra.insert(
            "notes".to_string(),
            serde_json::json!("costs $1 and $name"),
        );
        let output = substitute(
            "{{notes}}",
            &declared(&["notes"]),
            &lead,
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "costs $1 and $name");
    }

    #[test]
    fn test_untouched_text_is_preserved() {
        let content = "# Contract\n\n    indented {{unknown}}\r\n\ttab {{ fullName }}";
        let output = substitute(
            content,
            &declared(&["fullName"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, "# Contract\n\n    indented {{unknown}}\r\n\ttab Jane Doe");
    }

    #[test]
    fn test_declared_variable_without_tokens_is_noop() {
        let content = "Nothing to see";
        let output = substitute(
            content,
            &declared(&["paidAmount", "remainingBalance", "currentDate"]),
            &jane(),
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(output, content);
    }

    #[test]
    fn test_lead_values_are_not_substituted_again() {
        let mut lead = jane();
        lead.first_name = "{{paidAmount}}".to_string();
        lead.last_name = "{{ billingAddress }}".to_string();
        lead.billing_address = Some(Address {
            street: Some("{{fullName}}".to_string()),
            ..Default::default()
        });
        let output = substitute(
            "N={{fullName}} P={{paidAmount}} A={{billingAddress}}",
            &declared(&["fullName", "paidAmount", "billingAddress"]),
            &lead,
            fixed_now(),
            Tz::UTC,
        );
        assert_eq!(
            output,
            "N={{paidAmount}} {{ billingAddress }} P=$0.00 A={{fullName}}\n,  , "
        );
    }

    #[test]
    fn test_current_date_follows_zone() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap();
        let output = substitute(
            "{{currentDate}}",
            &declared(&["currentDate"]),
            &jane(),
            now,
            chrono_tz::America::Los_Angeles,
        );
        assert_eq!(output, "May 31, 2024");
    }
}
