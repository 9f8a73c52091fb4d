//! Formatter registry
//!
//! Maps a variable name to the text substituted for it. Every formatter is
//! total: missing or malformed lead data degrades to a documented default
//! instead of failing generation.
//!
//! | Category           | Variables                                                  |
//! |--------------------|------------------------------------------------------------|
//! | Date               | `currentDate`, `createdAt`, `lastContactedAt`              |
//! | Currency           | `totalBudget`, `billedAmount`, `paidAmount`, `remainingBalance` |
//! | Address            | `billingAddress`                                           |
//! | Name               | `fullName`                                                 |
//! | Contact preference | `preferredContact`                                         |
//! | Scalar             | anything else, read from the lead field of the same name   |

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::models::{Address, Lead};

pub const DATE_VARIABLES: [&str; 3] = ["currentDate", "createdAt", "lastContactedAt"];
pub const CURRENCY_VARIABLES: [&str; 4] =
    ["totalBudget", "billedAmount", "paidAmount", "remainingBalance"];
pub const ADDRESS_VARIABLE: &str = "billingAddress";
pub const NAME_VARIABLE: &str = "fullName";
pub const CONTACT_PREFERENCE_VARIABLE: &str = "preferredContact";

pub const NO_ADDRESS_PLACEHOLDER: &str = "[No Address Provided]";
pub const NOT_AVAILABLE: &str = "N/A";

/// How a variable is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableCategory {
    Date,
    Currency,
    Address,
    Name,
    ContactPreference,
    Scalar,
}

impl VariableCategory {
    /// Specially formatted categories, in substitution priority order
    pub const SPECIAL: [VariableCategory; 5] = [
        VariableCategory::Date,
        VariableCategory::Currency,
        VariableCategory::Address,
        VariableCategory::Name,
        VariableCategory::ContactPreference,
    ];

    pub fn of(name: &str) -> Self {
        if DATE_VARIABLES.contains(&name) {
            VariableCategory::Date
        } else if CURRENCY_VARIABLES.contains(&name) {
            VariableCategory::Currency
        } else if name == ADDRESS_VARIABLE {
            VariableCategory::Address
        } else if name == NAME_VARIABLE {
            VariableCategory::Name
        } else if name == CONTACT_PREFERENCE_VARIABLE {
            VariableCategory::ContactPreference
        } else {
            VariableCategory::Scalar
        }
    }
}

/// Formats variables for one lead at one generation instant
pub struct Formatter<'a> {
    lead: &'a Lead,
    fields: Map<String, Value>,
    now: DateTime<Utc>,
    zone: Tz,
}

impl<'a> Formatter<'a> {
    pub fn new(lead: &'a Lead, now: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            lead,
            fields: lead.fields(),
            now,
            zone,
        }
    }

    /// Replacement text for `name`
    pub fn format(&self, name: &str) -> String {
        match VariableCategory::of(name) {
            VariableCategory::Date => format_long_date(self.date_value(name), self.zone),
            VariableCategory::Currency => format_currency(self.amount_value(name)),
            VariableCategory::Address => format_address(self.lead.billing_address.as_ref()),
            VariableCategory::Name => format_full_name(&self.lead.first_name, &self.lead.last_name),
            VariableCategory::ContactPreference => {
                format_contact_preference(self.lead.preferred_contact.as_deref())
            }
            VariableCategory::Scalar => format_scalar(self.fields.get(name)),
        }
    }

    fn date_value(&self, name: &str) -> Option<DateTime<Utc>> {
        match name {
            "currentDate" => Some(self.now),
            "createdAt" => self.lead.created_at,
            "lastContactedAt" => self.lead.last_contacted_at,
            _ => None,
        }
    }

    fn amount_value(&self, name: &str) -> Option<f64> {
        match name {
            "totalBudget" => self.lead.total_budget,
            "billedAmount" => self.lead.billed_amount.or(self.lead.total_budget),
            "paidAmount" => self.lead.paid_amount,
            "remainingBalance" => self.lead.remaining_balance,
            _ => None,
        }
    }
}

/// US dollars with two decimals and thousands separators: `$1,234.50`.
/// Cents are rounded half away from zero. Absent and non-finite amounts
/// format as zero.
pub fn format_currency(amount: Option<f64>) -> String {
    let amount = amount.filter(|a| a.is_finite()).unwrap_or(0.0);
    let cents = (amount.abs() * 100.0).round();
    let whole = format!("{:.0}", (cents / 100.0).trunc());
    let grouped = group_thousands(&whole);
    let fraction = cents % 100.0;

    if amount < 0.0 && cents > 0.0 {
        format!("-${}.{:02.0}", grouped, fraction)
    } else {
        format!("${}.{:02.0}", grouped, fraction)
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// "Month Day, Year" for the calendar day in `zone`. Absent dates render empty.
pub fn format_long_date(instant: Option<DateTime<Utc>>, zone: Tz) -> String {
    instant
        .map(|i| i.with_timezone(&zone).format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

/// Two-line postal address joined by a real newline
pub fn format_address(address: Option<&Address>) -> String {
    let Some(address) = address.filter(|a| !a.is_empty()) else {
        return NO_ADDRESS_PLACEHOLDER.to_string();
    };

    let part = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut line1 = part(&address.street);
    let apt_unit = part(&address.apt_unit);
    if !apt_unit.trim().is_empty() {
        line1.push_str(" #");
        line1.push_str(&apt_unit);
    }

    let line2 = format!(
        "{}, {} {}, {}",
        part(&address.city),
        part(&address.state),
        part(&address.zip_code),
        part(&address.country)
    );

    format!("{}\n{}", line1, line2)
}

/// First and last name joined by one space, without trimming
pub fn format_full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name)
}

pub fn format_contact_preference(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };

    match value {
        "email" => "Email".to_string(),
        "phone" => "Phone".to_string(),
        "text" => "Text Message".to_string(),
        "businessEmail" => "Business Email".to_string(),
        "businessPhone" => "Business Phone".to_string(),
        other => capitalize_first(other),
    }
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Text form of an arbitrary lead field. Absent and null become empty.
pub fn format_scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| format_scalar(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}
