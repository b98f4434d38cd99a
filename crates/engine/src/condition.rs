//! Condition evaluation.
//!
//! Pure functions over a [`ConditionGroup`] and the event payload. Nothing in
//! here can fail: a missing field or an operand of the wrong type makes the
//! leaf condition `false`, so malformed data never produces a match.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use serde_json::Value;
use tracing::debug;

use crate::models::{Condition, ConditionGroup, ConditionOperator, LogicalOperator};

/// Evaluate a condition group against `context`.
///
/// `AND` stops at the first false leaf and is vacuously true when empty;
/// `OR` stops at the first true leaf and is false when empty.
pub fn evaluate(group: &ConditionGroup, context: &Value) -> bool {
    match group.operator {
        LogicalOperator::And => group.conditions.iter().all(|c| evaluate_condition(c, context)),
        LogicalOperator::Or => group.conditions.iter().any(|c| evaluate_condition(c, context)),
    }
}

/// Evaluate a single leaf condition.
pub fn evaluate_condition(condition: &Condition, context: &Value) -> bool {
    let Some(actual) = lookup(context, &condition.field) else {
        debug!(field = %condition.field, "condition field missing, treating as false");
        return false;
    };

    match apply(condition.operator, actual, &condition.value) {
        Some(matched) => matched,
        None => {
            debug!(
                field = %condition.field,
                operator = ?condition.operator,
                "condition operands incompatible, treating as false"
            );
            false
        }
    }
}

/// Resolve a dotted path (`merchant.name`, `lines.0.amount`) inside `context`.
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// `None` means the operands don't fit the operator.
fn apply(op: ConditionOperator, actual: &Value, expected: &Value) -> Option<bool> {
    use ConditionOperator::*;

    match op {
        Eq => Some(loosely_equal(actual, expected)),
        Neq => Some(!loosely_equal(actual, expected)),

        Gt => compare_numbers(actual, expected, |a, b| a > b),
        Gte => compare_numbers(actual, expected, |a, b| a >= b),
        Lt => compare_numbers(actual, expected, |a, b| a < b),
        Lte => compare_numbers(actual, expected, |a, b| a <= b),

        Contains => contains(actual, expected),
        NotContains => contains(actual, expected).map(|found| !found),
        StartsWith => {
            let (a, e) = (actual.as_str()?, expected.as_str()?);
            Some(a.to_lowercase().starts_with(&e.to_lowercase()))
        }
        EndsWith => {
            let (a, e) = (actual.as_str()?, expected.as_str()?);
            Some(a.to_lowercase().ends_with(&e.to_lowercase()))
        }

        InList => {
            let list = expected.as_array()?;
            Some(list.iter().any(|item| loosely_equal(actual, item)))
        }
        NotInList => {
            let list = expected.as_array()?;
            Some(!list.iter().any(|item| loosely_equal(actual, item)))
        }

        IsEmpty => Some(is_empty(actual)),
        IsNotEmpty => Some(!is_empty(actual)),

        Regex => {
            let (subject, pattern) = (actual.as_str()?, expected.as_str()?);
            let re = regex::Regex::new(pattern).ok()?;
            Some(re.is_match(subject))
        }

        Before => Some(parse_datetime(actual)? < parse_datetime(expected)?),
        After => Some(parse_datetime(actual)? > parse_datetime(expected)?),
        Between => between(actual, expected),

        DayOfMonth => {
            let day = as_number(expected)?;
            if day.fract() != 0.0 {
                return None;
            }
            Some(f64::from(parse_datetime(actual)?.day()) == day)
        }
        DayOfWeek => Some(parse_datetime(actual)?.weekday() == parse_weekday(expected)?),
        IsWeekend => Some(is_weekend(parse_datetime(actual)?.weekday())),
        IsBusinessDay => Some(!is_weekend(parse_datetime(actual)?.weekday())),
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Numbers and numeric strings as `f64`.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// JSON equality, except that a number equals any numerically-equal number
/// or numeric string (`150 == 150.0 == "150.00"`).
/// Equality where a JSON number also matches its numeric-string or
/// differently-written numeric form.
pub(crate) fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a.is_number() || b.is_number() {
        if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
            return x == y;
        }
    }
    a == b
}

fn compare_numbers(a: &Value, b: &Value, cmp: impl Fn(f64, f64) -> bool) -> Option<bool> {
    Some(cmp(as_number(a)?, as_number(b)?))
}

fn contains(actual: &Value, expected: &Value) -> Option<bool> {
    match (actual, expected) {
        (Value::String(haystack), Value::String(needle)) => {
            Some(haystack.to_lowercase().contains(&needle.to_lowercase()))
        }
        (Value::Array(items), needle) => Some(items.iter().any(|item| loosely_equal(item, needle))),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Inclusive range check on `[min, max]`: numeric when all three operands are
/// numbers, otherwise by date.
fn between(actual: &Value, range: &Value) -> Option<bool> {
    let [min, max] = range.as_array()?.as_slice() else {
        return None;
    };

    if let (Some(v), Some(lo), Some(hi)) = (as_number(actual), as_number(min), as_number(max)) {
        return Some(lo <= v && v <= hi);
    }

    let (v, lo, hi) = (parse_datetime(actual)?, parse_datetime(min)?, parse_datetime(max)?);
    Some(lo <= v && v <= hi)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Accepts RFC 3339 timestamps, offset-less `YYYY-MM-DDTHH:MM:SS[.f]`
/// (taken as UTC), plain `YYYY-MM-DD` (UTC midnight) and epoch milliseconds.
///
/// Timestamps keep their own offset so calendar operators see the local date.
fn parse_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    let utc = FixedOffset::east_opt(0)?;

    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt);
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(utc.from_utc_datetime(&naive));
            }
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(n) => utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

/// `0`–`6` with `0` = Sunday, or an English day name / abbreviation.
fn parse_weekday(value: &Value) -> Option<Weekday> {
    if let Some(n) = as_number(value) {
        return match n as i64 {
            _ if n.fract() != 0.0 => None,
            0 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        };
    }
    value.as_str()?.trim().parse::<Weekday>().ok()
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ConditionOperator::*;

    fn check(field_value: Value, op: ConditionOperator, value: Value) -> bool {
        let ctx = json!({ "f": field_value });
        evaluate_condition(&Condition::new("f", op, value), &ctx)
    }

    fn group(operator: LogicalOperator, conditions: Vec<Condition>) -> ConditionGroup {
        ConditionGroup { operator, conditions }
    }

    #[test]
    fn empty_and_is_true_and_empty_or_is_false() {
        assert!(evaluate(&group(LogicalOperator::And, vec![]), &json!({})));
        assert!(!evaluate(&group(LogicalOperator::Or, vec![]), &json!({})));
    }

    #[test]
    fn and_requires_every_leaf() {
        let ctx = json!({ "amount": 150, "currency": "EUR" });
        let both = group(
            LogicalOperator::And,
            vec![
                Condition::new("amount", Gt, json!(100)),
                Condition::new("currency", Eq, json!("EUR")),
            ],
        );
        assert!(evaluate(&both, &ctx));

        let one_false = group(
            LogicalOperator::And,
            vec![
                Condition::new("amount", Gt, json!(100)),
                Condition::new("currency", Eq, json!("USD")),
            ],
        );
        assert!(!evaluate(&one_false, &ctx));
    }

    #[test]
    fn or_needs_one_leaf() {
        let ctx = json!({ "amount": 50 });
        let g = group(
            LogicalOperator::Or,
            vec![
                Condition::new("missing", Eq, json!(1)),
                Condition::new("amount", Lt, json!(100)),
            ],
        );
        assert!(evaluate(&g, &ctx));
    }

    #[test]
    fn missing_field_is_false_for_every_operator() {
        let ctx = json!({ "amount": 1 });
        for op in [Eq, Neq, IsEmpty, IsNotEmpty, NotContains, NotInList] {
            assert!(!evaluate_condition(&Condition::new("nope", op, json!([])), &ctx), "{op:?}");
        }
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let ctx = json!({ "merchant": { "name": "Blue Bottle" }, "lines": [{ "amount": 4 }] });
        assert_eq!(lookup(&ctx, "merchant.name"), Some(&json!("Blue Bottle")));
        assert_eq!(lookup(&ctx, "lines.0.amount"), Some(&json!(4)));
        assert_eq!(lookup(&ctx, "lines.7.amount"), None);
        assert_eq!(lookup(&ctx, ""), None);
    }

    #[test]
    fn equality_normalises_numbers() {
        assert!(check(json!(150), Eq, json!(150.0)));
        assert!(check(json!("150.00"), Eq, json!(150)));
        assert!(!check(json!("01"), Eq, json!("1")));
        assert!(check(json!("groceries"), Neq, json!("travel")));
        assert!(!check(json!(5), Neq, json!(5)));
    }

    #[test]
    fn ordering_operators_need_numbers() {
        assert!(check(json!(150), Gt, json!(100)));
        assert!(check(json!(100), Gte, json!(100)));
        assert!(check(json!("99.5"), Lt, json!(100)));
        assert!(check(json!(100), Lte, json!("100")));
        assert!(!check(json!("abc"), Gt, json!(1)));
        assert!(!check(json!(true), Lt, json!(1)));
    }

    #[test]
    fn string_operators_ignore_case() {
        assert!(check(json!("STARBUCKS #123"), Contains, json!("starbucks")));
        assert!(check(json!("Uber Eats"), NotContains, json!("lyft")));
        assert!(check(json!("AWS invoice"), StartsWith, json!("aws")));
        assert!(check(json!("invoice.PDF"), EndsWith, json!(".pdf")));
        assert!(!check(json!(42), StartsWith, json!("4")));
        assert!(!check(json!(42), NotContains, json!("4")));
    }

    #[test]
    fn contains_on_arrays_is_membership() {
        assert!(check(json!(["travel", "meals"]), Contains, json!("meals")));
        assert!(check(json!(["travel"]), NotContains, json!("meals")));
    }

    #[test]
    fn list_membership() {
        assert!(check(json!("USD"), InList, json!(["USD", "EUR"])));
        assert!(check(json!(3), InList, json!([1, 2, 3.0])));
        assert!(check(json!("GBP"), NotInList, json!(["USD", "EUR"])));
        // Not a list: fail closed both ways.
        assert!(!check(json!("USD"), InList, json!("USD")));
        assert!(!check(json!("GBP"), NotInList, json!("USD")));
    }

    #[test]
    fn emptiness() {
        assert!(check(Value::Null, IsEmpty, Value::Null));
        assert!(check(json!("  "), IsEmpty, Value::Null));
        assert!(check(json!([]), IsEmpty, Value::Null));
        assert!(check(json!({}), IsEmpty, Value::Null));
        assert!(check(json!(0), IsNotEmpty, Value::Null));
        assert!(check(json!("memo"), IsNotEmpty, Value::Null));
    }

    #[test]
    fn regex_matches_and_fails_closed() {
        assert!(check(json!("INV-2024-001"), Regex, json!(r"^INV-\d{4}-\d+$")));
        assert!(!check(json!("PO-1"), Regex, json!(r"^INV-")));
        assert!(!check(json!("INV-1"), Regex, json!(42)));
        assert!(!check(json!("INV-1"), Regex, json!("(unclosed")));
    }

    #[test]
    fn before_and_after_compare_instants() {
        assert!(check(json!("2024-03-01"), Before, json!("2024-03-02")));
        assert!(check(json!("2024-03-01T10:00:00Z"), After, json!("2024-03-01T09:00:00Z")));
        // 10:00+02:00 is 08:00Z.
        assert!(check(json!("2024-03-01T10:00:00+02:00"), Before, json!("2024-03-01T09:00:00")));
        assert!(!check(json!("not a date"), Before, json!("2024-03-02")));
    }

    #[test]
    fn between_is_inclusive() {
        assert!(check(json!(100), Between, json!([100, 200])));
        assert!(check(json!(200), Between, json!([100, 200])));
        assert!(!check(json!(201), Between, json!([100, 200])));
        assert!(check(json!("2024-06-15"), Between, json!(["2024-06-01", "2024-06-30"])));
        assert!(!check(json!(150), Between, json!([100])));
        assert!(!check(json!(150), Between, json!(100)));
    }

    #[test]
    fn calendar_operators() {
        // 2024-06-15 is a Saturday.
        assert!(check(json!("2024-06-15"), DayOfMonth, json!(15)));
        assert!(!check(json!("2024-06-15"), DayOfMonth, json!(14)));
        assert!(check(json!("2024-06-15"), DayOfWeek, json!(6)));
        assert!(check(json!("2024-06-15T12:00:00Z"), DayOfWeek, json!("saturday")));
        assert!(check(json!("2024-06-15"), DayOfWeek, json!("Sat")));
        assert!(check(json!("2024-06-15"), IsWeekend, Value::Null));
        assert!(!check(json!("2024-06-15"), IsBusinessDay, Value::Null));
        assert!(check(json!("2024-06-17"), IsBusinessDay, Value::Null));
        assert!(!check(json!("garbage"), IsWeekend, Value::Null));
        assert!(!check(json!("2024-06-15"), DayOfWeek, json!(9)));
    }

    #[test]
    fn calendar_uses_the_timestamps_own_offset() {
        // Sunday 23:30 in UTC-05:00 is already Monday in UTC.
        assert!(check(json!("2024-06-16T23:30:00-05:00"), IsWeekend, Value::Null));
    }
}
