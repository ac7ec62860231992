use serde_json::{Number, Value};

// Total conversions from untrusted JSON into the primitive field types of a
// canonical record. None of these can fail: a missing or wrong-typed value
// degrades to the zero value of the target type.

/// Strings pass through, everything else (including `null`) becomes `""`.
pub fn to_string_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Truthiness: non-empty strings, non-zero numbers, arrays and objects are `true`.
pub fn to_bool_or_false(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// Numbers, numeric strings and booleans convert; anything unparseable is `0`.
///
/// Integral results come back as JSON integers so `"15"` serializes as `15`,
/// not `15.0`.
pub fn to_number_or_zero(value: Option<&Value>) -> Number {
    let parsed = match value {
        Some(Value::Number(n)) => return n.clone(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };

    if !parsed.is_finite() {
        return Number::from(0);
    }
    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        return Number::from(parsed as i64);
    }
    Number::from_f64(parsed).unwrap_or_else(|| Number::from(0))
}

/// Keeps the string elements of an array in order; non-arrays yield an empty list.
pub fn to_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_only_pass_through() {
        assert_eq!(to_string_or_empty(Some(&json!("abc"))), "abc");
        assert_eq!(to_string_or_empty(Some(&json!(42))), "");
        assert_eq!(to_string_or_empty(Some(&Value::Null)), "");
        assert_eq!(to_string_or_empty(None), "");
    }

    #[test]
    fn booleans_follow_truthiness() {
        assert!(to_bool_or_false(Some(&json!(true))));
        assert!(to_bool_or_false(Some(&json!("yes"))));
        assert!(to_bool_or_false(Some(&json!(1))));
        assert!(to_bool_or_false(Some(&json!({}))));
        assert!(!to_bool_or_false(Some(&json!(""))));
        assert!(!to_bool_or_false(Some(&json!(0))));
        assert!(!to_bool_or_false(Some(&Value::Null)));
        assert!(!to_bool_or_false(None));
    }

    #[test]
    fn numbers_degrade_to_zero() {
        assert_eq!(to_number_or_zero(Some(&json!("15"))), Number::from(15));
        assert_eq!(to_number_or_zero(Some(&json!(" 7 "))), Number::from(7));
        assert_eq!(to_number_or_zero(Some(&json!("abc"))), Number::from(0));
        assert_eq!(to_number_or_zero(Some(&json!(""))), Number::from(0));
        assert_eq!(to_number_or_zero(Some(&json!(true))), Number::from(1));
        assert_eq!(to_number_or_zero(Some(&json!({"a": 1}))), Number::from(0));
        assert_eq!(to_number_or_zero(None), Number::from(0));
        assert_eq!(to_number_or_zero(Some(&json!("2.5"))).as_f64(), Some(2.5));
    }

    #[test]
    fn string_lists_keep_order_and_drop_non_strings() {
        assert_eq!(
            to_string_list(Some(&json!(["twitter", 3, "linkedin"]))),
            vec!["twitter".to_string(), "linkedin".to_string()]
        );
        assert!(to_string_list(Some(&json!("twitter"))).is_empty());
        assert!(to_string_list(None).is_empty());
    }
}
