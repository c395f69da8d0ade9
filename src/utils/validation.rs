use crate::utils::error::{BotError, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use std::path::Path;
use url::Url;

/// Date format users type dates in, e.g. `28-May-2025`.
pub const REPORT_DATE_FORMAT: &str = "%d-%b-%Y";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> BotError {
    BotError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Accepts absolute `http`/`https` URLs only.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }
    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        Err(invalid(field_name, path, "Path cannot be empty"))
    } else if path.contains('\0') {
        Err(invalid(field_name, path.escape_default(), "Path contains null bytes"))
    } else {
        Ok(())
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

/// Every file must carry one of `allowed_extensions` (compared case-insensitively).
pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    for file in files {
        let extension = Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| invalid(field_name, file, "File has no extension"))?;
        if !allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
        {
            return Err(invalid(
                field_name,
                file,
                format!(
                    "Unsupported file extension: {}. Allowed extensions: {}",
                    extension,
                    allowed_extensions.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be blank"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

// Questionnaire input checks. These return Option instead of BotError since a
// rejected answer is a normal conversation turn, not a failure.

/// Parses `DD-Mon-YYYY`; the month name is matched case-insensitively.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), REPORT_DATE_FORMAT).ok()
}

pub fn is_report_number(raw: &str) -> bool {
    raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_finite_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_base", "https://api.telegram.org").is_ok());
        assert!(validate_url("api_base", "http://127.0.0.1:8081").is_ok());
        assert!(validate_url("api_base", "").is_err());
        assert!(validate_url("api_base", "invalid-url").is_err());
        assert!(validate_url("api_base", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("max_concurrent", 1, 1).is_ok());
        assert!(validate_positive_number("max_concurrent", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["MDO.docx".to_string(), "HFO.DOCX".to_string()];
        assert!(validate_file_extensions("templates", &files, &["docx"]).is_ok());

        let invalid_files = vec!["MDO.doc".to_string()];
        assert!(validate_file_extensions("templates", &invalid_files, &["docx"]).is_err());
    }

    #[test]
    fn test_parse_report_date() {
        let date = parse_report_date("28-May-2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 28).unwrap());
        assert_eq!(parse_report_date(" 01-jan-2024 "), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(parse_report_date("2025-05-28").is_none());
        assert!(parse_report_date("31-Feb-2025").is_none());
        assert!(parse_report_date("").is_none());
    }

    #[test]
    fn test_report_number() {
        assert!(is_report_number("280525"));
        assert!(!is_report_number("28052"));
        assert!(!is_report_number("2805250"));
        assert!(!is_report_number("28O525"));
        assert!(!is_report_number("٢٨٠٥٢٥"));
    }

    #[test]
    fn test_parse_finite_number() {
        assert_eq!(parse_finite_number("10.5"), Some(10.5));
        assert_eq!(parse_finite_number("-6"), Some(-6.0));
        assert_eq!(parse_finite_number("abc"), None);
        assert_eq!(parse_finite_number("inf"), None);
        assert_eq!(parse_finite_number("NaN"), None);
    }
}
