//! Date helper functions

use chrono::{DateTime, Locale, TimeZone};

/// Format a date using a Moment.js-compatible pattern and a locale tag
///
/// Month and weekday names follow the locale; unknown tags fall back to
/// `en-US`.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", "pt-BR") // -> "15 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale_tag: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, parse_locale(locale_tag))
        .to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Map a BCP 47 style tag (`pt-BR`, `en_us`, `fr`) to a chrono locale
pub fn parse_locale(tag: &str) -> Locale {
    let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
    match tag.as_str() {
        "pt-br" => Locale::pt_BR,
        "pt" | "pt-pt" => Locale::pt_PT,
        "en" | "en-us" => Locale::en_US,
        "en-gb" => Locale::en_GB,
        "es" | "es-es" => Locale::es_ES,
        "es-mx" => Locale::es_MX,
        "fr" | "fr-fr" => Locale::fr_FR,
        "de" | "de-de" => Locale::de_DE,
        "it" | "it-it" => Locale::it_IT,
        "nl" | "nl-nl" => Locale::nl_NL,
        "ja" | "ja-jp" => Locale::ja_JP,
        "zh" | "zh-cn" => Locale::zh_CN,
        _ => {
            tracing::debug!("Unknown locale {:?}, falling back to en-US", tag);
            Locale::en_US
        }
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each category
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month (uppercase M)
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month (uppercase D)
        ("DDDD", "%j"),
        ("DD", "%d"),
        // Hour
        ("HH", "%H"),
        ("hh", "%I"),
        // Minute (after MM)
        ("mm", "%M"),
        // Second
        ("ss", "%S"),
        // Day of week (lowercase d), last to avoid conflicts
        ("dddd", "%A"),
        ("ddd", "%a"),
        // Timezone
        ("ZZ", "%z"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
