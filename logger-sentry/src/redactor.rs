use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b").unwrap();
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    static ref CREDIT_CARD_REGEX: Regex = Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap();
    static ref IP_REGEX: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();
}

/// Kinds of personal data the redactor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
}

impl PiiKind {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Email => &EMAIL_REGEX,
            Self::Phone => &PHONE_REGEX,
            Self::Ssn => &SSN_REGEX,
            Self::CreditCard => &CREDIT_CARD_REGEX,
            Self::IpAddress => &IP_REGEX,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Ssn => "SSN",
            Self::CreditCard => "CC",
            Self::IpAddress => "IP",
        }
    }

    fn mask(self, matched: &str) -> String {
        match self {
            Self::Email => match matched.split_once('@') {
                Some((user, domain)) => format!(
                    "{}***@{}***",
                    user.chars().next().unwrap_or('*'),
                    domain.chars().next().unwrap_or('*')
                ),
                None => "***@***".to_string(),
            },
            Self::Phone => "(***) ***-****".to_string(),
            Self::Ssn => "***-**-****".to_string(),
            Self::CreditCard => {
                let digits: String = matched.chars().filter(char::is_ascii_digit).collect();
                format!("****-****-****-{}", digits.get(12..).unwrap_or("****"))
            }
            Self::IpAddress => match matched.split('.').collect::<Vec<_>>().as_slice() {
                [first, _, _, last] => format!("{first}.***.***.{last}"),
                _ => "***.***.***.***".to_string(),
            },
        }
    }
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_credit_cards: bool,
    pub redact_ip_addresses: bool,
    /// Replace matches with a short hash so redacted values can still be
    /// correlated across events.
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_credit_cards: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Adds a custom pattern; an invalid pattern is reported back.
    pub fn with_custom_pattern(mut self, pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        self.custom_patterns
            .push((Regex::new(pattern)?, replacement.to_string()));
        Ok(self)
    }

    fn enabled_kinds(&self) -> Vec<PiiKind> {
        [
            (self.redact_emails, PiiKind::Email),
            (self.redact_ssn, PiiKind::Ssn),
            (self.redact_credit_cards, PiiKind::CreditCard),
            (self.redact_phones, PiiKind::Phone),
            (self.redact_ip_addresses, PiiKind::IpAddress),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

/// Scrubs personal data out of event text and structured values.
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
    kinds: Vec<PiiKind>,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        let kinds = config.enabled_kinds();
        Self { config, kinds }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        for kind in &self.kinds {
            result = kind
                .regex()
                .replace_all(&result, |caps: &Captures| self.replacement(*kind, &caps[0]))
                .into_owned();
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).into_owned();
        }

        result
    }

    /// Redacts every string nested in `value`, keys included.
    pub fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.redact(text)),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.redact_value(item)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (self.redact(key), self.redact_value(item)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn replacement(&self, kind: PiiKind, matched: &str) -> String {
        if self.config.hash_for_correlation {
            format!("{}[{}]", kind.label(), hash_value(matched))
        } else {
            kind.mask(matched)
        }
    }
}

fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    // First 8 bytes keep the marker short
    general_purpose::STANDARD.encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn masking() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking().redact("User john.doe@example.com logged in");
        assert_eq!(redacted, "User j***@e*** logged in");
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
        assert!(!redacted.contains("4567"));
    }

    #[test]
    fn test_card_keeps_last_four() {
        let redacted = masking().redact("card 4111-1111-1111-1234 declined");
        assert_eq!(redacted, "card ****-****-****-1234 declined");
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("from 10.0.0.12");
        let second = redactor.redact("to 10.0.0.12");

        assert!(first.starts_with("from IP["));
        assert_eq!(first.trim_start_matches("from "), second.trim_start_matches("to "));
    }

    #[test]
    fn test_custom_pattern() {
        let config = RedactionConfig::default()
            .with_custom_pattern(r"\bMRN\d+", "MRN[REDACTED]")
            .unwrap();
        let redacted = PiiRedactor::new(config).redact("chart MRN123456 updated");
        assert_eq!(redacted, "chart MRN[REDACTED] updated");
    }

    #[test]
    fn test_nested_values() {
        let value = json!({ "user": { "email": "a.b@example.org", "visits": 3 }, "ips": ["192.168.1.1"] });
        let redacted = masking().redact_value(&value);

        assert_eq!(redacted["user"]["email"], "a***@e***");
        assert_eq!(redacted["user"]["visits"], 3);
        assert_eq!(redacted["ips"][0], "192.***.***.1");
    }
}
