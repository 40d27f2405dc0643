//! Operator-supplied identity values: the domain and the contact address.
//!
//! The Subject Alternative Name set is derived once from the domain as typed
//! and never recomputed.

use std::fmt;

/// A hostname to provision, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    name: String,
    alt_names: Vec<String>,
}

impl Domain {
    /// Build a domain from operator input. Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let name = input.trim();
        if name.is_empty() {
            return None;
        }

        let alt_names = if name.contains("www") {
            vec![name.to_string()]
        } else {
            vec![name.to_string(), format!("www.{}", name)]
        };

        Some(Self {
            name: name.to_string(),
            alt_names,
        })
    }

    /// The domain exactly as entered (trimmed).
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Names the certificate is requested for, bare domain first.
    pub fn alt_names(&self) -> &[String] {
        &self.alt_names
    }

    /// Comma-joined alt names, as the certificate tool's `--domains` expects.
    pub fn domains_arg(&self) -> String {
        self.alt_names.join(",")
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Contact e-mail registered with the ACME authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact(String);

impl Contact {
    /// Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let email = input.trim();
        (!email.is_empty()).then(|| Self(email.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_domain_gets_www_variant() {
        let domain = Domain::parse("example.com").unwrap();
        assert_eq!(domain.alt_names(), ["example.com", "www.example.com"]);
        assert_eq!(domain.domains_arg(), "example.com,www.example.com");
    }

    #[test]
    fn test_www_domain_is_left_alone() {
        let domain = Domain::parse("www.example.com").unwrap();
        assert_eq!(domain.alt_names(), ["www.example.com"]);
    }

    #[test]
    fn test_www_anywhere_suppresses_variant() {
        // Matches on substring, not prefix
        let domain = Domain::parse("mywwwsite.org").unwrap();
        assert_eq!(domain.alt_names(), ["mywwwsite.org"]);
    }

    #[test]
    fn test_input_is_trimmed() {
        let domain = Domain::parse("  example.com \n").unwrap();
        assert_eq!(domain.as_str(), "example.com");
        assert_eq!(domain.to_string(), "example.com");
    }

    #[test]
    fn test_blank_input_rejected() {
        assert!(Domain::parse("").is_none());
        assert!(Domain::parse("   ").is_none());
        assert!(Contact::parse("\t").is_none());
    }

    #[test]
    fn test_contact_parse() {
        let contact = Contact::parse(" a@b.com ").unwrap();
        assert_eq!(contact.as_str(), "a@b.com");
    }
}
