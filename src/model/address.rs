//! Email address parsing for address filters and indexed items.

/// A parsed email address.
///
/// # Examples
/// - `"Alice Liddell <alice@example.com>"` → `display_name = "Alice Liddell"`, `address = "alice@example.com"`
/// - `"alice@example.com"` → `display_name = ""`, `address = "alice@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address as typed into a filter chip or stored in a
    /// header-style field.
    ///
    /// Accepts `user@domain`, `<user@domain>`, `Name <user@domain>` and
    /// `"Last, First" <user@domain>`. Anything else is kept verbatim as
    /// `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    display_name: strip_quotes(&trimmed[..open]),
                    address: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse a comma-separated list, honoring quoted commas and angle brackets.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    let addr = Self::parse(&current);
                    if !addr.is_empty() {
                        results.push(addr);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        let addr = Self::parse(&current);
        if !addr.is_empty() {
            results.push(addr);
        }

        results
    }

    /// Whether no address was recovered.
    pub fn is_empty(&self) -> bool {
        self.address.is_empty()
    }

    /// Lower-cased bare address, the form address filters search with.
    pub fn search_key(&self) -> String {
        self.address.to_lowercase()
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("Alice Liddell <Alice@Example.com>");
        assert_eq!(addr.address, "Alice@Example.com");
        assert_eq!(addr.display_name, "Alice Liddell");
        assert_eq!(addr.search_key(), "alice@example.com");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Liddell, Alice\" <alice@example.com>");
        assert_eq!(addr.display_name, "Liddell, Alice");
        assert_eq!(addr.address, "alice@example.com");
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(EmailAddress::parse("   ").is_empty());
        assert!(EmailAddress::parse("<>").is_empty());
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Liddell, Alice\" <a@x.com>, bob@y.com,");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Liddell, Alice");
        assert_eq!(list[1].address, "bob@y.com");
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress::parse("Bob <bob@y.com>");
        assert_eq!(addr.to_string(), "Bob <bob@y.com>");
        assert_eq!(EmailAddress::parse("bob@y.com").display(), "bob@y.com");
    }
}
