//! Security type and option right.

use std::fmt;

/// Security type of a contract, as spelled on the wire (`"STK"`, `"OPT"`, ...).
///
/// Unrecognised spellings are kept verbatim in [`SecType::Other`] so a
/// decoded contract can always be re-encoded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SecType {
    #[default]
    Stock,
    Option,
    Future,
    FutureOption,
    Index,
    Cash,
    Bag,
    Warrant,
    Bond,
    Commodity,
    News,
    Fund,
    Cfd,
    Crypto,
    /// Empty on the wire (e.g. a bare con-id lookup).
    Unspecified,
    Other(String),
}

impl SecType {
    pub fn as_str(&self) -> &str {
        match self {
            SecType::Stock => "STK",
            SecType::Option => "OPT",
            SecType::Future => "FUT",
            SecType::FutureOption => "FOP",
            SecType::Index => "IND",
            SecType::Cash => "CASH",
            SecType::Bag => "BAG",
            SecType::Warrant => "WAR",
            SecType::Bond => "BOND",
            SecType::Commodity => "CMDTY",
            SecType::News => "NEWS",
            SecType::Fund => "FUND",
            SecType::Cfd => "CFD",
            SecType::Crypto => "CRYPTO",
            SecType::Unspecified => "",
            SecType::Other(s) => s.as_str(),
        }
    }

    /// Parse the wire spelling. Never fails.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "STK" => SecType::Stock,
            "OPT" => SecType::Option,
            "FUT" => SecType::Future,
            "FOP" => SecType::FutureOption,
            "IND" => SecType::Index,
            "CASH" => SecType::Cash,
            "BAG" => SecType::Bag,
            "WAR" => SecType::Warrant,
            "BOND" => SecType::Bond,
            "CMDTY" => SecType::Commodity,
            "NEWS" => SecType::News,
            "FUND" => SecType::Fund,
            "CFD" => SecType::Cfd,
            "CRYPTO" => SecType::Crypto,
            "" => SecType::Unspecified,
            other => SecType::Other(other.to_string()),
        }
    }

    /// True for security types that carry an expiry, strike and right.
    pub fn is_derivative(&self) -> bool {
        matches!(
            self,
            SecType::Option | SecType::FutureOption | SecType::Warrant
        )
    }
}

impl fmt::Display for SecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option right: Call or Put.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Right {
    Call,
    Put,
}

impl Right {
    /// Short wire spelling (`"C"` / `"P"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Right::Call => "C",
            Right::Put => "P",
        }
    }

    /// Accepts both the short and the long spelling; empty and `"?"`
    /// (used by the gateway for "not applicable") map to `None`.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "C" | "CALL" => Some(Right::Call),
            "P" | "PUT" => Some(Right::Put),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sec_type_keeps_unknown_spelling() {
        let t = SecType::from_wire("SLB");
        assert_eq!(t, SecType::Other("SLB".to_string()));
        assert_eq!(t.as_str(), "SLB");
    }

    #[test]
    fn right_accepts_long_form() {
        assert_eq!(Right::from_wire("CALL"), Some(Right::Call));
        assert_eq!(Right::from_wire("P"), Some(Right::Put));
        assert_eq!(Right::from_wire("?"), None);
    }
}
