//! Security label lattice for SecLang
//!
//! Four totally ordered classification levels. Every runtime value and
//! every variable carries one of them.

use std::fmt;

/// A security class in the lattice
/// `Unclassified < Confidential < Secret < TopSecret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SecurityLabel {
    #[default]
    Unclassified,
    Confidential,
    Secret,
    TopSecret,
}

impl SecurityLabel {
    /// All labels, bottom to top
    pub const ALL: [SecurityLabel; 4] = [
        SecurityLabel::Unclassified,
        SecurityLabel::Confidential,
        SecurityLabel::Secret,
        SecurityLabel::TopSecret,
    ];

    /// Least upper bound of two labels
    pub fn join(self, other: SecurityLabel) -> SecurityLabel {
        self.max(other)
    }

    /// One rung down the lattice, clamped at `Unclassified`
    pub fn downgrade(self) -> SecurityLabel {
        match self {
            SecurityLabel::TopSecret => SecurityLabel::Secret,
            SecurityLabel::Secret => SecurityLabel::Confidential,
            SecurityLabel::Confidential | SecurityLabel::Unclassified => SecurityLabel::Unclassified,
        }
    }

    /// Unconditional drop to the bottom of the lattice
    pub fn declassify(self) -> SecurityLabel {
        SecurityLabel::Unclassified
    }

    /// Numeric rung, 0 for `Unclassified` up to 3 for `TopSecret`
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Long name, also the name of the channel bound to this class
    pub fn name(self) -> &'static str {
        match self {
            SecurityLabel::Unclassified => "Unclassified",
            SecurityLabel::Confidential => "Confidential",
            SecurityLabel::Secret => "Secret",
            SecurityLabel::TopSecret => "TopSecret",
        }
    }

    /// Short annotation form used in declarations
    pub fn short_name(self) -> &'static str {
        match self {
            SecurityLabel::Unclassified => "U",
            SecurityLabel::Confidential => "C",
            SecurityLabel::Secret => "S",
            SecurityLabel::TopSecret => "TS",
        }
    }

    /// Parse a short (`TS`) or long (`TopSecret`) class name
    pub fn from_name(name: &str) -> Option<SecurityLabel> {
        match name {
            "U" | "Unclassified" => Some(SecurityLabel::Unclassified),
            "C" | "Confidential" => Some(SecurityLabel::Confidential),
            "S" | "Secret" => Some(SecurityLabel::Secret),
            "TS" | "TopSecret" => Some(SecurityLabel::TopSecret),
            _ => None,
        }
    }

    /// The class implied by a channel name. Channels are named after
    /// the long form of their class.
    pub fn of_channel(name: &str) -> Option<SecurityLabel> {
        SecurityLabel::ALL.into_iter().find(|label| label.name() == name)
    }

    /// True if data at `self` may flow into a cell at `target`
    pub fn flows_to(self, target: SecurityLabel) -> bool {
        self <= target
    }
}

impl fmt::Display for SecurityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_label() -> impl Strategy<Value = SecurityLabel> {
        prop::sample::select(SecurityLabel::ALL.to_vec())
    }

    #[test]
    fn test_ordering() {
        assert!(SecurityLabel::Unclassified < SecurityLabel::Confidential);
        assert!(SecurityLabel::Confidential < SecurityLabel::Secret);
        assert!(SecurityLabel::Secret < SecurityLabel::TopSecret);
    }

    #[test]
    fn test_downgrade_chain() {
        let label = SecurityLabel::TopSecret.downgrade().downgrade().downgrade();
        assert_eq!(label, SecurityLabel::Unclassified);
        assert_eq!(SecurityLabel::Unclassified.downgrade(), SecurityLabel::Unclassified);
    }

    #[test]
    fn test_names() {
        assert_eq!(SecurityLabel::from_name("TS"), Some(SecurityLabel::TopSecret));
        assert_eq!(SecurityLabel::from_name("Secret"), Some(SecurityLabel::Secret));
        assert_eq!(SecurityLabel::from_name("secret"), None);
        assert_eq!(SecurityLabel::of_channel("Confidential"), Some(SecurityLabel::Confidential));
        assert_eq!(SecurityLabel::of_channel("C"), None);
        for label in SecurityLabel::ALL {
            assert_eq!(SecurityLabel::from_name(label.short_name()), Some(label));
            assert_eq!(SecurityLabel::from_name(label.name()), Some(label));
        }
    }

    #[test]
    fn test_levels() {
        let levels: Vec<u8> = SecurityLabel::ALL.iter().map(|l| l.level()).collect();
        assert_eq!(levels, vec![0, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn lattice_is_total(a in any_label(), b in any_label()) {
            let relations = [a < b, a == b, a > b];
            prop_assert_eq!(relations.iter().filter(|r| **r).count(), 1);
        }

        #[test]
        fn join_is_the_greater(a in any_label(), b in any_label()) {
            let joined = a.join(b);
            prop_assert!(joined >= a && joined >= b);
            prop_assert!(joined == a || joined == b);
            prop_assert_eq!(joined, b.join(a));
        }

        #[test]
        fn downgrade_steps_one_rung(a in any_label()) {
            let lower = a.downgrade();
            prop_assert!(lower <= a);
            prop_assert!(a.level() - lower.level() <= 1);
        }

        #[test]
        fn declassify_is_idempotent(a in any_label()) {
            prop_assert_eq!(a.declassify().declassify(), a.declassify());
            prop_assert_eq!(a.declassify(), SecurityLabel::Unclassified);
        }
    }
}
