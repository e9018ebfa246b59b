//! Constraints on resource names accepted in request paths.

use azure_arm_core::request::Constraint;

/// Alphanumerics, with single hyphens allowed between them.
fn is_hyphenated_alphanumeric(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        && !value.contains("--")
}

/// Alphanumerics, `_`, `-`, `(`, `)` and `.`, not ending in `.`.
fn is_resource_group_name(value: &str) -> bool {
    !value.ends_with('.')
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '(' | ')' | '.'))
}

pub(crate) const RESOURCE_GROUP: &[Constraint] = &[
    Constraint::MinLength(1),
    Constraint::MaxLength(80),
    Constraint::Pattern {
        description: r"^[a-zA-Z0-9_\-\(\)\.]*[^\.]$",
        matches: is_resource_group_name,
    },
];

pub(crate) const FRONT_DOOR: &[Constraint] = &[
    Constraint::MinLength(5),
    Constraint::MaxLength(64),
    Constraint::Pattern {
        description: "^[a-zA-Z0-9]+([-a-zA-Z0-9]?[a-zA-Z0-9])*$",
        matches: is_hyphenated_alphanumeric,
    },
];

pub(crate) const RULES_ENGINE: &[Constraint] = &[
    Constraint::MinLength(1),
    Constraint::MaxLength(90),
    Constraint::Pattern {
        description: "^[a-zA-Z0-9]+([-a-zA-Z0-9]?[a-zA-Z0-9])*$",
        matches: is_hyphenated_alphanumeric,
    },
];
