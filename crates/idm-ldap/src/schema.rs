//! Attribute and object class names used by the directory mapping.

/// Object class attribute.
pub const OBJECT_CLASS: &str = "objectClass";

/// User naming attribute (the derived user id).
pub const UID: &str = "uid";

/// Common name: full name of a user, naming attribute of groups and roles.
pub const CN: &str = "cn";

/// First name.
pub const GIVEN_NAME: &str = "givenName";

/// Last name (surname).
pub const SN: &str = "sn";

/// Email address.
pub const MAIL: &str = "mail";

/// Organizational unit name, written on groups stored as organizational units.
pub const OU: &str = "ou";

/// Organizational unit object class.
pub const ORGANIZATIONAL_UNIT: &str = "organizationalUnit";

/// Multi-valued DN reference attribute.
pub const MEMBER: &str = "member";

/// Value written to `member` when a role has no members; schemas requiring
/// `member` reject an entry without one.
pub const MEMBER_PLACEHOLDER: &str = " ";

/// Object classes whose `member` attribute is mandatory.
pub const MEMBER_REQUIRED_CLASSES: [&str; 2] = ["groupOfNames", "groupOfUniqueNames"];

/// Attributes owned by the mapping; custom attributes may not use them.
pub const RESERVED_ATTRIBUTES: [&str; 8] =
    [OBJECT_CLASS, UID, CN, GIVEN_NAME, SN, MAIL, OU, MEMBER];

/// Checks if an attribute name is owned by the mapping.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_ATTRIBUTES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Checks if entries of these object classes must carry a `member` value.
#[must_use]
pub fn requires_member(object_classes: &[String]) -> bool {
    object_classes.iter().any(|class| {
        MEMBER_REQUIRED_CLASSES
            .iter()
            .any(|required| required.eq_ignore_ascii_case(class))
    })
}
