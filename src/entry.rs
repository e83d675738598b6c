//! The in-memory entry data model the modification engine operates on.
//!
//! Attribute identity for lookup is the description's name compared
//! case-insensitively, per RFC 4511's attribute-description equality rule —
//! a concrete stand-in for the schema-driven comparison a full directory
//! server would use, since schema loading itself is out of scope here.

use crate::error::ModifyError;

/// The OID of the Integer syntax (RFC 4517 §3.3.16), used by the Increment
/// primitive to reject non-integer attributes with `ConstraintViolation`.
pub const INTEGER_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.27";

/// Name and type metadata for an attribute. `equality` and `syntax` are OIDs
/// (or short names) the matching-rule registry and the Increment primitive
/// key off of; `None` equality means the attribute has no equality rule at
/// all, which blocks Add/Delete from reasoning about duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDescription {
    pub name: String,
    pub equality: Option<String>,
    pub syntax: String,
}

impl AttributeDescription {
    pub fn new(name: impl Into<String>, equality: Option<&str>, syntax: impl Into<String>) -> Self {
        AttributeDescription {
            name: name.into(),
            equality: equality.map(str::to_string),
            syntax: syntax.into(),
        }
    }

    fn eq_name(&self, other: &AttributeDescription) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

/// One attribute's values. `nvals`, if present, is the normalized form of
/// `vals` and is kept at the same length at every observable moment;
/// absence means the presentation values are their own normal form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub desc: AttributeDescription,
    pub vals: Vec<Vec<u8>>,
    pub nvals: Option<Vec<Vec<u8>>>,
}

impl Attribute {
    pub fn new(desc: AttributeDescription, vals: Vec<Vec<u8>>, nvals: Option<Vec<Vec<u8>>>) -> Self {
        debug_assert!(nvals.as_ref().map_or(true, |n| n.len() == vals.len()));
        Attribute { desc, vals, nvals }
    }

    /// The values used for comparisons and for the Increment primitive:
    /// normalized if present, presentation otherwise.
    pub fn comparison_vals(&self) -> &[Vec<u8>] {
        self.nvals.as_deref().unwrap_or(&self.vals)
    }
}

/// An entry: an ordered sequence of attributes. Order among attributes (and
/// among an attribute's values) is not protocol-significant; it is kept
/// stable for predictable test output, not because LDAP requires it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub attrs: Vec<Attribute>,
}

impl Entry {
    pub fn new() -> Self {
        Entry::default()
    }
}

pub fn attr_find<'e>(entry: &'e Entry, desc: &AttributeDescription) -> Option<&'e Attribute> {
    entry.attrs.iter().find(|a| a.desc.eq_name(desc))
}

pub fn attr_find_mut<'e>(entry: &'e mut Entry, desc: &AttributeDescription) -> Option<&'e mut Attribute> {
    entry.attrs.iter_mut().find(|a| a.desc.eq_name(desc))
}

/// Removes the whole attribute matching `desc`. Fails `NoSuchAttribute`
/// unless `permissive` is set, in which case a missing attribute is a no-op
/// success.
pub fn attr_delete(entry: &mut Entry, desc: &AttributeDescription, permissive: bool) -> Result<(), ModifyError> {
    let before = entry.attrs.len();
    entry.attrs.retain(|a| !a.desc.eq_name(desc));
    if before == entry.attrs.len() && !permissive {
        return Err(ModifyError::no_such_attribute("delete", &desc.name));
    }
    Ok(())
}

/// Merges `values`/`nvalues` into the attribute named by `desc`, creating it
/// if it doesn't exist yet. Does not check for duplicates — that is the
/// caller's job (§4.F.1); this is the unconditional append step Add and
/// Replace both delegate to.
pub fn attr_merge(
    entry: &mut Entry,
    desc: &AttributeDescription,
    values: Vec<Vec<u8>>,
    nvalues: Option<Vec<Vec<u8>>>,
) -> Result<(), ModifyError> {
    debug_assert!(nvalues.as_ref().map_or(true, |n| n.len() == values.len()));
    if let Some(attr) = attr_find_mut(entry, desc) {
        if attr.nvals.is_some() != nvalues.is_some() {
            return Err(ModifyError::other(
                "add",
                &desc.name,
                "mismatched normalization state between existing and merged values",
            ));
        }
        attr.vals.extend(values);
        if let (Some(existing), Some(new)) = (&mut attr.nvals, nvalues) {
            existing.extend(new);
        }
    } else {
        entry.attrs.push(Attribute::new(desc.clone(), values, nvalues));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cn() -> AttributeDescription {
        AttributeDescription::new("cn", Some("caseIgnoreMatch"), "dirString")
    }

    #[test]
    fn find_is_case_insensitive() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &cn(), vec![b"Alice".to_vec()], Some(vec![b"alice".to_vec()])).unwrap();
        let desc = AttributeDescription::new("CN", None, "dirString");
        assert!(attr_find(&entry, &desc).is_some());
    }

    #[test]
    fn delete_missing_without_permissive_fails() {
        let mut entry = Entry::new();
        let err = attr_delete(&mut entry, &cn(), false).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::NoSuchAttribute);
    }

    #[test]
    fn delete_missing_with_permissive_succeeds() {
        let mut entry = Entry::new();
        attr_delete(&mut entry, &cn(), true).unwrap();
    }
}
