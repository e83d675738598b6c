//! The entry-modification engine: Add/Delete/Replace/Increment semantics
//! over an in-memory Entry, driven by a matching-rule registry for equality
//! comparisons. Ported from the change-list application logic of the
//! reference directory server, adapted to the memory-safe Rust data model
//! in `entry`.

use crate::entry::{attr_delete, attr_find, attr_find_mut, attr_merge, AttributeDescription, Entry, INTEGER_SYNTAX_OID};
use crate::error::ModifyError;
use crate::matching::{MatchFlags, MatchingRuleRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Delete,
    Replace,
    Increment,
}

impl ModOp {
    fn name(self) -> &'static str {
        match self {
            ModOp::Add => "add",
            ModOp::Delete => "delete",
            ModOp::Replace => "replace",
            ModOp::Increment => "increment",
        }
    }
}

/// One LDAP Modify change-list entry.
#[derive(Clone, Debug)]
pub struct Modification {
    pub op: ModOp,
    pub desc: AttributeDescription,
    /// `None` for Delete means "delete the whole attribute".
    pub values: Option<Vec<Vec<u8>>>,
    pub nvalues: Option<Vec<Vec<u8>>>,
}

impl Modification {
    fn values_for_apply(&self) -> &[Vec<u8>] {
        self.values.as_deref().unwrap_or(&[])
    }
}

/// Applies one `Modification` to `entry`, using `registry` for equality
/// comparisons. `permissive` relaxes missing-attribute errors on
/// delete/replace paths; it never relaxes duplicate-value detection on add.
pub fn apply_modification(
    entry: &mut Entry,
    modification: &Modification,
    registry: &dyn MatchingRuleRegistry,
    permissive: bool,
) -> Result<(), ModifyError> {
    match modification.op {
        ModOp::Add => modify_add_values(entry, modification, registry),
        ModOp::Delete => modify_delete_values(entry, modification, registry, permissive),
        ModOp::Replace => modify_replace_values(entry, modification, registry, permissive),
        ModOp::Increment => modify_increment_values(entry, modification),
    }
}

/// §4.F.1: merges new values into an attribute, failing if any new value
/// already equality-matches an existing one. Creates the attribute if it
/// doesn't exist.
pub fn modify_add_values(
    entry: &mut Entry,
    modification: &Modification,
    registry: &dyn MatchingRuleRegistry,
) -> Result<(), ModifyError> {
    let desc = &modification.desc;
    let equality = desc
        .equality
        .as_deref()
        .ok_or_else(|| ModifyError::inappropriate_matching("add", &desc.name))?;

    let new_vals = modification.values_for_apply();
    let new_nvals = modification.nvalues.as_deref();

    if let Some(existing) = attr_find(entry, desc) {
        let existing_cmp = existing.comparison_vals();
        let existing_normalized = existing.nvals.is_some();
        for (i, new_val) in new_vals.iter().enumerate() {
            let (new_cmp, new_normalized) = match new_nvals {
                Some(nv) => (&nv[i], true),
                None => (new_val, false),
            };
            for existing_val in existing_cmp {
                let flags = MatchFlags {
                    value_a_normalized: new_normalized,
                    value_b_normalized: existing_normalized,
                };
                let matched = registry
                    .matches(equality, &desc.syntax, flags, new_cmp, existing_val)
                    .map_err(|e| ModifyError::other("add", &desc.name, &e.to_string()))?;
                if matched {
                    return Err(ModifyError::type_or_value_exists("add", &desc.name, i));
                }
            }
        }
    }

    attr_merge(entry, desc, new_vals.to_vec(), new_nvals.map(|n| n.to_vec()))
}

/// §4.F.2: removes specific values (or the whole attribute) from an
/// attribute. Partial progress through a failing delete list is preserved
/// via index-tracked compaction rather than an in-place sentinel scan, per
/// the design notes on the Rust port of this primitive.
pub fn modify_delete_values(
    entry: &mut Entry,
    modification: &Modification,
    registry: &dyn MatchingRuleRegistry,
    permissive: bool,
) -> Result<(), ModifyError> {
    let desc = &modification.desc;

    let Some(to_delete) = modification.values.as_deref() else {
        return attr_delete(entry, desc, permissive);
    };

    let equality = desc
        .equality
        .as_deref()
        .ok_or_else(|| ModifyError::inappropriate_matching("delete", &desc.name))?;

    let Some(attr) = attr_find_mut(entry, desc) else {
        return if permissive {
            Ok(())
        } else {
            Err(ModifyError::no_such_attribute("delete", &desc.name))
        };
    };

    let existing_normalized = attr.nvals.is_some();
    let mut removed = vec![false; attr.vals.len()];
    let mut first_unmatched: Option<usize> = None;

    for (i, target) in to_delete.iter().enumerate() {
        let mut found = false;
        for (j, removed_flag) in removed.iter_mut().enumerate() {
            if *removed_flag {
                continue;
            }
            let existing_val = attr.comparison_vals()[j].clone();
            let flags = MatchFlags {
                value_a_normalized: false,
                value_b_normalized: existing_normalized,
            };
            let matched = registry
                .matches(equality, &desc.syntax, flags, target, &existing_val)
                .map_err(|e| ModifyError::other("delete", &desc.name, &e.to_string()))?;
            if matched {
                *removed_flag = true;
                found = true;
                break;
            }
        }
        if !found {
            first_unmatched = Some(i);
            break;
        }
    }

    // Compact regardless of whether we stopped early: matches already found
    // before the failure stay applied.
    let mut compacted_vals = Vec::with_capacity(attr.vals.len());
    let mut compacted_nvals = attr.nvals.as_ref().map(|_| Vec::with_capacity(attr.vals.len()));
    for (j, keep) in removed.iter().map(|r| !*r).enumerate() {
        if keep {
            compacted_vals.push(attr.vals[j].clone());
            if let (Some(dst), Some(src)) = (&mut compacted_nvals, &attr.nvals) {
                dst.push(src[j].clone());
            }
        }
    }
    attr.vals = compacted_vals;
    attr.nvals = compacted_nvals;

    if attr.vals.is_empty() {
        // Safe: attr_delete only fails NoSuchAttribute, and we just confirmed
        // the attribute is present.
        attr_delete(entry, desc, true).ok();
    }

    if let Some(i) = first_unmatched {
        if i == 0 {
            return Err(ModifyError::no_such_value("delete", &desc.name, 0));
        }
        return Err(ModifyError::no_such_value("delete", &desc.name, i));
    }

    Ok(())
}

/// §4.F.3: removes the attribute, then delegates to Add semantics if new
/// values were supplied.
pub fn modify_replace_values(
    entry: &mut Entry,
    modification: &Modification,
    registry: &dyn MatchingRuleRegistry,
    permissive: bool,
) -> Result<(), ModifyError> {
    let desc = &modification.desc;
    attr_delete(entry, desc, true).ok();

    match &modification.values {
        Some(_) => {
            let add = Modification {
                op: ModOp::Add,
                desc: desc.clone(),
                values: modification.values.clone(),
                nvalues: modification.nvalues.clone(),
            };
            modify_add_values(entry, &add, registry)
        }
        None => {
            let _ = permissive;
            Ok(())
        }
    }
}

/// §4.F.4: parses the existing integer-syntax values and the increment
/// amount, applies the increment with overflow checking, and writes the
/// decimal representation back into `nvals[i]` — or `vals[i]` directly when
/// there is no independent `nvals` list, i.e. presentation and normalized
/// form are the same list. When `nvals` is its own list, `vals` is left
/// untouched: the normalized form is recomputed, the originally submitted
/// presentation text is not. A zero or unparseable increment amount is a
/// no-op success; overflow is `ConstraintViolation`; a non-numeric existing
/// value is `Other`.
pub fn modify_increment_values(entry: &mut Entry, modification: &Modification) -> Result<(), ModifyError> {
    let desc = &modification.desc;
    let attr = attr_find_mut(entry, desc).ok_or_else(|| ModifyError::no_such_attribute("increment", &desc.name))?;

    if attr.desc.syntax != INTEGER_SYNTAX_OID {
        return Err(ModifyError::constraint_violation(
            "increment",
            &desc.name,
            "attribute is not integer-syntax",
        ));
    }

    let raw_amount = modification
        .values
        .as_ref()
        .and_then(|v| v.first())
        .map(|v| v.as_slice())
        .unwrap_or(b"");
    let amount: i64 = match std::str::from_utf8(raw_amount).ok().and_then(|s| s.trim().parse().ok()) {
        Some(0) | None => return Ok(()),
        Some(a) => a,
    };

    let target = attr.nvals.as_mut().unwrap_or(&mut attr.vals);
    for (i, value) in target.iter_mut().enumerate() {
        let text = std::str::from_utf8(value)
            .map_err(|_| ModifyError::other("increment", &desc.name, &format!("value #{i} is not UTF-8")))?;
        let current: i64 = text
            .trim()
            .parse()
            .map_err(|_| ModifyError::other("increment", &desc.name, &format!("value #{i} is not an integer")))?;
        let next = current
            .checked_add(amount)
            .ok_or_else(|| ModifyError::constraint_violation("increment", &desc.name, "integer overflow"))?;
        *value = next.to_string().into_bytes();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::CaseIgnoreMatch;

    fn cn() -> AttributeDescription {
        AttributeDescription::new("cn", Some("caseIgnoreMatch"), "dirString")
    }

    fn uid_number() -> AttributeDescription {
        AttributeDescription::new("uidNumber", Some("integerMatch"), INTEGER_SYNTAX_OID)
    }

    #[test]
    fn add_duplicate_value_fails() {
        let registry = CaseIgnoreMatch;
        let mut entry = Entry::new();
        attr_merge(&mut entry, &cn(), vec![b"Alice".to_vec()], Some(vec![b"alice".to_vec()])).unwrap();

        let modification = Modification {
            op: ModOp::Add,
            desc: cn(),
            values: Some(vec![b"Alice".to_vec()]),
            nvalues: Some(vec![b"alice".to_vec()]),
        };
        let err = apply_modification(&mut entry, &modification, &registry, false).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::TypeOrValueExists);
        assert_eq!(attr_find(&entry, &cn()).unwrap().vals.len(), 1);
    }

    #[test]
    fn delete_partial_preserves_progress() {
        let registry = CaseIgnoreMatch;
        let mut entry = Entry::new();
        let mail = AttributeDescription::new("mail", Some("caseIgnoreMatch"), "dirString");
        attr_merge(&mut entry, &mail, vec![b"a@x".to_vec(), b"b@x".to_vec()], None).unwrap();

        let modification = Modification {
            op: ModOp::Delete,
            desc: mail.clone(),
            values: Some(vec![b"a@x".to_vec(), b"c@x".to_vec()]),
            nvalues: None,
        };
        let err = apply_modification(&mut entry, &modification, &registry, false).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::NoSuchAttribute);
        let remaining = attr_find(&entry, &mail).unwrap();
        assert_eq!(remaining.vals, vec![b"b@x".to_vec()]);
    }

    #[test]
    fn delete_failing_first_value_leaves_attribute_untouched() {
        let registry = CaseIgnoreMatch;
        let mut entry = Entry::new();
        let mail = AttributeDescription::new("mail", Some("caseIgnoreMatch"), "dirString");
        attr_merge(&mut entry, &mail, vec![b"a@x".to_vec()], None).unwrap();

        let modification = Modification {
            op: ModOp::Delete,
            desc: mail.clone(),
            values: Some(vec![b"z@x".to_vec()]),
            nvalues: None,
        };
        let err = apply_modification(&mut entry, &modification, &registry, false).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::NoSuchAttribute);
        assert_eq!(attr_find(&entry, &mail).unwrap().vals, vec![b"a@x".to_vec()]);
    }

    #[test]
    fn replace_then_replace_again_matches_fresh_apply() {
        let registry = CaseIgnoreMatch;
        let mut entry = Entry::new();
        attr_merge(&mut entry, &cn(), vec![b"Alice".to_vec()], None).unwrap();

        let replace = Modification {
            op: ModOp::Replace,
            desc: cn(),
            values: Some(vec![b"Bob".to_vec()]),
            nvalues: None,
        };
        apply_modification(&mut entry, &replace, &registry, false).unwrap();
        apply_modification(&mut entry, &replace, &registry, false).unwrap();

        let mut fresh = Entry::new();
        apply_modification(&mut fresh, &replace, &registry, false).unwrap();
        assert_eq!(entry, fresh);
    }

    #[test]
    fn increment_leaves_distinct_presentation_value_untouched() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &uid_number(), vec![b"0100".to_vec()], Some(vec![b"100".to_vec()])).unwrap();

        let up = Modification {
            op: ModOp::Increment,
            desc: uid_number(),
            values: Some(vec![b"5".to_vec()]),
            nvalues: None,
        };
        modify_increment_values(&mut entry, &up).unwrap();
        let attr = attr_find(&entry, &uid_number()).unwrap();
        assert_eq!(attr.nvals, Some(vec![b"105".to_vec()]));
        assert_eq!(attr.vals, vec![b"0100".to_vec()]);
    }

    #[test]
    fn increment_then_negative_increment_is_identity() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &uid_number(), vec![b"100".to_vec(), b"200".to_vec()], Some(vec![b"100".to_vec(), b"200".to_vec()])).unwrap();

        let up = Modification {
            op: ModOp::Increment,
            desc: uid_number(),
            values: Some(vec![b"5".to_vec()]),
            nvalues: None,
        };
        modify_increment_values(&mut entry, &up).unwrap();
        assert_eq!(
            attr_find(&entry, &uid_number()).unwrap().nvals,
            Some(vec![b"105".to_vec(), b"205".to_vec()])
        );

        let down = Modification {
            op: ModOp::Increment,
            desc: uid_number(),
            values: Some(vec![b"-5".to_vec()]),
            nvalues: None,
        };
        modify_increment_values(&mut entry, &down).unwrap();
        assert_eq!(
            attr_find(&entry, &uid_number()).unwrap().nvals,
            Some(vec![b"100".to_vec(), b"200".to_vec()])
        );
    }

    #[test]
    fn increment_by_zero_is_noop() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &uid_number(), vec![b"100".to_vec()], Some(vec![b"100".to_vec()])).unwrap();
        let noop = Modification {
            op: ModOp::Increment,
            desc: uid_number(),
            values: Some(vec![b"0".to_vec()]),
            nvalues: None,
        };
        modify_increment_values(&mut entry, &noop).unwrap();
        assert_eq!(attr_find(&entry, &uid_number()).unwrap().nvals, Some(vec![b"100".to_vec()]));
    }

    #[test]
    fn increment_overflow_is_constraint_violation() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &uid_number(), vec![i64::MAX.to_string().into_bytes()], None).unwrap();
        let up = Modification {
            op: ModOp::Increment,
            desc: uid_number(),
            values: Some(vec![b"1".to_vec()]),
            nvalues: None,
        };
        let err = modify_increment_values(&mut entry, &up).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::ConstraintViolation);
    }

    #[test]
    fn increment_wrong_syntax_is_constraint_violation() {
        let mut entry = Entry::new();
        attr_merge(&mut entry, &cn(), vec![b"Alice".to_vec()], None).unwrap();
        let up = Modification {
            op: ModOp::Increment,
            desc: cn(),
            values: Some(vec![b"1".to_vec()]),
            nvalues: None,
        };
        let err = modify_increment_values(&mut entry, &up).unwrap_err();
        assert_eq!(err.code, crate::result_code::ResultCode::ConstraintViolation);
    }
}
