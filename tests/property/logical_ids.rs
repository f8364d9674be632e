//! Properties of construct paths and the logical IDs derived from them.

use metrostack::ConstructPath;
use proptest::prelude::*;

fn construct_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{0,7}[A-Za-z0-9][A-Za-z0-9_.-]{0,7}"
}

fn punctuation_id() -> impl Strategy<Value = String> {
    "[_. -]{1,8}"
}

fn path_of(ids: &[String]) -> Result<ConstructPath, TestCaseError> {
    let (first, rest) = ids
        .split_first()
        .ok_or_else(|| TestCaseError::reject("empty path"))?;
    let mut path = ConstructPath::root(first).map_err(|err| TestCaseError::fail(err.to_string()))?;
    for id in rest {
        path = path.child(id).map_err(|err| TestCaseError::fail(err.to_string()))?;
    }
    Ok(path)
}

proptest! {
    #[test]
    fn logical_ids_are_alphanumeric(ids in prop::collection::vec(construct_id(), 1..5)) {
        let logical_id = path_of(&ids)?.logical_id();
        prop_assert!(!logical_id.is_empty());
        prop_assert!(logical_id.len() <= 255);
        prop_assert!(logical_id.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn logical_ids_are_stable(ids in prop::collection::vec(construct_id(), 1..5)) {
        prop_assert_eq!(path_of(&ids)?.logical_id(), path_of(&ids)?.logical_id());
    }

    #[test]
    fn nested_paths_get_distinct_ids(
        parent in construct_id(),
        left in construct_id(),
        right in construct_id(),
    ) {
        prop_assume!(left != right);
        let left_id = path_of(&[parent.clone(), left])?.logical_id();
        let right_id = path_of(&[parent, right])?.logical_id();
        prop_assert_ne!(left_id, right_id);
    }

    #[test]
    fn punctuation_only_ids_are_rejected(
        parent in construct_id(),
        id in punctuation_id(),
    ) {
        prop_assert!(ConstructPath::root(&id).is_err());
        let parent = path_of(&[parent])?;
        prop_assert!(parent.child(&id).is_err());
    }
}
