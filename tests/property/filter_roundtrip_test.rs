//! Property-based tests for the `column=eq.value` filter syntax.

use proptest::prelude::*;
use smartmarks::types::bookmark::{Bookmark, BookmarkColumn};
use smartmarks::types::filter::Filter;

fn arb_column() -> impl Strategy<Value = BookmarkColumn> {
    prop_oneof![
        Just(BookmarkColumn::Id),
        Just(BookmarkColumn::Title),
        Just(BookmarkColumn::Url),
        Just(BookmarkColumn::UserId),
    ]
}

/// Values as they appear in subscriptions: ids, uuids and plain words.
fn arb_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._:/-]{0,36}"
}

fn arb_bookmark() -> impl Strategy<Value = Bookmark> {
    (arb_value(), arb_value(), arb_value(), arb_value(), any::<i64>()).prop_map(
        |(id, title, url, user_id, created_at)| Bookmark {
            id,
            title,
            url,
            user_id,
            created_at,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rendered_filter_parses_back(
        clauses in proptest::collection::vec((arb_column(), arb_value()), 1..4),
    ) {
        let filter = clauses
            .iter()
            .fold(Filter::new(), |f, (column, value)| f.eq(*column, value.clone()));
        let parsed = Filter::parse(&filter.to_string()).unwrap();
        prop_assert_eq!(parsed, filter);
    }

    #[test]
    fn owner_filter_matches_only_owned_rows(bookmark in arb_bookmark(), other in arb_value()) {
        let own = Filter::parse(&format!("user_id=eq.{}", bookmark.user_id)).unwrap();
        prop_assert!(own.matches(&bookmark));

        let foreign = Filter::new().eq(BookmarkColumn::UserId, other.clone());
        prop_assert_eq!(foreign.matches(&bookmark), other == bookmark.user_id);
    }
}
