//! Property-based tests for pagination and id minting invariants.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use omnichat_core::{Page, Registry, Role, UserType, primitives::MAX_PAGE_SIZE};
use proptest::prelude::*;

proptest! {
    /// A page never returns more items than requested, never more than the
    /// clamp, and the reported total never depends on the window.
    #[test]
    fn prop_pagination_window_bounds(
        population in 0usize..200,
        offset in 0usize..300,
        count in 0usize..1000,
    ) {
        let mut registry = Registry::new();
        for n in 0..population {
            registry
                .create_account(&format!("agent{n}"), "Agent", [Role::LivechatAgent])
                .unwrap();
        }

        let (page, total) = registry
            .list_users(UserType::Agent, Page::new(offset, count))
            .unwrap();

        prop_assert_eq!(total, population);
        prop_assert!(page.len() <= count.min(MAX_PAGE_SIZE));
        prop_assert!(page.len() <= population.saturating_sub(offset));
    }

    /// Paging through the whole population in fixed windows visits every
    /// record exactly once, in a stable order.
    #[test]
    fn prop_pagination_is_a_partition(
        population in 1usize..100,
        window in 1usize..20,
    ) {
        let mut registry = Registry::new();
        for n in 0..population {
            registry
                .create_account(&format!("agent{n}"), "Agent", [Role::LivechatAgent])
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let (page, _) = registry
                .list_users(UserType::Agent, Page::new(offset, window))
                .unwrap();
            if page.is_empty() {
                break;
            }
            offset += page.len();
            seen.extend(page.into_iter().map(|u| u.id));
        }

        prop_assert_eq!(seen.len(), population);
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), population, "no record may repeat across pages");
    }

    /// Minted account ids are unique regardless of creation order.
    #[test]
    fn prop_minted_ids_are_unique(usernames in proptest::collection::btree_set("[a-z]{1,12}", 1..40)) {
        let mut registry = Registry::new();
        let mut ids = Vec::new();
        for username in &usernames {
            let account = registry.create_account(username, "User", []).unwrap();
            ids.push(account.id);
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), ids.len());
    }
}
