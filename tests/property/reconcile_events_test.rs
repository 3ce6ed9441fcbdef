//! Property-based tests for change-event reconciliation in `ReconciledView`.
//!
//! Each row gets a plan: optionally present in the seed snapshot, one or more
//! INSERT deliveries, then optionally a delete (remote, or local and committed)
//! followed by repeated DELETE deliveries. Plans are interleaved across rows
//! while keeping each row's own order. Whatever the interleaving, the list
//! holds each live row once, no deleted row, newest first.

use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;
use smartmarks::managers::reconciled_view::{DeleteOutcome, ReconciledView};
use smartmarks::services::change_feed::BOOKMARKS_TABLE;
use smartmarks::types::bookmark::Bookmark;
use smartmarks::types::event::ChangeEvent;

const USER: &str = "user-1";

#[derive(Debug, Clone, Copy)]
enum Ending {
    Kept,
    RemoteDelete,
    LocalDelete,
}

#[derive(Debug, Clone)]
struct RowPlan {
    seeded: bool,
    inserts: usize,
    ending: Ending,
    delete_events: usize,
}

#[derive(Debug, Clone)]
enum Step {
    Insert(usize),
    Delete(usize),
    LocalDelete(usize),
}

fn arb_plan() -> impl Strategy<Value = RowPlan> {
    (
        any::<bool>(),
        1usize..=3,
        prop_oneof![
            Just(Ending::Kept),
            Just(Ending::RemoteDelete),
            Just(Ending::LocalDelete),
        ],
        1usize..=3,
    )
        .prop_map(|(seeded, inserts, ending, delete_events)| RowPlan {
            seeded,
            inserts,
            ending,
            delete_events,
        })
}

fn row(i: usize) -> Bookmark {
    Bookmark {
        id: format!("b{}", i),
        title: format!("Bookmark {}", i),
        url: format!("https://example.com/{}", i),
        user_id: USER.to_string(),
        created_at: 1_000 + i as i64,
    }
}

fn steps_for(i: usize, plan: &RowPlan) -> VecDeque<Step> {
    let mut steps: VecDeque<Step> = (0..plan.inserts).map(|_| Step::Insert(i)).collect();
    match plan.ending {
        Ending::Kept => {}
        Ending::RemoteDelete => steps.extend((0..plan.delete_events).map(|_| Step::Delete(i))),
        Ending::LocalDelete => {
            steps.push_back(Step::LocalDelete(i));
            steps.extend((0..plan.delete_events).map(|_| Step::Delete(i)));
        }
    }
    steps
}

/// Merges per-row queues, using `selectors` to choose which row goes next.
fn interleave(mut queues: Vec<VecDeque<Step>>, selectors: &[usize]) -> Vec<Step> {
    let mut out = Vec::new();
    let mut selectors = selectors.iter();
    loop {
        let live: Vec<usize> = (0..queues.len()).filter(|&q| !queues[q].is_empty()).collect();
        if live.is_empty() {
            return out;
        }
        let pick = selectors.next().map(|s| live[s % live.len()]).unwrap_or(live[0]);
        if let Some(step) = queues[pick].pop_front() {
            out.push(step);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn interleaved_events_converge(
        plans in proptest::collection::vec(arb_plan(), 1..8),
        selectors in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let seed: Vec<Bookmark> = plans
            .iter()
            .enumerate()
            .filter(|(_, p)| p.seeded)
            .map(|(i, _)| row(i))
            .collect();
        let mut view = ReconciledView::detached(USER, seed);

        let queues = plans.iter().enumerate().map(|(i, p)| steps_for(i, p)).collect();
        for step in interleave(queues, &selectors) {
            match step {
                Step::Insert(i) => {
                    view.on_change_event(&ChangeEvent::insert(BOOKMARKS_TABLE, row(i)));
                }
                Step::Delete(i) => {
                    view.on_change_event(&ChangeEvent::delete(BOOKMARKS_TABLE, row(i)));
                }
                Step::LocalDelete(i) => {
                    let pending = view.begin_delete(&row(i).id);
                    prop_assert!(pending.is_some());
                    if let Some(pending) = pending {
                        prop_assert!(matches!(
                            view.finish_delete(pending, Ok(())),
                            DeleteOutcome::Committed
                        ));
                    }
                }
            }

            let ids = view.ids();
            let unique: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len(), "duplicate id in {:?}", ids);
        }

        let expected: HashSet<String> = plans
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p.ending, Ending::Kept))
            .map(|(i, _)| row(i).id)
            .collect();
        let actual: HashSet<String> = view.ids().into_iter().map(str::to_string).collect();
        prop_assert_eq!(actual, expected);

        let stamps: Vec<i64> = view.bookmarks().iter().map(|b| b.created_at).collect();
        prop_assert!(stamps.windows(2).all(|w| w[0] > w[1]), "not newest first: {:?}", stamps);
        prop_assert!(view.take_alert().is_none());
    }
}
