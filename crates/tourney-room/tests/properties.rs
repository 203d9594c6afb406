//! Property tests: invariants that must hold after any action sequence.

use proptest::prelude::*;
use tourney_protocol::{ParticipantId, RoomId};
use tourney_room::{Action, Phase, Rules, Snapshot, VotePolicy, reduce, validate};

const NAMES: [&str; 4] = ["ann", "ben", "cat", "dan"];
const ENTRIES: [&str; 4] = ["A", "B", "C", "D"];

fn rid() -> RoomId {
    RoomId::new("r")
}

/// Random actions against a single room, weighted toward the interesting
/// ones. Indices pick from small pools so collisions are common.
fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        1 => (0..4usize).prop_map(|p| Action::JoinRoom {
            room_id: rid(),
            participant: ParticipantId::new(NAMES[p]),
        }),
        3 => (0..4usize, 0..4usize).prop_map(|(p, e)| Action::AddEntry {
            room_id: rid(),
            participant: ParticipantId::new(NAMES[p]),
            content: ENTRIES[e].to_string(),
        }),
        1 => Just(Action::StartVoting { room_id: Some(rid()) }),
        3 => (0..4usize, 0..4usize).prop_map(|(p, e)| Action::Vote {
            room_id: Some(rid()),
            participant: ParticipantId::new(NAMES[p]),
            content: ENTRIES[e].to_string(),
        }),
        2 => Just(Action::Next { room_id: Some(rid()) }),
    ]
}

fn policy() -> impl Strategy<Value = VotePolicy> {
    prop_oneof![Just(VotePolicy::OncePerRound), Just(VotePolicy::Repeated)]
}

fn created() -> Snapshot {
    reduce(
        &Snapshot::default(),
        &Action::CreateRoom {
            room_id: rid(),
            name: "n".into(),
            theme: "t".into(),
            creator: ParticipantId::new("host"),
        },
        &Rules::default(),
    )
}

proptest! {
    #[test]
    fn phase_only_moves_forward(
        actions in prop::collection::vec(action(), 0..60),
        vote_policy in policy(),
    ) {
        let rules = Rules::with_vote_policy(vote_policy);
        let mut snap = created();

        for action in &actions {
            let before = snap.room(&rid()).unwrap().phase();
            let entries_before = snap.room(&rid()).unwrap().entries().len();
            snap = reduce(&snap, action, &rules);
            let after = snap.room(&rid()).unwrap().phase();

            prop_assert!(before == after || before.can_transition_to(after));
            if before == Phase::Collecting && after == Phase::Voting {
                prop_assert!(entries_before >= 2);
            }
        }
    }

    #[test]
    fn at_most_one_entry_per_author(actions in prop::collection::vec(action(), 0..60)) {
        let rules = Rules::default();
        let mut snap = created();
        for action in &actions {
            snap = reduce(&snap, action, &rules);

            let room = snap.room(&rid()).unwrap();
            if room.phase() != Phase::Collecting {
                continue;
            }
            for name in NAMES {
                let author = ParticipantId::new(name);
                let count = room.entries().iter().filter(|e| e.author == author).count();
                prop_assert!(count <= 1, "{} has {} entries", name, count);
            }
        }
    }

    #[test]
    fn structural_invariants_hold(actions in prop::collection::vec(action(), 0..60)) {
        let rules = Rules::default();
        let mut snap = created();
        for action in &actions {
            snap = reduce(&snap, action, &rules);
            let room = snap.room(&rid()).unwrap();
            prop_assert_eq!(room.vote_round().is_some(), room.phase() == Phase::Voting);
            prop_assert_eq!(room.winner().is_some(), room.phase() == Phase::Completed);
            if let Some(round) = room.vote_round() {
                for content in round.tally.keys() {
                    prop_assert!(round.contains(content));
                }
            }
        }
    }

    #[test]
    fn validate_agrees_with_reduce(
        actions in prop::collection::vec(action(), 0..40),
        vote_policy in policy(),
    ) {
        let rules = Rules::with_vote_policy(vote_policy);
        let mut snap = created();
        for action in &actions {
            let next = reduce(&snap, action, &rules);
            if validate(&snap, action, &rules).is_err() {
                prop_assert_eq!(&next, &snap);
            }
            snap = next;
        }
    }

    #[test]
    fn tallies_never_decrease_within_a_round(actions in prop::collection::vec(action(), 0..60)) {
        let rules = Rules::with_vote_policy(VotePolicy::Repeated);
        let mut snap = created();
        for action in &actions {
            let before = snap.room(&rid()).unwrap().vote_round().cloned();
            snap = reduce(&snap, action, &rules);
            let after = snap.room(&rid()).unwrap().vote_round();

            if let (Some(before), Some(after), Action::Vote { .. }) = (before, after, action) {
                for (content, count) in &before.tally {
                    prop_assert!(after.votes_for(content) >= *count);
                }
                prop_assert!(before.voters.is_subset(&after.voters));
            }
        }
    }
}
