use super::*;
use proptest::prelude::*;

fn fill(draft: &mut ScenarioDraft, id: ParticipantId) {
    draft.update_field(id, ParticipantField::Name, "Jordan");
    draft.update_field(id, ParticipantField::Role, "Upset with Alex");
    draft.update_field(id, ParticipantField::Perspective, "Feels unheard");
    draft.update_field(id, ParticipantField::InitialMessage, "Hi");
    draft.update_meta_tag(id, 0, "angry").expect("tag");
}

fn complete_draft() -> ScenarioDraft {
    let mut draft = ScenarioDraft::default();
    draft.name = "S".into();
    draft.system_prompt = "P".into();
    let id = draft.participants()[0].id;
    fill(&mut draft, id);
    draft
}

#[test]
fn fresh_draft_has_one_empty_participant() {
    let draft = ScenarioDraft::default();
    assert_eq!(draft.participants().len(), 1);
    let participant = &draft.participants()[0];
    assert!(participant.name.is_empty());
    assert!(participant.meta_tags.is_empty());
    assert!(!draft.validate());
}

#[test]
fn removed_ids_are_never_reused() {
    let mut draft = ScenarioDraft::default();
    let first = draft.participants()[0].id;
    let second = draft.add_participant().participant_id;
    assert!(draft.remove_participant(second));
    let third = draft.add_participant().participant_id;
    assert_ne!(third, second);
    assert_ne!(third, first);
}

#[test]
fn restarted_draft_continues_participant_ids() {
    let mut draft = ScenarioDraft::default();
    let first = draft.cards()[0].participant_id;
    draft.add_participant();

    let next = draft.restart(ModelSettings::default());

    let fresh = next.cards()[0].participant_id;
    assert_eq!(next.participants().len(), 1);
    assert!(fresh > first);
    assert_ne!(fresh, draft.cards()[1].participant_id);
}

#[test]
fn removal_renumbers_cards_in_current_order() {
    let mut draft = ScenarioDraft::default();
    let a = draft.participants()[0].id;
    let b = draft.add_participant().participant_id;
    let c = draft.add_participant().participant_id;

    assert!(draft.remove_participant(b));
    assert!(!draft.remove_participant(b), "second removal is a no-op");

    let cards = draft.cards();
    assert_eq!(
        cards,
        vec![
            ParticipantCard {
                ordinal: 1,
                participant_id: a
            },
            ParticipantCard {
                ordinal: 2,
                participant_id: c
            },
        ]
    );
    assert_eq!(draft.id_at(2), Some(c));
    assert_eq!(draft.id_at(0), None);
    assert_eq!(draft.id_at(3), None);
}

#[test]
fn update_field_after_removal_is_silent_noop() {
    let mut draft = ScenarioDraft::default();
    let id = draft.participants()[0].id;
    draft.remove_participant(id);
    assert!(!draft.update_field(id, ParticipantField::Name, "ghost"));
    assert_eq!(draft.update_meta_tag(id, 1, "x"), Ok(false));
    assert!(draft.participants().is_empty());
}

#[test]
fn meta_tag_update_pads_to_three_and_trims() {
    let mut draft = ScenarioDraft::default();
    let id = draft.participants()[0].id;

    draft.update_meta_tag(id, 2, "  x  ").expect("tag");

    let tags = &draft.participant(id).expect("participant").meta_tags;
    assert_eq!(tags, &vec![String::new(), String::new(), "x".to_string()]);

    draft.update_meta_tag(id, 0, "angry").expect("tag");
    let tags = &draft.participant(id).expect("participant").meta_tags;
    assert_eq!(tags.len(), MAX_META_TAGS);
    assert_eq!(tags[0], "angry");
}

#[test]
fn meta_tag_index_out_of_range_is_rejected() {
    let mut draft = ScenarioDraft::default();
    let id = draft.participants()[0].id;
    assert_eq!(draft.update_meta_tag(id, 3, "x"), Err(TagIndexOutOfRange(3)));
    assert!(draft.participant(id).expect("participant").meta_tags.is_empty());
}

#[test]
fn serialize_strips_empty_meta_tags() {
    let mut draft = complete_draft();
    let id = draft.participants()[0].id;
    draft.update_meta_tag(id, 0, "angry").expect("tag");
    draft.update_meta_tag(id, 1, "").expect("tag");
    draft.update_meta_tag(id, 2, "powerless").expect("tag");

    let wire = draft.serialize();
    assert_eq!(wire.participants[0].meta_tags, vec!["angry", "powerless"]);

    let json = serde_json::to_value(&wire).expect("json");
    assert_eq!(json["participants"][0]["initial_message"], "Hi");
    assert_eq!(json["settings"]["max_tokens"], 400);
}

#[test]
fn validate_does_not_mutate() {
    let draft = complete_draft();
    let before = draft.clone();
    assert!(draft.validate());
    assert_eq!(draft, before);
}

#[test]
fn whitespace_only_tags_do_not_count() {
    let mut draft = complete_draft();
    let id = draft.participants()[0].id;
    draft.update_meta_tag(id, 0, "   ").expect("tag");
    assert!(!draft.validate());
    assert_eq!(
        draft.issues(),
        vec![DraftIssue::ParticipantMetaTags { ordinal: 1 }]
    );
}

#[test]
fn empty_participant_list_is_incomplete() {
    let mut draft = complete_draft();
    let id = draft.participants()[0].id;
    draft.remove_participant(id);
    assert!(!draft.validate());
    assert_eq!(draft.issues(), vec![DraftIssue::NoParticipants]);
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), (0usize..8).prop_map(Op::Remove)]
}

proptest! {
    #[test]
    fn cards_are_contiguous_in_current_order(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut draft = ScenarioDraft::default();
        let mut expected: Vec<ParticipantId> = vec![draft.participants()[0].id];

        for op in ops {
            match op {
                Op::Add => expected.push(draft.add_participant().participant_id),
                Op::Remove(index) => {
                    if let Some(id) = expected.get(index).copied() {
                        expected.remove(index);
                        prop_assert!(draft.remove_participant(id));
                    }
                }
            }
        }

        let cards = draft.cards();
        prop_assert_eq!(cards.len(), expected.len());
        for (index, card) in cards.iter().enumerate() {
            prop_assert_eq!(card.ordinal, index + 1);
            prop_assert_eq!(card.participant_id, expected[index]);
        }
    }

    #[test]
    fn validate_fails_whenever_a_required_field_is_empty(
        omit_name in any::<bool>(),
        omit_prompt in any::<bool>(),
        omitted in prop::collection::vec(prop::collection::vec(any::<bool>(), 5), 1..4),
    ) {
        let mut draft = ScenarioDraft::default();
        if !omit_name {
            draft.name = "S".into();
        }
        if !omit_prompt {
            draft.system_prompt = "P".into();
        }
        for (index, flags) in omitted.iter().enumerate() {
            let id = if index == 0 {
                draft.participants()[0].id
            } else {
                draft.add_participant().participant_id
            };
            for (field, skip) in ParticipantField::ALL.iter().zip(flags.iter()) {
                if !skip {
                    draft.update_field(id, *field, "value");
                }
            }
            if !flags[4] {
                draft.update_meta_tag(id, index % MAX_META_TAGS, "tag").expect("tag");
            }
        }

        let anything_omitted =
            omit_name || omit_prompt || omitted.iter().flatten().any(|skip| *skip);
        prop_assert_eq!(draft.validate(), !anything_omitted);
        prop_assert_eq!(draft.validate(), draft.issues().is_empty());
    }
}
