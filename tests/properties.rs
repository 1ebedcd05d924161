use proptest::prelude::*;
use wellbeing_merge::{
    aliases::resolve_aliases,
    data::{DecimalSeparator, RawCell, coerce_numeric},
    merge::{Secondary, merge},
    normalize::{NormalizedRecord, NormalizedTable},
    profile::SourceKind,
    select::pick_column,
};

fn recase(value: &str, mask: &[bool]) -> String {
    value
        .chars()
        .zip(mask.iter().cycle())
        .map(|(ch, upper)| {
            if *upper {
                ch.to_ascii_uppercase()
            } else {
                ch
            }
        })
        .collect()
}

fn source_kind() -> impl Strategy<Value = SourceKind> {
    prop_oneof![
        Just(SourceKind::Happiness),
        Just(SourceKind::LifeExpectancy),
    ]
}

proptest! {
    #[test]
    fn any_candidate_spelling_in_any_case_resolves(
        kind in source_kind(),
        entry_seed in any::<usize>(),
        candidate_seed in any::<usize>(),
        mask in proptest::collection::vec(any::<bool>(), 1..16),
        padding in "[ ]{0,3}",
    ) {
        let table = kind.profile().aliases;
        let entry = &table.fields[entry_seed % table.fields.len()];
        let candidate = &entry.candidates[candidate_seed % entry.candidates.len()];
        let header = format!("{padding}{}{padding}", recase(candidate, &mask));

        let resolved = resolve_aliases(&[header.clone()], &table);
        prop_assert_eq!(resolved.header_for(entry.field), Some(header.as_str()));
        prop_assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn numeric_coercion_is_idempotent(
        text in "[ ]{0,2}[-+]?[0-9]{0,4}([.,][0-9]{0,3})?[a-z]{0,1}[ ]{0,2}",
        comma in any::<bool>(),
    ) {
        let decimal = if comma { DecimalSeparator::Comma } else { DecimalSeparator::Period };
        let once = coerce_numeric(&RawCell::from(text.as_str()), decimal);
        if let Some(value) = once {
            prop_assert!(value.is_finite());
            prop_assert_eq!(coerce_numeric(&RawCell::Number(value), decimal), Some(value));
        }
    }

    #[test]
    fn non_numeric_text_coerces_to_null(text in "[a-zA-Z_ ]{0,12}") {
        // Letters alone never form a finite number, apart from spellings of
        // infinity and NaN, which are rejected as non-finite.
        prop_assert_eq!(coerce_numeric(&RawCell::from(text.as_str()), DecimalSeparator::Period), None);
    }

    #[test]
    fn merge_preserves_primary_row_count(
        primary in proptest::collection::btree_set("[A-Z][a-z]{2,6}", 0..20),
        secondary in proptest::collection::btree_set("[A-Z][a-z]{2,6}", 0..20),
    ) {
        let primary_table = NormalizedTable::new(
            "happiness",
            vec![],
            primary.iter().map(NormalizedRecord::new).collect(),
        );
        let secondary_table = NormalizedTable::new(
            "peace_index",
            vec![wellbeing_merge::fields::CanonicalField::PeaceScore],
            secondary.iter().map(NormalizedRecord::new).collect(),
        );
        let (merged, report) = merge(&primary_table, &[Secondary::Loaded(secondary_table)]).unwrap();
        prop_assert_eq!(merged.len(), primary.len());
        prop_assert_eq!(report.sources[0].matched, primary.intersection(&secondary).count());
    }

    #[test]
    fn column_choice_has_maximum_count_and_is_leftmost(
        counts in proptest::collection::vec(0usize..50, 1..8),
    ) {
        let indexed: Vec<(usize, usize)> = counts.iter().copied().enumerate().collect();
        let (index, _) = pick_column(&indexed).unwrap();
        let max = *counts.iter().max().unwrap();
        if max == 0 {
            prop_assert_eq!(index, counts.len() - 1);
        } else {
            prop_assert_eq!(index, counts.iter().position(|c| *c == max).unwrap());
        }
    }
}
