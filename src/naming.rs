//! Canonical slot identifiers shared by schema columns and CSV headers.

/// Maps a snake-style column name to its slot identifier.
///
/// The name is split on underscores only. Each segment gets an uppercase
/// first character and a lowercase tail, and the segments are joined without
/// a separator, so `nutrient_cat_id` becomes `NutrientCatId` while `itemId`
/// becomes `Itemid`. Schema columns and CSV headers both pass through here,
/// which is what lets a header resolve to the slot of the same column.
pub fn normalize(column_name: &str) -> String {
    column_name.split('_').map(title_case).collect()
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn normalize_joins_title_cased_segments() {
        assert_eq!(normalize("nutrient_cat_id"), "NutrientCatId");
        assert_eq!(normalize("item_id"), "ItemId");
        assert_eq!(normalize("name"), "Name");
    }

    #[test]
    fn normalize_tolerates_edge_underscores_and_digits() {
        assert_eq!(normalize("_id"), "Id");
        assert_eq!(normalize("id_"), "Id");
        assert_eq!(normalize("unit_2_alt"), "Unit2Alt");
        assert_eq!(normalize("2024"), "2024");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("___"), "");
    }

    #[test]
    fn normalize_lowercases_segment_tails() {
        assert_eq!(normalize("NLEA_val"), "NleaVal");
        assert_eq!(normalize("UPC"), "Upc");
    }

    #[test]
    fn normalize_is_stable_across_calls() {
        let first = normalize("recipe_item_junc_id");
        let second = normalize("recipe_item_junc_id");
        assert_eq!(first, second);
        assert_eq!(first, "RecipeItemJuncId");
    }

    #[test]
    fn normalize_splits_on_underscores_only() {
        assert_eq!(normalize("itemId"), "Itemid");
        assert_ne!(normalize("itemId"), normalize("item_id"));
        assert_eq!(normalize("ItemID"), "Itemid");
        assert_eq!(normalize("item-id"), "Item-id");
        assert_eq!(normalize("item id"), "Item id");
        assert_eq!(normalize("crème_brûlée"), "CrèmeBrûlée");
    }

    proptest! {
        #[test]
        fn snake_names_capitalize_each_segment(
            segments in prop::collection::vec("[a-z]{1,8}", 1..5)
        ) {
            let expected = segments
                .iter()
                .map(|segment| {
                    let mut chars = segment.chars();
                    let head = chars.next().map(|c| c.to_ascii_uppercase());
                    head.into_iter().chain(chars).collect::<String>()
                })
                .collect::<String>();
            prop_assert_eq!(normalize(&segments.join("_")), expected);
        }
    }
}
