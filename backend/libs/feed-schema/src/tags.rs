//! Hobby tags
//!
//! A user's interests are drawn from a closed set of categories. Documents
//! carry them as their display names ("Gaming", "Music", ...).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Set of hobby tags, ordered by declaration order of [`Hobby`]
pub type TagSet = BTreeSet<Hobby>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hobby {
    Gaming,
    Reading,
    Sports,
    Music,
    Art,
    Cooking,
    Photography,
    Programming,
    Dancing,
    Hiking,
    Movies,
    Fashion,
    Travel,
    Fitness,
    Writing,
    Gardening,
    Yoga,
    Cycling,
    Painting,
    Crafts,
}

impl Hobby {
    pub const ALL: [Hobby; 20] = [
        Hobby::Gaming,
        Hobby::Reading,
        Hobby::Sports,
        Hobby::Music,
        Hobby::Art,
        Hobby::Cooking,
        Hobby::Photography,
        Hobby::Programming,
        Hobby::Dancing,
        Hobby::Hiking,
        Hobby::Movies,
        Hobby::Fashion,
        Hobby::Travel,
        Hobby::Fitness,
        Hobby::Writing,
        Hobby::Gardening,
        Hobby::Yoga,
        Hobby::Cycling,
        Hobby::Painting,
        Hobby::Crafts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Hobby::Gaming => "Gaming",
            Hobby::Reading => "Reading",
            Hobby::Sports => "Sports",
            Hobby::Music => "Music",
            Hobby::Art => "Art",
            Hobby::Cooking => "Cooking",
            Hobby::Photography => "Photography",
            Hobby::Programming => "Programming",
            Hobby::Dancing => "Dancing",
            Hobby::Hiking => "Hiking",
            Hobby::Movies => "Movies",
            Hobby::Fashion => "Fashion",
            Hobby::Travel => "Travel",
            Hobby::Fitness => "Fitness",
            Hobby::Writing => "Writing",
            Hobby::Gardening => "Gardening",
            Hobby::Yoga => "Yoga",
            Hobby::Cycling => "Cycling",
            Hobby::Painting => "Painting",
            Hobby::Crafts => "Crafts",
        }
    }

    /// Emoji shown next to the tag in pickers
    pub fn icon(&self) -> &'static str {
        match self {
            Hobby::Gaming => "🎮",
            Hobby::Reading => "📚",
            Hobby::Sports => "⚽",
            Hobby::Music => "🎵",
            Hobby::Art => "🎨",
            Hobby::Cooking => "🍳",
            Hobby::Photography => "📷",
            Hobby::Programming => "💻",
            Hobby::Dancing => "💃",
            Hobby::Hiking => "🥾",
            Hobby::Movies => "🎬",
            Hobby::Fashion => "👗",
            Hobby::Travel => "✈️",
            Hobby::Fitness => "💪",
            Hobby::Writing => "✍️",
            Hobby::Gardening => "🌱",
            Hobby::Yoga => "🧘",
            Hobby::Cycling => "🚴",
            Hobby::Painting => "🖼️",
            Hobby::Crafts => "🎨",
        }
    }
}

impl fmt::Display for Hobby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHobby(pub String);

impl fmt::Display for UnknownHobby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hobby tag: {}", self.0)
    }
}

impl std::error::Error for UnknownHobby {}

impl FromStr for Hobby {
    type Err = UnknownHobby;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hobby::ALL
            .iter()
            .copied()
            .find(|h| h.name() == s)
            .ok_or_else(|| UnknownHobby(s.to_string()))
    }
}

/// Deserialize a tag list, dropping entries that are not known tags.
///
/// Tag documents are user-editable, so an unrecognized name degrades to
/// "not selected" rather than failing the whole user document.
pub fn lenient_tags<'de, D>(deserializer: D) -> Result<TagSet, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| s.parse().ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hobby_round_trips_through_name() {
        for hobby in Hobby::ALL {
            assert_eq!(hobby.name().parse::<Hobby>(), Ok(hobby));
        }
    }

    #[test]
    fn test_unknown_hobby() {
        assert_eq!(
            "Skydiving".parse::<Hobby>(),
            Err(UnknownHobby("Skydiving".into()))
        );
    }

    #[test]
    fn test_serde_uses_display_name() {
        let json = serde_json::to_string(&Hobby::Programming).unwrap();
        assert_eq!(json, "\"Programming\"");
    }

    #[test]
    fn test_tag_set_orders_by_declaration() {
        let tags: TagSet = [Hobby::Crafts, Hobby::Gaming, Hobby::Music]
            .into_iter()
            .collect();
        let ordered: Vec<_> = tags.into_iter().collect();
        assert_eq!(ordered, vec![Hobby::Gaming, Hobby::Music, Hobby::Crafts]);
    }
}
