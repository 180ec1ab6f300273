//! Actor identity and guest identity generation

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// Palette used for avatars when no color was chosen
pub const AVATAR_COLORS: [&str; 8] = [
    "#FDE68A", "#FCA5A5", "#BFDBFE", "#C4B5FD", "#BBF7D0", "#FBCFE8", "#FDBA74", "#A5F3FC",
];

const FIRST_WORDS: [&str; 15] = [
    "Mellow", "Dreamy", "Quiet", "Velvet", "Soft", "Fern", "Amber", "Moon", "Willow", "Mist",
    "Sage", "Lyric", "Hush", "Cedar", "Cotton",
];

const SECOND_WORDS: [&str; 15] = [
    "Glow", "Whisper", "Lullaby", "Bloom", "Echo", "Cloud", "Thread", "Fable", "Nook", "Waltz",
    "Leaf", "Harbor", "Song", "Ember", "Murmur",
];

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Who an actor is in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub guest_id: String,
    pub display_name: String,
    pub color: String,
}

impl Identity {
    pub fn new(guest_id: impl Into<String>, display_name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            guest_id: guest_id.into(),
            display_name: display_name.into(),
            color: color.into(),
        }
    }

    /// A fresh guest with a random id, cozy name and palette color
    pub fn guest() -> Self {
        Self::new(create_guest_id(), create_display_name(), pick_avatar_color())
    }
}

/// `guest-` followed by six random base36 characters
pub fn create_guest_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("guest-{}", suffix)
}

pub fn pick_avatar_color() -> String {
    let mut rng = rand::thread_rng();
    AVATAR_COLORS.choose(&mut rng).copied().unwrap_or(AVATAR_COLORS[0]).to_string()
}

/// Two-word display name such as "Velvet Harbor"
pub fn create_display_name() -> String {
    let mut rng = rand::thread_rng();
    let first = FIRST_WORDS.choose(&mut rng).copied().unwrap_or("Quiet");
    let second = SECOND_WORDS.choose(&mut rng).copied().unwrap_or("Harbor");
    format!("{} {}", first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_id_shape() {
        let id = create_guest_id();
        assert!(id.starts_with("guest-"));
        assert_eq!(id.len(), 12);
        assert!(id[6..].bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_guest_identity_uses_palette() {
        let identity = Identity::guest();
        assert!(AVATAR_COLORS.contains(&identity.color.as_str()));
        assert_eq!(identity.display_name.split(' ').count(), 2);
    }
}
