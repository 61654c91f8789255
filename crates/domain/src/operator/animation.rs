pub const DEFAULT_SKIN: &str = "default";
pub const DEFAULT_ANIM_BASE: &str = "Move";
pub const DEFAULT_ANIM_BASE_RELAX: &str = "Relax";
pub const DEFAULT_ANIM_BATTLE: &str = "Idle";
pub const DEFAULT_MOVE_ANIM: &str = "Move";

/// Drop the technical animations a chatter should never see or pick.
pub fn filter_animations(animations: &[String]) -> Vec<String> {
    animations
        .iter()
        .filter(|name| {
            let name = name.as_str();
            name != "Default"
                && name != "Start"
                && !name.contains("Default")
                && !name.ends_with("_Begin")
                && !name.ends_with("_End")
        })
        .cloned()
        .collect()
}

/// Animations that look like walking (case-insensitive "move").
pub fn move_animations(animations: &[String]) -> Vec<String> {
    animations
        .iter()
        .filter(|name| name.to_lowercase().contains("move"))
        .cloned()
        .collect()
}

/// Case-insensitive exact match, returning the keyword's own casing.
pub fn matches_keyword<'a, S: AsRef<str>>(needle: &str, keywords: &'a [S]) -> Option<&'a str> {
    keywords
        .iter()
        .map(AsRef::as_ref)
        .find(|keyword| keyword.eq_ignore_ascii_case(needle))
}
