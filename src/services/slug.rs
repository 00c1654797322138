/// Fold a Vietnamese vowel (any tone, any hat) to its base letter
fn fold(c: char) -> Option<char> {
    const GROUPS: &[(&str, char)] = &[
        ("àáạảãâầấậẩẫăằắặẳẵ", 'a'),
        ("èéẹẻẽêềếệểễ", 'e'),
        ("ìíịỉĩ", 'i'),
        ("òóọỏõôồốộổỗơờớợởỡ", 'o'),
        ("ùúụủũưừứựửữ", 'u'),
        ("ỳýỵỷỹ", 'y'),
        ("đ", 'd'),
    ];
    GROUPS
        .iter()
        .find(|(letters, _)| letters.contains(c))
        .map(|(_, base)| *base)
}

/// URL slug for a product or category name.
///
/// Lowercases, folds Vietnamese letters to ASCII, turns whitespace runs into
/// `-`, drops anything that is not `[A-Za-z0-9_-]`, and collapses/trims dashes.
pub fn create_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;

    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;

        let c = fold(c).unwrap_or(c);
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_vietnamese() {
        assert_eq!(create_slug("Bánh Bông Lan Trứng Muối"), "banh-bong-lan-trung-muoi");
        assert_eq!(create_slug("Nước Ép Đào"), "nuoc-ep-dao");
        assert_eq!(create_slug("Kẹo dừa Bến Tre"), "keo-dua-ben-tre");
        assert_eq!(create_slug("Mỳ ý"), "my-y");
    }

    #[test]
    fn strips_punctuation_and_dashes() {
        assert_eq!(create_slug("  Trà sữa -- (size L)!  "), "tra-sua-size-l");
        assert_eq!(create_slug("---"), "");
        assert_eq!(create_slug("Combo 3 + 1"), "combo-3-1");
    }

    #[test]
    fn drops_characters_outside_ascii_words() {
        assert_eq!(create_slug("黄油饼干 Butter"), "butter");
        assert_eq!(create_slug("snake_case name"), "snake_case-name");
    }
}
