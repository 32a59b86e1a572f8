use encoding_rs::WINDOWS_1252;

/// Replacement for characters the builtin PDF fonts cannot show
pub const REPLACEMENT: char = '?';

/// Reduce `text` to what the WinAnsi-encoded builtin fonts can render.
///
/// Characters outside Windows-1252 become `?`, control characters are
/// dropped and line breaks or tabs become spaces. Never fails.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c if is_representable(c) => Some(c),
            _ => Some(REPLACEMENT),
        })
        .collect()
}

fn is_representable(c: char) -> bool {
    if c.is_ascii() {
        return true;
    }
    let mut buf = [0u8; 4];
    let (_, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    !had_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(sanitize_text("Tangerang - Merak"), "Tangerang - Merak");
        assert_eq!(sanitize_text("Luas: 1.25 ha"), "Luas: 1.25 ha");
    }

    #[test]
    fn test_latin1_and_cp1252_survive() {
        assert_eq!(sanitize_text("café – 5 €"), "café – 5 €");
    }

    #[test]
    fn test_unrepresentable_characters_are_replaced() {
        assert_eq!(sanitize_text("Ruas ≥ 0.6 🌱"), "Ruas ? 0.6 ?");
        assert_eq!(sanitize_text("東京"), "??");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(sanitize_text("a\u{0007}b\nc\td"), "ab c d");
    }
}
