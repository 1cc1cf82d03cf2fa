use crate::BucketViewResult;

/// Initial state of the token field in the connect dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardToken {
    /// The clipboard held text; it pre-fills the token field.
    Filled(String),
    /// The clipboard could not be read, or was empty.
    PasteManually,
}

impl ClipboardToken {
    pub const PASTE_HINT: &'static str = "Could not read the clipboard. Paste your token manually.";

    /// Reads the system clipboard once.
    ///
    /// A failure never aborts the dialog: it only turns into the manual-paste hint.
    pub fn read() -> Self {
        match read_clipboard_text() {
            Ok(text) => Self::from_text(&text),
            Err(err) => {
                tracing::warn!("Token not taken from clipboard: {err}");
                ClipboardToken::PasteManually
            }
        }
    }

    /// Trims the clipboard text; blank text counts as unreadable.
    pub fn from_text(text: &str) -> Self {
        let token = text.trim();
        if token.is_empty() {
            ClipboardToken::PasteManually
        } else {
            ClipboardToken::Filled(token.to_string())
        }
    }

    /// Splits into the initial token text and the message shown under the field.
    pub fn into_field(self) -> (String, Option<&'static str>) {
        match self {
            ClipboardToken::Filled(token) => (token, None),
            ClipboardToken::PasteManually => (String::new(), Some(Self::PASTE_HINT)),
        }
    }
}

fn read_clipboard_text() -> BucketViewResult<String> {
    let mut clipboard = arboard::Clipboard::new()?;
    Ok(clipboard.get_text()?)
}

#[cfg(test)]
mod tests_clipboard {
    use super::*;

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(
            ClipboardToken::from_text("  abc123\n"),
            ClipboardToken::Filled("abc123".to_string())
        );
    }

    #[test]
    fn test_blank_text_asks_for_manual_paste() {
        assert_eq!(ClipboardToken::from_text(" \t\n"), ClipboardToken::PasteManually);
    }

    #[test]
    fn test_into_field() {
        let (token, hint) = ClipboardToken::Filled("t".into()).into_field();
        assert_eq!((token.as_str(), hint), ("t", None));

        let (token, hint) = ClipboardToken::PasteManually.into_field();
        assert!(token.is_empty());
        assert_eq!(hint, Some(ClipboardToken::PASTE_HINT));
    }
}
