use std::borrow::Cow;

/// Removes characters that XML 1.0 does not allow in character data.
///
/// Feed text occasionally carries C0 control bytes (form feeds, NULs, stray
/// escape sequences) that would make the re-emitted document ill-formed.
/// Tab, newline, and carriage return are kept, as is everything from U+0020
/// up except the surrogate range and the U+FFFE/U+FFFF noncharacters.
///
/// # Returns
///
/// - `Cow::Borrowed(s)` if nothing needed removing (no allocation)
/// - `Cow::Owned` with the offending characters dropped otherwise
///
/// # Examples
///
/// ```
/// use rssfilter::util::strip_invalid_xml_chars;
/// use std::borrow::Cow;
///
/// assert!(matches!(strip_invalid_xml_chars("clean"), Cow::Borrowed(_)));
/// assert_eq!(strip_invalid_xml_chars("a\x00b\x0cc"), "abc");
/// ```
pub fn strip_invalid_xml_chars(s: &str) -> Cow<'_, str> {
    // Fast path: scan for any character that needs stripping
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
