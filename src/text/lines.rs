/// Split text into lines, each keeping its `\n` terminator.
///
/// A trailing empty line is not produced: `"a\n"` is one line and `""` is
/// none. `\r` is ordinary content.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_owned).collect()
}

/// Number of chars (Unicode scalar values) in `text`.
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `chars`-th char of `text`, clamped to `text.len()`.
pub fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("", &[])]
    #[case::single_unterminated("abc", &["abc"])]
    #[case::single_terminated("abc\n", &["abc\n"])]
    #[case::blank_lines("\n\n", &["\n", "\n"])]
    #[case::mixed("a\nb\nc", &["a\n", "b\n", "c"])]
    #[case::carriage_return_is_content("a\r\nb", &["a\r\n", "b"])]
    fn test_split_lines_keeps_terminators(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(split_lines(text), expected);
    }

    #[test]
    fn test_char_to_byte_handles_multibyte() {
        let text = "aé日b";
        assert_eq!(char_to_byte(text, 0), 0);
        assert_eq!(char_to_byte(text, 1), 1);
        assert_eq!(char_to_byte(text, 2), 3);
        assert_eq!(char_to_byte(text, 3), 6);
        assert_eq!(char_to_byte(text, 4), 7);
        assert_eq!(char_to_byte(text, 99), 7);
        assert_eq!(char_len(text), 4);
    }
}
