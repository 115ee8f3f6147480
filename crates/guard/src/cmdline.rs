#![forbid(unsafe_code)]

//! Raw command line scanning.
//!
//! The command line is searched as a single string rather than split into
//! arguments, since launchers pass paths with spaces unquoted.

const EXECUTABLE_SUFFIX: &str = ".exe";
const NEXT_FLAG: &str = " -";

/// Value following the first occurrence of `prefix` in `command_line`.
///
/// A value starting with `"` runs to the next quote and is absent if the
/// quote is never closed. Any other value ends right after the first
/// `.exe`, right before the first ` -`, whichever comes first, or at the end
/// of the line. Empty values are absent.
pub fn flag_value(command_line: &str, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let start = command_line.find(prefix)? + prefix.len();
    let rest = &command_line[start..];

    let value = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => unquoted(rest),
    };
    (!value.is_empty()).then(|| value.to_owned())
}

fn unquoted(rest: &str) -> &str {
    for (at, _) in rest.char_indices() {
        let tail = &rest[at..];
        if tail.starts_with(EXECUTABLE_SUFFIX) {
            return &rest[..at + EXECUTABLE_SUFFIX.len()];
        }
        if tail.starts_with(NEXT_FLAG) {
            return &rest[..at];
        }
    }
    rest
}

/// Whether `flag` is one of `args`, compared exactly.
pub fn has_argument<I, S>(args: I, flag: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().any(|arg| arg.as_ref() == flag)
}
