// src/sys/scripts.rs
//
// Remote shell text. Everything here is POSIX sh so it runs under whatever
// login shell the remote account has.

// ==============================================================================
// 1. Quoting, Paths & Clock
// ==============================================================================

/// Prints the remote clock as whole seconds since the epoch.
pub const REMOTE_EPOCH_COMMAND: &str = "date +%s";

/// Single-quotes `raw` for a POSIX shell. Embedded quotes become `'\''`.
pub fn shell_quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('\'');
    for c in raw.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Splits a remote directory into the directory to `cd` into and the entry
/// to archive from there.
pub fn split_remote_dir(directory: &str) -> (String, String) {
    let trimmed = directory.trim_end_matches('/');
    if trimmed.is_empty() {
        // "" archives the login directory, "/" (or "///") the root
        return if directory.starts_with('/') {
            ("/".to_string(), ".".to_string())
        } else {
            (".".to_string(), ".".to_string())
        };
    }

    match trimmed.rsplit_once('/') {
        Some(("", leaf)) => ("/".to_string(), leaf.to_string()),
        Some((parent, leaf)) => (parent.to_string(), leaf.to_string()),
        None => (".".to_string(), trimmed.to_string()),
    }
}

// ==============================================================================
// 2. Archive Stream
// ==============================================================================

/// `cd` to the parent and write a gzip tar of the leaf to stdout.
///
/// A missing leaf exits 2 before tar starts: GNU tar would otherwise emit
/// the gzip of an empty archive and the caller would see bytes.
pub fn archive_command(directory: &str) -> String {
    let (parent, leaf) = split_remote_dir(directory);
    let missing = format!("{}: No such file or directory", leaf);
    // 🛡️ keep a leading dash from reading as a tar flag
    let leaf = if leaf.starts_with('-') {
        format!("./{}", leaf)
    } else {
        leaf
    };
    let leaf = shell_quote(&leaf);
    format!(
        "cd -- {parent} && {{ [ -e {leaf} ] || {{ printf '%s\\n' {missing} >&2; exit 2; }}; }} && tar -czf - {leaf}",
        parent = shell_quote(&parent),
        leaf = leaf,
        missing = shell_quote(&missing),
    )
}

// ==============================================================================
// 3. Artifact Locator
// ==============================================================================

/// Script that picks one file matching `glob` and streams it.
///
/// Mini-protocol:
/// - the chosen path is written to stderr as its final line, then the file
///   body goes to stdout, so metadata and payload never share a stream;
/// - exit 2 with a diagnostic on stderr when nothing qualifies.
///
/// Selection: greatest modification epoch, restricted to
/// `epoch >= since_epoch` when given. Equal epochs resolve to the
/// lexicographically last path (byte order).
///
/// `glob` is spliced in unquoted so the remote shell expands it.
pub fn locate_script(glob: &str, since_epoch: Option<i64>) -> String {
    let (freshness, missing) = match since_epoch {
        Some(since) => (
            format!("  [ \"$m\" -ge {} ] || continue\n", since),
            format!("No files match {} modified at or after {}", glob, since),
        ),
        None => (String::new(), format!("No files match {}", glob)),
    };

    format!(
        r#"LC_ALL=C; export LC_ALL
tab=$(printf '\t')
best=$(for f in {glob}; do
  [ -f "$f" ] || continue
  m=$(stat -c %Y -- "$f" 2>/dev/null || stat -f %m -- "$f" 2>/dev/null || date -r "$f" +%s 2>/dev/null) || continue
  [ -n "$m" ] || continue
{freshness}  printf '%s\t%s\n' "$m" "$f"
done | sort -t "$tab" -k1,1nr -k2r | head -n 1 | cut -f2-)
if [ -z "$best" ]; then
  printf '%s\n' {missing} >&2
  exit 2
fi
printf '%s\n' "$best" >&2
exec cat -- "$best"
"#,
        glob = glob,
        freshness = freshness,
        missing = shell_quote(&missing),
    )
}

/// The filename the locator script announced: last non-blank stderr line.
/// Anything ssh printed earlier (host-key notices) is skipped.
pub fn announced_filename(stderr: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_plain_and_hostile_strings() {
        assert_eq!(shell_quote("abc"), "'abc'");
        assert_eq!(shell_quote("my dir"), "'my dir'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn split_handles_common_shapes() {
        let s = split_remote_dir;
        assert_eq!(s("/data/project"), ("/data".into(), "project".into()));
        assert_eq!(s("/data/project/"), ("/data".into(), "project".into()));
        assert_eq!(s("/data"), ("/".into(), "data".into()));
        assert_eq!(s("project"), (".".into(), "project".into()));
        assert_eq!(s("a/b c/d"), ("a/b c".into(), "d".into()));
        assert_eq!(s("/"), ("/".into(), ".".into()));
        assert_eq!(s(""), (".".into(), ".".into()));
    }

    #[test]
    fn archive_command_quotes_names() {
        assert_eq!(
            archive_command("/srv/my app/logs dir"),
            "cd -- '/srv/my app' && { [ -e 'logs dir' ] || { printf '%s\\n' 'logs dir: No such file or directory' >&2; exit 2; }; } && tar -czf - 'logs dir'"
        );
        assert_eq!(
            archive_command("/tmp/-weird"),
            "cd -- '/tmp' && { [ -e './-weird' ] || { printf '%s\\n' '-weird: No such file or directory' >&2; exit 2; }; } && tar -czf - './-weird'"
        );
    }

    #[test]
    fn archive_command_checks_leaf_before_tar() {
        let cmd = archive_command("/data/missing");
        let guard = cmd.find("[ -e 'missing' ] ||").unwrap();
        let tar = cmd.find("tar -czf -").unwrap();
        assert!(guard < tar);
        assert!(cmd.contains("exit 2;"));
    }

    #[test]
    fn locate_script_leaves_glob_unquoted() {
        let script = locate_script("/out/*.csv", None);
        assert!(script.contains("for f in /out/*.csv; do"));
        assert!(!script.contains("-ge"));
        assert!(script.contains("'No files match /out/*.csv'"));
        assert!(script.contains("exit 2"));
    }

    #[test]
    fn locate_script_filters_by_since() {
        let script = locate_script("/out/*.csv", Some(1_700_000_000));
        assert!(script.contains("[ \"$m\" -ge 1700000000 ] || continue"));
        assert!(script.contains("modified at or after 1700000000"));
    }

    #[test]
    fn filename_line_precedes_payload() {
        let script = locate_script("*.log", None);
        let announce = script.find("printf '%s\\n' \"$best\" >&2").unwrap();
        let stream = script.find("exec cat -- \"$best\"").unwrap();
        assert!(announce < stream);
    }

    #[test]
    fn announced_filename_is_last_line() {
        let stderr = b"Warning: Permanently added 'h' (ED25519) to the list of known hosts.\r\n/out/b.csv\n";
        assert_eq!(announced_filename(stderr).as_deref(), Some("/out/b.csv"));
        assert_eq!(announced_filename(b"\n\n"), None);
        assert_eq!(
            announced_filename(b"/out/r\xffport.csv\n").as_deref(),
            Some("/out/r\u{fffd}port.csv")
        );
    }
}
