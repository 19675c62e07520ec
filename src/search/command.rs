//! External search tool invocation.
//!
//! Tools are spawned directly, never through a shell: the pattern and every
//! root travel as separate argv entries, so file names with spaces, quotes or
//! shell metacharacters can't change what gets executed.

use super::{Pattern, SearchError};
use crate::platform::SearchRoot;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs `program` with `args` and returns its stdout.
///
/// A non-zero exit still yields stdout when there is any (`fd` exits 1 when
/// one root is unreadable but prints the rest).
pub(crate) async fn run_tool(
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<String, SearchError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    debug!("Running {} {:?}", program.display(), args);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SearchError::ToolUnavailable(program.display().to_string()))
        }
        Ok(Err(e)) => return Err(SearchError::Io(e)),
        Err(_) => return Err(SearchError::Timeout(timeout)),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() || !stdout.trim().is_empty() {
        if !output.stderr.is_empty() {
            debug!(
                "{} stderr: {}",
                program.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        return Ok(stdout);
    }

    Err(SearchError::Failed {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Splits tool output into paths, one per line, dropping blanks and `\r`.
pub(crate) fn parse_paths(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

pub(crate) fn fd_args(pattern: &Pattern, root: &SearchRoot) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--type".into(), "f".into(), "--color".into(), "never".into()];
    if let Some(depth) = root.max_depth {
        args.push("--max-depth".into());
        args.push(depth.to_string().into());
    }
    args.push(if pattern.is_regex() { "--regex" } else { "--fixed-strings" }.into());
    args.push("--".into());
    args.push(pattern.as_str().into());
    args.push(root.path.clone().into_os_string());
    args
}

pub(crate) fn locate_args(pattern: &Pattern, limit: usize) -> Vec<OsString> {
    vec![
        "-l".into(),
        limit.to_string().into(),
        "--".into(),
        pattern.as_str().into(),
    ]
}

pub(crate) fn everything_args(pattern: &Pattern) -> Vec<OsString> {
    let flag = if pattern.is_regex() { "-regex" } else { "-s" };
    vec![flag.into(), pattern.as_str().into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths() {
        let out = "/opt/a/libcef.so\r\n\n  \n/opt/b c/libcef.so\n";
        assert_eq!(
            parse_paths(out),
            vec![
                PathBuf::from("/opt/a/libcef.so"),
                PathBuf::from("/opt/b c/libcef.so")
            ]
        );
    }

    #[test]
    fn test_fd_args_keep_pattern_as_single_argument() {
        let pattern = Pattern::literal("x'; rm -rf ~; echo '");
        let root = SearchRoot::new("/home/user/My Apps", Some(6));
        let args = fd_args(&pattern, &root);

        assert_eq!(
            args,
            vec![
                OsString::from("--type"),
                OsString::from("f"),
                OsString::from("--color"),
                OsString::from("never"),
                OsString::from("--max-depth"),
                OsString::from("6"),
                OsString::from("--fixed-strings"),
                OsString::from("--"),
                OsString::from("x'; rm -rf ~; echo '"),
                OsString::from("/home/user/My Apps"),
            ]
        );
    }

    #[test]
    fn test_fd_args_regex_without_depth() {
        let args = fd_args(&Pattern::regex(r"libcef.*\.so"), &SearchRoot::new("/opt", None));
        assert!(args.contains(&OsString::from("--regex")));
        assert!(!args.contains(&OsString::from("--max-depth")));
        assert_eq!(args.last(), Some(&OsString::from("/opt")));
    }

    #[test]
    fn test_locate_and_everything_args() {
        let pattern = Pattern::literal("-libcef");
        assert_eq!(
            locate_args(&pattern, 1000),
            vec![
                OsString::from("-l"),
                OsString::from("1000"),
                OsString::from("--"),
                OsString::from("-libcef"),
            ]
        );
        assert_eq!(
            everything_args(&Pattern::regex(r"_100_(.+?)\.pak$")),
            vec![OsString::from("-regex"), OsString::from(r"_100_(.+?)\.pak$")]
        );
    }

    #[tokio::test]
    async fn test_run_missing_tool() {
        let result = run_tool(
            Path::new("/nonexistent/cefdetect-tool"),
            &[],
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(SearchError::ToolUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_failure_without_output() {
        let result = run_tool(Path::new("false"), &[], Duration::from_secs(5)).await;
        assert!(matches!(result, Err(SearchError::Failed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_timeout() {
        let result = run_tool(
            Path::new("sleep"),
            &[OsString::from("5")],
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(SearchError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_metacharacters_are_literal() {
        let stdout = run_tool(
            Path::new("echo"),
            &[OsString::from("$(whoami);`id`")],
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(stdout.trim(), "$(whoami);`id`");
    }
}
