//! Spooler transports: local `lp` and remote `scp` + `ssh lp`

use std::path::Path;

use tracing::{error, info, instrument};

use crate::discovery::{self, STATUS_PROGRAM};
use crate::error::{PrintError, PrintResult};
use crate::exec::CommandRunner;
use crate::target::{LocalTarget, RemoteCredential, RemoteTarget};

const SPOOL_PROGRAM: &str = "lp";

/// Fixed staging directory on the remote host
pub const REMOTE_STAGING_DIR: &str = "/tmp/";

/// Quote `word` for a POSIX shell, leaving plain words untouched
fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.@+/:=,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Remote shell line: print the staged copy, remove it, keep lp's status
fn remote_print_line(printer: &str, staged: &str) -> String {
    let printer = shell_quote(printer);
    let staged = shell_quote(staged);
    format!("{SPOOL_PROGRAM} -d {printer} {staged}; rc=$?; rm -f {staged}; exit $rc")
}

fn lp_args(printer: &str, path: &str) -> Vec<String> {
    vec![
        "-d".to_string(),
        printer.to_string(),
        path.to_string(),
    ]
}

/// Submit `path` to a local queue, returns the queue name used
#[instrument(skip(runner, target, path), fields(printer = target.printer()))]
pub(crate) async fn print_local(
    runner: &dyn CommandRunner,
    target: &LocalTarget,
    path: &Path,
) -> PrintResult<String> {
    let printer = match target.printer() {
        Some(name) => name.to_string(),
        None => discovery::discover_local_printer(runner).await?,
    };

    let args = lp_args(&printer, &path.to_string_lossy());
    runner
        .run(SPOOL_PROGRAM, &args)
        .await
        .and_then(|output| output.check(SPOOL_PROGRAM))
        .map_err(|source| {
            error!(printer = %printer, error = %source, "Spool submission failed");
            PrintError::SpoolSubmission {
                printer: printer.clone(),
                source,
            }
        })?;

    info!(printer = %printer, "Submitted to local spooler");
    Ok(printer)
}

/// Copy `path` to the remote staging dir, then print it there
#[instrument(skip(runner, target, path, file_name), fields(host = target.host()))]
pub(crate) async fn print_remote(
    runner: &dyn CommandRunner,
    target: &RemoteTarget,
    path: &Path,
    file_name: &str,
) -> PrintResult<String> {
    let printer = match target.printer() {
        Some(name) => name.to_string(),
        None => discover_remote_printer(runner, target).await?,
    };

    let dest = format!("{}:{}", target.destination(), REMOTE_STAGING_DIR);
    let (program, args) = remote_command(
        target.credential(),
        "scp",
        vec![path.to_string_lossy().into_owned(), dest],
    );
    runner
        .run(&program, &args)
        .await
        .and_then(|output| output.check(&program))
        .map_err(|source| {
            error!(error = %source, "Remote copy failed");
            PrintError::RemoteTransfer {
                host: target.host().to_string(),
                source,
            }
        })?;
    info!("Copied document to remote staging dir");

    let staged = format!("{REMOTE_STAGING_DIR}{file_name}");
    let (program, args) = remote_command(
        target.credential(),
        "ssh",
        vec![target.destination(), remote_print_line(&printer, &staged)],
    );
    runner
        .run(&program, &args)
        .await
        .and_then(|output| output.check(&program))
        .map_err(|source| {
            error!(printer = %printer, error = %source, "Remote print failed");
            PrintError::RemotePrint {
                host: target.host().to_string(),
                printer: printer.clone(),
                source,
            }
        })?;

    info!(printer = %printer, "Submitted to remote spooler");
    Ok(printer)
}

/// Status query over ssh on the remote host
#[instrument(skip(runner, target), fields(host = target.host()))]
pub(crate) async fn discover_remote_printer(
    runner: &dyn CommandRunner,
    target: &RemoteTarget,
) -> PrintResult<String> {
    let query = std::iter::once(STATUS_PROGRAM.to_string())
        .chain(discovery::status_args())
        .collect::<Vec<_>>()
        .join(" ");
    let (program, args) = remote_command(
        target.credential(),
        "ssh",
        vec![target.destination(), query],
    );

    let output = runner
        .run(&program, &args)
        .await
        .and_then(|output| output.check(&program))
        .map_err(PrintError::StatusQuery)?;

    discovery::resolve(&output.stdout)
}

/// Program and arguments for an scp/ssh call under `credential`
fn remote_command(
    credential: &RemoteCredential,
    tool: &str,
    rest: Vec<String>,
) -> (String, Vec<String>) {
    match credential {
        RemoteCredential::Agent => (tool.to_string(), rest),
        RemoteCredential::IdentityFile(key) => {
            let mut args = vec!["-i".to_string(), key.to_string_lossy().into_owned()];
            args.extend(rest);
            (tool.to_string(), args)
        }
        RemoteCredential::Password(secret) => {
            let mut args = vec!["-p".to_string(), secret.clone(), tool.to_string()];
            args.extend(rest);
            ("sshpass".to_string(), args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_remote_command_credentials() {
        let rest = strings(&["a", "b"]);

        assert_eq!(
            remote_command(&RemoteCredential::Agent, "scp", rest.clone()),
            ("scp".to_string(), strings(&["a", "b"]))
        );
        assert_eq!(
            remote_command(
                &RemoteCredential::IdentityFile(PathBuf::from("/home/pos/.ssh/id")),
                "ssh",
                rest.clone()
            ),
            ("ssh".to_string(), strings(&["-i", "/home/pos/.ssh/id", "a", "b"]))
        );
        assert_eq!(
            remote_command(&RemoteCredential::Password("pw".to_string()), "scp", rest),
            ("sshpass".to_string(), strings(&["-p", "pw", "scp", "a", "b"]))
        );
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("Bar"), "Bar");
        assert_eq!(shell_quote("/tmp/receipt-a1.txt"), "/tmp/receipt-a1.txt");
        assert_eq!(shell_quote("Bar; rm -rf ~"), "'Bar; rm -rf ~'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_remote_print_line_cleans_up_staged_copy() {
        assert_eq!(
            remote_print_line("Bar", "/tmp/receipt-1.txt"),
            "lp -d Bar /tmp/receipt-1.txt; rc=$?; rm -f /tmp/receipt-1.txt; exit $rc"
        );
        assert_eq!(
            remote_print_line("Bar $(id)", "/tmp/receipt-1.txt"),
            "lp -d 'Bar $(id)' /tmp/receipt-1.txt; rc=$?; rm -f /tmp/receipt-1.txt; exit $rc"
        );
    }

    #[test]
    fn test_lp_args() {
        assert_eq!(
            lp_args("Kitchen", "/tmp/receipt-1.txt"),
            strings(&["-d", "Kitchen", "/tmp/receipt-1.txt"])
        );
    }
}
