//! `SshSession` against a scripted `ssh`/`rsync`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use hostkit_cli::application::ports::{RemoteSession, UploadSource};
use hostkit_cli::domain::error::SessionError;
use hostkit_cli::domain::remote::{RunOptions, WriteMode};

use crate::mocks::{MockRunner, session};

#[tokio::test]
async fn exit_255_is_a_transport_error() {
    let runner = MockRunner::new().on(
        "uptime",
        255,
        "",
        "ssh: connect to host 198.51.100.4 port 22: Connection refused",
    );
    let err = session(&runner)
        .run("uptime", RunOptions::PROBE)
        .await
        .unwrap_err();
    let session_err = err.downcast_ref::<SessionError>().expect("session error");
    assert!(session_err.is_transport());
    assert!(err.to_string().contains("Connection refused"), "got: {err}");
}

#[tokio::test]
async fn tolerant_run_returns_non_zero_exit_as_data() {
    let runner = MockRunner::new().on("k3s --version", 127, "", "k3s: not found");
    let result = session(&runner)
        .run("k3s --version", RunOptions::TOLERANT)
        .await
        .unwrap();
    assert_eq!(result.exit_code(), 127);
    assert_eq!(result.stderr(), "k3s: not found");
}

#[tokio::test]
async fn checked_run_raises_command_failed_with_stderr() {
    let runner = MockRunner::new().on("apt update", 100, "", "E: Could not get lock");
    let err = session(&runner)
        .run("sudo apt update", RunOptions::CHECKED)
        .await
        .unwrap_err();
    match err.downcast_ref::<SessionError>() {
        Some(SessionError::CommandFailed {
            command,
            exit_code,
            stderr,
        }) => {
            assert_eq!(command, "sudo apt update");
            assert_eq!(*exit_code, 100);
            assert_eq!(stderr, "E: Could not get lock");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn commands_carry_working_directory_and_environment() {
    let runner = MockRunner::new();
    let mut s = session(&runner);
    s.set_working_directory(Some("/var/www"));
    s.set_environment_variable("KUBECONFIG", "~/.kube/config");
    s.run("ls", RunOptions::PROBE).await.unwrap();
    s.set_working_directory(None);
    s.run("pwd", RunOptions::PROBE).await.unwrap();

    let commands = runner.remote_commands();
    assert_eq!(
        commands[0],
        "cd /var/www && export KUBECONFIG=\"$HOME\"/.kube/config && ls"
    );
    assert_eq!(commands[1], "export KUBECONFIG=\"$HOME\"/.kube/config && pwd");
}

#[tokio::test]
async fn ssh_invocation_targets_user_at_host_in_batch_mode() {
    let runner = MockRunner::new();
    session(&runner).run("true", RunOptions::PROBE).await.unwrap();
    let call = &runner.calls()[0];
    assert_eq!(call.program, "ssh");
    assert!(call.args.contains(&"BatchMode=yes".to_string()));
    assert_eq!(call.args[call.args.len() - 2], "deploy@198.51.100.4");
}

#[tokio::test]
async fn content_upload_pipes_through_cat() {
    let runner = MockRunner::new();
    let s = session(&runner);
    s.upload(
        UploadSource::Content(b"server_name example.org;\n"),
        "/etc/nginx/conf.d/site.conf",
        WriteMode::Overwrite,
    )
    .await
    .unwrap();
    s.upload(UploadSource::Content(b"alias ll='ls -l'\n"), "~/.bashrc", WriteMode::Append)
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls[0].remote_command(), "cat > /etc/nginx/conf.d/site.conf");
    assert_eq!(calls[0].stdin.as_deref(), Some(&b"server_name example.org;\n"[..]));
    assert_eq!(calls[1].remote_command(), "cat >> \"$HOME\"/.bashrc");
}

#[tokio::test]
async fn download_uses_rsync_over_ssh() {
    let runner = MockRunner::new();
    session(&runner)
        .download("~/mattermost-tls.yaml", Path::new("backup/mattermost-tls.yaml"))
        .await
        .unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.program, "rsync");
    assert_eq!(call.args[0], "-az");
    assert_eq!(call.args[1], "-e");
    assert!(call.args[2].starts_with("ssh -o BatchMode=yes"), "got: {}", call.args[2]);
    assert_eq!(call.args[3], "deploy@198.51.100.4:mattermost-tls.yaml");
    assert_eq!(call.args[4], "backup/mattermost-tls.yaml");
}

#[tokio::test]
async fn local_path_upload_cannot_append() {
    let runner = MockRunner::new();
    let err = session(&runner)
        .upload(
            UploadSource::LocalPath(Path::new("config_files/mc/")),
            "~/.config/mc",
            WriteMode::Append,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not supported"));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn streaming_run_returns_remote_exit_code() {
    let runner = MockRunner::new().on("false", 1, "", "");
    assert_eq!(session(&runner).run_streaming("false").await.unwrap(), 1);

    let runner = MockRunner::new().on("uptime", 255, "", "");
    let err = session(&runner).run_streaming("uptime").await.unwrap_err();
    assert!(
        err.downcast_ref::<SessionError>()
            .is_some_and(SessionError::is_transport)
    );
}
