use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::{Envelope, ProbeTarget, ProbeTimeouts, SmtpEvent, SmtpStage, probe};
use crate::error::VerifyError;

/// What the mock server saw during one session.
#[derive(Debug)]
pub(crate) struct ServerLog {
    pub commands: Vec<String>,
    /// `true` once the client closed its side of the connection.
    pub closed_by_client: bool,
}

/// Accepts one connection on loopback, greets, then answers each command
/// with the scripted response after checking its prefix. An empty response
/// leaves the command unanswered.
pub(crate) fn spawn_mock_server(
    greeting: impl AsRef<[u8]> + Send + 'static,
    script: Vec<(&'static str, &'static str)>,
) -> (u16, thread::JoinHandle<ServerLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        let mut log = ServerLog {
            commands: Vec::new(),
            closed_by_client: false,
        };
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
            let _ = handle_session(&mut stream, greeting.as_ref(), script, &mut log);
        }
        log
    });
    ready_rx.recv().expect("server ready");
    (port, handle)
}

fn handle_session(
    stream: &mut TcpStream,
    greeting: &[u8],
    script: Vec<(&'static str, &'static str)>,
    log: &mut ServerLog,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting)?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            log.closed_by_client = true;
            return Ok(());
        }
        let command = line.trim_end().to_string();
        assert!(
            command.starts_with(expected),
            "expected command starting with '{expected}', got '{command}'"
        );
        log.commands.push(command);
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    // anything after the script must be EOF: no DATA, no QUIT
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    if !rest.is_empty() {
        log.commands.push(String::from_utf8_lossy(&rest).trim_end().to_string());
    }
    log.closed_by_client = true;
    Ok(())
}

pub(crate) const ACCEPT_ALL: &[(&str, &str)] = &[
    ("EHLO", "250-mock.example\r\n250 PIPELINING\r\n"),
    ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
    ("RCPT TO:", "250 2.1.5 Ok\r\n"),
];

fn timeouts() -> ProbeTimeouts {
    ProbeTimeouts {
        connect: Duration::from_secs(2),
        command: Duration::from_secs(2),
    }
}

fn envelope() -> Envelope<'static> {
    Envelope {
        helo: "localhost",
        mail_from: "verify@example.com",
        rcpt_to: "user@example.com",
    }
}

#[test]
fn accepted_recipient_succeeds_without_data() {
    let (port, handle) = spawn_mock_server("220 mock.smtp.test ESMTP\r\n", ACCEPT_ALL.to_vec());
    let transcript = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect("probe succeeds");

    let log = handle.join().expect("server thread");
    assert_eq!(
        log.commands,
        vec![
            "EHLO localhost",
            "MAIL FROM:<verify@example.com>",
            "RCPT TO:<user@example.com>",
        ]
    );
    assert!(log.closed_by_client);
    assert!(matches!(
        transcript.last(),
        Some(SmtpEvent::Received {
            stage: SmtpStage::RcptTo,
            reply
        }) if reply.code == 250
    ));
}

#[test]
fn rejected_recipient_is_an_error() {
    let (port, handle) = spawn_mock_server(
        "220 mock.smtp.test ESMTP\r\n",
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
        ],
    );
    let err = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect_err("rcpt rejected");
    match err {
        VerifyError::Rejected {
            stage: SmtpStage::RcptTo,
            code,
            message,
            ..
        } => {
            assert_eq!(code, 550);
            assert!(message.contains("User unknown"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let log = handle.join().expect("server thread");
    assert!(log.closed_by_client, "socket must be released on failure");
}

#[test]
fn rejected_sender_stops_before_rcpt() {
    let (port, handle) = spawn_mock_server(
        "220 mock.smtp.test ESMTP\r\n",
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "553 5.7.1 Sender rejected\r\n"),
        ],
    );
    let err = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect_err("mail from rejected");
    assert!(matches!(
        err,
        VerifyError::Rejected {
            stage: SmtpStage::MailFrom,
            code: 553,
            ..
        }
    ));
    let log = handle.join().expect("server thread");
    assert_eq!(log.commands.len(), 2);
}

#[test]
fn falls_back_to_helo() {
    let (port, handle) = spawn_mock_server(
        "220 old.smtp.test\r\n",
        vec![
            ("EHLO", "502 5.5.2 Command not recognized\r\n"),
            ("HELO", "250 old.smtp.test\r\n"),
            ("MAIL FROM:", "250 Ok\r\n"),
            ("RCPT TO:", "251 User not local; will forward\r\n"),
        ],
    );
    probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect("helo fallback");
    let log = handle.join().expect("server thread");
    assert_eq!(log.commands[1], "HELO localhost");
}

#[test]
fn unwelcoming_greeting_fails() {
    let (port, handle) = spawn_mock_server("554 no service\r\n", Vec::new());
    let err = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect_err("greeting rejected");
    assert!(matches!(
        err,
        VerifyError::Rejected {
            stage: SmtpStage::Greeting,
            code: 554,
            ..
        }
    ));
    let log = handle.join().expect("server thread");
    assert!(log.commands.is_empty());
    assert!(log.closed_by_client, "socket must be released on failure");
}

#[test]
fn non_utf8_banner_is_accepted() {
    let (port, handle) = spawn_mock_server(
        &b"220 mx.test ESMTP caf\xe9\r\n"[..],
        vec![
            ("EHLO", "250-mx.test\r\n250 8BITMIME\r\n"),
            ("MAIL FROM:", "250 Ok\r\n"),
            ("RCPT TO:", "250 Ok\r\n"),
        ],
    );
    let transcript = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect("latin-1 greeting");
    match transcript.first() {
        Some(SmtpEvent::Received {
            stage: SmtpStage::Greeting,
            reply,
        }) => {
            assert_eq!(reply.code, 220);
            assert!(reply.message.starts_with("mx.test ESMTP caf"));
        }
        other => panic!("unexpected first event: {other:?}"),
    }
    let log = handle.join().expect("server thread");
    assert_eq!(log.commands.len(), 3);
}

#[test]
fn unanswered_command_times_out_and_closes() {
    let (port, handle) = spawn_mock_server("220 slow.smtp.test\r\n", vec![("EHLO", "")]);
    let err = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        ProbeTimeouts {
            connect: Duration::from_secs(2),
            command: Duration::from_millis(200),
        },
    )
    .expect_err("no EHLO reply");
    assert!(
        matches!(err, VerifyError::Io { stage: SmtpStage::Ehlo, .. }),
        "{err}"
    );
    let log = handle.join().expect("server thread");
    assert!(log.closed_by_client);
}

#[test]
fn refused_connection_is_connect_error() {
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("addr")
        .port();
    let err = probe(
        &ProbeTarget {
            host: "127.0.0.1",
            port,
        },
        &envelope(),
        timeouts(),
    )
    .expect_err("nobody listening");
    assert!(matches!(err, VerifyError::Connect { .. }));
}
