use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use super::types::{SmtpReply, SmtpStage};
use crate::error::VerifyError;

/// A plain-text SMTP connection. The socket is shut down when the session is
/// dropped, whichever way the probe ends.
pub(crate) struct SmtpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpSession {
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let connect_err = |source| VerifyError::Connect {
            host: host.to_string(),
            source,
        };
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(command_timeout))
                        .map_err(connect_err)?;
                    stream
                        .set_write_timeout(Some(command_timeout))
                        .map_err(connect_err)?;
                    let reader = BufReader::new(stream.try_clone().map_err(connect_err)?);
                    return Ok(Self { stream, reader });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        })))
    }

    pub(crate) fn send_command(&mut self, command: &str, stage: SmtpStage) -> Result<(), VerifyError> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&line)
            .and_then(|()| self.stream.flush())
            .map_err(|err| VerifyError::io(stage, err))
    }

    pub(crate) fn read_reply(&mut self, stage: SmtpStage) -> Result<SmtpReply, VerifyError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            let mut raw = Vec::new();
            let read = self
                .reader
                .read_until(b'\n', &mut raw)
                .map_err(|err| VerifyError::io(stage, err))?;
            if read == 0 {
                return Err(VerifyError::io(
                    stage,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed while reading reply",
                    ),
                ));
            }
            // banners are not always UTF-8
            let raw = String::from_utf8_lossy(&raw);
            let line = raw.trim_end_matches(['\r', '\n']);
            let parsed = parse_reply_line(line)?;
            match code {
                Some(existing) if existing != parsed.code => {
                    return Err(VerifyError::Protocol(format!(
                        "inconsistent SMTP reply codes: {existing} vs {}",
                        parsed.code
                    )));
                }
                _ => code = Some(parsed.code),
            }
            lines.push(parsed.text.to_string());
            if parsed.last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or_default(),
            message: lines.join("\n"),
        })
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

struct ReplyLine<'a> {
    code: u16,
    last: bool,
    text: &'a str,
}

fn parse_reply_line(line: &str) -> Result<ReplyLine<'_>, VerifyError> {
    let code = line
        .get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| VerifyError::Protocol(format!("invalid SMTP reply: '{line}'")))?;
    let (last, text) = match line.as_bytes().get(3) {
        None => (true, ""),
        Some(b'-') => (false, &line[4..]),
        Some(b' ') => (true, &line[4..]),
        Some(_) => {
            return Err(VerifyError::Protocol(format!(
                "invalid SMTP reply separator: '{line}'"
            )));
        }
    };
    Ok(ReplyLine { code, last, text })
}
