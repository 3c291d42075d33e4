//! SMTP deliverability probe (stage 5).
//!
//! [`probe`] opens a session to the chosen exchange, greets it, then issues
//! `MAIL FROM` and `RCPT TO`. `DATA` is never sent and the socket is closed
//! when the probe returns, on success and on every failure path.

mod session;
mod types;

pub use types::{SmtpEvent, SmtpReply, SmtpStage};

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::VerifyError;
use session::SmtpSession;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget<'a> {
    pub host: &'a str,
    pub port: u16,
}

/// Identity presented to the server and the mailbox under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub helo: &'a str,
    pub mail_from: &'a str,
    pub rcpt_to: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub connect: Duration,
    pub command: Duration,
}

/// Runs the probe dialogue and returns its transcript when the recipient is
/// accepted.
pub fn probe(
    target: &ProbeTarget<'_>,
    envelope: &Envelope<'_>,
    timeouts: ProbeTimeouts,
) -> Result<Vec<SmtpEvent>, VerifyError> {
    let addrs = resolve_socket_addrs(target)?;
    let session = SmtpSession::connect(target.host, &addrs, timeouts.connect, timeouts.command)?;
    let mut dialogue = Dialogue {
        host: target.host,
        session,
        transcript: Vec::new(),
    };

    let greeting = dialogue.read(SmtpStage::Greeting)?;
    if !greeting.is_positive_completion() {
        return Err(dialogue.rejected(SmtpStage::Greeting, &greeting));
    }

    dialogue.hello(envelope.helo)?;

    let mail_from = format!("MAIL FROM:<{}>", envelope.mail_from);
    dialogue.command(SmtpStage::MailFrom, &mail_from, &[250])?;

    let rcpt_to = format!("RCPT TO:<{}>", envelope.rcpt_to);
    dialogue.command(SmtpStage::RcptTo, &rcpt_to, &[250, 251])?;

    Ok(dialogue.transcript)
}

fn resolve_socket_addrs(target: &ProbeTarget<'_>) -> Result<Vec<SocketAddr>, VerifyError> {
    let connect_err = |source| VerifyError::Connect {
        host: target.host.to_string(),
        source,
    };
    let addrs: Vec<SocketAddr> = (target.host, target.port)
        .to_socket_addrs()
        .map_err(connect_err)?
        .collect();
    if addrs.is_empty() {
        return Err(connect_err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no address",
        )));
    }
    Ok(addrs)
}

struct Dialogue<'a> {
    host: &'a str,
    session: SmtpSession,
    transcript: Vec<SmtpEvent>,
}

impl Dialogue<'_> {
    fn read(&mut self, stage: SmtpStage) -> Result<SmtpReply, VerifyError> {
        let reply = self.session.read_reply(stage)?;
        debug!(host = self.host, %stage, code = reply.code, "smtp reply");
        self.transcript.push(SmtpEvent::Received {
            stage,
            reply: reply.clone(),
        });
        Ok(reply)
    }

    fn send(&mut self, stage: SmtpStage, command: &str) -> Result<SmtpReply, VerifyError> {
        self.transcript.push(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        self.session.send_command(command, stage)?;
        self.read(stage)
    }

    fn command(
        &mut self,
        stage: SmtpStage,
        command: &str,
        accepted: &[u16],
    ) -> Result<SmtpReply, VerifyError> {
        let reply = self.send(stage, command)?;
        self.expect(stage, &reply, accepted)?;
        Ok(reply)
    }

    /// EHLO, falling back to HELO for servers that refuse the extended greeting.
    fn hello(&mut self, helo: &str) -> Result<(), VerifyError> {
        let ehlo = self.send(SmtpStage::Ehlo, &format!("EHLO {helo}"))?;
        if ehlo.code == 250 {
            return Ok(());
        }
        self.command(SmtpStage::Helo, &format!("HELO {helo}"), &[250])
            .map(|_| ())
    }

    fn expect(
        &self,
        stage: SmtpStage,
        reply: &SmtpReply,
        accepted: &[u16],
    ) -> Result<(), VerifyError> {
        if accepted.contains(&reply.code) {
            return Ok(());
        }
        Err(self.rejected(stage, reply))
    }

    fn rejected(&self, stage: SmtpStage, reply: &SmtpReply) -> VerifyError {
        VerifyError::Rejected {
            host: self.host.to_string(),
            stage,
            code: reply.code,
            message: reply.message.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests;
