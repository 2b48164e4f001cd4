use std::io::Write;

use color_eyre::Result;
use prep_core::history::{AuditLog, NewSession, SessionHistory, SessionRecord};
use prep_history::{LocalAuditLog, LocalSessionHistory};

use crate::{cli::HistoryCommand, config, storage};

/// Execute a history subcommand against the encrypted store.
pub fn handle(cmd: HistoryCommand, config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let history = LocalSessionHistory::with_limit(store.clone(), config.history_limit());
    let audit = LocalAuditLog::with_limit(store, config.audit_limit());
    run(cmd, &history, &audit, &mut std::io::stdout())
}

/// Print the audit log.
pub fn show_audit(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let audit = LocalAuditLog::with_limit(store, config.audit_limit());
    print_audit(&audit, &mut std::io::stdout())
}

fn run(
    cmd: HistoryCommand,
    history: &impl SessionHistory,
    audit: &impl AuditLog,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        HistoryCommand::List => {
            let sessions = history
                .list()
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            if sessions.is_empty() {
                writeln!(
                    out,
                    "No sessions yet. Add one with `prep history add <role>`."
                )?;
                return Ok(());
            }
            for session in &sessions {
                print_session(session, out)?;
            }
        }
        HistoryCommand::Add(args) => {
            let record = history
                .record(NewSession {
                    role: args.role.join(" "),
                    company: args.company,
                    score: args.score,
                    summary: args.summary,
                })
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            audit
                .append("session.saved", Some(record.id.to_string()))
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            writeln!(out, "Saved session {}: {}", record.id, record.role)?;
        }
        HistoryCommand::Clear => {
            history
                .clear()
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            audit
                .append("history.cleared", None)
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            writeln!(out, "Session history cleared.")?;
        }
    }

    Ok(())
}

fn print_session(session: &SessionRecord, out: &mut impl Write) -> Result<()> {
    let score = session
        .score
        .map(|s| format!("{s:>3}"))
        .unwrap_or_else(|| "  -".to_string());
    write!(
        out,
        "{} [{}] {}",
        session.created_at.format("%Y-%m-%d %H:%M"),
        score,
        session.role
    )?;
    if let Some(company) = &session.company {
        write!(out, " @ {company}")?;
    }
    writeln!(out)?;
    if let Some(summary) = &session.summary {
        writeln!(out, "    {summary}")?;
    }
    Ok(())
}

fn print_audit(audit: &impl AuditLog, out: &mut impl Write) -> Result<()> {
    let events = audit
        .list()
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    if events.is_empty() {
        writeln!(out, "Audit log is empty.")?;
        return Ok(());
    }
    for event in events {
        write!(out, "{} {}", event.at.format("%Y-%m-%d %H:%M:%S"), event.action)?;
        match event.detail {
            Some(detail) => writeln!(out, " {detail}")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cli::AddSession, storage};

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn add_then_list_prints_session_and_audits() {
        let store = storage::test_store();
        let history = LocalSessionHistory::new(store.clone());
        let audit = LocalAuditLog::new(store);

        let mut buf = Vec::new();
        run(
            HistoryCommand::Add(AddSession {
                role: vec!["Data".into(), "Engineer".into()],
                company: Some("Acme".into()),
                score: Some(64),
                summary: Some("Practice SQL window functions".into()),
            }),
            &history,
            &audit,
            &mut buf,
        )
        .expect("add");
        assert!(output(buf).starts_with("Saved session"));

        let mut buf = Vec::new();
        run(HistoryCommand::List, &history, &audit, &mut buf).expect("list");
        let listed = output(buf);
        assert!(listed.contains("[ 64] Data Engineer @ Acme"));
        assert!(listed.contains("    Practice SQL window functions"));

        let events = audit.list().expect("audit");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "session.saved");
    }

    #[test]
    fn list_on_empty_history_prints_hint() {
        let store = storage::test_store();
        let history = LocalSessionHistory::new(store.clone());
        let audit = LocalAuditLog::new(store);

        let mut buf = Vec::new();
        run(HistoryCommand::List, &history, &audit, &mut buf).expect("list");
        assert!(output(buf).starts_with("No sessions yet."));
    }

    #[test]
    fn clear_empties_history_and_is_audited() {
        let store = storage::test_store();
        let history = LocalSessionHistory::new(store.clone());
        let audit = LocalAuditLog::new(store);
        history
            .record(NewSession {
                role: "SRE".into(),
                ..NewSession::default()
            })
            .expect("record");

        run(HistoryCommand::Clear, &history, &audit, &mut Vec::new()).expect("clear");
        assert!(history.list().expect("list").is_empty());

        let mut buf = Vec::new();
        print_audit(&audit, &mut buf).expect("audit");
        assert!(output(buf).contains("history.cleared"));
    }
}
