//! SQLite-backed [`CampaignStore`] implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{CampaignStore, RunRecord};
use outreach_core::types::{
    AgentProfile, AgentType, Campaign, CampaignLead, CampaignStatus, HistoryEntry, Lead,
    LeadStatus, LogEntry, LogLevel, WorkflowDescription,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS campaigns (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    creative_agent TEXT,
    deterministic_agent TEXT,
    agent TEXT,
    sms_system_prompt TEXT,
    sms_temperature INTEGER NOT NULL DEFAULT 70,
    workflow TEXT,
    total_leads INTEGER NOT NULL DEFAULT 0,
    processed_leads INTEGER NOT NULL DEFAULT 0,
    sent_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    started_at TEXT,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL DEFAULT '',
    company TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS campaign_leads (
    id TEXT PRIMARY KEY,
    campaign_id TEXT NOT NULL REFERENCES campaigns(id),
    lead_id TEXT NOT NULL REFERENCES leads(id),
    status TEXT NOT NULL DEFAULT 'pending',
    sms_sent INTEGER NOT NULL DEFAULT 0,
    sms_message TEXT NOT NULL DEFAULT '',
    voice_call_made INTEGER NOT NULL DEFAULT 0,
    error_message TEXT NOT NULL DEFAULT '',
    trace_id TEXT NOT NULL DEFAULT '',
    processed_at TEXT,
    seq INTEGER
);

CREATE INDEX IF NOT EXISTS idx_campaign_leads_campaign
    ON campaign_leads(campaign_id, seq);

CREATE TABLE IF NOT EXISTS conversation_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    campaign_lead_id TEXT NOT NULL REFERENCES campaign_leads(id),
    role TEXT NOT NULL,
    agent TEXT,
    agent_id TEXT,
    content TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversation_lead
    ON conversation_messages(campaign_lead_id, id);

CREATE TABLE IF NOT EXISTS processing_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    campaign_lead_id TEXT NOT NULL REFERENCES campaign_leads(id),
    level TEXT NOT NULL,
    node TEXT NOT NULL,
    message TEXT NOT NULL,
    detail TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_logs_lead
    ON processing_logs(campaign_lead_id, id);
";

/// SQLite-backed campaign store. All access goes through one connection
/// behind a mutex; WAL mode keeps readers out of writers' way.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: impl std::fmt::Display) -> OutreachError {
    OutreachError::Database(e.to_string())
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| db_err(format!("Failed to create db directory: {}", e)))?;
        }

        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(path = %path.display(), "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(db_err)
    }

    /// Insert a campaign row. Used by the CLI and tests; runtime code only
    /// reads campaigns.
    pub fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (id, name, agent_type, status, creative_agent,
                 deterministic_agent, agent, sms_system_prompt, sms_temperature, workflow)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                campaign.id,
                campaign.name,
                campaign.agent_type.as_str(),
                campaign.status.as_str(),
                to_json_opt(&campaign.creative_agent)?,
                to_json_opt(&campaign.deterministic_agent)?,
                to_json_opt(&campaign.agent)?,
                campaign.sms_system_prompt,
                campaign.sms_temperature,
                to_json_opt(&campaign.workflow)?,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn insert_lead(&self, lead: &Lead) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO leads (id, name, phone, email, company, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                lead.id,
                lead.name,
                lead.phone,
                lead.email,
                lead.company,
                lead.notes
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Attach a lead to a campaign as a pending row. `seq` preserves
    /// attachment order for the sweep.
    pub fn attach_lead(&self, id: &str, campaign_id: &str, lead_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaign_leads (id, campaign_id, lead_id, status, seq)
             VALUES (?1, ?2, ?3, 'pending',
                 (SELECT COALESCE(MAX(seq), 0) + 1 FROM campaign_leads WHERE campaign_id = ?2))",
            params![id, campaign_id, lead_id],
        )
        .map_err(db_err)?;
        conn.execute(
            "UPDATE campaigns SET total_leads = total_leads + 1 WHERE id = ?1",
            params![campaign_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Persisted conversation rows for a campaign lead, oldest first.
    pub fn conversation(&self, campaign_lead_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT role, agent, agent_id, content, metadata
                 FROM conversation_messages WHERE campaign_lead_id = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![campaign_lead_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (role, agent, agent_id, content, metadata) = row.map_err(db_err)?;
            let role = serde_json::from_value(serde_json::Value::String(role))?;
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            entries.push(HistoryEntry {
                role,
                agent,
                agent_id,
                content,
                metadata,
            });
        }
        Ok(entries)
    }

    /// Persisted log rows for a campaign lead as (level, entry), oldest
    /// first.
    pub fn logs(&self, campaign_lead_id: &str) -> Result<Vec<(LogLevel, LogEntry)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT level, node, message, detail, timestamp
                 FROM processing_logs WHERE campaign_lead_id = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![campaign_lead_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (level, node, message, detail, timestamp) = row.map_err(db_err)?;
            let level = match level.as_str() {
                "ERROR" => LogLevel::Error,
                _ => LogLevel::Info,
            };
            let detail = match detail {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            entries.push((
                level,
                LogEntry {
                    node,
                    timestamp: parse_timestamp(&timestamp)?,
                    message,
                    detail,
                },
            ));
        }
        Ok(entries)
    }

    /// Campaign aggregate counters: (total, processed, sent, failed).
    pub fn campaign_counters(&self, campaign_id: &str) -> Result<(u64, u64, u64, u64)> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT total_leads, processed_leads, sent_count, failed_count
             FROM campaigns WHERE id = ?1",
            params![campaign_id],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, u64>(3)?,
                ))
            },
        )
        .map_err(db_err)
    }
}

fn to_json_opt<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(OutreachError::from))
        .transpose()
}

fn from_json_opt<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>> {
    raw.map(|r| serde_json::from_str(&r).map_err(OutreachError::from))
        .transpose()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| db_err(format!("bad timestamp '{}': {}", raw, e)))
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<(Campaign, Option<String>, Option<String>, Option<String>, Option<String>)> {
    let agent_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    let campaign = Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        agent_type: AgentType::from_str(&agent_type).unwrap_or(AgentType::Sms),
        status: CampaignStatus::from_str(&status).unwrap_or(CampaignStatus::Draft),
        creative_agent: None,
        deterministic_agent: None,
        agent: None,
        sms_system_prompt: row.get(7)?,
        sms_temperature: row.get(8)?,
        workflow: None,
    };
    Ok((
        campaign,
        row.get::<_, Option<String>>(4)?,
        row.get::<_, Option<String>>(5)?,
        row.get::<_, Option<String>>(6)?,
        row.get::<_, Option<String>>(9)?,
    ))
}

impl CampaignStore for SqliteStore {
    fn campaign(&self, id: &str) -> BoxFuture<'_, Result<Option<Campaign>>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let found = conn
                .query_row(
                    "SELECT id, name, agent_type, status, creative_agent, deterministic_agent,
                         agent, sms_system_prompt, sms_temperature, workflow
                     FROM campaigns WHERE id = ?1",
                    params![id],
                    campaign_from_row,
                )
                .optional()
                .map_err(db_err)?;

            match found {
                Some((mut campaign, creative, deterministic, agent, workflow)) => {
                    campaign.creative_agent = from_json_opt::<AgentProfile>(creative)?;
                    campaign.deterministic_agent = from_json_opt::<AgentProfile>(deterministic)?;
                    campaign.agent = from_json_opt::<AgentProfile>(agent)?;
                    campaign.workflow = from_json_opt::<WorkflowDescription>(workflow)?;
                    Ok(Some(campaign))
                }
                None => Ok(None),
            }
        })
    }

    fn lead(&self, id: &str) -> BoxFuture<'_, Result<Option<Lead>>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT id, name, phone, email, company, notes FROM leads WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Lead {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        phone: row.get(2)?,
                        email: row.get(3)?,
                        company: row.get(4)?,
                        notes: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)
        })
    }

    fn campaign_lead(&self, id: &str) -> BoxFuture<'_, Result<Option<CampaignLead>>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let found = conn
                .query_row(
                    "SELECT id, campaign_id, lead_id, status, sms_sent, sms_message,
                         voice_call_made, error_message, trace_id, processed_at
                     FROM campaign_leads WHERE id = ?1",
                    params![id],
                    |row| {
                        let status: String = row.get(3)?;
                        let processed_at: Option<String> = row.get(9)?;
                        Ok((
                            CampaignLead {
                                id: row.get(0)?,
                                campaign_id: row.get(1)?,
                                lead_id: row.get(2)?,
                                status: LeadStatus::from_str(&status)
                                    .unwrap_or(LeadStatus::Pending),
                                sms_sent: row.get(4)?,
                                sms_message: row.get(5)?,
                                voice_call_made: row.get(6)?,
                                error_message: row.get(7)?,
                                trace_id: row.get(8)?,
                                processed_at: None,
                            },
                            processed_at,
                        ))
                    },
                )
                .optional()
                .map_err(db_err)?;

            match found {
                Some((mut row, processed_at)) => {
                    row.processed_at = processed_at.as_deref().map(parse_timestamp).transpose()?;
                    Ok(Some(row))
                }
                None => Ok(None),
            }
        })
    }

    fn pending_lead_ids(&self, campaign_id: &str) -> BoxFuture<'_, Result<Vec<String>>> {
        let campaign_id = campaign_id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM campaign_leads
                     WHERE campaign_id = ?1 AND status = 'pending' ORDER BY seq",
                )
                .map_err(db_err)?;
            let ids = stmt
                .query_map(params![campaign_id], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;
            Ok(ids)
        })
    }

    fn set_lead_status(&self, id: &str, status: LeadStatus) -> BoxFuture<'_, Result<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE campaign_leads SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn record_run(&self, id: &str, record: RunRecord) -> BoxFuture<'_, Result<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE campaign_leads SET status = ?2, sms_sent = ?3, sms_message = ?4,
                     voice_call_made = ?5, error_message = ?6, trace_id = ?7, processed_at = ?8
                 WHERE id = ?1",
                params![
                    id,
                    record.status.as_str(),
                    record.sms_sent,
                    record.sms_message,
                    record.voice_call_made,
                    record.error_message,
                    record.trace_id,
                    record.processed_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn append_conversation(
        &self,
        campaign_lead_id: &str,
        entries: Vec<HistoryEntry>,
    ) -> BoxFuture<'_, Result<()>> {
        let campaign_lead_id = campaign_lead_id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let now = Utc::now().to_rfc3339();
            for entry in &entries {
                let metadata = if entry.metadata.is_null() {
                    None
                } else {
                    Some(serde_json::to_string(&entry.metadata)?)
                };
                conn.execute(
                    "INSERT INTO conversation_messages
                         (campaign_lead_id, role, agent, agent_id, content, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        campaign_lead_id,
                        entry.role.as_str(),
                        entry.agent,
                        entry.agent_id,
                        entry.content,
                        metadata,
                        now,
                    ],
                )
                .map_err(db_err)?;
            }
            Ok(())
        })
    }

    fn append_logs(
        &self,
        campaign_lead_id: &str,
        level: LogLevel,
        entries: Vec<LogEntry>,
    ) -> BoxFuture<'_, Result<()>> {
        let campaign_lead_id = campaign_lead_id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            for entry in &entries {
                let detail = if entry.detail.is_null() {
                    None
                } else {
                    Some(serde_json::to_string(&entry.detail)?)
                };
                conn.execute(
                    "INSERT INTO processing_logs
                         (campaign_lead_id, level, node, message, detail, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        campaign_lead_id,
                        level.as_str(),
                        entry.node,
                        entry.message,
                        detail,
                        entry.timestamp.to_rfc3339(),
                    ],
                )
                .map_err(db_err)?;
            }
            Ok(())
        })
    }

    fn campaign_status(&self, id: &str) -> BoxFuture<'_, Result<CampaignStatus>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let status: String = conn
                .query_row(
                    "SELECT status FROM campaigns WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?
                .ok_or(OutreachError::CampaignNotFound(id))?;
            CampaignStatus::from_str(&status)
                .ok_or_else(|| db_err(format!("bad campaign status '{}'", status)))
        })
    }

    fn set_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> BoxFuture<'_, Result<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            let now = Utc::now().to_rfc3339();
            // Lifecycle timestamps ride along with the transition.
            match status {
                CampaignStatus::Processing => conn.execute(
                    "UPDATE campaigns SET status = ?2,
                         started_at = COALESCE(started_at, ?3)
                     WHERE id = ?1",
                    params![id, status.as_str(), now],
                ),
                CampaignStatus::Completed | CampaignStatus::Failed => conn.execute(
                    "UPDATE campaigns SET status = ?2, completed_at = ?3 WHERE id = ?1",
                    params![id, status.as_str(), now],
                ),
                _ => conn.execute(
                    "UPDATE campaigns SET status = ?2 WHERE id = ?1",
                    params![id, status.as_str()],
                ),
            }
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn refresh_campaign_stats(&self, campaign_id: &str) -> BoxFuture<'_, Result<()>> {
        let campaign_id = campaign_id.to_string();
        Box::pin(async move {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE campaigns SET
                     total_leads = (SELECT COUNT(*) FROM campaign_leads WHERE campaign_id = ?1),
                     processed_leads = (SELECT COUNT(*) FROM campaign_leads
                         WHERE campaign_id = ?1 AND status IN ('completed', 'failed')),
                     sent_count = (SELECT COUNT(*) FROM campaign_leads
                         WHERE campaign_id = ?1 AND sms_sent = 1),
                     failed_count = (SELECT COUNT(*) FROM campaign_leads
                         WHERE campaign_id = ?1 AND status = 'failed')
                 WHERE id = ?1",
                params![campaign_id],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }
}
