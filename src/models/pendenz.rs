use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Follow-up item of a project, joined with the names of the people involved.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pendenz {
    #[serde(rename = "id")]
    pub pendenz_id: String,
    pub project_id: String,
    pub nr: i32,
    pub beschreibung: String,
    pub bereich: String,
    pub verantwortlich_id: Option<String>,
    pub verantwortlich_name: Option<String>,
    pub erfasst_von_id: String,
    pub erfasst_von_name: Option<String>,
    pub prioritaet: String,
    pub status: String,
    pub faellig_bis: Option<NaiveDate>,
    pub erledigt_am: Option<NaiveDate>,
    pub bemerkungen: Option<String>,
    pub auftragsnummer: Option<String>,
    pub kategorie: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

pub const PENDENZ_SELECT: &str = "
    SELECT pz.pendenz_id, pz.project_id, pz.nr, pz.beschreibung, pz.bereich,
           pz.verantwortlich_id, v.user_name AS verantwortlich_name,
           pz.erfasst_von_id, e.user_name AS erfasst_von_name,
           pz.prioritaet, pz.status, pz.faellig_bis, pz.erledigt_am, pz.bemerkungen,
           pz.auftragsnummer, pz.kategorie, pz.created_at, pz.updated_at, pz.archived_at
    FROM Pendenzen_ pz
    JOIN Projects_ p ON p.project_id = pz.project_id
    LEFT JOIN Users_ v ON v.user_id = pz.verantwortlich_id
    LEFT JOIN Users_ e ON e.user_id = pz.erfasst_von_id
";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendenzHistorie {
    #[serde(rename = "id")]
    pub historie_id: String,
    pub pendenz_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub aktion: String,
    pub feld: Option<String>,
    pub alter_wert: Option<String>,
    pub neuer_wert: Option<String>,
    pub created_at: DateTime<Utc>,
}
