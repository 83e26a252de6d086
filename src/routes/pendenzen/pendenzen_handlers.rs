use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use log::info;
use sqlx::{Executor, MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::pendenzen_models::{CreatePendenzRequest, PendenzListQuery, UpdatePendenzRequest};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::enums::{Choice, PendenzBereich, PendenzKategorie, PendenzPrioritaet, PendenzStatus};
use crate::models::pendenz::{Pendenz, PendenzHistorie, PENDENZ_SELECT};
use crate::models::project::Project;
use crate::routes::response::{self, Pagination};
use crate::validation::{path_uuid, Validator};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

const SORTS: [(&str, &str); 8] = [
    ("nr", "pz.nr ASC"),
    ("-nr", "pz.nr DESC"),
    ("faellig_bis", "pz.faellig_bis IS NULL, pz.faellig_bis ASC, pz.nr ASC"),
    ("-faellig_bis", "pz.faellig_bis IS NULL, pz.faellig_bis DESC, pz.nr ASC"),
    ("erstellt_am", "pz.created_at ASC"),
    ("-erstellt_am", "pz.created_at DESC"),
    ("prioritaet", "FIELD(pz.prioritaet, 'hoch', 'mittel', 'niedrig') ASC, pz.nr ASC"),
    ("-prioritaet", "FIELD(pz.prioritaet, 'hoch', 'mittel', 'niedrig') DESC, pz.nr ASC"),
];

fn sort_clause(v: &mut Validator, raw: Option<&str>) -> &'static str {
    let key = raw.unwrap_or("nr");
    match SORTS.iter().find(|(name, _)| *name == key) {
        Some((_, clause)) => *clause,
        None => {
            let names: Vec<&str> = SORTS.iter().map(|(name, _)| *name).collect();
            v.push("sort", format!("sort must be one of: {}", names.join(", ")));
            SORTS[0].1
        }
    }
}

/// One tracked column whose value changes, as stored text.
#[derive(Debug, Clone, PartialEq)]
struct FieldChange {
    field: &'static str,
    old: Option<String>,
    new: Option<String>,
}

/// Validated PATCH body; `None` leaves a column untouched.
#[derive(Debug, Default)]
struct PendenzPatch {
    beschreibung: Option<String>,
    bereich: Option<PendenzBereich>,
    verantwortlich_id: Option<Option<String>>,
    prioritaet: Option<PendenzPrioritaet>,
    status: Option<PendenzStatus>,
    faellig_bis: Option<Option<NaiveDate>>,
    erledigt_am: Option<Option<NaiveDate>>,
    bemerkungen: Option<Option<String>>,
    auftragsnummer: Option<Option<String>>,
    kategorie: Option<PendenzKategorie>,
}

fn track(out: &mut Vec<FieldChange>, field: &'static str, old: Option<String>, new: Option<Option<String>>) {
    if let Some(new) = new {
        if new != old {
            out.push(FieldChange { field, old, new });
        }
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

/// Completion date after a patch. An explicit `erledigtAm` wins, null included.
/// Otherwise a status of `erledigt` stamps today and any other status clears it.
fn completion_date(
    current_date: Option<NaiveDate>,
    new_status: Option<PendenzStatus>,
    given: Option<Option<NaiveDate>>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    match (given, new_status) {
        (Some(given), _) => given,
        (None, Some(PendenzStatus::Erledigt)) => Some(today),
        (None, Some(_)) => None,
        (None, None) => current_date,
    }
}

/// Archived items are read-only.
fn editable(pendenz: &Pendenz) -> Result<(), ApiError> {
    match pendenz.archived_at {
        Some(_) => Err(ApiError::not_found("Pendenz")),
        None => Ok(()),
    }
}

fn changes(current: &Pendenz, patch: &PendenzPatch, today: NaiveDate) -> Vec<FieldChange> {
    let mut out = Vec::new();
    track(&mut out, "beschreibung", Some(current.beschreibung.clone()), patch.beschreibung.clone().map(Some));
    track(&mut out, "bereich", Some(current.bereich.clone()), patch.bereich.map(|b| Some(b.as_str().to_string())));
    track(&mut out, "verantwortlich_id", current.verantwortlich_id.clone(), patch.verantwortlich_id.clone());
    track(
        &mut out,
        "prioritaet",
        Some(current.prioritaet.clone()),
        patch.prioritaet.map(|p| Some(p.as_str().to_string())),
    );
    track(&mut out, "status", Some(current.status.clone()), patch.status.map(|s| Some(s.as_str().to_string())));
    track(&mut out, "faellig_bis", date_text(current.faellig_bis), patch.faellig_bis.map(date_text));
    let erledigt_am = completion_date(
        current.erledigt_am,
        patch.status,
        patch.erledigt_am,
        today,
    );
    track(&mut out, "erledigt_am", date_text(current.erledigt_am), Some(date_text(erledigt_am)));
    track(&mut out, "bemerkungen", current.bemerkungen.clone(), patch.bemerkungen.clone());
    track(&mut out, "auftragsnummer", current.auftragsnummer.clone(), patch.auftragsnummer.clone());
    track(
        &mut out,
        "kategorie",
        Some(current.kategorie.clone()),
        patch.kategorie.map(|k| Some(k.as_str().to_string())),
    );
    out
}

async fn record<'e, E>(
    executor: E,
    pendenz_id: &str,
    user_id: &str,
    aktion: &str,
    change: Option<&FieldChange>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        "INSERT INTO PendenzHistorie_ (historie_id, pendenz_id, user_id, aktion, feld, alter_wert, neuer_wert)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(pendenz_id)
    .bind(user_id)
    .bind(aktion)
    .bind(change.map(|c| c.field))
    .bind(change.and_then(|c| c.old.clone()))
    .bind(change.and_then(|c| c.new.clone()))
    .execute(executor)
    .await?;
    Ok(())
}

async fn owned_pendenz(pool: &MySqlPool, owner_id: &str, pendenz_id: &str) -> Result<Pendenz, ApiError> {
    let mut qb = QueryBuilder::<MySql>::new(PENDENZ_SELECT);
    qb.push(" WHERE pz.pendenz_id = ").push_bind(pendenz_id);
    qb.push(" AND p.owner_id = ").push_bind(owner_id);
    qb.push(" AND p.deleted_at IS NULL");
    qb.build_query_as::<Pendenz>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Pendenz"))
}

struct PendenzFilter {
    project_id: String,
    status: Option<PendenzStatus>,
    bereich: Option<PendenzBereich>,
    verantwortlich_id: Option<String>,
    ueberfaellig: bool,
}

impl PendenzFilter {
    fn apply(&self, qb: &mut QueryBuilder<'_, MySql>) {
        qb.push(" WHERE pz.archived_at IS NULL AND pz.project_id = ")
            .push_bind(self.project_id.clone());
        if let Some(status) = self.status {
            qb.push(" AND pz.status = ").push_bind(status.as_str());
        }
        if let Some(bereich) = self.bereich {
            qb.push(" AND pz.bereich = ").push_bind(bereich.as_str());
        }
        if let Some(verantwortlich_id) = &self.verantwortlich_id {
            qb.push(" AND pz.verantwortlich_id = ").push_bind(verantwortlich_id.clone());
        }
        if self.ueberfaellig {
            qb.push(" AND pz.faellig_bis < CURDATE() AND pz.status <> 'erledigt'");
        }
    }
}

pub async fn list_pendenzen(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<PendenzListQuery>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_uuid("projectId", &path)?;

    let mut v = Validator::new();
    let filter = PendenzFilter {
        project_id: project_id.clone(),
        status: v.optional_choice("status", query.status.as_deref()),
        bereich: v.optional_choice("bereich", query.bereich.as_deref()),
        verantwortlich_id: v.optional_uuid("verantwortlich_id", query.verantwortlich_id.as_deref()),
        ueberfaellig: v.optional_bool("ueberfaellig", query.ueberfaellig.as_deref()).unwrap_or(false),
    };
    let order = sort_clause(&mut v, query.sort.as_deref());
    let limit = v.query_int("limit", query.limit.as_deref(), 1, MAX_LIMIT).unwrap_or(DEFAULT_LIMIT);
    let offset = v.query_int("offset", query.offset.as_deref(), 0, i64::MAX).unwrap_or(0);
    v.finish()?;

    if Project::find_owned(pool.get_ref(), &auth.user_id, &project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }

    let mut count = QueryBuilder::<MySql>::new("SELECT CAST(COUNT(*) AS SIGNED) FROM Pendenzen_ pz");
    filter.apply(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut qb = QueryBuilder::<MySql>::new(PENDENZ_SELECT);
    filter.apply(&mut qb);
    qb.push(" ORDER BY ").push(order);
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows: Vec<Pendenz> = qb.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(response::paged(rows, Pagination { total, limit, offset }))
}

pub async fn create_pendenz(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreatePendenzRequest>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_uuid("projectId", &path)?;

    let mut v = Validator::new();
    let beschreibung = v.required_text("beschreibung", req.beschreibung.as_deref(), 5000);
    let bereich: Option<PendenzBereich> = v.required_choice("bereich", req.bereich.as_deref());
    let verantwortlich_id = v.optional_uuid("verantwortlichId", req.verantwortlich_id.as_deref());
    let prioritaet: Option<PendenzPrioritaet> = v.optional_choice("prioritaet", req.prioritaet.as_deref());
    let status: Option<PendenzStatus> = v.optional_choice("status", req.status.as_deref());
    let faellig_bis = v.optional_date("faelligBis", req.faellig_bis.as_deref());
    let erledigt_am = v.optional_date("erledigtAm", req.erledigt_am.as_deref());
    let bemerkungen = v.optional_text("bemerkungen", req.bemerkungen.as_deref(), 5000);
    let auftragsnummer = v.optional_text("auftragsnummer", req.auftragsnummer.as_deref(), 50);
    let kategorie: Option<PendenzKategorie> = v.optional_choice("kategorie", req.kategorie.as_deref());
    v.finish()?;
    let (beschreibung, bereich) = match (beschreibung, bereich) {
        (Some(b), Some(r)) => (b, r),
        _ => return Err(ApiError::BadRequest("beschreibung and bereich are required".into())),
    };

    if Project::find_owned(pool.get_ref(), &auth.user_id, &project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }

    let status = status.unwrap_or(PendenzStatus::Offen);
    let erledigt_am = match status {
        PendenzStatus::Erledigt => Some(erledigt_am.unwrap_or_else(|| Local::now().date_naive())),
        _ => None,
    };

    // step: next running number and insert, together
    let pendenz_id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;
    let nr: i64 = sqlx::query_scalar(
        "SELECT CAST(COALESCE(MAX(nr), 0) + 1 AS SIGNED) FROM Pendenzen_ WHERE project_id = ? FOR UPDATE",
    )
    .bind(&project_id)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO Pendenzen_
            (pendenz_id, project_id, nr, beschreibung, bereich, verantwortlich_id, erfasst_von_id,
             prioritaet, status, faellig_bis, erledigt_am, bemerkungen, auftragsnummer, kategorie)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&pendenz_id)
    .bind(&project_id)
    .bind(nr)
    .bind(&beschreibung)
    .bind(bereich.as_str())
    .bind(verantwortlich_id)
    .bind(&auth.user_id)
    .bind(prioritaet.unwrap_or(PendenzPrioritaet::Mittel).as_str())
    .bind(status.as_str())
    .bind(faellig_bis)
    .bind(erledigt_am)
    .bind(bemerkungen)
    .bind(auftragsnummer)
    .bind(kategorie.unwrap_or(PendenzKategorie::Projekt).as_str())
    .execute(&mut *tx)
    .await?;
    record(&mut *tx, &pendenz_id, &auth.user_id, "erstellt", None).await?;
    tx.commit().await?;

    let pendenz = owned_pendenz(pool.get_ref(), &auth.user_id, &pendenz_id).await?;
    info!("Pendenz #{} created in project {} by {}", nr, project_id, auth.user_name);
    Ok(response::created(pendenz))
}

pub async fn get_pendenz(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    Ok(response::ok(owned_pendenz(pool.get_ref(), &auth.user_id, &id).await?))
}

pub async fn update_pendenz(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdatePendenzRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let req = req.into_inner();

    let mut v = Validator::new();
    let patch = PendenzPatch {
        beschreibung: v.non_blank_text("beschreibung", req.beschreibung.as_deref(), 5000),
        bereich: v.optional_choice("bereich", req.bereich.as_deref()),
        verantwortlich_id: req
            .verantwortlich_id
            .map(|u| v.optional_uuid("verantwortlichId", u.as_deref())),
        prioritaet: v.optional_choice("prioritaet", req.prioritaet.as_deref()),
        status: v.optional_choice("status", req.status.as_deref()),
        faellig_bis: req.faellig_bis.map(|d| v.optional_date("faelligBis", d.as_deref())),
        erledigt_am: req.erledigt_am.map(|d| v.optional_date("erledigtAm", d.as_deref())),
        bemerkungen: req.bemerkungen.map(|b| v.optional_text("bemerkungen", b.as_deref(), 5000)),
        auftragsnummer: req
            .auftragsnummer
            .map(|a| v.optional_text("auftragsnummer", a.as_deref(), 50)),
        kategorie: v.optional_choice("kategorie", req.kategorie.as_deref()),
    };
    v.finish()?;

    let current = owned_pendenz(pool.get_ref(), &auth.user_id, &id).await?;
    editable(&current)?;
    let changed = changes(&current, &patch, Local::now().date_naive());
    if changed.is_empty() {
        return Ok(response::ok(current));
    }

    // step: update and history in one transaction
    let mut qb = QueryBuilder::<MySql>::new("UPDATE Pendenzen_ SET updated_at = CURRENT_TIMESTAMP");
    for change in &changed {
        qb.push(format!(", {} = ", change.field)).push_bind(change.new.clone());
    }
    qb.push(" WHERE pendenz_id = ").push_bind(&id);
    qb.push(" AND archived_at IS NULL");

    let mut tx = pool.begin().await?;
    if qb.build().execute(&mut *tx).await?.rows_affected() == 0 {
        return Err(ApiError::not_found("Pendenz"));
    }
    for change in &changed {
        record(&mut *tx, &id, &auth.user_id, "geaendert", Some(change)).await?;
    }
    tx.commit().await?;

    let pendenz = owned_pendenz(pool.get_ref(), &auth.user_id, &id).await?;
    info!("Pendenz {} updated by {}: {} fields", id, auth.user_name, changed.len());
    Ok(response::ok(pendenz))
}

/// Archives instead of deleting; the history stays readable.
pub async fn archive_pendenz(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE Pendenzen_ pz
         JOIN Projects_ p ON p.project_id = pz.project_id
         SET pz.archived_at = CURRENT_TIMESTAMP
         WHERE pz.pendenz_id = ? AND p.owner_id = ? AND p.deleted_at IS NULL AND pz.archived_at IS NULL",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Pendenz"));
    }
    record(&mut *tx, &id, &auth.user_id, "archiviert", None).await?;
    tx.commit().await?;

    info!("Pendenz {} archived by {}", id, auth.user_name);
    Ok(response::message("Pendenz archived"))
}

pub async fn historie(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    owned_pendenz(pool.get_ref(), &auth.user_id, &id).await?;

    let rows = sqlx::query_as::<_, PendenzHistorie>(
        "SELECT h.historie_id, h.pendenz_id, h.user_id, u.user_name, h.aktion, h.feld,
                h.alter_wert, h.neuer_wert, h.created_at
         FROM PendenzHistorie_ h
         LEFT JOIN Users_ u ON u.user_id = h.user_id
         WHERE h.pendenz_id = ?
         ORDER BY h.created_at DESC",
    )
    .bind(&id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(response::ok(rows))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::db::lazy_pool;
    use crate::routes::routes::pendenzen_configure;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn pendenz(status: &str, erledigt_am: Option<&str>) -> Pendenz {
        let stamp = Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap();
        Pendenz {
            pendenz_id: "pz1".into(),
            project_id: "p1".into(),
            nr: 3,
            beschreibung: "Masse Nische prüfen".into(),
            bereich: "avor".into(),
            verantwortlich_id: None,
            verantwortlich_name: None,
            erfasst_von_id: "u1".into(),
            erfasst_von_name: Some("anna".into()),
            prioritaet: "mittel".into(),
            status: status.into(),
            faellig_bis: Some(d("2026-02-10")),
            erledigt_am: erledigt_am.map(d),
            bemerkungen: None,
            auftragsnummer: None,
            kategorie: "projekt".into(),
            created_at: stamp,
            updated_at: stamp,
            archived_at: None,
        }
    }

    #[::core::prelude::v1::test]
    fn closing_sets_the_completion_date() {
        let today = d("2026-02-05");
        assert_eq!(completion_date(None, Some(PendenzStatus::Erledigt), None, today), Some(today));
        assert_eq!(
            completion_date(None, Some(PendenzStatus::Erledigt), Some(Some(d("2026-02-04"))), today),
            Some(d("2026-02-04"))
        );
        // closing again restamps
        assert_eq!(
            completion_date(Some(d("2026-02-01")), Some(PendenzStatus::Erledigt), None, today),
            Some(today)
        );
    }

    #[::core::prelude::v1::test]
    fn reopening_clears_the_completion_date() {
        let today = d("2026-02-05");
        assert_eq!(
            completion_date(Some(d("2026-02-01")), Some(PendenzStatus::InArbeit), None, today),
            None
        );
        assert_eq!(completion_date(Some(d("2026-02-01")), None, None, today), Some(d("2026-02-01")));
    }

    #[::core::prelude::v1::test]
    fn an_explicit_completion_date_always_wins() {
        let today = d("2026-02-05");
        assert_eq!(completion_date(Some(d("2026-02-01")), Some(PendenzStatus::Erledigt), Some(None), today), None);
        assert_eq!(
            completion_date(None, Some(PendenzStatus::Offen), Some(Some(d("2026-02-03"))), today),
            Some(d("2026-02-03"))
        );
        assert_eq!(completion_date(None, None, Some(Some(d("2026-02-03"))), today), Some(d("2026-02-03")));
    }

    #[::core::prelude::v1::test]
    fn archived_items_cannot_be_edited() {
        let mut archived = pendenz("offen", None);
        assert!(editable(&archived).is_ok());
        archived.archived_at = Some(Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap());
        assert!(matches!(editable(&archived), Err(ApiError::NotFound(_))));
    }

    #[::core::prelude::v1::test]
    fn only_changed_fields_are_tracked() {
        let current = pendenz("offen", None);
        let patch = PendenzPatch {
            prioritaet: Some(PendenzPrioritaet::Mittel),
            status: Some(PendenzStatus::Erledigt),
            bemerkungen: Some(Some("Kunde informiert".into())),
            ..Default::default()
        };

        let changed = changes(&current, &patch, d("2026-02-05"));
        let fields: Vec<&str> = changed.iter().map(|c| c.field).collect();
        assert_eq!(fields, vec!["status", "erledigt_am", "bemerkungen"]);
        assert_eq!(changed[1].new.as_deref(), Some("2026-02-05"));
        assert_eq!(changed[0].old.as_deref(), Some("offen"));
    }

    #[::core::prelude::v1::test]
    fn clearing_a_due_date_is_a_change() {
        let current = pendenz("offen", None);
        let patch = PendenzPatch {
            faellig_bis: Some(None),
            ..Default::default()
        };

        let changed = changes(&current, &patch, d("2026-02-05"));
        assert_eq!(
            changed,
            vec![FieldChange {
                field: "faellig_bis",
                old: Some("2026-02-10".into()),
                new: None,
            }]
        );
    }

    #[::core::prelude::v1::test]
    fn unknown_sort_is_rejected() {
        let mut v = Validator::new();
        assert_eq!(sort_clause(&mut v, Some("-prioritaet")), SORTS[7].1);
        assert_eq!(sort_clause(&mut v, None), "pz.nr ASC");
        assert!(!v.has_error("sort"));

        sort_clause(&mut v, Some("bereich"));
        assert!(v.has_error("sort"));
    }

    #[actix_web::test]
    async fn history_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(pendenzen_configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/pendenzen/6f9619ff-8b86-4d11-b42d-00c04fc964ff/historie")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
