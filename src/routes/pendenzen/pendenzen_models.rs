use serde::Deserialize;

use crate::validation::double_option;

#[derive(Debug, Deserialize)]
pub struct PendenzListQuery {
    pub status: Option<String>,
    pub bereich: Option<String>,
    pub verantwortlich_id: Option<String>,
    pub ueberfaellig: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePendenzRequest {
    pub beschreibung: Option<String>,
    pub bereich: Option<String>,
    pub verantwortlich_id: Option<String>,
    pub prioritaet: Option<String>,
    pub status: Option<String>,
    pub faellig_bis: Option<String>,
    pub erledigt_am: Option<String>,
    pub bemerkungen: Option<String>,
    pub auftragsnummer: Option<String>,
    pub kategorie: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePendenzRequest {
    pub beschreibung: Option<String>,
    pub bereich: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub verantwortlich_id: Option<Option<String>>,
    pub prioritaet: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub faellig_bis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub erledigt_am: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bemerkungen: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub auftragsnummer: Option<Option<String>>,
    pub kategorie: Option<String>,
}
