use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}
