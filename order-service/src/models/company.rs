//! Company profile printed on order documents.

use serde::{Deserialize, Serialize};

/// Business identity shown in the document header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "nome_fantasia", default)]
    pub trade_name: String,
    /// CNPJ.
    #[serde(rename = "cnpj", default)]
    pub tax_id: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,
    /// URL of the logo image.
    #[serde(rename = "logo_empresa", default)]
    pub logo_url: Option<String>,
}

impl CompanyProfile {
    pub fn is_blank(&self) -> bool {
        self.trade_name.trim().is_empty()
    }
}
