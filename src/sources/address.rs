//! Postal-code (CEP) lookups raced between BrasilAPI and ViaCEP.
//!
//! Both services describe the same address with different field names; each
//! decoder maps its payload onto [`Address`] so the winner is comparable
//! regardless of which service answered.

use serde::{Deserialize, Serialize};

use crate::race::{SourceDescriptor, TaskError};

/// Default BrasilAPI base; the CEP is appended as `/{cep}`.
pub const BRASILAPI_BASE: &str = "https://brasilapi.com.br/api/cep/v1";
/// Default ViaCEP base; the CEP is appended as `/{cep}/json/`.
pub const VIACEP_BASE: &str = "http://viacep.com.br/ws";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Deserialize)]
struct BrasilApiAddress {
    cep: String,
    state: String,
    city: String,
    #[serde(default)]
    neighborhood: Option<String>,
    #[serde(default)]
    street: Option<String>,
}

#[derive(Deserialize)]
struct ViaCepAddress {
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    localidade: String,
    uf: String,
}

/// Strip an optional dash and require exactly eight digits.
pub fn normalize_cep(raw: &str) -> Option<String> {
    let digits: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if digits.len() == 8 && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

pub fn decode_brasilapi(body: &[u8]) -> Result<Address, TaskError> {
    let raw: BrasilApiAddress = serde_json::from_slice(body)?;
    Ok(Address {
        cep: raw.cep,
        street: raw.street.unwrap_or_default(),
        neighborhood: raw.neighborhood.unwrap_or_default(),
        city: raw.city,
        state: raw.state,
    })
}

pub fn decode_viacep(body: &[u8]) -> Result<Address, TaskError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    // Unknown CEPs come back as 200 with {"erro": true} (or "true").
    if let Some(flag) = value.get("erro") {
        if flag.as_bool() == Some(true) || flag.as_str() == Some("true") {
            return Err(TaskError::Decode("cep not found".into()));
        }
    }
    let raw: ViaCepAddress = serde_json::from_value(value)?;
    Ok(Address {
        cep: raw.cep.replace('-', ""),
        street: raw.logradouro,
        neighborhood: raw.bairro,
        city: raw.localidade,
        state: raw.uf,
    })
}

/// The two contenders for `cep`, BrasilAPI first.
pub fn cep_sources(cep: &str, brasilapi_base: &str, viacep_base: &str) -> Vec<SourceDescriptor<Address>> {
    vec![
        SourceDescriptor::new(
            "brasilapi",
            format!("{}/{}", brasilapi_base.trim_end_matches('/'), cep),
            decode_brasilapi,
        ),
        SourceDescriptor::new(
            "viacep",
            format!("{}/{}/json/", viacep_base.trim_end_matches('/'), cep),
            decode_viacep,
        ),
    ]
}
