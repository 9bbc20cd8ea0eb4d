//! User accounts and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PriceMode, WarehouseKey};

/// Actor classes known to the platform. Wire strings match the historical
/// account documents, including the capitalized admin role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "distribuidor_nacional", alias = "distribuidor")]
    DistribuidorNacional,
    #[serde(rename = "distribuidor_internacional")]
    DistribuidorInternacional,
    #[serde(rename = "produccion")]
    Produccion,
    #[serde(rename = "facturacion")]
    Facturacion,
    #[serde(rename = "bodega")]
    Bodega,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::DistribuidorNacional => "distribuidor_nacional",
            Role::DistribuidorInternacional => "distribuidor_internacional",
            Role::Produccion => "produccion",
            Role::Facturacion => "facturacion",
            Role::Bodega => "bodega",
        }
    }

    /// Parse a wire string. "distribuidor" is accepted as a legacy alias
    /// for the national distributor role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Admin" => Some(Role::Admin),
            "distribuidor" | "distribuidor_nacional" => Some(Role::DistribuidorNacional),
            "distribuidor_internacional" => Some(Role::DistribuidorInternacional),
            "produccion" => Some(Role::Produccion),
            "facturacion" => Some(Role::Facturacion),
            "bodega" => Some(Role::Bodega),
            _ => None,
        }
    }

    pub fn is_distribuidor(&self) -> bool {
        matches!(
            self,
            Role::DistribuidorNacional | Role::DistribuidorInternacional
        )
    }

    /// Roles allowed to flip a dispatched order to invoiced / in-transit.
    pub fn can_set_order_status(&self) -> bool {
        matches!(
            self,
            Role::Admin | Role::Produccion | Role::Facturacion | Role::Bodega
        )
    }
}

/// Account state toggled by administrators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    #[serde(rename = "Activo")]
    Activo,
    #[serde(rename = "Inactivo")]
    Inactivo,
}

impl UserStatus {
    pub fn toggled(&self) -> Self {
        match self {
            UserStatus::Activo => UserStatus::Inactivo,
            UserStatus::Inactivo => UserStatus::Activo,
        }
    }
}

/// A platform account.
///
/// Distributors carry a price mode (which tax variant they buy under) and
/// optionally an individual-units flag; warehouse accounts carry the key
/// of the location they operate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub correo_electronico: String,
    pub phone: Option<String>,
    pub pais: Option<String>,
    pub rol: Role,
    pub estado: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_precio: Option<PriceMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdi: Option<WarehouseKey>,
    #[serde(default)]
    pub unidades_individuales: bool,
    pub fecha_ultimo_acceso: Option<DateTime<Utc>>,
    pub admin_id: Option<String>,
}

impl User {
    /// Distributors must carry a price mode; everyone else must not.
    pub fn validate_price_mode(rol: Role, tipo_precio: Option<PriceMode>) -> Result<(), &'static str> {
        match (rol.is_distribuidor(), tipo_precio) {
            (true, None) => Err("los distribuidores deben tener un tipo de precio"),
            (false, Some(_)) => Err("el tipo de precio solo aplica para distribuidores"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_strings_round_trip() {
        for role in [
            Role::Admin,
            Role::DistribuidorNacional,
            Role::DistribuidorInternacional,
            Role::Produccion,
            Role::Facturacion,
            Role::Bodega,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn legacy_distribuidor_alias_still_parses() {
        assert_eq!(Role::parse("distribuidor"), Some(Role::DistribuidorNacional));
    }

    #[test]
    fn toggling_status_flips_between_the_two_states() {
        assert_eq!(UserStatus::Activo.toggled(), UserStatus::Inactivo);
        assert_eq!(UserStatus::Inactivo.toggled(), UserStatus::Activo);
    }

    #[test]
    fn price_mode_is_mandatory_for_distributors_only() {
        assert!(User::validate_price_mode(Role::DistribuidorNacional, None).is_err());
        assert!(User::validate_price_mode(Role::Produccion, Some(PriceMode::SinIva)).is_err());
        assert!(User::validate_price_mode(Role::DistribuidorInternacional, Some(PriceMode::SinIvaInternacional)).is_ok());
        assert!(User::validate_price_mode(Role::Bodega, None).is_ok());
    }
}
